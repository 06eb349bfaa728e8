//! Correlates the SSH identification string with the KEXINIT of the same flow.
use std::collections::{HashMap, VecDeque};
use super::containers::FlowKey;

/// Default number of flows remembered by the [BannerCache].
pub const DEFAULT_CAPACITY: usize = 10_000;

struct Entry {
    banner: String,
    stamp: u64,
}

/// Bounded map from [FlowKey] to the last identification string seen on that key.
///
/// Least recently used flows are evicted once `capacity` is reached. Recency is tracked with a
/// queue of `(stamp, key)` pairs; a pair whose stamp no longer matches its entry is stale and
/// skipped on eviction.
pub struct BannerCache {
    capacity: usize,
    entries: HashMap<FlowKey, Entry>,
    recency: VecDeque<(u64, FlowKey)>,
    clock: u64,
}

impl BannerCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            recency: VecDeque::new(),
            clock: 0,
        }
    }

    /// Last-write-wins: replaces any banner already recorded for `key`.
    pub fn observe_banner(&mut self, key: FlowKey, banner: &str) {
        let stamp = self.tick();
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.banner = banner.to_string();
            entry.stamp = stamp;
        } else {
            if self.entries.len() >= self.capacity {
                self.evict();
            }
            self.entries.insert(key.clone(), Entry { banner: banner.to_string(), stamp });
        }
        self.recency.push_back((stamp, key));
        self.compact();
    }

    pub fn lookup_banner(&mut self, key: &FlowKey) -> Option<String> {
        let stamp = self.tick();
        let entry = self.entries.get_mut(key)?;
        entry.stamp = stamp;
        let banner = entry.banner.clone();
        self.recency.push_back((stamp, key.clone()));
        self.compact();
        Some(banner)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn evict(&mut self) {
        while let Some((stamp, key)) = self.recency.pop_front() {
            if self.entries.get(&key).is_some_and(|entry| entry.stamp == stamp) {
                log::debug!("Evicting banner for {key}");
                self.entries.remove(&key);
                return;
            }
        }
    }

    // Drop stale recency pairs so the queue stays proportional to the live entries.
    fn compact(&mut self) {
        if self.recency.len() <= self.capacity * 2 {
            return;
        }
        let entries = &self.entries;
        self.recency
            .retain(|(stamp, key)| entries.get(key).is_some_and(|entry| entry.stamp == *stamp));
    }
}

impl Default for BannerCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
