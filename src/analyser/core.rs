use super::containers::{FingerprintRecord, Output, PacketEvent, RetransmissionEvent};
use super::correlator::BannerCache;
use super::direction::{DirectionClassifier, PortHeuristic};
use super::extract::{extract, DissectedPacket};
use super::hassh::Fingerprint;
use crate::config::RoleFilter;
use crate::error::{HasshError, Result};

/// Per-capture analysis state: the banner cache plus the rules applied to every KEXINIT.
pub struct Analyser<C = PortHeuristic> {
    banners: BannerCache,
    classifier: C,
    role_filter: RoleFilter,
}

impl Analyser<PortHeuristic> {
    pub fn new(role_filter: RoleFilter, cache_capacity: usize) -> Self {
        Self::with_classifier(PortHeuristic, role_filter, BannerCache::new(cache_capacity))
    }
}

impl<C: DirectionClassifier> Analyser<C> {
    pub fn with_classifier(classifier: C, role_filter: RoleFilter, banners: BannerCache) -> Self {
        Self {
            banners,
            classifier,
            role_filter,
        }
    }

    /// Runs one dissected packet through the analyser. Non-SSH packets are ignored.
    pub fn process_packet<P: DissectedPacket + ?Sized>(&mut self, packet: &P) -> Result<Option<Output>> {
        match extract(packet) {
            Some(event) => self.process(&event),
            None => Ok(None),
        }
    }

    /// Records any identification string, then turns a KEXINIT into either a fingerprint or a
    /// retransmission event.
    ///
    /// Returns `Ok(None)` for non-KEXINIT packets, for KEXINITs whose direction is unknown and
    /// for roles excluded by the filter. A KEXINIT without usable TCP ports is a packet fault.
    pub fn process(&mut self, packet: &PacketEvent) -> Result<Option<Output>> {
        if let Some(banner) = packet.protocol.as_deref() {
            match packet.flow_key() {
                Some(key) => {
                    log::debug!("Protocol string {banner} on {key}");
                    self.banners.observe_banner(key, banner);
                }
                None => log::warn!("Protocol string {banner} without TCP ports, not correlated"),
            }
        }

        if !packet.is_kexinit() {
            return Ok(None);
        }

        let (Some(src_port), Some(dst_port)) = (packet.src_port, packet.dst_port) else {
            return Err(HasshError::Packet(format!(
                "KEXINIT from {} to {} without valid TCP ports",
                packet.src_ip, packet.dst_ip
            )));
        };

        if let Some(event) = detect_retransmission(packet, src_port, dst_port) {
            log::debug!("Retransmitted KEXINIT {}:{} -> {}:{}", event.src_ip, src_port, event.dst_ip, dst_port);
            return Ok(Some(Output::Event(event)));
        }

        let Some(role) = self.classifier.classify(src_port, dst_port) else {
            log::debug!("Cannot tell KEXINIT direction for ports {src_port} -> {dst_port}");
            return Ok(None);
        };

        if !self.role_filter.accepts(role) {
            return Ok(None);
        }

        // Flow key is complete here, ports were checked above.
        let protocol = packet.flow_key().and_then(|key| self.banners.lookup_banner(&key));
        let fingerprint = Fingerprint::compute(&packet.kexinit, role);
        log::info!("{role} hassh {} from {}:{src_port}", fingerprint.hassh, packet.src_ip);

        Ok(Some(Output::Fingerprint(FingerprintRecord {
            timestamp: packet.timestamp,
            src_ip: packet.src_ip.clone(),
            dst_ip: packet.dst_ip.clone(),
            src_port,
            dst_port,
            role,
            protocol,
            hassh: fingerprint.hassh,
            hassh_algorithms: fingerprint.algorithms_string,
            algorithms: fingerprint.algorithms,
            peer: fingerprint.peer,
            languages_client_to_server: packet.kexinit.languages_client_to_server.clone(),
            languages_server_to_client: packet.kexinit.languages_server_to_client.clone(),
        })))
    }

    pub fn cached_banners(&self) -> usize {
        self.banners.len()
    }
}

/// A KEXINIT the dissector flagged as a (spurious) retransmission is reported as an event and
/// never fingerprinted.
pub fn detect_retransmission(packet: &PacketEvent, src_port: u16, dst_port: u16) -> Option<RetransmissionEvent> {
    packet
        .retransmission
        .then(|| RetransmissionEvent::new(packet, src_port, dst_port))
}
