use super::containers::Role;

/// Decides which endpoint sent a KEXINIT packet.
pub trait DirectionClassifier {
    /// `None` when the sender cannot be determined; such packets produce no fingerprint.
    fn classify(&self, src_port: u16, dst_port: u16) -> Option<Role>;
}

/// Stateless port heuristic: servers listen on the lower port, clients talk from an ephemeral
/// higher one. Wrong for atypical port assignments, and equal ports stay unclassified.
#[derive(Clone, Copy, Debug, Default)]
pub struct PortHeuristic;

impl DirectionClassifier for PortHeuristic {
    fn classify(&self, src_port: u16, dst_port: u16) -> Option<Role> {
        match src_port.cmp(&dst_port) {
            std::cmp::Ordering::Greater => Some(Role::Client),
            std::cmp::Ordering::Less => Some(Role::Server),
            std::cmp::Ordering::Equal => None,
        }
    }
}
