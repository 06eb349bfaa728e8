//! Normalizes dissected packets into [PacketEvent]s.
//!
//! Field presence is resolved here, once. Everything downstream works on the fixed schema and
//! never asks the dissector whether a field exists.
use chrono::DateTime;
use rtshark::Packet;
use super::containers::{KexInit, PacketEvent};

/// Read access to one packet as decoded by the dissection engine.
pub trait DissectedPacket {
    fn has_layer(&self, layer: &str) -> bool;

    /// Value of the `name` field (e.g. `ssh.protocol`) within `layer`, if the dissector produced it.
    fn field(&self, layer: &str, name: &str) -> Option<&str>;

    /// Capture time in microseconds since the epoch.
    fn captured_at_micros(&self) -> Option<i64>;
}

impl DissectedPacket for Packet {
    fn has_layer(&self, layer: &str) -> bool {
        self.layer_name(layer).is_some()
    }

    fn field(&self, layer: &str, name: &str) -> Option<&str> {
        self.layer_name(layer)?.metadata(name).map(|metadata| metadata.value())
    }

    fn captured_at_micros(&self) -> Option<i64> {
        self.timestamp_micros()
    }
}

/// Builds a [PacketEvent] from an SSH packet. Returns `None` for packets without an SSH layer.
///
/// Absent SSH fields become empty strings, ports that fail to parse become `None`.
/// This never fails.
pub fn extract<P: DissectedPacket + ?Sized>(packet: &P) -> Option<PacketEvent> {
    if !packet.has_layer("ssh") {
        return None;
    }

    let ssh = |name: &str| packet.field("ssh", name).unwrap_or_default().to_string();
    let port = |name: &str| packet.field("tcp", name).and_then(|value| value.trim().parse::<u16>().ok());
    let address = |v4: &str, v6: &str| {
        packet
            .field("ip", v4)
            .or_else(|| packet.field("ipv6", v6))
            .unwrap_or_default()
            .to_string()
    };

    let retransmission = packet.field("tcp", "tcp.analysis.retransmission").is_some()
        || packet.field("tcp", "tcp.analysis.spurious_retransmission").is_some();

    Some(PacketEvent {
        timestamp: packet.captured_at_micros().and_then(DateTime::from_timestamp_micros),
        src_ip: address("ip.src", "ipv6.src"),
        dst_ip: address("ip.dst", "ipv6.dst"),
        src_port: port("tcp.srcport"),
        dst_port: port("tcp.dstport"),
        protocol: packet.field("ssh", "ssh.protocol").map(str::to_string),
        message_code: packet
            .field("ssh", "ssh.message_code")
            .and_then(|code| code.trim().parse::<u8>().ok()),
        retransmission,
        kexinit: KexInit {
            kex_algorithms: ssh("ssh.kex_algorithms"),
            encryption_client_to_server: ssh("ssh.encryption_algorithms_client_to_server"),
            encryption_server_to_client: ssh("ssh.encryption_algorithms_server_to_client"),
            mac_client_to_server: ssh("ssh.mac_algorithms_client_to_server"),
            mac_server_to_client: ssh("ssh.mac_algorithms_server_to_client"),
            compression_client_to_server: ssh("ssh.compression_algorithms_client_to_server"),
            compression_server_to_client: ssh("ssh.compression_algorithms_server_to_client"),
            languages_client_to_server: ssh("ssh.languages_client_to_server"),
            languages_server_to_client: ssh("ssh.languages_server_to_client"),
        },
    })
}
