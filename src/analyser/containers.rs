use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::fmt;

/// HASSH algorithm version reported alongside every fingerprint.
pub const HASSH_VERSION: &str = "1.0";

/// SSH_MSG_KEXINIT
pub const MSG_KEXINIT: u8 = 20;

pub const RETRANSMISSION_MESSAGE: &str = "This packet is a (suspected) retransmission";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Client,
    Server,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Role::Client => write!(f, "client"),
            Role::Server => write!(f, "server"),
        }
    }
}

/// Packet-relative TCP 4-tuple. Source and destination are taken from the packet as seen,
/// so the two directions of one connection are two different keys.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FlowKey {
    pub src_ip: String,
    pub src_port: u16,
    pub dst_ip: String,
    pub dst_port: u16,
}

impl fmt::Display for FlowKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}_{}:{}", self.src_ip, self.src_port, self.dst_ip, self.dst_port)
    }
}

/// The four negotiation lists that make up one direction's fingerprint, in digest order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AlgorithmSet {
    pub kex: String,
    pub encryption: String,
    pub mac: String,
    pub compression: String,
}

/// Every name-list carried by a KEXINIT message, as text. Absent lists are empty strings.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KexInit {
    pub kex_algorithms: String,
    pub encryption_client_to_server: String,
    pub encryption_server_to_client: String,
    pub mac_client_to_server: String,
    pub mac_server_to_client: String,
    pub compression_client_to_server: String,
    pub compression_server_to_client: String,
    pub languages_client_to_server: String,
    pub languages_server_to_client: String,
}

impl KexInit {
    /// Lists negotiated for traffic sent by `role`.
    pub fn algorithms(&self, role: Role) -> AlgorithmSet {
        match role {
            Role::Client => AlgorithmSet {
                kex: self.kex_algorithms.clone(),
                encryption: self.encryption_client_to_server.clone(),
                mac: self.mac_client_to_server.clone(),
                compression: self.compression_client_to_server.clone(),
            },
            Role::Server => AlgorithmSet {
                kex: self.kex_algorithms.clone(),
                encryption: self.encryption_server_to_client.clone(),
                mac: self.mac_server_to_client.clone(),
                compression: self.compression_server_to_client.clone(),
            },
        }
    }
}

/// One dissected packet, normalized to a fixed schema.
#[derive(Clone, Debug, Default)]
pub struct PacketEvent {
    pub timestamp: Option<DateTime<Utc>>,
    pub src_ip: String,
    pub dst_ip: String,
    pub src_port: Option<u16>,
    pub dst_port: Option<u16>,
    /// Identification string, only set on the version exchange packet.
    pub protocol: Option<String>,
    pub message_code: Option<u8>,
    pub retransmission: bool,
    pub kexinit: KexInit,
}

impl PacketEvent {
    /// `None` when either port is missing from the packet.
    pub fn flow_key(&self) -> Option<FlowKey> {
        Some(FlowKey {
            src_ip: self.src_ip.clone(),
            src_port: self.src_port?,
            dst_ip: self.dst_ip.clone(),
            dst_port: self.dst_port?,
        })
    }

    pub fn is_kexinit(&self) -> bool {
        self.message_code == Some(MSG_KEXINIT)
    }
}

pub fn format_timestamp(timestamp: &Option<DateTime<Utc>>) -> String {
    timestamp
        .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Micros, true))
        .unwrap_or_default()
}

#[derive(Clone, Debug, PartialEq)]
pub struct FingerprintRecord {
    pub timestamp: Option<DateTime<Utc>>,
    pub src_ip: String,
    pub dst_ip: String,
    pub src_port: u16,
    pub dst_port: u16,
    pub role: Role,
    pub protocol: Option<String>,
    pub hassh: String,
    pub hassh_algorithms: String,
    pub algorithms: AlgorithmSet,
    /// Peer-direction lists, logged for audit only.
    pub peer: AlgorithmSet,
    pub languages_client_to_server: String,
    pub languages_server_to_client: String,
}

// Keys follow the established HASSH JSON log schema, which names fields per role.
impl Serialize for FingerprintRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let (protocol, hassh, algorithms, own, peer, languages) = match self.role {
            Role::Client => (
                "client",
                "hassh",
                "hasshAlgorithms",
                ["ckex", "ceacts", "cmacts", "ccacts"],
                ["ceastc", "cmastc", "ccastc"],
                ["clcts", "clstc"],
            ),
            Role::Server => (
                "server",
                "hasshServer",
                "hasshServerAlgorithms",
                ["skex", "seastc", "smastc", "scastc"],
                ["seacts", "smacts", "scacts"],
                ["slcts", "slstc"],
            ),
        };

        let mut map = serializer.serialize_map(Some(19))?;
        map.serialize_entry("timestamp", &format_timestamp(&self.timestamp))?;
        map.serialize_entry("sourceIp", &self.src_ip)?;
        map.serialize_entry("destinationIp", &self.dst_ip)?;
        map.serialize_entry("sourcePort", &self.src_port)?;
        map.serialize_entry("destinationPort", &self.dst_port)?;
        map.serialize_entry("hasshType", &self.role)?;
        map.serialize_entry(protocol, &self.protocol)?;
        map.serialize_entry(hassh, &self.hassh)?;
        map.serialize_entry(algorithms, &self.hassh_algorithms)?;
        map.serialize_entry("hasshVersion", HASSH_VERSION)?;
        map.serialize_entry(own[0], &self.algorithms.kex)?;
        map.serialize_entry(own[1], &self.algorithms.encryption)?;
        map.serialize_entry(own[2], &self.algorithms.mac)?;
        map.serialize_entry(own[3], &self.algorithms.compression)?;
        map.serialize_entry(languages[0], &self.languages_client_to_server)?;
        map.serialize_entry(languages[1], &self.languages_server_to_client)?;
        map.serialize_entry(peer[0], &self.peer.encryption)?;
        map.serialize_entry(peer[1], &self.peer.mac)?;
        map.serialize_entry(peer[2], &self.peer.compression)?;
        map.end()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetransmissionEvent {
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
    pub event_type: &'static str,
    pub event_message: &'static str,
    #[serde(rename = "sourceIp")]
    pub src_ip: String,
    #[serde(rename = "destinationIp")]
    pub dst_ip: String,
    #[serde(rename = "sourcePort")]
    pub src_port: u16,
    #[serde(rename = "destinationPort")]
    pub dst_port: u16,
}

impl RetransmissionEvent {
    pub fn new(packet: &PacketEvent, src_port: u16, dst_port: u16) -> Self {
        Self {
            timestamp: packet.timestamp,
            event_type: "retransmission",
            event_message: RETRANSMISSION_MESSAGE,
            src_ip: packet.src_ip.clone(),
            dst_ip: packet.dst_ip.clone(),
            src_port,
            dst_port,
        }
    }
}

fn serialize_timestamp<S: Serializer>(timestamp: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_timestamp(timestamp))
}

/// What the analyser produces for one KEXINIT packet.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Output {
    Fingerprint(FingerprintRecord),
    Event(RetransmissionEvent),
}

impl Output {
    pub fn as_fingerprint(&self) -> Option<&FingerprintRecord> {
        match self {
            Output::Fingerprint(record) => Some(record),
            Output::Event(_) => None,
        }
    }
}
