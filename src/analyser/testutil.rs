//! In-memory stand-ins for tshark output.
use std::collections::{HashMap, HashSet, VecDeque};
use super::capture::PacketSource;
use super::extract::DissectedPacket;
use crate::error::{HasshError, Result};

#[derive(Clone, Debug, Default)]
pub struct FakePacket {
    layers: HashSet<String>,
    fields: HashMap<(String, String), String>,
    timestamp: Option<i64>,
}

impl FakePacket {
    pub fn new() -> Self {
        Self::default()
    }

    /// KEXINIT packet with the IP and TCP fields filled in.
    pub fn kexinit(src_ip: &str, src_port: u16, dst_ip: &str, dst_port: u16) -> Self {
        Self::new()
            .with("ssh", "ssh.message_code", "20")
            .flow(src_ip, src_port, dst_ip, dst_port)
    }

    /// Version exchange packet.
    pub fn banner(banner: &str, src_ip: &str, src_port: u16, dst_ip: &str, dst_port: u16) -> Self {
        Self::new()
            .with("ssh", "ssh.protocol", banner)
            .flow(src_ip, src_port, dst_ip, dst_port)
    }

    pub fn flow(self, src_ip: &str, src_port: u16, dst_ip: &str, dst_port: u16) -> Self {
        self.with("ip", "ip.src", src_ip)
            .with("ip", "ip.dst", dst_ip)
            .with("tcp", "tcp.srcport", &src_port.to_string())
            .with("tcp", "tcp.dstport", &dst_port.to_string())
    }

    pub fn with(mut self, layer: &str, name: &str, value: &str) -> Self {
        self.layers.insert(layer.to_string());
        self.fields.insert((layer.to_string(), name.to_string()), value.to_string());
        self
    }

    pub fn at(mut self, micros: i64) -> Self {
        self.timestamp = Some(micros);
        self
    }

    pub fn algorithms(self, kex: &str, enc: &str, mac: &str, cmp: &str) -> Self {
        self.with("ssh", "ssh.kex_algorithms", kex)
            .with("ssh", "ssh.encryption_algorithms_client_to_server", enc)
            .with("ssh", "ssh.mac_algorithms_client_to_server", mac)
            .with("ssh", "ssh.compression_algorithms_client_to_server", cmp)
            .with("ssh", "ssh.encryption_algorithms_server_to_client", enc)
            .with("ssh", "ssh.mac_algorithms_server_to_client", mac)
            .with("ssh", "ssh.compression_algorithms_server_to_client", cmp)
    }
}

impl DissectedPacket for FakePacket {
    fn has_layer(&self, layer: &str) -> bool {
        self.layers.contains(layer)
    }

    fn field(&self, layer: &str, name: &str) -> Option<&str> {
        self.fields
            .get(&(layer.to_string(), name.to_string()))
            .map(String::as_str)
    }

    fn captured_at_micros(&self) -> Option<i64> {
        self.timestamp
    }
}

/// Plays back a fixed script of reads.
pub struct ScriptedSource {
    script: VecDeque<Result<FakePacket>>,
    pub closed: bool,
}

impl ScriptedSource {
    pub fn new(packets: Vec<FakePacket>) -> Self {
        Self {
            script: packets.into_iter().map(Ok).collect(),
            closed: false,
        }
    }

    pub fn then_fail(mut self, error: HasshError) -> Self {
        self.script.push_back(Err(error));
        self
    }

    pub fn then(mut self, packet: FakePacket) -> Self {
        self.script.push_back(Ok(packet));
        self
    }
}

impl PacketSource for ScriptedSource {
    type Packet = FakePacket;

    fn next_packet(&mut self) -> Result<Option<FakePacket>> {
        match self.script.pop_front() {
            Some(Ok(packet)) => Ok(Some(packet)),
            Some(Err(error)) => Err(error),
            None => Ok(None),
        }
    }

    fn close(&mut self) {
        self.closed = true;
    }
}
