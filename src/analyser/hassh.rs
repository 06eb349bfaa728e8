//! HASSH fingerprint calculation.
//!
//! `hassh = md5(kex;enc;mac;cmp)` over the lists sent in one direction, exactly as they appear
//! on the wire. Any change to order, separator or case breaks matching against existing HASSH
//! databases.
use md5::{Digest, Md5};
use super::containers::{AlgorithmSet, KexInit, Role};

pub const FIELD_SEPARATOR: &str = ";";

/// MD5 hash of a string, lowercase hex.
pub fn get_md5_hash(string_in: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(string_in.as_bytes());
    let result = hasher.finalize();

    hex::encode(result)
}

/// Returns `(hassh, hassh_algorithms)`. Empty lists stay as empty segments, so a KEXINIT with
/// nothing negotiated hashes `";;;"`.
pub fn fingerprint(kex: &str, enc: &str, mac: &str, cmp: &str) -> (String, String) {
    let algorithms = [kex, enc, mac, cmp].join(FIELD_SEPARATOR);
    (get_md5_hash(&algorithms), algorithms)
}

/// hassh: client to server lists.
pub fn client_fingerprint(kex: &str, enc_c2s: &str, mac_c2s: &str, cmp_c2s: &str) -> (String, String) {
    fingerprint(kex, enc_c2s, mac_c2s, cmp_c2s)
}

/// hasshServer: server to client lists.
pub fn server_fingerprint(kex: &str, enc_s2c: &str, mac_s2c: &str, cmp_s2c: &str) -> (String, String) {
    fingerprint(kex, enc_s2c, mac_s2c, cmp_s2c)
}

/// Everything the analyser keeps about one side of a KEXINIT.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fingerprint {
    pub hassh: String,
    pub algorithms_string: String,
    pub algorithms: AlgorithmSet,
    pub peer: AlgorithmSet,
}

impl Fingerprint {
    pub fn compute(kexinit: &KexInit, role: Role) -> Self {
        let algorithms = kexinit.algorithms(role);
        let (hassh, algorithms_string) = match role {
            Role::Client => client_fingerprint(
                &algorithms.kex,
                &algorithms.encryption,
                &algorithms.mac,
                &algorithms.compression,
            ),
            Role::Server => server_fingerprint(
                &algorithms.kex,
                &algorithms.encryption,
                &algorithms.mac,
                &algorithms.compression,
            ),
        };
        let peer = match role {
            Role::Client => kexinit.algorithms(Role::Server),
            Role::Server => kexinit.algorithms(Role::Client),
        };

        Self {
            hassh,
            algorithms_string,
            algorithms,
            peer,
        }
    }
}
