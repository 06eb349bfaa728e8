//! The core of HASSH extraction.
//! Correlate identification strings with KEXINIT messages and fingerprint both ends of a session.
pub mod capture;
pub mod containers;
pub mod core;
pub mod correlator;
pub mod direction;
pub mod extract;
pub mod hassh;
pub mod utils;
#[cfg(test)]
pub mod testutil;
