//! Operating parameters handed to the analyser and capture driver.
use clap::ValueEnum;
use lazy_static::lazy_static;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use crate::analyser::containers::Role;
use crate::error::HasshError;

pub const DEFAULT_BPF_FILTER: &str = "tcp port 22 or tcp port 2222";
pub const DEFAULT_OUTPUT_FILE: &str = "hassh.log";

/// File extensions picked up when reading a directory of captures.
pub const CAPTURE_EXTENSIONS: [&str; 3] = ["pcap", "pcapng", "cap"];

lazy_static! {
    /// tshark only recognises SSH on port 22 unless told otherwise.
    pub static ref DEFAULT_DECODE_AS: Vec<DecodeAs> = vec![DecodeAs {
        criterion: String::from("tcp.port==2222"),
        protocol: String::from("ssh"),
    }];
}

/// Which fingerprints to report.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum RoleFilter {
    Client,
    Server,
    #[default]
    All,
}

impl RoleFilter {
    pub fn accepts(self, role: Role) -> bool {
        match self {
            RoleFilter::All => true,
            RoleFilter::Client => role == Role::Client,
            RoleFilter::Server => role == Role::Server,
        }
    }
}

/// Record format written to the output file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Json,
    Csv,
}

/// A tshark "decode as" rule, written `criterion,protocol` (e.g. `tcp.port==2222,ssh`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodeAs {
    pub criterion: String,
    pub protocol: String,
}

impl FromStr for DecodeAs {
    type Err = HasshError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(',') {
            Some((criterion, protocol)) if !criterion.trim().is_empty() && !protocol.trim().is_empty() => Ok(Self {
                criterion: criterion.trim().to_string(),
                protocol: protocol.trim().to_string(),
            }),
            _ => Err(HasshError::Config(format!("invalid decode-as rule '{s}', expected criterion,protocol"))),
        }
    }
}

impl fmt::Display for DecodeAs {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{},{}", self.criterion, self.protocol)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CaptureSource {
    File(PathBuf),
    Directory(PathBuf),
    Interface(String),
}

impl CaptureSource {
    /// Exactly one of the three sources must be given.
    pub fn from_options(file: Option<PathBuf>, directory: Option<PathBuf>, interface: Option<String>) -> Result<Self, HasshError> {
        match (file, directory, interface) {
            (Some(file), None, None) => Ok(CaptureSource::File(file)),
            (None, Some(directory), None) => Ok(CaptureSource::Directory(directory)),
            (None, None, Some(interface)) => Ok(CaptureSource::Interface(interface)),
            (None, None, None) => Err(HasshError::Config(
                "no capture source, use --read-file, --read-directory or --interface".into(),
            )),
            _ => Err(HasshError::Config("only one capture source may be given".into())),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub source: CaptureSource,
    pub role_filter: RoleFilter,
    pub decode_as: Vec<DecodeAs>,
    /// Capture filter, live capture only.
    pub bpf_filter: String,
    pub log_format: Option<LogFormat>,
    pub output_file: PathBuf,
    pub write_pcap: Option<PathBuf>,
    pub print_output: bool,
    pub cache_capacity: usize,
}

impl Config {
    pub fn validate(&self) -> Result<(), HasshError> {
        if self.cache_capacity == 0 {
            return Err(HasshError::Config("cache size must be at least 1".into()));
        }
        if self.write_pcap.is_some() && !matches!(self.source, CaptureSource::Interface(_)) {
            log::warn!("--write-pcap only applies to live capture, ignoring");
        }
        Ok(())
    }
}
