mod analyser;
mod config;
mod error;
mod ui;

use analyser::capture::{cancel_on_interrupt, replay, stream, Cancellation, TsharkSource};
use analyser::containers::Output;
use analyser::core::Analyser;
use analyser::correlator::DEFAULT_CAPACITY;
use analyser::utils::list_capture_files;
use clap::{ArgAction, Parser};
use config::{CaptureSource, Config, DecodeAs, LogFormat, RoleFilter, DEFAULT_BPF_FILTER, DEFAULT_DECODE_AS, DEFAULT_OUTPUT_FILE};
use error::{HasshError, Result};
use std::path::{Path, PathBuf};
use ui::output;
use ui::sink::RecordSink;

/// hasshniff extracts HASSH fingerprints of SSH clients and servers from packet captures
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// pcap/pcapng file to process
    #[arg(short = 'r', long, value_parser)]
    read_file: Option<PathBuf>,

    /// Directory of pcap files to process
    #[arg(short = 'd', long, value_parser)]
    read_directory: Option<PathBuf>,

    /// Listen on interface
    #[arg(short = 'i', long, value_parser)]
    interface: Option<String>,

    /// Client or server fingerprints
    #[arg(long, value_enum, default_value_t = RoleFilter::All)]
    fingerprint: RoleFilter,

    /// tshark decode-as rule `criterion,protocol`, repeatable. Default: tcp.port==2222,ssh
    #[arg(long, value_parser)]
    decode_as: Vec<DecodeAs>,

    /// BPF capture filter to use (live capture only)
    #[arg(short = 'f', long, default_value = DEFAULT_BPF_FILTER, value_parser)]
    bpf_filter: String,

    /// Output log format
    #[arg(short = 'l', long, value_enum)]
    log_format: Option<LogFormat>,

    /// Output log file
    #[arg(short = 'o', long, default_value = DEFAULT_OUTPUT_FILE, value_parser)]
    output_file: PathBuf,

    /// Save the live captured packets to this file
    #[arg(short = 'w', long, value_parser)]
    write_pcap: Option<PathBuf>,

    /// Print fingerprints to the console
    #[arg(short = 'p', long, action = ArgAction::SetTrue)]
    print_output: bool,

    /// Number of flows whose identification string is remembered
    #[arg(long, default_value_t = DEFAULT_CAPACITY, value_parser)]
    cache_size: usize,
}

impl Args {
    fn into_config(self) -> Result<Config> {
        let source = CaptureSource::from_options(self.read_file, self.read_directory, self.interface)?;
        let decode_as = if self.decode_as.is_empty() {
            DEFAULT_DECODE_AS.clone()
        } else {
            self.decode_as
        };

        Ok(Config {
            source,
            role_filter: self.fingerprint,
            decode_as,
            bpf_filter: self.bpf_filter,
            log_format: self.log_format,
            output_file: self.output_file,
            write_pcap: self.write_pcap,
            print_output: self.print_output,
            cache_capacity: self.cache_size,
        })
    }
}

fn main() {
    if let Err(e) = simple_logger::init_with_env() {
        eprintln!("Failed to initialise logging: {e}");
    }

    let args = Args::parse();
    let outcome = args.into_config().and_then(|config| run(&config));

    if let Err(e) = outcome {
        log::error!("{e}");
        std::process::exit(1);
    }
}

fn run(config: &Config) -> Result<()> {
    config.validate()?;

    let mut sink = match config.log_format {
        Some(format) => Some(RecordSink::open(&config.output_file, format)?),
        None => {
            log::warn!("No log format specified, records are not saved.");
            None
        }
    };

    match &config.source {
        CaptureSource::File(path) => process_file(path, config, &mut sink),
        CaptureSource::Directory(directory) => {
            for path in list_capture_files(directory)? {
                match process_file(&path, config, &mut sink) {
                    Err(HasshError::Capture(e)) => log::error!("Skipping {}: {e}", path.display()),
                    outcome => outcome?,
                }
            }
            Ok(())
        }
        CaptureSource::Interface(interface) => process_live(interface, config, &mut sink),
    }
}

fn process_file(path: &Path, config: &Config, sink: &mut Option<RecordSink>) -> Result<()> {
    let mut source = TsharkSource::open_file(path, &config.decode_as)?;
    let mut analyser = Analyser::new(config.role_filter, config.cache_capacity);
    let results = replay(&mut source, &mut analyser)?;
    log::debug!("{} flows with identification strings", analyser.cached_banners());

    let capture = path.display().to_string();
    for result in &results {
        emit(result, config, sink, Some(&capture))?;
    }
    Ok(())
}

fn process_live(interface: &str, config: &Config, sink: &mut Option<RecordSink>) -> Result<()> {
    let cancellation = Cancellation::default();
    cancel_on_interrupt(cancellation.clone())?;

    let mut source = TsharkSource::open_live(interface, &config.bpf_filter, &config.decode_as, config.write_pcap.as_deref())?;
    let mut analyser = Analyser::new(config.role_filter, config.cache_capacity);

    stream(&mut source, &mut analyser, &cancellation, |result| emit(&result, config, sink, None))?;
    log::info!("Exiting.");
    Ok(())
}

fn emit(result: &Output, config: &Config, sink: &mut Option<RecordSink>, capture: Option<&str>) -> Result<()> {
    if let Some(sink) = sink.as_mut() {
        sink.write(result)?;
    }
    if config.print_output {
        if let Some(record) = result.as_fingerprint() {
            output::print_results(record, capture);
        }
    }
    Ok(())
}
