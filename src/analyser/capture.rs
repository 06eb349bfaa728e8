//! Drives the analyser over tshark output, either replaying a capture file or following a live
//! interface.
use std::fs::File;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use rtshark::{Packet, RTShark, RTSharkBuilder};
use super::containers::Output;
use super::core::Analyser;
use super::direction::DirectionClassifier;
use super::extract::DissectedPacket;
use crate::config::DecodeAs;
use crate::error::{HasshError, Result};

/// Display filter handed to tshark, so only SSH packets are decoded and returned.
pub const DISPLAY_FILTER: &str = "ssh";

/// Unreadable packets in a row before the source is considered broken.
pub const MAX_CONSECUTIVE_FAULTS: usize = 32;

/// A stream of dissected packets.
pub trait PacketSource {
    type Packet: DissectedPacket;

    /// Blocks until the next packet is available. `Ok(None)` once the source is exhausted.
    fn next_packet(&mut self) -> Result<Option<Self::Packet>>;

    /// Releases the underlying capture.
    fn close(&mut self);
}

/// Packets read from a tshark child process.
pub struct TsharkSource {
    rtshark: RTShark,
}

impl TsharkSource {
    /// Loads a PCAP/PCAPNG file.
    pub fn open_file(path: &Path, decode_as: &[DecodeAs]) -> Result<Self> {
        log::info!("Loading capture file {}", path.display());

        // tshark reports a missing file on stderr only, so check readability up front.
        File::open(path).map_err(|e| HasshError::Capture(format!("cannot read {}: {e}", path.display())))?;

        let path = path.to_string_lossy();
        let rules: Vec<String> = decode_as.iter().map(DecodeAs::to_string).collect();

        let mut builder = RTSharkBuilder::builder()
            .input_path(&path)
            .display_filter(DISPLAY_FILTER);
        for rule in &rules {
            builder = builder.decode_as(rule);
        }

        let rtshark = builder.spawn().map_err(HasshError::Spawn)?;
        Ok(Self { rtshark })
    }

    /// Listens on `interface`, optionally saving raw packets to `write_pcap`.
    pub fn open_live(interface: &str, capture_filter: &str, decode_as: &[DecodeAs], write_pcap: Option<&Path>) -> Result<Self> {
        log::info!("Listening on {interface} with filter '{capture_filter}'");

        let rules: Vec<String> = decode_as.iter().map(DecodeAs::to_string).collect();
        let output = write_pcap.map(|path| path.to_string_lossy().into_owned());

        let mut builder = RTSharkBuilder::builder()
            .input_path(interface)
            .live_capture()
            .capture_filter(capture_filter);
        if let Some(filter) = live_display_filter(write_pcap) {
            builder = builder.display_filter(filter);
        }
        for rule in &rules {
            builder = builder.decode_as(rule);
        }
        if let Some(output) = output.as_deref() {
            log::info!("Saving captured packets to {output}");
            builder = builder.output_path(output);
        }

        let rtshark = builder
            .spawn()
            .map_err(|e| HasshError::Capture(format!("cannot capture on {interface}: {e}")))?;
        Ok(Self { rtshark })
    }
}

/// tshark refuses a display filter while it saves to a file, so a saving capture decodes
/// everything and leaves non-SSH packets to [super::extract::extract].
fn live_display_filter(write_pcap: Option<&Path>) -> Option<&'static str> {
    match write_pcap {
        Some(_) => None,
        None => Some(DISPLAY_FILTER),
    }
}

/// A read error from a running tshark is unreadable output for one packet. Once tshark has
/// exited, the error carries its last stderr line and the source is finished.
fn read_fault(error: std::io::Error, exited: bool) -> HasshError {
    if exited {
        HasshError::Capture(format!("tshark stopped: {}", error.to_string().trim_end()))
    } else {
        HasshError::Packet(format!("error parsing tshark output: {error}"))
    }
}

impl PacketSource for TsharkSource {
    type Packet = Packet;

    fn next_packet(&mut self) -> Result<Option<Packet>> {
        let packet = self.rtshark.read();
        packet.map_err(|e| read_fault(e, self.rtshark.pid().is_none()))
    }

    fn close(&mut self) {
        self.rtshark.kill();
    }
}

/// Cooperative stop flag, checked between packets.
#[derive(Clone, Debug, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Cancels `cancellation` on Ctrl-C.
///
/// The interrupt also reaches the tshark child, which then closes its output, so a blocked
/// [PacketSource::next_packet] returns and the driver sees the flag.
pub fn cancel_on_interrupt(cancellation: Cancellation) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    std::thread::Builder::new()
        .name("interrupt".into())
        .spawn(move || {
            runtime.block_on(async {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        log::info!("Interrupted, stopping capture.");
                        cancellation.cancel();
                    }
                    Err(e) => log::error!("Cannot listen for interrupts: {e}"),
                }
            });
        })?;

    Ok(())
}

/// Replays a bounded source and returns everything it produced, in packet order.
///
/// Packets that fault are logged and skipped. Source faults abort the replay.
pub fn replay<S, C>(source: &mut S, analyser: &mut Analyser<C>) -> Result<Vec<Output>>
where
    S: PacketSource,
    C: DirectionClassifier,
{
    let mut results = Vec::new();
    let outcome = drive(source, analyser, &Cancellation::default(), |output| {
        results.push(output);
        Ok(())
    });
    source.close();

    outcome.map(|packets| {
        log::info!("Processed {packets} SSH packets, {} results.", results.len());
        results
    })
}

/// Follows an unbounded source, handing each result to `emit` as soon as it is produced.
///
/// Returns when `cancellation` fires or the source ends. The source is closed in every case.
pub fn stream<S, C, F>(source: &mut S, analyser: &mut Analyser<C>, cancellation: &Cancellation, emit: F) -> Result<()>
where
    S: PacketSource,
    C: DirectionClassifier,
    F: FnMut(Output) -> Result<()>,
{
    let outcome = drive(source, analyser, cancellation, emit);
    source.close();

    let packets = outcome?;
    log::info!("Capture stopped after {packets} SSH packets.");
    Ok(())
}

fn drive<S, C, F>(source: &mut S, analyser: &mut Analyser<C>, cancellation: &Cancellation, mut emit: F) -> Result<usize>
where
    S: PacketSource,
    C: DirectionClassifier,
    F: FnMut(Output) -> Result<()>,
{
    let mut packets = 0;
    let mut faults = 0;

    while !cancellation.is_cancelled() {
        let packet = match source.next_packet() {
            Ok(Some(packet)) => packet,
            Ok(None) => break,
            Err(e) if e.is_recoverable() => {
                faults += 1;
                log::error!("{e}");
                if faults >= MAX_CONSECUTIVE_FAULTS {
                    return Err(HasshError::Capture(format!("giving up after {faults} unreadable packets")));
                }
                continue;
            }
            Err(e) => return Err(e),
        };
        faults = 0;
        packets += 1;

        match analyser.process_packet(&packet) {
            Ok(Some(output)) => emit(output)?,
            Ok(None) => {}
            Err(e) if e.is_recoverable() => log::error!("Skipping packet {packets}: {e}"),
            Err(e) => return Err(e),
        }
    }

    Ok(packets)
}
