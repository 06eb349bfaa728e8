//! Record log written next to the capture, one line per record.
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use crate::analyser::containers::Output;
use crate::config::LogFormat;
use crate::error::Result;
use super::output::{csv_fields, csv_writer, data_as_json, CSV_HEADER};

enum LogWriter {
    Json(Box<dyn Write>),
    Csv(csv::Writer<Box<dyn Write>>),
}

pub struct RecordSink {
    writer: LogWriter,
}

impl RecordSink {
    /// Appends to `path`, creating it if needed.
    pub fn open(path: &Path, format: LogFormat) -> Result<Self> {
        log::info!("Writing {format:?} records to {}", path.display());
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Self::from_writer(Box::new(file), format)
    }

    /// A CSV sink starts with the header row.
    pub fn from_writer(writer: Box<dyn Write>, format: LogFormat) -> Result<Self> {
        let writer = match format {
            LogFormat::Json => LogWriter::Json(writer),
            LogFormat::Csv => {
                let mut writer = csv_writer(writer);
                writer.write_record(CSV_HEADER)?;
                writer.flush()?;
                LogWriter::Csv(writer)
            }
        };
        Ok(Self { writer })
    }

    /// Writes and flushes one record. Events are dropped from CSV output.
    pub fn write(&mut self, output: &Output) -> Result<()> {
        match (&mut self.writer, output) {
            (LogWriter::Json(writer), _) => {
                let line = data_as_json(output)?;
                writeln!(writer, "{line}")?;
                writer.flush()?;
            }
            (LogWriter::Csv(writer), Output::Fingerprint(record)) => {
                writer.write_record(csv_fields(record))?;
                writer.flush()?;
            }
            (LogWriter::Csv(_), Output::Event(_)) => {}
        }
        Ok(())
    }
}
