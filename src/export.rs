//! Export of decoded log data.
//!
//! The CSV exporter is a [`DecodeHandler`]: it writes rows as main frames
//! complete instead of buffering the whole log. Raw header lines go to a
//! companion `.headers.csv`, and decoded events can be written as JSON when
//! the `json` feature is enabled.

use crate::error::{DecodeError, Result};
use crate::types::{FrameKind, LogHeader};
use crate::{DecodeHandler, FrameEvent};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Compute the output paths for one sub-log, using the input file's stem and
/// a `.NN` suffix when the file holds more than one sub-log.
pub fn compute_export_paths(
    input_path: &Path,
    output_dir: Option<&Path>,
    log_number: usize,
    total_logs: usize,
) -> (PathBuf, PathBuf, PathBuf) {
    let base_name = input_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("blackbox");

    let output_dir = output_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| input_path.parent().unwrap_or(Path::new(".")).to_path_buf());

    let log_suffix = if total_logs > 1 {
        format!(".{:02}", log_number)
    } else {
        String::new()
    };

    (
        output_dir.join(format!("{}{}.csv", base_name, log_suffix)),
        output_dir.join(format!("{}{}.headers.csv", base_name, log_suffix)),
        output_dir.join(format!("{}{}.event.json", base_name, log_suffix)),
    )
}

/// Streams decoded main frames into a CSV file.
///
/// Corrupt frames and frames received while the stream was out of sync are
/// left out; GPS and event frames have their own outputs.
pub struct CsvExporter<W: Write> {
    writer: csv::Writer<W>,
    /// Indexes of the main fields selected for output, fixed at metadata time
    columns: Vec<usize>,
    field_filter: Option<Box<dyn Fn(&str) -> bool>>,
    rows_written: u64,
    error: Option<csv::Error>,
}

impl CsvExporter<File> {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).map_err(|err| {
            DecodeError::Export(format!("failed to create CSV output file {:?}: {}", path, err))
        })?;
        Ok(Self::from_writer(file))
    }
}

impl<W: Write> CsvExporter<W> {
    pub fn from_writer(writer: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(writer),
            columns: Vec::new(),
            field_filter: None,
            rows_written: 0,
            error: None,
        }
    }

    /// Restrict output to main fields whose name the predicate accepts.
    pub fn with_field_filter(mut self, filter: impl Fn(&str) -> bool + 'static) -> Self {
        self.field_filter = Some(Box::new(filter));
        self
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Flush the output and surface any write error hit during decoding.
    pub fn finish(mut self) -> Result<u64> {
        if let Some(error) = self.error {
            return Err(DecodeError::Export(format!("CSV write failed: {}", error)));
        }
        self.writer
            .flush()
            .map_err(|err| DecodeError::Export(format!("failed to flush CSV output: {}", err)))?;
        Ok(self.rows_written)
    }

    fn write_record<'r>(&mut self, fields: impl Iterator<Item = &'r str>) {
        if self.error.is_none() {
            if let Err(error) = self.writer.write_record(fields.map(str::as_bytes)) {
                self.error = Some(error);
            }
        }
    }
}

impl<W: Write> DecodeHandler for CsvExporter<W> {
    fn on_metadata(&mut self, header: &LogHeader) {
        let names = &header.i_frame_def.field_names;

        self.columns = (0..names.len())
            .filter(|&i| match &self.field_filter {
                Some(filter) => filter(&names[i]),
                None => true,
            })
            .collect();

        let header_row: Vec<&str> = self.columns.iter().map(|&i| names[i].as_str()).collect();
        self.write_record(header_row.into_iter());
    }

    fn on_frame(&mut self, _header: &LogHeader, frame: &FrameEvent) {
        if !matches!(frame.kind, FrameKind::Intra | FrameKind::Inter) || !frame.stream_valid {
            return;
        }
        let Some(values) = frame.values else {
            return;
        };

        let row: Vec<String> = self
            .columns
            .iter()
            .filter(|&&i| i < values.len())
            .map(|&i| values[i].to_string())
            .collect();

        self.write_record(row.iter().map(String::as_str));
        self.rows_written += 1;
    }
}

/// Write the raw header lines of a sub-log, one per row.
pub fn write_headers_csv(path: &Path, header: &LogHeader) -> Result<()> {
    let mut file = File::create(path).map_err(|err| {
        DecodeError::Export(format!(
            "failed to create headers output file {:?}: {}",
            path, err
        ))
    })?;

    for line in &header.all_headers {
        writeln!(file, "{}", line).map_err(|err| {
            DecodeError::Export(format!("failed to write headers to {:?}: {}", path, err))
        })?;
    }

    Ok(())
}

/// Write decoded events as a JSON array.
#[cfg(feature = "json")]
pub fn export_events_json(path: &Path, events: &[crate::LogEvent]) -> Result<()> {
    use crate::LogEvent;
    use serde_json::json;

    let rendered: Vec<serde_json::Value> = events
        .iter()
        .map(|event| match event {
            LogEvent::SyncBeep { time } => json!({
                "name": "Sync beep",
                "time": time,
            }),
            LogEvent::AutotuneCycleStart {
                phase,
                cycle,
                p,
                i,
                d,
            } => json!({
                "name": "Autotune cycle start",
                "phase": phase,
                "cycle": cycle,
                "p": p,
                "i": i,
                "d": d,
            }),
            LogEvent::AutotuneCycleResult { overshot, p, i, d } => json!({
                "name": "Autotune cycle result",
                "overshot": overshot,
                "p": p,
                "i": i,
                "d": d,
            }),
            LogEvent::Invalid => json!({
                "name": "Unknown event",
            }),
        })
        .collect();

    let file = File::create(path).map_err(|err| {
        DecodeError::Export(format!(
            "failed to create event output file {:?}: {}",
            path, err
        ))
    })?;
    serde_json::to_writer_pretty(file, &rendered).map_err(|err| {
        DecodeError::Export(format!("failed to write events to {:?}: {}", path, err))
    })?;

    Ok(())
}
