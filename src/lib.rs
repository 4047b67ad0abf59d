//! Blackbox flight-data-recorder log decoder
//!
//! Decodes the binary logs written by Cleanflight/Baseflight flight
//! controllers while armed: a textual header section describing the field
//! tables, followed by delta-coded, bit-packed binary frames. Decoded frames
//! are delivered through the [`DecodeHandler`] callbacks in file order, and
//! the decoder resynchronises itself after corrupt or truncated frames.
//!
//! # Examples
//!
//! ```rust,no_run
//! use bbl_decoder::{DecodeHandler, FlightLog, FrameEvent, LogHeader};
//!
//! struct Printer;
//!
//! impl DecodeHandler for Printer {
//!     fn on_frame(&mut self, _header: &LogHeader, frame: &FrameEvent) {
//!         println!("{:?} at {}: {:?}", frame.kind, frame.offset, frame.values);
//!     }
//! }
//!
//! let data = std::fs::read("flight.BBL").unwrap();
//! let mut log = FlightLog::new(&data).unwrap();
//! log.parse(0, &mut Printer, false).unwrap();
//! ```

pub mod error;
pub mod parser;
pub mod skipped_frames;
pub mod types;

#[cfg(feature = "csv")]
pub mod export;

use crate::parser::log::{index_sub_logs, LogDecoder};

pub use crate::error::{DecodeError, Result};
pub use crate::parser::log::LOG_START_MARKER;
pub use crate::types::{
    FieldStats, FirmwareType, FrameDefinition, FrameEvent, FrameKind, FrameTypeStats, LogEvent,
    LogHeader, LogStats,
};

/// Most fields a single frame type can declare
pub const MAX_FIELDS: usize = 128;

/// Longest byte span a frame may occupy before it is declared corrupt
pub const MAX_FRAME_LENGTH: usize = 256;

/// Most sub-logs recognised in one file
pub const MAX_LOGS_IN_FILE: usize = 128;

/// Index of the loop iteration counter among the main fields
pub const FIELD_ITERATION: usize = 0;

/// Index of the timestamp among the main fields
pub const FIELD_TIME: usize = 1;

/// Receiver for everything one parse produces.
///
/// All methods default to doing nothing, so implementations only override
/// what they consume. Callbacks run synchronously on the caller's thread, in
/// the order the frames appear in the file, and must not re-enter the
/// decoder.
pub trait DecodeHandler {
    /// Called exactly once, after the header section has parsed and before
    /// the first data frame.
    fn on_metadata(&mut self, _header: &LogHeader) {}

    /// Called once per frame attempt, valid or corrupt.
    fn on_frame(&mut self, _header: &LogHeader, _frame: &FrameEvent) {}

    /// Called once per event frame that passed the boundary check.
    fn on_event(&mut self, _header: &LogHeader, _event: &LogEvent) {}
}

/// A memory-resident blackbox log file: one or more concatenated sub-logs,
/// one per arming cycle.
///
/// Construction scans for sub-log boundaries; [`FlightLog::parse`] then
/// decodes one sub-log end-to-end. The header and statistics of the most
/// recent parse stay readable on the instance afterwards.
pub struct FlightLog<'a> {
    data: &'a [u8],
    log_begin: Vec<usize>,
    pub header: LogHeader,
    pub stats: LogStats,
}

impl<'a> FlightLog<'a> {
    /// Index the sub-logs of a file held in memory. Fails on empty input.
    pub fn new(data: &'a [u8]) -> Result<Self> {
        if data.is_empty() {
            return Err(DecodeError::InvalidHeader("log file is empty".to_string()));
        }

        Ok(Self {
            data,
            log_begin: index_sub_logs(data),
            header: LogHeader::default(),
            stats: LogStats::default(),
        })
    }

    /// Number of sub-logs found in the file
    pub fn log_count(&self) -> usize {
        self.log_begin.len()
    }

    /// The byte range of one sub-log, delimited by the next sub-log marker
    /// or the end of the file.
    pub fn log_bounds(&self, log_index: usize) -> Option<(usize, usize)> {
        let start = *self.log_begin.get(log_index)?;
        let end = self
            .log_begin
            .get(log_index + 1)
            .copied()
            .unwrap_or(self.data.len());
        Some((start, end))
    }

    /// Decode one sub-log, delivering frames and events to `handler`.
    ///
    /// With `raw` set, predictor application is disabled and every field
    /// reports the value carried on the stream.
    ///
    /// Returns `Ok(false)` for an out-of-range index or a sub-log whose data
    /// section is empty. Per-frame corruption is recovered from internally;
    /// only the fatal conditions (missing main field definitions, unknown
    /// predictor or encoding codes, predictors referencing undeclared
    /// fields) surface as errors.
    pub fn parse<H: DecodeHandler>(
        &mut self,
        log_index: usize,
        handler: &mut H,
        raw: bool,
    ) -> Result<bool> {
        let Some((start, end)) = self.log_bounds(log_index) else {
            return Ok(false);
        };

        // Previous parse state does not carry over
        self.header = LogHeader::default();
        self.stats = LogStats::default();

        let data: &'a [u8] = self.data;
        let mut decoder = LogDecoder::new(
            &data[start..end],
            &mut self.header,
            &mut self.stats,
            handler,
            raw,
        );

        decoder.run()
    }
}
