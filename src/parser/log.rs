use crate::error::{DecodeError, Result};
use crate::parser::decoder::{PREDICT_HOME_COORD, PREDICT_HOME_COORD_1};
use crate::parser::event::parse_event_frame;
use crate::parser::frame::parse_frame_fields;
use crate::parser::header::parse_header_line;
use crate::parser::stream::DataStream;
use crate::skipped_frames::{
    count_intentionally_skipped_frames, count_intentionally_skipped_frames_to,
};
use crate::types::{FrameEvent, FrameKind, LogEvent, LogHeader, LogStats};
use crate::{DecodeHandler, FIELD_ITERATION, FIELD_TIME, MAX_FRAME_LENGTH, MAX_LOGS_IN_FILE};

/// Literal line that begins every sub-log in a file.
pub const LOG_START_MARKER: &[u8] =
    b"H Product:Blackbox flight data recorder by Nicholas Sherlock\n";

/// Find the start offset of every sub-log, capped at [`MAX_LOGS_IN_FILE`].
pub fn index_sub_logs(data: &[u8]) -> Vec<usize> {
    let mut offsets = Vec::new();
    let mut search_from = 0;

    while offsets.len() < MAX_LOGS_IN_FILE {
        let found = data[search_from..]
            .windows(LOG_START_MARKER.len())
            .position(|window| window == LOG_START_MARKER);

        match found {
            Some(relative) => {
                offsets.push(search_from + relative);
                search_from += relative + LOG_START_MARKER.len();
            }
            None => break,
        }
    }

    offsets
}

enum ParserState {
    Header,
    Data,
}

/// Main-frame history kept as three equally sized buffers. After an accepted
/// intra frame both reference buffers hold copies of it, because nothing
/// older than the new reference may be looked at; after an accepted inter
/// frame the references shift back by one.
struct MainHistory {
    current: Vec<i32>,
    previous: Vec<i32>,
    previous2: Vec<i32>,
}

/// One parse of one sub-log: drives the header and data sections over the
/// stream and reports frames, events and metadata to the handler as they
/// complete.
pub(crate) struct LogDecoder<'d, 'a> {
    stream: DataStream<'a>,
    header: &'d mut LogHeader,
    stats: &'d mut LogStats,
    handler: &'d mut dyn DecodeHandler,
    raw: bool,

    main_stream_is_valid: bool,
    gps_home_is_valid: bool,
    last_event: LogEvent,
    /// Frame awaiting its boundary check, set once its parse has run
    last_frame_type: Option<FrameKind>,
    /// Offset of the pending frame's first field byte
    frame_start: usize,
    premature_eof: bool,
    /// The pending frame's type had no usable field definition
    frame_def_missing: bool,
    last_main_frame_iteration: Option<u32>,
    last_skipped_frames: u32,

    p_def_usable: bool,
    g_def_usable: bool,
    h_def_usable: bool,

    history: MainHistory,
    /// Slot 0 is the decode target; slot 1 is the published home position
    /// that the home-coordinate predictors reference
    gps_home: [Vec<i32>; 2],
    last_gps: Vec<i32>,
}

impl<'d, 'a> LogDecoder<'d, 'a> {
    pub(crate) fn new(
        data: &'a [u8],
        header: &'d mut LogHeader,
        stats: &'d mut LogStats,
        handler: &'d mut dyn DecodeHandler,
        raw: bool,
    ) -> Self {
        Self {
            stream: DataStream::new(data),
            header,
            stats,
            handler,
            raw,
            main_stream_is_valid: false,
            gps_home_is_valid: false,
            last_event: LogEvent::Invalid,
            last_frame_type: None,
            frame_start: 0,
            premature_eof: false,
            frame_def_missing: false,
            last_main_frame_iteration: None,
            last_skipped_frames: 0,
            p_def_usable: false,
            g_def_usable: false,
            h_def_usable: false,
            history: MainHistory {
                current: Vec::new(),
                previous: Vec::new(),
                previous2: Vec::new(),
            },
            gps_home: [Vec::new(), Vec::new()],
            last_gps: Vec::new(),
        }
    }

    /// Parse the sub-log to its end. `Ok(false)` means the header section
    /// never gave way to data frames; recoverable frame corruption is
    /// handled internally and still ends in `Ok(true)`.
    pub(crate) fn run(&mut self) -> Result<bool> {
        let mut state = ParserState::Header;

        loop {
            match state {
                ParserState::Header => match self.stream.read_byte() {
                    Err(_) => return Ok(false),
                    Ok(b'H') => parse_header_line(&mut self.stream, self.header),
                    Ok(byte) => {
                        if FrameKind::from_marker(byte).is_some() {
                            self.stream.unread_byte();
                            self.begin_data_section()?;
                            state = ParserState::Data;
                        }
                        // Anything else before the first frame is noise
                    }
                },
                ParserState::Data => {
                    if !self.data_iteration()? {
                        return Ok(true);
                    }
                }
            }
        }
    }

    /// Validate the field tables, rewrite the GPS home-coordinate predictor
    /// pairs, size the history buffers and announce the metadata.
    fn begin_data_section(&mut self) -> Result<()> {
        let main_def = &self.header.i_frame_def;
        if main_def.field_names.is_empty() {
            return Err(DecodeError::MissingFieldDefinitions);
        }
        if !main_def.is_consistent() {
            return Err(DecodeError::InvalidHeader(
                "main frame predictors and encodings do not cover the field names".to_string(),
            ));
        }

        let field_count = main_def.count();
        self.p_def_usable = self.header.p_frame_def.predictors.len() == field_count
            && self.header.p_frame_def.encodings.len() == field_count;
        self.g_def_usable = self.header.g_frame_def.is_usable();
        self.h_def_usable = self.header.h_frame_def.is_usable();

        // Home coordinates are declared as a latitude/longitude pair under
        // one predictor code; rewrite the second of each pair so the
        // predictor engine can tell them apart
        let g_predictors = &mut self.header.g_frame_def.predictors;
        for i in 1..g_predictors.len() {
            if g_predictors[i - 1] == PREDICT_HOME_COORD && g_predictors[i] == PREDICT_HOME_COORD {
                g_predictors[i] = PREDICT_HOME_COORD_1;
            }
        }

        self.history.current = vec![0; field_count];
        self.history.previous = vec![0; field_count];
        self.history.previous2 = vec![0; field_count];
        self.gps_home = [
            vec![0; self.header.h_frame_def.count()],
            vec![0; self.header.h_frame_def.count()],
        ];
        self.last_gps = vec![0; self.header.g_frame_def.count()];

        self.handler.on_metadata(self.header);

        Ok(())
    }

    /// One turn of the data loop: read a byte of lookahead, settle the fate
    /// of the pending frame, then start parsing the next one. Returns
    /// `Ok(false)` when the sub-log is exhausted.
    fn data_iteration(&mut self) -> Result<bool> {
        let command = self.stream.read_byte().ok();

        if let Some(last_kind) = self.last_frame_type {
            let last_frame_size = self.stream.pos - self.frame_start;
            let next_kind = command.and_then(FrameKind::from_marker);

            // Seeing the start of a new frame (or a clean end of the log)
            // is what validates the frame before it
            let looks_complete = last_frame_size <= MAX_FRAME_LENGTH
                && !self.frame_def_missing
                && (next_kind.is_some() || (command.is_none() && !self.premature_eof));

            if looks_complete {
                let frame_stats = self.stats.frame_mut(last_kind);
                frame_stats.bytes += last_frame_size as u64;
                frame_stats.size_count[last_frame_size] += 1;
                frame_stats.valid_count += 1;
                self.stats.total_bytes += last_frame_size as u64;

                self.complete_frame(last_kind, last_frame_size);
                self.last_frame_type = None;
            } else {
                self.main_stream_is_valid = false;
                self.stats.frame_mut(last_kind).corrupt_count += 1;
                self.stats.total_corrupt_frames += 1;

                self.handler.on_frame(
                    self.header,
                    &FrameEvent {
                        kind: last_kind,
                        stream_valid: false,
                        values: None,
                        field_count: 0,
                        offset: self.frame_start,
                        size: last_frame_size,
                    },
                );

                // Resume the frame search one byte into the corrupt frame,
                // so a truncated frame cannot swallow the real frame that
                // follows it
                self.stream.set_position(self.frame_start);
                self.last_frame_type = None;
                self.premature_eof = false;
                self.frame_def_missing = false;
                return Ok(true);
            }
        }

        let Some(command) = command else {
            return Ok(false);
        };

        match FrameKind::from_marker(command) {
            Some(kind) => {
                self.frame_start = self.stream.pos;
                self.frame_def_missing = false;
                self.parse_frame(kind)?;
                self.premature_eof = self.stream.eof;
                self.last_frame_type = Some(kind);
            }
            None => {
                self.main_stream_is_valid = false;
            }
        }

        Ok(true)
    }

    fn parse_frame(&mut self, kind: FrameKind) -> Result<()> {
        let result = match kind {
            FrameKind::Intra => self.parse_intra_frame(),
            FrameKind::Inter => self.parse_inter_frame(),
            FrameKind::Gps => self.parse_gps_frame(),
            FrameKind::GpsHome => self.parse_gps_home_frame(),
            FrameKind::Event => self.parse_event_frame(),
        };

        match result {
            // Running off the end of the log is recoverable: the
            // premature-EOF flag makes the boundary check discard the frame
            Err(DecodeError::UnexpectedEof) => Ok(()),
            other => other,
        }
    }

    fn parse_intra_frame(&mut self) -> Result<()> {
        let field_count = self.header.i_frame_def.count();

        parse_frame_fields(
            &mut self.stream,
            self.header,
            &self.header.i_frame_def,
            &self.header.i_frame_def,
            field_count,
            &mut self.history.current,
            None,
            None,
            &self.gps_home[1],
            0,
            self.raw,
        )
    }

    fn parse_inter_frame(&mut self) -> Result<()> {
        let skipped = count_intentionally_skipped_frames(self.header, self.last_main_frame_iteration);
        self.last_skipped_frames = skipped;

        if !self.p_def_usable {
            self.frame_def_missing = true;
            return Ok(());
        }

        let field_count = self.header.i_frame_def.count();

        parse_frame_fields(
            &mut self.stream,
            self.header,
            &self.header.p_frame_def,
            &self.header.i_frame_def,
            field_count,
            &mut self.history.current,
            Some(&self.history.previous),
            Some(&self.history.previous2),
            &self.gps_home[1],
            skipped,
            self.raw,
        )
    }

    fn parse_gps_frame(&mut self) -> Result<()> {
        if !self.g_def_usable {
            self.frame_def_missing = true;
            return Ok(());
        }

        let field_count = self.header.g_frame_def.count();

        parse_frame_fields(
            &mut self.stream,
            self.header,
            &self.header.g_frame_def,
            &self.header.g_frame_def,
            field_count,
            &mut self.last_gps,
            None,
            None,
            &self.gps_home[1],
            0,
            self.raw,
        )
    }

    fn parse_gps_home_frame(&mut self) -> Result<()> {
        if !self.h_def_usable {
            self.frame_def_missing = true;
            return Ok(());
        }

        let field_count = self.header.h_frame_def.count();
        let (target, published) = self.gps_home.split_at_mut(1);

        parse_frame_fields(
            &mut self.stream,
            self.header,
            &self.header.h_frame_def,
            &self.header.h_frame_def,
            field_count,
            &mut target[0],
            None,
            None,
            &published[0],
            0,
            self.raw,
        )
    }

    fn parse_event_frame(&mut self) -> Result<()> {
        self.last_event = parse_event_frame(&mut self.stream)?;
        Ok(())
    }

    fn complete_frame(&mut self, kind: FrameKind, size: usize) {
        match kind {
            FrameKind::Intra => self.complete_intra_frame(size),
            FrameKind::Inter => self.complete_inter_frame(size),
            FrameKind::Gps => self.complete_gps_frame(size),
            FrameKind::GpsHome => self.complete_gps_home_frame(size),
            FrameKind::Event => self.handler.on_event(self.header, &self.last_event),
        }
    }

    fn complete_intra_frame(&mut self, size: usize) {
        let iteration = self.current_field(FIELD_ITERATION) as u32;
        let time = self.current_field(FIELD_TIME) as u32;

        // An intra frame re-synchronises the stream, but only if it does
        // not rewind the log's clock
        let accept = self.raw
            || (iteration as i64 >= self.field_max(FIELD_ITERATION)
                && time as i64 >= self.field_max(FIELD_TIME));

        if accept {
            self.stats.intentionally_absent_iterations += count_intentionally_skipped_frames_to(
                self.header,
                self.last_main_frame_iteration,
                iteration,
            );
            self.last_main_frame_iteration = Some(iteration);
            self.main_stream_is_valid = true;
            self.stats
                .update_field_stats(&self.history.current, &self.header.i_frame_def);
        } else {
            self.main_stream_is_valid = false;
        }

        self.handler.on_frame(
            self.header,
            &FrameEvent {
                kind: FrameKind::Intra,
                stream_valid: self.main_stream_is_valid,
                values: Some(&self.history.current),
                field_count: self.history.current.len(),
                offset: self.frame_start,
                size,
            },
        );

        if self.main_stream_is_valid {
            // The frame we just accepted is the only reference the next
            // inter frame may look back to
            self.history.previous.copy_from_slice(&self.history.current);
            self.history
                .previous2
                .copy_from_slice(&self.history.current);
        }
    }

    fn complete_inter_frame(&mut self, size: usize) {
        if self.main_stream_is_valid {
            self.last_main_frame_iteration = Some(self.current_field(FIELD_ITERATION) as u32);
            self.stats.intentionally_absent_iterations += self.last_skipped_frames;
            self.stats
                .update_field_stats(&self.history.current, &self.header.i_frame_def);
        } else {
            // An inter frame cannot re-synchronise the stream on its own
            self.stats.frame_mut(FrameKind::Inter).desync_count += 1;
        }

        self.handler.on_frame(
            self.header,
            &FrameEvent {
                kind: FrameKind::Inter,
                stream_valid: self.main_stream_is_valid,
                values: Some(&self.history.current),
                field_count: self.history.current.len(),
                offset: self.frame_start,
                size,
            },
        );

        if self.main_stream_is_valid {
            std::mem::swap(&mut self.history.previous2, &mut self.history.previous);
            self.history.previous.copy_from_slice(&self.history.current);
        }
    }

    fn complete_gps_frame(&mut self, size: usize) {
        self.handler.on_frame(
            self.header,
            &FrameEvent {
                kind: FrameKind::Gps,
                stream_valid: self.gps_home_is_valid,
                values: Some(&self.last_gps),
                field_count: self.last_gps.len(),
                offset: self.frame_start,
                size,
            },
        );
    }

    fn complete_gps_home_frame(&mut self, size: usize) {
        let (target, published) = self.gps_home.split_at_mut(1);
        published[0].copy_from_slice(&target[0]);
        self.gps_home_is_valid = true;

        self.handler.on_frame(
            self.header,
            &FrameEvent {
                kind: FrameKind::GpsHome,
                stream_valid: true,
                values: Some(&self.gps_home[1]),
                field_count: self.gps_home[1].len(),
                offset: self.frame_start,
                size,
            },
        );
    }

    fn current_field(&self, index: usize) -> i32 {
        self.history.current.get(index).copied().unwrap_or(0)
    }

    fn field_max(&self, index: usize) -> i64 {
        self.stats.field.get(index).map_or(0, |field| field.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_sub_logs() {
        let mut data = Vec::new();
        data.extend_from_slice(LOG_START_MARKER);
        data.extend_from_slice(b"H Data version:2\n");
        let second = data.len();
        data.extend_from_slice(LOG_START_MARKER);
        data.extend_from_slice(&[0x01, 0x02]);

        assert_eq!(index_sub_logs(&data), vec![0, second]);
    }

    #[test]
    fn test_index_sub_logs_empty() {
        assert!(index_sub_logs(b"no marker here").is_empty());
    }
}
