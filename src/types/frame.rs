#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The five frame markers a data section can contain. Any other byte at a
/// frame boundary is corruption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FrameKind {
    /// `I`: self-contained reference frame
    Intra,
    /// `P`: delta frame against up to two prior main frames
    Inter,
    /// `G`: GPS position frame, predicted against the home position
    Gps,
    /// `H`: GPS home position frame
    GpsHome,
    /// `E`: event frame
    Event,
}

impl FrameKind {
    pub const ALL: [FrameKind; 5] = [
        FrameKind::Intra,
        FrameKind::Inter,
        FrameKind::Gps,
        FrameKind::GpsHome,
        FrameKind::Event,
    ];

    pub fn from_marker(byte: u8) -> Option<FrameKind> {
        match byte {
            b'I' => Some(FrameKind::Intra),
            b'P' => Some(FrameKind::Inter),
            b'G' => Some(FrameKind::Gps),
            b'H' => Some(FrameKind::GpsHome),
            b'E' => Some(FrameKind::Event),
            _ => None,
        }
    }

    pub fn marker(self) -> u8 {
        match self {
            FrameKind::Intra => b'I',
            FrameKind::Inter => b'P',
            FrameKind::Gps => b'G',
            FrameKind::GpsHome => b'H',
            FrameKind::Event => b'E',
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            FrameKind::Intra => 0,
            FrameKind::Inter => 1,
            FrameKind::Gps => 2,
            FrameKind::GpsHome => 3,
            FrameKind::Event => 4,
        }
    }
}

/// One frame attempt reported to [`DecodeHandler::on_frame`].
///
/// A corrupt frame carries no values and a field count of zero; its size
/// still reflects how many bytes the failed attempt spanned.
///
/// [`DecodeHandler::on_frame`]: crate::DecodeHandler::on_frame
#[derive(Debug)]
pub struct FrameEvent<'a> {
    pub kind: FrameKind,
    /// Whether the stream was synchronised when the frame completed. GPS
    /// frames seen before any home frame are delivered with this false.
    pub stream_valid: bool,
    pub values: Option<&'a [i32]>,
    pub field_count: usize,
    /// Byte offset of the frame's first field, relative to the sub-log start
    pub offset: usize,
    pub size: usize,
}

/// Decoded event frame payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LogEvent {
    SyncBeep {
        time: u32,
    },
    AutotuneCycleStart {
        phase: u8,
        cycle: u8,
        p: u8,
        i: u8,
        d: u8,
    },
    AutotuneCycleResult {
        overshot: u8,
        p: u8,
        i: u8,
        d: u8,
    },
    /// Event ID the decoder does not recognise. The frame itself is not
    /// treated as corrupt.
    Invalid,
}
