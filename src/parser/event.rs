use crate::error::Result;
use crate::parser::stream::DataStream;
use crate::types::LogEvent;

// Event IDs written by the flight controller
const EVENT_SYNC_BEEP: u8 = 0;
const EVENT_AUTOTUNE_CYCLE_START: u8 = 10;
const EVENT_AUTOTUNE_CYCLE_RESULT: u8 = 11;

/// Parse the payload of an `E` frame.
///
/// Unrecognised event IDs produce [`LogEvent::Invalid`] without consuming
/// payload bytes; whether the surrounding frame survives is decided by the
/// orchestrator's boundary check like any other frame.
pub fn parse_event_frame(stream: &mut DataStream) -> Result<LogEvent> {
    let event_id = stream.read_byte()?;

    let event = match event_id {
        EVENT_SYNC_BEEP => LogEvent::SyncBeep {
            time: stream.read_unsigned_vb()?,
        },
        EVENT_AUTOTUNE_CYCLE_START => LogEvent::AutotuneCycleStart {
            phase: stream.read_byte()?,
            cycle: stream.read_byte()?,
            p: stream.read_byte()?,
            i: stream.read_byte()?,
            d: stream.read_byte()?,
        },
        EVENT_AUTOTUNE_CYCLE_RESULT => LogEvent::AutotuneCycleResult {
            overshot: stream.read_byte()?,
            p: stream.read_byte()?,
            i: stream.read_byte()?,
            d: stream.read_byte()?,
        },
        _ => LogEvent::Invalid,
    };

    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_beep() {
        let data = vec![0x00, 0x04];
        let mut stream = DataStream::new(&data);
        assert_eq!(
            parse_event_frame(&mut stream).unwrap(),
            LogEvent::SyncBeep { time: 4 }
        );
    }

    #[test]
    fn test_sync_beep_multibyte_time() {
        // 1000 as variable-byte
        let data = vec![0x00, 0xe8, 0x07];
        let mut stream = DataStream::new(&data);
        assert_eq!(
            parse_event_frame(&mut stream).unwrap(),
            LogEvent::SyncBeep { time: 1000 }
        );
    }

    #[test]
    fn test_autotune_cycle_start() {
        let data = vec![10, 1, 2, 40, 30, 20];
        let mut stream = DataStream::new(&data);
        assert_eq!(
            parse_event_frame(&mut stream).unwrap(),
            LogEvent::AutotuneCycleStart {
                phase: 1,
                cycle: 2,
                p: 40,
                i: 30,
                d: 20,
            }
        );
    }

    #[test]
    fn test_autotune_cycle_result() {
        let data = vec![11, 1, 45, 35, 25];
        let mut stream = DataStream::new(&data);
        assert_eq!(
            parse_event_frame(&mut stream).unwrap(),
            LogEvent::AutotuneCycleResult {
                overshot: 1,
                p: 45,
                i: 35,
                d: 25,
            }
        );
    }

    #[test]
    fn test_unknown_event_reads_no_payload() {
        let data = vec![99, 0x55];
        let mut stream = DataStream::new(&data);
        assert_eq!(parse_event_frame(&mut stream).unwrap(), LogEvent::Invalid);
        assert_eq!(stream.pos, 1);
    }
}
