use crate::parser::stream::DataStream;
use crate::types::{FirmwareType, FrameDefinition, LogHeader};

/// Longest header line the parser will consider; anything longer is dropped.
const HEADER_LINE_MAX: usize = 1024;

/// Parse one `H <key>:<value>\n` header line from the stream.
///
/// The leading `H` has already been consumed by the orchestrator. Lines
/// without a colon, containing a NUL, truncated by EOF, or longer than the
/// line buffer are dropped without complaint; unknown keys are ignored.
pub fn parse_header_line(stream: &mut DataStream, header: &mut LogHeader) {
    match stream.read_byte() {
        Ok(b' ') => {}
        Ok(_) => {
            // Not a header line after all; leave the byte for the caller
            stream.unread_byte();
            return;
        }
        Err(_) => return,
    }

    let mut line: Vec<u8> = Vec::with_capacity(128);
    let mut separator = None;
    let mut terminated = false;

    for _ in 0..HEADER_LINE_MAX {
        match stream.read_byte() {
            Ok(b'\n') => {
                terminated = true;
                break;
            }
            Ok(0) => return,
            Ok(b':') if separator.is_none() => {
                separator = Some(line.len());
                line.push(b':');
            }
            Ok(b) => line.push(b),
            Err(_) => return,
        }
    }

    if !terminated {
        return;
    }

    let Some(separator) = separator else { return };

    let Ok(line_str) = std::str::from_utf8(&line) else {
        return;
    };

    header.all_headers.push(format!("H {}", line_str));

    let field_name = &line_str[..separator];
    let field_value = &line_str[separator + 1..];

    apply_header_field(header, field_name, field_value);
}

fn apply_header_field(header: &mut LogHeader, name: &str, value: &str) {
    match name {
        "Field I name" => header.set_main_field_names(split_field_names(value)),
        // Inter frames reuse the main field names; the P name list is kept
        // for reference only
        "Field P name" => header.p_frame_def.field_names = split_field_names(value),
        "Field G name" => header.g_frame_def.field_names = split_field_names(value),
        "Field H name" => header.set_home_field_names(split_field_names(value)),
        "Field I signed" => {
            header.i_frame_def.signed = value.split(',').map(|s| s.trim() == "1").collect();
        }
        "I interval" => {
            header.frame_interval_i = value.trim().parse::<i64>().unwrap_or(1).max(1) as u32;
        }
        "P interval" => {
            if let Some((num, denom)) = value.trim().split_once('/') {
                if let (Ok(num), Ok(denom)) = (num.parse::<u32>(), denom.parse::<u32>()) {
                    header.frame_interval_p_num = num;
                    header.frame_interval_p_denom = denom;
                }
            }
        }
        "Data version" => {
            if let Ok(version) = value.trim().parse() {
                header.data_version = version;
            }
        }
        "Firmware type" => {
            header.firmware_type = if value.trim().starts_with("Cleanflight") {
                FirmwareType::Cleanflight
            } else {
                FirmwareType::Baseflight
            };
        }
        "Firmware revision" => header.firmware_revision = value.trim().to_string(),
        "Board information" => header.board_info = value.trim().to_string(),
        "Craft name" => header.craft_name = value.trim().to_string(),
        "minthrottle" => parse_u16_field(value, &mut header.min_throttle),
        "maxthrottle" => parse_u16_field(value, &mut header.max_throttle),
        "rcRate" => parse_u16_field(value, &mut header.rc_rate),
        "vbatscale" => parse_u16_field(value, &mut header.vbat_scale),
        "vbatref" => parse_u16_field(value, &mut header.vbat_ref),
        "acc_1G" => parse_u16_field(value, &mut header.acc_1g),
        "vbatcellvoltage" => {
            let parts: Vec<_> = value.split(',').map(|s| s.trim().parse::<u16>()).collect();
            if let [Ok(min), Ok(warning), Ok(max)] = parts.as_slice() {
                header.vbat_min_cell_voltage = *min;
                header.vbat_warning_cell_voltage = *warning;
                header.vbat_max_cell_voltage = *max;
            }
        }
        "gyro.scale" => {
            let hex = value.trim();
            let hex = hex.strip_prefix("0x").or_else(|| hex.strip_prefix("0X"));
            if let Some(Ok(bits)) = hex.map(|h| u32::from_str_radix(h, 16)) {
                header.gyro_scale = f32::from_bits(bits);

                // Cleanflight logs the scale in degrees per second per LSB,
                // Baseflight already premultiplied it into radians
                if header.firmware_type == FirmwareType::Cleanflight {
                    header.gyro_scale =
                        (header.gyro_scale as f64 * (std::f64::consts::PI / 180.0) * 0.000001)
                            as f32;
                }
            }
        }
        _ => {
            if let Some(marker) = field_table_marker(name, " predictor") {
                if let Some(def) = frame_def_mut(header, marker) {
                    def.predictors = split_integers(value);
                }
            } else if let Some(marker) = field_table_marker(name, " encoding") {
                if let Some(def) = frame_def_mut(header, marker) {
                    def.encodings = split_integers(value).iter().map(|&e| e as u8).collect();
                }
            }
        }
    }
}

/// Recognise `Field X predictor` / `Field X encoding` keys for an arbitrary
/// single-byte frame marker `X`.
fn field_table_marker(name: &str, suffix: &str) -> Option<u8> {
    if name.len() == "Field X".len() + suffix.len()
        && name.starts_with("Field ")
        && name.ends_with(suffix)
    {
        Some(name.as_bytes()["Field ".len()])
    } else {
        None
    }
}

fn frame_def_mut(header: &mut LogHeader, marker: u8) -> Option<&mut FrameDefinition> {
    match marker {
        b'I' => Some(&mut header.i_frame_def),
        b'P' => Some(&mut header.p_frame_def),
        b'G' => Some(&mut header.g_frame_def),
        b'H' => Some(&mut header.h_frame_def),
        _ => None,
    }
}

fn split_field_names(value: &str) -> Vec<String> {
    value.split(',').map(|s| s.trim().to_string()).collect()
}

fn split_integers(value: &str) -> Vec<u16> {
    value
        .split(',')
        .map(|s| s.trim().parse().unwrap_or(0))
        .collect()
}

fn parse_u16_field(value: &str, target: &mut u16) {
    if let Ok(parsed) = value.trim().parse() {
        *target = parsed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_lines(text: &str) -> LogHeader {
        let mut stream = DataStream::new(text.as_bytes());
        let mut header = LogHeader::default();

        while let Ok(byte) = stream.read_byte() {
            if byte == b'H' {
                parse_header_line(&mut stream, &mut header);
            }
        }

        header
    }

    #[test]
    fn test_field_tables() {
        let header = parse_lines(
            "H Field I name:loopIteration,time,motor[0]\n\
             H Field I signed:0,0,1\n\
             H Field I predictor:0,0,4\n\
             H Field I encoding:1,1,0\n\
             H Field P predictor:6,2,3\n\
             H Field P encoding:9,0,0\n",
        );

        assert_eq!(
            header.i_frame_def.field_names,
            vec!["loopIteration", "time", "motor[0]"]
        );
        assert_eq!(header.i_frame_def.signed, vec![false, false, true]);
        assert_eq!(header.i_frame_def.predictors, vec![0, 0, 4]);
        assert_eq!(header.i_frame_def.encodings, vec![1, 1, 0]);
        assert_eq!(header.p_frame_def.predictors, vec![6, 2, 3]);
        assert_eq!(header.p_frame_def.encodings, vec![9, 0, 0]);
        assert_eq!(header.motor0_index, Some(2));
        assert!(header.i_frame_def.is_usable());
    }

    #[test]
    fn test_home_field_indexes() {
        let header = parse_lines(
            "H Field H name:GPS_home[0],GPS_home[1]\n\
             H Field H predictor:0,0\n\
             H Field H encoding:0,0\n",
        );
        assert_eq!(header.home0_index, Some(0));
        assert_eq!(header.home1_index, Some(1));
    }

    #[test]
    fn test_intervals() {
        let header = parse_lines("H I interval:32\nH P interval:1/2\n");
        assert_eq!(header.frame_interval_i, 32);
        assert_eq!(header.frame_interval_p_num, 1);
        assert_eq!(header.frame_interval_p_denom, 2);

        // The I interval is clamped to at least 1
        let header = parse_lines("H I interval:0\n");
        assert_eq!(header.frame_interval_i, 1);
    }

    #[test]
    fn test_tuning_constants() {
        let header = parse_lines(
            "H minthrottle:1000\nH maxthrottle:2000\nH rcRate:100\n\
             H vbatscale:112\nH vbatref:1780\nH acc_1G:512\n\
             H vbatcellvoltage:32,34,44\nH Data version:2\n",
        );
        assert_eq!(header.min_throttle, 1000);
        assert_eq!(header.max_throttle, 2000);
        assert_eq!(header.rc_rate, 100);
        assert_eq!(header.vbat_scale, 112);
        assert_eq!(header.vbat_ref, 1780);
        assert_eq!(header.acc_1g, 512);
        assert_eq!(header.vbat_min_cell_voltage, 32);
        assert_eq!(header.vbat_warning_cell_voltage, 34);
        assert_eq!(header.vbat_max_cell_voltage, 44);
        assert_eq!(header.data_version, 2);
    }

    #[test]
    fn test_gyro_scale_baseflight() {
        let header = parse_lines("H gyro.scale:0x3f800000\n");
        assert_eq!(header.firmware_type, FirmwareType::Baseflight);
        assert!((header.gyro_scale - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_gyro_scale_cleanflight_is_converted_to_radians() {
        let header = parse_lines("H Firmware type:Cleanflight\nH gyro.scale:0x3f800000\n");
        assert_eq!(header.firmware_type, FirmwareType::Cleanflight);
        let expected = (std::f64::consts::PI / 180.0) * 0.000001;
        assert!((header.gyro_scale as f64 - expected).abs() < 1e-12);
    }

    #[test]
    fn test_malformed_lines_are_dropped() {
        // No colon, NUL byte, unknown key: none of these may disturb state
        let header = parse_lines("H just some text\nH bad\0key:1\nH no_such_key:17\n");
        assert!(header.all_headers.len() <= 1);
        assert_eq!(header.i_frame_def.count(), 0);
    }

    #[test]
    fn test_overlong_line_is_dropped() {
        let mut text = String::from("H key:");
        text.push_str(&"x".repeat(2000));
        text.push('\n');
        text.push_str("H minthrottle:1001\n");

        let header = parse_lines(&text);
        assert_eq!(header.min_throttle, 1001);
    }
}
