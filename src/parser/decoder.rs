use crate::error::{DecodeError, Result};
use crate::parser::stream::DataStream;
use crate::types::LogHeader;

// Field encoding codes as they appear in `Field X encoding` header lines
pub const ENCODING_SIGNED_VB: u8 = 0;
pub const ENCODING_UNSIGNED_VB: u8 = 1;
pub const ENCODING_NEG_14BIT: u8 = 3;
pub const ENCODING_TAG8_8SVB: u8 = 6;
pub const ENCODING_TAG2_3S32: u8 = 7;
pub const ENCODING_TAG8_4S16: u8 = 8;
pub const ENCODING_NULL: u8 = 9;

// Field predictor codes as they appear in `Field X predictor` header lines
pub const PREDICT_0: u16 = 0;
pub const PREDICT_PREVIOUS: u16 = 1;
pub const PREDICT_STRAIGHT_LINE: u16 = 2;
pub const PREDICT_AVERAGE_2: u16 = 3;
pub const PREDICT_MINTHROTTLE: u16 = 4;
pub const PREDICT_MOTOR_0: u16 = 5;
pub const PREDICT_INC: u16 = 6;
pub const PREDICT_HOME_COORD: u16 = 7;
pub const PREDICT_1500: u16 = 8;
pub const PREDICT_VBATREF: u16 = 9;

/// Never appears on the wire: home-coordinate predictors are declared in
/// latitude/longitude pairs under one code, and the longitude half of each
/// pair is rewritten to this before the data section is decoded.
pub const PREDICT_HOME_COORD_1: u16 = 256;

/// Decode one scalar-encoded field value from the stream.
///
/// Group encodings (Tag2_3S32, Tag8_4S16, Tag8_8SVB) are handled by the
/// frame parser because they cover a run of fields.
pub fn decode_field_value(stream: &mut DataStream, encoding: u8) -> Result<i32> {
    match encoding {
        ENCODING_SIGNED_VB => stream.read_signed_vb(),
        ENCODING_UNSIGNED_VB => Ok(stream.read_unsigned_vb()? as i32),
        ENCODING_NEG_14BIT => stream.read_neg_14bit(),
        ENCODING_NULL => Ok(0),
        _ => Err(DecodeError::InvalidEncoding(encoding)),
    }
}

/// Recover a field value from its stream-carried residual.
///
/// All additions wrap in unsigned 32-bit arithmetic; the result is
/// unconditionally reinterpreted as signed, matching the way the flight
/// controller computed the residual in the first place. Predictors that
/// need history degrade to the raw value when no reference frame exists yet.
#[allow(clippy::too_many_arguments)]
pub fn apply_predictor(
    header: &LogHeader,
    field_index: usize,
    predictor: u16,
    signed: bool,
    raw_value: i32,
    current: &[i32],
    previous: Option<&[i32]>,
    previous2: Option<&[i32]>,
    gps_home: &[i32],
) -> Result<i32> {
    let mut value = raw_value as u32;

    match predictor {
        PREDICT_0 => {}
        PREDICT_PREVIOUS => {
            if let Some(previous) = previous {
                value = value.wrapping_add(previous[field_index] as u32);
            }
        }
        PREDICT_STRAIGHT_LINE => {
            if let (Some(previous), Some(previous2)) = (previous, previous2) {
                let prediction = (previous[field_index] as u32)
                    .wrapping_mul(2)
                    .wrapping_sub(previous2[field_index] as u32);
                value = value.wrapping_add(prediction);
            }
        }
        PREDICT_AVERAGE_2 => {
            if let (Some(previous), Some(previous2)) = (previous, previous2) {
                let prediction = if signed {
                    (previous[field_index].wrapping_add(previous2[field_index]) >> 1) as u32
                } else {
                    (previous[field_index] as u32).wrapping_add(previous2[field_index] as u32) >> 1
                };
                value = value.wrapping_add(prediction);
            }
        }
        PREDICT_MINTHROTTLE => {
            value = value.wrapping_add(header.min_throttle as u32);
        }
        PREDICT_MOTOR_0 => {
            let motor0 = header
                .motor0_index
                .ok_or(DecodeError::MissingFieldIndex("motor[0]"))?;
            value = value.wrapping_add(current[motor0] as u32);
        }
        PREDICT_HOME_COORD => {
            let home0 = header
                .home0_index
                .ok_or(DecodeError::MissingFieldIndex("GPS_home[0]"))?;
            value = value.wrapping_add(gps_home[home0] as u32);
        }
        PREDICT_HOME_COORD_1 => {
            let home1 = header
                .home1_index
                .ok_or(DecodeError::MissingFieldIndex("GPS_home[1]"))?;
            value = value.wrapping_add(gps_home[home1] as u32);
        }
        PREDICT_1500 => {
            value = value.wrapping_add(1500);
        }
        PREDICT_VBATREF => {
            value = value.wrapping_add(header.vbat_ref as u32);
        }
        _ => return Err(DecodeError::InvalidPredictor(predictor)),
    }

    Ok(value as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_previous_predictor_without_history_is_identity() {
        let header = LogHeader::default();
        let value = apply_predictor(
            &header,
            0,
            PREDICT_PREVIOUS,
            false,
            17,
            &[0],
            None,
            None,
            &[],
        )
        .unwrap();
        assert_eq!(value, 17);
    }

    #[test]
    fn test_previous_predictor() {
        let header = LogHeader::default();
        let value = apply_predictor(
            &header,
            0,
            PREDICT_PREVIOUS,
            false,
            4,
            &[0],
            Some(&[10]),
            None,
            &[],
        )
        .unwrap();
        assert_eq!(value, 14);
    }

    #[test]
    fn test_straight_line_predictor() {
        let header = LogHeader::default();
        let value = apply_predictor(
            &header,
            0,
            PREDICT_STRAIGHT_LINE,
            true,
            3,
            &[0],
            Some(&[100]),
            Some(&[80]),
            &[],
        )
        .unwrap();
        // 2 * 100 - 80 + 3
        assert_eq!(value, 123);
    }

    #[test]
    fn test_average_2_signed_uses_arithmetic_shift() {
        let header = LogHeader::default();
        let value = apply_predictor(
            &header,
            0,
            PREDICT_AVERAGE_2,
            true,
            0,
            &[0],
            Some(&[-3]),
            Some(&[-4]),
            &[],
        )
        .unwrap();
        // (-3 + -4) >> 1 rounds toward negative infinity
        assert_eq!(value, -4);
    }

    #[test]
    fn test_average_2_unsigned_uses_logical_shift() {
        let header = LogHeader::default();
        let value = apply_predictor(
            &header,
            0,
            PREDICT_AVERAGE_2,
            false,
            0,
            &[0],
            Some(&[-2]),
            Some(&[-2]),
            &[],
        )
        .unwrap();
        // The wrapped sum 0xfffffffc shifted logically gives 0x7ffffffe
        assert_eq!(value, 0x7ffffffe);
    }

    #[test]
    fn test_minthrottle_and_constants() {
        let mut header = LogHeader::default();
        header.min_throttle = 1000;
        header.vbat_ref = 400;

        let value = apply_predictor(
            &header,
            0,
            PREDICT_MINTHROTTLE,
            false,
            8,
            &[0],
            None,
            None,
            &[],
        )
        .unwrap();
        assert_eq!(value, 1008);

        let value =
            apply_predictor(&header, 0, PREDICT_1500, false, -2, &[0], None, None, &[]).unwrap();
        assert_eq!(value, 1498);

        let value =
            apply_predictor(&header, 0, PREDICT_VBATREF, false, -1, &[0], None, None, &[]).unwrap();
        assert_eq!(value, 399);
    }

    #[test]
    fn test_motor_0_predictor_reads_current_frame() {
        let mut header = LogHeader::default();
        header.motor0_index = Some(0);
        let value = apply_predictor(
            &header,
            1,
            PREDICT_MOTOR_0,
            false,
            -5,
            &[1200, 0],
            None,
            None,
            &[],
        )
        .unwrap();
        assert_eq!(value, 1195);
    }

    #[test]
    fn test_motor_0_predictor_without_index_is_fatal() {
        let header = LogHeader::default();
        let result = apply_predictor(
            &header,
            0,
            PREDICT_MOTOR_0,
            false,
            0,
            &[0],
            None,
            None,
            &[],
        );
        assert!(matches!(result, Err(DecodeError::MissingFieldIndex(_))));
    }

    #[test]
    fn test_home_coord_predictors() {
        let mut header = LogHeader::default();
        header.home0_index = Some(0);
        header.home1_index = Some(1);
        let gps_home = [520_000_000, 44_000_000];

        let lat = apply_predictor(
            &header,
            0,
            PREDICT_HOME_COORD,
            true,
            10,
            &[0, 0],
            None,
            None,
            &gps_home,
        )
        .unwrap();
        assert_eq!(lat, 520_000_010);

        let lon = apply_predictor(
            &header,
            1,
            PREDICT_HOME_COORD_1,
            true,
            -7,
            &[0, 0],
            None,
            None,
            &gps_home,
        )
        .unwrap();
        assert_eq!(lon, 43_999_993);
    }

    #[test]
    fn test_unknown_predictor_is_fatal() {
        let header = LogHeader::default();
        let result = apply_predictor(&header, 0, 99, false, 0, &[0], None, None, &[]);
        assert!(matches!(result, Err(DecodeError::InvalidPredictor(99))));
    }

    #[test]
    fn test_additions_wrap_in_32_bits() {
        let header = LogHeader::default();
        let value = apply_predictor(
            &header,
            0,
            PREDICT_PREVIOUS,
            false,
            10,
            &[0],
            Some(&[i32::MAX]),
            None,
            &[],
        )
        .unwrap();
        assert_eq!(value, i32::MIN + 9);
    }
}
