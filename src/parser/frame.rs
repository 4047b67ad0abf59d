use crate::error::Result;
use crate::parser::decoder::*;
use crate::parser::stream::DataStream;
use crate::types::{FrameDefinition, LogHeader};

/// Decode the fields of one frame into `current`.
///
/// `def` supplies the predictors and encodings to drive the stream with;
/// `signed_def` supplies per-field signedness, which for inter frames comes
/// from the main field table rather than the P table. Group encodings cover
/// a run of fields and advance the field index past the whole run.
#[allow(clippy::too_many_arguments)]
pub fn parse_frame_fields(
    stream: &mut DataStream,
    header: &LogHeader,
    def: &FrameDefinition,
    signed_def: &FrameDefinition,
    field_count: usize,
    current: &mut [i32],
    previous: Option<&[i32]>,
    previous2: Option<&[i32]>,
    gps_home: &[i32],
    skipped_frames: u32,
    raw: bool,
) -> Result<()> {
    let mut values = [0i32; 8];
    let mut i = 0;

    while i < field_count {
        if def.predictors[i] == PREDICT_INC {
            // Not stream-carried: reconstructed from the rate-limit count
            // and the previous iteration value
            let base = previous.map_or(0u32, |previous| previous[i] as u32);
            current[i] = skipped_frames.wrapping_add(1).wrapping_add(base) as i32;
            i += 1;
            continue;
        }

        match def.encodings[i] {
            ENCODING_TAG8_4S16 => {
                if header.data_version < 2 {
                    stream.read_tag8_4s16_v1(&mut values)?;
                } else {
                    stream.read_tag8_4s16_v2(&mut values)?;
                }

                // The header guarantees four consecutive fields here
                for j in 0..4 {
                    if i + j >= field_count {
                        break;
                    }
                    current[i + j] = predict(
                        header, def, signed_def, i + j, values[j], current, previous, previous2,
                        gps_home, raw,
                    )?;
                }
                i += 4;
            }

            ENCODING_TAG2_3S32 => {
                stream.read_tag2_3s32(&mut values)?;

                for j in 0..3 {
                    if i + j >= field_count {
                        break;
                    }
                    current[i + j] = predict(
                        header, def, signed_def, i + j, values[j], current, previous, previous2,
                        gps_home, raw,
                    )?;
                }
                i += 3;
            }

            ENCODING_TAG8_8SVB => {
                // The group spans the consecutive fields sharing this
                // encoding, to a maximum of eight
                let mut group_count = 1;
                while i + group_count < field_count
                    && group_count < 8
                    && def.encodings[i + group_count] == ENCODING_TAG8_8SVB
                {
                    group_count += 1;
                }

                stream.read_tag8_8svb(&mut values, group_count)?;

                for j in 0..group_count {
                    current[i + j] = predict(
                        header, def, signed_def, i + j, values[j], current, previous, previous2,
                        gps_home, raw,
                    )?;
                }
                i += group_count;
            }

            encoding => {
                let raw_value = decode_field_value(stream, encoding)?;
                current[i] = predict(
                    header, def, signed_def, i, raw_value, current, previous, previous2, gps_home,
                    raw,
                )?;
                i += 1;
            }
        }
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn predict(
    header: &LogHeader,
    def: &FrameDefinition,
    signed_def: &FrameDefinition,
    field_index: usize,
    raw_value: i32,
    current: &[i32],
    previous: Option<&[i32]>,
    previous2: Option<&[i32]>,
    gps_home: &[i32],
    raw: bool,
) -> Result<i32> {
    let predictor = if raw {
        PREDICT_0
    } else {
        def.predictors[field_index]
    };

    apply_predictor(
        header,
        field_index,
        predictor,
        signed_def.is_signed(field_index),
        raw_value,
        current,
        previous,
        previous2,
        gps_home,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(predictors: Vec<u16>, encodings: Vec<u8>) -> FrameDefinition {
        FrameDefinition {
            field_names: (0..predictors.len()).map(|i| format!("f{}", i)).collect(),
            predictors,
            encodings,
            signed: Vec::new(),
        }
    }

    #[test]
    fn test_scalar_fields() {
        let header = LogHeader::default();
        let def = def(
            vec![PREDICT_0, PREDICT_0],
            vec![ENCODING_UNSIGNED_VB, ENCODING_UNSIGNED_VB],
        );
        let data = vec![0x00, 0xe8, 0x07];
        let mut stream = DataStream::new(&data);
        let mut current = vec![0i32; 2];

        parse_frame_fields(
            &mut stream,
            &header,
            &def,
            &def,
            2,
            &mut current,
            None,
            None,
            &[],
            0,
            false,
        )
        .unwrap();

        assert_eq!(current, vec![0, 1000]);
    }

    #[test]
    fn test_inc_predictor_consumes_no_bytes() {
        let header = LogHeader::default();
        let def = def(
            vec![PREDICT_INC, PREDICT_PREVIOUS],
            vec![ENCODING_NULL, ENCODING_UNSIGNED_VB],
        );
        let data = vec![0x05];
        let mut stream = DataStream::new(&data);
        let mut current = vec![0i32; 2];
        let previous = vec![10i32, 100];

        parse_frame_fields(
            &mut stream,
            &header,
            &def,
            &def,
            2,
            &mut current,
            Some(&previous),
            Some(&previous),
            &[],
            3,
            false,
        )
        .unwrap();

        // skipped + 1 + previous iteration, then 100 + 5
        assert_eq!(current, vec![14, 105]);
        assert_eq!(stream.pos, 1);
    }

    #[test]
    fn test_tag2_3s32_advances_three_fields() {
        let header = LogHeader::default();
        let def = def(
            vec![PREDICT_0; 4],
            vec![
                ENCODING_TAG2_3S32,
                ENCODING_TAG2_3S32,
                ENCODING_TAG2_3S32,
                ENCODING_UNSIGNED_VB,
            ],
        );
        let data = vec![0x40, 0xab, 0x09];
        let mut stream = DataStream::new(&data);
        let mut current = vec![0i32; 4];

        parse_frame_fields(
            &mut stream,
            &header,
            &def,
            &def,
            4,
            &mut current,
            None,
            None,
            &[],
            0,
            false,
        )
        .unwrap();

        assert_eq!(current, vec![0, -6, -5, 9]);
    }

    #[test]
    fn test_tag8_4s16_advances_four_fields() {
        let mut header = LogHeader::default();
        header.data_version = 2;
        let def = def(
            vec![PREDICT_0; 5],
            vec![
                ENCODING_TAG8_4S16,
                ENCODING_TAG8_4S16,
                ENCODING_TAG8_4S16,
                ENCODING_TAG8_4S16,
                ENCODING_UNSIGNED_VB,
            ],
        );
        // All four group values zero, then a scalar 7
        let data = vec![0x00, 0x07];
        let mut stream = DataStream::new(&data);
        let mut current = vec![0i32; 5];

        parse_frame_fields(
            &mut stream,
            &header,
            &def,
            &def,
            5,
            &mut current,
            None,
            None,
            &[],
            0,
            false,
        )
        .unwrap();

        assert_eq!(current, vec![0, 0, 0, 0, 7]);
    }

    #[test]
    fn test_tag8_8svb_group_count_is_bounded_by_encoding_run() {
        let header = LogHeader::default();
        let def = def(
            vec![PREDICT_0; 3],
            vec![
                ENCODING_TAG8_8SVB,
                ENCODING_TAG8_8SVB,
                ENCODING_UNSIGNED_VB,
            ],
        );
        // Group of two: bitmap selects value 1 only, then scalar 3
        let data = vec![0b0000_0010, 0x08, 0x03];
        let mut stream = DataStream::new(&data);
        let mut current = vec![0i32; 3];

        parse_frame_fields(
            &mut stream,
            &header,
            &def,
            &def,
            3,
            &mut current,
            None,
            None,
            &[],
            0,
            false,
        )
        .unwrap();

        assert_eq!(current, vec![0, 4, 3]);
    }

    #[test]
    fn test_raw_mode_forces_zero_predictor() {
        let header = LogHeader::default();
        let def = def(vec![PREDICT_PREVIOUS], vec![ENCODING_UNSIGNED_VB]);
        let data = vec![0x05];
        let mut stream = DataStream::new(&data);
        let mut current = vec![0i32; 1];
        let previous = vec![100i32];

        parse_frame_fields(
            &mut stream,
            &header,
            &def,
            &def,
            1,
            &mut current,
            Some(&previous),
            Some(&previous),
            &[],
            0,
            true,
        )
        .unwrap();

        assert_eq!(current, vec![5]);
    }
}
