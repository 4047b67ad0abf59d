use crate::types::{FrameDefinition, FrameKind};
use crate::MAX_FRAME_LENGTH;

/// Running minimum and maximum of one main-frame field
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldStats {
    pub min: i64,
    pub max: i64,
}

/// Per-frame-type counters
#[derive(Debug, Clone)]
pub struct FrameTypeStats {
    pub bytes: u64,
    pub valid_count: u32,
    pub corrupt_count: u32,
    /// Inter frames received while the main stream was out of sync
    pub desync_count: u32,
    /// Histogram of frame sizes, indexed by byte length
    pub size_count: [u32; MAX_FRAME_LENGTH + 1],
}

impl Default for FrameTypeStats {
    fn default() -> Self {
        Self {
            bytes: 0,
            valid_count: 0,
            corrupt_count: 0,
            desync_count: 0,
            size_count: [0; MAX_FRAME_LENGTH + 1],
        }
    }
}

/// Statistics maintained live over one parse of a sub-log
#[derive(Debug, Clone, Default)]
pub struct LogStats {
    pub total_bytes: u64,
    pub total_corrupt_frames: u32,
    /// Iterations the flight controller never logged because of the P-frame
    /// interval setting, as opposed to frames lost to corruption
    pub intentionally_absent_iterations: u32,
    pub have_field_stats: bool,
    /// Min/max per main-frame field, filled once the first main frame is
    /// accepted
    pub field: Vec<FieldStats>,
    frame: [FrameTypeStats; 5],
}

impl LogStats {
    pub fn frame(&self, kind: FrameKind) -> &FrameTypeStats {
        &self.frame[kind.index()]
    }

    pub(crate) fn frame_mut(&mut self, kind: FrameKind) -> &mut FrameTypeStats {
        &mut self.frame[kind.index()]
    }

    /// Record min/max for an accepted main frame, honouring each field's
    /// declared signedness.
    pub(crate) fn update_field_stats(&mut self, values: &[i32], def: &FrameDefinition) {
        if self.field.len() < values.len() {
            self.field.resize(values.len(), FieldStats::default());
        }

        for (i, &value) in values.iter().enumerate() {
            let value = if def.is_signed(i) {
                value as i64
            } else {
                value as u32 as i64
            };

            if self.have_field_stats {
                self.field[i].min = self.field[i].min.min(value);
                self.field[i].max = self.field[i].max.max(value);
            } else {
                self.field[i].min = value;
                self.field[i].max = value;
            }
        }

        self.have_field_stats = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(signed: &[bool]) -> FrameDefinition {
        FrameDefinition {
            field_names: signed.iter().map(|_| "f".to_string()).collect(),
            predictors: vec![0; signed.len()],
            encodings: vec![0; signed.len()],
            signed: signed.to_vec(),
        }
    }

    #[test]
    fn test_field_stats_initialise_from_first_frame() {
        let mut stats = LogStats::default();
        let def = def(&[true, true]);
        stats.update_field_stats(&[5, -3], &def);
        assert_eq!(stats.field[0].min, 5);
        assert_eq!(stats.field[0].max, 5);
        assert_eq!(stats.field[1].min, -3);

        stats.update_field_stats(&[2, 7], &def);
        assert_eq!(stats.field[0].min, 2);
        assert_eq!(stats.field[0].max, 5);
        assert_eq!(stats.field[1].max, 7);
    }

    #[test]
    fn test_unsigned_fields_compare_as_unsigned() {
        let mut stats = LogStats::default();
        stats.update_field_stats(&[-1], &def(&[false]));
        assert_eq!(stats.field[0].max, u32::MAX as i64);
    }

    #[test]
    fn test_frame_counters_by_kind() {
        let mut stats = LogStats::default();
        stats.frame_mut(FrameKind::Intra).valid_count += 1;
        stats.frame_mut(FrameKind::Inter).desync_count += 1;
        assert_eq!(stats.frame(FrameKind::Intra).valid_count, 1);
        assert_eq!(stats.frame(FrameKind::Inter).desync_count, 1);
        assert_eq!(stats.frame(FrameKind::Gps).valid_count, 0);
    }
}
