//! Rate-limit accounting for main frames.
//!
//! The flight controller only logs an iteration when the configured I/P
//! frame intervals say it should. These helpers reconstruct how many
//! iterations were intentionally left out of the log, which feeds both the
//! iteration-count predictor and the absent-iteration statistic.

use crate::types::LogHeader;

// Upper bound on the skipped-frame scan, in case the header declared a
// degenerate interval that would never produce a frame
const MAX_SKIPPED_FRAMES: u32 = 500;

/// Whether the logging rate settings call for `frame_index` to be present.
pub fn should_have_frame(header: &LogHeader, frame_index: u32) -> bool {
    (frame_index.wrapping_rem(header.frame_interval_i.max(1)))
        .wrapping_add(header.frame_interval_p_num)
        .wrapping_sub(1)
        .wrapping_rem(header.frame_interval_p_denom.max(1))
        < header.frame_interval_p_num
}

/// Count the iterations after `last_iteration` that were rate-limited away,
/// up to the next iteration that should be present.
pub fn count_intentionally_skipped_frames(
    header: &LogHeader,
    last_iteration: Option<u32>,
) -> u32 {
    let Some(last_iteration) = last_iteration else {
        // No main frame parsed yet, so there is nothing to skip
        return 0;
    };

    let mut count = 0;
    let mut frame_index = last_iteration.wrapping_add(1);

    while count < MAX_SKIPPED_FRAMES && !should_have_frame(header, frame_index) {
        count += 1;
        frame_index = frame_index.wrapping_add(1);
    }

    count
}

/// Count the rate-limited iterations between `last_iteration` and
/// `target_iteration` exclusive.
pub fn count_intentionally_skipped_frames_to(
    header: &LogHeader,
    last_iteration: Option<u32>,
    target_iteration: u32,
) -> u32 {
    let Some(last_iteration) = last_iteration else {
        return 0;
    };

    let mut count = 0;
    let mut frame_index = last_iteration.wrapping_add(1);

    while count < MAX_SKIPPED_FRAMES && frame_index < target_iteration {
        if !should_have_frame(header, frame_index) {
            count += 1;
        }
        frame_index = frame_index.wrapping_add(1);
    }

    count
}
