use crate::schema::HuddleConfig;

use super::helpers::validate_range;

/// Validate audio framing constraints.
pub(crate) fn validate_audio(errors: &mut Vec<String>, config: &HuddleConfig) {
    validate_range(
        errors,
        "audio.frame_size",
        config.audio.frame_size as u64,
        256,
        16384,
    );
    validate_range(
        errors,
        "audio.sample_rate",
        config.audio.sample_rate.into(),
        8000,
        192_000,
    );
}
