//! Transcode-vs-passthrough decisions.
//!
//! Pure functions over the input format, the composition's declared
//! effects, the transformation request, and the capabilities reported by
//! the encoder factory and the muxer. A capability shortfall resolves to
//! "transcode required", never to an error.

use crate::composition::{Composition, TransformationRequest};
use mediaforge_core::format::{CodecId, Format};
use tracing::debug;

/// Capabilities reported by an encoder factory.
pub trait EncoderCapabilities {
    /// Whether the configured video encoder re-encodes regardless of input.
    fn video_needs_encoding(&self) -> bool;

    /// Whether the configured audio encoder re-encodes regardless of input.
    fn audio_needs_encoding(&self) -> bool;
}

/// Capabilities reported by a muxer.
pub trait MuxerCapabilities {
    /// Whether samples of this codec can be copied into the output
    /// container without re-encoding.
    fn supports_direct_copy(&self, codec: &CodecId) -> bool;
}

/// Decide whether the video track at a sequence position must be
/// transcoded, or may be copied unmodified into the output.
///
/// Deterministic given the same inputs and capability responses; performs
/// no I/O beyond the capability queries.
pub fn should_transcode_video(
    input_format: &Format,
    composition: &Composition,
    sequence_index: usize,
    request: &TransformationRequest,
    encoder: &dyn EncoderCapabilities,
    muxer: &dyn MuxerCapabilities,
) -> bool {
    match video_transcode_reason(
        input_format,
        composition,
        sequence_index,
        request,
        encoder,
        muxer,
    ) {
        Some(reason) => {
            debug!(reason, "video track requires transcoding");
            true
        }
        None => {
            debug!("video track may be passed through");
            false
        }
    }
}

fn video_transcode_reason(
    input_format: &Format,
    composition: &Composition,
    sequence_index: usize,
    request: &TransformationRequest,
    encoder: &dyn EncoderCapabilities,
    muxer: &dyn MuxerCapabilities,
) -> Option<&'static str> {
    let Some(sequence) = composition.sequences().get(sequence_index) else {
        return Some("sequence index out of range");
    };

    if composition.sequences().len() > 1 || sequence.items().len() > 1 {
        // Concatenation either transmuxes every item or transcodes every
        // item; there is no per-item in-between.
        return if composition.is_transmux_video() {
            None
        } else {
            Some("multiple inputs without video transmuxing")
        };
    }

    let item = &sequence.items()[0];
    if let Some(clip) = item.clip() {
        if clip.start_offset_us() > 0 && !clip.starts_at_sync_point() {
            return Some("clip start is not a sync point");
        }
    }
    if encoder.video_needs_encoding() {
        return Some("encoder requires encoding");
    }
    match request.video_codec {
        Some(requested) if input_format.codec != CodecId::Video(requested) => {
            return Some("requested video codec differs from input");
        }
        Some(_) => {}
        None => {
            if !muxer.supports_direct_copy(&input_format.codec) {
                return Some("muxer cannot copy input codec");
            }
        }
    }
    if let Some(height) = request.output_height {
        if height != input_format.height {
            return Some("requested output height differs from input");
        }
    }
    if input_format.pixel_aspect_ratio != 1.0 {
        return Some("input has non-square pixels");
    }
    if !item.effects().video_effects_are_no_op(input_format) {
        return Some("video effects are not the identity");
    }
    None
}

/// Decide whether the audio track at a sequence position must be
/// transcoded, or may be copied unmodified into the output.
pub fn should_transcode_audio(
    input_format: &Format,
    composition: &Composition,
    sequence_index: usize,
    request: &TransformationRequest,
    encoder: &dyn EncoderCapabilities,
    muxer: &dyn MuxerCapabilities,
) -> bool {
    match audio_transcode_reason(
        input_format,
        composition,
        sequence_index,
        request,
        encoder,
        muxer,
    ) {
        Some(reason) => {
            debug!(reason, "audio track requires transcoding");
            true
        }
        None => {
            debug!("audio track may be passed through");
            false
        }
    }
}

fn audio_transcode_reason(
    input_format: &Format,
    composition: &Composition,
    sequence_index: usize,
    request: &TransformationRequest,
    encoder: &dyn EncoderCapabilities,
    muxer: &dyn MuxerCapabilities,
) -> Option<&'static str> {
    let Some(sequence) = composition.sequences().get(sequence_index) else {
        return Some("sequence index out of range");
    };

    if composition.sequences().len() > 1 || sequence.items().len() > 1 {
        return if composition.is_transmux_audio() {
            None
        } else {
            Some("multiple inputs without audio transmuxing")
        };
    }

    if encoder.audio_needs_encoding() {
        return Some("encoder requires encoding");
    }
    match request.audio_codec {
        Some(requested) if input_format.codec != CodecId::Audio(requested) => {
            return Some("requested audio codec differs from input");
        }
        Some(_) => {}
        None => {
            if !muxer.supports_direct_copy(&input_format.codec) {
                return Some("muxer cannot copy input codec");
            }
        }
    }
    let item = &sequence.items()[0];
    if item.flatten_for_slow_motion() {
        return Some("slow-motion flattening rewrites audio timing");
    }
    if !item.effects().audio_effects.is_empty() {
        return Some("audio effects are declared");
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::{AudioEffect, Effects, Sequence, VideoEffect};
    use crate::item::{ClipWindow, EditedItem};
    use mediaforge_core::format::{AudioCodec, VideoCodec};
    use mediaforge_core::geometry::GeometryTransform;

    struct PassthroughEncoder;

    impl EncoderCapabilities for PassthroughEncoder {
        fn video_needs_encoding(&self) -> bool {
            false
        }
        fn audio_needs_encoding(&self) -> bool {
            false
        }
    }

    struct ForcedEncoder;

    impl EncoderCapabilities for ForcedEncoder {
        fn video_needs_encoding(&self) -> bool {
            true
        }
        fn audio_needs_encoding(&self) -> bool {
            true
        }
    }

    struct CopyEverythingMuxer;

    impl MuxerCapabilities for CopyEverythingMuxer {
        fn supports_direct_copy(&self, _codec: &CodecId) -> bool {
            true
        }
    }

    struct CopyNothingMuxer;

    impl MuxerCapabilities for CopyNothingMuxer {
        fn supports_direct_copy(&self, _codec: &CodecId) -> bool {
            false
        }
    }

    fn video_input() -> Format {
        Format::video(VideoCodec::H264, 1920, 1080)
    }

    fn audio_input() -> Format {
        Format::audio(AudioCodec::Aac, 48_000, 2)
    }

    fn item_with_effects(effects: Effects) -> EditedItem {
        EditedItem::builder("in.mp4").effects(effects).build().unwrap()
    }

    fn plain_composition() -> Composition {
        Composition::single(item_with_effects(Effects::none()))
    }

    fn decide_video(composition: &Composition) -> bool {
        should_transcode_video(
            &video_input(),
            composition,
            0,
            &TransformationRequest::passthrough(),
            &PassthroughEncoder,
            &CopyEverythingMuxer,
        )
    }

    #[test]
    fn test_no_effects_and_copying_muxer_passes_through() {
        assert!(!decide_video(&plain_composition()));
    }

    #[test]
    fn test_rotation_effect_forces_transcode() {
        let effects = Effects {
            video_effects: vec![VideoEffect::ScaleAndRotate(
                GeometryTransform::rotation(90.0).unwrap(),
            )],
            audio_effects: vec![],
        };
        assert!(decide_video(&Composition::single(item_with_effects(effects))));
    }

    #[test]
    fn test_chained_diagonal_rotations_force_transcode() {
        // Two 45-degree rotations net to 90: still not the identity.
        let r45 = GeometryTransform::rotation(45.0).unwrap();
        let effects = Effects {
            video_effects: vec![
                VideoEffect::ScaleAndRotate(r45),
                VideoEffect::ScaleAndRotate(r45),
            ],
            audio_effects: vec![],
        };
        assert!(decide_video(&Composition::single(item_with_effects(effects))));
    }

    #[test]
    fn test_cancelling_rotations_pass_through() {
        let effects = Effects {
            video_effects: vec![
                VideoEffect::ScaleAndRotate(GeometryTransform::rotation(180.0).unwrap()),
                VideoEffect::ScaleAndRotate(GeometryTransform::rotation(180.0).unwrap()),
            ],
            audio_effects: vec![],
        };
        assert!(!decide_video(&Composition::single(item_with_effects(effects))));
    }

    #[test]
    fn test_uncopyable_codec_forces_transcode() {
        assert!(should_transcode_video(
            &video_input(),
            &plain_composition(),
            0,
            &TransformationRequest::passthrough(),
            &PassthroughEncoder,
            &CopyNothingMuxer,
        ));
    }

    #[test]
    fn test_encoder_demanding_encoding_forces_transcode() {
        assert!(should_transcode_video(
            &video_input(),
            &plain_composition(),
            0,
            &TransformationRequest::passthrough(),
            &ForcedEncoder,
            &CopyEverythingMuxer,
        ));
    }

    #[test]
    fn test_codec_change_request_forces_transcode() {
        let request = TransformationRequest {
            video_codec: Some(VideoCodec::H265),
            ..Default::default()
        };
        assert!(should_transcode_video(
            &video_input(),
            &plain_composition(),
            0,
            &request,
            &PassthroughEncoder,
            &CopyEverythingMuxer,
        ));
    }

    #[test]
    fn test_matching_codec_request_skips_muxer_query() {
        // An explicit codec request that already matches the input does not
        // consult the muxer's copy support.
        let request = TransformationRequest {
            video_codec: Some(VideoCodec::H264),
            ..Default::default()
        };
        assert!(!should_transcode_video(
            &video_input(),
            &plain_composition(),
            0,
            &request,
            &PassthroughEncoder,
            &CopyNothingMuxer,
        ));
    }

    #[test]
    fn test_resolution_change_request_forces_transcode() {
        let request = TransformationRequest {
            output_height: Some(720),
            ..Default::default()
        };
        assert!(should_transcode_video(
            &video_input(),
            &plain_composition(),
            0,
            &request,
            &PassthroughEncoder,
            &CopyEverythingMuxer,
        ));

        let request = TransformationRequest {
            output_height: Some(1080),
            ..Default::default()
        };
        assert!(!should_transcode_video(
            &video_input(),
            &plain_composition(),
            0,
            &request,
            &PassthroughEncoder,
            &CopyEverythingMuxer,
        ));
    }

    #[test]
    fn test_clip_off_sync_point_forces_transcode() {
        let clip = ClipWindow::from_micros(500_000, None).unwrap();
        let item = EditedItem::builder("in.mp4").clip(clip).build().unwrap();
        assert!(decide_video(&Composition::single(item)));

        let clip = ClipWindow::from_micros(500_000, None)
            .unwrap()
            .with_sync_start(true);
        let item = EditedItem::builder("in.mp4").clip(clip).build().unwrap();
        assert!(!decide_video(&Composition::single(item)));
    }

    #[test]
    fn test_non_square_pixels_force_transcode() {
        let input = video_input().with_pixel_aspect_ratio(1.333);
        assert!(should_transcode_video(
            &input,
            &plain_composition(),
            0,
            &TransformationRequest::passthrough(),
            &PassthroughEncoder,
            &CopyEverythingMuxer,
        ));
    }

    #[test]
    fn test_multiple_items_require_transmux_flag() {
        let items = vec![
            EditedItem::builder("a.mp4").build().unwrap(),
            EditedItem::builder("b.mp4").build().unwrap(),
        ];
        let composition = Composition::new(vec![Sequence::new(items).unwrap()]).unwrap();
        assert!(decide_video(&composition));

        let composition = composition.transmux_video(true);
        assert!(!decide_video(&composition));
    }

    #[test]
    fn test_audio_passthrough_by_default() {
        assert!(!should_transcode_audio(
            &audio_input(),
            &plain_composition(),
            0,
            &TransformationRequest::passthrough(),
            &PassthroughEncoder,
            &CopyEverythingMuxer,
        ));
    }

    #[test]
    fn test_audio_codec_change_forces_transcode() {
        let request = TransformationRequest {
            audio_codec: Some(AudioCodec::Opus),
            ..Default::default()
        };
        assert!(should_transcode_audio(
            &audio_input(),
            &plain_composition(),
            0,
            &request,
            &PassthroughEncoder,
            &CopyEverythingMuxer,
        ));
    }

    #[test]
    fn test_audio_effects_force_transcode() {
        let effects = Effects {
            video_effects: vec![],
            audio_effects: vec![AudioEffect::Volume(0.5)],
        };
        assert!(should_transcode_audio(
            &audio_input(),
            &Composition::single(item_with_effects(effects)),
            0,
            &TransformationRequest::passthrough(),
            &PassthroughEncoder,
            &CopyEverythingMuxer,
        ));
    }

    #[test]
    fn test_slow_motion_flattening_forces_audio_transcode() {
        let item = EditedItem::builder("in.mp4")
            .flatten_for_slow_motion(true)
            .build()
            .unwrap();
        assert!(should_transcode_audio(
            &audio_input(),
            &Composition::single(item),
            0,
            &TransformationRequest::passthrough(),
            &PassthroughEncoder,
            &CopyEverythingMuxer,
        ));
    }

    #[test]
    fn test_decision_is_deterministic() {
        let composition = plain_composition();
        let first = decide_video(&composition);
        for _ in 0..3 {
            assert_eq!(decide_video(&composition), first);
        }
    }
}
