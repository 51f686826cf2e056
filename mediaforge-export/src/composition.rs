//! Compositions, sequences, effects, and transformation requests.

use crate::error::Result;
use crate::item::EditedItem;
use mediaforge_core::error::Error;
use mediaforge_core::format::{AudioCodec, Format, VideoCodec};
use mediaforge_core::geometry::GeometryTransform;
use serde::{Deserialize, Serialize};

/// A video effect applied during export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VideoEffect {
    /// Scale and rotate frames.
    ScaleAndRotate(GeometryTransform),
    /// Fit frames to a target output height, preserving aspect ratio.
    Presentation {
        /// Target output height in pixels.
        height: u32,
    },
}

impl VideoEffect {
    /// Check whether this effect leaves frames of the given format unchanged.
    pub fn is_no_op(&self, input_format: &Format) -> bool {
        match self {
            VideoEffect::ScaleAndRotate(transform) => transform.is_identity(),
            VideoEffect::Presentation { height } => *height == input_format.height,
        }
    }
}

/// An audio effect applied during export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AudioEffect {
    /// Scale sample amplitudes.
    Volume(f32),
    /// Resample to a target rate.
    Resample {
        /// Target sample rate in Hz.
        sample_rate: u32,
    },
}

/// Ordered per-item effects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Effects {
    /// Video effects, applied in order.
    pub video_effects: Vec<VideoEffect>,
    /// Audio effects, applied in order.
    pub audio_effects: Vec<AudioEffect>,
}

impl Effects {
    /// Effects that change nothing.
    pub fn none() -> Self {
        Self::default()
    }

    /// Check whether the declared video effects leave frames of the given
    /// format unchanged.
    ///
    /// Presentation effects must match the input height; the geometric
    /// chain must be provably the identity (see
    /// [`GeometryTransform::chain_is_identity`]). Chained rotations that
    /// are individually non-identity only count as identity when their
    /// composition provably cancels.
    pub fn video_effects_are_no_op(&self, input_format: &Format) -> bool {
        let mut transforms = Vec::new();
        for effect in &self.video_effects {
            match effect {
                VideoEffect::ScaleAndRotate(transform) => transforms.push(transform),
                VideoEffect::Presentation { .. } => {
                    if !effect.is_no_op(input_format) {
                        return false;
                    }
                }
            }
        }
        GeometryTransform::chain_is_identity(transforms)
    }
}

/// A sequence of edited items played back to back.
#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    items: Vec<EditedItem>,
    is_looping: bool,
}

impl Sequence {
    /// Create a sequence. Fails when no items are given.
    pub fn new(items: Vec<EditedItem>) -> Result<Self> {
        if items.is_empty() {
            return Err(Error::config("a sequence needs at least one item").into());
        }
        Ok(Self {
            items,
            is_looping: false,
        })
    }

    /// Create a single-item sequence.
    pub fn single(item: EditedItem) -> Self {
        Self {
            items: vec![item],
            is_looping: false,
        }
    }

    /// Mark the sequence as looping until the longest sequence ends.
    pub fn looping(mut self, is_looping: bool) -> Self {
        self.is_looping = is_looping;
        self
    }

    /// Items in playback order.
    pub fn items(&self) -> &[EditedItem] {
        &self.items
    }

    /// Whether the sequence loops.
    pub fn is_looping(&self) -> bool {
        self.is_looping
    }
}

/// A composition of one or more parallel sequences.
#[derive(Debug, Clone, PartialEq)]
pub struct Composition {
    sequences: Vec<Sequence>,
    transmux_audio: bool,
    transmux_video: bool,
}

impl Composition {
    /// Create a composition. Fails when no sequences are given.
    pub fn new(sequences: Vec<Sequence>) -> Result<Self> {
        if sequences.is_empty() {
            return Err(Error::config("a composition needs at least one sequence").into());
        }
        Ok(Self {
            sequences,
            transmux_audio: false,
            transmux_video: false,
        })
    }

    /// Create a composition holding a single item.
    pub fn single(item: EditedItem) -> Self {
        Self {
            sequences: vec![Sequence::single(item)],
            transmux_audio: false,
            transmux_video: false,
        }
    }

    /// Request audio passthrough for multi-item compositions.
    pub fn transmux_audio(mut self, transmux: bool) -> Self {
        self.transmux_audio = transmux;
        self
    }

    /// Request video passthrough for multi-item compositions.
    pub fn transmux_video(mut self, transmux: bool) -> Self {
        self.transmux_video = transmux;
        self
    }

    /// All sequences.
    pub fn sequences(&self) -> &[Sequence] {
        &self.sequences
    }

    /// Whether audio passthrough is requested for multi-item compositions.
    pub fn is_transmux_audio(&self) -> bool {
        self.transmux_audio
    }

    /// Whether video passthrough is requested for multi-item compositions.
    pub fn is_transmux_video(&self) -> bool {
        self.transmux_video
    }
}

/// Requested output characteristics for an export.
///
/// Unset fields mean "match the input".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformationRequest {
    /// Requested video codec.
    pub video_codec: Option<VideoCodec>,
    /// Requested audio codec.
    pub audio_codec: Option<AudioCodec>,
    /// Requested output height in pixels.
    pub output_height: Option<u32>,
}

impl TransformationRequest {
    /// A request that matches the input everywhere.
    pub fn passthrough() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediaforge_core::format::VideoCodec;

    fn input_format() -> Format {
        Format::video(VideoCodec::H264, 1920, 1080)
    }

    #[test]
    fn test_empty_effects_are_no_op() {
        assert!(Effects::none().video_effects_are_no_op(&input_format()));
    }

    #[test]
    fn test_identity_transform_is_no_op() {
        let effects = Effects {
            video_effects: vec![VideoEffect::ScaleAndRotate(GeometryTransform::identity())],
            audio_effects: vec![],
        };
        assert!(effects.video_effects_are_no_op(&input_format()));
    }

    #[test]
    fn test_rotation_is_not_no_op() {
        let effects = Effects {
            video_effects: vec![VideoEffect::ScaleAndRotate(
                GeometryTransform::rotation(90.0).unwrap(),
            )],
            audio_effects: vec![],
        };
        assert!(!effects.video_effects_are_no_op(&input_format()));
    }

    #[test]
    fn test_cancelling_rotations_are_no_op() {
        let effects = Effects {
            video_effects: vec![
                VideoEffect::ScaleAndRotate(GeometryTransform::rotation(90.0).unwrap()),
                VideoEffect::ScaleAndRotate(GeometryTransform::rotation(-90.0).unwrap()),
            ],
            audio_effects: vec![],
        };
        assert!(effects.video_effects_are_no_op(&input_format()));
    }

    #[test]
    fn test_presentation_matching_height_is_no_op() {
        let effects = Effects {
            video_effects: vec![VideoEffect::Presentation { height: 1080 }],
            audio_effects: vec![],
        };
        assert!(effects.video_effects_are_no_op(&input_format()));

        let effects = Effects {
            video_effects: vec![VideoEffect::Presentation { height: 720 }],
            audio_effects: vec![],
        };
        assert!(!effects.video_effects_are_no_op(&input_format()));
    }

    #[test]
    fn test_sequence_requires_items() {
        assert!(Sequence::new(vec![]).is_err());
    }

    #[test]
    fn test_composition_requires_sequences() {
        assert!(Composition::new(vec![]).is_err());
    }

    #[test]
    fn test_request_from_json() {
        let request: TransformationRequest =
            serde_json::from_str(r#"{"video_codec":"H265","output_height":720}"#).unwrap();
        assert_eq!(request.video_codec, Some(VideoCodec::H265));
        assert_eq!(request.audio_codec, None);
        assert_eq!(request.output_height, Some(720));
    }
}
