//! Container, codec, and track format definitions.

use crate::rational::Rational;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Container format type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ContainerFormat {
    /// ISO Base Media File Format (MP4, M4V, M4A).
    Mp4,
    /// Matroska container.
    Mkv,
    /// WebM (Matroska subset for web).
    WebM,
    /// MPEG Transport Stream.
    MpegTs,
    /// QuickTime Movie.
    Mov,
}

impl ContainerFormat {
    /// Get the typical file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Mkv => "mkv",
            Self::WebM => "webm",
            Self::MpegTs => "ts",
            Self::Mov => "mov",
        }
    }

    /// Get the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Mp4 => "video/mp4",
            Self::Mkv => "video/x-matroska",
            Self::WebM => "video/webm",
            Self::MpegTs => "video/mp2t",
            Self::Mov => "video/quicktime",
        }
    }
}

impl fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mp4 => write!(f, "MP4"),
            Self::Mkv => write!(f, "Matroska"),
            Self::WebM => write!(f, "WebM"),
            Self::MpegTs => write!(f, "MPEG-TS"),
            Self::Mov => write!(f, "QuickTime"),
        }
    }
}

/// Video codec type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum VideoCodec {
    /// H.264 / AVC.
    H264,
    /// H.265 / HEVC.
    H265,
    /// VP9.
    Vp9,
    /// AV1.
    Av1,
}

impl VideoCodec {
    /// Get the MIME type for this codec.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::H264 => "video/avc",
            Self::H265 => "video/hevc",
            Self::Vp9 => "video/x-vnd.on2.vp9",
            Self::Av1 => "video/av01",
        }
    }
}

impl fmt::Display for VideoCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::H264 => write!(f, "H.264/AVC"),
            Self::H265 => write!(f, "H.265/HEVC"),
            Self::Vp9 => write!(f, "VP9"),
            Self::Av1 => write!(f, "AV1"),
        }
    }
}

/// Audio codec type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum AudioCodec {
    /// AAC (Advanced Audio Coding).
    Aac,
    /// Opus.
    Opus,
    /// FLAC (Free Lossless Audio Codec).
    Flac,
    /// AC-3 (Dolby Digital).
    Ac3,
}

impl AudioCodec {
    /// Get the MIME type for this codec.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Aac => "audio/mp4a-latm",
            Self::Opus => "audio/opus",
            Self::Flac => "audio/flac",
            Self::Ac3 => "audio/ac3",
        }
    }
}

impl fmt::Display for AudioCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Aac => write!(f, "AAC"),
            Self::Opus => write!(f, "Opus"),
            Self::Flac => write!(f, "FLAC"),
            Self::Ac3 => write!(f, "AC-3"),
        }
    }
}

/// Codec identifier covering both track kinds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CodecId {
    /// A video codec.
    Video(VideoCodec),
    /// An audio codec.
    Audio(AudioCodec),
    /// Unknown codec, identified by its container-level tag.
    Unknown(String),
}

impl CodecId {
    /// Check if this is a video codec.
    pub fn is_video(&self) -> bool {
        matches!(self, CodecId::Video(_))
    }

    /// Check if this is an audio codec.
    pub fn is_audio(&self) -> bool {
        matches!(self, CodecId::Audio(_))
    }
}

impl fmt::Display for CodecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecId::Video(c) => c.fmt(f),
            CodecId::Audio(c) => c.fmt(f),
            CodecId::Unknown(tag) => write!(f, "Unknown({})", tag),
        }
    }
}

/// Track type in a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackType {
    /// Video track.
    Video,
    /// Audio track.
    Audio,
    /// Unknown track type.
    Unknown,
}

impl fmt::Display for TrackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => write!(f, "Video"),
            Self::Audio => write!(f, "Audio"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Track format description.
///
/// Carries the codec identifier plus the video or audio parameters the
/// pipeline needs to decide between transcoding and passthrough.
#[derive(Debug, Clone, PartialEq)]
pub struct Format {
    /// Codec identifier.
    pub codec: CodecId,
    /// Video width in pixels.
    pub width: u32,
    /// Video height in pixels.
    pub height: u32,
    /// Pixel aspect ratio (1.0 for square pixels).
    pub pixel_aspect_ratio: f32,
    /// Frame rate, if known.
    pub frame_rate: Option<Rational>,
    /// Container-level rotation metadata in degrees (0, 90, 180, 270).
    pub rotation_degrees: u32,
    /// Audio sample rate in Hz.
    pub sample_rate: u32,
    /// Audio channel count.
    pub channels: u8,
}

impl Format {
    /// Create a video format with the given codec and dimensions.
    pub fn video(codec: VideoCodec, width: u32, height: u32) -> Self {
        Self {
            codec: CodecId::Video(codec),
            width,
            height,
            pixel_aspect_ratio: 1.0,
            frame_rate: None,
            rotation_degrees: 0,
            sample_rate: 0,
            channels: 0,
        }
    }

    /// Create an audio format with the given codec, sample rate, and channel count.
    pub fn audio(codec: AudioCodec, sample_rate: u32, channels: u8) -> Self {
        Self {
            codec: CodecId::Audio(codec),
            width: 0,
            height: 0,
            pixel_aspect_ratio: 1.0,
            frame_rate: None,
            rotation_degrees: 0,
            sample_rate,
            channels,
        }
    }

    /// Set the frame rate.
    pub fn with_frame_rate(mut self, frame_rate: Rational) -> Self {
        self.frame_rate = Some(frame_rate);
        self
    }

    /// Set the pixel aspect ratio.
    pub fn with_pixel_aspect_ratio(mut self, ratio: f32) -> Self {
        self.pixel_aspect_ratio = ratio;
        self
    }

    /// Set the rotation metadata.
    pub fn with_rotation(mut self, degrees: u32) -> Self {
        self.rotation_degrees = degrees;
        self
    }

    /// Get the track type implied by the codec.
    pub fn track_type(&self) -> TrackType {
        match &self.codec {
            CodecId::Video(_) => TrackType::Video,
            CodecId::Audio(_) => TrackType::Audio,
            CodecId::Unknown(_) => TrackType::Unknown,
        }
    }
}
