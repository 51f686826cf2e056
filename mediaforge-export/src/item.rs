//! Edited media items and clip windows.
//!
//! An [`EditedItem`] is the immutable description of one input to an export:
//! the source, an optional clip window, track removal flags, and per-item
//! effects. All validation happens at build time; resolving the
//! presentation duration afterwards is a pure computation that cannot fail.

use crate::composition::Effects;
use crate::error::Result;
use mediaforge_core::error::Error;
use mediaforge_core::time::DurationUs;
use mediaforge_containers::SyncSampleIndex;
use serde::{Deserialize, Serialize};

/// Raw clip bounds as supplied by a caller or a configuration file.
///
/// Each bound may be given in milliseconds, microseconds, or both; the
/// microsecond form wins when both are present. `build` normalizes to a
/// validated [`ClipWindow`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipSpec {
    /// Start offset in milliseconds.
    pub start_ms: Option<i64>,
    /// Start offset in microseconds; wins over `start_ms`.
    pub start_us: Option<i64>,
    /// End offset in milliseconds.
    pub end_ms: Option<i64>,
    /// End offset in microseconds; wins over `end_ms`.
    pub end_us: Option<i64>,
    /// Whether the start offset is known to land on a sync sample.
    pub starts_at_sync_point: bool,
}

impl ClipSpec {
    /// Normalize and validate into a [`ClipWindow`].
    pub fn build(&self) -> Result<ClipWindow> {
        let start_us = self
            .start_us
            .or_else(|| self.start_ms.map(|ms| ms.saturating_mul(1000)))
            .unwrap_or(0);
        let end_us = self
            .end_us
            .or_else(|| self.end_ms.map(|ms| ms.saturating_mul(1000)));

        let mut window = ClipWindow::from_micros(start_us, end_us)?;
        window.starts_at_sync_point = self.starts_at_sync_point;
        Ok(window)
    }
}

/// A validated clip window in microseconds.
///
/// Invariants, enforced at construction: the start offset is non-negative,
/// and a bounded end offset is not before the start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipWindow {
    start_offset_us: i64,
    end_offset_us: Option<i64>,
    starts_at_sync_point: bool,
}

impl ClipWindow {
    /// Create a clip window from microsecond offsets.
    pub fn from_micros(start_us: i64, end_us: Option<i64>) -> Result<Self> {
        if start_us < 0 {
            return Err(Error::config(format!(
                "clip start offset must be non-negative, got {}",
                start_us
            ))
            .into());
        }
        if let Some(end) = end_us {
            if end < start_us {
                return Err(Error::config(format!(
                    "clip end offset {} precedes start offset {}",
                    end, start_us
                ))
                .into());
            }
        }
        Ok(Self {
            start_offset_us: start_us,
            end_offset_us: end_us,
            starts_at_sync_point: false,
        })
    }

    /// Create a clip window from millisecond offsets.
    pub fn from_millis(start_ms: i64, end_ms: Option<i64>) -> Result<Self> {
        Self::from_micros(
            start_ms.saturating_mul(1000),
            end_ms.map(|ms| ms.saturating_mul(1000)),
        )
    }

    /// Start offset in microseconds.
    pub fn start_offset_us(&self) -> i64 {
        self.start_offset_us
    }

    /// End offset in microseconds; `None` means unbounded.
    pub fn end_offset_us(&self) -> Option<i64> {
        self.end_offset_us
    }

    /// Whether the start offset lands on a sync sample.
    pub fn starts_at_sync_point(&self) -> bool {
        self.starts_at_sync_point
    }

    /// Mark the window as starting on a sync sample.
    pub fn with_sync_start(mut self, starts_at_sync_point: bool) -> Self {
        self.starts_at_sync_point = starts_at_sync_point;
        self
    }

    /// Resolve the sync-start flag against a scanned sync sample index.
    ///
    /// A window starting at zero always starts on a sync point; otherwise a
    /// sync sample must sit exactly at the start offset.
    pub fn with_sync_start_from_index(self, index: &SyncSampleIndex) -> Self {
        let starts = self.start_offset_us == 0 || index.is_sync_at(self.start_offset_us);
        self.with_sync_start(starts)
    }
}

/// Compute the effective presentation duration of a clipped source.
///
/// Pure and total over validated inputs:
/// - no clip: the source duration;
/// - start-only clip: source duration minus the start offset (the caller
///   guarantees the start offset does not exceed the source duration; no
///   clamping happens here);
/// - bounded end: the end offset, minus the start offset when present,
///   independent of the source duration.
///
/// An unset source duration stays unset unless a bounded end makes the
/// result independent of it.
pub fn resolve_duration(source_duration: DurationUs, clip: Option<&ClipWindow>) -> DurationUs {
    match clip {
        None => source_duration,
        Some(clip) => match clip.end_offset_us {
            Some(end) => DurationUs::from_micros(end - clip.start_offset_us),
            None => source_duration - DurationUs::from_micros(clip.start_offset_us),
        },
    }
}

/// An immutable edited input item.
///
/// Built once through [`EditedItemBuilder`]; illegal combinations fail at
/// build time, never during resolution or export.
#[derive(Debug, Clone, PartialEq)]
pub struct EditedItem {
    source: String,
    source_duration: DurationUs,
    clip: Option<ClipWindow>,
    remove_audio: bool,
    remove_video: bool,
    flatten_for_slow_motion: bool,
    frame_rate_override: Option<f64>,
    effects: Effects,
}

impl EditedItem {
    /// Start building an edited item for the given source.
    pub fn builder(source: impl Into<String>) -> EditedItemBuilder {
        EditedItemBuilder {
            source: source.into(),
            source_duration: DurationUs::unset(),
            clip: None,
            remove_audio: false,
            remove_video: false,
            flatten_for_slow_motion: false,
            frame_rate_override: None,
            effects: Effects::default(),
        }
    }

    /// Source identifier (path or URI).
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Nominal duration of the unclipped source.
    pub fn source_duration(&self) -> DurationUs {
        self.source_duration
    }

    /// Clip window, if any.
    pub fn clip(&self) -> Option<&ClipWindow> {
        self.clip.as_ref()
    }

    /// Whether the audio track is dropped.
    pub fn remove_audio(&self) -> bool {
        self.remove_audio
    }

    /// Whether the video track is dropped.
    pub fn remove_video(&self) -> bool {
        self.remove_video
    }

    /// Whether slow-motion metadata is flattened during export.
    pub fn flatten_for_slow_motion(&self) -> bool {
        self.flatten_for_slow_motion
    }

    /// Frame rate override, if any.
    pub fn frame_rate_override(&self) -> Option<f64> {
        self.frame_rate_override
    }

    /// Per-item effects.
    pub fn effects(&self) -> &Effects {
        &self.effects
    }

    /// Effective presentation duration after clipping.
    pub fn presentation_duration(&self) -> DurationUs {
        resolve_duration(self.source_duration, self.clip.as_ref())
    }
}

/// Builder for [`EditedItem`] with fail-fast validation.
#[derive(Debug, Clone)]
pub struct EditedItemBuilder {
    source: String,
    source_duration: DurationUs,
    clip: Option<ClipWindow>,
    remove_audio: bool,
    remove_video: bool,
    flatten_for_slow_motion: bool,
    frame_rate_override: Option<f64>,
    effects: Effects,
}

impl EditedItemBuilder {
    /// Set the nominal source duration.
    pub fn source_duration(mut self, duration: DurationUs) -> Self {
        self.source_duration = duration;
        self
    }

    /// Set the clip window.
    pub fn clip(mut self, clip: ClipWindow) -> Self {
        self.clip = Some(clip);
        self
    }

    /// Drop the audio track.
    pub fn remove_audio(mut self, remove: bool) -> Self {
        self.remove_audio = remove;
        self
    }

    /// Drop the video track.
    pub fn remove_video(mut self, remove: bool) -> Self {
        self.remove_video = remove;
        self
    }

    /// Flatten slow-motion metadata during export.
    pub fn flatten_for_slow_motion(mut self, flatten: bool) -> Self {
        self.flatten_for_slow_motion = flatten;
        self
    }

    /// Override the source frame rate.
    pub fn frame_rate_override(mut self, frame_rate: f64) -> Self {
        self.frame_rate_override = Some(frame_rate);
        self
    }

    /// Set the per-item effects.
    pub fn effects(mut self, effects: Effects) -> Self {
        self.effects = effects;
        self
    }

    /// Validate and build the item.
    pub fn build(self) -> Result<EditedItem> {
        if self.remove_audio && self.remove_video {
            return Err(Error::config("cannot remove both audio and video").into());
        }
        if self.flatten_for_slow_motion && self.clip.is_some() {
            return Err(Error::config(
                "clipping is not supported when slow-motion flattening is requested",
            )
            .into());
        }
        Ok(EditedItem {
            source: self.source,
            source_duration: self.source_duration,
            clip: self.clip,
            remove_audio: self.remove_audio,
            remove_video: self.remove_video,
            flatten_for_slow_motion: self.flatten_for_slow_motion,
            frame_rate_override: self.frame_rate_override,
            effects: self.effects,
        })
    }
}
