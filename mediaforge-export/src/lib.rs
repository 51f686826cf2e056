//! Export pipeline decision layer.
//!
//! Sits between asset loading and muxing: describes edited inputs,
//! resolves their presentation durations, enforces the asset-loading
//! callback order, and decides per track whether to transcode or pass
//! samples through unmodified.
//!
//! # Example
//!
//! ```
//! use mediaforge_export::{ClipWindow, Composition, EditedItem};
//! use mediaforge_core::time::DurationUs;
//!
//! let item = EditedItem::builder("intro.mp4")
//!     .source_duration(DurationUs::from_micros(10_000_000))
//!     .clip(ClipWindow::from_millis(1000, Some(4000)).unwrap())
//!     .build()
//!     .unwrap();
//! assert_eq!(item.presentation_duration().micros(), Some(3_000_000));
//!
//! let composition = Composition::single(item);
//! assert_eq!(composition.sequences().len(), 1);
//! ```

mod composition;
mod decision;
mod error;
mod item;
mod loader;

pub use composition::{
    AudioEffect, Composition, Effects, Sequence, TransformationRequest, VideoEffect,
};
pub use decision::{
    should_transcode_audio, should_transcode_video, EncoderCapabilities, MuxerCapabilities,
};
pub use error::{ExportError, Result};
pub use item::{resolve_duration, ClipSpec, ClipWindow, EditedItem, EditedItemBuilder};
pub use loader::{AssetListener, LoadSession, OutputTypes, SampleConsumer};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
