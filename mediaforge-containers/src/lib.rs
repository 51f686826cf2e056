//! Container metadata parsing for the Mediaforge export pipeline.
//!
//! Reads just enough of a container to answer the questions the pipeline
//! asks before any sample data flows: which tracks exist, how long they
//! are, and where the video track's sync samples sit. Sample payloads are
//! never touched.

pub mod mp4;
pub mod probe;

pub use mp4::{last_video_sync_timestamp, Mp4MetadataReader, SyncSampleIndex, TrackSummary};
pub use probe::{probe_bytes, ProbedFormat};
