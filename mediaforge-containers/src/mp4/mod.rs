//! MP4/ISOBMFF metadata parsing.
//!
//! Parses the moov tree far enough to enumerate tracks and reconstruct
//! per-track sample timing, then answers the one question the export
//! pipeline needs before clipping: the timestamp of the last video sync
//! sample.

mod atoms;
mod scan;

pub use scan::{last_video_sync_timestamp, Mp4MetadataReader, TrackSummary};

use mediaforge_core::error::{ContainerError, Error, Result};

/// Ordered per-sample sync flags with decode timestamps, microseconds.
///
/// Derived from a video track's stts/stss tables at scan time and
/// discarded with the scan; never cached across container opens.
#[derive(Debug, Clone, Default)]
pub struct SyncSampleIndex {
    entries: Vec<(i64, bool)>,
}

impl SyncSampleIndex {
    /// Build an index from decode timestamps and 1-based sync sample numbers.
    ///
    /// An empty sync table means every sample is a sync sample.
    pub fn new(timestamps_us: Vec<i64>, sync_sample_numbers: &[u32]) -> Self {
        let all_sync = sync_sample_numbers.is_empty();
        let entries = timestamps_us
            .into_iter()
            .enumerate()
            .map(|(idx, ts)| {
                let number = idx as u32 + 1;
                (ts, all_sync || sync_sample_numbers.contains(&number))
            })
            .collect();
        Self { entries }
    }

    /// Number of samples in the index.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the index holds no samples.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Timestamp of the last sync sample in decode order, if any.
    pub fn last_sync_timestamp_us(&self) -> Option<i64> {
        self.entries
            .iter()
            .rev()
            .find(|(_, is_sync)| *is_sync)
            .map(|(ts, _)| *ts)
    }

    /// Timestamp of the first sync sample in decode order, if any.
    pub fn first_sync_timestamp_us(&self) -> Option<i64> {
        self.entries
            .iter()
            .find(|(_, is_sync)| *is_sync)
            .map(|(ts, _)| *ts)
    }

    /// Check whether a sync sample sits exactly at the given timestamp.
    pub fn is_sync_at(&self, timestamp_us: i64) -> bool {
        self.entries
            .iter()
            .any(|(ts, is_sync)| *is_sync && *ts == timestamp_us)
    }
}

/// Read a 32-bit big-endian integer.
fn read_u32_be(data: &[u8]) -> Result<u32> {
    if data.len() < 4 {
        return Err(Error::Container(ContainerError::InvalidStructure(
            "Not enough data for u32".into(),
        )));
    }
    Ok(u32::from_be_bytes([data[0], data[1], data[2], data[3]]))
}

/// Read a 64-bit big-endian integer.
fn read_u64_be(data: &[u8]) -> Result<u64> {
    if data.len() < 8 {
        return Err(Error::Container(ContainerError::InvalidStructure(
            "Not enough data for u64".into(),
        )));
    }
    Ok(u64::from_be_bytes([
        data[0], data[1], data[2], data[3], data[4], data[5], data[6], data[7],
    ]))
}
