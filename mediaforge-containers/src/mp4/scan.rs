//! MP4 track scanning and sync-point extraction.

use super::atoms::{validate_allocation_size, AtomHeader, HdlrAtom, MdhdAtom, MvhdAtom, SampleTiming};
use super::SyncSampleIndex;
use crate::probe::{probe_bytes, ProbedFormat};
use mediaforge_core::error::{ContainerError, Error, Result};
use mediaforge_core::format::{ContainerFormat, TrackType};
use mediaforge_core::time::{DurationUs, TimeBase};
use std::io::{Read, Seek, SeekFrom};
use tracing::debug;

/// Per-track metadata recovered from the moov tree.
#[derive(Debug, Clone)]
pub struct TrackSummary {
    /// Track type from the media handler.
    pub track_type: TrackType,
    /// Media timescale (units per second).
    pub timescale: u32,
    /// Media duration.
    pub duration_us: DurationUs,
    /// Sample timing tables.
    timing: SampleTiming,
}

impl TrackSummary {
    /// Number of samples in the track.
    pub fn sample_count(&self) -> usize {
        self.timing.sample_count()
    }

    /// Build the per-sample sync index in microseconds.
    pub fn sync_sample_index(&self) -> SyncSampleIndex {
        let time_base = TimeBase::new(1, self.timescale.max(1) as i64);
        let timestamps_us = self
            .timing
            .all_timestamps()
            .into_iter()
            .map(|ts| time_base.to_micros(ts))
            .collect();
        SyncSampleIndex::new(timestamps_us, &self.timing.sync_samples)
    }
}

/// Parsed MP4 metadata: movie duration and track summaries.
///
/// Holds no reader handle; the scan consumes the input and releases it on
/// every exit path.
#[derive(Debug, Default)]
pub struct Mp4MetadataReader {
    duration_us: Option<i64>,
    tracks: Vec<TrackSummary>,
}

impl Mp4MetadataReader {
    /// Parse the metadata atoms of an MP4 input.
    ///
    /// Fails with a container error when the input lacks a moov atom or a
    /// required child atom is malformed. Sample payloads (mdat) are skipped.
    pub fn parse<R: Read + Seek + ?Sized>(reader: &mut R) -> Result<Self> {
        reader.seek(SeekFrom::Start(0))?;

        let mut result = Mp4MetadataReader::default();
        let mut moov_seen = false;

        while let Some(header) = AtomHeader::read(reader)? {
            match &header.atom_type {
                b"moov" => {
                    moov_seen = true;
                    result.parse_moov(reader, &header)?;
                }
                _ => {
                    reader.seek(SeekFrom::Start(header.end_offset()))?;
                }
            }
        }

        if !moov_seen {
            return Err(Error::Container(ContainerError::MissingElement(
                "moov".into(),
            )));
        }

        debug!(
            tracks = result.tracks.len(),
            duration_us = ?result.duration_us,
            "parsed mp4 metadata"
        );
        Ok(result)
    }

    /// Presentation duration from the movie header, in microseconds.
    pub fn duration_us(&self) -> Option<i64> {
        self.duration_us
    }

    /// All track summaries, in file order.
    pub fn tracks(&self) -> &[TrackSummary] {
        &self.tracks
    }

    /// The first video track, if any.
    pub fn video_track(&self) -> Option<&TrackSummary> {
        self.tracks
            .iter()
            .find(|t| t.track_type == TrackType::Video)
    }

    /// Timestamp of the last video sync sample, in microseconds.
    ///
    /// `None` when the file has no video track or the video track has no
    /// samples.
    pub fn last_video_sync_timestamp(&self) -> Option<i64> {
        self.video_track()
            .and_then(|t| t.sync_sample_index().last_sync_timestamp_us())
    }

    fn parse_moov<R: Read + Seek + ?Sized>(
        &mut self,
        reader: &mut R,
        moov: &AtomHeader,
    ) -> Result<()> {
        let end = moov.end_offset();
        reader.seek(SeekFrom::Start(moov.offset + moov.header_size as u64))?;

        while reader.stream_position()? < end {
            let Some(header) = AtomHeader::read(reader)? else {
                break;
            };

            match &header.atom_type {
                b"mvhd" => {
                    let size = validate_allocation_size(header.content_size())?;
                    let mut content = vec![0u8; size];
                    reader.read_exact(&mut content)?;
                    self.duration_us = Some(MvhdAtom::parse(&content)?.duration_us());
                }
                b"trak" => {
                    self.parse_trak(reader, &header)?;
                }
                _ => {
                    reader.seek(SeekFrom::Start(header.end_offset()))?;
                }
            }
        }

        reader.seek(SeekFrom::Start(end))?;
        Ok(())
    }

    fn parse_trak<R: Read + Seek + ?Sized>(
        &mut self,
        reader: &mut R,
        trak: &AtomHeader,
    ) -> Result<()> {
        let end = trak.end_offset();
        reader.seek(SeekFrom::Start(trak.offset + trak.header_size as u64))?;

        let mut mdhd: Option<MdhdAtom> = None;
        let mut hdlr: Option<HdlrAtom> = None;
        let mut timing: Option<SampleTiming> = None;

        while reader.stream_position()? < end {
            let Some(header) = AtomHeader::read(reader)? else {
                break;
            };

            if &header.atom_type == b"mdia" {
                let mdia_end = header.end_offset();
                while reader.stream_position()? < mdia_end {
                    let Some(mdia_child) = AtomHeader::read(reader)? else {
                        break;
                    };

                    match &mdia_child.atom_type {
                        b"mdhd" => {
                            let size = validate_allocation_size(mdia_child.content_size())?;
                            let mut content = vec![0u8; size];
                            reader.read_exact(&mut content)?;
                            mdhd = Some(MdhdAtom::parse(&content)?);
                        }
                        b"hdlr" => {
                            let size = validate_allocation_size(mdia_child.content_size())?;
                            let mut content = vec![0u8; size];
                            reader.read_exact(&mut content)?;
                            hdlr = Some(HdlrAtom::parse(&content)?);
                        }
                        b"minf" => {
                            let minf_end = mdia_child.end_offset();
                            while reader.stream_position()? < minf_end {
                                let Some(minf_child) = AtomHeader::read(reader)? else {
                                    break;
                                };

                                if &minf_child.atom_type == b"stbl" {
                                    timing = Some(SampleTiming::parse(
                                        reader,
                                        minf_child.end_offset(),
                                    )?);
                                } else {
                                    reader.seek(SeekFrom::Start(minf_child.end_offset()))?;
                                }
                            }
                        }
                        _ => {
                            reader.seek(SeekFrom::Start(mdia_child.end_offset()))?;
                        }
                    }
                }
            } else {
                reader.seek(SeekFrom::Start(header.end_offset()))?;
            }
        }

        if let (Some(mdhd), Some(hdlr), Some(timing)) = (mdhd, hdlr, timing) {
            let track_type = if hdlr.is_video() {
                TrackType::Video
            } else if hdlr.is_audio() {
                TrackType::Audio
            } else {
                TrackType::Unknown
            };

            let time_base = TimeBase::new(1, mdhd.timescale.max(1) as i64);
            let summary = TrackSummary {
                track_type,
                timescale: mdhd.timescale,
                duration_us: DurationUs::from_micros(time_base.to_micros(mdhd.duration as i64)),
                timing,
            };
            debug!(
                track_type = %summary.track_type,
                samples = summary.sample_count(),
                "found track"
            );
            self.tracks.push(summary);
        }

        reader.seek(SeekFrom::Start(end))?;
        Ok(())
    }
}

/// Report the timestamp of the last video sync sample in an MP4 input.
///
/// The reader handle is owned by this scan and dropped on every exit path.
/// Returns:
/// - `Ok(Some(timestamp_us))` for an MP4 with a video track;
/// - `Ok(None)` for a valid MP4 without video (audio-only is not an error);
/// - a container error when the input is empty or has no recognizable
///   header;
/// - [`Error::Unsupported`] when the input is a recognizable container of a
///   different format.
pub fn last_video_sync_timestamp<R: Read + Seek>(mut reader: R) -> Result<Option<i64>> {
    let mut prefix = [0u8; 16];
    let mut filled = 0usize;
    loop {
        let n = reader.read(&mut prefix[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
        if filled == prefix.len() {
            break;
        }
    }

    if filled == 0 {
        return Err(Error::Container(ContainerError::InvalidStructure(
            "empty input".into(),
        )));
    }

    match probe_bytes(&prefix[..filled]) {
        ProbedFormat::Known(ContainerFormat::Mp4) => {}
        ProbedFormat::Known(other) => {
            return Err(Error::unsupported(format!("{} container", other)));
        }
        ProbedFormat::Unrecognized => {
            return Err(Error::Container(ContainerError::InvalidStructure(
                "no recognizable container header".into(),
            )));
        }
    }

    let metadata = Mp4MetadataReader::parse(&mut reader)?;
    let timestamp = metadata.last_video_sync_timestamp();
    debug!(last_sync_us = ?timestamp, "sync-point scan complete");
    Ok(timestamp)
}
