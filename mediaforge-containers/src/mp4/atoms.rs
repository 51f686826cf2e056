//! MP4 atom (box) parsing.
//!
//! Only the atoms needed for track enumeration and sample timing are
//! parsed; everything else is skipped by size.

use super::{read_u32_be, read_u64_be};
use mediaforge_core::error::{ContainerError, Error, Result};
use std::io::{Read, Seek, SeekFrom};

/// Maximum size accepted for a metadata atom's content (64 MB).
/// Caps allocations driven by malformed size fields.
const MAX_ATOM_CONTENT_SIZE: u64 = 64 * 1024 * 1024;

/// Validate that an allocation size is within acceptable limits.
pub(super) fn validate_allocation_size(size: u64) -> Result<usize> {
    if size > MAX_ATOM_CONTENT_SIZE {
        return Err(Error::Container(ContainerError::InvalidSize {
            offset: 0,
            message: format!(
                "atom content size {} exceeds maximum {}",
                size, MAX_ATOM_CONTENT_SIZE
            ),
        }));
    }
    Ok(size as usize)
}

/// Atom header.
#[derive(Debug, Clone)]
pub struct AtomHeader {
    /// Atom type (4 bytes).
    pub atom_type: [u8; 4],
    /// Atom size (including header).
    pub size: u64,
    /// Header size (8 or 16 bytes).
    pub header_size: u8,
    /// Offset in file.
    pub offset: u64,
}

impl AtomHeader {
    /// Read an atom header from the reader.
    ///
    /// Returns `None` at a clean end of input.
    pub fn read<R: Read + Seek + ?Sized>(reader: &mut R) -> Result<Option<Self>> {
        let offset = reader.stream_position()?;

        let mut header = [0u8; 8];
        match reader.read_exact(&mut header) {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        let size = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
        let atom_type = [header[4], header[5], header[6], header[7]];

        let (size, header_size) = if size == 1 {
            // Extended 64-bit size.
            let mut ext_size = [0u8; 8];
            reader.read_exact(&mut ext_size)?;
            (u64::from_be_bytes(ext_size), 16u8)
        } else if size == 0 {
            // Size extends to end of file.
            let current = reader.stream_position()?;
            let end = reader.seek(SeekFrom::End(0))?;
            reader.seek(SeekFrom::Start(current))?;
            (end - offset, 8)
        } else {
            (size as u64, 8)
        };

        if size < header_size as u64 {
            return Err(Error::Container(ContainerError::InvalidSize {
                offset,
                message: format!("atom size {} smaller than its header", size),
            }));
        }

        Ok(Some(Self {
            atom_type,
            size,
            header_size,
            offset,
        }))
    }

    /// Get content size (size - header).
    pub fn content_size(&self) -> u64 {
        self.size - self.header_size as u64
    }

    /// Offset of the first byte past this atom.
    pub fn end_offset(&self) -> u64 {
        self.offset + self.size
    }
}

/// Movie header atom (mvhd), trimmed to presentation timing.
#[derive(Debug, Clone)]
pub struct MvhdAtom {
    /// Timescale (units per second).
    pub timescale: u32,
    /// Duration in timescale units.
    pub duration: u64,
}

impl MvhdAtom {
    /// Parse an mvhd atom.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Err(Error::Container(ContainerError::InvalidStructure(
                "mvhd atom empty".into(),
            )));
        }

        let version = data[0];
        let (timescale, duration) = if version == 1 {
            if data.len() < 32 {
                return Err(Error::Container(ContainerError::InvalidStructure(
                    "mvhd v1 atom too short".into(),
                )));
            }
            (read_u32_be(&data[20..24])?, read_u64_be(&data[24..32])?)
        } else {
            if data.len() < 20 {
                return Err(Error::Container(ContainerError::InvalidStructure(
                    "mvhd v0 atom too short".into(),
                )));
            }
            (read_u32_be(&data[12..16])?, read_u32_be(&data[16..20])? as u64)
        };

        Ok(Self { timescale, duration })
    }

    /// Get duration in microseconds.
    pub fn duration_us(&self) -> i64 {
        if self.timescale == 0 {
            return 0;
        }
        (self.duration as i64).saturating_mul(1_000_000) / self.timescale as i64
    }
}

/// Media header atom (mdhd), trimmed to media timing.
#[derive(Debug, Clone)]
pub struct MdhdAtom {
    /// Media timescale (units per second).
    pub timescale: u32,
    /// Media duration in timescale units.
    pub duration: u64,
}

impl MdhdAtom {
    /// Parse an mdhd atom.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Err(Error::Container(ContainerError::InvalidStructure(
                "mdhd atom empty".into(),
            )));
        }

        let version = data[0];
        let (timescale, duration) = if version == 1 {
            if data.len() < 32 {
                return Err(Error::Container(ContainerError::InvalidStructure(
                    "mdhd v1 atom too short".into(),
                )));
            }
            (read_u32_be(&data[20..24])?, read_u64_be(&data[24..32])?)
        } else {
            if data.len() < 20 {
                return Err(Error::Container(ContainerError::InvalidStructure(
                    "mdhd v0 atom too short".into(),
                )));
            }
            (read_u32_be(&data[12..16])?, read_u32_be(&data[16..20])? as u64)
        };

        Ok(Self { timescale, duration })
    }
}

/// Handler reference atom (hdlr).
#[derive(Debug, Clone)]
pub struct HdlrAtom {
    /// Handler type.
    pub handler_type: [u8; 4],
}

impl HdlrAtom {
    /// Parse an hdlr atom.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 12 {
            return Err(Error::Container(ContainerError::InvalidStructure(
                "hdlr atom too short".into(),
            )));
        }

        let handler_type = [data[8], data[9], data[10], data[11]];
        Ok(Self { handler_type })
    }

    /// Check if this is a video handler.
    pub fn is_video(&self) -> bool {
        &self.handler_type == b"vide"
    }

    /// Check if this is an audio handler.
    pub fn is_audio(&self) -> bool {
        &self.handler_type == b"soun"
    }
}

/// Sample timing tables from a track's stbl, trimmed to decode deltas and
/// sync sample numbers.
#[derive(Debug, Clone, Default)]
pub struct SampleTiming {
    /// Time-to-sample entries: (sample_count, sample_delta).
    pub stts: Vec<(u32, u32)>,
    /// 1-based sync sample numbers. Empty means every sample is a sync sample.
    pub sync_samples: Vec<u32>,
}

impl SampleTiming {
    /// Parse the timing tables out of an stbl atom's children.
    pub fn parse<R: Read + Seek + ?Sized>(reader: &mut R, stbl_end: u64) -> Result<Self> {
        let mut timing = SampleTiming::default();

        while reader.stream_position()? < stbl_end {
            let Some(header) = AtomHeader::read(reader)? else {
                break;
            };

            match &header.atom_type {
                b"stts" => {
                    let size = validate_allocation_size(header.content_size())?;
                    let mut content = vec![0u8; size];
                    reader.read_exact(&mut content)?;
                    timing.stts = Self::parse_stts(&content)?;
                }
                b"stss" => {
                    let size = validate_allocation_size(header.content_size())?;
                    let mut content = vec![0u8; size];
                    reader.read_exact(&mut content)?;
                    timing.sync_samples = Self::parse_stss(&content)?;
                }
                _ => {
                    reader.seek(SeekFrom::Start(header.end_offset()))?;
                }
            }
        }

        Ok(timing)
    }

    fn parse_stts(data: &[u8]) -> Result<Vec<(u32, u32)>> {
        if data.len() < 8 {
            return Err(Error::Container(ContainerError::InvalidStructure(
                "stts too short".into(),
            )));
        }

        let entry_count = read_u32_be(&data[4..8])? as usize;
        let mut entries = Vec::with_capacity(entry_count.min(1024));
        let mut offset = 8;

        for _ in 0..entry_count {
            if offset + 8 > data.len() {
                break;
            }
            let sample_count = read_u32_be(&data[offset..offset + 4])?;
            let sample_delta = read_u32_be(&data[offset + 4..offset + 8])?;
            entries.push((sample_count, sample_delta));
            offset += 8;
        }

        Ok(entries)
    }

    fn parse_stss(data: &[u8]) -> Result<Vec<u32>> {
        if data.len() < 8 {
            return Err(Error::Container(ContainerError::InvalidStructure(
                "stss too short".into(),
            )));
        }

        let entry_count = read_u32_be(&data[4..8])? as usize;
        let mut entries = Vec::with_capacity(entry_count.min(1024));
        let mut offset = 8;

        for _ in 0..entry_count {
            if offset + 4 > data.len() {
                break;
            }
            entries.push(read_u32_be(&data[offset..offset + 4])?);
            offset += 4;
        }

        Ok(entries)
    }

    /// Total number of samples described by the timing table.
    pub fn sample_count(&self) -> usize {
        self.stts
            .iter()
            .fold(0usize, |acc, &(count, _)| acc.saturating_add(count as usize))
    }

    /// Decode timestamp of a sample, in timescale units.
    pub fn sample_timestamp(&self, sample_idx: usize) -> i64 {
        let mut ts = 0i64;
        let mut seen = 0usize;

        for &(count, delta) in &self.stts {
            let in_entry = count as usize;
            if seen.saturating_add(in_entry) > sample_idx {
                let remaining = sample_idx.saturating_sub(seen);
                return ts.saturating_add(remaining.saturating_mul(delta as usize) as i64);
            }
            ts = ts.saturating_add(in_entry.saturating_mul(delta as usize) as i64);
            seen = seen.saturating_add(in_entry);
        }

        ts
    }

    /// Decode timestamps for every sample, in timescale units.
    pub fn all_timestamps(&self) -> Vec<i64> {
        let mut timestamps = Vec::with_capacity(self.sample_count());
        let mut ts = 0i64;
        for &(count, delta) in &self.stts {
            for _ in 0..count {
                timestamps.push(ts);
                ts = ts.saturating_add(delta as i64);
            }
        }
        timestamps
    }
}
