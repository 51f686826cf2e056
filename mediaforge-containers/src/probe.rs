//! Container format probing.
//!
//! A cheap signature check used to decide whether an input is worth
//! handing to the MP4 parser, and to tell "malformed" apart from
//! "valid but not MP4".

use mediaforge_core::format::ContainerFormat;

/// Result of probing the first bytes of an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbedFormat {
    /// A recognized container format.
    Known(ContainerFormat),
    /// No recognizable container signature.
    Unrecognized,
}

/// Probe a byte prefix for a container signature.
///
/// Inspects at most the provided bytes; 16 bytes are enough for every
/// signature checked here.
pub fn probe_bytes(buffer: &[u8]) -> ProbedFormat {
    if buffer.len() >= 8 {
        // MP4/MOV: an ftyp box right at the start.
        if &buffer[4..8] == b"ftyp" {
            return ProbedFormat::Known(ContainerFormat::Mp4);
        }

        // Matroska/WebM: EBML header.
        if buffer.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]) {
            let is_webm = buffer.windows(4).any(|w| w == b"webm");
            return ProbedFormat::Known(if is_webm {
                ContainerFormat::WebM
            } else {
                ContainerFormat::Mkv
            });
        }

        // MPEG-TS: sync byte, repeated at the packet boundary when visible.
        if buffer[0] == 0x47 && (buffer.len() <= 188 || buffer[188] == 0x47) {
            return ProbedFormat::Known(ContainerFormat::MpegTs);
        }
    }

    ProbedFormat::Unrecognized
}
