//! Sync-marker-based resynchronisation after a corrupt or unrecognised record.

use crate::byte_source::{ByteSource, Whence};

/// The 8-byte pattern the logger sporadically emits inside `S` records,
/// used to find a safe place to resume parsing after corruption.
pub(super) const SYNC_MARKER: [u8; 8] = [0x2F, 0x73, 0x13, 0x20, 0x25, 0x0C, 0xBB, 0x12];

/// The outcome of a resynchronisation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Resync {
    /// The marker was found; the source is now positioned right after it.
    Found,
    /// The marker was not found before running out of input to scan; the
    /// caller should treat the current position as end-of-stream.
    Stop,
}

/// Unknown-tag path (spec.md §4.6): the header was well-formed but its
/// `msg_type` is not one this parser recognises. Seeks back so the scan
/// includes the payload already consumed, then scans forward in
/// overlapping 512-byte chunks.
pub(super) fn unknown_tag_resync<S: ByteSource>(
    source: &mut S,
    msg_size: u16,
) -> std::io::Result<Resync> {
    source.seek_relative(-(i64::from(msg_size) + 2), Whence::Current)?;
    scan_forward(source)
}

/// Bounded-range scan (spec.md §4.6): the record header itself failed the
/// corrupt-packet sanity predicate, so only the next `min(msg_size, 10000)`
/// bytes are searched, never the whole rest of the file.
pub(super) fn bounded_range_scan<S: ByteSource>(
    source: &mut S,
    msg_size: u16,
) -> std::io::Result<Resync> {
    let window = (msg_size as usize).min(10_000);
    if window == 0 {
        return Ok(Resync::Stop);
    }
    let bytes = source.read_up_to(window)?;
    match find_marker(&bytes) {
        Some(idx) => {
            let rewind = bytes.len() as i64 - (idx as i64 + SYNC_MARKER.len() as i64);
            source.seek_relative(-rewind, Whence::Current)?;
            Ok(Resync::Found)
        }
        None => Ok(Resync::Stop),
    }
}

/// Scan forward in 512-byte chunks, overlapping each chunk with the last 7
/// bytes of the previous one so the marker is never missed when it straddles
/// a chunk boundary.
fn scan_forward<S: ByteSource>(source: &mut S) -> std::io::Result<Resync> {
    const CHUNK: usize = 512;
    const OVERLAP: usize = SYNC_MARKER.len() - 1;

    let mut carry: Vec<u8> = Vec::new();
    loop {
        let chunk = source.read_up_to(CHUNK)?;
        if chunk.is_empty() {
            return Ok(Resync::Stop);
        }
        let reached_eof = chunk.len() < CHUNK;

        let mut window = carry;
        window.extend_from_slice(&chunk);
        if let Some(idx) = find_marker(&window) {
            let rewind = window.len() as i64 - (idx as i64 + SYNC_MARKER.len() as i64);
            source.seek_relative(-rewind, Whence::Current)?;
            return Ok(Resync::Found);
        }

        if reached_eof {
            return Ok(Resync::Stop);
        }
        carry = window[window.len() - OVERLAP.min(window.len())..].to_vec();
    }
}

fn find_marker(haystack: &[u8]) -> Option<usize> {
    haystack
        .windows(SYNC_MARKER.len())
        .position(|w| w == SYNC_MARKER)
}
