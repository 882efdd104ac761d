//! Drives the message loop across the data block, optionally bounded by an
//! appended-region offset.

use crate::byte_source::ByteSource;
use crate::errors::Error;

use super::recovery::{self, Resync};
use super::ParseState;

/// Corrupt-packet sanity bound on `msg_size` (spec.md §4.5).
const MAX_SANE_MSG_SIZE: u16 = 10_000;

/// Parse data records until EOF or, if `read_until` is set, until the
/// source reaches that absolute offset (used by the appended-section
/// stitcher to bound each region).
pub(super) fn run<S: ByteSource>(
    source: &mut S,
    state: &mut ParseState,
    read_until: Option<u64>,
) -> Result<(), Error> {
    loop {
        if read_until.is_some_and(|limit| source.tell() >= limit) {
            return Ok(());
        }

        let Some(header) = source.read_exact_or_eof(3)? else {
            return Ok(());
        };
        let msg_size = u16::from_le_bytes([header[0], header[1]]);
        let msg_type = header[2];

        if msg_type == 0 || msg_size == 0 || msg_size > MAX_SANE_MSG_SIZE {
            state.file_corrupt = true;
            log::debug!("corrupt record header (type={msg_type}, size={msg_size}); resynchronising");
            match recovery::bounded_range_scan(source, msg_size)? {
                Resync::Found => continue,
                Resync::Stop => return Ok(()),
            }
        }

        let Some(payload) = source.read_exact_or_eof(msg_size as usize)? else {
            return Ok(());
        };

        match msg_type {
            b'A' => state.apply_add_logged(&payload),
            b'R' => {}
            b'D' => state.apply_data(&payload),
            b'P' => state.apply_changed_parameter(&payload),
            b'Q' => state.apply_default_parameter(&payload),
            b'I' => state.apply_info(&payload),
            b'M' => state.apply_info_multi(&payload),
            b'L' => state.apply_logging(&payload),
            b'C' => state.apply_logging_tagged(&payload),
            b'O' => state.apply_dropout(&payload),
            b'S' => state.sync_count += 1,
            _ => {
                state.file_corrupt = true;
                log::debug!("unrecognised record tag {msg_type:#x}; resynchronising");
                match recovery::unknown_tag_resync(source, msg_size)? {
                    Resync::Found => {}
                    Resync::Stop => return Ok(()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::ParseState;
    use super::run;
    use crate::byte_source::SliceSource;
    use crate::schema::FormatDecl;

    fn record(msg_type: u8, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&(payload.len() as u16).to_le_bytes());
        out.push(msg_type);
        out.extend_from_slice(payload);
        out
    }

    fn state_with_ping() -> ParseState {
        let mut state = ParseState::new(None, false);
        state
            .registry
            .insert(FormatDecl::parse("ping:uint64_t timestamp;float x;").unwrap());
        state
    }

    #[test]
    fn add_logged_then_two_data_records_tracks_last_timestamp() {
        let mut state = state_with_ping();
        let mut bytes = Vec::new();
        bytes.extend(record(b'A', &[0, 1, 0, b'p', b'i', b'n', b'g']));

        let mut rec1 = vec![1, 0];
        rec1.extend_from_slice(&200u64.to_le_bytes());
        rec1.extend_from_slice(&1.0f32.to_le_bytes());
        bytes.extend(record(b'D', &rec1));

        let mut rec2 = vec![1, 0];
        rec2.extend_from_slice(&300u64.to_le_bytes());
        rec2.extend_from_slice(&2.0f32.to_le_bytes());
        bytes.extend(record(b'D', &rec2));

        let mut src = SliceSource::new(&bytes);
        run(&mut src, &mut state, None).unwrap();

        assert_eq!(state.last_timestamp, 300);
        assert_eq!(state.subscriptions.get(&1).unwrap().buffer.len(), 24);
        assert!(!state.file_corrupt);
    }

    #[test]
    fn size_mismatch_marks_corrupt_without_crashing() {
        let mut state = state_with_ping();
        let mut bytes = record(b'A', &[0, 1, 0, b'p', b'i', b'n', b'g']);
        bytes.extend(record(b'D', &[1, 0, 9, 9, 9])); // too short for the schema

        let mut src = SliceSource::new(&bytes);
        run(&mut src, &mut state, None).unwrap();
        assert!(state.file_corrupt);
        assert!(state.subscriptions.get(&1).unwrap().buffer.is_empty());
    }

    #[test]
    fn data_for_undeclared_id_warns_once_and_ignores() {
        let mut state = ParseState::new(None, false);
        let bytes = record(b'D', &[9, 0, 1, 2, 3, 4]);
        let mut src = SliceSource::new(&bytes);
        run(&mut src, &mut state, None).unwrap();
        assert!(state.missing_message_ids_warned.contains(&9));
    }

    #[test]
    fn corrupt_header_with_oversized_size_stops_cleanly() {
        let mut state = ParseState::new(None, false);
        let mut bytes = vec![0xFF, 0xFF, b'D']; // msg_size = 0xFFFF > 10000
        bytes.extend(vec![0u8; 20]);
        let mut src = SliceSource::new(&bytes);
        run(&mut src, &mut state, None).unwrap();
        assert!(state.file_corrupt);
    }
}
