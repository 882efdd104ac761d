//! Drives the message loop across the header-following *definitions* block.

use crate::byte_source::{ByteSource, Whence};
use crate::errors::Error;

use super::ParseState;

/// Parse definitions records until a data-section tag (`A`, `L`, or `C`) is
/// seen, then rewind so the data parser can re-read that same record.
pub(super) fn run<S: ByteSource>(source: &mut S, state: &mut ParseState) -> Result<(), Error> {
    loop {
        let Some(header) = source.read_exact_or_eof(3)? else {
            return Ok(());
        };
        let msg_size = u16::from_le_bytes([header[0], header[1]]);
        let msg_type = header[2];

        let Some(payload) = source.read_exact_or_eof(msg_size as usize)? else {
            state.file_corrupt = true;
            return Ok(());
        };

        match msg_type {
            b'F' => state.apply_format(&payload),
            b'I' => state.apply_info(&payload),
            b'M' => state.apply_info_multi(&payload),
            b'P' => state.apply_initial_parameter(&payload),
            b'Q' => state.apply_default_parameter(&payload),
            b'B' => state.apply_flag_bits(&payload)?,
            b'A' | b'L' | b'C' => {
                source.seek_relative(-(i64::from(msg_size) + 3), Whence::Current)?;
                return Ok(());
            }
            _ => {
                // The definitions phase has no resynchronisation of its own;
                // unrecognised tags here are simply skipped, matching the
                // reference decoder's lenient scan of this section.
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::ParseState;
    use super::run;
    use crate::byte_source::{ByteSource, SliceSource};

    fn record(msg_type: u8, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&(payload.len() as u16).to_le_bytes());
        out.push(msg_type);
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn parses_format_and_info_then_stops_before_add_logged() {
        let mut bytes = Vec::new();
        bytes.extend(record(b'F', b"ping:uint64_t timestamp;float x;"));
        let mut info_payload = vec![b"char[4] name".len() as u8];
        info_payload.extend_from_slice(b"char[4] name");
        info_payload.extend_from_slice(b"PX4!");
        bytes.extend(record(b'I', &info_payload));
        let add_logged = record(b'A', &[0, 1, 0, b'p', b'i', b'n', b'g']);
        let add_logged_start = bytes.len() as u64;
        bytes.extend(&add_logged);

        let mut src = SliceSource::new(&bytes);
        let mut state = ParseState::new(None, false);
        run(&mut src, &mut state).unwrap();

        assert!(state.registry.get("ping").is_some());
        assert_eq!(state.msg_info_dict.len(), 1);
        assert_eq!(src.tell(), add_logged_start);
    }
}
