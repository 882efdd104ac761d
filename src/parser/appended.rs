//! Stitches crash-survivable appended regions into the same logical data
//! stream the definitions block declared.

use crate::byte_source::ByteSource;
use crate::errors::Error;

use super::{data, ParseState};

/// If the flag bits declared appended regions, run the data parser once per
/// region boundary, then once more unbounded for the final region.
pub(super) fn run<S: ByteSource>(source: &mut S, state: &mut ParseState) -> Result<(), Error> {
    let appended_data_bit_set = state.incompat_flags[0] & 0x1 != 0;
    if !appended_data_bit_set || state.appended_offsets.is_empty() {
        return data::run(source, state, None);
    }

    let offsets = state.appended_offsets.clone();
    for offset in offsets {
        data::run(source, state, Some(offset))?;
        source.seek_to(offset)?;
    }
    data::run(source, state, None)
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

    #[test]
    fn stitches_two_regions_identically_to_one_contiguous_region() {
        let mut state = ParseState::new(None, false);
        state
            .registry
            .insert(FormatDecl::parse("ping:uint64_t timestamp;float x;").unwrap());

        let add_logged = record(b'A', &[0, 1, 0, b'p', b'i', b'n', b'g']);

        let mut rec1_payload = vec![1, 0];
        rec1_payload.extend_from_slice(&200u64.to_le_bytes());
        rec1_payload.extend_from_slice(&1.0f32.to_le_bytes());
        let rec1 = record(b'D', &rec1_payload);

        let mut rec2_payload = vec![1, 0];
        rec2_payload.extend_from_slice(&300u64.to_le_bytes());
        rec2_payload.extend_from_slice(&2.0f32.to_le_bytes());
        let rec2 = record(b'D', &rec2_payload);

        let mut bytes = Vec::new();
        bytes.extend(&add_logged);
        bytes.extend(&rec1);
        let split_offset = bytes.len() as u64;
        bytes.extend(&rec2);

        state.incompat_flags[0] = 0x1;
        state.appended_offsets = vec![split_offset];

        let mut src = SliceSource::new(&bytes);
        run(&mut src, &mut state).unwrap();

        let sub = state.subscriptions.get(&1).unwrap();
        assert_eq!(sub.buffer.len(), 24);
        assert_eq!(state.last_timestamp, 300);
    }

    #[test]
    fn without_the_appended_flag_runs_a_single_unbounded_pass() {
        let mut state = ParseState::new(None, false);
        state.appended_offsets = vec![5]; // present but flag bit not set
        let bytes = Vec::new();
        let mut src = SliceSource::new(&bytes);
        run(&mut src, &mut state).unwrap();
        assert_eq!(state.last_timestamp, 0);
    }
}
