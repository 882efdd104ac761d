//! Serialises a [`Model`] back into ULog bytes: the structural inverse of
//! [`crate::parser`].
//!
//! Sync markers and appended-region stitching are parser-side recovery
//! concerns only; a freshly written file never needs either, so this module
//! always emits a single contiguous definitions-then-data stream with the
//! appended-data incompat bit cleared. [`Model`]'s `PartialEq` already
//! ignores the fields this drops (`sync_count`, `appended_offsets`, and that
//! bit), so `open(&mut write(model)) == model` holds.

mod timeline;

use std::io::Write;

use crate::errors::Error;
use crate::model::info::{InfoRecord, InfoValue};
use crate::model::Model;

const HEADER_MAGIC: [u8; 7] = [0x55, 0x4C, 0x6F, 0x67, 0x01, 0x12, 0x35];

impl Model {
    /// Serialise this model back to ULog bytes.
    pub fn write<W: Write>(&self, sink: &mut W) -> Result<(), Error> {
        let mut out = Vec::new();
        out.extend_from_slice(&HEADER_MAGIC);
        out.push(self.file_version);
        out.extend_from_slice(&self.start_timestamp.to_le_bytes());

        write_flag_bits(&mut out, self);
        write_formats(&mut out, self);
        write_info(&mut out, self);
        write_info_multi(&mut out, self);
        write_initial_parameters(&mut out, self);
        write_default_parameters(&mut out, self);

        write_add_logged(&mut out, self);
        timeline::write_timeline(&mut out, self);

        sink.write_all(&out)?;
        Ok(())
    }
}

fn write_record(out: &mut Vec<u8>, msg_type: u8, payload: &[u8]) {
    out.extend_from_slice(&(payload.len() as u16).to_le_bytes());
    out.push(msg_type);
    out.extend_from_slice(payload);
}

fn write_flag_bits(out: &mut Vec<u8>, model: &Model) {
    let mut payload = vec![0u8; 40];
    payload[0..8].copy_from_slice(&model.compat_flags);
    let mut incompat = model.incompat_flags;
    incompat[0] &= !0x1;
    payload[8..16].copy_from_slice(&incompat);
    write_record(out, b'B', &payload);
}

fn write_formats(out: &mut Vec<u8>, model: &Model) {
    for decl in model.message_formats.values() {
        write_record(out, b'F', decl.to_text().as_bytes());
    }
}

fn write_info(out: &mut Vec<u8>, model: &Model) {
    for (key, value) in &model.msg_info_dict {
        let type_name = model
            .msg_info_dict_types
            .get(key)
            .cloned()
            .unwrap_or_default();
        let record = InfoRecord {
            type_name,
            key: key.clone(),
            value: value.clone(),
        };
        let mut payload = Vec::new();
        record.encode(&mut payload);
        write_record(out, b'I', &payload);
    }
}

fn write_info_multi(out: &mut Vec<u8>, model: &Model) {
    for (key, runs) in &model.msg_info_multiple_dict {
        let type_name = model
            .msg_info_multiple_dict_types
            .get(key)
            .cloned()
            .unwrap_or_default();
        for run in runs {
            for (i, value) in run.iter().enumerate() {
                let record = InfoRecord {
                    type_name: type_name.clone(),
                    key: key.clone(),
                    value: value.clone(),
                };
                let mut payload = vec![u8::from(i != 0)];
                record.encode(&mut payload);
                write_record(out, b'M', &payload);
            }
        }
    }
}

fn write_initial_parameters(out: &mut Vec<u8>, model: &Model) {
    for (key, param) in &model.initial_parameters {
        let record = InfoRecord {
            type_name: param.type_name.clone(),
            key: key.clone(),
            value: InfoValue::Scalar(param.value),
        };
        let mut payload = Vec::new();
        record.encode(&mut payload);
        write_record(out, b'P', &payload);
    }
}

/// Default parameters are stored per bitfield index; each `(bit, name)` pair
/// round-trips as its own `Q` record with only that bit set. This may split
/// a record that originally set several bits at once into several
/// single-bit records, but reparsing either form folds back into the same
/// `default_parameters` map, so the result is unaffected.
fn write_default_parameters(out: &mut Vec<u8>, model: &Model) {
    for (&bit, params) in &model.default_parameters {
        for (key, param) in params {
            let record = InfoRecord {
                type_name: param.type_name.clone(),
                key: key.clone(),
                value: InfoValue::Scalar(param.value),
            };
            let mut payload = vec![1u8 << bit];
            record.encode(&mut payload);
            write_record(out, b'Q', &payload);
        }
    }
}

fn write_add_logged(out: &mut Vec<u8>, model: &Model) {
    let mut datasets: Vec<_> = model.data_list.iter().collect();
    datasets.sort_by_key(|d| d.msg_id);
    for dataset in datasets {
        let mut payload = vec![dataset.multi_id];
        payload.extend_from_slice(&dataset.msg_id.to_le_bytes());
        payload.extend_from_slice(dataset.message_name.as_bytes());
        write_record(out, b'A', &payload);
    }
}
