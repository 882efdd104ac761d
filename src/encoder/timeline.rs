//! Builds the merged, timestamp-sorted stream of data/log/dropout/parameter
//! records that make up a written file's data section.

use crate::model::info::{InfoRecord, InfoValue};
use crate::model::{Dropout, LoggedMessage, Model, Parameter};
use crate::model::dataset::Dataset;

use super::write_record;

enum Event<'a> {
    Data { dataset: &'a Dataset, row: usize },
    Log(&'a LoggedMessage),
    TaggedLog { tag: u16, msg: &'a LoggedMessage },
    Dropout(&'a Dropout),
    ChangedParameter { name: &'a str, param: &'a Parameter },
}

fn dataset_timestamp(dataset: &Dataset, row: usize) -> u64 {
    match dataset.schema.timestamp_column {
        Some(idx) => match dataset.columns[idx].get(row) {
            crate::primitives::Value::UInt64(t) => t,
            _ => 0,
        },
        None => 0,
    }
}

/// Build and write the merged data-section timeline, stably sorted by
/// timestamp (spec.md §4.9).
pub(super) fn write_timeline(out: &mut Vec<u8>, model: &Model) {
    let mut keyed: Vec<(u64, Event<'_>)> = Vec::new();

    for dataset in &model.data_list {
        for row in 0..dataset.len() {
            let t = dataset_timestamp(dataset, row);
            keyed.push((t, Event::Data { dataset, row }));
        }
    }
    for msg in &model.logged_messages {
        keyed.push((msg.timestamp, Event::Log(msg)));
    }
    for (&tag, msgs) in &model.logged_messages_tagged {
        for msg in msgs {
            keyed.push((msg.timestamp, Event::TaggedLog { tag, msg }));
        }
    }
    for dropout in &model.dropouts {
        keyed.push((dropout.timestamp, Event::Dropout(dropout)));
    }
    for (timestamp, name, param) in &model.changed_parameters {
        keyed.push((*timestamp, Event::ChangedParameter { name, param }));
    }

    keyed.sort_by_key(|(t, _)| *t);

    for (_, event) in &keyed {
        write_event(out, event);
    }
}

fn write_event(out: &mut Vec<u8>, event: &Event<'_>) {
    match event {
        Event::Data { dataset, row } => {
            let mut payload = dataset.msg_id.to_le_bytes().to_vec();
            for column in &dataset.columns {
                column.encode_at(*row, &mut payload);
            }
            write_record(out, b'D', &payload);
        }
        Event::Log(msg) => {
            let mut payload = vec![msg.log_level];
            payload.extend_from_slice(&msg.timestamp.to_le_bytes());
            payload.extend_from_slice(msg.text.as_bytes());
            write_record(out, b'L', &payload);
        }
        Event::TaggedLog { tag, msg } => {
            let mut payload = vec![msg.log_level];
            payload.extend_from_slice(&tag.to_le_bytes());
            payload.extend_from_slice(&msg.timestamp.to_le_bytes());
            payload.extend_from_slice(msg.text.as_bytes());
            write_record(out, b'C', &payload);
        }
        Event::Dropout(dropout) => {
            write_record(out, b'O', &dropout.duration_ms.to_le_bytes());
        }
        Event::ChangedParameter { name, param } => {
            let record = InfoRecord {
                type_name: param.type_name.clone(),
                key: (*name).to_string(),
                value: InfoValue::Scalar(param.value),
            };
            let mut payload = Vec::new();
            record.encode(&mut payload);
            write_record(out, b'P', &payload);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::byte_source::SliceSource;
    use crate::model::dataset::ColumnData;
    use crate::parser::{self, OpenOptions};
    use crate::primitives::Value;
    use crate::schema::{FormatDecl, TypeRegistry};
    use indexmap::IndexMap;

    fn ping_dataset(msg_id: u16, timestamps: &[u64], xs: &[f32]) -> Dataset {
        let mut reg = TypeRegistry::new();
        reg.insert(FormatDecl::parse("ping:uint64_t timestamp;float x;").unwrap());
        let schema = reg.flatten("ping").unwrap();
        let mut ts_col = ColumnData::empty(crate::primitives::Primitive::UInt64);
        let mut x_col = ColumnData::empty(crate::primitives::Primitive::Float);
        for (&t, &x) in timestamps.iter().zip(xs) {
            ts_col.push(Value::UInt64(t));
            x_col.push(Value::Float(x));
        }
        Dataset {
            multi_id: 0,
            msg_id,
            message_name: "ping".to_string(),
            schema,
            columns: vec![ts_col, x_col],
        }
    }

    fn base_model() -> Model {
        Model {
            file_version: 0,
            start_timestamp: 0,
            last_timestamp: 0,
            compat_flags: [0; 8],
            incompat_flags: [0; 8],
            appended_offsets: Vec::new(),
            message_formats: IndexMap::new(),
            msg_info_dict: IndexMap::new(),
            msg_info_dict_types: IndexMap::new(),
            msg_info_multiple_dict: IndexMap::new(),
            msg_info_multiple_dict_types: IndexMap::new(),
            initial_parameters: IndexMap::new(),
            default_parameters: IndexMap::new(),
            changed_parameters: Vec::new(),
            logged_messages: Vec::new(),
            logged_messages_tagged: IndexMap::new(),
            dropouts: Vec::new(),
            data_list: Vec::new(),
            sync_count: 0,
            file_corrupt: false,
        }
    }

    #[test]
    fn merges_data_and_log_records_by_timestamp() {
        let mut model = base_model();
        model.last_timestamp = 300;
        model
            .message_formats
            .insert("ping".to_string(), FormatDecl::parse("ping:uint64_t timestamp;float x;").unwrap());
        model.data_list.push(ping_dataset(1, &[100, 300], &[1.0, 2.0]));
        model.logged_messages.push(LoggedMessage {
            log_level: 6,
            timestamp: 200,
            text: "between the two samples".to_string(),
        });

        let mut buf = Vec::new();
        model.write(&mut buf).unwrap();

        let mut src = SliceSource::new(&buf);
        let reparsed = parser::open(&mut src, OpenOptions::default()).unwrap();
        assert_eq!(reparsed.data_list[0].len(), 2);
        assert_eq!(reparsed.logged_messages.len(), 1);
        assert_eq!(reparsed, model);
    }
}
