//! Converts live subscriptions into the final, sorted list of [`Dataset`]s.

use indexmap::IndexMap;

use crate::model::dataset::{ColumnData, Dataset};
use crate::subscription::Subscription;

/// Materialise every non-empty subscription into a [`Dataset`], dropping
/// subscriptions with no accumulated data, sorted by `(name, multi_id)`.
pub(super) fn materialize_all(subscriptions: IndexMap<u16, Subscription>) -> Vec<Dataset> {
    let mut data_list: Vec<Dataset> = subscriptions
        .into_values()
        .filter(|sub| !sub.buffer.is_empty())
        .map(materialize_one)
        .collect();

    data_list.sort_by(|a, b| (a.message_name.as_str(), a.multi_id).cmp(&(b.message_name.as_str(), b.multi_id)));
    data_list
}

fn materialize_one(sub: Subscription) -> Dataset {
    let record_size = sub.record_size();
    let num_records = sub.buffer.len() / record_size.max(1);

    let mut columns: Vec<ColumnData> = sub
        .schema
        .columns
        .iter()
        .map(|c| ColumnData::empty(c.primitive))
        .collect();

    for i in 0..num_records {
        let record = &sub.buffer[i * record_size..(i + 1) * record_size];
        for (col, column_schema) in columns.iter_mut().zip(&sub.schema.columns) {
            let start = column_schema.byte_offset;
            let end = start + column_schema.element_size();
            col.push(column_schema.primitive.decode(&record[start..end]));
        }
    }

    Dataset {
        multi_id: sub.multi_id,
        msg_id: sub.msg_id,
        message_name: sub.message_name,
        schema: sub.schema,
        columns,
    }
}
