//! A live binding of a numeric message id to a flattened schema while data
//! records stream in.

use crate::schema::FlattenedSchema;

/// Binds a `msg_id` to the topic it subscribes to, accumulating raw record
/// bytes until the parse ends and the subscription is materialised into a
/// [`crate::model::dataset::Dataset`].
#[derive(Debug, Clone)]
pub struct Subscription {
    /// The numeric message id this subscription is addressed by in `D` records.
    pub msg_id: u16,
    /// Distinguishes multiple concurrent instances of the same topic.
    pub multi_id: u8,
    /// The subscribed topic's format name.
    pub message_name: String,
    /// The topic's flattened column schema.
    pub schema: FlattenedSchema,
    /// Raw accumulated record bytes (whole records only).
    pub buffer: Vec<u8>,
}

impl Subscription {
    /// Create a new, empty subscription.
    #[must_use]
    pub fn new(msg_id: u16, multi_id: u8, message_name: String, schema: FlattenedSchema) -> Self {
        Self {
            msg_id,
            multi_id,
            message_name,
            schema,
            buffer: Vec::new(),
        }
    }

    /// The expected byte length of one record under this subscription's schema.
    #[must_use]
    pub fn record_size(&self) -> usize {
        self.schema.record_size()
    }

    /// Append one record's raw payload (already stripped of the 2-byte
    /// `msg_id` prefix) and extract its timestamp, if this schema has a
    /// `timestamp` column.
    ///
    /// # Panics
    ///
    /// Panics if `payload.len() != self.record_size()`; callers must check
    /// the size before calling (a mismatch is a corrupt record, handled by
    /// the caller, not by this method).
    pub fn append_record(&mut self, payload: &[u8]) -> u64 {
        assert_eq!(payload.len(), self.record_size());
        let timestamp = match self.schema.timestamp_column {
            Some(idx) => {
                let off = self.schema.columns[idx].byte_offset;
                u64::from_le_bytes(payload[off..off + 8].try_into().unwrap())
            }
            None => 0,
        };
        self.buffer.extend_from_slice(payload);
        timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TypeRegistry;

    fn ping_subscription() -> Subscription {
        let mut reg = TypeRegistry::new();
        reg.insert(crate::schema::FormatDecl::parse("ping:uint64_t timestamp;float x;").unwrap());
        let schema = reg.flatten("ping").unwrap();
        Subscription::new(1, 0, "ping".to_string(), schema)
    }

    #[test]
    fn append_record_extracts_timestamp_and_accumulates_buffer() {
        let mut sub = ping_subscription();
        let mut payload = Vec::new();
        payload.extend_from_slice(&200u64.to_le_bytes());
        payload.extend_from_slice(&1.0f32.to_le_bytes());
        let ts = sub.append_record(&payload);
        assert_eq!(ts, 200);
        assert_eq!(sub.buffer, payload);

        let mut payload2 = Vec::new();
        payload2.extend_from_slice(&300u64.to_le_bytes());
        payload2.extend_from_slice(&2.0f32.to_le_bytes());
        let ts2 = sub.append_record(&payload2);
        assert_eq!(ts2, 300);
        assert_eq!(sub.buffer.len(), 24);
    }

    #[test]
    fn no_timestamp_column_yields_zero() {
        let mut reg = TypeRegistry::new();
        reg.insert(crate::schema::FormatDecl::parse("t:float x;").unwrap());
        let schema = reg.flatten("t").unwrap();
        let mut sub = Subscription::new(2, 0, "t".to_string(), schema);
        let ts = sub.append_record(&9.0f32.to_le_bytes());
        assert_eq!(ts, 0);
    }
}
