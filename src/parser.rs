//! Streaming ULog decoder: header, definitions, data, recovery, and
//! appended-section stitching, folded into a single [`Model`].

mod appended;
mod data;
mod definitions;
mod materialize;
mod recovery;

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::byte_source::ByteSource;
use crate::errors::Error;
use crate::model::info::{InfoRecord, InfoValue};
use crate::model::{Dropout, LoggedMessage, Model, Parameter};
use crate::schema::TypeRegistry;
use crate::subscription::Subscription;

const HEADER_MAGIC: [u8; 7] = [0x55, 0x4C, 0x6F, 0x67, 0x01, 0x12, 0x35];

/// Options controlling what [`open`] subscribes to and how strictly it
/// decodes text.
#[derive(Debug, Clone, Default)]
pub struct OpenOptions {
    /// `None` subscribes to every topic; `Some(&[])` parses definitions only
    /// (no data subscriptions at all); `Some(names)` restricts to those topics.
    pub message_name_filter: Option<Vec<String>>,
    /// When set, invalid UTF-8 in text fields is replaced rather than
    /// treated as a decode error.
    pub disable_str_exceptions: bool,
}

/// Parse a ULog byte stream into a [`Model`].
///
/// Most malformed-record conditions are not fatal: the parser recovers and
/// latches [`Model::file_corrupt`] instead. See [`crate::errors::Error`] for
/// the conditions that do fail the whole call.
pub fn open<S: ByteSource>(source: &mut S, options: OpenOptions) -> Result<Model, Error> {
    let header = source
        .read_exact_or_eof(16)?
        .ok_or(Error::InvalidHeader("file shorter than 16 bytes"))?;
    if header[..7] != HEADER_MAGIC[..] {
        return Err(Error::InvalidHeader("magic bytes do not match"));
    }
    let file_version = header[7];
    if file_version > 1 {
        log::warn!("unknown ULog file version {file_version}; attempting to read it anyway");
    }
    let start_timestamp = u64::from_le_bytes(header[8..16].try_into().unwrap());

    let mut state = ParseState::new(options.message_name_filter, options.disable_str_exceptions);
    state.start_timestamp = start_timestamp;
    state.last_timestamp = start_timestamp;

    definitions::run(source, &mut state)?;
    appended::run(source, &mut state)?;

    let data_list = materialize::materialize_all(state.subscriptions);
    let message_formats = state
        .registry
        .iter()
        .map(|(name, decl)| (name.clone(), decl.clone()))
        .collect();

    Ok(Model {
        file_version,
        start_timestamp: state.start_timestamp,
        last_timestamp: state.last_timestamp,
        compat_flags: state.compat_flags,
        incompat_flags: state.incompat_flags,
        appended_offsets: state.appended_offsets,
        message_formats,
        msg_info_dict: state.msg_info_dict,
        msg_info_dict_types: state.msg_info_dict_types,
        msg_info_multiple_dict: state.msg_info_multiple_dict,
        msg_info_multiple_dict_types: state.msg_info_multiple_dict_types,
        initial_parameters: state.initial_parameters,
        default_parameters: state.default_parameters,
        changed_parameters: state.changed_parameters,
        logged_messages: state.logged_messages,
        logged_messages_tagged: state.logged_messages_tagged,
        dropouts: state.dropouts,
        data_list,
        sync_count: state.sync_count,
        file_corrupt: state.file_corrupt,
    })
}

/// Mutable parse-in-progress state threaded through `definitions`, `data`,
/// and `appended`. Converted into a [`Model`] once parsing finishes.
struct ParseState {
    registry: TypeRegistry,
    msg_info_dict: IndexMap<String, InfoValue>,
    msg_info_dict_types: IndexMap<String, String>,
    msg_info_multiple_dict: IndexMap<String, Vec<Vec<InfoValue>>>,
    msg_info_multiple_dict_types: IndexMap<String, String>,
    initial_parameters: IndexMap<String, Parameter>,
    default_parameters: IndexMap<u8, IndexMap<String, Parameter>>,
    changed_parameters: Vec<(u64, String, Parameter)>,
    logged_messages: Vec<LoggedMessage>,
    logged_messages_tagged: IndexMap<u16, Vec<LoggedMessage>>,
    dropouts: Vec<Dropout>,
    subscriptions: IndexMap<u16, Subscription>,
    filtered_message_ids: HashSet<u16>,
    missing_message_ids_warned: HashSet<u16>,
    last_timestamp: u64,
    start_timestamp: u64,
    sync_count: u64,
    file_corrupt: bool,
    compat_flags: [u8; 8],
    incompat_flags: [u8; 8],
    appended_offsets: Vec<u64>,
    message_name_filter: Option<Vec<String>>,
    lossy_strings: bool,
}

impl ParseState {
    fn new(message_name_filter: Option<Vec<String>>, lossy_strings: bool) -> Self {
        Self {
            registry: TypeRegistry::new(),
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
            subscriptions: IndexMap::new(),
            filtered_message_ids: HashSet::new(),
            missing_message_ids_warned: HashSet::new(),
            last_timestamp: 0,
            start_timestamp: 0,
            sync_count: 0,
            file_corrupt: false,
            compat_flags: [0; 8],
            incompat_flags: [0; 8],
            appended_offsets: Vec::new(),
            message_name_filter,
            lossy_strings,
        }
    }

    fn decode_text(&self, bytes: &[u8]) -> Option<String> {
        crate::model::info::decode_text(bytes, self.lossy_strings)
    }

    fn apply_format(&mut self, payload: &[u8]) {
        let Some(text) = self.decode_text(payload) else {
            log::warn!("discarding non-UTF8 format declaration");
            self.file_corrupt = true;
            return;
        };
        match crate::schema::FormatDecl::parse(&text) {
            Ok(decl) => self.registry.insert(decl),
            Err(err) => {
                log::warn!("discarding malformed format declaration: {err}");
                self.file_corrupt = true;
            }
        }
    }

    fn decode_info(&mut self, payload: &[u8]) -> Option<InfoRecord> {
        match InfoRecord::decode(payload, self.lossy_strings) {
            Ok(rec) => Some(rec),
            Err(err) => {
                log::warn!("discarding malformed info record: {err}");
                self.file_corrupt = true;
                None
            }
        }
    }

    fn apply_info(&mut self, payload: &[u8]) {
        if let Some(rec) = self.decode_info(payload) {
            self.msg_info_dict_types.insert(rec.key.clone(), rec.type_name.clone());
            self.msg_info_dict.insert(rec.key, rec.value);
        }
    }

    fn apply_info_multi(&mut self, payload: &[u8]) {
        if payload.is_empty() {
            self.file_corrupt = true;
            return;
        }
        let continuation = payload[0];
        if let Some(rec) = self.decode_info(&payload[1..]) {
            self.msg_info_multiple_dict_types
                .insert(rec.key.clone(), rec.type_name.clone());
            let lists = self.msg_info_multiple_dict.entry(rec.key).or_default();
            if continuation == 0 || lists.is_empty() {
                lists.push(vec![rec.value]);
            } else {
                lists.last_mut().expect("just checked non-empty").push(rec.value);
            }
        }
    }

    fn decode_parameter(&mut self, payload: &[u8]) -> Option<(String, Parameter)> {
        let rec = self.decode_info(payload)?;
        match Parameter::from_info_record(rec) {
            Some(pair) => Some(pair),
            None => {
                log::warn!("discarding non-scalar parameter value");
                self.file_corrupt = true;
                None
            }
        }
    }

    fn apply_initial_parameter(&mut self, payload: &[u8]) {
        if let Some((key, param)) = self.decode_parameter(payload) {
            self.initial_parameters.insert(key, param);
        }
    }

    fn apply_changed_parameter(&mut self, payload: &[u8]) {
        if let Some((key, param)) = self.decode_parameter(payload) {
            self.changed_parameters.push((self.last_timestamp, key, param));
        }
    }

    fn apply_default_parameter(&mut self, payload: &[u8]) {
        if payload.is_empty() {
            self.file_corrupt = true;
            return;
        }
        let bitfield = payload[0];
        if let Some((key, param)) = self.decode_parameter(&payload[1..]) {
            for bit in 0..8u8 {
                if bitfield & (1 << bit) != 0 {
                    self.default_parameters
                        .entry(bit)
                        .or_default()
                        .insert(key.clone(), param.clone());
                }
            }
        }
    }

    fn apply_flag_bits(&mut self, payload: &[u8]) -> Result<(), Error> {
        if payload.len() < 40 {
            self.file_corrupt = true;
            return Ok(());
        }
        self.compat_flags.copy_from_slice(&payload[0..8]);

        let mut incompat = [0u8; 8];
        incompat.copy_from_slice(&payload[8..16]);
        for (byte_idx, &byte) in incompat.iter().enumerate() {
            let mut unknown = byte;
            if byte_idx == 0 {
                unknown &= !0x1;
            }
            if unknown != 0 {
                return Err(Error::UnknownIncompatFlag {
                    byte: byte_idx,
                    bit: unknown.trailing_zeros(),
                });
            }
        }
        self.incompat_flags = incompat;

        let mut offsets = Vec::new();
        for i in 0..3usize {
            let start = 16 + i * 8;
            let value = u64::from_le_bytes(payload[start..start + 8].try_into().unwrap());
            if value != 0 {
                offsets.push(value);
            }
        }
        self.appended_offsets = offsets;
        Ok(())
    }

    fn apply_logging(&mut self, payload: &[u8]) {
        if payload.len() < 9 {
            self.file_corrupt = true;
            return;
        }
        let log_level = payload[0];
        let timestamp = u64::from_le_bytes(payload[1..9].try_into().unwrap());
        let text = self.decode_text(&payload[9..]).unwrap_or_default();
        self.logged_messages.push(LoggedMessage {
            log_level,
            timestamp,
            text,
        });
    }

    fn apply_logging_tagged(&mut self, payload: &[u8]) {
        if payload.len() < 11 {
            self.file_corrupt = true;
            return;
        }
        let log_level = payload[0];
        let tag = u16::from_le_bytes(payload[1..3].try_into().unwrap());
        let timestamp = u64::from_le_bytes(payload[3..11].try_into().unwrap());
        let text = self.decode_text(&payload[11..]).unwrap_or_default();
        self.logged_messages_tagged.entry(tag).or_default().push(LoggedMessage {
            log_level,
            timestamp,
            text,
        });
    }

    fn apply_dropout(&mut self, payload: &[u8]) {
        if payload.len() < 2 {
            self.file_corrupt = true;
            return;
        }
        let duration_ms = u16::from_le_bytes(payload[0..2].try_into().unwrap());
        self.dropouts.push(Dropout {
            timestamp: self.last_timestamp,
            duration_ms,
        });
    }

    fn apply_add_logged(&mut self, payload: &[u8]) {
        if payload.len() < 3 {
            self.file_corrupt = true;
            return;
        }
        let multi_id = payload[0];
        let msg_id = u16::from_le_bytes(payload[1..3].try_into().unwrap());
        let Some(message_name) = self.decode_text(&payload[3..]) else {
            self.file_corrupt = true;
            return;
        };

        let subscribed = match &self.message_name_filter {
            None => true,
            Some(names) => names.iter().any(|n| *n == message_name),
        };
        if !subscribed {
            self.filtered_message_ids.insert(msg_id);
            return;
        }

        match self.registry.flatten(&message_name) {
            Ok(schema) => {
                self.subscriptions
                    .insert(msg_id, Subscription::new(msg_id, multi_id, message_name, schema));
            }
            Err(err) => {
                log::warn!("dropping subscription to {message_name:?}: {err}");
                self.file_corrupt = true;
            }
        }
    }

    fn apply_data(&mut self, payload: &[u8]) {
        if payload.len() < 2 {
            self.file_corrupt = true;
            return;
        }
        let msg_id = u16::from_le_bytes(payload[0..2].try_into().unwrap());
        let record = &payload[2..];

        let Some(sub) = self.subscriptions.get_mut(&msg_id) else {
            if !self.filtered_message_ids.contains(&msg_id) && self.missing_message_ids_warned.insert(msg_id) {
                log::warn!("data record for undeclared message id {msg_id}; file is most likely corrupt");
            }
            return;
        };
        if record.len() != sub.record_size() {
            log::debug!("skipping data record for {:?}: size mismatch", sub.message_name);
            self.file_corrupt = true;
            return;
        }
        let timestamp = sub.append_record(record);
        if timestamp != 0 && timestamp > self.last_timestamp {
            self.last_timestamp = timestamp;
        }
    }
}
