//! The top-level parsed/serialisable ULog model and its accessors.

pub mod dataset;
pub mod info;
pub mod version;

use indexmap::IndexMap;

use crate::errors::Error;
use crate::primitives::Value;
use crate::schema::FormatDecl;
use dataset::Dataset;
use info::InfoValue;

/// A numeric parameter value together with its declared wire type.
///
/// ULog parameters are always scalar (`int32_t` or `float` in practice, but
/// the wire format does not forbid other primitive types), so unlike
/// [`InfoValue`] there is no text/raw variant here.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// The declared wire type name, preserved for round-tripping on write.
    pub type_name: String,
    /// The parameter's value.
    pub value: Value,
}

impl Parameter {
    /// Build a [`Parameter`] from a decoded [`info::InfoRecord`], rejecting
    /// non-scalar values (a parameter typed `char[N]` or an unknown type is
    /// not representable as a parameter; this is a corrupt-record condition
    /// for the caller to fold into `file_corrupt`).
    pub fn from_info_record(record: info::InfoRecord) -> Option<(String, Self)> {
        match record.value {
            InfoValue::Scalar(value) => Some((
                record.key,
                Parameter {
                    type_name: record.type_name,
                    value,
                },
            )),
            InfoValue::Text(_) | InfoValue::Raw(_) => None,
        }
    }
}

/// One entry of `logged_messages`/`logged_messages_tagged`: a textual log
/// line emitted by the flight stack at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedMessage {
    /// Severity level, following syslog conventions (0 = emergency .. 7 = debug).
    pub log_level: u8,
    /// Microsecond timestamp the message was logged at.
    pub timestamp: u64,
    /// The message text.
    pub text: String,
}

/// One `dropouts` entry: a gap during which the logger could not keep up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dropout {
    /// Timestamp of the dropout, taken from `last_timestamp` at the point it was observed.
    pub timestamp: u64,
    /// Duration of the dropout in milliseconds.
    pub duration_ms: u16,
}

/// The fully parsed (or about-to-be-serialised) contents of a ULog file.
#[derive(Debug, Clone)]
pub struct Model {
    /// File format version byte from the header.
    pub file_version: u8,
    /// Microsecond timestamp of the first record in the header.
    pub start_timestamp: u64,
    /// The highest nonzero record timestamp observed while parsing.
    pub last_timestamp: u64,
    /// Compatibility flag bytes (unknown bits are tolerated).
    pub compat_flags: [u8; 8],
    /// Incompatibility flag bytes (unknown bits outside byte 0 bit 0 are fatal).
    pub incompat_flags: [u8; 8],
    /// Declared appended-region start offsets, in file order, trailing zeros trimmed.
    pub appended_offsets: Vec<u64>,
    /// All declared format names resolved during parsing.
    pub message_formats: IndexMap<String, FormatDecl>,
    /// `I`-record info values, keyed by info key.
    pub msg_info_dict: IndexMap<String, InfoValue>,
    /// The declared wire type string for each `msg_info_dict` entry.
    pub msg_info_dict_types: IndexMap<String, String>,
    /// `M`-record info values: each key maps to an ordered list of ordered
    /// value lists (one inner list per continuation run).
    pub msg_info_multiple_dict: IndexMap<String, Vec<Vec<InfoValue>>>,
    /// The declared wire type string for each `msg_info_multiple_dict` entry.
    pub msg_info_multiple_dict_types: IndexMap<String, String>,
    /// Parameters declared in the definitions block, before any data-section changes.
    pub initial_parameters: IndexMap<String, Parameter>,
    /// Default-parameter values, keyed by bitfield index (0 = system, 1 = current-setup).
    pub default_parameters: IndexMap<u8, IndexMap<String, Parameter>>,
    /// Parameter changes observed in the data section, in file order.
    pub changed_parameters: Vec<(u64, String, Parameter)>,
    /// Plain (untagged) logged text messages, in file order.
    pub logged_messages: Vec<LoggedMessage>,
    /// Tagged logged text messages, keyed by numeric tag.
    pub logged_messages_tagged: IndexMap<u16, Vec<LoggedMessage>>,
    /// Logger dropouts, in file order.
    pub dropouts: Vec<Dropout>,
    /// Materialised per-topic datasets, sorted by `(message_name, multi_id)`.
    pub data_list: Vec<Dataset>,
    /// Count of sync markers observed while parsing.
    pub sync_count: u64,
    /// Set when any recovery, truncation, or corrupt-record condition was hit.
    pub file_corrupt: bool,
}

impl Model {
    /// Look up a dataset by topic name and multi-instance id.
    pub fn get_dataset(&self, name: &str, multi_id: u8) -> Result<&Dataset, Error> {
        self.data_list
            .iter()
            .find(|d| d.message_name == name && d.multi_id == multi_id)
            .ok_or_else(|| Error::NotFound {
                name: name.to_string(),
                multi_id,
            })
    }

    /// Decompose a packed version info value (default key `"ver_sw_release"`)
    /// into `(major, minor, patch, release_type)`. Returns `None` if the key
    /// is absent or not a `uint32` scalar.
    #[must_use]
    pub fn get_version_info(&self, key: &str) -> Option<(u8, u8, u8, u8)> {
        match self.msg_info_dict.get(key)? {
            InfoValue::Scalar(Value::UInt32(packed)) => Some(version::decompose(*packed)),
            _ => None,
        }
    }

    /// Render the version at `key` as `"v{major}.{minor}.{patch}"` (plus a
    /// release-type suffix), or `None` for missing/development versions.
    #[must_use]
    pub fn get_version_info_str(&self, key: &str) -> Option<String> {
        version::format_str(self.get_version_info(key)?)
    }
}

impl PartialEq for Model {
    /// Structural equality over every field except the ones the serialiser
    /// cannot reproduce: `sync_count` (reset to 0 on write),
    /// `appended_offsets` (reset to empty), and the appended-data bit of
    /// `incompat_flags[0]` (cleared on write).
    fn eq(&self, other: &Self) -> bool {
        let mask_incompat = |flags: &[u8; 8]| {
            let mut masked = *flags;
            masked[0] &= !0x1;
            masked
        };
        self.file_version == other.file_version
            && self.start_timestamp == other.start_timestamp
            && self.last_timestamp == other.last_timestamp
            && self.compat_flags == other.compat_flags
            && mask_incompat(&self.incompat_flags) == mask_incompat(&other.incompat_flags)
            && self.message_formats == other.message_formats
            && self.msg_info_dict == other.msg_info_dict
            && self.msg_info_dict_types == other.msg_info_dict_types
            && self.msg_info_multiple_dict == other.msg_info_multiple_dict
            && self.msg_info_multiple_dict_types == other.msg_info_multiple_dict_types
            && self.initial_parameters == other.initial_parameters
            && self.default_parameters == other.default_parameters
            && self.changed_parameters == other.changed_parameters
            && self.logged_messages == other.logged_messages
            && self.logged_messages_tagged == other.logged_messages_tagged
            && self.dropouts == other.dropouts
            && self.data_list == other.data_list
            && self.file_corrupt == other.file_corrupt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_model() -> Model {
        Model {
            file_version: 0,
            start_timestamp: 100,
            last_timestamp: 100,
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
    fn equality_ignores_sync_count_and_appended_offsets() {
        let mut a = empty_model();
        let mut b = empty_model();
        a.sync_count = 5;
        a.appended_offsets = vec![10, 20];
        b.sync_count = 0;
        b.appended_offsets = Vec::new();
        assert_eq!(a, b);
    }

    #[test]
    fn equality_ignores_appended_data_incompat_bit() {
        let mut a = empty_model();
        let mut b = empty_model();
        a.incompat_flags[0] = 0x1;
        b.incompat_flags[0] = 0x0;
        assert_eq!(a, b);
    }

    #[test]
    fn equality_respects_other_incompat_bits() {
        let mut a = empty_model();
        let b = empty_model();
        a.incompat_flags[0] = 0x2;
        assert_ne!(a, b);
    }

    #[test]
    fn get_dataset_reports_not_found() {
        let model = empty_model();
        assert!(matches!(
            model.get_dataset("missing", 0),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn version_info_round_trip() {
        let mut model = empty_model();
        let packed = (1u32 << 24) | (2 << 16) | (3 << 8) | 255;
        model
            .msg_info_dict
            .insert("ver_sw_release".to_string(), InfoValue::Scalar(Value::UInt32(packed)));
        assert_eq!(model.get_version_info("ver_sw_release"), Some((1, 2, 3, 255)));
        assert_eq!(
            model.get_version_info_str("ver_sw_release"),
            Some("v1.2.3".to_string())
        );
        assert_eq!(model.get_version_info_str("missing"), None);
    }
}
