//! Submodule defining the errors used across the crate.

/// Errors that can occur while opening or writing a ULog file.
///
/// Most malformed-record conditions described in the format are *not*
/// fatal: the parser recovers from them (see [`crate::parser::recovery`])
/// and instead latches [`crate::model::Model::file_corrupt`]. The variants
/// here are the ones spec'd as fatal to the whole call.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The file header is shorter than 16 bytes or its magic does not match.
    #[error("invalid ULog header: {0}")]
    InvalidHeader(&'static str),

    /// An `incompat_flags` bit other than bit 0 of byte 0 is set.
    #[error("unknown incompat flag bit {bit} in byte {byte}")]
    UnknownIncompatFlag {
        /// Index of the flag byte (0-7).
        byte: usize,
        /// Bit index within the byte (0-7).
        bit: u32,
    },

    /// `get_dataset` found no dataset with the given name and multi-id.
    #[error("no dataset named {name:?} with multi_id {multi_id}")]
    NotFound {
        /// The dataset name that was looked up.
        name: String,
        /// The multi-id that was looked up.
        multi_id: u8,
    },

    /// A value to be serialized has no representation in the wire format.
    #[error("parameter {name:?} has a value not representable in the ULog wire format")]
    ParameterTypeMismatch {
        /// The offending parameter name.
        name: String,
    },

    /// Underlying I/O failure from the byte source (not a short read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
