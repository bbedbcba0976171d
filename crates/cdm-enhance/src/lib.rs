//! Numeric decoding of packed CDM variables.
//!
//! Derives a [`DecodePolicy`] from a variable's `scale_factor`, `add_offset`,
//! `_Unsigned`, `_FillValue`, `missing_value` and valid-range attributes, and
//! uses it to turn raw samples into physical values.

pub mod decoder;
pub mod missing;

pub use decoder::{DecodePolicy, DecodedArray};
pub use missing::{MissingKind, MissingPolicy};
