//! Document model shared by storage, ETag and indexing
//!
//! A plan document is a JSON tree. Every object node (the root included)
//! carries an identifying `objectType`/`objectId` pair, and every field is
//! one of a small set of shapes classified by [`FieldKind`].
//!
//! # Text policy
//!
//! Stored attributes are plain text. On the way back out, text that fully
//! parses as an integer becomes an integer again and everything else stays
//! a string. Floats, leading zeros and booleans are not preserved. This is
//! a compatibility contract with existing stored data and is kept as-is.
//!
//! Bare scalar arrays are the one exception: they are stored as JSON text
//! and named in the record's [`ARRAY_FIELDS`] attribute, so only listed
//! fields are ever parsed back into arrays.

mod errors;
mod key;
mod value;

pub use errors::{DocumentError, DocumentResult};
pub use key::{ObjectKey, ETAG_FIELD, OBJECT_ID, OBJECT_TYPE};
pub use value::{
    check_field_name, classify, decode_array_fields, decode_attribute, decode_scalar_array,
    encode_array_fields, encode_scalar, encode_scalar_array, FieldKind, ARRAY_FIELDS,
};
