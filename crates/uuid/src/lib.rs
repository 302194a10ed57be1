//! Typed identifiers for patients and health records.
//!
//! Every patient and health record is keyed by a UUID. Identifiers arrive from outside the
//! service as strings (URL path segments, CLI arguments), so this crate is the single place
//! where they are validated:
//!
//! - [`PatientId`] and [`RecordId`] are distinct types, so a record id can never be passed
//!   where a patient id is expected.
//! - Parsing accepts every textual UUID form (`hyphenated`, `simple`, `{braced}`,
//!   `urn:uuid:`), since clients send all of them.
//! - Display is always the lowercase hyphenated form, which is also the stored form.
//!
//! ```
//! use records_uuid::PatientId;
//!
//! let id = PatientId::parse("550E8400E29B41D4A716446655440000").unwrap();
//! assert_eq!(id.to_string(), "550e8400-e29b-41d4-a716-446655440000");
//! ```

mod ids;

pub use ids::{PatientId, RecordId};
pub use uuid::Uuid;

/// Error type for identifier parsing.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UuidError {
    /// The input is not a well-formed UUID.
    #[error("Invalid {kind} ID format: '{input}'")]
    InvalidFormat { kind: &'static str, input: String },
}

/// Result type for identifier operations.
pub type UuidResult<T> = Result<T, UuidError>;
