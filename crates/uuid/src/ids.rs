//! Identifier newtypes.
//!
//! Both identifier types share one implementation through `define_id!`; they differ only in
//! the name used in error messages.

use crate::{UuidError, UuidResult};
use std::{fmt, str::FromStr};
use uuid::Uuid;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(Uuid);

        impl $name {
            /// Generates a fresh random (version 4) identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Validates and parses an externally supplied identifier.
            ///
            /// Surrounding whitespace is ignored. Any textual UUID form is accepted.
            ///
            /// # Errors
            ///
            #[doc = concat!("Returns [`UuidError::InvalidFormat`] naming the ", $kind, " if `input` is not a UUID.")]
            pub fn parse(input: &str) -> UuidResult<Self> {
                Uuid::parse_str(input.trim())
                    .map(Self)
                    .map_err(|_| UuidError::InvalidFormat {
                        kind: $kind,
                        input: input.to_string(),
                    })
            }

            /// Returns the underlying `uuid::Uuid`.
            pub fn uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0.hyphenated())
            }
        }

        impl FromStr for $name {
            type Err = UuidError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        #[cfg(feature = "serde")]
        impl serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.collect_str(self)
            }
        }

        #[cfg(feature = "serde")]
        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                Self::parse(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

define_id!(
    /// Identifier of a registered patient.
    PatientId,
    "patient"
);

define_id!(
    /// Identifier of a single health record.
    ///
    /// Always generated server-side when a record is inserted.
    RecordId,
    "record"
);

#[cfg(test)]
mod tests {
    use super::*;

    const HYPHENATED: &str = "550e8400-e29b-41d4-a716-446655440000";

    #[test]
    fn test_new_generates_distinct_ids() {
        let a = RecordId::new();
        let b = RecordId::new();
        assert_ne!(a, b);
        assert_eq!(a.uuid().get_version_num(), 4);
    }

    #[test]
    fn test_parse_accepts_all_textual_forms() {
        let inputs = [
            HYPHENATED,
            "550e8400e29b41d4a716446655440000",
            "550E8400-E29B-41D4-A716-446655440000",
            "{550e8400-e29b-41d4-a716-446655440000}",
            "urn:uuid:550e8400-e29b-41d4-a716-446655440000",
            "  550e8400-e29b-41d4-a716-446655440000 ",
        ];

        for input in inputs {
            let id = PatientId::parse(input).unwrap_or_else(|e| panic!("{input}: {e}"));
            assert_eq!(id.to_string(), HYPHENATED);
        }
    }

    #[test]
    fn test_parse_rejects_malformed_input() {
        for input in ["", "not-a-uuid", "550e8400-e29b-41d4-a716", "550e8400e29b41d4a71644665544000g"] {
            let err = PatientId::parse(input).expect_err(input);
            assert_eq!(
                err,
                UuidError::InvalidFormat {
                    kind: "patient",
                    input: input.to_string()
                }
            );
        }
    }

    #[test]
    fn test_error_message_names_identifier_kind() {
        let err = RecordId::parse("abc").unwrap_err();
        assert_eq!(err.to_string(), "Invalid record ID format: 'abc'");
    }

    #[test]
    fn test_from_str_matches_parse() {
        let parsed: RecordId = HYPHENATED.parse().unwrap();
        assert_eq!(parsed, RecordId::parse(HYPHENATED).unwrap());
    }

    #[test]
    fn test_serde_uses_hyphenated_string() {
        let id = PatientId::parse(HYPHENATED).unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{HYPHENATED}\""));

        let back: PatientId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<PatientId>("\"nope\"").is_err());
    }
}
