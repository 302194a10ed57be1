//! # Records Core
//!
//! Core business logic for the hospital health records service.
//!
//! This crate contains pure data operations over the relational store:
//! - Patient lookups and per-patient health record storage (SQLite)
//! - Filtered listing and aggregate summaries of a patient's records
//! - Validation of client-supplied record input
//!
//! **No API concerns**: HTTP routing, status codes and serialisation belong in `api-rest`.

pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod health_records;
pub mod models;
pub mod repositories;
pub mod validation;

pub use config::CoreConfig;
pub use constants::{DEFAULT_DATABASE_PATH, LOCAL_SOURCE_BUCKET};
pub use db::Database;
pub use error::{RecordsError, RecordsResult};
pub use health_records::{HealthRecordService, LocalRecordInput};
pub use models::{
    DecryptionStatus, ExternalOrigin, HealthRecord, HealthRecordSummary, NewHealthRecord,
    Patient, PatientRecordCount, RecordData, RecordFilter, RecordOrigin,
};
pub use records_types::{NonEmptyText, RecordType};
pub use records_uuid::{PatientId, RecordId};
