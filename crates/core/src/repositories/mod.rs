//! Repositories over the relational store.
//!
//! Each repository borrows a request-scoped [`rusqlite::Connection`] and exposes typed
//! operations for one table. Identifiers are already validated by the time they reach a
//! repository; existence checks are the repository's job.

pub mod patients;
pub mod records;

pub use patients::PatientRepository;
pub use records::HealthRecordRepository;
