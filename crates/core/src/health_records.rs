//! Query and filter layer over the record store.
//!
//! [`HealthRecordService`] is built per request around that request's connection. It adds
//! the patient-existence rules and the aggregate summary on top of the repositories.

use crate::constants::LOCAL_SOURCE_BUCKET;
use crate::models::{
    HealthRecord, HealthRecordSummary, NewHealthRecord, Patient, PatientRecordCount, RecordData,
    RecordFilter, RecordOrigin,
};
use crate::repositories::{HealthRecordRepository, PatientRepository};
use crate::validation::{parse_record_date, stamp_from_sql};
use crate::{RecordsError, RecordsResult};
use records_types::RecordType;
use records_uuid::{PatientId, RecordId};
use rusqlite::{params, Connection};

/// A record created through the local API. Always stored with no source hospital.
#[derive(Clone, Debug)]
pub struct LocalRecordInput {
    pub record_type: String,
    pub record_date: String,
    pub data: RecordData,
    pub data_text: Option<String>,
}

pub struct HealthRecordService<'a> {
    conn: &'a Connection,
}

impl<'a> HealthRecordService<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn patients(&self) -> PatientRepository<'a> {
        PatientRepository::new(self.conn)
    }

    fn records(&self) -> HealthRecordRepository<'a> {
        HealthRecordRepository::new(self.conn)
    }

    /// Returns the patient or [`RecordsError::PatientNotFound`].
    pub fn require_patient(&self, patient_id: &PatientId) -> RecordsResult<Patient> {
        self.patients().require(patient_id)
    }

    /// Patients with at least one record, each with their record count.
    pub fn patients_with_records(&self) -> RecordsResult<Vec<PatientRecordCount>> {
        self.patients().list_with_records()
    }

    /// A patient's records matching `filter` (conjunctive). Empty for unknown patients; the
    /// caller decides whether an empty result needs an existence check.
    pub fn records_for_patient(
        &self,
        patient_id: &PatientId,
        filter: &RecordFilter,
    ) -> RecordsResult<Vec<HealthRecord>> {
        self.records().list_for_patient(patient_id, filter)
    }

    /// Records received from other hospitals (source hospital set).
    pub fn external_records(&self, patient_id: &PatientId) -> RecordsResult<Vec<HealthRecord>> {
        self.records().list_external(patient_id)
    }

    /// A single record, checking the patient first.
    ///
    /// # Errors
    ///
    /// [`RecordsError::PatientNotFound`] or [`RecordsError::RecordNotFound`].
    pub fn record(
        &self,
        patient_id: &PatientId,
        record_id: &RecordId,
    ) -> RecordsResult<HealthRecord> {
        self.require_patient(patient_id)?;
        self.records()
            .get(patient_id, record_id)?
            .ok_or(RecordsError::RecordNotFound {
                patient_id: *patient_id,
                record_id: *record_id,
            })
    }

    /// Creates a locally generated record for an existing patient.
    ///
    /// The record type is stored trimmed of surrounding whitespace.
    ///
    /// # Errors
    ///
    /// - [`RecordsError::PatientNotFound`] if the patient is unknown;
    /// - [`RecordsError::InvalidInput`] if the record type is blank or the date unparseable.
    pub fn create_local_record(
        &self,
        patient_id: &PatientId,
        input: LocalRecordInput,
    ) -> RecordsResult<HealthRecord> {
        self.require_patient(patient_id)?;

        let record_type = RecordType::new(&input.record_type)
            .map_err(|_| RecordsError::InvalidInput("recordType cannot be empty".into()))?;
        let record_date = parse_record_date(&input.record_date)?;

        let record = self.records().insert(
            patient_id,
            NewHealthRecord {
                record_type,
                record_date,
                data: input.data,
                data_text: input.data_text,
                origin: RecordOrigin::Local,
            },
        )?;

        tracing::info!(
            "created {} record {} for patient {}",
            record.record_type,
            record.id,
            patient_id
        );
        Ok(record)
    }

    /// Stores a record received from another facility.
    ///
    /// The live ingestion path is owned by the gateway integration; this entry point is used
    /// by operator tooling to load received records.
    pub fn store_received_record(
        &self,
        patient_id: &PatientId,
        record: NewHealthRecord,
    ) -> RecordsResult<HealthRecord> {
        self.require_patient(patient_id)?;
        match &record.origin {
            RecordOrigin::Local => {
                return Err(RecordsError::InvalidInput(
                    "received records must name their source hospital".into(),
                ));
            }
            // The summary keys local records under this name.
            RecordOrigin::External(origin)
                if origin
                    .source_hospital
                    .as_str()
                    .eq_ignore_ascii_case(LOCAL_SOURCE_BUCKET) =>
            {
                return Err(RecordsError::InvalidInput(format!(
                    "'{LOCAL_SOURCE_BUCKET}' is reserved and cannot be used as a source hospital"
                )));
            }
            RecordOrigin::External(_) => {}
        }
        self.records().insert(patient_id, record)
    }

    /// Permanently deletes a record, checking the patient first.
    pub fn delete_record(&self, patient_id: &PatientId, record_id: &RecordId) -> RecordsResult<()> {
        self.require_patient(patient_id)?;
        self.records().delete(patient_id, record_id)?;
        tracing::info!("deleted record {} for patient {}", record_id, patient_id);
        Ok(())
    }

    /// Aggregate counts for a patient.
    ///
    /// Records without a source hospital are counted under [`LOCAL_SOURCE_BUCKET`] in
    /// `by_source`, so both maps sum to `total_records`. All three reads run in one
    /// transaction and see the same snapshot.
    pub fn summary(&self, patient_id: &PatientId) -> RecordsResult<HealthRecordSummary> {
        let id = patient_id.to_string();
        let mut summary = HealthRecordSummary::default();
        let tx = self.conn.unchecked_transaction()?;

        {
            let mut stmt = tx.prepare(
                "SELECT record_type, COUNT(*) FROM health_records
                 WHERE patient_id = ?1 GROUP BY record_type",
            )?;
            let rows = stmt.query_map(params![id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?;
            for row in rows {
                let (record_type, count) = row?;
                let count = u64::try_from(count).unwrap_or_default();
                summary.total_records += count;
                summary.by_type.insert(record_type, count);
            }
        }

        {
            let mut stmt = tx.prepare(
                "SELECT COALESCE(source_hospital, ?2), COUNT(*) FROM health_records
                 WHERE patient_id = ?1 GROUP BY COALESCE(source_hospital, ?2)",
            )?;
            let rows = stmt.query_map(params![id, LOCAL_SOURCE_BUCKET], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?;
            for row in rows {
                let (source, count) = row?;
                *summary.by_source.entry(source).or_default() +=
                    u64::try_from(count).unwrap_or_default();
            }
        }

        let (max_updated, max_created): (Option<String>, Option<String>) = tx.query_row(
            "SELECT MAX(updated_at), MAX(created_at) FROM health_records WHERE patient_id = ?1",
            params![id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let updated = max_updated
            .map(|v| stamp_from_sql("updated_at", &v))
            .transpose()?;
        let created = max_created
            .map(|v| stamp_from_sql("created_at", &v))
            .transpose()?;
        summary.last_updated = updated.max(created);

        tx.commit()?;
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::temp_database;
    use crate::models::{DecryptionStatus, ExternalOrigin};
    use records_types::NonEmptyText;
    use serde_json::json;

    fn input(record_type: &str) -> LocalRecordInput {
        LocalRecordInput {
            record_type: record_type.into(),
            record_date: "2024-02-10".into(),
            data: json!({"note": "follow up"}).as_object().cloned().unwrap(),
            data_text: None,
        }
    }

    fn received(record_type: &str, hospital: &str) -> NewHealthRecord {
        NewHealthRecord {
            record_type: RecordType::new(record_type).unwrap(),
            record_date: parse_record_date("2024-02-01").unwrap(),
            data: RecordData::new(),
            data_text: None,
            origin: RecordOrigin::External(ExternalOrigin {
                source_hospital: NonEmptyText::new(hospital).unwrap(),
                request_id: None,
                was_encrypted: false,
                decryption_status: DecryptionStatus::None,
                delivery_attempt: 0,
            }),
        }
    }

    fn register(conn: &Connection) -> PatientId {
        PatientRepository::new(conn)
            .register(NonEmptyText::new("Asha").unwrap(), None, None)
            .unwrap()
            .id
    }

    #[test]
    fn test_create_local_record_has_no_source() {
        let (_temp_dir, db) = temp_database();
        let conn = db.connect().unwrap();
        let patient_id = register(&conn);
        let service = HealthRecordService::new(&conn);

        let record = service
            .create_local_record(&patient_id, input("PRESCRIPTION"))
            .unwrap();
        assert!(record.source_hospital.is_none());
        assert_eq!(record.patient_id, patient_id);

        let fetched = service.record(&patient_id, &record.id).unwrap();
        assert_eq!(fetched.id, record.id);
        assert_eq!(fetched.record_type, record.record_type);
        assert_eq!(fetched.record_date, record.record_date);
        assert_eq!(fetched.data, record.data);
        assert!(fetched.source_hospital.is_none());
        // Stored stamps are truncated to microseconds.
        assert_eq!(
            fetched.created_at.timestamp_micros(),
            record.created_at.timestamp_micros()
        );
    }

    #[test]
    fn test_create_rejects_unknown_patient_and_bad_input() {
        let (_temp_dir, db) = temp_database();
        let conn = db.connect().unwrap();
        let patient_id = register(&conn);
        let service = HealthRecordService::new(&conn);

        let err = service
            .create_local_record(&PatientId::new(), input("PRESCRIPTION"))
            .unwrap_err();
        assert!(matches!(err, RecordsError::PatientNotFound(_)));

        let err = service
            .create_local_record(&patient_id, input("   "))
            .unwrap_err();
        assert!(matches!(err, RecordsError::InvalidInput(_)));

        let mut bad_date = input("PRESCRIPTION");
        bad_date.record_date = "next tuesday".into();
        let err = service
            .create_local_record(&patient_id, bad_date)
            .unwrap_err();
        assert!(matches!(err, RecordsError::InvalidInput(_)));
    }

    #[test]
    fn test_record_distinguishes_missing_patient_and_missing_record() {
        let (_temp_dir, db) = temp_database();
        let conn = db.connect().unwrap();
        let patient_id = register(&conn);
        let service = HealthRecordService::new(&conn);

        let err = service
            .record(&PatientId::new(), &RecordId::new())
            .unwrap_err();
        assert!(matches!(err, RecordsError::PatientNotFound(_)));

        let err = service.record(&patient_id, &RecordId::new()).unwrap_err();
        assert!(matches!(err, RecordsError::RecordNotFound { .. }));
    }

    #[test]
    fn test_delete_then_get_is_not_found() {
        let (_temp_dir, db) = temp_database();
        let conn = db.connect().unwrap();
        let patient_id = register(&conn);
        let service = HealthRecordService::new(&conn);

        let record = service
            .create_local_record(&patient_id, input("PRESCRIPTION"))
            .unwrap();
        service.delete_record(&patient_id, &record.id).unwrap();

        let err = service.record(&patient_id, &record.id).unwrap_err();
        assert!(matches!(err, RecordsError::RecordNotFound { .. }));
    }

    #[test]
    fn test_summary_of_patient_without_records() {
        let (_temp_dir, db) = temp_database();
        let conn = db.connect().unwrap();
        let patient_id = register(&conn);

        let summary = HealthRecordService::new(&conn).summary(&patient_id).unwrap();
        assert_eq!(summary, HealthRecordSummary::default());
        assert!(summary.last_updated.is_none());
    }

    #[test]
    fn test_summary_counts_add_up() {
        let (_temp_dir, db) = temp_database();
        let conn = db.connect().unwrap();
        let patient_id = register(&conn);
        let service = HealthRecordService::new(&conn);

        service
            .create_local_record(&patient_id, input("PRESCRIPTION"))
            .unwrap();
        service
            .create_local_record(&patient_id, input("LAB_REPORT"))
            .unwrap();
        service
            .store_received_record(&patient_id, received("PRESCRIPTION", "HOSP-A"))
            .unwrap();
        let last = service
            .store_received_record(&patient_id, received("DIAGNOSTIC_REPORT", "HOSP-B"))
            .unwrap();

        let summary = service.summary(&patient_id).unwrap();
        assert_eq!(summary.total_records, 4);
        assert_eq!(summary.by_type.values().sum::<u64>(), 4);
        assert_eq!(summary.by_source.values().sum::<u64>(), 4);
        assert_eq!(summary.by_type["PRESCRIPTION"], 2);
        assert_eq!(summary.by_source[LOCAL_SOURCE_BUCKET], 2);
        assert_eq!(summary.by_source["HOSP-A"], 1);
        assert_eq!(summary.by_source["HOSP-B"], 1);
        assert_eq!(
            summary.last_updated.map(|dt| dt.timestamp_micros()),
            Some(last.updated_at.timestamp_micros())
        );
    }

    #[test]
    fn test_store_received_record_requires_source() {
        let (_temp_dir, db) = temp_database();
        let conn = db.connect().unwrap();
        let patient_id = register(&conn);
        let service = HealthRecordService::new(&conn);

        let mut record = received("LAB_REPORT", "HOSP-A");
        record.origin = RecordOrigin::Local;
        let err = service
            .store_received_record(&patient_id, record)
            .unwrap_err();
        assert!(matches!(err, RecordsError::InvalidInput(_)));
    }

    #[test]
    fn test_reserved_local_source_does_not_merge_with_local_records() {
        let (_temp_dir, db) = temp_database();
        let conn = db.connect().unwrap();
        let patient_id = register(&conn);
        let service = HealthRecordService::new(&conn);

        service
            .create_local_record(&patient_id, input("PRESCRIPTION"))
            .unwrap();
        for hospital in ["local", "LOCAL", " Local "] {
            let err = service
                .store_received_record(&patient_id, received("LAB_REPORT", hospital))
                .unwrap_err();
            assert!(
                matches!(&err, RecordsError::InvalidInput(msg) if msg.contains("reserved")),
                "{hospital:?} should be rejected, got {err:?}"
            );
        }
        service
            .store_received_record(&patient_id, received("LAB_REPORT", "local-hospital"))
            .unwrap();

        let summary = service.summary(&patient_id).unwrap();
        assert_eq!(summary.total_records, 2);
        assert_eq!(summary.by_source[LOCAL_SOURCE_BUCKET], 1);
        assert_eq!(summary.by_source["local-hospital"], 1);
    }

    #[test]
    fn test_summary_releases_its_read_transaction() {
        let (_temp_dir, db) = temp_database();
        let conn = db.connect().unwrap();
        let patient_id = register(&conn);
        let service = HealthRecordService::new(&conn);

        service
            .create_local_record(&patient_id, input("PRESCRIPTION"))
            .unwrap();
        service.summary(&patient_id).unwrap();
        assert!(conn.is_autocommit());

        // A second connection can write once the summary has finished.
        let other = db.connect().unwrap();
        HealthRecordService::new(&other)
            .create_local_record(&patient_id, input("LAB_REPORT"))
            .unwrap();
        assert_eq!(service.summary(&patient_id).unwrap().total_records, 2);
    }

    #[test]
    fn test_create_stores_record_type_trimmed() {
        let (_temp_dir, db) = temp_database();
        let conn = db.connect().unwrap();
        let patient_id = register(&conn);
        let service = HealthRecordService::new(&conn);

        let created = service
            .create_local_record(&patient_id, input(" PRESCRIPTION "))
            .unwrap();
        let fetched = service.record(&patient_id, &created.id).unwrap();
        assert_eq!(fetched.record_type.as_str(), "PRESCRIPTION");
        assert_eq!(service.summary(&patient_id).unwrap().by_type["PRESCRIPTION"], 1);
    }

    #[test]
    fn test_external_records_only_returns_received() {
        let (_temp_dir, db) = temp_database();
        let conn = db.connect().unwrap();
        let patient_id = register(&conn);
        let service = HealthRecordService::new(&conn);

        service
            .create_local_record(&patient_id, input("PRESCRIPTION"))
            .unwrap();
        service
            .store_received_record(&patient_id, received("LAB_REPORT", "HOSP-A"))
            .unwrap();

        let external = service.external_records(&patient_id).unwrap();
        assert_eq!(external.len(), 1);
        assert!(external.iter().all(HealthRecord::is_external));

        let patients = service.patients_with_records().unwrap();
        assert_eq!(patients.len(), 1);
        assert_eq!(patients[0].record_count, 2);
    }
}
