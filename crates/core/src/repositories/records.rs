//! Health record reads, inserts and deletes.

use crate::models::{
    DecryptionStatus, HealthRecord, NewHealthRecord, RecordData, RecordFilter, RecordOrigin,
};
use crate::validation::{format_iso, record_date_from_sql, stamp_from_sql, stamp_to_sql};
use crate::{RecordsError, RecordsResult};
use chrono::{SubsecRound, Utc};
use records_types::RecordType;
use records_uuid::{PatientId, RecordId};
use rusqlite::{params, Connection, OptionalExtension};

const RECORD_COLUMNS: &str = "id, patient_id, record_type, record_date, data_json, data_text,
     source_hospital, request_id, was_encrypted, decryption_status, delivery_attempt,
     created_at, updated_at";

// Raw column values, converted into a `HealthRecord` outside the rusqlite closure so that
// conversion failures surface as `RecordsError`.
struct RecordRow {
    id: String,
    patient_id: String,
    record_type: String,
    record_date: String,
    data_json: String,
    data_text: Option<String>,
    source_hospital: Option<String>,
    request_id: Option<String>,
    was_encrypted: bool,
    decryption_status: String,
    delivery_attempt: i64,
    created_at: String,
    updated_at: String,
}

impl RecordRow {
    fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            patient_id: row.get(1)?,
            record_type: row.get(2)?,
            record_date: row.get(3)?,
            data_json: row.get(4)?,
            data_text: row.get(5)?,
            source_hospital: row.get(6)?,
            request_id: row.get(7)?,
            was_encrypted: row.get(8)?,
            decryption_status: row.get(9)?,
            delivery_attempt: row.get(10)?,
            created_at: row.get(11)?,
            updated_at: row.get(12)?,
        })
    }

    fn into_record(self) -> RecordsResult<HealthRecord> {
        let corrupt = |column: &'static str, value: &str| RecordsError::CorruptRow {
            column,
            value: value.to_string(),
        };

        let data: RecordData =
            serde_json::from_str(&self.data_json).map_err(RecordsError::Deserialization)?;

        Ok(HealthRecord {
            id: RecordId::parse(&self.id).map_err(|_| corrupt("id", &self.id))?,
            patient_id: PatientId::parse(&self.patient_id)
                .map_err(|_| corrupt("patient_id", &self.patient_id))?,
            record_type: RecordType::new(&self.record_type)
                .map_err(|_| corrupt("record_type", &self.record_type))?,
            record_date: record_date_from_sql(&self.record_date)?,
            data,
            data_text: self.data_text,
            source_hospital: self.source_hospital,
            request_id: self.request_id,
            was_encrypted: self.was_encrypted,
            decryption_status: self
                .decryption_status
                .parse::<DecryptionStatus>()
                .map_err(|_| corrupt("decryption_status", &self.decryption_status))?,
            delivery_attempt: u32::try_from(self.delivery_attempt)
                .map_err(|_| corrupt("delivery_attempt", &self.delivery_attempt.to_string()))?,
            created_at: stamp_from_sql("created_at", &self.created_at)?,
            updated_at: stamp_from_sql("updated_at", &self.updated_at)?,
        })
    }
}

fn collect_records(
    rows: impl Iterator<Item = rusqlite::Result<RecordRow>>,
) -> RecordsResult<Vec<HealthRecord>> {
    rows.map(|row| row.map_err(RecordsError::from).and_then(RecordRow::into_record))
        .collect()
}

pub struct HealthRecordRepository<'a> {
    conn: &'a Connection,
}

impl<'a> HealthRecordRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Lists a patient's records matching every filter that is set, in insertion order.
    ///
    /// Does not check that the patient exists: an unknown patient simply has no records.
    pub fn list_for_patient(
        &self,
        patient_id: &PatientId,
        filter: &RecordFilter,
    ) -> RecordsResult<Vec<HealthRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM health_records
             WHERE patient_id = ?1
               AND (?2 IS NULL OR record_type = ?2)
               AND (?3 IS NULL OR source_hospital = ?3)
             ORDER BY rowid"
        ))?;

        let rows = stmt.query_map(
            params![
                patient_id.to_string(),
                filter.record_type.as_ref().map(|t| t.as_str()),
                filter.source_hospital.as_ref().map(|s| s.as_str()),
            ],
            RecordRow::read,
        )?;
        collect_records(rows)
    }

    /// Lists a patient's records received from other hospitals, in insertion order.
    pub fn list_external(&self, patient_id: &PatientId) -> RecordsResult<Vec<HealthRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM health_records
             WHERE patient_id = ?1 AND source_hospital IS NOT NULL
             ORDER BY rowid"
        ))?;

        let rows = stmt.query_map(params![patient_id.to_string()], RecordRow::read)?;
        collect_records(rows)
    }

    /// Fetches a record only if it belongs to the given patient.
    pub fn get(
        &self,
        patient_id: &PatientId,
        record_id: &RecordId,
    ) -> RecordsResult<Option<HealthRecord>> {
        let row = self
            .conn
            .query_row(
                &format!(
                    "SELECT {RECORD_COLUMNS} FROM health_records
                     WHERE id = ?1 AND patient_id = ?2"
                ),
                params![record_id.to_string(), patient_id.to_string()],
                RecordRow::read,
            )
            .optional()?;

        row.map(RecordRow::into_record).transpose()
    }

    /// Inserts a record under a freshly generated id, stamping creation and update time.
    pub fn insert(
        &self,
        patient_id: &PatientId,
        new_record: NewHealthRecord,
    ) -> RecordsResult<HealthRecord> {
        // Stored with microsecond precision; truncate so the returned record matches reads.
        let now = Utc::now().trunc_subsecs(6);
        let (source_hospital, request_id, was_encrypted, decryption_status, delivery_attempt) =
            match new_record.origin {
                RecordOrigin::Local => (None, None, false, DecryptionStatus::None, 0),
                RecordOrigin::External(origin) => (
                    Some(origin.source_hospital.into_string()),
                    origin.request_id,
                    origin.was_encrypted,
                    origin.decryption_status,
                    origin.delivery_attempt,
                ),
            };

        let record = HealthRecord {
            id: RecordId::new(),
            patient_id: *patient_id,
            record_type: new_record.record_type,
            record_date: new_record.record_date,
            data: new_record.data,
            data_text: new_record.data_text,
            source_hospital,
            request_id,
            was_encrypted,
            decryption_status,
            delivery_attempt,
            created_at: now,
            updated_at: now,
        };

        let data_json = serde_json::to_string(&record.data).map_err(RecordsError::Serialization)?;

        self.conn.execute(
            &format!(
                "INSERT INTO health_records ({RECORD_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
            ),
            params![
                record.id.to_string(),
                record.patient_id.to_string(),
                record.record_type.as_str(),
                format_iso(&record.record_date),
                data_json,
                record.data_text,
                record.source_hospital,
                record.request_id,
                record.was_encrypted,
                record.decryption_status.as_str(),
                record.delivery_attempt,
                stamp_to_sql(&record.created_at),
                stamp_to_sql(&record.updated_at),
            ],
        )?;

        Ok(record)
    }

    /// Deletes a record belonging to the given patient.
    ///
    /// # Errors
    ///
    /// Returns [`RecordsError::RecordNotFound`] if no row was deleted, including when a
    /// concurrent request deleted it first.
    pub fn delete(&self, patient_id: &PatientId, record_id: &RecordId) -> RecordsResult<()> {
        let deleted = self.conn.execute(
            "DELETE FROM health_records WHERE id = ?1 AND patient_id = ?2",
            params![record_id.to_string(), patient_id.to_string()],
        )?;

        if deleted == 0 {
            return Err(RecordsError::RecordNotFound {
                patient_id: *patient_id,
                record_id: *record_id,
            });
        }
        Ok(())
    }
}
