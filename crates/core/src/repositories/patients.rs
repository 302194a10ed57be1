//! Patient lookups.
//!
//! Patient registration belongs to a separate flow; [`PatientRepository::register`] exists so
//! operators and tests can seed patients into the shared store.

use crate::models::{Patient, PatientRecordCount};
use crate::validation::{stamp_from_sql, stamp_to_sql};
use crate::{RecordsError, RecordsResult};
use chrono::{SubsecRound, Utc};
use records_types::NonEmptyText;
use records_uuid::PatientId;
use rusqlite::{params, Connection, OptionalExtension};

const PATIENT_COLUMNS: &str = "p.id, p.name, p.mobile, p.abha_id, p.created_at";

struct PatientRow {
    id: String,
    name: String,
    mobile: Option<String>,
    health_id: Option<String>,
    created_at: String,
}

impl PatientRow {
    fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            mobile: row.get(2)?,
            health_id: row.get(3)?,
            created_at: row.get(4)?,
        })
    }

    fn into_patient(self) -> RecordsResult<Patient> {
        let id = PatientId::parse(&self.id).map_err(|_| RecordsError::CorruptRow {
            column: "patients.id",
            value: self.id.clone(),
        })?;
        Ok(Patient {
            id,
            name: self.name,
            mobile: self.mobile,
            health_id: self.health_id,
            created_at: stamp_from_sql("patients.created_at", &self.created_at)?,
        })
    }
}

pub struct PatientRepository<'a> {
    conn: &'a Connection,
}

impl<'a> PatientRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Registers a patient with a freshly generated id.
    pub fn register(
        &self,
        name: NonEmptyText,
        mobile: Option<String>,
        health_id: Option<String>,
    ) -> RecordsResult<Patient> {
        let patient = Patient {
            id: PatientId::new(),
            name: name.into_string(),
            mobile,
            health_id,
            created_at: Utc::now().trunc_subsecs(6),
        };

        self.conn.execute(
            "INSERT INTO patients (id, name, mobile, abha_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                patient.id.to_string(),
                patient.name,
                patient.mobile,
                patient.health_id,
                stamp_to_sql(&patient.created_at),
            ],
        )?;

        tracing::info!("registered patient {}", patient.id);
        Ok(patient)
    }

    pub fn find(&self, id: &PatientId) -> RecordsResult<Option<Patient>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {PATIENT_COLUMNS} FROM patients p WHERE p.id = ?1"),
                params![id.to_string()],
                PatientRow::read,
            )
            .optional()?;

        row.map(PatientRow::into_patient).transpose()
    }

    /// Returns the patient or [`RecordsError::PatientNotFound`].
    pub fn require(&self, id: &PatientId) -> RecordsResult<Patient> {
        self.find(id)?.ok_or(RecordsError::PatientNotFound(*id))
    }

    /// Lists every patient that has at least one health record, with their record count.
    ///
    /// Patients are returned in registration order.
    pub fn list_with_records(&self) -> RecordsResult<Vec<PatientRecordCount>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PATIENT_COLUMNS}, COUNT(r.id)
             FROM patients p
             JOIN health_records r ON r.patient_id = p.id
             GROUP BY p.id
             ORDER BY MIN(p.rowid)"
        ))?;

        let rows = stmt.query_map([], |row| {
            Ok((PatientRow::read(row)?, row.get::<_, i64>(5)?))
        })?;

        let mut patients = Vec::new();
        for row in rows {
            let (patient_row, count) = row?;
            patients.push(PatientRecordCount {
                patient: patient_row.into_patient()?,
                record_count: u64::try_from(count).unwrap_or_default(),
            });
        }
        Ok(patients)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::temp_database;

    fn name(value: &str) -> NonEmptyText {
        NonEmptyText::new(value).unwrap()
    }

    #[test]
    fn test_register_then_find() {
        let (_temp_dir, db) = temp_database();
        let conn = db.connect().unwrap();
        let repo = PatientRepository::new(&conn);

        let patient = repo
            .register(
                name("Asha Verma"),
                Some("9876543210".into()),
                Some("asha@abdm".into()),
            )
            .expect("register should succeed");

        let found = repo.find(&patient.id).unwrap().expect("patient should exist");
        assert_eq!(found.name, "Asha Verma");
        assert_eq!(found.mobile.as_deref(), Some("9876543210"));
        assert_eq!(found.health_id.as_deref(), Some("asha@abdm"));
    }

    #[test]
    fn test_require_unknown_patient_is_not_found() {
        let (_temp_dir, db) = temp_database();
        let conn = db.connect().unwrap();
        let repo = PatientRepository::new(&conn);

        let missing = PatientId::new();
        assert!(repo.find(&missing).unwrap().is_none());
        let err = repo.require(&missing).expect_err("should be missing");
        assert!(matches!(err, RecordsError::PatientNotFound(id) if id == missing));
    }

    #[test]
    fn test_list_with_records_skips_patients_without_records() {
        let (_temp_dir, db) = temp_database();
        let conn = db.connect().unwrap();
        let repo = PatientRepository::new(&conn);

        let with_records = repo.register(name("Ravi"), None, None).unwrap();
        let _without = repo.register(name("Meena"), None, None).unwrap();

        for record_id in ["a", "b"] {
            conn.execute(
                "INSERT INTO health_records (id, patient_id, record_type, record_date, data_json,
                 created_at, updated_at)
                 VALUES (?1, ?2, 'PRESCRIPTION', '2024-01-01T00:00:00', '{}',
                 '2024-01-01T00:00:00.000000Z', '2024-01-01T00:00:00.000000Z')",
                params![record_id, with_records.id.to_string()],
            )
            .unwrap();
        }

        let listed = repo.list_with_records().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].patient.id, with_records.id);
        assert_eq!(listed[0].record_count, 2);
    }
}
