//! Patient database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{constraint_or, Database, DbResult};
use crate::models::Patient;

const PATIENT_COLUMNS: &str = "local_id, phone_number, name, caregiver_phone, created_at";

fn patient_from_row(row: &Row<'_>) -> rusqlite::Result<Patient> {
    Ok(Patient {
        local_id: row.get(0)?,
        phone_number: row.get(1)?,
        name: row.get(2)?,
        caregiver_phone: row.get(3)?,
        created_at: row.get(4)?,
    })
}

impl Database {
    /// Insert a new patient. Phone numbers are unique.
    pub fn insert_patient(&self, patient: &Patient) -> DbResult<()> {
        self.conn
            .execute(
                r#"
                INSERT INTO patients (local_id, phone_number, name, caregiver_phone, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    patient.local_id,
                    patient.phone_number,
                    patient.name,
                    patient.caregiver_phone,
                    patient.created_at,
                ],
            )
            .map_err(|e| constraint_or(e, "patient"))?;
        Ok(())
    }

    /// Get a patient by local ID.
    pub fn get_patient(&self, local_id: &str) -> DbResult<Option<Patient>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM patients WHERE local_id = ?", PATIENT_COLUMNS),
                [local_id],
                patient_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Look up the patient who texts from `phone_number`.
    pub fn get_patient_by_phone(&self, phone_number: &str) -> DbResult<Option<Patient>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM patients WHERE phone_number = ?", PATIENT_COLUMNS),
                [phone_number.trim()],
                patient_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// List all patients.
    pub fn list_patients(&self) -> DbResult<Vec<Patient>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM patients ORDER BY name", PATIENT_COLUMNS))?;

        let rows = stmt.query_map([], patient_from_row)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
