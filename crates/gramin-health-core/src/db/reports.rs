//! Triage report database operations. Append-only: no update or delete.

use rusqlite::{params, OptionalExtension, Row};

use super::{constraint_or, Database, DbError, DbResult};
use crate::models::{TriagePrediction, TriageReport};

const REPORT_COLUMNS: &str = "report_id, patient_id, chief_complaint, notes, prediction, \
                              prediction_text, model_version, created_at";

impl Database {
    /// Append a triage report.
    pub fn insert_triage_report(&self, report: &TriageReport) -> DbResult<()> {
        let prediction_json = serde_json::to_string(&report.prediction)?;

        self.conn
            .execute(
                r#"
                INSERT INTO triage_reports (
                    report_id, patient_id, chief_complaint, notes, tier,
                    prediction, prediction_text, model_version, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
                params![
                    report.report_id,
                    report.patient_id,
                    report.chief_complaint,
                    report.notes,
                    report.tier().as_str(),
                    prediction_json,
                    report.prediction_text,
                    report.model_version,
                    report.created_at,
                ],
            )
            .map_err(|e| constraint_or(e, "triage report"))?;
        Ok(())
    }

    /// Get a report by ID.
    pub fn get_triage_report(&self, report_id: &str) -> DbResult<Option<TriageReport>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM triage_reports WHERE report_id = ?", REPORT_COLUMNS),
                [report_id],
                report_row,
            )
            .optional()?
            .map(TriageReport::try_from)
            .transpose()
    }

    /// List a patient's reports, newest first.
    pub fn list_triage_reports_for_patient(&self, patient_id: &str) -> DbResult<Vec<TriageReport>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM triage_reports WHERE patient_id = ? ORDER BY created_at DESC, rowid DESC",
            REPORT_COLUMNS
        ))?;

        let rows = stmt.query_map([patient_id], report_row)?;

        let mut reports = Vec::new();
        for row in rows {
            reports.push(row?.try_into()?);
        }
        Ok(reports)
    }
}

fn report_row(row: &Row<'_>) -> rusqlite::Result<ReportRow> {
    Ok(ReportRow {
        report_id: row.get(0)?,
        patient_id: row.get(1)?,
        chief_complaint: row.get(2)?,
        notes: row.get(3)?,
        prediction: row.get(4)?,
        prediction_text: row.get(5)?,
        model_version: row.get(6)?,
        created_at: row.get(7)?,
    })
}

/// Intermediate row struct for database mapping.
struct ReportRow {
    report_id: String,
    patient_id: String,
    chief_complaint: String,
    notes: String,
    prediction: String,
    prediction_text: String,
    model_version: Option<String>,
    created_at: String,
}

impl TryFrom<ReportRow> for TriageReport {
    type Error = DbError;

    fn try_from(row: ReportRow) -> Result<Self, Self::Error> {
        let prediction: TriagePrediction = serde_json::from_str(&row.prediction)?;

        Ok(TriageReport {
            report_id: row.report_id,
            patient_id: row.patient_id,
            chief_complaint: row.chief_complaint,
            notes: row.notes,
            prediction,
            prediction_text: row.prediction_text,
            model_version: row.model_version,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DegradedReason, Patient, PredictionTier};

    fn setup_db() -> (Database, Patient) {
        let db = Database::open_in_memory().unwrap();
        let patient = Patient::new("Ramesh".into(), "+919876543210".into());
        db.insert_patient(&patient).unwrap();
        (db, patient)
    }

    #[test]
    fn test_insert_and_get() {
        let (db, patient) = setup_db();

        let report = TriageReport::new(
            patient.local_id.clone(),
            "fever".into(),
            "chills at night".into(),
            TriagePrediction::degraded(
                "Malaria".into(),
                "Artemisinin combination therapy.".into(),
                DegradedReason::FormatterUnavailable,
            ),
            Some("deadbeef".into()),
        );
        db.insert_triage_report(&report).unwrap();

        let retrieved = db.get_triage_report(&report.report_id).unwrap().unwrap();
        assert_eq!(retrieved, report);
        assert_eq!(retrieved.tier(), PredictionTier::Degraded);
    }

    #[test]
    fn test_tier_column_written() {
        let (db, patient) = setup_db();

        let report = TriageReport::new(
            patient.local_id.clone(),
            "cough".into(),
            String::new(),
            TriagePrediction::model_unavailable(),
            None,
        );
        db.insert_triage_report(&report).unwrap();

        let tier: String = db
            .conn()
            .query_row(
                "SELECT tier FROM triage_reports WHERE report_id = ?",
                [&report.report_id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tier, "model_unavailable");
    }

    #[test]
    fn test_list_for_patient() {
        let (db, patient) = setup_db();

        for complaint in ["fever", "cough"] {
            let report = TriageReport::new(
                patient.local_id.clone(),
                complaint.into(),
                String::new(),
                TriagePrediction::minimal("Flu".into()),
                None,
            );
            db.insert_triage_report(&report).unwrap();
        }

        let reports = db.list_triage_reports_for_patient(&patient.local_id).unwrap();
        assert_eq!(reports.len(), 2);
        assert!(db.list_triage_reports_for_patient("other").unwrap().is_empty());
    }

    #[test]
    fn test_missing_report() {
        let (db, _) = setup_db();
        assert!(db.get_triage_report("nope").unwrap().is_none());
    }
}
