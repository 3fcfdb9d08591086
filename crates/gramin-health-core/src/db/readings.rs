//! Reading database operations. Append-only: no update or delete.

use rusqlite::{params, Row};

use super::{constraint_or, Database, DbError, DbResult};
use crate::models::{Measurement, Reading, ReadingKind};

impl Database {
    /// Append a reading.
    pub fn insert_reading(&self, reading: &Reading) -> DbResult<()> {
        let measurement = &reading.measurement;
        self.conn
            .execute(
                r#"
                INSERT INTO readings (reading_id, patient_id, kind, value1, value2, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    reading.reading_id,
                    reading.patient_id,
                    measurement.kind().as_str(),
                    measurement.value1(),
                    measurement.value2(),
                    reading.created_at,
                ],
            )
            .map_err(|e| constraint_or(e, "reading"))?;
        Ok(())
    }

    /// List a patient's readings, oldest first.
    pub fn list_readings_for_patient(&self, patient_id: &str) -> DbResult<Vec<Reading>> {
        self.query_readings(
            r#"
            SELECT reading_id, patient_id, kind, value1, value2, created_at
            FROM readings
            WHERE patient_id = ?1
            ORDER BY created_at ASC, rowid ASC
            "#,
            patient_id,
            None,
        )
    }

    /// Most recent readings of one kind, returned oldest first (chart order).
    pub fn recent_readings(
        &self,
        patient_id: &str,
        kind: ReadingKind,
        limit: usize,
    ) -> DbResult<Vec<Reading>> {
        let mut readings = self.query_readings(
            r#"
            SELECT reading_id, patient_id, kind, value1, value2, created_at
            FROM readings
            WHERE patient_id = ?1 AND kind = ?2
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?3
            "#,
            patient_id,
            Some((kind, limit)),
        )?;
        readings.reverse();
        Ok(readings)
    }

    /// Total number of stored readings.
    pub fn count_readings(&self) -> DbResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM readings", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn query_readings(
        &self,
        sql: &str,
        patient_id: &str,
        kind_limit: Option<(ReadingKind, usize)>,
    ) -> DbResult<Vec<Reading>> {
        let mut stmt = self.conn.prepare(sql)?;

        let rows = match kind_limit {
            Some((kind, limit)) => stmt
                .query_map(
                    params![patient_id, kind.as_str(), i64::try_from(limit).unwrap_or(i64::MAX)],
                    reading_row,
                )?
                .collect::<Result<Vec<_>, _>>()?,
            None => stmt
                .query_map([patient_id], reading_row)?
                .collect::<Result<Vec<_>, _>>()?,
        };

        rows.into_iter().map(Reading::try_from).collect()
    }
}

fn reading_row(row: &Row<'_>) -> rusqlite::Result<ReadingRow> {
    Ok(ReadingRow {
        reading_id: row.get(0)?,
        patient_id: row.get(1)?,
        kind: row.get(2)?,
        value1: row.get(3)?,
        value2: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Intermediate row struct for database mapping.
struct ReadingRow {
    reading_id: String,
    patient_id: String,
    kind: String,
    value1: i64,
    value2: Option<i64>,
    created_at: String,
}

impl TryFrom<ReadingRow> for Reading {
    type Error = DbError;

    fn try_from(row: ReadingRow) -> Result<Self, Self::Error> {
        let kind = ReadingKind::from_code(&row.kind)
            .ok_or_else(|| DbError::Corrupt(format!("unknown reading kind: {}", row.kind)))?;
        let measurement = Measurement::from_values(kind, row.value1, row.value2).ok_or_else(|| {
            DbError::Corrupt(format!("reading {} has values that do not fit {}", row.reading_id, row.kind))
        })?;

        Ok(Reading {
            reading_id: row.reading_id,
            patient_id: row.patient_id,
            measurement,
            created_at: row.created_at,
        })
    }
}
