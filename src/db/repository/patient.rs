use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::{NewPatient, Patient, PatientUpdate, PENDING_DIAGNOSIS};

const PATIENT_COLUMNS: &str = "id, name, age, gender, eye_issue, diabetes, duration, image_path,
     diagnosed_by, diagnosis_result, pdf_report_path, created_at";

fn row_to_patient(row: &rusqlite::Row<'_>) -> rusqlite::Result<Patient> {
    Ok(Patient {
        id: row.get(0)?,
        name: row.get(1)?,
        age: row.get(2)?,
        gender: row.get(3)?,
        eye_issue: row.get(4)?,
        diabetes: row.get(5)?,
        duration: row.get(6)?,
        image_path: row.get(7)?,
        diagnosed_by: row.get(8)?,
        diagnosis_result: row.get(9)?,
        pdf_report_path: row.get(10)?,
        created_at: row.get(11)?,
    })
}

/// Insert an intake row with status `Pending` and no report yet.
pub fn insert_patient(conn: &Connection, patient: &NewPatient) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO patients (name, age, gender, eye_issue, diabetes, duration, image_path,
                               diagnosed_by, diagnosis_result)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            patient.name,
            patient.age,
            patient.gender,
            patient.eye_issue,
            patient.diabetes,
            patient.duration,
            patient.image_path,
            patient.diagnosed_by,
            PENDING_DIAGNOSIS,
        ],
    )
    .map_err(DatabaseError::from_write)?;
    Ok(conn.last_insert_rowid())
}

pub fn set_report_path(conn: &Connection, id: i64, report: &str) -> Result<(), DatabaseError> {
    let rows = conn.execute(
        "UPDATE patients SET pdf_report_path = ?1 WHERE id = ?2",
        params![report, id],
    )?;
    if rows == 0 {
        return Err(not_found(id));
    }
    Ok(())
}

pub fn get_patient(conn: &Connection, id: i64) -> Result<Patient, DatabaseError> {
    conn.query_row(
        &format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?1"),
        params![id],
        row_to_patient,
    )
    .optional()?
    .ok_or_else(|| not_found(id))
}

/// All patients, newest first.
pub fn list_patients(conn: &Connection) -> Result<Vec<Patient>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PATIENT_COLUMNS} FROM patients ORDER BY id DESC"
    ))?;
    let rows = stmt.query_map([], row_to_patient)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

pub fn update_patient(
    conn: &Connection,
    id: i64,
    update: &PatientUpdate,
) -> Result<(), DatabaseError> {
    let rows = conn
        .execute(
            "UPDATE patients
             SET name = ?1, age = ?2, gender = ?3, eye_issue = ?4, diabetes = ?5,
                 duration = ?6, diagnosis_result = ?7
             WHERE id = ?8",
            params![
                update.name,
                update.age,
                update.gender,
                update.eye_issue,
                update.diabetes,
                update.duration,
                update.diagnosis_result,
                id,
            ],
        )
        .map_err(DatabaseError::from_write)?;
    if rows == 0 {
        return Err(not_found(id));
    }
    Ok(())
}

pub fn count_patients_by_doctor(conn: &Connection, username: &str) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM patients WHERE diagnosed_by = ?1",
        params![username],
        |row| row.get(0),
    )?;
    Ok(count)
}

fn not_found(id: i64) -> DatabaseError {
    DatabaseError::NotFound {
        entity_type: "Patient".into(),
        id: id.to_string(),
    }
}
