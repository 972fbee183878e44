use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::{Doctor, NewDoctor};

const DOCTOR_COLUMNS: &str =
    "id, full_name, doctor_id, hospital, specialization, username, email, created_at";

fn row_to_doctor(row: &rusqlite::Row<'_>) -> rusqlite::Result<Doctor> {
    Ok(Doctor {
        id: row.get(0)?,
        full_name: row.get(1)?,
        doctor_id: row.get(2)?,
        hospital: row.get(3)?,
        specialization: row.get(4)?,
        username: row.get(5)?,
        email: row.get(6)?,
        created_at: row.get(7)?,
    })
}

/// Insert a doctor account. Duplicate username or email surfaces as
/// `DatabaseError::ConstraintViolation`.
pub fn insert_doctor(
    conn: &Connection,
    doctor: &NewDoctor,
    password_hash: &str,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO users (full_name, doctor_id, hospital, specialization, username, email, password_hash)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            doctor.full_name,
            doctor.doctor_id,
            doctor.hospital,
            doctor.specialization,
            doctor.username,
            doctor.email,
            password_hash,
        ],
    )
    .map_err(DatabaseError::from_write)?;
    Ok(conn.last_insert_rowid())
}

pub fn get_doctor_by_username(
    conn: &Connection,
    username: &str,
) -> Result<Option<Doctor>, DatabaseError> {
    let doctor = conn
        .query_row(
            &format!("SELECT {DOCTOR_COLUMNS} FROM users WHERE username = ?1"),
            params![username],
            row_to_doctor,
        )
        .optional()?;
    Ok(doctor)
}

/// Stored password hash for `username`, if the account exists.
pub fn get_password_hash(
    conn: &Connection,
    username: &str,
) -> Result<Option<String>, DatabaseError> {
    let hash = conn
        .query_row(
            "SELECT password_hash FROM users WHERE username = ?1",
            params![username],
            |row| row.get(0),
        )
        .optional()?;
    Ok(hash)
}
