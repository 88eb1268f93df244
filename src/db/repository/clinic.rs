use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::ClinicAccount;

pub fn insert_clinic(conn: &Connection, account: &ClinicAccount) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO clinics (id, username, password_hash, clinic_name, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            account.id.to_string(),
            account.username,
            account.password_hash,
            account.clinic_name,
            super::format_timestamp(&account.created_at),
        ],
    )?;
    Ok(())
}

/// Exact, case-sensitive username lookup.
pub fn get_clinic_by_username(
    conn: &Connection,
    username: &str,
) -> Result<Option<ClinicAccount>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, username, password_hash, clinic_name, created_at
             FROM clinics WHERE username = ?1",
            params![username],
            clinic_row_from_rusqlite,
        )
        .optional()?;

    row.map(clinic_from_row).transpose()
}

pub fn list_clinics(conn: &Connection) -> Result<Vec<ClinicAccount>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, username, password_hash, clinic_name, created_at
         FROM clinics ORDER BY created_at, username",
    )?;

    let rows = stmt.query_map([], clinic_row_from_rusqlite)?;

    let mut clinics = Vec::new();
    for row in rows {
        clinics.push(clinic_from_row(row?)?);
    }
    Ok(clinics)
}

type ClinicRow = (String, String, String, String, String);

fn clinic_row_from_rusqlite(row: &rusqlite::Row<'_>) -> rusqlite::Result<ClinicRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
    ))
}

fn clinic_from_row(row: ClinicRow) -> Result<ClinicAccount, DatabaseError> {
    let (id, username, password_hash, clinic_name, created_at) = row;
    Ok(ClinicAccount {
        id: Uuid::parse_str(&id).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        username,
        password_hash,
        clinic_name,
        created_at: super::parse_timestamp(&created_at)?,
    })
}
