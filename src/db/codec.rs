//! JSON text encoding for the nested patient columns.
//!
//! Writes always produce well-formed JSON. Reads never fail: `NULL`, empty,
//! unparseable or wrongly shaped text decodes to the field's empty default,
//! and the legacy single-object doctor note decodes to a one-element list.

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::DatabaseError;
use crate::models::{DoctorNote, DoctorNotesInput, LabTest};

/// Encode a nested value for storage.
pub fn encode<T: Serialize + ?Sized>(field: &'static str, value: &T) -> Result<String, DatabaseError> {
    serde_json::to_string(value).map_err(|e| DatabaseError::Encoding {
        field,
        reason: e.to_string(),
    })
}

/// Decode a stored list column, falling back to an empty list.
pub fn decode_list<T: DeserializeOwned>(field: &'static str, raw: Option<&str>) -> Vec<T> {
    let Some(text) = non_empty(raw) else {
        return Vec::new();
    };
    match serde_json::from_str::<Vec<T>>(text) {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!(field, error = %e, "Unreadable stored list, using empty default");
            Vec::new()
        }
    }
}

pub fn decode_strings(field: &'static str, raw: Option<&str>) -> Vec<String> {
    decode_list(field, raw)
}

pub fn decode_lab_tests(raw: Option<&str>) -> Vec<LabTest> {
    decode_list("lab_tests", raw)
}

/// Decode doctor notes stored either as a list or as a legacy single object.
pub fn decode_doctor_notes(raw: Option<&str>) -> Vec<DoctorNote> {
    let Some(text) = non_empty(raw) else {
        return Vec::new();
    };
    match serde_json::from_str::<DoctorNotesInput>(text) {
        Ok(input) => input.into_notes(),
        Err(e) => {
            tracing::warn!(field = "doctor_notes", error = %e, "Unreadable stored notes, using empty default");
            Vec::new()
        }
    }
}

fn non_empty(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim)
        .filter(|t| !t.is_empty() && *t != "null")
}
