//! Patient record service: turns client drafts into validated fields and
//! runs every read and write under the caller's clinic.

use chrono::{DateTime, NaiveDate};
use rusqlite::Connection;
use serde::Deserialize;
use uuid::Uuid;

use crate::db::{self, DatabaseError};
use crate::models::enums::{BloodGroup, Gender};
use crate::models::{
    ClinicIdentity, DoctorNotesInput, LabTest, PatientFields, PatientFilter, PatientRecord,
};

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("{0}")]
    Validation(String),
    #[error("Patient not found")]
    NotFound,
    #[error(transparent)]
    Store(DatabaseError),
}

impl From<DatabaseError> for RecordError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound { .. } => RecordError::NotFound,
            other => RecordError::Store(other),
        }
    }
}

/// Single-entry inputs a form holds before they are added to a list. They
/// are folded into the matching collection on save.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PendingInputs {
    pub medication: Option<String>,
    pub allergy: Option<String>,
    pub surgery: Option<String>,
    pub disease: Option<String>,
    pub lab_test_name: Option<String>,
    pub lab_test_result: Option<String>,
    pub lab_test_date: Option<String>,
}

/// Patient payload as sent by a client for create and update.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PatientDraft {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    #[serde(alias = "dateOfBirth")]
    pub dob: Option<String>,
    pub contact_number: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub blood_group: Option<String>,
    pub current_medications: Option<Vec<String>>,
    pub allergies: Option<Vec<String>>,
    pub past_surgeries: Option<Vec<String>>,
    pub chronic_diseases: Option<Vec<String>>,
    pub doctor_notes: Option<DoctorNotesInput>,
    pub lab_tests: Option<Vec<LabTest>>,
    pub pending: Option<PendingInputs>,
}

/// Validate and normalize a draft. Nothing is stored.
pub fn validate(draft: PatientDraft) -> Result<PatientFields, RecordError> {
    let first_name = trimmed(draft.first_name);
    let last_name = trimmed(draft.last_name);
    let gender = trimmed(draft.gender);
    let dob = trimmed(draft.dob);
    let contact_number = trimmed(draft.contact_number);
    let address = trimmed(draft.address);

    let missing: Vec<&str> = [
        ("firstName", &first_name),
        ("lastName", &last_name),
        ("gender", &gender),
        ("dob", &dob),
        ("contactNumber", &contact_number),
        ("address", &address),
    ]
    .into_iter()
    .filter(|(_, value)| value.is_none())
    .map(|(name, _)| name)
    .collect();

    let (
        Some(first_name),
        Some(last_name),
        Some(gender),
        Some(dob),
        Some(contact_number),
        Some(address),
    ) = (first_name, last_name, gender, dob, contact_number, address)
    else {
        return Err(RecordError::Validation(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )));
    };

    let gender: Gender = gender
        .parse()
        .map_err(|_| RecordError::Validation(format!("Invalid gender: {gender}")))?;
    let dob = parse_date(&dob)?;
    let blood_group = match trimmed(draft.blood_group) {
        Some(raw) => Some(
            raw.parse::<BloodGroup>()
                .map_err(|_| RecordError::Validation(format!("Invalid blood group: {raw}")))?,
        ),
        None => None,
    };

    let pending = draft.pending.unwrap_or_default();
    let mut lab_tests: Vec<LabTest> = draft
        .lab_tests
        .unwrap_or_default()
        .into_iter()
        .map(|t| LabTest {
            name: t.name.trim().to_string(),
            result: t.result.trim().to_string(),
            date: t.date.trim().to_string(),
        })
        .filter(|t| !(t.name.is_empty() && t.result.is_empty() && t.date.is_empty()))
        .collect();
    if let (Some(name), Some(result), Some(date)) = (
        trimmed(pending.lab_test_name),
        trimmed(pending.lab_test_result),
        trimmed(pending.lab_test_date),
    ) {
        lab_tests.push(LabTest { name, result, date });
    }

    Ok(PatientFields {
        first_name,
        last_name,
        gender,
        dob,
        contact_number,
        email: trimmed(draft.email),
        address,
        blood_group,
        current_medications: entries(draft.current_medications, pending.medication),
        allergies: entries(draft.allergies, pending.allergy),
        past_surgeries: entries(draft.past_surgeries, pending.surgery),
        chronic_diseases: entries(draft.chronic_diseases, pending.disease),
        doctor_notes: draft
            .doctor_notes
            .map(DoctorNotesInput::into_notes)
            .unwrap_or_default(),
        lab_tests,
    })
}

/// Create a record owned by the caller's clinic.
pub fn create_patient(
    conn: &Connection,
    caller: &ClinicIdentity,
    draft: PatientDraft,
) -> Result<PatientRecord, RecordError> {
    let fields = validate(draft)?;
    let record = db::insert_patient(conn, &caller.clinic_id, &fields)?;
    tracing::info!(patient_id = %record.id, clinic_id = %caller.clinic_id, "Patient record created");
    Ok(record)
}

/// Replace every field of one of the caller's records.
pub fn update_patient(
    conn: &Connection,
    caller: &ClinicIdentity,
    id: &Uuid,
    draft: PatientDraft,
) -> Result<PatientRecord, RecordError> {
    let fields = validate(draft)?;
    let record = db::update_patient(conn, id, &caller.clinic_id, &fields)?;
    tracing::info!(patient_id = %record.id, clinic_id = %caller.clinic_id, "Patient record updated");
    Ok(record)
}

/// Result of a patient search, shaped by which filters were supplied.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// No filters: every record of the clinic.
    Unfiltered(Vec<PatientRecord>),
    /// At least one filter matched. `exact` is set when both name and date
    /// of birth were supplied.
    Matches {
        records: Vec<PatientRecord>,
        exact: bool,
    },
    NoMatch,
}

impl SearchOutcome {
    /// The record to load for editing: the first match of a name plus date
    /// of birth search.
    pub fn selected(&self) -> Option<&PatientRecord> {
        match self {
            SearchOutcome::Matches {
                records,
                exact: true,
            } => records.first(),
            _ => None,
        }
    }

    pub fn records(&self) -> &[PatientRecord] {
        match self {
            SearchOutcome::Unfiltered(records) | SearchOutcome::Matches { records, .. } => records,
            SearchOutcome::NoMatch => &[],
        }
    }

    pub fn into_records(self) -> Vec<PatientRecord> {
        match self {
            SearchOutcome::Unfiltered(records) | SearchOutcome::Matches { records, .. } => records,
            SearchOutcome::NoMatch => Vec::new(),
        }
    }
}

/// Search the caller's records.
pub fn search(
    conn: &Connection,
    caller: &ClinicIdentity,
    filter: &PatientFilter,
) -> Result<SearchOutcome, RecordError> {
    let records = db::search_patients(conn, &caller.clinic_id, filter)?;
    Ok(if filter.is_empty() {
        SearchOutcome::Unfiltered(records)
    } else if records.is_empty() {
        SearchOutcome::NoMatch
    } else {
        SearchOutcome::Matches {
            records,
            exact: filter.is_complete(),
        }
    })
}

/// Parse a calendar date. A full RFC 3339 timestamp is cut to its date.
pub fn parse_date(raw: &str) -> Result<NaiveDate, RecordError> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|ts| ts.date_naive()))
        .map_err(|_| RecordError::Validation(format!("Invalid date: {raw} (expected YYYY-MM-DD)")))
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn entries(list: Option<Vec<String>>, pending: Option<String>) -> Vec<String> {
    list.unwrap_or_default()
        .into_iter()
        .filter_map(|entry| trimmed(Some(entry)))
        .chain(trimmed(pending))
        .collect()
}
