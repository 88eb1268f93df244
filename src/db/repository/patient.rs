use std::str::FromStr;

use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::codec;
use crate::db::DatabaseError;
use crate::models::enums::{BloodGroup, Gender};
use crate::models::{PatientFields, PatientFilter, PatientRecord};

const PATIENT_COLUMNS: &str = "id, clinic_id, first_name, last_name, gender, dob, contact_number,
         email, address, blood_group, current_medications, allergies, past_surgeries,
         chronic_diseases, doctor_notes, lab_tests, created_at";

/// Nested columns, already encoded to JSON text.
struct EncodedCollections {
    current_medications: String,
    allergies: String,
    past_surgeries: String,
    chronic_diseases: String,
    doctor_notes: String,
    lab_tests: String,
}

impl EncodedCollections {
    fn encode(fields: &PatientFields) -> Result<Self, DatabaseError> {
        Ok(Self {
            current_medications: codec::encode("current_medications", &fields.current_medications)?,
            allergies: codec::encode("allergies", &fields.allergies)?,
            past_surgeries: codec::encode("past_surgeries", &fields.past_surgeries)?,
            chronic_diseases: codec::encode("chronic_diseases", &fields.chronic_diseases)?,
            doctor_notes: codec::encode("doctor_notes", &fields.doctor_notes)?,
            lab_tests: codec::encode("lab_tests", &fields.lab_tests)?,
        })
    }
}

/// Store a new record for `clinic_id`. Assigns the id and creation time.
pub fn insert_patient(
    conn: &Connection,
    clinic_id: &Uuid,
    fields: &PatientFields,
) -> Result<PatientRecord, DatabaseError> {
    let nested = EncodedCollections::encode(fields)?;
    let record = PatientRecord {
        id: Uuid::new_v4(),
        clinic_id: *clinic_id,
        fields: fields.clone(),
        created_at: super::now_timestamp(),
    };

    conn.execute(
        "INSERT INTO patients (id, clinic_id, first_name, last_name, gender, dob, contact_number,
         email, address, blood_group, current_medications, allergies, past_surgeries,
         chronic_diseases, doctor_notes, lab_tests, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
        params![
            record.id.to_string(),
            record.clinic_id.to_string(),
            fields.first_name,
            fields.last_name,
            fields.gender.as_str(),
            fields.dob.to_string(),
            fields.contact_number,
            fields.email,
            fields.address,
            fields.blood_group.map(|b| b.as_str()),
            nested.current_medications,
            nested.allergies,
            nested.past_surgeries,
            nested.chronic_diseases,
            nested.doctor_notes,
            nested.lab_tests,
            super::format_timestamp(&record.created_at),
        ],
    )?;

    Ok(record)
}

/// Replace every mutable field of a record owned by `clinic_id`.
///
/// A record that does not exist and a record owned by another clinic are
/// both reported as `NotFound`.
pub fn update_patient(
    conn: &Connection,
    id: &Uuid,
    clinic_id: &Uuid,
    fields: &PatientFields,
) -> Result<PatientRecord, DatabaseError> {
    let nested = EncodedCollections::encode(fields)?;

    let changed = conn.execute(
        "UPDATE patients SET first_name = ?3, last_name = ?4, gender = ?5, dob = ?6,
         contact_number = ?7, email = ?8, address = ?9, blood_group = ?10,
         current_medications = ?11, allergies = ?12, past_surgeries = ?13,
         chronic_diseases = ?14, doctor_notes = ?15, lab_tests = ?16
         WHERE id = ?1 AND clinic_id = ?2",
        params![
            id.to_string(),
            clinic_id.to_string(),
            fields.first_name,
            fields.last_name,
            fields.gender.as_str(),
            fields.dob.to_string(),
            fields.contact_number,
            fields.email,
            fields.address,
            fields.blood_group.map(|b| b.as_str()),
            nested.current_medications,
            nested.allergies,
            nested.past_surgeries,
            nested.chronic_diseases,
            nested.doctor_notes,
            nested.lab_tests,
        ],
    )?;

    if changed == 0 {
        return Err(patient_not_found(id));
    }

    get_patient(conn, id, clinic_id)?.ok_or_else(|| patient_not_found(id))
}

pub fn get_patient(
    conn: &Connection,
    id: &Uuid,
    clinic_id: &Uuid,
) -> Result<Option<PatientRecord>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?1 AND clinic_id = ?2"),
            params![id.to_string(), clinic_id.to_string()],
            PatientRow::from_rusqlite,
        )
        .optional()?;

    row.map(patient_from_row).transpose()
}

/// All of a clinic's records matching `filter`, newest first.
///
/// The date of birth is matched in SQL. The name is matched afterwards as a
/// case-insensitive substring of the trimmed "first last" name, which keeps
/// non-ASCII names and LIKE metacharacters out of the SQL layer.
pub fn search_patients(
    conn: &Connection,
    clinic_id: &Uuid,
    filter: &PatientFilter,
) -> Result<Vec<PatientRecord>, DatabaseError> {
    let mut sql = format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE clinic_id = ?");
    let mut args: Vec<Value> = vec![Value::Text(clinic_id.to_string())];

    if let Some(dob) = filter.dob {
        sql.push_str(" AND dob = ?");
        args.push(Value::Text(dob.to_string()));
    }
    sql.push_str(" ORDER BY created_at DESC, rowid DESC");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(args), PatientRow::from_rusqlite)?;

    let needle = filter.name.as_deref().map(str::to_lowercase);

    let mut patients = Vec::new();
    for row in rows {
        let record = patient_from_row(row?)?;
        if let Some(needle) = &needle {
            if !record.fields.full_name().to_lowercase().contains(needle.as_str()) {
                continue;
            }
        }
        patients.push(record);
    }
    Ok(patients)
}

fn patient_not_found(id: &Uuid) -> DatabaseError {
    DatabaseError::NotFound {
        entity_type: "patient".into(),
        id: id.to_string(),
    }
}

struct PatientRow {
    id: String,
    clinic_id: String,
    first_name: String,
    last_name: String,
    gender: String,
    dob: String,
    contact_number: String,
    email: Option<String>,
    address: String,
    blood_group: Option<String>,
    current_medications: Option<String>,
    allergies: Option<String>,
    past_surgeries: Option<String>,
    chronic_diseases: Option<String>,
    doctor_notes: Option<String>,
    lab_tests: Option<String>,
    created_at: String,
}

impl PatientRow {
    fn from_rusqlite(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            clinic_id: row.get(1)?,
            first_name: row.get(2)?,
            last_name: row.get(3)?,
            gender: row.get(4)?,
            dob: row.get(5)?,
            contact_number: row.get(6)?,
            email: row.get(7)?,
            address: row.get(8)?,
            blood_group: row.get(9)?,
            current_medications: row.get(10)?,
            allergies: row.get(11)?,
            past_surgeries: row.get(12)?,
            chronic_diseases: row.get(13)?,
            doctor_notes: row.get(14)?,
            lab_tests: row.get(15)?,
            created_at: row.get(16)?,
        })
    }
}

fn patient_from_row(row: PatientRow) -> Result<PatientRecord, DatabaseError> {
    let parse_uuid = |s: &str| {
        Uuid::parse_str(s).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))
    };

    Ok(PatientRecord {
        id: parse_uuid(&row.id)?,
        clinic_id: parse_uuid(&row.clinic_id)?,
        fields: PatientFields {
            first_name: row.first_name,
            last_name: row.last_name,
            gender: Gender::from_str(&row.gender)?,
            dob: NaiveDate::parse_from_str(&row.dob, "%Y-%m-%d").map_err(|e| {
                DatabaseError::ConstraintViolation(format!("bad dob {:?}: {e}", row.dob))
            })?,
            contact_number: row.contact_number,
            email: row.email.filter(|e| !e.trim().is_empty()),
            address: row.address,
            blood_group: row
                .blood_group
                .as_deref()
                .filter(|b| !b.trim().is_empty())
                .map(BloodGroup::from_str)
                .transpose()?,
            current_medications: codec::decode_strings(
                "current_medications",
                row.current_medications.as_deref(),
            ),
            allergies: codec::decode_strings("allergies", row.allergies.as_deref()),
            past_surgeries: codec::decode_strings("past_surgeries", row.past_surgeries.as_deref()),
            chronic_diseases: codec::decode_strings(
                "chronic_diseases",
                row.chronic_diseases.as_deref(),
            ),
            doctor_notes: codec::decode_doctor_notes(row.doctor_notes.as_deref()),
            lab_tests: codec::decode_lab_tests(row.lab_tests.as_deref()),
        },
        created_at: super::parse_timestamp(&row.created_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::{insert_clinic, now_timestamp};
    use crate::db::sqlite::open_memory_database;
    use crate::models::{ClinicAccount, DoctorNote, LabTest};

    fn seed_clinic(conn: &Connection, username: &str) -> Uuid {
        let account = ClinicAccount {
            id: Uuid::new_v4(),
            username: username.into(),
            password_hash: "unused".into(),
            clinic_name: format!("{username} clinic"),
            created_at: now_timestamp(),
        };
        insert_clinic(conn, &account).unwrap();
        account.id
    }

    fn fields(first: &str, last: &str, dob: (i32, u32, u32)) -> PatientFields {
        PatientFields {
            first_name: first.into(),
            last_name: last.into(),
            gender: Gender::Other,
            dob: NaiveDate::from_ymd_opt(dob.0, dob.1, dob.2).unwrap(),
            contact_number: "555-0100".into(),
            email: None,
            address: "1 Main St".into(),
            blood_group: None,
            current_medications: vec![],
            allergies: vec![],
            past_surgeries: vec![],
            chronic_diseases: vec![],
            doctor_notes: vec![],
            lab_tests: vec![],
        }
    }

    fn full_fields() -> PatientFields {
        PatientFields {
            email: Some("john@example.org".into()),
            blood_group: Some(BloodGroup::ONegative),
            current_medications: vec!["Metformin".into(), "Aspirin".into(), "Aspirin".into()],
            allergies: vec!["Penicillin".into()],
            past_surgeries: vec!["Appendectomy".into()],
            chronic_diseases: vec!["Type 2 diabetes".into()],
            doctor_notes: vec![DoctorNote {
                visit_date: "2025-04-01".into(),
                doctor_name: "Dr. Mensah".into(),
                diagnosis: "Hyperglycaemia".into(),
                treatment_plan: "Adjust dose".into(),
            }],
            lab_tests: vec![LabTest {
                name: "HbA1c".into(),
                result: "7.9%".into(),
                date: "2025-03-28".into(),
            }],
            ..fields("John", "Doe", (1975, 8, 30))
        }
    }

    #[test]
    fn insert_then_search_returns_equal_record() {
        let conn = open_memory_database().unwrap();
        let clinic = seed_clinic(&conn, "north");
        let inserted = insert_patient(&conn, &clinic, &full_fields()).unwrap();

        let found = search_patients(&conn, &clinic, &PatientFilter::default()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0], inserted);
        assert_eq!(found[0].fields, full_fields());
        assert_eq!(found[0].clinic_id, clinic);
    }

    #[test]
    fn empty_collections_are_stored_as_empty_lists() {
        let conn = open_memory_database().unwrap();
        let clinic = seed_clinic(&conn, "north");
        let rec = insert_patient(&conn, &clinic, &fields("Amy", "Smith", (1990, 1, 1))).unwrap();

        let (meds, notes, labs): (String, String, String) = conn
            .query_row(
                "SELECT current_medications, doctor_notes, lab_tests FROM patients WHERE id = ?1",
                params![rec.id.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!((meds.as_str(), notes.as_str(), labs.as_str()), ("[]", "[]", "[]"));
    }

    #[test]
    fn legacy_nested_values_read_as_defaults() {
        let conn = open_memory_database().unwrap();
        let clinic = seed_clinic(&conn, "north");
        let rec = insert_patient(&conn, &clinic, &fields("Amy", "Smith", (1990, 1, 1))).unwrap();

        conn.execute(
            "UPDATE patients SET allergies = 'Penicillin, latex', lab_tests = '',
             doctor_notes = '{\"visitDate\":\"2020-01-01\",\"doctorName\":\"Dr. Old\",\"diagnosis\":\"Sprain\",\"treatmentPlan\":\"Ice\"}'
             WHERE id = ?1",
            params![rec.id.to_string()],
        )
        .unwrap();

        let read = get_patient(&conn, &rec.id, &clinic).unwrap().unwrap();
        assert!(read.fields.allergies.is_empty());
        assert!(read.fields.lab_tests.is_empty());
        assert_eq!(read.fields.doctor_notes.len(), 1);
        assert_eq!(read.fields.doctor_notes[0].doctor_name, "Dr. Old");
    }

    #[test]
    fn search_is_scoped_to_clinic() {
        let conn = open_memory_database().unwrap();
        let north = seed_clinic(&conn, "north");
        let south = seed_clinic(&conn, "south");
        insert_patient(&conn, &north, &fields("John", "Doe", (1975, 8, 30))).unwrap();

        assert!(search_patients(&conn, &south, &PatientFilter::default())
            .unwrap()
            .is_empty());
        let by_name = PatientFilter::new(Some("john"), None);
        assert!(search_patients(&conn, &south, &by_name).unwrap().is_empty());
    }

    #[test]
    fn update_from_other_clinic_is_not_found() {
        let conn = open_memory_database().unwrap();
        let north = seed_clinic(&conn, "north");
        let south = seed_clinic(&conn, "south");
        let rec = insert_patient(&conn, &north, &fields("John", "Doe", (1975, 8, 30))).unwrap();

        let err = update_patient(&conn, &rec.id, &south, &full_fields()).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));

        // The owner's copy is untouched.
        let still = get_patient(&conn, &rec.id, &north).unwrap().unwrap();
        assert_eq!(still, rec);
        assert!(get_patient(&conn, &rec.id, &south).unwrap().is_none());
    }

    #[test]
    fn update_unknown_id_is_not_found() {
        let conn = open_memory_database().unwrap();
        let north = seed_clinic(&conn, "north");
        let err = update_patient(&conn, &Uuid::new_v4(), &north, &full_fields()).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[test]
    fn update_replaces_all_fields_and_keeps_identity() {
        let conn = open_memory_database().unwrap();
        let north = seed_clinic(&conn, "north");
        let rec = insert_patient(&conn, &north, &full_fields()).unwrap();

        let replacement = fields("Johnny", "Doe", (1975, 8, 31));
        let updated = update_patient(&conn, &rec.id, &north, &replacement).unwrap();

        assert_eq!(updated.id, rec.id);
        assert_eq!(updated.created_at, rec.created_at);
        assert_eq!(updated.fields, replacement);
        assert!(updated.fields.current_medications.is_empty());
        assert!(updated.fields.doctor_notes.is_empty());
    }

    #[test]
    fn repeated_update_is_idempotent() {
        let conn = open_memory_database().unwrap();
        let north = seed_clinic(&conn, "north");
        let rec = insert_patient(&conn, &north, &fields("John", "Doe", (1975, 8, 30))).unwrap();

        let first = update_patient(&conn, &rec.id, &north, &full_fields()).unwrap();
        let second = update_patient(&conn, &rec.id, &north, &full_fields()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn unfiltered_search_orders_newest_first() {
        let conn = open_memory_database().unwrap();
        let north = seed_clinic(&conn, "north");
        let a = insert_patient(&conn, &north, &fields("A", "One", (1970, 1, 1))).unwrap();
        let b = insert_patient(&conn, &north, &fields("B", "Two", (1970, 1, 1))).unwrap();
        let c = insert_patient(&conn, &north, &fields("C", "Three", (1970, 1, 1))).unwrap();

        let ids: Vec<Uuid> = search_patients(&conn, &north, &PatientFilter::default())
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![c.id, b.id, a.id]);
    }

    #[test]
    fn name_filter_is_case_insensitive_substring_of_full_name() {
        let conn = open_memory_database().unwrap();
        let north = seed_clinic(&conn, "north");
        insert_patient(&conn, &north, &fields(" John ", "Doe", (1975, 8, 30))).unwrap();
        insert_patient(&conn, &north, &fields("Amy", "Smith", (1990, 1, 1))).unwrap();

        let names = |q: &str| -> Vec<String> {
            search_patients(&conn, &north, &PatientFilter::new(Some(q), None))
                .unwrap()
                .into_iter()
                .map(|r| r.fields.last_name)
                .collect()
        };

        assert_eq!(names("jo"), vec!["Doe"]);
        assert_eq!(names("HN D"), vec!["Doe"]);
        assert_eq!(names("th"), vec!["Smith"]);
        assert!(names("zz").is_empty());
        assert!(names("%").is_empty());
    }

    #[test]
    fn dob_filter_is_exact_and_combines_with_name() {
        let conn = open_memory_database().unwrap();
        let north = seed_clinic(&conn, "north");
        let john = insert_patient(&conn, &north, &fields("John", "Doe", (1975, 8, 30))).unwrap();
        insert_patient(&conn, &north, &fields("Joan", "Roe", (1980, 2, 2))).unwrap();

        let dob = NaiveDate::from_ymd_opt(1975, 8, 30);
        let only_dob = search_patients(&conn, &north, &PatientFilter::new(None, dob)).unwrap();
        assert_eq!(only_dob.len(), 1);
        assert_eq!(only_dob[0].id, john.id);

        let both = search_patients(&conn, &north, &PatientFilter::new(Some("jo"), dob)).unwrap();
        assert_eq!(both.len(), 1);

        let none = search_patients(
            &conn,
            &north,
            &PatientFilter::new(Some("amy"), dob),
        )
        .unwrap();
        assert!(none.is_empty());
    }
}
