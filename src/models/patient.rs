use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{BloodGroup, Gender};

/// One visit's note from the treating doctor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DoctorNote {
    pub visit_date: String,
    pub doctor_name: String,
    pub diagnosis: String,
    pub treatment_plan: String,
}

impl DoctorNote {
    pub fn is_blank(&self) -> bool {
        self.visit_date.trim().is_empty()
            && self.doctor_name.trim().is_empty()
            && self.diagnosis.trim().is_empty()
            && self.treatment_plan.trim().is_empty()
    }

    pub fn trimmed(self) -> Self {
        Self {
            visit_date: self.visit_date.trim().to_string(),
            doctor_name: self.doctor_name.trim().to_string(),
            diagnosis: self.diagnosis.trim().to_string(),
            treatment_plan: self.treatment_plan.trim().to_string(),
        }
    }
}

/// Doctor notes as they arrive from clients or legacy rows: either the older
/// single "latest note" object or a list with one note per visit.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum DoctorNotesInput {
    List(Vec<DoctorNote>),
    Single(DoctorNote),
}

impl DoctorNotesInput {
    /// Canonical list form. Blank notes (every field empty) are dropped, so
    /// the empty note object an unfilled form sends becomes an empty list.
    pub fn into_notes(self) -> Vec<DoctorNote> {
        let notes = match self {
            DoctorNotesInput::List(notes) => notes,
            DoctorNotesInput::Single(note) => vec![note],
        };
        notes
            .into_iter()
            .filter(|n| !n.is_blank())
            .map(DoctorNote::trimmed)
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LabTest {
    pub name: String,
    pub result: String,
    pub date: String,
}

/// Every mutable field of a patient record, already validated and
/// normalized. Create stores these; update replaces all of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientFields {
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    pub dob: NaiveDate,
    pub contact_number: String,
    pub email: Option<String>,
    pub address: String,
    pub blood_group: Option<BloodGroup>,
    pub current_medications: Vec<String>,
    pub allergies: Vec<String>,
    pub past_surgeries: Vec<String>,
    pub chronic_diseases: Vec<String>,
    pub doctor_notes: Vec<DoctorNote>,
    pub lab_tests: Vec<LabTest>,
}

impl PatientFields {
    /// `first last`, each part trimmed. This is the string name search
    /// matches against.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
    }
}

/// A stored patient record owned by exactly one clinic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientRecord {
    pub id: Uuid,
    pub clinic_id: Uuid,
    #[serde(flatten)]
    pub fields: PatientFields,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(diagnosis: &str) -> DoctorNote {
        DoctorNote {
            visit_date: "2025-03-01".into(),
            doctor_name: "Dr. Osei".into(),
            diagnosis: diagnosis.into(),
            treatment_plan: "Rest".into(),
        }
    }

    #[test]
    fn single_note_normalizes_to_list_of_one() {
        let input: DoctorNotesInput = serde_json::from_str(
            r#"{"visitDate":"2025-03-01","doctorName":"Dr. Osei","diagnosis":"Flu","treatmentPlan":"Rest"}"#,
        )
        .unwrap();
        assert_eq!(input.into_notes(), vec![note("Flu")]);
    }

    #[test]
    fn note_list_keeps_order() {
        let input: DoctorNotesInput = serde_json::from_value(serde_json::json!([
            {"visitDate":"2025-03-01","doctorName":"Dr. Osei","diagnosis":"Flu","treatmentPlan":"Rest"},
            {"visitDate":"2025-03-01","doctorName":"Dr. Osei","diagnosis":"Cold","treatmentPlan":"Rest"}
        ]))
        .unwrap();
        assert_eq!(input.into_notes(), vec![note("Flu"), note("Cold")]);
    }

    #[test]
    fn blank_single_note_becomes_empty_list() {
        let input: DoctorNotesInput = serde_json::from_str(
            r#"{"visitDate":"","doctorName":"","diagnosis":"  ","treatmentPlan":""}"#,
        )
        .unwrap();
        assert!(input.into_notes().is_empty());
    }

    #[test]
    fn partial_note_fills_missing_fields_with_empty() {
        let input: DoctorNotesInput = serde_json::from_str(r#"{"diagnosis":" Asthma "}"#).unwrap();
        let notes = input.into_notes();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].diagnosis, "Asthma");
        assert_eq!(notes[0].doctor_name, "");
    }

    #[test]
    fn full_name_trims_parts() {
        let fields = PatientFields {
            first_name: " John ".into(),
            last_name: "Doe  ".into(),
            gender: Gender::Male,
            dob: NaiveDate::from_ymd_opt(1980, 5, 17).unwrap(),
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
        };
        assert_eq!(fields.full_name(), "John Doe");
    }

    #[test]
    fn record_serializes_camel_case_with_native_collections() {
        let record = PatientRecord {
            id: Uuid::nil(),
            clinic_id: Uuid::nil(),
            fields: PatientFields {
                first_name: "Amy".into(),
                last_name: "Smith".into(),
                gender: Gender::Female,
                dob: NaiveDate::from_ymd_opt(1990, 1, 2).unwrap(),
                contact_number: "555-0101".into(),
                email: Some("amy@example.org".into()),
                address: "2 Side St".into(),
                blood_group: Some(BloodGroup::BPositive),
                current_medications: vec!["Metformin".into()],
                allergies: vec![],
                past_surgeries: vec![],
                chronic_diseases: vec![],
                doctor_notes: vec![note("Flu")],
                lab_tests: vec![],
            },
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["firstName"], "Amy");
        assert_eq!(json["dob"], "1990-01-02");
        assert_eq!(json["bloodGroup"], "B+");
        assert_eq!(json["currentMedications"][0], "Metformin");
        assert!(json["allergies"].as_array().unwrap().is_empty());
        assert_eq!(json["doctorNotes"][0]["doctorName"], "Dr. Osei");
        assert!(json.get("createdAt").is_some());
        assert!(json.get("clinicId").is_some());
    }
}
