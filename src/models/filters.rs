use chrono::NaiveDate;

/// Optional search criteria for patient lookup. The clinic scope is not part
/// of the filter: it is a required argument of every search.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PatientFilter {
    pub name: Option<String>,
    pub dob: Option<NaiveDate>,
}

impl PatientFilter {
    /// Build a filter, treating blank name input as no name filter.
    pub fn new(name: Option<&str>, dob: Option<NaiveDate>) -> Self {
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);
        Self { name, dob }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.dob.is_none()
    }

    pub fn is_complete(&self) -> bool {
        self.name.is_some() && self.dob.is_some()
    }
}
