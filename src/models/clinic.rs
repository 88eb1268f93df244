use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A clinic login. The hash never leaves the server.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicAccount {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub clinic_name: String,
    pub created_at: DateTime<Utc>,
}

/// The authenticated caller, decoded from a session token. Every record
/// operation takes one of these to scope its reads and writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicIdentity {
    pub clinic_id: Uuid,
    pub clinic_name: String,
}

impl From<&ClinicAccount> for ClinicIdentity {
    fn from(account: &ClinicAccount) -> Self {
        Self {
            clinic_id: account.id,
            clinic_name: account.clinic_name.clone(),
        }
    }
}
