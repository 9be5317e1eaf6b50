//! Contact records exchanged between the scout pipeline and the contact store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status given to every contact the scout creates. Marks a record that has
/// not been vetted by a person yet.
pub const LEAD_UNVERIFIED_STATUS: &str = "lead_unverified";

/// A contact as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: i64,
    pub name: String,
    pub category: Option<String>,
    pub subtype: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub address: Option<String>,
    pub website: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub preferred_language: String,
    pub status: String,
    pub fit_score: Option<i32>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for a contact that does not exist yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewContact {
    pub name: String,
    pub category: Option<String>,
    pub subtype: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub address: Option<String>,
    pub website: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub preferred_language: String,
    pub status: String,
    pub fit_score: Option<i32>,
    pub notes: Option<String>,
}

/// A partial update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactPatch {
    pub website: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl ContactPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.website.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.address.is_none()
    }

    /// Names of the fields this patch sets, in column order.
    #[must_use]
    pub fn field_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.website.is_some() {
            names.push("website");
        }
        if self.email.is_some() {
            names.push("email");
        }
        if self.phone.is_some() {
            names.push("phone");
        }
        if self.address.is_some() {
            names.push("address");
        }
        names
    }
}

/// Filters for [`ContactStore::search_contacts`](crate::ContactStore::search_contacts).
///
/// `name` and `city` are substring, case-insensitive filters. Rows whose
/// trimmed, case-folded name and city equal the filters sort first. Callers
/// that need exact matches re-check the returned rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactQuery {
    pub name: Option<String>,
    pub city: Option<String>,
    pub limit: i64,
}

/// Result of a create attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created(i64),
    /// A live contact with the same normalized name and city already exists.
    Conflict,
}
