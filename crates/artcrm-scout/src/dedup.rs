//! Deduplication of candidates against the contact store.
//!
//! A candidate duplicates a live contact when the trimmed, case-folded names
//! are equal and, if both sides have a city, the cities are equal too.

use artcrm_core::{
    Contact, ContactPatch, ContactQuery, ContactStore, CreateOutcome, NewContact, StoreError,
    LEAD_UNVERIFIED_STATUS,
};
use chrono::{NaiveDate, Utc};

use crate::types::LeadCandidate;

/// Rows fetched per duplicate lookup before exact matching.
const DUPLICATE_SEARCH_LIMIT: i64 = 5;

/// Contacts are created with a fit score only above this confidence.
const FIT_SCORE_THRESHOLD: u8 = 50;

/// What to do when a candidate matches an existing contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Leave the existing contact untouched.
    Skip,
    /// Fill the existing contact's empty contact fields from the candidate.
    Merge,
}

impl DuplicatePolicy {
    #[must_use]
    pub fn from_skip_duplicates(skip_duplicates: bool) -> Self {
        if skip_duplicates {
            Self::Skip
        } else {
            Self::Merge
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Created { id: i64 },
    /// The duplicate was left as is. `existing_id` is `None` only when an
    /// insert conflicted but the conflicting row could not be found again.
    Skipped { existing_id: Option<i64> },
    /// The duplicate received the listed fields. Empty when it had nothing to fill.
    Merged {
        existing_id: i64,
        fields: Vec<&'static str>,
    },
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

fn is_same_venue(contact: &Contact, candidate: &LeadCandidate) -> bool {
    if normalize(&contact.name) != normalize(&candidate.name) {
        return false;
    }
    match (contact.city.as_deref(), candidate.city.as_deref()) {
        (Some(existing), Some(incoming)) => normalize(existing) == normalize(incoming),
        _ => true,
    }
}

/// Looks up a live contact matching `candidate`.
///
/// # Errors
///
/// Propagates [`StoreError`] from the search.
pub async fn find_duplicate<S: ContactStore>(
    store: &S,
    candidate: &LeadCandidate,
) -> Result<Option<Contact>, StoreError> {
    let query = ContactQuery {
        name: Some(candidate.name.trim().to_string()),
        city: candidate.city.as_deref().map(str::trim).map(str::to_string),
        limit: DUPLICATE_SEARCH_LIMIT,
    };
    let matches = store.search_contacts(&query).await?;
    Ok(matches
        .into_iter()
        .find(|contact| is_same_venue(contact, candidate)))
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

fn fill(existing: Option<&str>, incoming: Option<&String>) -> Option<String> {
    if is_blank(existing) {
        incoming.filter(|v| !v.trim().is_empty()).cloned()
    } else {
        None
    }
}

/// Fields of `candidate` that would fill empty fields on `existing`.
/// Non-empty fields on the contact are never overwritten.
#[must_use]
pub fn merge_patch(existing: &Contact, candidate: &LeadCandidate) -> ContactPatch {
    ContactPatch {
        website: fill(existing.website.as_deref(), candidate.website.as_ref()),
        email: fill(existing.email.as_deref(), candidate.email.as_ref()),
        phone: fill(existing.phone.as_deref(), candidate.phone.as_ref()),
        address: fill(existing.address.as_deref(), candidate.address.as_ref()),
    }
}

/// The contact to create for a candidate with no duplicate.
#[must_use]
pub fn new_contact(
    candidate: &LeadCandidate,
    preferred_language: &str,
    discovered_on: NaiveDate,
) -> NewContact {
    let confidence = candidate.confidence_score.get();
    NewContact {
        name: candidate.name.clone(),
        category: Some(candidate.category.to_string()),
        subtype: candidate.subtype.clone(),
        city: candidate.city.clone(),
        country: candidate.country.clone(),
        address: candidate.address.clone(),
        website: candidate.website.clone(),
        email: candidate.email.clone(),
        phone: candidate.phone.clone(),
        preferred_language: preferred_language.to_string(),
        status: LEAD_UNVERIFIED_STATUS.to_string(),
        fit_score: (confidence > FIT_SCORE_THRESHOLD).then_some(i32::from(confidence)),
        notes: Some(format!(
            "Auto-discovered via {} on {}",
            candidate.source,
            discovered_on.format("%Y-%m-%d")
        )),
    }
}

async fn apply_policy<S: ContactStore>(
    store: &S,
    existing: &Contact,
    candidate: &LeadCandidate,
    policy: DuplicatePolicy,
) -> Result<Resolution, StoreError> {
    match policy {
        DuplicatePolicy::Skip => {
            tracing::debug!(name = %candidate.name, existing_id = existing.id, "duplicate skipped");
            Ok(Resolution::Skipped {
                existing_id: Some(existing.id),
            })
        }
        DuplicatePolicy::Merge => {
            let patch = merge_patch(existing, candidate);
            let fields = patch.field_names();
            if !patch.is_empty() {
                store.update_contact(existing.id, &patch).await?;
                tracing::info!(
                    name = %candidate.name,
                    existing_id = existing.id,
                    fields = ?fields,
                    "merged candidate into existing contact"
                );
            }
            Ok(Resolution::Merged {
                existing_id: existing.id,
                fields,
            })
        }
    }
}

/// Skips, merges, or creates a contact for `candidate`.
///
/// An insert that loses a race with a concurrent writer is resolved by
/// looking the duplicate up again and applying `policy` to it.
///
/// # Errors
///
/// Propagates [`StoreError`] from any store call.
pub async fn resolve<S: ContactStore>(
    candidate: &LeadCandidate,
    store: &S,
    policy: DuplicatePolicy,
    preferred_language: &str,
) -> Result<Resolution, StoreError> {
    if let Some(existing) = find_duplicate(store, candidate).await? {
        return apply_policy(store, &existing, candidate, policy).await;
    }

    let contact = new_contact(candidate, preferred_language, Utc::now().date_naive());
    match store.create_contact(&contact).await? {
        CreateOutcome::Created(id) => Ok(Resolution::Created { id }),
        CreateOutcome::Conflict => match find_duplicate(store, candidate).await? {
            Some(existing) => apply_policy(store, &existing, candidate, policy).await,
            None => {
                tracing::warn!(
                    name = %candidate.name,
                    city = ?candidate.city,
                    "insert conflicted but no matching contact was found; skipping"
                );
                Ok(Resolution::Skipped { existing_id: None })
            }
        },
    }
}
