//! The contact store capability consumed by the scout pipeline.

use std::future::Future;

use thiserror::Error;

use crate::contacts::{Contact, ContactPatch, ContactQuery, CreateOutcome, NewContact};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("contact store backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Read/write access to the contact store.
///
/// Implemented by the Postgres store in `artcrm-db` and by in-memory fakes
/// in tests.
pub trait ContactStore {
    /// Returns live contacts matching the query, exact matches first, then
    /// by name.
    fn search_contacts(
        &self,
        query: &ContactQuery,
    ) -> impl Future<Output = Result<Vec<Contact>, StoreError>> + Send;

    /// Inserts a contact unless a live contact with the same normalized
    /// name and city already exists.
    fn create_contact(
        &self,
        contact: &NewContact,
    ) -> impl Future<Output = Result<CreateOutcome, StoreError>> + Send;

    /// Fills blank fields of a live contact from the non-`None` fields of
    /// `patch`; populated fields are kept. Returns `false` when no live
    /// contact has `id` or the patch is empty.
    fn update_contact(
        &self,
        id: i64,
        patch: &ContactPatch,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;
}
