//! In-memory collaborators for scout integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use artcrm_core::{
    Category, Contact, ContactPatch, ContactQuery, ContactStore, CreateOutcome, ModelBackend,
    NewContact, StoreError,
};
use artcrm_scout::{
    LanguageModel, LeadCandidate, ModelError, SearchQuery, SourceAdapter, SourceKind,
};
use chrono::Utc;

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Contact store backed by a vector. Mirrors the Postgres store's
/// substring search with exact matches ranked first, its unique
/// (name, city) guard, and its fill-blank-only updates.
#[derive(Default)]
pub struct MemoryStore {
    contacts: Mutex<Vec<Contact>>,
    pub searches: AtomicUsize,
    pub creates: AtomicUsize,
    pub updates: AtomicUsize,
    /// Inserted by a "concurrent writer" right before the next create.
    racing_insert: Mutex<Option<NewContact>>,
    /// Creates fail once this many have succeeded.
    fail_after_creates: Mutex<Option<usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, contact: NewContact) -> i64 {
        let mut contacts = self.contacts.lock().unwrap();
        let id = i64::try_from(contacts.len()).unwrap() + 1;
        let now = Utc::now();
        contacts.push(Contact {
            id,
            name: contact.name,
            category: contact.category,
            subtype: contact.subtype,
            city: contact.city,
            country: contact.country,
            address: contact.address,
            website: contact.website,
            email: contact.email,
            phone: contact.phone,
            preferred_language: contact.preferred_language,
            status: contact.status,
            fit_score: contact.fit_score,
            notes: contact.notes,
            created_at: now,
            updated_at: now,
        });
        id
    }

    pub fn race_next_create_with(&self, contact: NewContact) {
        *self.racing_insert.lock().unwrap() = Some(contact);
    }

    pub fn fail_after_creates(&self, successful: usize) {
        *self.fail_after_creates.lock().unwrap() = Some(successful);
    }

    pub fn contacts(&self) -> Vec<Contact> {
        self.contacts.lock().unwrap().clone()
    }

    pub fn get(&self, id: i64) -> Option<Contact> {
        self.contacts().into_iter().find(|c| c.id == id)
    }

    pub fn mutations(&self) -> usize {
        self.creates.load(Ordering::SeqCst) + self.updates.load(Ordering::SeqCst)
    }

    fn conflicts(&self, contact: &NewContact) -> bool {
        let city = normalize(contact.city.as_deref().unwrap_or(""));
        self.contacts.lock().unwrap().iter().any(|c| {
            normalize(&c.name) == normalize(&contact.name)
                && normalize(c.city.as_deref().unwrap_or("")) == city
        })
    }
}

fn fill_blank(field: &mut Option<String>, incoming: Option<&String>) {
    if field.as_deref().is_none_or(|v| v.trim().is_empty()) {
        if let Some(value) = incoming {
            *field = Some(value.clone());
        }
    }
}

pub fn new_contact(name: &str, city: &str) -> NewContact {
    NewContact {
        name: name.to_string(),
        category: Some("gallery".to_string()),
        subtype: None,
        city: Some(city.to_string()),
        country: Some("DE".to_string()),
        address: None,
        website: None,
        email: None,
        phone: None,
        preferred_language: "de".to_string(),
        status: "cold".to_string(),
        fit_score: None,
        notes: None,
    }
}

impl ContactStore for MemoryStore {
    async fn search_contacts(&self, query: &ContactQuery) -> Result<Vec<Contact>, StoreError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        let name = query.name.as_deref().map(normalize);
        let city = query.city.as_deref().map(normalize);
        let mut found: Vec<Contact> = self
            .contacts
            .lock()
            .unwrap()
            .iter()
            .filter(|c| name.as_ref().is_none_or(|n| normalize(&c.name).contains(n.as_str())))
            .filter(|c| {
                city.as_ref().is_none_or(|wanted| {
                    c.city
                        .as_deref()
                        .is_some_and(|have| normalize(have).contains(wanted.as_str()))
                })
            })
            .cloned()
            .collect();
        let exact_city = normalize(query.city.as_deref().unwrap_or(""));
        found.sort_by_key(|c| {
            (
                name.as_ref() != Some(&normalize(&c.name)),
                normalize(c.city.as_deref().unwrap_or("")) != exact_city,
                c.name.clone(),
                c.id,
            )
        });
        found.truncate(usize::try_from(query.limit).unwrap_or(0));
        Ok(found)
    }

    async fn create_contact(&self, contact: &NewContact) -> Result<CreateOutcome, StoreError> {
        if let Some(limit) = *self.fail_after_creates.lock().unwrap() {
            if self.creates.load(Ordering::SeqCst) >= limit {
                return Err(StoreError::Backend("connection reset".into()));
            }
        }
        if let Some(racer) = self.racing_insert.lock().unwrap().take() {
            self.seed(racer);
        }
        if self.conflicts(contact) {
            return Ok(CreateOutcome::Conflict);
        }
        self.creates.fetch_add(1, Ordering::SeqCst);
        Ok(CreateOutcome::Created(self.seed(contact.clone())))
    }

    async fn update_contact(&self, id: i64, patch: &ContactPatch) -> Result<bool, StoreError> {
        if patch.is_empty() {
            return Ok(false);
        }
        self.updates.fetch_add(1, Ordering::SeqCst);
        let mut contacts = self.contacts.lock().unwrap();
        let Some(contact) = contacts.iter_mut().find(|c| c.id == id) else {
            return Ok(false);
        };
        fill_blank(&mut contact.website, patch.website.as_ref());
        fill_blank(&mut contact.email, patch.email.as_ref());
        fill_blank(&mut contact.phone, patch.phone.as_ref());
        fill_blank(&mut contact.address, patch.address.as_ref());
        Ok(true)
    }
}

/// Source returning a fixed number of candidates per call.
pub struct FakeSource {
    kind: SourceKind,
    per_category: usize,
    pub calls: AtomicUsize,
}

impl FakeSource {
    pub fn new(kind: SourceKind, per_category: usize) -> Self {
        Self {
            kind,
            per_category,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SourceAdapter for FakeSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn search(&self, query: &SearchQuery) -> Vec<LeadCandidate> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (0..self.per_category)
            .map(|i| {
                let name = format!("{} {} {}", self.kind, query.category, i + 1);
                let mut candidate = LeadCandidate::new(Some(&name), query, self.kind);
                candidate.website = Some(format!("https://venue-{i}.example"));
                candidate
            })
            .collect()
    }
}

/// Model that always gives the same reply, or always fails.
pub struct FakeModel {
    reply: Option<String>,
    pub calls: AtomicUsize,
}

impl FakeModel {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl LanguageModel for FakeModel {
    async fn generate(
        &self,
        _backend: ModelBackend,
        _prompt: &str,
        _system: Option<&str>,
        _max_tokens: u32,
    ) -> Result<String, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.clone().ok_or(ModelError::MissingApiKey("DEEPSEEK_API_KEY"))
    }
}

pub fn query(category: Category) -> SearchQuery {
    SearchQuery {
        city: "Leipzig".to_string(),
        country: "DE".to_string(),
        category,
        radius_km: 10.0,
    }
}
