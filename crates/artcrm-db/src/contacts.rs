//! Database operations for the `contacts` table.

use artcrm_core::{
    Contact, ContactPatch, ContactQuery, ContactStore, CreateOutcome, NewContact, StoreError,
};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `contacts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ContactRow {
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
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<ContactRow> for Contact {
    fn from(row: ContactRow) -> Self {
        Contact {
            id: row.id,
            name: row.name,
            category: row.category,
            subtype: row.subtype,
            city: row.city,
            country: row.country,
            address: row.address,
            website: row.website,
            email: row.email,
            phone: row.phone,
            preferred_language: row.preferred_language,
            status: row.status,
            fit_score: row.fit_score,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const CONTACT_COLUMNS: &str = "id, name, category, subtype, city, country, address, website, \
     email, phone, preferred_language, status, fit_score, notes, created_at, updated_at, deleted_at";

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Returns live contacts whose name and city contain the given filters
/// (case-insensitive).
///
/// Rows whose trimmed, case-folded name and city equal the filters come
/// first, so a `limit` never hides the exact match behind its substring
/// neighbours. The rest are ordered by name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn search_contacts(
    pool: &PgPool,
    query: &ContactQuery,
) -> Result<Vec<ContactRow>, DbError> {
    let name_pattern = query.name.as_deref().map(like_pattern);
    let city_pattern = query.city.as_deref().map(like_pattern);

    let rows = sqlx::query_as::<_, ContactRow>(&format!(
        "SELECT {CONTACT_COLUMNS} \
         FROM contacts \
         WHERE deleted_at IS NULL \
           AND ($1::text IS NULL OR name ILIKE $1 ESCAPE '\\') \
           AND ($2::text IS NULL OR city ILIKE $2 ESCAPE '\\') \
         ORDER BY (lower(btrim(name)) = lower(btrim($4::text))) DESC NULLS LAST, \
                  (lower(btrim(coalesce(city, ''))) = lower(btrim(coalesce($5::text, '')))) DESC, \
                  name, id \
         LIMIT $3"
    ))
    .bind(name_pattern)
    .bind(city_pattern)
    .bind(query.limit.max(0))
    .bind(query.name.as_deref())
    .bind(query.city.as_deref())
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns a single live contact by id, or `None`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_contact(pool: &PgPool, id: i64) -> Result<Option<ContactRow>, DbError> {
    let row = sqlx::query_as::<_, ContactRow>(&format!(
        "SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = $1 AND deleted_at IS NULL"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Inserts a contact, relying on the `contacts_live_name_city_key` unique
/// index to reject a second live row with the same normalized name and city.
///
/// Returns [`CreateOutcome::Conflict`] instead of an error when the index
/// rejects the row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails for any other reason.
pub async fn create_contact(pool: &PgPool, contact: &NewContact) -> Result<CreateOutcome, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO contacts \
             (name, category, subtype, city, country, address, website, email, phone, \
              preferred_language, status, fit_score, notes) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
         ON CONFLICT DO NOTHING \
         RETURNING id",
    )
    .bind(&contact.name)
    .bind(&contact.category)
    .bind(&contact.subtype)
    .bind(&contact.city)
    .bind(&contact.country)
    .bind(&contact.address)
    .bind(&contact.website)
    .bind(&contact.email)
    .bind(&contact.phone)
    .bind(&contact.preferred_language)
    .bind(&contact.status)
    .bind(contact.fit_score)
    .bind(&contact.notes)
    .fetch_optional(pool)
    .await?;

    Ok(match id {
        Some(id) => {
            tracing::info!(contact_id = id, name = %contact.name, "created contact");
            CreateOutcome::Created(id)
        }
        None => CreateOutcome::Conflict,
    })
}

/// Fills empty columns of a live contact from the non-`None` fields of
/// `patch`. A column that already holds a non-blank value keeps it, even if
/// another writer filled it after the caller read the row.
///
/// Returns `false` when the patch is empty or no live contact has `id`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn update_contact(pool: &PgPool, id: i64, patch: &ContactPatch) -> Result<bool, DbError> {
    if patch.is_empty() {
        return Ok(false);
    }

    let result = sqlx::query(
        "UPDATE contacts \
         SET website    = CASE WHEN btrim(coalesce(website, '')) = '' THEN COALESCE($2, website) ELSE website END, \
             email      = CASE WHEN btrim(coalesce(email, '')) = '' THEN COALESCE($3, email) ELSE email END, \
             phone      = CASE WHEN btrim(coalesce(phone, '')) = '' THEN COALESCE($4, phone) ELSE phone END, \
             address    = CASE WHEN btrim(coalesce(address, '')) = '' THEN COALESCE($5, address) ELSE address END, \
             updated_at = NOW() \
         WHERE id = $1 AND deleted_at IS NULL",
    )
    .bind(id)
    .bind(&patch.website)
    .bind(&patch.email)
    .bind(&patch.phone)
    .bind(&patch.address)
    .execute(pool)
    .await?;

    let updated = result.rows_affected() > 0;
    if updated {
        tracing::info!(contact_id = id, fields = ?patch.field_names(), "updated contact");
    }
    Ok(updated)
}

/// Escape `%`, `_` and `\` so user text is matched literally inside an
/// `ILIKE '%…%'` pattern.
fn like_pattern(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len() + 2);
    escaped.push('%');
    for c in raw.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

// ---------------------------------------------------------------------------
// ContactStore adapter
// ---------------------------------------------------------------------------

/// [`ContactStore`] backed by a Postgres pool.
#[derive(Debug, Clone)]
pub struct PgContactStore {
    pool: PgPool,
}

impl PgContactStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl ContactStore for PgContactStore {
    async fn search_contacts(&self, query: &ContactQuery) -> Result<Vec<Contact>, StoreError> {
        let rows = search_contacts(&self.pool, query).await?;
        Ok(rows.into_iter().map(Contact::from).collect())
    }

    async fn create_contact(&self, contact: &NewContact) -> Result<CreateOutcome, StoreError> {
        Ok(create_contact(&self.pool, contact).await?)
    }

    async fn update_contact(&self, id: i64, patch: &ContactPatch) -> Result<bool, StoreError> {
        Ok(update_contact(&self.pool, id, patch).await?)
    }
}
