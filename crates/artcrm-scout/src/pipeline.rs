//! Scout run orchestration.
//!
//! A run moves through searching (per category), enriching, resolving and
//! finalizing. Work is strictly sequential. A [`ShutdownSignal`] is checked
//! between categories and between candidates; once it is set no further
//! external calls are made and the partial result is finalized.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use artcrm_core::{AppConfig, Category, ContactStore, ModelBackend, StoreError};
use chrono::Utc;

use crate::artifact::write_artifact;
use crate::dedup::{resolve, DuplicatePolicy, Resolution};
use crate::enrichment::enrich;
use crate::error::ScoutError;
use crate::events::{NotificationBus, ScoutCompleted, ScoutEvent};
use crate::model::LanguageModel;
use crate::sources::{SourceAdapter, Throttle};
use crate::types::{LeadCandidate, ScoutRunResult, ScoutStats, SearchQuery};

pub const DEFAULT_RADIUS_KM: f64 = 10.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ScoutRequest {
    pub city: String,
    pub country: String,
    /// Empty means [`Category::defaults`].
    pub categories: Vec<Category>,
    pub radius_km: f64,
    pub model: ModelBackend,
    pub use_primary: bool,
    pub use_secondary: bool,
    pub skip_duplicates: bool,
}

impl ScoutRequest {
    /// A request with both sources on, default categories, and duplicates skipped.
    #[must_use]
    pub fn new(city: &str, country: &str) -> Self {
        Self {
            city: city.to_string(),
            country: country.to_string(),
            categories: Vec::new(),
            radius_km: DEFAULT_RADIUS_KM,
            model: ModelBackend::DeepseekChat,
            use_primary: true,
            use_secondary: true,
            skip_duplicates: true,
        }
    }

    /// Requested categories in order with repeats removed, or the defaults.
    fn effective_categories(&self) -> Vec<Category> {
        if self.categories.is_empty() {
            return Category::defaults();
        }
        let mut categories: Vec<Category> = Vec::with_capacity(self.categories.len());
        for category in &self.categories {
            if !categories.contains(category) {
                categories.push(category.clone());
            }
        }
        categories
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoutOptions {
    /// Pause between successive enrichment calls.
    pub inter_call_delay: Duration,
    /// The secondary source is consulted when the primary finds fewer.
    pub fallback_min_results: usize,
    pub results_dir: PathBuf,
    pub preferred_language: String,
}

impl ScoutOptions {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            inter_call_delay: Duration::from_millis(config.scout_rate_limit_ms),
            fallback_min_results: config.scout_fallback_min_results,
            results_dir: config.scout_results_dir.clone(),
            preferred_language: config.default_language.clone(),
        }
    }
}

/// Cooperative cancellation flag shared between the caller and a running scout.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal(Arc<AtomicBool>);

impl ShutdownSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Collaborators a scout run talks to.
pub struct ScoutDeps<'a, P, F, M, S> {
    pub primary: &'a P,
    pub secondary: &'a F,
    pub model: &'a M,
    pub store: &'a S,
    pub bus: &'a NotificationBus,
}

pub struct Scout<'a, P, F, M, S> {
    deps: ScoutDeps<'a, P, F, M, S>,
    options: ScoutOptions,
    shutdown: ShutdownSignal,
}

impl<'a, P, F, M, S> Scout<'a, P, F, M, S>
where
    P: SourceAdapter,
    F: SourceAdapter,
    M: LanguageModel,
    S: ContactStore,
{
    #[must_use]
    pub fn new(deps: ScoutDeps<'a, P, F, M, S>, options: ScoutOptions) -> Self {
        Self {
            deps,
            options,
            shutdown: ShutdownSignal::new(),
        }
    }

    #[must_use]
    pub fn with_shutdown(mut self, shutdown: ShutdownSignal) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Runs one discovery pass for `request`.
    ///
    /// The artifact is written and the completion event emitted even when
    /// the run is interrupted or the store fails part way.
    ///
    /// # Errors
    ///
    /// - [`ScoutError::NoSourcesEnabled`] or [`ScoutError::InvalidRequest`]
    ///   before any work starts.
    /// - [`ScoutError::Store`] if the contact store fails while resolving.
    /// - [`ScoutError::Artifact`] if the run artifact cannot be written.
    pub async fn run(&self, request: &ScoutRequest) -> Result<ScoutRunResult, ScoutError> {
        if !request.use_primary && !request.use_secondary {
            return Err(ScoutError::NoSourcesEnabled);
        }
        if request.city.trim().is_empty() {
            return Err(ScoutError::InvalidRequest("city must not be empty".to_string()));
        }

        let categories = request.effective_categories();
        let mut result = ScoutRunResult {
            stats: ScoutStats::new(&request.city, &request.country, Utc::now()),
            candidates: Vec::new(),
            inserted_ids: Vec::new(),
            merged_ids: Vec::new(),
            results_file: None,
        };
        result.stats.categories_searched.clone_from(&categories);

        tracing::info!(
            city = %request.city,
            country = %request.country,
            categories = ?categories.iter().map(Category::as_str).collect::<Vec<_>>(),
            model = %request.model,
            "starting scout run"
        );
        self.deps.bus.emit(&ScoutEvent::Started {
            city: request.city.clone(),
            country: request.country.clone(),
            categories: categories.clone(),
        });

        for category in &categories {
            if self.shutdown.is_triggered() {
                result.stats.interrupted = true;
                break;
            }
            let found = self.search_category(request, category, &mut result.stats).await;
            result
                .stats
                .counts_by_category
                .insert(category.to_string(), found.len());
            result.candidates.extend(found);
        }
        result.stats.total_found = result.candidates.len();

        self.enrich_all(request.model, &mut result).await;

        let store_failure = match self.resolve_all(request, &mut result).await {
            Ok(()) => None,
            Err(e) => {
                tracing::error!(
                    city = %request.city,
                    error = %e,
                    "contact store failed; stopping before remaining candidates"
                );
                Some(e)
            }
        };

        self.finalize(result, store_failure).await
    }

    async fn search_category(
        &self,
        request: &ScoutRequest,
        category: &Category,
        stats: &mut ScoutStats,
    ) -> Vec<LeadCandidate> {
        let query = SearchQuery {
            city: request.city.clone(),
            country: request.country.clone(),
            category: category.clone(),
            radius_km: request.radius_km,
        };

        let mut found = Vec::new();
        if request.use_primary {
            let primary = self.deps.primary.search(&query).await;
            if !primary.is_empty() {
                stats.sources_used.insert(self.deps.primary.kind());
            }
            found.extend(primary);
        }

        let needs_fallback = !request.use_primary || found.len() < self.options.fallback_min_results;
        if request.use_secondary && needs_fallback {
            if request.use_primary {
                tracing::info!(
                    category = %category,
                    found = found.len(),
                    min = self.options.fallback_min_results,
                    "primary source returned too few results; trying secondary"
                );
            }
            let secondary = self.deps.secondary.search(&query).await;
            if !secondary.is_empty() {
                stats.sources_used.insert(self.deps.secondary.kind());
            }
            found.extend(secondary);
        }

        tracing::info!(category = %category, count = found.len(), "category searched");
        found
    }

    async fn enrich_all(&self, backend: ModelBackend, result: &mut ScoutRunResult) {
        let discovered = std::mem::take(&mut result.candidates);
        let mut enriched = Vec::with_capacity(discovered.len());
        let mut throttle = Throttle::new(self.options.inter_call_delay);

        for candidate in discovered {
            if result.stats.interrupted || self.shutdown.is_triggered() {
                result.stats.interrupted = true;
                enriched.push(candidate);
                continue;
            }
            throttle.ready().await;
            enriched.push(enrich(candidate, self.deps.model, backend).await);
        }

        result.candidates = enriched;
    }

    async fn resolve_all(
        &self,
        request: &ScoutRequest,
        result: &mut ScoutRunResult,
    ) -> Result<(), StoreError> {
        let policy = DuplicatePolicy::from_skip_duplicates(request.skip_duplicates);

        for candidate in &result.candidates {
            if result.stats.interrupted || self.shutdown.is_triggered() {
                result.stats.interrupted = true;
                break;
            }

            let resolution = resolve(
                candidate,
                self.deps.store,
                policy,
                &self.options.preferred_language,
            )
            .await?;

            match resolution {
                Resolution::Created { id } => {
                    result.inserted_ids.push(id);
                    result.stats.total_inserted += 1;
                    self.deps.bus.emit(&ScoutEvent::ContactCreated {
                        contact_id: id,
                        name: candidate.name.clone(),
                        source: candidate.source,
                    });
                }
                Resolution::Merged {
                    existing_id,
                    fields,
                } if !fields.is_empty() => {
                    result.merged_ids.push(existing_id);
                    result.stats.total_merged += 1;
                }
                Resolution::Merged { .. } | Resolution::Skipped { .. } => {
                    result.stats.total_skipped += 1;
                }
            }
        }
        Ok(())
    }

    async fn finalize(
        &self,
        mut result: ScoutRunResult,
        store_failure: Option<StoreError>,
    ) -> Result<ScoutRunResult, ScoutError> {
        let artifact_failure = match write_artifact(&self.options.results_dir, &result).await {
            Ok(path) => {
                result.results_file = Some(path);
                None
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to write scout artifact");
                Some(e)
            }
        };

        let stats = &result.stats;
        self.deps.bus.emit(&ScoutEvent::Completed(ScoutCompleted {
            city: stats.city.clone(),
            country: stats.country.clone(),
            total_found: stats.total_found,
            total_inserted: stats.total_inserted,
            results_file: result.results_file.clone(),
        }));

        tracing::info!(
            city = %stats.city,
            found = stats.total_found,
            inserted = stats.total_inserted,
            merged = stats.total_merged,
            skipped = stats.total_skipped,
            interrupted = stats.interrupted,
            "scout run finished"
        );

        if let Some(e) = store_failure {
            return Err(ScoutError::Store(e));
        }
        if let Some(e) = artifact_failure {
            return Err(e.into());
        }
        Ok(result)
    }
}
