//! Lead discovery pipeline for the art CRM.
//!
//! Queries geo-business directories (Google Places, OpenStreetMap Overpass)
//! for venues in a city, enriches each candidate through a language model,
//! deduplicates against the contact store, and records every run as a JSON
//! artifact.

pub mod artifact;
pub mod dedup;
pub mod enrichment;
pub mod error;
pub mod events;
mod http;
pub mod model;
pub mod pipeline;
pub mod sources;
pub mod types;

pub use dedup::{resolve, DuplicatePolicy, Resolution};
pub use enrichment::enrich;
pub use error::{ArtifactError, ModelError, ScoutError, SourceError};
pub use events::{NotificationBus, ScoutCompleted, ScoutEvent};
pub use model::{AnthropicClient, DeepseekClient, LanguageModel, ModelRouter};
pub use pipeline::{Scout, ScoutDeps, ScoutOptions, ScoutRequest, ShutdownSignal};
pub use sources::{GooglePlacesClient, OverpassClient, SourceAdapter};
pub use types::{ConfidenceScore, LeadCandidate, ScoutRunResult, ScoutStats, SearchQuery, SourceKind};
