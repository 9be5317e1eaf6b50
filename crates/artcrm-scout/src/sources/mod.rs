//! Lead source adapters.
//!
//! Each adapter turns one [`SearchQuery`] into normalized [`LeadCandidate`]s.
//! Adapters never fail outward: transport, quota, and parse problems are
//! logged and yield an empty list, so one broken directory cannot abort a run.

mod google_places;
mod overpass;
mod throttle;

pub use google_places::GooglePlacesClient;
pub use overpass::{build_overpass_query, OverpassClient};
pub use throttle::Throttle;

use std::future::Future;

use crate::types::{LeadCandidate, SearchQuery, SourceKind};

pub trait SourceAdapter {
    fn kind(&self) -> SourceKind;

    fn search(&self, query: &SearchQuery) -> impl Future<Output = Vec<LeadCandidate>> + Send;
}
