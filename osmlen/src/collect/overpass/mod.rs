//! Overpass API: infrastructure filters, query text and the HTTP transport.

pub mod filters;
pub mod overpass_collect;
pub mod query;

pub use filters::{InfrastructureFilter, INFRASTRUCTURE_FILTERS};
#[cfg(feature = "reqwest")]
pub use overpass_collect::OverpassCollect;
pub use overpass_collect::{Attempt, RetryPolicy};
pub use query::{build_query, parse_lengths};
