///! Satellite tracking module
///!
///! Element sets are fetched once from two upstream sources, merged into a
///! static catalog and re-propagated on a fixed interval.
///!
///! ## Main Components
///! - `TrackingManager`: owns the state, runs ingestion and the scheduler
///! - `SnapshotStore`: latest positions, swapped atomically per tick
///! - `QueryResolver`: search and marker selection

pub mod types;
pub mod error;
pub mod parser;
pub mod enrichment;

// ============ Element Set Sources ============
pub mod source;
pub mod featured;
pub mod bulk;

pub mod catalog;
pub mod propagation;
pub mod store;
pub mod resolver;
pub mod manager;

pub use types::{Catalog, ElementLines, ElementSetRecord, PositionEntry, Snapshot, TickReport};
pub use error::{ElementLinesError, FetchError, PropagationError, QueryError, StoreError};
pub use enrichment::{EnrichmentEntry, EnrichmentTable};
pub use source::ElementSetSource;
pub use featured::FeaturedSource;
pub use bulk::BulkSource;
pub use catalog::build_catalog;
pub use propagation::{Propagator, Sgp4Propagator, compute_snapshot};
pub use store::SnapshotStore;
pub use resolver::{QueryResolver, Selection};
pub use manager::TrackingManager;
