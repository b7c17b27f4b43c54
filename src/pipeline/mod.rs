pub mod detail;
pub mod fields;
pub mod grid;
pub mod location;
pub mod normalize;
pub mod orchestrator;
pub mod sink;

pub use detail::{DetailEnricher, EnrichReport};
pub use grid::GridCrawler;
pub use location::{LocationService, OllamaLocationService};
pub use normalize::{normalize_all, normalize_listing, ToNumeric};
pub use orchestrator::{Pipeline, PipelineOutcome};
pub use sink::{read_records, write_records, CsvSink};
