//! Project data sources: generated snapshots and the fixed sample records.

mod mock;
mod sample;

pub use mock::{MarketSnapshot, ProjectDataService, ProjectSnapshot, mitigation_rate, slugify};
pub use sample::{SampleDataset, sample_dataset};
