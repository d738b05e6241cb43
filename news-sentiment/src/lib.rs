pub mod types;
pub mod config;
pub mod db;
pub mod schema;
pub mod fetcher;
pub mod store;
pub mod sentiment;
pub mod pipeline;
pub mod scheduler;

pub use types::*;
pub use config::{DatabaseConfig, PipelineConfig, ProviderConfig};
pub use db::Database;
pub use fetcher::{Fetcher, NewsProvider, NytTopStories};
pub use sentiment::{PolarityModel, VaderModel};
pub use pipeline::Pipeline;
pub use scheduler::Scheduler;
