pub mod config;
pub mod error;
pub mod flatten;
pub mod paths;
pub mod pubmed;
pub mod cache;
pub mod export;
pub mod server;

pub use config::Config;
pub use error::{KgflatError, Result};
pub use flatten::{flatten, FlattenMetadata, FlattenOutput, FlattenedRow};
pub use paths::{analyze_paths, PathAnalysis};
