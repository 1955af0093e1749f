//! Caching layer: LRU cache for fetched PubMed abstracts.

mod abstract_cache;

pub use abstract_cache::AbstractCache;
