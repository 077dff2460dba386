//! OpenSearch implementation of the bulk index provider.

mod client;
mod index_config;

pub use client::OpenSearchClient;
pub use index_config::get_index_settings;
