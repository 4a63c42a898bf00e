// Library for tests to access modules

pub mod aggregator;
pub mod config;
pub mod gaps;
pub mod merger;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod store;
pub mod synthesizer;
pub mod version;
