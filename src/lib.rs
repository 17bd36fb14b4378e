pub mod config;
pub mod timerange;
pub mod query;
pub mod store;
pub mod patterns;
pub mod anomaly;
pub mod sources;
pub mod solution;
pub mod knowledge;
pub mod report;
pub mod pipeline;
pub mod router;
