// Price analytics engine: registry, aggregate cache, rankings
pub mod analytics;

// Price file ingestion
pub mod ingestion;

// Startup wiring
pub mod bootstrap;
