// Price records and the line parser
pub mod price;

// Normalized range calculation
pub mod normalized;

// Repository traits
pub mod repositories;

// Domain-specific error types
pub mod errors;
