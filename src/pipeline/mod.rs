// Line item pipeline: extraction, processing, and aggregation

pub mod processing;

// Re-export key types and functions from each stage
pub use processing::batch;
pub use processing::router;
