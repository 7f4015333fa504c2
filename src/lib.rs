pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod observability;
pub mod pipeline;
pub mod profile;

// Domain data shapes shared across layers
pub mod domain;
