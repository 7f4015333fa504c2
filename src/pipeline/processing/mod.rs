// Pipeline processing: field extraction, format parsing, validation,
// and per-category handlers

pub mod batch;
pub mod extract;
pub mod format;
pub mod handlers;
pub mod math;
pub mod pricing;
pub mod router;
pub mod units;
pub mod validation;
