/// Shared numeric constants for the extraction pipeline
/// Confidence values are integers on a 0-100 scale; money tolerances are in
/// invoice currency units (dollars).

// Field-source confidence ladder. A profile-mapped column always outranks a
// direct vision field, which outranks a value mined out of free text.
pub const MAPPED_CONFIDENCE: u8 = 95;
pub const VISION_CONFIDENCE: u8 = 85;
pub const EXTRACTED_CONFIDENCE: u8 = 60;
pub const DEFAULT_CONFIDENCE: u8 = 30;

// Weight extraction confidence by provenance of the weight figure
pub const WEIGHT_FROM_FORMAT_CONFIDENCE: u8 = 90;
pub const WEIGHT_FROM_QUANTITY_CONFIDENCE: u8 = 85;
pub const WEIGHT_FROM_DESCRIPTION_CONFIDENCE: u8 = 70;

// Boxing-format confidence by how explicit the notation was
pub const BOXING_EXPLICIT_CONFIDENCE: u8 = 95;
pub const BOXING_COUNT_CONFIDENCE: u8 = 85;
pub const BOXING_PLAIN_CONFIDENCE: u8 = 70;
pub const BOXING_MISSING_CONFIDENCE: u8 = 50;

/// Weight-based pricing requires at least this much confidence in the
/// extracted weight; below it the line falls back to per-unit pricing.
pub const MIN_WEIGHT_PRICING_CONFIDENCE: u8 = 70;

/// Allowed gap between expected and actual line total before the math
/// check flags a mismatch.
pub const DEFAULT_MATH_TOLERANCE: f64 = 0.02;

// Overall-confidence band cutoffs
pub const HIGH_CONFIDENCE: u8 = 90;
pub const MEDIUM_CONFIDENCE: u8 = 70;
pub const LOW_CONFIDENCE: u8 = 50;

// Blend weights for the overall line confidence score
pub const MATH_CONFIDENCE_WEIGHT: f64 = 0.5;
pub const MIDDLE_CONFIDENCE_WEIGHT: f64 = 0.3;
pub const CORE_CONFIDENCE_WEIGHT: f64 = 0.2;
