use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{
    DEFAULT_CONFIDENCE, EXTRACTED_CONFIDENCE, HIGH_CONFIDENCE, LOW_CONFIDENCE, MAPPED_CONFIDENCE,
    MEDIUM_CONFIDENCE, VISION_CONFIDENCE,
};

/// Raw invoice line as it arrives from upstream capture, before any
/// field resolution. Shape varies by vendor and capture path.
pub type RawLine = serde_json::Value;

/// Where a resolved field value came from, ordered by trustworthiness
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceKind {
    /// Vendor profile mapped a known column to this field
    Mapped,
    /// Read directly from a recognized key on the raw line
    Vision,
    /// Mined out of free text such as the description
    Extracted,
    /// Filled from a configured fallback value
    Default,
    /// No source produced a value
    Missing,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Mapped => "mapped",
            SourceKind::Vision => "vision",
            SourceKind::Extracted => "extracted",
            SourceKind::Default => "default",
            SourceKind::Missing => "missing",
        }
    }

    /// Baseline confidence for a value obtained from this source
    pub fn base_confidence(&self) -> u8 {
        match self {
            SourceKind::Mapped => MAPPED_CONFIDENCE,
            SourceKind::Vision => VISION_CONFIDENCE,
            SourceKind::Extracted => EXTRACTED_CONFIDENCE,
            SourceKind::Default => DEFAULT_CONFIDENCE,
            SourceKind::Missing => 0,
        }
    }
}

/// A single resolved field together with its provenance
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractedField<T> {
    /// The resolved value, if any source produced one
    pub value: Option<T>,
    /// Which source won the resolution
    pub source: SourceKind,
    /// Confidence in the value (0-100)
    pub confidence: u8,
    /// Whether the value is usable downstream
    pub valid: bool,
}

impl<T> ExtractedField<T> {
    /// Field resolved from a real source
    pub fn resolved(value: T, source: SourceKind, confidence: u8) -> Self {
        Self {
            value: Some(value),
            source,
            confidence,
            valid: true,
        }
    }

    /// Field that no source could produce
    pub fn missing() -> Self {
        Self {
            value: None,
            source: SourceKind::Missing,
            confidence: 0,
            valid: false,
        }
    }

    /// Field filled from a configured fallback
    pub fn fallback(value: T, confidence: u8) -> Self {
        Self {
            value: Some(value),
            source: SourceKind::Default,
            confidence,
            valid: true,
        }
    }

    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn is_present(&self) -> bool {
        self.value.is_some()
    }
}

/// Broad class of a unit-of-measure token
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum UnitKind {
    Weight,
    Volume,
    Count,
    Container,
    Unknown,
}

/// Structured reading of a packaging format string such as "2/5KG" or "6x500ML"
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ParsedFormat {
    /// "2/5KG": pack_count units of unit_weight each per case
    PackWeight {
        pack_count: f64,
        unit_weight: f64,
        unit: String,
    },
    /// "4x2.5KG": multiplier units of unit_weight each per case
    Multiplier {
        multiplier: f64,
        unit_weight: f64,
        unit: String,
    },
    /// "20LB": bare per-case weight
    SimpleWeight { weight: f64, unit: String },
    /// "6x500ML" or "750ML": pack_count units of unit_volume each per case
    Volume {
        pack_count: f64,
        unit_volume: f64,
        unit: String,
    },
    /// "100CT" or "6/RL": pure piece count, no weight information
    CountOnly { count: f64 },
    /// "1/~15KG": catch-weight notation; the real weight rides on the
    /// quantity field, the format only names a nominal target
    ApproximateWeight { nominal_weight: f64, unit: String },
    /// Nothing recognizable
    Unknown,
}

impl ParsedFormat {
    /// Total weight of one case in the format's native unit.
    /// Approximate formats report no case weight since the real figure
    /// comes from the quantity field.
    pub fn weight_per_case(&self) -> Option<f64> {
        match self {
            ParsedFormat::PackWeight {
                pack_count,
                unit_weight,
                ..
            } => Some(pack_count * unit_weight),
            ParsedFormat::Multiplier {
                multiplier,
                unit_weight,
                ..
            } => Some(multiplier * unit_weight),
            ParsedFormat::SimpleWeight { weight, .. } => Some(*weight),
            _ => None,
        }
    }

    /// Total volume of one case in the format's native unit
    pub fn volume_per_case(&self) -> Option<f64> {
        match self {
            ParsedFormat::Volume {
                pack_count,
                unit_volume,
                ..
            } => Some(pack_count * unit_volume),
            _ => None,
        }
    }

    pub fn unit(&self) -> Option<&str> {
        match self {
            ParsedFormat::PackWeight { unit, .. }
            | ParsedFormat::Multiplier { unit, .. }
            | ParsedFormat::SimpleWeight { unit, .. }
            | ParsedFormat::Volume { unit, .. }
            | ParsedFormat::ApproximateWeight { unit, .. } => Some(unit),
            _ => None,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, ParsedFormat::Unknown)
    }

    pub fn format_type(&self) -> &'static str {
        match self {
            ParsedFormat::PackWeight { .. } => "pack_weight",
            ParsedFormat::Multiplier { .. } => "multiplier",
            ParsedFormat::SimpleWeight { .. } => "simple_weight",
            ParsedFormat::Volume { .. } => "volume",
            ParsedFormat::CountOnly { .. } => "count_only",
            ParsedFormat::ApproximateWeight { .. } => "approximate_weight",
            ParsedFormat::Unknown => "unknown",
        }
    }
}

/// Case/pack arithmetic for count-packaged goods, e.g. "10/100" meaning
/// 10 packs of 100 pieces per case
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BoxingFormat {
    pub pack_count: f64,
    pub units_per_pack: f64,
    pub total_units: f64,
    /// Confidence in the reading (0-100)
    pub confidence: u8,
}

/// Resolved weight or volume for a whole line
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeightExtraction {
    /// Weight per unit of quantity, in the native unit, when meaningful
    pub per_unit: Option<f64>,
    /// Total weight across the line in the native unit
    pub total: Option<f64>,
    /// Total converted to grams (weight lines)
    pub total_grams: Option<f64>,
    /// Total converted to milliliters (volume lines)
    pub total_ml: Option<f64>,
    /// Native unit token, canonicalized
    pub unit: String,
    /// Which source the figure came from
    pub source: SourceKind,
    /// Confidence in the figure (0-100)
    pub confidence: u8,
    pub valid: bool,
    /// True when the extraction measures volume rather than weight
    pub is_volume: bool,
}

impl WeightExtraction {
    /// Extraction that found nothing usable
    pub fn invalid() -> Self {
        Self {
            per_unit: None,
            total: None,
            total_grams: None,
            total_ml: None,
            unit: String::new(),
            source: SourceKind::Missing,
            confidence: 0,
            valid: false,
            is_volume: false,
        }
    }
}

/// Pricing strategy selected for a line
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PricingType {
    Weight,
    Volume,
    Unit,
}

impl PricingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PricingType::Weight => "weight",
            PricingType::Volume => "volume",
            PricingType::Unit => "unit",
        }
    }
}

/// Normalized unit costs derived from the line total
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum PricingResult {
    Weight {
        price_per_g: f64,
        price_per_kg: f64,
        price_per_lb: f64,
    },
    Volume {
        price_per_ml: f64,
        price_per_l: f64,
    },
    Unit {
        price_per_unit: f64,
    },
    /// Pricing could not be computed for this line
    Unknown,
}

impl PricingResult {
    pub fn is_valid(&self) -> bool {
        !matches!(self, PricingResult::Unknown)
    }
}

/// Which multiplication the math check settled on
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MathFormula {
    /// quantity x unit price
    Unit,
    /// total weight x unit price
    Weight,
    /// Nothing to check, e.g. both prices absent or zero
    None,
}

impl MathFormula {
    pub fn as_str(&self) -> &'static str {
        match self {
            MathFormula::Unit => "unit",
            MathFormula::Weight => "weight",
            MathFormula::None => "none",
        }
    }
}

/// Outcome of checking quantity x price against the stated line total
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MathValidation {
    pub formula: MathFormula,
    /// What the chosen formula predicts the total should be
    pub expected: f64,
    /// The stated line total
    pub actual: f64,
    /// Absolute gap between expected and actual, in currency
    pub difference: f64,
    /// Allowed gap before the check fails
    pub tolerance: f64,
    /// Confidence band for the agreement (0-100)
    pub confidence: u8,
    pub valid: bool,
}

/// Types of problems a line can accumulate on its way through the pipeline
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum WarningKind {
    /// A core field (description, prices) could not be resolved
    MissingField,
    /// Format string present but not recognized by any pattern
    UnparsedFormat,
    /// quantity x price disagrees with the stated total
    MathMismatch,
    /// A price field is present but zero
    ZeroPrice,
    /// No per-weight, per-volume or per-unit cost could be computed
    PricingUnavailable,
    /// Unit-of-measure token not in any known table
    UnknownUnit,
    /// Line reached a handler the category table did not predict
    RoutingMismatch,
    /// Raw line was not a usable JSON object
    MalformedLine,
    /// A value was resolved but from a weak source
    LowConfidence,
    /// Catch-weight format; billed weight comes from the quantity field
    ApproximateFormat,
}

impl WarningKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarningKind::MissingField => "missing_field",
            WarningKind::UnparsedFormat => "unparsed_format",
            WarningKind::MathMismatch => "math_mismatch",
            WarningKind::ZeroPrice => "zero_price",
            WarningKind::PricingUnavailable => "pricing_unavailable",
            WarningKind::UnknownUnit => "unknown_unit",
            WarningKind::RoutingMismatch => "routing_mismatch",
            WarningKind::MalformedLine => "malformed_line",
            WarningKind::LowConfidence => "low_confidence",
            WarningKind::ApproximateFormat => "approximate_format",
        }
    }
}

/// Severity levels for line warnings
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum WarningSeverity {
    /// Worth surfacing, no action needed
    Info,
    /// Needs review but the line can proceed
    Warning,
    /// Blocks billing until resolved
    Error,
}

impl WarningSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarningSeverity::Info => "info",
            WarningSeverity::Warning => "warning",
            WarningSeverity::Error => "error",
        }
    }
}

/// A single problem attached to a processed line
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineWarning {
    pub kind: WarningKind,
    pub severity: WarningSeverity,
    pub message: String,
    /// Field that triggered the warning, when attributable
    pub field: Option<String>,
}

impl LineWarning {
    pub fn new(kind: WarningKind, severity: WarningSeverity, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            message: message.into(),
            field: None,
        }
    }

    pub fn info(kind: WarningKind, message: impl Into<String>) -> Self {
        Self::new(kind, WarningSeverity::Info, message)
    }

    pub fn warning(kind: WarningKind, message: impl Into<String>) -> Self {
        Self::new(kind, WarningSeverity::Warning, message)
    }

    pub fn error(kind: WarningKind, message: impl Into<String>) -> Self {
        Self::new(kind, WarningSeverity::Error, message)
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

/// Overall confidence band for a processed line
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
    Critical,
}

impl ConfidenceLevel {
    pub fn from_score(score: u8) -> Self {
        if score >= HIGH_CONFIDENCE {
            ConfidenceLevel::High
        } else if score >= MEDIUM_CONFIDENCE {
            ConfidenceLevel::Medium
        } else if score >= LOW_CONFIDENCE {
            ConfidenceLevel::Low
        } else {
            ConfidenceLevel::Critical
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::High => "high",
            ConfidenceLevel::Medium => "medium",
            ConfidenceLevel::Low => "low",
            ConfidenceLevel::Critical => "critical",
        }
    }
}

/// Three-tier gate outcome for a line
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationSummary {
    /// Tier 1: description plus at least one price field resolved
    pub core_fields_present: bool,
    /// Tier 2: weight, volume or boxing arithmetic resolved when the
    /// pricing strategy needs it
    pub format_resolved: bool,
    /// Tier 3: a normalized cost was computed
    pub pricing_computable: bool,
    /// All three tiers passed
    pub can_process: bool,
    /// Tier 1 passed; the line can appear on a bill
    pub can_bill: bool,
    /// Blended confidence score (0-100)
    pub overall_confidence: u8,
    pub confidence_level: ConfidenceLevel,
    /// Info- and warning-severity problems
    pub warnings: Vec<LineWarning>,
    /// Error-severity problems
    pub errors: Vec<LineWarning>,
}

/// Business meaning of a line, independent of its category
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LineClassification {
    /// Ordinary purchased goods
    Product,
    /// Container deposit or redemption charge
    Deposit,
    /// Service charge, surcharge or similar
    Fee,
    /// Negative total; money flowing back
    Credit,
    /// Zero or missing total; nothing to bill
    Zero,
}

const DEPOSIT_KEYWORDS: &[&str] = &["deposit", "crv", "redemption"];
const FEE_KEYWORDS: &[&str] = &["fee", "surcharge", "fuel", "freight", "service charge"];

impl LineClassification {
    pub const ALL: [LineClassification; 5] = [
        LineClassification::Product,
        LineClassification::Deposit,
        LineClassification::Fee,
        LineClassification::Credit,
        LineClassification::Zero,
    ];

    /// Classify from description keywords and the sign of the total.
    /// A negative total is a credit no matter what the text says.
    pub fn classify(description: Option<&str>, total: Option<f64>) -> Self {
        if let Some(t) = total {
            if t < 0.0 {
                return LineClassification::Credit;
            }
        }
        let text = description.unwrap_or("").to_lowercase();
        if DEPOSIT_KEYWORDS.iter().any(|k| text.contains(k)) {
            return LineClassification::Deposit;
        }
        if FEE_KEYWORDS.iter().any(|k| text.contains(k)) {
            return LineClassification::Fee;
        }
        match total {
            Some(t) if t.abs() > f64::EPSILON => LineClassification::Product,
            _ => LineClassification::Zero,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LineClassification::Product => "product",
            LineClassification::Deposit => "deposit",
            LineClassification::Fee => "fee",
            LineClassification::Credit => "credit",
            LineClassification::Zero => "zero",
        }
    }
}

/// Vendor-declared category of a line, normalized from free text
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LineCategory {
    Food,
    Packaging,
    Supply,
    Fee,
    Other,
}

impl LineCategory {
    /// Normalize a raw category token; anything unrecognized is Other
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "food" | "produce" | "grocery" => LineCategory::Food,
            "packaging" | "pack" => LineCategory::Packaging,
            "supply" | "supplies" => LineCategory::Supply,
            "fee" | "fees" => LineCategory::Fee,
            _ => LineCategory::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LineCategory::Food => "food",
            LineCategory::Packaging => "packaging",
            LineCategory::Supply => "supply",
            LineCategory::Fee => "fee",
            LineCategory::Other => "other",
        }
    }
}

/// The two specialized line pipelines
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    /// Weight- and volume-priced goods
    Supply,
    /// Count-packaged goods priced per unit
    Packaging,
}

impl HandlerKind {
    /// Fixed category-to-handler table used by both the router and the
    /// handlers' own routing traces
    pub fn for_category(category: LineCategory) -> Self {
        match category {
            LineCategory::Food | LineCategory::Supply | LineCategory::Other => HandlerKind::Supply,
            LineCategory::Packaging | LineCategory::Fee => HandlerKind::Packaging,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HandlerKind::Supply => "supply",
            HandlerKind::Packaging => "packaging",
        }
    }
}

/// Record of how a line was dispatched, kept for auditability
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoutingTrace {
    /// Category resolved from the raw line
    pub input_category: LineCategory,
    /// Handler the category table prescribes
    pub expected_handler: HandlerKind,
    /// Handler that actually processed the line
    pub actual_handler: HandlerKind,
    /// expected_handler == actual_handler
    pub routing_valid: bool,
    pub reason: String,
}

/// Fully processed invoice line with provenance and validation attached.
/// Contains no wall-clock or random data so identical input always
/// produces an identical value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessedLine {
    pub line_number: usize,
    /// Content address of the raw line, "line:sha256:<hex>"
    pub fingerprint: String,
    pub category: LineCategory,
    pub classification: LineClassification,
    pub description: ExtractedField<String>,
    pub quantity: ExtractedField<f64>,
    pub unit: ExtractedField<String>,
    pub format: ExtractedField<String>,
    pub unit_price: ExtractedField<f64>,
    pub total_price: ExtractedField<f64>,
    pub parsed_format: ParsedFormat,
    /// Case/pack arithmetic, present on packaging lines
    pub boxing: Option<BoxingFormat>,
    pub weight: WeightExtraction,
    pub math: MathValidation,
    pub pricing_type: PricingType,
    pub pricing: PricingResult,
    pub validation: ValidationSummary,
    pub routing: RoutingTrace,
    /// Flattened projection for export and storage
    pub flat: FlatLine,
}

/// Flat, serialization-friendly projection of a processed line. Field
/// names and meanings are a stable contract for downstream consumers.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FlatLine {
    pub line_number: usize,
    pub fingerprint: String,
    pub category: String,
    pub classification: String,
    pub description: Option<String>,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub format: Option<String>,
    pub unit_price: Option<f64>,
    pub total_price: Option<f64>,
    pub format_type: String,
    pub weight_total: Option<f64>,
    pub weight_unit: Option<String>,
    pub weight_grams: Option<f64>,
    pub volume_ml: Option<f64>,
    pub price_per_g: Option<f64>,
    pub price_per_kg: Option<f64>,
    pub price_per_lb: Option<f64>,
    pub price_per_ml: Option<f64>,
    pub price_per_l: Option<f64>,
    pub price_per_unit: Option<f64>,
    pub units_per_case: Option<f64>,
    /// Cost of one piece inside a case, for count-packaged goods
    pub cost_per_piece: Option<f64>,
    pub pricing_type: String,
    pub math_valid: bool,
    pub math_difference: f64,
    pub can_process: bool,
    pub can_bill: bool,
    pub confidence: u8,
    pub confidence_level: String,
    pub warning_count: usize,
    pub error_count: usize,
}

impl FlatLine {
    /// Project the flat view out of a fully assembled line
    pub fn project(line: &ProcessedLine) -> Self {
        let (price_per_g, price_per_kg, price_per_lb, price_per_ml, price_per_l, price_per_unit) =
            match &line.pricing {
                PricingResult::Weight {
                    price_per_g,
                    price_per_kg,
                    price_per_lb,
                } => (
                    Some(*price_per_g),
                    Some(*price_per_kg),
                    Some(*price_per_lb),
                    None,
                    None,
                    None,
                ),
                PricingResult::Volume {
                    price_per_ml,
                    price_per_l,
                } => (None, None, None, Some(*price_per_ml), Some(*price_per_l), None),
                PricingResult::Unit { price_per_unit } => {
                    (None, None, None, None, None, Some(*price_per_unit))
                }
                PricingResult::Unknown => (None, None, None, None, None, None),
            };

        let units_per_case = line.boxing.as_ref().map(|b| b.total_units);
        let cost_per_piece = match (units_per_case, line.total_price.value, line.quantity.value) {
            (Some(units), Some(total), Some(qty)) if units * qty > 0.0 && total > 0.0 => {
                Some(crate::pipeline::processing::units::round4(total / (units * qty)))
            }
            _ => None,
        };

        Self {
            line_number: line.line_number,
            fingerprint: line.fingerprint.clone(),
            category: line.category.as_str().to_string(),
            classification: line.classification.as_str().to_string(),
            description: line.description.value.clone(),
            quantity: line.quantity.value,
            unit: line.unit.value.clone(),
            format: line.format.value.clone(),
            unit_price: line.unit_price.value,
            total_price: line.total_price.value,
            format_type: line.parsed_format.format_type().to_string(),
            weight_total: if line.weight.is_volume {
                None
            } else {
                line.weight.total
            },
            weight_unit: if line.weight.unit.is_empty() {
                None
            } else {
                Some(line.weight.unit.clone())
            },
            weight_grams: line.weight.total_grams,
            volume_ml: line.weight.total_ml,
            price_per_g,
            price_per_kg,
            price_per_lb,
            price_per_ml,
            price_per_l,
            price_per_unit,
            units_per_case,
            cost_per_piece,
            pricing_type: line.pricing_type.as_str().to_string(),
            math_valid: line.math.valid,
            math_difference: line.math.difference,
            can_process: line.validation.can_process,
            can_bill: line.validation.can_bill,
            confidence: line.validation.overall_confidence,
            confidence_level: line.validation.confidence_level.as_str().to_string(),
            warning_count: line.validation.warnings.len(),
            error_count: line.validation.errors.len(),
        }
    }
}

/// A per-line warning lifted to batch scope
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchWarning {
    pub line_number: usize,
    pub warning: LineWarning,
}

/// Count and money total for one classification bucket
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClassTotals {
    pub count: usize,
    pub total: f64,
}

/// Per-classification rollup across a batch
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClassificationTotals {
    pub product: ClassTotals,
    pub deposit: ClassTotals,
    pub fee: ClassTotals,
    pub credit: ClassTotals,
    pub zero: ClassTotals,
}

impl ClassificationTotals {
    pub fn bucket(&self, class: LineClassification) -> &ClassTotals {
        match class {
            LineClassification::Product => &self.product,
            LineClassification::Deposit => &self.deposit,
            LineClassification::Fee => &self.fee,
            LineClassification::Credit => &self.credit,
            LineClassification::Zero => &self.zero,
        }
    }

    pub fn bucket_mut(&mut self, class: LineClassification) -> &mut ClassTotals {
        match class {
            LineClassification::Product => &mut self.product,
            LineClassification::Deposit => &mut self.deposit,
            LineClassification::Fee => &mut self.fee,
            LineClassification::Credit => &mut self.credit,
            LineClassification::Zero => &mut self.zero,
        }
    }

    /// Round every bucket total to currency precision
    pub fn round(&mut self) {
        for class in LineClassification::ALL {
            let bucket = self.bucket_mut(class);
            bucket.total = crate::pipeline::processing::units::round2(bucket.total);
        }
    }
}

/// Aggregate figures for one processed batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total_lines: usize,
    /// Lines passing all three validation tiers
    pub processable_lines: usize,
    /// Lines passing tier 1
    pub billable_lines: usize,
    pub warned_lines: usize,
    pub errored_lines: usize,
    pub classes: ClassificationTotals,
    /// Sum of all stated line totals, rounded to cents
    pub subtotal: f64,
    /// Mean overall confidence across lines (0-100)
    pub average_confidence: u8,
    pub processed_at: DateTime<Utc>,
}

/// Result of processing a whole invoice batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    pub batch_id: Uuid,
    pub lines: Vec<ProcessedLine>,
    pub summary: BatchSummary,
    /// All per-line problems flattened in input order
    pub warnings: Vec<BatchWarning>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_prefers_credit_on_negative_total() {
        let class = LineClassification::classify(Some("BOTTLE DEPOSIT RETURN"), Some(-2.40));
        assert_eq!(class, LineClassification::Credit);
    }

    #[test]
    fn classify_detects_deposits_and_fees() {
        assert_eq!(
            LineClassification::classify(Some("CRV BEVERAGE DEPOSIT"), Some(1.20)),
            LineClassification::Deposit
        );
        assert_eq!(
            LineClassification::classify(Some("FUEL SURCHARGE"), Some(4.50)),
            LineClassification::Fee
        );
    }

    #[test]
    fn classify_zero_and_missing_totals() {
        assert_eq!(
            LineClassification::classify(Some("SAMPLE ITEM"), Some(0.0)),
            LineClassification::Zero
        );
        assert_eq!(
            LineClassification::classify(Some("SAMPLE ITEM"), None),
            LineClassification::Zero
        );
    }

    #[test]
    fn confidence_levels_band_at_documented_cutoffs() {
        assert_eq!(ConfidenceLevel::from_score(97), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_score(90), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_score(89), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_score(70), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_score(69), ConfidenceLevel::Low);
        assert_eq!(ConfidenceLevel::from_score(49), ConfidenceLevel::Critical);
    }

    #[test]
    fn pack_weight_case_math() {
        let format = ParsedFormat::PackWeight {
            pack_count: 2.0,
            unit_weight: 5.0,
            unit: "kg".to_string(),
        };
        assert_eq!(format.weight_per_case(), Some(10.0));
        assert_eq!(format.volume_per_case(), None);
    }

    #[test]
    fn approximate_format_reports_no_case_weight() {
        let format = ParsedFormat::ApproximateWeight {
            nominal_weight: 15.0,
            unit: "kg".to_string(),
        };
        assert_eq!(format.weight_per_case(), None);
    }

    #[test]
    fn category_table_routes_fee_to_packaging() {
        assert_eq!(
            HandlerKind::for_category(LineCategory::Fee),
            HandlerKind::Packaging
        );
        assert_eq!(
            HandlerKind::for_category(LineCategory::Other),
            HandlerKind::Supply
        );
    }
}
