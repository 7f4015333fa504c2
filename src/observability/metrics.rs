//! Metrics for the extraction pipeline.
//!
//! Every stage records through the helpers in this module, and every
//! metric name lives in [`MetricName`] so there are no magic strings at
//! the call sites.

use std::fmt;
use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Enum representing all metric names used in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Field extraction
    ExtractorFieldsResolved,
    ExtractorFieldsMissing,

    // Format parsing
    FormatParsed,
    FormatBoxingResolved,
    FormatBoxingMissing,

    // Math validation
    MathChecksValid,
    MathChecksInvalid,
    MathDifference,

    // Pricing
    PricingComputed,
    PricingUnavailable,

    // Validation gates
    ValidationLinesProcessable,
    ValidationLinesBlocked,
    ValidationConfidence,

    // Handlers
    HandlerLinesProcessed,
    HandlerConfidence,

    // Router
    RouterLinesRouted,
    RouterMalformedLines,
    RouterMismatches,

    // Batch aggregation
    BatchesProcessed,
    BatchLines,
    BatchBillableLines,
    BatchSubtotal,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            // Field extraction
            MetricName::ExtractorFieldsResolved => "invex_extractor_fields_resolved_total",
            MetricName::ExtractorFieldsMissing => "invex_extractor_fields_missing_total",

            // Format parsing
            MetricName::FormatParsed => "invex_format_parsed_total",
            MetricName::FormatBoxingResolved => "invex_format_boxing_resolved_total",
            MetricName::FormatBoxingMissing => "invex_format_boxing_missing_total",

            // Math validation
            MetricName::MathChecksValid => "invex_math_checks_valid_total",
            MetricName::MathChecksInvalid => "invex_math_checks_invalid_total",
            MetricName::MathDifference => "invex_math_difference",

            // Pricing
            MetricName::PricingComputed => "invex_pricing_computed_total",
            MetricName::PricingUnavailable => "invex_pricing_unavailable_total",

            // Validation gates
            MetricName::ValidationLinesProcessable => "invex_validation_lines_processable_total",
            MetricName::ValidationLinesBlocked => "invex_validation_lines_blocked_total",
            MetricName::ValidationConfidence => "invex_validation_confidence",

            // Handlers
            MetricName::HandlerLinesProcessed => "invex_handler_lines_processed_total",
            MetricName::HandlerConfidence => "invex_handler_confidence",

            // Router
            MetricName::RouterLinesRouted => "invex_router_lines_routed_total",
            MetricName::RouterMalformedLines => "invex_router_malformed_lines_total",
            MetricName::RouterMismatches => "invex_router_mismatches_total",

            // Batch aggregation
            MetricName::BatchesProcessed => "invex_batches_processed_total",
            MetricName::BatchLines => "invex_batch_lines_total",
            MetricName::BatchBillableLines => "invex_batch_billable_lines_total",
            MetricName::BatchSubtotal => "invex_batch_subtotal",
        }
    }

    /// All metric names, for catalog listings and tests
    pub fn all_metrics() -> impl Iterator<Item = MetricName> {
        use MetricName::*;
        [
            ExtractorFieldsResolved,
            ExtractorFieldsMissing,
            FormatParsed,
            FormatBoxingResolved,
            FormatBoxingMissing,
            MathChecksValid,
            MathChecksInvalid,
            MathDifference,
            PricingComputed,
            PricingUnavailable,
            ValidationLinesProcessable,
            ValidationLinesBlocked,
            ValidationConfidence,
            HandlerLinesProcessed,
            HandlerConfidence,
            RouterLinesRouted,
            RouterMalformedLines,
            RouterMismatches,
            BatchesProcessed,
            BatchLines,
            BatchBillableLines,
            BatchSubtotal,
        ]
        .into_iter()
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the metrics system with an in-process Prometheus recorder
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {}", e))?;
    METRICS_HANDLE.set(handle).ok();
    info!("Metrics system initialized");
    Ok(())
}

/// Render the current metric values in Prometheus exposition format.
/// Returns None when [`init`] has not been called.
pub fn render() -> Option<String> {
    METRICS_HANDLE.get().map(|handle| handle.render())
}

// ============================================================================
// Field Extraction Metrics
// ============================================================================

pub mod extractor {
    use super::MetricName;

    /// Record a field resolved from one of the sources
    pub fn field_resolved(field: &str, source: &str) {
        ::metrics::counter!(MetricName::ExtractorFieldsResolved.as_str(),
            "field" => field.to_string(),
            "source" => source.to_string()
        )
        .increment(1);
    }

    /// Record a field absent from every source
    pub fn field_missing(field: &str) {
        ::metrics::counter!(MetricName::ExtractorFieldsMissing.as_str(), "field" => field.to_string())
            .increment(1);
    }
}

// ============================================================================
// Format Parsing Metrics
// ============================================================================

pub mod format {
    use super::MetricName;

    /// Record a format parse outcome by notation kind
    pub fn parsed(format_type: &str) {
        ::metrics::counter!(MetricName::FormatParsed.as_str(), "format_type" => format_type.to_string())
            .increment(1);
    }

    /// Record whether boxing resolution produced a structure
    pub fn boxing_resolved(resolved: bool) {
        let name = if resolved {
            MetricName::FormatBoxingResolved.as_str()
        } else {
            MetricName::FormatBoxingMissing.as_str()
        };
        ::metrics::counter!(name).increment(1);
    }
}

// ============================================================================
// Math Validation Metrics
// ============================================================================

pub mod math {
    use super::MetricName;

    /// Record a math check outcome
    pub fn check(valid: bool) {
        let name = if valid {
            MetricName::MathChecksValid.as_str()
        } else {
            MetricName::MathChecksInvalid.as_str()
        };
        ::metrics::counter!(name).increment(1);
    }

    /// Record the absolute gap between expected and actual totals
    pub fn difference(diff: f64) {
        ::metrics::histogram!(MetricName::MathDifference.as_str()).record(diff);
    }
}

// ============================================================================
// Pricing Metrics
// ============================================================================

pub mod pricing {
    use super::MetricName;

    /// Record a computed pricing breakdown by pricing type
    pub fn computed(pricing_type: &str) {
        ::metrics::counter!(MetricName::PricingComputed.as_str(), "pricing_type" => pricing_type.to_string())
            .increment(1);
    }

    /// Record a line whose pricing could not be computed
    pub fn unavailable(pricing_type: &str) {
        ::metrics::counter!(MetricName::PricingUnavailable.as_str(), "pricing_type" => pricing_type.to_string())
            .increment(1);
    }
}

// ============================================================================
// Validation Gate Metrics
// ============================================================================

pub mod validation {
    use super::MetricName;

    /// Record whether a line cleared all three gates
    pub fn line_gated(can_process: bool) {
        let name = if can_process {
            MetricName::ValidationLinesProcessable.as_str()
        } else {
            MetricName::ValidationLinesBlocked.as_str()
        };
        ::metrics::counter!(name).increment(1);
    }

    /// Record a line's overall confidence score
    pub fn confidence(score: u8) {
        ::metrics::histogram!(MetricName::ValidationConfidence.as_str()).record(score as f64);
    }
}

// ============================================================================
// Handler Metrics
// ============================================================================

pub mod handler {
    use super::MetricName;

    /// Record a line processed by a handler
    pub fn line_processed(handler: &str, can_process: bool) {
        ::metrics::counter!(MetricName::HandlerLinesProcessed.as_str(),
            "handler" => handler.to_string(),
            "processable" => can_process.to_string()
        )
        .increment(1);
    }

    /// Record the confidence a handler produced
    pub fn confidence(handler: &str, score: u8) {
        ::metrics::histogram!(MetricName::HandlerConfidence.as_str(), "handler" => handler.to_string())
            .record(score as f64);
    }
}

// ============================================================================
// Router Metrics
// ============================================================================

pub mod router {
    use super::MetricName;

    /// Record a line dispatched to a handler
    pub fn line_routed(handler: &str) {
        ::metrics::counter!(MetricName::RouterLinesRouted.as_str(), "handler" => handler.to_string())
            .increment(1);
    }

    /// Record a line rejected before dispatch
    pub fn malformed() {
        ::metrics::counter!(MetricName::RouterMalformedLines.as_str()).increment(1);
    }

    /// Record a line that landed on an unexpected handler
    pub fn mismatch() {
        ::metrics::counter!(MetricName::RouterMismatches.as_str()).increment(1);
    }
}

// ============================================================================
// Batch Metrics
// ============================================================================

pub mod batch {
    use super::MetricName;

    /// Record an aggregated batch and its line counts
    pub fn aggregated(total_lines: usize, billable_lines: usize) {
        ::metrics::counter!(MetricName::BatchesProcessed.as_str()).increment(1);
        ::metrics::counter!(MetricName::BatchLines.as_str()).increment(total_lines as u64);
        ::metrics::counter!(MetricName::BatchBillableLines.as_str())
            .increment(billable_lines as u64);
    }

    /// Record a batch's billable subtotal
    pub fn subtotal(amount: f64) {
        ::metrics::histogram!(MetricName::BatchSubtotal.as_str()).record(amount);
    }
}
