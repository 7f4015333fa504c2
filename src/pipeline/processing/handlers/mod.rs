//! Specialized line pipelines.
//!
//! Every line is dispatched to exactly one handler: [`supply`] for
//! weight- and volume-priced goods, [`packaging`] for count-packaged
//! goods. Handlers are total functions over raw lines; business problems
//! surface as warnings on the processed line, never as errors, so one
//! bad line can never abort a batch.

pub mod packaging;
pub mod registry;
pub mod supply;

use crate::config::ProcessOptions;
use crate::domain::{
    ExtractedField, HandlerKind, LineCategory, ProcessedLine, RawLine, RoutingTrace,
};
use crate::observability::metrics as obs;
use crate::pipeline::processing::extract::{
    FieldExtractor, DESCRIPTION, FORMAT, QUANTITY, TOTAL_PRICE, UNIT, UNIT_PRICE,
};
use crate::profile::VendorProfile;

pub use packaging::PackagingHandler;
pub use registry::HandlerRegistry;
pub use supply::SupplyHandler;

/// Per-line input handed to a handler by the router
pub struct LineContext<'a> {
    pub line: &'a RawLine,
    pub line_number: usize,
    /// Category the router resolved for this line
    pub category: LineCategory,
    pub profile: Option<&'a VendorProfile>,
    pub options: &'a ProcessOptions,
}

/// A specialized line pipeline. Implementations must be total: every
/// raw line produces a processed line, with problems recorded as
/// warnings on its validation summary.
pub trait LineHandler: Send + Sync {
    fn kind(&self) -> HandlerKind;
    fn name(&self) -> &'static str;
    fn process(&self, ctx: &LineContext<'_>) -> ProcessedLine;
}

/// The six fields both pipelines start from
pub struct CoreFields {
    pub description: ExtractedField<String>,
    pub quantity: ExtractedField<f64>,
    pub unit: ExtractedField<String>,
    pub format: ExtractedField<String>,
    pub unit_price: ExtractedField<f64>,
    pub total_price: ExtractedField<f64>,
}

impl CoreFields {
    /// Resolve the shared field set for one line. Quantity falls back to
    /// the profile default, or 1, when no source yields one.
    pub fn resolve(ctx: &LineContext<'_>) -> Self {
        let extractor = FieldExtractor::new(ctx.line, ctx.profile);
        let default_quantity = ctx
            .profile
            .and_then(|p| p.default_quantity)
            .unwrap_or(1.0);
        Self {
            description: extractor.string_field(&DESCRIPTION),
            quantity: extractor.numeric_field_or(&QUANTITY, default_quantity),
            unit: extractor.string_field(&UNIT),
            format: extractor.string_field(&FORMAT),
            unit_price: extractor.numeric_field(&UNIT_PRICE),
            total_price: extractor.numeric_field(&TOTAL_PRICE),
        }
    }

    /// Tier-1 read: description plus at least one price field
    pub fn core_present(&self) -> bool {
        self.description.is_present()
            && (self.unit_price.is_present() || self.total_price.is_present())
    }
}

/// Routing record for a line processed by `actual`. The expected handler
/// comes from the category table; a disagreement means the dispatch
/// wiring is broken, not the data.
pub fn routing_trace(category: LineCategory, actual: HandlerKind) -> RoutingTrace {
    let expected = HandlerKind::for_category(category);
    let routing_valid = expected == actual;
    let reason = if routing_valid {
        format!("category '{}' maps to the {} pipeline", category.as_str(), actual.as_str())
    } else {
        format!(
            "category '{}' maps to the {} pipeline but the {} pipeline processed it",
            category.as_str(),
            expected.as_str(),
            actual.as_str()
        )
    };
    RoutingTrace {
        input_category: category,
        expected_handler: expected,
        actual_handler: actual,
        routing_valid,
        reason,
    }
}

/// Wraps any handler and records per-line metrics around it
pub struct MetricsHandler<H: LineHandler> {
    inner: H,
}

impl<H: LineHandler> MetricsHandler<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H: LineHandler> LineHandler for MetricsHandler<H> {
    fn kind(&self) -> HandlerKind {
        self.inner.kind()
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn process(&self, ctx: &LineContext<'_>) -> ProcessedLine {
        let line = self.inner.process(ctx);
        obs::handler::line_processed(self.inner.name(), line.validation.can_process);
        obs::handler::confidence(self.inner.name(), line.validation.overall_confidence);
        line
    }
}
