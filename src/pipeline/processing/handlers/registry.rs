//! Handler registry.
//!
//! A plain value associating each pipeline with its handler, passed into
//! the router explicitly. Construction always yields a registry covering
//! both pipelines, so dispatch is total; tests substitute handlers
//! through [`HandlerRegistry::with_handlers`].

use crate::domain::{HandlerKind, LineCategory};
use crate::pipeline::processing::handlers::{
    LineHandler, MetricsHandler, PackagingHandler, SupplyHandler,
};

pub struct HandlerRegistry {
    supply: Box<dyn LineHandler>,
    packaging: Box<dyn LineHandler>,
}

impl HandlerRegistry {
    /// Standard registry: both pipelines wrapped with metrics recording
    pub fn new() -> Self {
        Self {
            supply: Box::new(MetricsHandler::new(SupplyHandler::new())),
            packaging: Box::new(MetricsHandler::new(PackagingHandler::new())),
        }
    }

    /// Registry with explicit handler implementations
    pub fn with_handlers(supply: Box<dyn LineHandler>, packaging: Box<dyn LineHandler>) -> Self {
        Self { supply, packaging }
    }

    /// Handler for a line category, per the fixed category table
    pub fn handler_for(&self, category: LineCategory) -> &dyn LineHandler {
        self.handler_of_kind(HandlerKind::for_category(category))
    }

    pub fn handler_of_kind(&self, kind: HandlerKind) -> &dyn LineHandler {
        match kind {
            HandlerKind::Supply => self.supply.as_ref(),
            HandlerKind::Packaging => self.packaging.as_ref(),
        }
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_table_selects_the_expected_pipeline() {
        let registry = HandlerRegistry::new();
        assert_eq!(
            registry.handler_for(LineCategory::Food).kind(),
            HandlerKind::Supply
        );
        assert_eq!(
            registry.handler_for(LineCategory::Supply).kind(),
            HandlerKind::Supply
        );
        assert_eq!(
            registry.handler_for(LineCategory::Other).kind(),
            HandlerKind::Supply
        );
        assert_eq!(
            registry.handler_for(LineCategory::Packaging).kind(),
            HandlerKind::Packaging
        );
        assert_eq!(
            registry.handler_for(LineCategory::Fee).kind(),
            HandlerKind::Packaging
        );
    }

    #[test]
    fn handlers_can_be_substituted() {
        // deliberately cross-wired registry
        let registry = HandlerRegistry::with_handlers(
            Box::new(PackagingHandler::new()),
            Box::new(SupplyHandler::new()),
        );
        assert_eq!(
            registry.handler_for(LineCategory::Food).kind(),
            HandlerKind::Packaging
        );
    }
}
