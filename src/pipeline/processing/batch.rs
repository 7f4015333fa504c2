//! Batch aggregation.
//!
//! Rolls a slice of processed lines up into a summary: counts and
//! subtotals per classification bucket, billable subtotal, average
//! confidence, and a flattened warning list that survives the batch
//! boundary with line numbers attached.

use chrono::Utc;
use tracing::info;

use crate::domain::{BatchSummary, BatchWarning, ClassificationTotals, ProcessedLine};
use crate::observability::metrics as obs;
use crate::pipeline::processing::units::round2;

/// Summarize a batch in input order
pub fn aggregate(lines: &[ProcessedLine]) -> (BatchSummary, Vec<BatchWarning>) {
    let mut classes = ClassificationTotals::default();
    let mut subtotal = 0.0;
    let mut processable = 0usize;
    let mut billable = 0usize;
    let mut warned = 0usize;
    let mut errored = 0usize;
    let mut confidence_sum = 0u32;
    let mut warnings = Vec::new();

    for line in lines {
        let total = line.total_price.value.unwrap_or(0.0);
        let bucket = classes.bucket_mut(line.classification);
        bucket.count += 1;
        bucket.total += total;

        if line.validation.can_process {
            processable += 1;
        }
        if line.validation.can_bill {
            billable += 1;
            subtotal += total;
        }
        if !line.validation.warnings.is_empty() {
            warned += 1;
        }
        if !line.validation.errors.is_empty() {
            errored += 1;
        }
        confidence_sum += line.validation.overall_confidence as u32;

        for warning in &line.validation.errors {
            warnings.push(BatchWarning {
                line_number: line.line_number,
                warning: warning.clone(),
            });
        }
        for warning in &line.validation.warnings {
            warnings.push(BatchWarning {
                line_number: line.line_number,
                warning: warning.clone(),
            });
        }
    }

    classes.round();
    let average_confidence = if lines.is_empty() {
        0
    } else {
        (confidence_sum as f64 / lines.len() as f64).round() as u8
    };

    let summary = BatchSummary {
        total_lines: lines.len(),
        processable_lines: processable,
        billable_lines: billable,
        warned_lines: warned,
        errored_lines: errored,
        classes,
        subtotal: round2(subtotal),
        average_confidence,
        processed_at: Utc::now(),
    };

    info!(
        total = summary.total_lines,
        billable = summary.billable_lines,
        errored = summary.errored_lines,
        subtotal = summary.subtotal,
        average_confidence = summary.average_confidence,
        "batch aggregated"
    );
    obs::batch::aggregated(summary.total_lines, summary.billable_lines);
    obs::batch::subtotal(summary.subtotal);

    (summary, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProcessOptions;
    use crate::domain::{LineClassification, WarningKind};
    use crate::pipeline::processing::handlers::HandlerRegistry;
    use crate::pipeline::processing::router::Router;
    use serde_json::json;

    fn processed_lines() -> Vec<ProcessedLine> {
        let registry = HandlerRegistry::new();
        let router = Router::new(&registry);
        let lines = vec![
            json!({"description": "CHICKEN", "category": "food", "quantity": 4, "unit_price": 24.99, "total_price": 99.96, "format": "2/5KG"}),
            json!({"description": "BOTTLE DEPOSIT", "category": "fee", "quantity": 1, "total_price": 1.20}),
            json!({"description": "CREDIT MEMO", "category": "other", "quantity": 1, "unit_price": -5.0, "total_price": -5.0}),
            json!("not an object"),
        ];
        router.route_batch(&lines, None, &ProcessOptions::default())
    }

    #[test]
    fn summary_counts_and_buckets() {
        let lines = processed_lines();
        let (summary, _) = aggregate(&lines);

        assert_eq!(summary.total_lines, 4);
        assert_eq!(summary.classes.product.count, 1);
        assert_eq!(summary.classes.deposit.count, 1);
        assert_eq!(summary.classes.credit.count, 1);
        assert_eq!(summary.classes.zero.count, 1);
        assert_eq!(summary.classes.product.total, 99.96);
        assert_eq!(summary.classes.credit.total, -5.0);
        assert_eq!(summary.errored_lines, 1);
        assert!(summary.average_confidence > 0);
    }

    #[test]
    fn subtotal_covers_billable_lines_only() {
        let lines = processed_lines();
        let (summary, _) = aggregate(&lines);

        // the malformed line is not billable and contributes nothing
        let billable_total: f64 = lines
            .iter()
            .filter(|l| l.validation.can_bill)
            .map(|l| l.total_price.value.unwrap_or(0.0))
            .sum();
        assert_eq!(summary.subtotal, round2(billable_total));
        assert_eq!(summary.billable_lines, lines.len() - 1);
    }

    #[test]
    fn warnings_carry_line_numbers_in_input_order() {
        let lines = processed_lines();
        let (_, warnings) = aggregate(&lines);

        assert!(warnings
            .iter()
            .any(|w| w.line_number == 4 && w.warning.kind == WarningKind::MalformedLine));
        // line numbers never decrease
        let numbers: Vec<usize> = warnings.iter().map(|w| w.line_number).collect();
        let mut sorted = numbers.clone();
        sorted.sort_unstable();
        assert_eq!(numbers, sorted);
    }

    #[test]
    fn empty_batch_produces_a_zeroed_summary() {
        let (summary, warnings) = aggregate(&[]);
        assert_eq!(summary.total_lines, 0);
        assert_eq!(summary.subtotal, 0.0);
        assert_eq!(summary.average_confidence, 0);
        assert!(warnings.is_empty());
        assert_eq!(summary.classes.bucket(LineClassification::Product).count, 0);
    }
}
