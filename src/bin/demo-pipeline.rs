/// Demo: Run sample invoice lines through the complete extraction pipeline
/// Extract -> Classify -> Parse Format -> Weight -> Math -> Pricing -> Validate -> Aggregate
use invoice_extractor::{
    config::ProcessOptions,
    domain::PricingResult,
    engine::ExtractionEngine,
    observability,
    profile::{ColumnMapping, VendorProfile},
};
use serde_json::json;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    observability::init_logging();
    observability::metrics::init()?;

    println!("\n🚀 FULL PIPELINE DEMO: From Raw Lines to Billable Batch");
    println!("{}", "=".repeat(60));
    println!("Following the line item flow:");
    println!("  Extract -> Classify -> Parse Format -> Weight -> Math");
    println!("  -> Pricing -> Validate -> Aggregate");
    println!("{}", "=".repeat(60));

    // ================================================================================
    // STEP 1: SAMPLE LINES - A realistic mixed invoice
    // ================================================================================
    println!("\n📥 STEP 1: SAMPLE LINES - Building a mixed invoice...");

    let lines = vec![
        json!({
            "description": "CHICKEN BREAST BONELESS",
            "category": "food",
            "quantity": 4,
            "unit": "CS",
            "format": "2/5KG",
            "unit_price": 24.99,
            "total_price": 99.96
        }),
        json!({
            "description": "BEEF RIBEYE WHOLE",
            "category": "food",
            "quantity": 12.43,
            "unit": "LB",
            "format": "1/~12 LB",
            "unit_price": 8.99,
            "total_price": 111.75
        }),
        json!({
            "description": "CUP LIDS CLEAR 16OZ",
            "category": "packaging",
            "quantity": 1,
            "format": "10/100",
            "unit_price": 45.00,
            "total_price": 45.00
        }),
        json!({
            "description": "BOTTLE DEPOSIT",
            "category": "fee",
            "quantity": 24,
            "unit_price": 0.05,
            "total_price": 1.20
        }),
        json!({
            "description": "FUEL SURCHARGE",
            "category": "fee",
            "total_price": 7.50
        }),
        json!("this is not a line object"),
    ];
    println!("   📦 {} raw lines prepared", lines.len());

    // ================================================================================
    // STEP 2: VENDOR PROFILE - Column mappings built in code
    // ================================================================================
    println!("\n🗺️  STEP 2: VENDOR PROFILE - Declaring vendor column mappings...");

    let mut profile = VendorProfile::named("demo-foods", "Demo Foods Inc");
    profile.columns.insert(
        "quantity".to_string(),
        ColumnMapping {
            column: "quantity".to_string(),
            confidence: None,
        },
    );
    profile.validate()?;
    println!("   ✅ Profile '{}' ready ({} mapped columns)", profile.vendor_id, profile.columns.len());

    // ================================================================================
    // STEP 3: PROCESS - Route every line through its category pipeline
    // ================================================================================
    println!("\n⚙️  STEP 3: PROCESS - Routing lines through the handlers...");

    let engine = ExtractionEngine::with_options(ProcessOptions::default());
    let result = engine.process_batch(&lines, Some(&profile));

    for line in &result.lines {
        let status = if line.validation.can_process {
            "✅"
        } else if line.validation.can_bill {
            "⚠️"
        } else {
            "❌"
        };
        print!("{} ", status);
    }
    println!();
    println!("   ✅ Processed {} lines (batch {})", result.lines.len(), result.batch_id);

    // ================================================================================
    // STEP 4: LINE DETAIL - What each line resolved to
    // ================================================================================
    println!("\n🔍 STEP 4: LINE DETAIL - Resolved values and pricing...");

    for line in &result.lines {
        let description = line.description.value.as_deref().unwrap_or("<missing>");
        println!(
            "   line {}: {} [{}] conf {} ({})",
            line.line_number,
            description,
            line.classification.as_str(),
            line.validation.overall_confidence,
            line.validation.confidence_level.as_str()
        );
        match &line.pricing {
            PricingResult::Weight { price_per_lb, price_per_kg, .. } => {
                println!("      💰 ${:.4}/lb  ${:.4}/kg", price_per_lb, price_per_kg);
            }
            PricingResult::Volume { price_per_l, .. } => {
                println!("      💰 ${:.4}/l", price_per_l);
            }
            PricingResult::Unit { price_per_unit } => {
                println!("      💰 ${:.4}/unit", price_per_unit);
            }
            PricingResult::Unknown => {
                println!("      💰 no per-measure price available");
            }
        }
        if let Some(cost) = line.flat.cost_per_piece {
            println!("      🧮 ${:.4} per piece", cost);
        }
    }

    // ================================================================================
    // STEP 5: BATCH SUMMARY - Aggregated totals
    // ================================================================================
    println!("\n📊 STEP 5: BATCH SUMMARY - Rolling the batch up...");

    let summary = &result.summary;
    println!("   Total lines:     {}", summary.total_lines);
    println!("   Processable:     {}", summary.processable_lines);
    println!("   Billable:        {}", summary.billable_lines);
    println!("   With warnings:   {}", summary.warned_lines);
    println!("   Errored:         {}", summary.errored_lines);
    println!("   Subtotal:        ${:.2}", summary.subtotal);
    println!("   Avg confidence:  {}", summary.average_confidence);
    println!("      - Products:   {} (${:.2})", summary.classes.product.count, summary.classes.product.total);
    println!("      - Deposits:   {} (${:.2})", summary.classes.deposit.count, summary.classes.deposit.total);
    println!("      - Fees:       {} (${:.2})", summary.classes.fee.count, summary.classes.fee.total);
    println!("      - Credits:    {} (${:.2})", summary.classes.credit.count, summary.classes.credit.total);
    println!("      - Zero lines: {} (${:.2})", summary.classes.zero.count, summary.classes.zero.total);

    if !result.warnings.is_empty() {
        println!("\n⚠️  Problems attached along the way:");
        for batch_warning in &result.warnings {
            println!(
                "   - line {}: [{}] {}",
                batch_warning.line_number,
                batch_warning.warning.severity.as_str(),
                batch_warning.warning.message
            );
        }
    }

    println!("\n✨ PIPELINE COMPLETE!");
    println!("{}", "=".repeat(60));
    println!("Every line carries its provenance:");
    println!("  - Each field remembers which source supplied it");
    println!("  - Packaging formats decoded into case structure");
    println!("  - Weight and volume normalized to grams and milliliters");
    println!("  - Quantity x price checked against the stated total");
    println!("  - Three validation tiers gate billing, warnings preserved");

    Ok(())
}
