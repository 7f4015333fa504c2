//! Multi-source field resolution.
//!
//! Every field on a raw line is resolved by walking a fixed chain of
//! sources: a vendor-profile column mapping first, then the recognized
//! key names for that field, then free-text mining (done by the handlers)
//! and finally configured defaults. The winner is recorded together with
//! its provenance so downstream stages can weigh it.

use serde_json::Value;

use crate::domain::{ExtractedField, RawLine, SourceKind};
use crate::observability::metrics as obs;
use crate::profile::VendorProfile;

/// A resolvable field: its canonical name plus the raw-line keys that
/// may carry it, in priority order
pub struct FieldSpec {
    pub name: &'static str,
    pub keys: &'static [&'static str],
}

pub const DESCRIPTION: FieldSpec = FieldSpec {
    name: "description",
    keys: &[
        "description",
        "item_description",
        "desc",
        "product_name",
        "item_name",
        "item",
    ],
};

pub const QUANTITY: FieldSpec = FieldSpec {
    name: "quantity",
    keys: &[
        "quantity",
        "qty",
        "qty_shipped",
        "quantity_shipped",
        "units_shipped",
        "count",
    ],
};

pub const UNIT: FieldSpec = FieldSpec {
    name: "unit",
    keys: &["unit", "uom", "unit_of_measure", "um", "unit_type"],
};

pub const FORMAT: FieldSpec = FieldSpec {
    name: "format",
    keys: &["format", "pack_size", "packsize", "pack", "size", "packaging"],
};

pub const UNIT_PRICE: FieldSpec = FieldSpec {
    name: "unit_price",
    keys: &[
        "unit_price",
        "price",
        "unit_cost",
        "price_per_unit",
        "cost",
        "rate",
    ],
};

pub const TOTAL_PRICE: FieldSpec = FieldSpec {
    name: "total_price",
    keys: &[
        "total_price",
        "total",
        "amount",
        "extended_price",
        "ext_price",
        "line_total",
    ],
};

pub const CATEGORY: FieldSpec = FieldSpec {
    name: "category",
    keys: &["category", "item_category", "line_category", "type", "dept"],
};

/// Coerce a JSON value to a number, cleaning vendor formatting from
/// strings: currency symbols, thousands separators, decimal commas and
/// accounting-style parenthesized negatives
pub fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => clean_numeric_string(s),
        _ => None,
    }
}

fn clean_numeric_string(raw: &str) -> Option<f64> {
    let mut text = raw.trim();
    if text.is_empty() {
        return None;
    }

    let mut negative = false;
    if text.starts_with('(') && text.ends_with(')') {
        negative = true;
        text = &text[1..text.len() - 1];
    }

    let cleaned: String = text
        .chars()
        .filter(|c| !matches!(c, '$' | '€' | '£' | ' '))
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let commas = cleaned.matches(',').count();
    let has_dot = cleaned.contains('.');
    let normalized = if commas > 0 && has_dot {
        // both separators present: commas are thousands groupings
        cleaned.replace(',', "")
    } else if commas == 1 {
        // lone comma is a decimal separator, "12,50" style
        cleaned.replace(',', ".")
    } else if commas > 1 {
        cleaned.replace(',', "")
    } else {
        cleaned
    };

    normalized
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(|v| if negative { -v } else { v })
}

fn usable_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Resolves fields for one raw line against an optional vendor profile
pub struct FieldExtractor<'a> {
    line: &'a RawLine,
    profile: Option<&'a VendorProfile>,
}

impl<'a> FieldExtractor<'a> {
    pub fn new(line: &'a RawLine, profile: Option<&'a VendorProfile>) -> Self {
        Self { line, profile }
    }

    /// Look a key up on the raw line, tolerating header-case differences
    fn raw_value(&self, key: &str) -> Option<&'a Value> {
        let object = self.line.as_object()?;
        if let Some(value) = object.get(key) {
            return Some(value);
        }
        object
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    }

    /// Profile-mapped value for a field, with the mapping's confidence
    fn mapped_value(&self, spec: &FieldSpec) -> Option<(&'a Value, u8)> {
        let mapping = self.profile?.mapping(spec.name)?;
        let value = self.raw_value(&mapping.column)?;
        let confidence = mapping
            .confidence
            .unwrap_or_else(|| SourceKind::Mapped.base_confidence());
        Some((value, confidence))
    }

    /// First recognized key that carries a usable value
    fn vision_value(&self, spec: &FieldSpec) -> Option<&'a Value> {
        spec.keys.iter().find_map(|key| {
            self.raw_value(key)
                .filter(|v| usable_text(v).is_some() || coerce_number(v).is_some())
        })
    }

    pub fn string_field(&self, spec: &FieldSpec) -> ExtractedField<String> {
        if let Some((value, confidence)) = self.mapped_value(spec) {
            if let Some(text) = usable_text(value) {
                obs::extractor::field_resolved(spec.name, SourceKind::Mapped.as_str());
                return ExtractedField::resolved(text, SourceKind::Mapped, confidence);
            }
        }
        if let Some(value) = self.vision_value(spec) {
            if let Some(text) = usable_text(value) {
                obs::extractor::field_resolved(spec.name, SourceKind::Vision.as_str());
                return ExtractedField::resolved(
                    text,
                    SourceKind::Vision,
                    SourceKind::Vision.base_confidence(),
                );
            }
        }
        obs::extractor::field_missing(spec.name);
        ExtractedField::missing()
    }

    pub fn numeric_field(&self, spec: &FieldSpec) -> ExtractedField<f64> {
        if let Some((value, confidence)) = self.mapped_value(spec) {
            if let Some(number) = coerce_number(value) {
                obs::extractor::field_resolved(spec.name, SourceKind::Mapped.as_str());
                return ExtractedField::resolved(number, SourceKind::Mapped, confidence);
            }
        }
        if let Some(number) = spec
            .keys
            .iter()
            .find_map(|key| self.raw_value(key).and_then(coerce_number))
        {
            obs::extractor::field_resolved(spec.name, SourceKind::Vision.as_str());
            return ExtractedField::resolved(
                number,
                SourceKind::Vision,
                SourceKind::Vision.base_confidence(),
            );
        }
        obs::extractor::field_missing(spec.name);
        ExtractedField::missing()
    }

    /// Numeric field with a configured default when every source misses
    pub fn numeric_field_or(&self, spec: &FieldSpec, default: f64) -> ExtractedField<f64> {
        let field = self.numeric_field(spec);
        if field.is_present() {
            field
        } else {
            obs::extractor::field_resolved(spec.name, SourceKind::Default.as_str());
            ExtractedField::fallback(default, SourceKind::Default.base_confidence())
        }
    }
}
