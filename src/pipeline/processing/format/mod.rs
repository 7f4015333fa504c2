//! Packaging-format parsing.
//!
//! Vendors describe case contents in a handful of loosely standardized
//! notations: "2/5KG" (2 bags of 5 kg), "4X2.5KG", "20LB", "6x500ML",
//! "100CT", "6/RL", "10/100" and the catch-weight form "1/~15KG".
//! Patterns are tried in a fixed order so the more specific readings win;
//! anything unrecognized falls out as [`ParsedFormat::Unknown`] rather
//! than an error.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::constants::{
    BOXING_COUNT_CONFIDENCE, BOXING_EXPLICIT_CONFIDENCE, BOXING_PLAIN_CONFIDENCE,
};
use crate::domain::{BoxingFormat, ParsedFormat};
use crate::pipeline::processing::units::canonical_unit;

const NUM: &str = r"\d+(?:\.\d+)?";
// "#" (pounds) is valid in anchored format fields but breaks the trailing
// word boundary of embedded patterns, so it only appears in the anchored set
const WEIGHT_UNIT: &str = r"KGS?|KILOGRAMS?|KILOS?|GRAMS?|GR|G|LBS?|POUNDS?|OZ|OUNCES?";
const VOLUME_UNIT: &str =
    r"MLS?|MILLILITERS?|LITERS?|LITRES?|LTR|LT|L|GALLONS?|GAL|QUARTS?|QT|PINTS?|PT|FL\.?\s?OZ|FLOZ";
const COUNT_UNIT: &str = r"CT|COUNT|EACH|EA|PCS|PC|UNITS?|UN";
const CONTAINER_UNIT: &str = r"RL|ROLLS?|BX|BOX|CS|CASE|PK|PACKS?|SLV|SLEEVES?|BDL";

fn anchored(body: String) -> Regex {
    // patterns are fixed strings; a failure here is a programming error
    Regex::new(&format!("(?i)^{body}$")).unwrap()
}

fn embedded(body: String) -> Regex {
    Regex::new(&format!(r"(?i)\b{body}\b")).unwrap()
}

static PACK_WEIGHT: Lazy<Regex> =
    Lazy::new(|| anchored(format!(r"({NUM})\s*/\s*({NUM})\s*({WEIGHT_UNIT}|#)")));
static MULTIPLIER_WEIGHT: Lazy<Regex> =
    Lazy::new(|| anchored(format!(r"({NUM})\s*[x×]\s*({NUM})\s*({WEIGHT_UNIT}|#)")));
static SIMPLE_WEIGHT: Lazy<Regex> =
    Lazy::new(|| anchored(format!(r"({NUM})\s*({WEIGHT_UNIT}|#)")));
static MULTIPLIER_VOLUME: Lazy<Regex> =
    Lazy::new(|| anchored(format!(r"({NUM})\s*[x×]\s*({NUM})\s*({VOLUME_UNIT})")));
static PACK_VOLUME: Lazy<Regex> =
    Lazy::new(|| anchored(format!(r"({NUM})\s*/\s*({NUM})\s*({VOLUME_UNIT})")));
static SIMPLE_VOLUME: Lazy<Regex> = Lazy::new(|| anchored(format!(r"({NUM})\s*({VOLUME_UNIT})")));
static MULTIPLIER_COUNT: Lazy<Regex> =
    Lazy::new(|| anchored(format!(r"({NUM})\s*[x×]\s*({NUM})\s*(?:{COUNT_UNIT})")));
static SIMPLE_COUNT: Lazy<Regex> =
    Lazy::new(|| anchored(format!(r"({NUM})\s*(?:{COUNT_UNIT}|{CONTAINER_UNIT})")));
static SLASH_CONTAINER: Lazy<Regex> =
    Lazy::new(|| anchored(format!(r"({NUM})\s*/\s*(?:{CONTAINER_UNIT}|{COUNT_UNIT})")));
static APPROX_WEIGHT: Lazy<Regex> =
    Lazy::new(|| anchored(format!(r"({NUM})\s*/\s*~\s*({NUM})\s*({WEIGHT_UNIT}|#)")));
static BARE_APPROX_WEIGHT: Lazy<Regex> =
    Lazy::new(|| anchored(format!(r"~\s*({NUM})\s*({WEIGHT_UNIT}|#)")));

static BOXING_SLASH: Lazy<Regex> = Lazy::new(|| anchored(format!(r"(\d+)\s*/\s*(\d+)")));
static BOXING_MULTIPLIER: Lazy<Regex> =
    Lazy::new(|| anchored(format!(r"(\d+)\s*[x×]\s*(\d+)\s*(?:{COUNT_UNIT})?")));
static BOXING_COUNT: Lazy<Regex> = Lazy::new(|| anchored(format!(r"(\d+)\s*(?:{COUNT_UNIT})")));
static BOXING_PACK: Lazy<Regex> =
    Lazy::new(|| anchored(format!(r"(\d+)\s*(?:{CONTAINER_UNIT})")));
static BOXING_SLASH_CONTAINER: Lazy<Regex> =
    Lazy::new(|| anchored(format!(r"(\d+)\s*/\s*(?:{CONTAINER_UNIT})")));
static BOXING_PLAIN: Lazy<Regex> = Lazy::new(|| anchored(r"(\d+)".to_string()));

static EMBEDDED_APPROX: Lazy<Regex> =
    Lazy::new(|| embedded(format!(r"({NUM})\s*/\s*~\s*({NUM})\s*({WEIGHT_UNIT})")));
static EMBEDDED_PACK_WEIGHT: Lazy<Regex> =
    Lazy::new(|| embedded(format!(r"({NUM})\s*/\s*({NUM})\s*({WEIGHT_UNIT})")));
static EMBEDDED_MULTIPLIER_WEIGHT: Lazy<Regex> =
    Lazy::new(|| embedded(format!(r"({NUM})\s*[x×]\s*({NUM})\s*({WEIGHT_UNIT})")));
static EMBEDDED_MULTIPLIER_VOLUME: Lazy<Regex> =
    Lazy::new(|| embedded(format!(r"({NUM})\s*[x×]\s*({NUM})\s*({VOLUME_UNIT})")));
static EMBEDDED_WEIGHT: Lazy<Regex> =
    Lazy::new(|| embedded(format!(r"({NUM})\s*({WEIGHT_UNIT})")));
static EMBEDDED_VOLUME: Lazy<Regex> =
    Lazy::new(|| embedded(format!(r"({NUM})\s*({VOLUME_UNIT})")));
static EMBEDDED_BOXING: Lazy<Regex> =
    Lazy::new(|| embedded(format!(r"(\d+)\s*[/x×]\s*(\d+)\s*(?:{COUNT_UNIT})?")));

fn num(text: &str) -> f64 {
    text.parse().unwrap_or(0.0)
}

/// Parse a format field into its structured reading.
///
/// Pattern order matters: slash pack-weight first, then weight
/// multipliers, bare weights, volumes, counts, and catch-weight last.
pub fn parse_format(raw: &str) -> ParsedFormat {
    let text = raw.trim();
    if text.is_empty() {
        return ParsedFormat::Unknown;
    }

    if let Some(c) = PACK_WEIGHT.captures(text) {
        return ParsedFormat::PackWeight {
            pack_count: num(&c[1]),
            unit_weight: num(&c[2]),
            unit: canonical_unit(&c[3]),
        };
    }
    if let Some(c) = MULTIPLIER_WEIGHT.captures(text) {
        return ParsedFormat::Multiplier {
            multiplier: num(&c[1]),
            unit_weight: num(&c[2]),
            unit: canonical_unit(&c[3]),
        };
    }
    if let Some(c) = SIMPLE_WEIGHT.captures(text) {
        return ParsedFormat::SimpleWeight {
            weight: num(&c[1]),
            unit: canonical_unit(&c[2]),
        };
    }
    if let Some(c) = MULTIPLIER_VOLUME.captures(text) {
        return ParsedFormat::Volume {
            pack_count: num(&c[1]),
            unit_volume: num(&c[2]),
            unit: canonical_unit(&c[3]),
        };
    }
    if let Some(c) = PACK_VOLUME.captures(text) {
        return ParsedFormat::Volume {
            pack_count: num(&c[1]),
            unit_volume: num(&c[2]),
            unit: canonical_unit(&c[3]),
        };
    }
    if let Some(c) = SIMPLE_VOLUME.captures(text) {
        return ParsedFormat::Volume {
            pack_count: 1.0,
            unit_volume: num(&c[1]),
            unit: canonical_unit(&c[2]),
        };
    }
    if let Some(c) = MULTIPLIER_COUNT.captures(text) {
        return ParsedFormat::CountOnly {
            count: num(&c[1]) * num(&c[2]),
        };
    }
    if let Some(c) = SLASH_CONTAINER.captures(text) {
        return ParsedFormat::CountOnly { count: num(&c[1]) };
    }
    if let Some(c) = SIMPLE_COUNT.captures(text) {
        return ParsedFormat::CountOnly { count: num(&c[1]) };
    }
    if let Some(c) = APPROX_WEIGHT.captures(text) {
        return ParsedFormat::ApproximateWeight {
            nominal_weight: num(&c[1]) * num(&c[2]),
            unit: canonical_unit(&c[3]),
        };
    }
    if let Some(c) = BARE_APPROX_WEIGHT.captures(text) {
        return ParsedFormat::ApproximateWeight {
            nominal_weight: num(&c[1]),
            unit: canonical_unit(&c[2]),
        };
    }
    ParsedFormat::Unknown
}

/// Parse a packaging boxing notation such as "10/100" (10 packs of 100
/// pieces) into case/pack arithmetic. Confidence reflects how explicit
/// the notation was.
pub fn parse_boxing(raw: &str) -> Option<BoxingFormat> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(c) = BOXING_SLASH.captures(text) {
        let pack_count = num(&c[1]);
        let units_per_pack = num(&c[2]);
        return Some(BoxingFormat {
            pack_count,
            units_per_pack,
            total_units: pack_count * units_per_pack,
            confidence: BOXING_EXPLICIT_CONFIDENCE,
        });
    }
    if let Some(c) = BOXING_MULTIPLIER.captures(text) {
        let pack_count = num(&c[1]);
        let units_per_pack = num(&c[2]);
        return Some(BoxingFormat {
            pack_count,
            units_per_pack,
            total_units: pack_count * units_per_pack,
            confidence: BOXING_EXPLICIT_CONFIDENCE,
        });
    }
    if let Some(c) = BOXING_SLASH_CONTAINER.captures(text) {
        let pack_count = num(&c[1]);
        return Some(BoxingFormat {
            pack_count,
            units_per_pack: 1.0,
            total_units: pack_count,
            confidence: BOXING_COUNT_CONFIDENCE,
        });
    }
    if let Some(c) = BOXING_COUNT.captures(text).or_else(|| BOXING_PACK.captures(text)) {
        let count = num(&c[1]);
        return Some(BoxingFormat {
            pack_count: 1.0,
            units_per_pack: count,
            total_units: count,
            confidence: BOXING_COUNT_CONFIDENCE,
        });
    }
    if let Some(c) = BOXING_PLAIN.captures(text) {
        let count = num(&c[1]);
        return Some(BoxingFormat {
            pack_count: 1.0,
            units_per_pack: count,
            total_units: count,
            confidence: BOXING_PLAIN_CONFIDENCE,
        });
    }
    None
}

/// A format reading recovered from free text instead of the format field
#[derive(Debug, Clone, PartialEq)]
pub struct MinedFormat {
    pub parsed: ParsedFormat,
    /// The exact substring that matched
    pub matched: String,
    /// True when the figure describes one unit of quantity rather than a
    /// whole case. A bare "240G" inside a description is the weight of a
    /// single piece; "2/5KG" inside a description is still a case spec.
    pub per_unit: bool,
}

/// Scan description text for packaging notation. Full case notations are
/// preferred over bare per-unit weights so "HAM 2/5KG" never reads as a
/// 2-something of 5 kg pieces and a stray "5KG" both.
pub fn mine_description(text: &str) -> Option<MinedFormat> {
    if text.trim().is_empty() {
        return None;
    }

    if let Some(c) = EMBEDDED_APPROX.captures(text) {
        return Some(MinedFormat {
            parsed: ParsedFormat::ApproximateWeight {
                nominal_weight: num(&c[1]) * num(&c[2]),
                unit: canonical_unit(&c[3]),
            },
            matched: c[0].to_string(),
            per_unit: false,
        });
    }
    if let Some(c) = EMBEDDED_PACK_WEIGHT.captures(text) {
        return Some(MinedFormat {
            parsed: ParsedFormat::PackWeight {
                pack_count: num(&c[1]),
                unit_weight: num(&c[2]),
                unit: canonical_unit(&c[3]),
            },
            matched: c[0].to_string(),
            per_unit: false,
        });
    }
    if let Some(c) = EMBEDDED_MULTIPLIER_WEIGHT.captures(text) {
        return Some(MinedFormat {
            parsed: ParsedFormat::Multiplier {
                multiplier: num(&c[1]),
                unit_weight: num(&c[2]),
                unit: canonical_unit(&c[3]),
            },
            matched: c[0].to_string(),
            per_unit: false,
        });
    }
    if let Some(c) = EMBEDDED_MULTIPLIER_VOLUME.captures(text) {
        return Some(MinedFormat {
            parsed: ParsedFormat::Volume {
                pack_count: num(&c[1]),
                unit_volume: num(&c[2]),
                unit: canonical_unit(&c[3]),
            },
            matched: c[0].to_string(),
            per_unit: false,
        });
    }
    if let Some(c) = EMBEDDED_WEIGHT.captures(text) {
        return Some(MinedFormat {
            parsed: ParsedFormat::SimpleWeight {
                weight: num(&c[1]),
                unit: canonical_unit(&c[2]),
            },
            matched: c[0].to_string(),
            per_unit: true,
        });
    }
    if let Some(c) = EMBEDDED_VOLUME.captures(text) {
        return Some(MinedFormat {
            parsed: ParsedFormat::Volume {
                pack_count: 1.0,
                unit_volume: num(&c[1]),
                unit: canonical_unit(&c[2]),
            },
            matched: c[0].to_string(),
            per_unit: true,
        });
    }
    None
}

/// Scan description text for boxing notation, for packaging lines whose
/// format field is missing or unreadable
pub fn mine_boxing(text: &str) -> Option<BoxingFormat> {
    let c = EMBEDDED_BOXING.captures(text)?;
    let pack_count = num(&c[1]);
    let units_per_pack = num(&c[2]);
    Some(BoxingFormat {
        pack_count,
        units_per_pack,
        total_units: pack_count * units_per_pack,
        confidence: crate::constants::EXTRACTED_CONFIDENCE,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_slash_pack_weight() {
        assert_eq!(
            parse_format("2/5KG"),
            ParsedFormat::PackWeight {
                pack_count: 2.0,
                unit_weight: 5.0,
                unit: "kg".to_string(),
            }
        );
        assert_eq!(
            parse_format("6/4 LB"),
            ParsedFormat::PackWeight {
                pack_count: 6.0,
                unit_weight: 4.0,
                unit: "lb".to_string(),
            }
        );
    }

    #[test]
    fn parses_weight_multiplier() {
        assert_eq!(
            parse_format("4X2.5KG"),
            ParsedFormat::Multiplier {
                multiplier: 4.0,
                unit_weight: 2.5,
                unit: "kg".to_string(),
            }
        );
    }

    #[test]
    fn parses_simple_weight() {
        assert_eq!(
            parse_format("20LB"),
            ParsedFormat::SimpleWeight {
                weight: 20.0,
                unit: "lb".to_string(),
            }
        );
        // pound-sign notation
        assert_eq!(
            parse_format("50#"),
            ParsedFormat::SimpleWeight {
                weight: 50.0,
                unit: "lb".to_string(),
            }
        );
    }

    #[test]
    fn parses_volume_forms() {
        assert_eq!(
            parse_format("6x500ML"),
            ParsedFormat::Volume {
                pack_count: 6.0,
                unit_volume: 500.0,
                unit: "ml".to_string(),
            }
        );
        assert_eq!(
            parse_format("750ML"),
            ParsedFormat::Volume {
                pack_count: 1.0,
                unit_volume: 750.0,
                unit: "ml".to_string(),
            }
        );
        assert_eq!(
            parse_format("4/1GAL"),
            ParsedFormat::Volume {
                pack_count: 4.0,
                unit_volume: 1.0,
                unit: "gal".to_string(),
            }
        );
    }

    #[test]
    fn parses_count_forms() {
        assert_eq!(parse_format("100CT"), ParsedFormat::CountOnly { count: 100.0 });
        assert_eq!(parse_format("6/RL"), ParsedFormat::CountOnly { count: 6.0 });
        assert_eq!(
            parse_format("10x100CT"),
            ParsedFormat::CountOnly { count: 1000.0 }
        );
        assert_eq!(parse_format("24PK"), ParsedFormat::CountOnly { count: 24.0 });
    }

    #[test]
    fn parses_catch_weight() {
        assert_eq!(
            parse_format("1/~15KG"),
            ParsedFormat::ApproximateWeight {
                nominal_weight: 15.0,
                unit: "kg".to_string(),
            }
        );
        assert_eq!(
            parse_format("~12 LB"),
            ParsedFormat::ApproximateWeight {
                nominal_weight: 12.0,
                unit: "lb".to_string(),
            }
        );
    }

    #[test]
    fn unrecognized_format_is_unknown() {
        assert_eq!(parse_format("ASSORTED"), ParsedFormat::Unknown);
        assert_eq!(parse_format(""), ParsedFormat::Unknown);
    }

    #[test]
    fn parses_boxing_notation() {
        let boxing = parse_boxing("10/100").unwrap();
        assert_eq!(boxing.pack_count, 10.0);
        assert_eq!(boxing.units_per_pack, 100.0);
        assert_eq!(boxing.total_units, 1000.0);
        assert_eq!(boxing.confidence, BOXING_EXPLICIT_CONFIDENCE);

        let boxing = parse_boxing("100CT").unwrap();
        assert_eq!(boxing.total_units, 100.0);
        assert_eq!(boxing.confidence, BOXING_COUNT_CONFIDENCE);

        let boxing = parse_boxing("250").unwrap();
        assert_eq!(boxing.total_units, 250.0);
        assert_eq!(boxing.confidence, BOXING_PLAIN_CONFIDENCE);

        assert!(parse_boxing("ASSORTED").is_none());
    }

    #[test]
    fn mines_per_unit_weight_from_description() {
        let mined = mine_description("SLICED HAM 240G VACUUM").unwrap();
        assert!(mined.per_unit);
        assert_eq!(
            mined.parsed,
            ParsedFormat::SimpleWeight {
                weight: 240.0,
                unit: "g".to_string(),
            }
        );
        assert_eq!(mined.matched, "240G");
    }

    #[test]
    fn mines_case_notation_from_description() {
        let mined = mine_description("CHICKEN BREAST 2/5KG FROZEN").unwrap();
        assert!(!mined.per_unit);
        assert_eq!(
            mined.parsed,
            ParsedFormat::PackWeight {
                pack_count: 2.0,
                unit_weight: 5.0,
                unit: "kg".to_string(),
            }
        );
    }

    #[test]
    fn mining_plain_text_finds_nothing() {
        assert!(mine_description("PAPER TOWEL WHITE").is_none());
        // a number followed by a non-unit word is not a weight
        assert!(mine_description("CHEESE 5 GRADE A").is_none());
        assert!(mine_description("").is_none());
    }
}
