use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::{ExtractorError, Result};

/// Maps one canonical field name to a vendor-specific column
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnMapping {
    /// Key on the raw line that carries this field for the vendor
    pub column: String,
    /// Optional override of the mapped-source confidence (0-100)
    #[serde(default)]
    pub confidence: Option<u8>,
}

/// Per-vendor extraction profile: column mappings plus billing flags.
/// Profiles are authored by hand, so unknown fields are rejected to
/// catch typos at load time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VendorProfile {
    pub vendor_id: String,
    pub name: String,
    /// Vendor bills supply lines by actual shipped weight; the quantity
    /// column then carries a weight figure
    #[serde(default)]
    pub bills_by_weight: bool,
    /// Fallback quantity when no source yields one
    #[serde(default)]
    pub default_quantity: Option<f64>,
    /// Canonical field name -> vendor column
    #[serde(default)]
    pub columns: HashMap<String, ColumnMapping>,
}

impl VendorProfile {
    pub fn named(vendor_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            vendor_id: vendor_id.into(),
            name: name.into(),
            bills_by_weight: false,
            default_quantity: None,
            columns: HashMap::new(),
        }
    }

    /// Load a profile from a TOML or JSON file, selected by extension
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ExtractorError::Profile(format!(
                "Failed to read profile '{}': {}",
                path.display(),
                e
            ))
        })?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        let profile: VendorProfile = match extension.as_str() {
            "json" => serde_json::from_str(&content)?,
            "toml" | "" => toml::from_str(&content)?,
            other => {
                return Err(ExtractorError::Profile(format!(
                    "Unsupported profile format '{}' for '{}'",
                    other,
                    path.display()
                )))
            }
        };
        profile.validate()?;
        Ok(profile)
    }

    /// Mapping for a canonical field name, if the profile declares one
    pub fn mapping(&self, field: &str) -> Option<&ColumnMapping> {
        self.columns.get(field)
    }

    pub fn validate(&self) -> Result<()> {
        if self.vendor_id.trim().is_empty() {
            return Err(ExtractorError::Profile(
                "Profile is missing a vendor_id".to_string(),
            ));
        }
        for (field, mapping) in &self.columns {
            if mapping.column.trim().is_empty() {
                return Err(ExtractorError::Profile(format!(
                    "Mapping for field '{field}' names an empty column"
                )));
            }
            if let Some(confidence) = mapping.confidence {
                if confidence > 100 {
                    return Err(ExtractorError::Profile(format!(
                        "Mapping for field '{field}' has confidence {confidence}, expected 0-100"
                    )));
                }
            }
        }
        Ok(())
    }
}
