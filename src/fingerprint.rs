use sha2::{Digest, Sha256};

use crate::domain::RawLine;

/// Stable content fingerprint for a raw line.
///
/// serde_json serializes object keys in sorted order, so two lines with
/// the same fields produce the same fingerprint regardless of the order
/// they arrived in. The same line always fingerprints the same way, which
/// is what makes reprocessing a batch idempotent.
pub fn line_fingerprint(line: &RawLine) -> String {
    let bytes = serde_json::to_vec(line).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let digest = hasher.finalize();
    format!("line:sha256:{}", hex::encode(digest))
}
