//! Stable, order-independent signature digests.

use super::reducer::PatternSignature;
use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fmt;

/// Hex-encoded SHA-256 of a signature's canonical field serialization.
///
/// Used as the ledger key. Collisions are not detected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignatureHash(String);

impl SignatureHash {
    pub const HEX_LEN: usize = 64;

    pub fn of(signature: &PatternSignature) -> Self {
        Self::of_fields(&signature.to_fields())
    }

    /// Hash arbitrary signature data. Key insertion order does not matter.
    pub fn of_fields(fields: &Map<String, Value>) -> Self {
        let mut canonical = String::new();
        write_canonical_object(fields, &mut canonical);
        let digest = Sha256::digest(canonical.as_bytes());
        SignatureHash(hex::encode(digest))
    }

    /// Parse a persisted key, rejecting anything that is not a full hex digest.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.len() != Self::HEX_LEN || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(LedgerError::Validation(format!(
                "not a signature hash: {s:?}"
            )));
        }
        Ok(SignatureHash(s.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex chars, for log lines.
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl fmt::Display for SignatureHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn write_canonical_object(fields: &Map<String, Value>, out: &mut String) {
    let mut keys: Vec<&String> = fields.keys().collect();
    keys.sort();

    out.push('{');
    for (i, key) in keys.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&Value::String(key.clone()).to_string());
        out.push(':');
        if let Some(value) = fields.get(key) {
            write_canonical(value, out);
        }
    }
    out.push('}');
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => write_canonical_object(map, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> PatternSignature {
        PatternSignature::new(50, 1, "uptrend", "doji", false, 14)
    }

    #[test]
    fn test_equal_signatures_hash_equal() {
        assert_eq!(SignatureHash::of(&sample()), SignatureHash::of(&sample()));
    }

    #[test]
    fn test_hash_independent_of_field_order() {
        let mut reversed = Map::new();
        let fields = sample().to_fields();
        let mut keys: Vec<_> = fields.keys().cloned().collect();
        keys.reverse();
        for k in keys {
            reversed.insert(k.clone(), fields[&k].clone());
        }
        assert_eq!(SignatureHash::of_fields(&reversed), SignatureHash::of(&sample()));
    }

    #[test]
    fn test_hash_matches_raw_signature_data() {
        let data = json!({
            "hour": 14,
            "volatilityHigh": false,
            "primaryPattern": "doji",
            "trend": "uptrend",
            "macdDirection": 1,
            "rsiBucket": 50
        });
        let map = data.as_object().unwrap();
        assert_eq!(SignatureHash::of_fields(map), SignatureHash::of(&sample()));
    }

    #[test]
    fn test_different_signatures_hash_differently() {
        let other = PatternSignature::new(60, 1, "uptrend", "doji", false, 14);
        assert_ne!(SignatureHash::of(&sample()), SignatureHash::of(&other));
    }

    #[test]
    fn test_hash_is_fixed_length_hex() {
        let h = SignatureHash::of(&sample());
        assert_eq!(h.as_str().len(), SignatureHash::HEX_LEN);
        assert_eq!(SignatureHash::parse(h.as_str()).unwrap(), h);
        assert!(SignatureHash::parse("xyz").is_err());
        assert_eq!(h.short().len(), 12);
    }
}
