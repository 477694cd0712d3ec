//! Deterministic finding identifiers and report digests.
//!
//! Two runs over the same content MUST produce identical finding IDs and an
//! identical report digest. Nothing time- or host-dependent enters a key.
//!
//! Algorithm:
//! 1. Build a canonical key object from the identifying fields
//! 2. Serialize via RFC 8785 (JCS): sorted keys, no whitespace
//! 3. id = prefix || base32hex_lower(SHA256(keyBytes))

use crate::finding::Finding;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

const FINDING_ID_PREFIX: &str = "f1_";
const REPORT_DIGEST_PREFIX: &str = "gr1_";

/// Compute a finding ID from its identifying fields.
///
/// Severity is deliberately excluded: the same defect keeps its identity when
/// a configuration change demotes it from hard to warning.
pub fn compute_finding_id(code: &str, workspace: &str, path: &str, message: &str) -> String {
    let mut map = Map::new();
    map.insert("schema".to_string(), Value::Number(1.into()));
    map.insert("code".to_string(), Value::String(code.to_string()));
    map.insert("workspace".to_string(), Value::String(workspace.to_string()));
    map.insert("path".to_string(), Value::String(path.to_string()));
    map.insert("message".to_string(), Value::String(message.to_string()));
    let key_bytes = jcs_serialize(&Value::Object(map));
    format!(
        "{FINDING_ID_PREFIX}{}",
        base32hex_lower_no_pad(&Sha256::digest(&key_bytes))
    )
}

/// Digest over an already-ordered finding list.
///
/// Each finding contributes its ID and severity, separated by NUL bytes so
/// adjacent fields cannot collide.
pub fn compute_report_digest(findings: &[Finding]) -> String {
    let mut hasher = Sha256::new();
    for finding in findings {
        hasher.update(finding.finding_id.as_bytes());
        hasher.update([0u8]);
        hasher.update(finding.severity.as_str().as_bytes());
        hasher.update([0u8]);
    }
    format!(
        "{REPORT_DIGEST_PREFIX}{}",
        base32hex_lower_no_pad(&hasher.finalize())
    )
}

/// RFC 8785 JSON Canonicalization Scheme.
///
/// Object keys are sorted lexicographically at every depth regardless of the
/// map implementation backing `serde_json::Value`.
pub fn jcs_serialize(value: &Value) -> Vec<u8> {
    let mut buf = Vec::new();
    jcs_write(value, &mut buf);
    buf
}

fn jcs_write(value: &Value, buf: &mut Vec<u8>) {
    match value {
        Value::Null => buf.extend_from_slice(b"null"),
        Value::Bool(true) => buf.extend_from_slice(b"true"),
        Value::Bool(false) => buf.extend_from_slice(b"false"),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                buf.extend_from_slice(i.to_string().as_bytes());
            } else if let Some(u) = n.as_u64() {
                buf.extend_from_slice(u.to_string().as_bytes());
            } else {
                buf.extend_from_slice(n.to_string().as_bytes());
            }
        }
        // Display on a string Value is standard JSON escaping.
        Value::String(_) => buf.extend_from_slice(value.to_string().as_bytes()),
        Value::Array(items) => {
            buf.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    buf.push(b',');
                }
                jcs_write(item, buf);
            }
            buf.push(b']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            buf.push(b'{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    buf.push(b',');
                }
                buf.extend_from_slice(Value::String((*key).clone()).to_string().as_bytes());
                buf.push(b':');
                jcs_write(&map[*key], buf);
            }
            buf.push(b'}');
        }
    }
}

/// RFC 4648 base32hex encoding, lowercase, without padding.
fn base32hex_lower_no_pad(data: &[u8]) -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuv";

    let mut result = String::with_capacity(data.len() * 8 / 5 + 1);
    let mut bits: u64 = 0;
    let mut num_bits: u32 = 0;

    for &byte in data {
        bits = (bits << 8) | u64::from(byte);
        num_bits += 8;
        while num_bits >= 5 {
            num_bits -= 5;
            result.push(ALPHABET[((bits >> num_bits) & 0x1f) as usize] as char);
        }
    }
    if num_bits > 0 {
        result.push(ALPHABET[((bits << (5 - num_bits)) & 0x1f) as usize] as char);
    }

    result
}
