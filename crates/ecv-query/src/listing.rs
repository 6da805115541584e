use std::fmt;

use serde_json::Value;
use tracing::{debug, warn};

/// One shard fragment as listed by a node's object store.
///
/// `raw` is the listing line exactly as the tool printed it. The tool takes
/// that same JSON back as the object selector for `dump` and `get-bytes`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FragmentRef {
    pgid: String,
    object: Value,
    raw: String,
}

impl FragmentRef {
    /// Build a fragment reference from its placement group and object JSON.
    pub fn new(pgid: impl Into<String>, object: Value) -> Self {
        let pgid = pgid.into();
        let raw = Value::Array(vec![Value::String(pgid.clone()), object.clone()]).to_string();
        Self { pgid, object, raw }
    }

    /// Parse a single listing line. Returns `Ok(None)` for well-formed lines
    /// that do not describe an EC shard.
    pub fn parse_line(line: &str) -> Result<Option<Self>, serde_json::Error> {
        let entry: (String, Value) = serde_json::from_str(line)?;
        let (pgid, object) = entry;
        let has_oid = object
            .get("oid")
            .and_then(Value::as_str)
            .is_some_and(|oid| !oid.is_empty());
        if !is_ec_shard_pgid(&pgid) || !has_oid {
            return Ok(None);
        }
        Ok(Some(Self {
            pgid,
            object,
            raw: line.trim().to_string(),
        }))
    }

    /// Placement group id, e.g. `2.1fs3`.
    pub fn pgid(&self) -> &str {
        &self.pgid
    }

    /// Object id as listed.
    pub fn oid(&self) -> Option<&str> {
        self.object.get("oid").and_then(Value::as_str)
    }

    /// Listed object JSON.
    pub fn object(&self) -> &Value {
        &self.object
    }

    /// The selector passed back to the object store tool.
    pub fn as_selector(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for FragmentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.pgid, self.oid().unwrap_or("?"))
    }
}

/// EC placement groups carry a shard suffix: `<pool>.<pg hex>s<shard>`.
fn is_ec_shard_pgid(pgid: &str) -> bool {
    let Some((pool, rest)) = pgid.split_once('.') else {
        return false;
    };
    let Some((pg, shard)) = rest.split_once('s') else {
        return false;
    };
    !pool.is_empty()
        && pool.bytes().all(|b| b.is_ascii_digit())
        && !pg.is_empty()
        && pg.bytes().all(|b| b.is_ascii_hexdigit())
        && !shard.is_empty()
        && shard.bytes().all(|b| b.is_ascii_digit())
}

/// Parse `--op list` output into EC shard fragments.
///
/// Blank lines and non-EC entries are skipped silently; lines that are not
/// valid listing JSON are logged and skipped.
pub fn parse_listing(stdout: &str) -> Vec<FragmentRef> {
    let mut fragments = Vec::new();
    for line in stdout.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match FragmentRef::parse_line(line) {
            Ok(Some(fragment)) => fragments.push(fragment),
            Ok(None) => debug!(line, "skipping non-EC listing entry"),
            Err(e) => warn!(line, error = %e, "failed to parse shard listing line; skipping"),
        }
    }
    fragments
}

#[cfg(test)]
mod tests {
    use super::*;

    const EC_LINE: &str = r#"["2.0s1",{"oid":"rbd_data.1012.0000","key":"","snapid":-2,"hash":3195381552,"max":0,"pool":2,"namespace":"","shard_id":1,"max":0}]"#;

    #[test]
    fn parses_ec_line() {
        let fragment = FragmentRef::parse_line(EC_LINE).unwrap().unwrap();
        assert_eq!(fragment.pgid(), "2.0s1");
        assert_eq!(fragment.oid(), Some("rbd_data.1012.0000"));
        assert_eq!(fragment.as_selector(), EC_LINE);
        assert_eq!(fragment.to_string(), "2.0s1/rbd_data.1012.0000");
    }

    #[test]
    fn pgid_shape() {
        assert!(is_ec_shard_pgid("2.0s1"));
        assert!(is_ec_shard_pgid("11.1fs12"));
        assert!(!is_ec_shard_pgid("2.0"));
        assert!(!is_ec_shard_pgid("meta"));
        assert!(!is_ec_shard_pgid("2.0s"));
        assert!(!is_ec_shard_pgid("x.0s1"));
    }

    #[test]
    fn skips_replicated_and_pgmeta_entries() {
        let replicated = r#"["1.0",{"oid":"obj","key":"","snapid":-2,"pool":1,"shard_id":-1}]"#;
        let pgmeta = r#"["2.0s0",{"oid":"","key":"","snapid":-2,"pool":2,"shard_id":0}]"#;
        assert!(FragmentRef::parse_line(replicated).unwrap().is_none());
        assert!(FragmentRef::parse_line(pgmeta).unwrap().is_none());
    }

    #[test]
    fn listing_skips_garbled_lines() {
        let stdout = format!("{EC_LINE}\n\nnot json at all\n[\"meta\",{{\"oid\":\"osdmap.1\"}}]\n{EC_LINE}\n");
        let fragments = parse_listing(&stdout);
        assert_eq!(fragments.len(), 2);
    }

    #[test]
    fn new_builds_matching_selector() {
        let object = serde_json::json!({"oid": "o", "snapid": -2, "pool": 3, "shard_id": 0});
        let fragment = FragmentRef::new("3.0s0", object);
        let reparsed = FragmentRef::parse_line(fragment.as_selector()).unwrap().unwrap();
        assert_eq!(reparsed, fragment);
    }
}
