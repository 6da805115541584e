use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TypeError;

/// Keys that always lead the tool string, in this order. Everything else
/// follows in lexicographic key order.
const LEADING_KEYS: [&str; 4] = ["plugin", "technique", "k", "m"];

/// Upper bound on `k` and on `m`. Matches the largest shard count the
/// in-process Reed-Solomon codec accepts.
pub const MAX_SHARD_COUNT: u32 = 32_768;

/// Typed erasure code profile.
///
/// A profile is resolved once per object from the pool configuration and is
/// immutable afterwards. `k` and `m` are validated to lie in
/// `1..=MAX_SHARD_COUNT` and the plugin must be named; all other scheme
/// parameters are carried verbatim. Deserialization applies the same checks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawProfile")]
pub struct ErasureCodeProfile {
    k: u32,
    m: u32,
    plugin: String,
    technique: Option<String>,
    params: BTreeMap<String, String>,
}

impl ErasureCodeProfile {
    /// Create a profile with no technique and no extra parameters.
    pub fn new(plugin: impl Into<String>, k: u32, m: u32) -> Result<Self, TypeError> {
        let plugin = plugin.into();
        if plugin.is_empty() {
            return Err(TypeError::MissingParameter("plugin"));
        }
        check_count("k", k)?;
        check_count("m", m)?;
        Ok(Self {
            k,
            m,
            plugin,
            technique: None,
            params: BTreeMap::new(),
        })
    }

    pub fn with_technique(mut self, technique: impl Into<String>) -> Self {
        self.technique = Some(technique.into());
        self
    }

    /// Add a scheme parameter. The reserved keys (`k`, `m`, `plugin`,
    /// `technique`) are ignored here; use the constructor for those.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        if !LEADING_KEYS.contains(&key.as_str()) {
            self.params.insert(key, value.into());
        }
        self
    }

    /// Build a profile from raw `key -> value` pairs, as reported by the
    /// cluster.
    pub fn from_params<I, K, V>(pairs: I) -> Result<Self, TypeError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut params: BTreeMap<String, String> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        let k = parse_count(&mut params, "k")?;
        let m = parse_count(&mut params, "m")?;
        let plugin = params
            .remove("plugin")
            .filter(|p| !p.is_empty())
            .ok_or(TypeError::MissingParameter("plugin"))?;
        let technique = params.remove("technique").filter(|t| !t.is_empty());

        Ok(Self {
            k,
            m,
            plugin,
            technique,
            params,
        })
    }

    /// Build a profile from the JSON object printed by
    /// `osd erasure-code-profile get --format=json`.
    ///
    /// Values are normally strings; numbers and booleans are accepted and
    /// converted to their textual form.
    pub fn from_json(value: &Value) -> Result<Self, TypeError> {
        let object = value
            .as_object()
            .ok_or_else(|| TypeError::MalformedProfile(format!("expected object, got {value}")))?;
        let mut pairs = Vec::with_capacity(object.len());
        for (key, v) in object {
            let text = match v {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                other => {
                    return Err(TypeError::InvalidParameter {
                        key: key.clone(),
                        value: other.to_string(),
                        reason: "not a scalar".into(),
                    })
                }
            };
            pairs.push((key.clone(), text));
        }
        Self::from_params(pairs)
    }

    /// Parse `key=value` pairs separated by commas or newlines.
    ///
    /// Accepts both the tool string form (`k=4,m=2,plugin=jerasure`) and
    /// the plain-text profile listing (one pair per line).
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let mut pairs = Vec::new();
        for entry in s.split([',', '\n']).map(str::trim).filter(|e| !e.is_empty()) {
            let (key, value) = entry
                .split_once('=')
                .ok_or_else(|| TypeError::MalformedProfile(entry.to_string()))?;
            pairs.push((key.trim().to_string(), value.trim().to_string()));
        }
        Self::from_params(pairs)
    }

    pub fn k(&self) -> u32 {
        self.k
    }

    pub fn m(&self) -> u32 {
        self.m
    }

    /// Total number of shards, `k + m`. At most `2 * MAX_SHARD_COUNT`.
    pub fn shard_count(&self) -> u32 {
        self.k.saturating_add(self.m)
    }

    /// Indices of the data shards, `[0, k)`.
    pub fn data_range(&self) -> Range<u32> {
        0..self.k
    }

    /// Indices of the parity shards, `[k, k + m)`.
    pub fn parity_range(&self) -> Range<u32> {
        self.k..self.shard_count()
    }

    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    pub fn technique(&self) -> Option<&str> {
        self.technique.as_deref()
    }

    /// Look up a scheme parameter other than the reserved keys.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Scheme parameters other than the reserved keys, in key order.
    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    /// Serialize to the `key=value,...` form the erasure code tool reads.
    ///
    /// Key order is fixed: `plugin`, `technique` (when set), `k`, `m`, then
    /// the remaining parameters in lexicographic order.
    pub fn to_tool_string(&self) -> String {
        let mut pairs = Vec::with_capacity(self.params.len() + 4);
        pairs.push(format!("plugin={}", self.plugin));
        if let Some(technique) = &self.technique {
            pairs.push(format!("technique={technique}"));
        }
        pairs.push(format!("k={}", self.k));
        pairs.push(format!("m={}", self.m));
        pairs.extend(self.params.iter().map(|(k, v)| format!("{k}={v}")));
        pairs.join(",")
    }
}

impl fmt::Display for ErasureCodeProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_tool_string())
    }
}

/// Field-for-field mirror of [`ErasureCodeProfile`] used to validate
/// deserialized profiles.
#[derive(Deserialize)]
struct RawProfile {
    k: u32,
    m: u32,
    plugin: String,
    technique: Option<String>,
    #[serde(default)]
    params: BTreeMap<String, String>,
}

impl TryFrom<RawProfile> for ErasureCodeProfile {
    type Error = TypeError;

    fn try_from(raw: RawProfile) -> Result<Self, Self::Error> {
        let mut profile = Self::new(raw.plugin, raw.k, raw.m)?;
        profile.technique = raw.technique.filter(|t| !t.is_empty());
        for (key, value) in raw.params {
            profile = profile.with_param(key, value);
        }
        Ok(profile)
    }
}

fn check_count(key: &'static str, value: u32) -> Result<(), TypeError> {
    let reason = match value {
        0 => "must be at least 1".to_string(),
        v if v > MAX_SHARD_COUNT => format!("must be at most {MAX_SHARD_COUNT}"),
        _ => return Ok(()),
    };
    Err(TypeError::InvalidParameter {
        key: key.into(),
        value: value.to_string(),
        reason,
    })
}

fn parse_count(params: &mut BTreeMap<String, String>, key: &'static str) -> Result<u32, TypeError> {
    let raw = params.remove(key).ok_or(TypeError::MissingParameter(key))?;
    let value = raw
        .trim()
        .parse::<u32>()
        .map_err(|e| TypeError::InvalidParameter {
            key: key.into(),
            value: raw.clone(),
            reason: e.to_string(),
        })?;
    check_count(key, value)?;
    Ok(value)
}
