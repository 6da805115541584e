use std::fmt;

use ecv_types::{ObjectKey, ShardIndex};
use serde::Serialize;

/// Digest of one parity shard that matched its regenerated copy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ParityDigest {
    pub shard: ShardIndex,
    /// Hex-encoded BLAKE3 hash of the shard bytes.
    pub blake3: String,
}

impl ParityDigest {
    pub fn of(shard: ShardIndex, bytes: &[u8]) -> Self {
        Self {
            shard,
            blake3: hex::encode(blake3::hash(bytes).as_bytes()),
        }
    }
}

/// Outcome of verifying one object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ObjectReport {
    pub object: ObjectKey,
    pub profile: String,
    pub object_size: u64,
    pub stripe_unit: u64,
    pub parity: Vec<ParityDigest>,
}

impl ObjectReport {
    /// Indices of the parity shards compared.
    pub fn compared(&self) -> Vec<ShardIndex> {
        self.parity.iter().map(|d| d.shard).collect()
    }
}

/// Outcome of a verification run in which every object passed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct VerificationSummary {
    pub objects: Vec<ObjectReport>,
}

impl VerificationSummary {
    pub fn objects_checked(&self) -> usize {
        self.objects.len()
    }

    pub fn shards_compared(&self) -> usize {
        self.objects.iter().map(|o| o.parity.len()).sum()
    }
}

impl fmt::Display for VerificationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Results:")?;
        for report in &self.objects {
            writeln!(f, "Object ID {}: Passed", report.object)?;
        }
        write!(f, "Total: {} objects checked.", self.objects_checked())
    }
}
