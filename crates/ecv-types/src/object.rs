use std::fmt;

use serde::{Deserialize, Serialize};

/// Snapshot tag the object store reports for the head (unsnapshotted)
/// version of an object.
pub const HEAD_SNAPID: i64 = -2;

/// Stable identity of a logical erasure-coded object.
///
/// Two fragments belong to the same object exactly when both their base
/// object id and their snapshot tag are equal. The node a fragment was seen
/// on and its shard index play no part in the identity.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectKey {
    oid: String,
    snapid: i64,
}

impl ObjectKey {
    /// Create a key from a base object id and snapshot tag.
    pub fn new(oid: impl Into<String>, snapid: i64) -> Self {
        Self {
            oid: oid.into(),
            snapid,
        }
    }

    /// Key for the head version of `oid`.
    pub fn head(oid: impl Into<String>) -> Self {
        Self::new(oid, HEAD_SNAPID)
    }

    /// The base object id.
    pub fn oid(&self) -> &str {
        &self.oid
    }

    /// The snapshot tag.
    pub fn snapid(&self) -> i64 {
        self.snapid
    }

    /// Returns `true` for the head (unsnapshotted) version.
    pub fn is_head(&self) -> bool {
        self.snapid == HEAD_SNAPID
    }

    /// Name of the scratch directory used for this object.
    ///
    /// The display form with `%` and `/` percent-escaped, so every key maps
    /// to a single path component and distinct keys never collide.
    pub fn dir_name(&self) -> String {
        let mut out = String::with_capacity(self.oid.len() + 8);
        for c in self.oid.chars() {
            match c {
                '%' => out.push_str("%25"),
                '/' => out.push_str("%2F"),
                _ => out.push(c),
            }
        }
        out.push('_');
        out.push_str(&self.snapid.to_string());
        out
    }
}

impl fmt::Debug for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectKey({self})")
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.oid, self.snapid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn display_joins_oid_and_snapid() {
        let key = ObjectKey::new("rbd_data.10226b8b4567.0000000000000000", -2);
        assert_eq!(key.to_string(), "rbd_data.10226b8b4567.0000000000000000_-2");
        assert!(key.is_head());
    }

    #[test]
    fn same_pair_is_same_key() {
        assert_eq!(ObjectKey::new("obj", 4), ObjectKey::new("obj", 4));
        assert_ne!(ObjectKey::new("obj", 4), ObjectKey::head("obj"));
        assert_ne!(ObjectKey::head("obj-a"), ObjectKey::head("obj-b"));
    }

    #[test]
    fn dir_name_escapes_separators() {
        let key = ObjectKey::new("a/b%c", 7);
        assert_eq!(key.dir_name(), "a%2Fb%25c_7");
        assert!(!key.dir_name().contains('/'));
    }

    #[test]
    fn ordering_is_by_oid_then_snapid() {
        let a = ObjectKey::new("a", 5);
        let b = ObjectKey::new("a", 6);
        let c = ObjectKey::new("b", -2);
        assert!(a < b);
        assert!(b < c);
    }

    proptest! {
        #[test]
        fn dir_name_is_injective(
            oid_a in "[a-z/%_.]{0,12}", snap_a in -3i64..5,
            oid_b in "[a-z/%_.]{0,12}", snap_b in -3i64..5,
        ) {
            let a = ObjectKey::new(oid_a, snap_a);
            let b = ObjectKey::new(oid_b, snap_b);
            prop_assert_eq!(a == b, a.dir_name() == b.dir_name());
        }
    }
}
