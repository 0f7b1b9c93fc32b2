//! Dynamic community identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable surrogate id linking clusters across timestamps.
///
/// Allocated by a matcher, never read from a single snapshot.
/// [`DynamicCommunityId::UNRESOLVED`] (`-1`) marks a cluster that no
/// membership entry matched and must not be treated as a real community.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DynamicCommunityId(i64);

impl DynamicCommunityId {
    /// Sentinel for "no stable community".
    pub const UNRESOLVED: Self = Self(-1);

    /// Wrap a raw id.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// The raw integer value.
    pub fn get(&self) -> i64 {
        self.0
    }

    /// Whether this is the unresolved sentinel.
    pub fn is_unresolved(&self) -> bool {
        *self == Self::UNRESOLVED
    }
}

impl fmt::Display for DynamicCommunityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for DynamicCommunityId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}
