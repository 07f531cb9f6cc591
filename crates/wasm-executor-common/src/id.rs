//! Stable instance identifiers.
//!
//! An [`InstanceId`] is derived from the canonical source path of a module,
//! so repeated load requests for the same path collapse onto one registry
//! entry without a separate id allocator.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ExecutorError;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Identifier of a registered module instance.
///
/// Rendered as a signed decimal so it round-trips through hosts that only
/// carry 64-bit signed integers or text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(i64);

impl InstanceId {
    /// Wrap a raw identifier.
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Derive the identifier for a source path.
    ///
    /// Uses 64-bit FNV-1a over the UTF-8 bytes of the path. The algorithm is
    /// fixed, so the same path maps to the same id in every process and on
    /// every toolchain (unlike `DefaultHasher`, whose algorithm is unspecified).
    pub fn from_path(path: &str) -> Self {
        Self::from_bytes(path.as_bytes())
    }

    /// Derive the identifier from raw path bytes.
    ///
    /// Paths that are not valid UTF-8 hash their encoded OS bytes, so two
    /// distinct paths never share an id through lossy conversion.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let hash = bytes.iter().fold(FNV_OFFSET_BASIS, |hash, byte| {
            (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME)
        });
        #[allow(clippy::cast_possible_wrap)]
        Self(hash as i64)
    }

    /// Get the raw identifier.
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for InstanceId {
    type Err = ExecutorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(Self)
            .map_err(|_| ExecutorError::InvalidInstanceId {
                input: s.to_string(),
            })
    }
}

impl From<i64> for InstanceId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}
