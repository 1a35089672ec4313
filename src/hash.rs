//! FNV-1a hashing, the default key hash for [`Map`](crate::Map)
//!
//! See <http://www.isthe.com/chongo/tech/comp/fnv/>.

use std::hash::{BuildHasherDefault, Hasher};

/// 64-bit FNV offset basis
pub const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;

/// 64-bit FNV prime
pub const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Hash a byte string with 64-bit FNV-1a
pub fn fnv_1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Streaming FNV-1a [`Hasher`]
#[derive(Debug, Clone, Copy)]
pub struct FnvHasher(u64);

impl Default for FnvHasher {
    fn default() -> Self {
        Self(FNV_OFFSET_BASIS)
    }
}

impl Hasher for FnvHasher {
    fn write(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.0 = (self.0 ^ u64::from(*byte)).wrapping_mul(FNV_PRIME);
        }
    }

    fn finish(&self) -> u64 {
        self.0
    }
}

/// [`BuildHasher`](std::hash::BuildHasher) producing [`FnvHasher`]s
pub type FnvBuildHasher = BuildHasherDefault<FnvHasher>;
