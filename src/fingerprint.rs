//! # Fingerprint — 53-bit Page Keys
//!
//! Derives the remote counter key for a page name. The hash is the cyrb53
//! construction: two 32-bit lanes seeded from fixed constants, fed one UTF-16
//! code unit at a time, then cross-mixed and packed into 53 bits.
//!
//! ## Compatibility
//!
//! Counters already recorded by the remote service are keyed by values a browser
//! computed, so the function must agree bit-for-bit with the site's JavaScript hash:
//!
//! - input is walked as UTF-16 code units (`str::encode_utf16`), not chars or bytes;
//!   a character outside the BMP contributes two units, its surrogate pair;
//! - every multiply is a 32-bit wrapping multiply (`Math.imul`);
//! - the result is `h2[20:0] << 32 | h1`, which always fits an IEEE-754 double.
//!
//! ## Example
//!
//! ```
//! use pagehits::fingerprint::fingerprint;
//!
//! assert_eq!(fingerprint("home").value(), 6_869_658_263_342_763);
//! ```

use serde::Serialize;
use std::fmt;

const H1_INIT: u32 = 0xdead_beef;
const H2_INIT: u32 = 0x41c6_ce57;

const H1_ROUND: u32 = 2_654_435_761;
const H2_ROUND: u32 = 1_597_334_677;
const MIX_A: u32 = 2_246_822_507;
const MIX_B: u32 = 3_266_489_909;

/// Mask for the bits of `h2` that land above `h1` in the final value.
const HIGH_MASK: u32 = 0x1f_ffff;

/// A 53-bit page fingerprint.
///
/// `Display` renders the plain decimal integer, which is exactly the path
/// segment used as the remote counter key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Fingerprint(u64);

impl Fingerprint {
    /// Exclusive upper bound of every fingerprint (2^53).
    pub const LIMIT: u64 = 1 << 53;

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fingerprint a page name with the default seed of 0.
pub fn fingerprint(name: &str) -> Fingerprint {
    fingerprint_with_seed(name, 0)
}

/// Fingerprint a page name with an explicit seed.
pub fn fingerprint_with_seed(name: &str, seed: u32) -> Fingerprint {
    hash_units(name.encode_utf16(), seed)
}

/// Fingerprint raw UTF-16 code units.
///
/// Lets callers key text that is not valid Unicode (lone surrogates) the same
/// way a browser would.
pub fn fingerprint_utf16(units: &[u16], seed: u32) -> Fingerprint {
    hash_units(units.iter().copied(), seed)
}

fn hash_units(units: impl Iterator<Item = u16>, seed: u32) -> Fingerprint {
    let mut h1 = H1_INIT ^ seed;
    let mut h2 = H2_INIT ^ seed;

    for unit in units {
        let ch = u32::from(unit);
        h1 = (h1 ^ ch).wrapping_mul(H1_ROUND);
        h2 = (h2 ^ ch).wrapping_mul(H2_ROUND);
    }

    // Finalization order matters: each step reads the lane updated just before it.
    h1 = (h1 ^ (h1 >> 16)).wrapping_mul(MIX_A);
    h1 ^= (h2 ^ (h2 >> 13)).wrapping_mul(MIX_B);
    h2 = (h2 ^ (h2 >> 16)).wrapping_mul(MIX_A);
    h2 ^= (h1 ^ (h1 >> 13)).wrapping_mul(MIX_B);

    Fingerprint((u64::from(h2 & HIGH_MASK) << 32) | u64::from(h1))
}
