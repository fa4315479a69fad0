/// [Szudzik pairing function][szudzik-pairing], wrapping on overflow.
///
/// ```text
/// (a, b) -> if (a<b) then (b^2 + a) else (a^2 + a + b)
/// ```
///
/// Only used to spread keys over buckets, so wrapping is fine: lookups
/// always compare full keys.
///
/// [szudzik-pairing]: http://szudzik.com/ElegantPairing.pdf
pub fn pairing2(a: u64, b: u64) -> u64 {
    if a < b {
        b.wrapping_mul(b).wrapping_add(a)
    } else {
        a.wrapping_mul(a).wrapping_add(a).wrapping_add(b)
    }
}

/// Pairing function for three `u64` values.
pub fn pairing3(a: u64, b: u64, c: u64) -> u64 {
    pairing2(pairing2(a, b), c)
}

pub trait MyHash {
    /// Hash used for bucket selection in the unique table and the caches.
    fn hash(&self) -> u64;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_szudzik() {
        // a\b  0  1  2  3  4
        // ------------------
        // 0    0  1  4  9 16
        // 1    2  3  5 10 17
        // 2    6  7  8 11 18
        // 3   12 13 14 15 19
        // 4   20 21 22 23 24
        assert_eq!(pairing2(0, 0), 0);
        assert_eq!(pairing2(0, 1), 1);
        assert_eq!(pairing2(1, 0), 2);
        assert_eq!(pairing2(1, 1), 3);
        assert_eq!(pairing2(0, 2), 4);
        assert_eq!(pairing2(1, 2), 5);
        assert_eq!(pairing2(2, 0), 6);
        assert_eq!(pairing2(4, 4), 24);
    }

    #[test]
    fn test_wrapping() {
        // Must not panic on overflow in debug builds.
        let big = u64::MAX - 3;
        let _ = pairing3(big, big, big);
    }
}
