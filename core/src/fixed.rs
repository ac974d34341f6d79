// Q16.16 fixed-point arithmetic using i64

pub type I = i64;

pub const FRAC_BITS: u32 = 16;
pub const ONE: I = 1 << FRAC_BITS;
pub const HALF: I = ONE >> 1;

#[inline]
pub fn to_fixed_int(n: i32) -> I { (n as I) << FRAC_BITS }

/// Truncates toward negative infinity.
#[inline]
pub fn from_fixed(x: I) -> i32 { (x >> FRAC_BITS) as i32 }

/// Rounds to the nearest whole pixel, halves rounding up.
#[inline]
pub fn from_fixed_round(x: I) -> i32 { ((x + HALF) >> FRAC_BITS) as i32 }

/// Builds a fixed-point value from a ratio given in thousandths.
#[inline]
pub fn from_permille(p: i32) -> I { ((p as I) << FRAC_BITS) / 1000 }

#[inline]
pub fn i_abs(a: I) -> I { if a < 0 { -a } else { a } }
#[inline]
pub fn i_min(a: I, b: I) -> I { if a < b { a } else { b } }
#[inline]
pub fn i_max(a: I, b: I) -> I { if a > b { a } else { b } }
#[inline]
pub fn i_clamp(v: I, lo: I, hi: I) -> I { i_max(lo, i_min(hi, v)) }

#[inline]
pub fn i_mul(a: I, b: I) -> I { ((a as i128 * b as i128) >> FRAC_BITS) as I }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_whole_pixels() {
        for n in [-64, -1, 0, 1, 63, 127] {
            assert_eq!(from_fixed(to_fixed_int(n)), n);
            assert_eq!(from_fixed_round(to_fixed_int(n)), n);
        }
    }

    #[test]
    fn rounding_goes_to_nearest_pixel() {
        assert_eq!(from_fixed_round(to_fixed_int(10) + HALF - 1), 10);
        assert_eq!(from_fixed_round(to_fixed_int(10) + HALF), 11);
        assert_eq!(from_fixed_round(to_fixed_int(-3) - HALF + 1), -3);
    }

    #[test]
    fn mul_keeps_scale() {
        assert_eq!(i_mul(to_fixed_int(6), to_fixed_int(3)), to_fixed_int(18));
        assert_eq!(i_mul(to_fixed_int(-4), HALF), to_fixed_int(-2));
        assert_eq!(i_clamp(to_fixed_int(9), 0, to_fixed_int(5)), to_fixed_int(5));
    }

    #[test]
    fn permille_matches_expected_fraction() {
        assert_eq!(from_permille(1000), ONE);
        assert_eq!(from_permille(500), HALF);
        assert_eq!(from_permille(0), 0);
    }
}
