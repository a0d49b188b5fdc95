//! Fixed-point decimal values.
//!
//! A [`Decimal`] is an `i128` mantissa scaled by a power of ten. Instances
//! are always held in canonical form: trailing zero digits are stripped
//! from the mantissa (with the scale adjusted down), and zero has scale 0.
//! Canonicalization makes equal values of different written scales (`1.0`
//! vs `1.00`) structurally identical, so comparison, hashing, and the
//! order-preserving key encoding all agree.

use std::cmp::Ordering;
use std::fmt;

/// A fixed-point decimal: `mantissa * 10^-scale`, canonical form.
///
/// # Example
///
/// ```rust
/// use grove_codec::Decimal;
///
/// let a = Decimal::new(10, 1); // 1.0
/// let b = Decimal::new(100, 2); // 1.00
/// assert_eq!(a, b);
/// assert!(Decimal::new(95, 1) < a.scaled_by_ten());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Decimal {
    mantissa: i128,
    scale: u8,
}

impl Decimal {
    /// Zero.
    pub const ZERO: Self = Self {
        mantissa: 0,
        scale: 0,
    };

    /// Creates a decimal from a mantissa and scale, canonicalizing it.
    #[must_use]
    pub fn new(mantissa: i128, scale: u8) -> Self {
        let mut mantissa = mantissa;
        let mut scale = scale;
        if mantissa == 0 {
            scale = 0;
        }
        while scale > 0 && mantissa % 10 == 0 {
            mantissa /= 10;
            scale -= 1;
        }
        Self { mantissa, scale }
    }

    /// Creates an integral decimal.
    #[inline]
    #[must_use]
    pub fn from_i64(value: i64) -> Self {
        Self {
            mantissa: i128::from(value),
            scale: 0,
        }
    }

    /// Returns the canonical mantissa.
    #[inline]
    #[must_use]
    pub const fn mantissa(&self) -> i128 {
        self.mantissa
    }

    /// Returns the canonical scale.
    #[inline]
    #[must_use]
    pub const fn scale(&self) -> u8 {
        self.scale
    }

    /// Returns true if the value is zero.
    #[inline]
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.mantissa == 0
    }

    /// Returns the sign: -1, 0, or 1.
    #[inline]
    #[must_use]
    pub const fn signum(&self) -> i8 {
        if self.mantissa > 0 {
            1
        } else if self.mantissa < 0 {
            -1
        } else {
            0
        }
    }

    /// Returns this value multiplied by ten (test helper for ordering
    /// checks; saturates on overflow of the mantissa).
    #[must_use]
    pub fn scaled_by_ten(&self) -> Self {
        if self.scale > 0 {
            Self::new(self.mantissa, self.scale - 1)
        } else {
            Self::new(self.mantissa.saturating_mul(10), 0)
        }
    }

    /// Decomposes the magnitude into the form used by the key encoding:
    /// the decimal exponent and the significant digits with trailing
    /// zeros stripped, most significant first. Zero yields `(0, [])`.
    ///
    /// The magnitude equals `0.d1 d2 .. dk * 10^exponent`.
    #[must_use]
    pub fn magnitude_parts(&self) -> (i16, Vec<u8>) {
        if self.mantissa == 0 {
            return (0, Vec::new());
        }
        let mut digits: Vec<u8> = Vec::with_capacity(39);
        let mut magnitude = self.mantissa.unsigned_abs();
        while magnitude > 0 {
            digits.push((magnitude % 10) as u8);
            magnitude /= 10;
        }
        // digits is least-significant-first here
        let digit_count = digits.len() as i16;
        let exponent = digit_count - i16::from(self.scale);
        while digits.first() == Some(&0) {
            digits.remove(0);
        }
        digits.reverse();
        (exponent, digits)
    }

    /// Reassembles a decimal from exponent and significant digits, the
    /// inverse of [`magnitude_parts`](Self::magnitude_parts). Returns
    /// `None` on mantissa overflow or an unrepresentable scale.
    #[must_use]
    pub fn from_magnitude_parts(negative: bool, exponent: i16, digits: &[u8]) -> Option<Self> {
        if digits.is_empty() {
            return Some(Self::ZERO);
        }
        let mut mantissa: i128 = 0;
        for &digit in digits {
            if digit > 9 {
                return None;
            }
            mantissa = mantissa.checked_mul(10)?.checked_add(i128::from(digit))?;
        }
        let digit_count = digits.len() as i16;
        let scale = digit_count - exponent;
        let (mantissa, scale) = if scale < 0 {
            // integral value with trailing zeros; scale back up
            let mut widened = mantissa;
            for _ in 0..(-scale) {
                widened = widened.checked_mul(10)?;
            }
            (widened, 0u8)
        } else {
            (mantissa, u8::try_from(scale).ok()?)
        };
        let mantissa = if negative { -mantissa } else { mantissa };
        Some(Self::new(mantissa, scale))
    }
}

impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> Ordering {
        let sign = self.signum().cmp(&other.signum());
        if sign != Ordering::Equal {
            return sign;
        }
        if self.mantissa == 0 {
            return Ordering::Equal;
        }
        // Same nonzero sign: compare exponent, then digit strings. A
        // shorter digit string that is a prefix of the other is the
        // smaller magnitude.
        let (exp_a, digits_a) = self.magnitude_parts();
        let (exp_b, digits_b) = other.magnitude_parts();
        let magnitude = exp_a.cmp(&exp_b).then_with(|| digits_a.cmp(&digits_b));
        if self.mantissa > 0 {
            magnitude
        } else {
            magnitude.reverse()
        }
    }
}

impl PartialOrd for Decimal {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<i64> for Decimal {
    #[inline]
    fn from(value: i64) -> Self {
        Self::from_i64(value)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scale == 0 {
            write!(f, "{}", self.mantissa)
        } else {
            let divisor = 10i128.pow(u32::from(self.scale));
            let int_part = self.mantissa / divisor;
            let frac_part = (self.mantissa % divisor).abs();
            if self.mantissa < 0 && int_part == 0 {
                write!(f, "-0.{:0>width$}", frac_part, width = self.scale as usize)
            } else {
                write!(
                    f,
                    "{}.{:0>width$}",
                    int_part,
                    frac_part,
                    width = self.scale as usize
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_form() {
        assert_eq!(Decimal::new(100, 2), Decimal::new(10, 1));
        assert_eq!(Decimal::new(100, 2).mantissa(), 1);
        assert_eq!(Decimal::new(100, 2).scale(), 0);
        assert_eq!(Decimal::new(0, 7), Decimal::ZERO);
    }

    #[test]
    fn test_ordering_across_scales() {
        let one = Decimal::new(1, 0);
        let one_tenth = Decimal::new(1, 1);
        let eleven_hundredths = Decimal::new(11, 2);
        let two = Decimal::new(2, 0);
        let eleven = Decimal::new(11, 0);

        assert!(one_tenth < eleven_hundredths);
        assert!(eleven_hundredths < one);
        assert!(one < two);
        assert!(two < eleven);
    }

    #[test]
    fn test_negative_ordering() {
        let minus_twelve = Decimal::new(-12, 0);
        let minus_two = Decimal::new(-2, 0);
        let minus_fifth = Decimal::new(-2, 1);

        assert!(minus_twelve < minus_two);
        assert!(minus_two < minus_fifth);
        assert!(minus_fifth < Decimal::ZERO);
        assert!(Decimal::ZERO < Decimal::new(2, 1));
    }

    #[test]
    fn test_prefix_magnitudes() {
        // 0.12 < 0.123, and -0.123 < -0.12
        assert!(Decimal::new(12, 2) < Decimal::new(123, 3));
        assert!(Decimal::new(-123, 3) < Decimal::new(-12, 2));
    }

    #[test]
    fn test_magnitude_parts_roundtrip() {
        for value in [
            Decimal::ZERO,
            Decimal::new(1, 0),
            Decimal::new(100, 0),
            Decimal::new(105, 1),
            Decimal::new(-95, 3),
            Decimal::new(i128::from(i64::MAX), 4),
        ] {
            let (exponent, digits) = value.magnitude_parts();
            let rebuilt =
                Decimal::from_magnitude_parts(value.signum() < 0, exponent, &digits).unwrap();
            assert_eq!(rebuilt, value, "roundtrip failed for {}", value);
        }
    }

    #[test]
    fn test_magnitude_parts_integral() {
        // 100 = 0.1 * 10^3
        let (exponent, digits) = Decimal::new(100, 0).magnitude_parts();
        assert_eq!(exponent, 3);
        assert_eq!(digits, vec![1]);
    }

    #[test]
    fn test_display() {
        assert_eq!(Decimal::new(105, 1).to_string(), "10.5");
        assert_eq!(Decimal::new(-95, 3).to_string(), "-0.095");
        assert_eq!(Decimal::new(42, 0).to_string(), "42");
    }
}
