//! Tri-state numeric values for ratios and gains that may be undefined.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Mul, Neg, Sub};

use serde::{Serialize, Serializer};

/// A derived quantity that is either a finite value, undefined (zero or
/// non-finite denominator), or not applicable (no population to compute over).
///
/// Arithmetic propagates the non-value states: `Undefined` dominates
/// `NotApplicable`, which dominates `Value`.
///
/// # Examples
///
/// ```
/// use ec_value_share::community::metric::Metric;
///
/// assert_eq!(Metric::ratio(3.0, 2.0), Metric::Value(1.5));
/// assert_eq!(Metric::ratio(3.0, 0.0), Metric::Undefined);
/// assert_eq!(Metric::Value(1.0) + Metric::Undefined, Metric::Undefined);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Metric {
    /// A finite value.
    Value(f64),
    /// The computation hit a zero denominator or produced a non-finite result.
    Undefined,
    /// There was nothing to compute the quantity over.
    NotApplicable,
}

/// How undefined per-record values enter a sum across records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UndefinedHandling {
    /// Any undefined term makes the sum undefined.
    #[default]
    Propagate,
    /// Undefined terms are left out of the sum.
    Skip,
}

impl Metric {
    /// Divides `num` by `den`, yielding `Undefined` for a zero denominator or a
    /// non-finite quotient.
    pub fn ratio(num: f64, den: f64) -> Self {
        if den == 0.0 {
            return Self::Undefined;
        }
        Self::from(num / den)
    }

    /// Returns the inner value when defined.
    pub fn value(self) -> Option<f64> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Returns `true` for `Metric::Value`.
    pub fn is_defined(self) -> bool {
        matches!(self, Self::Value(_))
    }

    /// Returns `true` for `Metric::Undefined`.
    pub fn is_undefined(self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// Applies `f` to a defined value; other states pass through.
    pub fn map(self, f: impl FnOnce(f64) -> f64) -> Self {
        match self {
            Self::Value(v) => Self::from(f(v)),
            other => other,
        }
    }

    /// Combines two metrics with `f` when both are defined.
    pub fn zip_with(self, other: Self, f: impl FnOnce(f64, f64) -> f64) -> Self {
        match (self, other) {
            (Self::Value(a), Self::Value(b)) => Self::from(f(a, b)),
            (Self::Undefined, _) | (_, Self::Undefined) => Self::Undefined,
            _ => Self::NotApplicable,
        }
    }

    /// Divides two metrics, yielding `Undefined` for a zero denominator.
    pub fn divide(self, den: Self) -> Self {
        match (self, den) {
            (Self::Value(a), Self::Value(b)) => Self::ratio(a, b),
            (Self::Undefined, _) | (_, Self::Undefined) => Self::Undefined,
            _ => Self::NotApplicable,
        }
    }

    /// Adds `other` into `self` under the given handling of undefined terms.
    pub fn accumulate(self, other: Self, handling: UndefinedHandling) -> Self {
        match (handling, other) {
            (UndefinedHandling::Skip, Self::Undefined) => self,
            _ => self + other,
        }
    }

    /// Formats with a fixed number of decimals, used by CSV export.
    pub fn to_fixed(self, decimals: usize) -> String {
        format!("{self:.decimals$}")
    }
}

impl Default for Metric {
    fn default() -> Self {
        Self::Value(0.0)
    }
}

impl From<f64> for Metric {
    fn from(v: f64) -> Self {
        if v.is_finite() {
            Self::Value(v)
        } else {
            Self::Undefined
        }
    }
}

impl Add for Metric {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.zip_with(rhs, |a, b| a + b)
    }
}

impl Sub for Metric {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self.zip_with(rhs, |a, b| a - b)
    }
}

impl Mul<f64> for Metric {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        self.map(|v| v * rhs)
    }
}

impl Neg for Metric {
    type Output = Self;

    fn neg(self) -> Self {
        self.map(|v| -v)
    }
}

impl Sum for Metric {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::Value(0.0), |acc, m| acc + m)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Value(v) => match f.precision() {
                Some(p) => format!("{v:.p$}"),
                None => v.to_string(),
            },
            Self::Undefined => "undefined".to_string(),
            Self::NotApplicable => "n/a".to_string(),
        };
        match f.width() {
            Some(w) => write!(f, "{text:>w$}"),
            None => f.write_str(&text),
        }
    }
}

impl Serialize for Metric {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Value(v) => serializer.serialize_f64(*v),
            Self::Undefined => serializer.serialize_str("undefined"),
            Self::NotApplicable => serializer.serialize_str("n/a"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_with_zero_denominator_is_undefined() {
        assert_eq!(Metric::ratio(1.0, 0.0), Metric::Undefined);
        assert_eq!(Metric::ratio(0.0, 0.0), Metric::Undefined);
        assert_eq!(Metric::ratio(0.0, 2.0), Metric::Value(0.0));
    }

    #[test]
    fn non_finite_values_become_undefined() {
        assert_eq!(Metric::from(f64::NAN), Metric::Undefined);
        assert_eq!(Metric::from(f64::INFINITY), Metric::Undefined);
        assert_eq!(Metric::ratio(f64::MAX, 1e-300), Metric::Undefined);
    }

    #[test]
    fn undefined_dominates_not_applicable() {
        assert_eq!(Metric::Undefined + Metric::NotApplicable, Metric::Undefined);
        assert_eq!(
            Metric::NotApplicable + Metric::Value(1.0),
            Metric::NotApplicable
        );
        assert_eq!(Metric::Value(2.0) - Metric::Value(0.5), Metric::Value(1.5));
    }

    #[test]
    fn sum_propagates_undefined() {
        let values = [Metric::Value(1.0), Metric::Undefined, Metric::Value(2.0)];
        assert_eq!(values.iter().copied().sum::<Metric>(), Metric::Undefined);
        let empty: [Metric; 0] = [];
        assert_eq!(empty.iter().copied().sum::<Metric>(), Metric::Value(0.0));
    }

    #[test]
    fn skip_handling_ignores_undefined_terms() {
        let acc = Metric::Value(1.0)
            .accumulate(Metric::Undefined, UndefinedHandling::Skip)
            .accumulate(Metric::Value(2.0), UndefinedHandling::Skip);
        assert_eq!(acc, Metric::Value(3.0));

        let propagate = UndefinedHandling::Propagate;
        let strict = Metric::Value(1.0).accumulate(Metric::Undefined, propagate);
        assert_eq!(strict, Metric::Undefined);
    }

    #[test]
    fn display_respects_precision() {
        assert_eq!(format!("{:.2}", Metric::Value(0.12345)), "0.12");
        assert_eq!(format!("{:.2}", Metric::Undefined), "undefined");
        assert_eq!(format!("{}", Metric::NotApplicable), "n/a");
        assert_eq!(format!("{:>6.1}", Metric::Value(2.0)), "   2.0");
    }

    #[test]
    fn divide_by_metric() {
        let four = Metric::Value(4.0);
        assert_eq!(four.divide(Metric::Value(2.0)), Metric::Value(2.0));
        assert_eq!(four.divide(Metric::Value(0.0)), Metric::Undefined);
        assert_eq!(Metric::Undefined.divide(four), Metric::Undefined);
    }
}
