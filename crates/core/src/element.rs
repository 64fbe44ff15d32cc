use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The kind of value an [`Element`] carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementType {
    Real,
    Integer,
    Ordinal,
    Nominal,
}

impl ElementType {
    /// Returns `true` for the discrete kinds (integer, ordinal, nominal).
    #[must_use]
    pub fn is_discrete(self) -> bool {
        !matches!(self, Self::Real)
    }
}

/// Errors raised by type-aware element arithmetic.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ElementError {
    #[error("nominal elements do not support arithmetic")]
    NominalOperation,

    #[error("ordinal elements do not support multiplication or division")]
    OrdinalOperation,

    #[error("division by zero")]
    DivisionByZero,
}

/// A typed scalar.
///
/// Real elements carry an `f64`; the discrete kinds carry an `i64`. Arithmetic
/// is fallible because not every kind supports every operation: nominal values
/// are labels, and ordinal values can only be shifted, not scaled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Element {
    Real(f64),
    Integer(i64),
    Ordinal(i64),
    Nominal(i64),
}

impl Element {
    /// Creates an element of the given kind from a numeric value.
    ///
    /// Discrete kinds truncate toward zero.
    #[must_use]
    pub fn of_type(kind: ElementType, value: f64) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        let int = value as i64;
        match kind {
            ElementType::Real => Self::Real(value),
            ElementType::Integer => Self::Integer(int),
            ElementType::Ordinal => Self::Ordinal(int),
            ElementType::Nominal => Self::Nominal(int),
        }
    }

    /// Returns the kind of this element.
    #[must_use]
    pub fn kind(&self) -> ElementType {
        match self {
            Self::Real(_) => ElementType::Real,
            Self::Integer(_) => ElementType::Integer,
            Self::Ordinal(_) => ElementType::Ordinal,
            Self::Nominal(_) => ElementType::Nominal,
        }
    }

    /// Returns the value as `f64`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn value(&self) -> f64 {
        match *self {
            Self::Real(v) => v,
            Self::Integer(v) | Self::Ordinal(v) | Self::Nominal(v) => v as f64,
        }
    }

    /// Returns the value as `i64`, truncating real values toward zero.
    #[must_use]
    pub fn as_integer(&self) -> i64 {
        match *self {
            #[allow(clippy::cast_possible_truncation)]
            Self::Real(v) => v as i64,
            Self::Integer(v) | Self::Ordinal(v) | Self::Nominal(v) => v,
        }
    }

    /// Returns a new element of the same kind holding `value`.
    #[must_use]
    pub fn with_value(&self, value: f64) -> Self {
        Self::of_type(self.kind(), value)
    }

    /// Returns the additive inverse.
    ///
    /// # Errors
    ///
    /// Returns [`ElementError::NominalOperation`] for nominal elements.
    pub fn negate(&self) -> Result<Self, ElementError> {
        match *self {
            Self::Real(v) => Ok(Self::Real(-v)),
            Self::Integer(v) => Ok(Self::Integer(-v)),
            Self::Ordinal(v) => Ok(Self::Ordinal(-v)),
            Self::Nominal(_) => Err(ElementError::NominalOperation),
        }
    }

    /// Adds two elements.
    ///
    /// # Errors
    ///
    /// Returns an error if either operand is nominal.
    pub fn checked_add(&self, other: &Self) -> Result<Self, ElementError> {
        self.combine(other, false, |a, b| a + b, i64::wrapping_add)
    }

    /// Subtracts `other` from this element.
    ///
    /// # Errors
    ///
    /// Returns an error if either operand is nominal.
    pub fn checked_sub(&self, other: &Self) -> Result<Self, ElementError> {
        self.combine(other, false, |a, b| a - b, i64::wrapping_sub)
    }

    /// Multiplies two elements.
    ///
    /// # Errors
    ///
    /// Returns an error if either operand is nominal or ordinal.
    pub fn checked_mul(&self, other: &Self) -> Result<Self, ElementError> {
        self.combine(other, true, |a, b| a * b, i64::wrapping_mul)
    }

    /// Divides this element by `other`.
    ///
    /// Integer division truncates toward zero.
    ///
    /// # Errors
    ///
    /// Returns an error if either operand is nominal or ordinal, or if `other`
    /// is zero.
    pub fn checked_div(&self, other: &Self) -> Result<Self, ElementError> {
        if other.value() == 0.0 {
            return Err(ElementError::DivisionByZero);
        }
        self.combine(other, true, |a, b| a / b, i64::wrapping_div)
    }

    fn combine(
        &self,
        other: &Self,
        scaling: bool,
        real_op: impl Fn(f64, f64) -> f64,
        int_op: impl Fn(i64, i64) -> i64,
    ) -> Result<Self, ElementError> {
        for operand in [self, other] {
            match operand {
                Self::Nominal(_) => return Err(ElementError::NominalOperation),
                Self::Ordinal(_) if scaling => return Err(ElementError::OrdinalOperation),
                _ => {}
            }
        }

        if matches!(self, Self::Real(_)) || matches!(other, Self::Real(_)) {
            return Ok(Self::Real(real_op(self.value(), other.value())));
        }

        let value = int_op(self.as_integer(), other.as_integer());
        Ok(match self {
            Self::Ordinal(_) => Self::Ordinal(value),
            _ => Self::Integer(value),
        })
    }
}

impl Default for Element {
    fn default() -> Self {
        Self::Real(0.0)
    }
}

impl PartialOrd for Element {
    /// Three-valued comparison.
    ///
    /// Nominal values are unordered labels: comparing one against anything
    /// returns `Some(Equal)` when the values match and `None` otherwise.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        let nominal = matches!(self, Self::Nominal(_)) || matches!(other, Self::Nominal(_));
        if nominal {
            return (self.as_integer() == other.as_integer() && self.kind() == other.kind())
                .then_some(Ordering::Equal);
        }
        self.value().partial_cmp(&other.value())
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Real(v) => write!(f, "{v}"),
            Self::Integer(v) | Self::Ordinal(v) | Self::Nominal(v) => write!(f, "{v}"),
        }
    }
}

impl From<f64> for Element {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<i64> for Element {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    #[test]
    fn mixed_arithmetic_promotes_to_real() {
        let sum = Element::Integer(2).checked_add(&Element::Real(0.5)).unwrap();
        assert_eq!(sum.kind(), ElementType::Real);
        assert_relative_eq!(sum.value(), 2.5);

        let product = Element::Real(1.5).checked_mul(&Element::Integer(4)).unwrap();
        assert_relative_eq!(product.value(), 6.0);
    }

    #[test]
    fn integer_arithmetic_stays_integer() {
        let quotient = Element::Integer(7).checked_div(&Element::Integer(2)).unwrap();
        assert_eq!(quotient, Element::Integer(3));
    }

    #[test]
    fn ordinal_can_shift_but_not_scale() {
        let shifted = Element::Ordinal(3).checked_add(&Element::Integer(1)).unwrap();
        assert_eq!(shifted, Element::Ordinal(4));

        assert_eq!(
            Element::Ordinal(3).checked_mul(&Element::Integer(2)),
            Err(ElementError::OrdinalOperation)
        );
    }

    #[test]
    fn nominal_rejects_arithmetic() {
        assert_eq!(
            Element::Nominal(1).checked_add(&Element::Integer(1)),
            Err(ElementError::NominalOperation)
        );
        assert_eq!(Element::Nominal(1).negate(), Err(ElementError::NominalOperation));
    }

    #[test]
    fn division_by_zero_is_reported() {
        assert_eq!(
            Element::Real(1.0).checked_div(&Element::Real(0.0)),
            Err(ElementError::DivisionByZero)
        );
    }

    #[test]
    fn nominal_comparison_is_undefined_unless_equal() {
        assert_eq!(
            Element::Nominal(2).partial_cmp(&Element::Nominal(2)),
            Some(Ordering::Equal)
        );
        assert_eq!(Element::Nominal(2).partial_cmp(&Element::Nominal(3)), None);
        assert_eq!(Element::Nominal(2).partial_cmp(&Element::Integer(2)), None);
        assert!(Element::Integer(2) < Element::Real(2.5));
    }
}
