//! Sign-lattice classification of analysis confidence.
//!
//! The analysis engine reports per-fact confidence values for the three base
//! facts `{==0, >0, <0}` plus a separate `emptyset` channel. Reporting paths
//! collapse a [`ConfidenceVector`] into one [`SignLatticeElement`] at a
//! caller-chosen [`Threshold`]; the element is recomputed on demand and never
//! treated as the canonical stored value.

use serde::{Deserialize, Serialize};

use crate::domain::errors::LatticeError;

/// A validated confidence threshold in `1..=100`.
///
/// Constructing the threshold once up front means [`ConfidenceVector::resolve`]
/// is total: the `threshold > 0` precondition cannot be violated at the call
/// site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Threshold(u8);

impl Threshold {
    /// Full confidence. Used as the baseline when reporting how many extra
    /// specifications a lower threshold surfaces.
    pub const MAX: Self = Self(100);

    pub fn new(value: u8) -> Result<Self, LatticeError> {
        if value == 0 || value > 100 {
            return Err(LatticeError::InvalidThreshold(value));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Threshold {
    type Error = LatticeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Threshold> for u8 {
    fn from(threshold: Threshold) -> Self {
        threshold.0
    }
}

impl std::fmt::Display for Threshold {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-base-fact belief strength in `[0, 100]`.
///
/// The three sign channels are independent; `emptyset` is an out-of-band
/// fourth channel meaning "provably no error values" and only participates in
/// resolution when every sign channel is below threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceVector {
    pub zero: u8,
    pub less_than_zero: u8,
    pub greater_than_zero: u8,
    pub emptyset: u8,
}

impl ConfidenceVector {
    /// Collapse this vector into a lattice element at `threshold`.
    ///
    /// Each base fact is "confidently true" iff its channel is at or above
    /// the threshold. The true facts select their join in the powerset
    /// lattice over `{<0, ==0, >0}`. An all-false mask is `Bottom` unless the
    /// emptyset channel clears the threshold, in which case it is `Emptyset`;
    /// the two share the zero mask and are disambiguated only here.
    pub fn resolve(&self, threshold: Threshold) -> SignLatticeElement {
        let t = threshold.value();
        let mut mask = 0u8;
        if self.zero >= t {
            mask |= 0b100;
        }
        if self.greater_than_zero >= t {
            mask |= 0b010;
        }
        if self.less_than_zero >= t {
            mask |= 0b001;
        }

        if mask == 0 && self.emptyset >= t {
            return SignLatticeElement::Emptyset;
        }

        match mask {
            0b000 => SignLatticeElement::Bottom,
            0b001 => SignLatticeElement::LessThanZero,
            0b010 => SignLatticeElement::GreaterThanZero,
            0b011 => SignLatticeElement::NotZero,
            0b100 => SignLatticeElement::Zero,
            0b101 => SignLatticeElement::LessThanEqualZero,
            0b110 => SignLatticeElement::GreaterThanEqualZero,
            _ => SignLatticeElement::Top,
        }
    }
}

/// One of the nine discrete classifications downstream reporting consumes.
///
/// Eight elements form the powerset lattice over `{<0, ==0, >0}` ordered by
/// inclusion; `Emptyset` is the out-of-band ninth value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignLatticeElement {
    Bottom,
    LessThanZero,
    GreaterThanZero,
    NotZero,
    Zero,
    LessThanEqualZero,
    GreaterThanEqualZero,
    Top,
    Emptyset,
}

impl SignLatticeElement {
    /// Every element, in reporting order.
    pub const ALL: [Self; 9] = [
        Self::LessThanZero,
        Self::GreaterThanZero,
        Self::Zero,
        Self::LessThanEqualZero,
        Self::GreaterThanEqualZero,
        Self::NotZero,
        Self::Top,
        Self::Emptyset,
        Self::Bottom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bottom => "bottom",
            Self::LessThanZero => "<0",
            Self::GreaterThanZero => ">0",
            Self::NotZero => "!=0",
            Self::Zero => "==0",
            Self::LessThanEqualZero => "<=0",
            Self::GreaterThanEqualZero => ">=0",
            Self::Top => "top",
            Self::Emptyset => "emptyset",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "bottom" => Some(Self::Bottom),
            "<0" => Some(Self::LessThanZero),
            ">0" => Some(Self::GreaterThanZero),
            "!=0" => Some(Self::NotZero),
            // Leading quote appears in hand-written specification files to
            // keep spreadsheet tools from eating the `==`.
            "==0" | "'==0" => Some(Self::Zero),
            "<=0" => Some(Self::LessThanEqualZero),
            ">=0" => Some(Self::GreaterThanEqualZero),
            "top" => Some(Self::Top),
            "emptyset" => Some(Self::Emptyset),
            _ => None,
        }
    }

    /// The canonical full-confidence vector that resolves back to this
    /// element at any threshold. Used when injecting hand-written
    /// specifications that carry no measured confidence.
    pub fn canonical_confidence(&self) -> ConfidenceVector {
        let (less_than_zero, zero, greater_than_zero, emptyset) = match self {
            Self::Bottom => (0, 0, 0, 0),
            Self::LessThanZero => (100, 0, 0, 0),
            Self::GreaterThanZero => (0, 0, 100, 0),
            Self::NotZero => (100, 0, 100, 0),
            Self::Zero => (0, 100, 0, 0),
            Self::LessThanEqualZero => (100, 100, 0, 0),
            Self::GreaterThanEqualZero => (0, 100, 100, 0),
            Self::Top => (100, 100, 100, 0),
            Self::Emptyset => (0, 0, 0, 100),
        };
        ConfidenceVector {
            zero,
            less_than_zero,
            greater_than_zero,
            emptyset,
        }
    }
}

impl std::fmt::Display for SignLatticeElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn threshold(value: u8) -> Threshold {
        Threshold::new(value).unwrap()
    }

    #[test]
    fn threshold_rejects_out_of_range() {
        assert!(Threshold::new(0).is_err());
        assert!(Threshold::new(101).is_err());
        assert!(Threshold::new(1).is_ok());
        assert!(Threshold::new(100).is_ok());
    }

    #[test]
    fn full_zero_confidence_resolves_to_zero() {
        let vector = ConfidenceVector {
            zero: 100,
            ..Default::default()
        };
        assert_eq!(vector.resolve(threshold(50)), SignLatticeElement::Zero);
    }

    #[test]
    fn emptyset_channel_disambiguates_all_false_mask() {
        let vector = ConfidenceVector {
            emptyset: 80,
            ..Default::default()
        };
        assert_eq!(vector.resolve(threshold(50)), SignLatticeElement::Emptyset);
        assert_eq!(vector.resolve(threshold(90)), SignLatticeElement::Bottom);
    }

    #[test]
    fn emptyset_channel_ignored_when_any_sign_bit_set() {
        let vector = ConfidenceVector {
            less_than_zero: 100,
            emptyset: 100,
            ..Default::default()
        };
        assert_eq!(
            vector.resolve(threshold(50)),
            SignLatticeElement::LessThanZero
        );
    }

    #[test]
    fn joined_facts_select_lattice_join() {
        let vector = ConfidenceVector {
            zero: 100,
            less_than_zero: 100,
            ..Default::default()
        };
        assert_eq!(
            vector.resolve(threshold(50)),
            SignLatticeElement::LessThanEqualZero
        );

        let vector = ConfidenceVector {
            zero: 75,
            less_than_zero: 80,
            greater_than_zero: 90,
            emptyset: 0,
        };
        assert_eq!(vector.resolve(threshold(75)), SignLatticeElement::Top);
        assert_eq!(
            vector.resolve(threshold(80)),
            SignLatticeElement::GreaterThanEqualZero
        );
        assert_eq!(
            vector.resolve(threshold(90)),
            SignLatticeElement::GreaterThanZero
        );
        assert_eq!(vector.resolve(threshold(100)), SignLatticeElement::Bottom);
    }

    #[test]
    fn boundary_is_inclusive() {
        let vector = ConfidenceVector {
            greater_than_zero: 50,
            ..Default::default()
        };
        assert_eq!(
            vector.resolve(threshold(50)),
            SignLatticeElement::GreaterThanZero
        );
        assert_eq!(vector.resolve(threshold(51)), SignLatticeElement::Bottom);
    }

    #[test]
    fn canonical_confidence_round_trips_at_max_threshold() {
        for element in SignLatticeElement::ALL {
            if element == SignLatticeElement::Bottom {
                continue;
            }
            assert_eq!(
                element.canonical_confidence().resolve(Threshold::MAX),
                element,
                "canonical vector for {element} did not round-trip"
            );
        }
    }

    #[test]
    fn string_forms_round_trip() {
        for element in SignLatticeElement::ALL {
            assert_eq!(
                SignLatticeElement::from_str(element.as_str()),
                Some(element)
            );
        }
        assert_eq!(
            SignLatticeElement::from_str("'==0"),
            Some(SignLatticeElement::Zero)
        );
        assert_eq!(SignLatticeElement::from_str("garbage"), None);
    }
}
