use derive_more::{Add, AddAssign, Deref, Display, Neg, Sub, SubAssign};
use serde::{Deserialize, Serialize};

macro_rules! wrapped_type {
    ($name:ident, $inner:ty $(, $extra:ident)*) => {
        #[derive(
            Debug,
            Default,
            Clone,
            Copy,
            Display,
            Deserialize,
            Serialize,
            Deref,
            Add,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            Sub,
            AddAssign,
            SubAssign,
            $($extra),*
        )]
        #[serde(transparent)]
        pub struct $name($inner);

        impl $name {
            pub const fn new(value: $inner) -> Self {
                Self(value)
            }

            pub fn saturating_add(self, other: Self) -> Self {
                Self(self.0.saturating_add(other.0))
            }
        }
    };
}

wrapped_type!(Level, u16);
wrapped_type!(Weight, u32);
wrapped_type!(Quantity, u32);
wrapped_type!(AbilityScore, i16, Neg);
wrapped_type!(AbilityModifier, i16, Neg);
wrapped_type!(HitPoints, i16, Neg);
wrapped_type!(WillpowerPoints, i16, Neg);
wrapped_type!(DefenseValue, i16, Neg);
wrapped_type!(DamageReduction, i16, Neg);
wrapped_type!(EvasionPenalty, i16, Neg);
wrapped_type!(Hardness, i16, Neg);

impl AbilityScore {
    /// `floor((score - 10) / 2)`, rounding toward negative infinity.
    pub fn modifier(&self) -> AbilityModifier {
        AbilityModifier((i32::from(self.0) - 10).div_euclid(2) as i16)
    }
}

impl From<AbilityModifier> for HitPoints {
    fn from(value: AbilityModifier) -> Self {
        Self(*value)
    }
}

impl From<AbilityModifier> for WillpowerPoints {
    fn from(value: AbilityModifier) -> Self {
        Self(*value)
    }
}

impl From<AbilityModifier> for DefenseValue {
    fn from(value: AbilityModifier) -> Self {
        Self(*value)
    }
}

impl Level {
    /// Levels below one are treated as level one.
    pub fn normalized(&self) -> Self {
        Self(self.0.max(1))
    }
}
