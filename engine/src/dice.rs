//! Dice primitives for the Mäxchen engine.
//!
//! A turn's roll is two d6 reported high-face-first, collapsed into a
//! two-digit value (`high * 10 + low`). The 21 distinct unordered pairs form
//! a fixed ranking: Mäxchen (2-1) beats everything, doubles beat every
//! non-double, and within each band a higher value beats a lower one.

use rand::Rng;

/// The value of the top-ranked special pair.
pub const MAEXCHEN: u8 = 21;

/// All rankable outcomes, lowest first.
pub const ROLL_ORDER: [u8; 21] = [
    31, 32, 41, 42, 43, 51, 52, 53, 54, 61, 62, 63, 64, 65, // non-doubles
    11, 22, 33, 44, 55, 66, // doubles
    MAEXCHEN,
];

/// A canonicalized pair of dice: `d1` is always the higher face.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DiceRoll {
    pub d1: u8,
    pub d2: u8,
}

impl DiceRoll {
    /// Canonicalize two faces so the higher one is reported first.
    pub fn new(a: u8, b: u8) -> Self {
        Self {
            d1: a.max(b),
            d2: a.min(b),
        }
    }

    /// The comparable two-digit value of this roll.
    pub fn value(&self) -> u8 {
        self.d1 * 10 + self.d2
    }

    pub fn is_maexchen(&self) -> bool {
        self.value() == MAEXCHEN
    }

    pub fn is_double(&self) -> bool {
        self.d1 == self.d2
    }
}

/// Roll two independent uniform d6. Server-side only; a client-submitted
/// roll is never trusted.
pub fn roll_dice<R: Rng>(rng: &mut R) -> DiceRoll {
    let a = rng.gen_range(1..=6);
    let b = rng.gen_range(1..=6);
    DiceRoll::new(a, b)
}

/// Rank of an outcome value within [`ROLL_ORDER`], or `None` if the value is
/// not one of the 21 outcomes.
pub fn rank(value: u8) -> Option<usize> {
    ROLL_ORDER.iter().position(|&v| v == value)
}

/// Whether outcome `a` ranks strictly above outcome `b`. Unknown values never
/// outrank anything.
pub fn outranks(a: u8, b: u8) -> bool {
    match (rank(a), rank(b)) {
        (Some(ra), Some(rb)) => ra > rb,
        _ => false,
    }
}

/// Display name of an outcome: "Mäxchen" for the special pair, "Pair of N"
/// for doubles, the two digits otherwise.
pub fn outcome_name(value: u8) -> String {
    if value == MAEXCHEN {
        return "Mäxchen".to_string();
    }
    let (high, low) = (value / 10, value % 10);
    if high == low {
        format!("Pair of {high}")
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn roll_order_has_21_distinct_outcomes() {
        let mut seen = std::collections::HashSet::new();
        for value in ROLL_ORDER {
            assert!(seen.insert(value), "duplicate outcome {value}");
            let (high, low) = (value / 10, value % 10);
            assert!((1..=6).contains(&high));
            assert!((1..=6).contains(&low));
            assert!(high >= low || value == MAEXCHEN);
        }
        assert_eq!(seen.len(), 21);
    }

    #[test]
    fn maexchen_outranks_everything() {
        for value in ROLL_ORDER {
            if value != MAEXCHEN {
                assert!(outranks(MAEXCHEN, value), "21 must beat {value}");
                assert!(!outranks(value, MAEXCHEN));
            }
        }
    }

    #[test]
    fn doubles_outrank_non_doubles() {
        let doubles = [11, 22, 33, 44, 55, 66];
        for d in doubles {
            for value in ROLL_ORDER {
                let is_double = value / 10 == value % 10;
                if !is_double && value != MAEXCHEN {
                    assert!(outranks(d, value), "{d} must beat {value}");
                }
            }
        }
        // Within the bands, numeric order decides.
        assert!(outranks(66, 11));
        assert!(outranks(43, 42));
        assert!(!outranks(31, 32));
    }

    #[test]
    fn unknown_values_never_rank() {
        for value in [0, 12, 13, 24, 67, 70, 99] {
            assert_eq!(rank(value), None);
            assert!(!outranks(value, 31));
            assert!(!outranks(MAEXCHEN, value));
        }
    }

    #[test]
    fn names() {
        assert_eq!(outcome_name(MAEXCHEN), "Mäxchen");
        assert_eq!(outcome_name(44), "Pair of 4");
        assert_eq!(outcome_name(53), "53");
    }

    #[test]
    fn rolls_are_canonical() {
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..1000 {
            let roll = roll_dice(&mut rng);
            assert!((1..=6).contains(&roll.d1));
            assert!((1..=6).contains(&roll.d2));
            assert!(roll.d1 >= roll.d2);
            assert_eq!(roll.value(), roll.d1 * 10 + roll.d2);
            assert!(rank(roll.value()).is_some(), "{} must rank", roll.value());
        }
    }

    proptest! {
        #[test]
        fn any_face_pair_ranks(a in 1u8..=6, b in 1u8..=6) {
            let roll = DiceRoll::new(a, b);
            prop_assert!(roll.d1 >= roll.d2);
            prop_assert!(rank(roll.value()).is_some());
        }

        #[test]
        fn ranking_is_antisymmetric(a in 0usize..21, b in 0usize..21) {
            let (va, vb) = (ROLL_ORDER[a], ROLL_ORDER[b]);
            if va != vb {
                prop_assert!(outranks(va, vb) != outranks(vb, va));
            } else {
                prop_assert!(!outranks(va, vb));
            }
        }
    }
}
