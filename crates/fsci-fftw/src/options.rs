//! Typed wrappers around the engine's direction codes, planner flags and
//! real-to-real kind codes.

use std::fmt::{Display, Formatter};
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

/// Sign of the exponent in a complex transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    /// Engine sign constant: `-1` forward, `+1` backward.
    #[must_use]
    pub const fn sign(self) -> i32 {
        match self {
            Self::Forward => -1,
            Self::Backward => 1,
        }
    }

    #[must_use]
    pub const fn reversed(self) -> Self {
        match self {
            Self::Forward => Self::Backward,
            Self::Backward => Self::Forward,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Forward => "forward",
            Self::Backward => "backward",
        }
    }
}

/// Planner effort implied by a [`Flag`], ordered from cheapest to most thorough.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rigor {
    Estimate,
    Measure,
    Patient,
    Exhaustive,
}

impl Rigor {
    /// Timed repetitions per candidate recipe while measuring.
    #[must_use]
    pub const fn repetitions(self) -> usize {
        match self {
            Self::Estimate => 0,
            Self::Measure => 1,
            Self::Patient => 3,
            Self::Exhaustive => 5,
        }
    }
}

/// Planner option bit-set.
///
/// Flags compose with `|`; the composition is the bitwise-or monoid of the
/// engine, with [`Flag::MEASURE`] as its identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Flag(u32);

impl Flag {
    pub const MEASURE: Self = Self(0);
    pub const DESTROY_INPUT: Self = Self(1);
    pub const UNALIGNED: Self = Self(1 << 1);
    pub const EXHAUSTIVE: Self = Self(1 << 3);
    pub const PRESERVE_INPUT: Self = Self(1 << 4);
    pub const PATIENT: Self = Self(1 << 5);
    pub const ESTIMATE: Self = Self(1 << 6);
    pub const WISDOM_ONLY: Self = Self(1 << 21);

    const RIGOR_BITS: u32 = Self::ESTIMATE.0 | Self::PATIENT.0 | Self::EXHAUSTIVE.0;
    const PROBLEM_BITS: u32 = Self::DESTROY_INPUT.0 | Self::PRESERVE_INPUT.0 | Self::UNALIGNED.0;

    const NAMES: [(Self, &'static str); 7] = [
        (Self::ESTIMATE, "estimate"),
        (Self::PATIENT, "patient"),
        (Self::EXHAUSTIVE, "exhaustive"),
        (Self::WISDOM_ONLY, "wisdom_only"),
        (Self::DESTROY_INPUT, "destroy_input"),
        (Self::PRESERVE_INPUT, "preserve_input"),
        (Self::UNALIGNED, "unaligned"),
    ];

    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Planner effort. Estimate takes precedence over the measuring modes,
    /// and the most thorough measuring bit wins among the rest.
    #[must_use]
    pub const fn rigor(self) -> Rigor {
        if self.0 & Self::ESTIMATE.0 != 0 {
            Rigor::Estimate
        } else if self.0 & Self::EXHAUSTIVE.0 != 0 {
            Rigor::Exhaustive
        } else if self.0 & Self::PATIENT.0 != 0 {
            Rigor::Patient
        } else {
            Rigor::Measure
        }
    }

    #[must_use]
    pub const fn is_wisdom_only(self) -> bool {
        self.0 & Self::WISDOM_ONLY.0 != 0
    }

    #[must_use]
    pub const fn with_wisdom_only(self) -> Self {
        Self(self.0 | Self::WISDOM_ONLY.0)
    }

    #[must_use]
    pub const fn without_wisdom_only(self) -> Self {
        Self(self.0 & !Self::WISDOM_ONLY.0)
    }

    /// Bits that change the planned problem rather than the planner effort.
    #[must_use]
    pub const fn problem_bits(self) -> Self {
        Self(self.0 & Self::PROBLEM_BITS)
    }

    /// Same options with the effort replaced by `rigor`.
    #[must_use]
    pub const fn with_rigor(self, rigor: Rigor) -> Self {
        let base = self.0 & !Self::RIGOR_BITS;
        let bits = match rigor {
            Rigor::Estimate => Self::ESTIMATE.0,
            Rigor::Measure => Self::MEASURE.0,
            Rigor::Patient => Self::PATIENT.0,
            Rigor::Exhaustive => Self::EXHAUSTIVE.0,
        };
        Self(base | bits)
    }
}

impl BitOr for Flag {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Flag {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl Display for Flag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut names = Self::NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect::<Vec<_>>();
        if self.rigor() == Rigor::Measure {
            names.insert(0, "measure");
        }
        write!(f, "{}", names.join("|"))
    }
}

/// Real-to-real transform kind applied along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Kind {
    /// Real input to half-complex output.
    R2hc,
    /// Half-complex input to real output.
    Hc2r,
    /// Discrete Hartley transform.
    Dht,
    /// DCT-I (REDFT00).
    DctI,
    /// DCT-II (REDFT10).
    DctII,
    /// DCT-III (REDFT01).
    DctIII,
    /// DCT-IV (REDFT11).
    DctIV,
    /// DST-I (RODFT00).
    DstI,
    /// DST-II (RODFT10).
    DstII,
    /// DST-III (RODFT01).
    DstIII,
    /// DST-IV (RODFT11).
    DstIV,
}

impl Kind {
    pub const ALL: [Self; 11] = [
        Self::R2hc,
        Self::Hc2r,
        Self::Dht,
        Self::DctI,
        Self::DctII,
        Self::DctIII,
        Self::DctIV,
        Self::DstI,
        Self::DstII,
        Self::DstIII,
        Self::DstIV,
    ];

    /// Half-complex kind matching a direction: forward packs, backward unpacks.
    #[must_use]
    pub const fn half_complex(direction: Direction) -> Self {
        match direction {
            Direction::Forward => Self::R2hc,
            Direction::Backward => Self::Hc2r,
        }
    }

    /// Engine `r2r_kind` code.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::R2hc => 0,
            Self::Hc2r => 1,
            Self::Dht => 2,
            Self::DctI => 3,
            Self::DctIII => 4,
            Self::DctII => 5,
            Self::DctIV => 6,
            Self::DstI => 7,
            Self::DstIII => 8,
            Self::DstII => 9,
            Self::DstIV => 10,
        }
    }

    #[must_use]
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.code() == code)
    }

    /// Kind whose unnormalized transform undoes this one up to
    /// [`Kind::logical_dimension`].
    #[must_use]
    pub const fn inverse(self) -> Self {
        match self {
            Self::R2hc => Self::Hc2r,
            Self::Hc2r => Self::R2hc,
            Self::DctII => Self::DctIII,
            Self::DctIII => Self::DctII,
            Self::DstII => Self::DstIII,
            Self::DstIII => Self::DstII,
            Self::Dht | Self::DctI | Self::DctIV | Self::DstI | Self::DstIV => self,
        }
    }

    /// This kind when running forward, its inverse when running backward.
    #[must_use]
    pub const fn for_direction(self, direction: Direction) -> Self {
        match direction {
            Direction::Forward => self,
            Direction::Backward => self.inverse(),
        }
    }

    /// Size of the implied periodic extension, used for normalization.
    ///
    /// `n` is the number of stored samples along the axis.
    #[must_use]
    pub const fn logical_dimension(self, n: usize) -> usize {
        match self {
            Self::R2hc | Self::Hc2r | Self::Dht => n,
            Self::DctI => 2 * (n - 1),
            Self::DstI => 2 * (n + 1),
            Self::DctII | Self::DctIII | Self::DctIV | Self::DstII | Self::DstIII | Self::DstIV => {
                2 * n
            }
        }
    }

    /// Smallest axis length the kind is defined for.
    #[must_use]
    pub const fn min_len(self) -> usize {
        match self {
            Self::DctI => 2,
            _ => 1,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::R2hc => "r2hc",
            Self::Hc2r => "hc2r",
            Self::Dht => "dht",
            Self::DctI => "redft00",
            Self::DctII => "redft10",
            Self::DctIII => "redft01",
            Self::DctIV => "redft11",
            Self::DstI => "rodft00",
            Self::DstII => "rodft10",
            Self::DstIII => "rodft01",
            Self::DstIV => "rodft11",
        }
    }
}

/// Expand per-axis kinds to `rank` entries by repeating the last one.
///
/// # Panics
///
/// Panics if `kinds` is empty or longer than `rank`.
#[must_use]
pub fn expand_kinds(kinds: &[Kind], rank: usize) -> Vec<Kind> {
    assert!(!kinds.is_empty(), "real-to-real plans need at least one kind");
    assert!(
        kinds.len() <= rank,
        "got {} kinds for a rank-{rank} transform",
        kinds.len()
    );
    let last = kinds[kinds.len() - 1];
    kinds
        .iter()
        .copied()
        .chain(std::iter::repeat(last))
        .take(rank)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{Direction, Flag, Kind, Rigor, expand_kinds};

    #[test]
    fn flag_composition_is_an_idempotent_commutative_monoid() {
        let a = Flag::PATIENT;
        let b = Flag::UNALIGNED;
        let c = Flag::DESTROY_INPUT;
        assert_eq!(a | b, b | a);
        assert_eq!((a | b) | c, a | (b | c));
        assert_eq!(a | a, a);
        assert_eq!(a | Flag::MEASURE, a);
    }

    #[test]
    fn rigor_follows_engine_precedence() {
        assert_eq!(Flag::MEASURE.rigor(), Rigor::Measure);
        assert_eq!(Flag::ESTIMATE.rigor(), Rigor::Estimate);
        assert_eq!((Flag::ESTIMATE | Flag::EXHAUSTIVE).rigor(), Rigor::Estimate);
        assert_eq!((Flag::PATIENT | Flag::EXHAUSTIVE).rigor(), Rigor::Exhaustive);
        assert_eq!(Flag::WISDOM_ONLY.rigor(), Rigor::Measure);
        assert!(Rigor::Patient > Rigor::Measure);
    }

    #[test]
    fn with_rigor_keeps_problem_bits() {
        let flag = (Flag::PATIENT | Flag::UNALIGNED).with_rigor(Rigor::Estimate);
        assert_eq!(flag, Flag::ESTIMATE | Flag::UNALIGNED);
        assert_eq!(flag.problem_bits(), Flag::UNALIGNED);
        assert!(Flag::PATIENT.with_wisdom_only().is_wisdom_only());
        assert_eq!(
            Flag::PATIENT.with_wisdom_only().without_wisdom_only(),
            Flag::PATIENT
        );
    }

    #[test]
    fn flag_display_lists_set_options() {
        assert_eq!(Flag::MEASURE.to_string(), "measure");
        assert_eq!((Flag::PATIENT | Flag::WISDOM_ONLY).to_string(), "patient|wisdom_only");
    }

    #[test]
    fn direction_signs_match_engine_constants() {
        assert_eq!(Direction::Forward.sign(), -1);
        assert_eq!(Direction::Backward.sign(), 1);
        assert_eq!(Kind::half_complex(Direction::Forward), Kind::R2hc);
        assert_eq!(Kind::half_complex(Direction::Backward), Kind::Hc2r);
    }

    #[test]
    fn logical_dimension_table() {
        let n = 9;
        assert_eq!(Kind::R2hc.logical_dimension(n), n);
        assert_eq!(Kind::Hc2r.logical_dimension(n), n);
        assert_eq!(Kind::Dht.logical_dimension(n), n);
        assert_eq!(Kind::DctI.logical_dimension(n), 2 * (n - 1));
        assert_eq!(Kind::DstI.logical_dimension(n), 2 * (n + 1));
        for kind in [
            Kind::DctII,
            Kind::DctIII,
            Kind::DctIV,
            Kind::DstII,
            Kind::DstIII,
            Kind::DstIV,
        ] {
            assert_eq!(kind.logical_dimension(n), 2 * n, "{kind:?}");
        }
    }

    #[test]
    fn inverse_is_an_involution_and_codes_roundtrip() {
        for kind in Kind::ALL {
            assert_eq!(kind.inverse().inverse(), kind);
            assert_eq!(Kind::from_code(kind.code()), Some(kind));
            assert_eq!(kind.for_direction(Direction::Backward), kind.inverse());
        }
        assert_eq!(Kind::DctII.inverse(), Kind::DctIII);
        assert_eq!(Kind::from_code(11), None);
    }

    #[test]
    fn kinds_expand_by_repeating_last() {
        assert_eq!(
            expand_kinds(&[Kind::DctII, Kind::Dht], 4),
            vec![Kind::DctII, Kind::Dht, Kind::Dht, Kind::Dht]
        );
    }

    #[test]
    #[should_panic(expected = "kinds for a rank-1 transform")]
    fn too_many_kinds_is_a_contract_violation() {
        let _ = expand_kinds(&[Kind::DctII, Kind::Dht], 1);
    }
}
