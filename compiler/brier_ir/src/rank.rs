//! Operator and value ranks.
//!
//! Ranks live on a half-step ladder: scalar (0), row (0.5), column (1) and
//! table (1.5). They are stored as an enum so an out-of-ladder rank can never
//! be constructed; arithmetic on ranks is done in half steps.

use std::fmt;

/// Structural depth of a value or of an operator's input/output.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Rank {
    /// A single string or number (rank 0).
    Scalar,
    /// One dict / table row (rank 0.5).
    Row,
    /// A list / table column (rank 1).
    Column,
    /// A whole table (rank 1.5).
    Table,
}

/// Error for a numeric rank outside `{0, 0.5, 1, 1.5}`.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[error("unsupported rank {0}; expected one of 0, 0.5, 1, 1.5")]
pub struct InvalidRank(pub f64);

impl Rank {
    /// All ranks, lowest first.
    pub const ALL: [Rank; 4] = [Rank::Scalar, Rank::Row, Rank::Column, Rank::Table];

    /// Position on the ladder in half steps (scalar = 0, table = 3).
    #[inline]
    pub const fn half_steps(self) -> u8 {
        match self {
            Rank::Scalar => 0,
            Rank::Row => 1,
            Rank::Column => 2,
            Rank::Table => 3,
        }
    }

    /// Inverse of [`Rank::half_steps`]; `None` above the table rank.
    #[inline]
    pub const fn from_half_steps(steps: u8) -> Option<Rank> {
        match steps {
            0 => Some(Rank::Scalar),
            1 => Some(Rank::Row),
            2 => Some(Rank::Column),
            3 => Some(Rank::Table),
            _ => None,
        }
    }

    /// The rank as the number script authors write (`0`, `0.5`, `1`, `1.5`).
    pub fn as_f64(self) -> f64 {
        f64::from(self.half_steps()) / 2.0
    }

    /// Rank of a broadcast result.
    ///
    /// An operator `(rank_in → rank_out)` applied to an argument of rank
    /// `arg` (with `arg >= rank_in`) yields `rank_out + (arg - rank_in)`.
    /// Returns `None` when that lands above the table rank, or when `arg`
    /// is below `rank_in`.
    pub fn broadcast(rank_in: Rank, rank_out: Rank, arg: Rank) -> Option<Rank> {
        let lift = arg.half_steps().checked_sub(rank_in.half_steps())?;
        Rank::from_half_steps(rank_out.half_steps().checked_add(lift)?)
    }
}

impl TryFrom<f64> for Rank {
    type Error = InvalidRank;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Rank::ALL
            .into_iter()
            .find(|rank| rank.as_f64() == value)
            .ok_or(InvalidRank(value))
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rank::Scalar => write!(f, "0"),
            Rank::Row => write!(f, "0.5"),
            Rank::Column => write!(f, "1"),
            Rank::Table => write!(f, "1.5"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ladder_round_trips_through_half_steps() {
        for rank in Rank::ALL {
            assert_eq!(Rank::from_half_steps(rank.half_steps()), Some(rank));
        }
        assert_eq!(Rank::from_half_steps(4), None);
    }

    #[test]
    fn numeric_ranks() {
        assert_eq!(Rank::try_from(0.5), Ok(Rank::Row));
        assert_eq!(Rank::try_from(1.5), Ok(Rank::Table));
        assert_eq!(Rank::try_from(2.0), Err(InvalidRank(2.0)));
        assert_eq!(Rank::Column.to_string(), "1");
    }

    #[test]
    fn broadcast_rank_law() {
        // join: 1 -> 0 over a table lands on a row (dict)
        assert_eq!(
            Rank::broadcast(Rank::Column, Rank::Scalar, Rank::Table),
            Some(Rank::Row)
        );
        // row op 0.5 -> 0.5 over a table stays a table
        assert_eq!(
            Rank::broadcast(Rank::Row, Rank::Row, Rank::Table),
            Some(Rank::Table)
        );
        // 0 -> 1 over a table would need rank 2.5
        assert_eq!(Rank::broadcast(Rank::Scalar, Rank::Column, Rank::Table), None);
        // argument below rank_in
        assert_eq!(Rank::broadcast(Rank::Column, Rank::Scalar, Rank::Row), None);
    }
}
