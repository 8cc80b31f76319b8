//! Score bands and the scoring result.

use serde::{Deserialize, Serialize};

use super::penalty::Penalty;

/// Seven fixed, non-overlapping score ranges
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    StronglySupported,
    Supported,
    Plausible,
    Mixed,
    WeaklySupported,
    MostlyFalse,
    False,
}

impl ScoreBand {
    pub const ALL: [ScoreBand; 7] = [
        Self::StronglySupported,
        Self::Supported,
        Self::Plausible,
        Self::Mixed,
        Self::WeaklySupported,
        Self::MostlyFalse,
        Self::False,
    ];

    /// Step function over the final score
    pub fn from_score(score: u8) -> Self {
        match score {
            90.. => Self::StronglySupported,
            75..=89 => Self::Supported,
            60..=74 => Self::Plausible,
            45..=59 => Self::Mixed,
            30..=44 => Self::WeaklySupported,
            15..=29 => Self::MostlyFalse,
            _ => Self::False,
        }
    }

    /// Lowest score that falls in this band
    pub fn lower_bound(&self) -> u8 {
        match self {
            Self::StronglySupported => 90,
            Self::Supported => 75,
            Self::Plausible => 60,
            Self::Mixed => 45,
            Self::WeaklySupported => 30,
            Self::MostlyFalse => 15,
            Self::False => 0,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Self::StronglySupported => "strongly_supported",
            Self::Supported => "supported",
            Self::Plausible => "plausible",
            Self::Mixed => "mixed",
            Self::WeaklySupported => "weakly_supported",
            Self::MostlyFalse => "mostly_false",
            Self::False => "false",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::StronglySupported => "Strongly Supported",
            Self::Supported => "Supported",
            Self::Plausible => "Plausible",
            Self::Mixed => "Mixed",
            Self::WeaklySupported => "Weakly Supported",
            Self::MostlyFalse => "Mostly False",
            Self::False => "False",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::StronglySupported => {
                "Multiple high-quality, independent sources consistently back this claim."
            }
            Self::Supported => "The available evidence generally backs this claim.",
            Self::Plausible => {
                "The claim is reasonable but depends on caveats or incomplete evidence."
            }
            Self::Mixed => "Credible evidence exists on both sides of this claim.",
            Self::WeaklySupported => "Little reliable, independent evidence backs this claim.",
            Self::MostlyFalse => "Most of the available evidence runs against this claim.",
            Self::False => "The available evidence contradicts this claim.",
        }
    }
}

/// Outcome of the scoring stage; a pure function of its inputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringResult {
    pub initial_score: i32,
    pub penalties: Vec<Penalty>,
    pub total_penalty_weight: u32,
    pub corroboration_bonus: i32,
    /// Score after penalties and bonus, before safeguards and clamping
    pub raw_score: i32,
    pub floor_applied: bool,
    pub floor_reason: Option<String>,
    pub ceiling_applied: bool,
    pub ceiling_reason: Option<String>,
    pub final_score: u8,
    pub score_band: ScoreBand,
    pub score_band_label: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_boundaries() {
        assert_eq!(ScoreBand::from_score(100), ScoreBand::StronglySupported);
        assert_eq!(ScoreBand::from_score(90), ScoreBand::StronglySupported);
        assert_eq!(ScoreBand::from_score(89), ScoreBand::Supported);
        assert_eq!(ScoreBand::from_score(75), ScoreBand::Supported);
        assert_eq!(ScoreBand::from_score(74), ScoreBand::Plausible);
        assert_eq!(ScoreBand::from_score(60), ScoreBand::Plausible);
        assert_eq!(ScoreBand::from_score(59), ScoreBand::Mixed);
        assert_eq!(ScoreBand::from_score(45), ScoreBand::Mixed);
        assert_eq!(ScoreBand::from_score(44), ScoreBand::WeaklySupported);
        assert_eq!(ScoreBand::from_score(30), ScoreBand::WeaklySupported);
        assert_eq!(ScoreBand::from_score(29), ScoreBand::MostlyFalse);
        assert_eq!(ScoreBand::from_score(15), ScoreBand::MostlyFalse);
        assert_eq!(ScoreBand::from_score(14), ScoreBand::False);
        assert_eq!(ScoreBand::from_score(0), ScoreBand::False);
    }

    #[test]
    fn test_lower_bounds_agree_with_step_function() {
        for band in ScoreBand::ALL {
            assert_eq!(ScoreBand::from_score(band.lower_bound()), band);
        }
    }
}
