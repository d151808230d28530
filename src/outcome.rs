use crate::market::{Band, GoalCount, Market, Outcome, Side};
use crate::score::Score;

pub fn match_result(score: Score) -> Side {
    if score.home > score.away {
        Side::Home
    } else if score.home == score.away {
        Side::Draw
    } else {
        Side::Away
    }
}

/// Saturates, so an absurd feed score still settles as a high-scoring fixture.
pub fn total_goals(score: Score) -> u32 {
    score.home.saturating_add(score.away)
}

pub fn both_teams_scored(score: Score) -> bool {
    score.home > 0 && score.away > 0
}

/// `Over` when strictly above the line. Lines are half-integers so there is no push.
pub fn over_under(goals: u32, line: f64) -> Outcome {
    if f64::from(goals) > line {
        Outcome::Over
    } else {
        Outcome::Under
    }
}

/// `"{half}/{full}"`; unknown if either score is.
pub fn half_full(half: Option<Score>, full: Option<Score>) -> Option<Outcome> {
    let (half, full) = (half?, full?);
    Some(Outcome::HalfFull(match_result(half), match_result(full)))
}

pub fn total_goals_band(total: u32) -> Band {
    match total {
        0..=1 => Band::ZeroOne,
        2..=3 => Band::TwoThree,
        4..=5 => Band::FourFive,
        _ => Band::SixPlus,
    }
}

/// The outcome a market settled on, given a known full-time score.
///
/// Half-time markets return `None` when the half-time score is unknown.
pub fn settle(market: Market, full: Score, half: Option<Score>) -> Option<Outcome> {
    if let Some(goal_line) = market.goal_line() {
        let goals = match goal_line.count {
            GoalCount::FullTimeTotal => total_goals(full),
            GoalCount::HalfTimeTotal => total_goals(half?),
            GoalCount::FullTimeHome => full.home,
            GoalCount::FullTimeAway => full.away,
        };
        return Some(over_under(goals, goal_line.line));
    }
    match market {
        Market::MatchResult => Some(Outcome::Result(match_result(full))),
        Market::FirstHalf => half.map(|h| Outcome::Result(match_result(h))),
        Market::BothTeamsScore => Some(if both_teams_scored(full) {
            Outcome::Yes
        } else {
            Outcome::No
        }),
        Market::HalfFull => half_full(half, Some(full)),
        Market::TotalGoals => Some(Outcome::GoalBand(total_goals_band(total_goals(full)))),
        Market::OverUnder25
        | Market::FirstHalfOverUnder15
        | Market::HomeOverUnder15
        | Market::AwayOverUnder15 => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_result_agrees_with_goal_comparison() {
        for home in 0..6 {
            for away in 0..6 {
                let side = match_result(Score::new(home, away));
                let expected = match home.cmp(&away) {
                    std::cmp::Ordering::Greater => Side::Home,
                    std::cmp::Ordering::Equal => Side::Draw,
                    std::cmp::Ordering::Less => Side::Away,
                };
                assert_eq!(side, expected, "{home}-{away}");
            }
        }
    }

    #[test]
    fn both_teams_scored_needs_a_goal_each() {
        for home in 0..4 {
            for away in 0..4 {
                assert_eq!(
                    both_teams_scored(Score::new(home, away)),
                    home >= 1 && away >= 1
                );
            }
        }
    }

    #[test]
    fn over_under_splits_on_the_line() {
        assert_eq!(over_under(3, 2.5), Outcome::Over);
        assert_eq!(over_under(2, 2.5), Outcome::Under);
        assert_eq!(over_under(0, 1.5), Outcome::Under);
        assert_eq!(over_under(2, 1.5), Outcome::Over);
    }

    #[test]
    fn half_full_needs_both_halves() {
        let ht = Score::new(0, 1);
        let ft = Score::new(2, 1);
        assert_eq!(
            half_full(Some(ht), Some(ft)),
            Some(Outcome::HalfFull(Side::Away, Side::Home))
        );
        assert_eq!(half_full(None, Some(ft)), None);
        assert_eq!(half_full(Some(ht), None), None);
    }

    #[test]
    fn huge_scores_do_not_overflow() {
        let ft = Score::new(u32::MAX, 1);
        assert_eq!(total_goals(ft), u32::MAX);
        assert_eq!(settle(Market::OverUnder25, ft, None), Some(Outcome::Over));
        assert_eq!(
            settle(Market::TotalGoals, ft, None),
            Some(Outcome::GoalBand(Band::SixPlus))
        );
        assert_eq!(
            settle(Market::FirstHalfOverUnder15, ft, Some(Score::new(1, u32::MAX))),
            Some(Outcome::Over)
        );
    }

    #[test]
    fn goal_bands() {
        assert_eq!(total_goals_band(0), Band::ZeroOne);
        assert_eq!(total_goals_band(1), Band::ZeroOne);
        assert_eq!(total_goals_band(3), Band::TwoThree);
        assert_eq!(total_goals_band(5), Band::FourFive);
        assert_eq!(total_goals_band(9), Band::SixPlus);
    }

    #[test]
    fn settle_uses_the_right_goal_count() {
        let ft = Score::new(2, 1);
        let ht = Score::new(1, 1);
        assert_eq!(settle(Market::HomeOverUnder15, ft, None), Some(Outcome::Over));
        assert_eq!(settle(Market::AwayOverUnder15, ft, None), Some(Outcome::Under));
        assert_eq!(settle(Market::OverUnder25, ft, None), Some(Outcome::Over));
        assert_eq!(settle(Market::FirstHalfOverUnder15, ft, Some(ht)), Some(Outcome::Over));
        assert_eq!(settle(Market::FirstHalfOverUnder15, ft, None), None);
        assert_eq!(
            settle(Market::FirstHalf, ft, Some(ht)),
            Some(Outcome::Result(Side::Draw))
        );
        assert_eq!(settle(Market::BothTeamsScore, ft, None), Some(Outcome::Yes));
        assert_eq!(
            settle(Market::TotalGoals, ft, None),
            Some(Outcome::GoalBand(Band::TwoThree))
        );
    }

    #[test]
    fn settled_outcome_always_belongs_to_its_market() {
        let ft = Score::new(4, 3);
        let ht = Score::new(0, 2);
        for market in Market::ALL {
            let outcome = settle(market, ft, Some(ht)).expect("both halves known");
            assert!(market.outcomes().contains(&outcome), "{market}: {outcome}");
        }
    }
}
