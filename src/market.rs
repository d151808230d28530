use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

/// Betting markets the feed provides and the engine compares.
///
/// Labels are the feed's own (Turkish) market names, which are also what the corpus file uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Market {
    MatchResult,
    FirstHalf,
    BothTeamsScore,
    OverUnder25,
    FirstHalfOverUnder15,
    HomeOverUnder15,
    AwayOverUnder15,
    HalfFull,
    TotalGoals,
}

/// Which goal count a goal-line market is settled against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalCount {
    FullTimeTotal,
    HalfTimeTotal,
    FullTimeHome,
    FullTimeAway,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoalLine {
    pub count: GoalCount,
    pub line: f64,
}

impl Market {
    pub const ALL: [Market; 9] = [
        Market::MatchResult,
        Market::FirstHalf,
        Market::BothTeamsScore,
        Market::OverUnder25,
        Market::FirstHalfOverUnder15,
        Market::HomeOverUnder15,
        Market::AwayOverUnder15,
        Market::HalfFull,
        Market::TotalGoals,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Market::MatchResult => "Maç Sonucu",
            Market::FirstHalf => "İlk Yarı",
            Market::BothTeamsScore => "Karşılıklı Gol",
            Market::OverUnder25 => "A/U 2.5",
            Market::FirstHalfOverUnder15 => "IY 1.5",
            Market::HomeOverUnder15 => "EV 1.5",
            Market::AwayOverUnder15 => "DEP 1.5",
            Market::HalfFull => "IY/MS",
            Market::TotalGoals => "Toplam Gol",
        }
    }

    pub fn from_label(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Market::ALL.into_iter().find(|m| m.label() == raw)
    }

    /// Map the feed's numeric market-type code.
    pub fn from_provider_code(code: u64) -> Option<Self> {
        match code {
            1 => Some(Market::MatchResult),
            3 => Some(Market::FirstHalf),
            6 => Some(Market::BothTeamsScore),
            8 => Some(Market::HalfFull),
            10 => Some(Market::OverUnder25),
            11 => Some(Market::FirstHalfOverUnder15),
            13 => Some(Market::TotalGoals),
            14 => Some(Market::HomeOverUnder15),
            15 => Some(Market::AwayOverUnder15),
            _ => None,
        }
    }

    pub const fn outcomes(self) -> &'static [Outcome] {
        match self {
            Market::MatchResult | Market::FirstHalf => &RESULT_OUTCOMES,
            Market::BothTeamsScore => &YES_NO_OUTCOMES,
            Market::OverUnder25
            | Market::FirstHalfOverUnder15
            | Market::HomeOverUnder15
            | Market::AwayOverUnder15 => &OVER_UNDER_OUTCOMES,
            Market::HalfFull => &HALF_FULL_OUTCOMES,
            Market::TotalGoals => &GOAL_BAND_OUTCOMES,
        }
    }

    pub fn goal_line(self) -> Option<GoalLine> {
        let (count, line) = match self {
            Market::OverUnder25 => (GoalCount::FullTimeTotal, 2.5),
            Market::FirstHalfOverUnder15 => (GoalCount::HalfTimeTotal, 1.5),
            Market::HomeOverUnder15 => (GoalCount::FullTimeHome, 1.5),
            Market::AwayOverUnder15 => (GoalCount::FullTimeAway, 1.5),
            _ => return None,
        };
        Some(GoalLine { count, line })
    }
}

const RESULT_OUTCOMES: [Outcome; 3] = [
    Outcome::Result(Side::Home),
    Outcome::Result(Side::Draw),
    Outcome::Result(Side::Away),
];
const YES_NO_OUTCOMES: [Outcome; 2] = [Outcome::Yes, Outcome::No];
const OVER_UNDER_OUTCOMES: [Outcome; 2] = [Outcome::Over, Outcome::Under];
const HALF_FULL_OUTCOMES: [Outcome; 9] = [
    Outcome::HalfFull(Side::Home, Side::Home),
    Outcome::HalfFull(Side::Home, Side::Draw),
    Outcome::HalfFull(Side::Home, Side::Away),
    Outcome::HalfFull(Side::Draw, Side::Home),
    Outcome::HalfFull(Side::Draw, Side::Draw),
    Outcome::HalfFull(Side::Draw, Side::Away),
    Outcome::HalfFull(Side::Away, Side::Home),
    Outcome::HalfFull(Side::Away, Side::Draw),
    Outcome::HalfFull(Side::Away, Side::Away),
];
const GOAL_BAND_OUTCOMES: [Outcome; 4] = [
    Outcome::GoalBand(Band::ZeroOne),
    Outcome::GoalBand(Band::TwoThree),
    Outcome::GoalBand(Band::FourFive),
    Outcome::GoalBand(Band::SixPlus),
];

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 1 / X / 2 from the home side's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Side {
    Home,
    Draw,
    Away,
}

impl Side {
    pub fn label(self) -> &'static str {
        match self {
            Side::Home => "1",
            Side::Draw => "X",
            Side::Away => "2",
        }
    }

    pub fn from_label(raw: &str) -> Option<Self> {
        match raw.trim() {
            "1" => Some(Side::Home),
            "X" | "x" => Some(Side::Draw),
            "2" => Some(Side::Away),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Band {
    ZeroOne,
    TwoThree,
    FourFive,
    SixPlus,
}

impl Band {
    pub fn label(self) -> &'static str {
        match self {
            Band::ZeroOne => "0-1",
            Band::TwoThree => "2-3",
            Band::FourFive => "4-5",
            Band::SixPlus => "6+",
        }
    }
}

/// One resolution within a market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Outcome {
    Result(Side),
    Over,
    Under,
    Yes,
    No,
    HalfFull(Side, Side),
    GoalBand(Band),
}

impl Outcome {
    /// Parse a feed outcome label in the context of its market, so `"1"` means a
    /// match result in one market and is rejected in an over/under market.
    pub fn parse_for(market: Market, raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let parsed = match market {
            Market::MatchResult | Market::FirstHalf => Side::from_label(raw).map(Outcome::Result),
            Market::BothTeamsScore => match raw {
                "Var" => Some(Outcome::Yes),
                "Yok" => Some(Outcome::No),
                _ => None,
            },
            Market::OverUnder25
            | Market::FirstHalfOverUnder15
            | Market::HomeOverUnder15
            | Market::AwayOverUnder15 => match raw {
                "Üst" => Some(Outcome::Over),
                "Alt" => Some(Outcome::Under),
                _ => None,
            },
            Market::HalfFull => {
                let (half, full) = raw.split_once('/')?;
                Some(Outcome::HalfFull(
                    Side::from_label(half)?,
                    Side::from_label(full)?,
                ))
            }
            Market::TotalGoals => match raw {
                "0-1" => Some(Outcome::GoalBand(Band::ZeroOne)),
                "2-3" => Some(Outcome::GoalBand(Band::TwoThree)),
                "4-5" => Some(Outcome::GoalBand(Band::FourFive)),
                "6+" => Some(Outcome::GoalBand(Band::SixPlus)),
                _ => None,
            },
        };
        parsed.filter(|o| market.outcomes().contains(o))
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Result(side) => f.write_str(side.label()),
            Outcome::Over => f.write_str("Üst"),
            Outcome::Under => f.write_str("Alt"),
            Outcome::Yes => f.write_str("Var"),
            Outcome::No => f.write_str("Yok"),
            Outcome::HalfFull(half, full) => write!(f, "{}/{}", half.label(), full.label()),
            Outcome::GoalBand(band) => f.write_str(band.label()),
        }
    }
}

/// Composite `(market, outcome)` key for prices and frequencies.
///
/// Only the serde boundary renders it as `"<market>_<outcome>"`, the corpus file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OddsKey {
    pub market: Market,
    pub outcome: Outcome,
}

impl OddsKey {
    pub fn new(market: Market, outcome: Outcome) -> Self {
        Self { market, outcome }
    }
}

impl fmt::Display for OddsKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.market, self.outcome)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownOddsKey(pub String);

impl fmt::Display for UnknownOddsKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown odds key {:?}", self.0)
    }
}

impl std::error::Error for UnknownOddsKey {}

impl FromStr for OddsKey {
    type Err = UnknownOddsKey;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        // Market labels contain spaces and slashes but never '_'.
        let (market, outcome) = raw
            .split_once('_')
            .ok_or_else(|| UnknownOddsKey(raw.to_string()))?;
        let market = Market::from_label(market).ok_or_else(|| UnknownOddsKey(raw.to_string()))?;
        let outcome =
            Outcome::parse_for(market, outcome).ok_or_else(|| UnknownOddsKey(raw.to_string()))?;
        Ok(OddsKey { market, outcome })
    }
}

impl Serialize for OddsKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for OddsKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// A market together with its fixed, ordered outcome set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketDefinition {
    pub market: Market,
    pub outcomes: &'static [Outcome],
}

impl MarketDefinition {
    pub fn keys(&self) -> impl Iterator<Item = OddsKey> + '_ {
        self.outcomes
            .iter()
            .map(move |outcome| OddsKey::new(self.market, *outcome))
    }
}

static STANDARD_MARKETS: [MarketDefinition; 9] = [
    MarketDefinition {
        market: Market::MatchResult,
        outcomes: Market::MatchResult.outcomes(),
    },
    MarketDefinition {
        market: Market::FirstHalf,
        outcomes: Market::FirstHalf.outcomes(),
    },
    MarketDefinition {
        market: Market::BothTeamsScore,
        outcomes: Market::BothTeamsScore.outcomes(),
    },
    MarketDefinition {
        market: Market::OverUnder25,
        outcomes: Market::OverUnder25.outcomes(),
    },
    MarketDefinition {
        market: Market::FirstHalfOverUnder15,
        outcomes: Market::FirstHalfOverUnder15.outcomes(),
    },
    MarketDefinition {
        market: Market::HomeOverUnder15,
        outcomes: Market::HomeOverUnder15.outcomes(),
    },
    MarketDefinition {
        market: Market::AwayOverUnder15,
        outcomes: Market::AwayOverUnder15.outcomes(),
    },
    MarketDefinition {
        market: Market::HalfFull,
        outcomes: Market::HalfFull.outcomes(),
    },
    MarketDefinition {
        market: Market::TotalGoals,
        outcomes: Market::TotalGoals.outcomes(),
    },
];

/// The market table shared by matching and aggregation.
pub fn standard_markets() -> &'static [MarketDefinition] {
    &STANDARD_MARKETS
}

#[cfg(test)]
mod tests {
    use super::{Band, Market, OddsKey, Outcome, Side, standard_markets};

    #[test]
    fn every_market_round_trips_its_label() {
        for market in Market::ALL {
            assert_eq!(Market::from_label(market.label()), Some(market));
        }
    }

    #[test]
    fn standard_table_covers_every_market_in_order() {
        let markets: Vec<Market> = standard_markets().iter().map(|d| d.market).collect();
        assert_eq!(markets, Market::ALL.to_vec());
        for def in standard_markets() {
            assert_eq!(def.outcomes, def.market.outcomes());
        }
    }

    #[test]
    fn odds_key_parses_feed_strings() {
        let key: OddsKey = "Maç Sonucu_X".parse().expect("valid key");
        assert_eq!(key, OddsKey::new(Market::MatchResult, Outcome::Result(Side::Draw)));

        let key: OddsKey = "A/U 2.5_Üst".parse().expect("valid key");
        assert_eq!(key, OddsKey::new(Market::OverUnder25, Outcome::Over));

        let key: OddsKey = "IY/MS_2/1".parse().expect("valid key");
        assert_eq!(
            key,
            OddsKey::new(Market::HalfFull, Outcome::HalfFull(Side::Away, Side::Home))
        );

        let key: OddsKey = "Toplam Gol_6+".parse().expect("valid key");
        assert_eq!(key, OddsKey::new(Market::TotalGoals, Outcome::GoalBand(Band::SixPlus)));
    }

    #[test]
    fn odds_key_rejects_outcome_from_another_market() {
        assert!("A/U 2.5_1".parse::<OddsKey>().is_err());
        assert!("Maç Sonucu_Üst".parse::<OddsKey>().is_err());
        assert!("Korner_Üst".parse::<OddsKey>().is_err());
        assert!("Maç Sonucu".parse::<OddsKey>().is_err());
    }

    #[test]
    fn odds_key_display_matches_feed_format() {
        let key = OddsKey::new(Market::HalfFull, Outcome::HalfFull(Side::Draw, Side::Home));
        assert_eq!(key.to_string(), "IY/MS_X/1");
    }

    #[test]
    fn provider_codes_map_to_markets() {
        assert_eq!(Market::from_provider_code(1), Some(Market::MatchResult));
        assert_eq!(Market::from_provider_code(15), Some(Market::AwayOverUnder15));
        assert_eq!(Market::from_provider_code(16), None);
    }

    #[test]
    fn goal_lines_are_half_integers() {
        for market in Market::ALL {
            if let Some(line) = market.goal_line() {
                assert_eq!(line.line.fract(), 0.5);
            }
        }
    }
}
