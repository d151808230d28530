use std::collections::BTreeMap;
use std::collections::btree_map;

use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::market::{Market, OddsKey, Outcome};
use crate::score::{Score, parse_optional_score};

/// Feed status codes as stored in the corpus file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum FixtureStatus {
    NotStarted,
    Finished,
}

impl TryFrom<u8> for FixtureStatus {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(FixtureStatus::NotStarted),
            3 => Ok(FixtureStatus::Finished),
            other => Err(format!("unsupported fixture status {other}")),
        }
    }
}

impl From<FixtureStatus> for u8 {
    fn from(status: FixtureStatus) -> Self {
        match status {
            FixtureStatus::NotStarted => 1,
            FixtureStatus::Finished => 3,
        }
    }
}

/// Textual half-time and full-time scores as the feed reports them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureResult {
    #[serde(default)]
    pub ft_score: Option<String>,
    #[serde(default)]
    pub ht_score: Option<String>,
}

impl FixtureResult {
    pub fn new(ft_score: Option<&str>, ht_score: Option<&str>) -> Self {
        Self {
            ft_score: ft_score.map(str::to_string),
            ht_score: ht_score.map(str::to_string),
        }
    }

    pub fn full_time(&self) -> Option<Score> {
        parse_optional_score(self.ft_score.as_deref())
    }

    pub fn half_time(&self) -> Option<Score> {
        parse_optional_score(self.ht_score.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureRecord {
    pub id: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub league: String,
    pub home_team: String,
    pub away_team: String,
    pub status: FixtureStatus,
    #[serde(default)]
    pub result: Option<FixtureResult>,
    #[serde(default)]
    pub odds: Odds,
}

impl FixtureRecord {
    pub fn is_finished(&self) -> bool {
        self.status == FixtureStatus::Finished
    }

    /// Full-time score, unknown for unfinished fixtures and finished ones without a result.
    pub fn full_time(&self) -> Option<Score> {
        self.result.as_ref().and_then(FixtureResult::full_time)
    }

    pub fn half_time(&self) -> Option<Score> {
        self.result.as_ref().and_then(FixtureResult::half_time)
    }

    pub fn title(&self) -> String {
        format!("{} vs {}", self.home_team, self.away_team)
    }
}

/// Prices keyed by `(market, outcome)`.
///
/// A key can be present with a non-finite price: the feed sent something that wasn't a number.
/// That is kept apart from an absent key because the matcher treats the two differently.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Odds(BTreeMap<OddsKey, f64>);

impl Odds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: OddsKey, price: f64) -> Option<f64> {
        self.0.insert(key, price)
    }

    pub fn get(&self, key: &OddsKey) -> Option<f64> {
        self.0.get(key).copied()
    }

    /// Present and finite.
    pub fn price(&self, key: &OddsKey) -> Option<f64> {
        self.get(key).filter(|p| p.is_finite())
    }

    pub fn contains(&self, key: &OddsKey) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, OddsKey, f64> {
        self.0.iter()
    }

    /// Outcomes of `market` this record carries a key for, in outcome order.
    pub fn outcomes_for(&self, market: Market) -> impl Iterator<Item = Outcome> + '_ {
        market
            .outcomes()
            .iter()
            .copied()
            .filter(move |outcome| self.contains(&OddsKey::new(market, *outcome)))
    }
}

impl FromIterator<(OddsKey, f64)> for Odds {
    fn from_iter<I: IntoIterator<Item = (OddsKey, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Serialize for Odds {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, price) in &self.0 {
            // serde_json writes non-finite floats as null, which reads back as non-numeric.
            map.serialize_entry(key, price)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Odds {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;
        Ok(raw
            .into_iter()
            .filter_map(|(key, value)| {
                let key = key.parse::<OddsKey>().ok()?;
                Some((key, value.as_f64().unwrap_or(f64::NAN)))
            })
            .collect())
    }
}
