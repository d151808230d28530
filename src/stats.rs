use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::market::{Market, MarketDefinition, OddsKey, Outcome};
use crate::matcher::MatchedRecord;
use crate::outcome::settle;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OutcomeFrequency {
    pub realized: usize,
    pub total: usize,
    pub percentage: f64,
}

/// How often each outcome happened among the matched historical fixtures.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyTable {
    pub summary: String,
    /// Matched records; every frequency uses this as its denominator.
    pub sample_size: usize,
    /// Matched records with a usable full-time score.
    pub scored: usize,
    entries: BTreeMap<OddsKey, OutcomeFrequency>,
}

impl FrequencyTable {
    pub fn get(&self, market: Market, outcome: Outcome) -> Option<&OutcomeFrequency> {
        self.entries.get(&OddsKey::new(market, outcome))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OddsKey, &OutcomeFrequency)> {
        self.entries.iter()
    }

    pub fn market(&self, market: Market) -> impl Iterator<Item = (Outcome, &OutcomeFrequency)> {
        self.entries
            .iter()
            .filter(move |(key, _)| key.market == market)
            .map(|(key, freq)| (key.outcome, freq))
    }

    /// The most frequent outcome of a market; ties go to the earlier outcome.
    pub fn leader(&self, market: Market) -> Option<(Outcome, &OutcomeFrequency)> {
        self.market(market)
            .fold(None, |best: Option<(Outcome, &OutcomeFrequency)>, (outcome, freq)| {
                match best {
                    Some((_, b)) if b.realized >= freq.realized => best,
                    _ => Some((outcome, freq)),
                }
            })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Aggregate realized outcomes over `matched` for every market in `markets`.
///
/// Every matched record counts toward `total`, including records whose full-time score turns
/// out to be unknown; such records never add to `realized`. Half-time markets are only counted
/// for records with a known half-time score.
pub fn aggregate(matched: &[MatchedRecord<'_>], markets: &[MarketDefinition]) -> FrequencyTable {
    let total = matched.len();
    let mut entries: BTreeMap<OddsKey, OutcomeFrequency> = markets
        .iter()
        .flat_map(|def| def.keys())
        .map(|key| {
            (
                key,
                OutcomeFrequency {
                    realized: 0,
                    total,
                    percentage: 0.0,
                },
            )
        })
        .collect();

    let mut scored = 0usize;
    for record in matched {
        let Some(full) = record.fixture.full_time() else {
            debug!(id = %record.fixture.id, "matched fixture has no usable full-time score");
            continue;
        };
        scored += 1;
        let half = record.fixture.half_time();

        for def in markets {
            let Some(outcome) = settle(def.market, full, half) else {
                continue;
            };
            if let Some(freq) = entries.get_mut(&OddsKey::new(def.market, outcome)) {
                freq.realized += 1;
            }
        }
    }

    for freq in entries.values_mut() {
        freq.percentage = percentage(freq.realized, freq.total);
    }

    let summary = if total == 0 {
        "No similar-odds historical fixtures found".to_string()
    } else {
        format!("Based on {total} similar-odds historical fixtures")
    };

    FrequencyTable {
        summary,
        sample_size: total,
        scored,
        entries,
    }
}

/// `realized / total` as a percentage rounded to one decimal; 0 for an empty denominator.
pub fn percentage(realized: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let ratio = realized as f64 / total as f64;
    (ratio * 1000.0).round() / 10.0
}
