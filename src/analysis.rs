use rayon::prelude::*;

use crate::config::SimilarityConfig;
use crate::fixture::FixtureRecord;
use crate::market::MarketDefinition;
use crate::matcher::{MatchedRecord, find_similar};
use crate::stats::{FrequencyTable, aggregate};

/// One target fixture with its similar historical fixtures and their outcome frequencies.
#[derive(Debug, Clone)]
pub struct FixtureAnalysis<'a> {
    pub target: &'a FixtureRecord,
    pub matched: Vec<MatchedRecord<'a>>,
    pub table: FrequencyTable,
}

pub fn analyze_fixture<'a>(
    target: &'a FixtureRecord,
    corpus: &'a [FixtureRecord],
    config: &SimilarityConfig,
    markets: &[MarketDefinition],
) -> FixtureAnalysis<'a> {
    let matched = find_similar(target, corpus, config, markets);
    let table = aggregate(&matched, markets);
    FixtureAnalysis {
        target,
        matched,
        table,
    }
}

/// Analyse many targets against the same corpus snapshot in parallel. Output keeps the order
/// of `targets`.
pub fn analyze_all<'a>(
    targets: &'a [FixtureRecord],
    corpus: &'a [FixtureRecord],
    config: &SimilarityConfig,
    markets: &[MarketDefinition],
) -> Vec<FixtureAnalysis<'a>> {
    targets
        .par_iter()
        .map(|target| analyze_fixture(target, corpus, config, markets))
        .collect()
}

/// Fixtures of a day still worth analysing: not started and priced.
pub fn pending_targets(fixtures: &[FixtureRecord]) -> Vec<FixtureRecord> {
    fixtures
        .iter()
        .filter(|f| !f.is_finished() && !f.odds.is_empty())
        .cloned()
        .collect()
}

/// Case-insensitive team filter over home and away names.
pub fn filter_by_team(fixtures: Vec<FixtureRecord>, team: &str) -> Vec<FixtureRecord> {
    let needle = team.trim().to_lowercase();
    if needle.is_empty() {
        return fixtures;
    }
    fixtures
        .into_iter()
        .filter(|f| {
            f.home_team.to_lowercase().contains(&needle)
                || f.away_team.to_lowercase().contains(&needle)
        })
        .collect()
}
