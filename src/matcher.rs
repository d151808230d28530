use tracing::{debug, info};

use crate::config::SimilarityConfig;
use crate::fixture::{FixtureRecord, Odds};
use crate::market::{Market, MarketDefinition, OddsKey, Outcome};

/// Slack for binary float error, so two-decimal prices exactly `tolerance` apart still match.
const PRICE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutcomeDiff {
    pub outcome: Outcome,
    pub target: f64,
    pub historical: f64,
    pub difference: f64,
}

/// A market whose every priced outcome was within tolerance.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketMatch {
    pub market: Market,
    pub outcomes: Vec<OutcomeDiff>,
}

/// A historical fixture judged similar to the target.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedRecord<'a> {
    pub fixture: &'a FixtureRecord,
    pub matched_markets: usize,
    pub details: Vec<MarketMatch>,
}

#[derive(Debug, Clone, PartialEq)]
enum MarketComparison {
    /// The target carries no price for this market.
    NotApplicable,
    Failed,
    Matched(MarketMatch),
}

/// Find historical fixtures whose prices agree with `target` in at least
/// `config.min_matched_markets` markets.
///
/// A market agrees only when every outcome the target prices is priced (finitely) on both
/// sides and each absolute difference is `<= tolerance`. Results are ordered by matched-market
/// count, highest first; ties keep corpus order.
pub fn find_similar<'a>(
    target: &FixtureRecord,
    corpus: &'a [FixtureRecord],
    config: &SimilarityConfig,
    markets: &[MarketDefinition],
) -> Vec<MatchedRecord<'a>> {
    if target.odds.is_empty() {
        debug!(target = %target.title(), "no odds on target, skipping similarity search");
        return Vec::new();
    }

    let mut scanned = 0usize;
    let mut out = Vec::new();
    for historical in corpus {
        if !historical.is_finished() || historical.odds.is_empty() {
            continue;
        }
        scanned += 1;

        let mut details = Vec::new();
        for def in markets {
            if let MarketComparison::Matched(detail) =
                compare_market(&target.odds, &historical.odds, def, config.tolerance)
            {
                details.push(detail);
            }
        }

        if details.len() >= config.min_matched_markets {
            out.push(MatchedRecord {
                fixture: historical,
                matched_markets: details.len(),
                details,
            });
        }
    }

    // Vec::sort_by_key is stable, which keeps tied records in corpus order.
    out.sort_by_key(|m| std::cmp::Reverse(m.matched_markets));

    info!(
        target = %target.title(),
        scanned,
        found = out.len(),
        tolerance = config.tolerance,
        min_markets = config.min_matched_markets,
        "similar fixtures search complete"
    );
    out
}

fn compare_market(
    target: &Odds,
    historical: &Odds,
    def: &MarketDefinition,
    tolerance: f64,
) -> MarketComparison {
    let keys: Vec<OddsKey> = def.keys().filter(|key| target.contains(key)).collect();
    if keys.is_empty() {
        return MarketComparison::NotApplicable;
    }

    let mut outcomes = Vec::with_capacity(keys.len());
    for key in keys {
        let (Some(target_price), Some(historical_price)) = (target.price(&key), historical.price(&key))
        else {
            return MarketComparison::Failed;
        };
        let difference = (target_price - historical_price).abs();
        if difference > tolerance + PRICE_EPSILON {
            return MarketComparison::Failed;
        }
        outcomes.push(OutcomeDiff {
            outcome: key.outcome,
            target: target_price,
            historical: historical_price,
            difference,
        });
    }

    MarketComparison::Matched(MarketMatch {
        market: def.market,
        outcomes,
    })
}
