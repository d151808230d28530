use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::corpus::Corpus;
use crate::fixture::{FixtureRecord, FixtureResult, FixtureStatus, Odds};
use crate::market::{Band, Market, OddsKey, Outcome, Side};
use crate::outcome::total_goals_band;

const BOOKMAKER_MARGIN: f64 = 1.07;
const HALF_TIME_SHARE: f64 = 0.45;
const MAX_GOALS: usize = 10;

const LEAGUES: [&str; 4] = ["Süper Lig", "Premier League", "La Liga", "Serie A"];
const TEAMS: [&str; 16] = [
    "Galata", "Kadikoy", "Besiktas", "Trabzon", "Arsenal", "Chelsea", "Everton", "Fulham",
    "Sevilla", "Betis", "Getafe", "Osasuna", "Torino", "Empoli", "Lecce", "Monza",
];
const FIRST_DAY: (i32, u32, u32) = (2024, 1, 6);

/// A deterministic corpus of finished fixtures: `days` consecutive days with `per_day` fixtures
/// each. Prices derive from per-fixture goal expectations quantised to 0.1, so fixtures with
/// close expectations get close prices and the matcher has something to find.
pub fn generate_corpus(seed: u64, days: usize, per_day: usize) -> Corpus {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut corpus = Corpus::default();
    let Some(first) = NaiveDate::from_ymd_opt(FIRST_DAY.0, FIRST_DAY.1, FIRST_DAY.2) else {
        return corpus;
    };
    for day in 0..days {
        let date = (first + Duration::days(day as i64)).format("%Y-%m-%d").to_string();
        let fixtures = (0..per_day)
            .map(|idx| synthetic_fixture(&mut rng, &date, idx, true))
            .collect();
        corpus.merge_day(&date, fixtures);
    }
    corpus.touch();
    corpus
}

/// Not-started priced fixtures on `date`, drawn from the same price model as the corpus.
pub fn generate_targets(seed: u64, date: NaiveDate, count: usize) -> Vec<FixtureRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    let date = date.format("%Y-%m-%d").to_string();
    (0..count)
        .map(|idx| synthetic_fixture(&mut rng, &date, idx, false))
        .collect()
}

fn synthetic_fixture(rng: &mut impl Rng, date: &str, idx: usize, finished: bool) -> FixtureRecord {
    let home = rng.gen_range(0..TEAMS.len());
    let mut away = rng.gen_range(0..TEAMS.len() - 1);
    if away >= home {
        away += 1;
    }
    let home_rate = quantise(rng.gen_range(0.6..2.4));
    let away_rate = quantise(rng.gen_range(0.4..1.9));

    let result = if finished {
        let ht = (
            poisson(rng, home_rate * HALF_TIME_SHARE),
            poisson(rng, away_rate * HALF_TIME_SHARE),
        );
        let ft = (
            ht.0 + poisson(rng, home_rate * (1.0 - HALF_TIME_SHARE)),
            ht.1 + poisson(rng, away_rate * (1.0 - HALF_TIME_SHARE)),
        );
        Some(FixtureResult {
            ft_score: Some(format!("{}-{}", ft.0, ft.1)),
            ht_score: Some(format!("{}-{}", ht.0, ht.1)),
        })
    } else {
        None
    };

    FixtureRecord {
        id: format!("syn-{}-{idx}", date.replace('-', "")),
        date: date.to_string(),
        time: format!("{:02}:{:02}", 13 + (idx % 9), if idx % 2 == 0 { 0 } else { 30 }),
        league: LEAGUES[idx % LEAGUES.len()].to_string(),
        home_team: TEAMS[home].to_string(),
        away_team: TEAMS[away].to_string(),
        status: if finished {
            FixtureStatus::Finished
        } else {
            FixtureStatus::NotStarted
        },
        result,
        odds: price_fixture(home_rate, away_rate),
    }
}

fn quantise(rate: f64) -> f64 {
    (rate * 10.0).round() / 10.0
}

/// Knuth's method; fine for the small rates used here.
fn poisson(rng: &mut impl Rng, rate: f64) -> u32 {
    let limit = (-rate).exp();
    let mut k = 0u32;
    let mut p = 1.0;
    loop {
        p *= rng.r#gen::<f64>();
        if p <= limit {
            return k;
        }
        k += 1;
    }
}

fn pmf(rate: f64) -> [f64; MAX_GOALS + 1] {
    let mut out = [0.0; MAX_GOALS + 1];
    out[0] = (-rate).exp();
    for k in 1..=MAX_GOALS {
        out[k] = out[k - 1] * rate / k as f64;
    }
    out
}

#[derive(Debug, Clone, Copy, Default)]
struct SideProbs {
    home: f64,
    draw: f64,
    away: f64,
}

impl SideProbs {
    fn get(self, side: Side) -> f64 {
        match side {
            Side::Home => self.home,
            Side::Draw => self.draw,
            Side::Away => self.away,
        }
    }
}

fn side_probs(home: &[f64], away: &[f64]) -> SideProbs {
    let mut probs = SideProbs::default();
    for (h, ph) in home.iter().enumerate() {
        for (a, pa) in away.iter().enumerate() {
            let p = ph * pa;
            match h.cmp(&a) {
                std::cmp::Ordering::Greater => probs.home += p,
                std::cmp::Ordering::Equal => probs.draw += p,
                std::cmp::Ordering::Less => probs.away += p,
            }
        }
    }
    probs
}

fn at_most(pmf: &[f64], goals: usize) -> f64 {
    pmf.iter().take(goals + 1).sum()
}

fn price(prob: f64) -> f64 {
    let raw = 1.0 / (prob.max(0.02) * BOOKMAKER_MARGIN);
    (raw.clamp(1.01, 50.0) * 100.0).round() / 100.0
}

fn price_fixture(home_rate: f64, away_rate: f64) -> Odds {
    let home_ft = pmf(home_rate);
    let away_ft = pmf(away_rate);
    let home_ht = pmf(home_rate * HALF_TIME_SHARE);
    let away_ht = pmf(away_rate * HALF_TIME_SHARE);
    let total_ft = pmf(home_rate + away_rate);
    let total_ht = pmf((home_rate + away_rate) * HALF_TIME_SHARE);

    let ft = side_probs(&home_ft, &away_ft);
    let ht = side_probs(&home_ht, &away_ht);
    let both_score = (1.0 - home_ft[0]) * (1.0 - away_ft[0]);

    let mut odds = Odds::new();
    let mut put = |market: Market, outcome: Outcome, prob: f64| {
        odds.insert(OddsKey::new(market, outcome), price(prob));
    };

    for side in [Side::Home, Side::Draw, Side::Away] {
        put(Market::MatchResult, Outcome::Result(side), ft.get(side));
        put(Market::FirstHalf, Outcome::Result(side), ht.get(side));
        for full in [Side::Home, Side::Draw, Side::Away] {
            // Halves treated as independent; close enough for synthetic prices.
            put(
                Market::HalfFull,
                Outcome::HalfFull(side, full),
                ht.get(side) * ft.get(full),
            );
        }
    }
    put(Market::BothTeamsScore, Outcome::Yes, both_score);
    put(Market::BothTeamsScore, Outcome::No, 1.0 - both_score);

    let lines = [
        (Market::OverUnder25, at_most(&total_ft, 2)),
        (Market::FirstHalfOverUnder15, at_most(&total_ht, 1)),
        (Market::HomeOverUnder15, at_most(&home_ft, 1)),
        (Market::AwayOverUnder15, at_most(&away_ft, 1)),
    ];
    for (market, under) in lines {
        put(market, Outcome::Under, under);
        put(market, Outcome::Over, 1.0 - under);
    }

    let mut bands = [0.0; 4];
    for (goals, p) in total_ft.iter().enumerate() {
        let idx = match total_goals_band(goals as u32) {
            Band::ZeroOne => 0,
            Band::TwoThree => 1,
            Band::FourFive => 2,
            Band::SixPlus => 3,
        };
        bands[idx] += p;
    }
    bands[3] += 1.0 - total_ft.iter().sum::<f64>();
    for (band, prob) in [Band::ZeroOne, Band::TwoThree, Band::FourFive, Band::SixPlus]
        .into_iter()
        .zip(bands)
    {
        put(Market::TotalGoals, Outcome::GoalBand(band), prob);
    }
    odds
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{generate_corpus, generate_targets, price_fixture};
    use crate::market::{Market, OddsKey, Outcome, Side, standard_markets};

    #[test]
    fn corpus_is_deterministic_per_seed() {
        let a = generate_corpus(7, 3, 5);
        let b = generate_corpus(7, 3, 5);
        assert_eq!(a.matches, b.matches);
        assert_eq!(a.len(), 15);
        assert_eq!(a.finished_count(), 15);
        assert_ne!(generate_corpus(8, 3, 5).matches, a.matches);
    }

    #[test]
    fn every_fixture_prices_every_standard_outcome() {
        let corpus = generate_corpus(1, 1, 4);
        for fixture in corpus.snapshot() {
            assert!(fixture.full_time().is_some());
            assert!(fixture.half_time().is_some());
            for def in standard_markets() {
                for key in def.keys() {
                    let price = fixture.odds.price(&key).expect("priced");
                    assert!(price >= 1.01, "{key} priced {price}");
                }
            }
        }
    }

    #[test]
    fn stronger_home_side_is_shorter_priced() {
        let odds = price_fixture(2.2, 0.6);
        let home = odds
            .price(&OddsKey::new(Market::MatchResult, Outcome::Result(Side::Home)))
            .expect("home price");
        let away = odds
            .price(&OddsKey::new(Market::MatchResult, Outcome::Result(Side::Away)))
            .expect("away price");
        assert!(home < away);
    }

    #[test]
    fn targets_are_not_started() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).expect("date");
        let targets = generate_targets(3, date, 4);
        assert_eq!(targets.len(), 4);
        assert!(targets.iter().all(|t| !t.is_finished() && t.result.is_none()));
        assert!(targets.iter().all(|t| t.date == "2024-06-01"));
    }
}
