use oddsmatch::fixture::{FixtureRecord, FixtureResult, FixtureStatus, Odds};
use oddsmatch::market::{Band, Market, Outcome, Side, standard_markets};
use oddsmatch::matcher::MatchedRecord;
use oddsmatch::stats::aggregate;

fn record(id: &str, ft: Option<&str>, ht: Option<&str>) -> FixtureRecord {
    FixtureRecord {
        id: id.to_string(),
        date: "2024-04-13".to_string(),
        time: "17:00".to_string(),
        league: "Premier League".to_string(),
        home_team: format!("Home {id}"),
        away_team: format!("Away {id}"),
        status: FixtureStatus::Finished,
        result: Some(FixtureResult::new(ft, ht)),
        odds: Odds::new(),
    }
}

fn matched(records: &[FixtureRecord]) -> Vec<MatchedRecord<'_>> {
    records
        .iter()
        .map(|fixture| MatchedRecord {
            fixture,
            matched_markets: 1,
            details: Vec::new(),
        })
        .collect()
}

#[test]
fn empty_input_gives_all_zero_table() {
    let table = aggregate(&[], standard_markets());
    assert_eq!(table.sample_size, 0);
    assert_eq!(table.scored, 0);
    assert_eq!(table.summary, "No similar-odds historical fixtures found");
    let expected: usize = standard_markets().iter().map(|d| d.outcomes.len()).sum();
    assert_eq!(table.len(), expected);
    for (_, freq) in table.iter() {
        assert_eq!((freq.realized, freq.total, freq.percentage), (0, 0, 0.0));
    }
}

#[test]
fn realized_never_exceeds_total() {
    let records = vec![
        record("1", Some("2-1"), Some("1-0")),
        record("2", Some("0-0"), Some("0-0")),
        record("3", Some("3-3"), None),
        record("4", Some("1-4"), Some("1-2")),
    ];
    let matched = matched(&records);
    let table = aggregate(&matched, standard_markets());
    assert_eq!(table.summary, "Based on 4 similar-odds historical fixtures");
    for (key, freq) in table.iter() {
        assert_eq!(freq.total, 4, "{key}");
        assert!(freq.realized <= freq.total, "{key}");
    }
    for def in standard_markets() {
        let realized: usize = table.market(def.market).map(|(_, f)| f.realized).sum();
        // One outcome per scored record; half-time markets skip the record without a half.
        let needs_half = matches!(
            def.market,
            Market::FirstHalf | Market::HalfFull | Market::FirstHalfOverUnder15
        );
        let expected = if needs_half { 3 } else { 4 };
        assert_eq!(realized, expected, "{}", def.market);
    }
}

#[test]
fn unparseable_scores_count_in_denominator_only() {
    let records = vec![
        record("1", Some("2-1"), Some("1-1")),
        record("2", Some("- - -"), None),
        record("3", None, None),
    ];
    let matched = matched(&records);
    let table = aggregate(&matched, standard_markets());
    assert_eq!(table.sample_size, 3);
    assert_eq!(table.scored, 1);

    let home = table
        .get(Market::MatchResult, Outcome::Result(Side::Home))
        .expect("home row");
    assert_eq!((home.realized, home.total, home.percentage), (1, 3, 33.3));

    let half_full = table
        .get(Market::HalfFull, Outcome::HalfFull(Side::Draw, Side::Home))
        .expect("half/full row");
    assert_eq!(half_full.realized, 1);
}

#[test]
fn goal_markets_follow_scores() {
    let records = vec![
        record("1", Some("2-1"), Some("2-0")),
        record("2", Some("0-0"), Some("0-0")),
        record("3", Some("4-2"), Some("1-1")),
        record("4", Some("1-1"), Some("0-1")),
    ];
    let matched = matched(&records);
    let table = aggregate(&matched, standard_markets());

    let realized = |market, outcome| table.get(market, outcome).expect("row").realized;
    assert_eq!(realized(Market::OverUnder25, Outcome::Over), 2);
    assert_eq!(realized(Market::OverUnder25, Outcome::Under), 2);
    assert_eq!(realized(Market::BothTeamsScore, Outcome::Yes), 3);
    assert_eq!(realized(Market::HomeOverUnder15, Outcome::Over), 2);
    assert_eq!(realized(Market::AwayOverUnder15, Outcome::Over), 1);
    assert_eq!(realized(Market::FirstHalfOverUnder15, Outcome::Over), 2);
    assert_eq!(realized(Market::TotalGoals, Outcome::GoalBand(Band::ZeroOne)), 1);
    assert_eq!(realized(Market::TotalGoals, Outcome::GoalBand(Band::TwoThree)), 2);
    assert_eq!(realized(Market::TotalGoals, Outcome::GoalBand(Band::SixPlus)), 1);

    let (leader, freq) = table.leader(Market::BothTeamsScore).expect("leader");
    assert_eq!(leader, Outcome::Yes);
    assert_eq!(freq.percentage, 75.0);
}

#[test]
fn absurd_scores_settle_without_overflow() {
    let records = vec![record("1", Some("4294967295-1"), Some("4294967295-0"))];
    let matched = matched(&records);
    let table = aggregate(&matched, standard_markets());
    assert_eq!(table.scored, 1);

    let realized = |market, outcome| table.get(market, outcome).expect("row").realized;
    assert_eq!(realized(Market::OverUnder25, Outcome::Over), 1);
    assert_eq!(realized(Market::OverUnder25, Outcome::Under), 0);
    assert_eq!(realized(Market::TotalGoals, Outcome::GoalBand(Band::SixPlus)), 1);
    assert_eq!(realized(Market::FirstHalfOverUnder15, Outcome::Over), 1);
}
