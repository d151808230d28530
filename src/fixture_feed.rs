use std::collections::HashMap;

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use serde_json::Value;
use tracing::{info, warn};

use crate::fixture::{FixtureRecord, FixtureResult, FixtureStatus, Odds};
use crate::http_client::{get_text, http_client};
use crate::market::{Market, OddsKey, Outcome};

const TOKEN_URL: &str = "https://www.mackolik.com/ajax/middleware/token";
const BULLETIN_API_URL: &str = "https://api.mackolikfeeds.com/betting-service/bulletin/sport/1";
const MATCHES_API_URL: &str = "https://api.mackolikfeeds.com/api/matches/";
const API_USER_AGENT: &str = "Dalvik/2.1.0 (Linux; U; Android 12; SM-G991B Build/SP1A.210812.016)";
const APPLICATION: &str = "com.kokteyl.mackolik";

/// Bulletin status for postponed fixtures.
const BULLETIN_POSTPONED: i64 = 5;
const BULLETIN_FINISHED: i64 = 3;

/// Anything that can hand the engine a day of fixtures.
pub trait FixtureSource {
    fn fetch_fixtures(&self, date: NaiveDate) -> Result<Vec<FixtureRecord>>;
}

/// Live fixtures, scores and prices from the mackolik feeds.
#[derive(Debug, Clone)]
pub struct MackolikFeed {
    pub tz_offset_hours: i64,
}

impl MackolikFeed {
    pub fn new(tz_offset_hours: i64) -> Self {
        Self { tz_offset_hours }
    }

    fn fetch_token(&self) -> Result<String> {
        let client = http_client()?;
        let body = get_text(client, TOKEN_URL, &[]).context("token request failed")?;
        parse_token_json(&body)
    }
}

impl FixtureSource for MackolikFeed {
    fn fetch_fixtures(&self, date: NaiveDate) -> Result<Vec<FixtureRecord>> {
        let token = self.fetch_token()?;
        let client = http_client()?;
        let day = date.format("%Y-%m-%d").to_string();
        let headers = [
            ("User-Agent", API_USER_AGENT),
            ("Accept", "*/*"),
            ("X-Authorization", "token true"),
            ("X-RequestToken", token.as_str()),
        ];

        let matches_url = format!(
            "{MATCHES_API_URL}?language=tr&country=tr&add_playing=1&extended_period=1&date={day}&tz=3.0&application={APPLICATION}&migration_status=perform"
        );
        let details_body =
            get_text(client, &matches_url, &headers).context("match details request failed")?;
        let details = parse_match_details_json(&details_body)?;
        info!(date = %day, details = details.len(), "match details loaded");

        let bulletin_url = format!(
            "{BULLETIN_API_URL}?date={day}&tz=3&language=tr&real_country=tr&application={APPLICATION}&migration_status=perform"
        );
        let bulletin_body =
            get_text(client, &bulletin_url, &headers).context("bulletin request failed")?;
        let fixtures = parse_bulletin_json(&bulletin_body, &day, &details, self.tz_offset_hours)?;
        info!(date = %day, fixtures = fixtures.len(), "bulletin parsed");
        Ok(fixtures)
    }
}

/// Scores and kickoff details from the matches endpoint, keyed by fixture id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchDetailRow {
    pub ft_score: Option<String>,
    pub ht_score: Option<String>,
    pub played: bool,
    pub kickoff: Option<String>,
}

pub fn parse_token_json(raw: &str) -> Result<String> {
    let v: Value = serde_json::from_str(raw.trim()).context("invalid token json")?;
    v.get("data")
        .and_then(|d| d.get("token"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| anyhow!("token missing from response"))
}

pub fn parse_match_details_json(raw: &str) -> Result<HashMap<String, MatchDetailRow>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(HashMap::new());
    }
    let v: Value = serde_json::from_str(trimmed).context("invalid match details json")?;
    let mut out = HashMap::new();
    let Some(areas) = v
        .get("data")
        .and_then(|d| d.get("areas"))
        .and_then(Value::as_array)
    else {
        warn!("match details response has no areas");
        return Ok(out);
    };

    for area in areas {
        let competitions = area
            .get("competitions")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        for competition in competitions {
            let matches = competition
                .get("matches")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();
            for item in matches {
                let Some(id) = item.get("id").and_then(value_to_text) else {
                    continue;
                };
                let status = item.get("status").and_then(Value::as_str).unwrap_or("");
                if status == "Postponed" {
                    continue;
                }
                let kickoff = item
                    .get("match_time")
                    .or_else(|| item.get("time"))
                    .and_then(Value::as_str)
                    .map(str::to_string);
                out.insert(
                    id,
                    MatchDetailRow {
                        ft_score: join_score(item.get("fts_A"), item.get("fts_B")),
                        ht_score: join_score(item.get("hts_A"), item.get("hts_B")),
                        played: status == "Played",
                        kickoff,
                    },
                );
            }
        }
    }
    Ok(out)
}

/// Build fixture records from the bulletin, keeping only fixtures that also appear in
/// `details` and aren't postponed. Sorted by league, then kickoff time.
pub fn parse_bulletin_json(
    raw: &str,
    date: &str,
    details: &HashMap<String, MatchDetailRow>,
    tz_offset_hours: i64,
) -> Result<Vec<FixtureRecord>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let v: Value = serde_json::from_str(trimmed).context("invalid bulletin json")?;
    let mut out = Vec::new();
    let Some(areas) = v
        .get("data")
        .and_then(|d| d.get("soccer"))
        .and_then(Value::as_array)
    else {
        warn!("bulletin response has no soccer section");
        return Ok(out);
    };

    for area in areas {
        let league = area
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or("-")
            .to_string();
        let matches = area
            .get("matches")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        for item in matches {
            let Some(id) = item.get("id").and_then(value_to_text) else {
                continue;
            };
            let bulletin_status = item.get("status").and_then(Value::as_i64);
            if bulletin_status == Some(BULLETIN_POSTPONED) {
                continue;
            }
            let Some(detail) = details.get(&id) else {
                continue;
            };

            let status = if detail.played || bulletin_status == Some(BULLETIN_FINISHED) {
                FixtureStatus::Finished
            } else {
                FixtureStatus::NotStarted
            };

            out.push(FixtureRecord {
                id,
                date: date.to_string(),
                time: kickoff_time(detail.kickoff.as_deref(), tz_offset_hours),
                league: league.clone(),
                home_team: text_field(item, "team_A"),
                away_team: text_field(item, "team_B"),
                status,
                result: Some(FixtureResult {
                    ft_score: detail.ft_score.clone(),
                    ht_score: detail.ht_score.clone(),
                }),
                odds: parse_markets(item.get("markets")),
            });
        }
    }

    out.sort_by(|a, b| a.league.cmp(&b.league).then_with(|| a.time.cmp(&b.time)));
    Ok(out)
}

/// First price set of every recognised market. Unknown markets and outcome labels are
/// dropped; a price that isn't a number is kept as NaN so the market can't match.
fn parse_markets(markets: Option<&Value>) -> Odds {
    let mut odds = Odds::new();
    let Some(markets) = markets.and_then(Value::as_array) else {
        return odds;
    };
    for market in markets {
        let Some(kind) = market
            .get("i")
            .and_then(Value::as_u64)
            .and_then(Market::from_provider_code)
        else {
            continue;
        };
        let Some(prices) = market
            .get("o")
            .and_then(|o| o.get(0))
            .and_then(|first| first.get("l"))
            .and_then(Value::as_array)
        else {
            continue;
        };
        for price in prices {
            let Some(outcome) = price
                .get("n")
                .and_then(Value::as_str)
                .and_then(|label| Outcome::parse_for(kind, label))
            else {
                continue;
            };
            let value = price
                .get("v")
                .and_then(Value::as_f64)
                .unwrap_or(f64::NAN);
            odds.insert(OddsKey::new(kind, outcome), value);
        }
    }
    odds
}

/// Shift an `HH:MM` feed time by `offset_hours`, wrapping at midnight. `00:00` when unparseable.
pub fn kickoff_time(raw: Option<&str>, offset_hours: i64) -> String {
    let parsed = raw.and_then(|t| {
        let (hour, rest) = t.trim().split_once(':')?;
        let hour = hour.trim().parse::<i64>().ok()?;
        let minute = rest.get(..2).unwrap_or(rest).parse::<i64>().ok()?;
        if !(0..24).contains(&hour) || !(0..60).contains(&minute) {
            return None;
        }
        Some(((hour + offset_hours).rem_euclid(24), minute))
    });
    match parsed {
        Some((hour, minute)) => format!("{hour:02}:{minute:02}"),
        None => "00:00".to_string(),
    }
}

fn join_score(home: Option<&Value>, away: Option<&Value>) -> Option<String> {
    let home = home.and_then(value_to_text)?;
    let away = away.and_then(value_to_text)?;
    Some(format!("{home}-{away}"))
}

fn value_to_text(v: &Value) -> Option<String> {
    match v {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

fn text_field(item: &Value, key: &str) -> String {
    item.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::{join_score, kickoff_time, parse_markets, parse_token_json};
    use crate::market::{Market, OddsKey, Outcome, Side};
    use serde_json::json;

    #[test]
    fn kickoff_time_shifts_and_wraps() {
        assert_eq!(kickoff_time(Some("16:00"), 3), "19:00");
        assert_eq!(kickoff_time(Some("22:30"), 3), "01:30");
        assert_eq!(kickoff_time(Some("01:15"), -2), "23:15");
        assert_eq!(kickoff_time(Some("17:45:00"), 0), "17:45");
        assert_eq!(kickoff_time(Some("soon"), 3), "00:00");
        assert_eq!(kickoff_time(None, 3), "00:00");
    }

    #[test]
    fn score_needs_both_sides() {
        assert_eq!(
            join_score(Some(&json!(2)), Some(&json!("1"))),
            Some("2-1".to_string())
        );
        assert_eq!(join_score(Some(&json!(2)), Some(&json!(null))), None);
        assert_eq!(join_score(None, Some(&json!(0))), None);
    }

    #[test]
    fn markets_keep_first_price_set_only() {
        let markets = json!([
            { "i": 1, "o": [
                { "l": [ { "n": "1", "v": 2.1 }, { "n": "X", "v": 3.3 }, { "n": "2", "v": "-" } ] },
                { "l": [ { "n": "1", "v": 9.9 } ] }
            ]},
            { "i": 99, "o": [ { "l": [ { "n": "1", "v": 1.5 } ] } ] },
            { "i": 10, "o": [ { "l": [ { "n": "Üst", "v": 1.8 }, { "n": "Korner", "v": 2.0 } ] } ] }
        ]);
        let odds = parse_markets(Some(&markets));
        assert_eq!(odds.len(), 4);
        let home = OddsKey::new(Market::MatchResult, Outcome::Result(Side::Home));
        assert_eq!(odds.price(&home), Some(2.1));
        let away = OddsKey::new(Market::MatchResult, Outcome::Result(Side::Away));
        assert!(odds.contains(&away));
        assert_eq!(odds.price(&away), None);
        assert_eq!(
            odds.price(&OddsKey::new(Market::OverUnder25, Outcome::Over)),
            Some(1.8)
        );
    }

    #[test]
    fn token_is_required() {
        assert_eq!(
            parse_token_json(r#"{"data":{"token":"abc"}}"#).expect("token"),
            "abc"
        );
        assert!(parse_token_json(r#"{"data":{}}"#).is_err());
        assert!(parse_token_json("not json").is_err());
    }
}
