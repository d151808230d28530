use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use chrono::{Duration as ChronoDuration, NaiveDate};
use tracing::{info, warn};

use oddsmatch::config::{self, AppConfig};
use oddsmatch::corpus::{CorpusStore, JsonCorpusStore};
use oddsmatch::fixture_feed::{FixtureSource, MackolikFeed};
use oddsmatch::logging;

const MAX_RANGE_DAYS: i64 = 366;
const DAY_PAUSE: Duration = Duration::from_millis(750);

fn main() -> Result<()> {
    config::load_dotenv();
    logging::init();
    let config = AppConfig::from_env()?;

    let from = parse_date_arg("--from")?.ok_or_else(|| anyhow!("--from <YYYY-MM-DD> is required"))?;
    let to = parse_date_arg("--to")?.unwrap_or(from);
    if to < from {
        return Err(anyhow!("--to {to} is before --from {from}"));
    }
    let span = (to - from).num_days() + 1;
    if span > MAX_RANGE_DAYS {
        return Err(anyhow!("range of {span} days exceeds {MAX_RANGE_DAYS}"));
    }

    let db_path = parse_db_path_arg().unwrap_or_else(|| config.historic_data_file.clone());
    let store = JsonCorpusStore::new(&db_path);
    let mut corpus = store.load()?;
    let feed = MackolikFeed::new(config.feed_tz_offset_hours);

    let mut days_ok = 0usize;
    let mut inserted = 0usize;
    let mut updated = 0usize;
    let mut errors = Vec::new();
    for offset in 0..span {
        let date = from + ChronoDuration::days(offset);
        let key = date.format("%Y-%m-%d").to_string();
        match feed.fetch_fixtures(date) {
            Ok(fixtures) => {
                let report = corpus.merge_day(&key, fixtures);
                corpus.touch();
                store
                    .save(&corpus)
                    .with_context(|| format!("save after {key}"))?;
                info!(
                    date = %key,
                    inserted = report.inserted,
                    updated = report.updated,
                    "day ingested"
                );
                days_ok += 1;
                inserted += report.inserted;
                updated += report.updated;
            }
            Err(err) => {
                warn!(date = %key, error = %err, "day failed");
                errors.push(format!("{key}: {err:#}"));
            }
        }
        if offset + 1 < span {
            thread::sleep(DAY_PAUSE);
        }
    }

    println!("Corpus ingest complete");
    println!("File: {}", store.path().display());
    println!("Days: {days_ok}/{span}");
    println!("Fixtures inserted: {inserted}");
    println!("Fixtures updated: {updated}");
    println!("Corpus size: {}", corpus.len());
    if !errors.is_empty() {
        println!("errors: {}", errors.len());
        for err in errors.iter().take(6) {
            println!("   - {err}");
        }
    }
    Ok(())
}

fn parse_date_arg(name: &str) -> Result<Option<NaiveDate>> {
    let Some(raw) = arg_value(name) else {
        return Ok(None);
    };
    let date = NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .with_context(|| format!("invalid {name} date {raw:?}"))?;
    Ok(Some(date))
}

fn parse_db_path_arg() -> Option<PathBuf> {
    arg_value("--db").map(PathBuf::from)
}

fn arg_value(name: &str) -> Option<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let prefix = format!("{name}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == name {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(next.trim().to_string());
            }
        }
    }
    None
}
