use std::path::Path;

use anyhow::{Context, Result, anyhow};
use chrono::{NaiveDate, Utc};
use tracing::{info, warn};

use oddsmatch::analysis::{self, FixtureAnalysis};
use oddsmatch::config::{self, AppConfig};
use oddsmatch::corpus::{CorpusStore, JsonCorpusStore};
use oddsmatch::export;
use oddsmatch::fixture::FixtureRecord;
use oddsmatch::fixture_feed::{FixtureSource, MackolikFeed};
use oddsmatch::logging;
use oddsmatch::market::{Market, standard_markets};
use oddsmatch::narrative::{self, GeminiNarrator, NarrativeGenerator, NarrativePick};
use oddsmatch::synthetic;

const CONTEXT_MATCH_LIMIT: usize = 10;
const PRINT_MATCH_LIMIT: usize = 5;
const DEFAULT_DEMO_SEED: u64 = 42;
const DEMO_DAYS: usize = 180;
const DEMO_PER_DAY: usize = 24;
const DEMO_TARGETS: usize = 6;

fn main() -> Result<()> {
    config::load_dotenv();
    logging::init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let Some(command) = args.first() else {
        print_usage();
        return Ok(());
    };
    let config = AppConfig::from_env()?;

    match command.as_str() {
        "fetch" => run_fetch(&config, &args),
        "analyze" => run_analyze(&config, &args),
        "status" => run_status(&config),
        "demo" => run_demo(&config, &args),
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            print_usage();
            Err(anyhow!("unknown command {other:?}"))
        }
    }
}

fn print_usage() {
    println!("usage:");
    println!("  oddsmatch fetch <YYYY-MM-DD>");
    println!("  oddsmatch analyze <YYYY-MM-DD> [--team <name>] [--export <path.xlsx>] [--narrate]");
    println!("  oddsmatch status");
    println!("  oddsmatch demo [--seed <n>] [--export <path.xlsx>]");
}

fn run_fetch(config: &AppConfig, args: &[String]) -> Result<()> {
    let date = date_arg(args)?;
    let store = JsonCorpusStore::new(&config.historic_data_file);
    let mut corpus = store.load()?;

    let feed = MackolikFeed::new(config.feed_tz_offset_hours);
    let fixtures = feed.fetch_fixtures(date)?;
    let key = date.format("%Y-%m-%d").to_string();
    let report = corpus.merge_day(&key, fixtures);
    corpus.touch();
    store.save(&corpus)?;

    println!("Fetched {key}");
    println!(
        "inserted={} updated={} unchanged={}",
        report.inserted, report.updated, report.unchanged
    );
    for fixture in corpus.fixtures_on(&key) {
        println!(
            "{} {:<24} {:<40} {:>5} odds={}",
            fixture.time,
            truncate(&fixture.league, 24),
            truncate(&fixture.title(), 40),
            score_label(fixture),
            fixture.odds.len()
        );
    }
    Ok(())
}

fn run_analyze(config: &AppConfig, args: &[String]) -> Result<()> {
    let date = date_arg(args)?;
    let key = date.format("%Y-%m-%d").to_string();
    let store = JsonCorpusStore::new(&config.historic_data_file);
    let mut corpus = store.load()?;

    if corpus.fixtures_on(&key).is_empty() {
        info!(date = %key, "no stored fixtures for day, fetching");
        let feed = MackolikFeed::new(config.feed_tz_offset_hours);
        let fixtures = feed.fetch_fixtures(date)?;
        corpus.merge_day(&key, fixtures);
        corpus.touch();
        store.save(&corpus)?;
    }

    let mut targets = analysis::pending_targets(corpus.fixtures_on(&key));
    if let Some(team) = flag_value(args, "--team") {
        targets = analysis::filter_by_team(targets, &team);
    }
    if targets.is_empty() {
        println!("No fixtures to analyse on {key}");
        return Ok(());
    }

    let history = corpus.snapshot();
    let analyses = analysis::analyze_all(
        &targets,
        &history,
        &config.similarity,
        standard_markets(),
    );
    for item in &analyses {
        print_analysis(item);
    }

    if let Some(path) = flag_value(args, "--export") {
        export_to(Path::new(&path), &analyses)?;
    }

    if has_flag(args, "--narrate") {
        narrate(config, &analyses)?;
    }
    Ok(())
}

fn run_status(config: &AppConfig) -> Result<()> {
    let store = JsonCorpusStore::new(&config.historic_data_file);
    let corpus = store.load()?;
    println!("Corpus: {}", store.path().display());
    println!("Days: {}", corpus.matches.len());
    println!("Fixtures: {}", corpus.len());
    println!("Finished: {}", corpus.finished_count());
    println!(
        "Last update: {}",
        corpus
            .last_update
            .map(|ts| ts.to_rfc3339())
            .unwrap_or_else(|| "never".to_string())
    );
    println!(
        "Similarity: tolerance={} min_markets={}",
        config.similarity.tolerance, config.similarity.min_matched_markets
    );
    Ok(())
}

fn run_demo(config: &AppConfig, args: &[String]) -> Result<()> {
    let seed = match flag_value(args, "--seed") {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .with_context(|| format!("invalid --seed {raw:?}"))?,
        None => DEFAULT_DEMO_SEED,
    };
    let corpus = synthetic::generate_corpus(seed, DEMO_DAYS, DEMO_PER_DAY);
    let targets = synthetic::generate_targets(
        seed.wrapping_add(1),
        Utc::now().date_naive(),
        DEMO_TARGETS,
    );
    println!(
        "Synthetic corpus: {} fixtures over {} days (seed {seed})",
        corpus.len(),
        corpus.matches.len()
    );

    let history = corpus.snapshot();
    let analyses = analysis::analyze_all(
        &targets,
        &history,
        &config.similarity,
        standard_markets(),
    );
    for item in &analyses {
        print_analysis(item);
    }

    if let Some(path) = flag_value(args, "--export") {
        export_to(Path::new(&path), &analyses)?;
    }
    Ok(())
}

fn export_to(path: &Path, analyses: &[FixtureAnalysis<'_>]) -> Result<()> {
    let report = export::export_analysis(path, analyses)?;
    println!(
        "Exported {} fixtures, {} frequency rows, {} similar matches to {}",
        report.fixtures,
        report.frequencies,
        report.similar_matches,
        path.display()
    );
    Ok(())
}

fn narrate(config: &AppConfig, analyses: &[FixtureAnalysis<'_>]) -> Result<()> {
    let Some(api_key) = config.gemini_api_key.as_deref() else {
        warn!("GEMINI_API_KEY not set, skipping narratives");
        return Ok(());
    };
    let narrator = GeminiNarrator::new(api_key, config.gemini_model.clone());
    for item in analyses {
        if item.matched.is_empty() {
            continue;
        }
        let context =
            narrative::context_block(item.target, &item.matched, &item.table, CONTEXT_MATCH_LIMIT);
        let text = match narrator.generate(&context) {
            Ok(text) => text,
            Err(err) => {
                warn!(fixture = %item.target.title(), error = %err, "narrative failed");
                continue;
            }
        };
        let parsed = narrative::parse_narrative(&text);
        println!();
        println!("Narrative: {}", item.target.title());
        print_pick("MS", &parsed.match_result);
        print_pick("IY/MS", &parsed.half_full);
        print_pick("IY Sonucu", &parsed.first_half);
        print_pick("Gol", &parsed.goals);
        print_pick("KG", &parsed.both_score);
    }
    Ok(())
}

fn print_pick(label: &str, pick: &NarrativePick) {
    let Some(prediction) = pick.prediction.as_deref() else {
        return;
    };
    let confidence = pick
        .confidence
        .map(|c| format!("{c:?}"))
        .unwrap_or_else(|| "-".to_string());
    println!(
        "  {label:<10} {prediction:<8} {confidence:<7} {}",
        pick.reason.as_deref().unwrap_or("")
    );
}

fn print_analysis(item: &FixtureAnalysis<'_>) {
    let target = item.target;
    println!();
    println!(
        "{} {} | {} | {}",
        target.date,
        target.time,
        target.league,
        target.title()
    );
    println!("{}", item.table.summary);
    if item.table.sample_size == 0 {
        return;
    }
    for market in Market::ALL {
        let cells = item
            .table
            .market(market)
            .map(|(outcome, freq)| format!("{outcome} {:.1}%", freq.percentage))
            .collect::<Vec<_>>();
        if !cells.is_empty() {
            println!("  {:<16} {}", market.label(), cells.join("  "));
        }
    }
    for record in item.matched.iter().take(PRINT_MATCH_LIMIT) {
        println!(
            "    {} {:<40} {:>5} markets={}",
            record.fixture.date,
            truncate(&record.fixture.title(), 40),
            score_label(record.fixture),
            record.matched_markets
        );
    }
}

fn score_label(fixture: &FixtureRecord) -> String {
    fixture
        .full_time()
        .map(|s| format!("{}-{}", s.home, s.away))
        .unwrap_or_else(|| "-".to_string())
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out = text.chars().take(max.saturating_sub(1)).collect::<String>();
    out.push('…');
    out
}

fn date_arg(args: &[String]) -> Result<NaiveDate> {
    let raw = args
        .get(1)
        .filter(|a| !a.starts_with("--"))
        .ok_or_else(|| anyhow!("missing date argument (YYYY-MM-DD)"))?;
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .with_context(|| format!("invalid date {raw:?}, expected YYYY-MM-DD"))
}

fn flag_value(args: &[String], name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

fn has_flag(args: &[String], name: &str) -> bool {
    args.iter().any(|a| a == name)
}
