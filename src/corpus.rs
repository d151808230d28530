use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::fixture::{FixtureRecord, FixtureResult};

/// Historical fixtures grouped by calendar day (`YYYY-MM-DD`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Corpus {
    #[serde(default)]
    pub matches: BTreeMap<String, Vec<FixtureRecord>>,
    #[serde(default)]
    pub last_update: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
}

impl Corpus {
    /// Every fixture, in day order then feed order.
    pub fn snapshot(&self) -> Vec<FixtureRecord> {
        self.matches.values().flatten().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.matches.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn fixtures_on(&self, date: &str) -> &[FixtureRecord] {
        self.matches.get(date).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn finished_count(&self) -> usize {
        self.matches
            .values()
            .flatten()
            .filter(|f| f.is_finished())
            .count()
    }

    /// Merge a freshly fetched day. New ids are appended; known ids take the incoming status,
    /// any incoming non-null score, and the incoming prices when there are any.
    pub fn merge_day(&mut self, date: &str, incoming: Vec<FixtureRecord>) -> MergeReport {
        let day = self.matches.entry(date.to_string()).or_default();
        let mut report = MergeReport::default();
        for fresh in incoming {
            match day.iter_mut().find(|existing| existing.id == fresh.id) {
                Some(existing) => {
                    if update_fixture(existing, fresh) {
                        report.updated += 1;
                    } else {
                        report.unchanged += 1;
                    }
                }
                None => {
                    day.push(fresh);
                    report.inserted += 1;
                }
            }
        }
        report
    }

    pub fn touch(&mut self) {
        self.last_update = Some(Utc::now());
    }
}

fn update_fixture(existing: &mut FixtureRecord, fresh: FixtureRecord) -> bool {
    let mut updated = false;

    if existing.status != fresh.status {
        existing.status = fresh.status;
        updated = true;
    }

    if let Some(fresh_result) = fresh.result {
        let result = existing.result.get_or_insert_with(FixtureResult::default);
        if fresh_result.ft_score.is_some() && result.ft_score != fresh_result.ft_score {
            result.ft_score = fresh_result.ft_score;
            updated = true;
        }
        if fresh_result.ht_score.is_some() && result.ht_score != fresh_result.ht_score {
            result.ht_score = fresh_result.ht_score;
            updated = true;
        }
    }

    if !fresh.odds.is_empty() && existing.odds != fresh.odds {
        existing.odds = fresh.odds;
        updated = true;
    }

    updated
}

pub trait CorpusStore {
    fn load(&self) -> Result<Corpus>;
    fn save(&self, corpus: &Corpus) -> Result<()>;
}

/// The corpus as one pretty-printed JSON file.
#[derive(Debug, Clone)]
pub struct JsonCorpusStore {
    path: PathBuf,
}

impl JsonCorpusStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CorpusStore for JsonCorpusStore {
    /// A missing or empty file, or one without `matches`, loads as an empty corpus.
    fn load(&self) -> Result<Corpus> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "corpus file not found, starting empty");
                return Ok(Corpus::default());
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("read corpus {}", self.path.display()));
            }
        };
        if raw.trim().is_empty() {
            info!(path = %self.path.display(), "corpus file empty, starting empty");
            return Ok(Corpus::default());
        }

        let value: serde_json::Value = serde_json::from_str(&raw)
            .with_context(|| format!("parse corpus {}", self.path.display()))?;
        if value.get("matches").is_none() {
            warn!(path = %self.path.display(), "corpus file has no matches key, starting empty");
            return Ok(Corpus::default());
        }
        let corpus: Corpus = serde_json::from_value(value)
            .with_context(|| format!("decode corpus {}", self.path.display()))?;
        info!(
            path = %self.path.display(),
            days = corpus.matches.len(),
            fixtures = corpus.len(),
            "corpus loaded"
        );
        Ok(corpus)
    }

    fn save(&self, corpus: &Corpus) -> Result<()> {
        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
        {
            fs::create_dir_all(dir)
                .with_context(|| format!("create corpus dir {}", dir.display()))?;
        }

        let mut normalized = corpus.clone();
        for fixture in normalized.matches.values_mut().flatten() {
            if fixture.time.len() > 5 {
                fixture.time = fixture.time.chars().take(5).collect();
            }
        }

        let json = serde_json::to_string_pretty(&normalized).context("serialize corpus")?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).context("write corpus")?;
        fs::rename(&tmp, &self.path).context("swap corpus")?;
        info!(path = %self.path.display(), fixtures = corpus.len(), "corpus saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Corpus;
    use crate::fixture::{FixtureRecord, FixtureResult, FixtureStatus, Odds};
    use crate::market::{Market, OddsKey, Outcome};

    fn fixture(id: &str, status: FixtureStatus, ft: Option<&str>) -> FixtureRecord {
        FixtureRecord {
            id: id.to_string(),
            date: "2024-05-25".to_string(),
            time: "19:00".to_string(),
            league: "Lig".to_string(),
            home_team: format!("Home {id}"),
            away_team: format!("Away {id}"),
            status,
            result: Some(FixtureResult::new(ft, None)),
            odds: Odds::new(),
        }
    }

    #[test]
    fn merge_inserts_then_updates_scores() {
        let mut corpus = Corpus::default();
        let report = corpus.merge_day(
            "2024-05-25",
            vec![
                fixture("1", FixtureStatus::NotStarted, None),
                fixture("2", FixtureStatus::NotStarted, None),
            ],
        );
        assert_eq!(report.inserted, 2);

        let report = corpus.merge_day(
            "2024-05-25",
            vec![
                fixture("1", FixtureStatus::Finished, Some("2-0")),
                fixture("2", FixtureStatus::NotStarted, None),
            ],
        );
        assert_eq!(report.inserted, 0);
        assert_eq!(report.updated, 1);
        assert_eq!(report.unchanged, 1);

        let day = corpus.fixtures_on("2024-05-25");
        assert!(day[0].is_finished());
        assert_eq!(day[0].result.as_ref().and_then(|r| r.ft_score.as_deref()), Some("2-0"));
        assert_eq!(corpus.finished_count(), 1);
    }

    #[test]
    fn merge_keeps_known_score_when_feed_sends_null() {
        let mut corpus = Corpus::default();
        corpus.merge_day("d", vec![fixture("1", FixtureStatus::Finished, Some("1-1"))]);
        corpus.merge_day("d", vec![fixture("1", FixtureStatus::Finished, None)]);
        let day = corpus.fixtures_on("d");
        assert_eq!(day[0].result.as_ref().and_then(|r| r.ft_score.as_deref()), Some("1-1"));
    }

    #[test]
    fn merge_keeps_prices_when_feed_sends_none() {
        let mut corpus = Corpus::default();
        let mut priced = fixture("1", FixtureStatus::NotStarted, None);
        priced
            .odds
            .insert(OddsKey::new(Market::BothTeamsScore, Outcome::Yes), 1.72);
        corpus.merge_day("d", vec![priced]);
        corpus.merge_day("d", vec![fixture("1", FixtureStatus::Finished, Some("0-0"))]);
        assert_eq!(corpus.fixtures_on("d")[0].odds.len(), 1);
    }

    #[test]
    fn snapshot_is_in_day_order() {
        let mut corpus = Corpus::default();
        corpus.merge_day("2024-05-26", vec![fixture("b", FixtureStatus::Finished, None)]);
        corpus.merge_day("2024-05-25", vec![fixture("a", FixtureStatus::Finished, None)]);
        let ids: Vec<String> = corpus.snapshot().into_iter().map(|f| f.id).collect();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(corpus.len(), 2);
        assert!(corpus.fixtures_on("2024-01-01").is_empty());
    }
}
