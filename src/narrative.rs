use std::fmt::Write as _;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::fixture::FixtureRecord;
use crate::http_client::http_client;
use crate::market::{Market, Side};
use crate::matcher::MatchedRecord;
use crate::stats::FrequencyTable;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const LOG_PREVIEW_CHARS: usize = 500;

/// Turns an analysis context block into free text.
pub trait NarrativeGenerator {
    fn generate(&self, context: &str) -> Result<String>;
}

/// Render the text block a narrative generator reads: the target fixture and its prices,
/// the outcome frequencies of every market, and up to `limit` of the closest fixtures.
pub fn context_block(
    target: &FixtureRecord,
    matched: &[MatchedRecord<'_>],
    table: &FrequencyTable,
    limit: usize,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Fixture: {} ({})", target.title(), target.league);
    let _ = writeln!(out, "Kickoff: {} {}", target.date, target.time);

    if !target.odds.is_empty() {
        let _ = writeln!(out, "Odds:");
        for market in Market::ALL {
            let prices: Vec<String> = target
                .odds
                .iter()
                .filter(|(key, _)| key.market == market)
                .filter(|(_, price)| price.is_finite())
                .map(|(key, price)| format!("{}={:.2}", key.outcome, price))
                .collect();
            if !prices.is_empty() {
                let _ = writeln!(out, "  {}: {}", market, prices.join(", "));
            }
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "{}", table.summary);
    if table.sample_size > 0 {
        for market in Market::ALL {
            let cells: Vec<String> = table
                .market(market)
                .map(|(outcome, freq)| {
                    format!(
                        "{} {:.1}% ({}/{})",
                        outcome, freq.percentage, freq.realized, freq.total
                    )
                })
                .collect();
            if !cells.is_empty() {
                let _ = writeln!(out, "  {}: {}", market, cells.join(", "));
            }
        }
    }

    if !matched.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Closest historical fixtures:");
        for record in matched.iter().take(limit) {
            let fixture = record.fixture;
            let result = fixture.result.as_ref();
            let _ = writeln!(
                out,
                "  {} | {} | {} | FT {} | HT {} | {} markets",
                fixture.date,
                if fixture.league.is_empty() { "-" } else { fixture.league.as_str() },
                fixture.title(),
                result.and_then(|r| r.ft_score.as_deref()).unwrap_or("?"),
                result.and_then(|r| r.ht_score.as_deref()).unwrap_or("?"),
                record.matched_markets,
            );
        }
    }
    out
}

/// Instructions plus context, asking for the sectioned answer [`parse_narrative`] reads.
pub fn build_prompt(context: &str) -> String {
    let mut prompt = String::new();
    prompt.push_str(
        "You are a football analyst. The statistics below come from past fixtures whose \
         betting prices were close to this fixture's. Use them as evidence, not certainty.\n\n",
    );
    prompt.push_str(context);
    prompt.push_str(
        "\nAnswer with exactly these lines (confidence is one of Düşük, Orta, Yüksek):\n\
         MS Tahmin: <1|X|2>\nMS Güven: <confidence>\nMS Gerekçe: <one sentence>\n\
         IY/MS Tahmin: <1|X|2>/<1|X|2>\nIY/MS Güven: <confidence>\nIY/MS Gerekçe: <one sentence>\n\
         IY Sonucu Tahmin: <1|X|2>\nIY Sonucu Güven: <confidence>\nIY Sonucu Gerekçe: <one sentence>\n\
         Gol Tahmin: <Alt|Üst> 2.5\nGol Güven: <confidence>\nGol Gerekçe: <one sentence>\n\
         KG Tahmin: <Var|Yok>\nKG Güven: <confidence>\nKG Gerekçe: <one sentence>\n",
    );
    prompt
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        [
            ("Düşük", Confidence::Low),
            ("Orta", Confidence::Medium),
            ("Yüksek", Confidence::High),
        ]
        .into_iter()
        .find(|(label, _)| strip_prefix_ignore_case(raw, label).is_some())
        .map(|(_, level)| level)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NarrativePick {
    pub prediction: Option<String>,
    pub confidence: Option<Confidence>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NarrativeAnalysis {
    pub match_result: NarrativePick,
    pub half_full: NarrativePick,
    pub first_half: NarrativePick,
    pub goals: NarrativePick,
    pub both_score: NarrativePick,
}

/// Pull the sectioned picks out of a generator response. Labels are matched without regard
/// to case, and a prediction only needs to start with a well-formed pick, so trailing notes
/// such as `Var (yüksek)` are dropped. Lines that don't fit a section are ignored.
pub fn parse_narrative(text: &str) -> NarrativeAnalysis {
    let mut analysis = NarrativeAnalysis::default();
    for line in text.lines() {
        let line = line.replace("**", "");
        let line = line.trim().trim_start_matches(['-', '*', ' ']);
        // Longest prefixes first: "IY/MS" and "IY Sonucu" would otherwise not be reached.
        let sections: [(&str, &mut NarrativePick, fn(&str) -> Option<String>); 5] = [
            ("IY/MS", &mut analysis.half_full, half_full_pick),
            ("IY Sonucu", &mut analysis.first_half, side_pick),
            ("MS", &mut analysis.match_result, side_pick),
            ("Gol", &mut analysis.goals, goal_pick),
            ("KG", &mut analysis.both_score, both_score_pick),
        ];
        for (section, pick, read_pick) in sections {
            let Some(rest) = strip_prefix_ignore_case(line, section) else {
                continue;
            };
            let rest = rest.trim_start();
            if let Some(value) = field(rest, "Tahmin:") {
                if pick.prediction.is_none() {
                    pick.prediction = read_pick(value);
                }
            } else if let Some(value) = field(rest, "Güven:") {
                if pick.confidence.is_none() {
                    pick.confidence = Confidence::parse(value);
                }
            } else if let Some(value) = field(rest, "Gerekçe:")
                && pick.reason.is_none()
                && !value.is_empty()
            {
                pick.reason = Some(value.to_string());
            }
            break;
        }
    }
    analysis
}

/// `strip_prefix` comparing characters case-insensitively.
fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let mut chars = text.char_indices();
    for expected in prefix.chars() {
        let (_, actual) = chars.next()?;
        if !actual.to_lowercase().eq(expected.to_lowercase()) {
            return None;
        }
    }
    let end = chars.next().map_or(text.len(), |(idx, _)| idx);
    Some(&text[end..])
}

fn field<'a>(rest: &'a str, name: &str) -> Option<&'a str> {
    strip_prefix_ignore_case(rest, name).map(str::trim)
}

fn leading_side(value: &str) -> Option<(Side, &str)> {
    let mut chars = value.chars();
    let first = chars.next()?;
    let side = Side::from_label(first.encode_utf8(&mut [0; 4]))?;
    Some((side, chars.as_str()))
}

fn side_pick(value: &str) -> Option<String> {
    leading_side(value).map(|(side, _)| side.label().to_string())
}

fn half_full_pick(value: &str) -> Option<String> {
    let (half, rest) = leading_side(value)?;
    let (full, _) = leading_side(rest.strip_prefix('/')?)?;
    Some(format!("{}/{}", half.label(), full.label()))
}

fn goal_pick(value: &str) -> Option<String> {
    let (side, rest) = ["Alt", "Üst"]
        .into_iter()
        .find_map(|side| strip_prefix_ignore_case(value, side).map(|rest| (side, rest)))?;
    let rest = rest.trim_start();
    let digits = rest
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(rest.len());
    let line = rest[..digits].trim_end_matches('.');
    if !line.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    line.parse::<f64>().ok()?;
    Some(format!("{side} {line}"))
}

fn both_score_pick(value: &str) -> Option<String> {
    ["Var", "Yok"]
        .into_iter()
        .find(|label| strip_prefix_ignore_case(value, label).is_some())
        .map(str::to_string)
}

/// Narratives from the Gemini `generateContent` REST endpoint.
#[derive(Debug, Clone)]
pub struct GeminiNarrator {
    api_key: String,
    model: String,
}

impl GeminiNarrator {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

impl NarrativeGenerator for GeminiNarrator {
    fn generate(&self, context: &str) -> Result<String> {
        let prompt = build_prompt(context);
        debug!(prompt = %preview(&prompt), "sending prompt to gemini");

        let url = format!(
            "{GEMINI_API_BASE}/{}:generateContent?key={}",
            self.model, self.api_key
        );
        let body = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: &prompt }],
            }],
        };
        let resp = http_client()?
            .post(&url)
            .json(&body)
            .send()
            .context("gemini request failed")?;
        let status = resp.status();
        let raw = resp.text().context("failed reading gemini body")?;
        if !status.is_success() {
            return Err(anyhow!("gemini http {}: {}", status, preview(&raw)));
        }
        let text = extract_text(&raw)?;
        debug!(response = %preview(&text), "gemini response");
        Ok(text)
    }
}

fn extract_text(raw: &str) -> Result<String> {
    let parsed: GenerateResponse = serde_json::from_str(raw).context("invalid gemini json")?;
    let Some(candidate) = parsed.candidates.first() else {
        let reason = parsed
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "unknown".to_string());
        warn!(reason = %reason, "gemini returned no candidates");
        return Err(anyhow!("gemini returned no candidates (reason: {reason})"));
    };
    if candidate.finish_reason.as_deref() == Some("SAFETY") {
        return Err(anyhow!("gemini response stopped by safety filters"));
    }
    let text: String = candidate
        .content
        .iter()
        .flat_map(|c| c.parts.iter())
        .filter_map(|p| p.text.as_deref())
        .collect();
    if text.trim().is_empty() {
        return Err(anyhow!("gemini returned an empty response"));
    }
    Ok(text)
}

fn preview(text: &str) -> String {
    let mut out: String = text.chars().take(LOG_PREVIEW_CHARS).collect();
    if text.chars().count() > LOG_PREVIEW_CHARS {
        out.push_str("...");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{Confidence, extract_text, parse_narrative};

    #[test]
    fn parses_sectioned_response() {
        let text = "\
**MS Tahmin:** 1
MS Güven: Yüksek
MS Gerekçe: Home side won most similar fixtures.
Extra detail on a second line.
IY/MS Tahmin: X/1
IY/MS Güven: orta
IY Sonucu Tahmin: X
Gol Tahmin: Üst 2.5
Gol Güven: Düşük
KG Tahmin: Belki
";
        let a = parse_narrative(text);
        assert_eq!(a.match_result.prediction.as_deref(), Some("1"));
        assert_eq!(a.match_result.confidence, Some(Confidence::High));
        assert_eq!(
            a.match_result.reason.as_deref(),
            Some("Home side won most similar fixtures.")
        );
        assert_eq!(a.half_full.prediction.as_deref(), Some("X/1"));
        assert_eq!(a.half_full.confidence, Some(Confidence::Medium));
        assert_eq!(a.first_half.prediction.as_deref(), Some("X"));
        assert_eq!(a.goals.prediction.as_deref(), Some("Üst 2.5"));
        assert_eq!(a.goals.confidence, Some(Confidence::Low));
        // Not one of Var/Yok.
        assert_eq!(a.both_score.prediction, None);
    }

    #[test]
    fn labels_ignore_case_and_picks_ignore_trailing_notes() {
        let text = "\
ms tahmin: x
iy/ms TAHMIN: 2/x (riskli)
IY SONUCU Tahmin: 1.
Gol Tahmin: üst2.5 gol
Gol güven: YÜKSEK.
KG Tahmin: Var (yüksek)
KG Gerekçe: Both sides scored in most similar fixtures.
";
        let a = parse_narrative(text);
        assert_eq!(a.match_result.prediction.as_deref(), Some("X"));
        assert_eq!(a.half_full.prediction.as_deref(), Some("2/X"));
        assert_eq!(a.first_half.prediction.as_deref(), Some("1"));
        assert_eq!(a.goals.prediction.as_deref(), Some("Üst 2.5"));
        assert_eq!(a.goals.confidence, Some(Confidence::High));
        assert_eq!(a.both_score.prediction.as_deref(), Some("Var"));
        assert_eq!(
            a.both_score.reason.as_deref(),
            Some("Both sides scored in most similar fixtures.")
        );
    }

    #[test]
    fn malformed_picks_are_skipped() {
        let text = "\
MS Tahmin: Ev sahibi
IY/MS Tahmin: 1/
Gol Tahmin: Üst
Gol Tahmin: Alt 1.5
";
        let a = parse_narrative(text);
        assert_eq!(a.match_result.prediction, None);
        assert_eq!(a.half_full.prediction, None);
        // The first well-formed goal line wins.
        assert_eq!(a.goals.prediction.as_deref(), Some("Alt 1.5"));
    }

    #[test]
    fn gemini_text_parts_are_joined() {
        let raw = r#"{"candidates":[{"content":{"parts":[{"text":"MS Tahmin: 2"},{"text":"\nKG Tahmin: Var"}]},"finishReason":"STOP"}]}"#;
        let text = extract_text(raw).expect("text");
        assert_eq!(text, "MS Tahmin: 2\nKG Tahmin: Var");
    }

    #[test]
    fn gemini_block_is_an_error() {
        let raw = r#"{"candidates":[],"promptFeedback":{"blockReason":"SAFETY"}}"#;
        let err = extract_text(raw).expect_err("blocked");
        assert!(err.to_string().contains("SAFETY"));

        let raw = r#"{"candidates":[{"finishReason":"SAFETY"}]}"#;
        assert!(extract_text(raw).is_err());
    }
}
