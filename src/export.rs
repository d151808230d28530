use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};
use tracing::info;

use crate::analysis::FixtureAnalysis;
use crate::market::Market;

pub struct ExportReport {
    pub fixtures: usize,
    pub frequencies: usize,
    pub similar_matches: usize,
}

/// Write one workbook with a row per analysed fixture, its outcome frequencies and the
/// historical fixtures behind them.
pub fn export_analysis(path: &Path, analyses: &[FixtureAnalysis<'_>]) -> Result<ExportReport> {
    let mut fixture_rows = vec![vec![
        "Fixture ID".to_string(),
        "Date".to_string(),
        "Time".to_string(),
        "League".to_string(),
        "Home".to_string(),
        "Away".to_string(),
        "Similar".to_string(),
        "Scored".to_string(),
        "Summary".to_string(),
        "MS Leader".to_string(),
        "KG Leader".to_string(),
        "A/U 2.5 Leader".to_string(),
    ]];

    let mut frequency_rows = vec![vec![
        "Fixture ID".to_string(),
        "Fixture".to_string(),
        "Market".to_string(),
        "Outcome".to_string(),
        "Price".to_string(),
        "Realized".to_string(),
        "Total".to_string(),
        "Percentage".to_string(),
    ]];

    let mut similar_rows = vec![vec![
        "Fixture ID".to_string(),
        "Fixture".to_string(),
        "Historical ID".to_string(),
        "Date".to_string(),
        "League".to_string(),
        "Home".to_string(),
        "Away".to_string(),
        "FT".to_string(),
        "HT".to_string(),
        "Matched Markets".to_string(),
        "Markets".to_string(),
    ]];

    for analysis in analyses {
        fixture_rows.push(fixture_row(analysis));
        frequency_rows.extend(frequency_rows_for(analysis));
        similar_rows.extend(similar_rows_for(analysis));
    }

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Fixtures")?;
        write_rows(sheet, &fixture_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Frequencies")?;
        write_rows(sheet, &frequency_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("SimilarMatches")?;
        write_rows(sheet, &similar_rows)?;
    }

    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;

    let report = ExportReport {
        fixtures: fixture_rows.len().saturating_sub(1),
        frequencies: frequency_rows.len().saturating_sub(1),
        similar_matches: similar_rows.len().saturating_sub(1),
    };
    info!(
        path = %path.display(),
        fixtures = report.fixtures,
        similar = report.similar_matches,
        "analysis exported"
    );
    Ok(report)
}

fn fixture_row(analysis: &FixtureAnalysis<'_>) -> Vec<String> {
    let target = analysis.target;
    let leader = |market: Market| {
        analysis
            .table
            .leader(market)
            .filter(|(_, freq)| freq.realized > 0)
            .map(|(outcome, freq)| format!("{} ({:.1}%)", outcome, freq.percentage))
            .unwrap_or_default()
    };
    vec![
        target.id.clone(),
        target.date.clone(),
        target.time.clone(),
        target.league.clone(),
        target.home_team.clone(),
        target.away_team.clone(),
        analysis.table.sample_size.to_string(),
        analysis.table.scored.to_string(),
        analysis.table.summary.clone(),
        leader(Market::MatchResult),
        leader(Market::BothTeamsScore),
        leader(Market::OverUnder25),
    ]
}

fn frequency_rows_for(analysis: &FixtureAnalysis<'_>) -> Vec<Vec<String>> {
    let target = analysis.target;
    analysis
        .table
        .iter()
        .map(|(key, freq)| {
            vec![
                target.id.clone(),
                target.title(),
                key.market.to_string(),
                key.outcome.to_string(),
                price_cell(target.odds.price(key)),
                freq.realized.to_string(),
                freq.total.to_string(),
                format!("{:.1}", freq.percentage),
            ]
        })
        .collect()
}

fn similar_rows_for(analysis: &FixtureAnalysis<'_>) -> Vec<Vec<String>> {
    let target = analysis.target;
    analysis
        .matched
        .iter()
        .map(|record| {
            let fixture = record.fixture;
            let result = fixture.result.as_ref();
            let markets: Vec<String> = record
                .details
                .iter()
                .map(|m| m.market.to_string())
                .collect();
            vec![
                target.id.clone(),
                target.title(),
                fixture.id.clone(),
                fixture.date.clone(),
                fixture.league.clone(),
                fixture.home_team.clone(),
                fixture.away_team.clone(),
                opt_to_string(result.and_then(|r| r.ft_score.as_deref())),
                opt_to_string(result.and_then(|r| r.ht_score.as_deref())),
                record.matched_markets.to_string(),
                markets.join(", "),
            ]
        })
        .collect()
}

fn price_cell(price: Option<f64>) -> String {
    price.map(|p| format!("{p:.2}")).unwrap_or_default()
}

fn opt_to_string<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}
