use serde::{Deserialize, Serialize};

/// Goals scored by each side at some point of a fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Score {
    pub home: u32,
    pub away: u32,
}

impl Score {
    pub fn new(home: u32, away: u32) -> Self {
        Self { home, away }
    }
}

/// Parse a textual score such as `"2-1"`.
///
/// Returns `None` when the score is unknown: empty text, feed placeholders (`-`, `- - -`,
/// `None-None`), anything that doesn't split into exactly two integers around a single `-`.
/// Both sides are unknown together; a half-numeric score is rejected outright.
pub fn parse_score(raw: &str) -> Option<Score> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "-" || trimmed == "- - -" || trimmed.contains("None") {
        return None;
    }
    let mut parts = trimmed.split('-');
    let home = parts.next()?.trim().parse::<u32>().ok()?;
    let away = parts.next()?.trim().parse::<u32>().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(Score { home, away })
}

/// Same as [`parse_score`] but for optional feed fields.
pub fn parse_optional_score(raw: Option<&str>) -> Option<Score> {
    raw.and_then(parse_score)
}

#[cfg(test)]
mod tests {
    use super::{Score, parse_optional_score, parse_score};

    #[test]
    fn parses_plain_and_spaced_scores() {
        assert_eq!(parse_score("2-1"), Some(Score::new(2, 1)));
        assert_eq!(parse_score(" 0 - 0 "), Some(Score::new(0, 0)));
        assert_eq!(parse_score("10-3"), Some(Score::new(10, 3)));
    }

    #[test]
    fn placeholders_are_unknown() {
        assert_eq!(parse_score(""), None);
        assert_eq!(parse_score("   "), None);
        assert_eq!(parse_score("-"), None);
        assert_eq!(parse_score("- - -"), None);
        assert_eq!(parse_score("None-None"), None);
    }

    #[test]
    fn wrong_token_count_is_unknown() {
        assert_eq!(parse_score("2-1-0"), None);
        assert_eq!(parse_score("2"), None);
        assert_eq!(parse_score("2:1"), None);
    }

    #[test]
    fn half_numeric_is_rejected_entirely() {
        assert_eq!(parse_score("2-x"), None);
        assert_eq!(parse_score("a-1"), None);
        assert_eq!(parse_score("-1"), None);
    }

    #[test]
    fn missing_field_is_unknown() {
        assert_eq!(parse_optional_score(None), None);
        assert_eq!(parse_optional_score(Some("3-2")), Some(Score::new(3, 2)));
    }
}
