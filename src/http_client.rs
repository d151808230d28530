use std::time::Duration;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use reqwest::blocking::Client;

const REQUEST_TIMEOUT_SECS: u64 = 15;
const ERROR_SNIPPET_CHARS: usize = 220;

static CLIENT: OnceCell<Client> = OnceCell::new();

pub fn http_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to build http client")
    })
}

/// GET `url` and return the body, turning non-2xx responses into errors carrying a
/// one-line snippet of the body.
pub fn get_text(client: &Client, url: &str, headers: &[(&str, &str)]) -> Result<String> {
    let mut req = client.get(url);
    for (name, value) in headers {
        req = req.header(*name, *value);
    }
    let resp = req.send().with_context(|| format!("request to {url} failed"))?;
    let status = resp.status();
    let body = resp.text().context("failed reading body")?;
    if !status.is_success() {
        return Err(anyhow::anyhow!("http {}: {}", status, snippet(&body)));
    }
    Ok(body)
}

fn snippet(body: &str) -> String {
    body.trim()
        .replace(['\n', '\r'], " ")
        .chars()
        .take(ERROR_SNIPPET_CHARS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::snippet;

    #[test]
    fn snippet_is_single_line_and_bounded() {
        let body = format!("  line one\nline two\r\n{}", "x".repeat(500));
        let s = snippet(&body);
        assert!(!s.contains('\n'));
        assert!(s.starts_with("line one line two"));
        assert_eq!(s.chars().count(), 220);
    }
}
