use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::Result;
use reqwest::Client;
use tracing::warn;

use crate::pipeline::page::PageRole;

const REQUEST_TIMEOUT_SECS: u64 = 30;
const INTER_REQUEST_DELAY_MS: u64 = 2000;

/// Candidate paths probed on every subject, homepage first. Most of these
/// sites keep pricing on the homepage; the rest are the common alternates.
const PAGE_PATHS: &[(&str, PageRole)] = &[
    ("", PageRole::Primary),
    ("/pricing", PageRole::Secondary),
    ("/prices", PageRole::Secondary),
    ("/onward-ticket", PageRole::Secondary),
    ("/product", PageRole::Secondary),
];

/// Browser-like user agents, rotated per request to avoid trivial blocking.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:127.0) Gecko/20100101 Firefox/127.0",
];

static UA_CURSOR: AtomicUsize = AtomicUsize::new(0);

fn next_user_agent() -> &'static str {
    let idx = UA_CURSOR.fetch_add(1, Ordering::Relaxed);
    USER_AGENTS[idx % USER_AGENTS.len()]
}

/// Which snapshots we keep for day-over-day diffing. Only the homepage and
/// the pricing page are worth archiving in full; the alternate paths feed
/// price extraction only.
pub fn snapshot_role(path: &str) -> Option<&'static str> {
    match path {
        "" => Some("homepage"),
        "/pricing" => Some("pricing"),
        _ => None,
    }
}

pub struct FetchedPage {
    pub url: String,
    pub path: &'static str,
    pub role: PageRole,
    pub html: String,
}

pub fn build_client() -> Result<Client> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()?)
}

/// Fetch all candidate pages for one subject. Individual page failures
/// (404 alternates, timeouts) are logged and skipped; only an empty result
/// means the whole subject was unreachable today.
pub async fn fetch_subject_pages(client: &Client, base_url: &str) -> Vec<FetchedPage> {
    let mut pages = Vec::new();
    for (i, (path, role)) in PAGE_PATHS.iter().enumerate() {
        if i > 0 {
            polite_delay().await;
        }
        let url = format!("{}{}", base_url.trim_end_matches('/'), path);
        match fetch_page(client, &url).await {
            Ok(html) => pages.push(FetchedPage {
                url,
                path,
                role: *role,
                html,
            }),
            Err(e) => warn!("skipping {}: {}", url, e),
        }
    }
    pages
}

pub async fn polite_delay() {
    tokio::time::sleep(Duration::from_millis(INTER_REQUEST_DELAY_MS)).await;
}

/// Fetch one page (candidate paths, review profiles). 4xx/5xx is an error.
pub async fn fetch_page(client: &Client, url: &str) -> Result<String> {
    let resp = client
        .get(url)
        .header(reqwest::header::USER_AGENT, next_user_agent())
        .header(reqwest::header::ACCEPT, "text/html,application/xhtml+xml")
        .send()
        .await?
        .error_for_status()?;
    Ok(resp.text().await?)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn homepage_is_first_and_primary() {
        assert_eq!(PAGE_PATHS[0].0, "");
        assert_eq!(PAGE_PATHS[0].1, PageRole::Primary);
        assert!(PAGE_PATHS[1..].iter().all(|(_, r)| *r == PageRole::Secondary));
    }

    #[test]
    fn only_homepage_and_pricing_are_snapshotted() {
        assert_eq!(snapshot_role(""), Some("homepage"));
        assert_eq!(snapshot_role("/pricing"), Some("pricing"));
        assert_eq!(snapshot_role("/prices"), None);
        assert_eq!(snapshot_role("/product"), None);
    }

    #[test]
    fn user_agents_rotate() {
        let first = next_user_agent();
        let second = next_user_agent();
        assert_ne!(first, second);
    }
}
