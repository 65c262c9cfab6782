use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::page::{PageContent, PageRole};

// Price: $16, €14, £10, or leading-USD with amount
static PRICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:USD\s*)?(?P<currency>[$€£])(?P<amount>\d+(?:[.,]\d{1,2})?)").unwrap()
});

// Inline addon label: "Round Trip (+$7)", "7 days (+$7)"
static ADDON_INLINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<name>[^(+]+?)\s*\(\+\s*[$€£]?(?P<amount>\d+(?:[.,]\d{1,2})?)").unwrap()
});

/// Numeric hydration fields are only plausible prices under these key names.
const PRICE_KEY_HINTS: &[&str] = &["price", "amount", "cost", "fee"];
const MAX_SANE_PRICE: f64 = 10_000.0;

pub const DEFAULT_CURRENCY: &str = "USD";

/// One currency-amount occurrence found on a page.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceCandidate {
    pub amount: f64,
    pub currency: String,
    pub source_url: String,
    pub raw_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddonItem {
    pub name: String,
    pub price: f64,
}

/// Election result for one subject on one day: at most one main price, the
/// rest demoted to add-ons in encounter order.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceExtraction {
    pub main: Option<PriceCandidate>,
    pub addons: Vec<AddonItem>,
}

/// Extract and elect prices across the day's pages. `pages` must already be
/// ordered primary-first; the homepage's candidates win the main election
/// and secondary candidates demote to add-ons.
pub fn extract_prices(pages: &[PageContent]) -> PriceExtraction {
    let mut candidates: Vec<PriceCandidate> = Vec::new();
    let mut inline_addons: Vec<AddonItem> = Vec::new();

    for page in pages {
        for cand in candidates_from_page(page) {
            // Dedup by (amount, currency) across pages: a price quoted on
            // both the homepage and a secondary page is stored once.
            let dup = candidates
                .iter()
                .any(|c| c.amount == cand.amount && c.currency == cand.currency);
            if !dup {
                candidates.push(cand);
            }
        }
        for addon in inline_addons_from_page(page) {
            let key = addon.name.to_lowercase();
            if !inline_addons.iter().any(|a| a.name.to_lowercase() == key) {
                inline_addons.push(addon);
            }
        }
    }

    if candidates.is_empty() {
        return PriceExtraction {
            main: None,
            addons: inline_addons,
        };
    }

    // Homepage priority: when the primary page produced candidates, the
    // election runs over those alone; otherwise over everything.
    let primary_count = candidates
        .iter()
        .filter(|c| page_role_of(pages, &c.source_url) == Some(PageRole::Primary))
        .count();
    let main = if primary_count > 0 {
        elect_smallest(candidates.iter().filter(|c| {
            page_role_of(pages, &c.source_url) == Some(PageRole::Primary)
        }))
    } else {
        elect_smallest(candidates.iter())
    };
    let main = main.cloned();

    let mut addons = inline_addons;
    for cand in &candidates {
        if Some(cand) == main.as_ref() {
            continue;
        }
        if addons.iter().any(|a| a.price == cand.amount) {
            continue;
        }
        addons.push(AddonItem {
            name: "Add-on".to_string(),
            price: cand.amount,
        });
    }

    PriceExtraction { main, addons }
}

fn page_role_of(pages: &[PageContent], url: &str) -> Option<PageRole> {
    pages.iter().find(|p| p.url == url).map(|p| p.role)
}

fn elect_smallest<'a>(
    candidates: impl Iterator<Item = &'a PriceCandidate>,
) -> Option<&'a PriceCandidate> {
    candidates.min_by(|a, b| a.amount.partial_cmp(&b.amount).unwrap_or(std::cmp::Ordering::Equal))
}

/// Candidates for one page. The hydration blob is preferred over text
/// matching when it yields anything: its numeric fields carry no markup noise.
fn candidates_from_page(page: &PageContent) -> Vec<PriceCandidate> {
    if let Some(json) = &page.structured_json {
        let from_json = candidates_from_json(json, &page.url);
        if !from_json.is_empty() {
            return from_json;
        }
    }
    candidates_from_text(page)
}

fn candidates_from_json(json: &Value, source_url: &str) -> Vec<PriceCandidate> {
    let mut out = Vec::new();
    walk_json(json, None, source_url, &mut out);
    out
}

fn walk_json(value: &Value, key: Option<&str>, source_url: &str, out: &mut Vec<PriceCandidate>) {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                walk_json(v, Some(k), source_url, out);
            }
        }
        Value::Array(items) => {
            for v in items {
                walk_json(v, key, source_url, out);
            }
        }
        Value::Number(n) => {
            let hinted = key.is_some_and(|k| {
                let k = k.to_lowercase();
                PRICE_KEY_HINTS.iter().any(|h| k.contains(h))
            });
            if let Some(amount) = n.as_f64() {
                if hinted && amount > 0.0 && amount <= MAX_SANE_PRICE {
                    push_unique(out, amount, DEFAULT_CURRENCY, source_url, &n.to_string());
                }
            }
        }
        Value::String(s) => {
            for m in PRICE_RE.captures_iter(s) {
                if let Some(amount) = parse_amount(&m["amount"]) {
                    let currency = canonical_currency(&m["currency"]);
                    push_unique(out, amount, currency, source_url, m.get(0).unwrap().as_str());
                }
            }
        }
        _ => {}
    }
}

fn push_unique(
    out: &mut Vec<PriceCandidate>,
    amount: f64,
    currency: &str,
    source_url: &str,
    raw_text: &str,
) {
    if out.iter().any(|c| c.amount == amount && c.currency == currency) {
        return;
    }
    out.push(PriceCandidate {
        amount,
        currency: currency.to_string(),
        source_url: source_url.to_string(),
        raw_text: raw_text.to_string(),
    });
}

fn candidates_from_text(page: &PageContent) -> Vec<PriceCandidate> {
    let mut out = Vec::new();
    for fragment in page.clean_fragments() {
        // Add-on deltas like "Round Trip (+$7)" are not main-price material.
        if fragment.contains("(+") {
            continue;
        }
        for m in PRICE_RE.captures_iter(fragment) {
            if let Some(amount) = parse_amount(&m["amount"]) {
                let currency = canonical_currency(&m["currency"]);
                push_unique(&mut out, amount, currency, &page.url, fragment);
            }
        }
    }
    out
}

fn inline_addons_from_page(page: &PageContent) -> Vec<AddonItem> {
    let mut out = Vec::new();
    for fragment in page.clean_fragments() {
        for m in ADDON_INLINE_RE.captures_iter(fragment) {
            let name = m["name"].trim().trim_end_matches('(').trim().to_string();
            let price = parse_amount(&m["amount"]);
            if let Some(price) = price {
                if !name.is_empty() && price > 0.0 {
                    out.push(AddonItem { name, price });
                }
            }
        }
    }
    out
}

fn parse_amount(raw: &str) -> Option<f64> {
    raw.replace(',', ".").parse::<f64>().ok()
}

pub fn canonical_currency(symbol: &str) -> &'static str {
    match symbol.trim() {
        "$" | "USD" => "USD",
        "€" => "EUR",
        "£" => "GBP",
        _ => DEFAULT_CURRENCY,
    }
}

/// First currency amount in `text`, if any. Shared with the offering
/// classifier's near-keyword search and the change classifier.
pub fn first_amount_in(text: &str) -> Option<f64> {
    PRICE_RE
        .captures(text)
        .and_then(|m| parse_amount(&m["amount"]))
}

pub fn has_price_token(text: &str) -> bool {
    PRICE_RE.is_match(text)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn page(url: &str, role: PageRole, fragments: &[&str]) -> PageContent {
        PageContent {
            url: url.to_string(),
            role,
            fragments: fragments.iter().map(|s| s.to_string()).collect(),
            structured_json: None,
        }
    }

    #[test]
    fn smallest_candidate_wins_election() {
        let p = page(
            "https://a.test",
            PageRole::Primary,
            &["Bundle $18.00", "From $5.00", "Premium $23.00"],
        );
        let result = extract_prices(&[p]);
        let main = result.main.expect("main price");
        assert_eq!(main.amount, 5.0);
        assert_eq!(main.currency, "USD");
        let addon_prices: Vec<f64> = result.addons.iter().map(|a| a.price).collect();
        assert_eq!(addon_prices, vec![18.0, 23.0]);
        assert!(result.addons.iter().all(|a| a.name == "Add-on"));
    }

    #[test]
    fn homepage_candidate_beats_cheaper_secondary() {
        let home = page("https://a.test", PageRole::Primary, &["Onward ticket $16"]);
        let pricing = page(
            "https://a.test/pricing",
            PageRole::Secondary,
            &["Special offer $12"],
        );
        let result = extract_prices(&[home, pricing]);
        assert_eq!(result.main.expect("main").amount, 16.0);
        assert_eq!(result.addons.len(), 1);
        assert_eq!(result.addons[0].price, 12.0);
    }

    #[test]
    fn duplicate_amounts_across_pages_stored_once() {
        let home = page("https://a.test", PageRole::Primary, &["From $16"]);
        let pricing = page("https://a.test/pricing", PageRole::Secondary, &["Only $16"]);
        let result = extract_prices(&[home, pricing]);
        assert_eq!(result.main.expect("main").amount, 16.0);
        assert!(result.addons.is_empty());
    }

    #[test]
    fn no_candidates_is_valid_empty_result() {
        let p = page("https://a.test", PageRole::Primary, &["Welcome to our site"]);
        let result = extract_prices(&[p]);
        assert!(result.main.is_none());
        assert!(result.addons.is_empty());
    }

    #[test]
    fn addon_delta_text_excluded_from_election() {
        let p = page(
            "https://a.test",
            PageRole::Primary,
            &["Onward ticket $16", "Round Trip (+$7)"],
        );
        let result = extract_prices(&[p]);
        assert_eq!(result.main.expect("main").amount, 16.0);
        assert_eq!(result.addons.len(), 1);
        assert_eq!(result.addons[0].name, "Round Trip");
        assert_eq!(result.addons[0].price, 7.0);
    }

    #[test]
    fn noisy_fragment_with_price_is_ignored() {
        let mut noisy = String::from("self.__next_f.push([1,\"$3\"]);");
        while noisy.len() < 450 {
            noisy.push_str("0123456789");
        }
        let p = PageContent {
            url: "https://a.test".to_string(),
            role: PageRole::Primary,
            fragments: vec![noisy, "From $16".to_string()],
            structured_json: None,
        };
        let result = extract_prices(&[p]);
        assert_eq!(result.main.expect("main").amount, 16.0);
    }

    #[test]
    fn hydration_json_preferred_over_text() {
        let json = serde_json::json!({
            "props": {
                "pageProps": {
                    "basePrice": 14,
                    "bundles": [{ "price": 21.5 }],
                    "title": "not a price 99"
                }
            }
        });
        let p = PageContent {
            url: "https://a.test".to_string(),
            role: PageRole::Primary,
            fragments: vec!["Old banner $99".to_string()],
            structured_json: Some(json),
        };
        let result = extract_prices(&[p]);
        let main = result.main.expect("main");
        assert_eq!(main.amount, 14.0);
        assert_eq!(main.currency, "USD");
        assert_eq!(result.addons.len(), 1);
        assert_eq!(result.addons[0].price, 21.5);
    }

    #[test]
    fn json_string_leaves_scanned_for_currency() {
        let json = serde_json::json!({ "hero": "Tickets from €14" });
        let p = PageContent {
            url: "https://a.test".to_string(),
            role: PageRole::Primary,
            fragments: vec![],
            structured_json: Some(json),
        };
        let result = extract_prices(&[p]);
        let main = result.main.expect("main");
        assert_eq!(main.amount, 14.0);
        assert_eq!(main.currency, "EUR");
    }

    #[test]
    fn json_numbers_without_price_keys_ignored() {
        let json = serde_json::json!({ "buildId": 20240101, "views": 532 });
        let p = PageContent {
            url: "https://a.test".to_string(),
            role: PageRole::Primary,
            fragments: vec![],
            structured_json: Some(json),
        };
        let result = extract_prices(&[p]);
        assert!(result.main.is_none());
    }

    #[test]
    fn comma_decimal_amounts_parse() {
        let p = page("https://a.test", PageRole::Primary, &["Nur €14,99"]);
        let result = extract_prices(&[p]);
        let main = result.main.expect("main");
        assert_eq!(main.amount, 14.99);
        assert_eq!(main.currency, "EUR");
    }

    #[test]
    fn currency_canonicalization() {
        assert_eq!(canonical_currency("$"), "USD");
        assert_eq!(canonical_currency("€"), "EUR");
        assert_eq!(canonical_currency("£"), "GBP");
    }
}
