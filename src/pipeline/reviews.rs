use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;

// "4.5 out of 5 based on 1,234 reviews" and the reversed phrasing.
static RATING_THEN_COUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?P<rating>\d(?:\.\d)?)\s*(?:out of 5|stars?)\s*(?:from|based on)?\s*(?P<count>\d[\d,]*)\s*(?:reviews?|ratings?)",
    )
    .unwrap()
});
static COUNT_THEN_RATING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?P<count>\d[\d,]*)\s*(?:google\s+)?(?:reviews?|ratings?)\s*with\s+an\s+average\s+of\s+(?P<rating>\d(?:\.\d)?)",
    )
    .unwrap()
});

/// Where a subject's review profile lives. Closed set, one daily row each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewSource {
    Trustpilot,
    Google,
}

impl ReviewSource {
    pub const ALL: [ReviewSource; 2] = [ReviewSource::Trustpilot, ReviewSource::Google];

    pub fn as_str(self) -> &'static str {
        match self {
            ReviewSource::Trustpilot => "trustpilot",
            ReviewSource::Google => "google",
        }
    }

    pub fn page_url(self, domain: &str) -> String {
        match self {
            ReviewSource::Trustpilot => {
                format!("https://www.trustpilot.com/review/{}", domain)
            }
            ReviewSource::Google => {
                format!("https://www.google.com/search?q={}", domain)
            }
        }
    }
}

/// Aggregate review metrics for one profile page. Both fields optional;
/// an entirely empty result means the page carried nothing parseable.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ReviewStats {
    pub rating: Option<f64>,
    pub review_count: Option<i64>,
}

impl ReviewStats {
    pub fn is_empty(&self) -> bool {
        self.rating.is_none() && self.review_count.is_none()
    }
}

/// Pull the aggregate rating and review count out of a review profile page.
/// Tried in order: Trustpilot's `__NEXT_DATA__` blob (trustScore /
/// numberOfReviews), schema.org LD+JSON (aggregateRating), then plain-text
/// phrasing.
pub fn extract_review_stats(html: &str) -> ReviewStats {
    let doc = Html::parse_document(html);

    let mut stats = next_data_stats(&doc);
    if stats.is_empty() {
        stats = ld_json_stats(&doc);
    }
    if stats.is_empty() {
        stats = text_stats(&doc);
    }
    stats
}

fn next_data_stats(doc: &Html) -> ReviewStats {
    let Ok(sel) = Selector::parse("script#__NEXT_DATA__") else {
        return ReviewStats::default();
    };
    let Some(blob) = doc.select(&sel).next().map(|el| el.text().collect::<String>()) else {
        return ReviewStats::default();
    };
    let Ok(json) = serde_json::from_str::<Value>(&blob) else {
        return ReviewStats::default();
    };

    let mut stats = ReviewStats::default();
    walk_next_data(&json, &mut stats);
    stats
}

fn walk_next_data(value: &Value, stats: &mut ReviewStats) {
    match value {
        Value::Object(map) => {
            if stats.rating.is_none() {
                if let Some(v) = map.get("trustScore") {
                    stats.rating = to_rating(v);
                }
            }
            if stats.review_count.is_none() {
                if let Some(v) = map.get("numberOfReviews") {
                    // May be a plain count or an object with a `total` field.
                    stats.review_count = match v {
                        Value::Object(inner) => inner.get("total").and_then(to_count),
                        other => to_count(other),
                    };
                }
            }
            for v in map.values() {
                walk_next_data(v, stats);
            }
        }
        Value::Array(items) => {
            for v in items {
                walk_next_data(v, stats);
            }
        }
        _ => {}
    }
}

fn ld_json_stats(doc: &Html) -> ReviewStats {
    let Ok(sel) = Selector::parse(r#"script[type="application/ld+json"]"#) else {
        return ReviewStats::default();
    };
    for el in doc.select(&sel) {
        let blob = el.text().collect::<String>();
        let Ok(json) = serde_json::from_str::<Value>(&blob) else {
            continue;
        };
        let objects: Vec<&Value> = match &json {
            Value::Array(items) => items.iter().collect(),
            other => vec![other],
        };
        for obj in objects {
            let aggregate = obj
                .get("aggregateRating")
                .or_else(|| (obj.get("@type").and_then(Value::as_str) == Some("AggregateRating")).then_some(obj));
            if let Some(agg) = aggregate {
                let stats = ReviewStats {
                    rating: agg.get("ratingValue").and_then(to_rating),
                    review_count: agg.get("reviewCount").and_then(to_count),
                };
                if !stats.is_empty() {
                    return stats;
                }
            }
        }
    }
    ReviewStats::default()
}

fn text_stats(doc: &Html) -> ReviewStats {
    let text = doc
        .root_element()
        .text()
        .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    for re in [&*RATING_THEN_COUNT_RE, &*COUNT_THEN_RATING_RE] {
        if let Some(m) = re.captures(&text) {
            let stats = ReviewStats {
                rating: m.name("rating").and_then(|r| plausible_rating(r.as_str().parse().ok()?)),
                review_count: m
                    .name("count")
                    .and_then(|c| c.as_str().replace(',', "").parse().ok()),
            };
            if !stats.is_empty() {
                return stats;
            }
        }
    }
    ReviewStats::default()
}

fn to_rating(value: &Value) -> Option<f64> {
    let raw = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }?;
    plausible_rating(raw)
}

fn plausible_rating(raw: f64) -> Option<f64> {
    (raw > 0.0 && raw <= 5.0).then_some(raw)
}

fn to_count(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().filter(|c| *c > 0),
        Value::String(s) => s.replace(',', "").trim().parse().ok().filter(|c| *c > 0),
        _ => None,
    }
}

// ── Tests ──
