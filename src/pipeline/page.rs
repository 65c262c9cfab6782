use scraper::{Html, Selector};
use serde_json::Value;

/// Role of a fetched page in the daily pass. The homepage is the primary
/// page; every other path is secondary and loses precedence ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PageRole {
    Primary,
    Secondary,
}

impl PageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageRole::Primary => "primary",
            PageRole::Secondary => "secondary",
        }
    }
}

/// One fetched page reduced to what the extraction pipeline consumes:
/// whitespace-normalized text fragments plus, for Next.js sites, the parsed
/// `__NEXT_DATA__` hydration blob.
#[derive(Debug, Clone)]
pub struct PageContent {
    pub url: String,
    pub role: PageRole,
    pub fragments: Vec<String>,
    pub structured_json: Option<Value>,
}

static NEXT_DATA_SELECTOR: &str = "script#__NEXT_DATA__";

impl PageContent {
    pub fn from_html(url: &str, role: PageRole, html: &str) -> Self {
        let doc = Html::parse_document(html);

        let fragments: Vec<String> = doc
            .root_element()
            .text()
            .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|t| !t.is_empty())
            .collect();

        // Malformed hydration JSON is treated as absent; extraction then
        // falls back to the text path.
        let structured_json = Selector::parse(NEXT_DATA_SELECTOR)
            .ok()
            .and_then(|sel| {
                doc.select(&sel)
                    .next()
                    .map(|el| el.text().collect::<String>())
            })
            .and_then(|blob| serde_json::from_str(&blob).ok());

        PageContent {
            url: url.to_string(),
            role,
            fragments,
            structured_json,
        }
    }

    /// Fragments that survive the noise filter, in document order.
    pub fn clean_fragments(&self) -> impl Iterator<Item = &String> {
        self.fragments.iter().filter(|f| !super::noise::is_noise(f))
    }

    /// Combined lowercased clean text, for keyword membership tests.
    pub fn clean_text_lower(&self) -> String {
        self.clean_fragments()
            .map(|f| f.as_str())
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }
}

// ── Tests ──
