use serde::Serialize;

use crate::pipeline::price;

/// Product terms whose appearance in a diff marks a product-lineup change.
const PRODUCT_KEYWORDS: &[&str] = &[
    "ticket",
    "hotel",
    "visa",
    "onward",
    "return",
    "booking",
    "reservation",
];

/// Structural markup tokens: opening tags and class attributes.
const LAYOUT_TOKENS: &[&str] = &["<div", "<section", "<nav", "<header", "<footer", "class="];

/// Semantic labels for a day-over-day diff. Fixed enumeration; declaration
/// order is the summary priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeCategory {
    PriceChange,
    ProductChange,
    LayoutChange,
    CopyChange,
}

impl ChangeCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeCategory::PriceChange => "price_change",
            ChangeCategory::ProductChange => "product_change",
            ChangeCategory::LayoutChange => "layout_change",
            ChangeCategory::CopyChange => "copy_change",
        }
    }

    fn phrase(self) -> &'static str {
        match self {
            ChangeCategory::PriceChange => "Pricing changed",
            ChangeCategory::ProductChange => "Product offering changed",
            ChangeCategory::LayoutChange => "Page structure changed",
            ChangeCategory::CopyChange => "Copy updated",
        }
    }
}

/// Classify a unified diff into zero or more categories, in priority order.
/// Only the changed lines are inspected; context lines and file headers
/// would otherwise smuggle in unrelated price or markup tokens.
/// copy_change is the fallback for a non-empty diff matching nothing else.
pub fn classify_diff(diff_text: &str) -> Vec<ChangeCategory> {
    let changed = changed_lines(diff_text);
    if changed.is_empty() {
        return Vec::new();
    }
    let changed_lower = changed.to_lowercase();

    let mut categories = Vec::new();
    if price::has_price_token(&changed) {
        categories.push(ChangeCategory::PriceChange);
    }
    if PRODUCT_KEYWORDS.iter().any(|kw| changed_lower.contains(kw)) {
        categories.push(ChangeCategory::ProductChange);
    }
    if LAYOUT_TOKENS.iter().any(|t| changed_lower.contains(t)) {
        categories.push(ChangeCategory::LayoutChange);
    }
    if categories.is_empty() {
        categories.push(ChangeCategory::CopyChange);
    }
    categories
}

/// Fixed human-readable phrase per category, comma-joined in priority order.
pub fn summarize(categories: &[ChangeCategory]) -> String {
    if categories.is_empty() {
        return "Minor changes".to_string();
    }
    categories
        .iter()
        .map(|c| c.phrase())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Added/removed line bodies. Exactly the first two lines are the ---/+++
/// file headers; a removed line whose content starts with "--" is still a
/// change, not a header.
fn changed_lines(diff_text: &str) -> String {
    diff_text
        .lines()
        .skip(2)
        .filter(|l| l.starts_with('+') || l.starts_with('-'))
        .map(|l| &l[1..])
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_change_detected() {
        let diff = "--- prev\n+++ cur\n@@ -1,1 +1,1 @@\n-From $18\n+From $20";
        let cats = classify_diff(diff);
        assert!(cats.contains(&ChangeCategory::PriceChange));
        assert!(!cats.contains(&ChangeCategory::CopyChange));
    }

    #[test]
    fn multi_category_price_and_layout() {
        let diff = concat!(
            "--- prev\n+++ cur\n@@ -1,2 +1,3 @@\n",
            "-From $18\n",
            "+From $20\n",
            "+<section class=\"promo\">New deals</section>",
        );
        let cats = classify_diff(diff);
        assert!(cats.contains(&ChangeCategory::PriceChange));
        assert!(cats.contains(&ChangeCategory::LayoutChange));
        assert!(!cats.contains(&ChangeCategory::CopyChange));
        // priority order preserved
        assert_eq!(cats[0], ChangeCategory::PriceChange);
    }

    #[test]
    fn product_keywords_detected() {
        let diff = "--- prev\n+++ cur\n@@ -1,1 +1,1 @@\n-We sell widgets\n+Hotel booking now available";
        let cats = classify_diff(diff);
        assert!(cats.contains(&ChangeCategory::ProductChange));
    }

    #[test]
    fn headline_only_change_falls_back_to_copy() {
        let diff = "--- prev\n+++ cur\n@@ -1,1 +1,1 @@\n-Fast and easy\n+Quick and simple";
        assert_eq!(classify_diff(diff), vec![ChangeCategory::CopyChange]);
    }

    #[test]
    fn context_lines_do_not_leak_categories() {
        // The price sits in an unchanged context line; only prose changed.
        let diff = "--- prev\n+++ cur\n@@ -1,3 +1,3 @@\n From $18\n-old headline\n+new headline\n footer";
        assert_eq!(classify_diff(diff), vec![ChangeCategory::CopyChange]);
    }

    #[test]
    fn removed_line_starting_with_dashes_still_classified() {
        let diff = "--- prev\n+++ cur\n@@ -1,1 +1,1 @@\n---- $18 off this week\n+regular offer";
        let cats = classify_diff(diff);
        assert!(cats.contains(&ChangeCategory::PriceChange));
    }

    #[test]
    fn summary_phrasing() {
        assert_eq!(
            summarize(&[ChangeCategory::PriceChange, ChangeCategory::LayoutChange]),
            "Pricing changed, Page structure changed"
        );
        assert_eq!(summarize(&[ChangeCategory::CopyChange]), "Copy updated");
        assert_eq!(summarize(&[]), "Minor changes");
    }

    #[test]
    fn category_names_are_stable() {
        assert_eq!(ChangeCategory::PriceChange.as_str(), "price_change");
        assert_eq!(ChangeCategory::ProductChange.as_str(), "product_change");
        assert_eq!(ChangeCategory::LayoutChange.as_str(), "layout_change");
        assert_eq!(ChangeCategory::CopyChange.as_str(), "copy_change");
    }
}
