pub mod classify;
pub mod diff;

use sha2::{Digest, Sha256};

use crate::db::{SnapshotRow, StoredSnapshot};
use classify::ChangeCategory;

/// A classified day-over-day change, ready to persist. Absent entirely on
/// day one or when the content hash did not move.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeDraft {
    pub previous_snapshot_id: i64,
    pub categories: Vec<ChangeCategory>,
    pub summary: String,
    pub diff_text: String,
    pub additions: usize,
    pub removals: usize,
}

pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compare today's snapshot against the most recent prior one (not
/// necessarily yesterday's — fetches get skipped). No prior snapshot or an
/// identical hash is a first-class "no change" outcome, not an error.
pub fn detect_change(
    previous: Option<&StoredSnapshot>,
    current: &SnapshotRow,
    current_snapshot_id: i64,
) -> Option<ChangeDraft> {
    let previous = previous?;
    if previous.content_hash == current.content_hash {
        return None;
    }

    let d = diff::unified_diff(
        &previous.content,
        &current.content,
        &format!("snapshot:{}", previous.id),
        &format!("snapshot:{}", current_snapshot_id),
    )?;

    let categories = classify::classify_diff(&d.text);
    let summary = classify::summarize(&categories);

    Some(ChangeDraft {
        previous_snapshot_id: previous.id,
        categories,
        summary,
        diff_text: d.text,
        additions: d.additions,
        removals: d.removals,
    })
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(content: &str) -> SnapshotRow {
        SnapshotRow {
            competitor_id: 1,
            scrape_date: "2026-08-28".to_string(),
            scraped_at: "2026-08-28T06:00:00Z".to_string(),
            page_role: "homepage".to_string(),
            page_url: "https://a.test".to_string(),
            content: content.to_string(),
            content_hash: content_hash(content),
        }
    }

    fn stored(id: i64, content: &str) -> StoredSnapshot {
        StoredSnapshot {
            id,
            scrape_date: "2026-08-27".to_string(),
            content: content.to_string(),
            content_hash: content_hash(content),
        }
    }

    #[test]
    fn no_prior_snapshot_means_no_change_record() {
        let cur = snapshot("anything");
        assert!(detect_change(None, &cur, 2).is_none());
    }

    #[test]
    fn identical_hash_means_no_change_record() {
        let content = "From $16\nfooter";
        let cur = snapshot(content);
        let prev = stored(1, content);
        assert!(detect_change(Some(&prev), &cur, 2).is_none());
    }

    #[test]
    fn price_change_produces_classified_draft() {
        let prev = stored(1, "From $18\nfooter");
        let cur = snapshot("From $20\nfooter");
        let draft = detect_change(Some(&prev), &cur, 2).expect("change");
        assert_eq!(draft.previous_snapshot_id, 1);
        assert!(draft.categories.contains(&ChangeCategory::PriceChange));
        assert_eq!(draft.additions, 1);
        assert_eq!(draft.removals, 1);
        assert!(draft.diff_text.contains("snapshot:1"));
        assert!(draft.diff_text.contains("snapshot:2"));
    }

    #[test]
    fn timestamp_only_change_yields_nothing() {
        // Hashes differ, but the normalized diff is empty.
        let prev = stored(1, "updated 2026-08-27T06:00:00Z\nbody");
        let cur = snapshot("updated 2026-08-28T06:00:00Z\nbody");
        assert!(detect_change(Some(&prev), &cur, 2).is_none());
    }

    #[test]
    fn hashes_are_stable_and_distinct() {
        assert_eq!(content_hash("a"), content_hash("a"));
        assert_ne!(content_hash("a"), content_hash("b"));
        assert_eq!(content_hash("a").len(), 64);
    }
}
