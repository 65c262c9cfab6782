use std::sync::LazyLock;

use regex::Regex;

// Absolute timestamps and clock strings churn on every fetch; masking them
// keeps the diff focused on real content changes.
static TIMESTAMP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:\d{4}-\d{2}-\d{2}[T\s]\d{2}:\d{2}(?::\d{2})?(?:\.\d+)?(?:Z|[+-]\d{2}:?\d{2})?)|(?:\b\d{1,2}:\d{2}(?::\d{2})?\s?(?:AM|PM|UTC)?\b)",
    )
    .unwrap()
});

const CONTEXT_LINES: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct DiffResult {
    pub text: String,
    pub additions: usize,
    pub removals: usize,
}

/// Line-oriented unified diff of two content snapshots, oldest first.
/// Returns None when the normalized contents are identical.
pub fn unified_diff(
    previous: &str,
    current: &str,
    from_label: &str,
    to_label: &str,
) -> Option<DiffResult> {
    let a = normalize_lines(previous);
    let b = normalize_lines(current);
    let ops = diff_ops(&a, &b);

    let additions = ops.iter().filter(|op| matches!(op, Op::Ins(_))).count();
    let removals = ops.iter().filter(|op| matches!(op, Op::Del(_))).count();
    if additions == 0 && removals == 0 {
        return None;
    }

    let mut out = format!("--- {}\n+++ {}\n", from_label, to_label);
    for hunk in build_hunks(&ops) {
        out.push_str(&hunk.header());
        out.push('\n');
        for op in &ops[hunk.op_range.clone()] {
            match op {
                Op::Equal(i, _) => {
                    out.push(' ');
                    out.push_str(&a[*i]);
                }
                Op::Del(i) => {
                    out.push('-');
                    out.push_str(&a[*i]);
                }
                Op::Ins(j) => {
                    out.push('+');
                    out.push_str(&b[*j]);
                }
            }
            out.push('\n');
        }
    }

    Some(DiffResult {
        text: out.trim_end().to_string(),
        additions,
        removals,
    })
}

/// Mask volatile timestamps, collapse whitespace per line, drop blanks.
pub fn normalize_lines(content: &str) -> Vec<String> {
    let masked = TIMESTAMP_RE.replace_all(content, "[TIMESTAMP]");
    masked
        .lines()
        .map(|l| l.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|l| !l.is_empty())
        .collect()
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Equal(usize, usize),
    Del(usize),
    Ins(usize),
}

/// Classic LCS table walk. Snapshot texts are a few thousand lines at most,
/// so the quadratic table is fine for a daily batch.
fn diff_ops(a: &[String], b: &[String]) -> Vec<Op> {
    let (n, m) = (a.len(), b.len());
    let mut lcs = vec![vec![0u32; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i][j] = if a[i] == b[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut ops = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if a[i] == b[j] {
            ops.push(Op::Equal(i, j));
            i += 1;
            j += 1;
        } else if lcs[i + 1][j] >= lcs[i][j + 1] {
            ops.push(Op::Del(i));
            i += 1;
        } else {
            ops.push(Op::Ins(j));
            j += 1;
        }
    }
    while i < n {
        ops.push(Op::Del(i));
        i += 1;
    }
    while j < m {
        ops.push(Op::Ins(j));
        j += 1;
    }
    ops
}

struct Hunk {
    op_range: std::ops::Range<usize>,
    a_start: usize, // 1-based
    a_len: usize,
    b_start: usize,
    b_len: usize,
}

impl Hunk {
    fn header(&self) -> String {
        format!(
            "@@ -{},{} +{},{} @@",
            self.a_start, self.a_len, self.b_start, self.b_len
        )
    }
}

/// Group change ops into hunks with CONTEXT_LINES of surrounding context.
fn build_hunks(ops: &[Op]) -> Vec<Hunk> {
    let changed: Vec<usize> = ops
        .iter()
        .enumerate()
        .filter(|(_, op)| !matches!(op, Op::Equal(..)))
        .map(|(idx, _)| idx)
        .collect();
    if changed.is_empty() {
        return Vec::new();
    }

    // Merge change indexes whose context windows touch.
    let mut groups: Vec<(usize, usize)> = Vec::new();
    for &idx in &changed {
        let start = idx.saturating_sub(CONTEXT_LINES);
        let end = (idx + CONTEXT_LINES + 1).min(ops.len());
        match groups.last_mut() {
            Some((_, last_end)) if start <= *last_end => *last_end = end,
            _ => groups.push((start, end)),
        }
    }

    groups
        .into_iter()
        .map(|(start, end)| {
            let mut a_start = None;
            let mut b_start = None;
            let mut a_len = 0;
            let mut b_len = 0;
            for op in &ops[start..end] {
                match op {
                    Op::Equal(i, j) => {
                        a_start.get_or_insert(*i);
                        b_start.get_or_insert(*j);
                        a_len += 1;
                        b_len += 1;
                    }
                    Op::Del(i) => {
                        a_start.get_or_insert(*i);
                        a_len += 1;
                    }
                    Op::Ins(j) => {
                        b_start.get_or_insert(*j);
                        b_len += 1;
                    }
                }
            }
            Hunk {
                op_range: start..end,
                a_start: a_start.map_or(1, |i| i + 1),
                a_len,
                b_start: b_start.map_or(1, |j| j + 1),
                b_len,
            }
        })
        .collect()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_content_yields_none() {
        assert!(unified_diff("a\nb\nc", "a\nb\nc", "prev", "cur").is_none());
    }

    #[test]
    fn single_line_change_counted() {
        let d = unified_diff("price $18\nfooter", "price $20\nfooter", "prev", "cur").unwrap();
        assert_eq!(d.additions, 1);
        assert_eq!(d.removals, 1);
        assert!(d.text.contains("-price $18"));
        assert!(d.text.contains("+price $20"));
        assert!(d.text.starts_with("--- prev\n+++ cur"));
    }

    #[test]
    fn pure_addition() {
        let d = unified_diff("a\nb", "a\nb\nc", "prev", "cur").unwrap();
        assert_eq!(d.additions, 1);
        assert_eq!(d.removals, 0);
        assert!(d.text.contains("+c"));
    }

    #[test]
    fn timestamps_do_not_produce_diffs() {
        let prev = "updated 2024-01-01T10:00:00Z\nbody";
        let cur = "updated 2024-06-30T23:59:59Z\nbody";
        assert!(unified_diff(prev, cur, "prev", "cur").is_none());
    }

    #[test]
    fn whitespace_only_change_ignored() {
        assert!(unified_diff("a  b\n\nc", "a b\nc", "prev", "cur").is_none());
    }

    #[test]
    fn hunk_headers_present() {
        let prev: String = (0..30).map(|i| format!("line {}\n", i)).collect();
        let cur = prev.replace("line 15", "line fifteen");
        let d = unified_diff(&prev, &cur, "prev", "cur").unwrap();
        assert!(d.text.contains("@@ -13,7 +13,7 @@"));
    }

    #[test]
    fn distant_changes_split_into_hunks() {
        let prev: Vec<String> = (0..40).map(|i| format!("line {}", i)).collect();
        let mut cur = prev.clone();
        cur[2] = "line two".to_string();
        cur[35] = "line thirtyfive".to_string();
        let d = unified_diff(&prev.join("\n"), &cur.join("\n"), "prev", "cur").unwrap();
        assert_eq!(d.text.matches("@@ -").count(), 2);
        assert_eq!(d.additions, 2);
        assert_eq!(d.removals, 2);
    }
}
