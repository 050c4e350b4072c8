//! Line-level comparison of two archived snapshots.
//!
//! Greedy alignment with a bounded lookahead:
//! - equal lines are unchanged
//! - a left line found up to LOOKAHEAD lines ahead on the right marks the
//!   skipped right lines as added
//! - otherwise a right line found ahead on the left marks skipped left lines
//!   as removed
//! - otherwise the pair is reported as removed + added
//!
//! This is not a minimal edit script. Repeated lines further apart than the
//! window pair up as replacements, and api clients rely on that output.

use serde::Serialize;

pub const LOOKAHEAD: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineKind {
    Unchanged,
    Added,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffLine {
    #[serde(rename = "type")]
    pub kind: LineKind,
    pub content: String,
    /// Left line number for removed and unchanged lines, right line number
    /// for added lines. 1-based.
    #[serde(rename = "line_num")]
    pub line_number: usize,
    /// Right line number of an unchanged line.
    #[serde(rename = "right_line_num", skip_serializing_if = "Option::is_none")]
    pub right_line_number: Option<usize>,
}

impl DiffLine {
    fn unchanged(content: &str, left: usize, right: usize) -> Self {
        DiffLine {
            kind: LineKind::Unchanged,
            content: content.to_string(),
            line_number: left,
            right_line_number: Some(right),
        }
    }

    fn added(content: &str, right: usize) -> Self {
        DiffLine {
            kind: LineKind::Added,
            content: content.to_string(),
            line_number: right,
            right_line_number: None,
        }
    }

    fn removed(content: &str, left: usize) -> Self {
        DiffLine {
            kind: LineKind::Removed,
            content: content.to_string(),
            line_number: left,
            right_line_number: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffStats {
    pub added: usize,
    pub removed: usize,
    pub unchanged: usize,
}

impl DiffStats {
    pub fn of(lines: &[DiffLine]) -> Self {
        lines.iter().fold(DiffStats::default(), |mut stats, line| {
            match line.kind {
                LineKind::Added => stats.added += 1,
                LineKind::Removed => stats.removed += 1,
                LineKind::Unchanged => stats.unchanged += 1,
            }
            stats
        })
    }

    pub fn is_identical(&self) -> bool {
        self.added == 0 && self.removed == 0
    }
}

/// Comparison of two stored versions as returned by the consumer api.
#[derive(Debug, Clone, Serialize)]
pub struct DiffReport {
    pub left_version_id: i64,
    pub right_version_id: i64,
    pub left_content: String,
    pub right_content: String,
    pub lines: Vec<DiffLine>,
}

impl DiffReport {
    pub fn new(left_version_id: i64, right_version_id: i64, left: String, right: String) -> Self {
        let lines = diff(&left, &right);
        DiffReport {
            left_version_id,
            right_version_id,
            left_content: left,
            right_content: right,
            lines,
        }
    }

    pub fn stats(&self) -> DiffStats {
        DiffStats::of(&self.lines)
    }
}

/// Compare two texts line by line.
///
/// Both sides are split on `'\n'`, so a trailing newline produces a final
/// empty line and an empty text is a single empty line.
pub fn diff(left: &str, right: &str) -> Vec<DiffLine> {
    let left: Vec<&str> = left.split('\n').collect();
    let right: Vec<&str> = right.split('\n').collect();

    let mut lines = Vec::with_capacity(left.len().max(right.len()));
    let (mut i, mut j) = (0usize, 0usize);

    while i < left.len() || j < right.len() {
        if i >= left.len() {
            lines.push(DiffLine::added(right[j], j + 1));
            j += 1;
        } else if j >= right.len() {
            lines.push(DiffLine::removed(left[i], i + 1));
            i += 1;
        } else if left[i] == right[j] {
            lines.push(DiffLine::unchanged(left[i], i + 1, j + 1));
            i += 1;
            j += 1;
        } else if let Some(k) = find_ahead(&right, j, left[i]) {
            // right[j..j+k] was inserted
            for offset in 0..k {
                lines.push(DiffLine::added(right[j + offset], j + offset + 1));
            }
            j += k;
        } else if let Some(k) = find_ahead(&left, i, right[j]) {
            // left[i..i+k] was deleted
            for offset in 0..k {
                lines.push(DiffLine::removed(left[i + offset], i + offset + 1));
            }
            i += k;
        } else {
            lines.push(DiffLine::removed(left[i], i + 1));
            lines.push(DiffLine::added(right[j], j + 1));
            i += 1;
            j += 1;
        }
    }

    lines
}

// offset k in 1..=LOOKAHEAD with lines[from + k] == target
fn find_ahead(lines: &[&str], from: usize, target: &str) -> Option<usize> {
    (1..=LOOKAHEAD)
        .take_while(|k| from + k < lines.len())
        .find(|k| lines[from + k] == target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn kinds(lines: &[DiffLine]) -> Vec<(LineKind, &str, usize)> {
        lines
            .iter()
            .map(|l| (l.kind, l.content.as_str(), l.line_number))
            .collect()
    }

    fn left_side(lines: &[DiffLine]) -> Vec<&str> {
        lines
            .iter()
            .filter(|l| l.kind != LineKind::Added)
            .map(|l| l.content.as_str())
            .collect()
    }

    fn right_side(lines: &[DiffLine]) -> Vec<&str> {
        lines
            .iter()
            .filter(|l| l.kind != LineKind::Removed)
            .map(|l| l.content.as_str())
            .collect()
    }

    #[test]
    fn identical_texts() {
        let result = diff("a\nb\nc", "a\nb\nc");
        assert_eq!(
            kinds(&result),
            vec![
                (LineKind::Unchanged, "a", 1),
                (LineKind::Unchanged, "b", 2),
                (LineKind::Unchanged, "c", 3),
            ]
        );
        assert!(result
            .iter()
            .all(|l| l.right_line_number == Some(l.line_number)));
    }

    #[test]
    fn appended_line() {
        let result = diff("a\nb", "a\nb\nc");
        assert_eq!(
            kinds(&result),
            vec![
                (LineKind::Unchanged, "a", 1),
                (LineKind::Unchanged, "b", 2),
                (LineKind::Added, "c", 3),
            ]
        );
    }

    #[test]
    fn deleted_line_realigns() {
        let result = diff("a\nb\nc", "a\nc");
        assert_eq!(
            kinds(&result),
            vec![
                (LineKind::Unchanged, "a", 1),
                (LineKind::Removed, "b", 2),
                (LineKind::Unchanged, "c", 3),
            ]
        );
        assert_eq!(result[2].right_line_number, Some(2));
    }

    #[test]
    fn replaced_line_pairs() {
        let result = diff("x", "y");
        assert_eq!(
            kinds(&result),
            vec![(LineKind::Removed, "x", 1), (LineKind::Added, "y", 1)]
        );
    }

    #[test]
    fn inserted_block_realigns() {
        let result = diff("hostname r1\nend", "hostname r1\nvlan 10\nvlan 20\nend");
        assert_eq!(
            kinds(&result),
            vec![
                (LineKind::Unchanged, "hostname r1", 1),
                (LineKind::Added, "vlan 10", 2),
                (LineKind::Added, "vlan 20", 3),
                (LineKind::Unchanged, "end", 2),
            ]
        );
    }

    #[test]
    fn insertion_beyond_window_pairs_as_replacement() {
        // six inserted lines push the match past the lookahead
        let right = "a\n1\n2\n3\n4\n5\n6\nb";
        let result = diff("a\nb", right);

        assert_eq!(result[1].kind, LineKind::Removed);
        assert_eq!(result[1].content, "b");
        assert_eq!(result[2].kind, LineKind::Added);
        assert_eq!(result[2].content, "1");
        assert_eq!(right_side(&result), right.split('\n').collect::<Vec<_>>());
    }

    #[test]
    fn insertion_at_window_edge_realigns() {
        let right = "a\n1\n2\n3\n4\n5\nb";
        let result = diff("a\nb", right);

        let added = result.iter().filter(|l| l.kind == LineKind::Added).count();
        assert_eq!(added, 5);
        assert_eq!(result.last().unwrap().kind, LineKind::Unchanged);
    }

    #[test]
    fn trailing_newline_is_an_empty_line() {
        let result = diff("a\n", "a");
        assert_eq!(
            kinds(&result),
            vec![(LineKind::Unchanged, "a", 1), (LineKind::Removed, "", 2)]
        );
    }

    #[test]
    fn empty_texts() {
        let result = diff("", "");
        assert_eq!(kinds(&result), vec![(LineKind::Unchanged, "", 1)]);
    }

    #[test]
    fn stats_count_kinds() {
        let stats = DiffStats::of(&diff("a\nb\nc", "a\nc\nd"));
        assert_eq!(stats.unchanged, 2);
        assert_eq!(stats.removed, 1);
        assert_eq!(stats.added, 1);
        assert!(!stats.is_identical());
        assert!(DiffStats::of(&diff("a", "a")).is_identical());
    }

    #[test]
    fn json_shape() {
        let lines = diff("x", "x\ny");
        let json = serde_json::to_value(&lines).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"type": "unchanged", "content": "x", "line_num": 1, "right_line_num": 1},
                {"type": "added", "content": "y", "line_num": 2}
            ])
        );
    }

    fn text() -> impl Strategy<Value = String> {
        prop::collection::vec(prop::sample::select(vec!["a", "b", "c", "d", ""]), 0..24)
            .prop_map(|lines| lines.join("\n"))
    }

    proptest! {
        #[test]
        fn removed_and_unchanged_rebuild_left(left in text(), right in text()) {
            let result = diff(&left, &right);
            prop_assert_eq!(left_side(&result), left.split('\n').collect::<Vec<_>>());
        }

        #[test]
        fn added_and_unchanged_rebuild_right(left in text(), right in text()) {
            let result = diff(&left, &right);
            prop_assert_eq!(right_side(&result), right.split('\n').collect::<Vec<_>>());
        }

        #[test]
        fn line_numbers_count_up_per_side(left in text(), right in text()) {
            let result = diff(&left, &right);

            let left_numbers: Vec<usize> = result.iter()
                .filter(|l| l.kind != LineKind::Added)
                .map(|l| l.line_number)
                .collect();
            let right_numbers: Vec<usize> = result.iter()
                .filter_map(|l| match l.kind {
                    LineKind::Added => Some(l.line_number),
                    LineKind::Unchanged => l.right_line_number,
                    LineKind::Removed => None,
                })
                .collect();

            prop_assert_eq!(left_numbers, (1..=left.split('\n').count()).collect::<Vec<_>>());
            prop_assert_eq!(right_numbers, (1..=right.split('\n').count()).collect::<Vec<_>>());
        }

        #[test]
        fn self_diff_is_all_unchanged(body in text()) {
            let result = diff(&body, &body);
            prop_assert_eq!(result.len(), body.split('\n').count());
            for (index, line) in result.iter().enumerate() {
                prop_assert_eq!(line.kind, LineKind::Unchanged);
                prop_assert_eq!(line.line_number, index + 1);
                prop_assert_eq!(line.right_line_number, Some(index + 1));
            }
        }
    }
}
