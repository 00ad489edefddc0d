//! Per-character highlight diffs between a current and a proposed name.
//!
//! The segmentation is common-prefix / differing-middle / common-suffix,
//! computed over Unicode scalars. Deterministic and symmetric: the same two
//! strings always produce the same segmentation, in either argument order.

/// One run of characters, flagged when it differs from the other name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightSegment {
    pub text: String,
    pub changed: bool,
}

/// Segment both names against each other. Empty segments are omitted.
pub fn diff_segments(
    current: &str,
    proposed: &str,
) -> (Vec<HighlightSegment>, Vec<HighlightSegment>) {
    let a: Vec<char> = current.chars().collect();
    let b: Vec<char> = proposed.chars().collect();

    let limit = a.len().min(b.len());
    let prefix = a
        .iter()
        .zip(&b)
        .take(limit)
        .take_while(|(x, y)| x == y)
        .count();
    let suffix = a
        .iter()
        .rev()
        .zip(b.iter().rev())
        .take(limit - prefix)
        .take_while(|(x, y)| x == y)
        .count();

    (segments(&a, prefix, suffix), segments(&b, prefix, suffix))
}

fn segments(chars: &[char], prefix: usize, suffix: usize) -> Vec<HighlightSegment> {
    let mut out = Vec::new();
    let middle_end = chars.len() - suffix;

    for (range, changed) in [
        (0..prefix, false),
        (prefix..middle_end, true),
        (middle_end..chars.len(), false),
    ] {
        if !range.is_empty() {
            out.push(HighlightSegment {
                text: chars[range].iter().collect(),
                changed,
            });
        }
    }
    out
}
