//! Verbatim preservation check for explicitly delimited document regions.

/// A start/end marker vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerPair {
    pub kind: &'static str,
    pub start: &'static str,
    pub end: &'static str,
}

pub const HUMAN_EDITED: MarkerPair = MarkerPair {
    kind: "HUMAN-EDITED",
    start: "<!-- HUMAN-EDITED START -->",
    end: "<!-- HUMAN-EDITED END -->",
};

pub const PRESERVE: MarkerPair = MarkerPair {
    kind: "PRESERVE",
    start: "<!-- PRESERVE START -->",
    end: "<!-- PRESERVE END -->",
};

pub const MARKER_PAIRS: [MarkerPair; 2] = [HUMAN_EDITED, PRESERVE];

/// One delimited region, markers included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreservedSpan {
    pub kind: &'static str,
    /// 1-based position among spans of the same kind.
    pub index: usize,
    pub content: String,
}

impl PreservedSpan {
    /// Stable identifier such as `HUMAN-EDITED-1`.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}-{}", self.kind, self.index)
    }
}

/// Non-overlapping spans per marker kind, in kind order then document order.
///
/// A start marker with no matching end terminates the scan for that kind.
pub fn extract_spans(document: &str) -> Vec<PreservedSpan> {
    let mut spans = Vec::new();

    for pair in MARKER_PAIRS {
        let mut cursor = 0;
        let mut index = 1;

        while let Some(found) = document[cursor..].find(pair.start) {
            let start = cursor + found;
            let Some(found_end) = document[start..].find(pair.end) else {
                break;
            };
            let end = start + found_end + pair.end.len();

            spans.push(PreservedSpan {
                kind: pair.kind,
                index,
                content: document[start..end].to_string(),
            });

            cursor = end;
            index += 1;
        }
    }

    spans
}

/// One warning per original span missing verbatim from `new_document`.
pub fn validate(original: &str, new_document: &str) -> Vec<String> {
    extract_spans(original)
        .into_iter()
        .filter(|span| !new_document.contains(&span.content))
        .map(|span| format!("Human-edited section '{}' was not preserved", span.key()))
        .collect()
}
