// Edit ledger: accumulates replace/remove/insert operations keyed by source
// range, rejects overlaps, and commits them as a batch. Scheduling is pure
// bookkeeping; nothing touches the source text until `commit`.

use thiserror::Error;

use crate::ast::Span;

/// An edit overlapping an already-scheduled one. Always a programming-logic
/// bug in a rule: the traversal-skip protocol exists to prevent a descendant
/// and an ancestor from both scheduling conflicting edits.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("edit at {proposed:?} overlaps already-scheduled edit at {existing:?}")]
pub struct ConflictError {
    pub existing: Span,
    pub proposed: Span,
}

/// One scheduled text operation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    Replace { span: Span, text: String },
    Remove { span: Span },
    InsertBefore { anchor: Span, text: String },
    InsertAfter { anchor: Span, text: String },
}

impl Edit {
    pub fn replace(span: Span, text: impl Into<String>) -> Self {
        Edit::Replace {
            span,
            text: text.into(),
        }
    }

    pub fn remove(span: Span) -> Self {
        Edit::Remove { span }
    }

    pub fn insert_before(anchor: Span, text: impl Into<String>) -> Self {
        Edit::InsertBefore {
            anchor,
            text: text.into(),
        }
    }

    pub fn insert_after(anchor: Span, text: impl Into<String>) -> Self {
        Edit::InsertAfter {
            anchor,
            text: text.into(),
        }
    }

    /// The source range this edit claims. Insertions claim an empty range at
    /// their insertion point.
    pub fn range(&self) -> Span {
        match self {
            Edit::Replace { span, .. } | Edit::Remove { span } => *span,
            Edit::InsertBefore { anchor, .. } => Span::new(anchor.start, anchor.start),
            Edit::InsertAfter { anchor, .. } => Span::new(anchor.end, anchor.end),
        }
    }
}

/// Ordered set of edits for one compilation unit.
///
/// Invariant: no two scheduled edits have overlapping ranges. An insertion
/// point conflicts with a span only when strictly inside it; two insertions
/// at the same point conflict (applying them in descending source order
/// would be ambiguous).
#[derive(Debug, Default)]
pub struct EditLedger {
    edits: Vec<Edit>,
}

impl EditLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn edits(&self) -> &[Edit] {
        &self.edits
    }

    /// Schedule one edit, rejecting it when its range overlaps any
    /// previously scheduled edit.
    pub fn schedule(&mut self, edit: Edit) -> Result<(), ConflictError> {
        self.check(&edit, &[])?;
        self.edits.push(edit);
        Ok(())
    }

    /// Schedule a group of edits atomically: either every edit lands, or a
    /// conflict is reported and the ledger is unchanged.
    pub fn schedule_batch(&mut self, batch: Vec<Edit>) -> Result<(), ConflictError> {
        for (i, edit) in batch.iter().enumerate() {
            self.check(edit, &batch[..i])?;
        }
        self.edits.extend(batch);
        Ok(())
    }

    fn check(&self, edit: &Edit, pending: &[Edit]) -> Result<(), ConflictError> {
        let proposed = edit.range();
        for existing in self.edits.iter().chain(pending) {
            let claimed = existing.range();
            if ranges_conflict(claimed, proposed) {
                return Err(ConflictError {
                    existing: claimed,
                    proposed,
                });
            }
        }
        Ok(())
    }

    /// Apply all scheduled edits to the original text, in descending order
    /// of source position so earlier edits' offsets are unaffected by later
    /// ones, and return the transformed text.
    pub fn commit(&self, source: &str) -> String {
        let mut ordered: Vec<&Edit> = self.edits.iter().collect();
        // Descending by position; replacements before insertions at the same
        // point so an InsertBefore lands left of a replacement it touches.
        ordered.sort_by(|a, b| {
            b.range()
                .start
                .cmp(&a.range().start)
                .then_with(|| a.range().is_empty().cmp(&b.range().is_empty()))
        });

        let mut text = source.to_string();
        for edit in ordered {
            match edit {
                Edit::Replace { span, text: replacement } => {
                    text.replace_range(span.start..span.end, replacement);
                }
                Edit::Remove { span } => {
                    let (lo, hi) = self.widening_limits(*span);
                    let (start, end) = removal_bounds(&text, *span, lo, hi);
                    text.replace_range(start..end, "");
                }
                Edit::InsertBefore { text: insertion, .. }
                | Edit::InsertAfter { text: insertion, .. } => {
                    text.insert_str(edit.range().start, insertion);
                }
            }
        }
        text
    }

    /// The nearest positions claimed by other scheduled edits on either side
    /// of `span`. Widening a removal past them would shift text out from
    /// under the neighboring edit.
    fn widening_limits(&self, span: Span) -> (usize, usize) {
        let mut lo = 0;
        let mut hi = usize::MAX;
        for edit in &self.edits {
            let range = edit.range();
            if range == span {
                continue;
            }
            if range.end <= span.start {
                lo = lo.max(range.end);
            }
            if range.start >= span.end {
                hi = hi.min(range.start);
            }
        }
        (lo, hi)
    }
}

fn ranges_conflict(a: Span, b: Span) -> bool {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => a.start == b.start,
        (true, false) => b.start < a.start && a.start < b.end,
        (false, true) => a.start < b.start && b.start < a.end,
        (false, false) => a.overlaps(b),
    }
}

/// Widen a removal so an excised statement does not leave a blank line:
/// when only whitespace surrounds the span on its line, the whole line goes,
/// including its newline. The widening stops at `lo` and `hi`, the nearest
/// positions claimed by other scheduled edits; a removal clamped short of
/// its line start falls back to the exact span so a neighboring insertion
/// keeps its anchor.
fn removal_bounds(text: &str, span: Span, lo: usize, hi: usize) -> (usize, usize) {
    let bytes = text.as_bytes();
    let hi = hi.min(bytes.len());
    let mut start = span.start;
    while start > lo && matches!(bytes[start - 1], b' ' | b'\t') {
        start -= 1;
    }
    let at_line_start = start == 0 || bytes[start - 1] == b'\n';

    let mut end = span.end;
    while end < hi && matches!(bytes[end], b' ' | b'\t') {
        end += 1;
    }
    if at_line_start && end < hi && bytes[end] == b'\n' {
        end += 1;
        return (start, end);
    }
    // Mid-line removal: leave surrounding whitespace alone.
    (span.start, span.end)
}
