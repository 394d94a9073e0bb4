//! Tab-separated paste import (`label<TAB>value<TAB>note`)

use chartnotes_shared::PointDraft;

/// Result of parsing a pasted block
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PasteImport {
    /// Valid rows, in input order
    pub drafts: Vec<PointDraft>,
    /// 1-based line numbers of rows that were skipped
    pub skipped_rows: Vec<usize>,
}

impl PasteImport {
    pub fn is_empty(&self) -> bool {
        self.drafts.is_empty()
    }
}

/// Parse spreadsheet-style rows into drafts.
///
/// Blank lines are ignored. A row needs at least two columns, a non-empty
/// label and a finite number; anything else is skipped without failing the
/// batch. Columns past the third are ignored.
pub fn parse_paste(text: &str) -> PasteImport {
    let mut import = PasteImport::default();

    for (idx, line) in text.lines().enumerate() {
        // `lines` already strips a trailing \r
        if line.trim().is_empty() {
            continue;
        }
        match parse_row(line) {
            Some(draft) => import.drafts.push(draft),
            None => {
                log::debug!("skipping malformed paste row {}: {line:?}", idx + 1);
                import.skipped_rows.push(idx + 1);
            }
        }
    }

    import
}

fn parse_row(line: &str) -> Option<PointDraft> {
    let mut columns = line.split('\t');
    let label = columns.next()?;
    let value: f64 = columns.next()?.trim().parse().ok()?;
    let note = columns.next();
    PointDraft::new(label, value, note).ok()
}
