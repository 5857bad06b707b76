// src/normalize/groups.rs

use crate::sheet::RawSheet;

/// Columns repeat as `(value, unit, count)` for every response level.
pub const TRIPLE_WIDTH: usize = 3;

/// A contiguous run of columns sharing one top-level category label in
/// header row 1, subdivided into one `(value, unit, count)` triple per
/// response level.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnGroup {
    pub start_column: usize,
    pub category_label: String,
    pub sub_levels: Vec<String>,
}

impl ColumnGroup {
    /// Column of the value cell for `level_index` within this group.
    pub fn value_column(&self, level_index: usize) -> usize {
        self.start_column + level_index * TRIPLE_WIDTH
    }

    /// Column of the respondent-count cell for `level_index`.
    pub fn count_column(&self, level_index: usize) -> usize {
        self.value_column(level_index) + 2
    }
}

/// Scan header row 1 for top-level category labels and return the column
/// groups they introduce, ordered by `start_column` and non-overlapping.
///
/// Column 0 is the row-key column and never part of a group; a header cell
/// repeating the row-key column's own label (e.g. "Country") does not start
/// one either. Each group nominally spans `sub_levels.len()` triples, but a
/// group is truncated to the complete triples that fit before the next label
/// or the sheet edge, so no group ever reads past the grid.
///
/// A sheet with no labels past column 0 is treated as one implicit group
/// covering all remaining columns, labelled `default_category` (falling back
/// to the sheet name).
pub fn detect_column_groups(
    sheet: &RawSheet,
    sub_levels: &[String],
    default_category: Option<&str>,
) -> Vec<ColumnGroup> {
    let column_count = sheet.column_count();
    let header = sheet.header_row(0);
    let key_label = sheet.cell(0, 0).as_text();

    let mut starts: Vec<(usize, String)> = Vec::new();
    for (col, cell) in header.iter().enumerate().skip(1) {
        if let Some(label) = cell.as_text() {
            if Some(label) != key_label {
                starts.push((col, label.to_string()));
            }
        }
    }

    if starts.is_empty() {
        let label = default_category.unwrap_or(&sheet.name).to_string();
        return truncated_group(1, label, sub_levels, column_count)
            .into_iter()
            .collect();
    }

    let mut groups = Vec::with_capacity(starts.len());
    for (i, (start, label)) in starts.iter().enumerate() {
        let end = starts
            .get(i + 1)
            .map(|(next, _)| *next)
            .unwrap_or(column_count)
            .min(column_count);
        if let Some(group) = truncated_group(*start, label.clone(), sub_levels, end) {
            groups.push(group);
        }
    }
    groups
}

/// Build a group at `start`, keeping only the complete triples that fit
/// before `end`. Returns `None` when not even one triple fits.
fn truncated_group(
    start: usize,
    category_label: String,
    sub_levels: &[String],
    end: usize,
) -> Option<ColumnGroup> {
    let available = end.saturating_sub(start) / TRIPLE_WIDTH;
    let keep = sub_levels.len().min(available);
    if keep == 0 {
        return None;
    }
    Some(ColumnGroup {
        start_column: start,
        category_label,
        sub_levels: sub_levels[..keep].to_vec(),
    })
}
