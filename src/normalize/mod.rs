// src/normalize/mod.rs

pub mod groups;
pub mod value;

pub use groups::{detect_column_groups, ColumnGroup, TRIPLE_WIDTH};
pub use value::{parse_count, parse_value};

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::sheet::{Cell, RawSheet};

/// One tidy observation: a single `(row key, category, response level)`
/// triple with its percentage/score and backing respondent count. The unit
/// column between them ("%") is redundant metadata and is not retained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub row_key: String,
    pub category: String,
    pub sub_level: String,
    pub value: Option<f64>,
    pub count: Option<i64>,
}

/// Flatten a multi-header survey sheet into one [`NormalizedRecord`] per
/// `(row key, category, sub-level)` combination.
///
/// `sub_levels` is the canonical ordered list of response-level labels for
/// this dataset (e.g. the five "Applies ..." steps of a Likert scale);
/// `header_data_row_offset` is the index of the first data row (2 or 3
/// depending on the export variant); `default_category` labels the implicit
/// group of a sheet without compound headers.
///
/// Cell-level oddities never fail: non-numeric and suppressed cells come
/// through as `None`. Structural problems do: a sheet with no data rows or
/// no usable row key in column 0 is rejected outright rather than producing
/// null-filled records.
///
/// Output order is data-row order, then group order, then sub-level order.
pub fn normalize(
    sheet: &RawSheet,
    sub_levels: &[String],
    header_data_row_offset: usize,
    default_category: Option<&str>,
) -> Result<Vec<NormalizedRecord>> {
    if sheet.row_count() <= header_data_row_offset {
        bail!(
            "sheet {:?} has {} rows, none past the header offset {}",
            sheet.name,
            sheet.row_count(),
            header_data_row_offset
        );
    }

    let groups = detect_column_groups(sheet, sub_levels, default_category);
    let key_label = sheet.cell(0, 0).as_text().map(str::to_string);

    let mut records = Vec::new();
    let mut keyed_rows = 0usize;
    for row in header_data_row_offset..sheet.row_count() {
        let row_key = match data_row_key(sheet.cell(row, 0), key_label.as_deref()) {
            Some(k) => k,
            // blank or header-leakage row
            None => continue,
        };
        keyed_rows += 1;

        for group in &groups {
            for (level_index, sub_level) in group.sub_levels.iter().enumerate() {
                let value = parse_value(sheet.cell(row, group.value_column(level_index)));
                let count = parse_count(sheet.cell(row, group.count_column(level_index)));
                records.push(NormalizedRecord {
                    row_key: row_key.clone(),
                    category: group.category_label.clone(),
                    sub_level: sub_level.clone(),
                    value,
                    count,
                });
            }
        }
    }

    if keyed_rows == 0 {
        bail!("sheet {:?} has no row keys in column 0", sheet.name);
    }

    debug!(
        sheet = %sheet.name,
        rows = keyed_rows,
        groups = groups.len(),
        records = records.len(),
        "normalized sheet"
    );
    Ok(records)
}

/// The row key of a data row, or `None` for rows to skip: blank cells and
/// header artifacts that leaked below the offset (a repeat of the key
/// column's own label).
fn data_row_key(cell: &Cell, key_label: Option<&str>) -> Option<String> {
    match cell {
        Cell::Text(_) => {
            let text = cell.as_text()?;
            if Some(text) == key_label {
                return None;
            }
            Some(text.to_string())
        }
        // demographic buckets occasionally export as bare numbers
        Cell::Number(n) => Some(if n.fract() == 0.0 {
            format!("{}", *n as i64)
        } else {
            format!("{}", n)
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Cell {
        Cell::Text(s.into())
    }

    fn num(n: f64) -> Cell {
        Cell::Number(n)
    }

    fn levels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    /// 2 header rows + 3 data rows, one compound group of 2 sub-levels.
    fn synthetic_sheet() -> RawSheet {
        RawSheet::new(
            "impact",
            vec![
                vec![
                    text("Country"),
                    text("time budget"),
                    Cell::Empty,
                    Cell::Empty,
                    Cell::Empty,
                    Cell::Empty,
                    Cell::Empty,
                ],
                vec![
                    Cell::Empty,
                    text("Value"),
                    text("Unit"),
                    text("Count"),
                    text("Value"),
                    text("Unit"),
                    text("Count"),
                ],
                vec![
                    text("ES"),
                    num(45.0),
                    text("%"),
                    num(120.0),
                    num(55.0),
                    text("%"),
                    num(140.0),
                ],
                vec![
                    text("AT"),
                    text("n. a."),
                    text("%"),
                    text("n. a."),
                    num(60.0),
                    text("%"),
                    num(90.0),
                ],
                vec![
                    text("DE"),
                    num(30.5),
                    text("%"),
                    num(210.0),
                    num(69.5),
                    text("%"),
                    num(480.0),
                ],
            ],
        )
    }

    #[test]
    fn synthetic_round_trip() -> Result<()> {
        let subs = levels(&["Agree", "Disagree"]);
        let records = normalize(&synthetic_sheet(), &subs, 2, None)?;

        // 3 rows x 1 group x 2 sub-levels
        assert_eq!(records.len(), 6);
        assert_eq!(
            records[0],
            NormalizedRecord {
                row_key: "ES".into(),
                category: "time budget".into(),
                sub_level: "Agree".into(),
                value: Some(45.0),
                count: Some(120),
            }
        );
        assert_eq!(records[1].sub_level, "Disagree");
        assert_eq!(records[1].value, Some(55.0));
        assert_eq!(records[4].row_key, "DE");
        assert_eq!(records[4].value, Some(30.5));
        Ok(())
    }

    #[test]
    fn suppressed_cells_become_none_without_error() -> Result<()> {
        let subs = levels(&["Agree", "Disagree"]);
        let records = normalize(&synthetic_sheet(), &subs, 2, None)?;

        let at_agree = &records[2];
        assert_eq!(at_agree.row_key, "AT");
        assert_eq!(at_agree.value, None);
        assert_eq!(at_agree.count, None);
        // the other level of the same row still parses
        assert_eq!(records[3].value, Some(60.0));
        Ok(())
    }

    #[test]
    fn output_is_idempotent() -> Result<()> {
        let subs = levels(&["Agree", "Disagree"]);
        let sheet = synthetic_sheet();
        let first = normalize(&sheet, &subs, 2, None)?;
        let second = normalize(&sheet, &subs, 2, None)?;
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn example_scenario_es_better_same_worse() -> Result<()> {
        // row key "ES" at row 3; group "very closely" starting at column 1
        let sheet = RawSheet::new(
            "relationship",
            vec![
                {
                    let mut r = vec![text("Country"), text("very closely")];
                    r.resize(10, Cell::Empty);
                    r
                },
                {
                    let mut r = vec![Cell::Empty];
                    for _ in 0..3 {
                        r.extend([text("Value"), text("Unit"), text("Count")]);
                    }
                    r
                },
                vec![Cell::Empty; 10],
                vec![
                    text("ES"),
                    num(45.0),
                    text("%"),
                    num(120.0),
                    num(40.0),
                    text("%"),
                    num(100.0),
                    num(15.0),
                    text("%"),
                    num(30.0),
                ],
            ],
        );
        let subs = levels(&["Better", "Same", "Worse"]);
        let records = normalize(&sheet, &subs, 3, None)?;

        assert_eq!(records.len(), 3);
        for (record, (sub, value, count)) in records
            .iter()
            .zip([("Better", 45.0, 120), ("Same", 40.0, 100), ("Worse", 15.0, 30)])
        {
            assert_eq!(record.row_key, "ES");
            assert_eq!(record.category, "very closely");
            assert_eq!(record.sub_level, sub);
            assert_eq!(record.value, Some(value));
            assert_eq!(record.count, Some(count));
        }
        Ok(())
    }

    #[test]
    fn all_parallel_groups_are_surfaced() -> Result<()> {
        // three compound groups in one sheet; none may be dropped
        let mut header = vec![text("Country")];
        for label in ["with", "somewhat", "without"] {
            header.push(text(label));
            header.extend(std::iter::repeat(Cell::Empty).take(5));
        }
        let mut data = vec![text("FI")];
        for base in [10.0, 20.0, 30.0] {
            data.extend([num(base), text("%"), num(base * 10.0)]);
            data.extend([num(base + 5.0), text("%"), num(base * 10.0 + 50.0)]);
        }
        let sheet = RawSheet::new("fin", vec![header, vec![Cell::Empty; 19], data]);

        let subs = levels(&["Agree", "Disagree"]);
        let records = normalize(&sheet, &subs, 2, None)?;
        assert_eq!(records.len(), 6);
        let categories: Vec<&str> = records.iter().map(|r| r.category.as_str()).collect();
        assert_eq!(
            categories,
            ["with", "with", "somewhat", "somewhat", "without", "without"]
        );
        assert_eq!(records[2].value, Some(20.0));
        assert_eq!(records[5].value, Some(35.0));
        Ok(())
    }

    #[test]
    fn header_leakage_rows_are_skipped() -> Result<()> {
        let mut sheet = synthetic_sheet();
        // a stray repeat of the header between data rows
        sheet.rows.insert(3, vec![text("Country"), text("Value")]);
        sheet.rows.insert(4, vec![Cell::Empty, num(1.0)]);

        let subs = levels(&["Agree", "Disagree"]);
        let records = normalize(&sheet, &subs, 2, None)?;
        assert_eq!(records.len(), 6);
        assert!(records.iter().all(|r| r.row_key != "Country"));
        Ok(())
    }

    #[test]
    fn headers_only_sheet_is_rejected() {
        let sheet = RawSheet::new(
            "empty",
            vec![
                vec![text("Country"), text("cat")],
                vec![Cell::Empty, text("Value")],
            ],
        );
        let err = normalize(&sheet, &levels(&["Agree"]), 2, None).unwrap_err();
        assert!(err.to_string().contains("none past the header offset"));
    }

    #[test]
    fn keyless_sheet_is_rejected() {
        let sheet = RawSheet::new(
            "keyless",
            vec![
                vec![text("Country"), text("cat"), Cell::Empty, Cell::Empty],
                vec![Cell::Empty; 4],
                vec![Cell::Empty, num(1.0), text("%"), num(2.0)],
            ],
        );
        let err = normalize(&sheet, &levels(&["Agree"]), 2, None).unwrap_err();
        assert!(err.to_string().contains("no row keys"));
    }

    #[test]
    fn numeric_row_keys_are_kept_as_text() -> Result<()> {
        let sheet = RawSheet::new(
            "ages",
            vec![
                vec![text("Age"), Cell::Empty, Cell::Empty, Cell::Empty],
                vec![Cell::Empty, text("Value"), text("Unit"), text("Count")],
                vec![num(22.0), num(80.0), text("%"), num(400.0)],
            ],
        );
        let records = normalize(&sheet, &levels(&["Works"]), 2, Some("employment"))?;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].row_key, "22");
        assert_eq!(records[0].category, "employment");
        Ok(())
    }
}
