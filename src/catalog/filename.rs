// src/catalog/filename.rs

use once_cell::sync::Lazy;
use regex::Regex;

/// Metadata encoded in the export naming convention
/// `E8_<measure>__<breakdown>__<scope>.xlsx`, e.g.
/// `E8_work_related_study5__e_sex__all_contries.xlsx`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkbookMeta {
    pub measure: String,
    pub breakdown: String,
    pub scope: String,
}

static WORKBOOK_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^E8_(.+?)__(.+?)__(.+?)\.xlsx$").expect("invalid workbook name regex")
});

/// Parse a workbook filename following the double-underscore convention.
/// Returns `None` for names outside it (topic summaries, manual exports).
pub fn parse_workbook_name(filename: &str) -> Option<WorkbookMeta> {
    let caps = WORKBOOK_NAME.captures(filename)?;
    Some(WorkbookMeta {
        measure: caps[1].to_string(),
        breakdown: caps[2].to_string(),
        scope: caps[3].to_string(),
    })
}
