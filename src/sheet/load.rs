// src/sheet/load.rs

use anyhow::{bail, Context, Result};
use calamine::{open_workbook, Data, Reader, Xlsx};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

use super::{Cell, RawSheet};

/// Open an XLSX workbook and read every worksheet into a [`RawSheet`] grid,
/// keyed by worksheet name. A workbook with no sheets is a structural error;
/// individual odd cells are not.
pub fn load_workbook<P: AsRef<Path>>(path: P) -> Result<BTreeMap<String, RawSheet>> {
    let path = path.as_ref();
    let mut workbook: Xlsx<_> = open_workbook(path)
        .with_context(|| format!("opening workbook {}", path.display()))?;

    let sheet_names = workbook.sheet_names().to_vec();
    if sheet_names.is_empty() {
        bail!("workbook {} contains no sheets", path.display());
    }

    let mut sheets = BTreeMap::new();
    for name in &sheet_names {
        let range = workbook
            .worksheet_range(name)
            .with_context(|| format!("reading sheet {:?} of {}", name, path.display()))?;
        let rows: Vec<Vec<Cell>> = range
            .rows()
            .map(|row| row.iter().map(to_cell).collect())
            .collect();
        if rows.is_empty() {
            warn!(sheet = %name, "sheet has no cells");
        }
        debug!(sheet = %name, rows = rows.len(), "loaded sheet");
        sheets.insert(name.clone(), RawSheet::new(name.clone(), rows));
    }

    Ok(sheets)
}

fn to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        // formula errors coerce like any other unparseable cell
        Data::Error(_) => Cell::Empty,
    }
}
