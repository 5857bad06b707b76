// src/normalize/value.rs

use crate::sheet::Cell;

/// The NA marker the EUROSTUDENT exports write into suppressed cells.
const NA_SENTINEL: &str = "n. a.";

/// Coerce a cell to a float. NA sentinels, blanks, and anything that fails
/// numeric parsing come back as `None`; this never errors.
pub fn parse_value(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Number(n) => Some(*n),
        Cell::Text(s) => {
            let t = s.trim();
            if t.is_empty() || t == NA_SENTINEL {
                return None;
            }
            t.parse::<f64>().ok()
        }
        _ => None,
    }
}

/// Coerce a cell to a respondent count, with the same permissive policy as
/// [`parse_value`]. Counts exported as floats truncate toward zero.
pub fn parse_count(cell: &Cell) -> Option<i64> {
    parse_value(cell).map(|v| v as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_and_numeric_strings_parse() {
        assert_eq!(parse_value(&Cell::Number(45.0)), Some(45.0));
        assert_eq!(parse_value(&Cell::Text("15.3".into())), Some(15.3));
        assert_eq!(parse_value(&Cell::Text("  40 ".into())), Some(40.0));
    }

    #[test]
    fn na_sentinels_and_junk_coerce_to_none() {
        assert_eq!(parse_value(&Cell::Text("n. a.".into())), None);
        assert_eq!(parse_value(&Cell::Text("".into())), None);
        assert_eq!(parse_value(&Cell::Text("   ".into())), None);
        assert_eq!(parse_value(&Cell::Text("%".into())), None);
        assert_eq!(parse_value(&Cell::Empty), None);
        assert_eq!(parse_value(&Cell::Bool(true)), None);
    }

    #[test]
    fn counts_truncate_float_exports() {
        assert_eq!(parse_count(&Cell::Number(120.0)), Some(120));
        assert_eq!(parse_count(&Cell::Text("30".into())), Some(30));
        assert_eq!(parse_count(&Cell::Text("n. a.".into())), None);
    }
}
