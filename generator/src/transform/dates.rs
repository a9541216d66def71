//! Normalization of numeric text dates.
//!
//! Spreadsheets carry dates typed by hand in whatever order the cataloguer
//! preferred (`5/14/2000`, `14-5-2000`, `5/4/99`). Dates with a four-digit
//! year are rewritten as `YYYY-MM-DD`; two-digit years are only touched when
//! the caller forces it.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::parser::Cell;

/// `A<sep>B<sep>Y` with 1-2 digit groups and a 2 or 4 digit year.
static NUMERIC_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d{1,2})([/-])(\d{1,2})([/-])(\d{4}|\d{2})\s*$").expect("valid date regex")
});

/// Two-digit years are read as 19YY.
const TWO_DIGIT_YEAR_BASE: i32 = 1900;

/// Normalize a text date, returning the input unchanged when it is not a
/// recognizable numeric date.
///
/// # Example
/// ```
/// use mods_generator::transform::dates::normalize_text;
///
/// assert_eq!(normalize_text("5/14/2000", false), "2000-05-14");
/// assert_eq!(normalize_text("14-5-2000", false), "2000-05-14");
/// assert_eq!(normalize_text("5/4/99", false), "5/4/99");
/// assert_eq!(normalize_text("5/4/99", true), "1999-05-04");
/// ```
pub fn normalize_text(value: &str, force_ambiguous: bool) -> String {
    parse_numeric_date(value, force_ambiguous)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| value.to_string())
}

/// Normalize a cell. Only text cells are candidates; everything else
/// comes back as it went in.
pub fn normalize_cell(cell: Cell, force_ambiguous: bool) -> Cell {
    match cell {
        Cell::Text(s) => Cell::Text(normalize_text(&s, force_ambiguous)),
        other => other,
    }
}

fn parse_numeric_date(value: &str, force_ambiguous: bool) -> Option<NaiveDate> {
    let caps = NUMERIC_DATE.captures(value)?;
    if caps[2] != caps[4] {
        return None;
    }

    let a: u32 = caps[1].parse().ok()?;
    let b: u32 = caps[3].parse().ok()?;
    let year_text = &caps[5];
    let year: i32 = year_text.parse().ok()?;

    if year_text.len() == 4 {
        let (month, day) = match (a > 12, b > 12) {
            (true, true) => return None,
            (true, false) => (b, a),
            // Month-first when ambiguous
            (false, _) => (a, b),
        };
        NaiveDate::from_ymd_opt(year, month, day)
    } else if force_ambiguous {
        NaiveDate::from_ymd_opt(TWO_DIGIT_YEAR_BASE + year, a, b)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slash_dates() {
        assert_eq!(normalize_text("5/14/2000", false), "2000-05-14");
        assert_eq!(normalize_text("14/5/2000", false), "2000-05-14");
    }

    #[test]
    fn test_dash_dates() {
        assert_eq!(normalize_text("3-17-2013", false), "2013-03-17");
        assert_eq!(normalize_text("17-3-2013", false), "2013-03-17");
    }

    #[test]
    fn test_ambiguous_four_digit_is_month_first() {
        assert_eq!(normalize_text("5/4/2000", false), "2000-05-04");
        assert_eq!(normalize_text("05/04/2000", false), "2000-05-04");
    }

    #[test]
    fn test_two_digit_years_unchanged() {
        for value in [
            "5/4/99", "5/14/00", "05/14/00", "14/5/00", "14/05/00", "3-17-13", "03-17-13",
            "17-3-13", "17-03-13", "3-3-03", "03-17-03", "05/14/01", "05-14-12",
        ] {
            assert_eq!(normalize_text(value, false), value);
        }
    }

    #[test]
    fn test_forced_two_digit_years() {
        assert_eq!(normalize_text("5/4/99", true), "1999-05-04");
        assert_eq!(normalize_text("5/17/99", true), "1999-05-17");
        // Month-first even when forced, so an impossible month stays as is
        assert_eq!(normalize_text("17/5/99", true), "17/5/99");
    }

    #[test]
    fn test_unrecognized_unchanged() {
        assert_eq!(normalize_text("", false), "");
        assert_eq!(normalize_text("1972-10-1973-07-07", false), "1972-10-1973-07-07");
        assert_eq!(normalize_text("7/13/1899 or so", false), "7/13/1899 or so");
        assert_eq!(normalize_text("5/14-2000", false), "5/14-2000");
        assert_eq!(normalize_text("14/14/2000", false), "14/14/2000");
        assert_eq!(normalize_text("2/30/2000", false), "2/30/2000");
    }

    #[test]
    fn test_surrounding_whitespace() {
        assert_eq!(normalize_text(" 5/14/2000 ", false), "2000-05-14");
    }

    #[test]
    fn test_non_text_cells_unchanged() {
        assert_eq!(normalize_cell(Cell::Int(1), false), Cell::Int(1));
        assert_eq!(normalize_cell(Cell::Empty, true), Cell::Empty);
        assert_eq!(
            normalize_cell(Cell::Text("5/14/2000".into()), false),
            Cell::Text("2000-05-14".into())
        );
        assert_eq!(
            normalize_cell(Cell::Text(String::new()), false),
            Cell::Text(String::new())
        );
    }
}
