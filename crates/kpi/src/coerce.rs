//! Lenient cell coercion. Nothing here fails: a cell that cannot be read as
//! the wanted type is simply absent.

use chrono::{Days, NaiveDate, NaiveDateTime};

use crate::model::Cell;

/// Read a cell as a finite number.
///
/// Text is accepted with surrounding whitespace, thousands separators,
/// currency marks (`¥`, `￥`, `円`, `$`) and full-width digits.
pub fn parse_number(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Number(n) => n.is_finite().then_some(*n),
        Cell::Text(s) => parse_number_text(s),
        Cell::Empty | Cell::Date(_) => None,
    }
}

fn parse_number_text(s: &str) -> Option<f64> {
    let cleaned: String = to_half_width(s.trim())
        .chars()
        .filter(|c| !matches!(c, ',' | '¥' | '￥' | '円' | '$') && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    // Rust accepts "inf" / "NaN" spellings; neither is a usable amount
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Map full-width ASCII variants (U+FF01..U+FF5E) to their ASCII forms.
fn to_half_width(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '\u{FF01}'..='\u{FF5E}' => char::from_u32(c as u32 - 0xFEE0).unwrap_or(c),
            _ => c,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

/// Largest serial Excel can display (9999-12-31).
const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%Y年%m月%d日", "%Y%m%d"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M",
];

/// Year-month labels resolve to the first day of the month.
const MONTH_FORMATS: &[(&str, &str)] = &[("%Y-%m-%d", "-01"), ("%Y/%m/%d", "/01"), ("%Y年%m月%d日", "1日")];

/// Separators of week-range labels such as `2024/01/01 - 2024/01/07`.
const RANGE_SEPARATORS: &[&str] = &[" - ", "~", "〜", "～"];

/// Read a cell as a calendar date. Numbers are Excel serials (epoch
/// 1899-12-30); text accepts ISO, slash, dotted, compact, Japanese and
/// year-month forms, and takes the start of a range.
pub fn parse_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::Date(d) => Some(*d),
        Cell::Number(n) => serial_to_date(*n),
        Cell::Text(s) => parse_date_text(s),
        Cell::Empty => None,
    }
}

fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial > MAX_EXCEL_SERIAL {
        return None;
    }
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_days(Days::new(serial.floor() as u64))
}

fn parse_date_text(s: &str) -> Option<NaiveDate> {
    let s = to_half_width(s.trim());
    if s.is_empty() {
        return None;
    }

    let start = RANGE_SEPARATORS
        .iter()
        .find_map(|sep| s.split_once(sep).map(|(head, _)| head.trim()))
        .unwrap_or(s.as_str());

    if let Some(d) = DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(start, f).ok())
    {
        return Some(d);
    }

    if let Some(dt) = DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(start, f).ok())
    {
        return Some(dt.date());
    }

    MONTH_FORMATS
        .iter()
        .find_map(|(f, suffix)| NaiveDate::parse_from_str(&format!("{start}{suffix}"), f).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn numbers_from_text() {
        assert_eq!(parse_number(&Cell::from("1,234")), Some(1234.0));
        assert_eq!(parse_number(&Cell::from(" ¥5,000 ")), Some(5000.0));
        assert_eq!(parse_number(&Cell::from("3000円")), Some(3000.0));
        assert_eq!(parse_number(&Cell::from("１２３")), Some(123.0));
        assert_eq!(parse_number(&Cell::from("-2.5")), Some(-2.5));
        assert_eq!(parse_number(&Cell::from("+7")), Some(7.0));
    }

    #[test]
    fn non_numbers_are_absent() {
        assert_eq!(parse_number(&Cell::from("n/a")), None);
        assert_eq!(parse_number(&Cell::from("")), None);
        assert_eq!(parse_number(&Cell::from("NaN")), None);
        assert_eq!(parse_number(&Cell::from("inf")), None);
        assert_eq!(parse_number(&Cell::Number(f64::NAN)), None);
        assert_eq!(parse_number(&Cell::Number(f64::INFINITY)), None);
        assert_eq!(parse_number(&Cell::Date(d(2024, 1, 1))), None);
        assert_eq!(parse_number(&Cell::Empty), None);
    }

    #[test]
    fn dates_from_text() {
        assert_eq!(parse_date(&Cell::from("2024-01-05")), Some(d(2024, 1, 5)));
        assert_eq!(parse_date(&Cell::from("2024/1/5")), Some(d(2024, 1, 5)));
        assert_eq!(parse_date(&Cell::from("2024年1月5日")), Some(d(2024, 1, 5)));
        assert_eq!(parse_date(&Cell::from("20240105")), Some(d(2024, 1, 5)));
        assert_eq!(parse_date(&Cell::from("2024-01-05 13:45:00")), Some(d(2024, 1, 5)));
        assert_eq!(parse_date(&Cell::from("２０２４-０１-０５")), Some(d(2024, 1, 5)));
    }

    #[test]
    fn year_month_is_first_of_month() {
        assert_eq!(parse_date(&Cell::from("2024-03")), Some(d(2024, 3, 1)));
        assert_eq!(parse_date(&Cell::from("2024年3月")), Some(d(2024, 3, 1)));
    }

    #[test]
    fn week_range_takes_start() {
        assert_eq!(parse_date(&Cell::from("2024/01/01 - 2024/01/07")), Some(d(2024, 1, 1)));
        assert_eq!(parse_date(&Cell::from("2024/01/08〜2024/01/14")), Some(d(2024, 1, 8)));
    }

    #[test]
    fn excel_serials() {
        assert_eq!(parse_date(&Cell::Number(45292.0)), Some(d(2024, 1, 1)));
        assert_eq!(parse_date(&Cell::Number(45292.75)), Some(d(2024, 1, 1)));
        assert_eq!(parse_date(&Cell::Number(0.0)), None);
        assert_eq!(parse_date(&Cell::Number(-3.0)), None);
        assert_eq!(parse_date(&Cell::Number(1e9)), None);
    }

    #[test]
    fn unparseable_dates_are_absent() {
        assert_eq!(parse_date(&Cell::from("合計")), None);
        assert_eq!(parse_date(&Cell::from("2024-13-01")), None);
        assert_eq!(parse_date(&Cell::Empty), None);
    }
}
