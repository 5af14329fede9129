use chrono::NaiveDate;

use super::patterns::ISSUE_DATE;

fn month_number(name: &str) -> Option<u32> {
    let month = match name.to_lowercase().as_str() {
        "enero" => 1,
        "febrero" => 2,
        "marzo" => 3,
        "abril" => 4,
        "mayo" => 5,
        "junio" => 6,
        "julio" => 7,
        "agosto" => 8,
        "septiembre" | "setiembre" => 9,
        "octubre" => 10,
        "noviembre" => 11,
        "diciembre" => 12,
        _ => return None,
    };
    Some(month)
}

/// Parse a Spanish long-form date such as `2 de enero de 2026` or
/// `1º de Septiembre del 2025`. Returns `None` for anything that is not a
/// real calendar date.
pub fn parse_issue_date(text: &str) -> Option<NaiveDate> {
    let caps = ISSUE_DATE.captures(text)?;
    let day: u32 = caps.get(1)?.as_str().parse().ok()?;
    let month = month_number(caps.get(2)?.as_str())?;
    let year: i32 = caps.get(3)?.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}
