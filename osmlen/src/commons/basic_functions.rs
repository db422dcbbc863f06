use chrono::{DateTime, NaiveDate, Utc};

/// Timestamp layout expected by the Overpass `date:` setting.
pub const OVERPASS_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Normalize an RFC 3339 timestamp to UTC in Overpass layout.
pub fn normalize_date(date: &str) -> Result<String, chrono::ParseError> {
    let parsed = DateTime::parse_from_rfc3339(date.trim())?;
    Ok(parsed.with_timezone(&Utc).format(OVERPASS_DATE_FORMAT).to_string())
}

/// January 1st of `newest_year`, then the first day of every odd month
/// from November of the year before back to January of `oldest_year`, newest first.
pub fn odd_month_series(newest_year: i32, oldest_year: i32) -> Vec<String> {
    let first = NaiveDate::from_ymd_opt(newest_year, 1, 1);
    let earlier = (oldest_year..newest_year)
        .rev()
        .flat_map(|year| [11, 9, 7, 5, 3, 1].map(|month| NaiveDate::from_ymd_opt(year, month, 1)));

    first
        .into_iter()
        .chain(earlier.flatten())
        .map(|day| day.format("%Y-%m-%dT00:00:00Z").to_string())
        .collect()
}

/// Default as-of dates of the historic run: 2021-01-01 back to 2013-01-01.
pub fn historic_dates() -> Vec<String> {
    odd_month_series(2021, 2013)
}

/// Cycling share of the road network; NaN when there is no road at all.
pub fn ratio(cycle_length: f64, road_length: f64) -> f64 {
    if road_length == 0.0 {
        f64::NAN
    } else {
        cycle_length / road_length
    }
}
