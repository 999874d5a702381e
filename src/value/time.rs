//! Timestamp and duration plumbing.
//!
//! Timestamps are nanoseconds since the Unix epoch; durations are signed
//! nanosecond spans. Text forms are RFC 3339 for timestamps (UTC and fixed
//! `±HH:MM` offsets; named zones are not supported) and the `72h3m0.5s`
//! unit-suffix form for durations.

use once_cell::sync::Lazy;
use regex::Regex;

pub const NANOS_PER_SECOND: i64 = 1_000_000_000;
const SECONDS_PER_DAY: i64 = 86_400;

static TIMESTAMP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(\d{4})-(\d{2})-(\d{2})[Tt](\d{2}):(\d{2}):(\d{2})(\.\d+)?([Zz]|[+-]\d{2}:\d{2})$",
    )
    .expect("timestamp pattern is well-formed")
});

/// Days since the epoch for a civil date (proleptic Gregorian).
fn days_from_civil(year: i64, month: i64, day: i64) -> i64 {
    let year = if month <= 2 { year - 1 } else { year };
    let era = if year >= 0 { year } else { year - 399 } / 400;
    let year_of_era = year - era * 400;
    let month_shifted = if month > 2 { month - 3 } else { month + 9 };
    let day_of_year = (153 * month_shifted + 2) / 5 + day - 1;
    let day_of_era = year_of_era * 365 + year_of_era / 4 - year_of_era / 100 + day_of_year;

    era * 146_097 + day_of_era - 719_468
}

/// Civil date for a day count since the epoch.
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let day_of_era = z - era * 146_097;
    let year_of_era =
        (day_of_era - day_of_era / 1460 + day_of_era / 36_524 - day_of_era / 146_096) / 365;
    let year = year_of_era + era * 400;
    let day_of_year = day_of_era - (365 * year_of_era + year_of_era / 4 - year_of_era / 100);
    let month_shifted = (5 * day_of_year + 2) / 153;
    let day = day_of_year - (153 * month_shifted + 2) / 5 + 1;
    let month = if month_shifted < 10 {
        month_shifted + 3
    } else {
        month_shifted - 9
    };
    let year = if month <= 2 { year + 1 } else { year };

    (year, month as u32, day as u32)
}

fn days_in_month(year: i64, month: i64) -> i64 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            let leap = (year % 4 == 0 && year % 100 != 0) || year % 400 == 0;
            if leap {
                29
            } else {
                28
            }
        }
        _ => 0,
    }
}

/// Parse an RFC 3339 timestamp into epoch nanoseconds.
pub fn parse_timestamp(text: &str) -> Result<i64, String> {
    let caps = TIMESTAMP_RE
        .captures(text)
        .ok_or_else(|| format!("invalid timestamp: '{text}'"))?;

    let field = |i: usize| -> i64 { caps[i].parse().expect("digits matched by pattern") };
    let (year, month, day) = (field(1), field(2), field(3));
    let (hour, minute, second) = (field(4), field(5), field(6));

    if !(1..=9999).contains(&year)
        || !(1..=12).contains(&month)
        || day < 1
        || day > days_in_month(year, month)
        || hour > 23
        || minute > 59
        || second > 59
    {
        return Err(format!("timestamp out of range: '{text}'"));
    }

    let fraction_nanos = match caps.get(7) {
        Some(frac) => {
            let digits = &frac.as_str()[1..];
            let padded = format!("{digits:0<9}");
            padded[..9]
                .parse::<i64>()
                .map_err(|_| format!("invalid timestamp fraction: '{text}'"))?
        }
        None => 0,
    };

    let offset = parse_offset(&caps[8])?;

    let days = days_from_civil(year, month, day);
    let seconds = days * SECONDS_PER_DAY + hour * 3600 + minute * 60 + second - offset;

    Ok(seconds * NANOS_PER_SECOND + fraction_nanos)
}

/// Render epoch nanoseconds as an RFC 3339 UTC timestamp.
pub fn format_timestamp(nanos: i64) -> String {
    let seconds = nanos.div_euclid(NANOS_PER_SECOND);
    let subsec = nanos.rem_euclid(NANOS_PER_SECOND);

    let days = seconds.div_euclid(SECONDS_PER_DAY);
    let second_of_day = seconds.rem_euclid(SECONDS_PER_DAY);
    let (year, month, day) = civil_from_days(days);
    let (hour, minute, second) = (
        second_of_day / 3600,
        second_of_day % 3600 / 60,
        second_of_day % 60,
    );

    let mut out = format!(
        "{year:04}-{month:02}-{day:02}T{hour:02}:{minute:02}:{second:02}"
    );
    if subsec != 0 {
        let frac = format!("{subsec:09}");
        out.push('.');
        out.push_str(frac.trim_end_matches('0'));
    }
    out.push('Z');

    out
}

/// Parse a fixed-offset time zone: `UTC`, `Z` or `±HH:MM`. Named zones
/// depend on host zone data and are rejected.
pub fn parse_offset(tz: &str) -> Result<i64, String> {
    match tz {
        "UTC" | "Z" | "z" => Ok(0),
        _ => {
            let bytes = tz.as_bytes();
            let sign = match bytes.first() {
                Some(b'+') => 1,
                Some(b'-') => -1,
                _ => return Err(format!("unsupported time zone: '{tz}'")),
            };
            let rest = &tz[1..];
            let (hours, minutes) = rest
                .split_once(':')
                .ok_or_else(|| format!("unsupported time zone: '{tz}'"))?;
            let hours: i64 = hours
                .parse()
                .map_err(|_| format!("unsupported time zone: '{tz}'"))?;
            let minutes: i64 = minutes
                .parse()
                .map_err(|_| format!("unsupported time zone: '{tz}'"))?;
            if hours > 18 || minutes > 59 {
                return Err(format!("time zone offset out of range: '{tz}'"));
            }

            Ok(sign * (hours * 3600 + minutes * 60))
        }
    }
}

/// Parse a duration written as a signed sequence of `<number><unit>`
/// segments, with units `h`, `m`, `s`, `ms`, `us`, `ns`.
pub fn parse_duration(text: &str) -> Result<i64, String> {
    let err = || format!("invalid duration: '{text}'");

    let (sign, mut rest) = match text.as_bytes().first() {
        Some(b'-') => (-1i128, &text[1..]),
        Some(b'+') => (1, &text[1..]),
        _ => (1, text),
    };
    if rest.is_empty() {
        return Err(err());
    }
    if rest == "0" {
        return Ok(0);
    }

    let mut total: i128 = 0;
    while !rest.is_empty() {
        let digits = rest
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .ok_or_else(err)?;
        let (number, tail) = rest.split_at(digits);
        let unit_len = tail
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);
        rest = tail;

        let unit_nanos: i128 = match unit {
            "h" => 3_600 * NANOS_PER_SECOND as i128,
            "m" => 60 * NANOS_PER_SECOND as i128,
            "s" => NANOS_PER_SECOND as i128,
            "ms" => 1_000_000,
            "us" => 1_000,
            "ns" => 1,
            _ => return Err(err()),
        };

        let segment = match number.split_once('.') {
            None => {
                let whole: i128 = number.parse().map_err(|_| err())?;
                whole * unit_nanos
            }
            Some((whole, frac)) => {
                if frac.is_empty() {
                    return Err(err());
                }
                let whole: i128 = if whole.is_empty() {
                    0
                } else {
                    whole.parse().map_err(|_| err())?
                };
                let frac_value: f64 = format!("0.{frac}").parse().map_err(|_| err())?;
                whole * unit_nanos + (frac_value * unit_nanos as f64).round() as i128
            }
        };
        total += segment;
    }

    let total = sign * total;
    i64::try_from(total).map_err(|_| format!("duration out of range: '{text}'"))
}

/// Render a duration as decimal seconds with an `s` suffix.
pub fn format_duration(nanos: i64) -> String {
    let negative = nanos < 0;
    let magnitude = (nanos as i128).unsigned_abs();
    let seconds = magnitude / NANOS_PER_SECOND as u128;
    let subsec = magnitude % NANOS_PER_SECOND as u128;

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&seconds.to_string());
    if subsec != 0 {
        let frac = format!("{subsec:09}");
        out.push('.');
        out.push_str(frac.trim_end_matches('0'));
    }
    out.push('s');

    out
}

/// A timestamp broken down into civil fields at a fixed offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CivilDateTime {
    pub year: i64,
    /// 1-based month.
    pub month: u32,
    /// 1-based day of month.
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    pub nanosecond: u32,
    /// 0-based day of week, Sunday first.
    pub day_of_week: u32,
    /// 0-based day of year.
    pub day_of_year: u32,
}

pub fn civil_from_nanos(nanos: i64, offset_seconds: i64) -> CivilDateTime {
    let seconds = nanos.div_euclid(NANOS_PER_SECOND) + offset_seconds;
    let subsec = nanos.rem_euclid(NANOS_PER_SECOND);

    let days = seconds.div_euclid(SECONDS_PER_DAY);
    let second_of_day = seconds.rem_euclid(SECONDS_PER_DAY);
    let (year, month, day) = civil_from_days(days);

    CivilDateTime {
        year,
        month,
        day,
        hour: (second_of_day / 3600) as u32,
        minute: (second_of_day % 3600 / 60) as u32,
        second: (second_of_day % 60) as u32,
        nanosecond: subsec as u32,
        day_of_week: ((days + 4).rem_euclid(7)) as u32,
        day_of_year: (days - days_from_civil(year, 1, 1)) as u32,
    }
}
