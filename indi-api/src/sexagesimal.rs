//! Locale-independent parsing for the numeric format INDI uses for
//! astronomical coordinates: `D:M:S`, `D:M.m`, or a plain decimal,
//! with either `:` or whitespace as the field separator.
//!
//! The original implementation's `f_scansexa` goes through the
//! process locale for the final `strtod` call, which makes the parse
//! depend on global, mutable process state. Here the fractional part
//! is always interpreted with `.` as the decimal point, regardless of
//! environment, so a driver thread never needs to push/pop locale
//! around a parse.

use crate::types::Error;

/// Parses a single sexagesimal or decimal number from `input`.
///
/// Accepted forms (sign optional, leading/trailing whitespace
/// ignored):
/// - `D` -- a plain decimal, e.g. `"-12.345"`
/// - `D:M` -- degrees and fractional minutes, e.g. `"12:30.5"`
/// - `D:M:S` -- degrees, minutes, fractional seconds, e.g. `"12:30:15.2"`
///
/// `:` and runs of whitespace are both accepted as field separators.
pub fn parse(input: &str) -> Result<f64, Error> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::BadFormat("empty numeric value".into()));
    }

    let negative = trimmed.starts_with('-');
    let unsigned = trimmed.trim_start_matches(['+', '-']);

    let fields: Vec<&str> = unsigned
        .split(|c: char| c == ':' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .collect();

    let magnitude = match fields.as_slice() {
        [d] => parse_f64(d)?,
        [d, m] => {
            let d = parse_f64(d)?;
            let m = parse_f64(m)?;
            d + m / 60.0
        }
        [d, m, s] => {
            let d = parse_f64(d)?;
            let m = parse_f64(m)?;
            let s = parse_f64(s)?;
            d + m / 60.0 + s / 3600.0
        }
        _ => {
            return Err(Error::BadFormat(format!(
                "malformed sexagesimal value: {:?}",
                input
            )))
        }
    };

    Ok(if negative { -magnitude } else { magnitude })
}

fn parse_f64(field: &str) -> Result<f64, Error> {
    field
        .parse::<f64>()
        .map_err(|_| Error::BadFormat(format!("malformed numeric field: {:?}", field)))
}

/// Formats `value` as `D:M:S.s`, truncating the integral degrees and
/// minutes the way `fs_sexa` does, with `fraction_digits` digits after
/// the decimal point of the seconds field.
pub fn format(value: f64, fraction_digits: usize) -> String {
    let negative = value < 0.0;
    let magnitude = value.abs();

    let degrees = magnitude.trunc() as i64;
    let remainder_minutes = (magnitude - degrees as f64) * 60.0;
    let minutes = remainder_minutes.trunc() as i64;
    let seconds = (remainder_minutes - minutes as f64) * 60.0;

    let sign = if negative { "-" } else { "" };
    format!(
        "{}{}:{:02}:{:0width$.prec$}",
        sign,
        degrees,
        minutes,
        seconds,
        width = if fraction_digits == 0 { 2 } else { 3 + fraction_digits },
        prec = fraction_digits
    )
}
