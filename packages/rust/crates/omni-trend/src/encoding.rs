//! Canonical score encoding for store round-trips.
//!
//! Scores travel through Valkey as strings. Writing them in one canonical
//! decimal form (no exponent, shortest round-trip digits) keeps re-reads stable.

use chrono::{DateTime, TimeDelta, Utc};

use crate::error::{TrendError, TrendResult};

/// Format a score in canonical decimal form.
///
/// Infinities use the Valkey spelling (`inf` / `-inf`). NaN is rejected.
pub fn format_float(value: f64) -> TrendResult<String> {
    if value.is_nan() {
        return Err(TrendError::Validation(
            "NaN cannot be stored as a score".to_string(),
        ));
    }
    if value.is_infinite() {
        return Ok(if value > 0.0 { "inf" } else { "-inf" }.to_string());
    }
    // f64 Display never switches to exponent notation.
    Ok(format!("{value}"))
}

/// Parse a score previously written by [`format_float`] or returned by Valkey.
pub fn parse_float(raw: &str) -> TrendResult<f64> {
    let trimmed = raw.trim();
    match trimmed {
        "inf" | "+inf" => return Ok(f64::INFINITY),
        "-inf" => return Ok(f64::NEG_INFINITY),
        _ => {}
    }
    let value = trimmed
        .parse::<f64>()
        .map_err(|err| TrendError::Decode(format!("unparsable score '{trimmed}': {err}")))?;
    if value.is_nan() {
        return Err(TrendError::Decode(format!("score '{trimmed}' is NaN")));
    }
    Ok(value)
}

/// Decode a flat `member, score, member, score, ...` reply into ordered pairs.
pub fn float_pairs(values: Vec<String>) -> TrendResult<Vec<(String, f64)>> {
    if values.len() % 2 != 0 {
        return Err(TrendError::Decode(format!(
            "expected an even number of member/score values, got {}",
            values.len()
        )));
    }
    let mut pairs = Vec::with_capacity(values.len() / 2);
    let mut iter = values.into_iter();
    while let (Some(member), Some(score)) = (iter.next(), iter.next()) {
        let score = parse_float(&score)?;
        pairs.push((member, score));
    }
    Ok(pairs)
}

/// Epoch seconds with microsecond precision.
#[must_use]
pub fn epoch_seconds(datetime: DateTime<Utc>) -> f64 {
    datetime.timestamp() as f64 + f64::from(datetime.timestamp_subsec_micros()) / 1_000_000.0
}

/// Inverse of [`epoch_seconds`].
pub fn from_epoch_seconds(seconds: f64) -> TrendResult<DateTime<Utc>> {
    let micros = (seconds * 1_000_000.0).round();
    if !micros.is_finite() {
        return Err(TrendError::Decode(format!(
            "epoch seconds '{seconds}' out of range"
        )));
    }
    DateTime::<Utc>::from_timestamp_micros(micros as i64)
        .ok_or_else(|| TrendError::Decode(format!("epoch seconds '{seconds}' out of range")))
}

/// Length of a positive duration in fractional seconds.
pub fn duration_seconds(duration: TimeDelta) -> TrendResult<f64> {
    duration
        .to_std()
        .map(|value| value.as_secs_f64())
        .map_err(|_| TrendError::Validation(format!("duration {duration} is negative")))
}

/// Inverse of [`duration_seconds`].
pub fn duration_from_seconds(seconds: f64) -> TrendResult<TimeDelta> {
    let std_duration = std::time::Duration::try_from_secs_f64(seconds)
        .map_err(|err| TrendError::Decode(format!("invalid duration '{seconds}': {err}")))?;
    TimeDelta::from_std(std_duration)
        .map_err(|err| TrendError::Decode(format!("duration '{seconds}' out of range: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_float_never_uses_exponent() -> TrendResult<()> {
        assert_eq!(format_float(1.0)?, "1");
        assert_eq!(format_float(0.25)?, "0.25");
        assert_eq!(format_float(0.000_000_1)?, "0.0000001");
        assert_eq!(format_float(1e21)?, "1000000000000000000000");
        assert_eq!(format_float(f64::NEG_INFINITY)?, "-inf");
        assert!(format_float(f64::NAN).is_err());
        Ok(())
    }

    #[test]
    fn parse_float_accepts_valkey_infinities() -> TrendResult<()> {
        assert_eq!(parse_float("+inf")?, f64::INFINITY);
        assert_eq!(parse_float("-inf")?, f64::NEG_INFINITY);
        assert_eq!(parse_float(" 2.5 ")?, 2.5);
        assert!(matches!(parse_float("abc"), Err(TrendError::Decode(_))));
        assert!(matches!(parse_float("nan"), Err(TrendError::Decode(_))));
        Ok(())
    }

    #[test]
    fn float_pairs_rejects_odd_length() {
        let values = vec!["a".to_string(), "1".to_string(), "b".to_string()];
        assert!(matches!(float_pairs(values), Err(TrendError::Decode(_))));
    }

    #[test]
    fn float_pairs_keeps_reply_order() -> TrendResult<()> {
        let values = ["b", "3", "a", "1.5"].map(str::to_string).to_vec();
        let pairs = float_pairs(values)?;
        assert_eq!(pairs, vec![("b".to_string(), 3.0), ("a".to_string(), 1.5)]);
        Ok(())
    }

    #[test]
    fn epoch_seconds_keeps_microseconds() -> TrendResult<()> {
        let original = DateTime::<Utc>::from_timestamp_micros(1_760_000_000_123_456)
            .ok_or_else(|| TrendError::Decode("bad fixture".to_string()))?;
        let encoded = format_float(epoch_seconds(original))?;
        let decoded = from_epoch_seconds(parse_float(&encoded)?)?;
        assert_eq!(decoded, original);
        Ok(())
    }

    #[test]
    fn duration_seconds_rejects_negative() {
        assert!(duration_seconds(TimeDelta::seconds(-5)).is_err());
    }
}
