
use lazy_static::lazy_static;
use regex::Regex;

use std::pin::Pin;
use std::future::Future;

use crate::utility::error::{EngineError, Result};


pub type BoxedFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

lazy_static! {
    static ref DURATION_REGEX: Regex = Regex::new(r"^(\d+)([smhd])$").unwrap();
}

/// Parses durations of the form `30s`, `10m`, `2h`, `3d` into seconds.
pub fn parse_duration(duration: &str) -> Result<i64> {
    let trimmed = duration.trim().to_lowercase();
    let captures = DURATION_REGEX.captures(&trimmed)
        .ok_or(EngineError::configuration(
            format!("'{}' is not a duration (use 30s, 10m, 2h or 3d)", duration)))?;
    let value = captures[1].parse::<i64>()
        .map_err(|_| EngineError::configuration(
            format!("duration value in '{}' is out of range", duration)))?;
    let scale = match &captures[2] {
        "s" => 1,
        "m" => 60,
        "h" => 3600,
        _   => 86400,
    };
    Ok(value * scale)
}

/// Ratio of uppercase alphabetic characters to all alphabetic characters.
/// Messages without alphabetic content score 0.
pub fn caps_ratio(text: &str) -> f64 {
    let alphabetic = text.chars().filter(|c| c.is_alphabetic()).count();
    if alphabetic == 0 {
        return 0.0;
    }
    let uppercase = text.chars().filter(|c| c.is_uppercase()).count();
    uppercase as f64 / alphabetic as f64
}


#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn parses_all_duration_units() {
        assert_eq!(parse_duration("30s").unwrap(), 30);
        assert_eq!(parse_duration("10m").unwrap(), 600);
        assert_eq!(parse_duration("2h").unwrap(), 7200);
        assert_eq!(parse_duration("3d").unwrap(), 259200);
        assert_eq!(parse_duration(" 5M ").unwrap(), 300);
    }

    #[test]
    fn rejects_malformed_durations() {
        for input in ["", "10", "m", "10 m", "1.5h", "10w", "h10"] {
            let parsed = parse_duration(input);
            assert!(matches!(parsed, Err(EngineError::Configuration(_))), "accepted '{}'", input);
        }
    }

    #[test]
    fn caps_ratio_ignores_non_alphabetic() {
        assert_eq!(caps_ratio("HELLO"), 1.0);
        assert_eq!(caps_ratio("hello"), 0.0);
        assert_eq!(caps_ratio("1234 !!"), 0.0);
        assert!((caps_ratio("AAbb") - 0.5).abs() < 1e-9);
        assert!((caps_ratio("A1b2C3d4") - 0.5).abs() < 1e-9);
    }
}
