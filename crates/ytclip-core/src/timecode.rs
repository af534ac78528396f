//! Clip offset parsing and validation

use crate::error::ValidationError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// One clip offset, given either as `HH:MM:SS` (hours 0-23, minutes and
/// seconds 0-59) or as a bare number of seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ClipTime {
    secs: u32,
}

impl ClipTime {
    pub fn from_secs(secs: u32) -> Self {
        Self { secs }
    }

    pub fn total_seconds(&self) -> u32 {
        self.secs
    }
}

impl FromStr for ClipTime {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ValidationError::BadTimecode(s.to_string()));
        }

        // Bare seconds form
        if s.bytes().all(|b| b.is_ascii_digit()) {
            let secs = s
                .parse::<u32>()
                .map_err(|_| ValidationError::BadTimecode(s.to_string()))?;
            return Ok(Self { secs });
        }

        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 3 {
            return Err(ValidationError::BadTimecode(s.to_string()));
        }

        let field = |part: &str, width: std::ops::RangeInclusive<usize>, max: u32| {
            if !width.contains(&part.len()) || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(ValidationError::BadTimecode(s.to_string()));
            }
            let value = part
                .parse::<u32>()
                .map_err(|_| ValidationError::BadTimecode(s.to_string()))?;
            if value > max {
                return Err(ValidationError::BadTimecode(s.to_string()));
            }
            Ok(value)
        };

        let hours = field(parts[0], 1..=2, 23)?;
        let minutes = field(parts[1], 2..=2, 59)?;
        let seconds = field(parts[2], 2..=2, 59)?;

        Ok(Self {
            secs: hours * 3600 + minutes * 60 + seconds,
        })
    }
}

impl fmt::Display for ClipTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hours = self.secs / 3600;
        let minutes = (self.secs % 3600) / 60;
        let seconds = self.secs % 60;
        write!(f, "{:02}:{:02}:{:02}", hours, minutes, seconds)
    }
}

impl Serialize for ClipTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClipTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A start/end pair restricting extraction to a sub-range of the source.
///
/// An inverted or zero-length range is accepted here and handed to the
/// tool unchanged; the tool's own failure is reported instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipBounds {
    pub start: ClipTime,
    pub end: ClipTime,
}

impl ClipBounds {
    /// Interpret optional start/end strings from a request. Empty or
    /// whitespace-only values count as absent. Both offsets must be given
    /// together; exactly one is rejected.
    pub fn from_options(
        start: Option<&str>,
        end: Option<&str>,
    ) -> Result<Option<Self>, ValidationError> {
        let start = start.map(str::trim).filter(|s| !s.is_empty());
        let end = end.map(str::trim).filter(|s| !s.is_empty());

        match (start, end) {
            (None, None) => Ok(None),
            (Some(start), Some(end)) => Ok(Some(Self {
                start: start.parse()?,
                end: end.parse()?,
            })),
            _ => Err(ValidationError::UnpairedBounds),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timecode() {
        assert_eq!("00:10:00".parse::<ClipTime>().unwrap().total_seconds(), 600);
        assert_eq!("9:05:09".parse::<ClipTime>().unwrap().total_seconds(), 32709);
        assert_eq!("23:59:59".parse::<ClipTime>().unwrap().total_seconds(), 86399);
        assert_eq!("90".parse::<ClipTime>().unwrap().total_seconds(), 90);
    }

    #[test]
    fn test_reject_bad_timecodes() {
        assert!("25:00:00".parse::<ClipTime>().is_err());
        assert!("00:60:00".parse::<ClipTime>().is_err());
        assert!("00:00:60".parse::<ClipTime>().is_err());
        assert!("0:5:00".parse::<ClipTime>().is_err());
        assert!("10:00".parse::<ClipTime>().is_err());
        assert!("-5".parse::<ClipTime>().is_err());
        assert!("abc".parse::<ClipTime>().is_err());
        assert!("".parse::<ClipTime>().is_err());
    }

    #[test]
    fn test_display_is_canonical() {
        assert_eq!("00:10:00".parse::<ClipTime>().unwrap().to_string(), "00:10:00");
        assert_eq!("9:05:09".parse::<ClipTime>().unwrap().to_string(), "09:05:09");
        assert_eq!("90".parse::<ClipTime>().unwrap().to_string(), "00:01:30");
    }

    #[test]
    fn test_bounds_both_or_neither() {
        assert_eq!(ClipBounds::from_options(None, None).unwrap(), None);
        assert_eq!(ClipBounds::from_options(Some(""), Some("  ")).unwrap(), None);

        let bounds = ClipBounds::from_options(Some("00:10:00"), Some("00:10:05"))
            .unwrap()
            .unwrap();
        assert_eq!(bounds.start.total_seconds(), 600);
        assert_eq!(bounds.end.total_seconds(), 605);

        assert!(matches!(
            ClipBounds::from_options(Some("00:10:00"), None),
            Err(ValidationError::UnpairedBounds)
        ));
        assert!(matches!(
            ClipBounds::from_options(None, Some("00:10:05")),
            Err(ValidationError::UnpairedBounds)
        ));
    }

    #[test]
    fn test_inverted_range_is_accepted() {
        let bounds = ClipBounds::from_options(Some("00:10:05"), Some("00:10:00"))
            .unwrap()
            .unwrap();
        assert!(bounds.end < bounds.start);
    }
}
