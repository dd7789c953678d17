//! Employees and their shift windows.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Half of a 12-hour clock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Meridiem {
    /// Before noon.
    #[default]
    Am,
    /// After noon.
    Pm,
}

impl Meridiem {
    /// Converts a 12-hour clock hour (1-12) to a 24-hour hour (0-23).
    pub fn to_24h(self, hour: u8) -> u8 {
        match (self, hour % 12) {
            (Self::Am, h) => h,
            (Self::Pm, h) => h + 12,
        }
    }
}

impl fmt::Display for Meridiem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Am => "AM",
            Self::Pm => "PM",
        })
    }
}

impl FromStr for Meridiem {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AM" => Ok(Self::Am),
            "PM" => Ok(Self::Pm),
            other => Err(CoreError::InvalidData(format!("expected AM or PM, got {other:?}"))),
        }
    }
}

/// A team member whose shift window is used to bucket records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    /// Store-assigned id.
    #[serde(default)]
    pub id: u64,
    /// Display name.
    pub name: String,
    /// Display color, e.g. `#3b82f6`.
    #[serde(default)]
    pub color: String,
    /// Shift start hour (1-12).
    pub start_hour: u8,
    /// Shift start meridiem.
    pub start_am_pm: Meridiem,
    /// Shift end hour (1-12).
    pub end_hour: u8,
    /// Shift end meridiem.
    pub end_am_pm: Meridiem,
}

impl Employee {
    /// Checks that both hours are on a 12-hour clock and the name is set.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.name.trim().is_empty() {
            return Err(CoreError::InvalidData("employee name is empty".into()));
        }
        for hour in [self.start_hour, self.end_hour] {
            if !(1..=12).contains(&hour) {
                return Err(CoreError::InvalidData(format!(
                    "shift hour must be between 1 and 12, got {hour}"
                )));
            }
        }
        Ok(())
    }

    /// Shift start as a 24-hour hour.
    pub fn start_24h(&self) -> u8 {
        self.start_am_pm.to_24h(self.start_hour)
    }

    /// Shift end as a 24-hour hour (exclusive).
    pub fn end_24h(&self) -> u8 {
        self.end_am_pm.to_24h(self.end_hour)
    }

    /// Returns true if the 24-hour `hour` falls inside the shift.
    ///
    /// The window is `[start, end)`. Windows whose end is before their start
    /// wrap past midnight; equal start and end means the whole day.
    pub fn covers_hour(&self, hour: u8) -> bool {
        let (start, end) = (self.start_24h(), self.end_24h());
        if start == end {
            return true;
        }
        if start < end {
            (start..end).contains(&hour)
        } else {
            hour >= start || hour < end
        }
    }

    /// Human-readable window, e.g. `10 PM - 6 AM`.
    pub fn window_label(&self) -> String {
        format!(
            "{} {} - {} {}",
            self.start_hour, self.start_am_pm, self.end_hour, self.end_am_pm
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn employee(start: (u8, Meridiem), end: (u8, Meridiem)) -> Employee {
        Employee {
            id: 1,
            name: "Dana".into(),
            color: "#22c55e".into(),
            start_hour: start.0,
            start_am_pm: start.1,
            end_hour: end.0,
            end_am_pm: end.1,
        }
    }

    #[test]
    fn test_to_24h() {
        assert_eq!(Meridiem::Am.to_24h(12), 0);
        assert_eq!(Meridiem::Am.to_24h(9), 9);
        assert_eq!(Meridiem::Pm.to_24h(12), 12);
        assert_eq!(Meridiem::Pm.to_24h(10), 22);
    }

    #[test]
    fn test_day_shift() {
        let e = employee((9, Meridiem::Am), (5, Meridiem::Pm));
        assert!(e.covers_hour(9));
        assert!(e.covers_hour(16));
        assert!(!e.covers_hour(17));
        assert!(!e.covers_hour(3));
    }

    #[test]
    fn test_night_shift_wraps_midnight() {
        let e = employee((10, Meridiem::Pm), (6, Meridiem::Am));
        assert!(e.covers_hour(22));
        assert!(e.covers_hour(0));
        assert!(e.covers_hour(5));
        assert!(!e.covers_hour(6));
        assert!(!e.covers_hour(12));
        assert_eq!(e.window_label(), "10 PM - 6 AM");
    }

    #[test]
    fn test_validate() {
        assert!(employee((9, Meridiem::Am), (5, Meridiem::Pm)).validate().is_ok());
        assert!(employee((0, Meridiem::Am), (5, Meridiem::Pm)).validate().is_err());
        assert!(employee((9, Meridiem::Am), (13, Meridiem::Pm)).validate().is_err());
    }

    #[test]
    fn test_meridiem_serde_and_parse() {
        assert_eq!(serde_json::to_string(&Meridiem::Pm).unwrap(), "\"PM\"");
        assert_eq!("am".parse::<Meridiem>().unwrap(), Meridiem::Am);
        assert!("noon".parse::<Meridiem>().is_err());
    }
}
