use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::error::{AppError, AppResult};

/// A billing period: one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

impl Period {
    pub fn new(year: i32, month: i32) -> AppResult<Self> {
        if !(1..=12).contains(&month) {
            return Err(AppError::Validation(format!(
                "month must be between 1 and 12, got {}",
                month
            )));
        }
        Ok(Self {
            year,
            month: month as u32,
        })
    }

    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn previous(&self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn month_i32(&self) -> i32 {
        self.month as i32
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.month, self.year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn previous_wraps_year() {
        let january = Period::new(2024, 1).unwrap();
        assert_eq!(january.previous(), Period { year: 2023, month: 12 });

        let june = Period::new(2024, 6).unwrap();
        assert_eq!(june.previous(), Period { year: 2024, month: 5 });
    }

    #[test]
    fn rejects_out_of_range_month() {
        assert!(Period::new(2024, 0).is_err());
        assert!(Period::new(2024, 13).is_err());
    }

    #[test]
    fn first_day_and_display() {
        let period = Period::containing(NaiveDate::from_ymd_opt(2024, 3, 17).unwrap());
        assert_eq!(period.first_day(), NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(period.to_string(), "3/2024");
    }
}
