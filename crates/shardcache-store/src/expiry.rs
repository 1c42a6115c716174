use std::fmt;

use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// Calendar unit of an expiry period.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpiryUnit {
    #[default]
    Day,
    Week,
    Month,
    Year,
}

impl fmt::Display for ExpiryUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Day => write!(f, "day"),
            Self::Week => write!(f, "week"),
            Self::Month => write!(f, "month"),
            Self::Year => write!(f, "year"),
        }
    }
}

/// Age after which entries are swept by
/// [`ShardStore::invalidate_expired`](crate::ShardStore::invalidate_expired).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiryPolicy {
    /// Number of units an entry may live.
    pub periods: u32,
    /// The unit `periods` counts.
    #[serde(default)]
    pub unit: ExpiryUnit,
}

impl ExpiryPolicy {
    /// Create a policy.
    pub fn new(periods: u32, unit: ExpiryUnit) -> Self {
        Self { periods, unit }
    }

    /// Expire after `periods` days.
    pub fn days(periods: u32) -> Self {
        Self::new(periods, ExpiryUnit::Day)
    }

    /// First date that is *not* expired as of `as_of`.
    ///
    /// Entries dated strictly before the cutoff are expired. Month and year
    /// arithmetic clamps to the end of shorter months.
    pub fn cutoff(&self, as_of: NaiveDate) -> NaiveDate {
        let n = self.periods;
        let cutoff = match self.unit {
            ExpiryUnit::Day => as_of.checked_sub_days(Days::new(u64::from(n))),
            ExpiryUnit::Week => as_of.checked_sub_days(Days::new(u64::from(n) * 7)),
            ExpiryUnit::Month => as_of.checked_sub_months(Months::new(n)),
            ExpiryUnit::Year => as_of.checked_sub_months(Months::new(n.saturating_mul(12))),
        };
        cutoff.unwrap_or(NaiveDate::MIN)
    }

    /// Returns `true` if an entry stored on `date` is expired as of `as_of`.
    pub fn is_expired(&self, date: NaiveDate, as_of: NaiveDate) -> bool {
        date < self.cutoff(as_of)
    }
}

impl fmt::Display for ExpiryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.periods, self.unit)?;
        if self.periods != 1 {
            f.write_str("s")?;
        }
        Ok(())
    }
}
