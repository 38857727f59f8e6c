use chrono::Duration;
use std::fmt;

/// Bin width of a count series
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frequency {
    /// Every second
    Secondly,
    /// Every minute
    Minutely,
    /// Every hour
    Hourly,
    /// Every day
    Daily,
    /// Every week. Bins are epoch aligned, so they start on Thursday
    /// 00:00 UTC.
    Weekly,
    /// Every month
    Monthly,
    /// Every quarter
    Quarterly,
    /// Every year
    Yearly,
    /// Custom fixed width
    Custom(Duration),
}

impl Frequency {
    /// Parse a frequency string such as `H`, `day`, `15T` or `2H`
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "S" | "SEC" | "SECOND" | "SECONDS" => Some(Frequency::Secondly),
            "T" | "MIN" | "MINUTE" | "MINUTES" => Some(Frequency::Minutely),
            "H" | "HOUR" | "HOURS" | "HOURLY" => Some(Frequency::Hourly),
            "D" | "DAY" | "DAYS" | "DAILY" => Some(Frequency::Daily),
            "W" | "WEEK" | "WEEKS" | "WEEKLY" => Some(Frequency::Weekly),
            "M" | "MONTH" | "MONTHS" | "MONTHLY" => Some(Frequency::Monthly),
            "Q" | "QUARTER" | "QUARTERS" | "QUARTERLY" => Some(Frequency::Quarterly),
            "Y" | "YEAR" | "YEARS" | "A" | "ANNUAL" | "ANNUALLY" | "YEARLY" => {
                Some(Frequency::Yearly)
            }
            _ => parse_custom_frequency(s.trim()),
        }
    }

    /// Approximate length in seconds; months and years are estimates
    pub fn to_seconds(&self) -> i64 {
        match self {
            Frequency::Secondly => 1,
            Frequency::Minutely => 60,
            Frequency::Hourly => 3600,
            Frequency::Daily => 86400,
            Frequency::Weekly => 604800,
            Frequency::Monthly => 2592000,   // 30 days
            Frequency::Quarterly => 7776000, // 90 days
            Frequency::Yearly => 31536000,   // 365 days
            Frequency::Custom(duration) => duration.num_seconds(),
        }
    }

    /// Approximate step as a `Duration`
    pub fn to_duration(&self) -> Duration {
        Duration::seconds(self.to_seconds())
    }

    /// Exact bin width, or `None` for calendar-based frequencies
    pub fn fixed_width(&self) -> Option<Duration> {
        match self {
            Frequency::Monthly | Frequency::Quarterly | Frequency::Yearly => None,
            Frequency::Custom(duration) if duration.num_seconds() <= 0 => None,
            other => Some(other.to_duration()),
        }
    }
}

impl Default for Frequency {
    fn default() -> Self {
        Frequency::Hourly
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frequency::Secondly => write!(f, "S"),
            Frequency::Minutely => write!(f, "T"),
            Frequency::Hourly => write!(f, "H"),
            Frequency::Daily => write!(f, "D"),
            Frequency::Weekly => write!(f, "W"),
            Frequency::Monthly => write!(f, "M"),
            Frequency::Quarterly => write!(f, "Q"),
            Frequency::Yearly => write!(f, "Y"),
            Frequency::Custom(duration) => write!(f, "{}s", duration.num_seconds()),
        }
    }
}

/// Parse multiples such as "15T" or "2H"
fn parse_custom_frequency(s: &str) -> Option<Frequency> {
    let split = s.find(|c: char| !c.is_ascii_digit())?;
    if split == 0 {
        return None;
    }

    let (num_chars, unit_chars) = s.split_at(split);
    let num: i64 = num_chars.parse().ok()?;
    if num <= 0 {
        return None;
    }

    // Multipliers beyond the representable range yield None
    let width = match unit_chars.to_uppercase().as_str() {
        "S" | "SEC" | "SECOND" | "SECONDS" => Duration::try_seconds(num)?,
        "T" | "MIN" | "MINUTE" | "MINUTES" => Duration::try_minutes(num)?,
        "H" | "HOUR" | "HOURS" => Duration::try_hours(num)?,
        "D" | "DAY" | "DAYS" => Duration::try_days(num)?,
        "W" | "WEEK" | "WEEKS" => Duration::try_weeks(num)?,
        _ => return None,
    };
    Some(Frequency::Custom(width))
}
