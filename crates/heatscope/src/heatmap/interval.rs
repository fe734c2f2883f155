use chrono::TimeDelta;

/// Bucket widths offered by the interval ladder
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Granularity {
    Minute,
    TenMinutes,
    Hour,
    Day,
    Week,
}

/// Ladder of (max window duration in seconds, bucket width).
/// The last bracket is open-ended.
const LADDER: &[(i64, Granularity)] = &[
    (2 * 3600, Granularity::Minute),      // <= 2h  - 1m buckets
    (24 * 3600, Granularity::TenMinutes), // <= 24h - 10m buckets
    (7 * 86400, Granularity::Hour),       // <= 7d  - 1h buckets
    (30 * 86400, Granularity::Day),       // <= 30d - 1d buckets
];

impl Granularity {
    pub fn seconds(self) -> i64 {
        match self {
            Granularity::Minute => 60,
            Granularity::TenMinutes => 600,
            Granularity::Hour => 3600,
            Granularity::Day => 86400,
            Granularity::Week => 7 * 86400,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Granularity::Minute => "1m",
            Granularity::TenMinutes => "10m",
            Granularity::Hour => "1h",
            Granularity::Day => "1d",
            Granularity::Week => "1w",
        }
    }
}

/// Bucket width chosen for one fetch cycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IntervalSpec {
    pub granularity: Granularity,
    pub width: TimeDelta,
    pub bucket_seconds: i64,
}

impl IntervalSpec {
    pub fn new(granularity: Granularity) -> Self {
        let bucket_seconds = granularity.seconds();
        IntervalSpec {
            granularity,
            width: TimeDelta::seconds(bucket_seconds),
            bucket_seconds,
        }
    }

    /// Pick the bucket width for a `[from, to)` window of the given length.
    /// Negative durations fall into the first bracket.
    pub fn for_duration(duration: TimeDelta) -> Self {
        let secs = duration.num_seconds();
        let granularity = LADDER
            .iter()
            .find(|(max_secs, _)| secs <= *max_secs)
            .map(|(_, g)| *g)
            .unwrap_or(Granularity::Week);
        IntervalSpec::new(granularity)
    }

    /// How many bucket widths a time-header selection spans
    pub fn header_window_multiplier(&self) -> i32 {
        match self.granularity {
            Granularity::Minute => 5,
            Granularity::TenMinutes => 3,
            Granularity::Hour => 2,
            Granularity::Day | Granularity::Week => 1,
        }
    }

    /// strftime pattern for axis labels at this granularity
    pub fn label_format(&self) -> &'static str {
        match self.granularity {
            Granularity::Minute | Granularity::TenMinutes => "%H:%M",
            Granularity::Hour => "%d %H:%M",
            Granularity::Day | Granularity::Week => "%m-%d",
        }
    }

    pub fn label(&self) -> &'static str {
        self.granularity.label()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ladder_bracket_edges() {
        let cases = [
            (TimeDelta::minutes(30), Granularity::Minute),
            (TimeDelta::hours(2), Granularity::Minute),
            (TimeDelta::hours(2) + TimeDelta::seconds(1), Granularity::TenMinutes),
            (TimeDelta::hours(24), Granularity::TenMinutes),
            (TimeDelta::days(3), Granularity::Hour),
            (TimeDelta::days(7), Granularity::Hour),
            (TimeDelta::days(8), Granularity::Day),
            (TimeDelta::days(30), Granularity::Day),
            (TimeDelta::days(31), Granularity::Week),
            (TimeDelta::days(365), Granularity::Week),
        ];
        for (duration, expected) in cases {
            assert_eq!(
                IntervalSpec::for_duration(duration).granularity,
                expected,
                "duration {duration}"
            );
        }
    }

    #[test]
    fn test_width_matches_bucket_seconds() {
        let spec = IntervalSpec::for_duration(TimeDelta::hours(12));
        assert_eq!(spec.bucket_seconds, 600);
        assert_eq!(spec.width, TimeDelta::minutes(10));
        assert_eq!(spec.label(), "10m");
    }

    #[test]
    fn test_zero_and_negative_durations_use_finest_bucket() {
        assert_eq!(
            IntervalSpec::for_duration(TimeDelta::zero()).granularity,
            Granularity::Minute
        );
        assert_eq!(
            IntervalSpec::for_duration(TimeDelta::seconds(-5)).granularity,
            Granularity::Minute
        );
    }

    #[test]
    fn test_header_multiplier_shrinks_with_granularity() {
        assert_eq!(IntervalSpec::new(Granularity::Minute).header_window_multiplier(), 5);
        assert_eq!(IntervalSpec::new(Granularity::TenMinutes).header_window_multiplier(), 3);
        assert_eq!(IntervalSpec::new(Granularity::Hour).header_window_multiplier(), 2);
        assert_eq!(IntervalSpec::new(Granularity::Week).header_window_multiplier(), 1);
    }
}
