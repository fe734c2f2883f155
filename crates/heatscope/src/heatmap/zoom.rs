use crate::error::{Error, Result};
use chrono::{DateTime, TimeDelta, Utc};

const ZOOM_IN_FACTOR: f64 = 0.5;
const ZOOM_OUT_FACTOR: f64 = 2.0;

/// Current time window plus the session's initial bounds.
///
/// Operations return a new state; `initial_*` never changes and
/// `initial_from <= current_from <= current_to <= initial_to` always holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ZoomState {
    current_from: DateTime<Utc>,
    current_to: DateTime<Utc>,
    initial_from: DateTime<Utc>,
    initial_to: DateTime<Utc>,
}

impl ZoomState {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self> {
        if from >= to {
            return Err(Error::InvalidTimeRange {
                from: from.to_rfc3339(),
                to: to.to_rfc3339(),
            });
        }
        Ok(ZoomState {
            current_from: from,
            current_to: to,
            initial_from: from,
            initial_to: to,
        })
    }

    pub fn current(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        (self.current_from, self.current_to)
    }

    pub fn initial(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        (self.initial_from, self.initial_to)
    }

    pub fn duration(&self) -> TimeDelta {
        self.current_to - self.current_from
    }

    pub fn is_zoomed(&self) -> bool {
        self.current() != self.initial()
    }

    /// Narrow to the bucket `[bucket_start, bucket_start + width)`, halved
    /// around its center
    pub fn zoomed_in(&self, bucket_start: DateTime<Utc>, width: TimeDelta) -> Self {
        let (from, to) = scale_range(bucket_start, bucket_start + width, ZOOM_IN_FACTOR);
        self.clamped(from, to)
    }

    /// Double the current window around its center
    pub fn zoomed_out(&self) -> Self {
        let (from, to) = scale_range(self.current_from, self.current_to, ZOOM_OUT_FACTOR);
        self.clamped(from, to)
    }

    pub fn reset(&self) -> Self {
        ZoomState {
            current_from: self.initial_from,
            current_to: self.initial_to,
            ..*self
        }
    }

    /// Apply the initial bounds; a window that falls outside them entirely
    /// leaves the state unchanged
    fn clamped(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        let from = from.max(self.initial_from);
        let to = to.min(self.initial_to);
        if from >= to {
            return *self;
        }
        ZoomState {
            current_from: from,
            current_to: to,
            ..*self
        }
    }
}

/// Scale `[from, to)` by `factor` around its center, at millisecond precision
pub fn scale_range(
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    factor: f64,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let width_ms = (to - from).num_milliseconds();
    let center = from + TimeDelta::milliseconds(width_ms / 2);
    let half_ms = ((width_ms as f64 * factor) / 2.0).round() as i64;
    let half = TimeDelta::milliseconds(half_ms);
    (center - half, center + half)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn day() -> ZoomState {
        ZoomState::new(ts(0), ts(86_400)).unwrap()
    }

    #[test]
    fn test_rejects_empty_window() {
        assert!(ZoomState::new(ts(10), ts(10)).is_err());
        assert!(ZoomState::new(ts(20), ts(10)).is_err());
    }

    #[test]
    fn test_zoom_in_halves_bucket_around_center() {
        let z = day().zoomed_in(ts(3600), TimeDelta::minutes(10));
        assert_eq!(z.current(), (ts(3600 + 150), ts(3600 + 450)));
        assert_eq!(z.initial(), (ts(0), ts(86_400)));
        assert!(z.is_zoomed());
    }

    #[test]
    fn test_zoom_in_then_out_restores_bucket_width() {
        let width = TimeDelta::minutes(10);
        let z = day().zoomed_in(ts(7200), width).zoomed_out();
        assert_eq!(z.duration(), width / 2 * 2);
        let (from, to) = z.current();
        assert_eq!(from + (to - from) / 2, ts(7200 + 300));
    }

    #[test]
    fn test_zoom_out_never_exceeds_initial_bounds() {
        let mut z = day().zoomed_in(ts(600), TimeDelta::hours(1));
        for _ in 0..20 {
            z = z.zoomed_out();
            let (from, to) = z.current();
            assert!(from >= ts(0));
            assert!(to <= ts(86_400));
            assert!(from <= to);
        }
        assert_eq!(z.current(), z.initial());
    }

    #[test]
    fn test_zoom_out_near_edge_clamps_one_side() {
        let z = day().zoomed_in(ts(0), TimeDelta::hours(2)).zoomed_out();
        // [0, 2h) halved -> [30m, 90m), doubled -> [0, 2h)
        assert_eq!(z.current(), (ts(0), ts(7200)));
        let z = z.zoomed_out();
        assert_eq!(z.current(), (ts(0), ts(3600 * 3)));
    }

    #[test]
    fn test_reset_restores_initial() {
        let z = day().zoomed_in(ts(3600), TimeDelta::hours(1)).reset();
        assert_eq!(z.current(), z.initial());
        assert!(!z.is_zoomed());
    }

    #[test]
    fn test_zoom_in_outside_bounds_is_ignored() {
        let z = day();
        assert_eq!(z.zoomed_in(ts(200_000), TimeDelta::hours(1)), z);
    }

    #[test]
    fn test_scale_range_keeps_center() {
        let (from, to) = scale_range(ts(100), ts(200), 3.0);
        assert_eq!((from, to), (ts(0), ts(300)));
    }
}
