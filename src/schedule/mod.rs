//! Time-windowed fleet scaling schedule.
//!
//! A [`FleetSchedule`] is a table of (time-of-day, desired-capacity)
//! entries evaluated by independent wall-clock triggers in a fixed named
//! timezone. There is no interpolation, hysteresis, or demand feedback: at
//! any instant the most recently fired entry determines capacity until the
//! next trigger supersedes it, wrapping at midnight. Scheduled scaling and
//! load-reactive scaling are never mixed.

use chrono::NaiveTime;
use thiserror::Error;


/// One scaling rule: at `time` (in the schedule's timezone), set the
/// fleet's desired capacity.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ScheduleEntry {
    /// Wall-clock trigger time.
    pub time: NaiveTime,
    /// Desired capacity once the trigger fires.
    pub desired_capacity: u32,
}

impl ScheduleEntry {
    /// Creates an entry from an (hour, minute) pair.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::InvalidTime`] when the pair is not a valid
    /// time of day.
    pub fn at(hour: u32, minute: u32, desired_capacity: u32) -> Result<Self, ScheduleError> {
        let time = NaiveTime::from_hms_opt(hour, minute, 0)
            .ok_or(ScheduleError::InvalidTime { hour, minute })?;
        Ok(Self {
            time,
            desired_capacity,
        })
    }
}

/// An ordered, duplicate-free scaling schedule bound to a named timezone.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FleetSchedule {
    timezone: String,
    entries: Vec<ScheduleEntry>,
}

impl FleetSchedule {
    /// Builds a schedule, sorting entries by time of day.
    ///
    /// Duplicate time keys are a configuration error and are rejected here,
    /// at build time, rather than letting a later trigger silently
    /// supersede an earlier one registered for the same instant.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError`] when the timezone is blank, the table is
    /// empty, or two entries share a time key.
    pub fn new(
        timezone: impl Into<String>,
        entries: Vec<ScheduleEntry>,
    ) -> Result<Self, ScheduleError> {
        let zone = timezone.into().trim().to_owned();
        if zone.is_empty() {
            return Err(ScheduleError::EmptyTimezone);
        }
        if entries.is_empty() {
            return Err(ScheduleError::EmptyTable);
        }

        let mut sorted = entries;
        sorted.sort_by_key(|entry| entry.time);
        for pair in sorted.windows(2) {
            if let [earlier, later] = pair
                && earlier.time == later.time
            {
                return Err(ScheduleError::DuplicateTime { time: earlier.time });
            }
        }

        Ok(Self {
            timezone: zone,
            entries: sorted,
        })
    }

    /// Named timezone the triggers fire in (for example `Asia/Tokyo`).
    #[must_use]
    pub fn timezone(&self) -> &str {
        &self.timezone
    }

    /// Entries in time order, one per provider trigger.
    #[must_use]
    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    /// Desired capacity at a wall-clock instant in the schedule's timezone.
    ///
    /// Returns the capacity of the most recent preceding-or-equal entry.
    /// Before the first entry of the day the previous day's last trigger is
    /// still in effect, so the query wraps to the latest entry.
    #[must_use]
    pub fn capacity_at(&self, time: NaiveTime) -> u32 {
        self.entries
            .iter()
            .rev()
            .find(|entry| entry.time <= time)
            .or_else(|| self.entries.last())
            .map_or(0, |entry| entry.desired_capacity)
    }

    /// Largest desired capacity in the table.
    #[must_use]
    pub fn peak_capacity(&self) -> u32 {
        self.entries
            .iter()
            .map(|entry| entry.desired_capacity)
            .max()
            .unwrap_or(0)
    }
}

/// Errors raised while building a scaling schedule.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ScheduleError {
    /// Raised when the timezone name is blank.
    #[error("schedule timezone must not be empty")]
    EmptyTimezone,
    /// Raised when the schedule table has no entries.
    #[error("schedule table must contain at least one entry")]
    EmptyTable,
    /// Raised when an (hour, minute) pair is not a valid time of day.
    #[error("invalid schedule time {hour:02}:{minute:02}")]
    InvalidTime {
        /// Requested hour.
        hour: u32,
        /// Requested minute.
        minute: u32,
    },
    /// Raised when two entries share a time key.
    #[error("duplicate schedule entry at {time}")]
    DuplicateTime {
        /// The repeated time key.
        time: NaiveTime,
    },
}
