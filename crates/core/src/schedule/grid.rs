//! Daily slot grid derived from a shop's working hours.

use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};

use super::interval::TimeRange;

/// Opening time used when a shop has none configured.
pub const DEFAULT_OPENS_AT: (u32, u32) = (9, 30);
/// Closing time used when a shop has none configured.
pub const DEFAULT_CLOSES_AT: (u32, u32) = (21, 30);
/// Slot length used when a shop has none configured.
pub const DEFAULT_SLOT_MINUTES: u32 = 45;

/// Working hours and slot length of a shop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkingHours {
    pub opens_at: NaiveTime,
    pub closes_at: NaiveTime,
    pub slot_minutes: u32,
}

impl Default for WorkingHours {
    fn default() -> Self {
        Self {
            opens_at: clock(DEFAULT_OPENS_AT),
            closes_at: clock(DEFAULT_CLOSES_AT),
            slot_minutes: DEFAULT_SLOT_MINUTES,
        }
    }
}

impl WorkingHours {
    /// Build working hours from the nullable shop columns.
    ///
    /// Each missing field falls back to its default. If the resulting
    /// window is empty the whole default window is used.
    #[must_use]
    pub fn from_columns(
        opens_at: Option<NaiveTime>,
        closes_at: Option<NaiveTime>,
        slot_minutes: Option<i32>,
    ) -> Self {
        let defaults = Self::default();
        let slot_minutes = slot_minutes
            .and_then(|m| u32::try_from(m).ok())
            .filter(|m| (5..=480).contains(m))
            .unwrap_or(defaults.slot_minutes);
        let opens_at = opens_at.unwrap_or(defaults.opens_at);
        let closes_at = closes_at.unwrap_or(defaults.closes_at);

        if closes_at <= opens_at {
            return Self {
                slot_minutes,
                ..defaults
            };
        }

        Self {
            opens_at,
            closes_at,
            slot_minutes,
        }
    }
}

/// The ordered sequence of bookable slots for one day.
///
/// The default grid has 16 slots of 45 minutes, starting 09:30 and with
/// the last one starting at 20:45.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotGrid {
    slots: Vec<TimeRange>,
}

impl Default for SlotGrid {
    fn default() -> Self {
        Self::for_hours(&WorkingHours::default())
    }
}

impl SlotGrid {
    /// Generate the grid: slots start at `opens_at` and follow each other
    /// back to back while the slot still ends by `closes_at`.
    #[must_use]
    pub fn for_hours(hours: &WorkingHours) -> Self {
        let mut slots = Vec::new();
        let mut start = hours.opens_at;
        while let Some(slot) = TimeRange::starting_at(start, hours.slot_minutes) {
            if slot.end() > hours.closes_at {
                break;
            }
            slots.push(slot);
            start = slot.end();
        }
        Self { slots }
    }

    /// Slots in chronological order.
    #[must_use]
    pub fn slots(&self) -> &[TimeRange] {
        &self.slots
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Slot start times rendered as `HH:MM`.
    #[must_use]
    pub fn labels(&self) -> Vec<String> {
        self.slots
            .iter()
            .map(|s| s.start().format("%H:%M").to_string())
            .collect()
    }
}

/// Per-shop scheduling rules: hours, weekly closing days, capacity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShopSchedule {
    pub hours: WorkingHours,
    pub closed_weekdays: Vec<Weekday>,
    /// Explicit daily capacity for the availability badge, if configured.
    pub daily_capacity: Option<u32>,
}

impl Default for ShopSchedule {
    fn default() -> Self {
        Self {
            hours: WorkingHours::default(),
            closed_weekdays: vec![Weekday::Sun],
            daily_capacity: None,
        }
    }
}

impl ShopSchedule {
    /// Decode the `closed_weekdays` column (0 = Sunday … 6 = Saturday).
    ///
    /// Out-of-range values are skipped.
    #[must_use]
    pub fn weekdays_from_column(values: &[i32]) -> Vec<Weekday> {
        values
            .iter()
            .filter_map(|v| match v {
                0 => Some(Weekday::Sun),
                1 => Some(Weekday::Mon),
                2 => Some(Weekday::Tue),
                3 => Some(Weekday::Wed),
                4 => Some(Weekday::Thu),
                5 => Some(Weekday::Fri),
                6 => Some(Weekday::Sat),
                _ => None,
            })
            .collect()
    }

    /// Encode weekdays for the `closed_weekdays` column.
    #[must_use]
    pub fn weekdays_to_column(days: &[Weekday]) -> Vec<i32> {
        days.iter()
            .map(|d| i32::try_from(d.num_days_from_sunday()).unwrap_or_default())
            .collect()
    }

    /// The slot grid for this shop.
    #[must_use]
    pub fn grid(&self) -> SlotGrid {
        SlotGrid::for_hours(&self.hours)
    }

    /// Whether `date` falls on one of the weekly closing days.
    #[must_use]
    pub fn is_weekly_closed(&self, date: NaiveDate) -> bool {
        self.closed_weekdays.contains(&date.weekday())
    }

    /// Capacity for the availability badge, falling back to `default`.
    #[must_use]
    pub fn capacity_or(&self, default: u32) -> u32 {
        self.daily_capacity.unwrap_or(default)
    }
}

fn clock((h, m): (u32, u32)) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap_or(NaiveTime::MIN)
}
