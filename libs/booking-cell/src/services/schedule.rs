// libs/booking-cell/src/services/schedule.rs
use chrono::{Datelike, Months, NaiveDate, NaiveTime};

use crate::models::TimeSlot;

pub const VISIBLE_DAYS: u32 = 4;
pub const DEFAULT_DURATION_MINUTES: u32 = 50;

// Demo availability until the backend exposes professional agendas.
const DEMO_SLOTS: [(u32, u32, bool); 9] = [
    (8, 0, true),
    (9, 0, true),
    (10, 0, false),
    (11, 0, true),
    (13, 0, true),
    (14, 0, false),
    (15, 0, true),
    (16, 0, true),
    (17, 0, false),
];

pub fn demo_time_slots() -> Vec<TimeSlot> {
    DEMO_SLOTS
        .iter()
        .filter_map(|&(hour, minute, available)| {
            NaiveTime::from_hms_opt(hour, minute, 0).map(|time| TimeSlot { time, available })
        })
        .collect()
}

pub fn find_slot(time: NaiveTime) -> Option<TimeSlot> {
    demo_time_slots().into_iter().find(|slot| slot.time == time)
}

/// Date picker showing four days at a time within one month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateStrip {
    month_start: NaiveDate,
    // Zero-based day of month of the first visible day.
    offset: u32,
    selected: Option<NaiveDate>,
}

impl DateStrip {
    /// Opens on the page that starts at `today`.
    pub fn new(today: NaiveDate) -> Self {
        Self {
            month_start: first_of_month(today),
            offset: today.day0(),
            selected: None,
        }
    }

    pub fn month(&self) -> NaiveDate {
        self.month_start
    }

    pub fn selected(&self) -> Option<NaiveDate> {
        self.selected
    }

    pub fn visible_days(&self) -> Vec<NaiveDate> {
        let end = (self.offset + VISIBLE_DAYS).min(self.days_in_month());
        (self.offset..end)
            .filter_map(|day0| self.month_start.with_day0(day0))
            .collect()
    }

    pub fn has_next_page(&self) -> bool {
        self.offset + VISIBLE_DAYS < self.days_in_month()
    }

    pub fn has_prev_page(&self) -> bool {
        self.offset > 0
    }

    pub fn next_page(&mut self) -> bool {
        if !self.has_next_page() {
            return false;
        }
        self.offset += VISIBLE_DAYS;
        true
    }

    pub fn prev_page(&mut self) -> bool {
        if !self.has_prev_page() {
            return false;
        }
        self.offset = self.offset.saturating_sub(VISIBLE_DAYS);
        true
    }

    pub fn next_month(&mut self) {
        if let Some(next) = self.month_start.checked_add_months(Months::new(1)) {
            self.month_start = next;
            self.offset = 0;
        }
    }

    pub fn prev_month(&mut self) {
        if let Some(prev) = self.month_start.checked_sub_months(Months::new(1)) {
            self.month_start = prev;
            self.offset = 0;
        }
    }

    /// Only days of the displayed month can be picked.
    pub fn select(&mut self, date: NaiveDate) -> bool {
        if first_of_month(date) != self.month_start {
            return false;
        }
        self.selected = Some(date);
        true
    }

    pub fn days_in_month(&self) -> u32 {
        self.month_start
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .map(|last| last.day())
            .unwrap_or(28)
    }
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}
