//! Filtering and sorting of the loaded event set

use std::collections::BTreeSet;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use crate::models::{Event, ParticipationStatus};
use crate::state::index::AttendanceIndex;

/// Sort orders; all ascending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortBy {
    /// Soonest first, by date then time
    Date,
    /// Fewest attendees first
    AttendeeCount,
    /// Lexicographic by title
    Title,
}

/// Inclusive calendar date bounds, each side optional
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |start| date >= start) && self.end.map_or(true, |end| date <= end)
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

/// Active filter options of the listing
///
/// The default value filters nothing and keeps the loaded order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    /// Empty means every category
    pub category_ids: BTreeSet<i64>,
    pub date_range: DateRange,
    /// Case-insensitive; blank means no filter
    pub location_substring: String,
    /// `None` keeps the loaded order
    pub sort_by: Option<SortBy>,
}

impl FilterCriteria {
    pub fn with_categories(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.category_ids = ids.into_iter().collect();
        self
    }

    pub fn between(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.date_range = DateRange::new(start, end);
        self
    }

    pub fn near(mut self, location: &str) -> Self {
        self.location_substring = location.to_string();
        self
    }

    pub fn sorted_by(mut self, sort_by: SortBy) -> Self {
        self.sort_by = Some(sort_by);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.category_ids.is_empty()
            && self.date_range.is_unbounded()
            && self.location_substring.trim().is_empty()
            && self.sort_by.is_none()
    }

    /// Whether an event passes every filter
    pub fn matches(&self, event: &Event) -> bool {
        let category_ok = self.category_ids.is_empty()
            || event.category_id.map_or(false, |id| self.category_ids.contains(&id));

        let needle = self.location_substring.trim().to_lowercase();
        let location_ok = needle.is_empty() || event.location.to_lowercase().contains(&needle);

        category_ok && location_ok && self.date_range.contains(event.date)
    }
}

/// One row of the listing
#[derive(Debug, Clone, PartialEq)]
pub struct EventView {
    pub event: Event,
    pub attendee_count: usize,
    pub status: ParticipationStatus,
}

impl EventView {
    pub fn is_full(&self) -> bool {
        self.event
            .max_attendees
            .map_or(false, |max| self.attendee_count >= max.max(0) as usize)
    }
}

/// Filter and sort the loaded events
///
/// Sorting is stable, so events that compare equal keep their loaded order.
pub fn apply_filters(events: &[Event], index: &AttendanceIndex, criteria: &FilterCriteria) -> Vec<EventView> {
    let mut views: Vec<EventView> = events
        .iter()
        .filter(|event| criteria.matches(event))
        .map(|event| EventView {
            event: event.clone(),
            attendee_count: index.count(event.id),
            status: index.status(event.id),
        })
        .collect();

    match criteria.sort_by {
        Some(SortBy::Date) => views.sort_by(|a, b| (a.event.date, a.event.time).cmp(&(b.event.date, b.event.time))),
        Some(SortBy::AttendeeCount) => views.sort_by_key(|view| view.attendee_count),
        Some(SortBy::Title) => views.sort_by(|a, b| a.event.title.cmp(&b.event.title)),
        None => {}
    }

    views
}
