//! Gateway service layer
//!
//! This module bundles the table repositories behind one handle and provides
//! the composite reads the view model needs.

use std::sync::Arc;
use crate::gateway::{ChangeKinds, ChangeSubscription, Gateway, Table};
use crate::gateway::{AttendanceRepository, CategoryRepository, EventRepository, UserRepository};
use crate::models::{AttendanceRecord, Category, Event};
use crate::utils::errors::{EventHubError, GatewayResult};

/// Everything the event listing screen needs, fetched together
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Listing {
    pub categories: Vec<Category>,
    pub events: Vec<Event>,
    pub records: Vec<AttendanceRecord>,
}

#[derive(Clone)]
pub struct GatewayService {
    gateway: Arc<dyn Gateway>,
    pub events: EventRepository,
    pub categories: CategoryRepository,
    pub attendance: AttendanceRepository,
    pub users: UserRepository,
}

impl GatewayService {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self {
            events: EventRepository::new(gateway.clone()),
            categories: CategoryRepository::new(gateway.clone()),
            attendance: AttendanceRepository::new(gateway.clone()),
            users: UserRepository::new(gateway.clone()),
            gateway,
        }
    }

    /// Fetch categories, approved events and all attendance records concurrently
    ///
    /// Fails as a whole if any of the three reads fails.
    pub async fn fetch_listing(&self) -> Result<Listing, EventHubError> {
        let (categories, events, records) = tokio::try_join!(
            self.categories.list(),
            self.events.list_approved(),
            self.attendance.list_all(),
        )?;

        Ok(Listing { categories, events, records })
    }

    /// Open a change stream for a table
    pub async fn subscribe(&self, table: Table, kinds: ChangeKinds) -> GatewayResult<ChangeSubscription> {
        self.gateway.subscribe(table, kinds).await
    }
}
