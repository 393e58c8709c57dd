//! Event repository implementation

use std::sync::Arc;
use serde_json::json;
use crate::gateway::{Filter, Gateway, Query, Table};
use crate::models::event::{Event, EventId, CreateEventRequest, UpdateEventRequest};
use crate::utils::errors::{EventHubError, GatewayError};
use super::decode_rows;

#[derive(Clone)]
pub struct EventRepository {
    gateway: Arc<dyn Gateway>,
}

impl EventRepository {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }

    /// Create a new event
    pub async fn create(&self, request: CreateEventRequest) -> Result<Event, EventHubError> {
        let row = serde_json::to_value(&request)?;
        let rows = self.gateway.insert(Table::Events, vec![row]).await?;

        decode_rows::<Event>(Table::Events, rows)?
            .into_iter()
            .next()
            .ok_or_else(|| {
                EventHubError::Gateway(GatewayError::InvalidResponse(
                    "insert into events returned no row".to_string(),
                ))
            })
    }

    /// Find event by ID
    pub async fn find_by_id(&self, id: EventId) -> Result<Option<Event>, EventHubError> {
        let rows = self
            .gateway
            .select(Table::Events, Query::all().eq("id", id))
            .await?;

        Ok(decode_rows::<Event>(Table::Events, rows)?.into_iter().next())
    }

    /// Events visible in the public listing
    pub async fn list_approved(&self) -> Result<Vec<Event>, EventHubError> {
        let rows = self
            .gateway
            .select(Table::Events, Query::all().eq("is_approved", true))
            .await?;

        Ok(decode_rows(Table::Events, rows)?)
    }

    /// Events waiting for moderation, soonest first
    pub async fn list_pending(&self) -> Result<Vec<Event>, EventHubError> {
        let rows = self
            .gateway
            .select(
                Table::Events,
                Query::all().eq("is_approved", false).order_by("date", true),
            )
            .await?;

        Ok(decode_rows(Table::Events, rows)?)
    }

    /// Every event regardless of approval, soonest first
    pub async fn list_all(&self) -> Result<Vec<Event>, EventHubError> {
        let rows = self
            .gateway
            .select(Table::Events, Query::all().order_by("date", true))
            .await?;

        Ok(decode_rows(Table::Events, rows)?)
    }

    /// Update event
    pub async fn update(&self, id: EventId, request: UpdateEventRequest) -> Result<(), EventHubError> {
        let patch = serde_json::to_value(&request)?;
        self.gateway
            .update(Table::Events, patch, vec![Filter::eq("id", id)])
            .await?;

        Ok(())
    }

    /// Flip the moderation flag
    pub async fn set_approved(&self, id: EventId, approved: bool) -> Result<(), EventHubError> {
        self.gateway
            .update(
                Table::Events,
                json!({ "is_approved": approved }),
                vec![Filter::eq("id", id)],
            )
            .await?;

        Ok(())
    }

    /// Delete event
    pub async fn delete(&self, id: EventId) -> Result<(), EventHubError> {
        self.gateway
            .delete(Table::Events, vec![Filter::eq("id", id)])
            .await?;

        Ok(())
    }
}
