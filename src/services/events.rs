//! Event service implementation
//!
//! Creation of new events and the operations an organizer performs on their
//! own events: editing, deleting and deciding on attendance requests.

use std::sync::Arc;
use std::collections::HashMap;
use tracing::{debug, info, warn};
use uuid::Uuid;
use crate::gateway::GatewayService;
use crate::models::{
    AttendanceRecord, AttendanceStatus, Category, CreateEventForm, CreateEventRequest, Event, EventId,
    ParticipationStatus, UpdateEventRequest, UserProfile,
};
use crate::services::auth::AuthService;
use crate::services::geocoding::Geocoder;
use crate::services::notification::NotificationService;
use crate::utils::errors::{EventHubError, Result};
use crate::utils::helpers::{normalize_whitespace, parse_date, parse_time};
use crate::utils::logging::log_event_action;

/// Event with everything its detail page shows
#[derive(Debug, Clone, PartialEq)]
pub struct EventDetail {
    pub event: Event,
    pub category: Option<Category>,
    pub organizer: Option<UserProfile>,
    pub attendee_count: usize,
    pub status: ParticipationStatus,
}

impl EventDetail {
    /// Organizer display name derived from the user profile
    pub fn organizer_name(&self) -> Option<String> {
        self.organizer.as_ref().map(UserProfile::display_name)
    }

    pub fn spots_left(&self) -> Option<usize> {
        self.event
            .max_attendees
            .map(|max| (max.max(0) as usize).saturating_sub(self.attendee_count))
    }
}

/// Validate a creation form and build the row to insert
///
/// Coordinates are left empty; they are filled in by the geocoder.
pub fn build_event_request(form: &CreateEventForm, organizer_id: Uuid) -> Result<CreateEventRequest> {
    let title = normalize_whitespace(&form.title);
    if title.is_empty() {
        return Err(EventHubError::Validation("title is required".to_string()));
    }

    let description = form.description.trim();
    if description.is_empty() {
        return Err(EventHubError::Validation("description is required".to_string()));
    }

    let date = required(&form.date, "date")?;
    let date = parse_date(date)
        .ok_or_else(|| EventHubError::Validation("date must be formatted as YYYY-MM-DD".to_string()))?;

    let time = required(&form.time, "time")?;
    let time = parse_time(time)
        .ok_or_else(|| EventHubError::Validation("time must be formatted as HH:MM".to_string()))?;

    let location = normalize_whitespace(&form.location);
    if location.is_empty() {
        return Err(EventHubError::Validation("location is required".to_string()));
    }

    let category_id = required(&form.category_id, "category")?
        .parse::<i64>()
        .map_err(|_| EventHubError::Validation("category is invalid".to_string()))?;

    let max_attendees = match form.max_attendees.trim() {
        "" => None,
        value => match value.parse::<i32>() {
            Ok(max) if max > 0 => Some(max),
            _ => return Err(EventHubError::Validation("capacity must be a positive number".to_string())),
        },
    };

    let image = Some(form.image.trim())
        .filter(|image| !image.is_empty())
        .map(str::to_string);

    Ok(CreateEventRequest {
        title,
        description: description.to_string(),
        date,
        time,
        location,
        location_lat: None,
        location_lng: None,
        category_id,
        max_attendees,
        image,
        is_approved: false,
        organizer_id,
    })
}

fn required<'a>(value: &'a str, field: &str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        Err(EventHubError::Validation(format!("{} is required", field)))
    } else {
        Ok(value)
    }
}

/// Event creation and organizer operations
#[derive(Clone)]
pub struct EventService {
    gateway: GatewayService,
    auth: AuthService,
    geocoder: Arc<dyn Geocoder>,
    notifications: NotificationService,
}

impl EventService {
    /// Create a new EventService instance
    pub fn new(
        gateway: GatewayService,
        auth: AuthService,
        geocoder: Arc<dyn Geocoder>,
        notifications: NotificationService,
    ) -> Self {
        Self {
            gateway,
            auth,
            geocoder,
            notifications,
        }
    }

    /// Publish an error notice for a failed operation and pass the result on
    fn report<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            warn!(error = %e, severity = %e.severity(), "Event operation failed");
            self.notifications.error(e);
        }
        result
    }

    /// Submit a new event for admin approval
    pub async fn create_event(&self, form: CreateEventForm) -> Result<Event> {
        let result = self.try_create_event(form).await;
        self.report(result)
    }

    async fn try_create_event(&self, form: CreateEventForm) -> Result<Event> {
        let identity = self.auth.require_identity()?;
        let mut request = build_event_request(&form, identity.id)?;

        if let Some(coordinates) = self.geocoder.resolve(&request.location).await {
            request.location_lat = Some(coordinates.lat);
            request.location_lng = Some(coordinates.lng);
        }

        let event = self.gateway.events.create(request).await?;
        log_event_action(event.id, "create", Some(&identity.id.to_string()), Some(&event.title));
        self.notifications.success("events.created", None);

        Ok(event)
    }

    /// Event with category, organizer and attendance summary
    pub async fn event_detail(&self, event_id: EventId) -> Result<EventDetail> {
        let result = self.try_event_detail(event_id).await;
        self.report(result)
    }

    async fn try_event_detail(&self, event_id: EventId) -> Result<EventDetail> {
        let event = self.find_event(event_id).await?;

        let category = async {
            match event.category_id {
                Some(id) => self.gateway.categories.find_by_id(id).await,
                None => Ok(None),
            }
        };
        let (category, records) = tokio::try_join!(category, self.gateway.attendance.list_for_event(event_id))?;

        let organizer = match event.organizer_id {
            Some(id) => self.gateway.users.find_by_id(id).await.unwrap_or_else(|e| {
                debug!(event_id = event_id, error = %e, "Organizer profile unavailable");
                None
            }),
            None => None,
        };

        let status = self
            .auth
            .session()
            .current()
            .and_then(|identity| records.iter().find(|r| r.user_id == identity.id))
            .map(|record| ParticipationStatus::from(record.status()))
            .unwrap_or_default();

        Ok(EventDetail {
            attendee_count: records.len(),
            event,
            category,
            organizer,
            status,
        })
    }

    /// Edit an event; organizer or admin only
    pub async fn update_event(&self, event_id: EventId, request: UpdateEventRequest) -> Result<()> {
        let result = self.try_update_event(event_id, request).await;
        self.report(result)
    }

    async fn try_update_event(&self, event_id: EventId, mut request: UpdateEventRequest) -> Result<()> {
        self.auth.require_identity()?;
        if request.is_empty() {
            return Err(EventHubError::Validation("nothing to update".to_string()));
        }
        if let Some(title) = request.title.as_deref() {
            let title = normalize_whitespace(title);
            if title.is_empty() {
                return Err(EventHubError::Validation("title is required".to_string()));
            }
            request.title = Some(title);
        }
        if matches!(request.max_attendees, Some(max) if max <= 0) {
            return Err(EventHubError::Validation("capacity must be a positive number".to_string()));
        }

        let event = self.find_event(event_id).await?;
        let identity = self.auth.require_organizer_or_admin(&event)?;

        self.gateway.events.update(event_id, request).await?;
        log_event_action(event_id, "update", Some(&identity.id.to_string()), None);
        self.notifications.success("events.updated", None);

        Ok(())
    }

    /// Delete an event; organizer or admin only
    pub async fn delete_event(&self, event_id: EventId) -> Result<()> {
        let result = self.try_delete_event(event_id).await;
        self.report(result)
    }

    async fn try_delete_event(&self, event_id: EventId) -> Result<()> {
        self.auth.require_identity()?;
        let event = self.find_event(event_id).await?;
        let identity = self.auth.require_organizer_or_admin(&event)?;

        self.gateway.events.delete(event_id).await?;
        log_event_action(event_id, "delete", Some(&identity.id.to_string()), Some(&event.title));
        self.notifications.success("events.deleted", None);

        Ok(())
    }

    /// Attendance requests of an event; organizer only
    pub async fn attendees(&self, event_id: EventId) -> Result<Vec<AttendanceRecord>> {
        let result = self.try_attendees(event_id).await;
        self.report(result)
    }

    async fn try_attendees(&self, event_id: EventId) -> Result<Vec<AttendanceRecord>> {
        self.auth.require_identity()?;
        let event = self.find_event(event_id).await?;
        self.auth.require_organizer(&event)?;

        self.gateway.attendance.list_for_event(event_id).await
    }

    /// Attendance records grouped by status; organizer only
    pub async fn attendees_by_status(&self, event_id: EventId) -> Result<HashMap<AttendanceStatus, Vec<AttendanceRecord>>> {
        let mut grouped: HashMap<AttendanceStatus, Vec<AttendanceRecord>> = HashMap::new();
        for record in self.attendees(event_id).await? {
            grouped.entry(record.status()).or_default().push(record);
        }
        Ok(grouped)
    }

    /// Approve or reject a pending attendance request; organizer only
    ///
    /// Approvals stop once the approved records reach the event's capacity.
    pub async fn set_attendee_status(&self, event_id: EventId, user_id: Uuid, status: AttendanceStatus) -> Result<()> {
        let result = self.try_set_attendee_status(event_id, user_id, status).await;
        self.report(result)
    }

    async fn try_set_attendee_status(&self, event_id: EventId, user_id: Uuid, status: AttendanceStatus) -> Result<()> {
        self.auth.require_identity()?;
        if status == AttendanceStatus::Pending {
            return Err(EventHubError::Validation("a request can only be approved or rejected".to_string()));
        }

        let event = self.find_event(event_id).await?;
        let identity = self.auth.require_organizer(&event)?;

        let record = self
            .gateway
            .attendance
            .find(event_id, user_id)
            .await?
            .ok_or_else(|| EventHubError::Validation("user has not requested to attend".to_string()))?;
        if record.status().is_terminal() {
            return Err(EventHubError::Validation(format!(
                "request was already {}",
                record.status().as_str()
            )));
        }

        if status == AttendanceStatus::Approved {
            if let Some(max) = event.max_attendees {
                let approved = self
                    .gateway
                    .attendance
                    .list_for_event(event_id)
                    .await?
                    .iter()
                    .filter(|record| record.status() == AttendanceStatus::Approved)
                    .count();
                if approved >= max.max(0) as usize {
                    return Err(EventHubError::EventFull { event_id });
                }
            }
        }

        self.gateway.attendance.set_status(event_id, user_id, status).await?;
        info!(event_id = event_id, user_id = %user_id, status = status.as_str(), "Attendance request decided");
        log_event_action(event_id, "set_attendee_status", Some(&identity.id.to_string()), Some(status.as_str()));

        let mut params = HashMap::new();
        params.insert("status".to_string(), status.as_str().to_string());
        self.notifications.success("attendance.status_updated", Some(&params));

        Ok(())
    }

    async fn find_event(&self, event_id: EventId) -> Result<Event> {
        self.gateway
            .events
            .find_by_id(event_id)
            .await?
            .ok_or(EventHubError::EventNotFound { event_id })
    }
}
