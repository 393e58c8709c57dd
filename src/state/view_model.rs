//! Event collection view model
//!
//! Owns the loaded event set, the attendance records and the active filter
//! criteria, and publishes an immutable [`CollectionSnapshot`] after every
//! change. Remote state is only ever replaced wholesale: a fetch either
//! succeeds and swaps in its result, or fails and leaves the previous
//! snapshot in place with an error notice attached.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;
use crate::gateway::{ChangeKinds, ChangeNotification, ChangeSubscription, GatewayService, Listing, Table};
use crate::models::{
    AttendanceRecord, AttendanceStatus, Category, Event, EventId, Identity, JoinRequest, ParticipationStatus,
};
use crate::services::notification::{Notice, NotificationService};
use crate::services::session::SessionResolver;
use crate::state::filters::{apply_filters, EventView, FilterCriteria};
use crate::state::index::{build_index, AttendanceIndex};
use crate::utils::errors::{EventHubError, Result};
use crate::utils::logging::log_event_action;

/// Loading lifecycle of the collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadPhase {
    #[default]
    Idle,
    Loading,
    Ready,
}

/// Immutable state published to consumers
#[derive(Debug, Clone, Default)]
pub struct CollectionSnapshot {
    pub phase: LoadPhase,
    pub categories: Vec<Category>,
    /// Loaded events, unfiltered
    pub events: Vec<Event>,
    pub records: Vec<AttendanceRecord>,
    pub identity: Option<Identity>,
    pub index: AttendanceIndex,
    pub criteria: FilterCriteria,
    /// Events after filtering and sorting
    pub visible: Vec<EventView>,
    /// Last failed operation; cleared by the next successful one
    pub error: Option<Notice>,
}

impl CollectionSnapshot {
    fn rebuild(&mut self) {
        let user = self.identity.as_ref().map(|identity| identity.id);
        self.index = build_index(&self.events, &self.records, user);
        self.visible = apply_filters(&self.events, &self.index, &self.criteria);
    }

    pub fn event(&self, event_id: EventId) -> Option<&Event> {
        self.events.iter().find(|event| event.id == event_id)
    }

    pub fn category_name(&self, category_id: i64) -> Option<&str> {
        self.categories
            .iter()
            .find(|category| category.id == category_id)
            .map(|category| category.name.as_str())
    }

    pub fn status(&self, event_id: EventId) -> ParticipationStatus {
        self.index.status(event_id)
    }
}

/// Outcome of a successful attendance toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttendanceChange {
    /// A pending request was created
    Joined,
    /// The user's record was removed
    Left,
}

struct Inner {
    gateway: GatewayService,
    session: SessionResolver,
    notifications: NotificationService,
    state: watch::Sender<Arc<CollectionSnapshot>>,
    next_fetch: AtomicU64,
    events_applied: AtomicU64,
    records_applied: AtomicU64,
}

/// View model over the public event listing
#[derive(Clone)]
pub struct EventCollection {
    inner: Arc<Inner>,
}

impl EventCollection {
    pub fn new(gateway: GatewayService, session: SessionResolver, notifications: NotificationService) -> Self {
        let initial = CollectionSnapshot {
            identity: session.current(),
            ..Default::default()
        };
        let (state, _) = watch::channel(Arc::new(initial));

        Self {
            inner: Arc::new(Inner {
                gateway,
                session,
                notifications,
                state,
                next_fetch: AtomicU64::new(1),
                events_applied: AtomicU64::new(0),
                records_applied: AtomicU64::new(0),
            }),
        }
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<CollectionSnapshot> {
        self.inner.state.borrow().clone()
    }

    /// Receive every snapshot published from now on
    pub fn subscribe(&self) -> watch::Receiver<Arc<CollectionSnapshot>> {
        self.inner.state.subscribe()
    }

    /// Apply `change` to a copy of the current snapshot and publish it if it
    /// reports a modification
    fn update(&self, change: impl FnOnce(&mut CollectionSnapshot) -> bool) -> bool {
        self.inner.state.send_if_modified(|current| {
            let mut next = CollectionSnapshot::clone(current);
            if change(&mut next) {
                *current = Arc::new(next);
                true
            } else {
                false
            }
        })
    }

    fn next_fetch(&self) -> u64 {
        self.inner.next_fetch.fetch_add(1, Ordering::SeqCst)
    }

    fn fail(&self, error: &EventHubError) {
        warn!(error = %error, severity = %error.severity(), "Collection operation failed");
        let notice = self.inner.notifications.error(error);
        self.update(|snapshot| {
            snapshot.error = Some(notice);
            true
        });
    }

    /// Fetch categories, approved events and attendance records
    ///
    /// The three reads replace the current state together or not at all.
    pub async fn load(&self) -> Result<()> {
        let seq = self.next_fetch();
        self.update(|snapshot| {
            snapshot.phase = LoadPhase::Loading;
            true
        });
        debug!(seq = seq, "Loading event collection");

        match self.inner.gateway.fetch_listing().await {
            Ok(listing) => {
                let applied = self.apply_listing(seq, listing);
                if !applied {
                    debug!(seq = seq, "Discarded stale listing");
                }
                Ok(())
            }
            Err(e) => {
                let loaded = self.inner.events_applied.load(Ordering::SeqCst) > 0;
                self.update(|snapshot| {
                    if snapshot.phase == LoadPhase::Loading {
                        snapshot.phase = if loaded { LoadPhase::Ready } else { LoadPhase::Idle };
                    }
                    true
                });
                self.fail(&e);
                Err(e)
            }
        }
    }

    fn apply_listing(&self, seq: u64, listing: Listing) -> bool {
        let inner = &self.inner;
        self.update(|snapshot| {
            let mut changed = false;
            if seq > inner.events_applied.load(Ordering::SeqCst) {
                inner.events_applied.store(seq, Ordering::SeqCst);
                snapshot.categories = listing.categories;
                snapshot.events = listing.events;
                changed = true;
            }
            if seq > inner.records_applied.load(Ordering::SeqCst) {
                inner.records_applied.store(seq, Ordering::SeqCst);
                snapshot.records = listing.records;
                changed = true;
            }
            if changed {
                snapshot.phase = LoadPhase::Ready;
                snapshot.error = None;
                snapshot.rebuild();
                info!(events = snapshot.events.len(), visible = snapshot.visible.len(), "Event collection loaded");
            }
            changed
        })
    }

    /// Re-fetch every attendance record and rebuild the index
    ///
    /// On failure the previous records and index stay in place.
    pub async fn refresh_attendance(&self) -> Result<()> {
        let seq = self.next_fetch();
        match self.inner.gateway.attendance.list_all().await {
            Ok(records) => {
                let inner = &self.inner;
                let applied = self.update(|snapshot| {
                    if seq <= inner.records_applied.load(Ordering::SeqCst) {
                        return false;
                    }
                    inner.records_applied.store(seq, Ordering::SeqCst);
                    snapshot.records = records;
                    snapshot.rebuild();
                    true
                });
                if !applied {
                    debug!(seq = seq, "Discarded stale attendance records");
                }
                Ok(())
            }
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    /// Replace the filter criteria and recompute the visible events
    pub fn apply_filters(&self, criteria: FilterCriteria) -> Arc<CollectionSnapshot> {
        self.update(|snapshot| {
            snapshot.criteria = criteria;
            snapshot.visible = apply_filters(&snapshot.events, &snapshot.index, &snapshot.criteria);
            true
        });
        self.snapshot()
    }

    /// Join an event the user has no record for, or drop the existing record
    ///
    /// Joins create a pending request; capacity is enforced when the
    /// organizer approves, not here. Whatever the mutation's outcome, the
    /// attendance records are re-fetched afterwards.
    pub async fn toggle_attendance(&self, event_id: EventId) -> Result<AttendanceChange> {
        let Some(identity) = self.inner.session.current() else {
            let error = EventHubError::AuthRequired;
            self.fail(&error);
            return Err(error);
        };

        let snapshot = self.snapshot();
        if snapshot.event(event_id).is_none() {
            let error = EventHubError::EventNotFound { event_id };
            self.fail(&error);
            return Err(error);
        }

        let cached = snapshot
            .records
            .iter()
            .any(|record| record.event_id == event_id && record.user_id == identity.id);
        let existing = cached || self.has_remote_record(event_id, identity.id).await;

        let outcome = if existing {
            self.inner
                .gateway
                .attendance
                .leave(event_id, identity.id)
                .await
                .map(|_| AttendanceChange::Left)
        } else {
            let request = JoinRequest {
                event_id,
                user_id: identity.id,
                status: AttendanceStatus::Pending,
            };
            self.inner
                .gateway
                .attendance
                .join(request)
                .await
                .map(|_| AttendanceChange::Joined)
        };

        // Re-fetch regardless of the outcome; a failure here is already reported
        let refreshed = self.refresh_attendance().await;

        match outcome {
            Ok(change) => {
                let (action, notice_key) = match change {
                    AttendanceChange::Joined => ("join", "attendance.joined"),
                    AttendanceChange::Left => ("leave", "attendance.left"),
                };
                log_event_action(event_id, action, Some(&identity.id.to_string()), None);
                self.inner.notifications.success(notice_key, None);
                if refreshed.is_ok() {
                    self.update(|snapshot| snapshot.error.take().is_some());
                }
                Ok(change)
            }
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    /// Whether the backend holds a record the cached records have not caught up with
    ///
    /// A failed lookup falls back to the cached view.
    async fn has_remote_record(&self, event_id: EventId, user_id: Uuid) -> bool {
        match self.inner.gateway.attendance.find(event_id, user_id).await {
            Ok(record) => {
                if record.is_some() {
                    debug!(event_id = event_id, user_id = %user_id, "Attendance record missing from cache");
                }
                record.is_some()
            }
            Err(e) => {
                warn!(event_id = event_id, error = %e, "Attendance lookup failed, using cached records");
                false
            }
        }
    }

    /// React to a row change pushed by the backend
    pub async fn on_remote_change(&self, notification: ChangeNotification) -> Result<()> {
        debug!(table = %notification.table, kind = notification.kind.as_str(), "Remote change received");
        match notification.table {
            Table::Events => self.load().await,
            Table::EventAttendees => self.refresh_attendance().await,
            _ => Ok(()),
        }
    }

    /// Recompute participation for a new identity from the cached records
    pub fn on_session_change(&self, identity: Option<Identity>) {
        self.update(|snapshot| {
            if snapshot.identity == identity {
                return false;
            }
            snapshot.identity = identity;
            snapshot.rebuild();
            true
        });
    }

    /// Start listening for remote changes and session transitions
    ///
    /// A table whose change stream cannot be opened is logged and skipped;
    /// session transitions are always followed.
    pub async fn start(&self) -> ListenerHandle {
        let events = self.open_stream(Table::Events).await;
        let attendees = self.open_stream(Table::EventAttendees).await;
        let mut session = self.inner.session.on_change();
        let collection = self.clone();

        let task = tokio::spawn(async move {
            let mut events = events;
            let mut attendees = attendees;
            loop {
                tokio::select! {
                    change = next_change(&mut events) => match change {
                        Some(change) => {
                            let _ = collection.on_remote_change(change).await;
                        }
                        None => {
                            warn!(table = %Table::Events, "Change stream closed");
                            events = None;
                        }
                    },
                    change = next_change(&mut attendees) => match change {
                        Some(change) => {
                            let _ = collection.on_remote_change(change).await;
                        }
                        None => {
                            warn!(table = %Table::EventAttendees, "Change stream closed");
                            attendees = None;
                        }
                    },
                    change = session.recv() => match change {
                        Some(change) => {
                            debug!(event = ?change.event, "Session change received");
                            collection.on_session_change(change.identity);
                        }
                        None => break,
                    },
                }
            }
        });

        info!("Event collection listener started");
        ListenerHandle { task: Some(task) }
    }

    /// Stop a listener started by [`EventCollection::start`]
    pub async fn stop(&self, handle: ListenerHandle) {
        handle.stop().await;
    }

    async fn open_stream(&self, table: Table) -> Option<ChangeSubscription> {
        match self.inner.gateway.subscribe(table, ChangeKinds::all()).await {
            Ok(subscription) => Some(subscription),
            Err(e) => {
                warn!(table = %table, error = %e, "Realtime updates unavailable");
                None
            }
        }
    }
}

async fn next_change(subscription: &mut Option<ChangeSubscription>) -> Option<ChangeNotification> {
    match subscription {
        Some(subscription) => subscription.recv().await,
        None => std::future::pending().await,
    }
}

/// Running listener; dropping it stops the listener and releases its
/// change subscriptions
pub struct ListenerHandle {
    task: Option<JoinHandle<()>>,
}

impl ListenerHandle {
    pub fn is_running(&self) -> bool {
        self.task.as_ref().map_or(false, |task| !task.is_finished())
    }

    /// Abort the listener and wait until its subscriptions are released
    pub async fn stop(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
            info!("Event collection listener stopped");
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
