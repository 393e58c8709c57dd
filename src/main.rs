//! EventHub
//!
//! Headless entry point: connects to the backend, opens a session when
//! credentials are configured, loads the public listing and follows realtime
//! changes until interrupted.

use std::sync::Arc;
use std::time::Duration;
use anyhow::Context;
use tracing::{info, warn, error};

use EventHub::{
    config::Settings,
    gateway::{health_check, BackendGateway, GatewayHandle, RealtimeClient},
    i18n::I18n,
    services::{GeocodingService, GoTrueAuth, NoticeLevel, ServiceFactory},
    state::{CollectionSnapshot, FilterCriteria, SortBy},
    utils::{helpers, logging},
};

/// Refresh the access token when it expires within this window
const REFRESH_MARGIN_MINUTES: i64 = 5;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::new().context("failed to load settings")?;
    settings.validate()?;

    // Initialize logging
    let _log_guard = logging::init_logging(&settings.logging)?;

    info!("Starting {}...", EventHub::info());

    // Initialize i18n system
    info!("Loading translations...");
    let mut i18n = I18n::new(&settings.i18n);
    i18n.load_translations().await?;
    let i18n = Arc::new(i18n);

    // Connect to the backend once; every client shares the handle
    info!("Connecting to backend...");
    let handle = GatewayHandle::connect(&settings).await?;
    if let Err(e) = health_check(&handle).await {
        warn!(error = %e, "Backend health check failed");
    }

    let realtime = settings
        .realtime
        .enabled
        .then(|| RealtimeClient::new(handle.clone(), &settings.realtime));
    let gateway = Arc::new(BackendGateway::new(handle.clone(), realtime));
    let auth_backend = Arc::new(GoTrueAuth::new(handle.clone()));
    let geocoder = Arc::new(GeocodingService::new(&settings.geocoding)?);

    info!("Initializing services...");
    let services = ServiceFactory::new(&settings, gateway, auth_backend, geocoder, i18n.clone());

    spawn_notice_logger(&services);

    if let (Ok(email), Ok(password)) = (std::env::var("EVENTHUB_LOGIN_EMAIL"), std::env::var("EVENTHUB_LOGIN_PASSWORD")) {
        match services.session.sign_in(&email, &password).await {
            Ok(identity) => info!(user_id = %identity.id, admin = services.auth_service.is_admin(), "Signed in"),
            Err(e) => error!(error = %e, "Sign-in failed, continuing anonymously"),
        }
    }

    let collection = services.event_collection();
    let listener = collection.start().await;
    if let Err(e) = collection.load().await {
        error!(error = %e, "Initial load failed");
    }
    collection.apply_filters(FilterCriteria::default().sorted_by(SortBy::Date));

    let language = services.notification_service.language().to_string();
    let mut snapshots = collection.subscribe();
    let summary_i18n = i18n.clone();
    tokio::spawn(async move {
        log_snapshot(&snapshots.borrow_and_update(), &summary_i18n, &language);
        while snapshots.changed().await.is_ok() {
            let snapshot = snapshots.borrow_and_update().clone();
            log_snapshot(&snapshot, &summary_i18n, &language);
        }
    });

    let session = services.session.clone();
    let refresher = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(60));
        loop {
            ticker.tick().await;
            if session.needs_refresh(chrono::Duration::minutes(REFRESH_MARGIN_MINUTES)) {
                if let Err(e) = session.refresh().await {
                    warn!(error = %e, "Scheduled token refresh failed");
                }
            }
        }
    });

    info!("EventHub is running, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;

    refresher.abort();
    collection.stop(listener).await;
    info!("EventHub has been shut down.");

    Ok(())
}

/// Mirror published notices into the log
fn spawn_notice_logger(services: &ServiceFactory) {
    let mut notices = services.notification_service.subscribe();
    tokio::spawn(async move {
        loop {
            match notices.recv().await {
                Ok(notice) => match notice.level {
                    NoticeLevel::Error => warn!(title = %notice.title, "{}", notice.description),
                    _ => info!(title = %notice.title, "{}", notice.description),
                },
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped = skipped, "Notice logger lagged behind");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

fn log_snapshot(snapshot: &CollectionSnapshot, i18n: &I18n, language: &str) {
    info!(
        phase = ?snapshot.phase,
        signed_in = snapshot.identity.is_some(),
        "{}",
        i18n.tp("events.count", language, snapshot.visible.len() as i64, None)
    );

    for view in snapshot.visible.iter().take(5) {
        let event = &view.event;
        info!(
            event_id = event.id,
            date = %helpers::format_date(event.date),
            time = %helpers::format_time(event.time),
            city = helpers::location_city(&event.location).unwrap_or("-"),
            category = event.category_id.and_then(|id| snapshot.category_name(id)).unwrap_or("-"),
            attendees = view.attendee_count,
            status = %view.status,
            "{}",
            helpers::truncate_text(&event.title, 40)
        );
    }
}
