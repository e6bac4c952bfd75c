use std::env;

use anyhow::{bail, Context};
use dotenv::dotenv;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clinic_portal::Portal;
use navigation_cell::{GuardDecision, DASHBOARD_PATH};
use shared_config::PortalConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            env::var("RUST_LOG").unwrap_or_else(|_| "info,clinic_portal=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting clinic portal");

    let config = PortalConfig::from_env();
    if !config.is_configured() {
        bail!("PORTAL_API_URL and PORTAL_COOKIE_SECRET must be set");
    }

    let portal = Portal::new(config).context("building portal services")?;

    if !portal.session().is_authenticated() {
        sign_in_from_env(&portal).await?;
    }

    match portal.navigate(DASHBOARD_PATH).await {
        GuardDecision::Render => info!("Dashboard ready"),
        GuardDecision::Redirect(to) => info!("Redirected to {}", to),
        GuardDecision::Loading => warn!("Account not available yet, reminders start on the next check"),
    }

    if !portal.session().is_authenticated() {
        info!("No active session, nothing to watch");
        return Ok(());
    }

    watch_upcoming(&portal).await;
    portal.shutdown();
    Ok(())
}

/// Signs in with PORTAL_LOGIN_EMAIL / PORTAL_LOGIN_PASSWORD when both are set.
async fn sign_in_from_env(portal: &Portal) -> anyhow::Result<()> {
    let (Ok(email), Ok(password)) = (env::var("PORTAL_LOGIN_EMAIL"), env::var("PORTAL_LOGIN_PASSWORD")) else {
        info!("No stored session and no login credentials in the environment");
        return Ok(());
    };

    portal
        .auth()
        .login(&email, &password, true)
        .await
        .with_context(|| format!("signing in as {}", email))?;
    Ok(())
}

async fn watch_upcoming(portal: &Portal) {
    let mut notifications = portal.poller().subscribe();
    info!(
        "Watching for upcoming consultations every {}s, Ctrl-C to stop",
        portal.config().upcoming_poll_secs
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested");
                break;
            }
            changed = notifications.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = notifications.borrow_and_update().clone();
                let Some(consultation) = state.consultation.filter(|_| state.modal_open) else {
                    continue;
                };
                info!(
                    "Upcoming consultation {} on {} at {} ({}), join at {}",
                    consultation.id,
                    consultation.scheduled_date,
                    consultation.scheduled_time.format("%H:%M"),
                    consultation.consultation_type,
                    consultation.detail_path()
                );
                portal.poller().acknowledge();
            }
        }
    }
}
