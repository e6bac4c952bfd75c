// libs/navigation-cell/src/services/guard.rs
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use account_cell::AccountService;
use consultation_cell::{PollerHandle, UpcomingConsultationPoller};
use session_cell::SessionStore;
use shared_models::account::Account;
use shared_models::error::PortalError;

use crate::services::navigator::Navigator;

pub const LOGIN_PATH: &str = "/login";
pub const WELCOME_PATH: &str = "/welcome";
pub const DASHBOARD_PATH: &str = "/dashboard";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    /// Token present, account query still in flight.
    Checking,
    Unauthenticated,
    NeedsOnboarding,
    Onboarded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Loading,
    Redirect(&'static str),
    Render,
}

/// Pure routing rule for protected paths.
///
/// `account` is `None` while the account query has not resolved.
pub fn decide(path: &str, has_token: bool, account: Option<&Account>) -> (GuardState, GuardDecision) {
    if !has_token {
        return (GuardState::Unauthenticated, GuardDecision::Redirect(LOGIN_PATH));
    }
    let Some(account) = account else {
        return (GuardState::Checking, GuardDecision::Loading);
    };

    let on_welcome = path.trim_end_matches('/') == WELCOME_PATH;
    match (account.has_onboarding, on_welcome) {
        (false, false) => (GuardState::NeedsOnboarding, GuardDecision::Redirect(WELCOME_PATH)),
        (false, true) => (GuardState::NeedsOnboarding, GuardDecision::Render),
        (true, true) => (GuardState::Onboarded, GuardDecision::Redirect(DASHBOARD_PATH)),
        (true, false) => (GuardState::Onboarded, GuardDecision::Render),
    }
}

/// Gatekeeper for every private route.
///
/// While a patient is signed in and their account is known it also keeps
/// the upcoming-consultation poller running; signing out or unmounting
/// stops it.
pub struct RouteGuard {
    session: Arc<SessionStore>,
    accounts: Arc<AccountService>,
    navigator: Arc<Navigator>,
    poller: Arc<UpcomingConsultationPoller>,
    state: watch::Sender<GuardState>,
    account: Mutex<Option<Account>>,
    poller_handle: Mutex<Option<PollerHandle>>,
}

impl RouteGuard {
    pub fn new(
        session: Arc<SessionStore>,
        accounts: Arc<AccountService>,
        navigator: Arc<Navigator>,
        poller: Arc<UpcomingConsultationPoller>,
    ) -> Self {
        let (state, _) = watch::channel(GuardState::Checking);
        Self {
            session,
            accounts,
            navigator,
            poller,
            state,
            account: Mutex::new(None),
            poller_handle: Mutex::new(None),
        }
    }

    pub fn state(&self) -> GuardState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<GuardState> {
        self.state.subscribe()
    }

    pub fn is_polling(&self) -> bool {
        lock(&self.poller_handle).as_ref().is_some_and(PollerHandle::is_running)
    }

    /// Evaluates `path`, applying any redirect to the navigator.
    #[instrument(skip(self))]
    pub async fn resolve(&self, path: &str) -> GuardDecision {
        if !self.session.is_authenticated() {
            self.invalidate_account();
            return self.apply(path, decide(path, false, None));
        }

        let cached = lock(&self.account).clone();
        let account = match cached {
            Some(account) => account,
            None => {
                self.state.send_replace(GuardState::Checking);
                match self.accounts.get_account().await {
                    Ok(account) => {
                        *lock(&self.account) = Some(account.clone());
                        account
                    }
                    Err(e) => return self.account_failed(path, e),
                }
            }
        };

        self.ensure_polling();
        self.apply(path, decide(path, true, Some(&account)))
    }

    /// Drops the cached account so the next resolve refetches it, e.g. after onboarding.
    pub fn invalidate_account(&self) {
        lock(&self.account).take();
    }

    /// The guarded subtree is gone: forget the account, stop polling and
    /// close any open reminder.
    pub fn unmount(&self) {
        self.invalidate_account();
        if lock(&self.poller_handle).take().is_some() {
            debug!("Upcoming consultation poller stopped");
        }
        self.poller.reset();
        self.state.send_replace(GuardState::Checking);
    }

    fn account_failed(&self, path: &str, error: PortalError) -> GuardDecision {
        if error.is_session_fatal() || matches!(error, PortalError::Unauthenticated) {
            self.unmount();
            return self.apply(path, decide(path, false, None));
        }
        // Stays on the loading indicator; the next navigation retries.
        warn!("Account query failed for {}: {}", path, error);
        GuardDecision::Loading
    }

    fn ensure_polling(&self) {
        let mut handle = lock(&self.poller_handle);
        if handle.as_ref().is_some_and(PollerHandle::is_running) {
            return;
        }
        *handle = Some(self.poller.spawn());
        info!("Upcoming consultation poller running");
    }

    fn apply(&self, path: &str, (state, decision): (GuardState, GuardDecision)) -> GuardDecision {
        if state == GuardState::Unauthenticated {
            lock(&self.poller_handle).take();
            self.poller.reset();
        }
        self.state.send_replace(state);
        if let GuardDecision::Redirect(to) = &decision {
            debug!("Guard redirects {} -> {}", path, to);
            self.navigator.replace(to);
        }
        decision
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
