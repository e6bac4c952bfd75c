// libs/consultation-cell/src/services/poller.rs
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use shared_models::consultation::Consultation;
use shared_models::error::PortalError;

/// Anything that can answer "what is the patient's next consultation".
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UpcomingConsultationSource: Send + Sync {
    async fn next_upcoming(&self) -> Result<Option<Consultation>, PortalError>;
}

/// Reminder modal state, deduplicated by consultation id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationState {
    pub last_seen_id: Option<String>,
    pub modal_open: bool,
    pub consultation: Option<Consultation>,
}

impl NotificationState {
    /// Returns true when this observation opened the modal.
    pub fn observe(&mut self, upcoming: Option<Consultation>) -> bool {
        let Some(consultation) = upcoming else {
            return false;
        };
        if self.last_seen_id.as_deref() == Some(consultation.id.as_str()) {
            return false;
        }

        self.last_seen_id = Some(consultation.id.clone());
        self.consultation = Some(consultation);
        self.modal_open = true;
        true
    }

    pub fn acknowledge(&mut self) {
        self.modal_open = false;
    }

    /// Closes the modal and yields the route of the consultation to open.
    pub fn join(&mut self) -> Option<String> {
        self.modal_open = false;
        self.consultation.as_ref().map(Consultation::detail_path)
    }
}

pub struct UpcomingConsultationPoller {
    source: Arc<dyn UpcomingConsultationSource>,
    interval: Duration,
    state: watch::Sender<NotificationState>,
}

impl UpcomingConsultationPoller {
    pub fn new(source: Arc<dyn UpcomingConsultationSource>, interval: Duration) -> Self {
        let (state, _) = watch::channel(NotificationState::default());
        Self { source, interval, state }
    }

    pub fn subscribe(&self) -> watch::Receiver<NotificationState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> NotificationState {
        self.state.borrow().clone()
    }

    /// One poll cycle. A failed request counts as "nothing upcoming".
    pub async fn poll_once(&self) -> bool {
        let upcoming = match self.source.next_upcoming().await {
            Ok(upcoming) => upcoming,
            Err(e) => {
                warn!("Upcoming consultation poll failed: {}", e);
                return false;
            }
        };

        let mut opened = false;
        self.state.send_if_modified(|state| {
            opened = state.observe(upcoming);
            opened
        });

        if opened {
            info!("Upcoming consultation reminder opened");
        } else {
            debug!("No new upcoming consultation");
        }
        opened
    }

    pub fn acknowledge(&self) {
        self.state.send_modify(NotificationState::acknowledge);
    }

    pub fn join(&self) -> Option<String> {
        let mut target = None;
        self.state.send_modify(|state| target = state.join());
        target
    }

    /// Forgets the last seen consultation and closes the modal.
    pub fn reset(&self) {
        self.state.send_if_modified(|state| {
            let changed = *state != NotificationState::default();
            *state = NotificationState::default();
            changed
        });
    }

    /// Polls immediately and then on every interval until the handle is dropped.
    pub fn spawn(self: &Arc<Self>) -> PollerHandle {
        let poller = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poller.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                poller.poll_once().await;
            }
        });
        debug!("Upcoming consultation poller started ({:?})", self.interval);
        PollerHandle { handle }
    }
}

/// Owning handle of a running poller; dropping it stops the polling task.
pub struct PollerHandle {
    handle: JoinHandle<()>,
}

impl PollerHandle {
    pub fn stop(self) {}

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use mockall::Sequence;
    use shared_models::consultation::{ConsultationStatus, ConsultationType};

    fn consultation(id: &str) -> Consultation {
        Consultation {
            id: id.to_string(),
            workspace_id: None,
            workspace_name: None,
            professional: None,
            scheduled_date: NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
            scheduled_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            duration: 50,
            consultation_type: ConsultationType::Online,
            status: ConsultationStatus::Confirmed,
            created_at: None,
        }
    }

    fn source_returning(responses: Vec<Result<Option<Consultation>, PortalError>>) -> MockUpcomingConsultationSource {
        let mut source = MockUpcomingConsultationSource::new();
        let mut seq = Sequence::new();
        for response in responses {
            source
                .expect_next_upcoming()
                .times(1)
                .in_sequence(&mut seq)
                .return_once(move || response);
        }
        source
    }

    #[tokio::test]
    async fn test_same_consultation_opens_modal_once() {
        let source = source_returning(vec![
            Ok(Some(consultation("c-1"))),
            Ok(Some(consultation("c-1"))),
            Ok(Some(consultation("c-2"))),
        ]);
        let poller = UpcomingConsultationPoller::new(Arc::new(source), Duration::from_secs(60));

        assert!(poller.poll_once().await);
        poller.acknowledge();
        assert!(!poller.poll_once().await);
        assert!(!poller.state().modal_open);

        assert!(poller.poll_once().await);
        let state = poller.state();
        assert!(state.modal_open);
        assert_eq!(state.last_seen_id.as_deref(), Some("c-2"));
    }

    #[tokio::test]
    async fn test_failed_poll_keeps_last_seen() {
        let source = source_returning(vec![
            Ok(Some(consultation("c-1"))),
            Err(PortalError::Timeout),
            Ok(None),
            Ok(Some(consultation("c-1"))),
        ]);
        let poller = UpcomingConsultationPoller::new(Arc::new(source), Duration::from_secs(60));

        assert!(poller.poll_once().await);
        poller.acknowledge();
        assert!(!poller.poll_once().await);
        assert!(!poller.poll_once().await);
        assert!(!poller.poll_once().await);
        assert_eq!(poller.state().last_seen_id.as_deref(), Some("c-1"));
    }

    #[tokio::test]
    async fn test_join_closes_modal_and_returns_route() {
        let source = source_returning(vec![Ok(Some(consultation("c-7")))]);
        let poller = UpcomingConsultationPoller::new(Arc::new(source), Duration::from_secs(60));

        poller.poll_once().await;
        assert_eq!(poller.join().as_deref(), Some("/consultations/c-7"));
        assert!(!poller.state().modal_open);
    }

    #[tokio::test]
    async fn test_reset_reopens_for_the_same_consultation() {
        let source = source_returning(vec![Ok(Some(consultation("c-1"))), Ok(Some(consultation("c-1")))]);
        let poller = UpcomingConsultationPoller::new(Arc::new(source), Duration::from_secs(60));

        assert!(poller.poll_once().await);
        poller.reset();
        assert_eq!(poller.state(), NotificationState::default());

        assert!(poller.poll_once().await);
        assert!(poller.state().modal_open);
    }

    #[tokio::test]
    async fn test_spawned_poller_stops_when_handle_dropped() {
        let mut source = MockUpcomingConsultationSource::new();
        source.expect_next_upcoming().returning(|| Ok(Some(consultation("c-1"))));
        let poller = Arc::new(UpcomingConsultationPoller::new(Arc::new(source), Duration::from_millis(10)));
        let mut rx = poller.subscribe();

        let handle = poller.spawn();
        rx.changed().await.unwrap();
        assert!(rx.borrow().modal_open);
        assert!(handle.is_running());

        drop(handle);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(Arc::strong_count(&poller), 1, "polling task released its reference");
    }
}
