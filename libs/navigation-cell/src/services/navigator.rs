// libs/navigation-cell/src/services/navigator.rs
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use tokio::sync::watch;
use tracing::{debug, info};

/// Current location of the portal shell plus a back stack.
pub struct Navigator {
    location: watch::Sender<String>,
    history: Mutex<Vec<String>>,
    hard_redirects: AtomicU64,
}

impl Navigator {
    pub fn new(initial_path: impl Into<String>) -> Self {
        let (location, _) = watch::channel(initial_path.into());
        Self {
            location,
            history: Mutex::new(Vec::new()),
            hard_redirects: AtomicU64::new(0),
        }
    }

    pub fn current(&self) -> String {
        self.location.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.location.subscribe()
    }

    /// Pushes `path`, returning the path that was left.
    pub fn navigate(&self, path: &str) -> String {
        let previous = self.location.send_replace(path.to_string());
        if previous != path {
            self.history().push(previous.clone());
        }
        debug!("Navigated {} -> {}", previous, path);
        previous
    }

    /// Swaps the current entry without growing the back stack.
    pub fn replace(&self, path: &str) {
        self.location.send_if_modified(|current| {
            if current == path {
                return false;
            }
            *current = path.to_string();
            true
        });
    }

    pub fn back(&self) -> Option<String> {
        let previous = self.history().pop()?;
        self.location.send_replace(previous.clone());
        Some(previous)
    }

    /// Full reload to `path`: history is dropped along with any in-flight screen state.
    pub fn hard_redirect(&self, path: &str) {
        self.history().clear();
        self.location.send_replace(path.to_string());
        self.hard_redirects.fetch_add(1, Ordering::SeqCst);
        info!("Hard redirect to {}", path);
    }

    pub fn hard_redirect_count(&self) -> u64 {
        self.hard_redirects.load(Ordering::SeqCst)
    }

    pub fn history_len(&self) -> usize {
        self.history().len()
    }

    fn history(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
