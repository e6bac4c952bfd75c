// libs/session-cell/src/cookies.rs
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CookieError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    /// `None` marks a browser-session cookie.
    pub expires: Option<DateTime<Utc>>,
    pub secure: bool,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            expires: None,
            secure: true,
        }
    }

    pub fn expires(mut self, expires: Option<DateTime<Utc>>) -> Self {
        self.expires = expires;
        self
    }

    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn is_session(&self) -> bool {
        self.expires.is_none()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_some_and(|expires| expires <= now)
    }
}

/// Cookie storage the session persists into.
pub trait CookieJar: Send + Sync {
    fn get(&self, name: &str) -> Option<Cookie>;
    fn set(&self, cookie: Cookie) -> Result<(), CookieError>;
    fn remove(&self, name: &str) -> Result<(), CookieError>;
}

#[derive(Debug, Default)]
pub struct MemoryCookieJar {
    cookies: RwLock<HashMap<String, Cookie>>,
}

impl MemoryCookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops session-scoped cookies, as closing the browser would.
    pub fn end_browser_session(&self) {
        if let Ok(mut cookies) = self.cookies.write() {
            cookies.retain(|_, cookie| !cookie.is_session());
        }
    }

    pub fn len(&self) -> usize {
        self.cookies.read().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CookieJar for MemoryCookieJar {
    fn get(&self, name: &str) -> Option<Cookie> {
        let cookies = self.cookies.read().ok()?;
        cookies
            .get(name)
            .filter(|cookie| !cookie.is_expired(Utc::now()))
            .cloned()
    }

    fn set(&self, cookie: Cookie) -> Result<(), CookieError> {
        let mut cookies = self.cookies.write().map_err(|_| CookieError::Poisoned)?;
        cookies.insert(cookie.name.clone(), cookie);
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<(), CookieError> {
        let mut cookies = self.cookies.write().map_err(|_| CookieError::Poisoned)?;
        cookies.remove(name);
        Ok(())
    }
}

/// Cookie jar persisted as JSON on disk.
///
/// Opening the jar starts a new browser session: session-scoped and expired
/// cookies from the previous run are discarded.
#[derive(Debug)]
pub struct FileCookieJar {
    path: PathBuf,
    cookies: RwLock<HashMap<String, Cookie>>,
}

impl FileCookieJar {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CookieError> {
        let path = path.as_ref().to_path_buf();
        let now = Utc::now();

        let cookies: HashMap<String, Cookie> = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            let stored: Vec<Cookie> = if raw.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&raw)?
            };
            stored
                .into_iter()
                .filter(|cookie| !cookie.is_session() && !cookie.is_expired(now))
                .map(|cookie| (cookie.name.clone(), cookie))
                .collect()
        } else {
            HashMap::new()
        };

        debug!("Opened cookie jar {} with {} cookie(s)", path.display(), cookies.len());

        let jar = Self {
            path,
            cookies: RwLock::new(cookies),
        };
        jar.flush()?;
        Ok(jar)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), CookieError> {
        let cookies = self.cookies.read().map_err(|_| CookieError::Poisoned)?;
        let mut stored: Vec<&Cookie> = cookies.values().collect();
        stored.sort_by(|a, b| a.name.cmp(&b.name));

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&stored)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl CookieJar for FileCookieJar {
    fn get(&self, name: &str) -> Option<Cookie> {
        let cookies = self.cookies.read().ok()?;
        cookies
            .get(name)
            .filter(|cookie| !cookie.is_expired(Utc::now()))
            .cloned()
    }

    fn set(&self, cookie: Cookie) -> Result<(), CookieError> {
        {
            let mut cookies = self.cookies.write().map_err(|_| CookieError::Poisoned)?;
            cookies.insert(cookie.name.clone(), cookie);
        }
        self.flush()
    }

    fn remove(&self, name: &str) -> Result<(), CookieError> {
        let removed = {
            let mut cookies = self.cookies.write().map_err(|_| CookieError::Poisoned)?;
            cookies.remove(name).is_some()
        };
        if removed {
            self.flush()
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_expired_cookies_are_invisible() {
        let jar = MemoryCookieJar::new();
        jar.set(Cookie::new("old", "v").expires(Some(Utc::now() - Duration::seconds(1))))
            .unwrap();

        assert!(jar.get("old").is_none());
    }

    #[test]
    fn test_end_browser_session_keeps_persistent_cookies() {
        let jar = MemoryCookieJar::new();
        jar.set(Cookie::new("session", "v")).unwrap();
        jar.set(Cookie::new("remembered", "v").expires(Some(Utc::now() + Duration::days(7))))
            .unwrap();

        jar.end_browser_session();

        assert!(jar.get("session").is_none());
        assert!(jar.get("remembered").is_some());
    }

    #[test]
    fn test_file_jar_survives_reopen_without_session_cookies() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");

        {
            let jar = FileCookieJar::open(&path).unwrap();
            jar.set(Cookie::new("session", "a")).unwrap();
            jar.set(Cookie::new("remembered", "b").expires(Some(Utc::now() + Duration::days(7))))
                .unwrap();
        }

        let reopened = FileCookieJar::open(&path).unwrap();
        assert!(reopened.get("session").is_none());
        assert_eq!(reopened.get("remembered").map(|c| c.value), Some("b".to_string()));
    }
}
