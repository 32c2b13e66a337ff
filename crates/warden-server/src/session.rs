//! In-memory sessions keyed by a cookie
//!
//! Handlers [`SessionStore::load`] a [`Session`] from the request cookies,
//! work on it through [`SessionState`] and hand it back with
//! [`SessionStore::commit`], which updates the stored values and the cookie.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;
use uuid::Uuid;
use warden_auth::SessionState;
use warden_core::config::SessionConfig;
use warden_core::SESSION_AUTH_KEY;

struct SessionRecord {
    values: HashMap<String, String>,
    last_access: Instant,
}

/// One client's session, detached from the store while a request runs
#[derive(Debug, Default)]
pub struct Session {
    id: Option<Uuid>,
    values: HashMap<String, String>,
    dirty: bool,
    expired: bool,
    stale_cookie: bool,
    rotate: bool,
}

impl Session {
    pub fn id(&self) -> Option<Uuid> {
        self.id
    }

    pub fn is_expired(&self) -> bool {
        self.expired
    }
}

impl SessionState for Session {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        // Logging in moves the values to a new id
        if key == SESSION_AUTH_KEY && !self.values.contains_key(key) {
            self.rotate = true;
        }
        self.values.insert(key.to_string(), value);
        self.dirty = true;
    }

    fn delete(&mut self, key: &str) {
        if self.values.remove(key).is_some() {
            self.dirty = true;
        }
    }

    fn expire(&mut self) {
        self.values.clear();
        self.expired = true;
    }
}

pub struct SessionStore {
    cookie_name: String,
    idle_timeout: Duration,
    records: RwLock<HashMap<Uuid, SessionRecord>>,
}

impl SessionStore {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            cookie_name: config.cookie_name.clone(),
            idle_timeout: Duration::from_secs(config.timeout_minutes.saturating_mul(60)),
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Session named by the request cookie, or a fresh one
    pub fn load(&self, jar: &CookieJar) -> Session {
        let Some(cookie) = jar.get(&self.cookie_name) else {
            return Session::default();
        };

        let stale = Session {
            stale_cookie: true,
            ..Default::default()
        };

        let Ok(id) = Uuid::parse_str(cookie.value()) else {
            return stale;
        };

        let mut records = self.records.write();
        match records.get_mut(&id) {
            Some(record) if record.last_access.elapsed() <= self.idle_timeout => {
                record.last_access = Instant::now();
                Session {
                    id: Some(id),
                    values: record.values.clone(),
                    ..Default::default()
                }
            }
            Some(_) => {
                records.remove(&id);
                debug!("Session {} timed out", id);
                stale
            }
            None => stale,
        }
    }

    /// Store the session's values and return the cookies to send back
    pub fn commit(&self, session: Session, jar: CookieJar) -> CookieJar {
        if session.expired {
            if let Some(id) = session.id {
                self.records.write().remove(&id);
                debug!("Session {} expired", id);
            }
            return jar.remove(self.removal_cookie());
        }

        if !session.dirty {
            if session.stale_cookie {
                return jar.remove(self.removal_cookie());
            }
            return jar;
        }

        let mut records = self.records.write();
        let id = match session.id {
            Some(old) if session.rotate => {
                records.remove(&old);
                let id = Uuid::new_v4();
                debug!("Session {} renamed to {} on login", old, id);
                id
            }
            Some(id) => id,
            None => Uuid::new_v4(),
        };
        records.insert(
            id,
            SessionRecord {
                values: session.values,
                last_access: Instant::now(),
            },
        );
        drop(records);

        let cookie = Cookie::build((self.cookie_name.clone(), id.to_string()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .build();
        jar.add(cookie)
    }

    /// Drop sessions idle for longer than the timeout
    pub fn purge_expired(&self) -> usize {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|_, record| record.last_access.elapsed() <= self.idle_timeout);
        before - records.len()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    fn removal_cookie(&self) -> Cookie<'static> {
        Cookie::build((self.cookie_name.clone(), ""))
            .path("/")
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(timeout_minutes: u64) -> SessionStore {
        SessionStore::new(&SessionConfig {
            cookie_name: "warden_session".to_string(),
            timeout_minutes,
        })
    }

    fn jar_with(value: &str) -> CookieJar {
        CookieJar::new().add(Cookie::new("warden_session", value.to_string()))
    }

    #[test]
    fn test_round_trip() {
        let sessions = store(60);

        let mut session = sessions.load(&CookieJar::new());
        assert!(session.id().is_none());
        session.set(SESSION_AUTH_KEY, "Alice Example".to_string());

        let jar = sessions.commit(session, CookieJar::new());
        let cookie = jar.get("warden_session").unwrap();
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(sessions.len(), 1);

        let session = sessions.load(&jar_with(cookie.value()));
        assert!(session.id().is_some());
        assert_eq!(session.get(SESSION_AUTH_KEY).as_deref(), Some("Alice Example"));
    }

    #[test]
    fn test_untouched_session_is_not_stored() {
        let sessions = store(60);
        let session = sessions.load(&CookieJar::new());

        let jar = sessions.commit(session, CookieJar::new());
        assert!(jar.get("warden_session").is_none());
        assert!(sessions.is_empty());
    }

    #[test]
    fn test_expire_removes_record() {
        let sessions = store(60);
        let mut session = sessions.load(&CookieJar::new());
        session.set(SESSION_AUTH_KEY, "alice".to_string());
        let jar = sessions.commit(session, CookieJar::new());
        let value = jar.get("warden_session").unwrap().value().to_string();

        let mut session = sessions.load(&jar_with(&value));
        session.delete(SESSION_AUTH_KEY);
        session.expire();
        assert!(session.is_expired());
        let jar = sessions.commit(session, jar_with(&value));
        assert!(jar.get("warden_session").is_none());

        assert!(sessions.is_empty());
        let session = sessions.load(&jar_with(&value));
        assert!(session.get(SESSION_AUTH_KEY).is_none());
    }

    #[test]
    fn test_unknown_cookie_starts_fresh() {
        let sessions = store(60);

        let session = sessions.load(&jar_with("not-a-uuid"));
        assert!(session.id().is_none());

        let session = sessions.load(&jar_with(&Uuid::new_v4().to_string()));
        assert!(session.id().is_none());
        assert!(session.get(SESSION_AUTH_KEY).is_none());
    }

    #[test]
    fn test_idle_timeout() {
        let sessions = store(0);
        let mut session = sessions.load(&CookieJar::new());
        session.set(SESSION_AUTH_KEY, "alice".to_string());
        let jar = sessions.commit(session, CookieJar::new());
        let value = jar.get("warden_session").unwrap().value().to_string();

        std::thread::sleep(Duration::from_millis(5));

        let session = sessions.load(&jar_with(&value));
        assert!(session.get(SESSION_AUTH_KEY).is_none());
        assert!(sessions.is_empty());
    }

    #[test]
    fn test_purge_expired() {
        let sessions = store(0);
        for _ in 0..3 {
            let mut session = sessions.load(&CookieJar::new());
            session.set(SESSION_AUTH_KEY, "alice".to_string());
            let _jar = sessions.commit(session, CookieJar::new());
        }
        assert_eq!(sessions.len(), 3);

        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(sessions.purge_expired(), 3);
        assert!(sessions.is_empty());
    }

    #[test]
    fn test_login_issues_new_id() {
        let sessions = store(60);

        let mut session = sessions.load(&CookieJar::new());
        session.set("page", "list".to_string());
        let jar = sessions.commit(session, CookieJar::new());
        let before = jar.get("warden_session").unwrap().value().to_string();

        let mut session = sessions.load(&jar_with(&before));
        session.set(SESSION_AUTH_KEY, "alice".to_string());
        let jar = sessions.commit(session, jar_with(&before));
        let after = jar.get("warden_session").unwrap().value().to_string();

        assert_ne!(before, after);
        assert_eq!(sessions.len(), 1);
        assert!(sessions.load(&jar_with(&before)).get(SESSION_AUTH_KEY).is_none());

        let session = sessions.load(&jar_with(&after));
        assert_eq!(session.get(SESSION_AUTH_KEY).as_deref(), Some("alice"));
        assert_eq!(session.get("page").as_deref(), Some("list"));

        // Already logged in: the id stays put
        let mut session = session;
        session.set(SESSION_AUTH_KEY, "Alice Example".to_string());
        let jar = sessions.commit(session, jar_with(&after));
        assert_eq!(jar.get("warden_session").unwrap().value(), after);
    }
}
