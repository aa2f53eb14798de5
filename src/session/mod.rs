//! Client-session state.
//!
//! The engine and binder only ever see the [`SessionStore`] trait; what
//! backs it is the transport's business. In production that is [`Session`],
//! a per-request map decoded from (and re-encoded into) the signed session
//! cookie by the middleware in [`layer`].

pub mod binder;
pub mod cookie;
pub mod layer;

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;

/// Key-value state scoped to one client session.
pub trait SessionStore {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&self, key: &str, value: Value);
    fn clear(&self, key: &str);
}

/// Per-request session map.
///
/// Cloning is cheap and clones share state, so the middleware keeps one
/// handle while the handler mutates another.
#[derive(Clone, Default)]
pub struct Session {
    inner: Arc<Mutex<SessionInner>>,
}

#[derive(Default)]
struct SessionInner {
    data: BTreeMap<String, Value>,
    dirty: bool,
}

impl Session {
    pub fn from_data(data: BTreeMap<String, Value>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SessionInner { data, dirty: false })),
        }
    }

    /// True once any key has been written or removed this request.
    pub fn is_dirty(&self) -> bool {
        self.lock().dirty
    }

    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.lock().data.clone()
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SessionStore for Session {
    fn get(&self, key: &str) -> Option<Value> {
        self.lock().data.get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) {
        let mut inner = self.lock();
        inner.data.insert(key.to_string(), value);
        inner.dirty = true;
    }

    fn clear(&self, key: &str) {
        let mut inner = self.lock();
        if inner.data.remove(key).is_some() {
            inner.dirty = true;
        }
    }
}
