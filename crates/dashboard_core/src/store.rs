//! Per-session key-value state that survives across render passes.

use std::{
    any::Any,
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, PoisonError},
};

use chrono::{DateTime, Utc};
use sheets::VideoTable;
use shared::{
    domain::{ChatPayload, HistoryEntry, ImagePayload, RequestKind},
    error::DataSourceError,
};

/// A typed slot in a [`SessionStore`]. Unset slots read as `Value::default()`.
pub trait StateKey: 'static {
    type Value: Clone + Default + Send + Sync + 'static;
    const NAME: &'static str;
}

macro_rules! state_key {
    ($(#[$meta:meta])* $name:ident: $value:ty) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy)]
        pub struct $name;

        impl StateKey for $name {
            type Value = $value;
            const NAME: &'static str = stringify!($name);
        }
    };
}

state_key!(PendingChat: Option<ChatPayload>);
state_key!(PendingImage: Option<ImagePayload>);
state_key!(
    /// Kind whose webhook call is currently running inside a render pass.
    InFlight: Option<RequestKind>
);
state_key!(ChatHistory: Vec<HistoryEntry>);
state_key!(ImageHistory: Vec<HistoryEntry>);
state_key!(SheetUrl: String);
state_key!(AutoRefreshEnabled: bool);
state_key!(LastRefresh: Option<DateTime<Utc>>);
state_key!(Filters: FilterSettings);
state_key!(Page: usize);
state_key!(CachedTable: Option<TableSnapshot>);
state_key!(
    /// One-shot messages shown on the next rendered page.
    Flash: Vec<String>
);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSettings {
    pub enabled: bool,
    pub status: String,
    pub search: String,
}

impl FilterSettings {
    pub fn status_filter(&self) -> Option<&str> {
        Some(self.status.trim()).filter(|s| self.enabled && !s.is_empty())
    }

    pub fn search_filter(&self) -> Option<&str> {
        Some(self.search.trim()).filter(|s| self.enabled && !s.is_empty())
    }
}

/// Result of the last sheet load for a given URL.
#[derive(Debug, Clone)]
pub struct TableSnapshot {
    pub sheet_url: String,
    pub loaded_at: DateTime<Utc>,
    pub result: Result<VideoTable, DataSourceError>,
}

/// Copy of the kind holding the submit lock, readable while a render pass
/// owns the store.
#[derive(Debug, Default)]
pub struct SubmitLock {
    holder: Mutex<Option<RequestKind>>,
}

impl SubmitLock {
    pub fn holder(&self) -> Option<RequestKind> {
        *self.holder.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn set(&self, holder: Option<RequestKind>) {
        *self.holder.lock().unwrap_or_else(PoisonError::into_inner) = holder;
    }
}

#[derive(Default)]
pub struct SessionStore {
    values: HashMap<&'static str, Box<dyn Any + Send + Sync>>,
    submit_lock: Arc<SubmitLock>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submit_lock(&self) -> Arc<SubmitLock> {
        self.submit_lock.clone()
    }

    pub fn get<K: StateKey>(&self) -> K::Value {
        self.with::<K, _>(|value| value.clone())
    }

    /// Borrows the value without cloning it.
    pub fn with<K: StateKey, R>(&self, f: impl FnOnce(&K::Value) -> R) -> R {
        match self
            .values
            .get(K::NAME)
            .and_then(|value| value.downcast_ref::<K::Value>())
        {
            Some(value) => f(value),
            None => f(&K::Value::default()),
        }
    }

    pub fn set<K: StateKey>(&mut self, value: K::Value) {
        self.values.insert(K::NAME, Box::new(value));
    }

    /// Returns the current value and resets the slot to its default.
    pub fn take<K: StateKey>(&mut self) -> K::Value {
        self.values
            .remove(K::NAME)
            .and_then(|value| value.downcast::<K::Value>().ok())
            .map(|value| *value)
            .unwrap_or_default()
    }

    pub fn contains<K: StateKey>(&self) -> bool {
        self.values
            .get(K::NAME)
            .is_some_and(|value| value.is::<K::Value>())
    }

    pub fn update<K: StateKey>(&mut self, f: impl FnOnce(&mut K::Value)) {
        let mut value = self.take::<K>();
        f(&mut value);
        self.set::<K>(value);
    }

    pub fn append<K, T>(&mut self, item: T)
    where
        K: StateKey<Value = Vec<T>>,
        T: Clone + Send + Sync + 'static,
    {
        self.update::<K>(|log| log.push(item));
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.values.keys().collect();
        keys.sort();
        f.debug_struct("SessionStore").field("keys", &keys).finish()
    }
}

pub fn history_len(store: &SessionStore, kind: RequestKind) -> usize {
    match kind {
        RequestKind::Chat => store.with::<ChatHistory, _>(Vec::len),
        RequestKind::Image => store.with::<ImageHistory, _>(Vec::len),
    }
}

/// The last `limit` entries of a history log, oldest first.
pub fn recent_history(store: &SessionStore, kind: RequestKind, limit: usize) -> Vec<HistoryEntry> {
    let tail = |log: &Vec<HistoryEntry>| log[log.len().saturating_sub(limit)..].to_vec();
    match kind {
        RequestKind::Chat => store.with::<ChatHistory, _>(tail),
        RequestKind::Image => store.with::<ImageHistory, _>(tail),
    }
}

pub fn append_history(store: &mut SessionStore, kind: RequestKind, entry: HistoryEntry) {
    match kind {
        RequestKind::Chat => store.append::<ChatHistory, _>(entry),
        RequestKind::Image => store.append::<ImageHistory, _>(entry),
    }
}

pub fn clear_history(store: &mut SessionStore, kind: RequestKind) {
    match kind {
        RequestKind::Chat => {
            store.take::<ChatHistory>();
        }
        RequestKind::Image => {
            store.take::<ImageHistory>();
        }
    }
}
