use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::AbortHandle;

use crate::models::player::PlayerId;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TimerKey {
    Phase(String),
    Grace(String, PlayerId),
}

struct Scheduled {
    token: u64,
    handle: AbortHandle,
}

/// Cancellable one-shot timers, at most one per key. Scheduling a key again
/// aborts the timer it replaces.
#[derive(Clone, Default)]
pub struct TimerRegistry {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    next_token: u64,
    timers: HashMap<TimerKey, Scheduled>,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Runs `task` after `delay` unless cancelled or replaced first.
    pub fn schedule<F>(&self, key: TimerKey, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut inner = self.lock();
        let token = inner.next_token;
        inner.next_token += 1;

        let registry = self.clone();
        let own_key = key.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // deregister before running so the task may schedule this key again
            if !registry.release(&own_key, token) {
                return;
            }
            task.await;
        })
        .abort_handle();

        if let Some(previous) = inner.timers.insert(key, Scheduled { token, handle }) {
            previous.handle.abort();
        }
    }

    pub fn cancel(&self, key: &TimerKey) -> bool {
        match self.lock().timers.remove(key) {
            Some(scheduled) => {
                scheduled.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Cancels every timer belonging to a room.
    pub fn cancel_room(&self, room_code: &str) {
        let mut inner = self.lock();
        inner.timers.retain(|key, scheduled| {
            let owned = match key {
                TimerKey::Phase(code) | TimerKey::Grace(code, _) => code == room_code,
            };
            if owned {
                scheduled.handle.abort();
            }
            !owned
        });
    }

    pub fn is_scheduled(&self, key: &TimerKey) -> bool {
        self.lock().timers.contains_key(key)
    }

    fn release(&self, key: &TimerKey, token: u64) -> bool {
        let mut inner = self.lock();
        match inner.timers.get(key) {
            Some(scheduled) if scheduled.token == token => {
                inner.timers.remove(key);
                true
            }
            _ => false,
        }
    }
}
