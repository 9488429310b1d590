//! Per-module typed publish/subscribe.
//!
//! A module declares its events as one enum implementing [`BusEvent`]; the
//! associated `Kind` is the fieldless enum of event names that listeners
//! subscribe to.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

/// An event carried by an [`EventBus`].
pub trait BusEvent: Send + Sync + 'static {
    type Kind: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static;

    fn kind(&self) -> Self::Kind;
}

type Handler<E> = Arc<dyn Fn(&E) -> anyhow::Result<()> + Send + Sync>;

struct Listener<E> {
    id: u64,
    handler: Handler<E>,
    once: bool,
}

struct BusInner<E: BusEvent> {
    owner: &'static str,
    next_id: AtomicU64,
    listeners: Mutex<HashMap<E::Kind, Vec<Listener<E>>>>,
}

impl<E: BusEvent> BusInner<E> {
    fn remove(&self, kind: E::Kind, id: u64) -> bool {
        let mut listeners = self.listeners.lock();
        let Some(list) = listeners.get_mut(&kind) else {
            return false;
        };
        let before = list.len();
        list.retain(|l| l.id != id);
        before != list.len()
    }
}

/// Typed event bus owned by one module.
pub struct EventBus<E: BusEvent> {
    inner: Arc<BusInner<E>>,
}

impl<E: BusEvent> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.inner.listeners.lock();
        let counts: Vec<_> = listeners.iter().map(|(k, v)| (*k, v.len())).collect();
        f.debug_struct("EventBus")
            .field("owner", &self.inner.owner)
            .field("listeners", &counts)
            .finish()
    }
}

impl<E: BusEvent> EventBus<E> {
    /// `owner` is only used to tag log records.
    pub fn new(owner: &'static str) -> Self {
        Self {
            inner: Arc::new(BusInner {
                owner,
                next_id: AtomicU64::new(0),
                listeners: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn owner(&self) -> &'static str {
        self.inner.owner
    }

    /// Subscribe `handler` to `kind`. Keep the returned [`Disposer`] to unsubscribe;
    /// dropping it leaves the handler registered.
    pub fn listen<F>(&self, kind: E::Kind, handler: F) -> Disposer<E>
    where
        F: Fn(&E) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.add(kind, Arc::new(handler), false)
    }

    /// Like [`EventBus::listen`], but the handler is removed before its first invocation.
    pub fn once<F>(&self, kind: E::Kind, handler: F) -> Disposer<E>
    where
        F: Fn(&E) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.add(kind, Arc::new(handler), true)
    }

    fn add(&self, kind: E::Kind, handler: Handler<E>, once: bool) -> Disposer<E> {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .listeners
            .lock()
            .entry(kind)
            .or_default()
            .push(Listener { id, handler, once });
        Disposer {
            kind,
            id,
            bus: Arc::downgrade(&self.inner),
        }
    }

    /// Invoke every listener of `event.kind()` in registration order and
    /// return how many ran.
    ///
    /// A listener that fails or panics is logged and skipped; the remaining
    /// listeners still run. Listeners added or disposed while emitting take
    /// effect from the next emission.
    pub fn emit(&self, event: E) -> usize {
        let kind = event.kind();
        let snapshot: Vec<(u64, Handler<E>)> = {
            let mut listeners = self.inner.listeners.lock();
            let Some(list) = listeners.get_mut(&kind) else {
                return 0;
            };
            let snapshot = list.iter().map(|l| (l.id, l.handler.clone())).collect();
            list.retain(|l| !l.once);
            snapshot
        };

        tracing::trace!(
            module = self.inner.owner,
            event = ?kind,
            listeners = snapshot.len(),
            "Emitting event"
        );

        for (id, handler) in &snapshot {
            match catch_unwind(AssertUnwindSafe(|| handler(&event))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    tracing::warn!(
                        module = self.inner.owner,
                        event = ?kind,
                        listener = id,
                        error = %err,
                        "Event listener failed"
                    );
                }
                Err(panic) => {
                    tracing::warn!(
                        module = self.inner.owner,
                        event = ?kind,
                        listener = id,
                        panic = panic_message(panic.as_ref()),
                        "Event listener panicked"
                    );
                }
            }
        }

        snapshot.len()
    }

    pub fn listener_count(&self, kind: E::Kind) -> usize {
        self.inner
            .listeners
            .lock()
            .get(&kind)
            .map_or(0, |list| list.len())
    }

    /// Remove every listener of every event.
    pub fn clear(&self) {
        self.inner.listeners.lock().clear();
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}

/// Handle returned by [`EventBus::listen`].
#[must_use = "dropping a Disposer does not unsubscribe; keep it to call dispose()"]
pub struct Disposer<E: BusEvent> {
    kind: E::Kind,
    id: u64,
    bus: Weak<BusInner<E>>,
}

impl<E: BusEvent> Disposer<E> {
    /// Unsubscribe. Returns `false` if the listener was already gone
    /// (a fired `once` listener, a cleared bus, or a dropped bus).
    pub fn dispose(self) -> bool {
        self.bus
            .upgrade()
            .is_some_and(|bus| bus.remove(self.kind, self.id))
    }
}

impl<E: BusEvent> fmt::Debug for Disposer<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disposer")
            .field("kind", &self.kind)
            .field("id", &self.id)
            .finish()
    }
}
