//! Keeps a session's messages fresh while the backend is working on it.
//!
//! One loop per session: fetch, apply to the store, and if the status is
//! still `pending`/`processing` wait one interval and go again. `idle` and
//! `failed` end the loop. In stream mode the loop first follows the
//! session's event stream and only falls back to interval fetching when the
//! stream is unavailable or ends while the session is still active.

use crate::backend::AgentBackend;
use crate::config::{PollConfig, SyncMode};
use crate::error::ClientError;
use crate::store::{ChatSessionsStore, NotificationLevel};
use futures_util::StreamExt;
use shared_types::{MessagesResponse, SessionStatus};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStart {
    Started,
    /// A loop for this session was already running and was left alone
    AlreadyRunning,
    /// A stopped loop is still waiting on its last fetch; it starts over
    /// once that fetch returns
    Queued,
    /// The controller was shut down
    Closed,
}

#[derive(Default)]
struct SessionPoll {
    in_flight: AtomicBool,
    stopped: AtomicBool,
    wake: Notify,
    task: Mutex<Option<JoinHandle<()>>>,
    /// Held for every fetch of this session, inside or outside the loop
    fetching: tokio::sync::Mutex<()>,
    /// Start requested while a stopped loop was winding down, with its
    /// `delay_first`
    restart: Mutex<Option<bool>>,
}

impl SessionPoll {
    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    fn stop(&self) {
        self.queue_restart(None);
        self.stopped.store(true, Ordering::Release);
        self.wake.notify_waiters();
    }

    fn try_claim(&self) -> bool {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn queue_restart(&self, delay_first: Option<bool>) -> Option<bool> {
        let mut restart = self.restart.lock().unwrap_or_else(|p| p.into_inner());
        std::mem::replace(&mut *restart, delay_first)
    }

    /// Sleeps for `delay` unless stopped first. Returns false when stopped.
    async fn wait(&self, delay: std::time::Duration) -> bool {
        let notified = self.wake.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if self.is_stopped() {
            return false;
        }
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = &mut notified => {}
        }
        !self.is_stopped()
    }
}

enum StreamEnd {
    /// Session settled or the loop was stopped
    Done,
    FallBack,
}

struct PollInner {
    backend: Arc<dyn AgentBackend>,
    store: ChatSessionsStore,
    config: PollConfig,
    sessions: Mutex<HashMap<String, Arc<SessionPoll>>>,
    closed: AtomicBool,
}

/// Owns every per-session poll loop
#[derive(Clone)]
pub struct PollController {
    inner: Arc<PollInner>,
}

impl PollController {
    pub fn new(backend: Arc<dyn AgentBackend>, store: ChatSessionsStore, config: PollConfig) -> Self {
        Self {
            inner: Arc::new(PollInner {
                backend,
                store,
                config,
                sessions: Mutex::new(HashMap::new()),
                closed: AtomicBool::new(false),
            }),
        }
    }

    fn handle(&self, session_id: &str) -> Arc<SessionPoll> {
        let mut sessions = self
            .inner
            .sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        sessions.entry(session_id.to_string()).or_default().clone()
    }

    pub fn is_polling(&self, session_id: &str) -> bool {
        let sessions = self
            .inner
            .sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        sessions
            .get(session_id)
            .is_some_and(|h| h.in_flight.load(Ordering::Acquire) && !h.is_stopped())
    }

    /// Starts a loop that fetches immediately
    pub async fn start_polling(&self, session_id: &str) -> PollStart {
        self.start(session_id, false).await
    }

    /// Starts a loop whose first fetch happens one interval from now, for
    /// callers that have just fetched themselves
    pub async fn resume_polling(&self, session_id: &str) -> PollStart {
        self.start(session_id, true).await
    }

    async fn start(&self, session_id: &str, delay_first: bool) -> PollStart {
        if self.inner.closed.load(Ordering::Acquire) {
            return PollStart::Closed;
        }
        let handle = self.handle(session_id);

        for attempt in 0..=self.inner.config.reentry_checks {
            if handle.try_claim() {
                self.spawn(session_id, &handle, delay_first);
                return PollStart::Started;
            }
            if handle.is_stopped() {
                // The old loop checks for a queued restart after releasing
                // `in_flight`, so either this claim or the old loop's wins.
                handle.queue_restart(Some(delay_first));
                if handle.try_claim() {
                    handle.queue_restart(None);
                    self.spawn(session_id, &handle, delay_first);
                    return PollStart::Started;
                }
                debug!(session_id = %session_id, "Poll loop restart queued");
                return PollStart::Queued;
            }
            if attempt < self.inner.config.reentry_checks {
                tokio::time::sleep(self.inner.config.reentry_wait()).await;
            }
        }

        debug!(session_id = %session_id, "Poll loop already running");
        PollStart::AlreadyRunning
    }

    fn spawn(&self, session_id: &str, handle: &Arc<SessionPoll>, delay_first: bool) {
        handle.stopped.store(false, Ordering::Release);
        let task = tokio::spawn(run_loop(
            self.inner.clone(),
            session_id.to_string(),
            handle.clone(),
            delay_first,
        ));
        *handle.task.lock().unwrap_or_else(|p| p.into_inner()) = Some(task);
        debug!(session_id = %session_id, "Poll loop started");
    }

    /// Stops the session's loop. A fetch already on the wire finishes but
    /// its result is discarded.
    pub fn stop(&self, session_id: &str) {
        let sessions = self
            .inner
            .sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(handle) = sessions.get(session_id) {
            handle.stop();
            debug!(session_id = %session_id, "Poll loop stop requested");
        }
    }

    /// Stops and aborts every loop. Later starts are refused.
    pub fn shutdown(&self) {
        self.inner.closed.store(true, Ordering::Release);
        let sessions = self
            .inner
            .sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for handle in sessions.values() {
            handle.stop();
            if let Some(task) = handle.task.lock().unwrap_or_else(|p| p.into_inner()).take() {
                task.abort();
            }
        }
        info!(count = sessions.len(), "Poll controller shut down");
    }

    /// One fetch applied to the store. Waits for a fetch the session's loop
    /// has on the wire.
    pub async fn refresh_once(&self, session_id: &str) -> Result<SessionStatus, ClientError> {
        let handle = self.handle(session_id);
        let _fetching = handle.fetching.lock().await;
        let response = self.inner.fetch(session_id).await?;
        Ok(self.inner.store.apply_fetch(session_id, response).await)
    }

    /// Initial mount: a single status check, and polling if the session is
    /// already being worked on
    pub async fn open_session(&self, session_id: &str) -> Result<SessionStatus, ClientError> {
        let status = match self.refresh_once(session_id).await {
            Ok(status) => status,
            Err(e) => {
                self.inner
                    .store
                    .notify(NotificationLevel::Error, format!("Failed to load messages: {}", e));
                return Err(e);
            }
        };
        if status.is_active() {
            info!(session_id = %session_id, status = %status, "Session busy on open, polling");
            self.resume_polling(session_id).await;
        }
        Ok(status)
    }

    /// Asks the backend to stop, then re-fetches twice so that the final
    /// status is picked up
    pub async fn cancel(&self, session_id: &str) -> Result<SessionStatus, ClientError> {
        let store = &self.inner.store;
        if let Err(e) = self.inner.backend.cancel(session_id).await {
            store.notify(NotificationLevel::Error, format!("Failed to cancel: {}", e));
            return Err(e);
        }
        self.stop(session_id);

        let result = async {
            self.refresh_once(session_id).await?;
            tokio::time::sleep(self.inner.config.cancel_refetch_delay()).await;
            self.refresh_once(session_id).await
        }
        .await;
        store.set_loading(session_id, false).await;

        match result {
            Ok(status) => {
                info!(session_id = %session_id, status = %status, "Session cancelled");
                Ok(status)
            }
            Err(e) => {
                store.notify(NotificationLevel::Error, format!("Failed to refresh session: {}", e));
                Err(e)
            }
        }
    }
}

impl PollInner {
    async fn fetch(&self, session_id: &str) -> Result<MessagesResponse, ClientError> {
        self.backend
            .fetch_messages(session_id, self.config.message_limit)
            .await
    }

    /// Fetch for a running loop. `None` when the loop was stopped while the
    /// request was on the wire, in which case nothing is applied.
    async fn loop_fetch(
        &self,
        session_id: &str,
        handle: &SessionPoll,
    ) -> Option<Result<SessionStatus, ClientError>> {
        let _fetching = handle.fetching.lock().await;
        if handle.is_stopped() {
            return None;
        }
        let result = self.fetch(session_id).await;
        if handle.is_stopped() {
            return None;
        }
        Some(match result {
            Ok(response) => Ok(self.store.apply_fetch(session_id, response).await),
            Err(e) => Err(e),
        })
    }

    /// Follows the event stream, re-fetching on every event
    async fn follow_stream(&self, session_id: &str, handle: &SessionPoll) -> StreamEnd {
        let mut events = match self.backend.stream_events(session_id).await {
            Ok(events) => events,
            Err(e) => {
                debug!(session_id = %session_id, error = %e, "Event stream unavailable, polling instead");
                return StreamEnd::FallBack;
            }
        };

        loop {
            let notified = handle.wake.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if handle.is_stopped() {
                return StreamEnd::Done;
            }

            let next = tokio::select! {
                next = events.next() => next,
                _ = &mut notified => return StreamEnd::Done,
            };

            let finished = match next {
                Some(Ok(event)) => event.is_final(),
                Some(Err(e)) => {
                    warn!(session_id = %session_id, error = %e, "Event stream error");
                    true
                }
                None => true,
            };

            match self.loop_fetch(session_id, handle).await {
                None => return StreamEnd::Done,
                Some(Ok(status)) if finished || !status.is_active() => {
                    return if status.is_active() {
                        StreamEnd::FallBack
                    } else {
                        StreamEnd::Done
                    };
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    self.fetch_failed(session_id, &e);
                    return StreamEnd::Done;
                }
            }
        }
    }

    fn fetch_failed(&self, session_id: &str, error: &ClientError) {
        warn!(session_id = %session_id, error = %error, "Fetch failed, polling stopped");
        self.store.notify(
            NotificationLevel::Error,
            format!("Failed to refresh session: {}", error),
        );
    }
}

async fn run_loop(
    inner: Arc<PollInner>,
    session_id: String,
    handle: Arc<SessionPoll>,
    mut delay_first: bool,
) {
    loop {
        inner.store.set_loading(&session_id, true).await;

        let streamed =
            inner.config.sync_mode == SyncMode::Stream && inner.backend.supports_streaming();
        let follow_up = if streamed {
            matches!(
                inner.follow_stream(&session_id, &handle).await,
                StreamEnd::FallBack
            )
        } else {
            true
        };

        if follow_up && (!delay_first || handle.wait(inner.config.interval()).await) {
            poll(&inner, &session_id, &handle).await;
        }

        inner.store.set_loading(&session_id, false).await;
        handle.in_flight.store(false, Ordering::Release);

        let Some(delay) = handle.queue_restart(None) else {
            break;
        };
        if inner.closed.load(Ordering::Acquire) || !handle.try_claim() {
            break;
        }
        debug!(session_id = %session_id, "Poll loop restarted");
        handle.stopped.store(false, Ordering::Release);
        delay_first = delay;
    }
    debug!(session_id = %session_id, "Poll loop finished");
}

async fn poll(inner: &PollInner, session_id: &str, handle: &SessionPoll) {
    loop {
        if handle.is_stopped() {
            return;
        }
        match inner.loop_fetch(session_id, handle).await {
            None => return,
            Some(Ok(status)) if status.is_active() => {}
            Some(Ok(status)) => {
                info!(session_id = %session_id, status = %status, "Session settled");
                return;
            }
            Some(Err(e)) => {
                inner.fetch_failed(session_id, &e);
                return;
            }
        }

        if !handle.wait(inner.config.interval()).await {
            return;
        }
    }
}
