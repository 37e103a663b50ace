//! Autosave worker - Debounces edits and persists them in order.
//!
//! A single tokio task owns the queue. Content changes restart a debounce
//! timer; when it fires the newest snapshot becomes a save operation at the
//! back of a bounded FIFO queue. Only the front operation is ever sent and at
//! most one request is in flight, so an older snapshot never lands after a
//! newer one.

use crate::config::AutosaveConfig;
use crate::messages::{
    AutosaveError, AutosaveEvent, AutosaveMessage, AutosaveStatus, FlushReply, PipelineState,
};
use crate::store::{NoteDraft, NoteStore, SavedNote, StoreError};
use crossbeam_channel::{Receiver, Sender};
use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::thread;
use std::time::SystemTime;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{self, Instant};
use uuid::Uuid;

type SaveResult = (Uuid, Result<SavedNote, StoreError>);

/// A snapshot waiting to be persisted.
#[derive(Debug, Clone)]
struct SaveOperation {
    id: Uuid,
    draft: NoteDraft,
    queued_at: Instant,
    /// Attempts started so far.
    attempts: u32,
    /// Earliest start of the next attempt after a failure.
    not_before: Option<Instant>,
}

impl SaveOperation {
    fn new(draft: NoteDraft) -> Self {
        Self {
            id: Uuid::new_v4(),
            draft,
            queued_at: Instant::now(),
            attempts: 0,
            not_before: None,
        }
    }
}

/// An outstanding flush request.
#[derive(Default)]
struct Flush {
    waiters: Vec<FlushReply>,
    /// Snapshot still to be sent.
    draft: Option<NoteDraft>,
    /// In-flight operation that already carries `draft`.
    covered_by: Option<Uuid>,
    /// Id of the flush request itself once sent.
    sent: Option<Uuid>,
    error: Option<String>,
}

/// Handle for feeding the worker. Cheap to clone.
#[derive(Clone)]
pub struct AutosaveHandle {
    tx: mpsc::UnboundedSender<AutosaveMessage>,
}

impl AutosaveHandle {
    /// Reports a new snapshot of the note. Returns false if the worker has
    /// stopped.
    pub fn content_changed(&self, draft: NoteDraft) -> bool {
        self.send(AutosaveMessage::ContentChanged(draft))
    }

    /// Asks the worker to flush without waiting for the outcome.
    pub fn request_flush(&self) -> bool {
        self.send(AutosaveMessage::Flush(None))
    }

    /// Persists the newest snapshot now, ignoring the debounce timer and the
    /// minimum interval. Waits for any request already in flight first.
    pub async fn flush(&self) -> Result<(), AutosaveError> {
        let (tx, rx) = oneshot::channel();
        if !self.send(AutosaveMessage::Flush(Some(tx))) {
            return Err(AutosaveError::Stopped);
        }
        rx.await.unwrap_or(Err(AutosaveError::Stopped))
    }

    /// Flushes and stops the worker.
    pub async fn shutdown(&self) -> Result<(), AutosaveError> {
        let (tx, rx) = oneshot::channel();
        if !self.send(AutosaveMessage::Shutdown(tx)) {
            return Err(AutosaveError::Stopped);
        }
        rx.await.unwrap_or(Err(AutosaveError::Stopped))
    }

    /// Blocking [`shutdown`](Self::shutdown) for synchronous hosts.
    ///
    /// Must not be called from inside an async runtime.
    pub fn shutdown_blocking(&self) -> Result<(), AutosaveError> {
        let (tx, rx) = oneshot::channel();
        if !self.send(AutosaveMessage::Shutdown(tx)) {
            return Err(AutosaveError::Stopped);
        }
        rx.blocking_recv().unwrap_or(Err(AutosaveError::Stopped))
    }

    /// Returns whether the worker is still accepting messages.
    pub fn is_running(&self) -> bool {
        !self.tx.is_closed()
    }

    fn send(&self, message: AutosaveMessage) -> bool {
        if self.tx.send(message).is_err() {
            log::debug!("Autosave worker has stopped, message dropped");
            return false;
        }
        true
    }
}

/// The autosave pipeline for one note.
pub struct Autosave {
    handle: AutosaveHandle,
    event_rx: Receiver<AutosaveEvent>,
    status_rx: watch::Receiver<AutosaveStatus>,
}

impl Autosave {
    /// Starts the pipeline on a dedicated thread with its own runtime.
    pub fn start(
        note_id: impl Into<String>,
        store: Arc<dyn NoteStore>,
        config: AutosaveConfig,
    ) -> io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let (autosave, worker) = Self::build(note_id.into(), store, config);

        thread::Builder::new()
            .name("autosave".to_string())
            .spawn(move || runtime.block_on(worker.run()))?;

        Ok(autosave)
    }

    /// Starts the pipeline as a task on an existing runtime.
    pub fn spawn_on(
        runtime: &Handle,
        note_id: impl Into<String>,
        store: Arc<dyn NoteStore>,
        config: AutosaveConfig,
    ) -> Self {
        let (autosave, worker) = Self::build(note_id.into(), store, config);
        runtime.spawn(worker.run());
        autosave
    }

    fn build(note_id: String, store: Arc<dyn NoteStore>, config: AutosaveConfig) -> (Self, Worker) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = crossbeam_channel::unbounded();
        let (status_tx, status_rx) = watch::channel(AutosaveStatus::default());

        let worker = Worker {
            note_id,
            config: config.normalized(),
            store,
            rx,
            done_tx,
            done_rx,
            event_tx,
            status_tx,
            pending: None,
            debounce_deadline: None,
            queue: VecDeque::new(),
            in_flight: None,
            flush: None,
            last_success: None,
            last_saved_at: None,
            last_error: None,
            errored: false,
            has_unsaved_changes: false,
            latest: None,
        };
        let autosave = Self {
            handle: AutosaveHandle { tx },
            event_rx,
            status_rx,
        };
        (autosave, worker)
    }

    /// Returns a handle for sending snapshots.
    pub fn handle(&self) -> AutosaveHandle {
        self.handle.clone()
    }

    /// Tries to receive an event (non-blocking).
    pub fn try_recv_event(&self) -> Option<AutosaveEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Returns the latest published status.
    pub fn status(&self) -> AutosaveStatus {
        self.status_rx.borrow().clone()
    }

    /// Returns a receiver that is woken whenever the status changes.
    pub fn watch_status(&self) -> watch::Receiver<AutosaveStatus> {
        self.status_rx.clone()
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

struct Worker {
    note_id: String,
    config: AutosaveConfig,
    store: Arc<dyn NoteStore>,
    rx: mpsc::UnboundedReceiver<AutosaveMessage>,
    done_tx: mpsc::UnboundedSender<SaveResult>,
    done_rx: mpsc::UnboundedReceiver<SaveResult>,
    event_tx: Sender<AutosaveEvent>,
    status_tx: watch::Sender<AutosaveStatus>,
    /// Newest snapshot of the edit burst being debounced.
    pending: Option<NoteDraft>,
    debounce_deadline: Option<Instant>,
    queue: VecDeque<SaveOperation>,
    in_flight: Option<Uuid>,
    flush: Option<Flush>,
    /// When the last successful save completed, for throttling.
    last_success: Option<Instant>,
    last_saved_at: Option<SystemTime>,
    last_error: Option<String>,
    /// An operation was dropped and nothing has been saved since.
    errored: bool,
    has_unsaved_changes: bool,
    /// Newest snapshot received. Kept until everything is saved so a flush
    /// can still send it after its operation was dropped.
    latest: Option<NoteDraft>,
}

impl Worker {
    async fn run(mut self) {
        log::info!("Autosave started for note {}", self.note_id);
        let mut stopping = false;
        let mut closed = false;

        loop {
            let finished = self.advance_flush();
            self.publish();
            if let Some((waiters, result)) = finished {
                for waiter in waiters {
                    let _ = waiter.send(result.clone());
                }
            }
            if stopping && self.flush.is_none() && self.in_flight.is_none() {
                break;
            }

            let debounce_at = self.debounce_deadline;
            let dispatch_at = self.next_dispatch_at();
            tokio::select! {
                message = self.rx.recv(), if !closed => match message {
                    Some(AutosaveMessage::ContentChanged(draft)) => self.on_content_changed(draft),
                    Some(AutosaveMessage::Flush(reply)) => self.begin_flush(reply),
                    Some(AutosaveMessage::Shutdown(reply)) => {
                        stopping = true;
                        self.begin_flush(Some(reply));
                    }
                    None => {
                        closed = true;
                        stopping = true;
                        self.begin_flush(None);
                    }
                },
                Some((id, result)) = self.done_rx.recv() => self.on_save_finished(id, result),
                () = sleep_until_opt(debounce_at) => self.on_debounce_elapsed(),
                () = sleep_until_opt(dispatch_at) => self.dispatch_front(),
            }
        }

        if self.pending.is_some() || !self.queue.is_empty() {
            log::warn!("Autosave for note {} stopped with unsaved edits", self.note_id);
        }
        log::info!("Autosave stopped for note {}", self.note_id);
    }

    fn on_content_changed(&mut self, draft: NoteDraft) {
        self.latest = Some(draft.clone());
        self.pending = Some(draft);
        self.has_unsaved_changes = true;
        self.debounce_deadline = Some(Instant::now() + self.config.debounce());
    }

    fn on_debounce_elapsed(&mut self) {
        self.debounce_deadline = None;
        let Some(draft) = self.pending.take() else {
            return;
        };
        let operation = SaveOperation::new(draft);
        log::debug!("Queued save operation {}", operation.id);
        self.queue.push_back(operation);

        // Only operations never sent are evicted, and never the one just
        // queued.
        while self.queue.len() > self.config.max_queue {
            let in_flight = self.in_flight;
            let newest = self.queue.len() - 1;
            let Some(index) = self
                .queue
                .iter()
                .take(newest)
                .position(|op| op.attempts == 0 && Some(op.id) != in_flight)
            else {
                break;
            };
            if let Some(evicted) = self.queue.remove(index) {
                log::warn!(
                    "Autosave queue full, dropping operation {} queued {:?} ago",
                    evicted.id,
                    evicted.queued_at.elapsed()
                );
                self.emit(AutosaveEvent::Evicted {
                    operation: evicted.id,
                });
            }
        }
    }

    /// When the front operation may be sent, if it may be sent at all.
    fn next_dispatch_at(&self) -> Option<Instant> {
        if self.in_flight.is_some() || self.flush.is_some() {
            return None;
        }
        let front = self.queue.front()?;
        let throttle = self
            .last_success
            .map(|at| at + self.config.min_interval());
        Some(
            [front.not_before, throttle]
                .into_iter()
                .flatten()
                .max()
                .unwrap_or_else(Instant::now),
        )
    }

    fn dispatch_front(&mut self) {
        let Some(operation) = self.queue.front_mut() else {
            return;
        };
        operation.attempts += 1;
        operation.not_before = None;
        let (id, draft, attempt) = (operation.id, operation.draft.clone(), operation.attempts);
        self.start_request(id, draft, attempt);
    }

    fn start_request(&mut self, id: Uuid, draft: NoteDraft, attempt: u32) {
        log::debug!(
            "Saving note {} (operation {}, attempt {})",
            self.note_id,
            id,
            attempt
        );
        self.in_flight = Some(id);
        self.emit(AutosaveEvent::Saving {
            operation: id,
            attempt,
        });

        let store = Arc::clone(&self.store);
        let note_id = self.note_id.clone();
        let done = self.done_tx.clone();
        tokio::spawn(async move {
            let result = store.save(&note_id, &draft).await;
            let _ = done.send((id, result));
        });
    }

    fn on_save_finished(&mut self, id: Uuid, result: Result<SavedNote, StoreError>) {
        if self.in_flight == Some(id) {
            self.in_flight = None;
        }
        let is_flush = self
            .flush
            .as_ref()
            .is_some_and(|flush| flush.sent == Some(id));

        match result {
            Ok(note) => {
                if !is_flush {
                    if self.queue.front().map(|op| op.id) == Some(id) {
                        self.queue.pop_front();
                    } else {
                        log::warn!("Saved operation {} is not at the front of the queue", id);
                    }
                }
                if let Some(flush) = self.flush.as_mut() {
                    if flush.covered_by == Some(id) {
                        flush.draft = None;
                    }
                }

                log::info!("Saved note {}", self.note_id);
                self.last_success = Some(Instant::now());
                self.last_saved_at = Some(note.saved_at);
                self.last_error = None;
                self.errored = false;
                let flush_done = self
                    .flush
                    .as_ref()
                    .map_or(true, |flush| flush.draft.is_none());
                if self.pending.is_none() && self.queue.is_empty() && flush_done {
                    self.has_unsaved_changes = false;
                    self.latest = None;
                }
                self.emit(AutosaveEvent::Saved {
                    operation: id,
                    note,
                });
            }
            Err(e) if is_flush => {
                let error = e.to_string();
                log::error!("Final save of note {} failed: {}", self.note_id, error);
                if let Some(flush) = self.flush.as_mut() {
                    flush.error = Some(error.clone());
                }
                self.last_error = Some(error.clone());
                self.errored = true;
                self.emit(AutosaveEvent::Failed {
                    operation: id,
                    attempt: 1,
                    error,
                    will_retry: false,
                });
            }
            Err(e) => self.on_save_failed(id, e),
        }
    }

    fn on_save_failed(&mut self, id: Uuid, e: StoreError) {
        let error = e.to_string();
        let flushing = self.flush.is_some();
        let Some(operation) = self.queue.iter_mut().find(|op| op.id == id) else {
            log::warn!("Failed operation {} is no longer queued", id);
            return;
        };

        let attempt = operation.attempts;
        // A pending flush sends the newest snapshot itself.
        let will_retry = !flushing && attempt < self.config.max_attempts;
        if will_retry {
            let delay = self.config.retry_delay(attempt);
            operation.not_before = Some(Instant::now() + delay);
            log::warn!(
                "Save attempt {} for note {} failed: {}; retrying in {:?}",
                attempt,
                self.note_id,
                error,
                delay
            );
        } else {
            self.queue.retain(|op| op.id != id);
            if !flushing {
                self.errored = true;
                log::error!(
                    "Giving up on operation {} for note {} after {} attempts: {}",
                    id,
                    self.note_id,
                    attempt,
                    error
                );
            }
        }

        self.last_error = Some(error.clone());
        self.emit(AutosaveEvent::Failed {
            operation: id,
            attempt,
            error,
            will_retry,
        });
    }

    fn begin_flush(&mut self, reply: Option<FlushReply>) {
        self.debounce_deadline = None;
        let in_flight = self.in_flight;
        let newest = match self.pending.take() {
            Some(draft) => Some((draft, None)),
            None => match self.queue.back() {
                Some(op) => Some((op.draft.clone(), Some(op.id).filter(|id| Some(*id) == in_flight))),
                // Dropped after its last retry, or a previous flush failed.
                None if in_flight.is_none() && self.has_unsaved_changes => {
                    self.latest.clone().map(|draft| (draft, None))
                }
                None => None,
            },
        };
        // Everything still queued is older than the newest snapshot.
        self.queue.retain(|op| Some(op.id) == in_flight);

        let flush = self.flush.get_or_insert_with(Flush::default);
        if let Some((draft, covered_by)) = newest {
            flush.draft = Some(draft);
            flush.covered_by = covered_by;
        }
        flush.waiters.extend(reply);
        log::debug!("Flush requested for note {}", self.note_id);
    }

    /// Sends the flush snapshot once nothing is in flight. When there is
    /// nothing left to send, ends the flush and returns its waiters.
    fn advance_flush(&mut self) -> Option<(Vec<FlushReply>, Result<(), AutosaveError>)> {
        if self.in_flight.is_some() {
            return None;
        }
        let flush = self.flush.as_mut()?;
        if let Some(draft) = flush.draft.take() {
            let id = Uuid::new_v4();
            flush.sent = Some(id);
            flush.covered_by = None;
            self.start_request(id, draft, 1);
            return None;
        }

        let flush = self.flush.take()?;
        let result = match flush.error {
            Some(error) => Err(AutosaveError::SaveFailed(error)),
            None => Ok(()),
        };
        Some((flush.waiters, result))
    }

    fn state(&self) -> PipelineState {
        if self.in_flight.is_some() {
            return PipelineState::Saving;
        }
        match self.queue.front() {
            Some(op) if op.attempts > 0 => PipelineState::Retrying {
                attempt: op.attempts,
            },
            Some(_) => PipelineState::Queued,
            None if self.pending.is_some() => PipelineState::Debouncing,
            None if self.errored => PipelineState::Error,
            None => PipelineState::Idle,
        }
    }

    fn publish(&self) {
        let status = AutosaveStatus {
            state: self.state(),
            has_unsaved_changes: self.has_unsaved_changes,
            last_saved_at: self.last_saved_at,
            last_error: self.last_error.clone(),
            queued: self.queue.len(),
        };
        let changed = self.status_tx.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            *current = status.clone();
            true
        });
        if changed {
            log::debug!("Autosave state: {:?}", status.state);
            self.emit(AutosaveEvent::StatusChanged(status));
        }
    }

    fn emit(&self, event: AutosaveEvent) {
        let _ = self.event_tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// In-memory store with scripted latency and failures.
    #[derive(Default)]
    struct ScriptedStore {
        calls: Mutex<Vec<Instant>>,
        saves: Mutex<Vec<(Instant, String)>>,
        delays: Mutex<VecDeque<Duration>>,
        failures: AtomicUsize,
    }

    impl ScriptedStore {
        fn with_delays(delays: &[u64]) -> Arc<Self> {
            let store = Self::default();
            *store.delays.lock().unwrap() = delays.iter().map(|ms| Duration::from_millis(*ms)).collect();
            Arc::new(store)
        }

        fn failing(times: usize) -> Arc<Self> {
            let store = Self::default();
            store.failures.store(times, Ordering::SeqCst);
            Arc::new(store)
        }

        fn calls(&self) -> Vec<Instant> {
            self.calls.lock().unwrap().clone()
        }

        fn saves(&self) -> Vec<(Instant, String)> {
            self.saves.lock().unwrap().clone()
        }

        fn contents(&self) -> Vec<String> {
            self.saves().into_iter().map(|(_, content)| content).collect()
        }
    }

    #[async_trait]
    impl NoteStore for ScriptedStore {
        async fn save(&self, note_id: &str, draft: &NoteDraft) -> Result<SavedNote, StoreError> {
            self.calls.lock().unwrap().push(Instant::now());
            let delay = self.delays.lock().unwrap().pop_front().unwrap_or_default();
            time::sleep(delay).await;

            let failing = self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                return Err(StoreError::Unavailable);
            }
            self.saves
                .lock()
                .unwrap()
                .push((Instant::now(), draft.content.clone()));
            Ok(SavedNote {
                note_id: note_id.to_string(),
                saved_at: SystemTime::now(),
            })
        }
    }

    fn spawn(store: Arc<ScriptedStore>) -> Autosave {
        spawn_with(store, AutosaveConfig::default())
    }

    fn spawn_with(store: Arc<ScriptedStore>, config: AutosaveConfig) -> Autosave {
        Autosave::spawn_on(&Handle::current(), "note", store, config)
    }

    fn draft(content: &str) -> NoteDraft {
        NoteDraft::from_content(content)
    }

    fn ms(from: Instant, to: Instant) -> u128 {
        to.duration_since(from).as_millis()
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_is_debounced_into_one_save() {
        let store = ScriptedStore::with_delays(&[]);
        let autosave = spawn(store.clone());
        let handle = autosave.handle();
        let start = Instant::now();

        for i in 0..5 {
            handle.content_changed(draft(&format!("edit {i}")));
            time::sleep(Duration::from_millis(40)).await;
        }
        time::sleep(Duration::from_secs(5)).await;

        let saves = store.saves();
        assert_eq!(saves.len(), 1);
        assert_eq!(saves[0].1, "edit 4");
        let elapsed = ms(start, saves[0].0);
        assert!((1160..1200).contains(&elapsed), "saved after {elapsed}ms");

        let status = autosave.status();
        assert_eq!(status.state, PipelineState::Idle);
        assert!(!status.has_unsaved_changes);
        assert!(status.last_saved_at.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_save_keeps_order_and_interval() {
        let store = ScriptedStore::with_delays(&[3000]);
        let autosave = spawn(store.clone());
        let handle = autosave.handle();

        handle.content_changed(draft("first"));
        time::sleep(Duration::from_millis(1500)).await;
        handle.content_changed(draft("second"));
        time::sleep(Duration::from_secs(20)).await;

        assert_eq!(store.contents(), vec!["first", "second"]);
        let saves = store.saves();
        assert!(ms(saves[0].0, saves[1].0) >= 2000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_are_bounded() {
        let store = ScriptedStore::failing(usize::MAX);
        let autosave = spawn(store.clone());
        let start = Instant::now();

        autosave.handle().content_changed(draft("doomed"));
        time::sleep(Duration::from_secs(30)).await;

        let offsets: Vec<u128> = store.calls().into_iter().map(|at| ms(start, at)).collect();
        assert_eq!(offsets.len(), 3);
        for (offset, expected) in offsets.iter().zip([1000, 2000, 4000]) {
            assert!(offset.abs_diff(expected) < 50, "attempt at {offset}ms");
        }

        let status = autosave.status();
        assert_eq!(status.state, PipelineState::Error);
        assert!(status.has_unsaved_changes);
        assert_eq!(status.last_error.as_deref(), Some("store unavailable"));

        let mut dropped = false;
        while let Some(event) = autosave.try_recv_event() {
            if let AutosaveEvent::Failed {
                attempt: 3,
                will_retry: false,
                ..
            } = event
            {
                dropped = true;
            }
        }
        assert!(dropped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_saves_resume_after_dropped_operation() {
        let store = ScriptedStore::failing(3);
        let autosave = spawn(store.clone());
        let handle = autosave.handle();

        handle.content_changed(draft("doomed"));
        time::sleep(Duration::from_secs(30)).await;
        assert_eq!(autosave.status().state, PipelineState::Error);

        handle.content_changed(draft("fresh"));
        time::sleep(Duration::from_secs(10)).await;

        assert_eq!(store.contents(), vec!["fresh"]);
        let status = autosave.status();
        assert_eq!(status.state, PipelineState::Idle);
        assert!(!status.has_unsaved_changes);
        assert_eq!(status.last_error, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_after_exhausted_retries_saves() {
        let store = ScriptedStore::failing(3);
        let autosave = spawn(store.clone());
        let handle = autosave.handle();

        handle.content_changed(draft("latest edit"));
        time::sleep(Duration::from_secs(30)).await;
        let status = autosave.status();
        assert_eq!(status.state, PipelineState::Error);
        assert!(status.has_unsaved_changes);
        assert!(store.contents().is_empty());

        handle.shutdown().await.unwrap();
        assert_eq!(store.calls().len(), 4);
        assert_eq!(store.contents(), vec!["latest edit"]);
        assert!(!autosave.status().has_unsaved_changes);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_recovers() {
        let store = ScriptedStore::failing(1);
        let autosave = spawn(store.clone());

        autosave.handle().content_changed(draft("eventually"));
        time::sleep(Duration::from_secs(10)).await;

        assert_eq!(store.calls().len(), 2);
        assert_eq!(store.contents(), vec!["eventually"]);
        let status = autosave.status();
        assert_eq!(status.state, PipelineState::Idle);
        assert_eq!(status.last_error, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_queue_evicts_oldest_waiting() {
        let store = ScriptedStore::with_delays(&[10_000]);
        let autosave = spawn(store.clone());
        let handle = autosave.handle();

        for i in 0..7 {
            handle.content_changed(draft(&i.to_string()));
            time::sleep(Duration::from_millis(1100)).await;
        }
        time::sleep(Duration::from_secs(60)).await;

        assert_eq!(store.contents(), vec!["0", "3", "4", "5", "6"]);
        let mut evicted = 0;
        while let Some(event) = autosave.try_recv_event() {
            if matches!(event, AutosaveEvent::Evicted { .. }) {
                evicted += 1;
            }
        }
        assert_eq!(evicted, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_queue_keeps_operation_awaiting_retry() {
        let store = ScriptedStore::failing(1);
        let config = AutosaveConfig {
            retry_base_ms: 20_000,
            ..AutosaveConfig::default()
        };
        let autosave = spawn_with(store.clone(), config);
        let handle = autosave.handle();

        for i in 0..7 {
            handle.content_changed(draft(&i.to_string()));
            time::sleep(Duration::from_millis(1100)).await;
        }
        time::sleep(Duration::from_secs(60)).await;

        assert_eq!(store.contents(), vec!["0", "3", "4", "5", "6"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_skips_debounce() {
        let store = ScriptedStore::with_delays(&[]);
        let autosave = spawn(store.clone());
        let handle = autosave.handle();
        let start = Instant::now();

        handle.content_changed(draft("now"));
        handle.flush().await.unwrap();

        let saves = store.saves();
        assert_eq!(saves.len(), 1);
        assert!(ms(start, saves[0].0) < 50);

        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(store.saves().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_waits_for_in_flight_then_ignores_interval() {
        let store = ScriptedStore::with_delays(&[3000]);
        let autosave = spawn(store.clone());
        let handle = autosave.handle();

        handle.content_changed(draft("first"));
        time::sleep(Duration::from_millis(1100)).await;
        handle.content_changed(draft("second"));
        handle.flush().await.unwrap();

        let saves = store.saves();
        assert_eq!(store.contents(), vec!["first", "second"]);
        assert!(ms(saves[0].0, saves[1].0) < 2000);

        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(store.saves().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_when_clean_is_immediate() {
        let store = ScriptedStore::with_delays(&[]);
        let autosave = spawn(store.clone());
        autosave.handle().flush().await.unwrap();
        assert!(store.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_saves_and_stops() {
        let store = ScriptedStore::with_delays(&[]);
        let autosave = spawn(store.clone());
        let handle = autosave.handle();

        handle.content_changed(draft("last words"));
        handle.shutdown().await.unwrap();
        time::sleep(Duration::from_millis(10)).await;

        assert_eq!(store.contents(), vec!["last words"]);
        assert!(!handle.is_running());
        assert!(!handle.content_changed(draft("too late")));
        assert_eq!(handle.flush().await, Err(AutosaveError::Stopped));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_flush_reports_error() {
        let store = ScriptedStore::failing(1);
        let autosave = spawn(store.clone());
        let handle = autosave.handle();

        handle.content_changed(draft("unlucky"));
        let result = handle.flush().await;
        assert_eq!(
            result,
            Err(AutosaveError::SaveFailed("store unavailable".to_string()))
        );
    }
}
