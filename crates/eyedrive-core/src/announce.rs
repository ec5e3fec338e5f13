// Copyright 2025 EyeDrive Contributors
// SPDX-License-Identifier: Apache-2.0

//! Spoken announcements
//!
//! The speech engine is not reentrant, so every render happens inside the
//! [`AnnouncementGate`]'s exclusive section. The control loop never renders
//! directly: it hands requests to a [`SpeechWorker`], which serializes them
//! through the gate in FIFO order. A slow engine therefore stalls only the
//! worker.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use eyedrive_hal::SpeechSink;
use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, info, warn};

use crate::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Priority {
    /// May be evicted when the speech queue is full
    #[default]
    Normal,
    /// Obstacle related; never dropped, logged at warn level
    Safety,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnouncementRequest {
    pub text: String,
    pub priority: Priority,
}

impl AnnouncementRequest {
    pub fn normal(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            priority: Priority::Normal,
        }
    }

    pub fn safety(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            priority: Priority::Safety,
        }
    }
}

/// Exclusive section around a speech sink
pub struct AnnouncementGate<S: SpeechSink> {
    sink: Arc<Mutex<S>>,
}

impl<S: SpeechSink> Clone for AnnouncementGate<S> {
    fn clone(&self) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
        }
    }
}

impl<S: SpeechSink> AnnouncementGate<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink: Arc::new(Mutex::new(sink)),
        }
    }

    /// Render one announcement, waiting for any render in progress to finish
    pub fn announce(&self, request: &AnnouncementRequest) -> CoreResult<()> {
        let mut sink = self.sink.lock();
        Self::render(&mut *sink, request)
    }

    /// Like [`announce`](Self::announce) but gives up if the gate is still
    /// held after `wait`
    pub fn announce_within(&self, request: &AnnouncementRequest, wait: Duration) -> CoreResult<()> {
        let mut sink = self.sink.try_lock_for(wait).ok_or(CoreError::GateBusy {
            waited_ms: wait.as_millis() as u64,
        })?;
        Self::render(&mut *sink, request)
    }

    /// True when no render is in progress
    pub fn is_idle(&self) -> bool {
        !self.sink.is_locked()
    }

    /// Run `f` with exclusive access to the sink
    pub fn with_sink<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        f(&mut self.sink.lock())
    }

    fn render(sink: &mut S, request: &AnnouncementRequest) -> CoreResult<()> {
        match request.priority {
            Priority::Safety => warn!(target: "eyedrive_core", "Announcing: {}", request.text),
            Priority::Normal => info!(target: "eyedrive_core", "Announcing: {}", request.text),
        }
        sink.speak(&request.text)?;
        Ok(())
    }
}

/// Pending announcements plus the closed flag, guarded together
#[derive(Default)]
struct QueueState {
    pending: VecDeque<AnnouncementRequest>,
    closed: bool,
}

type SpeechQueue = Arc<(Mutex<QueueState>, Condvar)>;

/// Background speech thread fed by a bounded FIFO queue
///
/// When the queue is full the oldest [`Priority::Normal`] entry makes room
/// for the new request. Safety requests are never dropped; with no Normal
/// entry left to evict they are queued beyond the capacity, while a Normal
/// request is refused.
///
/// Dropping the worker (or calling [`shutdown`](Self::shutdown)) closes the
/// queue; announcements already queued are still spoken before the thread
/// exits.
pub struct SpeechWorker {
    queue: SpeechQueue,
    capacity: usize,
    handle: Option<JoinHandle<()>>,
    running: Arc<AtomicBool>,
    spoken: Arc<AtomicU64>,
    failed: Arc<AtomicU64>,
    dropped: AtomicU64,
}

impl SpeechWorker {
    pub fn spawn<S>(gate: AnnouncementGate<S>, capacity: usize) -> CoreResult<Self>
    where
        S: SpeechSink + Send + 'static,
    {
        let queue: SpeechQueue = Arc::new((Mutex::new(QueueState::default()), Condvar::new()));
        let running = Arc::new(AtomicBool::new(true));
        let spoken = Arc::new(AtomicU64::new(0));
        let failed = Arc::new(AtomicU64::new(0));

        let thread_queue = Arc::clone(&queue);
        let thread_running = Arc::clone(&running);
        let thread_spoken = Arc::clone(&spoken);
        let thread_failed = Arc::clone(&failed);

        let handle = thread::Builder::new()
            .name("eyedrive-speech".to_string())
            .spawn(move || {
                debug!(target: "eyedrive_core", "[SPEECH] Worker started");
                // Ends once the queue is closed and empty
                while let Some(request) = Self::next_request(&thread_queue) {
                    match gate.announce(&request) {
                        Ok(()) => {
                            thread_spoken.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(e) => {
                            thread_failed.fetch_add(1, Ordering::Relaxed);
                            error!(target: "eyedrive_core", "[SPEECH] Failed to speak '{}': {}", request.text, e);
                        }
                    }
                }
                thread_running.store(false, Ordering::Release);
                debug!(target: "eyedrive_core", "[SPEECH] Worker stopped");
            })
            .map_err(CoreError::WorkerSpawn)?;

        Ok(Self {
            queue,
            capacity: capacity.max(1),
            handle: Some(handle),
            running,
            spoken,
            failed,
            dropped: AtomicU64::new(0),
        })
    }

    fn next_request(queue: &SpeechQueue) -> Option<AnnouncementRequest> {
        let (lock, cvar) = &**queue;
        let mut state = lock.lock();
        loop {
            if let Some(request) = state.pending.pop_front() {
                return Some(request);
            }
            if state.closed {
                return None;
            }
            cvar.wait(&mut state);
        }
    }

    /// Queue an announcement without blocking
    pub fn dispatch(&self, request: AnnouncementRequest) -> CoreResult<()> {
        let (lock, cvar) = &*self.queue;
        let mut state = lock.lock();
        if state.closed {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return Err(CoreError::SpeechBacklog(format!(
                "worker shut down, dropped '{}'",
                request.text
            )));
        }

        if state.pending.len() >= self.capacity {
            let oldest_normal = state
                .pending
                .iter()
                .position(|queued| queued.priority == Priority::Normal);
            match oldest_normal.and_then(|index| state.pending.remove(index)) {
                Some(evicted) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    warn!(target: "eyedrive_core", "[SPEECH] Queue full, dropped '{}'", evicted.text);
                }
                None if request.priority == Priority::Normal => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    return Err(CoreError::SpeechBacklog(format!(
                        "queue full of safety announcements, dropped '{}'",
                        request.text
                    )));
                }
                None => {}
            }
        }

        state.pending.push_back(request);
        drop(state);
        cvar.notify_one();
        Ok(())
    }

    /// Announcements waiting to be spoken
    pub fn queued(&self) -> usize {
        self.queue.0.lock().pending.len()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn spoken(&self) -> u64 {
        self.spoken.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Requests refused or evicted from the queue
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Close the queue and wait for pending announcements to be spoken
    pub fn shutdown(&mut self) {
        {
            let (lock, cvar) = &*self.queue;
            lock.lock().closed = true;
            cvar.notify_all();
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!(target: "eyedrive_core", "[SPEECH] Worker panicked");
            }
        }
    }
}

impl Drop for SpeechWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eyedrive_hal::{HalError, HalResult};
    use std::sync::mpsc;
    use std::time::Instant;

    #[derive(Default)]
    struct Recorder {
        spoken: Vec<String>,
    }

    impl SpeechSink for Recorder {
        fn speak(&mut self, text: &str) -> HalResult<()> {
            self.spoken.push(text.to_string());
            Ok(())
        }
    }

    /// Holds each render for a fixed time and records overlapping renders
    struct SlowSink {
        active: Arc<AtomicBool>,
        overlaps: Arc<AtomicU64>,
        spoken: Arc<Mutex<Vec<String>>>,
        delay: Duration,
    }

    impl SpeechSink for SlowSink {
        fn speak(&mut self, text: &str) -> HalResult<()> {
            if self.active.swap(true, Ordering::SeqCst) {
                self.overlaps.fetch_add(1, Ordering::SeqCst);
            }
            thread::sleep(self.delay);
            self.spoken.lock().push(text.to_string());
            self.active.store(false, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingSink;

    impl SpeechSink for FailingSink {
        fn speak(&mut self, _text: &str) -> HalResult<()> {
            Err(HalError::Speech("engine missing".to_string()))
        }
    }

    #[test]
    fn test_gate_renders_and_records() {
        let gate = AnnouncementGate::new(Recorder::default());
        gate.announce(&AnnouncementRequest::normal("Turning Left"))
            .unwrap();
        gate.announce(&AnnouncementRequest::normal("Turning Left"))
            .unwrap();
        // no deduplication
        gate.with_sink(|sink| assert_eq!(sink.spoken.len(), 2));
        assert!(gate.is_idle());
    }

    #[test]
    fn test_gate_serializes_concurrent_callers() {
        let overlaps = Arc::new(AtomicU64::new(0));
        let spoken = Arc::new(Mutex::new(Vec::new()));
        let gate = AnnouncementGate::new(SlowSink {
            active: Arc::new(AtomicBool::new(false)),
            overlaps: Arc::clone(&overlaps),
            spoken: Arc::clone(&spoken),
            delay: Duration::from_millis(10),
        });

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let gate = gate.clone();
                thread::spawn(move || {
                    gate.announce(&AnnouncementRequest::normal(format!("phrase {i}")))
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(overlaps.load(Ordering::SeqCst), 0);
        assert_eq!(spoken.lock().len(), 4);
    }

    #[test]
    fn test_gate_bounded_wait_reports_busy() {
        let gate = AnnouncementGate::new(Recorder::default());
        let holder = gate.clone();
        let (locked_tx, locked_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            holder.with_sink(|_| {
                locked_tx.send(()).unwrap();
                release_rx.recv().unwrap();
            });
        });
        locked_rx.recv().unwrap();

        let result = gate.announce_within(
            &AnnouncementRequest::normal("Moving Forward"),
            Duration::from_millis(20),
        );
        assert!(matches!(result, Err(CoreError::GateBusy { waited_ms: 20 })));

        release_tx.send(()).unwrap();
        handle.join().unwrap();

        gate.announce_within(
            &AnnouncementRequest::normal("Moving Forward"),
            Duration::from_millis(500),
        )
        .unwrap();
    }

    #[test]
    fn test_gate_propagates_sink_failure() {
        let gate = AnnouncementGate::new(FailingSink);
        let result = gate.announce(&AnnouncementRequest::safety("Obstacle ahead."));
        assert!(matches!(result, Err(CoreError::Speech(_))));
        // gate released even after a failure
        assert!(gate.is_idle());
    }

    #[test]
    fn test_worker_speaks_in_order_and_drains_on_shutdown() {
        let spoken = Arc::new(Mutex::new(Vec::new()));
        let gate = AnnouncementGate::new(SlowSink {
            active: Arc::new(AtomicBool::new(false)),
            overlaps: Arc::new(AtomicU64::new(0)),
            spoken: Arc::clone(&spoken),
            delay: Duration::from_millis(50),
        });

        let mut worker = SpeechWorker::spawn(gate, 8).unwrap();
        let start = Instant::now();
        for text in ["Starting the wheelchair", "Turning Left", "Moving Forward"] {
            worker.dispatch(AnnouncementRequest::normal(text)).unwrap();
        }
        // dispatch does not wait for rendering
        assert!(start.elapsed() < Duration::from_millis(40));

        worker.shutdown();
        assert_eq!(
            *spoken.lock(),
            vec!["Starting the wheelchair", "Turning Left", "Moving Forward"]
        );
        assert_eq!(worker.spoken(), 3);
        assert!(!worker.is_running());
    }

    #[test]
    fn test_worker_counts_failures() {
        let mut worker = SpeechWorker::spawn(AnnouncementGate::new(FailingSink), 4).unwrap();
        worker.dispatch(AnnouncementRequest::normal("x")).unwrap();
        worker.shutdown();
        assert_eq!(worker.failed(), 1);
        assert_eq!(worker.spoken(), 0);
    }

    /// Records every phrase; blocks inside the phrase "hold" until released
    struct HoldingSink {
        spoken: Arc<Mutex<Vec<String>>>,
        started: mpsc::Sender<()>,
        release: mpsc::Receiver<()>,
    }

    impl SpeechSink for HoldingSink {
        fn speak(&mut self, text: &str) -> HalResult<()> {
            self.spoken.lock().push(text.to_string());
            if text == "hold" {
                let _ = self.started.send(());
                let _ = self.release.recv();
            }
            Ok(())
        }
    }

    fn holding_worker(capacity: usize) -> (SpeechWorker, Arc<Mutex<Vec<String>>>, mpsc::Sender<()>) {
        let spoken = Arc::new(Mutex::new(Vec::new()));
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let sink = HoldingSink {
            spoken: Arc::clone(&spoken),
            started: started_tx,
            release: release_rx,
        };
        let worker = SpeechWorker::spawn(AnnouncementGate::new(sink), capacity).unwrap();
        worker.dispatch(AnnouncementRequest::normal("hold")).unwrap();
        // the worker is now busy rendering, so later requests stay queued
        started_rx.recv().unwrap();
        (worker, spoken, release_tx)
    }

    #[test]
    fn test_safety_announcement_survives_full_queue() {
        let (mut worker, spoken, release) = holding_worker(2);
        worker.dispatch(AnnouncementRequest::normal("Turning Left")).unwrap();
        worker.dispatch(AnnouncementRequest::normal("Turning Right")).unwrap();
        assert_eq!(worker.queued(), 2);

        worker
            .dispatch(AnnouncementRequest::safety("Stopping the wheelchair."))
            .unwrap();
        assert_eq!(worker.queued(), 2);
        assert_eq!(worker.dropped(), 1);

        release.send(()).unwrap();
        worker.shutdown();
        assert_eq!(
            *spoken.lock(),
            vec!["hold", "Turning Right", "Stopping the wheelchair."]
        );
    }

    #[test]
    fn test_full_queue_evicts_oldest_normal_for_normal() {
        let (mut worker, spoken, release) = holding_worker(2);
        for text in ["Turning Left", "Moving Forward", "Turning Right"] {
            worker.dispatch(AnnouncementRequest::normal(text)).unwrap();
        }
        assert_eq!(worker.dropped(), 1);

        release.send(()).unwrap();
        worker.shutdown();
        assert_eq!(*spoken.lock(), vec!["hold", "Moving Forward", "Turning Right"]);
    }

    #[test]
    fn test_safety_only_queue_refuses_normal_but_takes_safety() {
        let (mut worker, spoken, release) = holding_worker(1);
        worker.dispatch(AnnouncementRequest::safety("Obstacle ahead.")).unwrap();

        let refused = worker.dispatch(AnnouncementRequest::normal("Turning Left"));
        assert!(matches!(refused, Err(CoreError::SpeechBacklog(_))));

        worker
            .dispatch(AnnouncementRequest::safety("Stopping the wheelchair."))
            .unwrap();
        assert_eq!(worker.queued(), 2);

        release.send(()).unwrap();
        worker.shutdown();
        assert_eq!(
            *spoken.lock(),
            vec!["hold", "Obstacle ahead.", "Stopping the wheelchair."]
        );
        assert_eq!(worker.dropped(), 1);
    }

    #[test]
    fn test_dispatch_after_shutdown_fails() {
        let mut worker = SpeechWorker::spawn(AnnouncementGate::new(Recorder::default()), 4).unwrap();
        worker.shutdown();
        let result = worker.dispatch(AnnouncementRequest::normal("late"));
        assert!(matches!(result, Err(CoreError::SpeechBacklog(_))));
    }
}
