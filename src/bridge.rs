//! The loop shared by every bridge: receive a sample from the tracking
//! system, keep it in a bounded history, and hand it to the bridge's send
//! step, over and over on a thread of its own.
//!
//! A [`Bridge`] only says how to receive and how to send. [`BridgeRunner`]
//! owns the thread and moves through
//! [`Idle`](BridgeState::Idle) → [`Running`](BridgeState::Running) →
//! [`Stopping`](BridgeState::Stopping) → [`Stopped`](BridgeState::Stopped).
//!
//! Stopping is cooperative. The stop flag is checked between iterations, so
//! a receive that is already blocked has to return first, which is why
//! network sources bound each receive with a timeout.

use crate::error::{BridgeError, SendError, TrackingError};
use crate::history::HistoryBuffer;
use log::{debug, error, info, trace, warn};
use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex, PoisonError,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

/// How long to wait before retrying when no tracking data was available.
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(100);

/// The two variant-specific steps of a bridge.
///
/// `receive` may block. It reports transient conditions
/// ([`TrackingError::is_transient`]) when nothing arrived, and
/// [`TrackingError::Interrupted`] when the user cancelled. `send` gets every
/// sample that was received and stored; failures are logged by the loop and
/// never retried, the next iteration fetches a fresh sample instead.
pub trait Bridge: fmt::Display + Send + 'static {
    /// What one iteration receives and stores in the history.
    type Sample: Clone + Send + 'static;

    /// Fetches the next sample.
    fn receive(&mut self) -> Result<Self::Sample, TrackingError>;

    /// Pushes a sample to the renderer(s).
    fn send(&mut self, sample: &Self::Sample) -> Result<(), SendError>;
}

/// Lifecycle of a [`BridgeRunner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    /// Constructed, thread not started.
    Idle,
    /// Polling the tracking source.
    Running,
    /// Asked to stop, finishing the current iteration.
    Stopping,
    /// The thread has exited. There is no way back.
    Stopped,
}

impl fmt::Display for BridgeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// What a single iteration of the loop did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Iteration {
    /// A sample was received, stored, and sent.
    Delivered,
    /// A sample was received and stored, but sending it failed.
    SendFailed,
    /// Nothing was available; the loop slept for the backoff.
    Retry,
    /// The receive was cancelled; the loop should stop.
    Cancelled,
}

/// Counters kept by the loop, readable from any thread.
#[derive(Debug, Default)]
pub struct BridgeStats {
    received: AtomicU64,
    send_failures: AtomicU64,
    retries: AtomicU64,
}

/// A copy of [`BridgeStats`] at one point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Samples received and stored
    pub received: u64,
    /// Send steps that reported at least one failure
    pub send_failures: u64,
    /// Receives that found nothing and were retried
    pub retries: u64,
}

impl BridgeStats {
    #[allow(missing_docs)]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
        }
    }
}

/// Runs one iteration: receive, store, send.
///
/// Only fatal tracking errors come back as `Err`; everything else is
/// described by the returned [`Iteration`].
pub fn run_iteration<B: Bridge>(
    bridge: &mut B,
    history: &HistoryBuffer<B::Sample>,
    stats: &BridgeStats,
    backoff: Duration,
) -> Result<Iteration, TrackingError> {
    let sample = match bridge.receive() {
        Ok(sample) => sample,
        Err(e) if e.is_transient() => {
            trace!("{} : {}, retrying.", bridge, e);
            stats.retries.fetch_add(1, Ordering::Relaxed);
            spin_sleep::sleep(backoff);
            return Ok(Iteration::Retry);
        }
        Err(TrackingError::Interrupted) => return Ok(Iteration::Cancelled),
        Err(e) => return Err(e),
    };

    history.push(sample.clone());
    stats.received.fetch_add(1, Ordering::Relaxed);

    match bridge.send(&sample) {
        Ok(()) => Ok(Iteration::Delivered),
        Err(e) => {
            warn!("{} : send failed : {}.", bridge, e);
            stats.send_failures.fetch_add(1, Ordering::Relaxed);
            Ok(Iteration::SendFailed)
        }
    }
}

/// Runs iterations until `quit` is set, the receive is cancelled, or the
/// tracking source fails for good. A cancelled receive also sets `quit`.
pub fn run_loop<B: Bridge>(
    bridge: &mut B,
    history: &HistoryBuffer<B::Sample>,
    stats: &BridgeStats,
    quit: &AtomicBool,
    backoff: Duration,
) -> Result<(), TrackingError> {
    while !quit.load(Ordering::Acquire) {
        if run_iteration(bridge, history, stats, backoff)? == Iteration::Cancelled {
            debug!("{} : receive cancelled.", bridge);
            quit.store(true, Ordering::Release);
        }
    }
    Ok(())
}

struct Shared<S> {
    history: HistoryBuffer<S>,
    stats: BridgeStats,
    quit: AtomicBool,
    state: Mutex<BridgeState>,
}

/// Moves the runner to [`BridgeState::Stopped`] when dropped, however the
/// bridge thread ends.
struct MarkStopped<'a>(&'a Mutex<BridgeState>);

impl Drop for MarkStopped<'_> {
    fn drop(&mut self) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = BridgeState::Stopped;
    }
}

/// Owns a [`Bridge`] and the thread that runs it.
pub struct BridgeRunner<B: Bridge> {
    name: String,
    bridge: Option<B>,
    shared: Arc<Shared<B::Sample>>,
    backoff: Duration,
    handle: Option<JoinHandle<Result<(), BridgeError>>>,
}

impl<B: Bridge> BridgeRunner<B> {
    /// Wraps `bridge` without starting it. The history keeps at most
    /// `history_capacity` samples.
    pub fn new(bridge: B, history_capacity: usize, backoff: Duration) -> Self {
        Self {
            name: bridge.to_string(),
            bridge: Some(bridge),
            shared: Arc::new(Shared {
                history: HistoryBuffer::new(history_capacity),
                stats: BridgeStats::default(),
                quit: AtomicBool::new(false),
                state: Mutex::new(BridgeState::Idle),
            }),
            backoff,
            handle: None,
        }
    }

    /// Spawns the bridge thread. A runner can only be started once.
    pub fn start(&mut self) -> Result<(), BridgeError> {
        let bridge = self.bridge.take().ok_or(BridgeError::AlreadyStarted)?;
        *self.shared.state.lock().unwrap() = BridgeState::Running;

        let shared = Arc::clone(&self.shared);
        let backoff = self.backoff;
        let name = self.name.clone();
        self.handle = Some(thread::spawn(move || {
            // Outlives the bridge, also when unwinding.
            let stopped = MarkStopped(&shared.state);
            let mut bridge = bridge;
            info!("{} : started.", name);
            let res = run_loop(
                &mut bridge,
                &shared.history,
                &shared.stats,
                &shared.quit,
                backoff,
            );
            // A cancelled receive or a fatal error ends the loop without
            // request_stop, so the runner is still Running here.
            {
                let mut state = shared.state.lock().unwrap();
                if *state == BridgeState::Running {
                    *state = BridgeState::Stopping;
                }
            }
            // Drop the bridge, and with it its connections, before
            // reporting that it stopped.
            drop(bridge);
            drop(stopped);
            match res {
                Ok(()) => {
                    info!("{} : terminated.", name);
                    Ok(())
                }
                Err(e) => {
                    error!("{} : terminated : {}.", name, e);
                    Err(BridgeError::Tracking(e))
                }
            }
        }));
        Ok(())
    }

    /// Asks the thread to stop after its current iteration, without waiting.
    pub fn request_stop(&self) {
        self.shared.quit.store(true, Ordering::Release);
        let mut state = self.shared.state.lock().unwrap();
        if *state == BridgeState::Running {
            *state = BridgeState::Stopping;
        }
    }

    /// Waits for the thread to exit and returns why it did. Returns
    /// immediately if it was never started or was already joined.
    pub fn join(&mut self) -> Result<(), BridgeError> {
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| BridgeError::Panicked)?,
            None => Ok(()),
        }
    }

    /// [`request_stop`](Self::request_stop) followed by
    /// [`join`](Self::join). A bridge that was never started goes straight
    /// to [`BridgeState::Stopped`].
    pub fn stop(&mut self) -> Result<(), BridgeError> {
        self.request_stop();
        if self.bridge.take().is_some() {
            *self.shared.state.lock().unwrap() = BridgeState::Stopped;
        }
        self.join()
    }

    #[allow(missing_docs)]
    pub fn state(&self) -> BridgeState {
        *self.shared.state.lock().unwrap()
    }

    /// True once the thread has exited, for whatever reason.
    pub fn is_finished(&self) -> bool {
        self.state() == BridgeState::Stopped
    }

    /// The samples received so far.
    pub fn history(&self) -> &HistoryBuffer<B::Sample> {
        &self.shared.history
    }

    #[allow(missing_docs)]
    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    #[allow(missing_docs)]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<B: Bridge> Drop for BridgeRunner<B> {
    fn drop(&mut self) {
        if self.handle.is_some() {
            if let Err(e) = self.stop() {
                warn!("{} : error during terminating : {e}.", self.name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RendererError;
    use std::collections::VecDeque;
    use std::io;
    use std::time::Instant;

    /// Plays back a script of receive results, then reports a cancelled
    /// receive so the loop ends on its own.
    struct ScriptedBridge {
        script: VecDeque<Result<u32, TrackingError>>,
        sent: Arc<Mutex<Vec<u32>>>,
        fail_sends: bool,
    }

    impl ScriptedBridge {
        fn new(script: Vec<Result<u32, TrackingError>>) -> Self {
            Self {
                script: script.into(),
                sent: Arc::new(Mutex::new(Vec::new())),
                fail_sends: false,
            }
        }
    }

    impl fmt::Display for ScriptedBridge {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "ScriptedBridge")
        }
    }

    impl Bridge for ScriptedBridge {
        type Sample = u32;

        fn receive(&mut self) -> Result<u32, TrackingError> {
            self.script
                .pop_front()
                .unwrap_or(Err(TrackingError::Interrupted))
        }

        fn send(&mut self, sample: &u32) -> Result<(), SendError> {
            if self.fail_sends {
                return Err(RendererError::Write(io::Error::from(io::ErrorKind::BrokenPipe)).into());
            }
            self.sent.lock().unwrap().push(*sample);
            Ok(())
        }
    }

    /// Never has anything to offer.
    struct IdleBridge;

    impl fmt::Display for IdleBridge {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "IdleBridge")
        }
    }

    impl Bridge for IdleBridge {
        type Sample = ();

        fn receive(&mut self) -> Result<(), TrackingError> {
            Err(TrackingError::Unavailable)
        }

        fn send(&mut self, _sample: &()) -> Result<(), SendError> {
            Ok(())
        }
    }

    #[test]
    fn transient_failure_then_success_sends_once() {
        let mut bridge = ScriptedBridge::new(vec![Err(TrackingError::Unavailable), Ok(7)]);
        let history = HistoryBuffer::new(10);
        let stats = BridgeStats::default();
        let quit = AtomicBool::new(false);

        run_loop(&mut bridge, &history, &stats, &quit, Duration::from_millis(1)).unwrap();

        assert_eq!(history.last(None), vec![7]);
        assert_eq!(*bridge.sent.lock().unwrap(), vec![7]);
        assert_eq!(
            stats.snapshot(),
            StatsSnapshot {
                received: 1,
                send_failures: 0,
                retries: 1,
            }
        );
        assert!(quit.load(Ordering::Acquire));
    }

    #[test]
    fn iterations_report_what_happened() {
        let mut bridge = ScriptedBridge::new(vec![Err(TrackingError::MissingRigidBody(0)), Ok(1)]);
        let history = HistoryBuffer::new(10);
        let stats = BridgeStats::default();
        let backoff = Duration::ZERO;

        let steps: Vec<Iteration> = (0..3)
            .map(|_| run_iteration(&mut bridge, &history, &stats, backoff).unwrap())
            .collect();
        assert_eq!(
            steps,
            vec![Iteration::Retry, Iteration::Delivered, Iteration::Cancelled]
        );
    }

    #[test]
    fn send_failures_do_not_stop_the_loop() {
        let mut bridge = ScriptedBridge::new(vec![Ok(1), Ok(2), Ok(3)]);
        bridge.fail_sends = true;
        let history = HistoryBuffer::new(10);
        let stats = BridgeStats::default();
        let quit = AtomicBool::new(false);

        run_loop(&mut bridge, &history, &stats, &quit, Duration::ZERO).unwrap();

        assert_eq!(history.last(None), vec![1, 2, 3]);
        assert_eq!(stats.snapshot().send_failures, 3);
    }

    #[test]
    fn fatal_error_ends_the_loop() {
        let mut bridge = ScriptedBridge::new(vec![Ok(1), Err(TrackingError::Closed), Ok(2)]);
        let history = HistoryBuffer::new(10);
        let stats = BridgeStats::default();
        let quit = AtomicBool::new(false);

        let res = run_loop(&mut bridge, &history, &stats, &quit, Duration::ZERO);

        assert!(matches!(res, Err(TrackingError::Closed)));
        assert_eq!(*bridge.sent.lock().unwrap(), vec![1]);
    }

    #[test]
    fn quit_is_checked_before_receiving() {
        let mut bridge = ScriptedBridge::new(vec![Ok(1)]);
        let history = HistoryBuffer::new(10);
        let quit = AtomicBool::new(true);

        run_loop(&mut bridge, &history, &BridgeStats::default(), &quit, Duration::ZERO).unwrap();

        assert!(history.is_empty());
    }

    #[test]
    fn runner_walks_through_its_states() {
        let mut runner = BridgeRunner::new(IdleBridge, 10, Duration::from_millis(5));
        assert_eq!(runner.state(), BridgeState::Idle);

        runner.start().unwrap();
        assert_eq!(runner.state(), BridgeState::Running);
        assert!(matches!(runner.start(), Err(BridgeError::AlreadyStarted)));

        let begin = Instant::now();
        runner.stop().unwrap();
        assert_eq!(runner.state(), BridgeState::Stopped);
        assert!(begin.elapsed() < Duration::from_secs(1));
        assert!(runner.stats().retries > 0);
    }

    #[test]
    fn runner_reports_fatal_errors_on_join() {
        let bridge = ScriptedBridge::new(vec![Ok(5), Err(TrackingError::Closed)]);
        let sent = Arc::clone(&bridge.sent);
        let mut runner = BridgeRunner::new(bridge, 10, Duration::ZERO);
        runner.start().unwrap();

        let res = runner.join();

        assert!(matches!(res, Err(BridgeError::Tracking(TrackingError::Closed))));
        assert!(runner.is_finished());
        assert_eq!(runner.history().latest(), Some(5));
        assert_eq!(*sent.lock().unwrap(), vec![5]);
    }

    #[test]
    fn cancelled_receive_stops_the_runner() {
        let mut runner = BridgeRunner::new(ScriptedBridge::new(vec![Ok(1)]), 10, Duration::ZERO);
        runner.start().unwrap();
        assert!(runner.join().is_ok());
        assert_eq!(runner.state(), BridgeState::Stopped);
    }

    #[test]
    fn stopping_an_idle_runner() {
        let mut runner = BridgeRunner::new(IdleBridge, 10, Duration::ZERO);
        runner.stop().unwrap();
        assert_eq!(runner.state(), BridgeState::Stopped);
        assert!(matches!(runner.start(), Err(BridgeError::AlreadyStarted)));
    }

    #[test]
    fn an_interrupted_read_does_not_end_the_loop() {
        let mut bridge = ScriptedBridge::new(vec![
            Ok(1),
            Err(io::Error::from(io::ErrorKind::Interrupted).into()),
            Ok(2),
            Ok(3),
        ]);
        let history = HistoryBuffer::new(10);
        let stats = BridgeStats::default();
        let quit = AtomicBool::new(false);

        run_loop(&mut bridge, &history, &stats, &quit, Duration::ZERO).unwrap();

        assert_eq!(history.last(None), vec![1, 2, 3]);
        assert_eq!(*bridge.sent.lock().unwrap(), vec![1, 2, 3]);
        assert_eq!(stats.snapshot().retries, 1);
    }

    /// Panics on the first sample it is asked to send.
    struct PanickingBridge;

    impl fmt::Display for PanickingBridge {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "PanickingBridge")
        }
    }

    impl Bridge for PanickingBridge {
        type Sample = u32;

        fn receive(&mut self) -> Result<u32, TrackingError> {
            Ok(1)
        }

        fn send(&mut self, _sample: &u32) -> Result<(), SendError> {
            panic!("renderer exploded");
        }
    }

    #[test]
    fn a_panicking_bridge_still_ends_stopped() {
        let mut runner = BridgeRunner::new(PanickingBridge, 10, Duration::ZERO);
        runner.start().unwrap();

        assert!(matches!(runner.join(), Err(BridgeError::Panicked)));
        assert_eq!(runner.state(), BridgeState::Stopped);
        assert!(runner.is_finished());
    }

    /// Cancels right away, then takes its time closing down.
    struct SlowTeardown;

    impl fmt::Display for SlowTeardown {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "SlowTeardown")
        }
    }

    impl Bridge for SlowTeardown {
        type Sample = ();

        fn receive(&mut self) -> Result<(), TrackingError> {
            Err(TrackingError::Interrupted)
        }

        fn send(&mut self, _sample: &()) -> Result<(), SendError> {
            Ok(())
        }
    }

    impl Drop for SlowTeardown {
        fn drop(&mut self) {
            thread::sleep(Duration::from_millis(300));
        }
    }

    #[test]
    fn a_cancelled_receive_passes_through_stopping() {
        let mut runner = BridgeRunner::new(SlowTeardown, 10, Duration::ZERO);
        runner.start().unwrap();

        let mut seen = vec![runner.state()];
        let deadline = Instant::now() + Duration::from_secs(5);
        while runner.state() != BridgeState::Stopped && Instant::now() < deadline {
            let state = runner.state();
            if seen.last() != Some(&state) {
                seen.push(state);
            }
            thread::sleep(Duration::from_millis(1));
        }
        runner.join().unwrap();

        assert!(seen.contains(&BridgeState::Stopping));
        assert_eq!(runner.state(), BridgeState::Stopped);
    }
}
