// Live channel - Resilient connection to the streaming telemetry source
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

use crate::application::ports::StreamConnector;
use crate::domain::telemetry::{Batch, ConnectionState, ConsumptionMode};
use crate::error::ChannelError;

pub const TOGGLE_KEY: &str = "Space";

/// Shared pause flag. Flipping it never touches the socket; frames keep
/// arriving and are discarded while paused.
#[derive(Debug, Clone, Default)]
pub struct ConsumptionSwitch {
    paused: Arc<AtomicBool>,
}

impl ConsumptionSwitch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> ConsumptionMode {
        if self.paused.load(Ordering::SeqCst) {
            ConsumptionMode::Paused
        } else {
            ConsumptionMode::Active
        }
    }

    pub fn toggle(&self) -> ConsumptionMode {
        let was_paused = self.paused.fetch_xor(true, Ordering::SeqCst);
        let mode = if was_paused {
            ConsumptionMode::Active
        } else {
            ConsumptionMode::Paused
        };
        tracing::info!("Consumption mode: {:?}", mode);
        mode
    }

    /// Toggle on the space key; every other key is ignored
    pub fn handle_key(&self, code: &str) -> Option<ConsumptionMode> {
        (code == TOGGLE_KEY).then(|| self.toggle())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReconnectPolicy {
    Fixed(Duration),
    Exponential {
        initial: Duration,
        factor: f64,
        max: Duration,
    },
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        ReconnectPolicy::Fixed(Duration::from_secs(5))
    }
}

impl ReconnectPolicy {
    /// Delay before the next attempt, given how many attempts in a row
    /// failed to open
    pub fn delay(&self, consecutive_failures: u32) -> Duration {
        match self {
            ReconnectPolicy::Fixed(delay) => *delay,
            ReconnectPolicy::Exponential {
                initial,
                factor,
                max,
            } => {
                let exponent = consecutive_failures.min(32) as i32;
                let secs = initial.as_secs_f64() * factor.max(1.0).powi(exponent);
                Duration::from_secs_f64(secs.min(max.as_secs_f64()))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Parsed and handed to the chart sink, with its record count
    Dispatched(usize),
    /// Empty frame, nothing to do
    Heartbeat,
    /// Consumption is paused
    Dropped,
    /// Could not be parsed; logged and dropped
    Malformed,
}

pub struct LiveChannel {
    connector: Arc<dyn StreamConnector>,
    url: String,
    policy: ReconnectPolicy,
    consumption: ConsumptionSwitch,
    state: watch::Sender<ConnectionState>,
    batches: mpsc::Sender<Batch>,
}

impl LiveChannel {
    pub fn new(
        connector: Arc<dyn StreamConnector>,
        url: impl Into<String>,
        policy: ReconnectPolicy,
        consumption: ConsumptionSwitch,
        batches: mpsc::Sender<Batch>,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Closed);
        Self {
            connector,
            url: url.into(),
            policy,
            consumption,
            state,
            batches,
        }
    }

    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Run one connection to completion: connect, dispatch every frame in
    /// arrival order, return once the connection closes.
    ///
    /// Errors only when the connection could not be opened.
    pub async fn connect(&self) -> Result<(), ChannelError> {
        self.set_state(ConnectionState::Connecting);
        tracing::info!("Connecting to {}...", self.url);

        let mut frames = match self.connector.connect(&self.url).await {
            Ok(frames) => frames,
            Err(e) => {
                self.set_state(ConnectionState::Closed);
                return Err(e);
            }
        };

        self.set_state(ConnectionState::Open);
        tracing::info!("Connected to {}", self.url);

        while let Some(frame) = frames.next().await {
            match frame {
                Ok(payload) => {
                    self.handle_frame(&payload).await;
                }
                Err(e) => {
                    tracing::warn!("Stream error on {}: {}", self.url, e);
                    break;
                }
            }
        }

        self.set_state(ConnectionState::Closed);
        Ok(())
    }

    pub async fn handle_frame(&self, payload: &str) -> FrameOutcome {
        if self.consumption.mode() == ConsumptionMode::Paused {
            return FrameOutcome::Dropped;
        }

        tracing::debug!("DATA: {}", payload);

        match Batch::parse(payload) {
            Ok(None) => FrameOutcome::Heartbeat,
            Ok(Some(batch)) => {
                let records = batch.len();
                if self.batches.send(batch).await.is_err() {
                    tracing::debug!("Chart sink is gone, dropping batch");
                }
                FrameOutcome::Dispatched(records)
            }
            Err(e) => {
                tracing::error!("Dropping malformed message: {}", e);
                FrameOutcome::Malformed
            }
        }
    }

    /// Connect forever. Every close, whatever its cause, schedules exactly
    /// one new attempt after the policy delay. A failed attempt counts as
    /// a close. Stops only once the chart sink is gone.
    pub async fn run(self) {
        let mut consecutive_failures = 0u32;

        loop {
            match self.connect().await {
                Ok(()) => {
                    consecutive_failures = 0;
                    tracing::info!("Connection to {} closed", self.url);
                }
                Err(e) => {
                    tracing::warn!("{}", e);
                    consecutive_failures = consecutive_failures.saturating_add(1);
                }
            }

            if self.batches.is_closed() {
                tracing::debug!("Chart sink is gone, live channel stops");
                return;
            }

            let delay = self.policy.delay(consecutive_failures.saturating_sub(1));
            tracing::info!("Reconnecting in {:?}...", delay);
            tokio::time::sleep(delay).await;
        }
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.send_replace(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::FrameStream;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use tokio_stream::wrappers::ReceiverStream;

    /// Each connect pops the next scripted frame list; the connection closes
    /// after its last frame. With no script left, connections close at once.
    #[derive(Default)]
    struct ScriptedConnector {
        attempts: AtomicUsize,
        scripts: Mutex<Vec<Vec<String>>>,
        refuse: bool,
    }

    #[async_trait]
    impl StreamConnector for ScriptedConnector {
        async fn connect(&self, url: &str) -> Result<FrameStream, ChannelError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.refuse {
                return Err(ChannelError::Connect {
                    url: url.to_string(),
                    reason: "connection refused".to_string(),
                });
            }
            let frames = {
                let mut scripts = self.scripts.lock().unwrap();
                if scripts.is_empty() {
                    Vec::new()
                } else {
                    scripts.remove(0)
                }
            };
            Ok(futures::stream::iter(frames.into_iter().map(Ok)).boxed())
        }
    }

    /// Connector whose single connection is fed by the test
    struct FeedConnector {
        feed: Mutex<Option<mpsc::Receiver<Result<String, ChannelError>>>>,
    }

    #[async_trait]
    impl StreamConnector for FeedConnector {
        async fn connect(&self, _url: &str) -> Result<FrameStream, ChannelError> {
            match self.feed.lock().unwrap().take() {
                Some(rx) => Ok(ReceiverStream::new(rx).boxed()),
                None => Ok(futures::stream::empty().boxed()),
            }
        }
    }

    fn channel(connector: Arc<dyn StreamConnector>) -> (LiveChannel, mpsc::Receiver<Batch>) {
        let (tx, rx) = mpsc::channel(16);
        let live = LiveChannel::new(
            connector,
            "ws://localhost:8080/ws",
            ReconnectPolicy::default(),
            ConsumptionSwitch::new(),
            tx,
        );
        (live, rx)
    }

    #[test]
    fn test_space_toggles_consumption() {
        let switch = ConsumptionSwitch::new();
        assert_eq!(switch.mode(), ConsumptionMode::Active);
        assert_eq!(switch.handle_key("KeyA"), None);
        assert_eq!(switch.handle_key("Space"), Some(ConsumptionMode::Paused));
        assert_eq!(switch.clone().mode(), ConsumptionMode::Paused);
        assert_eq!(switch.handle_key("Space"), Some(ConsumptionMode::Active));
    }

    #[test]
    fn test_backoff_delays() {
        let fixed = ReconnectPolicy::default();
        assert_eq!(fixed.delay(0), Duration::from_secs(5));
        assert_eq!(fixed.delay(10), Duration::from_secs(5));

        let backoff = ReconnectPolicy::Exponential {
            initial: Duration::from_secs(1),
            factor: 2.0,
            max: Duration::from_secs(30),
        };
        assert_eq!(backoff.delay(0), Duration::from_secs(1));
        assert_eq!(backoff.delay(3), Duration::from_secs(8));
        assert_eq!(backoff.delay(100), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_frames_dispatch_in_arrival_order() {
        let connector = Arc::new(ScriptedConnector {
            scripts: Mutex::new(vec![vec![
                r#"[["10:00",1.5],["10:01",2.0]]"#.to_string(),
                "".to_string(),
                "not json".to_string(),
                r#"[["10:02",3]]"#.to_string(),
            ]]),
            ..Default::default()
        });
        let (live, mut rx) = channel(connector);
        let state = live.state();

        live.connect().await.unwrap();

        assert_eq!(rx.recv().await.unwrap().labels(), vec!["10:00", "10:01"]);
        assert_eq!(rx.recv().await.unwrap().labels(), vec!["10:02"]);
        assert!(rx.try_recv().is_err());
        assert_eq!(*state.borrow(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_heartbeat_leaves_state_unchanged() {
        let (feed_tx, feed_rx) = mpsc::channel(4);
        let connector = Arc::new(FeedConnector {
            feed: Mutex::new(Some(feed_rx)),
        });
        let (live, mut rx) = channel(connector);
        let mut state = live.state();
        let live = Arc::new(live);

        let task = tokio::spawn({
            let live = live.clone();
            async move { live.connect().await }
        });
        state
            .wait_for(|s| *s == ConnectionState::Open)
            .await
            .unwrap();

        assert_eq!(live.handle_frame("").await, FrameOutcome::Heartbeat);
        feed_tx.send(Ok(String::new())).await.unwrap();
        tokio::task::yield_now().await;

        assert_eq!(*state.borrow(), ConnectionState::Open);
        assert!(rx.try_recv().is_err());

        drop(feed_tx);
        task.await.unwrap().unwrap();
        assert_eq!(*state.borrow(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_paused_frames_are_dropped_without_replay() {
        let (live, mut rx) = channel(Arc::new(ScriptedConnector::default()));
        let switch = live.consumption.clone();
        let frame = r#"[["10:00",1.5]]"#;

        switch.toggle();
        for _ in 0..5 {
            assert_eq!(live.handle_frame(frame).await, FrameOutcome::Dropped);
        }
        assert_eq!(live.handle_frame("garbage").await, FrameOutcome::Dropped);
        assert!(rx.try_recv().is_err());

        switch.toggle();
        assert_eq!(
            live.handle_frame(r#"[["10:05",9]]"#).await,
            FrameOutcome::Dispatched(1)
        );
        assert_eq!(rx.recv().await.unwrap().labels(), vec!["10:05"]);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_malformed_message_keeps_connection() {
        let (live, _rx) = channel(Arc::new(ScriptedConnector::default()));
        assert_eq!(live.handle_frame("[1,2]").await, FrameOutcome::Malformed);
        assert_eq!(
            live.handle_frame(r#"[["a",1]]"#).await,
            FrameOutcome::Dispatched(1)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_schedules_one_reconnect_after_delay() {
        let connector = Arc::new(ScriptedConnector::default());
        let (live, _rx) = channel(connector.clone());

        let task = tokio::spawn(live.run());

        tokio::time::sleep(Duration::from_millis(4_900)).await;
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 2);

        tokio::time::sleep(Duration::from_millis(4_700)).await;
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 2);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 3);

        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_connect_is_retried() {
        let connector = Arc::new(ScriptedConnector {
            refuse: true,
            ..Default::default()
        });
        let (live, _rx) = channel(connector.clone());
        let state = live.state();

        let task = tokio::spawn(live.run());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 1);
        assert_eq!(*state.borrow(), ConnectionState::Closed);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 2);

        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_when_sink_is_gone() {
        let connector = Arc::new(ScriptedConnector::default());
        let (live, rx) = channel(connector.clone());
        drop(rx);

        live.run().await;

        assert_eq!(connector.attempts.load(Ordering::SeqCst), 1);
    }
}
