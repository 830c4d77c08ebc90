//! ==============================================================================
//! poller.rs - recurring fetch of the reading set
//! ==============================================================================
//!
//! purpose:
//!     runs one poll cycle immediately, then one per interval. a cycle that
//!     gets readings sends them to the render loop as a Batch; an empty set or
//!     a failed fetch sends nothing, so the screen keeps its last good data.
//!
//! overlap:
//!     the fetch is awaited inside the loop, so cycles never run concurrently.
//!     if a fetch outlives the interval the missed ticks are skipped, not
//!     queued. cycle numbers are strictly increasing.
//!
//! relationships:
//!     - uses: source.rs (ReadingSource)
//!     - feeds: lib.rs render loop via an mpsc channel
//!
//! ==============================================================================

use crate::reading::Reading;
use crate::source::ReadingSource;

use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;

/// readings from one successful poll cycle, newest first
#[derive(Clone, Debug)]
pub struct Batch {
    pub cycle: u64,
    pub readings: Vec<Reading>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    Delivered(usize),
    Empty,
    Failed,
    /// nobody is listening for batches any more
    Closed,
}

pub struct Poller<S> {
    source: S,
    interval: Duration,
    tx: mpsc::Sender<Batch>,
    next_cycle: u64,
    show_readings: bool,
}

impl<S: ReadingSource> Poller<S> {
    pub fn new(source: S, interval: Duration, tx: mpsc::Sender<Batch>) -> Self {
        Self { source, interval, tx, next_cycle: 0, show_readings: false }
    }

    /// log every delivered batch's latest reading at info
    pub fn show_readings(mut self, yes: bool) -> Self {
        self.show_readings = yes;
        self
    }

    /// one fetch, forwarded if it produced anything
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let cycle = self.next_cycle;
        self.next_cycle += 1;

        let readings = match self.source.fetch().await {
            Ok(readings) => readings,
            Err(e) => {
                tracing::warn!(cycle, "[POLL] fetch failed: {e:#}");
                return CycleOutcome::Failed;
            }
        };

        let Some(latest) = readings.first() else {
            tracing::debug!(cycle, "[POLL] no readings yet");
            return CycleOutcome::Empty;
        };

        if self.show_readings {
            tracing::info!(
                "[POLL] Temp: {:.1}°C | Humidity: {:.1}% | eCO2: {} ppm | PM2.5: {}",
                latest.temperature,
                latest.humidity,
                latest.eco2,
                latest.pm2_5
            );
        }

        let n = readings.len();
        if self.tx.send(Batch { cycle, readings }).await.is_err() {
            return CycleOutcome::Closed;
        }
        tracing::debug!(cycle, readings = n, "[POLL] batch delivered");
        CycleOutcome::Delivered(n)
    }

    /// poll until shutdown fires or the receiver goes away
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!("[POLL] Starting ({}ms interval)", self.interval.as_millis());
        loop {
            // first tick completes immediately
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => break,
            }

            let outcome = tokio::select! {
                outcome = self.run_cycle() => outcome,
                _ = shutdown.changed() => break,
            };
            if outcome == CycleOutcome::Closed {
                break;
            }
        }
        tracing::info!("[POLL] Stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::Timestamp;
    use anyhow::{Result, anyhow};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// hands out scripted responses, one per fetch
    struct Scripted {
        responses: Mutex<VecDeque<Result<Vec<Reading>>>>,
    }

    impl Scripted {
        fn new(responses: Vec<Result<Vec<Reading>>>) -> Self {
            Self { responses: Mutex::new(responses.into()) }
        }
    }

    impl ReadingSource for Scripted {
        async fn fetch(&self) -> Result<Vec<Reading>> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    /// takes longer than the poll interval and counts concurrent fetches
    #[derive(Default)]
    struct Sluggish {
        in_flight: AtomicUsize,
        most_in_flight: AtomicUsize,
        started: AtomicUsize,
    }

    impl ReadingSource for Arc<Sluggish> {
        async fn fetch(&self) -> Result<Vec<Reading>> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.most_in_flight.fetch_max(now, Ordering::SeqCst);
            let n = self.started.fetch_add(1, Ordering::SeqCst);

            tokio::time::sleep(Duration::from_secs(5)).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(vec![reading(n as u32)])
        }
    }

    fn reading(eco2: u32) -> Reading {
        Reading {
            id: None,
            timestamp: Timestamp::from_millis(1_700_000_000_000).unwrap(),
            temperature: 21.0,
            humidity: 45.0,
            eco2,
            pm2_5: 4.0,
            ech2o: None,
            tvoc: None,
            pm10: None,
        }
    }

    #[tokio::test]
    async fn empty_and_failed_cycles_send_nothing() {
        let (tx, mut rx) = mpsc::channel(4);
        let source = Scripted::new(vec![
            Ok(vec![]),
            Err(anyhow!("connection refused")),
            Ok(vec![reading(600), reading(500)]),
        ]);
        let mut poller = Poller::new(source, Duration::from_secs(2), tx);

        assert_eq!(poller.run_cycle().await, CycleOutcome::Empty);
        assert_eq!(poller.run_cycle().await, CycleOutcome::Failed);
        assert!(rx.try_recv().is_err());

        assert_eq!(poller.run_cycle().await, CycleOutcome::Delivered(2));
        let batch = rx.try_recv().unwrap();
        assert_eq!(batch.cycle, 2);
        assert_eq!(batch.readings[0].eco2, 600);
    }

    #[tokio::test]
    async fn closed_receiver_is_reported() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let mut poller = Poller::new(Scripted::new(vec![Ok(vec![reading(400)])]), Duration::from_secs(2), tx);
        assert_eq!(poller.run_cycle().await, CycleOutcome::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn polls_immediately_then_on_interval() {
        let (tx, mut rx) = mpsc::channel(8);
        let (stop_tx, stop_rx) = watch::channel(false);
        let source = Scripted::new(vec![
            Ok(vec![reading(1)]),
            Ok(vec![reading(2)]),
            Ok(vec![reading(3)]),
        ]);
        let handle = tokio::spawn(Poller::new(source, Duration::from_millis(2000), tx).run(stop_rx));

        let first = rx.recv().await.unwrap();
        assert_eq!((first.cycle, first.readings[0].eco2), (0, 1));

        let started = tokio::time::Instant::now();
        let second = rx.recv().await.unwrap();
        assert_eq!((second.cycle, second.readings[0].eco2), (1, 2));
        assert!(started.elapsed() >= Duration::from_millis(1999));

        stop_tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn slow_fetch_skips_ticks_instead_of_overlapping() {
        let (tx, mut rx) = mpsc::channel(8);
        let (stop_tx, stop_rx) = watch::channel(false);
        let source = Arc::new(Sluggish::default());
        let handle = tokio::spawn(Poller::new(source.clone(), Duration::from_secs(2), tx).run(stop_rx));

        let t0 = tokio::time::Instant::now();
        let mut arrivals = Vec::new();
        for _ in 0..4 {
            let batch = rx.recv().await.unwrap();
            arrivals.push((batch.cycle, t0.elapsed()));
        }

        let cycles: Vec<u64> = arrivals.iter().map(|(c, _)| *c).collect();
        assert_eq!(cycles, vec![0, 1, 2, 3]);
        // each batch waits out a full fetch, no backlog of ticks fires in a burst
        for pair in arrivals.windows(2) {
            assert!(pair[1].1 - pair[0].1 >= Duration::from_secs(5));
        }
        assert_eq!(source.most_in_flight.load(Ordering::SeqCst), 1);

        stop_tx.send(true).unwrap();
        handle.await.unwrap();
        assert!(source.started.load(Ordering::SeqCst) <= 5);
    }
}
