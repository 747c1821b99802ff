// src/pipeline/runner.rs

//! Poll scheduling.
//!
//! Each enabled feed gets its own task. A task runs its cycle, then sleeps for
//! the interval; the next cycle of the same feed never starts before the
//! previous one finished. The stop flag is checked between cycles and cuts a
//! sleep short, but never interrupts a cycle in flight.

use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;

use crate::error::Result;
use crate::feeds::Gates;
use crate::models::Config;
use crate::pipeline::cycle::{AlertCycle, Cycle, InfoCycle};
use crate::pipeline::engine::{AlertEngine, InfoEngine, Outcome};
use crate::services::{BoardPoster, ImageLookup, PageInspector, ThreadInspector, ThreadPoster};
use crate::storage::{AlertLog, InfoLog};
use crate::utils::http::{self, Fetch};

/// Shared stop request.
#[derive(Debug, Clone)]
pub struct StopSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl StopSignal {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once [`stop`](Self::stop) has been called.
    pub async fn stopped(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|stopped| *stopped).await;
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Stop on a `q` line from stdin or on Ctrl-C.
pub fn listen_for_stop(stop: &StopSignal) {
    // A plain thread so a pending stdin read never holds up runtime shutdown.
    let on_key = stop.clone();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) if line.trim().eq_ignore_ascii_case("q") => {
                    log::info!("Stop requested");
                    on_key.stop();
                    break;
                }
                Ok(_) => {}
                Err(_) => break,
            }
        }
    });

    let on_signal = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Interrupted");
            on_signal.stop();
        }
    });
}

/// Every enabled cycle, wired to real collaborators.
pub struct Runner {
    cycles: Vec<Arc<dyn Cycle>>,
    interval: Duration,
    oneshot: bool,
}

impl Runner {
    pub fn new(cycles: Vec<Arc<dyn Cycle>>, interval: Duration, oneshot: bool) -> Self {
        Self {
            cycles,
            interval,
            oneshot,
        }
    }

    /// Build the cycles `config` enables.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = http::create_async_client(config)?;
        let fetcher: Arc<dyn Fetch> = Arc::new(client.clone());
        let poster: Arc<dyn ThreadPoster> =
            Arc::new(BoardPoster::new(client, &config.thread.request_url)?);
        let gates = Gates::from(config);
        let eq = &config.earthquake;

        let mut cycles: Vec<Arc<dyn Cycle>> = Vec::new();
        if eq.alert {
            let engine = AlertEngine::new(AlertLog::new(&eq.alert_log), Arc::clone(&poster), config);
            cycles.push(Arc::new(AlertCycle::new(
                Arc::clone(&fetcher),
                &eq.alert_url,
                gates,
                engine,
            )));
        }
        if eq.info {
            let inspector: Arc<dyn ThreadInspector> =
                Arc::new(PageInspector::new(Arc::clone(&fetcher), &config.thread)?);
            let engine = InfoEngine::new(
                InfoLog::new(&eq.info_log),
                Arc::clone(&poster),
                inspector,
                config,
            );
            let mut cycle = InfoCycle::new(
                Arc::clone(&fetcher),
                eq.info_source,
                eq.info_url(),
                gates,
                engine,
            );
            if config.image.enabled {
                cycle = cycle.with_image(ImageLookup::new(
                    Arc::clone(&fetcher),
                    config.image.clone(),
                ));
            }
            cycles.push(Arc::new(cycle));
        }

        Ok(Self::new(
            cycles,
            Duration::from_secs(config.interval_secs),
            config.oneshot,
        ))
    }

    /// Run every cycle until stopped (or once each in oneshot mode).
    pub async fn run(self, stop: StopSignal) {
        let Self {
            cycles,
            interval,
            oneshot,
        } = self;
        let handles: Vec<_> = cycles
            .into_iter()
            .map(|cycle| tokio::spawn(poll(cycle, interval, oneshot, stop.clone())))
            .collect();

        for handle in handles {
            if let Err(e) = handle.await {
                log::error!("Poll task failed: {}", e);
            }
        }
    }
}

async fn poll(cycle: Arc<dyn Cycle>, interval: Duration, oneshot: bool, stop: StopSignal) {
    log::info!("[{}] polling every {}s", cycle.name(), interval.as_secs());
    while !stop.is_stopped() {
        let result = cycle.run(Utc::now()).await;
        report(cycle.name(), &result);
        if oneshot {
            break;
        }
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = stop.stopped() => {}
        }
    }
    log::info!("[{}] stopped", cycle.name());
}

/// Log a cycle result at the level its kind deserves.
pub fn report(name: &str, result: &Result<Outcome>) {
    match result {
        Ok(Outcome::AlreadySeen) => log::debug!("[{}] already posted", name),
        Ok(outcome) => log::info!("[{}] {}", name, outcome),
        Err(e) if e.is_expected_skip() => log::info!("[{}] skipped: {}", name, e),
        Err(e) if e.is_operator_visible() => log::error!("[{}] {}", name, e),
        Err(e) => log::warn!("[{}] {}", name, e),
    }
}
