//! Verification gate. Holds the workflow at the first step until the
//! emailed code is confirmed, and owns the resend countdown.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::debug;

/// Default resend countdown, in seconds.
pub const DEFAULT_RESEND_COUNTDOWN_SECS: u32 = 60;

/// Gate states. Progresses Idle → AwaitingCode → Verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateState {
    Idle,
    AwaitingCode,
    Verified,
}

impl std::fmt::Display for GateState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::AwaitingCode => "awaiting_code",
            Self::Verified => "verified",
        };
        write!(f, "{s}")
    }
}

/// Point-in-time view of the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VerificationState {
    pub gate: GateState,
    pub email_verified: bool,
    pub countdown_secs: u32,
    pub can_resend: bool,
}

/// The gate plus its countdown ticker.
///
/// The ticker is a spawned task decrementing a shared counter once per tick;
/// it is aborted whenever the gate leaves `AwaitingCode` and on drop.
pub struct VerificationGate {
    state: GateState,
    seed_secs: u32,
    tick: Duration,
    remaining: Arc<AtomicU32>,
    ticker: Option<JoinHandle<()>>,
}

impl VerificationGate {
    pub fn new(seed_secs: u32, tick: Duration) -> Self {
        Self {
            state: GateState::Idle,
            seed_secs,
            tick,
            remaining: Arc::new(AtomicU32::new(0)),
            ticker: None,
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn is_awaiting_code(&self) -> bool {
        self.state == GateState::AwaitingCode
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining.load(Ordering::SeqCst)
    }

    /// Resend is allowed once the countdown has run out.
    pub fn can_resend(&self) -> bool {
        self.is_awaiting_code() && self.remaining_secs() == 0
    }

    /// Enter `AwaitingCode` and start the countdown. Must run inside a
    /// tokio runtime.
    pub fn open(&mut self) {
        self.state = GateState::AwaitingCode;
        self.restart_countdown();
    }

    /// Reseed the countdown after a code was resent.
    pub fn restart_countdown(&mut self) {
        self.stop_ticker();
        self.remaining.store(self.seed_secs, Ordering::SeqCst);
        debug!(remaining_secs = self.seed_secs, "Verification countdown started");

        let remaining = Arc::clone(&self.remaining);
        let tick = self.tick;
        self.ticker = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + tick, tick);
            loop {
                interval.tick().await;
                if countdown_step(&remaining) == 0 {
                    break;
                }
            }
        }));
    }

    /// Code confirmed: leave the gate for good.
    pub fn confirm(&mut self) {
        self.stop_ticker();
        self.remaining.store(0, Ordering::SeqCst);
        self.state = GateState::Verified;
    }

    /// Tear the gate down without verifying (abandon, discard).
    pub fn reset(&mut self) {
        self.stop_ticker();
        self.remaining.store(0, Ordering::SeqCst);
        self.state = GateState::Idle;
    }

    pub fn snapshot(&self) -> VerificationState {
        VerificationState {
            gate: self.state,
            email_verified: self.state == GateState::Verified,
            countdown_secs: self.remaining_secs(),
            can_resend: self.can_resend(),
        }
    }

    fn stop_ticker(&mut self) {
        if let Some(handle) = self.ticker.take() {
            handle.abort();
        }
    }
}

impl Default for VerificationGate {
    fn default() -> Self {
        Self::new(DEFAULT_RESEND_COUNTDOWN_SECS, Duration::from_secs(1))
    }
}

impl Drop for VerificationGate {
    fn drop(&mut self) {
        self.stop_ticker();
    }
}

/// Decrement without going below zero. Returns the new value.
fn countdown_step(remaining: &AtomicU32) -> u32 {
    let previous = remaining
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| Some(v.saturating_sub(1)))
        .unwrap_or(0);
    previous.saturating_sub(1)
}
