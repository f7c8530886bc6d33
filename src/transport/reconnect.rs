//! Reconnect policy: the timeout/backoff/retry state machine driving
//! connection establishment.
//!
//! The policy is pure: inputs are transport/timer events, outputs are
//! effects the owning channel executes (open/close the transport, arm or
//! cancel timers, send the dimension message). This keeps the one-shot
//! retry and dimension-negotiation rules testable without sockets or clocks.

/// Classification of a failed connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Transport-level failure (handshake, IO, protocol).
    Transport,
    /// No open acknowledgment within the connection window, twice.
    Timeout,
    /// Clean or ordinary close.
    Disconnected,
    /// The remote process is gone; non-retryable without explicit reconnect.
    SessionDead,
}

/// The policy's current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyState {
    Idle,
    /// Transport opening; connect timer armed.
    Connecting,
    /// First timeout consumed; waiting out the backoff before the single
    /// automatic retry.
    Retrying,
    Connected,
    /// Terminal until an explicit reconnect.
    Failed(FailureKind),
}

/// Side effects the owning channel must execute, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Open a fresh transport to the session endpoint.
    OpenTransport,
    /// Close the current transport, if any.
    CloseTransport,
    /// Arm the connection-window timer.
    ArmConnectTimer,
    /// Arm the retry backoff timer.
    ArmRetryTimer,
    /// Cancel whichever timer is armed.
    CancelTimer,
    /// Send the current viewport dimensions. Emitted exactly once per
    /// successful connection, before any input is forwarded.
    SendDimensions,
}

/// Timeout/backoff/retry state machine for one connection channel.
#[derive(Debug)]
pub struct ReconnectPolicy {
    state: PolicyState,
    /// One-shot flag: set after the first timeout of a connection attempt.
    retried: bool,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl ReconnectPolicy {
    /// Create a policy in `Idle`.
    pub fn new() -> Self {
        Self {
            state: PolicyState::Idle,
            retried: false,
        }
    }

    /// Current state.
    pub fn state(&self) -> PolicyState {
        self.state
    }

    /// Begin the first connection attempt.
    pub fn start(&mut self) -> Vec<Effect> {
        match self.state {
            PolicyState::Idle => {
                self.state = PolicyState::Connecting;
                vec![Effect::OpenTransport, Effect::ArmConnectTimer]
            }
            // Already underway or finished; an explicit reconnect restarts.
            _ => Vec::new(),
        }
    }

    /// The armed timer fired.
    pub fn on_timer(&mut self) -> Vec<Effect> {
        match self.state {
            PolicyState::Connecting if !self.retried => {
                // First timeout: back off, then retry exactly once.
                self.retried = true;
                self.state = PolicyState::Retrying;
                vec![Effect::CloseTransport, Effect::ArmRetryTimer]
            }
            PolicyState::Connecting => {
                self.state = PolicyState::Failed(FailureKind::Timeout);
                vec![Effect::CloseTransport]
            }
            PolicyState::Retrying => {
                // Backoff elapsed: re-enter Connecting automatically.
                self.state = PolicyState::Connecting;
                vec![Effect::OpenTransport, Effect::ArmConnectTimer]
            }
            _ => Vec::new(),
        }
    }

    /// The transport reported open.
    pub fn on_open(&mut self) -> Vec<Effect> {
        match self.state {
            PolicyState::Connecting => {
                self.state = PolicyState::Connected;
                vec![Effect::CancelTimer, Effect::SendDimensions]
            }
            // Stale open from a canceled attempt.
            _ => Vec::new(),
        }
    }

    /// The transport closed or failed.
    pub fn on_close(&mut self, kind: FailureKind) -> Vec<Effect> {
        // Session-dead is terminal from any state and never retried.
        if kind == FailureKind::SessionDead {
            self.state = PolicyState::Failed(FailureKind::SessionDead);
            return vec![Effect::CancelTimer];
        }

        match self.state {
            PolicyState::Connected => {
                self.state = PolicyState::Failed(kind);
                Vec::new()
            }
            PolicyState::Connecting => {
                self.state = PolicyState::Failed(kind);
                vec![Effect::CancelTimer]
            }
            // Closes from a transport we already abandoned are stale.
            PolicyState::Idle | PolicyState::Retrying | PolicyState::Failed(_) => Vec::new(),
        }
    }

    /// Explicit user-initiated reconnect.
    ///
    /// Idempotent: an open transport is closed first, the one-shot retry
    /// flag resets, and the whole cycle restarts from `Connecting`.
    pub fn reconnect(&mut self) -> Vec<Effect> {
        self.retried = false;
        self.state = PolicyState::Connecting;
        vec![
            Effect::CloseTransport,
            Effect::CancelTimer,
            Effect::OpenTransport,
            Effect::ArmConnectTimer,
        ]
    }

    /// Tear the policy down to `Idle` (slot closed or hidden).
    pub fn reset(&mut self) -> Vec<Effect> {
        self.retried = false;
        self.state = PolicyState::Idle;
        vec![Effect::CancelTimer, Effect::CloseTransport]
    }
}
