use std::sync::Arc;

use token_store::TokenStore;

/// Identifier for one open stream connection.
pub type StreamId = u64;

/// Initial countdown value for the auth-failure recovery protocol.
pub const RECOVERY_SECONDS: u64 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// One message unit in the transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

/// Countdown-to-reload state driven by the recovery timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryState {
    pub active: bool,
    pub seconds_remaining: u64,
}

impl RecoveryState {
    const fn inactive() -> Self {
        Self {
            active: false,
            seconds_remaining: 0,
        }
    }
}

/// Side-effect seam between the session and its runtime.
///
/// The session never opens connections or spawns timers itself; it
/// requests them here so tests can observe every effect with a spy.
pub trait SessionHost {
    fn open_stream(&mut self, message: String, token: Option<String>)
        -> Result<StreamId, String>;
    fn close_stream(&mut self);
    fn start_countdown(&mut self, seconds: u64);
    fn cancel_countdown(&mut self);
    fn reload(&mut self);
    fn request_render(&mut self);
}

/// The session controller: ordered transcript, streaming/idle state
/// machine, and the auth-failure recovery sub-protocol.
///
/// Per-turn state machine: Idle -> Sending -> Streaming -> Idle on
/// normal completion; Streaming -> AuthFailing on an auth error, which
/// is terminal in practice since the only exit is the forced reload.
pub struct Session {
    transcript: Vec<Turn>,
    /// Index of the assistant turn currently receiving fragments.
    /// Explicit so "which turn is open" is testable state, not a
    /// closure capture.
    open_turn: Option<usize>,
    current_stream: Option<StreamId>,
    busy: bool,
    recovery: RecoveryState,
    reload_requested: bool,
    torn_down: bool,
    credentials: Arc<TokenStore>,
}

impl Session {
    pub fn new(credentials: Arc<TokenStore>) -> Self {
        Self {
            transcript: Vec::new(),
            open_turn: None,
            current_stream: None,
            busy: false,
            recovery: RecoveryState::inactive(),
            reload_requested: false,
            torn_down: false,
            credentials,
        }
    }

    /// The full transcript in display order. Append-only; never
    /// reordered.
    #[must_use]
    pub fn transcript(&self) -> &[Turn] {
        &self.transcript
    }

    #[must_use]
    pub fn recovery(&self) -> RecoveryState {
        self.recovery
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    #[must_use]
    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    #[must_use]
    pub fn current_stream(&self) -> Option<StreamId> {
        self.current_stream
    }

    #[must_use]
    pub fn credentials(&self) -> &Arc<TokenStore> {
        &self.credentials
    }

    /// Submits one user message and opens a stream for the reply.
    ///
    /// Empty/whitespace-only text and submissions while busy are
    /// silent no-ops. Busy is set here and cleared when the connection
    /// handshake completes ([`Session::on_stream_opened`]), not when
    /// the stream finishes; that exact timing is a preserved contract.
    pub fn submit(&mut self, text: &str, host: &mut dyn SessionHost) {
        if self.torn_down || self.busy || text.trim().is_empty() {
            return;
        }

        self.transcript.push(Turn {
            role: Role::User,
            content: text.to_string(),
        });
        self.transcript.push(Turn {
            role: Role::Assistant,
            content: String::new(),
        });
        self.open_turn = Some(self.transcript.len() - 1);
        self.busy = true;

        let token = self.credentials.load();
        match host.open_stream(text.to_string(), token) {
            Ok(stream_id) => {
                self.current_stream = Some(stream_id);
            }
            Err(_error) => {
                // Same observable shape as a transport failure: back
                // to idle, credential untouched, turns left in place.
                self.busy = false;
                self.open_turn = None;
                self.current_stream = None;
            }
        }

        host.request_render();
    }

    /// Marks the connection established. This is where busy clears.
    ///
    /// Handlers return whether they changed session state, so the
    /// runtime only notifies renderers for real mutations.
    pub fn on_stream_opened(&mut self, stream_id: StreamId) -> bool {
        if !self.should_apply(stream_id) {
            return false;
        }

        self.busy = false;
        true
    }

    /// Appends one fragment to the open assistant turn in receipt
    /// order.
    pub fn on_content(&mut self, stream_id: StreamId, text: &str) -> bool {
        if !self.should_apply(stream_id) {
            return false;
        }

        match self.open_turn {
            Some(index) => {
                self.transcript[index].content.push_str(text);
                true
            }
            None => false,
        }
    }

    /// Handles a mid-stream auth rejection: invalidates the credential
    /// immediately, appends the countdown diagnostic, and starts the
    /// recovery timer. Idempotent while recovery is already active.
    pub fn on_auth_error(
        &mut self,
        stream_id: StreamId,
        message: &str,
        host: &mut dyn SessionHost,
    ) -> bool {
        if !self.should_apply(stream_id) || self.recovery.active {
            return false;
        }

        // The cached value is gone even if removing the file fails;
        // a doomed token must never be handed out again.
        let _ = self.credentials.clear();

        if let Some(index) = self.open_turn {
            let diagnostic = format!(
                "Error: {message}. Auto-refresh and re-login in {RECOVERY_SECONDS} seconds..."
            );
            self.transcript[index].content.push_str(&diagnostic);
        }

        self.recovery = RecoveryState {
            active: true,
            seconds_remaining: RECOVERY_SECONDS,
        };
        host.start_countdown(RECOVERY_SECONDS);
        true
    }

    /// Transport-level failure: back to idle. The credential is not
    /// implicated and recovery state is never altered here.
    pub fn on_stream_error(&mut self, stream_id: StreamId) -> bool {
        self.finish_stream(stream_id)
    }

    /// Normal end of stream: finalize the open turn and return to
    /// idle.
    pub fn on_stream_closed(&mut self, stream_id: StreamId) -> bool {
        self.finish_stream(stream_id)
    }

    pub fn on_countdown_tick(&mut self, seconds_remaining: u64) -> bool {
        if self.torn_down || !self.recovery.active {
            return false;
        }

        self.recovery.seconds_remaining = seconds_remaining;
        true
    }

    /// Terminal recovery action: requests the full reload exactly
    /// once, discarding all in-memory state.
    pub fn on_countdown_expired(&mut self, host: &mut dyn SessionHost) -> bool {
        self.request_reload(host)
    }

    /// Immediate-refresh action offered next to the countdown banner:
    /// consumes the recovery protocol's single reload without waiting
    /// for the timer. A no-op unless recovery is active.
    pub fn reload_now(&mut self, host: &mut dyn SessionHost) -> bool {
        self.request_reload(host)
    }

    fn request_reload(&mut self, host: &mut dyn SessionHost) -> bool {
        if self.torn_down || !self.recovery.active || self.reload_requested {
            return false;
        }

        self.reload_requested = true;
        self.recovery.seconds_remaining = 0;
        host.reload();
        true
    }

    /// Tears the session down: closes any open stream, stops any
    /// running countdown, and freezes the transcript. Every handler is
    /// a no-op afterwards, so late-arriving callbacks cannot mutate
    /// state.
    pub fn teardown(&mut self, host: &mut dyn SessionHost) {
        if self.torn_down {
            return;
        }

        host.close_stream();
        host.cancel_countdown();
        self.torn_down = true;
        host.request_render();
    }

    /// Resets to a fresh idle session, as after a full reload. Only
    /// the persisted credential survives, and that lives in the store.
    pub fn reset(&mut self) {
        self.transcript.clear();
        self.open_turn = None;
        self.current_stream = None;
        self.busy = false;
        self.recovery = RecoveryState::inactive();
        self.reload_requested = false;
        self.torn_down = false;
    }

    fn finish_stream(&mut self, stream_id: StreamId) -> bool {
        if !self.should_apply(stream_id) {
            return false;
        }

        self.busy = false;
        self.open_turn = None;
        self.current_stream = None;
        true
    }

    fn should_apply(&self, stream_id: StreamId) -> bool {
        !self.torn_down && self.current_stream == Some(stream_id)
    }
}
