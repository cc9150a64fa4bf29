use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chat_api::{ChatApiClient, ChatApiError, ChatStreamEvent};
use token_store::TokenStore;

use crate::countdown::{Countdown, CountdownHandle, DEFAULT_TICK_INTERVAL};
use crate::session::{RecoveryState, Session, SessionHost, StreamId, Turn};

type RenderNotify = Box<dyn FnMut() + Send>;

struct ActiveStream {
    stream_id: StreamId,
    cancel: Arc<AtomicBool>,
    join_handle: Option<JoinHandle<()>>,
}

/// Owns the session, the active stream worker, and the recovery
/// countdown, and implements the session's side-effect seam.
///
/// One worker thread exists per open stream; opening a new stream
/// supersedes the previous one (its cancel flag flips and its stream
/// id goes stale, so late events are inert). Events are applied to the
/// session under its mutex in arrival order.
pub struct SessionRuntime {
    session: Mutex<Session>,
    client: Arc<ChatApiClient>,
    credentials: Arc<TokenStore>,
    next_stream_id: AtomicU64,
    active_stream: Mutex<Option<ActiveStream>>,
    countdown: Mutex<Option<CountdownHandle>>,
    countdown_interval: Duration,
    render_notify: Mutex<Option<RenderNotify>>,
    pending_render: AtomicBool,
    pending_reload: AtomicBool,
    reload_count: AtomicU64,
}

impl SessionRuntime {
    pub fn new(client: ChatApiClient, credentials: Arc<TokenStore>) -> Arc<Self> {
        Self::with_countdown_interval(client, credentials, DEFAULT_TICK_INTERVAL)
    }

    /// Test entry point: same runtime, faster recovery ticks.
    pub fn with_countdown_interval(
        client: ChatApiClient,
        credentials: Arc<TokenStore>,
        countdown_interval: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            session: Mutex::new(Session::new(Arc::clone(&credentials))),
            client: Arc::new(client),
            credentials,
            next_stream_id: AtomicU64::new(1),
            active_stream: Mutex::new(None),
            countdown: Mutex::new(None),
            countdown_interval,
            render_notify: Mutex::new(None),
            pending_render: AtomicBool::new(false),
            pending_reload: AtomicBool::new(false),
            reload_count: AtomicU64::new(0),
        })
    }

    /// Registers the notify half of the observe contract: the
    /// rendering layer re-reads session state whenever this fires.
    pub fn set_render_notify(&self, notify: impl FnMut() + Send + 'static) {
        *lock_unpoisoned(&self.render_notify) = Some(Box::new(notify));
    }

    /// Read access to session state for rendering layers and tests.
    pub fn with_session<R>(&self, read: impl FnOnce(&Session) -> R) -> R {
        read(&lock_unpoisoned(&self.session))
    }

    #[must_use]
    pub fn transcript(&self) -> Vec<Turn> {
        self.with_session(|session| session.transcript().to_vec())
    }

    #[must_use]
    pub fn recovery(&self) -> RecoveryState {
        self.with_session(Session::recovery)
    }

    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.credentials.is_present()
    }

    /// Number of reloads the recovery protocol has requested.
    #[must_use]
    pub fn reload_count(&self) -> u64 {
        self.reload_count.load(Ordering::SeqCst)
    }

    /// Exchanges login credentials for a bearer token and persists it.
    pub fn login(&self, username: &str, password: &str) -> Result<(), String> {
        let token = block_on_current_thread(self.client.login(username, password))?
            .map_err(|error| error.to_string())?;
        self.credentials
            .save(token)
            .map_err(|error| error.to_string())
    }

    pub fn submit(self: &Arc<Self>, text: &str) {
        let mut host = Arc::clone(self);
        {
            let mut session = lock_unpoisoned(&self.session);
            session.submit(text, &mut host);
        }
        self.notify_render();
    }

    /// Immediate-refresh action shown next to the recovery banner:
    /// performs the recovery reload now instead of waiting out the
    /// countdown. A no-op unless recovery is active, and the reload
    /// still happens at most once overall.
    pub fn reload_now(self: &Arc<Self>) {
        let mut host = Arc::clone(self);
        let changed = {
            let mut session = lock_unpoisoned(&self.session);
            session.reload_now(&mut host)
        };
        if changed {
            self.pending_render.store(true, Ordering::SeqCst);
        }
        self.finish_pending_reload();
        self.notify_render();
    }

    /// Releases the stream and the countdown together; the session is
    /// frozen afterwards.
    pub fn teardown(self: &Arc<Self>) {
        let mut host = Arc::clone(self);
        {
            let mut session = lock_unpoisoned(&self.session);
            session.teardown(&mut host);
        }
        self.notify_render();
    }

    fn run_stream_worker(
        self: Arc<Self>,
        stream_id: StreamId,
        message: String,
        token: Option<String>,
        cancel: Arc<AtomicBool>,
    ) {
        let result = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime.block_on(self.client.stream_with_handler(
                &message,
                token.as_deref().unwrap_or_default(),
                Some(&cancel),
                |event| self.apply_stream_event(stream_id, event),
            )),
            Err(error) => Err(ChatApiError::Unknown(format!(
                "failed to initialize tokio runtime: {error}"
            ))),
        };

        self.finish_stream(stream_id, result);
    }

    fn apply_stream_event(self: &Arc<Self>, stream_id: StreamId, event: ChatStreamEvent) {
        let mut host = Arc::clone(self);
        let changed = {
            let mut session = lock_unpoisoned(&self.session);
            match event {
                ChatStreamEvent::Opened => session.on_stream_opened(stream_id),
                ChatStreamEvent::Content { text } => session.on_content(stream_id, &text),
                ChatStreamEvent::AuthError { message } => {
                    session.on_auth_error(stream_id, &message, &mut host)
                }
            }
        };
        if changed {
            self.pending_render.store(true, Ordering::SeqCst);
        }
        self.notify_render();
    }

    fn finish_stream(self: &Arc<Self>, stream_id: StreamId, result: Result<(), ChatApiError>) {
        let changed = {
            let mut session = lock_unpoisoned(&self.session);
            match result {
                Ok(()) => session.on_stream_closed(stream_id),
                // A cancelled worker was superseded or torn down; the
                // session has already moved past this stream id.
                Err(ChatApiError::Cancelled) => false,
                Err(_error) => session.on_stream_error(stream_id),
            }
        };

        self.clear_active_stream_if_matching(stream_id);
        if changed {
            self.pending_render.store(true, Ordering::SeqCst);
        }
        self.notify_render();
    }

    fn apply_countdown_tick(self: &Arc<Self>, seconds_remaining: u64) {
        let changed = {
            let mut session = lock_unpoisoned(&self.session);
            session.on_countdown_tick(seconds_remaining)
        };
        if changed {
            self.pending_render.store(true, Ordering::SeqCst);
        }
        self.notify_render();
    }

    fn apply_countdown_expired(self: &Arc<Self>) {
        let mut host = Arc::clone(self);
        let changed = {
            let mut session = lock_unpoisoned(&self.session);
            session.on_countdown_expired(&mut host)
        };
        if changed {
            self.pending_render.store(true, Ordering::SeqCst);
        }
        self.finish_pending_reload();
        self.notify_render();
    }

    /// Performs a requested reload outside the session lock: releases
    /// the stream and countdown and resets the session in place. The
    /// persisted credential is the only surviving state.
    fn finish_pending_reload(self: &Arc<Self>) {
        if !self.pending_reload.swap(false, Ordering::SeqCst) {
            return;
        }

        if let Some(active) = lock_unpoisoned(&self.active_stream).take() {
            active.cancel.store(true, Ordering::SeqCst);
        }
        if let Some(mut handle) = lock_unpoisoned(&self.countdown).take() {
            handle.cancel();
        }

        lock_unpoisoned(&self.session).reset();
        self.pending_render.store(true, Ordering::SeqCst);
    }

    fn clear_active_stream_if_matching(&self, stream_id: StreamId) {
        let mut active_stream = lock_unpoisoned(&self.active_stream);
        let matches = active_stream
            .as_ref()
            .map(|active| active.stream_id)
            == Some(stream_id);
        if !matches {
            return;
        }

        let mut completed = match active_stream.take() {
            Some(completed) => completed,
            None => return,
        };

        if let Some(join_handle) = completed.join_handle.take() {
            let is_current_thread = join_handle.thread().id() == thread::current().id();
            if !is_current_thread && join_handle.is_finished() {
                let _ = join_handle.join();
            }
        }
    }

    /// Delivers one coalesced render notification, and only when some
    /// state actually changed since the last delivery. Always called
    /// with the session lock released, so the callback may re-read
    /// session state freely.
    fn notify_render(&self) {
        if !self.pending_render.swap(false, Ordering::SeqCst) {
            return;
        }

        if let Some(notify) = lock_unpoisoned(&self.render_notify).as_mut() {
            notify();
        }
    }
}

impl SessionHost for Arc<SessionRuntime> {
    fn open_stream(
        &mut self,
        message: String,
        token: Option<String>,
    ) -> Result<StreamId, String> {
        let stream_id = self.next_stream_id.fetch_add(1, Ordering::SeqCst);
        let cancel = Arc::new(AtomicBool::new(false));

        let controller = Arc::clone(self);
        let worker_cancel = Arc::clone(&cancel);
        let join_handle = thread::Builder::new()
            .name(format!("chat-stream-{stream_id}"))
            .spawn(move || controller.run_stream_worker(stream_id, message, token, worker_cancel))
            .map_err(|error| format!("Failed to spawn stream worker: {error}"))?;

        let mut active_stream = lock_unpoisoned(&self.active_stream);
        if let Some(previous) = active_stream.take() {
            previous.cancel.store(true, Ordering::SeqCst);
        }
        *active_stream = Some(ActiveStream {
            stream_id,
            cancel,
            join_handle: Some(join_handle),
        });

        Ok(stream_id)
    }

    fn close_stream(&mut self) {
        if let Some(active) = lock_unpoisoned(&self.active_stream).take() {
            active.cancel.store(true, Ordering::SeqCst);
        }
    }

    fn start_countdown(&mut self, seconds: u64) {
        let tick_runtime = Arc::clone(self);
        let expire_runtime = Arc::clone(self);

        let started = Countdown::start_with_interval(
            self.countdown_interval,
            seconds,
            move |remaining| tick_runtime.apply_countdown_tick(remaining),
            move || expire_runtime.apply_countdown_expired(),
        );

        let mut countdown = lock_unpoisoned(&self.countdown);
        if let Some(mut previous) = countdown.take() {
            previous.cancel();
        }
        *countdown = started.ok();
    }

    fn cancel_countdown(&mut self) {
        if let Some(mut handle) = lock_unpoisoned(&self.countdown).take() {
            handle.cancel();
        }
    }

    fn reload(&mut self) {
        self.reload_count.fetch_add(1, Ordering::SeqCst);
        self.pending_reload.store(true, Ordering::SeqCst);
    }

    fn request_render(&mut self) {
        // May fire while the session lock is held; the runtime flushes
        // after every session entry point releases the lock.
        self.pending_render.store(true, Ordering::SeqCst);
    }
}

fn block_on_current_thread<F: std::future::Future>(future: F) -> Result<F::Output, String> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| format!("failed to initialize tokio runtime: {error}"))?;
    Ok(runtime.block_on(future))
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
