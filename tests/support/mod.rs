use std::sync::Arc;

use chat_session::{Session, SessionHost, StreamId};
use tempfile::TempDir;
use token_store::TokenStore;

/// Spy host recording every side effect the session requests.
#[derive(Default)]
pub struct HostSpy {
    pub next_stream_id: StreamId,
    pub fail_next_open: bool,
    pub open_requests: Vec<(String, Option<String>)>,
    pub close_requests: usize,
    pub countdown_starts: Vec<u64>,
    pub countdown_cancels: usize,
    pub reload_requests: usize,
    pub render_requests: usize,
}

impl HostSpy {
    pub fn with_next_stream_id(stream_id: StreamId) -> Self {
        Self {
            next_stream_id: stream_id,
            ..Self::default()
        }
    }
}

impl SessionHost for HostSpy {
    fn open_stream(
        &mut self,
        message: String,
        token: Option<String>,
    ) -> Result<StreamId, String> {
        self.open_requests.push((message, token));
        if self.fail_next_open {
            self.fail_next_open = false;
            return Err("Failed to spawn stream worker".to_string());
        }
        Ok(self.next_stream_id)
    }

    fn close_stream(&mut self) {
        self.close_requests += 1;
    }

    fn start_countdown(&mut self, seconds: u64) {
        self.countdown_starts.push(seconds);
    }

    fn cancel_countdown(&mut self) {
        self.countdown_cancels += 1;
    }

    fn reload(&mut self) {
        self.reload_requests += 1;
    }

    fn request_render(&mut self) {
        self.render_requests += 1;
    }
}

/// Builds a session over a temp-rooted token store, optionally seeded
/// with a saved token. The TempDir must outlive the session.
pub fn session_with_token(token: Option<&str>) -> (TempDir, Arc<TokenStore>, Session) {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let store = Arc::new(TokenStore::open(dir.path()).expect("store should open"));
    if let Some(token) = token {
        store.save(token).expect("seed token should save");
    }
    let session = Session::new(Arc::clone(&store));
    (dir, store, session)
}
