//! Client-side streaming chat session core.
//!
//! One submission opens one server-push stream; the assistant reply is
//! assembled from content fragments in arrival order into the single
//! open transcript turn. A mid-stream auth rejection invalidates the
//! bearer token, writes a countdown diagnostic into the transcript,
//! and drives a forced reload when the countdown expires.
//!
//! Rendering is not this crate's concern: [`SessionRuntime`] exposes
//! the transcript and recovery state as observable values and fires a
//! notify callback after every mutation; a rendering layer subscribes
//! and re-reads.

pub mod countdown;
pub mod runtime;
pub mod session;

pub use countdown::{Countdown, CountdownHandle, DEFAULT_TICK_INTERVAL};
pub use runtime::SessionRuntime;
pub use session::{
    RecoveryState, Role, Session, SessionHost, StreamId, Turn, RECOVERY_SECONDS,
};
