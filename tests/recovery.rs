mod support;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use chat_session::{Countdown, RECOVERY_SECONDS};
use support::{session_with_token, HostSpy};

#[test]
fn auth_error_invalidates_credential_and_starts_countdown_at_six() {
    let (_dir, store, mut session) = session_with_token(Some("expiring"));
    let mut host = HostSpy::with_next_stream_id(1);

    session.submit("x", &mut host);
    session.on_stream_opened(1);
    session.on_auth_error(1, "token expired", &mut host);

    assert_eq!(store.load(), None);
    assert_eq!(host.countdown_starts, vec![RECOVERY_SECONDS]);

    let recovery = session.recovery();
    assert!(recovery.active);
    assert_eq!(recovery.seconds_remaining, 6);

    let last = session.transcript().last().expect("assistant turn exists");
    assert!(last
        .content
        .ends_with("Error: token expired. Auto-refresh and re-login in 6 seconds..."));
}

#[test]
fn repeated_auth_errors_only_start_one_countdown() {
    let (_dir, _store, mut session) = session_with_token(Some("expiring"));
    let mut host = HostSpy::with_next_stream_id(1);

    session.submit("x", &mut host);
    session.on_auth_error(1, "token expired", &mut host);
    session.on_auth_error(1, "token expired", &mut host);

    assert_eq!(host.countdown_starts.len(), 1);
    let last = session.transcript().last().expect("assistant turn exists");
    assert_eq!(
        last.content.matches("Auto-refresh and re-login").count(),
        1
    );
}

#[test]
fn countdown_ticks_update_recovery_state_monotonically() {
    let (_dir, _store, mut session) = session_with_token(Some("expiring"));
    let mut host = HostSpy::with_next_stream_id(1);

    session.submit("x", &mut host);
    session.on_auth_error(1, "token expired", &mut host);

    for remaining in (0..RECOVERY_SECONDS).rev() {
        session.on_countdown_tick(remaining);
        assert_eq!(session.recovery().seconds_remaining, remaining);
        assert!(session.recovery().active);
    }
}

#[test]
fn countdown_expiry_requests_exactly_one_reload() {
    let (_dir, _store, mut session) = session_with_token(Some("expiring"));
    let mut host = HostSpy::with_next_stream_id(1);

    session.submit("x", &mut host);
    session.on_auth_error(1, "token expired", &mut host);
    session.on_countdown_expired(&mut host);
    session.on_countdown_expired(&mut host);

    assert_eq!(host.reload_requests, 1);
    assert_eq!(session.recovery().seconds_remaining, 0);
}

#[test]
fn reload_now_short_circuits_the_countdown() {
    let (_dir, _store, mut session) = session_with_token(Some("expiring"));
    let mut host = HostSpy::with_next_stream_id(1);

    session.submit("x", &mut host);
    session.on_auth_error(1, "token expired", &mut host);

    session.reload_now(&mut host);

    assert_eq!(host.reload_requests, 1);
    assert_eq!(session.recovery().seconds_remaining, 0);

    // The countdown that was already running must not reload again
    // when it runs out.
    session.on_countdown_expired(&mut host);
    assert_eq!(host.reload_requests, 1);
}

#[test]
fn reload_now_without_active_recovery_is_a_no_op() {
    let (_dir, _store, mut session) = session_with_token(Some("token"));
    let mut host = HostSpy::with_next_stream_id(1);

    session.submit("hello", &mut host);
    session.reload_now(&mut host);

    assert_eq!(host.reload_requests, 0);
}

#[test]
fn expiry_without_active_recovery_is_ignored() {
    let (_dir, _store, mut session) = session_with_token(Some("token"));
    let mut host = HostSpy::default();

    session.on_countdown_expired(&mut host);

    assert_eq!(host.reload_requests, 0);
}

#[test]
fn stream_teardown_events_leave_recovery_state_alone() {
    let (_dir, _store, mut session) = session_with_token(Some("expiring"));
    let mut host = HostSpy::with_next_stream_id(1);

    session.submit("x", &mut host);
    session.on_auth_error(1, "token expired", &mut host);
    session.on_stream_closed(1);

    assert!(session.recovery().active);
    assert_eq!(session.recovery().seconds_remaining, 6);
}

#[test]
fn countdown_thread_ticks_down_and_expires_once() {
    let ticks = Arc::new(Mutex::new(Vec::new()));
    let expires = Arc::new(AtomicUsize::new(0));

    let tick_log = Arc::clone(&ticks);
    let expire_count = Arc::clone(&expires);
    let handle = Countdown::start_with_interval(
        Duration::from_millis(5),
        6,
        move |remaining| tick_log.lock().expect("tick log").push(remaining),
        move || {
            expire_count.fetch_add(1, Ordering::SeqCst);
        },
    )
    .expect("countdown should start");

    handle.join();

    assert_eq!(*ticks.lock().expect("tick log"), vec![5, 4, 3, 2, 1, 0]);
    assert_eq!(expires.load(Ordering::SeqCst), 1);
}

#[test]
fn cancel_before_expiry_prevents_the_expire_action() {
    let expires = Arc::new(AtomicUsize::new(0));

    let expire_count = Arc::clone(&expires);
    let mut handle = Countdown::start_with_interval(
        Duration::from_millis(50),
        6,
        |_remaining| {},
        move || {
            expire_count.fetch_add(1, Ordering::SeqCst);
        },
    )
    .expect("countdown should start");

    thread::sleep(Duration::from_millis(60));
    handle.cancel();
    thread::sleep(Duration::from_millis(400));

    assert_eq!(expires.load(Ordering::SeqCst), 0);
    assert!(handle.is_cancelled());
}

#[test]
fn cancel_is_idempotent_and_safe_after_expiry() {
    let mut handle = Countdown::start_with_interval(
        Duration::from_millis(5),
        1,
        |_remaining| {},
        || {},
    )
    .expect("countdown should start");

    thread::sleep(Duration::from_millis(50));
    handle.cancel();
    handle.cancel();
    assert!(handle.is_cancelled());
}
