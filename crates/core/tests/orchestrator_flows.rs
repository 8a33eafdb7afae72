//! End-to-end flows of the auth orchestrator against recording fakes.

mod support;

use std::time::Duration;

use authdesk_common::auth::pkce::generate_code_challenge;
use authdesk_common::testing::{MemoryTokenStore, MockTokenEndpoint};
use authdesk_common::{GrantRequest, RefreshTokenRecord};
use authdesk_domain::{AuthState, HostMessage};
use chrono::{Duration as ChronoDuration, Utc};
use support::{FakeCatcher, Harness};

const TOKEN_BODY: &str = r#"{"access_token":"T","refresh_token":"R","token_type":"Bearer"}"#;

fn stored(token: &str) -> MemoryTokenStore {
    MemoryTokenStore::with_record(RefreshTokenRecord::new(token, 90, Utc::now()))
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::test]
async fn test_first_login_exchanges_code_with_pkce() {
    let mut h = Harness::start(MemoryTokenStore::new(), MockTokenEndpoint::new());
    h.wait_for(AuthState::AwaitingUserAuth).await;

    let surface = h.surfaces.surface(0);
    assert!(surface.is_shown());
    let authorize = surface.last_navigation().unwrap();
    assert!(authorize.as_str().starts_with(&h.config.identity.authorize_endpoint()));
    assert_eq!(surface.query("code_challenge_method").as_deref(), Some("S256"));
    assert_eq!(surface.query("redirect_uri"), Some(h.redirect_uri()));

    let message = h.sign_in(TOKEN_BODY).await;
    assert_eq!(message, HostMessage::TokenReceived(Some(TOKEN_BODY.to_string())));
    assert_eq!(h.store.token().as_deref(), Some("R"));

    let requests = h.endpoint.requests();
    assert_eq!(requests.len(), 1);
    match &requests[0] {
        GrantRequest::AuthorizationCode { code, redirect_uri, code_verifier } => {
            assert_eq!(code, "ABC");
            assert_eq!(redirect_uri, &h.redirect_uri());
            assert_eq!(
                surface.query("code_challenge"),
                Some(generate_code_challenge(code_verifier))
            );
        }
        other => panic!("unexpected grant {other:?}"),
    }

    assert!(surface.is_closed());
    assert!(!h.catcher.is_running_now());
}

#[tokio::test]
async fn test_redirect_with_wrong_state_is_ignored() {
    let mut h = Harness::start(MemoryTokenStore::new(), MockTokenEndpoint::new());
    h.wait_for(AuthState::AwaitingUserAuth).await;
    let (surface, sink) = h.surfaces.latest();
    let state = surface.query("state").unwrap();

    sink.request_completed(h.redirect("code=EVIL&state=S2"));
    settle().await;
    assert_eq!(h.current(), AuthState::AwaitingUserAuth);
    assert!(h.endpoint.requests().is_empty());
    assert!(h.store.record().is_none());

    h.endpoint.push_success(TOKEN_BODY);
    sink.request_completed(h.redirect(&format!("code=GOOD&state={state}")));
    h.wait_for(AuthState::Authenticated).await;

    let requests = h.endpoint.requests();
    assert_eq!(requests.len(), 1);
    assert!(matches!(&requests[0], GrantRequest::AuthorizationCode { code, .. } if code == "GOOD"));
}

#[tokio::test]
async fn test_unrelated_navigation_is_ignored() {
    let mut h = Harness::start(MemoryTokenStore::new(), MockTokenEndpoint::new());
    h.wait_for(AuthState::AwaitingUserAuth).await;
    let (surface, sink) = h.surfaces.latest();
    let state = surface.query("state").unwrap();

    sink.request_completed(
        url::Url::parse(&format!("https://login.example.com/?code=X&state={state}")).unwrap(),
    );
    sink.load_finished(url::Url::parse("https://login.example.com/consent").unwrap());
    settle().await;

    assert_eq!(h.current(), AuthState::AwaitingUserAuth);
    assert!(h.endpoint.requests().is_empty());
}

#[tokio::test]
async fn test_stored_token_refreshes_without_showing_surface() {
    let store = stored("R0");
    let endpoint = MockTokenEndpoint::new();
    endpoint.push_success(r#"{"access_token":"T2"}"#);
    let mut h = Harness::start(store, endpoint);

    let message = h.next_message().await;
    assert_eq!(message, HostMessage::TokenReceived(Some(r#"{"access_token":"T2"}"#.into())));
    h.wait_for(AuthState::Authenticated).await;

    assert_eq!(
        h.endpoint.requests(),
        vec![GrantRequest::RefreshToken { refresh_token: "R0".into() }]
    );
    let surface = h.surfaces.surface(0);
    assert!(!surface.is_shown());
    assert!(surface.navigations().is_empty());
    assert!(surface.is_closed());
    assert_eq!(h.store.token().as_deref(), Some("R0"));
    assert_eq!(h.store.write_count(), 0);
}

#[tokio::test]
async fn test_rotated_refresh_token_is_persisted() {
    let endpoint = MockTokenEndpoint::new();
    endpoint.push_success(r#"{"access_token":"T2","refresh_token":"R1"}"#);
    let mut h = Harness::start(stored("R0"), endpoint);

    assert!(h.next_message().await.is_logged_in());
    assert_eq!(h.store.token().as_deref(), Some("R1"));
    let record = h.store.record().unwrap();
    assert!(record.http_only);
    assert!(record.expires_at > (Utc::now() + ChronoDuration::days(89)).timestamp());
}

#[tokio::test]
async fn test_expired_token_falls_back_to_interactive() {
    let expired = RefreshTokenRecord::new("OLD", 90, Utc::now() - ChronoDuration::days(91));
    let mut h = Harness::start(MemoryTokenStore::with_record(expired), MockTokenEndpoint::new());
    h.wait_for(AuthState::AwaitingUserAuth).await;

    assert!(h.endpoint.requests().is_empty());
    assert!(h.store.record().is_none());
    assert!(h.surfaces.surface(0).is_shown());
}

#[tokio::test]
async fn test_unreadable_store_is_treated_as_empty() {
    let store = stored("R0");
    store.set_fail_reads(true);
    let mut h = Harness::start(store, MockTokenEndpoint::new());

    h.wait_for(AuthState::AwaitingUserAuth).await;
    assert!(h.endpoint.requests().is_empty());
}

#[tokio::test]
async fn test_rejected_refresh_clears_store_and_reports_failure() {
    let endpoint = MockTokenEndpoint::new();
    endpoint.push_response(400, r#"{"error":"invalid_grant","error_description":"expired"}"#);
    let mut h = Harness::start(stored("R0"), endpoint);

    assert_eq!(h.next_message().await, HostMessage::TokenReceived(None));
    h.wait_for(AuthState::Idle).await;
    assert!(h.store.record().is_none());
}

#[tokio::test]
async fn test_refresh_transport_failure_keeps_stored_token() {
    let endpoint = MockTokenEndpoint::new();
    endpoint.push_transport_error("connection refused");
    let mut h = Harness::start(stored("R0"), endpoint);

    assert_eq!(h.next_message().await, HostMessage::TokenReceived(None));
    h.wait_for(AuthState::Idle).await;
    assert_eq!(h.store.token().as_deref(), Some("R0"));
}

#[tokio::test]
async fn test_code_exchange_error_reports_failure() {
    let mut h = Harness::start(MemoryTokenStore::new(), MockTokenEndpoint::new());
    h.wait_for(AuthState::AwaitingUserAuth).await;
    let (surface, sink) = h.surfaces.latest();
    let state = surface.query("state").unwrap();

    h.endpoint.push_response(200, r#"{"error":"invalid_client"}"#);
    sink.request_completed(h.redirect(&format!("code=ABC&state={state}")));

    assert_eq!(h.next_message().await, HostMessage::TokenReceived(None));
    h.wait_for(AuthState::Idle).await;
    assert!(surface.is_closed());
    assert!(!h.catcher.is_running_now());
    assert!(h.store.record().is_none());
}

#[tokio::test]
async fn test_denied_consent_reports_failure() {
    let mut h = Harness::start(MemoryTokenStore::new(), MockTokenEndpoint::new());
    h.wait_for(AuthState::AwaitingUserAuth).await;
    let (surface, sink) = h.surfaces.latest();
    let state = surface.query("state").unwrap();

    sink.request_completed(h.redirect(&format!("error=access_denied&state={state}")));

    assert_eq!(h.next_message().await, HostMessage::TokenReceived(None));
    assert!(h.endpoint.requests().is_empty());
}

#[tokio::test]
async fn test_persistence_failure_still_delivers_token() {
    let store = MemoryTokenStore::new();
    store.set_fail_writes(true);
    let mut h = Harness::start(store, MockTokenEndpoint::new());

    let message = h.sign_in(TOKEN_BODY).await;
    assert!(message.is_logged_in());
    assert_eq!(h.current(), AuthState::Authenticated);
    assert!(h.store.record().is_none());
}

#[tokio::test]
async fn test_port_bind_failure_reports_unauthorized() {
    let mut h =
        Harness::start_with(MemoryTokenStore::new(), MockTokenEndpoint::new(), FakeCatcher::failing());

    assert_eq!(h.next_message().await, HostMessage::TokenReceived(None));
    h.wait_for(AuthState::Idle).await;
    assert_eq!(h.surfaces.count(), 0);
}

#[tokio::test]
async fn test_closing_surface_cancels_attempt() {
    let mut h = Harness::start(MemoryTokenStore::new(), MockTokenEndpoint::new());
    h.wait_for(AuthState::AwaitingUserAuth).await;
    let (_, sink) = h.surfaces.latest();

    sink.closed();

    assert_eq!(h.next_message().await, HostMessage::TokenReceived(None));
    h.wait_for(AuthState::Idle).await;
    assert!(!h.catcher.is_running_now());
}

#[tokio::test]
async fn test_login_during_exchange_is_rejected() {
    let mut h = Harness::start(MemoryTokenStore::new(), MockTokenEndpoint::new());
    h.wait_for(AuthState::AwaitingUserAuth).await;
    let (surface, sink) = h.surfaces.latest();
    let state = surface.query("state").unwrap();

    h.endpoint.hold();
    h.endpoint.push_success(TOKEN_BODY);
    sink.request_completed(h.redirect(&format!("code=ABC&state={state}")));
    h.wait_for(AuthState::ExchangingCode).await;

    h.ui.login().unwrap();
    settle().await;
    assert_eq!(h.surfaces.count(), 1);
    assert_eq!(h.current(), AuthState::ExchangingCode);

    h.endpoint.release();
    assert!(h.next_message().await.is_logged_in());
    h.wait_for(AuthState::Authenticated).await;
    assert_eq!(h.endpoint.requests().len(), 1);
}

#[tokio::test]
async fn test_login_while_awaiting_reuses_session() {
    let mut h = Harness::start(MemoryTokenStore::new(), MockTokenEndpoint::new());
    h.wait_for(AuthState::AwaitingUserAuth).await;
    let surface = h.surfaces.surface(0);
    let first = surface.last_navigation().unwrap();

    h.ui.login().unwrap();
    settle().await;

    assert_eq!(h.surfaces.count(), 1);
    assert_eq!(surface.navigations(), vec![first.clone(), first]);
}

#[tokio::test]
async fn test_login_after_failure_starts_fresh_session() {
    let mut h = Harness::start(MemoryTokenStore::new(), MockTokenEndpoint::new());
    h.wait_for(AuthState::AwaitingUserAuth).await;
    let first = h.surfaces.surface(0);
    let first_state = first.query("state").unwrap();
    h.surfaces.sink(0).closed();
    assert_eq!(h.next_message().await, HostMessage::TokenReceived(None));
    h.wait_for(AuthState::Idle).await;

    h.ui.login().unwrap();
    h.wait_for(AuthState::AwaitingUserAuth).await;
    assert_eq!(h.surfaces.count(), 2);
    let second = h.surfaces.surface(1);
    assert_ne!(second.query("state").unwrap(), first_state);
    assert_ne!(second.query("code_challenge"), first.query("code_challenge"));

    // Events from the disposed attempt are dropped.
    h.surfaces.sink(0).request_completed(h.redirect(&format!("code=OLD&state={first_state}")));
    settle().await;
    assert_eq!(h.current(), AuthState::AwaitingUserAuth);
    assert!(h.endpoint.requests().is_empty());
}

#[tokio::test]
async fn test_login_while_authenticated_starts_new_attempt() {
    let mut h = Harness::start(MemoryTokenStore::new(), MockTokenEndpoint::new());
    assert!(h.sign_in(TOKEN_BODY).await.is_logged_in());
    let first = h.surfaces.surface(0);
    assert!(first.is_closed());

    h.ui.login().unwrap();
    h.wait_for(AuthState::AwaitingUserAuth).await;

    assert_eq!(h.surfaces.count(), 2);
    let second = h.surfaces.surface(1);
    assert!(second.is_shown());
    assert_ne!(second.query("state"), first.query("state"));
    assert_ne!(second.query("code_challenge"), first.query("code_challenge"));

    let body = r#"{"access_token":"T2","refresh_token":"R2"}"#;
    assert_eq!(h.sign_in(body).await, HostMessage::TokenReceived(Some(body.to_string())));
    assert_eq!(h.store.token().as_deref(), Some("R2"));
}

#[tokio::test]
async fn test_passive_start_waits_for_commands() {
    let mut h = Harness::start_passive(stored("R0"), MockTokenEndpoint::new());
    settle().await;

    assert_eq!(h.current(), AuthState::Idle);
    assert_eq!(h.surfaces.count(), 0);
    assert_eq!(h.catcher.starts(), 0);
    assert!(h.endpoint.requests().is_empty());

    h.ui.logout().unwrap();
    h.wait_for(AuthState::SigningOut).await;
    let (surface, sink) = h.surfaces.latest();
    assert_eq!(surface.navigations().len(), 1);
    sink.load_finished(surface.last_navigation().unwrap());

    h.wait_for_signouts(1).await;
    assert_eq!(h.current(), AuthState::Idle);
    assert!(h.store.record().is_none());
    assert!(h.endpoint.requests().is_empty());
}

#[tokio::test]
async fn test_signout_count_ignores_failed_startup() {
    let endpoint = MockTokenEndpoint::new();
    endpoint.push_transport_error("connection refused");
    let mut h = Harness::start(stored("R0"), endpoint);

    assert_eq!(h.next_message().await, HostMessage::TokenReceived(None));
    h.wait_for(AuthState::Idle).await;
    assert_eq!(*h.signouts.borrow(), 0);

    h.ui.logout().unwrap();
    h.wait_for(AuthState::SigningOut).await;
    assert_eq!(*h.signouts.borrow(), 0);
    let (surface, sink) = h.surfaces.latest();
    sink.load_finished(surface.last_navigation().unwrap());
    h.wait_for_signouts(1).await;
}

#[tokio::test]
async fn test_logout_page_failure_still_completes_signout() {
    let mut h = Harness::start_passive(stored("R0"), MockTokenEndpoint::new());
    h.surfaces.set_fail(true);

    h.ui.logout().unwrap();
    h.wait_for_signouts(1).await;

    assert_eq!(h.current(), AuthState::Idle);
    assert!(h.store.record().is_none());
    assert!(!h.catcher.is_running_now());
}

#[tokio::test]
async fn test_logout_clears_store_and_visits_logout_page() {
    let mut h = Harness::start(MemoryTokenStore::new(), MockTokenEndpoint::new());
    assert!(h.sign_in(TOKEN_BODY).await.is_logged_in());
    assert!(h.store.record().is_some());

    h.ui.logout().unwrap();
    h.wait_for(AuthState::SigningOut).await;
    assert!(h.store.record().is_none());

    let (surface, sink) = h.surfaces.latest();
    assert!(surface.is_shown());
    let logout_url = surface.last_navigation().unwrap();
    assert_eq!(logout_url.as_str(), h.config.identity.logout_endpoint());
    assert!(h.catcher.is_running_now());

    sink.load_finished(logout_url);
    h.wait_for(AuthState::Idle).await;
    assert!(surface.is_closed());
    assert!(!h.catcher.is_running_now());

    // Next start finds no token and goes interactive.
    let mut restarted = Harness::start(h.store.clone(), MockTokenEndpoint::new());
    restarted.wait_for(AuthState::AwaitingUserAuth).await;
    assert!(restarted.surfaces.surface(0).is_shown());
}

#[tokio::test]
async fn test_logout_during_exchange_discards_result() {
    let mut h = Harness::start(MemoryTokenStore::new(), MockTokenEndpoint::new());
    h.wait_for(AuthState::AwaitingUserAuth).await;
    let (surface, sink) = h.surfaces.latest();
    let state = surface.query("state").unwrap();

    h.endpoint.hold();
    h.endpoint.push_success(TOKEN_BODY);
    sink.request_completed(h.redirect(&format!("code=ABC&state={state}")));
    h.wait_for(AuthState::ExchangingCode).await;

    h.ui.logout().unwrap();
    h.wait_for(AuthState::SigningOut).await;
    h.endpoint.release();
    settle().await;

    assert_eq!(h.current(), AuthState::SigningOut);
    assert!(h.store.record().is_none());
    assert!(tokio::time::timeout(Duration::from_millis(50), h.ui.recv()).await.is_err());
}

#[tokio::test]
async fn test_refresh_command_reports_new_token() {
    let mut h = Harness::start(MemoryTokenStore::new(), MockTokenEndpoint::new());
    assert!(h.sign_in(TOKEN_BODY).await.is_logged_in());

    h.endpoint.push_success(r#"{"access_token":"T3","refresh_token":"R"}"#);
    h.ui.refresh_access_token("R").unwrap();

    let body = r#"{"access_token":"T3","refresh_token":"R"}"#;
    assert_eq!(h.next_message().await, HostMessage::TokenReceived(Some(body.into())));
    assert_eq!(
        h.endpoint.requests().last(),
        Some(&GrantRequest::RefreshToken { refresh_token: "R".into() })
    );
    // Same token came back, nothing to write.
    assert_eq!(h.store.write_count(), 1);
}

#[tokio::test]
async fn test_closing_ui_channel_stops_orchestrator() {
    let h = Harness::start(MemoryTokenStore::new(), MockTokenEndpoint::new());
    let mut state = h.state.clone();
    tokio::time::timeout(support::TIMEOUT, state.wait_for(|s| *s == AuthState::AwaitingUserAuth))
        .await
        .unwrap()
        .unwrap();

    let Harness { ui, task, surfaces, catcher, .. } = h;
    drop(ui);
    tokio::time::timeout(support::TIMEOUT, task).await.unwrap().unwrap();

    assert!(surfaces.surface(0).is_closed());
    assert!(!catcher.is_running_now());
}
