//! End-to-end session lifecycle against a mock AuthServer

use admin_core::{AdminConfig, AuthConfig, Credential, CredentialStorage, MemoryStorage};
use admin_http::{ApiError, ResourceKind};
use admin_session::{
    AdminConsole, GuardDecision, LoginError, LoginRedirect, Redirector, SessionState,
    SignOutReason,
};
use futures::future::join_all;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct RecordingRedirector(Mutex<Vec<String>>);

impl RecordingRedirector {
    fn urls(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

impl Redirector for RecordingRedirector {
    fn redirect(&self, target: &LoginRedirect) {
        self.0.lock().unwrap().push(target.to_url());
    }
}

struct Setup {
    server: MockServer,
    storage: Arc<MemoryStorage>,
    redirects: Arc<RecordingRedirector>,
    console: AdminConsole,
}

async fn setup(stored_token: Option<&str>) -> Setup {
    let server = MockServer::start().await;
    let storage = Arc::new(MemoryStorage::new());
    if let Some(token) = stored_token {
        storage.set(AuthConfig::TOKEN_KEY, token).unwrap();
    }
    let redirects = Arc::new(RecordingRedirector::default());

    let config = AdminConfig {
        base_url: server.uri(),
        timeout_secs: 5,
        ..AdminConfig::default()
    };
    let console = AdminConsole::builder(config)
        .storage(storage.clone())
        .redirector(redirects.clone())
        .build()
        .unwrap();

    Setup {
        server,
        storage,
        redirects,
        console,
    }
}

fn user_body() -> Value {
    json!({"id": "u1", "name": "Ada", "role": "admin"})
}

#[tokio::test]
async fn test_no_stored_credential_skips_validation() {
    let s = setup(None).await;
    Mock::given(method("GET"))
        .and(path("/auth/session"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&s.server)
        .await;

    let state = s.console.start().await;

    assert_eq!(
        state,
        SessionState::Unauthenticated {
            reason: SignOutReason::NoCredential
        }
    );
    assert!(matches!(
        s.console.route_guard().decision("/users"),
        GuardDecision::Redirect(LoginRedirect {
            session_expired: false,
            ..
        })
    ));
}

#[tokio::test]
async fn test_stored_credential_restores_session() {
    let s = setup(Some("stored")).await;
    Mock::given(method("GET"))
        .and(path("/auth/session"))
        .and(header("authorization", "Bearer stored"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_body()))
        .expect(1)
        .mount(&s.server)
        .await;

    let state = s.console.start().await;

    assert!(state.is_authenticated());
    assert_eq!(s.console.session().user().unwrap().name, "Ada");
    assert_eq!(s.console.session().credential().unwrap().as_str(), "stored");
    assert_eq!(s.console.route_guard().decision("/users"), GuardDecision::RenderContent);
}

#[tokio::test]
async fn test_rejected_credential_is_cleared_without_redirect() {
    let s = setup(Some("stale")).await;
    Mock::given(method("GET"))
        .and(path("/auth/session"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&s.server)
        .await;

    let state = s.console.start().await;

    assert_eq!(
        state,
        SessionState::Unauthenticated {
            reason: SignOutReason::Invalid
        }
    );
    assert_eq!(s.storage.get(AuthConfig::TOKEN_KEY).unwrap(), None);
    assert!(s.redirects.urls().is_empty());
}

#[tokio::test]
async fn test_unreachable_backend_fails_closed() {
    let storage = Arc::new(MemoryStorage::new());
    storage.set(AuthConfig::TOKEN_KEY, "stored").unwrap();
    let config = AdminConfig {
        base_url: "http://127.0.0.1:9".into(),
        timeout_secs: 2,
        ..AdminConfig::default()
    };
    let console = AdminConsole::builder(config)
        .storage(storage.clone())
        .build()
        .unwrap();

    let state = console.start().await;

    assert_eq!(
        state,
        SessionState::Unauthenticated {
            reason: SignOutReason::Invalid
        }
    );
    assert_eq!(storage.get(AuthConfig::TOKEN_KEY).unwrap(), None);
}

#[tokio::test]
async fn test_login_then_protected_call_uses_new_credential() {
    let s = setup(None).await;
    Mock::given(method("POST"))
        .and(path("/auth/authenticate"))
        .and(body_json(json!({"identity": "ada", "secret": "pw"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "fresh", "user": user_body()})),
        )
        .expect(1)
        .mount(&s.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/applications"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "app-1"}])))
        .expect(1)
        .mount(&s.server)
        .await;

    s.console.start().await;
    let user = s.console.session().login("ada", "pw").await.unwrap();
    assert_eq!(user.id, "u1");
    assert_eq!(s.storage.get(AuthConfig::TOKEN_KEY).unwrap().as_deref(), Some("fresh"));

    let apps: Vec<Value> = s
        .console
        .gateway()
        .list_resources(ResourceKind::Applications)
        .await
        .unwrap();
    assert_eq!(apps[0]["id"], "app-1");
}

#[tokio::test]
async fn test_login_rejected_shows_message() {
    let s = setup(None).await;
    Mock::given(method("POST"))
        .and(path("/auth/authenticate"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unknown identity"))
        .mount(&s.server)
        .await;

    s.console.start().await;
    let err = s.console.session().login("nobody", "pw").await.unwrap_err();

    assert_eq!(err, LoginError::InvalidCredentials("Unknown identity".into()));
    assert!(!s.console.session().is_authenticated());
}

#[tokio::test]
async fn test_logout_does_not_wait_for_backend() {
    let s = setup(None).await;
    Mock::given(method("POST"))
        .and(path("/auth/authenticate"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "tok", "user": user_body()})),
        )
        .mount(&s.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .respond_with(ResponseTemplate::new(204).set_delay(Duration::from_secs(3600)))
        .mount(&s.server)
        .await;

    s.console.session().login("ada", "pw").await.unwrap();
    let pending = s.console.session().logout().unwrap();

    assert_eq!(
        s.console.session().state(),
        SessionState::Unauthenticated {
            reason: SignOutReason::LoggedOut
        }
    );
    assert_eq!(s.storage.get(AuthConfig::TOKEN_KEY).unwrap(), None);
    assert_eq!(s.storage.get(AuthConfig::USER_KEY).unwrap(), None);
    assert!(!pending.is_finished());
    pending.abort();
}

#[tokio::test]
async fn test_concurrent_401s_refresh_once_and_redirect_once() {
    let s = setup(Some("old")).await;
    Mock::given(method("GET"))
        .and(path("/auth/session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_body()))
        .mount(&s.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/roles"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&s.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(401).set_delay(Duration::from_millis(100)))
        .expect(1)
        .mount(&s.server)
        .await;

    assert!(s.console.start().await.is_authenticated());
    s.console.session().set_current_path("/roles");

    let calls = (0..8).map(|_| {
        let gateway = s.console.gateway().clone();
        async move { gateway.list_resources::<Value>(ResourceKind::Roles).await }
    });
    let results = join_all(calls).await;

    assert!(results.iter().all(|r| r == &Err(ApiError::SessionExpired)));
    assert_eq!(s.redirects.urls(), vec!["/login?returnTo=%2Froles&expired=true".to_string()]);
    assert_eq!(
        s.console.session().state(),
        SessionState::Unauthenticated {
            reason: SignOutReason::Expired
        }
    );
    assert_eq!(s.storage.get(AuthConfig::TOKEN_KEY).unwrap(), None);
}

#[tokio::test]
async fn test_successful_refresh_keeps_session() {
    let s = setup(Some("old")).await;
    Mock::given(method("GET"))
        .and(path("/auth/session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_body()))
        .mount(&s.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/groups/g-1"))
        .and(header("authorization", "Bearer old"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&s.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/groups/g-1"))
        .and(header("authorization", "Bearer renewed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "g-1"})))
        .mount(&s.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "renewed"})))
        .expect(1)
        .mount(&s.server)
        .await;

    s.console.start().await;
    let group: Value = s
        .console
        .gateway()
        .get_resource(ResourceKind::Groups, "g-1")
        .await
        .unwrap();

    assert_eq!(group["id"], "g-1");
    assert!(s.console.session().is_authenticated());
    assert_eq!(s.storage.get(AuthConfig::TOKEN_KEY).unwrap().as_deref(), Some("renewed"));
    // Every reader sees the renewed credential, including the published state
    assert_eq!(
        s.console.session().state().credential().map(Credential::as_str),
        Some("renewed")
    );
    assert_eq!(s.console.session().credential().unwrap().as_str(), "renewed");
    assert_eq!(
        s.console.session().subscribe().borrow().credential().map(Credential::as_str),
        Some("renewed")
    );
    assert!(s.redirects.urls().is_empty());
}

#[tokio::test]
async fn test_expired_claim_is_rejected_locally() {
    // exp = 1_000_000_000 (2001)
    let s = setup(Some("eyJhbGciOiJub25lIn0.eyJleHAiOjEwMDAwMDAwMDB9.c2ln")).await;
    Mock::given(method("GET"))
        .and(path("/auth/session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_body()))
        .expect(0)
        .mount(&s.server)
        .await;

    let state = s.console.start().await;

    assert!(!state.is_authenticated());
    assert_eq!(s.console.session().credential(), None::<Credential>);
}

#[tokio::test]
async fn test_login_against_unreachable_backend_asks_to_retry() {
    let storage = Arc::new(MemoryStorage::new());
    let config = AdminConfig {
        base_url: "http://127.0.0.1:9".into(),
        timeout_secs: 2,
        ..AdminConfig::default()
    };
    let console = AdminConsole::builder(config)
        .storage(storage.clone())
        .build()
        .unwrap();

    let before = console.start().await;
    let err = console.session().login("ada", "pw").await.unwrap_err();

    assert_eq!(err, LoginError::Unavailable);
    assert_eq!(console.session().state(), before);
    assert_eq!(storage.get(AuthConfig::TOKEN_KEY).unwrap(), None);
}

#[tokio::test]
async fn test_login_during_check_wins_over_late_check_result() {
    let s = setup(Some("old")).await;
    Mock::given(method("GET"))
        .and(path("/auth/session"))
        .respond_with(ResponseTemplate::new(401).set_delay(Duration::from_millis(300)))
        .mount(&s.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/authenticate"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "fresh", "user": user_body()})),
        )
        .mount(&s.server)
        .await;

    let check = {
        let console = s.console.clone();
        tokio::spawn(async move { console.start().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(s.console.session().state(), SessionState::Checking);

    s.console.session().login("ada", "pw").await.unwrap();
    check.await.unwrap();

    let state = s.console.session().state();
    assert!(state.is_authenticated());
    assert_eq!(state.user().unwrap().id, "u1");
    assert_eq!(state.credential().map(Credential::as_str), Some("fresh"));
    assert_eq!(s.storage.get(AuthConfig::TOKEN_KEY).unwrap().as_deref(), Some("fresh"));
}

#[tokio::test]
async fn test_only_latest_of_overlapping_checks_applies() {
    let s = setup(Some("stored")).await;
    // First check: slow rejection. Second check: quick success.
    Mock::given(method("GET"))
        .and(path("/auth/session"))
        .respond_with(ResponseTemplate::new(401).set_delay(Duration::from_millis(300)))
        .up_to_n_times(1)
        .mount(&s.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_body()))
        .mount(&s.server)
        .await;

    let first = {
        let console = s.console.clone();
        tokio::spawn(async move { console.start().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let second = s.console.start().await;
    assert!(second.is_authenticated());

    first.await.unwrap();

    assert!(s.console.session().is_authenticated());
    assert_eq!(s.console.session().user().unwrap().name, "Ada");
    assert_eq!(s.storage.get(AuthConfig::TOKEN_KEY).unwrap().as_deref(), Some("stored"));
    assert!(s.redirects.urls().is_empty());
}
