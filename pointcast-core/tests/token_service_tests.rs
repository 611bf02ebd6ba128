// File: pointcast-core/tests/token_service_tests.rs

use std::sync::atomic::Ordering;
use std::sync::Arc;

use pointcast_common::error::Error;
use pointcast_common::traits::repository_traits::CredentialsRepository;
use pointcast_core::services::TokenService;
use pointcast_core::test_utils::{
    sample_credential, sample_grant, FakeOAuthClient, MemoryCredentialsRepository,
};

fn service(
    repo: Arc<MemoryCredentialsRepository>,
    oauth: Arc<FakeOAuthClient>,
) -> TokenService {
    TokenService::new(repo, oauth)
}

#[tokio::test]
async fn valid_token_is_returned_without_a_refresh() {
    let repo = Arc::new(MemoryCredentialsRepository::new());
    let oauth = Arc::new(FakeOAuthClient::new("42", "ana"));
    repo.store_credential(&sample_credential("42", 3600))
        .await
        .unwrap();

    let svc = service(Arc::clone(&repo), Arc::clone(&oauth));
    let token = svc.get_valid_access_token("42").await.unwrap();

    assert_eq!(token, "access-0");
    assert_eq!(oauth.refresh_count(), 0);
}

#[tokio::test]
async fn token_inside_the_safety_window_triggers_exactly_one_refresh() {
    let repo = Arc::new(MemoryCredentialsRepository::new());
    let oauth = Arc::new(FakeOAuthClient::new("42", "ana"));
    // 30s of lifetime left is inside the 60s safety window.
    repo.store_credential(&sample_credential("42", 30))
        .await
        .unwrap();

    let svc = service(Arc::clone(&repo), Arc::clone(&oauth));
    let token = svc.get_valid_access_token("42").await.unwrap();

    assert_eq!(token, "access-1");
    assert_eq!(oauth.refresh_count(), 1);

    // The rotated refresh token was persisted, not just handed out.
    let stored = repo.get_credential("42").await.unwrap().unwrap();
    assert_eq!(stored.access_token, "access-1");
    assert_eq!(stored.refresh_token, "refresh-1");

    // The freshly stored token is now valid; no second refresh.
    let again = svc.get_valid_access_token("42").await.unwrap();
    assert_eq!(again, "access-1");
    assert_eq!(oauth.refresh_count(), 1);
}

#[tokio::test]
async fn missing_credential_is_not_found() {
    let repo = Arc::new(MemoryCredentialsRepository::new());
    let oauth = Arc::new(FakeOAuthClient::new("42", "ana"));
    let svc = service(repo, Arc::clone(&oauth));

    let err = svc.get_valid_access_token("nobody").await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert_eq!(oauth.refresh_count(), 0);
}

#[tokio::test]
async fn revoked_refresh_token_surfaces_as_auth_expired() {
    let repo = Arc::new(MemoryCredentialsRepository::new());
    let oauth = Arc::new(FakeOAuthClient::new("42", "ana"));
    oauth.fail_refresh.store(true, Ordering::SeqCst);
    repo.store_credential(&sample_credential("42", 10))
        .await
        .unwrap();

    let svc = service(Arc::clone(&repo), oauth);
    let err = svc.get_valid_access_token("42").await.unwrap_err();
    assert!(matches!(err, Error::AuthExpired(_)));

    // The dead credential stays untouched for the operator to inspect.
    let stored = repo.get_credential("42").await.unwrap().unwrap();
    assert_eq!(stored.access_token, "access-0");
}

#[tokio::test]
async fn store_grant_creates_then_rotates_in_place() {
    let repo = Arc::new(MemoryCredentialsRepository::new());
    let oauth = Arc::new(FakeOAuthClient::new("42", "ana"));
    let svc = service(Arc::clone(&repo), oauth);

    let first = svc
        .store_grant("42", sample_grant("a1", "r1", 3600))
        .await
        .unwrap();
    assert_eq!(first.access_token, "a1");

    // A later grant with no scope list keeps the stored scopes.
    let mut regrant = sample_grant("a2", "r2", 3600);
    regrant.scope = vec![];
    let second = svc.store_grant("42", regrant).await.unwrap();

    assert_eq!(second.access_token, "a2");
    assert_eq!(second.refresh_token, "r2");
    assert_eq!(second.scopes, first.scopes);
    assert_eq!(second.created_at, first.created_at);
    assert_eq!(repo.list_credentials().await.unwrap().len(), 1);
}
