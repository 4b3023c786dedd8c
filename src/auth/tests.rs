//! Tests for the auth module

use super::*;
use crate::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Prompt returning a scripted sequence of credentials
struct ScriptedPrompt {
    answers: Mutex<Vec<Credentials>>,
    calls: AtomicUsize,
}

impl ScriptedPrompt {
    fn new(answers: Vec<Credentials>) -> Self {
        Self {
            answers: Mutex::new(answers),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CredentialPrompt for ScriptedPrompt {
    fn prompt(&self) -> crate::Result<Credentials> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut answers = self.answers.lock().unwrap();
        if answers.is_empty() {
            return Err(Error::auth("prompt script exhausted"));
        }
        Ok(answers.remove(0))
    }
}

#[test]
fn test_stdin_prompt_fails_on_closed_input() {
    use std::io::Cursor;

    let err = StdinPrompt::read_from(Cursor::new("")).unwrap_err();
    assert!(matches!(err, Error::Auth { .. }));

    // Input that ends after the username must not spin on the password
    let err = StdinPrompt::read_from(Cursor::new("jane\n")).unwrap_err();
    assert!(matches!(err, Error::Auth { .. }));
}

#[test]
fn test_stdin_prompt_re_asks_after_short_entries() {
    use std::io::Cursor;

    let credentials = StdinPrompt::read_from(Cursor::new("j\njane\ns\nsecret\n")).unwrap();
    assert_eq!(credentials.username, "jane");
    assert_eq!(credentials.password, "secret");
}

fn token_body() -> serde_json::Value {
    serde_json::json!({
        "token_type": "Bearer",
        "expires_in": 86400,
        "access_token": "abc123",
        "refresh_token": "def456"
    })
}

#[test]
fn test_build_login_token() {
    let token = build_login_token(&token_body()).unwrap();
    assert_eq!(token, "Bearer abc123");

    let err = build_login_token(&serde_json::json!({"token_type": "Bearer"})).unwrap_err();
    assert!(matches!(err, Error::MalformedResponse { ref field } if field == "access_token"));
}

#[tokio::test]
async fn test_plain_login_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/login"))
        .and(query_param("username", "jane"))
        .and(query_param("password", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let authenticator = Authenticator::new(LoginMethod::plain("jane", "secret"));
    let token = authenticator.login(&mock_server.uri()).await.unwrap();
    assert_eq!(token, "Bearer abc123");
}

#[tokio::test]
async fn test_login_account_locked() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/login"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&mock_server)
        .await;

    let authenticator = Authenticator::new(LoginMethod::plain("jane", "secret"));
    let err = authenticator.login(&mock_server.uri()).await.unwrap_err();
    assert!(matches!(err, Error::AccountLocked));
}

#[tokio::test]
async fn test_login_malformed_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/login"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"hello": "world"})),
        )
        .mount(&mock_server)
        .await;

    let authenticator = Authenticator::new(LoginMethod::plain("jane", "secret"));
    let err = authenticator.login(&mock_server.uri()).await.unwrap_err();
    assert!(matches!(err, Error::MalformedResponse { .. }));
}

#[tokio::test]
async fn test_stored_login_retries_once_after_invalid_credentials() {
    let mock_server = MockServer::start().await;

    // First attempt with the stale password fails
    Mock::given(method("POST"))
        .and(path("/rest/login"))
        .and(query_param("password", "stale"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"error": "invalid_credentials"})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    // Second attempt with the re-prompted password succeeds
    Mock::given(method("POST"))
        .and(path("/rest/login"))
        .and(query_param("password", "fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = Arc::new(MemoryStore::with_credentials(Credentials::new(
        "jane", "stale",
    )));
    let prompt = Arc::new(ScriptedPrompt::new(vec![Credentials::new("jane", "fresh")]));
    let authenticator = Authenticator::new(LoginMethod::stored_with_prompt(
        store.clone(),
        prompt.clone(),
    ));

    let token = authenticator.login(&mock_server.uri()).await.unwrap();
    assert_eq!(token, "Bearer abc123");
    assert_eq!(prompt.calls(), 1);

    // The refreshed credentials replaced the stale entry
    let saved = store.load().unwrap().unwrap();
    assert_eq!(saved.password, "fresh");
}

#[tokio::test]
async fn test_stored_login_fails_after_second_rejection() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"error": "invalid_credentials"})),
        )
        .expect(2)
        .mount(&mock_server)
        .await;

    let store = Arc::new(MemoryStore::with_credentials(Credentials::new(
        "jane", "wrong",
    )));
    let prompt = Arc::new(ScriptedPrompt::new(vec![Credentials::new(
        "jane",
        "also-wrong",
    )]));
    let authenticator =
        Authenticator::new(LoginMethod::stored_with_prompt(store, prompt.clone()));

    // Exactly one retry, then a terminal failure
    let err = authenticator.login(&mock_server.uri()).await.unwrap_err();
    assert!(matches!(err, Error::Auth { .. }));
    assert_eq!(prompt.calls(), 1);
}

#[tokio::test]
async fn test_plain_login_does_not_retry_invalid_credentials() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"error": "invalid_credentials"})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let authenticator = Authenticator::new(LoginMethod::plain("jane", "wrong"));
    let err = authenticator.login(&mock_server.uri()).await.unwrap_err();
    assert!(matches!(err, Error::Auth { .. }));
}

#[tokio::test]
async fn test_stored_login_prompts_and_saves_when_store_empty() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let prompt = Arc::new(ScriptedPrompt::new(vec![Credentials::new("jane", "pw12")]));
    let authenticator = Authenticator::new(LoginMethod::stored_with_prompt(
        store.clone(),
        prompt.clone(),
    ));

    authenticator.login(&mock_server.uri()).await.unwrap();
    assert_eq!(prompt.calls(), 1);
    assert!(store.load().unwrap().is_some());
}

#[tokio::test]
async fn test_encrypted_file_login() {
    use std::io::Write;

    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/login"))
        .and(query_param("password", "filepw"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body()))
        .expect(1)
        .mount(&mock_server)
        .await;

    // Identity "decryptor": the backend itself is an external collaborator
    struct PlainDecryptor;
    impl PasswordDecryptor for PlainDecryptor {
        fn decrypt(&self, ciphertext: &[u8]) -> crate::Result<String> {
            Ok(String::from_utf8_lossy(ciphertext).into_owned())
        }
    }

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "filepw").unwrap();

    let authenticator = Authenticator::new(LoginMethod::encrypted_file(
        "jane",
        file.path(),
        Arc::new(PlainDecryptor),
    ));
    let token = authenticator.login(&mock_server.uri()).await.unwrap();
    assert_eq!(token, "Bearer abc123");
}

#[tokio::test]
async fn test_managed_login() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/login"))
        .and(query_param("username", "svc-account"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body()))
        .expect(1)
        .mount(&mock_server)
        .await;

    struct FixedProvider;
    #[async_trait::async_trait]
    impl CredentialProvider for FixedProvider {
        async fn fetch(&self) -> crate::Result<Credentials> {
            Ok(Credentials::new("svc-account", "svc-pw"))
        }
    }

    let authenticator = Authenticator::new(LoginMethod::managed(Arc::new(FixedProvider)));
    let token = authenticator.login(&mock_server.uri()).await.unwrap();
    assert_eq!(token, "Bearer abc123");
}
