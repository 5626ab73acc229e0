use std::net::TcpListener;

use rolodex::auth::{AuthGateway, TokenService};
use rolodex::configuration::get_configuration;
use rolodex::email_client::EmailClient;
use rolodex::startup::run;
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;

/// Spawn the app on a random port with a lazily connected pool. The cases
/// below stop at the token or validation layer, so no live Postgres is
/// needed.
fn spawn_app() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let configuration = get_configuration().expect("Failed to read configuration.");
    let pool = PgPoolOptions::new()
        .connect_lazy(&configuration.database.connection_string())
        .expect("Failed to build connection pool");

    let tokens = TokenService::new(&configuration.auth).expect("Failed to build token service");
    let gateway = AuthGateway::new(tokens.clone(), configuration.rate_limit.clone());
    let email_client = EmailClient::new(
        &configuration.email,
        configuration.application.base_url.clone(),
    );

    let server = run(listener, pool, gateway, tokens, email_client).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    address
}

// --- Protected surface ---

#[tokio::test]
async fn protected_route_without_token_returns_401() {
    let address = spawn_app();
    let client = reqwest::Client::new();

    let response = client
        .get(&format!("{}/api/users/me", &address))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["code"], "MISSING_TOKEN");
}

#[tokio::test]
async fn protected_route_with_garbage_token_returns_401() {
    let address = spawn_app();
    let client = reqwest::Client::new();

    let response = client
        .get(&format!("{}/api/contacts", &address))
        .header("Authorization", "Bearer not-a-jwt")
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["code"], "TOKEN_INVALID");
}

// --- Auth routes ---

#[tokio::test]
async fn login_with_malformed_email_returns_400() {
    let address = spawn_app();
    let client = reqwest::Client::new();

    let body = json!({
        "email": "not-an-email",
        "password": "SecurePass123"
    });

    let response = client
        .post(&format!("{}/api/auth/login", &address))
        .json(&body)
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(400, response.status().as_u16());
}

#[tokio::test]
async fn refresh_without_bearer_token_returns_401() {
    let address = spawn_app();
    let client = reqwest::Client::new();

    let response = client
        .get(&format!("{}/api/auth/refresh_token", &address))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn refresh_with_garbage_token_returns_401() {
    let address = spawn_app();
    let client = reqwest::Client::new();

    let response = client
        .get(&format!("{}/api/auth/refresh_token", &address))
        .header("Authorization", "Bearer not-a-jwt")
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn signup_with_short_username_returns_400() {
    let address = spawn_app();
    let client = reqwest::Client::new();

    let body = json!({
        "username": "ab",
        "email": "john@example.com",
        "password": "SecurePass123"
    });

    let response = client
        .post(&format!("{}/api/auth/signup", &address))
        .json(&body)
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(400, response.status().as_u16());
}

#[tokio::test]
async fn garbage_confirmation_token_returns_401() {
    let address = spawn_app();
    let client = reqwest::Client::new();

    let response = client
        .get(&format!("{}/api/auth/confirmed_email/not-a-jwt", &address))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
}
