use std::net::TcpListener;

use rolodex::auth::{AuthGateway, TokenService};
use rolodex::configuration::get_configuration;
use rolodex::email_client::EmailClient;
use rolodex::startup::run;
use sqlx::postgres::PgPoolOptions;

/// Spawn the app on a random port with a lazily connected pool. Routes that
/// never touch the database can be exercised without a live Postgres.
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

#[tokio::test]
async fn health_check_works() {
    let address = spawn_app();
    let client = reqwest::Client::new();

    let response = client
        .get(&format!("{}/health_check", &address))
        .send()
        .await
        .expect("Failed to execute request.");

    assert!(response.status().is_success());
    assert_eq!(Some(0), response.content_length());
}
