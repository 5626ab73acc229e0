use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use sqlx::PgPool;
use std::net::TcpListener;

use crate::auth::{AuthGateway, TokenService};
use crate::email_client::EmailClient;
use crate::middleware::BearerAuth;
use crate::repository::users::PgUserStore;
use crate::routes::{
    confirmed_email, create_contact, delete_contact, find_contact_by_email, get_contact,
    health_check, list_contacts, login, me, refresh_token, request_email, search_contacts,
    signup, update_contact, upcoming_birthdays,
};

pub fn run(
    listener: TcpListener,
    pool: PgPool,
    gateway: AuthGateway,
    tokens: TokenService,
    email_client: EmailClient,
) -> Result<Server, std::io::Error> {
    let store = web::Data::new(PgUserStore::new(pool.clone()));
    let pool = web::Data::new(pool);
    let gateway = web::Data::new(gateway);
    let email_client = web::Data::new(email_client);

    let server = HttpServer::new(move || {
        App::new()
            // Shared state
            .app_data(pool.clone())
            .app_data(store.clone())
            .app_data(gateway.clone())
            .app_data(email_client.clone())

            // Public routes
            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/api/auth")
                    .route("/signup", web::post().to(signup))
                    .route("/login", web::post().to(login))
                    .route("/refresh_token", web::get().to(refresh_token))
                    .route("/confirmed_email/{token}", web::get().to(confirmed_email))
                    .route("/request_email", web::post().to(request_email)),
            )

            // Protected routes (require a valid access token)
            .service(
                web::scope("/api")
                    .wrap(BearerAuth::new(tokens.clone()))
                    .route("/users/me", web::get().to(me))
                    // Fixed paths before the {id} matcher.
                    .route("/contacts/search", web::get().to(search_contacts))
                    .route("/contacts/email", web::get().to(find_contact_by_email))
                    .route("/contacts/upcoming", web::get().to(upcoming_birthdays))
                    .route("/contacts", web::get().to(list_contacts))
                    .route("/contacts", web::post().to(create_contact))
                    .route("/contacts/{id}", web::get().to(get_contact))
                    .route("/contacts/{id}", web::put().to(update_contact))
                    .route("/contacts/{id}", web::delete().to(delete_contact)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
