mod auth;
mod contacts;
mod health_check;
mod users;

pub use auth::{confirmed_email, login, refresh_token, request_email, signup};
pub use contacts::{
    create_contact, delete_contact, find_contact_by_email, get_contact, list_contacts,
    search_contacts, update_contact, upcoming_birthdays,
};
pub use health_check::health_check;
pub use users::me;
