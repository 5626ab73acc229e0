//! Storage layer: identity store and per-user contacts.

pub mod contacts;
pub mod users;

pub use users::{NewUser, PgUserStore, User, UserStore};
