//! Contact routes (authenticated, per-user).
//!
//! Contact writes go through the strict contact-create admission class; the
//! rest use the general class. The client key is the authenticated identity.

use actix_web::{web, HttpResponse};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{AuthGateway, Claims, RouteClass};
use crate::error::{AppError, DatabaseError, ValidationError};
use crate::repository::contacts::{self, Contact, ContactData};
use crate::repository::users::PgUserStore;
use crate::routes::users::current_user;
use crate::validators::{is_valid_email, is_valid_info, is_valid_name, is_valid_phone};

#[derive(Deserialize)]
pub struct ContactPayload {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    /// ISO date, e.g. "1990-06-15".
    pub date_of_birth: String,
    pub info: Option<String>,
}

impl ContactPayload {
    fn validate(&self) -> Result<ContactData, AppError> {
        let date_of_birth = NaiveDate::parse_from_str(&self.date_of_birth, "%Y-%m-%d")
            .map_err(|_| {
                AppError::Validation(ValidationError::InvalidFormat(
                    "date_of_birth must be an ISO date (YYYY-MM-DD)".to_string(),
                ))
            })?;

        Ok(ContactData {
            first_name: is_valid_name(&self.first_name, "first_name")?,
            last_name: is_valid_name(&self.last_name, "last_name")?,
            email: is_valid_email(&self.email)?,
            phone_number: is_valid_phone(&self.phone_number)?,
            date_of_birth,
            info: self
                .info
                .as_deref()
                .map(is_valid_info)
                .transpose()?,
        })
    }
}

#[derive(Serialize)]
pub struct ContactResponse {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub date_of_birth: String,
    pub info: Option<String>,
}

impl From<Contact> for ContactResponse {
    fn from(contact: Contact) -> Self {
        Self {
            id: contact.id.to_string(),
            first_name: contact.first_name,
            last_name: contact.last_name,
            email: contact.email,
            phone_number: contact.phone_number,
            date_of_birth: contact.date_of_birth.format("%Y-%m-%d").to_string(),
            info: contact.info,
        }
    }
}

#[derive(Deserialize)]
pub struct Pagination {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl Pagination {
    fn bounds(&self) -> (i64, i64) {
        (self.skip.unwrap_or(0).max(0), self.limit.unwrap_or(100).clamp(1, 500))
    }
}

#[derive(Deserialize)]
pub struct NameQuery {
    pub query: String,
}

#[derive(Deserialize)]
pub struct EmailQuery {
    pub contact_email: String,
}

fn parse_contact_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| {
        AppError::Validation(ValidationError::InvalidFormat(
            "contact id must be a UUID".to_string(),
        ))
    })
}

fn not_found() -> AppError {
    AppError::Database(DatabaseError::NotFound("contact".to_string()))
}

/// GET /api/contacts
pub async fn list_contacts(
    claims: web::ReqData<Claims>,
    pagination: web::Query<Pagination>,
    pool: web::Data<PgPool>,
    store: web::Data<PgUserStore>,
    gateway: web::Data<AuthGateway>,
) -> Result<HttpResponse, AppError> {
    gateway.admit(&claims.sub, RouteClass::General)?;
    let user = current_user(store.get_ref(), &claims).await?;

    let (skip, limit) = pagination.bounds();
    let contacts = contacts::list(pool.get_ref(), user.id, skip, limit).await?;

    let body: Vec<ContactResponse> = contacts.into_iter().map(ContactResponse::from).collect();
    Ok(HttpResponse::Ok().json(body))
}

/// GET /api/contacts/{id}
pub async fn get_contact(
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
    pool: web::Data<PgPool>,
    store: web::Data<PgUserStore>,
    gateway: web::Data<AuthGateway>,
) -> Result<HttpResponse, AppError> {
    gateway.admit(&claims.sub, RouteClass::General)?;
    let user = current_user(store.get_ref(), &claims).await?;
    let contact_id = parse_contact_id(&path)?;

    let contact = contacts::get(pool.get_ref(), user.id, contact_id)
        .await?
        .ok_or_else(not_found)?;

    Ok(HttpResponse::Ok().json(ContactResponse::from(contact)))
}

/// POST /api/contacts
pub async fn create_contact(
    claims: web::ReqData<Claims>,
    payload: web::Json<ContactPayload>,
    pool: web::Data<PgPool>,
    store: web::Data<PgUserStore>,
    gateway: web::Data<AuthGateway>,
) -> Result<HttpResponse, AppError> {
    gateway.admit(&claims.sub, RouteClass::ContactCreate)?;
    let user = current_user(store.get_ref(), &claims).await?;

    let data = payload.validate()?;
    let contact = contacts::create(pool.get_ref(), user.id, data).await?;

    Ok(HttpResponse::Created().json(ContactResponse::from(contact)))
}

/// PUT /api/contacts/{id}
pub async fn update_contact(
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
    payload: web::Json<ContactPayload>,
    pool: web::Data<PgPool>,
    store: web::Data<PgUserStore>,
    gateway: web::Data<AuthGateway>,
) -> Result<HttpResponse, AppError> {
    gateway.admit(&claims.sub, RouteClass::General)?;
    let user = current_user(store.get_ref(), &claims).await?;
    let contact_id = parse_contact_id(&path)?;

    let data = payload.validate()?;
    let contact = contacts::update(pool.get_ref(), user.id, contact_id, data)
        .await?
        .ok_or_else(not_found)?;

    Ok(HttpResponse::Ok().json(ContactResponse::from(contact)))
}

/// DELETE /api/contacts/{id}
pub async fn delete_contact(
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
    pool: web::Data<PgPool>,
    store: web::Data<PgUserStore>,
    gateway: web::Data<AuthGateway>,
) -> Result<HttpResponse, AppError> {
    gateway.admit(&claims.sub, RouteClass::General)?;
    let user = current_user(store.get_ref(), &claims).await?;
    let contact_id = parse_contact_id(&path)?;

    let contact = contacts::remove(pool.get_ref(), user.id, contact_id)
        .await?
        .ok_or_else(not_found)?;

    Ok(HttpResponse::Ok().json(ContactResponse::from(contact)))
}

/// GET /api/contacts/search?query=
pub async fn search_contacts(
    claims: web::ReqData<Claims>,
    query: web::Query<NameQuery>,
    pool: web::Data<PgPool>,
    store: web::Data<PgUserStore>,
    gateway: web::Data<AuthGateway>,
) -> Result<HttpResponse, AppError> {
    gateway.admit(&claims.sub, RouteClass::General)?;
    let user = current_user(store.get_ref(), &claims).await?;

    let results = contacts::search_by_name(pool.get_ref(), user.id, &query.query).await?;
    if results.is_empty() {
        return Err(not_found());
    }

    let body: Vec<ContactResponse> = results.into_iter().map(ContactResponse::from).collect();
    Ok(HttpResponse::Ok().json(body))
}

/// GET /api/contacts/email?contact_email=
pub async fn find_contact_by_email(
    claims: web::ReqData<Claims>,
    query: web::Query<EmailQuery>,
    pool: web::Data<PgPool>,
    store: web::Data<PgUserStore>,
    gateway: web::Data<AuthGateway>,
) -> Result<HttpResponse, AppError> {
    gateway.admit(&claims.sub, RouteClass::General)?;
    let user = current_user(store.get_ref(), &claims).await?;

    let results = contacts::search_by_email(pool.get_ref(), user.id, &query.contact_email).await?;
    if results.is_empty() {
        return Err(not_found());
    }

    let body: Vec<ContactResponse> = results.into_iter().map(ContactResponse::from).collect();
    Ok(HttpResponse::Ok().json(body))
}

/// GET /api/contacts/upcoming
pub async fn upcoming_birthdays(
    claims: web::ReqData<Claims>,
    pagination: web::Query<Pagination>,
    pool: web::Data<PgPool>,
    store: web::Data<PgUserStore>,
    gateway: web::Data<AuthGateway>,
) -> Result<HttpResponse, AppError> {
    gateway.admit(&claims.sub, RouteClass::General)?;
    let user = current_user(store.get_ref(), &claims).await?;

    let (skip, limit) = pagination.bounds();
    let results = contacts::upcoming_birthdays(pool.get_ref(), user.id, skip, limit).await?;

    let body: Vec<ContactResponse> = results.into_iter().map(ContactResponse::from).collect();
    Ok(HttpResponse::Ok().json(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> ContactPayload {
        ContactPayload {
            first_name: "Wade".to_string(),
            last_name: "Wilson".to_string(),
            email: "wade@example.com".to_string(),
            phone_number: "+12025550123".to_string(),
            date_of_birth: "1990-06-15".to_string(),
            info: None,
        }
    }

    #[test]
    fn valid_payload_passes() {
        let data = payload().validate().expect("valid payload");
        assert_eq!(data.first_name, "Wade");
        assert_eq!(
            data.date_of_birth,
            NaiveDate::from_ymd_opt(1990, 6, 15).unwrap()
        );
    }

    #[test]
    fn bad_date_is_rejected() {
        let mut p = payload();
        p.date_of_birth = "15/06/1990".to_string();
        assert!(p.validate().is_err());
    }

    #[test]
    fn bad_phone_is_rejected() {
        let mut p = payload();
        p.phone_number = "call me".to_string();
        assert!(p.validate().is_err());
    }

    #[test]
    fn oversized_info_is_rejected() {
        let mut p = payload();
        p.info = Some("x".repeat(351));
        assert!(p.validate().is_err());
    }
}
