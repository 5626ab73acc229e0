//! Per-user contact storage.
//!
//! Every query is scoped by the owning user's id; one user can never read or
//! mutate another user's contacts.

use chrono::{Datelike, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Contact {
    pub id: Uuid,
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub date_of_birth: NaiveDate,
    pub info: Option<String>,
}

/// Contact fields as supplied by the client, used for create and update.
#[derive(Debug, Clone)]
pub struct ContactData {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub date_of_birth: NaiveDate,
    pub info: Option<String>,
}

const COLUMNS: &str =
    "id, user_id, first_name, last_name, email, phone_number, date_of_birth, info";

pub async fn list(
    pool: &PgPool,
    user_id: Uuid,
    skip: i64,
    limit: i64,
) -> Result<Vec<Contact>, AppError> {
    let contacts = sqlx::query_as::<_, Contact>(&format!(
        "SELECT {} FROM contacts WHERE user_id = $1 ORDER BY last_name, first_name OFFSET $2 LIMIT $3",
        COLUMNS
    ))
    .bind(user_id)
    .bind(skip)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(contacts)
}

pub async fn get(
    pool: &PgPool,
    user_id: Uuid,
    contact_id: Uuid,
) -> Result<Option<Contact>, AppError> {
    let contact = sqlx::query_as::<_, Contact>(&format!(
        "SELECT {} FROM contacts WHERE user_id = $1 AND id = $2",
        COLUMNS
    ))
    .bind(user_id)
    .bind(contact_id)
    .fetch_optional(pool)
    .await?;

    Ok(contact)
}

pub async fn create(
    pool: &PgPool,
    user_id: Uuid,
    data: ContactData,
) -> Result<Contact, AppError> {
    let contact = sqlx::query_as::<_, Contact>(&format!(
        r#"
        INSERT INTO contacts (id, user_id, first_name, last_name, email, phone_number, date_of_birth, info, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING {}
        "#,
        COLUMNS
    ))
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(&data.first_name)
    .bind(&data.last_name)
    .bind(&data.email)
    .bind(&data.phone_number)
    .bind(data.date_of_birth)
    .bind(&data.info)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;

    Ok(contact)
}

pub async fn update(
    pool: &PgPool,
    user_id: Uuid,
    contact_id: Uuid,
    data: ContactData,
) -> Result<Option<Contact>, AppError> {
    let contact = sqlx::query_as::<_, Contact>(&format!(
        r#"
        UPDATE contacts
        SET first_name = $3, last_name = $4, email = $5, phone_number = $6, date_of_birth = $7, info = $8
        WHERE user_id = $1 AND id = $2
        RETURNING {}
        "#,
        COLUMNS
    ))
    .bind(user_id)
    .bind(contact_id)
    .bind(&data.first_name)
    .bind(&data.last_name)
    .bind(&data.email)
    .bind(&data.phone_number)
    .bind(data.date_of_birth)
    .bind(&data.info)
    .fetch_optional(pool)
    .await?;

    Ok(contact)
}

pub async fn remove(
    pool: &PgPool,
    user_id: Uuid,
    contact_id: Uuid,
) -> Result<Option<Contact>, AppError> {
    let contact = sqlx::query_as::<_, Contact>(&format!(
        "DELETE FROM contacts WHERE user_id = $1 AND id = $2 RETURNING {}",
        COLUMNS
    ))
    .bind(user_id)
    .bind(contact_id)
    .fetch_optional(pool)
    .await?;

    Ok(contact)
}

/// Case-insensitive substring match over first or last name.
pub async fn search_by_name(
    pool: &PgPool,
    user_id: Uuid,
    query: &str,
) -> Result<Vec<Contact>, AppError> {
    let pattern = format!("%{}%", query);
    let contacts = sqlx::query_as::<_, Contact>(&format!(
        r#"
        SELECT {} FROM contacts
        WHERE user_id = $1 AND (first_name ILIKE $2 OR last_name ILIKE $2)
        ORDER BY last_name, first_name
        "#,
        COLUMNS
    ))
    .bind(user_id)
    .bind(pattern)
    .fetch_all(pool)
    .await?;

    Ok(contacts)
}

pub async fn search_by_email(
    pool: &PgPool,
    user_id: Uuid,
    query: &str,
) -> Result<Vec<Contact>, AppError> {
    let pattern = format!("%{}%", query);
    let contacts = sqlx::query_as::<_, Contact>(&format!(
        "SELECT {} FROM contacts WHERE user_id = $1 AND email ILIKE $2 ORDER BY email",
        COLUMNS
    ))
    .bind(user_id)
    .bind(pattern)
    .fetch_all(pool)
    .await?;

    Ok(contacts)
}

/// Contacts whose birthday falls within the next 7 days.
///
/// Deliberately filters a paginated page in-process rather than in the
/// query, preserving the behavior of the system this one replaces; a
/// page-sized slice can therefore yield fewer upcoming birthdays than exist
/// overall.
pub async fn upcoming_birthdays(
    pool: &PgPool,
    user_id: Uuid,
    skip: i64,
    limit: i64,
) -> Result<Vec<Contact>, AppError> {
    let today = Utc::now().date_naive();
    let page = list(pool, user_id, skip, limit).await?;

    Ok(page
        .into_iter()
        .filter(|c| is_upcoming_birthday(c.date_of_birth, today))
        .collect())
}

/// True if the birthday, projected into the current year, falls within
/// [today, today + 7 days). Feb 29 birthdays are skipped in non-leap years.
fn is_upcoming_birthday(date_of_birth: NaiveDate, today: NaiveDate) -> bool {
    match date_of_birth.with_year(today.year()) {
        Some(this_year) => {
            let days_between = (this_year - today).num_days();
            (0..7).contains(&days_between)
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn birthday_today_is_upcoming() {
        let today = date(2024, 6, 15);
        assert!(is_upcoming_birthday(date(1990, 6, 15), today));
    }

    #[test]
    fn birthday_in_six_days_is_upcoming() {
        let today = date(2024, 6, 15);
        assert!(is_upcoming_birthday(date(1990, 6, 21), today));
    }

    #[test]
    fn birthday_in_seven_days_is_not_upcoming() {
        let today = date(2024, 6, 15);
        assert!(!is_upcoming_birthday(date(1990, 6, 22), today));
    }

    #[test]
    fn birthday_yesterday_is_not_upcoming() {
        let today = date(2024, 6, 15);
        assert!(!is_upcoming_birthday(date(1990, 6, 14), today));
    }

    #[test]
    fn feb_29_is_skipped_in_non_leap_years() {
        let today = date(2023, 2, 25);
        assert!(!is_upcoming_birthday(date(1992, 2, 29), today));

        let leap_today = date(2024, 2, 25);
        assert!(is_upcoming_birthday(date(1992, 2, 29), leap_today));
    }
}
