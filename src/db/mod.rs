pub mod memory;
pub mod seed;

use crate::domain::models::{
    normalize_email, Answers, Employee, InsertOutcome, NewResponse, SurveyResponse, UserRole,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

pub use memory::InMemoryStore;

/// Backing store for employees and survey responses.
///
/// Employees are read-only; responses are append-only. `insert_response`
/// must re-check the `(email, survey_id)` duplicate condition atomically
/// with the append.
#[async_trait]
pub trait SurveyStore: Send + Sync {
    async fn find_employee_by_email(&self, email: &str) -> Result<Option<Employee>>;
    async fn list_employees(&self) -> Result<Vec<Employee>>;
    /// Every response, joined with its employee when one matches.
    async fn list_responses(&self) -> Result<Vec<SurveyResponse>>;
    async fn has_response(&self, email: &str, survey_id: &str) -> Result<bool>;
    async fn insert_response(&self, response: NewResponse) -> Result<InsertOutcome>;
}

pub struct PgStore {
    pool: PgPool,
}

#[derive(Debug, FromRow)]
struct ResponseRow {
    id: Uuid,
    email: String,
    survey_id: String,
    answers: serde_json::Value,
    created_at: DateTime<Utc>,
    e_email: Option<String>,
    e_name: Option<String>,
    e_department: Option<String>,
    e_level: Option<String>,
    e_position: Option<String>,
    e_join_date: Option<NaiveDate>,
    e_role: Option<UserRole>,
}

impl ResponseRow {
    fn into_response(self) -> Result<SurveyResponse> {
        let raw: HashMap<String, serde_json::Value> =
            serde_json::from_value(self.answers).context("answers column is not an object")?;
        let answers = Answers::from_raw(raw)
            .with_context(|| format!("stored answers for response {} are invalid", self.id))?;

        let employee = match (
            self.e_email,
            self.e_name,
            self.e_department,
            self.e_level,
            self.e_position,
            self.e_join_date,
            self.e_role,
        ) {
            (
                Some(email),
                Some(name),
                Some(department),
                Some(level),
                Some(position),
                Some(join_date),
                Some(role),
            ) => Some(Employee {
                email,
                name,
                department,
                level,
                position,
                join_date,
                role,
            }),
            _ => None,
        };

        Ok(SurveyResponse {
            id: self.id,
            email: self.email,
            survey_id: self.survey_id,
            answers,
            created_at: self.created_at,
            employee,
        })
    }
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SurveyStore for PgStore {
    async fn find_employee_by_email(&self, email: &str) -> Result<Option<Employee>> {
        let employee = sqlx::query_as::<_, Employee>(
            r#"
            SELECT email, name, department, level, position, join_date, role
            FROM employees
            WHERE lower(email) = $1
            "#,
        )
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await?;
        Ok(employee)
    }

    async fn list_employees(&self) -> Result<Vec<Employee>> {
        let employees = sqlx::query_as::<_, Employee>(
            r#"
            SELECT email, name, department, level, position, join_date, role
            FROM employees
            ORDER BY email ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(employees)
    }

    async fn list_responses(&self) -> Result<Vec<SurveyResponse>> {
        let rows = sqlx::query_as::<_, ResponseRow>(
            r#"
            SELECT
                r.id,
                r.email,
                r.survey_id,
                r.answers,
                r.created_at,
                e.email AS e_email,
                e.name AS e_name,
                e.department AS e_department,
                e.level AS e_level,
                e.position AS e_position,
                e.join_date AS e_join_date,
                e.role AS e_role
            FROM survey_responses r
            LEFT JOIN employees e ON lower(e.email) = lower(r.email)
            ORDER BY r.created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ResponseRow::into_response).collect()
    }

    async fn has_response(&self, email: &str, survey_id: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM survey_responses
                WHERE lower(email) = $1 AND survey_id = $2
            )
            "#,
        )
        .bind(normalize_email(email))
        .bind(survey_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn insert_response(&self, response: NewResponse) -> Result<InsertOutcome> {
        let id = Uuid::new_v4();
        let email = normalize_email(&response.email);

        // Single statement; the unique index closes the race between two
        // sessions that both passed the NOT EXISTS check.
        let inserted = sqlx::query_scalar::<_, DateTime<Utc>>(
            r#"
            INSERT INTO survey_responses (id, email, survey_id, answers)
            SELECT $1, $2, $3, $4
            WHERE NOT EXISTS (
                SELECT 1 FROM survey_responses
                WHERE lower(email) = $2 AND survey_id = $3
            )
            RETURNING created_at
            "#,
        )
        .bind(id)
        .bind(&email)
        .bind(&response.survey_id)
        .bind(response.answers.to_json())
        .fetch_optional(&self.pool)
        .await;

        let created_at = match inserted {
            Ok(Some(created_at)) => created_at,
            Ok(None) => return Ok(InsertOutcome::Duplicate),
            Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23505") => {
                return Ok(InsertOutcome::Duplicate);
            }
            Err(e) => return Err(e.into()),
        };

        let employee = self.find_employee_by_email(&email).await?;
        Ok(InsertOutcome::Inserted(SurveyResponse {
            id,
            email,
            survey_id: response.survey_id,
            answers: response.answers,
            created_at,
            employee,
        }))
    }
}
