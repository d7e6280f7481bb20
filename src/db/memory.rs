use super::SurveyStore;
use crate::domain::models::{normalize_email, Employee, InsertOutcome, NewResponse, SurveyResponse};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Process-local store used when no database is configured.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Default)]
struct Inner {
    employees: HashMap<String, Employee>, // normalized email -> employee
    responses: Vec<SurveyResponse>,
}

impl Inner {
    fn has_response(&self, email: &str, survey_id: &str) -> bool {
        self.responses
            .iter()
            .any(|r| r.email == email && r.survey_id == survey_id)
    }
}

impl InMemoryStore {
    pub fn with_employees(employees: impl IntoIterator<Item = Employee>) -> Self {
        let employees = employees
            .into_iter()
            .map(|e| (normalize_email(&e.email), e))
            .collect();
        Self {
            inner: Arc::new(RwLock::new(Inner {
                employees,
                responses: Vec::new(),
            })),
        }
    }
}

#[async_trait]
impl SurveyStore for InMemoryStore {
    async fn find_employee_by_email(&self, email: &str) -> Result<Option<Employee>> {
        let inner = self.inner.read().await;
        Ok(inner.employees.get(&normalize_email(email)).cloned())
    }

    async fn list_employees(&self) -> Result<Vec<Employee>> {
        let inner = self.inner.read().await;
        let mut employees: Vec<Employee> = inner.employees.values().cloned().collect();
        employees.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(employees)
    }

    async fn list_responses(&self) -> Result<Vec<SurveyResponse>> {
        let inner = self.inner.read().await;
        let responses = inner
            .responses
            .iter()
            .map(|r| SurveyResponse {
                employee: inner.employees.get(&r.email).cloned(),
                ..r.clone()
            })
            .collect();
        Ok(responses)
    }

    async fn has_response(&self, email: &str, survey_id: &str) -> Result<bool> {
        let inner = self.inner.read().await;
        Ok(inner.has_response(&normalize_email(email), survey_id))
    }

    async fn insert_response(&self, response: NewResponse) -> Result<InsertOutcome> {
        let email = normalize_email(&response.email);
        let mut inner = self.inner.write().await;
        if inner.has_response(&email, &response.survey_id) {
            return Ok(InsertOutcome::Duplicate);
        }

        let stored = SurveyResponse {
            id: Uuid::new_v4(),
            employee: inner.employees.get(&email).cloned(),
            email,
            survey_id: response.survey_id,
            answers: response.answers,
            created_at: Utc::now(),
        };
        inner.responses.push(SurveyResponse {
            employee: None,
            ..stored.clone()
        });
        Ok(InsertOutcome::Inserted(stored))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::seed::demo_employees;
    use crate::domain::models::{Answer, Answers, Rating, RATING_QUESTION};

    fn new_response(email: &str, survey_id: &str) -> NewResponse {
        let mut answers = Answers::default();
        answers.insert(RATING_QUESTION, Answer::Rating(Rating::new(4).unwrap()));
        NewResponse {
            email: email.to_string(),
            survey_id: survey_id.to_string(),
            answers,
        }
    }

    #[tokio::test]
    async fn test_lookup_is_case_insensitive() {
        let store = InMemoryStore::with_employees(demo_employees());
        let found = store
            .find_employee_by_email("  DEV1@company.com")
            .await
            .unwrap();
        assert_eq!(found.map(|e| e.name), Some("Developer One".to_string()));
        assert!(store
            .find_employee_by_email("ghost@company.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicates() {
        let store = InMemoryStore::with_employees(demo_employees());

        let first = store
            .insert_response(new_response("dev1@company.com", "s1"))
            .await
            .unwrap();
        assert!(matches!(first, InsertOutcome::Inserted(_)));

        for _ in 0..2 {
            let again = store
                .insert_response(new_response("Dev1@Company.com", "s1"))
                .await
                .unwrap();
            assert!(matches!(again, InsertOutcome::Duplicate));
            assert_eq!(store.list_responses().await.unwrap().len(), 1);
        }

        // Another survey is a separate campaign.
        let other = store
            .insert_response(new_response("dev1@company.com", "s2"))
            .await
            .unwrap();
        assert!(matches!(other, InsertOutcome::Inserted(_)));
        assert!(store.has_response("dev1@company.com", "s2").await.unwrap());
    }

    #[tokio::test]
    async fn test_responses_are_joined_with_employees() {
        let store = InMemoryStore::with_employees(demo_employees());
        store
            .insert_response(new_response("sale1@company.com", "s1"))
            .await
            .unwrap();
        store
            .insert_response(new_response("contractor@elsewhere.com", "s1"))
            .await
            .unwrap();

        let responses = store.list_responses().await.unwrap();
        assert_eq!(responses.len(), 2);
        let sales = responses
            .iter()
            .find(|r| r.email == "sale1@company.com")
            .unwrap();
        assert_eq!(sales.employee.as_ref().map(|e| e.department.as_str()), Some("Sales"));
        let contractor = responses
            .iter()
            .find(|r| r.email == "contractor@elsewhere.com")
            .unwrap();
        assert!(contractor.employee.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_inserts_keep_one() {
        let store = InMemoryStore::with_employees(demo_employees());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .insert_response(new_response("dev2@company.com", "s1"))
                    .await
                    .unwrap()
            }));
        }

        let mut inserted = 0;
        for handle in handles {
            if let InsertOutcome::Inserted(_) = handle.await.unwrap() {
                inserted += 1;
            }
        }
        assert_eq!(inserted, 1);
        assert_eq!(store.list_responses().await.unwrap().len(), 1);
    }
}
