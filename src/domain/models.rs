use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

use crate::error::SurveyError;

/// Question carrying the mandatory 1-5 event rating.
pub const RATING_QUESTION: &str = "q1";
/// Optional free-text question ("what impressed you the most").
pub const FEEDBACK_QUESTION: &str = "q2";

#[derive(Clone, Copy, Debug, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "employee_role", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    Member,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Member => "MEMBER",
            UserRole::Admin => "ADMIN",
        }
    }
}

impl TryFrom<&str> for UserRole {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_uppercase().as_str() {
            "MEMBER" => Ok(UserRole::Member),
            "ADMIN" => Ok(UserRole::Admin),
            _ => Err(()),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow, PartialEq, Eq)]
pub struct Employee {
    pub email: String,
    pub name: String,
    pub department: String,
    pub level: String,
    pub position: String,
    pub join_date: NaiveDate,
    pub role: UserRole,
}

impl Employee {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Canonical form used for every email comparison.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// A validated 1..=5 rating.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(transparent)]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: i64) -> Option<Self> {
        (i64::from(Self::MIN)..=i64::from(Self::MAX))
            .contains(&value)
            .then(|| Rating(value as u8))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Answer {
    Rating(Rating),
    Text(String),
    /// Answer to a question this service does not know about yet.
    Unknown(serde_json::Value),
}

impl Serialize for Answer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Answer::Rating(r) => r.serialize(serializer),
            Answer::Text(t) => t.serialize(serializer),
            Answer::Unknown(v) => v.serialize(serializer),
        }
    }
}

/// Answers keyed by question id, validated per known question.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Answers(BTreeMap<String, Answer>);

impl Answers {
    /// Parses the open JSON mapping sent by clients.
    ///
    /// `q1` must be an integer rating in 1..=5, `q2` a string (or null),
    /// stored as sent.
    /// Anything else is kept verbatim as [`Answer::Unknown`].
    pub fn from_raw(raw: HashMap<String, serde_json::Value>) -> Result<Self, SurveyError> {
        let mut answers = BTreeMap::new();
        for (key, value) in raw {
            match key.as_str() {
                RATING_QUESTION => {
                    let rating = value
                        .as_i64()
                        .and_then(Rating::new)
                        .ok_or_else(|| {
                            SurveyError::Validation(format!(
                                "{RATING_QUESTION} must be an integer between {} and {}",
                                Rating::MIN,
                                Rating::MAX
                            ))
                        })?;
                    answers.insert(key, Answer::Rating(rating));
                }
                FEEDBACK_QUESTION => match value {
                    serde_json::Value::Null => {}
                    serde_json::Value::String(text) => {
                        answers.insert(key, Answer::Text(text));
                    }
                    _ => {
                        return Err(SurveyError::Validation(format!(
                            "{FEEDBACK_QUESTION} must be text"
                        )))
                    }
                },
                _ => {
                    answers.insert(key, Answer::Unknown(value));
                }
            }
        }
        Ok(Self(answers))
    }

    pub fn get(&self, question: &str) -> Option<&Answer> {
        self.0.get(question)
    }

    pub fn rating(&self, question: &str) -> Option<Rating> {
        match self.get(question)? {
            Answer::Rating(r) => Some(*r),
            _ => None,
        }
    }

    pub fn text(&self, question: &str) -> Option<&str> {
        match self.get(question)? {
            Answer::Text(t) => Some(t.as_str()),
            _ => None,
        }
    }

    #[cfg(test)]
    pub fn insert(&mut self, question: impl Into<String>, answer: Answer) {
        self.0.insert(question.into(), answer);
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// A submission as it arrives from a logged-in employee.
#[derive(Clone, Debug)]
pub struct SurveySubmission {
    pub email: String,
    pub survey_id: String,
    pub answers: Answers,
}

impl SurveySubmission {
    /// Form-level precondition: the mandatory rating must be present.
    pub fn validate(self) -> Result<NewResponse, SurveyError> {
        if self.answers.rating(RATING_QUESTION).is_none() {
            return Err(SurveyError::Validation(format!(
                "{RATING_QUESTION} rating is required"
            )));
        }
        Ok(NewResponse {
            email: normalize_email(&self.email),
            survey_id: self.survey_id,
            answers: self.answers,
        })
    }
}

/// A response ready to be appended; id and timestamp come from the store.
#[derive(Clone, Debug)]
pub struct NewResponse {
    pub email: String,
    pub survey_id: String,
    pub answers: Answers,
}

#[derive(Clone, Debug, Serialize)]
pub struct SurveyResponse {
    pub id: Uuid,
    pub email: String,
    pub survey_id: String,
    pub answers: Answers,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee: Option<Employee>,
}

#[derive(Debug)]
pub enum InsertOutcome {
    Inserted(SurveyResponse),
    Duplicate,
}
