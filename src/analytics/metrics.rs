use crate::domain::models::{
    normalize_email, Employee, SurveyResponse, FEEDBACK_QUESTION, RATING_QUESTION,
};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Free-text answers are only disclosed once at least this many exist.
pub const ANONYMITY_FLOOR: usize = 3;
/// Number of calendar months in the trend series, current month included.
pub const TREND_MONTHS: u32 = 3;
pub const UNKNOWN_BUCKET: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImprovementPriority {
    High,
    Medium,
    Low,
}

impl ImprovementPriority {
    pub fn from_score(score: f64) -> Self {
        if score < 3.0 {
            ImprovementPriority::High
        } else if score < 4.0 {
            ImprovementPriority::Medium
        } else {
            ImprovementPriority::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub month: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardMetrics {
    pub total_participants: usize,
    pub participation_rate: u32,
    pub engagement_score: f64,
    pub improvement_priority: ImprovementPriority,
    pub department_breakdown: BTreeMap<String, usize>,
    pub level_breakdown: BTreeMap<String, usize>,
    pub monthly_trend: Vec<TrendPoint>,
    pub anonymized_feedback: Vec<String>,
    pub non_participants: Vec<Employee>,
}

/// Which answers feed the engagement score and the feedback list.
#[derive(Debug, Clone, Copy)]
pub struct QuestionKeys<'a> {
    pub rating: &'a str,
    pub feedback: &'a str,
}

impl Default for QuestionKeys<'static> {
    fn default() -> Self {
        Self {
            rating: RATING_QUESTION,
            feedback: FEEDBACK_QUESTION,
        }
    }
}

/// Derives the HR dashboard from a snapshot of employees and responses.
///
/// Pure: the same inputs always give the same output, and empty inputs give
/// zeros and empty collections rather than errors.
pub fn compute_metrics(
    employees: &[Employee],
    responses: &[SurveyResponse],
    keys: QuestionKeys<'_>,
    now: DateTime<Utc>,
) -> DashboardMetrics {
    let total_participants = responses.len();
    let engagement_score = engagement_score(responses, keys.rating);

    DashboardMetrics {
        total_participants,
        participation_rate: participation_rate(total_participants, employees.len()),
        engagement_score,
        improvement_priority: ImprovementPriority::from_score(engagement_score),
        department_breakdown: breakdown(responses, |e| e.department.as_str()),
        level_breakdown: breakdown(responses, |e| e.level.as_str()),
        monthly_trend: monthly_trend(responses, now),
        anonymized_feedback: anonymized_feedback(responses, keys.feedback),
        non_participants: non_participants(employees, responses),
    }
}

pub fn participation_rate(participants: usize, total_employees: usize) -> u32 {
    if total_employees == 0 {
        return 0;
    }
    let rate = (participants as f64 / total_employees as f64 * 100.0).round();
    rate.min(100.0) as u32
}

pub fn engagement_score(responses: &[SurveyResponse], rating_key: &str) -> f64 {
    let ratings: Vec<f64> = responses
        .iter()
        .filter_map(|r| r.answers.rating(rating_key))
        .map(|r| f64::from(r.value()))
        .collect();
    if ratings.is_empty() {
        return 0.0;
    }
    let mean = ratings.iter().sum::<f64>() / ratings.len() as f64;
    (mean * 10.0).round() / 10.0
}

fn breakdown<F>(responses: &[SurveyResponse], field: F) -> BTreeMap<String, usize>
where
    F: Fn(&Employee) -> &str,
{
    let mut counts = BTreeMap::new();
    for response in responses {
        let label = response
            .employee
            .as_ref()
            .map(&field)
            .filter(|v| !v.is_empty())
            .unwrap_or(UNKNOWN_BUCKET);
        *counts.entry(label.to_string()).or_insert(0) += 1;
    }
    counts
}

/// All-or-nothing: below [`ANONYMITY_FLOOR`] nothing is returned.
/// Ratings are never gated.
pub fn anonymized_feedback(responses: &[SurveyResponse], feedback_key: &str) -> Vec<String> {
    let feedback: Vec<String> = responses
        .iter()
        .filter_map(|r| r.answers.text(feedback_key))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();
    if feedback.len() < ANONYMITY_FLOOR {
        Vec::new()
    } else {
        feedback
    }
}

pub fn non_participants(employees: &[Employee], responses: &[SurveyResponse]) -> Vec<Employee> {
    let responded: HashSet<String> = responses.iter().map(|r| normalize_email(&r.email)).collect();
    employees
        .iter()
        .filter(|e| !responded.contains(&normalize_email(&e.email)))
        .cloned()
        .collect()
}

/// Responses per calendar month for the last [`TREND_MONTHS`] months,
/// oldest first. Responses outside the window are ignored.
pub fn monthly_trend(responses: &[SurveyResponse], now: DateTime<Utc>) -> Vec<TrendPoint> {
    let mut months = Vec::with_capacity(TREND_MONTHS as usize);
    let (mut year, mut month) = (now.year(), now.month());
    for _ in 0..TREND_MONTHS {
        months.push((year, month));
        if month == 1 {
            year -= 1;
            month = 12;
        } else {
            month -= 1;
        }
    }
    months.reverse();

    months
        .into_iter()
        .map(|(year, month)| {
            let count = responses
                .iter()
                .filter(|r| r.created_at.year() == year && r.created_at.month() == month)
                .count();
            let label = NaiveDate::from_ymd_opt(year, month, 1)
                .map(|d| d.format("%b").to_string())
                .unwrap_or_default();
            TrendPoint {
                month: label,
                count,
            }
        })
        .collect()
}
