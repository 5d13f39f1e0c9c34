use std::collections::HashSet;

use serde::{Deserialize, Serialize};

pub const LOCAL_CLASS_DESCRIPTION: &str = "Local class";
const UNKNOWN: &str = "-";

/// Class record as served by the backend (no personal data).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassRecord {
    pub class_id: String,
    pub class_name: String,
    #[serde(default)]
    pub grade_level: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub schedule: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    pub teacher_id: String,
    pub school_id: i64,
    #[serde(default)]
    pub last_active: Option<String>,
    #[serde(default)]
    pub students: Option<i64>,
    #[serde(rename = "avgScore", default)]
    pub avg_score: Option<f64>,
    #[serde(rename = "gamesPlayed", default)]
    pub games_played: Option<i64>,
}

/// Locally kept class data that may carry names the backend never sees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalClass {
    pub class_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub grade_level: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub teacher_id: Option<String>,
    #[serde(default)]
    pub school_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayClass {
    pub class_id: String,
    pub class_name: String,
    pub grade_level: Option<String>,
    pub description: Option<String>,
    pub schedule: Option<String>,
    pub location: Option<String>,
    pub status: Option<String>,
    pub teacher_id: String,
    pub school_id: i64,
    pub last_active: Option<String>,
    pub students: i64,
    #[serde(rename = "avgScore")]
    pub avg_score: f64,
    #[serde(rename = "gamesPlayed")]
    pub games_played: i64,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.is_empty())
}

/// Merges backend classes with local overrides keyed by `class_id`.
///
/// Non-empty local name, grade and teacher win over the server's values.
/// Server order is kept; local-only classes follow in local order.
pub fn merge_classes(server: &[ClassRecord], local: &[LocalClass]) -> Vec<DisplayClass> {
    let mut merged = Vec::with_capacity(server.len() + local.len());
    let mut seen = HashSet::new();

    for record in server {
        if !seen.insert(record.class_id.as_str()) {
            continue;
        }
        let local_match = local.iter().find(|l| l.class_id == record.class_id);

        merged.push(DisplayClass {
            class_id: record.class_id.clone(),
            class_name: local_match
                .and_then(|l| present(&l.name))
                .unwrap_or(record.class_name.as_str())
                .to_string(),
            grade_level: local_match
                .and_then(|l| present(&l.grade_level))
                .map(str::to_string)
                .or_else(|| record.grade_level.clone()),
            description: record.description.clone(),
            schedule: record.schedule.clone(),
            location: record.location.clone(),
            status: record.status.clone(),
            teacher_id: local_match
                .and_then(|l| present(&l.teacher_id))
                .unwrap_or(record.teacher_id.as_str())
                .to_string(),
            school_id: record.school_id,
            last_active: record.last_active.clone(),
            students: record.students.unwrap_or(0),
            avg_score: record.avg_score.unwrap_or(0.0),
            games_played: record.games_played.unwrap_or(0),
        });
    }

    for class in local {
        if !seen.insert(class.class_id.as_str()) {
            continue;
        }
        merged.push(DisplayClass {
            class_id: class.class_id.clone(),
            class_name: class.name.clone().unwrap_or_default(),
            grade_level: class.grade_level.clone(),
            description: Some(LOCAL_CLASS_DESCRIPTION.to_string()),
            schedule: Some(UNKNOWN.to_string()),
            location: Some(UNKNOWN.to_string()),
            status: class.status.clone(),
            teacher_id: class.teacher_id.clone().unwrap_or_default(),
            school_id: class.school_id,
            last_active: Some(UNKNOWN.to_string()),
            students: 0,
            avg_score: 0.0,
            games_played: 0,
        });
    }

    merged
}
