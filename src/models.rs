use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::lifecycle::{ApplicationStatus, PackageTier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Tr,
    #[default]
    En,
    Es,
    Fr,
    De,
}

impl Language {
    /// Exact code lookup; anything else, regional variants included, maps to English.
    pub fn from_code(code: &str) -> Self {
        match code {
            "tr" => Language::Tr,
            "es" => Language::Es,
            "fr" => Language::Fr,
            "de" => Language::De,
            _ => Language::En,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Language::Tr => "tr",
            Language::En => "en",
            Language::Es => "es",
            Language::Fr => "fr",
            Language::De => "de",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingInfo {
    pub name: String,
    pub address: String,
    pub tax_office: String,
    pub tax_number: String,
}

impl BillingInfo {
    /// First required billing field that is blank, in form order.
    pub fn first_missing(&self) -> Option<&'static str> {
        [
            ("name", &self.name),
            ("address", &self.address),
            ("taxOffice", &self.tax_office),
            ("taxNumber", &self.tax_number),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmbassadorApplication {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub school: String,
    pub city: String,
    pub district: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub experience: String,
    pub motivation: String,
    #[serde(default)]
    pub student_count: Option<i32>,
    pub status: ApplicationStatus,
    #[serde(default)]
    pub package_name: Option<PackageTier>,
    #[serde(default)]
    pub price: Option<i32>,
    #[serde(default)]
    pub billing_info: Option<BillingInfo>,
    #[serde(default)]
    pub notes: Option<String>,
    pub submitted_at: DateTime<Utc>,
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reviewed_by: Option<String>,
    #[serde(default)]
    pub payment_declared_at: Option<DateTime<Utc>>,
}

impl AmbassadorApplication {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Panel opened for an ambassador once payment is confirmed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmbassadorPanel {
    pub application_id: String,
    pub package_name: String,
    pub activated_at: DateTime<Utc>,
    pub reviewed_by: String,
}

/// Public application form as posted by an applicant.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplicationForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub school: String,
    pub city: String,
    pub district: String,
    pub region: String,
    pub experience: String,
    pub motivation: String,
    pub student_count: Option<i32>,
    pub package_name: Option<String>,
    pub price: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectScore {
    pub subject: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameScore {
    pub game: String,
    pub score: f64,
    #[serde(default)]
    pub skills: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillScore {
    pub skill: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogGame {
    pub id: i64,
    pub game_name: String,
    #[serde(default)]
    pub description: String,
}

/// Aggregated performance data handed to the report generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentDataForReport {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub games_played: Option<u32>,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(rename = "developmentAreas", default)]
    pub development_areas: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badges: Option<Vec<String>>,
    #[serde(rename = "subjectScores", default, skip_serializing_if = "Option::is_none")]
    pub subject_scores: Option<Vec<SubjectScore>>,
    #[serde(rename = "gameScores", default)]
    pub game_scores: Vec<GameScore>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills: Option<Vec<SkillScore>>,
    #[serde(rename = "allGames", default)]
    pub all_games: Vec<CatalogGame>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSection {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportListSection {
    pub title: String,
    pub content: String,
    pub items: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecommendation {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendedGames {
    pub title: String,
    pub content: String,
    pub games: Vec<GameRecommendation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanHorizon {
    pub title: String,
    pub items: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionPlan {
    pub title: String,
    pub short_term: PlanHorizon,
    pub medium_term: PlanHorizon,
    pub long_term: PlanHorizon,
}

/// Structured progress report the model is asked to return in JSON mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AIReport {
    pub overall_assessment: ReportSection,
    pub strengths: ReportListSection,
    pub development_suggestions: ReportListSection,
    pub recommended_games: RecommendedGames,
    pub action_plan: ActionPlan,
    pub future_projection: ReportSection,
    pub conclusion: ReportSection,
}
