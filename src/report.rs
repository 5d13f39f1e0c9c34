use std::fmt::Write;

use clap::ValueEnum;
use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::gemini::{ContentGenerator, GenerationRequest, ProviderError};
use crate::models::{AIReport, Language, StudentDataForReport};
use crate::prompts;
use crate::retry::{self, MAX_ATTEMPTS};

/// Narrative text or the structured `AIReport`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Summary,
    Json,
}

/// User-facing report failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportError {
    #[error("Invalid API Key. Please check your server configuration.")]
    InvalidApiKey,

    #[error("The AI model is currently busy. Please try again in a few moments.")]
    ModelBusy,

    #[error("The AI model server encountered an error. Please try again later.")]
    ServerError,

    #[error("Failed to process AI response. The format was invalid.")]
    InvalidFormat,

    #[error("Failed to generate summary: Empty response from AI model.")]
    EmptyResponse,

    #[error("Failed to communicate with the AI model after several attempts.")]
    CommunicationFailed,

    #[error("Failed to generate AI report.")]
    GenerationFailed,
}

impl ReportError {
    fn from_summary_failure(last_error: Option<&ProviderError>) -> Self {
        let Some(err) = last_error else {
            return ReportError::CommunicationFailed;
        };
        let message = err.to_string();

        if message.contains("API key not valid") {
            ReportError::InvalidApiKey
        } else if err.is_retryable() {
            ReportError::ModelBusy
        } else if message.contains("500") {
            ReportError::ServerError
        } else {
            ReportError::CommunicationFailed
        }
    }

    fn from_json_failure(err: &ProviderError) -> Self {
        if err.to_string().contains("API key not valid") {
            ReportError::InvalidApiKey
        } else {
            ReportError::GenerationFailed
        }
    }
}

/// Narrative progress report. Overloaded and rate-limited calls are retried with backoff.
pub async fn generate_student_report_summary<G>(
    generator: &G,
    data: &StudentDataForReport,
    language: Language,
) -> Result<String, ReportError>
where
    G: ContentGenerator + ?Sized,
{
    info!(
        student = %data.name,
        language = language.code(),
        "generating report summary"
    );

    let request = GenerationRequest::text(prompts::summary_prompt(data, language));
    let mut last_error = None;

    for attempt in 1..=MAX_ATTEMPTS {
        match generator.generate_content(&request).await {
            Ok(summary) if summary.is_empty() => {
                error!(attempt, "empty response from AI model");
                return Err(ReportError::EmptyResponse);
            }
            Ok(summary) => {
                info!(student = %data.name, attempt, "report summary generated");
                return Ok(summary);
            }
            Err(err) => {
                error!(attempt, error = %err, "AI model request failed");
                let retryable = attempt < MAX_ATTEMPTS && err.is_retryable();
                last_error = Some(err);
                if !retryable {
                    break;
                }
                let delay = retry::backoff_delay(attempt, &mut rand::thread_rng());
                warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "model is busy, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }

    Err(ReportError::from_summary_failure(last_error.as_ref()))
}

/// Structured report in JSON mode. Single attempt, never retried.
pub async fn generate_student_report_json<G>(
    generator: &G,
    data: &StudentDataForReport,
    language: Language,
) -> Result<AIReport, ReportError>
where
    G: ContentGenerator + ?Sized,
{
    info!(
        student = %data.name,
        language = language.code(),
        "generating JSON report"
    );

    let prompt = prompts::json_prompt(data, language).map_err(|err| {
        error!(error = %err, "failed to serialise student data");
        ReportError::GenerationFailed
    })?;

    let text = generator
        .generate_content(&GenerationRequest::json(prompt))
        .await
        .map_err(|err| {
            error!(error = %err, "AI model request failed");
            ReportError::from_json_failure(&err)
        })?;

    let report = serde_json::from_str::<AIReport>(&text).map_err(|err| {
        error!(error = %err, "AI response is not a valid report");
        ReportError::InvalidFormat
    })?;

    info!(student = %data.name, "JSON report generated");
    Ok(report)
}

fn write_items(output: &mut String, items: &[String]) {
    for item in items {
        let _ = writeln!(output, "- {item}");
    }
}

/// Markdown rendering of a structured report for printing or sharing.
pub fn render_markdown(student_name: &str, report: &AIReport) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# {student_name}");
    let _ = writeln!(output);
    let _ = writeln!(output, "## {}", report.overall_assessment.title);
    let _ = writeln!(output, "{}", report.overall_assessment.content);

    for section in [&report.strengths, &report.development_suggestions] {
        let _ = writeln!(output);
        let _ = writeln!(output, "## {}", section.title);
        let _ = writeln!(output, "{}", section.content);
        write_items(&mut output, &section.items);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## {}", report.recommended_games.title);
    let _ = writeln!(output, "{}", report.recommended_games.content);
    for game in &report.recommended_games.games {
        let _ = writeln!(output, "- **{}**: {}", game.name, game.reason);
    }

    let plan = &report.action_plan;
    let _ = writeln!(output);
    let _ = writeln!(output, "## {}", plan.title);
    for horizon in [&plan.short_term, &plan.medium_term, &plan.long_term] {
        let _ = writeln!(output);
        let _ = writeln!(output, "### {}", horizon.title);
        write_items(&mut output, &horizon.items);
    }

    for section in [&report.future_projection, &report.conclusion] {
        let _ = writeln!(output);
        let _ = writeln!(output, "## {}", section.title);
        let _ = writeln!(output, "{}", section.content);
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct ScriptedGenerator {
        responses: Mutex<VecDeque<Result<String, ProviderError>>>,
        requests: Mutex<Vec<GenerationRequest>>,
    }

    impl ScriptedGenerator {
        fn new(responses: Vec<Result<String, ProviderError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        fn last_request(&self) -> GenerationRequest {
            self.requests.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl ContentGenerator for ScriptedGenerator {
        async fn generate_content(
            &self,
            request: &GenerationRequest,
        ) -> Result<String, ProviderError> {
            self.requests.lock().unwrap().push(request.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ProviderError::Transport("script exhausted".to_string())))
        }
    }

    fn http_error(status: u16, reason: &str, message: &str) -> ProviderError {
        ProviderError::Http {
            status,
            reason: reason.to_string(),
            message: message.to_string(),
        }
    }

    fn overloaded() -> ProviderError {
        http_error(503, "Service Unavailable", "overloaded")
    }

    fn student() -> StudentDataForReport {
        serde_json::from_str(
            r#"{
                "name": "Deniz",
                "strengths": ["Balance"],
                "developmentAreas": ["Focus"],
                "gameScores": [],
                "allGames": [{ "id": 3, "game_name": "Balance Beam", "description": "Walk the line" }]
            }"#,
        )
        .unwrap()
    }

    const REPORT_JSON: &str = r#"{
        "overallAssessment": { "title": "Overall Assessment", "content": "Deniz is progressing well." },
        "strengths": { "title": "Strengths", "content": "Steady balance.", "items": ["Balance"] },
        "developmentSuggestions": { "title": "Development Suggestions", "content": "Short focus games.", "items": ["Focus drills"] },
        "recommendedGames": { "title": "Recommended Games", "content": "From the catalog.", "games": [{ "name": "Balance Beam", "reason": "Builds on a strength" }] },
        "actionPlan": {
            "title": "Suggested Action Plan",
            "short_term": { "title": "Short-term Goals (1-2 Weeks)", "items": ["Play twice a week"] },
            "medium_term": { "title": "Medium-term Goals (1-2 Months)", "items": ["Raise focus score"] },
            "long_term": { "title": "Long-term Goals (3-6 Months)", "items": ["Lead a team game"] }
        },
        "futureProjection": { "title": "Future Development Projection", "content": "Promising." },
        "conclusion": { "title": "Conclusion", "content": "Keep going." }
    }"#;

    #[tokio::test(start_paused = true)]
    async fn summary_recovers_after_two_overloads() {
        let generator = ScriptedGenerator::new(vec![
            Err(overloaded()),
            Err(overloaded()),
            Ok("Deniz shows steady progress.".to_string()),
        ]);

        let summary = generate_student_report_summary(&generator, &student(), Language::En)
            .await
            .unwrap();

        assert_eq!(summary, "Deniz shows steady progress.");
        assert_eq!(generator.calls(), 3);
        assert!(generator.last_request().response_mime_type.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn summary_waits_at_least_the_backoff_floor() {
        let generator = ScriptedGenerator::new(vec![
            Err(http_error(429, "Too Many Requests", "quota")),
            Ok("done".to_string()),
        ]);

        let started = tokio::time::Instant::now();
        generate_student_report_summary(&generator, &student(), Language::En)
            .await
            .unwrap();
        let waited = started.elapsed();

        assert!(waited >= std::time::Duration::from_millis(2000));
        assert!(waited < std::time::Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn summary_gives_up_after_three_attempts() {
        let generator =
            ScriptedGenerator::new(vec![Err(overloaded()), Err(overloaded()), Err(overloaded())]);

        let err = generate_student_report_summary(&generator, &student(), Language::En)
            .await
            .unwrap_err();

        assert_eq!(err, ReportError::ModelBusy);
        assert_eq!(generator.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn summary_does_not_retry_other_failures() {
        let generator = ScriptedGenerator::new(vec![
            Err(http_error(500, "Internal Server Error", "backend exploded")),
            Ok("unreachable".to_string()),
        ]);

        let err = generate_student_report_summary(&generator, &student(), Language::En)
            .await
            .unwrap_err();

        assert_eq!(err, ReportError::ServerError);
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn summary_classifies_invalid_key_and_unknown_errors() {
        let generator = ScriptedGenerator::new(vec![Err(http_error(
            400,
            "Bad Request",
            "API key not valid. Please pass a valid API key.",
        ))]);
        let err = generate_student_report_summary(&generator, &student(), Language::En)
            .await
            .unwrap_err();
        assert_eq!(err, ReportError::InvalidApiKey);

        let generator = ScriptedGenerator::new(vec![Err(ProviderError::Transport(
            "connection reset by peer".to_string(),
        ))]);
        let err = generate_student_report_summary(&generator, &student(), Language::En)
            .await
            .unwrap_err();
        assert_eq!(err, ReportError::CommunicationFailed);
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_summary_is_not_retried() {
        let generator =
            ScriptedGenerator::new(vec![Ok(String::new()), Ok("second".to_string())]);

        let err = generate_student_report_summary(&generator, &student(), Language::Tr)
            .await
            .unwrap_err();

        assert_eq!(err, ReportError::EmptyResponse);
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test]
    async fn whitespace_summary_is_returned_as_is() {
        let generator = ScriptedGenerator::new(vec![Ok("\n".to_string())]);

        let summary = generate_student_report_summary(&generator, &student(), Language::En)
            .await
            .unwrap();

        assert_eq!(summary, "\n");
        assert_eq!(generator.calls(), 1);
    }

    #[test]
    fn report_format_parses_from_cli_and_json() {
        assert_eq!(ReportFormat::from_str("json", true), Ok(ReportFormat::Json));
        assert_eq!(ReportFormat::default(), ReportFormat::Summary);
        let format: ReportFormat = serde_json::from_str(r#""summary""#).unwrap();
        assert_eq!(format, ReportFormat::Summary);
    }

    #[tokio::test]
    async fn summary_prompt_falls_back_to_english() {
        let generator = ScriptedGenerator::new(vec![Ok("ok".to_string())]);
        generate_student_report_summary(&generator, &student(), Language::from_code("ja"))
            .await
            .unwrap();
        assert!(generator
            .last_request()
            .prompt
            .starts_with("# Generate Comprehensive Student Progress Report"));
    }

    #[tokio::test]
    async fn json_report_parses_structured_response() {
        let generator = ScriptedGenerator::new(vec![Ok(REPORT_JSON.to_string())]);

        let report = generate_student_report_json(&generator, &student(), Language::En)
            .await
            .unwrap();

        assert_eq!(report.recommended_games.games[0].name, "Balance Beam");
        assert_eq!(report.action_plan.long_term.items, vec!["Lead a team game".to_string()]);
        let request = generator.last_request();
        assert_eq!(request.response_mime_type, Some(crate::gemini::JSON_MIME_TYPE));
        assert!(request.prompt.contains("\"actionPlan\""));
    }

    #[tokio::test]
    async fn json_report_never_retries() {
        let generator = ScriptedGenerator::new(vec![Err(overloaded()), Ok(REPORT_JSON.to_string())]);

        let err = generate_student_report_json(&generator, &student(), Language::En)
            .await
            .unwrap_err();

        assert_eq!(err, ReportError::GenerationFailed);
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test]
    async fn json_report_classifies_bad_output_and_bad_key() {
        let generator = ScriptedGenerator::new(vec![Ok("Here is your report!".to_string())]);
        let err = generate_student_report_json(&generator, &student(), Language::En)
            .await
            .unwrap_err();
        assert_eq!(err, ReportError::InvalidFormat);

        let generator = ScriptedGenerator::new(vec![Err(http_error(
            400,
            "Bad Request",
            "API key not valid. Please pass a valid API key.",
        ))]);
        let err = generate_student_report_json(&generator, &student(), Language::En)
            .await
            .unwrap_err();
        assert_eq!(err, ReportError::InvalidApiKey);
    }

    #[test]
    fn markdown_lists_every_section() {
        let report: AIReport = serde_json::from_str(REPORT_JSON).unwrap();
        let markdown = render_markdown("Deniz", &report);

        assert!(markdown.starts_with("# Deniz\n"));
        assert!(markdown.contains("## Overall Assessment\nDeniz is progressing well."));
        assert!(markdown.contains("- Focus drills"));
        assert!(markdown.contains("- **Balance Beam**: Builds on a strength"));
        assert!(markdown.contains("### Medium-term Goals (1-2 Months)\n- Raise focus score"));
        assert!(markdown.contains("## Conclusion\nKeep going."));
    }
}
