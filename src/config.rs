use anyhow::Context;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_BACKEND_URL: &str = "https://kinefast.onrender.com";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

pub fn database_url() -> anyhow::Result<String> {
    non_empty(env_lookup("DATABASE_URL"))
        .context("DATABASE_URL must be set to a production Postgres instance")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl GeminiConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = non_empty(lookup("GOOGLE_GEN_AI_API_KEY"))
            .context("GOOGLE_GEN_AI_API_KEY is not set in environment variables")?;

        Ok(Self {
            api_key,
            model: non_empty(lookup("GEMINI_MODEL"))
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            base_url: non_empty(lookup("GEMINI_API_BASE"))
                .unwrap_or_else(|| DEFAULT_GEMINI_API_BASE.to_string()),
        })
    }
}

pub fn backend_base_url() -> String {
    backend_base_url_from(env_lookup)
}

/// `API_BASE_URL`, then the dashboard's `NEXT_PUBLIC_API_URL` and `API_URL`.
pub fn backend_base_url_from<F>(lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    ["API_BASE_URL", "NEXT_PUBLIC_API_URL", "API_URL"]
        .into_iter()
        .find_map(|key| non_empty(lookup(key)))
        .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string())
}

pub fn bind_addr() -> String {
    non_empty(env_lookup("BIND_ADDR")).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
}
