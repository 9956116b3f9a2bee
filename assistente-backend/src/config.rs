use std::env;

/// Environment variable names - single source of truth
pub mod env_vars {
    pub const PORT: &str = "PORT";
    pub const DATABASE_URL: &str = "DATABASE_URL";
    pub const GEMINI_API_KEY: &str = "GEMINI_API_KEY";
    pub const GEMINI_MODEL: &str = "GEMINI_MODEL";
    pub const GEMINI_THINKING_BUDGET: &str = "GEMINI_THINKING_BUDGET";
    pub const TELEGRAM_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
}

/// Default values
pub mod defaults {
    pub const DATABASE_URL: &str = "./.db/assistente.db";
    pub const GEMINI_MODEL: &str = "gemini-2.5-pro";
    pub const GEMINI_THINKING_BUDGET: i32 = -1;
}

#[derive(Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    /// Empty when unset; the model client reports the misconfiguration per
    /// turn instead of blocking startup.
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_thinking_budget: i32,
    /// Absent token disables the Telegram channel entirely.
    pub telegram_bot_token: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            port: env::var(env_vars::PORT)
                .expect("PORT must be set")
                .parse()
                .expect("PORT must be a valid number"),
            database_url: env::var(env_vars::DATABASE_URL)
                .unwrap_or_else(|_| defaults::DATABASE_URL.to_string()),
            gemini_api_key: env::var(env_vars::GEMINI_API_KEY).unwrap_or_default(),
            gemini_model: env::var(env_vars::GEMINI_MODEL)
                .unwrap_or_else(|_| defaults::GEMINI_MODEL.to_string()),
            gemini_thinking_budget: env::var(env_vars::GEMINI_THINKING_BUDGET)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults::GEMINI_THINKING_BUDGET),
            telegram_bot_token: env::var(env_vars::TELEGRAM_BOT_TOKEN)
                .ok()
                .filter(|t| !t.is_empty()),
        }
    }
}
