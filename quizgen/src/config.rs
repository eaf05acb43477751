//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `QUIZGEN_CONFIG`
//! environment variable.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `QUIZGEN_` override YAML values
//! 3. **OPENAI_API_KEY** - Special case: overrides `upstream.openai.api_key` if set
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `QUIZGEN_QUIZ__MODEL=gpt-4o` sets the `quiz.model` field.
//!
//! ## Usage
//!
//! ```no_run
//! use clap::Parser;
//! use quizgen::config::{Args, Config};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let args = Args::parse();
//! let config = Config::load(&args)?;
//!
//! println!("Server will bind to {}:{}", config.host, config.port);
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration Structure
//!
//! - **Server**: `host`, `port` - HTTP server binding configuration
//! - **Upstream**: `upstream.openai` or `upstream.dummy` - where quiz completions come from
//! - **Quiz**: `quiz.model`, `quiz.temperature`, `quiz.question_count`, `quiz.validate_questions`
//! - **Limits**: `limits.max_notes_bytes` - upper bound on accepted notes
//! - **CORS**: `cors.allowed_origins`, `cors.max_age` - origins allowed to call the API
//! - **Features**: `enable_metrics`, `log_format`
//!
//! ## Environment Variable Examples
//!
//! ```bash
//! # Override server port
//! QUIZGEN_PORT=8080
//!
//! # Upstream credential (preferred method)
//! OPENAI_API_KEY="sk-..."
//!
//! # Override nested values
//! QUIZGEN_QUIZ__TEMPERATURE=0.2
//! QUIZGEN_ENABLE_METRICS=true
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use crate::errors::Error;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "QUIZGEN_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
///
/// All fields have defaults defined in the `Default` implementation, so an empty or missing
/// config file yields a runnable (if credential-less) service.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Upstream credential taken from `OPENAI_API_KEY`. Folded into `upstream` on load.
    pub openai_api_key: Option<String>,
    /// Provider used to generate quiz completions
    pub upstream: UpstreamConfig,
    /// Prompt and model settings for quiz generation
    pub quiz: QuizConfig,
    /// Upload limits
    pub limits: LimitsConfig,
    /// CORS settings for the browser front-end
    pub cors: CorsConfig,
    /// Enable Prometheus metrics endpoint at `/internal/metrics`
    pub enable_metrics: bool,
    /// Console log output format
    pub log_format: LogFormat,
}

/// Upstream completion provider configuration.
///
/// Exactly one provider is configured. Credentials should be set via environment variables.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpstreamConfig {
    /// OpenAI-compatible chat completion API
    /// Set credentials via:
    /// - `OPENAI_API_KEY` or `QUIZGEN_UPSTREAM__OPENAI__API_KEY`
    OpenAi(OpenAiConfig),
    /// Fixed completion for local development; never touches the network
    Dummy(DummyConfig),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OpenAiConfig {
    /// Base URL of the API, up to and including the version segment
    pub base_url: Url,
    /// Bearer token sent with every request. Absence is not checked locally.
    pub api_key: Option<String>,
    /// Overall request timeout. Unset means wait indefinitely.
    #[serde(with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DummyConfig {
    /// Message content returned for every completion
    pub content: String,
}

/// Quiz generation settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QuizConfig {
    /// Model identifier sent upstream
    pub model: String,
    /// Sampling temperature sent upstream (0.0 - 2.0)
    pub temperature: f32,
    /// Number of questions the prompt asks for (1 - 20)
    pub question_count: usize,
    /// Reject model output whose questions do not have four options and an in-range answer
    pub validate_questions: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    /// Maximum size of the notes text or uploaded file, in bytes
    pub max_notes_bytes: usize,
}

/// CORS (Cross-Origin Resource Sharing) configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins for CORS requests
    pub allowed_origins: Vec<CorsOrigin>,
    /// Cache preflight requests for this many seconds
    pub max_age: Option<u64>,
}

/// CORS origin configuration.
///
/// Can be either a wildcard (`*`) to allow all origins, or a specific URL.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CorsOrigin {
    /// Allow all origins (`*`)
    #[serde(deserialize_with = "parse_wildcard")]
    Wildcard,
    /// Specific origin URL (e.g., `https://app.example.com`)
    #[serde(deserialize_with = "parse_url")]
    Url(Url),
}

fn parse_wildcard<'de, D>(deserializer: D) -> Result<(), D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    if s == "*" {
        Ok(())
    } else {
        Err(serde::de::Error::custom("Expected '*'"))
    }
}

fn parse_url<'de, D>(deserializer: D) -> Result<Url, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    Url::parse(&s).map_err(serde::de::Error::custom)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            openai_api_key: None,
            upstream: UpstreamConfig::default(),
            quiz: QuizConfig::default(),
            limits: LimitsConfig::default(),
            cors: CorsConfig::default(),
            enable_metrics: false,
            log_format: LogFormat::Text,
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        UpstreamConfig::OpenAi(OpenAiConfig::default())
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse("https://api.openai.com/v1").expect("static URL is valid"),
            api_key: None,
            timeout: None,
        }
    }
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            content: r#"[{"question":"What does the dummy provider return?","options":["A fixed quiz","Nothing","An error","Random text"],"correct":0,"explanation":"The dummy provider always returns this configured content."}]"#
                .to_string(),
        }
    }
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            question_count: 5,
            validate_questions: true,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_notes_bytes: 1024 * 1024, // 1 MiB
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![CorsOrigin::Wildcard],
            max_age: Some(3600),
        }
    }
}

impl Config {
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let mut config: Self = Self::figment(args).extract()?;

        // OPENAI_API_KEY wins over any key set in the file
        if let Some(api_key) = config.openai_api_key.take() {
            match &mut config.upstream {
                UpstreamConfig::OpenAi(openai) => openai.api_key = Some(api_key),
                UpstreamConfig::Dummy(_) => {
                    // Dummy provider has no credential
                }
            }
        }

        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), Error> {
        if !(0.0..=2.0).contains(&self.quiz.temperature) {
            return Err(Error::Internal {
                operation: format!(
                    "Config validation: quiz.temperature must be between 0.0 and 2.0 (got {})",
                    self.quiz.temperature
                ),
            });
        }

        if !(1..=20).contains(&self.quiz.question_count) {
            return Err(Error::Internal {
                operation: format!(
                    "Config validation: quiz.question_count must be between 1 and 20 (got {})",
                    self.quiz.question_count
                ),
            });
        }

        if self.quiz.model.trim().is_empty() {
            return Err(Error::Internal {
                operation: "Config validation: quiz.model cannot be empty".to_string(),
            });
        }

        if self.limits.max_notes_bytes == 0 {
            return Err(Error::Internal {
                operation: "Config validation: limits.max_notes_bytes must be greater than zero".to_string(),
            });
        }

        if self.cors.allowed_origins.is_empty() {
            return Err(Error::Internal {
                operation: "Config validation: CORS allowed_origins cannot be empty. Add at least one allowed origin.".to_string(),
            });
        }

        Ok(())
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Environment variables can still override specific values
            .merge(Env::prefixed("QUIZGEN_").ignore(&["config"]).split("__"))
            // The conventional credential variable
            .merge(Env::raw().only(&["OPENAI_API_KEY"]))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
