//! Agent configuration with builder pattern, environment variables and a
//! TOML config document.
//!
//! Configuration is resolved in order:
//! explicit values → environment variables → config file → defaults.
//! Each layer only fills fields the previous layers left unset.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use super::binding::{Backend, Operation};
use crate::error::ConfigError;

/// Default number of clarification rounds.
const DEFAULT_CLARIFY_ITERATIONS: usize = 3;
/// Default maximum concurrent searches per plan step.
const DEFAULT_MAX_CONCURRENCY: usize = 3;
/// Default number of citations kept per search answer.
const DEFAULT_TOP_CITATIONS: usize = 1;
/// Default iteration budget for the iterative research loop.
const DEFAULT_MAX_ITERATIONS: usize = 9;
/// Plan size the planner prompt asks for.
const DEFAULT_EXPECTED_PLAN_STEPS: usize = 5;
/// Query count the query-generation prompt asks for.
const DEFAULT_EXPECTED_QUERIES: usize = 3;
/// Default max tokens for clarify/plan/query/next-step calls.
const DEFAULT_MAX_TOKENS: u32 = 2048;
/// Default max tokens for the report. Reports are long.
const DEFAULT_REPORT_MAX_TOKENS: u32 = 8192;
/// Default LLM request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 120;
/// Default search request timeout in seconds.
const DEFAULT_SEARCH_TIMEOUT_SECS: u64 = 30;
/// Default search endpoint (Exa answer API).
const DEFAULT_SEARCH_BASE_URL: &str = "https://api.exa.ai/answer";
/// Default report filename template.
const DEFAULT_FILENAME_TEMPLATE: &str = "report_{date}_{n}.md";

/// Which orchestration mode drives the research.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResearchMode {
    /// Upfront plan, parallel queries per step (breadth-first).
    #[default]
    Plan,
    /// One query at a time, each chosen from the previous results (depth-first).
    Iterative,
}

impl fmt::Display for ResearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plan => f.write_str("plan"),
            Self::Iterative => f.write_str("iterative"),
        }
    }
}

impl FromStr for ResearchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "plan" => Ok(Self::Plan),
            "iterative" | "loop" => Ok(Self::Iterative),
            other => Err(format!("unknown research mode '{other}' (expected plan or iterative)")),
        }
    }
}

/// Configuration for the research agent.
#[derive(Clone)]
pub struct AgentConfig {
    /// Backend serving each operation (`ai_providers.<operation>`).
    pub operation_backends: BTreeMap<Operation, Backend>,
    /// Model per (backend, operation) (`models.<backend>.<operation>`).
    pub models: BTreeMap<(Backend, Operation), String>,
    /// API key per backend.
    pub api_keys: BTreeMap<Backend, String>,
    /// Base URL override per backend.
    pub base_urls: BTreeMap<Backend, String>,
    /// API key for the search backend.
    pub search_api_key: Option<String>,
    /// Search endpoint URL.
    pub search_base_url: String,
    /// Orchestration mode.
    pub mode: ResearchMode,
    /// Number of clarification rounds.
    pub clarify_iterations: usize,
    /// Maximum concurrent searches per plan step.
    pub max_concurrency: usize,
    /// Citations kept per search answer in plan mode. Iterative mode keeps
    /// every citation.
    pub top_citations: usize,
    /// Iteration budget for the iterative loop.
    pub max_iterations: usize,
    /// Plan size the planner is asked for. Other sizes are logged.
    pub expected_plan_steps: usize,
    /// Query count per step the generator is asked for. Other counts are logged.
    pub expected_queries_per_step: usize,
    /// Max tokens for clarify/plan/query/next-step responses.
    pub max_tokens: u32,
    /// Max tokens for the report.
    pub report_max_tokens: u32,
    /// LLM request timeout.
    pub timeout: Duration,
    /// Search request timeout.
    pub search_timeout: Duration,
    /// Directory with prompt override files.
    pub prompt_dir: Option<PathBuf>,
    /// Directory the report is saved to.
    pub report_dir: PathBuf,
    /// Report filename template (`{date}`, `{time}`, `{n}`).
    pub filename_template: String,
}

impl AgentConfig {
    /// Creates a new builder for `AgentConfig`.
    #[must_use]
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a value fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::builder().from_env().build()
    }

    /// Backend bound to `operation`.
    #[must_use]
    pub fn backend_for(&self, operation: Operation) -> Backend {
        self.operation_backends
            .get(&operation)
            .copied()
            .unwrap_or_else(|| operation.default_backend())
    }

    /// Model requested from `backend` for `operation`.
    #[must_use]
    pub fn model_for(&self, backend: Backend, operation: Operation) -> String {
        self.models
            .get(&(backend, operation))
            .cloned()
            .unwrap_or_else(|| backend.default_model(operation).to_string())
    }
}

impl fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<&Backend> = self.api_keys.keys().collect();
        f.debug_struct("AgentConfig")
            .field("operation_backends", &self.operation_backends)
            .field("models", &self.models)
            .field("api_keys_for", &keys)
            .field("base_urls", &self.base_urls)
            .field("search_api_key", &self.search_api_key.as_ref().map(|_| "<set>"))
            .field("search_base_url", &self.search_base_url)
            .field("mode", &self.mode)
            .field("clarify_iterations", &self.clarify_iterations)
            .field("max_concurrency", &self.max_concurrency)
            .field("top_citations", &self.top_citations)
            .field("max_iterations", &self.max_iterations)
            .field("timeout", &self.timeout)
            .field("search_timeout", &self.search_timeout)
            .field("prompt_dir", &self.prompt_dir)
            .field("report_dir", &self.report_dir)
            .field("filename_template", &self.filename_template)
            .finish_non_exhaustive()
    }
}

/// Builder for [`AgentConfig`].
#[derive(Debug, Clone, Default)]
pub struct AgentConfigBuilder {
    operation_backends: BTreeMap<Operation, Backend>,
    models: BTreeMap<(Backend, Operation), String>,
    api_keys: BTreeMap<Backend, String>,
    base_urls: BTreeMap<Backend, String>,
    search_api_key: Option<String>,
    search_base_url: Option<String>,
    mode: Option<ResearchMode>,
    clarify_iterations: Option<usize>,
    max_concurrency: Option<usize>,
    top_citations: Option<usize>,
    max_iterations: Option<usize>,
    expected_plan_steps: Option<usize>,
    expected_queries_per_step: Option<usize>,
    max_tokens: Option<u32>,
    report_max_tokens: Option<u32>,
    timeout: Option<Duration>,
    search_timeout: Option<Duration>,
    prompt_dir: Option<PathBuf>,
    report_dir: Option<PathBuf>,
    filename_template: Option<String>,
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

impl AgentConfigBuilder {
    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        for backend in Backend::ALL {
            if let Ok(key) = std::env::var(backend.api_key_env()) {
                self.api_keys.entry(backend).or_insert(key);
            }
            if let Ok(url) = std::env::var(backend.base_url_env()) {
                self.base_urls.entry(backend).or_insert(url);
            }
        }
        if self.search_api_key.is_none() {
            self.search_api_key = std::env::var("EXA_API_KEY").ok();
        }
        if self.search_base_url.is_none() {
            self.search_base_url = std::env::var("EXA_BASE_URL").ok();
        }
        if self.mode.is_none() {
            self.mode = env_parse("DEEPER_SEEKER_MODE");
        }
        if self.clarify_iterations.is_none() {
            self.clarify_iterations = env_parse("DEEPER_SEEKER_CLARIFY_ITERATIONS");
        }
        if self.max_concurrency.is_none() {
            self.max_concurrency = env_parse("DEEPER_SEEKER_MAX_CONCURRENCY");
        }
        if self.prompt_dir.is_none() {
            self.prompt_dir = std::env::var("DEEPER_SEEKER_PROMPT_DIR")
                .ok()
                .map(PathBuf::from);
        }
        if self.report_dir.is_none() {
            self.report_dir = std::env::var("DEEPER_SEEKER_REPORT_DIR")
                .ok()
                .map(PathBuf::from);
        }
        self
    }

    /// Populates unset fields from a TOML config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read, and
    /// [`ConfigError::Parse`] / [`ConfigError::InvalidValue`] if its
    /// content is not a valid config document.
    pub fn from_file(self, path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        self.from_toml_str(&text, path)
    }

    /// Populates unset fields from TOML text. `origin` is used in errors.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::InvalidValue`] for unknown backends or operations.
    pub fn from_toml_str(mut self, text: &str, origin: &Path) -> Result<Self, ConfigError> {
        let doc: ConfigDocument = toml::from_str(text).map_err(|e| ConfigError::Parse {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })?;

        for (op_name, backend_name) in &doc.ai_providers {
            let operation = parse_operation(op_name, "ai_providers")?;
            let backend = parse_backend(backend_name, &format!("ai_providers.{op_name}"))?;
            self.operation_backends.entry(operation).or_insert(backend);
        }

        for (backend_name, per_op) in &doc.models {
            let backend = parse_backend(backend_name, "models")?;
            for (op_name, model) in per_op {
                let operation = parse_operation(op_name, &format!("models.{backend_name}"))?;
                self.models
                    .entry((backend, operation))
                    .or_insert_with(|| model.clone());
            }
        }

        for (backend_name, section) in &doc.backends {
            let backend = parse_backend(backend_name, "backends")?;
            if let Some(url) = &section.base_url {
                self.base_urls.entry(backend).or_insert_with(|| url.clone());
            }
        }

        let research = doc.research;
        if self.mode.is_none()
            && let Some(mode) = research.mode
        {
            let parsed = mode.parse().map_err(|message| ConfigError::InvalidValue {
                key: "research.mode".to_string(),
                message,
            })?;
            self.mode = Some(parsed);
        }
        self.clarify_iterations = self.clarify_iterations.or(research.clarify_iterations);
        self.max_concurrency = self.max_concurrency.or(research.max_concurrency);
        self.top_citations = self.top_citations.or(research.top_citations);
        self.max_iterations = self.max_iterations.or(research.max_iterations);
        self.expected_plan_steps = self.expected_plan_steps.or(research.plan_steps);
        self.expected_queries_per_step = self
            .expected_queries_per_step
            .or(research.queries_per_step);
        self.max_tokens = self.max_tokens.or(research.max_tokens);
        self.report_max_tokens = self.report_max_tokens.or(research.report_max_tokens);
        self.timeout = self
            .timeout
            .or_else(|| research.timeout_secs.map(Duration::from_secs));
        if self.prompt_dir.is_none() {
            self.prompt_dir = research.prompt_dir;
        }

        let search = doc.search;
        if self.search_base_url.is_none() {
            self.search_base_url = search.base_url;
        }
        self.search_timeout = self
            .search_timeout
            .or_else(|| search.timeout_secs.map(Duration::from_secs));

        let report = doc.report;
        if self.report_dir.is_none() {
            self.report_dir = report.save_path;
        }
        if self.filename_template.is_none() {
            self.filename_template = report.filename_template;
        }

        Ok(self)
    }

    /// Binds `operation` to `backend`.
    #[must_use]
    pub fn backend(mut self, operation: Operation, backend: Backend) -> Self {
        self.operation_backends.insert(operation, backend);
        self
    }

    /// Sets the model requested from `backend` for `operation`.
    #[must_use]
    pub fn model(mut self, backend: Backend, operation: Operation, model: impl Into<String>) -> Self {
        self.models.insert((backend, operation), model.into());
        self
    }

    /// Sets the API key for `backend`.
    #[must_use]
    pub fn api_key(mut self, backend: Backend, key: impl Into<String>) -> Self {
        self.api_keys.insert(backend, key.into());
        self
    }

    /// Sets the base URL override for `backend`.
    #[must_use]
    pub fn base_url(mut self, backend: Backend, url: impl Into<String>) -> Self {
        self.base_urls.insert(backend, url.into());
        self
    }

    /// Sets the search API key.
    #[must_use]
    pub fn search_api_key(mut self, key: impl Into<String>) -> Self {
        self.search_api_key = Some(key.into());
        self
    }

    /// Sets the search endpoint URL.
    #[must_use]
    pub fn search_base_url(mut self, url: impl Into<String>) -> Self {
        self.search_base_url = Some(url.into());
        self
    }

    /// Sets the orchestration mode.
    #[must_use]
    pub const fn mode(mut self, mode: ResearchMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Sets the number of clarification rounds.
    #[must_use]
    pub const fn clarify_iterations(mut self, n: usize) -> Self {
        self.clarify_iterations = Some(n);
        self
    }

    /// Sets the maximum concurrent searches.
    #[must_use]
    pub const fn max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = Some(n);
        self
    }

    /// Sets how many citations are kept per answer.
    #[must_use]
    pub const fn top_citations(mut self, n: usize) -> Self {
        self.top_citations = Some(n);
        self
    }

    /// Sets the iterative-mode iteration budget.
    #[must_use]
    pub const fn max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = Some(n);
        self
    }

    /// Sets the expected plan size.
    #[must_use]
    pub const fn expected_plan_steps(mut self, n: usize) -> Self {
        self.expected_plan_steps = Some(n);
        self
    }

    /// Sets the LLM request timeout.
    #[must_use]
    pub const fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Sets the search request timeout.
    #[must_use]
    pub const fn search_timeout(mut self, duration: Duration) -> Self {
        self.search_timeout = Some(duration);
        self
    }

    /// Sets the prompt template directory.
    #[must_use]
    pub fn prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompt_dir = Some(dir.into());
        self
    }

    /// Sets the report directory.
    #[must_use]
    pub fn report_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.report_dir = Some(dir.into());
        self
    }

    /// Sets the report filename template.
    #[must_use]
    pub fn filename_template(mut self, template: impl Into<String>) -> Self {
        self.filename_template = Some(template.into());
        self
    }

    /// Builds the [`AgentConfig`].
    ///
    /// API keys are not required here; a missing key is reported when the
    /// backend that needs it is resolved.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for a zero concurrency, an
    /// empty filename template, or a `{n}` counter outside the template's
    /// file name.
    pub fn build(self) -> Result<AgentConfig, ConfigError> {
        let max_concurrency = self.max_concurrency.unwrap_or(DEFAULT_MAX_CONCURRENCY);
        if max_concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                key: "research.max_concurrency".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        let filename_template = self
            .filename_template
            .unwrap_or_else(|| DEFAULT_FILENAME_TEMPLATE.to_string());
        if filename_template.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "report.filename_template".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if let Some((dirs, _)) = filename_template.rsplit_once(['/', '\\'])
            && dirs.contains("{n}")
        {
            return Err(ConfigError::InvalidValue {
                key: "report.filename_template".to_string(),
                message: "{n} may only appear in the file name".to_string(),
            });
        }

        Ok(AgentConfig {
            operation_backends: self.operation_backends,
            models: self.models,
            api_keys: self.api_keys,
            base_urls: self.base_urls,
            search_api_key: self.search_api_key,
            search_base_url: self
                .search_base_url
                .unwrap_or_else(|| DEFAULT_SEARCH_BASE_URL.to_string()),
            mode: self.mode.unwrap_or_default(),
            clarify_iterations: self
                .clarify_iterations
                .unwrap_or(DEFAULT_CLARIFY_ITERATIONS),
            max_concurrency,
            top_citations: self.top_citations.unwrap_or(DEFAULT_TOP_CITATIONS),
            max_iterations: self.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS),
            expected_plan_steps: self
                .expected_plan_steps
                .unwrap_or(DEFAULT_EXPECTED_PLAN_STEPS),
            expected_queries_per_step: self
                .expected_queries_per_step
                .unwrap_or(DEFAULT_EXPECTED_QUERIES),
            max_tokens: self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            report_max_tokens: self.report_max_tokens.unwrap_or(DEFAULT_REPORT_MAX_TOKENS),
            timeout: self
                .timeout
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            search_timeout: self
                .search_timeout
                .unwrap_or(Duration::from_secs(DEFAULT_SEARCH_TIMEOUT_SECS)),
            prompt_dir: self.prompt_dir,
            report_dir: self.report_dir.unwrap_or_else(|| PathBuf::from(".")),
            filename_template,
        })
    }
}

fn parse_operation(name: &str, section: &str) -> Result<Operation, ConfigError> {
    name.parse().map_err(|message| ConfigError::InvalidValue {
        key: format!("{section}.{name}"),
        message,
    })
}

fn parse_backend(name: &str, key: &str) -> Result<Backend, ConfigError> {
    name.parse().map_err(|e: crate::error::AgentError| ConfigError::InvalidValue {
        key: key.to_string(),
        message: e.to_string(),
    })
}

/// On-disk config document.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigDocument {
    ai_providers: BTreeMap<String, String>,
    models: BTreeMap<String, BTreeMap<String, String>>,
    backends: BTreeMap<String, BackendSection>,
    research: ResearchSection,
    search: SearchSection,
    report: ReportSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BackendSection {
    base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ResearchSection {
    mode: Option<String>,
    clarify_iterations: Option<usize>,
    max_concurrency: Option<usize>,
    top_citations: Option<usize>,
    max_iterations: Option<usize>,
    plan_steps: Option<usize>,
    queries_per_step: Option<usize>,
    max_tokens: Option<u32>,
    report_max_tokens: Option<u32>,
    timeout_secs: Option<u64>,
    prompt_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchSection {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ReportSection {
    save_path: Option<PathBuf>,
    filename_template: Option<String>,
}
