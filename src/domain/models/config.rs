use serde::{Deserialize, Serialize};

/// Main configuration structure for maestro
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Pipeline stage behavior
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Judge/refine loop configuration
    #[serde(default)]
    pub judge: JudgeConfig,

    /// Worker registry and role names
    #[serde(default)]
    pub workers: WorkersConfig,

    /// Reasoning service backend
    #[serde(default)]
    pub reasoning: ReasoningConfig,

    /// Execution history persistence
    #[serde(default)]
    pub history: HistoryConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Quality stage execution profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityProfile {
    /// Skip the reasoning call entirely
    Light,
    /// Ask the reasoning service for an assessment
    #[default]
    Full,
}

/// Pipeline stage configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PipelineConfig {
    /// Retry policy for reasoning service calls
    #[serde(default)]
    pub retry: RetryConfig,

    /// Analysis cache TTL in seconds (0 disables the cache)
    #[serde(default = "default_analysis_cache_ttl_secs")]
    pub analysis_cache_ttl_secs: u64,

    /// Maximum number of cached analyses
    #[serde(default = "default_analysis_cache_capacity")]
    pub analysis_cache_capacity: u64,

    /// Quality stage profile
    #[serde(default)]
    pub quality_profile: QualityProfile,

    /// Pass prior output and a handoff note to the next sequential worker
    #[serde(default = "default_true")]
    pub enable_handoffs: bool,

    /// Per-worker call timeout in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_timeout_secs: Option<u64>,
}

const fn default_analysis_cache_ttl_secs() -> u64 {
    300
}

const fn default_analysis_cache_capacity() -> u64 {
    1_000
}

const fn default_true() -> bool {
    true
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            analysis_cache_ttl_secs: default_analysis_cache_ttl_secs(),
            analysis_cache_capacity: default_analysis_cache_capacity(),
            quality_profile: QualityProfile::default(),
            enable_handoffs: true,
            worker_timeout_secs: None,
        }
    }
}

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Total attempts per reasoning call (at least 1)
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    /// Linear backoff unit in seconds; attempt `n` sleeps `n * backoff_secs`
    #[serde(default = "default_backoff_secs")]
    pub backoff_secs: f64,
}

const fn default_attempts() -> u32 {
    3
}

const fn default_backoff_secs() -> f64 {
    1.0
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            backoff_secs: default_backoff_secs(),
        }
    }
}

/// Judge/refine loop configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct JudgeConfig {
    /// Whether results are gated by a judge worker
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Name of the worker acting as judge
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub judge_agent: Option<String>,

    /// Minimum judge score for a result to pass
    #[serde(default = "default_judge_threshold")]
    pub threshold: f64,

    /// Maximum refine-then-judge cycles
    #[serde(default = "default_max_refinement_rounds")]
    pub max_refinement_rounds: u32,

    /// Timeout for one judging round in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round_timeout_secs: Option<u64>,

    /// Allow one unjudged refinement pass when no judge ran
    #[serde(default = "default_true")]
    pub enable_fallback_refinement: bool,

    /// Quality score below which the unjudged refinement pass runs
    #[serde(default = "default_refinement_threshold")]
    pub refinement_threshold: f64,
}

const fn default_judge_threshold() -> f64 {
    8.0
}

const fn default_max_refinement_rounds() -> u32 {
    3
}

const fn default_refinement_threshold() -> f64 {
    7.0
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            judge_agent: None,
            threshold: default_judge_threshold(),
            max_refinement_rounds: default_max_refinement_rounds(),
            round_timeout_secs: None,
            enable_fallback_refinement: true,
            refinement_threshold: default_refinement_threshold(),
        }
    }
}

/// A registered worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerEntry {
    /// Unique worker name
    pub name: String,

    /// What the worker is good at; also its system prompt
    #[serde(default)]
    pub description: String,
}

impl WorkerEntry {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Worker registry and role configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct WorkersConfig {
    /// Registered workers, in priority order
    #[serde(default)]
    pub registry: Vec<WorkerEntry>,

    /// Worker receiving research-flavored work (routing fallback, citation gaps)
    #[serde(default = "default_research_worker")]
    pub research_worker: String,

    /// Worker receiving calculation and data gaps
    #[serde(default = "default_analysis_worker")]
    pub analysis_worker: String,

    /// Worker receiving writing, structure and clarity gaps (also the default refiner)
    #[serde(default = "default_writing_worker")]
    pub writing_worker: String,
}

fn default_research_worker() -> String {
    "Researcher".to_string()
}

fn default_analysis_worker() -> String {
    "Analyst".to_string()
}

fn default_writing_worker() -> String {
    "Writer".to_string()
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            registry: Vec::new(),
            research_worker: default_research_worker(),
            analysis_worker: default_analysis_worker(),
            writing_worker: default_writing_worker(),
        }
    }
}

/// Reasoning backend kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasoningBackend {
    /// Claude Code CLI in print mode
    #[default]
    ClaudeCode,
    /// Anthropic Messages API
    AnthropicApi,
}

/// Reasoning service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ReasoningConfig {
    /// Which completion backend serves reasoning and worker calls
    #[serde(default)]
    pub backend: ReasoningBackend,

    /// Path to claude CLI executable
    #[serde(default = "default_claude_path")]
    pub claude_path: String,

    /// Model to use
    #[serde(default = "default_model")]
    pub model: String,

    /// API key (can also be set via ANTHROPIC_API_KEY env var)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL for API (for testing/proxies)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Maximum tokens per completion
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Per-call timeout in seconds
    #[serde(default = "default_reasoning_timeout")]
    pub timeout_secs: u64,
}

fn default_claude_path() -> String {
    "claude".to_string()
}

fn default_model() -> String {
    "claude-sonnet-4-5-20250929".to_string()
}

const fn default_max_tokens() -> u32 {
    4096
}

const fn default_reasoning_timeout() -> u64 {
    120
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            backend: ReasoningBackend::default(),
            claude_path: default_claude_path(),
            model: default_model(),
            api_key: None,
            base_url: None,
            max_tokens: default_max_tokens(),
            timeout_secs: default_reasoning_timeout(),
        }
    }
}

/// Execution history configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct HistoryConfig {
    /// Persist run records
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Path to `SQLite` database file
    #[serde(default = "default_history_path")]
    pub database_path: String,
}

fn default_history_path() -> String {
    ".maestro/history.db".to_string()
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            database_path: default_history_path(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rotated log files; stdout only when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<String>,

    /// Also log to the terminal when a log directory is set
    #[serde(default = "default_true")]
    pub enable_stdout: bool,

    /// Rotation: daily, hourly or never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            enable_stdout: true,
            rotation: default_rotation(),
        }
    }
}
