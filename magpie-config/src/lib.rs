//! Loader for workspace configuration with YAML + environment overlays.
//!
//! `magpie.yaml` declares the research agents (one entry per platform or
//! crawler), plus storage locations. Values merge in this order: YAML file,
//! then `MAGPIE__`-prefixed environment variables, then recursive `${VAR}`
//! expansion inside string values. Unknown `${VAR}` references are left
//! intact so missing secrets surface as visible placeholders instead of
//! empty strings.
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

const DEFAULT_CONFIG_FILE: &str = "magpie.yaml";

#[derive(Debug, Deserialize)]
pub struct MagpieConfig {
    pub version: Option<String>,
    #[serde(default)]
    pub agents: Vec<AgentSpec>,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Shared fields + the per-kind “details”
#[derive(Debug, Deserialize)]
pub struct AgentSpec {
    pub id: String,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub concurrency: Option<u32>,
    /// Optional throttle override; per-kind defaults apply when absent.
    #[serde(default)]
    pub rate: Option<RateSpec>,
    #[serde(flatten)]
    pub details: AgentDetails,
}

/// The tag is `kind`; the payload lives in `config`
#[derive(Debug, Deserialize)]
#[serde(tag = "kind")]
pub enum AgentDetails {
    #[serde(rename = "twitter")]
    Twitter { config: TwitterConfig },

    #[serde(rename = "reddit")]
    Reddit {
        #[serde(default)]
        config: RedditConfig,
    },

    #[serde(rename = "mastodon")]
    Mastodon {
        #[serde(default)]
        config: MastodonConfig,
    },

    #[serde(rename = "web")]
    Web {
        #[serde(default)]
        config: CrawlConfig,
    },
}

impl AgentDetails {
    /// Stable lowercase name of the agent kind, for logs and rate keys.
    pub fn kind(&self) -> &'static str {
        match self {
            AgentDetails::Twitter { .. } => "twitter",
            AgentDetails::Reddit { .. } => "reddit",
            AgentDetails::Mastodon { .. } => "mastodon",
            AgentDetails::Web { .. } => "web",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TwitterConfig {
    pub bearer_token: String,
    #[serde(default = "default_twitter_endpoint")]
    pub endpoint: String,
}

#[derive(Debug, Deserialize)]
pub struct RedditConfig {
    #[serde(default = "default_reddit_endpoint")]
    pub endpoint: String,
    /// Reddit rejects requests without a descriptive agent string.
    #[serde(default = "default_collector_user_agent")]
    pub user_agent: String,
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            endpoint: default_reddit_endpoint(),
            user_agent: default_collector_user_agent(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MastodonConfig {
    #[serde(default = "default_mastodon_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub access_token: Option<String>,
}

impl Default for MastodonConfig {
    fn default() -> Self {
        Self {
            endpoint: default_mastodon_endpoint(),
            access_token: None,
        }
    }
}

/// Limits for the breadth-first site crawler.
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,
    #[serde(default = "default_max_pages_per_domain")]
    pub max_pages_per_domain: u32,
    /// Politeness pause between requests to the same host.
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
    #[serde(default = "default_crawl_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_collector_user_agent")]
    pub user_agent: String,
    /// Capture pages through a WebDriver session instead of plain HTTP.
    #[serde(default)]
    pub browser: bool,
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_pages_per_domain: default_max_pages_per_domain(),
            request_delay_ms: default_request_delay_ms(),
            timeout_secs: default_crawl_timeout_secs(),
            user_agent: default_collector_user_agent(),
            browser: false,
            webdriver_url: default_webdriver_url(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    /// Directory for exported research results (JSON/CSV).
    #[serde(default = "default_export_dir")]
    pub export_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            export_dir: default_export_dir(),
        }
    }
}

/// Token-bucket shape for one agent's outbound requests.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RateSpec {
    pub qps: f64,
    #[serde(default = "default_rate_burst")]
    pub burst: u32,
}

fn default_twitter_endpoint() -> String {
    "https://api.twitter.com".into()
}
fn default_reddit_endpoint() -> String {
    "https://www.reddit.com".into()
}
fn default_mastodon_endpoint() -> String {
    "https://mastodon.social".into()
}
fn default_collector_user_agent() -> String {
    "magpie-research/0.1".into()
}
fn default_webdriver_url() -> String {
    "http://localhost:9515".into()
}
fn default_database_url() -> String {
    "sqlite://magpie.db?mode=rwc".into()
}
fn default_export_dir() -> PathBuf {
    PathBuf::from("data/processed")
}
fn default_max_depth() -> u32 {
    2
}
fn default_max_pages_per_domain() -> u32 {
    100
}
fn default_request_delay_ms() -> u64 {
    1000
}
fn default_crawl_timeout_secs() -> u64 {
    30
}
fn default_rate_burst() -> u32 {
    5
}

/// Locate the config file to load when the CLI gives no explicit path:
/// `./magpie.yaml` first, then `~/.config/magpie/magpie.yaml`.
pub fn resolve_config_file(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    let local = PathBuf::from(DEFAULT_CONFIG_FILE);
    if local.is_file() {
        return Some(local);
    }

    let user = dirs::config_dir()?.join("magpie").join(DEFAULT_CONFIG_FILE);
    user.is_file().then_some(user)
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hides the `config` crate wiring (YAML + env overrides).
pub struct MagpieConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for MagpieConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl MagpieConfigLoader {
    /// Start with sensible defaults: YAML file + `MAGPIE_` env overrides.
    ///
    /// ```
    /// use magpie_config::MagpieConfigLoader;
    ///
    /// let loader = MagpieConfigLoader::new();
    /// let config = loader
    ///     .with_yaml_str("version: '1'\nagents: []")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.version.as_deref(), Some("1"));
    /// assert!(config.agents.is_empty());
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a YAML/TOML/JSON file; the `config` crate infers format by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self.builder.add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that may be absent, so headless deployments can rely
    /// purely on environment variables.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Allow tests/CLI to merge inline YAML snippets.
    ///
    /// ```
    /// use magpie_config::{AgentDetails, MagpieConfigLoader};
    ///
    /// let cfg = MagpieConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// version: "test"
    /// agents:
    ///   - id: "birdsite"
    ///     enabled: true
    ///     kind: "twitter"
    ///     config:
    ///       bearer_token: "example"
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(cfg.version.as_deref(), Some("test"));
    /// assert_eq!(cfg.agents.len(), 1);
    /// assert!(matches!(cfg.agents[0].details, AgentDetails::Twitter { .. }));
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources into strongly typed config.
    ///
    /// The loader combines YAML snippets with `MAGPIE_`-prefixed environment variables
    /// and expands `${VAR}` placeholders before materialising strongly typed structs.
    ///
    /// ```
    /// use magpie_config::{AgentDetails, MagpieConfigLoader};
    ///
    /// let config = MagpieConfigLoader::new()
    ///     .with_yaml_str(r#"
    /// version: "1"
    /// agents:
    ///   - id: "toots"
    ///     kind: "mastodon"
    /// storage:
    ///   export_dir: "out"
    /// "#)
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// assert_eq!(config.version.as_deref(), Some("1"));
    /// assert_eq!(config.agents[0].id, "toots");
    /// assert_eq!(config.storage.export_dir.to_str(), Some("out"));
    ///
    /// match &config.agents[0].details {
    ///     AgentDetails::Mastodon { config } => {
    ///         assert_eq!(config.endpoint, "https://mastodon.social");
    ///         assert!(config.access_token.is_none());
    ///     }
    ///     _ => panic!("expected Mastodon configuration"),
    /// }
    /// ```
    pub fn load(self) -> Result<MagpieConfig, ConfigError> {
        // Environment merges last so `MAGPIE__*` overrides any file value.
        let cfg = self
            .builder
            .add_source(Environment::with_prefix("MAGPIE").separator("__"))
            .build()?;

        // Convert to serde_json::Value first
        let mut v: Value = cfg.try_deserialize()?;
        // Recursively expand environment variables
        expand_env_in_value(&mut v);

        // Deserialize into the strongly-typed config
        let typed: MagpieConfig =
            serde_json::from_value(v).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        Ok(typed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use temp_env;

    #[test]
    fn expands_simple_string() {
        temp_env::with_var("FOO", Some("bar"), || {
            let mut v = json!("prefix-${FOO}-suffix");
            expand_env_in_value(&mut v);
            assert_eq!(v, json!("prefix-bar-suffix"));
        });
    }

    #[test]
    fn expands_in_array_and_object() {
        temp_env::with_vars([("CITY", Some("Winston")), ("STATE", Some("NC"))], || {
            let mut v = json!([
                "hello-$CITY",
                { "loc": "${CITY}-${STATE}" },
                42,
                true,
                null
            ]);
            expand_env_in_value(&mut v);
            assert_eq!(
                v,
                json!(["hello-Winston", { "loc": "Winston-NC" }, 42, true, null])
            );
        });
    }

    #[test]
    fn expands_recursively_across_env_values() {
        temp_env::with_vars(
            [
                // BAR references BAZ and FOO references BAR, so two hops.
                ("BAZ", Some("qux")),
                ("BAR", Some("mid-${BAZ}")),
                ("FOO", Some("start-${BAR}-end")),
            ],
            || {
                let mut v = json!("X=${FOO}");
                // Without recursive expansion this would stop at "X=start-${BAR}-end".
                expand_env_in_value(&mut v);
                assert_eq!(v, json!("X=start-mid-qux-end"));
            },
        );
    }

    #[test]
    fn stops_on_cycles_and_leaves_value_reasonable() {
        temp_env::with_vars([("A", Some("${B}")), ("B", Some("${A}"))], || {
            let mut v = json!("x=${A}-y");
            // We don't care about exact final string, only that the function terminates
            // and doesn't loop forever. With the depth cap, this will stop.
            expand_env_in_value(&mut v);
            let s = v.as_str().unwrap();
            assert!(s.starts_with("x=") && s.ends_with("-y"));
            // And we expect it to still contain unresolved ${...} due to the cycle.
            assert!(s.contains("${"));
        });
    }

    #[test]
    fn unknown_vars_are_left_as_is() {
        let mut v = json!("hi-${DOES_NOT_EXIST}");
        expand_env_in_value(&mut v);
        assert_eq!(v, json!("hi-${DOES_NOT_EXIST}"));
    }

    #[test]
    fn crawl_defaults_match_agent_baseline() {
        let crawl = CrawlConfig::default();
        assert_eq!(crawl.max_depth, 2);
        assert_eq!(crawl.max_pages_per_domain, 100);
        assert_eq!(crawl.request_delay_ms, 1000);
        assert_eq!(crawl.timeout_secs, 30);
        assert!(!crawl.browser);
    }

    #[test]
    fn web_agent_parses_without_config_block() {
        let cfg = MagpieConfigLoader::new()
            .with_yaml_str("agents:\n  - id: crawler\n    kind: web\n")
            .load()
            .unwrap();
        match &cfg.agents[0].details {
            AgentDetails::Web { config } => assert_eq!(config.max_depth, 2),
            other => panic!("expected web agent, got {other:?}"),
        }
    }
}
