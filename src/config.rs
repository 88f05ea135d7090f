//! Configuration management for pdfbot using the prefer crate.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::documents::{FacadeConfig, OptionMap, PageFormat, QualityHint};
use crate::providers::{BrowserEngineConfig, Providers};

/// Default output directory for generated PDFs.
pub const DEFAULT_OUTPUT_DIR: &str = "./generated-pdfs";

/// Default directory for in-flight uploads.
pub const DEFAULT_UPLOAD_DIR: &str = "./uploads";

/// Default directory for the static web interface.
pub const DEFAULT_PUBLIC_DIR: &str = "./public";

/// Default bind host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default bind port.
pub const DEFAULT_PORT: u16 = 3000;

/// Per-file upload limit (10 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Directory generated PDFs are written to.
    pub output_dir: PathBuf,
    /// Directory uploads are staged in while a request runs.
    pub upload_dir: PathBuf,
    /// Directory of static files served at the root.
    pub public_dir: PathBuf,
    /// Page format used when a request does not name one.
    pub default_page_format: PageFormat,
    /// Advisory rendering quality.
    pub quality: QualityHint,
    /// Render options applied to every HTML render.
    pub render_options: OptionMap,
    /// Host the server binds to.
    pub host: String,
    /// Port the server binds to.
    pub port: u16,
    /// Maximum size of one uploaded file, in bytes.
    pub max_upload_bytes: usize,
    /// Headless browser settings.
    pub browser: BrowserEngineConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            public_dir: PathBuf::from(DEFAULT_PUBLIC_DIR),
            default_page_format: PageFormat::default(),
            quality: QualityHint::default(),
            render_options: OptionMap::new(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            browser: BrowserEngineConfig::default(),
        }
    }
}

impl Settings {
    /// Facade configuration derived from these settings.
    pub fn facade_config(&self) -> FacadeConfig {
        FacadeConfig {
            output_dir: self.output_dir.clone(),
            default_page_format: self.default_page_format,
            quality: self.quality,
            render_options: self.render_options.clone(),
        }
    }

    /// Default providers wired with the configured browser.
    pub fn providers(&self) -> Providers {
        Providers::with_browser(self.browser.clone())
    }

    /// Apply environment variable overrides through `lookup`.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(dir) = var("PDFBOT_OUTPUT_DIR") {
            tracing::debug!("Using PDFBOT_OUTPUT_DIR from environment: {}", dir);
            self.output_dir = expand_path(&dir);
        }
        if let Some(dir) = var("PDFBOT_UPLOAD_DIR") {
            self.upload_dir = expand_path(&dir);
        }
        if let Some(dir) = var("PDFBOT_PUBLIC_DIR") {
            self.public_dir = expand_path(&dir);
        }
        if let Some(format) = var("PDFBOT_PAGE_FORMAT") {
            match format.parse() {
                Ok(format) => self.default_page_format = format,
                Err(e) => tracing::warn!("Ignoring PDFBOT_PAGE_FORMAT: {}", e),
            }
        }
        if let Some(port) = var("PORT") {
            match port.trim().parse() {
                Ok(port) => self.port = port,
                Err(_) => tracing::warn!("Ignoring invalid PORT: {}", port),
            }
        }
        if let Some(url) = var("BROWSER_URL") {
            self.browser.remote_url = Some(url.trim().to_string());
        }
        if let Some(path) = var("CHROME_PATH") {
            self.browser.chrome_path = Some(expand_path(&path));
        }
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Output directory for generated PDFs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
    /// Upload staging directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_dir: Option<String>,
    /// Static web interface directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_dir: Option<String>,
    /// Default page format (A4, Letter, ...).
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "format")]
    pub page_format: Option<String>,
    /// Rendering quality hint (low, medium, high).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
    /// Server bind host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Server bind port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Per-file upload limit in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_upload_bytes: Option<usize>,
    /// Render options applied to every HTML render.
    #[serde(default, skip_serializing_if = "OptionMap::is_empty")]
    pub render_options: OptionMap,
    /// Headless browser settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser: Option<BrowserEngineConfig>,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    /// Automatically discovers pdfbot config files in standard locations.
    pub async fn load() -> Self {
        // Use prefer for file discovery, then parse with serde
        match prefer::load("pdfbot").await {
            Ok(pref_config) => {
                if let Some(path) = pref_config.source_path() {
                    match Self::load_from_path(path).await {
                        Ok(config) => config,
                        Err(e) => {
                            tracing::warn!("{}", e);
                            Self::default()
                        }
                    }
                } else {
                    Self::default()
                }
            }
            // No config file found
            Err(_) => Self::default(),
        }
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML and YAML based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

        let mut config: Config = match ext {
            "toml" => toml::from_str(&contents)
                .map_err(|e| format!("Failed to parse TOML config: {}", e))?,
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .map_err(|e| format!("Failed to parse YAML config: {}", e))?,
            _ => serde_json::from_str(&contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e))?,
        };

        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Get the base directory for resolving relative paths.
    /// Returns the config file's parent directory if available, otherwise None.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    /// - Absolute paths are returned as-is
    /// - Paths starting with ~ are expanded
    /// - Relative paths are resolved relative to `base_dir`
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let path = expand_path(path_str);
        if path.is_absolute() {
            path
        } else {
            base_dir.join(path)
        }
    }

    /// Apply configuration to settings.
    /// `base_dir` is used to resolve relative paths (typically config file dir or CWD).
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref dir) = self.output_dir {
            settings.output_dir = self.resolve_path(dir, base_dir);
        }
        if let Some(ref dir) = self.upload_dir {
            settings.upload_dir = self.resolve_path(dir, base_dir);
        }
        if let Some(ref dir) = self.public_dir {
            settings.public_dir = self.resolve_path(dir, base_dir);
        }
        if let Some(ref format) = self.page_format {
            match format.parse() {
                Ok(format) => settings.default_page_format = format,
                Err(e) => tracing::warn!("Ignoring page_format in config: {}", e),
            }
        }
        if let Some(ref quality) = self.quality {
            match quality.parse() {
                Ok(quality) => settings.quality = quality,
                Err(e) => tracing::warn!("Ignoring quality in config: {}", e),
            }
        }
        if let Some(ref host) = self.host {
            settings.host = host.clone();
        }
        if let Some(port) = self.port {
            settings.port = port;
        }
        if let Some(limit) = self.max_upload_bytes {
            settings.max_upload_bytes = limit;
        }
        if !self.render_options.is_empty() {
            settings.render_options = self.render_options.clone();
        }
        if let Some(ref browser) = self.browser {
            let mut browser = browser.clone();
            if let Some(path) = browser.chrome_path.take() {
                browser.chrome_path = Some(self.resolve_path(&path.to_string_lossy(), base_dir));
            }
            settings.browser = browser;
        }
    }
}

/// Expand `~` and environment variables in a path.
fn expand_path(path: &str) -> PathBuf {
    match shellexpand::full(path) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(shellexpand::tilde(path).as_ref()),
    }
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides auto-discovery).
    pub config_path: Option<PathBuf>,
    /// Output directory (--output-dir flag), applied last.
    pub output_dir: Option<PathBuf>,
}

/// Load config from file sources.
async fn load_file_config(options: &LoadOptions) -> Config {
    // Priority 1: Explicit --config flag
    if let Some(ref config_path) = options.config_path {
        return match Config::load_from_path(config_path).await {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("{}", e);
                Config::default()
            }
        };
    }

    // Priority 2: Auto-discover via prefer
    Config::load().await
}

/// Load settings with explicit options.
/// Precedence: defaults < config file < environment < command line.
/// Returns (Settings, Config) tuple.
pub async fn load_settings_with_options(options: LoadOptions) -> (Settings, Config) {
    let config = load_file_config(&options).await;

    let mut settings = Settings::default();

    let base_dir = config
        .base_dir()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    config.apply_to_settings(&mut settings, &base_dir);

    settings.apply_env(|name| std::env::var(name).ok());

    if let Some(dir) = options.output_dir {
        settings.output_dir = dir;
    }

    (settings, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_load_toml_resolves_relative_paths() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pdfbot.toml");
        std::fs::write(
            &path,
            r#"
output_dir = "out"
page_format = "letter"
port = 8080

[render_options]
scale = 0.9

[browser]
timeout = 5
"#,
        )
        .unwrap();

        let config = Config::load_from_path(&path).await.unwrap();
        let mut settings = Settings::default();
        config.apply_to_settings(&mut settings, &config.base_dir().unwrap());

        assert_eq!(settings.output_dir, dir.path().join("out"));
        assert_eq!(settings.default_page_format, PageFormat::Letter);
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.render_options["scale"], 0.9);
        assert_eq!(settings.browser.timeout, 5);
        assert!(settings.browser.headless);
    }

    #[tokio::test]
    async fn test_load_yaml_and_json() {
        let dir = tempdir().unwrap();

        let yaml = dir.path().join("pdfbot.yaml");
        std::fs::write(&yaml, "upload_dir: /tmp/pdfbot-up\nquality: low\n").unwrap();
        let config = Config::load_from_path(&yaml).await.unwrap();
        assert_eq!(config.upload_dir.as_deref(), Some("/tmp/pdfbot-up"));
        assert_eq!(config.quality.as_deref(), Some("low"));

        let json = dir.path().join("pdfbot.json");
        std::fs::write(&json, r#"{"format": "A5", "host": "0.0.0.0"}"#).unwrap();
        let config = Config::load_from_path(&json).await.unwrap();
        assert_eq!(config.page_format.as_deref(), Some("A5"));
        assert_eq!(config.host.as_deref(), Some("0.0.0.0"));
    }

    #[tokio::test]
    async fn test_load_invalid_file_errors() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "output_dir = [").unwrap();
        assert!(Config::load_from_path(&path).await.is_err());
    }

    #[test]
    fn test_invalid_page_format_is_ignored() {
        let config = Config {
            page_format: Some("B9".to_string()),
            ..Config::default()
        };
        let mut settings = Settings::default();
        config.apply_to_settings(&mut settings, Path::new("."));
        assert_eq!(settings.default_page_format, PageFormat::A4);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("PDFBOT_OUTPUT_DIR", "/srv/pdfs"),
            ("PDFBOT_PAGE_FORMAT", "legal"),
            ("PORT", "4100"),
            ("BROWSER_URL", "ws://chrome:9222"),
            ("PDFBOT_UPLOAD_DIR", ""),
        ]);
        let mut settings = Settings::default();
        settings.apply_env(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(settings.output_dir, PathBuf::from("/srv/pdfs"));
        assert_eq!(settings.default_page_format, PageFormat::Legal);
        assert_eq!(settings.port, 4100);
        assert_eq!(settings.browser.remote_url.as_deref(), Some("ws://chrome:9222"));
        assert_eq!(settings.upload_dir, PathBuf::from(DEFAULT_UPLOAD_DIR));
    }

    #[test]
    fn test_invalid_port_is_ignored() {
        let mut settings = Settings::default();
        settings.apply_env(|name| (name == "PORT").then(|| "http".to_string()));
        assert_eq!(settings.port, DEFAULT_PORT);
    }

    #[tokio::test]
    async fn test_cli_output_dir_wins() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pdfbot.json");
        std::fs::write(&path, r#"{"output_dir": "from-file"}"#).unwrap();

        let (settings, config) = load_settings_with_options(LoadOptions {
            config_path: Some(path.clone()),
            output_dir: Some(PathBuf::from("/from/cli")),
        })
        .await;
        assert_eq!(config.source_path, Some(path));
        assert_eq!(settings.output_dir, PathBuf::from("/from/cli"));
    }

    #[test]
    fn test_facade_config_from_settings() {
        let settings = Settings {
            default_page_format: PageFormat::Tabloid,
            ..Settings::default()
        };
        let facade = settings.facade_config();
        assert_eq!(facade.output_dir, PathBuf::from(DEFAULT_OUTPUT_DIR));
        assert_eq!(facade.default_page_format, PageFormat::Tabloid);
    }
}
