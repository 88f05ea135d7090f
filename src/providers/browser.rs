//! HTML rendering through headless Chrome.
//!
//! Uses chromiumoxide (CDP) to load markup into a fresh page and print it
//! with `Page.printToPDF`. A browser is launched (or connected to, when a
//! remote DevTools URL is configured) for each render and released again
//! whether the render succeeded or not.

use std::path::PathBuf;
#[cfg(feature = "browser")]
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
#[cfg(feature = "browser")]
use tracing::{info, warn};

#[cfg(feature = "browser")]
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
#[cfg(feature = "browser")]
use chromiumoxide::{Browser, BrowserConfig};
#[cfg(feature = "browser")]
use futures::StreamExt;
#[cfg(feature = "browser")]
use tokio::task::JoinHandle;

use super::{ProviderError, ProviderResult, RenderingProvider};
use crate::documents::{option_bool, option_f64, option_page_format, option_str, OptionMap};

/// Browser engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserEngineConfig {
    /// Run in headless mode (default: true).
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Proxy server URL (e.g., "socks5://127.0.0.1:1080").
    #[serde(default)]
    pub proxy: Option<String>,

    /// Page load timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Additional Chrome arguments.
    #[serde(default)]
    pub chrome_args: Vec<String>,

    /// Remote Chrome DevTools URL (e.g., "ws://localhost:9222").
    /// If set, connects to existing browser instead of launching one.
    #[serde(default)]
    pub remote_url: Option<String>,

    /// Chrome executable. Searched for in common locations when unset.
    #[serde(default)]
    pub chrome_path: Option<PathBuf>,
}

fn default_headless() -> bool {
    true
}

fn default_timeout() -> u64 {
    30
}

impl Default for BrowserEngineConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            proxy: None,
            timeout: default_timeout(),
            chrome_args: Vec::new(),
            remote_url: None,
            chrome_path: None,
        }
    }
}

impl BrowserEngineConfig {
    /// Apply `BROWSER_URL` and `CHROME_PATH` from the environment.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("BROWSER_URL") {
            if !url.trim().is_empty() {
                self.remote_url = Some(url.trim().to_string());
            }
        }
        if let Ok(path) = std::env::var("CHROME_PATH") {
            if !path.trim().is_empty() {
                self.chrome_path = Some(PathBuf::from(path.trim()));
            }
        }
        self
    }
}

/// Option keys the renderer understands. Anything else is ignored.
const KNOWN_OPTIONS: &[&str] = &[
    "format",
    "width",
    "height",
    "landscape",
    "printBackground",
    "scale",
    "margin",
    "displayHeaderFooter",
    "headerTemplate",
    "footerTemplate",
    "pageRanges",
    "preferCSSPageSize",
    "quality",
];

/// Print settings in DevTools units (inches), decoupled from the CDP types.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrintSettings {
    pub paper_width: Option<f64>,
    pub paper_height: Option<f64>,
    pub landscape: Option<bool>,
    pub print_background: Option<bool>,
    pub scale: Option<f64>,
    pub margin_top: Option<f64>,
    pub margin_right: Option<f64>,
    pub margin_bottom: Option<f64>,
    pub margin_left: Option<f64>,
    pub display_header_footer: Option<bool>,
    pub header_template: Option<String>,
    pub footer_template: Option<String>,
    pub page_ranges: Option<String>,
    pub prefer_css_page_size: Option<bool>,
}

impl PrintSettings {
    pub fn from_options(options: &OptionMap) -> Self {
        for key in options.keys() {
            if !KNOWN_OPTIONS.contains(&key.as_str()) {
                debug!("Ignoring unsupported render option '{}'", key);
            }
        }

        let mut settings = Self::default();
        // A recognised format wins over width/height
        if let Some(format) = option_page_format(options, &["format"]) {
            let (width, height) = format.size_inches();
            settings.paper_width = Some(width);
            settings.paper_height = Some(height);
        } else {
            settings.paper_width = options.get("width").and_then(css_length_inches);
            settings.paper_height = options.get("height").and_then(css_length_inches);
        }

        if let Some(Value::Object(margin)) = options.get("margin") {
            settings.margin_top = margin.get("top").and_then(css_length_inches);
            settings.margin_right = margin.get("right").and_then(css_length_inches);
            settings.margin_bottom = margin.get("bottom").and_then(css_length_inches);
            settings.margin_left = margin.get("left").and_then(css_length_inches);
        }

        settings.landscape = option_bool(options, "landscape");
        settings.print_background = option_bool(options, "printBackground");
        settings.scale = option_f64(options, "scale");
        settings.display_header_footer = option_bool(options, "displayHeaderFooter");
        settings.header_template = option_str(options, "headerTemplate").map(str::to_string);
        settings.footer_template = option_str(options, "footerTemplate").map(str::to_string);
        settings.page_ranges = option_str(options, "pageRanges").map(str::to_string);
        settings.prefer_css_page_size = option_bool(options, "preferCSSPageSize");
        settings
    }

    #[cfg(feature = "browser")]
    fn into_params(self) -> PrintToPdfParams {
        PrintToPdfParams {
            landscape: self.landscape,
            display_header_footer: self.display_header_footer,
            print_background: self.print_background,
            scale: self.scale,
            paper_width: self.paper_width,
            paper_height: self.paper_height,
            margin_top: self.margin_top,
            margin_bottom: self.margin_bottom,
            margin_left: self.margin_left,
            margin_right: self.margin_right,
            page_ranges: self.page_ranges,
            header_template: self.header_template,
            footer_template: self.footer_template,
            prefer_css_page_size: self.prefer_css_page_size,
            ..Default::default()
        }
    }
}

/// Convert a CSS length (`"20px"`, `"1in"`, `"2.5cm"`, `"10mm"`, `"12pt"`,
/// or a bare number of pixels) to inches.
pub fn css_length_inches(value: &Value) -> Option<f64> {
    let text = match value {
        Value::Number(n) => return n.as_f64().map(|px| px / 96.0),
        Value::String(s) => s.trim().to_ascii_lowercase(),
        _ => return None,
    };

    let split = text
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(text.len());
    let (number, unit) = text.split_at(split);
    let number: f64 = number.trim().parse().ok()?;
    let per_inch = match unit.trim() {
        "" | "px" => 96.0,
        "in" => 1.0,
        "cm" => 2.54,
        "mm" => 25.4,
        "pt" => 72.0,
        _ => return None,
    };
    Some(number / per_inch)
}

/// Renders HTML with a headless Chrome instance.
pub struct ChromiumRenderer {
    config: BrowserEngineConfig,
}

impl ChromiumRenderer {
    pub fn new(config: BrowserEngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BrowserEngineConfig {
        &self.config
    }
}

#[async_trait]
impl RenderingProvider for ChromiumRenderer {
    async fn render(&self, markup: &str, options: &OptionMap) -> ProviderResult<Vec<u8>> {
        let settings = PrintSettings::from_options(options);
        self.render_pdf(markup, settings).await
    }
}

#[cfg(feature = "browser")]
impl ChromiumRenderer {
    /// Common Chrome executable paths to check.
    const CHROME_PATHS: &'static [&'static str] = &[
        // Linux
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        // macOS
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        // Common install locations
        "/opt/google/chrome/google-chrome",
    ];

    /// Find Chrome executable. Probes the filesystem and runs `which`, so
    /// call it from a blocking task.
    fn find_chrome(configured: Option<&std::path::Path>) -> ProviderResult<PathBuf> {
        if let Some(path) = configured {
            if path.exists() {
                return Ok(path.to_path_buf());
            }
            warn!("Configured Chrome path does not exist: {}", path.display());
        }

        for path in Self::CHROME_PATHS {
            let p = std::path::Path::new(path);
            if p.exists() {
                debug!("Found Chrome at: {}", path);
                return Ok(p.to_path_buf());
            }
        }

        // Check if in PATH via `which`
        for cmd in &[
            "google-chrome",
            "google-chrome-stable",
            "chromium",
            "chromium-browser",
        ] {
            if let Ok(output) = std::process::Command::new("which").arg(cmd).output() {
                if output.status.success() {
                    let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                    if !path.is_empty() {
                        debug!("Found Chrome in PATH: {}", path);
                        return Ok(PathBuf::from(path));
                    }
                }
            }
        }

        Err(ProviderError::Unavailable(
            "Chrome/Chromium not found. Install it, set CHROME_PATH, \
             or point BROWSER_URL at a running instance"
                .to_string(),
        ))
    }

    /// Launch a local browser.
    async fn launch(&self) -> ProviderResult<(Browser, JoinHandle<()>)> {
        let configured = self.config.chrome_path.clone();
        let chrome_path =
            tokio::task::spawn_blocking(move || Self::find_chrome(configured.as_deref())).await??;
        info!("Launching browser (headless={})", self.config.headless);

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .request_timeout(Duration::from_secs(self.config.timeout));

        // with_head means NOT headless
        if !self.config.headless {
            builder = builder.with_head();
        }

        if let Some(ref proxy) = self.config.proxy {
            builder = builder.arg(format!("--proxy-server={}", proxy));
        }

        builder = builder
            .arg("--no-sandbox")
            .arg("--disable-setuid-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-gpu");

        for arg in &self.config.chrome_args {
            builder = builder.arg(arg);
        }

        let config = builder
            .build()
            .map_err(|e| ProviderError::Browser(format!("Failed to build browser config: {}", e)))?;

        let (browser, handler) = Browser::launch(config)
            .await
            .map_err(|e| ProviderError::Browser(format!("Failed to launch browser: {}", e)))?;

        Ok((browser, spawn_handler(handler)))
    }

    /// Connect to a remote Chrome instance.
    async fn connect_remote(&self, url: &str) -> ProviderResult<(Browser, JoinHandle<()>)> {
        info!("Connecting to remote browser at {}", url);

        // Get WebSocket URL from the /json/version endpoint
        let http_url = url
            .replace("ws://", "http://")
            .replace("wss://", "https://");
        let version_url = format!("{}/json/version", http_url.trim_end_matches('/'));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.config.timeout))
            .build()
            .map_err(|e| ProviderError::Browser(e.to_string()))?;
        let resp: Value = client
            .get(&version_url)
            .send()
            .await
            .map_err(|e| ProviderError::Browser(format!("Failed to connect to remote browser: {}", e)))?
            .json()
            .await
            .map_err(|e| ProviderError::Browser(format!("Failed to parse browser version info: {}", e)))?;

        let ws_url = resp
            .get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ProviderError::Browser("No webSocketDebuggerUrl in response".to_string()))?;

        debug!("Connecting to WebSocket: {}", ws_url);

        let (browser, handler) = Browser::connect(ws_url)
            .await
            .map_err(|e| ProviderError::Browser(format!("Failed to connect to remote browser: {}", e)))?;

        Ok((browser, spawn_handler(handler)))
    }

    async fn render_pdf(&self, markup: &str, settings: PrintSettings) -> ProviderResult<Vec<u8>> {
        let remote = self.config.remote_url.clone();
        let (mut browser, handler) = match remote.as_deref() {
            Some(url) => self.connect_remote(url).await?,
            None => self.launch().await?,
        };

        let result = self.print(&browser, markup, settings).await;

        // A remote browser outlives us; only tear down what we launched.
        if remote.is_none() {
            if let Err(e) = browser.close().await {
                debug!("Browser close failed: {}", e);
            }
            if let Err(e) = browser.wait().await {
                debug!("Browser wait failed: {}", e);
            }
        }
        handler.abort();

        result
    }

    async fn print(
        &self,
        browser: &Browser,
        markup: &str,
        settings: PrintSettings,
    ) -> ProviderResult<Vec<u8>> {
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| ProviderError::Browser(format!("Failed to open page: {}", e)))?;

        let load_timeout = Duration::from_secs(self.config.timeout);
        let loaded = tokio::time::timeout(load_timeout, async {
            page.set_content(markup).await?;
            page.wait_for_navigation().await?;
            Ok::<_, chromiumoxide::error::CdpError>(())
        })
        .await;

        let result = match loaded {
            Ok(Ok(())) => page.pdf(settings.into_params()).await.map_err(|e| {
                ProviderError::Browser(format!("Failed to print page: {}", e))
            }),
            Ok(Err(e)) => Err(ProviderError::Browser(format!("Failed to load content: {}", e))),
            Err(_) => {
                warn!("Timeout waiting for content to load, printing anyway");
                page.pdf(settings.into_params()).await.map_err(|e| {
                    ProviderError::Browser(format!("Failed to print page: {}", e))
                })
            }
        };

        // Close the page to prevent tab accumulation
        if let Err(e) = page.close().await {
            debug!("Page close failed: {}", e);
        }

        match result {
            Ok(bytes) if bytes.is_empty() => Err(ProviderError::Empty),
            other => other,
        }
    }
}

#[cfg(feature = "browser")]
fn spawn_handler(mut handler: chromiumoxide::Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    })
}

// Stub for when browser feature is disabled
#[cfg(not(feature = "browser"))]
impl ChromiumRenderer {
    async fn render_pdf(&self, _markup: &str, _settings: PrintSettings) -> ProviderResult<Vec<u8>> {
        Err(ProviderError::Unavailable(
            "Browser support not compiled. Rebuild with: cargo build --features browser"
                .to_string(),
        ))
    }
}
