use crate::config::AppConfig;
use fantoccini::error::CmdError;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::{Map, Value, json};
use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::{Child, Command};

/// Port a locally spawned ChromeDriver listens on
pub const LOCAL_DRIVER_PORT: u16 = 9515;

/// Endpoints tried when the configured one does not answer
const FALLBACK_URLS: [&str; 2] = [
    "http://localhost:9515", // ChromeDriver default
    "http://127.0.0.1:4444",
];

/// Chrome capabilities for the pipeline's browser sessions
pub fn chrome_capabilities(headless: bool, lang: &str) -> Map<String, Value> {
    let mut args = vec![
        "--disable-blink-features=AutomationControlled".to_string(),
        format!("--lang={}", lang),
        "--window-size=1280,1800".to_string(),
    ];
    if headless {
        args.insert(0, "--headless=new".to_string());
    }

    let mut caps = Map::new();
    caps.insert("browserName".to_string(), json!("chrome"));
    caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));
    caps
}

/// A browser session, plus the ChromeDriver process backing it when we
/// had to start one ourselves
pub struct BrowserSession {
    client: Client,
    driver: Option<Child>,
}

impl BrowserSession {
    /// Connect to the configured WebDriver, then the fallbacks, then a
    /// ChromeDriver started from `driver_dir`
    pub async fn connect(config: &AppConfig, lang: &str) -> Result<Self, Box<dyn Error>> {
        let caps = chrome_capabilities(config.headless, lang);

        if let Some(client) = connect_any(&config.webdriver_url, &caps).await {
            return Ok(Self {
                client,
                driver: None,
            });
        }

        let Some(binary) = crate::driver::find_binary(&config.driver_dir) else {
            ::log::error!(
                "Make sure a WebDriver server is running or set the WEBDRIVER_URL environment variable"
            );
            return Err("no WebDriver server reachable and no local ChromeDriver found".into());
        };

        let mut driver = spawn_driver(binary)?;
        let local_url = format!("http://localhost:{}", LOCAL_DRIVER_PORT);
        for _ in 0..20 {
            tokio::time::sleep(Duration::from_millis(250)).await;
            if let Ok(client) = new_client(&local_url, &caps).await {
                ::log::info!("Connected to local ChromeDriver at {}", local_url);
                return Ok(Self {
                    client,
                    driver: Some(driver),
                });
            }
        }

        let _ = driver.kill().await;
        Err(format!("local ChromeDriver did not answer on {}", local_url).into())
    }

    /// Navigate and wait until `ready` shows up, at most `timeout`
    pub async fn open(&self, url: &str, ready: &str, timeout: Duration) -> Result<(), CmdError> {
        ::log::debug!("GOTO: {}", url);
        self.client.goto(url).await?;
        self.client
            .wait()
            .at_most(timeout)
            .for_element(Locator::Css(ready))
            .await?;
        Ok(())
    }

    pub async fn source(&self) -> Result<String, CmdError> {
        self.client.source().await
    }

    /// Click the first element the locator finds, after scrolling it into
    /// view. Returns whether anything was clicked.
    pub async fn click_first(&self, locator: Locator<'_>) -> bool {
        let Ok(element) = self.client.find(locator).await else {
            return false;
        };
        let scroll = self
            .client
            .execute(
                "arguments[0].scrollIntoView({block:'center'});",
                vec![json!(element)],
            )
            .await;
        if let Err(e) = scroll {
            ::log::trace!("scrollIntoView failed: {}", e);
        }
        match element.click().await {
            Ok(()) => true,
            Err(e) => {
                ::log::debug!("Click failed: {}", e);
                false
            }
        }
    }

    pub async fn scroll_by(&self, pixels: u32) {
        let script = format!("window.scrollTo(0, {});", pixels);
        if let Err(e) = self.client.execute(&script, vec![]).await {
            ::log::debug!("Scroll failed: {}", e);
        }
    }

    /// PNG screenshot of the current viewport
    pub async fn screenshot(&self) -> Result<Vec<u8>, CmdError> {
        self.client.screenshot().await
    }

    /// End the session and stop our ChromeDriver if we started one
    pub async fn close(self) {
        if let Err(e) = self.client.close().await {
            ::log::warn!("Failed to close WebDriver session: {}", e);
        }
        if let Some(mut driver) = self.driver {
            if let Err(e) = driver.kill().await {
                ::log::warn!("Failed to stop ChromeDriver: {}", e);
            }
        }
    }
}

async fn new_client(url: &str, caps: &Map<String, Value>) -> Result<Client, Box<dyn Error>> {
    let mut builder = ClientBuilder::native();
    builder.capabilities(caps.clone());
    Ok(builder.connect(url).await?)
}

/// Try the configured endpoint, then the usual local ones
async fn connect_any(webdriver_url: &str, caps: &Map<String, Value>) -> Option<Client> {
    match new_client(webdriver_url, caps).await {
        Ok(client) => {
            ::log::debug!("Connected to WebDriver at {}", webdriver_url);
            return Some(client);
        }
        Err(e) => {
            ::log::warn!("Failed to connect to WebDriver at {}: {}", webdriver_url, e);
        }
    }

    for url in FALLBACK_URLS {
        if url == webdriver_url {
            continue;
        }
        ::log::info!("Trying fallback WebDriver URL: {}", url);
        if let Ok(client) = new_client(url, caps).await {
            ::log::debug!("Connected to fallback WebDriver at {}", url);
            return Some(client);
        }
    }
    None
}

fn spawn_driver(binary: PathBuf) -> Result<Child, Box<dyn Error>> {
    ::log::info!(
        "Starting {} on port {}",
        binary.display(),
        LOCAL_DRIVER_PORT
    );
    let child = Command::new(&binary)
        .arg(format!("--port={}", LOCAL_DRIVER_PORT))
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| format!("cannot start {}: {}", binary.display(), e))?;
    Ok(child)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_capabilities() {
        let caps = chrome_capabilities(true, "fr-FR");
        let args = caps["goog:chromeOptions"]["args"].as_array().unwrap();
        assert_eq!(args[0], "--headless=new");
        assert!(args.contains(&json!("--lang=fr-FR")));
        assert_eq!(caps["browserName"], "chrome");
    }

    #[test]
    fn test_visible_capabilities() {
        let caps = chrome_capabilities(false, "en-US");
        let args = caps["goog:chromeOptions"]["args"].as_array().unwrap();
        assert!(!args.contains(&json!("--headless=new")));
        assert!(args.contains(&json!("--lang=en-US")));
    }
}
