use crate::utils::error::Result;
use chrono::{Datelike, NaiveDate};
use reqwest::header::{HeaderMap, COOKIE, SET_COOKIE};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

/// UA string matched to a real browser capture; the site rejects obvious
/// non-browser agents.
pub const BROWSER_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/138.0.0.0 Safari/537.36";

const COOKIES_FILE: &str = "cookies.json";

/// HTTP session with a persistent cookie profile.
///
/// Cookies live in `<profile_dir>/cookies.json` and are sent on every
/// request; `Set-Cookie` responses are folded back in and written out, so a
/// `cf_clearance` token seeded into the profile survives across runs.
pub struct MrciSession {
    http: reqwest::Client,
    base_url: String,
    profile_dir: PathBuf,
    cookies: Mutex<HashMap<String, String>>,
}

impl MrciSession {
    pub fn open(base_url: impl Into<String>, profile_dir: impl Into<PathBuf>) -> Result<Self> {
        let profile_dir = profile_dir.into();
        std::fs::create_dir_all(&profile_dir)?;
        let cookies = load_cookies(&profile_dir)?;
        if !cookies.is_empty() {
            tracing::debug!(count = cookies.len(), "loaded session cookies from profile");
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .user_agent(BROWSER_UA)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            profile_dir,
            cookies: Mutex::new(cookies),
        })
    }

    /// Prime the session against the yearly index page. Helps with both the
    /// challenge cookie and the Referer the site expects.
    pub async fn warm_up(&self, year: i32) -> Result<()> {
        let url = format!("{}/ohlc/{}/", self.base_url, year);
        self.get(&url).await.map(|_| ())
    }

    /// Fetch one daily OHLC page. Non-success statuses still return the body;
    /// the caller decides what a challenge or empty page means.
    pub async fn fetch_day(&self, date: NaiveDate) -> Result<String> {
        let url = format!(
            "{}/ohlc/{}/{}.php",
            self.base_url,
            date.year(),
            date.format("%y%m%d")
        );
        self.get(&url).await
    }

    pub fn is_challenge(html: &str) -> bool {
        html.contains("Just a moment")
    }

    async fn get(&self, url: &str) -> Result<String> {
        let mut request = self.http.get(url);
        if let Some(header) = self.cookie_header() {
            request = request.header(COOKIE, header);
        }
        let response = request.send().await?;
        self.absorb_cookies(response.headers());
        Ok(response.text().await?)
    }

    fn cookie_header(&self) -> Option<String> {
        let cookies = self.cookies.lock().ok()?;
        if cookies.is_empty() {
            return None;
        }
        let mut pairs: Vec<String> = cookies.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        pairs.sort();
        Some(pairs.join("; "))
    }

    fn absorb_cookies(&self, headers: &HeaderMap) {
        let Ok(mut cookies) = self.cookies.lock() else {
            return;
        };
        let mut changed = false;
        for value in headers.get_all(SET_COOKIE) {
            let Ok(raw) = value.to_str() else { continue };
            if let Some((name, val)) = raw.split(';').next().and_then(|kv| kv.split_once('=')) {
                cookies.insert(name.trim().to_string(), val.trim().to_string());
                changed = true;
            }
        }
        if changed {
            persist_cookies(&self.profile_dir, &cookies);
        }
    }
}

fn load_cookies(dir: &Path) -> Result<HashMap<String, String>> {
    let path = dir.join(COOKIES_FILE);
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn persist_cookies(dir: &Path, cookies: &HashMap<String, String>) {
    let path = dir.join(COOKIES_FILE);
    match serde_json::to_string_pretty(cookies) {
        Ok(json) => {
            if let Err(e) = std::fs::write(&path, json) {
                tracing::warn!(error = %e, "failed to persist session cookies");
            }
        }
        Err(e) => tracing::warn!(error = %e, "failed to serialize session cookies"),
    }
}
