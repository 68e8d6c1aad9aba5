use std::time::{Duration, Instant};

use chrono::NaiveDate;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::common::config::ZohoSection;
use crate::common::error::RmpError;
use crate::zoho::{ZohoApi, ZohoFuture, ZohoProject};

/// Projects requested per page.
const PAGE_SIZE: usize = 100;
/// Tokens are refreshed this long before Zoho expires them.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

struct CachedToken {
    token: String,
    valid_until: Instant,
}

pub struct ZohoClient {
    http: reqwest::Client,
    config: ZohoSection,
    token: Mutex<Option<CachedToken>>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct ProjectPage {
    #[serde(default)]
    projects: Vec<WireProject>,
}

#[derive(Deserialize)]
struct WireProject {
    id_string: Option<String>,
    id: Option<serde_json::Value>,
    name: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    start_date: Option<String>,
    #[serde(default)]
    end_date: Option<String>,
    #[serde(default)]
    owner_email: Option<String>,
}

/// Zoho formats dates as `MM-DD-YYYY` unless the portal is configured for ISO dates.
fn parse_zoho_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%m-%d-%Y")
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y-%m-%d"))
        .ok()
}

impl WireProject {
    fn into_project(self) -> Option<ZohoProject> {
        let id = match (self.id_string, self.id) {
            (Some(id), _) => id,
            (None, Some(serde_json::Value::Number(n))) => n.to_string(),
            (None, Some(serde_json::Value::String(s))) => s,
            _ => return None,
        };
        let date = |value: Option<String>| value.as_deref().and_then(parse_zoho_date);
        Some(ZohoProject {
            id,
            name: self.name,
            status: self.status.unwrap_or_default(),
            start_date: date(self.start_date),
            end_date: date(self.end_date),
            owner_email: self.owner_email.filter(|e| !e.is_empty()),
        })
    }
}

impl ZohoClient {
    pub fn new(config: ZohoSection) -> crate::Result<Self> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(ZohoClient {
            http,
            config,
            token: Mutex::new(None),
        })
    }

    async fn access_token(&self) -> crate::Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.valid_until > Instant::now() {
                return Ok(token.token.clone());
            }
        }
        log::debug!("Refreshing Zoho access token");
        let url = format!("{}/oauth/v2/token", self.config.accounts_url.trim_end_matches('/'));
        let response: TokenResponse = self
            .http
            .post(&url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("refresh_token", self.config.refresh_token.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let token = match (response.access_token, response.error) {
            (Some(token), _) => token,
            (None, Some(error)) => {
                return Err(RmpError::ZohoError(format!("Token refresh failed: {error}")));
            }
            (None, None) => {
                return Err(RmpError::ZohoError(
                    "Token refresh returned no access token".to_string(),
                ));
            }
        };
        let lifetime = Duration::from_secs(response.expires_in.unwrap_or(3600));
        *cached = Some(CachedToken {
            token: token.clone(),
            valid_until: Instant::now() + lifetime.saturating_sub(TOKEN_EXPIRY_MARGIN),
        });
        Ok(token)
    }

    async fn fetch_page(&self, index: usize) -> crate::Result<Vec<ZohoProject>> {
        let token = self.access_token().await?;
        let url = format!(
            "{}/restapi/portal/{}/projects/",
            self.config.api_url.trim_end_matches('/'),
            self.config.portal_id
        );
        let response = self
            .http
            .get(&url)
            .bearer_auth(&token)
            .query(&[("index", index), ("range", PAGE_SIZE)])
            .send()
            .await?;
        // Zoho answers an empty page with 204
        if response.status() == reqwest::StatusCode::NO_CONTENT {
            return Ok(Vec::new());
        }
        let page: ProjectPage = response.error_for_status()?.json().await?;
        let total = page.projects.len();
        let projects: Vec<ZohoProject> = page
            .projects
            .into_iter()
            .filter_map(WireProject::into_project)
            .collect();
        if projects.len() < total {
            log::warn!("Ignored {} Zoho project(s) without an id", total - projects.len());
        }
        Ok(projects)
    }

    async fn fetch_all(&self) -> crate::Result<Vec<ZohoProject>> {
        let mut projects = Vec::new();
        // Zoho indices start at 1
        let mut index = 1;
        loop {
            let page = self.fetch_page(index).await?;
            let count = page.len();
            projects.extend(page);
            if count < PAGE_SIZE {
                break;
            }
            index += PAGE_SIZE;
        }
        log::debug!("Fetched {} project(s) from Zoho", projects.len());
        Ok(projects)
    }
}

impl ZohoApi for ZohoClient {
    fn fetch_projects(&self) -> ZohoFuture<'_, Vec<ZohoProject>> {
        Box::pin(self.fetch_all())
    }
}
