//! Reddit API client.
//!
//! Uses application-only OAuth: a `client_credentials` token is fetched on
//! first use, cached, and refreshed shortly before it expires.

use super::{ForumSource, Page, PostRecord, SubredditRecord, MAX_PAGE_SIZE};
use crate::error::SourceError;
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const REDDIT_API_BASE: &str = "https://oauth.reddit.com";
const REDDIT_TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";

/// Refresh this long before the token actually expires.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// App credentials for the Reddit API.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub user_agent: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

impl AccessToken {
    fn is_fresh(&self) -> bool {
        Instant::now() + TOKEN_REFRESH_MARGIN < self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct RedditListing<T> {
    data: RedditListingData<T>,
}

#[derive(Debug, Deserialize)]
struct RedditListingData<T> {
    children: Vec<RedditListingChild<T>>,
    after: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RedditListingChild<T> {
    data: T,
}

impl<T> From<RedditListing<T>> for Page<T> {
    fn from(listing: RedditListing<T>) -> Self {
        Page {
            items: listing.data.children.into_iter().map(|c| c.data).collect(),
            after: listing.data.after,
        }
    }
}

/// Shared, explicitly constructed API client.
#[derive(Debug)]
pub struct RedditClient {
    http_client: Client,
    credentials: Credentials,
    token: Mutex<Option<AccessToken>>,
}

impl RedditClient {
    /// Build a client; no network traffic happens until the first request.
    pub fn new(credentials: Credentials, timeout: Duration) -> Result<Self, SourceError> {
        let http_client = Client::builder()
            .user_agent(&credentials.user_agent)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http_client,
            credentials,
            token: Mutex::new(None),
        })
    }

    /// Return a valid bearer token, fetching a new one if needed.
    async fn access_token(&self) -> Result<String, SourceError> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.value.clone());
        }

        debug!("Requesting application-only access token");
        let response = self
            .http_client
            .post(REDDIT_TOKEN_URL)
            .basic_auth(
                &self.credentials.client_id,
                Some(&self.credentials.client_secret),
            )
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(map_transport_error)?;

        let response = check_status(response, "/api/v1/access_token")?;
        let body: TokenResponse = response.json().await.map_err(|e| {
            SourceError::AuthenticationFailed {
                reason: format!("malformed token response: {}", e),
            }
        })?;

        info!("Obtained Reddit access token (expires in {}s)", body.expires_in);
        let token = AccessToken {
            value: body.access_token,
            expires_at: Instant::now() + Duration::from_secs(body.expires_in),
        };
        let value = token.value.clone();
        *guard = Some(token);
        Ok(value)
    }

    async fn get_listing<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<Page<T>, SourceError> {
        let token = self.access_token().await?;
        let url = format!("{}{}", REDDIT_API_BASE, endpoint);

        debug!("GET {} {:?}", endpoint, params);
        let response = self
            .http_client
            .get(&url)
            .bearer_auth(token)
            .query(params)
            .send()
            .await
            .map_err(map_transport_error)?;

        let response = check_status(response, endpoint)?;
        let listing: RedditListing<T> =
            response
                .json()
                .await
                .map_err(|e| SourceError::InvalidResponse {
                    details: format!("{}: {}", endpoint, e),
                })?;

        Ok(listing.into())
    }
}

fn paging_params(after: Option<&str>, page_size: usize) -> Vec<(&'static str, String)> {
    let mut params = vec![("limit", page_size.clamp(1, MAX_PAGE_SIZE).to_string())];
    if let Some(after) = after {
        params.push(("after", after.to_string()));
    }
    params
}

fn map_transport_error(e: reqwest::Error) -> SourceError {
    if e.is_timeout() {
        SourceError::Timeout
    } else {
        SourceError::Network(e)
    }
}

fn check_status(response: Response, endpoint: &str) -> Result<Response, SourceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());

    warn!("Request failed with status {} for {}", status, endpoint);
    Err(SourceError::from_status(status.as_u16(), endpoint, retry_after))
}

#[async_trait]
impl ForumSource for RedditClient {
    async fn search_forums(
        &self,
        query: &str,
        after: Option<&str>,
        page_size: usize,
    ) -> Result<Page<SubredditRecord>, SourceError> {
        let mut params = paging_params(after, page_size);
        params.push(("q", query.to_string()));
        self.get_listing("/subreddits/search", &params).await
    }

    async fn top_posts(
        &self,
        forum: &str,
        after: Option<&str>,
        page_size: usize,
    ) -> Result<Page<PostRecord>, SourceError> {
        let mut params = paging_params(after, page_size);
        params.push(("t", "year".to_string()));
        self.get_listing(&format!("/r/{}/top", forum), &params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> Credentials {
        Credentials {
            client_id: "test_client_id".to_string(),
            client_secret: "test_client_secret".to_string(),
            user_agent: "em-dash-analyzer".to_string(),
        }
    }

    #[test]
    fn test_client_creation() {
        let client = RedditClient::new(credentials(), Duration::from_secs(5));
        assert!(client.is_ok());
    }

    #[test]
    fn test_paging_params() {
        let params = paging_params(Some("t3_abc"), 500);
        assert_eq!(params[0], ("limit", "100".to_string()));
        assert_eq!(params[1], ("after", "t3_abc".to_string()));

        let params = paging_params(None, 0);
        assert_eq!(params, vec![("limit", "1".to_string())]);
    }

    #[test]
    fn test_listing_decoding() {
        let json = r#"{
            "kind": "Listing",
            "data": {
                "after": "t3_next",
                "dist": 2,
                "children": [
                    {"kind": "t3", "data": {
                        "selftext": "Hello — world.", "created_utc": 1700000000.0, "title": "a"
                    }},
                    {"kind": "t3", "data": {"selftext": null, "created_utc": 1700000100}}
                ]
            }
        }"#;

        let listing: RedditListing<PostRecord> = serde_json::from_str(json).unwrap();
        let page: Page<PostRecord> = listing.into();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.after.as_deref(), Some("t3_next"));
        assert_eq!(page.items[0].selftext.as_deref(), Some("Hello — world."));
        assert_eq!(page.items[1].selftext, None);
    }

    #[test]
    fn test_token_freshness() {
        let stale = AccessToken {
            value: "x".to_string(),
            expires_at: Instant::now() + Duration::from_secs(30),
        };
        assert!(!stale.is_fresh());

        let fresh = AccessToken {
            value: "x".to_string(),
            expires_at: Instant::now() + Duration::from_secs(3600),
        };
        assert!(fresh.is_fresh());
    }
}
