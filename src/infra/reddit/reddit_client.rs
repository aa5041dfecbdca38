use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Response};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::core::moderation::{AuthorProfile, ContentKind, GateError, ModerationPlatform};

/// Credentials for a Reddit "script" app acting under a moderator account.
#[derive(Debug, Clone)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    pub user_agent: String,
}

/// A newly listed post or comment, carrying only what the poller needs.
#[derive(Debug, Clone)]
pub struct SubmissionRecord {
    pub kind: ContentKind,
    /// Fullname of the content (`t3_...` for posts, `t1_...` for comments).
    pub fullname: String,
    /// Author fullname (`t2_...`). Absent for deleted accounts.
    pub author_id: Option<String>,
    pub author_name: Option<String>,
    pub subreddit: String,
}

struct BearerToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

/// Minimal Reddit API client. It deliberately exposes only the calls the
/// core and bot layers need.
///
/// Auth uses the OAuth2 password grant for script apps; the bearer token is
/// cached and refreshed shortly before it expires.
#[derive(Clone)]
pub struct RedditApiClient {
    client: Client,
    credentials: Arc<RedditCredentials>,
    token: Arc<RwLock<Option<BearerToken>>>,
    auth_url: String,
    base_url: String,
}

impl RedditApiClient {
    pub fn new(credentials: RedditCredentials) -> Result<Self, GateError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "User-Agent",
            HeaderValue::from_str(&credentials.user_agent)
                .map_err(|e| GateError::Config(format!("Invalid user agent: {}", e)))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| GateError::Platform(e.to_string()))?;

        Ok(Self {
            client,
            credentials: Arc::new(credentials),
            token: Arc::new(RwLock::new(None)),
            auth_url: "https://www.reddit.com".to_string(),
            base_url: "https://oauth.reddit.com".to_string(),
        })
    }

    /// A valid bearer token, refreshing it when it is about to expire.
    async fn bearer_token(&self) -> Result<String, GateError> {
        {
            let token = self.token.read().await;
            if let Some(token) = token.as_ref().filter(|t| !t.needs_refresh()) {
                return Ok(token.access_token.clone());
            }
        }

        let mut slot = self.token.write().await;
        // Another task may have refreshed while we waited for the lock.
        if let Some(token) = slot.as_ref().filter(|t| !t.needs_refresh()) {
            return Ok(token.access_token.clone());
        }

        let resp = self
            .client
            .post(format!("{}/api/v1/access_token", self.auth_url))
            .basic_auth(
                &self.credentials.client_id,
                Some(&self.credentials.client_secret),
            )
            .form(&[
                ("grant_type", "password"),
                ("username", self.credentials.username.as_str()),
                ("password", self.credentials.password.as_str()),
            ])
            .send()
            .await
            .map_err(|e| GateError::Platform(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(GateError::Platform(format!(
                "Token request failed with {}",
                resp.status()
            )));
        }

        let token: ApiToken = resp
            .json()
            .await
            .map_err(|e| GateError::Platform(e.to_string()))?;
        let expires_in = token.expires_in.unwrap_or(3600);
        let access_token = token.access_token.clone();

        *slot = Some(BearerToken {
            access_token: token.access_token,
            expires_at: Utc::now() + Duration::seconds(expires_in as i64),
        });

        Ok(access_token)
    }

    async fn api_get(&self, path: &str, query: &[(&str, &str)]) -> Result<Response, GateError> {
        let token = self.bearer_token().await?;
        let resp = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .query(query)
            .send()
            .await
            .map_err(|e| GateError::Platform(e.to_string()))?;

        if resp.status().is_success() {
            Ok(resp)
        } else {
            Err(GateError::Platform(format!(
                "Reddit returned {} for {}",
                resp.status(),
                path
            )))
        }
    }

    async fn api_post(&self, path: &str, form: &[(&str, &str)]) -> Result<Response, GateError> {
        let token = self.bearer_token().await?;
        let resp = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .form(form)
            .send()
            .await
            .map_err(|e| GateError::Platform(e.to_string()))?;

        if resp.status().is_success() {
            Ok(resp)
        } else {
            Err(GateError::Platform(format!(
                "Reddit returned {} for {}",
                resp.status(),
                path
            )))
        }
    }

    /// Newest posts in the subreddit.
    pub async fn latest_posts(
        &self,
        subreddit: &str,
        limit: u32,
    ) -> Result<Vec<SubmissionRecord>, GateError> {
        let limit = limit.to_string();
        let resp = self
            .api_get(&format!("/r/{}/new", subreddit), &[("limit", limit.as_str())])
            .await?;
        let listing: ApiListing = resp
            .json()
            .await
            .map_err(|e| GateError::Platform(e.to_string()))?;
        Ok(map_listing(listing, ContentKind::Post))
    }

    /// Newest comments in the subreddit.
    pub async fn latest_comments(
        &self,
        subreddit: &str,
        limit: u32,
    ) -> Result<Vec<SubmissionRecord>, GateError> {
        let limit = limit.to_string();
        let resp = self
            .api_get(
                &format!("/r/{}/comments", subreddit),
                &[("limit", limit.as_str())],
            )
            .await?;
        let listing: ApiListing = resp
            .json()
            .await
            .map_err(|e| GateError::Platform(e.to_string()))?;
        Ok(map_listing(listing, ContentKind::Comment))
    }
}

#[async_trait]
impl ModerationPlatform for RedditApiClient {
    async fn fetch_author(&self, user_id: &str) -> Result<AuthorProfile, GateError> {
        let resp = self
            .api_get("/api/user_data_by_account_ids", &[("ids", user_id)])
            .await?;
        let mut accounts: HashMap<String, ApiAccountData> = resp
            .json()
            .await
            .map_err(|e| GateError::Platform(e.to_string()))?;

        let account = accounts.remove(user_id).ok_or_else(|| {
            GateError::MalformedResponse(format!("No profile data for {}", user_id))
        })?;

        let created_utc = account.created_utc.ok_or_else(|| {
            GateError::MalformedResponse(format!("Profile for {} has no creation time", user_id))
        })?;
        let created_at = Utc
            .timestamp_opt(created_utc as i64, 0)
            .single()
            .ok_or_else(|| {
                GateError::MalformedResponse(format!(
                    "Profile for {} has an out-of-range creation time",
                    user_id
                ))
            })?;

        let karma = match (account.link_karma, account.comment_karma) {
            (None, None) => None,
            (link, comment) => Some(link.unwrap_or(0) + comment.unwrap_or(0)),
        };

        Ok(AuthorProfile { created_at, karma })
    }

    async fn is_approved_user(
        &self,
        subreddit: &str,
        username: &str,
    ) -> Result<bool, GateError> {
        let resp = self
            .api_get(
                &format!("/r/{}/about/contributors", subreddit),
                &[("user", username), ("limit", "1")],
            )
            .await?;
        let listing: ApiListing = resp
            .json()
            .await
            .map_err(|e| GateError::Platform(e.to_string()))?;
        Ok(!listing.children().is_empty())
    }

    async fn remove_content(&self, content_id: &str) -> Result<(), GateError> {
        self.api_post("/api/remove", &[("id", content_id), ("spam", "false")])
            .await?;
        Ok(())
    }

    async fn send_private_message(
        &self,
        to: &str,
        subject: &str,
        text: &str,
    ) -> Result<(), GateError> {
        self.api_post(
            "/api/compose",
            &[
                ("api_type", "json"),
                ("to", to),
                ("subject", subject),
                ("text", text),
            ],
        )
        .await?;
        Ok(())
    }

    async fn submit_comment(&self, parent_id: &str, text: &str) -> Result<(), GateError> {
        let resp = self
            .api_post(
                "/api/comment",
                &[("api_type", "json"), ("thing_id", parent_id), ("text", text)],
            )
            .await?;
        let body: ApiCommentResponse = resp
            .json()
            .await
            .map_err(|e| GateError::Platform(e.to_string()))?;

        let comment_id = body.created_fullname().ok_or_else(|| {
            GateError::MalformedResponse("Comment response carried no fullname".to_string())
        })?;

        // Mark the removal comment as coming from the moderators.
        self.api_post(
            "/api/distinguish",
            &[("api_type", "json"), ("id", comment_id.as_str()), ("how", "yes")],
        )
        .await?;

        Ok(())
    }
}

impl BearerToken {
    // Refresh a minute early so in-flight calls never race expiry.
    fn needs_refresh(&self) -> bool {
        self.expires_at <= Utc::now() + Duration::seconds(60)
    }
}

fn map_listing(listing: ApiListing, kind: ContentKind) -> Vec<SubmissionRecord> {
    listing
        .children()
        .into_iter()
        .filter_map(|thing| thing.data)
        .filter_map(|data| {
            data.name.map(|fullname| SubmissionRecord {
                kind,
                fullname,
                author_id: data.author_fullname,
                author_name: data.author,
                subreddit: data.subreddit.unwrap_or_default(),
            })
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct ApiToken {
    access_token: String,
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ApiAccountData {
    created_utc: Option<f64>,
    link_karma: Option<i64>,
    comment_karma: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ApiListing {
    data: Option<ApiListingData>,
}

impl ApiListing {
    fn children(self) -> Vec<ApiThing> {
        self.data.and_then(|d| d.children).unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct ApiListingData {
    children: Option<Vec<ApiThing>>,
}

#[derive(Debug, Deserialize)]
struct ApiThing {
    data: Option<ApiThingData>,
}

#[derive(Debug, Deserialize)]
struct ApiThingData {
    name: Option<String>,
    author: Option<String>,
    author_fullname: Option<String>,
    subreddit: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiCommentResponse {
    json: Option<ApiCommentJson>,
}

impl ApiCommentResponse {
    fn created_fullname(self) -> Option<String> {
        self.json?
            .data?
            .things
            .unwrap_or_default()
            .into_iter()
            .filter_map(|t| t.data)
            .find_map(|d| d.name)
    }
}

#[derive(Debug, Deserialize)]
struct ApiCommentJson {
    data: Option<ApiCommentData>,
}

#[derive(Debug, Deserialize)]
struct ApiCommentData {
    things: Option<Vec<ApiThing>>,
}
