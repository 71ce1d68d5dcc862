use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::fetch::AuthenticatedClient;
use crate::http::{Request, Response};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("api: request failed: {0:#}")]
    Transport(anyhow::Error),
    #[error("api: unexpected status {0}")]
    Status(u16),
    #[error("api: unauthorized")]
    Unauthorized,
    #[error("api: malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    #[default]
    Trending,
    Curated,
    Recent,
    Feed,
}

impl Tab {
    pub const ALL: [Tab; 4] = [Tab::Trending, Tab::Curated, Tab::Recent, Tab::Feed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tab::Trending => "trending",
            Tab::Curated => "curated",
            Tab::Recent => "recent",
            Tab::Feed => "feed",
        }
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tab {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trending" => Ok(Tab::Trending),
            "curated" => Ok(Tab::Curated),
            "recent" => Ok(Tab::Recent),
            "feed" => Ok(Tab::Feed),
            other => {
                let known: Vec<&str> = Tab::ALL.iter().map(Tab::as_str).collect();
                bail!("unknown tab {other:?}, expected one of {}", known.join(", "))
            }
        }
    }
}

/// One page of one tab's stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedQuery {
    pub tab: Tab,
    pub page: u32,
    pub size: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    #[serde(default, rename = "content")]
    pub body: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub author_avatar: String,
    #[serde(default, rename = "url")]
    pub external_url: String,
    #[serde(default, rename = "createdAt")]
    pub created_at: String,
    #[serde(default)]
    pub likes: Option<i64>,
    #[serde(default)]
    pub comments: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostResponse {
    #[serde(default)]
    pub content: Vec<Post>,
    #[serde(default, rename = "totalPages")]
    pub total_pages: i64,
    #[serde(default, rename = "totalElements")]
    pub total_elements: i64,
    pub last: bool,
}

/// Items of one fetch, in server order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedPage {
    pub items: Vec<Post>,
    pub is_last_page: bool,
}

impl From<PostResponse> for FeedPage {
    fn from(resp: PostResponse) -> Self {
        Self {
            items: resp.content,
            is_last_page: resp.last,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    #[serde(default)]
    pub author: String,
    #[serde(default, rename = "authorAvatar")]
    pub author_avatar: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, rename = "createdAt")]
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    #[serde(default, rename = "discordId")]
    pub discord_id: Option<String>,
    #[serde(rename = "blogUrl")]
    pub blog_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeToggle {
    pub liked: bool,
    #[serde(default, rename = "likeCount")]
    pub like_count: Option<i64>,
}

#[derive(Debug, Serialize)]
struct NewMember<'a> {
    #[serde(rename = "discordId")]
    discord_id: &'a str,
    #[serde(rename = "blogUrl")]
    blog_url: &'a str,
}

#[derive(Debug, Serialize)]
struct NewComment<'a> {
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct LikedResponse {
    #[serde(default)]
    liked: bool,
}

pub struct ApiClient {
    base_url: Url,
    client: AuthenticatedClient,
}

impl ApiClient {
    pub fn new(base_url: &str, client: AuthenticatedClient) -> Result<Self> {
        if base_url.trim().is_empty() {
            bail!("api: base url is required");
        }
        let mut base_url = Url::parse(base_url.trim())
            .with_context(|| format!("api: parse base url {base_url:?}"))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self { base_url, client })
    }

    pub fn posts(&self, query: FeedQuery) -> ApiResult<FeedPage> {
        let mut url = self.url("api/posts")?;
        url.query_pairs_mut()
            .append_pair("mode", query.tab.as_str())
            .append_pair("page", &query.page.to_string())
            .append_pair("size", &query.size.to_string());
        let resp = self.anonymous(Request::get(url.as_str()))?;
        let payload: PostResponse = decode(&resp)?;
        Ok(payload.into())
    }

    /// `Ok(None)` when the member has not registered a blog.
    pub fn member(&self, discord_id: &str) -> ApiResult<Option<Member>> {
        let url = self.url(&format!("api/members/{discord_id}"))?;
        let resp = self.anonymous(Request::get(url.as_str()))?;
        if resp.status == 404 {
            return Ok(None);
        }
        decode(&resp).map(Some)
    }

    pub fn save_member(&self, discord_id: &str, blog_url: &str) -> ApiResult<()> {
        let url = self.url("api/members")?;
        let request = Request::post(url.as_str())
            .json(&NewMember {
                discord_id,
                blog_url,
            })
            .map_err(ApiError::Transport)?;
        let resp = self.anonymous(request)?;
        check_status(&resp)
    }

    pub fn toggle_like(&self, post_id: i64) -> ApiResult<LikeToggle> {
        let url = self.url(&format!("api/posts/{post_id}/likes"))?;
        let resp = self.authenticated(Request::post(url.as_str()))?;
        decode(&resp)
    }

    /// A rejected token reads as "not liked"; it never ends the session.
    pub fn is_liked(&self, post_id: i64) -> ApiResult<bool> {
        let url = self.url(&format!("api/posts/{post_id}/likes/me"))?;
        let resp = self
            .client
            .send_quiet(Request::get(url.as_str()))
            .map_err(ApiError::Transport)?;
        if resp.is_unauthorized() {
            return Ok(false);
        }
        let payload: LikedResponse = decode(&resp)?;
        Ok(payload.liked)
    }

    pub fn comments(&self, post_id: i64) -> ApiResult<Vec<Comment>> {
        let url = self.url(&format!("api/posts/{post_id}/comments"))?;
        let resp = self.anonymous(Request::get(url.as_str()))?;
        decode(&resp)
    }

    pub fn add_comment(&self, post_id: i64, content: &str) -> ApiResult<Comment> {
        let url = self.url(&format!("api/posts/{post_id}/comments"))?;
        let request = Request::post(url.as_str())
            .json(&NewComment { content })
            .map_err(ApiError::Transport)?;
        let resp = self.authenticated(request)?;
        decode(&resp)
    }

    fn url(&self, path: &str) -> ApiResult<Url> {
        self.base_url
            .join(path)
            .map_err(|err| ApiError::Transport(anyhow::Error::new(err).context("api: build url")))
    }

    fn anonymous(&self, request: Request) -> ApiResult<Response> {
        self.client
            .send_anonymous(request)
            .map_err(ApiError::Transport)
    }

    fn authenticated(&self, request: Request) -> ApiResult<Response> {
        self.client.send(request).map_err(ApiError::Transport)
    }
}

fn check_status(resp: &Response) -> ApiResult<()> {
    if resp.is_unauthorized() {
        return Err(ApiError::Unauthorized);
    }
    if !resp.is_success() {
        return Err(ApiError::Status(resp.status));
    }
    Ok(())
}

fn decode<T: DeserializeOwned>(resp: &Response) -> ApiResult<T> {
    check_status(resp)?;
    Ok(resp.json()?)
}
