use std::sync::Arc;

use crate::api::{ApiClient, ApiResult, Comment, FeedPage, FeedQuery, LikeToggle, Member};

pub trait FeedService: Send + Sync {
    fn load_page(&self, query: FeedQuery) -> ApiResult<FeedPage>;
}

pub trait MemberService: Send + Sync {
    fn find_member(&self, discord_id: &str) -> ApiResult<Option<Member>>;
    fn register_member(&self, discord_id: &str, blog_url: &str) -> ApiResult<()>;
}

pub trait InteractionService: Send + Sync {
    fn toggle_like(&self, post_id: i64) -> ApiResult<LikeToggle>;
    fn is_liked(&self, post_id: i64) -> ApiResult<bool>;
    fn load_comments(&self, post_id: i64) -> ApiResult<Vec<Comment>>;
    fn add_comment(&self, post_id: i64, content: &str) -> ApiResult<Comment>;
}

pub struct ApiFeedService {
    client: Arc<ApiClient>,
}

impl ApiFeedService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

impl FeedService for ApiFeedService {
    fn load_page(&self, query: FeedQuery) -> ApiResult<FeedPage> {
        self.client.posts(query)
    }
}

pub struct ApiMemberService {
    client: Arc<ApiClient>,
}

impl ApiMemberService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

impl MemberService for ApiMemberService {
    fn find_member(&self, discord_id: &str) -> ApiResult<Option<Member>> {
        self.client.member(discord_id)
    }

    fn register_member(&self, discord_id: &str, blog_url: &str) -> ApiResult<()> {
        self.client.save_member(discord_id, blog_url)
    }
}

pub struct ApiInteractionService {
    client: Arc<ApiClient>,
}

impl ApiInteractionService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

impl InteractionService for ApiInteractionService {
    fn toggle_like(&self, post_id: i64) -> ApiResult<LikeToggle> {
        self.client.toggle_like(post_id)
    }

    fn is_liked(&self, post_id: i64) -> ApiResult<bool> {
        self.client.is_liked(post_id)
    }

    fn load_comments(&self, post_id: i64) -> ApiResult<Vec<Comment>> {
        self.client.comments(post_id)
    }

    fn add_comment(&self, post_id: i64, content: &str) -> ApiResult<Comment> {
        self.client.add_comment(post_id, content)
    }
}

/// The three services over one API client.
#[derive(Clone)]
pub struct Services {
    pub feed: Arc<dyn FeedService>,
    pub members: Arc<dyn MemberService>,
    pub interactions: Arc<dyn InteractionService>,
}

impl Services {
    pub fn from_client(client: Arc<ApiClient>) -> Self {
        Self {
            feed: Arc::new(ApiFeedService::new(client.clone())),
            members: Arc::new(ApiMemberService::new(client.clone())),
            interactions: Arc::new(ApiInteractionService::new(client)),
        }
    }
}
