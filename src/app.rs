use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use textwrap::{wrap, Options as WrapOptions};
use tracing::{debug, info, warn};
use url::Url;

use crate::api::{ApiClient, ApiResult, Comment, FeedPage, LikeToggle, Member, Post, Tab};
use crate::auth::{self, AuthSession, BrowserNavigator, IdentityEvent, Navigator};
use crate::config;
use crate::data::Services;
use crate::feed::{FeedState, PageOutcome, PageRequest, PaginationController};
use crate::fetch::AuthenticatedClient;
use crate::http::{ReqwestTransport, Transport, TransportConfig};
use crate::interaction::{self, CommentThread};
use crate::onboarding::{IdentityPhase, OnboardingCheck, OnboardingGate};
use crate::registration::BlogRegistration;
use crate::sentinel::{MarkerId, ScrollSentinel};
use crate::storage;

const CARD_WIDTH: usize = 78;
const CARD_BODY_LINES: usize = 3;

enum AsyncResponse {
    Page {
        request: PageRequest,
        result: ApiResult<FeedPage>,
    },
    Member {
        check: OnboardingCheck,
        result: ApiResult<Option<Member>>,
    },
    Like {
        post_id: i64,
        epoch: u64,
        result: ApiResult<LikeToggle>,
    },
    Liked {
        post_id: i64,
        epoch: u64,
        result: ApiResult<bool>,
    },
    Comments {
        post_id: i64,
        result: ApiResult<Vec<Comment>>,
    },
    CommentAdded {
        post_id: i64,
        result: ApiResult<Comment>,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct FeedOptions {
    pub page_size: u32,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            page_size: config::DEFAULT_PAGE_SIZE,
        }
    }
}

/// The feed view: owns every piece of client state and mutates it only on
/// the caller's thread. Network calls run on worker threads and are applied
/// when their results are drained by [`Feed::poll`].
pub struct Feed {
    services: Services,
    session: Arc<AuthSession>,
    navigator: Arc<dyn Navigator>,
    controller: PaginationController,
    sentinel: ScrollSentinel,
    onboarding: OnboardingGate,
    identity_rx: Receiver<IdentityEvent>,
    response_tx: Sender<AsyncResponse>,
    response_rx: Receiver<AsyncResponse>,
    outstanding: usize,
    /// Bumped on every identity publish; like state is tied to one epoch.
    identity_epoch: u64,
    liked: HashMap<i64, bool>,
    pending_likes: HashSet<i64>,
    comments: Option<CommentThread>,
    pending_comment: bool,
}

impl Feed {
    /// Subscribes to identity changes right away, so construct the feed
    /// before restoring the session.
    pub fn new(
        services: Services,
        session: Arc<AuthSession>,
        navigator: Arc<dyn Navigator>,
        options: FeedOptions,
    ) -> Self {
        let identity_rx = session.subscribe();
        let (response_tx, response_rx) = unbounded();
        Self {
            services,
            session,
            navigator,
            controller: PaginationController::new(Tab::default(), options.page_size),
            sentinel: ScrollSentinel::new(),
            onboarding: OnboardingGate::new(),
            identity_rx,
            response_tx,
            response_rx,
            outstanding: 0,
            identity_epoch: 0,
            liked: HashMap::new(),
            pending_likes: HashSet::new(),
            comments: None,
            pending_comment: false,
        }
    }

    pub fn tab(&self) -> Tab {
        self.controller.tab()
    }

    pub fn posts(&self) -> &[Post] {
        self.controller.posts()
    }

    pub fn state(&self) -> FeedState {
        self.controller.state()
    }

    pub fn cursor(&self) -> u32 {
        self.controller.cursor()
    }

    pub fn has_more(&self) -> bool {
        self.controller.has_more()
    }

    pub fn identity(&self) -> &IdentityPhase {
        self.onboarding.phase()
    }

    /// Whether the signed-in user likes `post_id`, once known.
    pub fn is_liked(&self, post_id: i64) -> Option<bool> {
        self.liked.get(&post_id).copied()
    }

    pub fn comment_thread(&self) -> Option<&CommentThread> {
        self.comments.as_ref()
    }

    pub fn comment_thread_mut(&mut self) -> Option<&mut CommentThread> {
        self.comments.as_mut()
    }

    pub fn select_tab(&mut self, tab: Tab) {
        if let Some(request) = self.controller.activate(tab) {
            info!(%tab, "tab selected");
            self.spawn_page(request);
        }
        self.sync_sentinel();
    }

    /// The view rendered (or removed) the marker after the last card.
    pub fn marker_rendered(&mut self, marker: Option<MarkerId>) {
        self.sentinel.attach(marker);
    }

    /// Returns true when the visibility change started a page fetch.
    pub fn marker_visibility(&mut self, marker: MarkerId, visible: bool) -> bool {
        if !self.sentinel.observe(marker, visible) {
            return false;
        }
        let Some(request) = self.controller.request_next_page() else {
            return false;
        };
        self.spawn_page(request);
        self.sync_sentinel();
        true
    }

    /// Drains identity changes and finished work. Returns true if anything
    /// was applied.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Ok(event) = self.identity_rx.try_recv() {
            self.handle_identity(event);
            changed = true;
        }
        while let Ok(message) = self.response_rx.try_recv() {
            self.handle_async_response(message);
            changed = true;
        }
        if changed {
            self.sync_sentinel();
        }
        changed
    }

    /// Blocks until every outstanding result has been applied. Returns false
    /// if `timeout` ran out first.
    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        self.poll();
        while self.outstanding > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.response_rx.recv_timeout(remaining) {
                Ok(message) => {
                    self.handle_async_response(message);
                    self.poll();
                    self.sync_sentinel();
                }
                Err(_) => return false,
            }
        }
        true
    }

    /// Returns false when a toggle for the same post is already running.
    pub fn toggle_like(&mut self, post_id: i64) -> bool {
        if !self.pending_likes.insert(post_id) {
            return false;
        }
        let service = self.services.interactions.clone();
        let epoch = self.identity_epoch;
        self.spawn(move || AsyncResponse::Like {
            post_id,
            epoch,
            result: service.toggle_like(post_id),
        });
        true
    }

    pub fn open_comments(&mut self, post_id: i64) {
        self.comments = Some(CommentThread::new(post_id));
        self.pending_comment = false;

        let service = self.services.interactions.clone();
        self.spawn(move || AsyncResponse::Comments {
            post_id,
            result: service.load_comments(post_id),
        });

        if self.session.token().is_some() && !self.liked.contains_key(&post_id) {
            let service = self.services.interactions.clone();
            let epoch = self.identity_epoch;
            self.spawn(move || AsyncResponse::Liked {
                post_id,
                epoch,
                result: service.is_liked(post_id),
            });
        }
    }

    pub fn close_comments(&mut self) {
        self.comments = None;
        self.pending_comment = false;
    }

    /// Posts the open thread's draft. Returns false when nothing was sent.
    pub fn submit_comment(&mut self) -> bool {
        if self.pending_comment {
            return false;
        }
        let Some(thread) = self.comments.as_ref() else {
            return false;
        };
        let Some(content) = thread.pending_content() else {
            return false;
        };
        let post_id = thread.post_id();
        self.pending_comment = true;

        let service = self.services.interactions.clone();
        self.spawn(move || AsyncResponse::CommentAdded {
            post_id,
            result: service.add_comment(post_id, &content),
        });
        true
    }

    pub fn login(&self) -> Result<()> {
        self.session.login(self.navigator.as_ref())
    }

    pub fn logout(&mut self) -> Result<()> {
        self.session.logout()?;
        self.poll();
        Ok(())
    }

    fn handle_identity(&mut self, event: IdentityEvent) {
        debug!(origin = ?event.origin, signed_in = event.user.is_some(), "identity changed");
        self.identity_epoch += 1;
        if event.user.is_none() {
            self.liked.clear();
        }
        let Some(check) = self.onboarding.observe(event.user.as_ref()) else {
            return;
        };
        let members = self.services.members.clone();
        self.spawn(move || {
            let result = members.find_member(check.user_id());
            AsyncResponse::Member { check, result }
        });
    }

    fn handle_async_response(&mut self, message: AsyncResponse) {
        self.outstanding = self.outstanding.saturating_sub(1);
        match message {
            AsyncResponse::Page { request, result } => {
                match self.controller.complete(request, result) {
                    PageOutcome::Appended { added, has_more } => {
                        let query = request.query();
                        debug!(
                            tab = %query.tab,
                            page = query.page,
                            added,
                            has_more,
                            "page appended"
                        );
                    }
                    PageOutcome::Failed | PageOutcome::Stale => {}
                }
            }
            AsyncResponse::Member { check, result } => {
                let outcome = self
                    .onboarding
                    .resolve(&check, result, self.navigator.as_ref());
                debug!(user = check.user_id(), ?outcome, "onboarding check finished");
            }
            AsyncResponse::Like {
                post_id,
                epoch,
                result,
            } => {
                self.pending_likes.remove(&post_id);
                match result {
                    Ok(toggle) => {
                        // The server already counted it, whoever is signed in now.
                        if let Some(post) = self.controller.post_mut(post_id) {
                            interaction::apply_like(post, &toggle);
                        }
                        if epoch == self.identity_epoch {
                            self.liked.insert(post_id, toggle.liked);
                        } else {
                            debug!(post = post_id, "dropping like state from a previous identity");
                        }
                    }
                    Err(err) => warn!(post = post_id, "like toggle failed: {err}"),
                }
            }
            AsyncResponse::Liked {
                post_id,
                epoch,
                result,
            } => match result {
                Ok(_) if epoch != self.identity_epoch => {
                    debug!(post = post_id, "dropping like state from a previous identity");
                }
                Ok(liked) => {
                    self.liked.insert(post_id, liked);
                }
                Err(err) => debug!(post = post_id, "like state unavailable: {err}"),
            },
            AsyncResponse::Comments { post_id, result } => {
                match self.comments.as_mut() {
                    Some(thread) if thread.post_id() == post_id => thread.apply_loaded(result),
                    _ => debug!(post = post_id, "dropping comments for closed thread"),
                }
            }
            AsyncResponse::CommentAdded { post_id, result } => {
                let post = self.controller.post_mut(post_id);
                match self.comments.as_mut() {
                    Some(thread) if thread.post_id() == post_id => {
                        self.pending_comment = false;
                        thread.apply_submitted(result, post);
                    }
                    _ => {
                        if let (Ok(_), Some(post)) = (result, post) {
                            post.comments = Some(post.comments.unwrap_or(0) + 1);
                        }
                    }
                }
            }
        }
    }

    fn spawn_page(&mut self, request: PageRequest) {
        let service = self.services.feed.clone();
        self.spawn(move || AsyncResponse::Page {
            request,
            result: service.load_page(request.query()),
        });
    }

    fn spawn<F>(&mut self, job: F)
    where
        F: FnOnce() -> AsyncResponse + Send + 'static,
    {
        self.outstanding += 1;
        let tx = self.response_tx.clone();
        thread::spawn(move || {
            let _ = tx.send(job());
        });
    }

    fn sync_sentinel(&mut self) {
        self.sentinel
            .update(self.controller.is_loading(), self.controller.has_more());
    }
}

/// What the command line asked for.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub tab: Tab,
    pub pages: u32,
    pub redirect: Option<String>,
    pub register: Option<String>,
    pub login: bool,
    pub logout: bool,
    pub config_file: Option<PathBuf>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            tab: Tab::default(),
            pages: 1,
            redirect: None,
            register: None,
            login: false,
            logout: false,
            config_file: None,
        }
    }
}

pub fn run(opts: RunOptions) -> Result<()> {
    let cfg = config::load(config::LoadOptions {
        config_file: opts.config_file.clone(),
        env_prefix: None,
    })
    .context("load config")?;
    let config_path = opts.config_file.clone().or_else(config::default_path);
    if cfg.api.base_url.trim().is_empty() {
        bail!(
            "api.base_url is not configured; set it in {} or via BLOGFEED_API__BASE_URL",
            friendly_path(config_path.as_ref())
        );
    }

    let store = Arc::new(
        storage::Store::open(storage::Options {
            path: cfg.storage.path.clone(),
        })
        .context("open storage")?,
    );
    let transport: Arc<dyn Transport> = Arc::new(
        ReqwestTransport::new(TransportConfig {
            timeout: Some(cfg.api.timeout),
            ..TransportConfig::default()
        })
        .context("create http transport")?,
    );

    let location = opts
        .redirect
        .as_deref()
        .unwrap_or(&cfg.discord.redirect_uri);
    let location = Url::parse(location).with_context(|| format!("parse address {location}"))?;
    let navigator = Arc::new(BrowserNavigator::new(location));

    let session = Arc::new(
        AuthSession::new(store.clone(), transport.clone(), auth::Config::from(&cfg.discord))
            .context("create auth session")?,
    );
    let client = AuthenticatedClient::new(transport, session.clone(), navigator.clone());
    let api = Arc::new(ApiClient::new(&cfg.api.base_url, client).context("create api client")?);

    let services = Services::from_client(api);
    let mut feed = Feed::new(
        services.clone(),
        session.clone(),
        navigator.clone(),
        FeedOptions {
            page_size: cfg.api.page_size,
        },
    );

    session.restore().context("restore session")?;
    if opts.logout {
        feed.logout()?;
        println!("Signed out.");
        return Ok(());
    }
    if opts.login {
        feed.login()?;
        println!(
            "Continue in your browser, then run `blog-feed --redirect '<address>'` with the address you land on."
        );
        return Ok(());
    }
    if opts.redirect.is_some() {
        match session
            .complete_login_from_redirect(navigator.as_ref())
            .context("complete login")?
        {
            Some(user) => println!(
                "Signed in as {} ({}).",
                user.display_name(),
                session.avatar_url(&user)
            ),
            None => println!("No login found in that address; still signed out."),
        }
    }
    if let Some(url) = opts.register.as_deref() {
        let registration = BlogRegistration::new(services.members.clone(), navigator.clone());
        let user = session.current();
        if let Ok(Some(saved)) = registration.load(user.as_ref()) {
            println!("Currently registered: {saved}");
        }
        let platform = registration.submit(user.as_ref(), url)?;
        println!("Registered your {platform} blog.");
        return Ok(());
    }

    // Anything beyond the configured timeout per page is a stuck request.
    let wait = cfg.api.timeout + Duration::from_secs(1);
    let marker = MarkerId(1);
    feed.select_tab(opts.tab);
    feed.marker_rendered(Some(marker));
    loop {
        let cursor = feed.cursor();
        if !feed.wait_idle(wait) {
            warn!("timed out waiting for the feed");
            break;
        }
        if feed.cursor() == cursor || feed.cursor() >= opts.pages || !feed.has_more() {
            break;
        }
        if !feed.marker_visibility(marker, true) {
            break;
        }
    }
    feed.marker_rendered(None);

    if navigator.route() == auth::REGISTRATION_ROUTE {
        println!("Register your blog to finish signing up: blog-feed --register <blog url>\n");
    }
    print_cards(feed.tab(), feed.posts());
    Ok(())
}

fn print_cards(tab: Tab, posts: &[Post]) {
    if posts.is_empty() {
        println!("No posts in {tab}.");
        return;
    }
    let now = chrono::Utc::now();
    for post in posts {
        println!("{}", post.title);
        let mut meta = vec![
            format!("by {}", post.author),
            interaction::format_relative_time(&post.created_at, now),
        ];
        if let Some(likes) = post.likes {
            meta.push(format!("♥ {likes}"));
        }
        if let Some(comments) = post.comments {
            meta.push(format!("{comments} comments"));
        }
        println!("  {}", meta.join(" · "));

        let options = WrapOptions::new(CARD_WIDTH)
            .break_words(false)
            .initial_indent("  ")
            .subsequent_indent("  ");
        for line in wrap(post.body.trim(), options)
            .into_iter()
            .take(CARD_BODY_LINES)
        {
            println!("{line}");
        }
        if !post.external_url.is_empty() {
            println!("  {}", post.external_url);
        }
        println!();
    }
}

fn friendly_path(path: Option<&PathBuf>) -> String {
    if let Some(path) = path {
        if let Some(home) = dirs::home_dir() {
            if let Ok(stripped) = path.strip_prefix(&home) {
                let mut display = String::from("~");
                if !stripped.as_os_str().is_empty() {
                    display.push_str(&format!("/{}", stripped.display()));
                }
                return display;
            }
        }
        path.display().to_string()
    } else {
        "~/.config/blog-feed/config.yaml".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, FeedQuery};
    use crate::auth::REGISTRATION_ROUTE;
    use crate::data::{FeedService, InteractionService, MemberService};
    use crate::http::{Request, Response};
    use crate::storage::Store;
    use parking_lot::Mutex;

    const WAIT: Duration = Duration::from_secs(5);

    struct Pages {
        delay: HashMap<Tab, Duration>,
        last_page: u32,
        calls: Mutex<Vec<FeedQuery>>,
    }

    impl Pages {
        fn new(last_page: u32) -> Self {
            Self {
                delay: HashMap::new(),
                last_page,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl FeedService for Pages {
        fn load_page(&self, query: FeedQuery) -> ApiResult<FeedPage> {
            self.calls.lock().push(query);
            if let Some(delay) = self.delay.get(&query.tab) {
                thread::sleep(*delay);
            }
            let base = match query.tab {
                Tab::Trending => 0,
                Tab::Curated => 1000,
                Tab::Recent => 2000,
                Tab::Feed => 3000,
            } + i64::from(query.page) * 10;
            Ok(FeedPage {
                items: (base..base + 2).map(post).collect(),
                is_last_page: query.page >= self.last_page,
            })
        }
    }

    struct Members {
        registered: bool,
    }

    impl MemberService for Members {
        fn find_member(&self, discord_id: &str) -> ApiResult<Option<Member>> {
            Ok(self.registered.then(|| Member {
                discord_id: Some(discord_id.to_string()),
                blog_url: "https://velog.io/@alice".into(),
            }))
        }

        fn register_member(&self, _discord_id: &str, _blog_url: &str) -> ApiResult<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct Interactions {
        reject: bool,
    }

    impl InteractionService for Interactions {
        fn toggle_like(&self, _post_id: i64) -> ApiResult<LikeToggle> {
            if self.reject {
                return Err(ApiError::Unauthorized);
            }
            Ok(LikeToggle {
                liked: true,
                like_count: None,
            })
        }

        fn is_liked(&self, _post_id: i64) -> ApiResult<bool> {
            Ok(true)
        }

        fn load_comments(&self, _post_id: i64) -> ApiResult<Vec<Comment>> {
            Ok(Vec::new())
        }

        fn add_comment(&self, post_id: i64, content: &str) -> ApiResult<Comment> {
            Ok(Comment {
                id: post_id * 100,
                author: "alice".into(),
                author_avatar: String::new(),
                content: content.to_string(),
                created_at: String::new(),
            })
        }
    }

    struct Identity;

    impl Transport for Identity {
        fn send(&self, _request: &Request) -> Result<Response> {
            Ok(Response::new(
                200,
                r#"{"id":"42","username":"alice","global_name":null,"avatar":null}"#,
            ))
        }
    }

    struct Routes {
        location: Mutex<Url>,
        routes: Mutex<Vec<String>>,
    }

    impl Navigator for Routes {
        fn location(&self) -> Url {
            self.location.lock().clone()
        }
        fn replace_location(&self, url: Url) {
            *self.location.lock() = url;
        }
        fn redirect(&self, _url: &str) {}
        fn navigate(&self, route: &str) {
            self.routes.lock().push(route.to_string());
        }
    }

    fn post(id: i64) -> Post {
        Post {
            id,
            title: format!("post {id}"),
            body: String::new(),
            thumbnail: None,
            author: "alice".into(),
            author_avatar: String::new(),
            external_url: String::new(),
            created_at: String::new(),
            likes: Some(1),
            comments: Some(0),
        }
    }

    struct Harness {
        feed: Feed,
        session: Arc<AuthSession>,
        navigator: Arc<Routes>,
        pages: Arc<Pages>,
    }

    fn harness(pages: Pages, registered: bool, interactions: Interactions) -> Harness {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let session = Arc::new(
            AuthSession::new(store, Arc::new(Identity), auth::Config::default()).unwrap(),
        );
        let navigator = Arc::new(Routes {
            location: Mutex::new(
                Url::parse("http://localhost:5173/#access_token=tok&token_type=Bearer").unwrap(),
            ),
            routes: Mutex::new(Vec::new()),
        });
        let pages = Arc::new(pages);
        let services = Services {
            feed: pages.clone(),
            members: Arc::new(Members { registered }),
            interactions: Arc::new(interactions),
        };
        let feed = Feed::new(
            services,
            session.clone(),
            navigator.clone(),
            FeedOptions { page_size: 2 },
        );
        Harness {
            feed,
            session,
            navigator,
            pages,
        }
    }

    fn ids(feed: &Feed) -> Vec<i64> {
        feed.posts().iter().map(|p| p.id).collect()
    }

    #[test]
    fn sentinel_drives_pagination() {
        let Harness {
            mut feed,
            pages,
            ..
        } = harness(Pages::new(1), true, Interactions::default());
        let marker = MarkerId(7);
        feed.marker_rendered(Some(marker));
        feed.select_tab(Tab::Trending);
        // Nothing is bound while the first page is loading.
        assert!(!feed.marker_visibility(marker, true));
        assert!(feed.wait_idle(WAIT));
        assert_eq!(ids(&feed), vec![0, 1]);

        assert!(feed.marker_visibility(marker, true));
        assert!(feed.wait_idle(WAIT));
        assert_eq!(ids(&feed), vec![0, 1, 10, 11]);
        assert_eq!(feed.state(), FeedState::Exhausted);
        assert!(!feed.marker_visibility(marker, true));
        assert_eq!(pages.calls.lock().len(), 2);
    }

    #[test]
    fn tab_switch_drops_slow_response() {
        let mut slow = Pages::new(5);
        slow.delay.insert(Tab::Trending, Duration::from_millis(150));
        let Harness { mut feed, .. } = harness(slow, true, Interactions::default());

        feed.select_tab(Tab::Trending);
        feed.select_tab(Tab::Curated);
        assert!(feed.wait_idle(WAIT));
        assert_eq!(feed.tab(), Tab::Curated);
        assert_eq!(ids(&feed), vec![1000, 1001]);
        assert_eq!(feed.cursor(), 1);
    }

    #[test]
    fn redirect_login_without_blog_starts_onboarding() {
        let Harness {
            mut feed,
            session,
            navigator,
            ..
        } = harness(Pages::new(0), false, Interactions::default());
        session.restore().unwrap();
        session
            .complete_login_from_redirect(navigator.as_ref())
            .unwrap();
        assert!(feed.wait_idle(WAIT));
        assert_eq!(feed.identity(), &IdentityPhase::Present("42".into()));
        assert_eq!(*navigator.routes.lock(), vec![REGISTRATION_ROUTE.to_string()]);
        assert_eq!(navigator.location().fragment(), None);
    }

    #[test]
    fn restored_session_skips_onboarding() {
        let Harness {
            mut feed,
            session,
            navigator,
            ..
        } = harness(Pages::new(0), false, Interactions::default());
        session
            .complete_login_from_redirect(navigator.as_ref())
            .unwrap();
        assert!(feed.wait_idle(WAIT));
        // The first publish came from Unknown, not from a signed-out state.
        assert!(navigator.routes.lock().is_empty());
    }

    #[test]
    fn like_updates_card_once_confirmed() {
        let Harness { mut feed, .. } = harness(Pages::new(0), true, Interactions::default());
        feed.select_tab(Tab::Recent);
        assert!(feed.wait_idle(WAIT));

        assert!(feed.toggle_like(2000));
        assert!(!feed.toggle_like(2000));
        assert!(feed.wait_idle(WAIT));
        assert_eq!(feed.posts()[0].likes, Some(2));
        assert_eq!(feed.is_liked(2000), Some(true));
    }

    #[test]
    fn rejected_like_changes_nothing() {
        let Harness { mut feed, .. } = harness(
            Pages::new(0),
            true,
            Interactions { reject: true },
        );
        feed.select_tab(Tab::Recent);
        assert!(feed.wait_idle(WAIT));
        feed.toggle_like(2000);
        assert!(feed.wait_idle(WAIT));
        assert_eq!(feed.posts()[0].likes, Some(1));
        assert_eq!(feed.is_liked(2000), None);
    }

    #[test]
    fn comment_submission_bumps_counter() {
        let Harness { mut feed, .. } = harness(Pages::new(0), true, Interactions::default());
        feed.select_tab(Tab::Feed);
        assert!(feed.wait_idle(WAIT));

        feed.open_comments(3001);
        assert!(feed.wait_idle(WAIT));
        assert!(feed.comment_thread().unwrap().is_loaded());

        feed.comment_thread_mut().unwrap().draft = "   ".into();
        assert!(!feed.submit_comment());

        feed.comment_thread_mut().unwrap().draft = "great read".into();
        assert!(feed.submit_comment());
        assert!(feed.wait_idle(WAIT));

        let thread = feed.comment_thread().unwrap();
        assert_eq!(thread.comments().len(), 1);
        assert!(thread.draft.is_empty());
        assert_eq!(feed.posts()[1].comments, Some(1));
    }

    #[test]
    fn logout_forgets_like_state() {
        let Harness {
            mut feed,
            session,
            navigator,
            ..
        } = harness(Pages::new(0), true, Interactions::default());
        session.restore().unwrap();
        session
            .complete_login_from_redirect(navigator.as_ref())
            .unwrap();
        feed.select_tab(Tab::Trending);
        assert!(feed.wait_idle(WAIT));
        feed.open_comments(0);
        assert!(feed.wait_idle(WAIT));
        assert_eq!(feed.is_liked(0), Some(true));

        feed.logout().unwrap();
        assert_eq!(feed.identity(), &IdentityPhase::Absent);
        assert_eq!(feed.is_liked(0), None);
    }

    fn signed_in_feed() -> Harness {
        let harness = harness(Pages::new(0), true, Interactions::default());
        harness.session.restore().unwrap();
        harness
            .session
            .complete_login_from_redirect(harness.navigator.as_ref())
            .unwrap();
        harness
    }

    #[test]
    fn like_state_answered_after_sign_out_is_dropped() {
        let Harness {
            mut feed,
            session,
            ..
        } = signed_in_feed();
        feed.select_tab(Tab::Trending);
        assert!(feed.wait_idle(WAIT));

        feed.open_comments(0);
        // Let the workers answer before the sign-out is published.
        thread::sleep(Duration::from_millis(100));
        session.logout().unwrap();
        assert!(feed.wait_idle(WAIT));

        assert_eq!(feed.identity(), &IdentityPhase::Absent);
        assert_eq!(feed.is_liked(0), None);
    }

    #[test]
    fn toggle_answered_after_sign_out_keeps_count_only() {
        let Harness {
            mut feed,
            session,
            ..
        } = signed_in_feed();
        feed.select_tab(Tab::Trending);
        assert!(feed.wait_idle(WAIT));

        assert!(feed.toggle_like(1));
        thread::sleep(Duration::from_millis(100));
        session.logout().unwrap();
        assert!(feed.wait_idle(WAIT));

        assert_eq!(feed.posts()[1].likes, Some(2));
        assert_eq!(feed.is_liked(1), None);
        // The toggle is no longer pending.
        assert!(feed.toggle_like(1));
    }

    #[test]
    fn friendly_path_uses_tilde() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        let path = home.join(".config/blog-feed/config.yaml");
        assert_eq!(friendly_path(Some(&path)), "~/.config/blog-feed/config.yaml");
        assert_eq!(friendly_path(None), "~/.config/blog-feed/config.yaml");
    }
}
