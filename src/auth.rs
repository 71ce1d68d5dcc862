use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::DiscordConfig;
use crate::http::{Request, Transport};
use crate::storage::Store;

/// Route the onboarding flow sends newly signed-in users to.
pub const REGISTRATION_ROUTE: &str = "/blog-url";
pub const HOME_ROUTE: &str = "/";

const DEFAULT_AVATAR_COUNT: u32 = 6;
const DEFAULT_AVATAR_SHIFT: u32 = 22;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("discord client id is not configured")]
    MissingClientId,
    #[error("identity request failed with status {0}")]
    IdentityRejected(u16),
    #[error("identity response has no user id")]
    MissingUserId,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub client_id: String,
    pub redirect_uri: String,
    pub authorize_url: String,
    pub identity_url: String,
    pub cdn_url: String,
    pub scope: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self::from(&DiscordConfig::default())
    }
}

impl From<&DiscordConfig> for Config {
    fn from(cfg: &DiscordConfig) -> Self {
        Self {
            client_id: cfg.client_id.clone(),
            redirect_uri: cfg.redirect_uri.clone(),
            authorize_url: cfg.authorize_url.clone(),
            identity_url: cfg.identity_url.clone(),
            cdn_url: cfg.cdn_url.clone(),
            scope: cfg.scopes.clone(),
        }
    }
}

/// Identity as returned by the provider's "who am I" endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub global_name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

impl User {
    pub fn display_name(&self) -> &str {
        match self.global_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.username,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityOrigin {
    Restore,
    Login,
    Logout,
    Invalidated,
}

/// One publish of the current identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityEvent {
    pub origin: IdentityOrigin,
    pub user: Option<User>,
}

/// Address bar and router of whatever hosts the feed.
pub trait Navigator: Send + Sync {
    fn location(&self) -> Url;
    /// Rewrites the visible address without navigating.
    fn replace_location(&self, url: Url);
    /// Leaves the application for `url`.
    fn redirect(&self, url: &str);
    /// Client-side route change.
    fn navigate(&self, route: &str);
}

/// Navigator for the terminal: redirects open the system browser and routes
/// are only recorded.
pub struct BrowserNavigator {
    location: Mutex<Url>,
    route: Mutex<String>,
}

impl BrowserNavigator {
    pub fn new(location: Url) -> Self {
        Self {
            location: Mutex::new(location),
            route: Mutex::new(HOME_ROUTE.to_string()),
        }
    }

    pub fn route(&self) -> String {
        self.route.lock().clone()
    }
}

impl Navigator for BrowserNavigator {
    fn location(&self) -> Url {
        self.location.lock().clone()
    }

    fn replace_location(&self, url: Url) {
        *self.location.lock() = url;
    }

    fn redirect(&self, url: &str) {
        if let Err(err) = webbrowser::open(url) {
            warn!("could not open browser ({err}); visit {url} to continue");
        }
    }

    fn navigate(&self, route: &str) {
        debug!(route, "navigate");
        *self.route.lock() = route.to_string();
    }
}

/// Owns the OAuth token and the published identity.
pub struct AuthSession {
    cfg: Config,
    store: Arc<Store>,
    transport: Arc<dyn Transport>,
    token: RwLock<Option<String>>,
    user: RwLock<Option<User>>,
    subscribers: Mutex<Vec<Sender<IdentityEvent>>>,
    redirect_checked: AtomicBool,
}

impl AuthSession {
    pub fn new(store: Arc<Store>, transport: Arc<dyn Transport>, cfg: Config) -> Result<Self> {
        if cfg.authorize_url.trim().is_empty() {
            bail!("auth: authorize url is required");
        }
        if cfg.identity_url.trim().is_empty() {
            bail!("auth: identity url is required");
        }
        Ok(Self {
            cfg,
            store,
            transport,
            token: RwLock::new(None),
            user: RwLock::new(None),
            subscribers: Mutex::new(Vec::new()),
            redirect_checked: AtomicBool::new(false),
        })
    }

    pub fn subscribe(&self) -> Receiver<IdentityEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    pub fn current(&self) -> Option<User> {
        self.user.read().clone()
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    /// Loads the persisted session without asking the provider whether the
    /// token is still good.
    pub fn restore(&self) -> Result<Option<User>> {
        let stored = self.store.read_session().context("auth: read session")?;
        let restored = match stored {
            Some(stored) => match serde_json::from_str::<User>(&stored.user_json) {
                Ok(user) => {
                    *self.token.write() = Some(stored.token);
                    Some(user)
                }
                Err(err) => {
                    warn!("discarding unreadable stored identity: {err}");
                    self.store.clear_session()?;
                    None
                }
            },
            None => None,
        };
        if let Some(user) = &restored {
            info!(user = %user.id, "restored session");
        }
        self.publish(IdentityOrigin::Restore, restored.clone());
        Ok(restored)
    }

    /// Finishes an implicit-flow login if the address carries an access
    /// token. Only the first call looks at the address.
    pub fn complete_login_from_redirect(&self, navigator: &dyn Navigator) -> Result<Option<User>> {
        if self.redirect_checked.swap(true, Ordering::SeqCst) {
            return Ok(None);
        }

        let mut location = navigator.location();
        let Some(token) = location.fragment().and_then(token_from_fragment) else {
            return Ok(None);
        };

        location.set_fragment(None);
        navigator.replace_location(location);

        let user = match self.fetch_identity(&token) {
            Ok(user) => user,
            Err(err) => {
                warn!("identity lookup failed, staying signed out: {err:#}");
                return Ok(None);
            }
        };

        let user_json = serde_json::to_string(&user).context("auth: encode identity")?;
        self.store
            .write_session(&token, &user_json)
            .context("auth: persist session")?;
        *self.token.write() = Some(token);
        info!(user = %user.id, "signed in");
        self.publish(IdentityOrigin::Login, Some(user.clone()));
        Ok(Some(user))
    }

    pub fn login_url(&self) -> Result<String> {
        let mut auth = Url::parse(&self.cfg.authorize_url).context("auth: parse authorize url")?;
        auth.query_pairs_mut()
            .append_pair("client_id", &self.cfg.client_id)
            .append_pair("redirect_uri", &self.cfg.redirect_uri)
            .append_pair("response_type", "token")
            .append_pair("scope", &self.cfg.scope.join(" "));
        Ok(auth.to_string())
    }

    pub fn login(&self, navigator: &dyn Navigator) -> Result<()> {
        if self.cfg.client_id.trim().is_empty() {
            bail!(SessionError::MissingClientId);
        }
        let url = self.login_url()?;
        navigator.redirect(&url);
        Ok(())
    }

    pub fn logout(&self) -> Result<()> {
        self.store.clear_session().context("auth: clear session")?;
        *self.token.write() = None;
        info!("signed out");
        self.publish(IdentityOrigin::Logout, None);
        Ok(())
    }

    /// Drops a session the server rejected.
    pub fn invalidate(&self) -> Result<()> {
        self.store.clear_session().context("auth: clear session")?;
        *self.token.write() = None;
        warn!("session rejected by server, signing out");
        self.publish(IdentityOrigin::Invalidated, None);
        Ok(())
    }

    pub fn avatar_url(&self, user: &User) -> String {
        avatar_url(&self.cfg.cdn_url, user)
    }

    fn fetch_identity(&self, token: &str) -> Result<User> {
        let request = Request::get(&self.cfg.identity_url)
            .header(AUTHORIZATION.as_str(), format!("Bearer {token}"));
        let resp = self
            .transport
            .send(&request)
            .context("auth: identity request")?;
        if !resp.is_success() {
            bail!(SessionError::IdentityRejected(resp.status));
        }
        let user: User = resp.json().context("auth: decode identity")?;
        if user.id.is_empty() {
            bail!(SessionError::MissingUserId);
        }
        Ok(user)
    }

    fn publish(&self, origin: IdentityOrigin, user: Option<User>) {
        *self.user.write() = user.clone();
        let event = IdentityEvent { origin, user };
        self.subscribers
            .lock()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }
}

fn token_from_fragment(fragment: &str) -> Option<String> {
    url::form_urlencoded::parse(fragment.as_bytes())
        .find(|(key, _)| key == "access_token")
        .map(|(_, value)| value.into_owned())
        .filter(|token| !token.is_empty())
}

pub fn avatar_url(cdn_url: &str, user: &User) -> String {
    let base = cdn_url.trim_end_matches('/');
    match user.avatar.as_deref() {
        Some(hash) if !hash.is_empty() => {
            format!("{base}/avatars/{}/{hash}.png?size=64", user.id)
        }
        _ => {
            let index = default_avatar_index(&user.id).unwrap_or(0);
            format!("{base}/embed/avatars/{index}.png")
        }
    }
}

/// `(id >> 22) % 6` over the full decimal id, whatever its width.
pub fn default_avatar_index(id: &str) -> Option<u32> {
    let id = id.trim();
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let divisor: u64 = 1 << DEFAULT_AVATAR_SHIFT;
    let modulus = u64::from(DEFAULT_AVATAR_COUNT);
    let mut remainder: u64 = 0;
    let mut quotient_mod: u64 = 0;
    for digit in id.bytes().map(|b| u64::from(b - b'0')) {
        let current = remainder * 10 + digit;
        quotient_mod = (quotient_mod * 10 + current / divisor) % modulus;
        remainder = current % divisor;
    }
    Some(quotient_mod as u32)
}
