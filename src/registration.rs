use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, warn};

use crate::auth::{Navigator, User, HOME_ROUTE};
use crate::data::MemberService;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlogPlatform {
    Velog,
    Medium,
    DevTo,
    Tistory,
    GithubPages,
}

impl BlogPlatform {
    pub fn label(&self) -> &'static str {
        match self {
            BlogPlatform::Velog => "Velog",
            BlogPlatform::Medium => "Medium",
            BlogPlatform::DevTo => "DEV.to",
            BlogPlatform::Tistory => "Tistory",
            BlogPlatform::GithubPages => "GitHub Pages",
        }
    }
}

impl fmt::Display for BlogPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

static PLATFORM_PATTERNS: Lazy<Vec<(BlogPlatform, Regex)>> = Lazy::new(|| {
    [
        (BlogPlatform::Velog, r"^https?://velog\.io/@[\w.-]+/?"),
        (BlogPlatform::Medium, r"^https?://(www\.)?medium\.com/@?[\w.-]+/?"),
        (BlogPlatform::DevTo, r"^https?://(www\.)?dev\.to/[\w.-]+/?"),
        (BlogPlatform::Tistory, r"^https?://[\w.-]+\.tistory\.com/?"),
        (
            BlogPlatform::GithubPages,
            r"^https?://[\w.-]+\.github\.io(/[\w.-]+)?/?",
        ),
    ]
    .into_iter()
    .map(|(platform, pattern)| (platform, Regex::new(pattern).expect("valid platform regex")))
    .collect()
});

pub fn detect_platform(url: &str) -> Option<BlogPlatform> {
    PLATFORM_PATTERNS
        .iter()
        .find(|(_, re)| re.is_match(url))
        .map(|(platform, _)| *platform)
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("sign in before registering a blog")]
    SignedOut,
    #[error("enter your blog URL")]
    Empty,
    #[error("unsupported blog platform; Medium, Velog, DEV.to, Tistory and GitHub Pages are supported")]
    UnsupportedPlatform,
    #[error("saving failed, please try again")]
    SaveFailed,
}

/// The "register your blog" view.
pub struct BlogRegistration {
    members: Arc<dyn MemberService>,
    navigator: Arc<dyn Navigator>,
}

impl BlogRegistration {
    pub fn new(members: Arc<dyn MemberService>, navigator: Arc<dyn Navigator>) -> Self {
        Self { members, navigator }
    }

    /// The blog URL already on file, used to pre-fill the form.
    pub fn load(&self, user: Option<&User>) -> Result<Option<String>, RegistrationError> {
        let user = self.require(user)?;
        match self.members.find_member(&user.id) {
            Ok(member) => Ok(member.map(|m| m.blog_url)),
            Err(err) => {
                warn!(user = %user.id, "could not load saved blog: {err}");
                Ok(None)
            }
        }
    }

    pub fn submit(
        &self,
        user: Option<&User>,
        input: &str,
    ) -> Result<BlogPlatform, RegistrationError> {
        let user = self.require(user)?;
        let url = input.trim();
        if url.is_empty() {
            return Err(RegistrationError::Empty);
        }
        let platform = detect_platform(url).ok_or(RegistrationError::UnsupportedPlatform)?;

        if let Err(err) = self.members.register_member(&user.id, url) {
            warn!(user = %user.id, "blog registration failed: {err}");
            return Err(RegistrationError::SaveFailed);
        }
        info!(user = %user.id, %platform, "blog registered");
        self.navigator.navigate(HOME_ROUTE);
        Ok(platform)
    }

    fn require<'a>(&self, user: Option<&'a User>) -> Result<&'a User, RegistrationError> {
        match user {
            Some(user) => Ok(user),
            None => {
                self.navigator.navigate(HOME_ROUTE);
                Err(RegistrationError::SignedOut)
            }
        }
    }
}
