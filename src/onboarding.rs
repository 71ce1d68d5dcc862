use tracing::{info, warn};

use crate::api::{ApiResult, Member};
use crate::auth::{Navigator, User, REGISTRATION_ROUTE};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum IdentityPhase {
    /// Nothing published yet (startup).
    #[default]
    Unknown,
    Absent,
    Present(String),
}

impl IdentityPhase {
    fn of(user: Option<&User>) -> Self {
        match user {
            Some(user) => IdentityPhase::Present(user.id.clone()),
            None => IdentityPhase::Absent,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityTransition {
    pub previous: IdentityPhase,
    pub current: IdentityPhase,
}

impl IdentityTransition {
    /// Signed out to signed in. Restoring a saved session at startup comes
    /// from `Unknown` and does not count.
    pub fn is_login(&self) -> bool {
        matches!(
            (&self.previous, &self.current),
            (IdentityPhase::Absent, IdentityPhase::Present(_))
        )
    }
}

/// A pending profile lookup for one login transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnboardingCheck {
    user_id: String,
    transition: u64,
}

impl OnboardingCheck {
    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnboardingOutcome {
    Registered,
    Redirected,
    /// The identity changed before the lookup came back.
    Superseded,
}

/// Sends a freshly signed-in user without a registered blog to the
/// registration view, once per login.
#[derive(Debug, Default)]
pub struct OnboardingGate {
    phase: IdentityPhase,
    transitions: u64,
    pending: Option<OnboardingCheck>,
}

impl OnboardingGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> &IdentityPhase {
        &self.phase
    }

    /// Records one identity publish. Returns the profile lookup to run when
    /// the publish is a login.
    pub fn observe(&mut self, user: Option<&User>) -> Option<OnboardingCheck> {
        let transition = IdentityTransition {
            previous: self.phase.clone(),
            current: IdentityPhase::of(user),
        };
        self.phase = transition.current.clone();
        self.transitions += 1;

        if !matches!(transition.current, IdentityPhase::Present(_)) {
            self.pending = None;
        }
        if !transition.is_login() {
            return None;
        }
        let IdentityPhase::Present(user_id) = transition.current else {
            return None;
        };
        let check = OnboardingCheck {
            user_id,
            transition: self.transitions,
        };
        self.pending = Some(check.clone());
        Some(check)
    }

    /// Applies the lookup result. A failed lookup counts as "no profile".
    pub fn resolve(
        &mut self,
        check: &OnboardingCheck,
        result: ApiResult<Option<Member>>,
        navigator: &dyn Navigator,
    ) -> OnboardingOutcome {
        if self.pending.as_ref() != Some(check) {
            return OnboardingOutcome::Superseded;
        }
        self.pending = None;

        let member = match result {
            Ok(member) => member,
            Err(err) => {
                warn!(user = %check.user_id, "member lookup failed: {err}");
                None
            }
        };
        match member {
            Some(_) => OnboardingOutcome::Registered,
            None => {
                info!(user = %check.user_id, "no registered blog, starting onboarding");
                navigator.navigate(REGISTRATION_ROUTE);
                OnboardingOutcome::Redirected
            }
        }
    }
}
