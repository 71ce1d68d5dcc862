use std::sync::Arc;

use anyhow::Result;
use reqwest::header::AUTHORIZATION;
use tracing::warn;

use crate::auth::{AuthSession, Navigator};
use crate::http::{Request, Response, Transport};

/// Sends requests on behalf of the signed-in user.
///
/// A bearer header is attached whenever the session holds a token. A 401
/// answer ends the session and sends the user back through the provider's
/// login page; the 401 response is still handed back to the caller.
/// [`AuthenticatedClient::send_quiet`] is for reads that only personalise a
/// view and must not sign anybody out.
#[derive(Clone)]
pub struct AuthenticatedClient {
    transport: Arc<dyn Transport>,
    session: Arc<AuthSession>,
    navigator: Arc<dyn Navigator>,
}

impl AuthenticatedClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        session: Arc<AuthSession>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            transport,
            session,
            navigator,
        }
    }

    pub fn send(&self, request: Request) -> Result<Response> {
        let request = self.authorize(request);
        let resp = self.transport.send(&request)?;
        if resp.is_unauthorized() {
            self.force_login(&request);
        }
        Ok(resp)
    }

    /// Attaches the bearer header but leaves a 401 to the caller.
    pub fn send_quiet(&self, request: Request) -> Result<Response> {
        self.transport.send(&self.authorize(request))
    }

    /// Skips the session entirely.
    pub fn send_anonymous(&self, request: Request) -> Result<Response> {
        self.transport.send(&request)
    }

    fn authorize(&self, request: Request) -> Request {
        match self.session.token() {
            Some(token) => request.header(AUTHORIZATION.as_str(), format!("Bearer {token}")),
            None => request,
        }
    }

    fn force_login(&self, request: &Request) {
        warn!(url = %request.url, "unauthorized, redirecting to login");
        if let Err(err) = self.session.invalidate() {
            warn!("failed to clear session: {err:#}");
        }
        if let Err(err) = self.session.login(self.navigator.as_ref()) {
            warn!("cannot redirect to login: {err:#}");
        }
    }
}
