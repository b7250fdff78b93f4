//! Wiring for a complete session runtime.

use crate::bootstrap::{BootstrapOutcome, SessionBootstrapper};
use crate::client::ApiClient;
use crate::cookies::CookieInspector;
use crate::csrf::CsrfTokenCache;
use crate::effects::{Navigator, Notifier};
use crate::session::SessionManager;
use crate::state::SessionState;
use crate::transport::{HttpTransport, ReqwestTransport};
use crate::AuthResult;
use counsel_config::Config;
use reqwest::cookie::{CookieStore, Jar};
use std::sync::Arc;
use tracing::info;

/// Owns one instance of every session component.
///
/// Clones share the same components.
#[derive(Clone)]
pub struct AuthRuntime {
    cookies: Arc<CookieInspector>,
    csrf: Arc<CsrfTokenCache>,
    state: Arc<SessionState>,
    client: Arc<ApiClient>,
    session: Arc<SessionManager>,
    bootstrapper: Arc<SessionBootstrapper>,
}

impl AuthRuntime {
    /// Build a runtime that talks to the configured API over HTTP.
    pub fn connect(
        config: &Config,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> AuthResult<Self> {
        Self::connect_with_cookies(config, Arc::new(Jar::default()), notifier, navigator)
    }

    /// Like [`connect`](Self::connect), keeping cookies in `cookie_store`.
    ///
    /// Lets the embedder persist the session between runs.
    pub fn connect_with_cookies<C>(
        config: &Config,
        cookie_store: Arc<C>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> AuthResult<Self>
    where
        C: CookieStore + 'static,
    {
        config.validate()?;
        let base_url = config.api_base_url()?;

        let transport = ReqwestTransport::new(
            &base_url,
            config.request_timeout(),
            Arc::clone(&cookie_store),
        )?;

        info!(api = %base_url, "Connecting session runtime");
        Self::with_transport(config, Arc::new(transport), cookie_store, notifier, navigator)
    }

    /// Build a runtime over any transport and cookie store.
    ///
    /// The transport must store response cookies in `cookie_store`.
    pub fn with_transport(
        config: &Config,
        transport: Arc<dyn HttpTransport>,
        cookie_store: Arc<dyn CookieStore>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> AuthResult<Self> {
        let cookies = Arc::new(CookieInspector::new(
            cookie_store,
            config.api_base_url()?,
            config.session_cookie_name.clone(),
            config.csrf_cookie_name.clone(),
        ));
        let csrf = Arc::new(CsrfTokenCache::new(
            Arc::clone(&cookies),
            Arc::clone(&transport),
        ));
        let state = Arc::new(SessionState::new());
        let client = Arc::new(ApiClient::new(
            transport,
            Arc::clone(&csrf),
            Arc::clone(&state),
            notifier,
            navigator,
            config.auth_path_prefix.clone(),
        ));
        let session = Arc::new(SessionManager::new(
            Arc::clone(&client),
            Arc::clone(&state),
            Arc::clone(&cookies),
            Arc::clone(&csrf),
        ));
        let bootstrapper = Arc::new(SessionBootstrapper::new(
            Arc::clone(&session),
            config.login_grace_period(),
        ));

        Ok(Self {
            cookies,
            csrf,
            state,
            client,
            session,
            bootstrapper,
        })
    }

    /// Run the startup session check.
    pub async fn bootstrap(&self) -> BootstrapOutcome {
        self.bootstrapper.run().await
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    pub fn state(&self) -> &Arc<SessionState> {
        &self.state
    }

    pub fn csrf(&self) -> &Arc<CsrfTokenCache> {
        &self.csrf
    }

    pub fn cookies(&self) -> &Arc<CookieInspector> {
        &self.cookies
    }

    pub fn bootstrapper(&self) -> &Arc<SessionBootstrapper> {
        &self.bootstrapper
    }
}

impl std::fmt::Debug for AuthRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthRuntime")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
