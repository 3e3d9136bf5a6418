//! Application state and initialization
//!
//! `AppContext` lives for the whole process and owns the store, the index and
//! the login service. A `SessionContext` is built when a user signs in and
//! dropped at logout; it holds everything that needs the user's identity.

use crate::config::{ClientConfig, OtpMode, SearchStrategy};
use crate::database::{create_pool, SqliteStore};
use crate::error::Result;
use crate::models::UserSession;
use crate::remote::{DocumentApi, HttpDocumentApi, OtpGateway, StaticOtpGateway};
use crate::services::{
    AuthService, DocumentIndex, DownloadService, LocalBackend, RemoteBackend, SearchBackend,
    SearchSession, TagService, UploadService,
};
use crate::storage::{FileCache, PersistedStore};
use std::sync::Arc;

/// Builds the remote API for an optional session token
pub type ApiConnector = Arc<dyn Fn(Option<&str>) -> Arc<dyn DocumentApi> + Send + Sync>;

/// Process-wide state
#[derive(Clone)]
pub struct AppContext {
    config: ClientConfig,
    store: Arc<dyn PersistedStore>,
    index: DocumentIndex,
    auth: AuthService,
    connect: ApiConnector,
    cache: FileCache,
}

impl AppContext {
    /// Open the database and file cache under the configured data directory
    pub async fn bootstrap(config: ClientConfig) -> Result<Self> {
        tracing::info!("Initializing docvault");
        tracing::info!("Data directory: {:?}", config.data_dir);

        tokio::fs::create_dir_all(&config.data_dir).await?;

        let pool = create_pool(&config.database_path()).await?;
        let store: Arc<dyn PersistedStore> = Arc::new(SqliteStore::new(pool));

        let cache = FileCache::new(config.file_cache_dir());
        cache.initialize().await?;

        let http = HttpDocumentApi::new(&config.api_url, config.request_timeout)?;
        let gateway: Arc<dyn OtpGateway> = match config.otp_mode {
            OtpMode::Static => Arc::new(StaticOtpGateway::default()),
            OtpMode::Remote => Arc::new(http.clone()),
        };
        let connect: ApiConnector = Arc::new(move |token: Option<&str>| -> Arc<dyn DocumentApi> {
            match token {
                Some(token) => Arc::new(http.with_token(token)),
                None => Arc::new(http.clone()),
            }
        });

        tracing::info!("docvault initialized successfully");

        Ok(Self::new(config, store, gateway, connect, cache))
    }

    /// Assemble from explicit collaborators
    pub fn new(
        config: ClientConfig,
        store: Arc<dyn PersistedStore>,
        gateway: Arc<dyn OtpGateway>,
        connect: ApiConnector,
        cache: FileCache,
    ) -> Self {
        Self {
            index: DocumentIndex::new(store.clone()),
            auth: AuthService::new(store.clone(), gateway),
            config,
            store,
            connect,
            cache,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    pub fn index(&self) -> &DocumentIndex {
        &self.index
    }

    pub fn store(&self) -> Arc<dyn PersistedStore> {
        self.store.clone()
    }

    /// Resume the saved session, as the splash screen does
    pub async fn restore_session(&self) -> Option<SessionContext> {
        let user = self.auth.restore_session().await?;
        Some(self.open_session(user))
    }

    pub async fn login(&self, mobile_number: &str, otp: &str) -> Result<SessionContext> {
        let user = self.auth.verify_otp(mobile_number, otp).await?;
        Ok(self.open_session(user))
    }

    /// End the session and wipe local data
    pub async fn logout(&self, session: SessionContext) -> Result<()> {
        tracing::info!("Closing session for {}", session.user.user_id);
        drop(session);
        self.auth.logout().await
    }

    pub fn open_session(&self, user: UserSession) -> SessionContext {
        let api = (self.connect)(user.token.as_deref());

        let backend: Arc<dyn SearchBackend> = match self.config.search_strategy {
            SearchStrategy::Local => Arc::new(LocalBackend::new(self.index.clone())),
            SearchStrategy::Remote => Arc::new(
                RemoteBackend::new(api.clone(), user.user_id.clone(), self.config.request_timeout)
                    .with_empty_tag_placeholders(self.config.empty_tag_placeholders()),
            ),
        };

        SessionContext {
            upload: UploadService::new(api.clone(), self.index.clone(), user.clone()),
            tags: TagService::new(api.clone()),
            downloads: DownloadService::new(api, self.cache.clone()),
            page_size: self.config.page_size,
            backend,
            user,
        }
    }
}

/// Everything tied to the signed-in user
#[derive(Clone)]
pub struct SessionContext {
    pub user: UserSession,
    pub upload: UploadService,
    pub tags: TagService,
    pub downloads: DownloadService,
    backend: Arc<dyn SearchBackend>,
    page_size: usize,
}

impl SessionContext {
    /// Fresh state for a search screen
    pub fn search_session(&self) -> SearchSession {
        SearchSession::new(self.backend.clone(), self.page_size)
    }

    pub fn backend(&self) -> Arc<dyn SearchBackend> {
        self.backend.clone()
    }
}
