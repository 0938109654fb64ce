//! Remote Gist backend.
//!
//! Each user's backup is one private document labelled
//! `"<app> Backup - <first> <last>"` holding a single file
//! `"<app>_backup_<sanitized id>.json"`. A backup finds the document by its
//! label and updates it, or creates it if absent.

mod http;
mod loopback;
mod wire;

pub use http::{GistHttpClient, HttpMethod, HttpRequest, HttpResponse, ReqwestClient};
pub use loopback::{LoopbackClient, LoopbackGistServer, RecordedRequest};
pub use wire::{GistDocument, GistFile, GistIdentity, GistWrite};

use crate::config::GistConfig;
use crate::engine::SyncEngine;
use crate::error::{SyncError, SyncResult};
use crate::remote::{SnapshotRemote, WriteOutcome};
use async_trait::async_trait;
use listkeep_codec::naming::{backup_file_prefix, backup_filename, backup_label};
use listkeep_codec::User;
use listkeep_storage::LocalStore;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, info, warn};

const MAX_LISTING_PAGES: usize = 100;

/// Sync engine writing to the Gist API.
pub type GistBackend<C, S> = SyncEngine<GistRemote<C>, S>;

/// The Gist API as a [`SnapshotRemote`].
///
/// Holds the access token in memory once it has been verified.
pub struct GistRemote<C: GistHttpClient> {
    client: C,
    config: GistConfig,
    token: RwLock<Option<String>>,
    identity: RwLock<Option<GistIdentity>>,
}

impl<C: GistHttpClient> GistRemote<C> {
    /// Creates an unauthenticated remote.
    pub fn new(client: C, config: GistConfig) -> Self {
        Self {
            client,
            config,
            token: RwLock::new(None),
            identity: RwLock::new(None),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &GistConfig {
        &self.config
    }

    /// The HTTP client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Account the held token belongs to.
    pub fn identity(&self) -> Option<GistIdentity> {
        self.identity.read().clone()
    }

    /// Returns true if a verified token is held.
    pub fn is_authenticated(&self) -> bool {
        self.token.read().is_some()
    }

    fn token(&self) -> SyncResult<String> {
        self.token.read().clone().ok_or(SyncError::NotAuthenticated)
    }

    fn accept(&self, token: String, identity: GistIdentity) {
        *self.token.write() = Some(token);
        *self.identity.write() = Some(identity);
    }

    fn forget(&self) {
        *self.token.write() = None;
        *self.identity.write() = None;
    }

    fn request(&self, method: HttpMethod, path: &str, token: &str) -> HttpRequest {
        self.request_url(method, self.config.url(path), token)
    }

    fn request_url(&self, method: HttpMethod, url: String, token: &str) -> HttpRequest {
        HttpRequest::new(method, url)
            .header("Authorization", format!("Bearer {token}"))
            .header("Accept", self.config.accept.as_str())
            .header("User-Agent", self.config.user_agent.as_str())
    }

    async fn send(&self, request: HttpRequest, operation: &str) -> SyncResult<HttpResponse> {
        debug!(method = %request.method, operation, "gist request");
        self.client
            .send(request)
            .await
            .map_err(|e| SyncError::network(format!("{operation} failed: {e}")))
    }

    async fn verify(&self, token: &str) -> SyncResult<GistIdentity> {
        let response = self
            .send(self.request(HttpMethod::Get, "/user", token), "verify token")
            .await?;

        if response.status != 200 {
            return Err(SyncError::AuthenticationFailed(format!(
                "invalid access token (HTTP {})",
                response.status
            )));
        }

        parse(&response.body).map_err(|e| SyncError::AuthenticationFailed(format!("unreadable identity: {e}")))
    }

    /// Finds the id of the first listed document whose label is `label`.
    ///
    /// Follows `Link: rel="next"` until a match or the last page.
    async fn find(&self, token: &str, label: &str) -> SyncResult<Option<String>> {
        let mut url = self
            .config
            .url(&format!("/gists?per_page={}", self.config.per_page));

        for page in 1..=MAX_LISTING_PAGES {
            let response = self
                .send(self.request_url(HttpMethod::Get, url, token), "list gists")
                .await?;

            if response.status != 200 {
                return Err(SyncError::unexpected_status("list gists", 200, response.status));
            }

            let listing: Vec<GistDocument> = parse(&response.body)
                .map_err(|e| SyncError::network(format!("unreadable gist listing: {e}")))?;

            if let Some(found) = listing
                .into_iter()
                .find(|g| g.description.as_deref() == Some(label))
            {
                return Ok(Some(found.id));
            }

            match response.next_link() {
                Some(next) => {
                    debug!(page, "gist listing continues");
                    url = next.to_string();
                }
                None => return Ok(None),
            }
        }

        Err(SyncError::network(format!(
            "gist listing did not end within {MAX_LISTING_PAGES} pages"
        )))
    }

    async fn fetch(&self, token: &str, id: &str) -> SyncResult<GistDocument> {
        let path = format!("/gists/{id}");
        let response = self
            .send(self.request(HttpMethod::Get, &path, token), "fetch gist")
            .await?;

        if response.status != 200 {
            return Err(SyncError::unexpected_status("fetch gist", 200, response.status));
        }

        parse(&response.body).map_err(|e| SyncError::Decoding(format!("unreadable gist: {e}")))
    }

    async fn upload(
        &self,
        token: &str,
        existing: Option<&str>,
        body: &GistWrite,
    ) -> SyncResult<WriteOutcome> {
        let body = serde_json::to_vec(body).map_err(|e| SyncError::Encoding(e.to_string()))?;

        let (request, operation, expected, outcome) = match existing {
            Some(id) => (
                self.request(HttpMethod::Patch, &format!("/gists/{id}"), token),
                "update gist",
                200,
                WriteOutcome::Updated,
            ),
            None => (
                self.request(HttpMethod::Post, "/gists", token),
                "create gist",
                201,
                WriteOutcome::Created,
            ),
        };

        let response = self.send(request.json_body(body), operation).await?;
        if response.status != expected {
            return Err(SyncError::unexpected_status(operation, expected, response.status));
        }
        Ok(outcome)
    }
}

#[async_trait]
impl<C: GistHttpClient> SnapshotRemote for GistRemote<C> {
    fn name(&self) -> &'static str {
        "gist"
    }

    fn ensure_ready(&self) -> SyncResult<()> {
        self.token().map(|_| ())
    }

    async fn write_snapshot(&self, user: &User, payload: &[u8]) -> SyncResult<WriteOutcome> {
        let token = self.token()?;
        let label = backup_label(&self.config.app_name, user);
        let content = std::str::from_utf8(payload)
            .map_err(|e| SyncError::Encoding(format!("snapshot is not UTF-8: {e}")))?;

        let existing = self.find(&token, &label).await?;
        let body = GistWrite::private_file(
            label,
            backup_filename(&self.config.app_name, user),
            content,
        );
        self.upload(&token, existing.as_deref(), &body).await
    }

    async fn read_snapshot(&self, user: &User) -> SyncResult<Option<Vec<u8>>> {
        let token = self.token()?;
        let label = backup_label(&self.config.app_name, user);

        let Some(id) = self.find(&token, &label).await? else {
            return Ok(None);
        };

        let document = self.fetch(&token, &id).await?;
        let filename = backup_filename(&self.config.app_name, user);
        let prefix = backup_file_prefix(&self.config.app_name);

        let file = document.files.get(&filename).or_else(|| {
            document
                .files
                .iter()
                .find(|(name, _)| name.contains(&prefix))
                .map(|(_, file)| file)
        });

        let Some(file) = file else {
            warn!(gist_id = %id, "backup document has no backup file");
            return Err(SyncError::NotFound);
        };

        match &file.content {
            Some(content) => Ok(Some(content.clone().into_bytes())),
            None => Err(SyncError::Decoding("backup file has no content".to_string())),
        }
    }
}

impl<C, S> SyncEngine<GistRemote<C>, S>
where
    C: GistHttpClient,
    S: LocalStore,
{
    /// Creates a Gist backend over `client`.
    pub fn gist(client: C, config: GistConfig, store: Arc<S>) -> Self {
        SyncEngine::new(GistRemote::new(client, config), store)
    }

    /// Verifies `token` against the identity endpoint and keeps it.
    ///
    /// # Errors
    ///
    /// [`SyncError::AuthenticationFailed`] if the token is empty or
    /// rejected; [`SyncError::Network`] if no response arrives. A rejected
    /// token replaces any token held before.
    pub async fn authenticate(&self, token: &str) -> SyncResult<GistIdentity> {
        self.exclusive("authenticate", async {
            let token = token.trim();
            if token.is_empty() {
                return Err(SyncError::AuthenticationFailed("access token is empty".to_string()));
            }

            match self.remote().verify(token).await {
                Ok(identity) => {
                    info!(login = %identity.login, "gist account authenticated");
                    self.remote().accept(token.to_string(), identity.clone());
                    Ok(identity)
                }
                Err(e @ SyncError::AuthenticationFailed(_)) => {
                    self.remote().forget();
                    Err(e)
                }
                Err(e) => Err(e),
            }
        })
        .await
    }

    /// Drops the held token and resets the session to idle.
    pub fn logout(&self) {
        self.remote().forget();
        self.session().reset();
        info!("gist account signed out");
    }

    /// Returns true if a verified token is held.
    pub fn is_authenticated(&self) -> bool {
        self.remote().is_authenticated()
    }
}

fn parse<T: DeserializeOwned>(body: &[u8]) -> Result<T, serde_json::Error> {
    serde_json::from_slice(body)
}
