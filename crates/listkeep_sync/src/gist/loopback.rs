//! In-memory Gist API for tests and offline runs.
//!
//! [`LoopbackGistServer`] answers the handful of routes the backend uses,
//! with the same status codes and JSON shapes as the real API. It records
//! every request so tests can assert on transport traffic.

use super::http::{GistHttpClient, HttpMethod, HttpRequest, HttpResponse};
use super::wire::{GistDocument, GistFile, GistIdentity, GistWrite};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

/// A request as seen by the loopback server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    /// Method.
    pub method: HttpMethod,
    /// Path without query.
    pub path: String,
}

#[derive(Debug, Default)]
struct LoopbackState {
    accounts: HashMap<String, GistIdentity>,
    gists: Vec<(String, GistDocument)>,
    next_id: u64,
    requests: Vec<RecordedRequest>,
    injected_status: Option<u16>,
    offline: bool,
}

/// In-memory stand-in for the Gist API.
#[derive(Debug, Default)]
pub struct LoopbackGistServer {
    state: Mutex<LoopbackState>,
}

impl LoopbackGistServer {
    /// Creates a server with no accounts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an account reachable with `token`.
    pub fn add_account(&self, token: impl Into<String>, login: impl Into<String>, id: u64) {
        self.state.lock().accounts.insert(
            token.into(),
            GistIdentity {
                login: login.into(),
                id,
            },
        );
    }

    /// Stores a document owned by `login` as if another client created it.
    pub fn insert_gist(&self, login: &str, description: &str, files: Vec<(&str, Option<&str>)>) -> String {
        let mut state = self.state.lock();
        let id = state.allocate_id();
        let files = files
            .into_iter()
            .map(|(name, content)| {
                (
                    name.to_string(),
                    GistFile {
                        filename: Some(name.to_string()),
                        content: content.map(str::to_string),
                    },
                )
            })
            .collect();
        state.gists.push((
            login.to_string(),
            GistDocument {
                id: id.clone(),
                description: Some(description.to_string()),
                public: false,
                files,
            },
        ));
        id
    }

    /// All stored documents, oldest first.
    pub fn gists(&self) -> Vec<GistDocument> {
        self.state.lock().gists.iter().map(|(_, g)| g.clone()).collect()
    }

    /// Number of stored documents.
    pub fn gist_count(&self) -> usize {
        self.state.lock().gists.len()
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().requests.clone()
    }

    /// Number of requests received so far.
    pub fn request_count(&self) -> usize {
        self.state.lock().requests.len()
    }

    /// Number of requests received with `method`.
    pub fn count_method(&self, method: HttpMethod) -> usize {
        self.state
            .lock()
            .requests
            .iter()
            .filter(|r| r.method == method)
            .count()
    }

    /// Answers the next request with `status` and an error body.
    pub fn fail_next_with(&self, status: u16) {
        self.state.lock().injected_status = Some(status);
    }

    /// While offline, requests fail without a response.
    pub fn set_offline(&self, offline: bool) {
        self.state.lock().offline = offline;
    }

    /// Handles one request.
    pub fn handle(&self, request: &HttpRequest) -> Result<HttpResponse, String> {
        let (path, query) = split_url(&request.url);
        let mut state = self.state.lock();
        state.requests.push(RecordedRequest {
            method: request.method,
            path: path.to_string(),
        });
        trace!(method = %request.method, path, "loopback request");

        if state.offline {
            return Err("connection refused".to_string());
        }
        if let Some(status) = state.injected_status.take() {
            return Ok(message(status, "injected failure"));
        }

        let Some(login) = request
            .header_value("Authorization")
            .and_then(|v| v.strip_prefix("Bearer "))
            .and_then(|token| state.accounts.get(token))
            .map(|identity| identity.login.clone())
        else {
            return Ok(message(401, "Bad credentials"));
        };

        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
        let response = match (request.method, segments.as_slice()) {
            (HttpMethod::Get, ["user"]) => {
                let identity = state
                    .accounts
                    .values()
                    .find(|a| a.login == login)
                    .cloned();
                match identity {
                    Some(identity) => json(200, &identity),
                    None => message(401, "Bad credentials"),
                }
            }
            (HttpMethod::Get, ["gists"]) => {
                let per_page = query_param(query, "per_page")
                    .and_then(|v| v.parse::<usize>().ok())
                    .unwrap_or(30)
                    .max(1);
                let page = query_param(query, "page")
                    .and_then(|v| v.parse::<usize>().ok())
                    .unwrap_or(1)
                    .max(1);
                let owned: Vec<&GistDocument> = state
                    .gists
                    .iter()
                    .rev()
                    .filter(|(owner, _)| *owner == login)
                    .map(|(_, g)| g)
                    .collect();
                let listing: Vec<GistDocument> = owned
                    .iter()
                    .skip((page - 1) * per_page)
                    .take(per_page)
                    .map(|g| summary(g))
                    .collect();

                let response = json(200, &listing);
                if owned.len() > page * per_page {
                    let base = request.url.split_once('?').map_or(request.url.as_str(), |(b, _)| b);
                    response.header(
                        "Link",
                        format!("<{base}?per_page={per_page}&page={}>; rel=\"next\"", page + 1),
                    )
                } else {
                    response
                }
            }
            (HttpMethod::Post, ["gists"]) => match parse_write(request) {
                Ok(write) => {
                    let id = state.allocate_id();
                    let document = GistDocument {
                        id,
                        description: Some(write.description),
                        public: write.public,
                        files: named(write.files).collect(),
                    };
                    state.gists.push((login, document.clone()));
                    json(201, &document)
                }
                Err(response) => response,
            },
            (HttpMethod::Patch, ["gists", id]) => match parse_write(request) {
                Ok(write) => match state.owned_mut(&login, id) {
                    Some(document) => {
                        document.description = Some(write.description);
                        document.files.extend(named(write.files));
                        json(200, &document.clone())
                    }
                    None => message(404, "Not Found"),
                },
                Err(response) => response,
            },
            (HttpMethod::Get, ["gists", id]) => match state.owned_mut(&login, id) {
                Some(document) => json(200, &document.clone()),
                None => message(404, "Not Found"),
            },
            _ => message(404, "Not Found"),
        };

        Ok(response)
    }
}

impl LoopbackState {
    fn allocate_id(&mut self) -> String {
        self.next_id += 1;
        format!("{:032x}", self.next_id)
    }

    fn owned_mut(&mut self, login: &str, id: &str) -> Option<&mut GistDocument> {
        self.gists
            .iter_mut()
            .find(|(owner, g)| owner.as_str() == login && g.id == id)
            .map(|(_, g)| g)
    }
}

/// [`GistHttpClient`] that routes requests to a shared [`LoopbackGistServer`].
#[derive(Debug, Clone)]
pub struct LoopbackClient {
    server: Arc<LoopbackGistServer>,
}

impl LoopbackClient {
    /// Creates a client connected to `server`.
    pub fn new(server: Arc<LoopbackGistServer>) -> Self {
        Self { server }
    }

    /// The server this client talks to.
    pub fn server(&self) -> &Arc<LoopbackGistServer> {
        &self.server
    }
}

#[async_trait]
impl GistHttpClient for LoopbackClient {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, String> {
        self.server.handle(&request)
    }
}

fn split_url(url: &str) -> (&str, Option<&str>) {
    let after_scheme = url.find("://").map_or(url, |i| &url[i + 3..]);
    let path = after_scheme.find('/').map_or("/", |i| &after_scheme[i..]);
    match path.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (path, None),
    }
}

fn query_param<'a>(query: Option<&'a str>, name: &str) -> Option<&'a str> {
    query?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

fn parse_write(request: &HttpRequest) -> Result<GistWrite, HttpResponse> {
    let body = request
        .body
        .as_deref()
        .ok_or_else(|| message(422, "Invalid request"))?;
    serde_json::from_slice(body).map_err(|_| message(422, "Invalid request"))
}

fn named(files: impl IntoIterator<Item = (String, GistFile)>) -> impl Iterator<Item = (String, GistFile)> {
    files.into_iter().map(|(name, file)| {
        let file = GistFile {
            filename: Some(name.clone()),
            content: file.content,
        };
        (name, file)
    })
}

fn summary(document: &GistDocument) -> GistDocument {
    GistDocument {
        files: document
            .files
            .iter()
            .map(|(name, file)| {
                (
                    name.clone(),
                    GistFile {
                        filename: file.filename.clone(),
                        content: None,
                    },
                )
            })
            .collect(),
        ..document.clone()
    }
}

fn json<T: Serialize>(status: u16, value: &T) -> HttpResponse {
    match serde_json::to_vec(value) {
        Ok(body) => HttpResponse::new(status, body),
        Err(e) => message(500, &e.to_string()),
    }
}

fn message(status: u16, text: &str) -> HttpResponse {
    let body = serde_json::json!({ "message": text }).to_string();
    HttpResponse::new(status, body.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server() -> LoopbackGistServer {
        let server = LoopbackGistServer::new();
        server.add_account("t1", "octo", 1);
        server
    }

    fn get(path: &str, token: &str) -> HttpRequest {
        HttpRequest::new(HttpMethod::Get, format!("http://loopback{path}"))
            .header("Authorization", format!("Bearer {token}"))
    }

    #[test]
    fn rejects_unknown_token() {
        let server = server();
        let response = server.handle(&get("/user", "nope")).unwrap();
        assert_eq!(response.status, 401);
    }

    #[test]
    fn create_list_fetch() {
        let server = server();
        let body = serde_json::to_vec(&GistWrite::private_file("label", "f.json", "{}")).unwrap();
        let create = HttpRequest::new(HttpMethod::Post, "http://loopback/gists")
            .header("Authorization", "Bearer t1")
            .json_body(body);
        let created = server.handle(&create).unwrap();
        assert_eq!(created.status, 201);
        let created: GistDocument = serde_json::from_slice(&created.body).unwrap();

        let listing = server.handle(&get("/gists?per_page=100", "t1")).unwrap();
        let listing: Vec<GistDocument> = serde_json::from_slice(&listing.body).unwrap();
        assert_eq!(listing.len(), 1);
        assert!(listing[0].files["f.json"].content.is_none());

        let fetched = server
            .handle(&get(&format!("/gists/{}", created.id), "t1"))
            .unwrap();
        assert_eq!(fetched.status, 200);
        let fetched: GistDocument = serde_json::from_slice(&fetched.body).unwrap();
        assert_eq!(fetched.files["f.json"].content.as_deref(), Some("{}"));
        assert_eq!(server.count_method(HttpMethod::Get), 2);
    }

    #[test]
    fn documents_are_private_to_owner() {
        let server = server();
        server.add_account("t2", "other", 2);
        let id = server.insert_gist("other", "label", vec![("f.json", Some("{}"))]);
        assert_eq!(server.handle(&get(&format!("/gists/{id}"), "t1")).unwrap().status, 404);
        assert_eq!(server.handle(&get(&format!("/gists/{id}"), "t2")).unwrap().status, 200);
    }

    #[test]
    fn injected_failures() {
        let server = server();
        server.fail_next_with(500);
        assert_eq!(server.handle(&get("/gists", "t1")).unwrap().status, 500);
        assert_eq!(server.handle(&get("/gists", "t1")).unwrap().status, 200);

        server.set_offline(true);
        assert!(server.handle(&get("/gists", "t1")).is_err());
        assert_eq!(server.request_count(), 3);
    }

    #[test]
    fn listing_pages_link_to_the_next() {
        let server = server();
        for n in 0..5 {
            server.insert_gist("octo", &format!("doc {n}"), vec![]);
        }

        let first = server.handle(&get("/gists?per_page=2", "t1")).unwrap();
        let docs: Vec<GistDocument> = serde_json::from_slice(&first.body).unwrap();
        assert_eq!(docs[0].description.as_deref(), Some("doc 4"));
        assert_eq!(first.next_link(), Some("http://loopback/gists?per_page=2&page=2"));

        let last = server.handle(&get("/gists?per_page=2&page=3", "t1")).unwrap();
        let docs: Vec<GistDocument> = serde_json::from_slice(&last.body).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].description.as_deref(), Some("doc 0"));
        assert_eq!(last.next_link(), None);
    }

    #[test]
    fn url_splitting() {
        assert_eq!(split_url("https://h/gists?per_page=5"), ("/gists", Some("per_page=5")));
        assert_eq!(split_url("https://h"), ("/", None));
        assert_eq!(query_param(Some("a=1&per_page=5"), "per_page"), Some("5"));
    }
}
