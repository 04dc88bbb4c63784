//! In-process fake BasketEasy backend for tests.
//!
//! Binds an axum router to `127.0.0.1:0` and keeps all state behind one mutex
//! so tests can inspect what the client sent and script failures.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::json;
use wire::{
    AddMemberPayload, AuthResponse, CreateTeamPayload, LoginCredentials, RefreshRequest, RegisterData, Team,
    TeamMember, TeamRole, UpdateTeamPayload, User, UserRole,
};

use crate::config::{ClientConfig, QueryConfig};
use crate::net::ApiClient;
use crate::query::QueryCache;
use crate::resources::{Auth, ResourceContext};
use crate::session::Session;
use crate::storage::MemoryStore;

pub const PASSWORD: &str = "Secret123";
pub const REFRESH_TOKEN: &str = "refresh-1";

/// One request as seen by the fake backend.
#[derive(Clone, Debug)]
pub struct SeenRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
}

pub struct FakeInner {
    /// Only this bearer token is accepted on protected routes.
    pub access_token: String,
    pub refresh_token: String,
    pub refresh_fails: bool,
    pub refresh_calls: usize,
    token_counter: usize,
    next_id: u64,
    pub current_user: Option<String>,
    pub users: Vec<User>,
    pub teams: Vec<Team>,
    pub requests: Vec<SeenRequest>,
    /// Statuses returned (in order) before normal handling, keyed by `"METHOD /path"`.
    pub scripted: HashMap<String, VecDeque<u16>>,
    /// Artificial latency for `GET /api/teams`.
    pub list_delay: Option<Duration>,
}

impl FakeInner {
    pub fn count(&self, method: &str, path: &str) -> usize {
        self.requests.iter().filter(|r| r.method == method && r.path == path).count()
    }

    /// Invalidate the current access token, as if it had expired server-side.
    pub fn expire_access_token(&mut self) {
        self.token_counter += 1;
        self.access_token = format!("access-{}", self.token_counter);
    }

    pub fn script(&mut self, method: &str, path: &str, statuses: &[u16]) {
        self.scripted
            .entry(format!("{method} {path}"))
            .or_default()
            .extend(statuses.iter().copied());
    }

    fn alloc_id(&mut self) -> String {
        self.next_id += 1;
        self.next_id.to_string()
    }
}

#[derive(Clone)]
pub struct FakeBackend {
    pub base_url: String,
    state: Arc<Mutex<FakeInner>>,
}

impl FakeBackend {
    pub async fn start() -> Self {
        let inner = FakeInner {
            access_token: "access-0".to_owned(),
            refresh_token: REFRESH_TOKEN.to_owned(),
            refresh_fails: false,
            refresh_calls: 0,
            token_counter: 0,
            next_id: 100,
            current_user: None,
            users: vec![alice()],
            teams: Vec::new(),
            requests: Vec::new(),
            scripted: HashMap::new(),
            list_delay: None,
        };
        let state = Arc::new(Mutex::new(inner));

        let app = Router::new()
            .route("/api/auth/login", post(login))
            .route("/api/auth/register", post(register))
            .route("/api/auth/refresh", post(refresh))
            .route("/api/auth/profile", get(profile))
            .route("/api/users", get(list_users))
            .route("/api/users/{id}", get(get_user))
            .route("/api/teams", get(list_teams).post(create_team))
            .route("/api/teams/{id}", get(get_team).put(update_team).delete(delete_team))
            .route("/api/teams/{id}/members", get(list_members).post(add_member))
            .route("/api/teams/{id}/members/{user_id}", delete(remove_member))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake backend");
        let addr = listener.local_addr().expect("fake backend addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake backend serve");
        });

        Self { base_url: format!("http://{addr}"), state }
    }

    pub fn state(&self) -> MutexGuard<'_, FakeInner> {
        self.state.lock().expect("fake backend mutex")
    }

    /// Client config pointing at this backend with fast retries.
    pub fn config(&self) -> ClientConfig {
        let mut config = ClientConfig::new(&self.base_url);
        config.query = QueryConfig { retry_base_delay: Duration::from_millis(1), ..QueryConfig::default() };
        config
    }

    /// Seed a team directly on the backend.
    pub fn seed_team(&self, name: &str) -> Team {
        let mut inner = self.state();
        let id = inner.alloc_id();
        let team = new_team(id, CreateTeamPayload { name: name.to_owned(), club: "Seed Club".to_owned(), ..Default::default() });
        inner.teams.push(team.clone());
        team
    }
}

pub fn alice() -> User {
    User {
        id: "1".to_owned(),
        username: "alice".to_owned(),
        email: "alice@example.com".to_owned(),
        role: UserRole::Admin,
    }
}

pub fn memory_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new())
}

/// Resource handles wired to `backend`, with a resolved anonymous session.
pub fn context(backend: &FakeBackend, store: Arc<MemoryStore>) -> ResourceContext {
    let config = backend.config();
    let api = ApiClient::new(&config, store.clone()).expect("api client");
    let session = Session::new(store);
    session.init();
    ResourceContext::new(api, session, QueryCache::new(config.query))
}

/// Like [`context`], signed in as alice.
pub async fn signed_in(backend: &FakeBackend) -> ResourceContext {
    let ctx = context(backend, memory_store());
    Auth::new(ctx.clone()).login(&alice_credentials()).await.expect("login");
    ctx
}

pub fn alice_credentials() -> LoginCredentials {
    LoginCredentials { email: alice().email, password: PASSWORD.to_owned() }
}

type Shared = Arc<Mutex<FakeInner>>;

fn lock(state: &Shared) -> MutexGuard<'_, FakeInner> {
    state.lock().expect("fake backend mutex")
}

fn error(status: StatusCode, message: &str, field: Option<&str>) -> Response {
    let mut body = json!({ "message": message, "statusCode": status.as_u16() });
    if let Some(field) = field {
        body["field"] = json!(field);
    }
    (status, Json(body)).into_response()
}

fn record(inner: &mut FakeInner, method: &Method, uri: &Uri, headers: &HeaderMap) {
    inner.requests.push(SeenRequest {
        method: method.to_string(),
        path: uri.path().to_owned(),
        authorization: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned),
    });
}

fn scripted(inner: &mut FakeInner, method: &Method, uri: &Uri) -> Option<Response> {
    let key = format!("{method} {}", uri.path());
    let status = inner.scripted.get_mut(&key)?.pop_front()?;
    let code = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    Some(error(code, "scripted failure", None))
}

/// Record the request, apply scripted failures, then check the bearer token.
fn guard(inner: &mut FakeInner, method: &Method, uri: &Uri, headers: &HeaderMap) -> Result<(), Response> {
    record(inner, method, uri, headers);
    if let Some(resp) = scripted(inner, method, uri) {
        return Err(resp);
    }
    let expected = format!("Bearer {}", inner.access_token);
    let presented = headers.get("authorization").and_then(|v| v.to_str().ok());
    if presented == Some(expected.as_str()) {
        Ok(())
    } else {
        Err(error(StatusCode::UNAUTHORIZED, "Unauthorized", None))
    }
}

fn new_team(id: String, payload: CreateTeamPayload) -> Team {
    Team {
        id,
        name: payload.name,
        club: payload.club,
        color: payload.color,
        description: payload.description,
        image_url: payload.image_url,
        created_at: "2025-01-01T00:00:00Z".to_owned(),
        updated_at: "2025-01-01T00:00:00Z".to_owned(),
        current_user_role: TeamRole::Admin,
        members: Vec::new(),
    }
}

fn auth_response(inner: &FakeInner, user: User) -> Response {
    Json(AuthResponse {
        access_token: Some(inner.access_token.clone()),
        refresh_token: Some(inner.refresh_token.clone()),
        user: Some(user),
        message: None,
    })
    .into_response()
}

async fn login(State(state): State<Shared>, method: Method, uri: Uri, headers: HeaderMap, Json(body): Json<LoginCredentials>) -> Response {
    let mut inner = lock(&state);
    record(&mut inner, &method, &uri, &headers);
    if let Some(resp) = scripted(&mut inner, &method, &uri) {
        return resp;
    }
    let user = inner.users.iter().find(|u| u.email == body.email).cloned();
    match user {
        Some(user) if body.password == PASSWORD => {
            inner.current_user = Some(user.id.clone());
            auth_response(&inner, user)
        }
        _ => error(StatusCode::UNAUTHORIZED, "Invalid credentials", None),
    }
}

async fn register(State(state): State<Shared>, method: Method, uri: Uri, headers: HeaderMap, Json(body): Json<RegisterData>) -> Response {
    let mut inner = lock(&state);
    record(&mut inner, &method, &uri, &headers);
    if inner.users.iter().any(|u| u.username == body.username) {
        return error(StatusCode::CONFLICT, "Username already taken", Some("username"));
    }
    let user = User {
        id: inner.alloc_id(),
        username: body.username,
        email: body.email,
        role: body.role.unwrap_or(UserRole::User),
    };
    inner.users.push(user.clone());
    inner.current_user = Some(user.id.clone());
    auth_response(&inner, user)
}

async fn refresh(State(state): State<Shared>, method: Method, uri: Uri, headers: HeaderMap, Json(body): Json<RefreshRequest>) -> Response {
    let mut inner = lock(&state);
    record(&mut inner, &method, &uri, &headers);
    inner.refresh_calls += 1;
    if inner.refresh_fails || body.refresh_token != inner.refresh_token {
        return error(StatusCode::UNAUTHORIZED, "Invalid refresh token", None);
    }
    inner.expire_access_token();
    Json(json!({ "accessToken": inner.access_token })).into_response()
}

async fn profile(State(state): State<Shared>, method: Method, uri: Uri, headers: HeaderMap) -> Response {
    let mut inner = lock(&state);
    if let Err(resp) = guard(&mut inner, &method, &uri, &headers) {
        return resp;
    }
    let current = inner.current_user.clone().unwrap_or_else(|| "1".to_owned());
    match inner.users.iter().find(|u| u.id == current) {
        Some(user) => Json(user.clone()).into_response(),
        None => error(StatusCode::NOT_FOUND, "User not found", None),
    }
}

async fn list_users(State(state): State<Shared>, method: Method, uri: Uri, headers: HeaderMap) -> Response {
    let mut inner = lock(&state);
    if let Err(resp) = guard(&mut inner, &method, &uri, &headers) {
        return resp;
    }
    Json(inner.users.clone()).into_response()
}

async fn get_user(State(state): State<Shared>, Path(id): Path<String>, method: Method, uri: Uri, headers: HeaderMap) -> Response {
    let mut inner = lock(&state);
    if let Err(resp) = guard(&mut inner, &method, &uri, &headers) {
        return resp;
    }
    match inner.users.iter().find(|u| u.id == id) {
        Some(user) => Json(user.clone()).into_response(),
        None => error(StatusCode::NOT_FOUND, "User not found", None),
    }
}

async fn list_teams(State(state): State<Shared>, method: Method, uri: Uri, headers: HeaderMap) -> Response {
    let delay = {
        let mut inner = lock(&state);
        if let Err(resp) = guard(&mut inner, &method, &uri, &headers) {
            return resp;
        }
        inner.list_delay
    };
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    Json(lock(&state).teams.clone()).into_response()
}

async fn create_team(State(state): State<Shared>, method: Method, uri: Uri, headers: HeaderMap, Json(body): Json<CreateTeamPayload>) -> Response {
    let mut inner = lock(&state);
    if let Err(resp) = guard(&mut inner, &method, &uri, &headers) {
        return resp;
    }
    if inner.teams.iter().any(|t| t.name == body.name) {
        return error(StatusCode::CONFLICT, "Team name already exists", Some("name"));
    }
    let id = inner.alloc_id();
    let team = new_team(id, body);
    inner.teams.push(team.clone());
    (StatusCode::CREATED, Json(team)).into_response()
}

async fn get_team(State(state): State<Shared>, Path(id): Path<String>, method: Method, uri: Uri, headers: HeaderMap) -> Response {
    let mut inner = lock(&state);
    if let Err(resp) = guard(&mut inner, &method, &uri, &headers) {
        return resp;
    }
    match inner.teams.iter().find(|t| t.id == id) {
        Some(team) => Json(team.clone()).into_response(),
        None => error(StatusCode::NOT_FOUND, "Team not found", None),
    }
}

async fn update_team(
    State(state): State<Shared>,
    Path(id): Path<String>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<UpdateTeamPayload>,
) -> Response {
    let mut inner = lock(&state);
    if let Err(resp) = guard(&mut inner, &method, &uri, &headers) {
        return resp;
    }
    let Some(team) = inner.teams.iter_mut().find(|t| t.id == id) else {
        return error(StatusCode::NOT_FOUND, "Team not found", None);
    };
    if let Some(name) = body.name {
        team.name = name;
    }
    if let Some(club) = body.club {
        team.club = club;
    }
    if body.color.is_some() {
        team.color = body.color;
    }
    if body.description.is_some() {
        team.description = body.description;
    }
    if body.image_url.is_some() {
        team.image_url = body.image_url;
    }
    team.updated_at = "2025-02-01T00:00:00Z".to_owned();
    Json(team.clone()).into_response()
}

async fn delete_team(State(state): State<Shared>, Path(id): Path<String>, method: Method, uri: Uri, headers: HeaderMap) -> Response {
    let mut inner = lock(&state);
    if let Err(resp) = guard(&mut inner, &method, &uri, &headers) {
        return resp;
    }
    let before = inner.teams.len();
    inner.teams.retain(|t| t.id != id);
    if inner.teams.len() == before {
        return error(StatusCode::NOT_FOUND, "Team not found", None);
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn list_members(State(state): State<Shared>, Path(id): Path<String>, method: Method, uri: Uri, headers: HeaderMap) -> Response {
    let mut inner = lock(&state);
    if let Err(resp) = guard(&mut inner, &method, &uri, &headers) {
        return resp;
    }
    match inner.teams.iter().find(|t| t.id == id) {
        Some(team) => Json(team.members.clone()).into_response(),
        None => error(StatusCode::NOT_FOUND, "Team not found", None),
    }
}

async fn add_member(
    State(state): State<Shared>,
    Path(id): Path<String>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<AddMemberPayload>,
) -> Response {
    let mut inner = lock(&state);
    if let Err(resp) = guard(&mut inner, &method, &uri, &headers) {
        return resp;
    }
    let member_id = inner.alloc_id();
    let username = inner.users.iter().find(|u| u.id == body.user_id).map(|u| u.username.clone());
    let Some(team) = inner.teams.iter_mut().find(|t| t.id == id) else {
        return error(StatusCode::NOT_FOUND, "Team not found", None);
    };
    if team.members.iter().any(|m| m.user_id == body.user_id) {
        return error(StatusCode::CONFLICT, "User is already a member", Some("userId"));
    }
    let member = TeamMember {
        id: member_id,
        user_id: body.user_id,
        username,
        role: body.role.unwrap_or(TeamRole::Member),
    };
    team.members.push(member.clone());
    (StatusCode::CREATED, Json(member)).into_response()
}

async fn remove_member(
    State(state): State<Shared>,
    Path((id, user_id)): Path<(String, String)>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let mut inner = lock(&state);
    if let Err(resp) = guard(&mut inner, &method, &uri, &headers) {
        return resp;
    }
    let Some(team) = inner.teams.iter_mut().find(|t| t.id == id) else {
        return error(StatusCode::NOT_FOUND, "Team not found", None);
    };
    team.members.retain(|m| m.user_id != user_id);
    StatusCode::NO_CONTENT.into_response()
}
