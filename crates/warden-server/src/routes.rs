//! Request handlers
//!
//! Pages behind the login are dispatched through the [`PAGES`] allow-list;
//! any other path is treated as nonexistent.

use axum::{
    extract::{Form, Path, Query, RawQuery, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::{info, warn};
use warden_auth::Credentials;

use crate::error::WebError;
use crate::server::AppState;
use crate::session::Session;
use crate::template;

/// Page every login lands on unless the form names another one
pub const DEFAULT_PAGE: &str = "list";

/// What a page handler gets to see
pub struct PageContext {
    pub identity: String,
    /// Raw query string of the page request
    pub params: String,
}

type PageHandler = fn(&PageContext) -> Html<String>;

/// Pages reachable after login
pub const PAGES: &[(&str, PageHandler)] = &[("list", list_page)];

pub fn page_names() -> Vec<&'static str> {
    PAGES.iter().map(|(name, _)| *name).collect()
}

fn find_page(name: &str) -> Option<PageHandler> {
    PAGES
        .iter()
        .find(|(page, _)| *page == name)
        .map(|(_, handler)| *handler)
}

fn list_page(ctx: &PageContext) -> Html<String> {
    Html(template::page_list(&ctx.identity, &page_names()))
}

fn default_page() -> String {
    DEFAULT_PAGE.to_string()
}

#[derive(Debug, Deserialize)]
pub struct IndexQuery {
    #[serde(default = "default_page")]
    pub page: String,
    #[serde(default)]
    pub params: String,
}

#[derive(Deserialize)]
pub struct LoginForm {
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default = "default_page")]
    pub page: String,
    #[serde(default)]
    pub params: String,
}

impl LoginForm {
    fn credentials(&self) -> Option<Credentials> {
        if self.username.is_none() && self.password.is_none() {
            return None;
        }

        Some(Credentials::new(
            self.username.clone().unwrap_or_default(),
            self.password.clone().unwrap_or_default(),
        ))
    }
}

/// Where a refused or missing login sends the client
pub fn failure_redirect(page: &str, params: &str) -> String {
    let mut target = format!("index?page={}", urlencoding::encode(page));
    if !params.is_empty() && !page.is_empty() {
        target.push_str("&params=");
        target.push_str(&urlencoding::encode(params));
    }
    target
}

/// Where a successful login sends the client
pub fn success_redirect(page: &str, params: &str) -> String {
    if params.is_empty() {
        page.to_string()
    } else {
        format!("{}?{}", page, params)
    }
}

/// Login form, or a short notice when the session is already logged in
pub async fn index(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<IndexQuery>,
) -> (CookieJar, Html<String>) {
    let session = state.sessions.load(&jar);

    let html = match state.gate.identity(&session) {
        Some(identity) => {
            let page = if find_page(&query.page).is_some() {
                query.page.as_str()
            } else {
                DEFAULT_PAGE
            };
            template::logged_in(&identity, page)
        }
        None => template::login_form(&query.page, &query.params),
    };

    (state.sessions.commit(session, jar), Html(html))
}

pub async fn login_post(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    login(&state, jar, form, true).await
}

/// Credentials are refused here; without them this behaves like the POST
pub async fn login_get(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(form): Query<LoginForm>,
) -> Response {
    login(&state, jar, form, false).await
}

async fn login(state: &AppState, jar: CookieJar, form: LoginForm, post: bool) -> Response {
    let mut session = state.sessions.load(&jar);
    let result = login_flow(state, &mut session, &form, post).await;
    let jar = state.sessions.commit(session, jar);

    (jar, result).into_response()
}

async fn login_flow(
    state: &AppState,
    session: &mut Session,
    form: &LoginForm,
    post: bool,
) -> Result<Redirect, WebError> {
    let credentials = form.credentials();
    if credentials.is_some() && !post {
        return Err(WebError::BadRequest(
            "POST only allowed for username and password",
        ));
    }

    let decision = state
        .gate
        .authorize(session, credentials.as_ref())
        .await
        .map_err(|e| {
            warn!(retryable = e.is_retryable(), "Answering login with 503: {}", e);
            WebError::unavailable(&e, state.debug)
        })?;

    if !decision.is_granted() {
        if credentials.is_none() {
            info!("No credentials or session found");
        }
        return Ok(Redirect::to(&failure_redirect(&form.page, &form.params)));
    }

    // The target is checked only once the login went through
    if find_page(&form.page).is_none() {
        return Err(WebError::BadRequest("Page must be valid"));
    }

    Ok(Redirect::to(&success_redirect(&form.page, &form.params)))
}

pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    let mut session = state.sessions.load(&jar);
    state.gate.logout(&mut session);

    (state.sessions.commit(session, jar), Redirect::to("index"))
}

/// One of the [`PAGES`], for logged-in sessions only
pub async fn page(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(name): Path<String>,
    RawQuery(query): RawQuery,
) -> Response {
    let Some(handler) = find_page(&name) else {
        return fallback(State(state), jar).await;
    };

    let session = state.sessions.load(&jar);
    let params = query.unwrap_or_default();

    let response = match state.gate.identity(&session) {
        Some(identity) => handler(&PageContext { identity, params }).into_response(),
        None => {
            info!("No credentials or session found");
            Redirect::to(&failure_redirect(&name, &params)).into_response()
        }
    };

    (state.sessions.commit(session, jar), response).into_response()
}

/// Nonexistent pages: back to the login form unless already logged in
pub async fn fallback(State(state): State<AppState>, jar: CookieJar) -> Response {
    let session = state.sessions.load(&jar);

    let response = if state.gate.is_authenticated(&session) {
        WebError::NotFound.into_response()
    } else {
        Redirect::to("/index").into_response()
    };

    (state.sessions.commit(session, jar), response).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::create_router;
    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        Router,
    };
    use std::sync::Arc;
    use tower::ServiceExt;
    use warden_auth::{
        CredentialStore, FailureReason, StoreError, StoreResult, ValidationOutcome,
    };
    use warden_core::WardenConfig;

    /// alice/secret succeeds, "broken" fails at the infrastructure level
    struct TestStore;

    #[async_trait]
    impl CredentialStore for TestStore {
        fn name(&self) -> &'static str {
            "test"
        }

        async fn validate(&self, username: &str, password: &str) -> StoreResult<ValidationOutcome> {
            match (username, password) {
                ("broken", _) => Err(StoreError::Directory("connection refused".to_string())),
                ("alice", "secret") => Ok(ValidationOutcome::Success("Alice Example".to_string())),
                ("alice", _) => Ok(ValidationOutcome::Failure(FailureReason::InvalidCredentials)),
                _ => Ok(ValidationOutcome::Failure(FailureReason::UnknownUser)),
            }
        }
    }

    fn app_with(config: WardenConfig, debug: bool) -> Router {
        create_router(AppState::new(config, Arc::new(TestStore), debug))
    }

    fn app() -> Router {
        app_with(WardenConfig::default(), false)
    }

    fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn post_login(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/login")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn location(response: &Response) -> &str {
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|h| h.to_str().ok())
            .unwrap_or("")
    }

    /// `name=value` part of the session cookie set by the response
    fn session_cookie(response: &Response) -> Option<String> {
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|h| h.to_str().ok())
            .find(|h| h.starts_with("warden_session="))
            .and_then(|h| h.split(';').next())
            .map(str::to_string)
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn logged_in_cookie(app: &Router) -> String {
        let response = app
            .clone()
            .oneshot(post_login("username=alice&password=secret"))
            .await
            .unwrap();
        session_cookie(&response).unwrap()
    }

    #[tokio::test]
    async fn test_index_shows_login_form() {
        let response = app().oneshot(get("/", None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("<form action=\"login\" method=\"post\">"));
        assert!(body.contains("name=\"page\" value=\"list\""));
    }

    #[tokio::test]
    async fn test_login_success_redirects_to_page() {
        let app = app();
        let response = app
            .clone()
            .oneshot(post_login("username=alice&password=secret&params=sort%3Dname"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "list?sort=name");
        let cookie = session_cookie(&response).unwrap();

        let response = app.oneshot(get("/list", Some(&cookie))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Welcome, Alice Example"));
    }

    #[tokio::test]
    async fn test_login_failure_redirects_to_index() {
        let response = app()
            .oneshot(post_login("username=alice&password=wrong&params=a%3D1%26b%3D2"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "index?page=list&params=a%3D1%26b%3D2");
        assert!(session_cookie(&response).is_none());
    }

    #[tokio::test]
    async fn test_wrong_password_with_session_redirects_to_index() {
        let app = app();
        let cookie = logged_in_cookie(&app).await;

        let mut request = post_login("username=alice&password=wrong");
        request
            .headers_mut()
            .insert(header::COOKIE, cookie.parse().unwrap());
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "index?page=list");
    }

    #[tokio::test]
    async fn test_unknown_user_looks_like_wrong_password() {
        let app = app();
        let unknown = app
            .clone()
            .oneshot(post_login("username=mallory&password=secret"))
            .await
            .unwrap();
        let wrong = app
            .oneshot(post_login("username=alice&password=wrong"))
            .await
            .unwrap();

        assert_eq!(unknown.status(), wrong.status());
        assert_eq!(location(&unknown), location(&wrong));
    }

    #[tokio::test]
    async fn test_credentials_over_get_rejected() {
        let response = app()
            .oneshot(get("/login?username=alice&password=secret", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_text(response).await,
            "POST only allowed for username and password"
        );
    }

    #[tokio::test]
    async fn test_invalid_page_after_login() {
        let response = app()
            .oneshot(post_login("username=alice&password=secret&page=admin"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, "Page must be valid");
    }

    #[tokio::test]
    async fn test_invalid_page_with_failed_login_redirects() {
        let response = app()
            .oneshot(post_login("username=alice&password=wrong&page=admin"))
            .await
            .unwrap();

        assert_eq!(location(&response), "index?page=admin");
    }

    #[tokio::test]
    async fn test_page_requires_session() {
        let response = app().oneshot(get("/list?sort=name", None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "index?page=list&params=sort%3Dname");
    }

    #[tokio::test]
    async fn test_get_login_with_session() {
        let app = app();
        let cookie = logged_in_cookie(&app).await;

        let response = app
            .oneshot(get("/login?page=list", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(location(&response), "list");
    }

    #[tokio::test]
    async fn test_index_with_session() {
        let app = app();
        let cookie = logged_in_cookie(&app).await;

        let response = app.oneshot(get("/", Some(&cookie))).await.unwrap();
        assert!(body_text(response).await.contains("Logged in as Alice Example."));
    }

    #[tokio::test]
    async fn test_logout_ends_session() {
        let app = app();
        let cookie = logged_in_cookie(&app).await;

        let response = app
            .clone()
            .oneshot(get("/logout", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(location(&response), "index");
        assert!(response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .any(|h| h.to_str().unwrap_or("").starts_with("warden_session=;")));

        let response = app.oneshot(get("/list", Some(&cookie))).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "index?page=list");
    }

    #[tokio::test]
    async fn test_fallback() {
        let app = app();
        let response = app
            .clone()
            .oneshot(get("/no/such/page", None))
            .await
            .unwrap();
        assert_eq!(location(&response), "/index");

        let cookie = logged_in_cookie(&app).await;
        let response = app
            .clone()
            .oneshot(get("/no/such/page", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app.oneshot(get("/admin", Some(&cookie))).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_backend_failure_is_unavailable() {
        let response = app()
            .oneshot(post_login("username=broken&password=x"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            body_text(response).await,
            "Authentication backend unavailable"
        );

        let response = app_with(WardenConfig::default(), true)
            .oneshot(post_login("username=broken&password=x"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(body_text(response).await.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_host_validation() {
        let mut config = WardenConfig::default();
        config.server.domain = Some("login.example.com".to_string());
        let app = app_with(config, false);

        let request = Request::builder()
            .uri("/")
            .header(header::HOST, "evil.example.com")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_text(response).await, "Invalid Host header");

        let request = Request::builder()
            .uri("/")
            .header(header::HOST, "login.example.com:8080")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_redirect_targets() {
        assert_eq!(failure_redirect("list", ""), "index?page=list");
        assert_eq!(failure_redirect("", "a=1"), "index?page=");
        assert_eq!(failure_redirect("list", "a b"), "index?page=list&params=a%20b");
        assert_eq!(success_redirect("list", ""), "list");
        assert_eq!(success_redirect("list", "a=1"), "list?a=1");
    }
}
