//! HTTP Handlers

use std::sync::Arc;

use axum::Extension;
use axum::extract::rejection::FormRejection;
use axum::extract::{Form, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use chrono::{Datelike, Utc};
use minijinja::{Value, context};
use platform::csrf;
use platform::password::ClearTextPassword;
use platform::session::Session;

use crate::domain::repository::{SnippetRepository, UserRepository};
use crate::error::{SiteError, SiteResult};
use crate::presentation::forms::{SnippetCreateForm, UserLoginForm, UserSignupForm};
use crate::presentation::templates;

/// Session key holding the signed-in user's id
pub const AUTH_USER_ID_KEY: &str = "authenticatedUserID";

/// Session key for one-shot notification banners
pub const FLASH_KEY: &str = "flash";

/// Session key recording where to land after a forced login
pub const REDIRECT_AFTER_LOGIN_KEY: &str = "redirectPathAfterLogin";

/// Shared handler state
#[derive(Clone)]
pub struct SiteAppState<R> {
    pub repo: Arc<R>,
}

/// Context fields every page template expects
///
/// Reading the flash here consumes it, which is what makes it one-shot.
fn base_context(session: &Session) -> Value {
    context! {
        flash => session.pop_string(FLASH_KEY),
        csrf_token => csrf::token(session),
        is_authenticated => session.get_int(AUTH_USER_ID_KEY).is_some(),
        current_year => Utc::now().year(),
    }
}

fn page(status: StatusCode, name: &str, ctx: Value) -> SiteResult<Response> {
    Ok((status, templates::render(name, ctx)?).into_response())
}

/// Unwrap a decoded form, mapping any decode failure to a 400
///
/// Covers unparseable bodies and non-numeric integer fields alike; no
/// store call has happened yet at this point.
fn decode<T>(form: Result<Form<T>, FormRejection>) -> SiteResult<T> {
    match form {
        Ok(Form(form)) => Ok(form),
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Form decode failed");
            Err(SiteError::BadRequest)
        }
    }
}

/// Shared rendering path for unknown routes and methods
pub async fn not_found() -> SiteError {
    SiteError::NotFound
}

// ============================================================================
// Snippets
// ============================================================================

pub async fn home<R>(
    State(state): State<SiteAppState<R>>,
    Extension(session): Extension<Session>,
) -> SiteResult<Response>
where
    R: SnippetRepository + Clone + Send + Sync + 'static,
{
    let snippets = state.repo.latest().await?;
    page(
        StatusCode::OK,
        "home.html",
        context! { snippets, ..base_context(&session) },
    )
}

/// View a single snippet
///
/// A non-numeric, non-positive, unknown or expired id all present the
/// same 404 to the client.
pub async fn snippet_view<R>(
    State(state): State<SiteAppState<R>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> SiteResult<Response>
where
    R: SnippetRepository + Clone + Send + Sync + 'static,
{
    let id: i64 = id
        .parse()
        .ok()
        .filter(|id| *id >= 1)
        .ok_or(SiteError::NotFound)?;

    let snippet = state.repo.get(id).await?.ok_or(SiteError::NotFound)?;

    page(
        StatusCode::OK,
        "view.html",
        context! { snippet, ..base_context(&session) },
    )
}

pub async fn snippet_create_form(
    Extension(session): Extension<Session>,
) -> SiteResult<Response> {
    page(
        StatusCode::OK,
        "create.html",
        context! { form => SnippetCreateForm::default(), ..base_context(&session) },
    )
}

pub async fn snippet_create<R>(
    State(state): State<SiteAppState<R>>,
    Extension(session): Extension<Session>,
    form: Result<Form<SnippetCreateForm>, FormRejection>,
) -> SiteResult<Response>
where
    R: SnippetRepository + Clone + Send + Sync + 'static,
{
    let mut form = decode(form)?;

    if !form.validate() {
        return page(
            StatusCode::UNPROCESSABLE_ENTITY,
            "create.html",
            context! { form, ..base_context(&session) },
        );
    }

    let id = state
        .repo
        .insert(&form.title, &form.content, form.expires)
        .await?;

    session.put_string(FLASH_KEY, "Snippet successfully created!");
    Ok(Redirect::to(&format!("/snippet/view/{id}")).into_response())
}

// ============================================================================
// Users
// ============================================================================

pub async fn user_signup_form(Extension(session): Extension<Session>) -> SiteResult<Response> {
    page(
        StatusCode::OK,
        "signup.html",
        context! { form => UserSignupForm::default(), ..base_context(&session) },
    )
}

pub async fn user_signup<R>(
    State(state): State<SiteAppState<R>>,
    Extension(session): Extension<Session>,
    form: Result<Form<UserSignupForm>, FormRejection>,
) -> SiteResult<Response>
where
    R: UserRepository + Clone + Send + Sync + 'static,
{
    let mut form = decode(form)?;

    if !form.validate() {
        return page(
            StatusCode::UNPROCESSABLE_ENTITY,
            "signup.html",
            context! { form, ..base_context(&session) },
        );
    }

    let password = match ClearTextPassword::new(form.password.clone()) {
        Ok(password) => password,
        Err(e) => {
            form.validator.add_field_error("password", e.to_string());
            return page(
                StatusCode::UNPROCESSABLE_ENTITY,
                "signup.html",
                context! { form, ..base_context(&session) },
            );
        }
    };
    let hash = password
        .hash()
        .map_err(|e| SiteError::Internal(e.to_string()))?;

    match state.repo.create(&form.name, &form.email, hash.as_str()).await {
        Ok(()) => {}
        Err(SiteError::DuplicateEmail) => {
            form.validator
                .add_field_error("email", "Email address is already in use");
            return page(
                StatusCode::UNPROCESSABLE_ENTITY,
                "signup.html",
                context! { form, ..base_context(&session) },
            );
        }
        Err(e) => return Err(e),
    }

    session.put_string(FLASH_KEY, "Your signup was successful. Please log in.");
    Ok(Redirect::to("/user/login").into_response())
}

pub async fn user_login_form(Extension(session): Extension<Session>) -> SiteResult<Response> {
    page(
        StatusCode::OK,
        "login.html",
        context! { form => UserLoginForm::default(), ..base_context(&session) },
    )
}

pub async fn user_login<R>(
    State(state): State<SiteAppState<R>>,
    Extension(session): Extension<Session>,
    form: Result<Form<UserLoginForm>, FormRejection>,
) -> SiteResult<Response>
where
    R: UserRepository + Clone + Send + Sync + 'static,
{
    let mut form = decode(form)?;

    if !form.validate() {
        return page(
            StatusCode::UNPROCESSABLE_ENTITY,
            "login.html",
            context! { form, ..base_context(&session) },
        );
    }

    let id = match state.repo.authenticate(&form.email, &form.password).await {
        Ok(id) => id,
        Err(SiteError::InvalidCredentials) => {
            tracing::warn!("Invalid login attempt");
            form.validator
                .add_non_field_error("Email or password is incorrect");
            return page(
                StatusCode::UNPROCESSABLE_ENTITY,
                "login.html",
                context! { form, ..base_context(&session) },
            );
        }
        Err(e) => return Err(e),
    };

    // Privilege change: new session token, new CSRF token
    session.renew_token();
    csrf::rotate(&session);
    session.put_int(AUTH_USER_ID_KEY, id);

    let target = session
        .pop_string(REDIRECT_AFTER_LOGIN_KEY)
        .unwrap_or_else(|| "/snippet/create".to_string());
    Ok(Redirect::to(&target).into_response())
}

pub async fn user_logout(Extension(session): Extension<Session>) -> Response {
    session.renew_token();
    csrf::rotate(&session);
    session.remove(AUTH_USER_ID_KEY);
    session.put_string(FLASH_KEY, "You've been logged out successfully!");
    Redirect::to("/").into_response()
}

// ============================================================================
// Health
// ============================================================================

pub async fn ping() -> &'static str {
    "OK"
}
