//! Password reset by emailed token.

use anyhow::anyhow;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use axum_extra::extract::cookie::SignedCookieJar;
use tracing::info;

use crate::auth::{flash, password, Category, MaybeUser};
use crate::error::AppError;
use crate::forms::{FormErrors, RequestResetForm, ResetPasswordForm, Validate};
use crate::mail;
use crate::models::user::User;
use crate::state::AppState;
use crate::views;

fn render_request(
    state: &AppState,
    jar: SignedCookieJar,
    form: &RequestResetForm,
    errors: &FormErrors,
) -> Result<Response, AppError> {
    let mut ctx = views::context("Reset Password");
    ctx.insert("form", form);
    ctx.insert("errors", errors);
    views::render(state, jar, None, "reset_request.html", ctx)
}

pub async fn reset_request_page(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    jar: SignedCookieJar,
) -> Result<Response, AppError> {
    if user.is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    render_request(
        &state,
        jar,
        &RequestResetForm::default(),
        &FormErrors::default(),
    )
}

#[tracing::instrument(skip_all)]
pub async fn reset_request(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    jar: SignedCookieJar,
    Form(form): Form<RequestResetForm>,
) -> Result<Response, AppError> {
    if user.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    let mut errors = form.validate();
    let account = if errors.is_empty() {
        state.users.find_by_email(&form.email).await?
    } else {
        None
    };
    let Some(account) = account else {
        if errors.is_empty() {
            errors.add(
                "email",
                "There is no account with that email. You must register first.",
            );
        }
        return render_request(&state, jar, &form, &errors);
    };

    let token = state.reset_tokens.issue(&account)?;
    let link = format!(
        "{}/reset_password/{}",
        state.config.public_url.trim_end_matches('/'),
        token
    );
    state
        .mailer
        .send(mail::reset_email(
            &state.config.mail_sender,
            &account.email,
            &link,
        ))
        .await?;
    info!(user_id = account.id, "sent password reset email");

    let jar = flash::push(
        jar,
        Category::Info,
        "An email has been sent with instructions to reset your password.",
    );
    Ok((jar, Redirect::to("/login")).into_response())
}

/// The user a token was issued to, provided the token is genuine, unexpired, and the
/// password hasn't changed since.
async fn user_for_token(state: &AppState, token: &str) -> Result<Option<User>, AppError> {
    let claims = match state.reset_tokens.verify(token) {
        Ok(claims) => claims,
        Err(e) => {
            info!(%e, "rejected reset token");
            return Ok(None);
        }
    };
    let user = state.users.find_by_id(claims.user_id).await?;
    Ok(user.filter(|u| state.reset_tokens.is_current(&claims, u)))
}

fn rejected(jar: SignedCookieJar) -> Response {
    let jar = flash::push(jar, Category::Warning, "That is an invalid or expired token");
    (jar, Redirect::to("/reset_password")).into_response()
}

fn render_reset(
    state: &AppState,
    jar: SignedCookieJar,
    errors: &FormErrors,
) -> Result<Response, AppError> {
    let mut ctx = views::context("Reset Password");
    ctx.insert("form", &ResetPasswordForm::default());
    ctx.insert("errors", errors);
    views::render(state, jar, None, "reset_token.html", ctx)
}

pub async fn reset_token_page(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(token): Path<String>,
    jar: SignedCookieJar,
) -> Result<Response, AppError> {
    if user.is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    if user_for_token(&state, &token).await?.is_none() {
        return Ok(rejected(jar));
    }
    render_reset(&state, jar, &FormErrors::default())
}

#[tracing::instrument(skip_all)]
pub async fn reset_token(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(token): Path<String>,
    jar: SignedCookieJar,
    Form(form): Form<ResetPasswordForm>,
) -> Result<Response, AppError> {
    if user.is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    let Some(account) = user_for_token(&state, &token).await? else {
        return Ok(rejected(jar));
    };

    let errors = form.validate();
    if !errors.is_empty() {
        return render_reset(&state, jar, &errors);
    }

    let hashed = password::hash_password(&form.password)
        .map_err(|e| anyhow!("hashing password: {e}"))?;
    state.users.set_password(account.id, &hashed).await?;
    info!(user_id = account.id, "password reset");

    let jar = flash::push(
        jar,
        Category::Success,
        "Your password has been updated! You are now able to log in",
    );
    Ok((jar, Redirect::to("/login")).into_response())
}
