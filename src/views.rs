use axum::response::{Html, IntoResponse, Response};
use axum_extra::extract::cookie::SignedCookieJar;
use tera::Context;

use crate::auth::flash;
use crate::error::AppError;
use crate::models::user::User;
use crate::state::AppState;

pub fn context(title: &str) -> Context {
    let mut ctx = Context::new();
    ctx.insert("title", title);
    ctx
}

/// Renders a full page, consuming any pending flash messages.
pub fn render(
    state: &AppState,
    jar: SignedCookieJar,
    user: Option<&User>,
    template: &str,
    mut ctx: Context,
) -> Result<Response, AppError> {
    let (jar, flashes) = flash::take(jar);
    ctx.insert("current_user", &user);
    ctx.insert("flashes", &flashes);

    let html = state.tera.render(template, &ctx)?;
    Ok((jar, Html(html)).into_response())
}
