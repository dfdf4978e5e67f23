use axum::extract::{Query, State};
use axum::response::Response;
use axum_extra::extract::cookie::SignedCookieJar;

use super::PageQuery;
use crate::auth::MaybeUser;
use crate::error::AppError;
use crate::state::AppState;
use crate::views;

/// Everyone's posts, newest first.
#[tracing::instrument(skip_all)]
pub async fn home(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Query(query): Query<PageQuery>,
    jar: SignedCookieJar,
) -> Result<Response, AppError> {
    let req = query.page_request(state.config.posts_per_page)?;
    let posts = state.posts.recent_posts(req).await?;
    if posts.is_out_of_range() {
        return Err(AppError::not_found());
    }

    let mut ctx = views::context("Home");
    ctx.insert("posts", &posts);
    views::render(&state, jar, user.as_ref(), "home.html", ctx)
}

pub async fn about(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    jar: SignedCookieJar,
) -> Result<Response, AppError> {
    views::render(&state, jar, user.as_ref(), "about.html", views::context("About"))
}
