use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use axum_extra::extract::cookie::SignedCookieJar;
use tracing::{info, warn};

use super::parse_id;
use crate::auth::{flash, Category, CurrentUser, MaybeUser};
use crate::error::AppError;
use crate::forms::{FormErrors, PostForm, Validate};
use crate::models::post::{NewPost, PostChanges, PostWithAuthor};
use crate::models::user::User;
use crate::state::AppState;
use crate::views;

/// Loads a post the acting user is about to change. Missing posts are a 404 before
/// ownership is even considered.
async fn owned_post(
    state: &AppState,
    raw_id: &str,
    user: &User,
) -> Result<PostWithAuthor, AppError> {
    let id = parse_id(raw_id)?;
    let entry = state
        .posts
        .get_post(id)
        .await?
        .ok_or_else(AppError::not_found)?;

    if !entry.post.is_owned_by(user.id) {
        warn!(
            post_id = id,
            user_id = user.id,
            owner_id = entry.post.user_id,
            "refused change to someone else's post"
        );
        return Err(AppError::forbidden());
    }
    Ok(entry)
}

fn render_editor(
    state: &AppState,
    jar: SignedCookieJar,
    user: &User,
    legend: &str,
    form: &PostForm,
    errors: &FormErrors,
) -> Result<Response, AppError> {
    let mut ctx = views::context(legend);
    ctx.insert("legend", legend);
    ctx.insert("form", form);
    ctx.insert("errors", errors);
    views::render(state, jar, Some(user), "create_post.html", ctx)
}

pub async fn new_post_page(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    jar: SignedCookieJar,
) -> Result<Response, AppError> {
    render_editor(
        &state,
        jar,
        &user,
        "New Post",
        &PostForm::default(),
        &FormErrors::default(),
    )
}

#[tracing::instrument(skip_all, fields(user_id = user.id))]
pub async fn create_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    jar: SignedCookieJar,
    Form(form): Form<PostForm>,
) -> Result<Response, AppError> {
    let errors = form.validate();
    if !errors.is_empty() {
        return render_editor(&state, jar, &user, "New Post", &form, &errors);
    }

    let post = state
        .posts
        .create_post(&NewPost {
            title: form.title,
            content: form.content,
            user_id: user.id,
        })
        .await?;
    info!(post_id = post.id, "created post");

    let jar = flash::push(jar, Category::Success, "Your post has been created!");
    Ok((jar, Redirect::to("/")).into_response())
}

pub async fn show_post(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<String>,
    jar: SignedCookieJar,
) -> Result<Response, AppError> {
    let id = parse_id(&id)?;
    let entry = state
        .posts
        .get_post(id)
        .await?
        .ok_or_else(AppError::not_found)?;

    let mut ctx = views::context(&entry.post.title);
    ctx.insert("entry", &entry);
    views::render(&state, jar, user.as_ref(), "post.html", ctx)
}

pub async fn update_post_page(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    jar: SignedCookieJar,
) -> Result<Response, AppError> {
    let entry = owned_post(&state, &id, &user).await?;
    let form = PostForm {
        title: entry.post.title,
        content: entry.post.content,
    };
    render_editor(
        &state,
        jar,
        &user,
        "Update Post",
        &form,
        &FormErrors::default(),
    )
}

#[tracing::instrument(skip_all, fields(user_id = user.id, post_id = %id))]
pub async fn update_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    jar: SignedCookieJar,
    Form(form): Form<PostForm>,
) -> Result<Response, AppError> {
    let entry = owned_post(&state, &id, &user).await?;

    let errors = form.validate();
    if !errors.is_empty() {
        return render_editor(&state, jar, &user, "Update Post", &form, &errors);
    }

    let post = state
        .posts
        .update_post(
            entry.post.id,
            &PostChanges {
                title: form.title,
                content: form.content,
            },
        )
        .await?;
    info!("updated post");

    let jar = flash::push(jar, Category::Success, "Your post has been updated!");
    Ok((jar, Redirect::to(&format!("/post/{}", post.id))).into_response())
}

#[tracing::instrument(skip_all, fields(user_id = user.id, post_id = %id))]
pub async fn delete_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    jar: SignedCookieJar,
) -> Result<Response, AppError> {
    let entry = owned_post(&state, &id, &user).await?;
    state.posts.delete_post(entry.post.id).await?;
    info!("deleted post");

    let jar = flash::push(jar, Category::Success, "Your post has been deleted!");
    Ok((jar, Redirect::to("/")).into_response())
}
