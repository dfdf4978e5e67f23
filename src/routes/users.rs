use anyhow::anyhow;
use axum::body::Bytes;
use axum::extract::{Multipart, Path, Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use axum_extra::extract::cookie::SignedCookieJar;
use serde::Deserialize;
use tracing::{info, warn};

use super::PageQuery;
use crate::auth::session::{self, safe_next};
use crate::auth::{flash, password, Category, CurrentUser, MaybeUser};
use crate::error::AppError;
use crate::forms::{FormErrors, LoginForm, RegistrationForm, UpdateAccountForm, Validate};
use crate::models::user::{NewUser, User, UserChanges};
use crate::services::{StoreError, UniqueField};
use crate::state::AppState;
use crate::uploads::{self, Thumbnail};
use crate::views;

fn render_register(
    state: &AppState,
    jar: SignedCookieJar,
    form: &RegistrationForm,
    errors: &FormErrors,
) -> Result<Response, AppError> {
    let mut ctx = views::context("Register");
    ctx.insert("form", form);
    ctx.insert("errors", errors);
    views::render(state, jar, None, "register.html", ctx)
}

pub async fn register_page(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    jar: SignedCookieJar,
) -> Result<Response, AppError> {
    if user.is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    render_register(
        &state,
        jar,
        &RegistrationForm::default(),
        &FormErrors::default(),
    )
}

#[tracing::instrument(skip_all, fields(username = %form.username))]
pub async fn register(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    jar: SignedCookieJar,
    Form(form): Form<RegistrationForm>,
) -> Result<Response, AppError> {
    if user.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    let mut errors = form.validate();
    if errors.get("username").is_empty()
        && state.users.find_by_username(&form.username).await?.is_some()
    {
        errors.taken(UniqueField::Username);
    }
    if errors.get("email").is_empty()
        && state.users.find_by_email(&form.email).await?.is_some()
    {
        errors.taken(UniqueField::Email);
    }
    if !errors.is_empty() {
        return render_register(&state, jar, &form, &errors);
    }

    let hashed = password::hash_password(&form.password)
        .map_err(|e| anyhow!("hashing password: {e}"))?;
    let new_user = NewUser {
        username: form.username.clone(),
        email: form.email.clone(),
        password: hashed,
    };

    match state.users.create_user(&new_user).await {
        Ok(user) => {
            info!(user_id = user.id, "registered");
            let jar = flash::push(
                jar,
                Category::Success,
                "Your account has been created! You are now able to log in.",
            );
            Ok((jar, Redirect::to("/login")).into_response())
        }
        // lost a race with another registration
        Err(StoreError::Conflict(field)) => {
            errors.taken(field);
            render_register(&state, jar, &form, &errors)
        }
        Err(e) => Err(e.into()),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    next: Option<String>,
}

fn render_login(
    state: &AppState,
    jar: SignedCookieJar,
    form: &LoginForm,
    errors: &FormErrors,
) -> Result<Response, AppError> {
    let mut ctx = views::context("Login");
    ctx.insert("form", form);
    ctx.insert("errors", errors);
    views::render(state, jar, None, "login.html", ctx)
}

pub async fn login_page(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    jar: SignedCookieJar,
) -> Result<Response, AppError> {
    if user.is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    render_login(&state, jar, &LoginForm::default(), &FormErrors::default())
}

/// Unknown email and wrong password look the same from outside.
#[tracing::instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Query(query): Query<NextQuery>,
    jar: SignedCookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    if user.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    let errors = form.validate();
    if !errors.is_empty() {
        return render_login(&state, jar, &form, &errors);
    }

    let user = state
        .users
        .find_by_email(&form.email)
        .await?
        .filter(|u| password::verify_password(&form.password, &u.password));

    match user {
        Some(user) => {
            info!(user_id = user.id, remember = form.remember(), "logged in");
            let jar = session::login(jar, &user, form.remember());
            let target = safe_next(query.next.as_deref()).unwrap_or("/");
            Ok((jar, Redirect::to(target)).into_response())
        }
        None => {
            warn!("failed login attempt");
            let jar = flash::push(
                jar,
                Category::Danger,
                "Login Unsuccessful. Please check email and password",
            );
            render_login(&state, jar, &form, &errors)
        }
    }
}

pub async fn logout(jar: SignedCookieJar) -> (SignedCookieJar, Redirect) {
    (session::logout(jar), Redirect::to("/"))
}

fn render_account(
    state: &AppState,
    jar: SignedCookieJar,
    user: &User,
    form: &UpdateAccountForm,
    errors: &FormErrors,
) -> Result<Response, AppError> {
    let mut ctx = views::context("Account");
    ctx.insert("form", form);
    ctx.insert("errors", errors);
    ctx.insert("image_file", &format!("/profile_pics/{}", user.image_file));
    views::render(state, jar, Some(user), "account.html", ctx)
}

pub async fn account_page(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    jar: SignedCookieJar,
) -> Result<Response, AppError> {
    let form = UpdateAccountForm {
        username: user.username.clone(),
        email: user.email.clone(),
    };
    render_account(&state, jar, &user, &form, &FormErrors::default())
}

#[tracing::instrument(skip_all, fields(user_id = user.id))]
pub async fn update_account(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    jar: SignedCookieJar,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut form = UpdateAccountForm::default();
    let mut picture: Option<(String, Bytes)> = None;

    while let Some(field) = multipart.next_field().await.map_err(AppError::bad_request)? {
        let name = field.name().unwrap_or_default().to_owned();
        match name.as_str() {
            "username" => form.username = field.text().await.map_err(AppError::bad_request)?,
            "email" => form.email = field.text().await.map_err(AppError::bad_request)?,
            "picture" => {
                let file_name = field.file_name().unwrap_or_default().to_owned();
                let data = field.bytes().await.map_err(AppError::bad_request)?;
                // browsers send an empty part when no file was chosen
                if !file_name.is_empty() && !data.is_empty() {
                    picture = Some((file_name, data));
                }
            }
            _ => {}
        }
    }

    let mut errors = form.validate();
    let picture = match picture {
        Some((file_name, data)) if uploads::picture_extension(&file_name).is_some() => {
            let decoded =
                tokio::task::spawn_blocking(move || Thumbnail::from_upload(&data)).await?;
            match decoded {
                Ok(thumbnail) => Some(thumbnail),
                Err(e) => {
                    warn!(%e, %file_name, "uploaded picture could not be decoded");
                    errors.add("picture", "File is not a valid image.");
                    None
                }
            }
        }
        Some(_) => {
            errors.add(
                "picture",
                "File does not have an approved extension: jpg, jpeg, png",
            );
            None
        }
        None => None,
    };
    if form.username != user.username
        && errors.get("username").is_empty()
        && state.users.find_by_username(&form.username).await?.is_some()
    {
        errors.taken(UniqueField::Username);
    }
    if form.email != user.email
        && errors.get("email").is_empty()
        && state.users.find_by_email(&form.email).await?.is_some()
    {
        errors.taken(UniqueField::Email);
    }
    if !errors.is_empty() {
        return render_account(&state, jar, &user, &form, &errors);
    }

    let image_file = match picture {
        Some(thumbnail) => Some(uploads::save_picture(&state.upload_dir(), &thumbnail).await?),
        None => None,
    };
    let changes = UserChanges {
        username: form.username.clone(),
        email: form.email.clone(),
        image_file,
    };

    match state.users.update_profile(user.id, &changes).await {
        Ok(_) => {
            info!("updated account");
            let jar = flash::push(jar, Category::Success, "Your account has been updated!");
            Ok((jar, Redirect::to("/account")).into_response())
        }
        Err(StoreError::Conflict(field)) => {
            errors.taken(field);
            render_account(&state, jar, &user, &form, &errors)
        }
        Err(e) => Err(e.into()),
    }
}

/// One author's posts, newest first.
pub async fn user_posts(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
    jar: SignedCookieJar,
) -> Result<Response, AppError> {
    let req = query.page_request(state.config.posts_per_page)?;
    let author = state
        .users
        .find_by_username(&username)
        .await?
        .ok_or_else(AppError::not_found)?;

    let posts = state.posts.posts_by_author(author.id, req).await?;
    if posts.is_out_of_range() {
        return Err(AppError::not_found());
    }

    let mut ctx = views::context(&format!("Posts by {}", author.username));
    ctx.insert("author", &author);
    ctx.insert("posts", &posts);
    views::render(&state, jar, user.as_ref(), "user_posts.html", ctx)
}
