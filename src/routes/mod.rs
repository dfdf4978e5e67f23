pub mod pages;
pub mod posts;
pub mod reset;
pub mod users;


use axum::http::header;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::auth::session::{load_session, require_login};
use crate::error::AppError;
use crate::middleware::logging::HttpLoggingExt;
use crate::services::PageRequest;
use crate::state::AppState;

/// `?page=N`. Anything that isn't a number means the first page.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    page: Option<String>,
}

impl PageQuery {
    pub fn page_request(&self, per_page: i64) -> Result<PageRequest, AppError> {
        let page = self
            .page
            .as_deref()
            .and_then(|p| p.trim().parse::<i64>().ok())
            .unwrap_or(1);
        if page < 1 {
            return Err(AppError::not_found());
        }
        Ok(PageRequest::new(page, per_page))
    }
}

/// Ids in paths that aren't integers can't name anything.
pub fn parse_id(raw: &str) -> Result<i32, AppError> {
    raw.parse().map_err(|_| AppError::not_found())
}

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route(
            "/account",
            get(users::account_page).post(users::update_account),
        )
        .route("/post/new", get(posts::new_post_page).post(posts::create_post))
        .route(
            "/post/:id/update",
            get(posts::update_post_page).post(posts::update_post),
        )
        .route("/post/:id/delete", post(posts::delete_post))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_login));

    let public = Router::new()
        .route("/", get(pages::home))
        .route("/home", get(pages::home))
        .route("/about", get(pages::about))
        .route("/register", get(users::register_page).post(users::register))
        .route("/login", get(users::login_page).post(users::login))
        .route("/logout", get(users::logout))
        .route("/post/:id", get(posts::show_post))
        .route("/user/:username", get(users::user_posts))
        .route(
            "/reset_password",
            get(reset::reset_request_page).post(reset::reset_request),
        )
        .route(
            "/reset_password/:token",
            get(reset::reset_token_page).post(reset::reset_token),
        );

    let cached = |dir: &str| {
        ServiceBuilder::new()
            .layer(SetResponseHeaderLayer::if_not_present(
                header::CACHE_CONTROL,
                header::HeaderValue::from_static("max-age=13420"),
            ))
            .layer(CompressionLayer::new())
            .service(ServeDir::new(dir))
    };

    public
        .merge(protected)
        .layer(middleware::from_fn_with_state(state.clone(), load_session))
        .nest_service("/static", cached(&state.config.static_dir))
        .nest_service("/profile_pics", cached(&state.config.upload_dir))
        .with_http_logging()
        .with_state(state)
}
