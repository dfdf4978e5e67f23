//! Login sessions: a signed cookie holding the user id, resolved once per request
//! into a [`Session`] request extension.

use std::convert::Infallible;

use axum::async_trait;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, SameSite, SignedCookieJar};

use super::flash::{self, Category};
use crate::error::AppError;
use crate::models::user::User;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "session";

const REMEMBER_ME_DAYS: i64 = 365;

/// Request-scoped view of who is signed in.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub user: Option<User>,
}

pub fn session_user_id(jar: &SignedCookieJar) -> Option<i32> {
    jar.get(SESSION_COOKIE)?.value().parse().ok()
}

/// Without `remember` the cookie ends with the browser session.
pub fn login(jar: SignedCookieJar, user: &User, remember: bool) -> SignedCookieJar {
    let mut cookie = Cookie::build((SESSION_COOKIE, user.id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);
    if remember {
        cookie = cookie.max_age(time::Duration::days(REMEMBER_ME_DAYS));
    }
    jar.add(cookie)
}

pub fn logout(jar: SignedCookieJar) -> SignedCookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}

/// `next` targets must stay on this site.
pub fn safe_next(next: Option<&str>) -> Option<&str> {
    next.filter(|n| n.starts_with('/') && !n.starts_with("//") && !n.contains('\\'))
}

pub fn login_url(next: &str) -> String {
    match serde_urlencoded::to_string([("next", next)]) {
        Ok(query) => format!("/login?{query}"),
        Err(_) => "/login".to_owned(),
    }
}

pub async fn load_session(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = match session_user_id(&jar) {
        Some(id) => state.users.find_by_id(id).await?,
        None => None,
    };
    req.extensions_mut().insert(Session { user });
    Ok(next.run(req).await)
}

/// Gate for routes that need a signed-in user. Sends everyone else to the login page
/// with a `next` pointing back here.
pub async fn require_login(jar: SignedCookieJar, req: Request, next: Next) -> Response {
    let signed_in = req
        .extensions()
        .get::<Session>()
        .is_some_and(|s| s.user.is_some());
    if signed_in {
        return next.run(req).await;
    }

    let path = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    tracing::debug!(path, "anonymous request to protected route");

    let jar = flash::push(jar, Category::Info, "Please log in to access this page.");
    (jar, Redirect::to(&login_url(path))).into_response()
}

/// The signed-in user. Only use behind [`require_login`].
pub struct CurrentUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .and_then(|s| s.user.clone())
            .map(CurrentUser)
            .ok_or_else(|| Redirect::to("/login"))
    }
}

pub struct MaybeUser(pub Option<User>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(
            parts
                .extensions
                .get::<Session>()
                .and_then(|s| s.user.clone()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use axum_extra::extract::cookie::Key;

    use super::*;

    fn corey() -> User {
        User {
            id: 12,
            username: "corey".into(),
            email: "corey@blog.com".into(),
            image_file: "default.jpg".into(),
            password: "hash".into(),
        }
    }

    #[test]
    fn login_then_logout() {
        let jar = SignedCookieJar::new(Key::generate());
        let jar = login(jar, &corey(), false);
        assert_eq!(session_user_id(&jar), Some(12));

        let jar = logout(jar);
        assert_eq!(session_user_id(&jar), None);
    }

    #[test]
    fn remember_me_makes_the_cookie_persistent() {
        let jar = login(SignedCookieJar::new(Key::generate()), &corey(), true);
        let cookie = jar.get(SESSION_COOKIE).unwrap();
        assert_eq!(cookie.max_age(), Some(time::Duration::days(365)));

        let jar = login(SignedCookieJar::new(Key::generate()), &corey(), false);
        assert_eq!(jar.get(SESSION_COOKIE).unwrap().max_age(), None);
    }

    #[test]
    fn next_must_be_local() {
        assert_eq!(safe_next(Some("/account")), Some("/account"));
        assert_eq!(safe_next(Some("//evil.example")), None);
        assert_eq!(safe_next(Some("https://evil.example")), None);
        assert_eq!(safe_next(Some("/\\evil.example")), None);
        assert_eq!(safe_next(None), None);
    }

    #[test]
    fn login_url_encodes_next() {
        assert_eq!(login_url("/post/new"), "/login?next=%2Fpost%2Fnew");
    }
}
