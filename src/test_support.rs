//! Harness for driving the real router in tests: in-memory store, captured mail,
//! throwaway upload dir and a client that keeps cookies between requests.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use axum::async_trait;
use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
use axum::http::{HeaderValue, Request, StatusCode};
use axum::Router;
use axum_extra::extract::cookie::Key;
use tempfile::TempDir;
use tera::Tera;
use tower::ServiceExt;

use crate::config::AppConfig;
use crate::mail::{Mailer, Message};
use crate::routes;
use crate::services::memory::MemoryStore;
use crate::state::AppState;

#[derive(Default)]
pub struct MemoryMailer {
    pub sent: Mutex<Vec<Message>>,
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, message: Message) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: MemoryStore,
    pub mailer: Arc<MemoryMailer>,
    pub uploads: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        let uploads = tempfile::tempdir().unwrap();
        let config = AppConfig {
            templates: concat!(env!("CARGO_MANIFEST_DIR"), "/templates/**/*").into(),
            upload_dir: uploads.path().to_string_lossy().into_owned(),
            ..AppConfig::default()
        };
        let tera = Tera::new(&config.templates).unwrap();
        let store = MemoryStore::new();
        let mailer = Arc::new(MemoryMailer::default());

        let state = AppState::new(
            config,
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            mailer.clone(),
            tera,
            Key::generate(),
        );
        Self {
            router: routes::router(state.clone()),
            state,
            store,
            mailer,
            uploads,
        }
    }

    /// A fresh browser: same app, no cookies.
    pub fn client(&self) -> TestClient {
        TestClient {
            app: self.router.clone(),
            cookies: BTreeMap::new(),
        }
    }

    /// Registers and logs in, returning the signed-in client.
    pub async fn signed_in(&self, username: &str, password: &str) -> TestClient {
        let mut client = self.client();
        let email = format!("{username}@blog.com");
        let res = client.register(username, &email, password).await;
        assert_eq!(res.location.as_deref(), Some("/login"), "{}", res.body);
        let res = client.login(&email, password).await;
        assert_eq!(res.status, StatusCode::SEE_OTHER, "{}", res.body);
        client
    }

    pub fn sent_mail(&self) -> Vec<Message> {
        self.mailer.sent.lock().unwrap().clone()
    }
}

#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    pub body: String,
}

pub enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        file_name: &'a str,
        bytes: &'a [u8],
    },
}

pub struct TestClient {
    app: Router,
    cookies: BTreeMap<String, String>,
}

impl TestClient {
    pub fn has_cookie(&self, name: &str) -> bool {
        self.cookies.contains_key(name)
    }

    pub async fn get(&mut self, uri: &str) -> TestResponse {
        self.send(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_form(&mut self, uri: &str, fields: &[(&str, &str)]) -> TestResponse {
        let body = serde_urlencoded::to_string(fields).unwrap();
        let req = Request::post(uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap();
        self.send(req).await
    }

    pub async fn post_multipart(&mut self, uri: &str, parts: &[Part<'_>]) -> TestResponse {
        const BOUNDARY: &str = "X-TEST-BOUNDARY";

        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match part {
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n")
                            .as_bytes(),
                    );
                    body.extend_from_slice(value.as_bytes());
                }
                Part::File {
                    name,
                    file_name,
                    bytes,
                } => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                             Content-Type: application/octet-stream\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(bytes);
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let req = Request::post(uri)
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();
        self.send(req).await
    }

    pub async fn register(&mut self, username: &str, email: &str, password: &str) -> TestResponse {
        self.post_form(
            "/register",
            &[
                ("username", username),
                ("email", email),
                ("password", password),
                ("confirm_password", password),
            ],
        )
        .await
    }

    pub async fn login(&mut self, email: &str, password: &str) -> TestResponse {
        self.post_form("/login", &[("email", email), ("password", password)])
            .await
    }

    async fn send(&mut self, mut req: Request<Body>) -> TestResponse {
        if !self.cookies.is_empty() {
            let header = self
                .cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; ");
            req.headers_mut()
                .insert(COOKIE, HeaderValue::from_str(&header).unwrap());
        }

        let res = self.app.clone().oneshot(req).await.unwrap();

        for set_cookie in res.headers().get_all(SET_COOKIE) {
            let raw = set_cookie.to_str().unwrap();
            let pair = raw.split(';').next().unwrap_or_default();
            let Some((name, value)) = pair.split_once('=') else {
                continue;
            };
            if value.is_empty() || raw.contains("Max-Age=0") {
                self.cookies.remove(name.trim());
            } else {
                self.cookies
                    .insert(name.trim().to_owned(), value.to_owned());
            }
        }

        let status = res.status();
        let location = res
            .headers()
            .get(LOCATION)
            .map(|l| l.to_str().unwrap().to_owned());
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();

        TestResponse {
            status,
            location,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }
}
