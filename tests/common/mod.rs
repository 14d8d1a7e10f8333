use std::env;
use std::sync::Arc;

use anyhow::{anyhow, ensure, Context, Result};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::PgConnection;
use diesel_migrations::MigrationHarness;
use faculty_reporting::auth::jwt::JwtService;
use faculty_reporting::auth::password::hash_password;
use faculty_reporting::config::AppConfig;
use faculty_reporting::db::{self, PgPool, MIGRATIONS};
use faculty_reporting::mailer::{Mailer, OutgoingMail};
use faculty_reporting::models::NewUser;
use faculty_reporting::routes;
use faculty_reporting::state::AppState;
use http_body_util::BodyExt;
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tower::util::ServiceExt;
use uuid::Uuid;

static DB_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

pub const PASSWORD: &str = "s3cret-pass";

#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingMail>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<()> {
        self.sent.lock().await.push(mail);
        Ok(())
    }
}

impl RecordingMailer {
    #[allow(dead_code)]
    pub async fn sent_to(&self, address: &str) -> Vec<OutgoingMail> {
        let guard = self.sent.lock().await;
        guard.iter().filter(|m| m.to == address).cloned().collect()
    }
}

pub struct TestApp {
    pub state: AppState,
    router: Router,
    mailer: Arc<RecordingMailer>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Result<Value> {
        serde_json::from_slice(&self.body)
            .with_context(|| format!("response body is not JSON (status {})", self.status))
    }

    #[allow(dead_code)]
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    #[allow(dead_code)]
    pub fn error(&self) -> Result<String> {
        let body = self.json()?;
        body["error"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("response has no error message: {body}"))
    }
}

impl TestApp {
    /// Returns `None` when no test database is configured so the suite can
    /// run on machines without Postgres.
    pub async fn new() -> Result<Option<Self>> {
        let Ok(database_url) = env::var("TEST_DATABASE_URL") else {
            eprintln!("TEST_DATABASE_URL not set; skipping database test");
            return Ok(None);
        };

        let config = AppConfig {
            database_url,
            database_max_pool_size: db::DEFAULT_MAX_POOL_SIZE,
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            jwt_secret: "test-secret".to_string(),
            jwt_issuer: "test-issuer".to_string(),
            jwt_audience: "test-audience".to_string(),
            jwt_expiry_minutes: 60,
            refresh_token_expiry_days: 30,
            refresh_cookie_secure: false,
            refresh_cookie_domain: None,
            cors_allowed_origin: None,
            default_academic_year: "2024".to_string(),
            default_semester: "1".to_string(),
        };

        let pool = db::init_pool_with_size(&config.database_url, config.database_max_pool_size)?;
        prepare_database(&pool).await?;

        let mailer = Arc::new(RecordingMailer::default());
        let mailer_for_state: Arc<dyn Mailer> = mailer.clone();
        let jwt = JwtService::from_config(&config)?;
        let state = AppState::new(pool, config, jwt, mailer_for_state);
        let router = routes::create_router(state.clone());

        Ok(Some(Self {
            state,
            router,
            mailer,
        }))
    }

    pub async fn cleanup(&self) -> Result<()> {
        self.with_conn(truncate_all).await
    }

    #[allow(dead_code)]
    pub fn mailer(&self) -> Arc<RecordingMailer> {
        self.mailer.clone()
    }

    pub async fn insert_user(
        &self,
        email: &str,
        name: &str,
        role: &str,
        faculty: &str,
        approved: bool,
    ) -> Result<Uuid> {
        let user = NewUser {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: hash_password(PASSWORD)?,
            name: name.to_string(),
            role: role.to_string(),
            faculty: faculty.to_string(),
            program: None,
            class_id: None,
            is_approved: approved,
        };
        self.with_conn(move |conn| {
            diesel::insert_into(faculty_reporting::schema::users::table)
                .values(&user)
                .execute(conn)
                .context("failed to insert user")?;
            Ok(user.id)
        })
        .await
    }

    pub async fn login_token(&self, email: &str) -> Result<String> {
        let response = self
            .post_json(
                "/api/auth/login",
                &serde_json::json!({ "email": email, "password": PASSWORD }),
                None,
            )
            .await?;
        ensure!(
            response.status == StatusCode::OK,
            "login failed with status {}",
            response.status
        );

        #[derive(serde::Deserialize)]
        struct LoginResponse {
            access_token: String,
        }
        let parsed: LoginResponse = response.parse()?;
        Ok(parsed.access_token)
    }

    /// Inserts an approved account and signs it in.
    #[allow(dead_code)]
    pub async fn signed_in(
        &self,
        email: &str,
        name: &str,
        role: &str,
        faculty: &str,
    ) -> Result<(Uuid, String)> {
        let id = self.insert_user(email, name, role, faculty, true).await?;
        let token = self.login_token(email).await?;
        Ok((id, token))
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<TestResponse> {
        self.send_json(Method::POST, path, payload, token).await
    }

    #[allow(dead_code)]
    pub async fn patch_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<TestResponse> {
        self.send_json(Method::PATCH, path, payload, token).await
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<TestResponse> {
        let mut builder = Request::builder().method(Method::GET).uri(path);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        self.dispatch(builder.body(Body::empty())?).await
    }

    /// Posts `body` untouched, for payloads serde_json would never produce.
    #[allow(dead_code)]
    pub async fn post_raw(
        &self,
        path: &str,
        body: &str,
        token: Option<&str>,
    ) -> Result<TestResponse> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        self.dispatch(builder.body(Body::from(body.to_string()))?).await
    }

    #[allow(dead_code)]
    pub async fn post_with_cookie(&self, path: &str, cookie: &str) -> Result<TestResponse> {
        let request = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header("cookie", cookie)
            .body(Body::empty())?;
        self.dispatch(request).await
    }

    async fn send_json<T: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<TestResponse> {
        let body = serde_json::to_vec(payload)?;
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        self.dispatch(builder.body(Body::from(body))?).await
    }

    async fn dispatch(&self, request: Request<Body>) -> Result<TestResponse> {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response");
        let status = response.status();
        let headers = response.headers().clone();
        let collected = response
            .into_body()
            .collect()
            .await
            .map_err(|err| anyhow!("failed to read response body: {err}"))?;
        Ok(TestResponse {
            status,
            headers,
            body: collected.to_bytes().to_vec(),
        })
    }

    #[allow(dead_code)]
    pub async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut PgConnection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.state.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|err| anyhow!("failed to get database connection: {err}"))?;
            f(&mut conn)
        })
        .await
        .context("connection task panicked")?
    }
}

pub async fn acquire_db_lock() -> tokio::sync::MutexGuard<'static, ()> {
    DB_LOCK.lock().await
}

async fn prepare_database(pool: &PgPool) -> Result<()> {
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || -> Result<()> {
        let mut conn = pool
            .get()
            .map_err(|err| anyhow!("failed to acquire connection: {err}"))?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|err| anyhow!("failed to run migrations: {err}"))?;
        truncate_all(&mut conn)?;
        Ok(())
    })
    .await
    .context("migration task panicked")?
}

fn truncate_all(conn: &mut PgConnection) -> Result<()> {
    conn.batch_execute(
        "TRUNCATE TABLE notifications, ratings, complaint_responses, complaints, \
         student_signatures, lecture_reports, assignments, classes, courses, \
         refresh_tokens, users RESTART IDENTITY CASCADE;",
    )
    .context("failed to truncate tables")?;
    Ok(())
}
