#![allow(dead_code)]

use std::sync::Arc;

use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::header;
use actix_web::{test, web};
use async_trait::async_trait;
use fieldtask::auth::{AuthResponse, RegisterResponse};
use fieldtask::config::{AuthConfig, Config};
use fieldtask::error::AppError;
use fieldtask::mail::{Mail, Mailer, OTP_SUBJECT, RESET_SUBJECT};
use fieldtask::state::AppState;
use fieldtask::store::MemoryStore;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tempfile::TempDir;
use uuid::Uuid;

pub const PASSWORD: &str = "password123";
pub const FRONTEND_URL: &str = "http://frontend.test";

/// Keeps every message instead of delivering it.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<Mail>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<Mail> {
        self.sent.lock().clone()
    }

    fn last(&self, to: &str, subject: &str) -> Option<Mail> {
        self.sent
            .lock()
            .iter()
            .rev()
            .find(|mail| mail.to == to && mail.subject == subject)
            .cloned()
    }

    /// The six-digit code from the latest verification mail to `to`.
    pub fn last_otp(&self, to: &str) -> Option<String> {
        let mail = self.last(to, OTP_SUBJECT)?;
        mail.body
            .split(|c: char| !c.is_ascii_digit())
            .find(|run| run.len() == 6)
            .map(str::to_string)
    }

    /// The token from the latest reset link mailed to `to`.
    pub fn last_reset_token(&self, to: &str) -> Option<String> {
        let mail = self.last(to, RESET_SUBJECT)?;
        let (_, rest) = mail.body.split_once("/reset-password/")?;
        rest.split_whitespace().next().map(str::to_string)
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: Mail) -> Result<(), AppError> {
        self.sent.lock().push(mail);
        Ok(())
    }
}

pub struct TestContext {
    pub state: web::Data<AppState>,
    pub mailer: Arc<RecordingMailer>,
    pub upload_dir: TempDir,
}

impl TestContext {
    pub fn new() -> Self {
        let upload_dir = tempfile::tempdir().expect("Failed to create upload dir");
        let config = Config {
            database_url: None,
            server_port: 0,
            server_host: "127.0.0.1".to_string(),
            auth: AuthConfig {
                jwt_secret: "test-jwt-secret".to_string(),
                activation_secret: "test-activation-secret".to_string(),
                forgot_secret: "test-forgot-secret".to_string(),
                bcrypt_cost: 4,
            },
            frontend_url: format!("{}/", FRONTEND_URL),
            client_url: None,
            upload_dir: upload_dir.path().to_path_buf(),
            max_upload_bytes: 64 * 1024,
        };
        let mailer = Arc::new(RecordingMailer::default());
        let state = AppState::new(Arc::new(MemoryStore::new()), mailer.clone(), &config);

        Self {
            state: web::Data::new(state),
            mailer,
            upload_dir,
        }
    }

    /// Number of files currently in the upload directory.
    pub fn stored_files(&self) -> usize {
        std::fs::read_dir(self.upload_dir.path())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

/// Builds the full application around a [`TestContext`] state.
macro_rules! test_app {
    ($ctx:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data($ctx.state.clone())
                .wrap(actix_web::middleware::Logger::default())
                .configure(fieldtask::routes::public)
                .service(
                    actix_web::web::scope("/api")
                        .wrap(fieldtask::auth::AuthMiddleware)
                        .configure(fieldtask::routes::config),
                ),
        )
        .await
    };
}

pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub token: String,
}

pub fn bearer(token: &str) -> (header::HeaderName, String) {
    (header::AUTHORIZATION, format!("Bearer {}", token))
}

pub async fn read_json(resp: ServiceResponse<impl MessageBody>) -> Value {
    let body = test::read_body(resp).await;
    serde_json::from_slice(&body).unwrap_or_else(|e| {
        panic!(
            "Body is not JSON ({}): {}",
            e,
            String::from_utf8_lossy(&body)
        )
    })
}

/// Registers, verifies and logs in a user with [`PASSWORD`].
pub async fn register_and_login(
    app: &impl Service<
        actix_http::Request,
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
    >,
    ctx: &TestContext,
    name: &str,
    email: &str,
    role: &str,
) -> TestUser {
    let req = test::TestRequest::post()
        .uri("/api/user/register")
        .set_json(json!({
            "name": name,
            "email": email,
            "password": PASSWORD,
            "role": role
        }))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert!(
        resp.status().is_success(),
        "Registration of {} failed with {}",
        email,
        resp.status()
    );
    let registered: RegisterResponse = test::read_body_json(resp).await;

    let otp = ctx.mailer.last_otp(email).expect("No OTP mailed");
    let req = test::TestRequest::post()
        .uri("/api/user/verify-user")
        .set_json(json!({
            "activation_token": registered.activation_token,
            "otp": otp
        }))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::CREATED);

    let req = test::TestRequest::post()
        .uri("/api/user/login")
        .set_json(json!({ "email": email, "password": PASSWORD }))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert!(resp.status().is_success(), "Login of {} failed", email);
    let auth: AuthResponse = test::read_body_json(resp).await;

    TestUser {
        id: auth.user.id,
        email: auth.user.email,
        token: auth.token,
    }
}

/// Creates a task as `supervisor` and returns its id.
pub async fn create_task(
    app: &impl Service<
        actix_http::Request,
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
    >,
    supervisor: &TestUser,
    title: &str,
) -> Uuid {
    let req = test::TestRequest::post()
        .uri("/api/task/create")
        .insert_header(bearer(&supervisor.token))
        .set_json(json!({
            "title": title,
            "description": "Line check",
            "deadline": "2030-01-01T08:00:00Z",
            "priority": "High"
        }))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::CREATED);
    let body = read_json(resp).await;
    body["data"]["id"]
        .as_str()
        .and_then(|id| id.parse().ok())
        .expect("Task id missing")
}

/// Replaces the assignee list of a task and returns the response status and body.
pub async fn assign(
    app: &impl Service<
        actix_http::Request,
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
    >,
    supervisor: &TestUser,
    task_id: Uuid,
    operators: &[Uuid],
) -> (actix_web::http::StatusCode, Value) {
    let req = test::TestRequest::put()
        .uri(&format!("/api/task/{}/assign", task_id))
        .insert_header(bearer(&supervisor.token))
        .set_json(json!({ "assigned_to": operators }))
        .to_request();
    let resp = test::call_service(app, req).await;
    let status = resp.status();
    (status, read_json(resp).await)
}
