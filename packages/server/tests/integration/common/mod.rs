use std::net::SocketAddr;
use std::sync::Arc;

use ::common::storage::filesystem::FilesystemBlobStore;
use ::common::{BlobName, BlobStore, MagicBytesDetector};
use reqwest::{Client, RequestBuilder};
use sea_orm::{ColumnTrait, ConnectOptions, Database, DatabaseConnection, EntityTrait, QueryFilter};
use serde_json::{Value, json};
use tempfile::TempDir;

use forum_server::config::{
    AppConfig, AuthConfig, CorsConfig, DatabaseConfig, ReclaimConfig, ServerConfig, StorageConfig,
};
use forum_server::entity::file_attachment;
use forum_server::state::AppState;

/// Password that satisfies the signup rules; used for every test account.
pub const PASSWORD: &str = "P4ssword";

/// Smallest payload the detector recognizes as PNG.
pub const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR\x00\x00\x00\x01\x00\x00\x00\x01";

/// Recognized as GIF.
pub const GIF: &[u8] = b"GIF89a\x01\x00\x01\x00\x00\x00\x00;";

/// Recognized as PDF, which attachments do not accept.
pub const PDF: &[u8] = b"%PDF-1.7\n%\xe2\xe3\xcf\xd3\n";

pub mod routes {
    pub const LOGIN: &str = "/api/v1/auth/login";
    pub const USERS: &str = "/api/v1/users";
    pub const DISCUSSIONS: &str = "/api/v1/discussions";
    pub const UPLOAD: &str = "/api/v1/discussions/upload";

    pub fn user(username: &str) -> String {
        format!("/api/v1/users/{username}")
    }

    pub fn user_discussions(username: &str) -> String {
        format!("/api/v1/users/{username}/discussions")
    }

    pub fn user_feed(username: &str, anchor: i64) -> String {
        format!("/api/v1/users/{username}/discussions/{anchor}")
    }

    pub fn discussion(id: i64) -> String {
        format!("/api/v1/discussions/{id}")
    }

    pub fn attachment_image(name: &str) -> String {
        format!("/api/v1/images/attachments/{name}")
    }

    pub fn profile_image(name: &str) -> String {
        format!("/api/v1/images/profile/{name}")
    }
}

/// A signed-up account and the credentials to act as it.
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: i64,
    pub username: String,
    pub password: String,
}

/// A running test server backed by a throwaway SQLite file and upload directory.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub db: DatabaseConnection,
    pub attachments: Arc<FilesystemBlobStore>,
    pub profile_images: Arc<FilesystemBlobStore>,
    _dir: TempDir,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    /// Raw response body as text.
    pub text: String,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
    pub headers: reqwest::header::HeaderMap,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");

        let db_url = format!("sqlite://{}?mode=rwc", dir.path().join("forum.db").display());
        let mut opts = ConnectOptions::new(&db_url);
        opts.max_connections(5).min_connections(1).sqlx_logging(false);
        let db = Database::connect(opts)
            .await
            .expect("Failed to connect to test database");
        forum_server::database::sync_schema(&db)
            .await
            .expect("Failed to create schema");
        forum_server::seed::ensure_indexes(&db)
            .await
            .expect("Failed to create indexes");

        let storage = StorageConfig {
            upload_path: dir.path().join("uploads"),
            max_attachment_size: 64 * 1024,
            max_profile_image_size: 16 * 1024,
        };
        let attachments = Arc::new(
            FilesystemBlobStore::new(storage.attachments_path(), storage.max_attachment_size)
                .await
                .expect("Failed to open attachment store"),
        );
        let profile_images = Arc::new(
            FilesystemBlobStore::new(storage.profile_images_path(), storage.max_profile_image_size)
                .await
                .expect("Failed to open profile image store"),
        );

        let app_config = AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors: CorsConfig {
                    allow_origins: vec![],
                    max_age: 3600,
                },
            },
            database: DatabaseConfig {
                url: db_url,
                seed_dev_users: false,
            },
            auth: AuthConfig {
                jwt_secret: "test-secret-for-integration-tests".to_string(),
                token_ttl_hours: 1,
            },
            storage,
            reclaim: ReclaimConfig::default(),
        };

        let state = AppState {
            db: db.clone(),
            config: app_config,
            attachments: attachments.clone(),
            profile_images: profile_images.clone(),
            detector: Arc::new(MagicBytesDetector),
        };

        let app = forum_server::build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            client: Client::new(),
            db,
            attachments,
            profile_images,
            _dir: dir,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn send(&self, request: RequestBuilder) -> TestResponse {
        let res = request.send().await.expect("Failed to send request");
        TestResponse::from_response(res).await
    }

    fn as_user(request: RequestBuilder, user: &TestUser) -> RequestBuilder {
        request.basic_auth(&user.username, Some(&user.password))
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.send(self.client.get(self.url(path))).await
    }

    pub async fn get_as(&self, path: &str, user: &TestUser) -> TestResponse {
        self.send(Self::as_user(self.client.get(self.url(path)), user))
            .await
    }

    pub async fn get_with_header(&self, path: &str, name: &str, value: &str) -> TestResponse {
        self.send(self.client.get(self.url(path)).header(name, value))
            .await
    }

    pub async fn post(&self, path: &str, body: &Value) -> TestResponse {
        self.send(self.client.post(self.url(path)).json(body)).await
    }

    pub async fn post_as(&self, path: &str, body: &Value, user: &TestUser) -> TestResponse {
        self.send(Self::as_user(self.client.post(self.url(path)).json(body), user))
            .await
    }

    pub async fn put_as(&self, path: &str, body: &Value, user: &TestUser) -> TestResponse {
        self.send(Self::as_user(self.client.put(self.url(path)).json(body), user))
            .await
    }

    pub async fn delete_as(&self, path: &str, user: &TestUser) -> TestResponse {
        self.send(Self::as_user(self.client.delete(self.url(path)), user))
            .await
    }

    pub async fn upload_as(&self, file_name: &str, bytes: &[u8], user: &TestUser) -> TestResponse {
        let part = reqwest::multipart::Part::bytes(bytes.to_vec()).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);
        self.send(Self::as_user(
            self.client.post(self.url(routes::UPLOAD)).multipart(form),
            user,
        ))
        .await
    }

    /// Sign up `username` with [`PASSWORD`] and return its credentials.
    pub async fn create_user(&self, username: &str) -> TestUser {
        let res = self
            .post(
                routes::USERS,
                &json!({
                    "username": username,
                    "display_name": format!("{username} display"),
                    "password": PASSWORD,
                }),
            )
            .await;
        assert_eq!(res.status, 201, "Signup failed: {}", res.text);

        let res = self.get(&routes::user(username)).await;
        assert_eq!(res.status, 200, "User lookup failed: {}", res.text);

        TestUser {
            id: res.id(),
            username: username.to_string(),
            password: PASSWORD.to_string(),
        }
    }

    /// Create a discussion via the API and return its `id`.
    pub async fn create_discussion(&self, user: &TestUser, content: &str) -> i64 {
        let res = self
            .post_as(routes::DISCUSSIONS, &json!({ "content": content }), user)
            .await;
        assert_eq!(res.status, 201, "create_discussion failed: {}", res.text);
        res.id()
    }

    /// Upload a PNG attachment and return its `(id, name)`.
    pub async fn upload_png(&self, user: &TestUser) -> (i64, String) {
        let res = self.upload_as("photo.png", PNG, user).await;
        assert_eq!(res.status, 201, "upload failed: {}", res.text);
        (res.id(), res.body["name"].as_str().unwrap().to_string())
    }

    pub async fn attachment_record(&self, id: i64) -> Option<file_attachment::Model> {
        file_attachment::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .expect("DB query failed")
    }

    pub async fn attachment_by_name(&self, name: &str) -> Option<file_attachment::Model> {
        file_attachment::Entity::find()
            .filter(file_attachment::Column::Name.eq(name))
            .one(&self.db)
            .await
            .expect("DB query failed")
    }

    pub async fn attachment_blob_exists(&self, name: &str) -> bool {
        self.attachments
            .exists(&BlobName::parse(name).expect("stored name should parse"))
            .await
            .expect("blob lookup failed")
    }
}

impl TestResponse {
    pub async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let headers = res.headers().clone();
        let text = res.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Self {
            status,
            text,
            body,
            headers,
        }
    }

    pub fn id(&self) -> i64 {
        self.body["id"]
            .as_i64()
            .expect("response body should contain 'id'")
    }

    /// Ids of the discussions in a `{data: [...]}` page or a bare array.
    pub fn ids(&self) -> Vec<i64> {
        let items = match &self.body {
            Value::Array(items) => items,
            other => other["data"]
                .as_array()
                .expect("response body should contain 'data'"),
        };
        items.iter().map(|d| d["id"].as_i64().unwrap()).collect()
    }
}
