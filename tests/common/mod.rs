#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use tempfile::TempDir;

use communifridge::config::Config;

pub struct TestApp {
    pub router: Router,
    pub db: SqlitePool,
    _dir: Option<TempDir>,
}

impl TestApp {
    pub async fn new() -> Self {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .unwrap()
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .expect("Failed to create in-memory SQLite pool");

        communifridge::db::migrate(&pool)
            .await
            .expect("Failed to run migrations");

        let router = communifridge::build_app(pool.clone(), &Config::default())
            .await
            .expect("Failed to build app");

        Self {
            router,
            db: pool,
            _dir: None,
        }
    }

    /// An app over a SQLite file in a temp dir, pooled the way `serve` pools
    /// it, so transactions on different connections really overlap.
    pub async fn file_backed(max_connections: u32) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let config = Config {
            database_url: format!("sqlite:{}", dir.path().join("fridge.db").display()),
            max_connections,
            ..Config::default()
        };

        let pool = communifridge::db::init_pool(&config)
            .await
            .expect("Failed to open file-backed pool");
        let router = communifridge::build_app(pool.clone(), &config)
            .await
            .expect("Failed to build app");

        Self {
            router,
            db: pool,
            _dir: Some(dir),
        }
    }

    /// Send a request through the app and return the response.
    pub async fn request(&self, req: Request<Body>) -> Response {
        tower::ServiceExt::oneshot(self.router.clone(), req)
            .await
            .unwrap()
    }

    /// Insert a person with the given role table and return (role_id, access_code).
    async fn create_person(&self, name: &str, role_table: &str) -> (i64, String) {
        let access_code = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();

        let person_id = sqlx::query(
            "INSERT INTO persons (name, email, access_code, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(name)
        .bind(format!("{}@example.com", access_code))
        .bind(&access_code)
        .bind(&now)
        .bind(&now)
        .execute(&self.db)
        .await
        .expect("Failed to create test person")
        .last_insert_rowid();

        let role_id = sqlx::query(&format!("INSERT INTO {role_table} (person_id) VALUES (?)"))
            .bind(person_id)
            .execute(&self.db)
            .await
            .expect("Failed to attach role")
            .last_insert_rowid();

        (role_id, access_code)
    }

    /// Create a recipient and return (user_id, access_code).
    pub async fn create_user(&self, name: &str) -> (i64, String) {
        self.create_person(name, "users").await
    }

    /// Create a donator and return (donator_id, access_code).
    pub async fn create_donator(&self, name: &str) -> (i64, String) {
        self.create_person(name, "donators").await
    }

    /// Create an admin and return (admin_id, access_code).
    pub async fn create_admin(&self, name: &str) -> (i64, String) {
        self.create_person(name, "admins").await
    }

    /// Insert an `Available` donation with one food per `(name, grams)` and
    /// return (donation_id, food_ids).
    pub async fn create_donation(&self, donator_id: i64, foods: &[(&str, i64)]) -> (i64, Vec<i64>) {
        let now = chrono::Utc::now().to_rfc3339();
        let donation_id = sqlx::query(
            r#"
            INSERT INTO donations (donator_id, category, location, delivery_date, availability, created_at, updated_at)
            VALUES (?, 'Produce', 'Tampines Fridge', '2026-10-20', 'Available', ?, ?)
            "#,
        )
        .bind(donator_id)
        .bind(&now)
        .bind(&now)
        .execute(&self.db)
        .await
        .expect("Failed to create test donation")
        .last_insert_rowid();

        let mut food_ids = Vec::new();
        for (name, quantity) in foods {
            let food_id = sqlx::query(
                "INSERT INTO foods (donation_id, name, quantity, food_type, expiry_date) VALUES (?, ?, ?, 'Fresh', '2026-10-30')",
            )
            .bind(donation_id)
            .bind(name)
            .bind(quantity)
            .execute(&self.db)
            .await
            .expect("Failed to create test food")
            .last_insert_rowid();
            food_ids.push(food_id);
        }

        (donation_id, food_ids)
    }

    /// Log in with the given access code and return the session cookie string.
    pub async fn login(&self, access_code: &str) -> String {
        let resp = self
            .send_json(
                "POST",
                "/login",
                serde_json::json!({ "accessCode": access_code }),
                None,
            )
            .await;
        assert_eq!(resp.status(), StatusCode::OK);

        resp.headers()
            .get("set-cookie")
            .expect("Login should set a session cookie")
            .to_str()
            .unwrap()
            .split(';')
            .next()
            .unwrap()
            .to_string()
    }

    /// Send a GET request with an optional session cookie.
    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response {
        self.send("GET", uri, cookie).await
    }

    /// Send a DELETE request with an optional session cookie.
    pub async fn delete(&self, uri: &str, cookie: Option<&str>) -> Response {
        self.send("DELETE", uri, cookie).await
    }

    /// Send a PATCH request without a body.
    pub async fn patch(&self, uri: &str, cookie: Option<&str>) -> Response {
        self.send("PATCH", uri, cookie).await
    }

    /// Send an empty-bodied request with an optional session cookie.
    pub async fn send(&self, method: &str, uri: &str, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder().uri(uri).method(method);
        if let Some(cookie) = cookie {
            builder = builder.header("cookie", cookie);
        }
        let req = builder.body(Body::empty()).unwrap();
        self.request(req).await
    }

    /// Send a JSON request with an optional session cookie.
    pub async fn send_json(&self, method: &str, uri: &str, body: Value, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder()
            .uri(uri)
            .method(method)
            .header("content-type", "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header("cookie", cookie);
        }
        let req = builder.body(Body::from(body.to_string())).unwrap();
        self.request(req).await
    }

    pub async fn availability(&self, donation_id: i64) -> String {
        let (availability,): (String,) =
            sqlx::query_as("SELECT availability FROM donations WHERE id = ?")
                .bind(donation_id)
                .fetch_one(&self.db)
                .await
                .unwrap();
        availability
    }

    pub async fn status_of(&self, reservation_id: i64) -> String {
        let (status,): (String,) =
            sqlx::query_as("SELECT collection_status FROM reservations WHERE id = ?")
                .bind(reservation_id)
                .fetch_one(&self.db)
                .await
                .unwrap();
        status
    }

    pub async fn count(&self, sql: &str, id: i64) -> i64 {
        let (count,): (i64,) = sqlx::query_as(sql)
            .bind(id)
            .fetch_one(&self.db)
            .await
            .unwrap();
        count
    }
}

/// A cart body reserving `quantity` of each food in one donation.
pub fn cart(donation_id: i64, foods: &[(i64, i64)]) -> Value {
    serde_json::json!({
        "collectionDate": "2026-10-21",
        "collectionTimeStart": "10:00",
        "collectionTimeEnd": "11:00",
        "cartItems": [{
            "id": donation_id,
            "foods": foods
                .iter()
                .map(|(id, quantity)| serde_json::json!({ "id": id, "quantity": quantity }))
                .collect::<Vec<_>>(),
        }],
    })
}

/// Read the full response body as JSON.
pub async fn body_json(resp: Response) -> Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Assert the status code and the machine-readable error reason.
pub async fn assert_error(resp: Response, status: StatusCode, reason: &str) -> Value {
    assert_eq!(resp.status(), status);
    let body = body_json(resp).await;
    assert_eq!(body["error"], reason, "unexpected body: {body}");
    body
}
