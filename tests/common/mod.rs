use std::env;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request};
use axum::Router;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::PgConnection;
use diesel_migrations::MigrationHarness;
use dsar_portal::auth::jwt::JwtService;
use dsar_portal::billing::{BillingProvider, CheckoutRequest, CheckoutSession, SubscriptionPlan};
use dsar_portal::config::AppConfig;
use dsar_portal::db::{self, PgPool};
use dsar_portal::models::{Company, DsarRequest, NewCompany, NewUser};
use dsar_portal::routes;
use dsar_portal::schema::{companies, dsar_requests, users};
use dsar_portal::state::AppState;
use dsar_portal::webhook;
use http_body_util::BodyExt;
use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tower::util::ServiceExt;

pub const WEBHOOK_SECRET: &str = "whsec_test_secret";

static DB_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// Records checkout requests instead of calling the processor.
#[derive(Default)]
pub struct FakeBilling {
    requests: Mutex<Vec<CheckoutRequest>>,
    failure: Mutex<Option<String>>,
}

#[async_trait]
impl BillingProvider for FakeBilling {
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession> {
        if let Some(message) = self.failure.lock().await.clone() {
            bail!(message);
        }
        let mut guard = self.requests.lock().await;
        guard.push(request.clone());
        let id = format!("cs_test_{}", guard.len());
        Ok(CheckoutSession {
            url: Some(format!("https://checkout.test/pay/{id}")),
            id,
        })
    }
}

impl FakeBilling {
    #[allow(dead_code)]
    pub async fn requests(&self) -> Vec<CheckoutRequest> {
        self.requests.lock().await.clone()
    }

    #[allow(dead_code)]
    pub async fn fail_with(&self, message: &str) {
        *self.failure.lock().await = Some(message.to_string());
    }
}

#[derive(Clone, Copy)]
pub struct TestOptions {
    pub enforce_submission_gate: bool,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            enforce_submission_gate: true,
        }
    }
}

pub struct TestApp {
    pub state: AppState,
    router: Router,
    billing: Arc<FakeBilling>,
}

impl TestApp {
    /// Builds an app against `TEST_DATABASE_URL`.
    pub async fn new() -> Result<Self> {
        Self::with_options(TestOptions::default()).await
    }

    pub async fn with_options(options: TestOptions) -> Result<Self> {
        let database_url = env::var("TEST_DATABASE_URL")
            .context("TEST_DATABASE_URL must be set for integration tests")?;

        let config = AppConfig {
            database_url,
            database_max_pool_size: db::DEFAULT_MAX_POOL_SIZE,
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            jwt_secret: "test-secret".to_string(),
            jwt_issuer: "test-issuer".to_string(),
            jwt_audience: "test-audience".to_string(),
            jwt_expiry_minutes: 60,
            cors_allowed_origin: None,
            app_base_url: "http://portal.test".to_string(),
            stripe_secret_key: None,
            stripe_webhook_secret: Some(WEBHOOK_SECRET.to_string()),
            stripe_api_base: "http://stripe.invalid".to_string(),
            stripe_webhook_tolerance_seconds: webhook::DEFAULT_TOLERANCE_SECONDS,
            subscription_currency: "gbp".to_string(),
            subscription_unit_amount: 2900,
            subscription_interval: "month".to_string(),
            enforce_submission_gate: options.enforce_submission_gate,
        };

        let pool = db::init_pool_with_size(&config.database_url, config.database_max_pool_size)?;
        prepare_database(&pool).await?;

        let billing = Arc::new(FakeBilling::default());
        let billing_for_state: Arc<dyn BillingProvider> = billing.clone();
        let jwt = JwtService::from_config(&config)?;
        let state = AppState::new(pool, config, billing_for_state, jwt);
        let router = routes::create_router(state.clone());

        Ok(Self {
            state,
            router,
            billing,
        })
    }

    pub async fn cleanup(&self) -> Result<()> {
        self.with_conn(truncate_all).await
    }

    #[allow(dead_code)]
    pub fn billing(&self) -> Arc<FakeBilling> {
        self.billing.clone()
    }

    #[allow(dead_code)]
    pub fn plan(&self) -> SubscriptionPlan {
        self.state.config.subscription_plan()
    }

    pub fn token_for(&self, email: &str) -> Result<String> {
        self.state
            .jwt
            .generate_token(&format!("test|{email}"), email)
    }

    pub async fn insert_user(&self, email: &str, role: &str) -> Result<i64> {
        let email = email.to_string();
        let role = role.to_string();
        self.with_conn(move |conn| {
            let id = diesel::insert_into(users::table)
                .values(&NewUser {
                    email: &email,
                    role: &role,
                })
                .returning(users::id)
                .get_result::<i64>(conn)
                .context("failed to insert user")?;
            Ok(id)
        })
        .await
    }

    /// Inserts a company row directly, bypassing registration rules.
    #[allow(dead_code)]
    pub async fn insert_company(
        &self,
        owner_id: i64,
        name: &str,
        slug: &str,
        status: &str,
        subscription_status: Option<&str>,
    ) -> Result<i64> {
        let name = name.to_string();
        let slug = slug.to_string();
        let status = status.to_string();
        let subscription_status = subscription_status.map(str::to_string);
        self.with_conn(move |conn| {
            let id = diesel::insert_into(companies::table)
                .values(&NewCompany {
                    name: &name,
                    representation: "Data Protection Officer",
                    slug: &slug,
                    status: &status,
                    owner_id,
                })
                .returning(companies::id)
                .get_result::<i64>(conn)
                .context("failed to insert company")?;
            diesel::update(companies::table.find(id))
                .set(companies::subscription_status.eq(subscription_status))
                .execute(conn)
                .context("failed to set subscription status")?;
            Ok(id)
        })
        .await
    }

    #[allow(dead_code)]
    pub async fn company(&self, company_id: i64) -> Result<Company> {
        self.with_conn(move |conn| {
            companies::table
                .find(company_id)
                .first::<Company>(conn)
                .context("failed to load company")
        })
        .await
    }

    #[allow(dead_code)]
    pub async fn dsars_for(&self, company_id: i64) -> Result<Vec<DsarRequest>> {
        self.with_conn(move |conn| {
            dsar_requests::table
                .filter(dsar_requests::company_id.eq(company_id))
                .order(dsar_requests::id.asc())
                .load::<DsarRequest>(conn)
                .context("failed to load requests")
        })
        .await
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        self.send_json(Method::POST, path, payload, token).await
    }

    #[allow(dead_code)]
    pub async fn patch_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        self.send_json(Method::PATCH, path, payload, token).await
    }

    #[allow(dead_code)]
    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<hyper::Response<Body>> {
        let mut builder = Request::builder().method(Method::GET).uri(path);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = builder.body(Body::empty())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    /// Posts a raw webhook body with an optional `Stripe-Signature` header.
    #[allow(dead_code)]
    pub async fn post_webhook(
        &self,
        body: &[u8],
        signature: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/api/webhooks/stripe")
            .header("content-type", "application/json");
        if let Some(signature) = signature {
            builder = builder.header(webhook::SIGNATURE_HEADER, signature);
        }
        let request = builder.body(Body::from(body.to_vec()))?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    async fn send_json<T: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        let body = serde_json::to_vec(payload)?;
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = builder.body(Body::from(body))?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    async fn with_conn<F, T>(&self, f: F) -> Result<T>
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

pub async fn body_to_vec(body: Body) -> Result<Vec<u8>> {
    let collected = body
        .collect()
        .await
        .map_err(|err| anyhow!("failed to read response body: {err}"))?;
    Ok(collected.to_bytes().to_vec())
}

#[allow(dead_code)]
pub async fn body_json(response: hyper::Response<Body>) -> Result<Value> {
    let body = body_to_vec(response.into_body()).await?;
    serde_json::from_slice(&body).context("response body is not JSON")
}

async fn prepare_database(pool: &PgPool) -> Result<()> {
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || -> Result<()> {
        let mut conn = pool
            .get()
            .map_err(|err| anyhow!("failed to acquire connection: {err}"))?;
        conn.run_pending_migrations(db::MIGRATIONS)
            .map_err(|err| anyhow!("failed to run migrations: {err}"))?;
        truncate_all(&mut conn)?;
        Ok(())
    })
    .await
    .context("migration task panicked")?
}

fn truncate_all(conn: &mut PgConnection) -> Result<()> {
    conn.batch_execute("TRUNCATE TABLE dsar_requests, companies, users RESTART IDENTITY CASCADE;")
        .context("failed to truncate tables")?;
    Ok(())
}
