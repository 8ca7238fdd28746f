//! Typed HTTP client for the rental backend.
//!
//! The client owns an explicit [`Session`]: [`ApiClient::login`] creates it,
//! [`ApiClient::logout`] drops it. Every call except login fails with
//! [`ClientError::Unauthenticated`] before touching the network when no
//! session is held.

mod session;

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

pub use session::Session;

use crate::{
    composer::{GatewayError, OrderGateway, ProductCatalog, ProductFilter},
    config::ClientConfig,
    dto::{
        auth::{CurrentUser, LoginRequest, LoginResponse},
        orders::{ChangeStatusRequest, OrderList, OrderPayload, OrderSummary, OrderWithItems},
        products::{CreateProductRequest, UpdateProductRequest},
        reports::{DashboardSummary, RevenueReport},
    },
    models::{OrderStatus, Product, User},
    response::ApiResponse,
    routes::params::OrderListQuery,
};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("not signed in")]
    Unauthenticated,

    #[error("request failed with status {status}: {}", .detail.as_deref().unwrap_or("no detail"))]
    Api { status: u16, detail: Option<String> },

    #[error("response carried no data")]
    EmptyResponse,
}

impl ClientError {
    pub fn detail(&self) -> Option<&str> {
        match self {
            ClientError::Api { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }
}

impl From<ClientError> for GatewayError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Api { status, detail } => GatewayError::Api { status, detail },
            ClientError::Unauthenticated => GatewayError::Unauthenticated,
            other => GatewayError::Transport(other.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    config: ClientConfig,
    http: Client,
    session: Option<Session>,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            config,
            http,
            session: None,
        })
    }

    pub fn from_env() -> Result<Self, ClientError> {
        Self::new(ClientConfig::from_env())
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    /// Exchanges credentials for a token and stores the new session.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<&Session, ClientError> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let request = self.http.post(self.url("/auth/login")).json(&body);
        let login: LoginResponse = read_data(request.send().await?).await?;

        tracing::info!(user_id = %login.user.id, "signed in");
        Ok(self.session.insert(Session::new(login.token, login.user)))
    }

    /// Tells the backend and drops the session whatever it answers.
    pub async fn logout(&mut self) -> Result<(), ClientError> {
        let Some(session) = self.session.take() else {
            return Ok(());
        };
        let request = self
            .http
            .post(self.url("/auth/logout"))
            .bearer_auth(session.token());
        if let Err(err) = request.send().await.map_err(ClientError::from) {
            tracing::warn!(error = %err, "logout request failed; session dropped locally");
        }
        Ok(())
    }

    pub async fn me(&self) -> Result<User, ClientError> {
        let current: CurrentUser = self.call(Method::GET, "/auth/me").await?;
        Ok(current.user)
    }

    pub async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, ClientError> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(category) = filter.category {
            query.push(("category", category.as_str().to_string()));
        }
        if let Some(is_active) = filter.is_active {
            query.push(("is_active", is_active.to_string()));
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
            query.push(("q", search.to_string()));
        }
        let request = self.authed(Method::GET, "/products")?.query(&query);
        read_data(request.send().await?).await
    }

    pub async fn get_product(&self, id: Uuid) -> Result<Product, ClientError> {
        self.call(Method::GET, &format!("/products/{id}")).await
    }

    pub async fn create_product(&self, body: &CreateProductRequest) -> Result<Product, ClientError> {
        self.call_with(Method::POST, "/products", body).await
    }

    pub async fn update_product(
        &self,
        id: Uuid,
        body: &UpdateProductRequest,
    ) -> Result<Product, ClientError> {
        self.call_with(Method::PUT, &format!("/products/{id}"), body).await
    }

    pub async fn delete_product(&self, id: Uuid) -> Result<(), ClientError> {
        let request = self.authed(Method::DELETE, &format!("/products/{id}"))?;
        read_data::<Value>(request.send().await?).await?;
        Ok(())
    }

    pub async fn list_orders(&self, query: &OrderListQuery) -> Result<Vec<OrderSummary>, ClientError> {
        let request = self.authed(Method::GET, "/orders")?.query(query);
        let list: OrderList = read_data(request.send().await?).await?;
        Ok(list.items)
    }

    pub async fn pending_orders(&self) -> Result<Vec<OrderSummary>, ClientError> {
        let list: OrderList = self.call(Method::GET, "/orders/pending").await?;
        Ok(list.items)
    }

    pub async fn delivered_orders(&self) -> Result<Vec<OrderSummary>, ClientError> {
        let list: OrderList = self.call(Method::GET, "/orders/delivered").await?;
        Ok(list.items)
    }

    pub async fn get_order(&self, id: Uuid) -> Result<OrderWithItems, ClientError> {
        self.call(Method::GET, &format!("/orders/{id}")).await
    }

    pub async fn create_order(&self, payload: &OrderPayload) -> Result<OrderWithItems, ClientError> {
        self.call_with(Method::POST, "/orders", payload).await
    }

    pub async fn update_order(
        &self,
        id: Uuid,
        payload: &OrderPayload,
    ) -> Result<OrderWithItems, ClientError> {
        self.call_with(Method::PUT, &format!("/orders/{id}"), payload).await
    }

    pub async fn change_order_status(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<OrderWithItems, ClientError> {
        let body = ChangeStatusRequest { status };
        self.call_with(Method::PATCH, &format!("/orders/{id}/status"), &body)
            .await
    }

    /// The printable PDF of order `id`, as raw bytes.
    pub async fn order_document(&self, id: Uuid) -> Result<Vec<u8>, ClientError> {
        let response = self
            .authed(Method::GET, &format!("/orders/{id}/pdf"))?
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(response.bytes().await?.to_vec())
    }

    pub async fn cancel_order(&self, id: Uuid) -> Result<OrderWithItems, ClientError> {
        self.call(Method::DELETE, &format!("/orders/{id}")).await
    }

    pub async fn daily_report(&self, date: Option<NaiveDate>) -> Result<RevenueReport, ClientError> {
        let query: Vec<(&str, String)> = date.map(|d| ("date", d.to_string())).into_iter().collect();
        self.report("/reports/daily", &query).await
    }

    pub async fn weekly_report(&self, date: Option<NaiveDate>) -> Result<RevenueReport, ClientError> {
        let query: Vec<(&str, String)> = date.map(|d| ("date", d.to_string())).into_iter().collect();
        self.report("/reports/weekly", &query).await
    }

    pub async fn monthly_report(
        &self,
        year: Option<i32>,
        month: Option<u32>,
    ) -> Result<RevenueReport, ClientError> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(year) = year {
            query.push(("year", year.to_string()));
        }
        if let Some(month) = month {
            query.push(("month", month.to_string()));
        }
        self.report("/reports/monthly", &query).await
    }

    pub async fn custom_report(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<RevenueReport, ClientError> {
        let query = [
            ("start_date", start_date.to_string()),
            ("end_date", end_date.to_string()),
        ];
        self.report("/reports/custom", &query).await
    }

    pub async fn summary(&self) -> Result<DashboardSummary, ClientError> {
        self.call(Method::GET, "/reports/summary").await
    }

    async fn report<Q>(&self, path: &str, query: &Q) -> Result<RevenueReport, ClientError>
    where
        Q: Serialize + ?Sized,
    {
        let request = self.authed(Method::GET, path)?.query(query);
        read_data(request.send().await?).await
    }

    async fn call<T: DeserializeOwned>(&self, method: Method, path: &str) -> Result<T, ClientError> {
        let request = self.authed(method, path)?;
        read_data(request.send().await?).await
    }

    async fn call_with<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.authed(method, path)?.json(body);
        read_data(request.send().await?).await
    }

    fn authed(&self, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        let session = self.session.as_ref().ok_or(ClientError::Unauthenticated)?;
        Ok(self
            .http
            .request(method, self.url(path))
            .bearer_auth(session.token()))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }
}

/// Unwraps the `data` of a success envelope, or turns an error envelope into
/// [`ClientError::Api`].
async fn read_data<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    if !response.status().is_success() {
        return Err(api_error(response).await);
    }
    let envelope: ApiResponse<T> = response.json().await?;
    envelope.data.ok_or(ClientError::EmptyResponse)
}

async fn api_error(response: Response) -> ClientError {
    let status = response.status().as_u16();
    let body: Option<Value> = response.json().await.ok();
    let detail = body.as_ref().and_then(error_detail);
    tracing::debug!(status, ?detail, "backend rejected request");
    ClientError::Api { status, detail }
}

/// `data.error` when present, otherwise the envelope `message`.
pub fn error_detail(body: &Value) -> Option<String> {
    body.pointer("/data/error")
        .and_then(Value::as_str)
        .or_else(|| body.get("message").and_then(Value::as_str))
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

impl ProductCatalog for ApiClient {
    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, GatewayError> {
        ApiClient::list_products(self, filter).await.map_err(Into::into)
    }
}

impl OrderGateway for ApiClient {
    async fn get_order(&self, id: Uuid) -> Result<OrderWithItems, GatewayError> {
        ApiClient::get_order(self, id).await.map_err(Into::into)
    }

    async fn create_order(&self, payload: &OrderPayload) -> Result<OrderWithItems, GatewayError> {
        ApiClient::create_order(self, payload).await.map_err(Into::into)
    }

    async fn update_order(
        &self,
        id: Uuid,
        payload: &OrderPayload,
    ) -> Result<OrderWithItems, GatewayError> {
        ApiClient::update_order(self, id, payload)
            .await
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn detail_prefers_the_error_field() {
        let body = json!({
            "message": "Bad Request",
            "data": { "error": "Customer name is required" },
            "meta": null
        });
        assert_eq!(error_detail(&body).as_deref(), Some("Customer name is required"));
    }

    #[test]
    fn detail_falls_back_to_message() {
        assert_eq!(
            error_detail(&json!({ "message": "Not Found", "data": null })).as_deref(),
            Some("Not Found")
        );
        assert_eq!(error_detail(&json!({ "message": "" })), None);
        assert_eq!(error_detail(&json!("plain")), None);
    }

    #[test]
    fn client_errors_map_onto_gateway_errors() {
        let api = ClientError::Api {
            status: 400,
            detail: Some("nope".into()),
        };
        assert_eq!(
            GatewayError::from(api),
            GatewayError::Api {
                status: 400,
                detail: Some("nope".into())
            }
        );
        assert_eq!(
            GatewayError::from(ClientError::Unauthenticated),
            GatewayError::Unauthenticated
        );
        assert!(matches!(
            GatewayError::from(ClientError::EmptyResponse),
            GatewayError::Transport(_)
        ));
    }

    #[tokio::test]
    async fn calls_without_a_session_never_leave_the_process() {
        // Nothing listens on this port; reaching the network would yield Http.
        let client = ApiClient::new(ClientConfig::new("http://127.0.0.1:9/api")).unwrap();

        assert!(matches!(
            client.get_order(Uuid::new_v4()).await,
            Err(ClientError::Unauthenticated)
        ));
        assert!(matches!(
            client.list_products(&ProductFilter::active()).await,
            Err(ClientError::Unauthenticated)
        ));
        assert!(matches!(client.summary().await, Err(ClientError::Unauthenticated)));
        assert!(matches!(
            client.order_document(Uuid::new_v4()).await,
            Err(ClientError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn logout_without_a_session_is_a_no_op() {
        let mut client = ApiClient::new(ClientConfig::new("http://127.0.0.1:9/api")).unwrap();
        client.logout().await.unwrap();
        assert!(!client.is_authenticated());
    }
}
