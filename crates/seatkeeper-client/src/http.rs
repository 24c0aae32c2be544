//! reqwest implementations of the collaborator traits.

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use seatkeeper_entity::account::{Account, NewAccount};

use crate::billing::BillingService;
use crate::error::ClientError;
use crate::identity::IdentityService;
use crate::notification::{Notification, Notifier};
use crate::retry::RetryPolicy;

/// One collaborator base URL plus the retry policy applied to its calls.
#[derive(Debug, Clone)]
struct Endpoint {
    http: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
    service: &'static str,
}

impl Endpoint {
    fn new(
        http: reqwest::Client,
        base_url: &str,
        retry: RetryPolicy,
        service: &'static str,
    ) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry,
            service,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Send with retries. `Ok(None)` means the collaborator answered 404.
    async fn send<F>(&self, operation: &str, build: F) -> Result<Option<Response>, ClientError>
    where
        F: Fn(&reqwest::Client) -> RequestBuilder,
    {
        let service = self.service;
        self.retry
            .run(service, operation, || {
                let request = build(&self.http);
                async move {
                    let response = request
                        .send()
                        .await
                        .map_err(|e| ClientError::unavailable(service, e.to_string()))?;
                    classify(service, response).await
                }
            })
            .await
    }

    async fn decode<T: DeserializeOwned>(&self, response: Response) -> Result<T, ClientError> {
        response.json::<T>().await.map_err(|e| ClientError::Decode {
            service: self.service,
            message: e.to_string(),
        })
    }
}

async fn classify(service: &'static str, response: Response) -> Result<Option<Response>, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(Some(response));
    }
    if status == StatusCode::NOT_FOUND {
        return Ok(None);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to read response body".to_string());
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        Err(ClientError::unavailable(service, format!("{status}: {body}")))
    } else {
        Err(ClientError::Rejected {
            service,
            status: status.as_u16(),
            message: body,
        })
    }
}

fn build_http() -> Result<reqwest::Client, ClientError> {
    reqwest::Client::builder()
        .build()
        .map_err(|e| ClientError::Configuration(e.to_string()))
}

/// Identity service over HTTP.
#[derive(Debug, Clone)]
pub struct HttpIdentityService {
    endpoint: Endpoint,
}

impl HttpIdentityService {
    /// Create a client for `base_url`.
    pub fn new(base_url: &str, retry: RetryPolicy) -> Result<Self, ClientError> {
        Ok(Self {
            endpoint: Endpoint::new(build_http()?, base_url, retry, "identity"),
        })
    }
}

#[async_trait]
impl IdentityService for HttpIdentityService {
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<Account>, ClientError> {
        let url = self.endpoint.url(&format!("/users/{user_id}"));
        match self.endpoint.send("find_by_id", |http| http.get(&url)).await? {
            Some(response) => Ok(Some(self.endpoint.decode(response).await?)),
            None => Ok(None),
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, ClientError> {
        let url = self.endpoint.url("/users/lookup");
        let body = json!({ "emails": [email] });
        match self
            .endpoint
            .send("find_by_email", |http| http.post(&url).json(&body))
            .await?
        {
            Some(response) => {
                let found: Vec<Account> = self.endpoint.decode(response).await?;
                Ok(found
                    .into_iter()
                    .find(|a| a.email.eq_ignore_ascii_case(email)))
            }
            None => Ok(None),
        }
    }

    async fn list_accounts(&self, user_ids: &[Uuid]) -> Result<Vec<Account>, ClientError> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        let url = self.endpoint.url("/users/lookup");
        let body = json!({ "ids": user_ids });
        match self
            .endpoint
            .send("list_accounts", |http| http.post(&url).json(&body))
            .await?
        {
            Some(response) => self.endpoint.decode(response).await,
            None => Ok(Vec::new()),
        }
    }

    async fn create_account(&self, account: &NewAccount) -> Result<Account, ClientError> {
        let url = self.endpoint.url("/users");
        let response = self
            .endpoint
            .send("create_account", |http| http.post(&url).json(account))
            .await?
            .ok_or_else(|| ClientError::Rejected {
                service: "identity",
                status: StatusCode::NOT_FOUND.as_u16(),
                message: "account endpoint not found".to_string(),
            })?;
        let created: Account = self.endpoint.decode(response).await?;
        debug!(user_id = %created.id, "Identity account created");
        Ok(created)
    }

    async fn delete_account(&self, user_id: Uuid) -> Result<(), ClientError> {
        let url = self.endpoint.url(&format!("/users/{user_id}"));
        // 404 means it is already gone.
        self.endpoint
            .send("delete_account", |http| http.delete(&url))
            .await?;
        Ok(())
    }
}

/// Billing service over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBillingService {
    endpoint: Endpoint,
}

impl HttpBillingService {
    /// Create a client for `base_url`.
    pub fn new(base_url: &str, retry: RetryPolicy) -> Result<Self, ClientError> {
        Ok(Self {
            endpoint: Endpoint::new(build_http()?, base_url, retry, "billing"),
        })
    }
}

#[async_trait]
impl BillingService for HttpBillingService {
    async fn cancel_subscription(&self, customer_id: &str) -> Result<(), ClientError> {
        let url = self
            .endpoint
            .url(&format!("/customers/{customer_id}/subscription/cancel"));
        self.endpoint
            .send("cancel_subscription", |http| http.post(&url))
            .await?;
        Ok(())
    }
}

/// Notification service over HTTP.
#[derive(Debug, Clone)]
pub struct HttpNotifier {
    endpoint: Endpoint,
}

impl HttpNotifier {
    /// Create a client for `base_url`.
    pub fn new(base_url: &str, retry: RetryPolicy) -> Result<Self, ClientError> {
        Ok(Self {
            endpoint: Endpoint::new(build_http()?, base_url, retry, "notification"),
        })
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), ClientError> {
        let url = self.endpoint.url("/notifications");
        self.endpoint
            .send("send", |http| http.post(&url).json(notification))
            .await?
            .ok_or_else(|| ClientError::Rejected {
                service: "notification",
                status: StatusCode::NOT_FOUND.as_u16(),
                message: "notification endpoint not found".to_string(),
            })?;
        debug!(template = notification.template(), "Notification dispatched");
        Ok(())
    }
}
