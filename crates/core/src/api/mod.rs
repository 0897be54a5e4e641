//! Remote API client.
//!
//! [`Transport`] is the seam between the stores and the network: the HTTP
//! implementation lives in [`http`], tests script their own. [`ApiClient`]
//! layers the typed endpoints of the holdings backend on top of it.

/// `reqwest`-backed transport with an opaque cookie jar.
pub mod http;
#[cfg(test)]
pub(crate) mod scripted;

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::{
    error::ApiError,
    models::{Brokerage, Credentials, Holding, HoldingId, HoldingUpdate, NewHolding, UserIdentity},
};

pub use http::HttpTransport;

/// HTTP verbs used by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `DELETE`
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        };
        f.write_str(verb)
    }
}

/// Sends one JSON request and returns the decoded JSON body.
///
/// Implementations own whatever credential the server hands out; callers
/// never see it. An empty success body is reported as [`Value::Null`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue `method path` with an optional JSON body.
    async fn send(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, ApiError>;
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    user: UserIdentity,
}

/// Typed access to the holdings backend.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
}

impl ApiClient {
    /// Wrap a transport.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// `POST /login`; the session cookie is kept by the transport.
    pub async fn login(&self, credentials: &Credentials) -> Result<UserIdentity, ApiError> {
        let response: LoginResponse = self
            .call(Method::Post, "/login", Some(encode(credentials)?))
            .await?;
        Ok(response.user)
    }

    /// `POST /logout`.
    pub async fn logout(&self) -> Result<(), ApiError> {
        self.send(Method::Post, "/logout", Some(json!({}))).await?;
        Ok(())
    }

    /// `POST /register`.
    pub async fn register(&self, credentials: &Credentials) -> Result<(), ApiError> {
        self.send(Method::Post, "/register", Some(encode(credentials)?))
            .await?;
        Ok(())
    }

    /// `GET /holdings`.
    pub async fn list_holdings(&self) -> Result<Vec<Holding>, ApiError> {
        let holdings: Option<Vec<Holding>> = self.call(Method::Get, "/holdings", None).await?;
        Ok(holdings.unwrap_or_default())
    }

    /// `GET /holdings/:id`.
    pub async fn get_holding(&self, id: HoldingId) -> Result<Holding, ApiError> {
        self.call(Method::Get, &holding_path(id), None).await
    }

    /// `POST /holdings`.
    pub async fn create_holding(&self, holding: &NewHolding) -> Result<Holding, ApiError> {
        self.call(Method::Post, "/holdings", Some(encode(holding)?))
            .await
    }

    /// `PUT /holdings/:id`.
    pub async fn update_holding(
        &self,
        id: HoldingId,
        changes: &HoldingUpdate,
    ) -> Result<Holding, ApiError> {
        self.call(Method::Put, &holding_path(id), Some(encode(changes)?))
            .await
    }

    /// `DELETE /holdings/:id`.
    pub async fn delete_holding(&self, id: HoldingId) -> Result<(), ApiError> {
        self.send(Method::Delete, &holding_path(id), None).await?;
        Ok(())
    }

    /// `GET /brokerages`.
    pub async fn list_brokerages(&self) -> Result<Vec<Brokerage>, ApiError> {
        let brokerages: Option<Vec<Brokerage>> =
            self.call(Method::Get, "/brokerages", None).await?;
        Ok(brokerages.unwrap_or_default())
    }

    async fn call<T>(&self, method: Method, path: &str, body: Option<Value>) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        let value = self.send(method, path, body).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn send(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, ApiError> {
        debug!(%method, path, "api request");
        let result = self.transport.send(method, path, body).await;
        if let Err(err) = &result {
            debug!(%method, path, %err, "api request failed");
        }
        result
    }
}

fn holding_path(id: HoldingId) -> String {
    format!("/holdings/{id}")
}

fn encode(body: &impl Serialize) -> Result<Value, ApiError> {
    serde_json::to_value(body).map_err(|err| ApiError::Decode(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::{scripted::ScriptedTransport, *};
    use anyhow::Result;

    #[tokio::test]
    async fn login_extracts_user_and_sends_credentials() -> Result<()> {
        let transport = Arc::new(ScriptedTransport::default());
        transport.respond(
            Method::Post,
            "/login",
            Ok(json!({ "message": "Login successful", "user": { "id": 4, "email": "a@b.io" } })),
        );
        let api = ApiClient::new(transport.clone());

        let user = api.login(&Credentials::new("a@b.io", "secret")).await?;
        assert_eq!(user.email, "a@b.io");
        assert_eq!(user.id, Some(4));

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].body,
            Some(json!({ "email": "a@b.io", "password": "secret" }))
        );
        Ok(())
    }

    #[tokio::test]
    async fn null_list_decodes_as_empty() -> Result<()> {
        let transport = Arc::new(ScriptedTransport::default());
        transport.respond(Method::Get, "/holdings", Ok(Value::Null));
        transport.respond(Method::Get, "/brokerages", Ok(json!([{ "id": 1, "name": "Fubon" }])));
        let api = ApiClient::new(transport);

        assert!(api.list_holdings().await?.is_empty());
        let brokerages = api.list_brokerages().await?;
        assert_eq!(brokerages[0].name, "Fubon");
        Ok(())
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_error() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.respond(Method::Get, "/holdings/9", Ok(json!({ "symbol": 12 })));
        let api = ApiClient::new(transport);

        let err = api.get_holding(9).await.expect_err("body is malformed");
        assert!(matches!(err, ApiError::Decode(_)));
    }
}
