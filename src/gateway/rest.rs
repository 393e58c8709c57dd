//! REST gateway implementation
//!
//! Table access goes through the backend's PostgREST endpoint:
//! `GET /rest/v1/{table}?select=*&col=eq.value&order=col.asc` for reads,
//! `POST`/`PATCH`/`DELETE` with the same filter syntax for writes.

use std::sync::Arc;
use std::time::Instant;
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::Value;
use url::Url;
use crate::gateway::{
    ChangeKinds, ChangeSubscription, Filter, Gateway, GatewayHandle, Query, RealtimeClient, Table,
};
use crate::utils::errors::{GatewayError, GatewayResult};
use crate::utils::logging::log_gateway_operation;

/// Error body returned by PostgREST
#[derive(Debug, Deserialize)]
struct RestErrorBody {
    message: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    hint: Option<String>,
}

/// Gateway backed by the managed backend's REST and realtime services
#[derive(Clone)]
pub struct BackendGateway {
    handle: Arc<GatewayHandle>,
    realtime: Option<RealtimeClient>,
}

impl BackendGateway {
    /// Create a gateway; `realtime` is `None` when change notifications are disabled
    pub fn new(handle: Arc<GatewayHandle>, realtime: Option<RealtimeClient>) -> Self {
        Self { handle, realtime }
    }

    async fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.handle
            .http()
            .request(method, url)
            .header("apikey", self.handle.anon_key())
            .bearer_auth(self.handle.bearer().await)
    }

    fn table_url(&self, table: Table, filters: &[Filter]) -> GatewayResult<Url> {
        let mut url = self
            .handle
            .rest_url(table)
            .map_err(|e| GatewayError::RequestFailed { table: table.to_string(), message: e.to_string() })?;
        if !filters.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for filter in filters {
                pairs.append_pair(&filter.column, &format!("eq.{}", filter.literal()));
            }
        }
        Ok(url)
    }

    async fn send(&self, table: Table, operation: &str, request: RequestBuilder) -> GatewayResult<Response> {
        let started = Instant::now();
        let result = request.send().await;
        let elapsed = started.elapsed().as_millis() as u64;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                log_gateway_operation(operation, table.as_str(), elapsed, false);
                return Err(map_transport_error(table, e));
            }
        };

        let status = response.status();
        if status.is_success() {
            log_gateway_operation(operation, table.as_str(), elapsed, true);
            return Ok(response);
        }

        log_gateway_operation(operation, table.as_str(), elapsed, false);
        let body = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<RestErrorBody>(&body) {
            Ok(error) => {
                tracing::debug!(table = %table, code = ?error.code, hint = ?error.hint, "Gateway rejected request");
                error.message
            }
            Err(_) if body.is_empty() => status.to_string(),
            Err(_) => body,
        };

        Err(GatewayError::Rejected {
            table: table.to_string(),
            status: status.as_u16(),
            message,
        })
    }
}

fn map_transport_error(table: Table, error: reqwest::Error) -> GatewayError {
    if error.is_timeout() {
        GatewayError::Timeout
    } else if error.is_connect() {
        GatewayError::Unavailable
    } else {
        GatewayError::RequestFailed {
            table: table.to_string(),
            message: error.to_string(),
        }
    }
}

#[async_trait]
impl Gateway for BackendGateway {
    async fn select(&self, table: Table, query: Query) -> GatewayResult<Vec<Value>> {
        let mut url = self.table_url(table, &query.filters)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("select", query.columns.as_deref().unwrap_or("*"));
            if let Some(order) = &query.order {
                let direction = if order.ascending { "asc" } else { "desc" };
                pairs.append_pair("order", &format!("{}.{}", order.column, direction));
            }
        }

        let request = self.request(Method::GET, url).await;
        let response = self.send(table, "select", request).await?;
        response
            .json::<Vec<Value>>()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))
    }

    async fn insert(&self, table: Table, rows: Vec<Value>) -> GatewayResult<Vec<Value>> {
        let url = self.table_url(table, &[])?;
        let request = self
            .request(Method::POST, url)
            .await
            .header("Prefer", "return=representation")
            .json(&rows);

        let response = self.send(table, "insert", request).await?;
        response
            .json::<Vec<Value>>()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))
    }

    async fn update(&self, table: Table, patch: Value, filters: Vec<Filter>) -> GatewayResult<()> {
        let url = self.table_url(table, &filters)?;
        let request = self
            .request(Method::PATCH, url)
            .await
            .header("Prefer", "return=minimal")
            .json(&patch);

        self.send(table, "update", request).await?;
        Ok(())
    }

    async fn delete(&self, table: Table, filters: Vec<Filter>) -> GatewayResult<()> {
        let url = self.table_url(table, &filters)?;
        let request = self
            .request(Method::DELETE, url)
            .await
            .header("Prefer", "return=minimal");

        self.send(table, "delete", request).await?;
        Ok(())
    }

    async fn subscribe(&self, table: Table, kinds: ChangeKinds) -> GatewayResult<ChangeSubscription> {
        match &self.realtime {
            Some(realtime) => realtime.subscribe(table, kinds).await,
            None => Err(GatewayError::Unavailable),
        }
    }
}
