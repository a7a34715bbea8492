//! Route handlers.
//!
//! Every handler follows discover → resolve → forward → format and can stop
//! at any stage with a [`GatewayError`].

use axum::{
    extract::{Path, RawQuery, State},
    Json,
};
use serde_json::{json, Value};

use crate::http::response::{
    ExplorerLocation, GatewayError, IdleStatus, InstanceList, NetworkInfo, RunningStatus,
};
use crate::http::server::{AppState, GatewayState};
use crate::topology::{EndpointRole, ServiceEndpoint};

/// `GET /`
pub async fn index() -> Json<Value> {
    Json(json!({
        "name": "Enclave Gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Discovery-driven JSON-RPC gateway for Kurtosis Ethereum networks",
        "endpoints": {
            "/": "This information",
            "/status": "Network status",
            "/enclaves": "List running enclaves",
            "/rpc/{method}": "Make RPC calls (repeat ?params=<json> for each positional parameter)",
            "/block/{number}": "Get block information",
            "/transaction/{hash}": "Get transaction information",
            "/explorer": "Get block explorer URL"
        }
    }))
}

/// `GET /status`
pub async fn status(State(state): State<AppState>) -> Json<Value> {
    let gateway = state.load();

    let instance = match gateway.resolver.first_active_instance().await {
        Some(instance) => instance,
        None => return Json(to_json(IdleStatus::new())),
    };

    let (rpc, explorer) = tokio::join!(
        gateway.resolver.resolve_role(&instance.name, EndpointRole::Rpc),
        gateway.resolver.resolve_role(&instance.name, EndpointRole::Explorer),
    );

    let network_info = match &rpc {
        Some(endpoint) => {
            let client = gateway.rpc.as_ref();
            let (block_number, net_version, peer_count) = tokio::join!(
                client.call(&endpoint.url, "eth_blockNumber", Vec::new()),
                client.call(&endpoint.url, "net_version", Vec::new()),
                client.call(&endpoint.url, "net_peerCount", Vec::new()),
            );
            NetworkInfo::from_replies(&block_number, &net_version, &peer_count)
        }
        None => NetworkInfo::default(),
    };

    Json(to_json(RunningStatus::new(
        instance.name,
        rpc.map(|e| e.url.to_string()),
        explorer.map(|e| e.url.to_string()),
        network_info,
    )))
}

/// `GET /enclaves`
pub async fn enclaves(State(state): State<AppState>) -> Json<Value> {
    let gateway = state.load();
    let instances = gateway.resolver.list_active_instances().await;
    Json(to_json(InstanceList::from(instances)))
}

/// `GET /rpc/{method}`
pub async fn rpc_call(
    State(state): State<AppState>,
    Path(method): Path<String>,
    RawQuery(query): RawQuery,
) -> Result<Json<Value>, GatewayError> {
    // Bad client input is rejected before any discovery or backend traffic.
    let params = parse_query_params(query.as_deref())?;

    let gateway = state.load();
    let endpoint = active_endpoint(&gateway, EndpointRole::Rpc).await?;
    let response = gateway.rpc.call(&endpoint.url, &method, params).await;
    Ok(Json(response.into_json()))
}

/// `GET /block/{number}`
pub async fn block(
    State(state): State<AppState>,
    Path(number): Path<String>,
) -> Result<Json<Value>, GatewayError> {
    let number = parse_block_number(&number).ok_or(GatewayError::NotFound)?;

    let gateway = state.load();
    let endpoint = active_endpoint(&gateway, EndpointRole::Rpc).await?;
    let params = vec![json!(format!("{:#x}", number)), json!(true)];
    let response = gateway.rpc.call(&endpoint.url, "eth_getBlockByNumber", params).await;
    Ok(Json(response.into_json()))
}

/// `GET /transaction/{hash}`
pub async fn transaction(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Json<Value>, GatewayError> {
    let gateway = state.load();
    let endpoint = active_endpoint(&gateway, EndpointRole::Rpc).await?;
    let response = gateway
        .rpc
        .call(&endpoint.url, "eth_getTransactionByHash", vec![json!(hash)])
        .await;
    Ok(Json(response.into_json()))
}

/// `GET /explorer`
pub async fn explorer(State(state): State<AppState>) -> Result<Json<Value>, GatewayError> {
    let gateway = state.load();
    let endpoint = active_endpoint(&gateway, EndpointRole::Explorer).await?;
    Ok(Json(to_json(ExplorerLocation {
        explorer_url: endpoint.url.to_string(),
    })))
}

/// Fallback for unmatched routes.
pub async fn not_found() -> GatewayError {
    GatewayError::NotFound
}

/// Fallback for a known route called with the wrong method.
pub async fn method_not_allowed() -> GatewayError {
    GatewayError::MethodNotAllowed
}

/// Endpoint for `role` on the first running instance.
async fn active_endpoint(gateway: &GatewayState, role: EndpointRole) -> Result<ServiceEndpoint, GatewayError> {
    let instance = gateway
        .resolver
        .first_active_instance()
        .await
        .ok_or(GatewayError::NoActiveInstance)?;

    gateway
        .resolver
        .resolve_role(&instance.name, role)
        .await
        .ok_or(GatewayError::EndpointNotResolved(role))
}

/// Positional parameters from repeated `params` query values.
///
/// Each value must be a JSON document on its own.
pub fn parse_query_params(query: Option<&str>) -> Result<Vec<Value>, GatewayError> {
    let Some(query) = query else {
        return Ok(Vec::new());
    };

    url::form_urlencoded::parse(query.as_bytes())
        .filter(|(key, _)| key == "params")
        .map(|(_, value)| serde_json::from_str(&value).map_err(|_| GatewayError::MalformedParams))
        .collect()
}

/// Decimal block number made of ASCII digits only (no sign, no spaces).
pub fn parse_block_number(raw: &str) -> Option<u64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

fn to_json<T: serde::Serialize>(value: T) -> Value {
    // Our response types only hold strings, numbers and JSON values.
    serde_json::to_value(value).unwrap_or(Value::Null)
}
