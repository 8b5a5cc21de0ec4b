//! Z-Wave gateway - HTTP control API server

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zwave_core::{AssociationMembers, NetworkError, ZWaveNetwork};
use zwave_protocol::{ProtocolError, ZWaveTransport};

/// Application state shared across handlers
#[derive(Clone)]
struct AppState {
    network: Arc<ZWaveNetwork>,
}

/// Summary entry for device listings
#[derive(Serialize)]
struct DeviceSummary {
    id: String,
    name: String,
}

/// Health check
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================================
// Node and configuration handlers
// ============================================================================

async fn list_nodes(State(state): State<AppState>) -> impl IntoResponse {
    let nodes: Vec<DeviceSummary> = state
        .network
        .nodes()
        .iter()
        .map(|(id, node)| DeviceSummary {
            id: id.clone(),
            name: node.name().to_string(),
        })
        .collect();
    Json(nodes)
}

async fn list_config_params(
    State(state): State<AppState>,
    Path(node_id): Path<String>,
) -> Response {
    match state.network.node(&node_id) {
        Some(node) => Json(node.parameter_names()).into_response(),
        None => (StatusCode::NOT_FOUND, "Unknown node").into_response(),
    }
}

async fn get_config(
    State(state): State<AppState>,
    Path((node_id, param)): Path<(String, String)>,
) -> Response {
    let Some(node) = state.network.node(&node_id) else {
        tracing::warn!("Unknown node: {}", node_id);
        return (StatusCode::NOT_FOUND, "Unknown node").into_response();
    };

    match node.get_configuration(&param).await {
        Ok(Some(value)) => Json(value).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "Unknown parameter").into_response(),
        Err(NetworkError::Timeout) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "Z-Wave timeout").into_response()
        }
        Err(e) => zwave_error(&e),
    }
}

async fn set_config(
    State(state): State<AppState>,
    Path((node_id, param)): Path<(String, String)>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    let Some(node) = state.network.node(&node_id) else {
        tracing::warn!("Unknown node: {}", node_id);
        return (StatusCode::NOT_FOUND, "Unknown node").into_response();
    };

    let Some(value) = body.as_i64() else {
        tracing::warn!("Bad configuration value: {}", body);
        return (StatusCode::BAD_REQUEST, "Bad configuration value").into_response();
    };

    match node.set_configuration(&param, value, None).await {
        Ok(()) => ().into_response(),
        Err(NetworkError::BadValue(_)) => {
            (StatusCode::BAD_REQUEST, "Bad configuration value").into_response()
        }
        // unresolvable parameters and failed sends both report 404 here
        Err(_) => (StatusCode::NOT_FOUND, "Unknown configuration parameter").into_response(),
    }
}

// ============================================================================
// Association handlers
// ============================================================================

async fn get_association(
    State(state): State<AppState>,
    Path((node_id, group)): Path<(String, u8)>,
) -> Response {
    let Some(node) = state.network.node(&node_id) else {
        tracing::warn!("Unknown node: {}", node_id);
        return (StatusCode::NOT_FOUND, "Unknown node").into_response();
    };

    match node.get_multi_channel_association(group).await {
        Ok(members) => Json(members).into_response(),
        Err(NetworkError::Timeout) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "Z-Wave timeout").into_response()
        }
        Err(e) => zwave_error(&e),
    }
}

async fn set_association(
    State(state): State<AppState>,
    Path((node_id, group)): Path<(String, u8)>,
    Json(members): Json<AssociationMembers>,
) -> Response {
    let Some(node) = state.network.node(&node_id) else {
        tracing::warn!("Unknown node: {}", node_id);
        return (StatusCode::NOT_FOUND, "Unknown node").into_response();
    };

    match node
        .set_multi_channel_association(group, members.nodes, members.multi_channel_nodes)
        .await
    {
        Ok(()) => ().into_response(),
        Err(e) => zwave_error(&e),
    }
}

async fn remove_association(
    State(state): State<AppState>,
    Path((node_id, group)): Path<(String, u8)>,
    Json(members): Json<AssociationMembers>,
) -> Response {
    let Some(node) = state.network.node(&node_id) else {
        tracing::warn!("Unknown node: {}", node_id);
        return (StatusCode::NOT_FOUND, "Unknown node").into_response();
    };

    match node
        .remove_multi_channel_association(group, members.nodes, members.multi_channel_nodes)
        .await
    {
        Ok(()) => ().into_response(),
        Err(e) => zwave_error(&e),
    }
}

// ============================================================================
// Switch handlers
// ============================================================================

async fn list_switches(State(state): State<AppState>) -> impl IntoResponse {
    let switches: Vec<DeviceSummary> = state
        .network
        .switches()
        .iter()
        .map(|(id, endpoint)| DeviceSummary {
            id: id.clone(),
            name: endpoint.name().to_string(),
        })
        .collect();
    Json(switches)
}

async fn get_switch(State(state): State<AppState>, Path(switch_id): Path<String>) -> Response {
    let Some(switch) = state.network.switch(&switch_id) else {
        tracing::warn!("Unknown switch: {}", switch_id);
        return (StatusCode::NOT_FOUND, "Unknown switch").into_response();
    };

    match switch.get().await {
        Ok(Some(0)) => Json("off").into_response(),
        Ok(Some(_)) => Json("on").into_response(),
        Ok(None) => (StatusCode::INTERNAL_SERVER_ERROR, "Z-Wave timeout").into_response(),
        Err(e) => zwave_error(&e),
    }
}

async fn set_switch(
    State(state): State<AppState>,
    Path(switch_id): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    let Some(switch) = state.network.switch(&switch_id) else {
        tracing::warn!("Unknown switch: {}", switch_id);
        return (StatusCode::NOT_FOUND, "Unknown switch").into_response();
    };

    let value = match body.as_str() {
        Some("on") => 0xFF,
        Some("off") => 0x00,
        _ => {
            tracing::warn!("Bad switch value: {}", body);
            return (StatusCode::BAD_REQUEST, "Bad switch value").into_response();
        }
    };

    match switch.set(value).await {
        Ok(()) => ().into_response(),
        Err(e) => zwave_error(&e),
    }
}

// ============================================================================
// Dimmer handlers
// ============================================================================

async fn list_dimmers(State(state): State<AppState>) -> impl IntoResponse {
    let dimmers: Vec<DeviceSummary> = state
        .network
        .dimmers()
        .iter()
        .map(|(id, endpoint)| DeviceSummary {
            id: id.clone(),
            name: endpoint.name().to_string(),
        })
        .collect();
    Json(dimmers)
}

async fn get_dimmer(State(state): State<AppState>, Path(dimmer_id): Path<String>) -> Response {
    let Some(dimmer) = state.network.dimmer(&dimmer_id) else {
        tracing::warn!("Unknown dimmer: {}", dimmer_id);
        return (StatusCode::NOT_FOUND, "Unknown dimmer").into_response();
    };

    match dimmer.get().await {
        Ok(Some(level)) => Json(level).into_response(),
        Ok(None) => (StatusCode::INTERNAL_SERVER_ERROR, "Z-Wave timeout").into_response(),
        Err(e) => zwave_error(&e),
    }
}

async fn set_dimmer(
    State(state): State<AppState>,
    Path(dimmer_id): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    let Some(dimmer) = state.network.dimmer(&dimmer_id) else {
        tracing::warn!("Unknown dimmer: {}", dimmer_id);
        return (StatusCode::NOT_FOUND, "Unknown dimmer").into_response();
    };

    let level = match body.as_u64() {
        Some(level @ 0..=99) | Some(level @ 255) => level as u8,
        _ => {
            tracing::warn!("Bad dimmer level: {}", body);
            return (StatusCode::BAD_REQUEST, "Bad dimmer level").into_response();
        }
    };

    match dimmer.set(level).await {
        Ok(()) => ().into_response(),
        Err(NetworkError::BadValue(_)) => {
            (StatusCode::BAD_REQUEST, "Bad dimmer level").into_response()
        }
        Err(e) => zwave_error(&e),
    }
}

/// Map remaining network errors; transmit failures report 404 for
/// compatibility with existing clients
fn zwave_error(err: &NetworkError) -> Response {
    tracing::warn!("Z-Wave operation failed: {}", err);
    match err {
        NetworkError::Protocol(ProtocolError::TransmitFailed(_))
        | NetworkError::Protocol(ProtocolError::Timeout) => {
            (StatusCode::NOT_FOUND, "Z-Wave transmit failed").into_response()
        }
        NetworkError::UnknownNode(_) | NetworkError::UnknownParameter(_) => {
            (StatusCode::NOT_FOUND, "Unknown entity").into_response()
        }
        NetworkError::BadValue(_) => (StatusCode::BAD_REQUEST, "Bad value").into_response(),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "Z-Wave error").into_response(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "zwave_gateway_api=debug,zwave_protocol=debug,zwave_core=debug,info".into()
            }),
        )
        .init();

    tracing::info!("Starting Z-Wave gateway API server");

    let config_path =
        std::env::var("ZWAVE_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());
    let topology =
        zwave_core::config::load_network_config(std::path::Path::new(&config_path)).await?;

    let serial_port = std::env::var("ZWAVE_PORT").unwrap_or_else(|_| {
        for path in ["/dev/ttyACM0", "/dev/ttyUSB0"] {
            if std::path::Path::new(path).exists() {
                return path.to_string();
            }
        }
        "/dev/ttyACM0".to_string()
    });

    tracing::info!("Connecting to Z-Wave controller at {}", serial_port);
    let transport = Arc::new(ZWaveTransport::connect(&serial_port).await?);

    // the stick answers both with unsolicited frames that land in the log
    // and in known_nodes
    transport.request_version().await?;
    transport.request_init_data().await?;

    let network = Arc::new(ZWaveNetwork::build(topology, transport).await?);
    let state = AppState { network };

    let app = Router::new()
        .route("/health", get(health))
        .route("/api/node/", get(list_nodes))
        .route("/api/node/:id/config/", get(list_config_params))
        .route(
            "/api/node/:id/config/:param",
            get(get_config).put(set_config),
        )
        .route(
            "/api/node/:id/multi_channel_association/:group",
            get(get_association)
                .put(set_association)
                .delete(remove_association),
        )
        .route("/api/switch/", get(list_switches))
        .route("/api/switch/:id", get(get_switch).put(set_switch))
        .route("/api/dimmer/", get(list_dimmers))
        .route("/api/dimmer/:id", get(get_dimmer).put(set_dimmer))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = std::env::var("ZWAVE_HTTP_ADDR").unwrap_or_else(|_| "0.0.0.0:5000".to_string());
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
