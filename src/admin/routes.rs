use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, error};

use crate::domain::{CredentialKind, Gate, RuleTarget};
use crate::hardware;
use crate::persistence::{
    NewCredential, NewDevice, NewGate, NewRole, NewRule, NewTenant, NewUser, NewZone,
};

use super::websocket;
use super::{admin_auth_layer, AdminState};

const ONLINE_PROBE_TIMEOUT: Duration = Duration::from_millis(400);

/// Build all admin routes, CORS-permissive for dashboard use, gated by a
/// bearer-token layer whenever `admin.token` is configured.
pub fn build_routes(state: AdminState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router = Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .route("/api/gates/", get(gates_enriched_handler))
        .route("/api/gates/dashboard/stats", get(dashboard_stats_handler))
        .route("/api/gates/logs", get(recent_logs_handler))
        .route("/api/gates/{id}/open", post(override_trigger_handler))
        .route("/api/rules/{id}/toggle", post(rule_toggle_handler))
        .route("/api/rules", get(rules_list_handler).post(rule_create_handler))
        .route("/api/users", get(users_list_handler).post(user_create_handler))
        .route("/api/roles", get(roles_list_handler).post(role_create_handler))
        .route(
            "/api/tenants",
            get(tenants_list_handler).post(tenant_create_handler),
        )
        .route(
            "/api/infra/zones",
            get(zones_list_handler).post(zone_create_handler),
        )
        .route(
            "/api/infra/gates",
            get(gates_list_handler).post(gate_create_handler),
        )
        .route(
            "/api/devices",
            get(devices_list_handler).post(device_create_handler),
        );

    if state.token.is_some() {
        router = router.layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_layer,
        ));
    }

    router.layer(cors).with_state(state)
}

// ============================================================================
// Error handling
// ============================================================================

struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    fn internal(err: impl std::fmt::Display) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!(status = %self.status, message = %self.message, "admin request failed");
        (self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
    }
}

impl From<crate::errors::PersistenceError> for AppError {
    fn from(err: crate::errors::PersistenceError) -> Self {
        AppError::internal(err)
    }
}

impl From<crate::errors::EngineError> for AppError {
    fn from(err: crate::errors::EngineError) -> Self {
        let status = match err {
            crate::errors::EngineError::NoControllerForGate => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

type ApiResult<T> = Result<T, AppError>;

// ============================================================================
// Health
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: String,
}

async fn health_handler(State(state): State<AdminState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: state.version.clone(),
    })
}

// ============================================================================
// Live push channel
// ============================================================================

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AdminState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> impl IntoResponse {
    debug!(%addr, "admin live feed subscriber connecting");
    ws.on_upgrade(move |socket| websocket::handle_socket(socket, state))
}

// ============================================================================
// Enriched gate listing (GET /api/gates/)
// ============================================================================

#[derive(Serialize)]
struct EnrichedGate {
    id: i64,
    name: String,
    zone_from_id: Option<i64>,
    zone_to_id: Option<i64>,
    is_entry: bool,
    active_rule_names: Vec<String>,
    online: bool,
}

async fn gates_enriched_handler(State(state): State<AdminState>) -> ApiResult<Json<Vec<EnrichedGate>>> {
    let gates = state.persistence.all_gates()?;
    let rules = state.persistence.all_rules()?;

    let mut result = Vec::with_capacity(gates.len());
    for gate in gates {
        let active_rule_names: Vec<String> = rules
            .iter()
            .filter(|r| r.enabled)
            .filter(|r| matches!(r.target, RuleTarget::Global) || r.target == RuleTarget::Gate(gate.id))
            .map(|r| r.kind.as_str().to_string())
            .collect();

        let online = match state.persistence.find_device_for_gate(gate.id)? {
            Some(device) => hardware::check_online(&device.ip_address, device.port, ONLINE_PROBE_TIMEOUT).await,
            None => false,
        };

        result.push(EnrichedGate {
            id: gate.id,
            name: gate.name.clone(),
            zone_from_id: gate.zone_from_id,
            zone_to_id: gate.zone_to_id,
            is_entry: gate.is_entry(),
            active_rule_names,
            online,
        });
    }

    Ok(Json(result))
}

// ============================================================================
// Dashboard stats (GET /api/gates/dashboard/stats)
// ============================================================================

#[derive(Serialize)]
struct ZoneNode {
    id: i64,
    name: String,
    capacity: i64,
    occupancy: i64,
    percent_full: f64,
    children: Vec<ZoneNode>,
}

#[derive(Serialize)]
struct HardwareSummary {
    total_devices: usize,
    online: usize,
    offline: usize,
}

#[derive(Serialize)]
struct DashboardStats {
    zones: Vec<ZoneNode>,
    hardware: HardwareSummary,
}

async fn dashboard_stats_handler(State(state): State<AdminState>) -> ApiResult<Json<DashboardStats>> {
    let zones = state.persistence.all_zones()?;
    let devices = state.persistence.all_devices()?;

    let mut children: HashMap<Option<i64>, Vec<&crate::domain::Zone>> = HashMap::new();
    for zone in &zones {
        children.entry(zone.parent_zone_id).or_default().push(zone);
    }

    fn build(zone: &crate::domain::Zone, children: &HashMap<Option<i64>, Vec<&crate::domain::Zone>>) -> ZoneNode {
        let kids = children
            .get(&Some(zone.id))
            .map(|list| list.iter().map(|z| build(z, children)).collect())
            .unwrap_or_default();

        ZoneNode {
            id: zone.id,
            name: zone.name.clone(),
            capacity: zone.capacity,
            occupancy: zone.occupancy,
            percent_full: zone.percent_full(),
            children: kids,
        }
    }

    let roots = children.get(&None).cloned().unwrap_or_default();
    let zone_tree = roots.iter().map(|z| build(z, &children)).collect();

    let mut online = 0usize;
    for device in &devices {
        if hardware::check_online(&device.ip_address, device.port, ONLINE_PROBE_TIMEOUT).await {
            online += 1;
        }
    }

    Ok(Json(DashboardStats {
        zones: zone_tree,
        hardware: HardwareSummary {
            total_devices: devices.len(),
            online,
            offline: devices.len() - online,
        },
    }))
}

// ============================================================================
// Recent logs (GET /api/gates/logs)
// ============================================================================

async fn recent_logs_handler(
    State(state): State<AdminState>,
) -> ApiResult<Json<Vec<crate::domain::ScanLog>>> {
    Ok(Json(state.persistence.recent_scan_logs(20)?))
}

// ============================================================================
// Manual override trigger (POST /api/gates/{id}/open)
// ============================================================================

#[derive(Serialize)]
struct OverrideResponse {
    ok: bool,
}

async fn override_trigger_handler(
    State(state): State<AdminState>,
    Path(gate_id): Path<i64>,
) -> ApiResult<Json<OverrideResponse>> {
    crate::engine::trigger_manual_override(
        state.engine.persistence(),
        state.engine.events(),
        state.engine.hardware_timeout(),
        gate_id,
    )
    .await?;

    Ok(Json(OverrideResponse { ok: true }))
}

// ============================================================================
// Rule toggle (POST /api/rules/{id}/toggle)
// ============================================================================

#[derive(Serialize)]
struct ToggleResponse {
    enabled: bool,
}

async fn rule_toggle_handler(
    State(state): State<AdminState>,
    Path(rule_id): Path<i64>,
) -> ApiResult<Json<ToggleResponse>> {
    match state.persistence.toggle_rule(rule_id)? {
        Some(enabled) => Ok(Json(ToggleResponse { enabled })),
        None => Err(AppError::not_found(format!("rule {rule_id} not found"))),
    }
}

// ============================================================================
// CRUD: rules
// ============================================================================

#[derive(Deserialize)]
struct RuleCreateRequest {
    target: RuleTarget,
    kind: crate::domain::RuleKind,
    params: Option<String>,
}

async fn rules_list_handler(
    State(state): State<AdminState>,
) -> ApiResult<Json<Vec<crate::domain::ValidationRule>>> {
    Ok(Json(state.persistence.all_rules()?))
}

async fn rule_create_handler(
    State(state): State<AdminState>,
    Json(req): Json<RuleCreateRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let id = state.persistence.create_rule(&NewRule {
        target: req.target,
        kind: req.kind,
        params: req.params,
    })?;
    Ok(Json(serde_json::json!({ "id": id })))
}

// ============================================================================
// CRUD: users
// ============================================================================

#[derive(Deserialize)]
struct UserCreateRequest {
    first_name: String,
    last_name: String,
    role_id: i64,
    tenant_id: Option<i64>,
    #[serde(default)]
    credential: Option<CredentialCreateRequest>,
}

#[derive(Deserialize)]
struct CredentialCreateRequest {
    kind: CredentialKind,
    value: String,
}

async fn users_list_handler(State(state): State<AdminState>) -> ApiResult<Json<Vec<crate::domain::User>>> {
    Ok(Json(state.persistence.all_users()?))
}

async fn user_create_handler(
    State(state): State<AdminState>,
    Json(req): Json<UserCreateRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let user_id = state.persistence.create_user(&NewUser {
        first_name: req.first_name,
        last_name: req.last_name,
        role_id: req.role_id,
        tenant_id: req.tenant_id,
    })?;

    if let Some(cred) = req.credential {
        state.persistence.create_credential(&NewCredential {
            user_id,
            kind: cred.kind,
            value: cred.value,
        })?;
    }

    Ok(Json(serde_json::json!({ "id": user_id })))
}

// ============================================================================
// CRUD: roles
// ============================================================================

#[derive(Deserialize)]
struct RoleCreateRequest {
    name: String,
    #[serde(default)]
    may_ignore_capacity: bool,
    #[serde(default)]
    may_ignore_antipassback: bool,
    #[serde(default)]
    may_ignore_schedule: bool,
    #[serde(default)]
    is_billable: bool,
}

async fn roles_list_handler(State(state): State<AdminState>) -> ApiResult<Json<Vec<crate::domain::Role>>> {
    Ok(Json(state.persistence.all_roles()?))
}

async fn role_create_handler(
    State(state): State<AdminState>,
    Json(req): Json<RoleCreateRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let id = state.persistence.create_role(&NewRole {
        name: req.name,
        may_ignore_capacity: req.may_ignore_capacity,
        may_ignore_antipassback: req.may_ignore_antipassback,
        may_ignore_schedule: req.may_ignore_schedule,
        is_billable: req.is_billable,
    })?;
    Ok(Json(serde_json::json!({ "id": id })))
}

// ============================================================================
// CRUD: tenants
// ============================================================================

#[derive(Deserialize)]
struct TenantCreateRequest {
    name: String,
    quota_limit: i64,
}

async fn tenants_list_handler(State(state): State<AdminState>) -> ApiResult<Json<Vec<crate::domain::Tenant>>> {
    Ok(Json(state.persistence.all_tenants()?))
}

async fn tenant_create_handler(
    State(state): State<AdminState>,
    Json(req): Json<TenantCreateRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let id = state.persistence.create_tenant(&NewTenant {
        name: req.name,
        quota_limit: req.quota_limit,
    })?;
    Ok(Json(serde_json::json!({ "id": id })))
}

// ============================================================================
// CRUD: zones
// ============================================================================

#[derive(Deserialize)]
struct ZoneCreateRequest {
    name: String,
    capacity: i64,
    parent_zone_id: Option<i64>,
}

async fn zones_list_handler(State(state): State<AdminState>) -> ApiResult<Json<Vec<crate::domain::Zone>>> {
    Ok(Json(state.persistence.all_zones()?))
}

async fn zone_create_handler(
    State(state): State<AdminState>,
    Json(req): Json<ZoneCreateRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let id = state.persistence.create_zone(&NewZone {
        name: req.name,
        capacity: req.capacity,
        parent_zone_id: req.parent_zone_id,
    })?;
    Ok(Json(serde_json::json!({ "id": id })))
}

// ============================================================================
// CRUD: gates
// ============================================================================

#[derive(Deserialize)]
struct GateCreateRequest {
    name: String,
    zone_from_id: Option<i64>,
    zone_to_id: Option<i64>,
}

async fn gates_list_handler(State(state): State<AdminState>) -> ApiResult<Json<Vec<Gate>>> {
    Ok(Json(state.persistence.all_gates()?))
}

async fn gate_create_handler(
    State(state): State<AdminState>,
    Json(req): Json<GateCreateRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let id = state.persistence.create_gate(&NewGate {
        name: req.name,
        zone_from_id: req.zone_from_id,
        zone_to_id: req.zone_to_id,
    })?;
    Ok(Json(serde_json::json!({ "id": id })))
}

// ============================================================================
// CRUD: devices
// ============================================================================

#[derive(Deserialize)]
struct DeviceCreateRequest {
    name: String,
    ip_address: String,
    port: u16,
    kind: String,
    config: Option<String>,
    gate_id: i64,
}

async fn devices_list_handler(State(state): State<AdminState>) -> ApiResult<Json<Vec<crate::domain::Device>>> {
    Ok(Json(state.persistence.all_devices()?))
}

async fn device_create_handler(
    State(state): State<AdminState>,
    Json(req): Json<DeviceCreateRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let id = state.persistence.create_device(&NewDevice {
        name: req.name,
        ip_address: req.ip_address,
        port: req.port,
        kind: req.kind,
        config: req.config,
        gate_id: req.gate_id,
    })?;
    Ok(Json(serde_json::json!({ "id": id })))
}
