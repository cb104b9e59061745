//! Config handlers, shared by the standalone and group routes

use crate::api::rest::state::{AppState, ServiceFor};
use crate::error::ApiResult;
use crate::gates::{Caller, SchemaRef};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use cfgplane_placement::StrategyRequest;
use cfgplane_store::StoredConfig;
use cfgplane_types::{ConfigId, Org, PlacementTask};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Create config request
#[derive(Debug, Deserialize)]
pub struct CreateConfigRequest<C> {
    pub config: C,
    /// Validate against this schema before storing
    #[serde(default)]
    pub schema: Option<SchemaRef>,
}

/// Diff request: changes that turn `reference` into `new`
#[derive(Debug, Deserialize)]
pub struct DiffRequest {
    pub reference: ConfigId,
    pub new: ConfigId,
}

/// Placement response
#[derive(Debug, Serialize, Deserialize)]
pub struct PlaceResponse {
    pub tasks: Vec<PlacementTask>,
}

type NamespacePath = Path<(String, String)>;
type ConfigPath = Path<(String, String, String, String)>;

fn config_id((org, namespace, name, version): (String, String, String, String)) -> ConfigId {
    ConfigId::new(org, namespace, name, version)
}

/// Create a new config version
pub async fn create_config<C>(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<CreateConfigRequest<C>>,
) -> ApiResult<(StatusCode, Json<C>)>
where
    C: StoredConfig + Serialize + DeserializeOwned,
    AppState: ServiceFor<C>,
{
    let created = state
        .service()
        .put(&caller, request.config, request.schema.as_ref())
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// List the configs of a namespace
pub async fn list_configs<C>(
    State(state): State<AppState>,
    caller: Caller,
    Path((org, namespace)): NamespacePath,
) -> ApiResult<Json<Vec<C>>>
where
    C: StoredConfig + Serialize,
    AppState: ServiceFor<C>,
{
    let configs = state
        .service()
        .list(&caller, &Org::new(org), &namespace)
        .await?;
    Ok(Json(configs))
}

/// Get a specific config version
pub async fn get_config<C>(
    State(state): State<AppState>,
    caller: Caller,
    Path(path): ConfigPath,
) -> ApiResult<Json<C>>
where
    C: StoredConfig + Serialize,
    AppState: ServiceFor<C>,
{
    let config = state.service().get(&caller, &config_id(path)).await?;
    Ok(Json(config))
}

/// Delete a config version, returning it
pub async fn delete_config<C>(
    State(state): State<AppState>,
    caller: Caller,
    Path(path): ConfigPath,
) -> ApiResult<Json<C>>
where
    C: StoredConfig + Serialize,
    AppState: ServiceFor<C>,
{
    let removed = state.service().delete(&caller, &config_id(path)).await?;
    Ok(Json(removed))
}

/// Diff two stored versions
pub async fn diff_configs<C>(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<DiffRequest>,
) -> ApiResult<Json<C::DiffOutput>>
where
    C: StoredConfig,
    AppState: ServiceFor<C>,
{
    let diff = state
        .service()
        .diff(&caller, &request.reference, &request.new)
        .await?;
    Ok(Json(diff))
}

/// Place a config version on the fleet
pub async fn place_config<C>(
    State(state): State<AppState>,
    caller: Caller,
    Path(path): ConfigPath,
    Json(strategy): Json<StrategyRequest>,
) -> ApiResult<(StatusCode, Json<PlaceResponse>)>
where
    C: StoredConfig,
    AppState: ServiceFor<C>,
{
    let tasks = state
        .service()
        .place(&caller, &config_id(path), &strategy)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(PlaceResponse { tasks })))
}

/// List the placement tasks of a config version
pub async fn list_tasks<C>(
    State(state): State<AppState>,
    caller: Caller,
    Path(path): ConfigPath,
) -> ApiResult<Json<Vec<PlacementTask>>>
where
    C: StoredConfig,
    AppState: ServiceFor<C>,
{
    let tasks = state.service().list_tasks(&caller, &config_id(path)).await?;
    Ok(Json(tasks))
}
