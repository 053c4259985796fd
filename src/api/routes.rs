//! API Routes
//!
//! HTTP endpoint definitions. Every aggregate exposes the same request
//! shapes: add, get, remove, search by a named filter, update the base
//! fields, update one named field, plus its own operations.

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;

use crate::aggregate::device::DeviceDraft;
use crate::aggregate::scene::SceneDraft;
use crate::aggregate::{Device, Group, Maintain, Region, Room, Scene};
use crate::domain::OperationContext;
use crate::error::AppError;
use crate::handlers::{
    AddAreaRequest, AddGroupRequest, AddMaintainRequest, AddRegionRequest, AddRoomRequest,
    AreaInfo, BaseRequest, BindRequest, DeviceRequest, DisplaysRequest, FilterRequest, Handlers,
    ListReply, MemberRequest, Reply, UpdateRequest,
};

type ApiResult<T> = Result<Json<Reply<T>>, AppError>;

fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(Reply::ok(data)))
}

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Deserialize)]
pub struct MemberBody {
    pub member: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CountQuery {
    pub scene: String,
}

// =========================================================================
// API Router
// =========================================================================

/// Create the API router
pub fn create_router() -> Router<Handlers> {
    Router::new()
        // Scenes
        .route("/scenes", post(add_scene))
        .route("/scenes/search", post(search_scenes))
        .route("/scenes/by-member/:user", get(get_scene_by_member))
        .route("/scenes/:uid", get(get_scene).delete(remove_scene))
        .route("/scenes/:uid/base", put(update_scene_base))
        .route("/scenes/:uid/field", put(update_scene_field))
        .route("/scenes/:uid/members", get(scene_members).post(append_scene_member))
        .route("/scenes/:uid/members/:member", delete(subtract_scene_member))
        // Groups
        .route("/groups", post(add_group))
        .route("/groups/search", post(search_groups))
        .route("/groups/:uid", get(get_group).delete(remove_group))
        .route("/groups/:uid/base", put(update_group_base))
        .route("/groups/:uid/field", put(update_group_field))
        .route("/groups/:uid/members", post(append_group_member))
        .route("/groups/:uid/members/:member", delete(subtract_group_member))
        // Rooms
        .route("/rooms", post(add_room))
        .route("/rooms/search", post(search_rooms))
        .route("/rooms/:uid", get(get_room).delete(remove_room))
        .route("/rooms/:uid/base", put(update_room_base))
        .route("/rooms/:uid/field", put(update_room_field))
        .route("/rooms/:uid/devices", post(append_room_device))
        .route("/rooms/:uid/devices/:device", get(room_had_device).delete(subtract_room_device))
        .route("/rooms/:uid/displays", put(update_room_displays))
        // Areas
        .route("/areas", post(add_area))
        .route("/areas/search", post(search_areas))
        .route("/areas/:uid", get(get_area).delete(remove_area))
        .route("/areas/:uid/base", put(update_area_base))
        .route("/areas/:uid/field", put(update_area_field))
        .route("/areas/:uid/device", post(append_area_device).delete(subtract_area_device))
        // Devices
        .route("/devices", post(add_device))
        .route("/devices/count", get(count_devices))
        .route("/devices/search", post(search_devices))
        .route("/devices/by-sn/:sn", get(get_device_by_serial))
        .route("/devices/:uid", get(get_device).delete(remove_device))
        .route("/devices/:uid/base", put(update_device_base))
        .route("/devices/:uid/field", put(update_device_field))
        .route("/devices/:uid/bind", post(bind_device))
        // Regions
        .route("/regions", post(add_region))
        .route("/regions/search", post(search_regions))
        .route("/regions/:uid", get(get_region).delete(remove_region))
        .route("/regions/:uid/base", put(update_region_base))
        .route("/regions/:uid/field", put(update_region_field))
        .route("/regions/:uid/members", post(append_region_member))
        .route("/regions/:uid/members/:member", delete(subtract_region_member))
        // Maintain tickets
        .route("/maintains", post(add_maintain))
        .route("/maintains/count", get(count_maintains))
        .route("/maintains/search", post(search_maintains))
        .route("/maintains/:uid", get(get_maintain).delete(remove_maintain))
}

// =========================================================================
// Scenes
// =========================================================================

async fn add_scene(
    State(handlers): State<Handlers>,
    Extension(context): Extension<OperationContext>,
    Json(draft): Json<SceneDraft>,
) -> Result<(StatusCode, Json<Reply<Scene>>), AppError> {
    let scene = handlers.scene.add_one(draft, &context).await?;
    Ok((StatusCode::CREATED, Json(Reply::ok(scene))))
}

async fn get_scene(State(handlers): State<Handlers>, Path(uid): Path<String>) -> ApiResult<Scene> {
    ok(handlers.scene.get_one(&uid).await?)
}

async fn get_scene_by_member(
    State(handlers): State<Handlers>,
    Path(user): Path<String>,
) -> ApiResult<Scene> {
    ok(handlers.scene.get_by_member(&user).await?)
}

async fn remove_scene(
    State(handlers): State<Handlers>,
    Extension(context): Extension<OperationContext>,
    Path(uid): Path<String>,
) -> ApiResult<()> {
    ok(handlers.scene.remove_one(&uid, &context).await?)
}

async fn search_scenes(
    State(handlers): State<Handlers>,
    Json(request): Json<FilterRequest>,
) -> ApiResult<ListReply<Scene>> {
    ok(handlers.scene.get_list(&request).await?)
}

async fn update_scene_base(
    State(handlers): State<Handlers>,
    Extension(context): Extension<OperationContext>,
    Path(uid): Path<String>,
    Json(mut request): Json<BaseRequest>,
) -> ApiResult<Scene> {
    request.uid = uid;
    ok(handlers.scene.update_base(request, &context).await?)
}

async fn update_scene_field(
    State(handlers): State<Handlers>,
    Extension(context): Extension<OperationContext>,
    Path(uid): Path<String>,
    Json(mut request): Json<UpdateRequest>,
) -> ApiResult<Scene> {
    request.uid = uid;
    ok(handlers.scene.update_by_filter(request, &context).await?)
}

async fn scene_members(
    State(handlers): State<Handlers>,
    Path(uid): Path<String>,
) -> ApiResult<Vec<String>> {
    ok(handlers.scene.members(&uid).await?)
}

async fn append_scene_member(
    State(handlers): State<Handlers>,
    Path(uid): Path<String>,
    Json(body): Json<MemberBody>,
) -> ApiResult<Scene> {
    let request = MemberRequest {
        uid,
        member: body.member,
    };
    ok(handlers.scene.append_member(&request).await?)
}

async fn subtract_scene_member(
    State(handlers): State<Handlers>,
    Path((uid, member)): Path<(String, String)>,
) -> ApiResult<Scene> {
    ok(handlers.scene.subtract_member(&MemberRequest { uid, member }).await?)
}

// =========================================================================
// Groups
// =========================================================================

async fn add_group(
    State(handlers): State<Handlers>,
    Extension(context): Extension<OperationContext>,
    Json(request): Json<AddGroupRequest>,
) -> Result<(StatusCode, Json<Reply<Group>>), AppError> {
    let group = handlers.group.add_one(request, &context).await?;
    Ok((StatusCode::CREATED, Json(Reply::ok(group))))
}

async fn get_group(State(handlers): State<Handlers>, Path(uid): Path<String>) -> ApiResult<Group> {
    ok(handlers.group.get_one(&uid).await?)
}

async fn remove_group(
    State(handlers): State<Handlers>,
    Extension(context): Extension<OperationContext>,
    Path(uid): Path<String>,
) -> ApiResult<()> {
    ok(handlers.group.remove_one(&uid, &context).await?)
}

async fn search_groups(
    State(handlers): State<Handlers>,
    Json(request): Json<FilterRequest>,
) -> ApiResult<ListReply<Group>> {
    ok(handlers.group.get_list(&request).await?)
}

async fn update_group_base(
    State(handlers): State<Handlers>,
    Extension(context): Extension<OperationContext>,
    Path(uid): Path<String>,
    Json(mut request): Json<BaseRequest>,
) -> ApiResult<Group> {
    request.uid = uid;
    ok(handlers.group.update_base(request, &context).await?)
}

async fn update_group_field(
    State(handlers): State<Handlers>,
    Extension(context): Extension<OperationContext>,
    Path(uid): Path<String>,
    Json(mut request): Json<UpdateRequest>,
) -> ApiResult<Group> {
    request.uid = uid;
    ok(handlers.group.update_by_filter(request, &context).await?)
}

async fn append_group_member(
    State(handlers): State<Handlers>,
    Path(uid): Path<String>,
    Json(body): Json<MemberBody>,
) -> ApiResult<Group> {
    let request = MemberRequest {
        uid,
        member: body.member,
    };
    ok(handlers.group.append_member(&request).await?)
}

async fn subtract_group_member(
    State(handlers): State<Handlers>,
    Path((uid, member)): Path<(String, String)>,
) -> ApiResult<Group> {
    ok(handlers.group.subtract_member(&MemberRequest { uid, member }).await?)
}

// =========================================================================
// Rooms
// =========================================================================

async fn add_room(
    State(handlers): State<Handlers>,
    Extension(context): Extension<OperationContext>,
    Json(request): Json<AddRoomRequest>,
) -> Result<(StatusCode, Json<Reply<Room>>), AppError> {
    let room = handlers.room.add_one(request, &context).await?;
    Ok((StatusCode::CREATED, Json(Reply::ok(room))))
}

async fn get_room(State(handlers): State<Handlers>, Path(uid): Path<String>) -> ApiResult<Room> {
    ok(handlers.room.get_one(&uid).await?)
}

async fn remove_room(
    State(handlers): State<Handlers>,
    Extension(context): Extension<OperationContext>,
    Path(uid): Path<String>,
) -> ApiResult<()> {
    ok(handlers.room.remove_one(&uid, &context).await?)
}

async fn search_rooms(
    State(handlers): State<Handlers>,
    Json(request): Json<FilterRequest>,
) -> ApiResult<ListReply<Room>> {
    ok(handlers.room.get_list(&request).await?)
}

async fn update_room_base(
    State(handlers): State<Handlers>,
    Extension(context): Extension<OperationContext>,
    Path(uid): Path<String>,
    Json(mut request): Json<BaseRequest>,
) -> ApiResult<Room> {
    request.uid = uid;
    ok(handlers.room.update_base(request, &context).await?)
}

async fn update_room_field(
    State(handlers): State<Handlers>,
    Extension(context): Extension<OperationContext>,
    Path(uid): Path<String>,
    Json(mut request): Json<UpdateRequest>,
) -> ApiResult<Room> {
    request.uid = uid;
    ok(handlers.room.update_by_filter(request, &context).await?)
}

async fn append_room_device(
    State(handlers): State<Handlers>,
    Extension(context): Extension<OperationContext>,
    Path(uid): Path<String>,
    Json(mut request): Json<DeviceRequest>,
) -> ApiResult<AreaInfo> {
    request.uid = uid;
    let area = handlers.room.append_device(&request, &context).await?;
    ok(handlers.area.get_one(area.base.uid.as_str()).await?)
}

async fn room_had_device(
    State(handlers): State<Handlers>,
    Path((uid, device)): Path<(String, String)>,
) -> ApiResult<bool> {
    ok(handlers.room.had_device(&uid, &device).await?)
}

async fn subtract_room_device(
    State(handlers): State<Handlers>,
    Extension(context): Extension<OperationContext>,
    Path((uid, device)): Path<(String, String)>,
) -> ApiResult<usize> {
    let request = DeviceRequest {
        uid,
        device,
        ..Default::default()
    };
    let cleared = handlers.room.subtract_device(&request, &context).await?;
    ok(cleared.len())
}

async fn update_room_displays(
    State(handlers): State<Handlers>,
    Extension(context): Extension<OperationContext>,
    Path(uid): Path<String>,
    Json(mut request): Json<DisplaysRequest>,
) -> ApiResult<AreaInfo> {
    request.uid = uid;
    let area = handlers.room.update_displays(request, &context).await?;
    ok(handlers.area.get_one(area.base.uid.as_str()).await?)
}

// =========================================================================
// Areas
// =========================================================================

async fn add_area(
    State(handlers): State<Handlers>,
    Extension(context): Extension<OperationContext>,
    Json(request): Json<AddAreaRequest>,
) -> Result<(StatusCode, Json<Reply<AreaInfo>>), AppError> {
    let area = handlers.area.add_one(request, &context).await?;
    Ok((StatusCode::CREATED, Json(Reply::ok(area))))
}

async fn get_area(State(handlers): State<Handlers>, Path(uid): Path<String>) -> ApiResult<AreaInfo> {
    ok(handlers.area.get_one(&uid).await?)
}

async fn remove_area(
    State(handlers): State<Handlers>,
    Extension(context): Extension<OperationContext>,
    Path(uid): Path<String>,
) -> ApiResult<()> {
    ok(handlers.area.remove_one(&uid, &context).await?)
}

async fn search_areas(
    State(handlers): State<Handlers>,
    Json(request): Json<FilterRequest>,
) -> ApiResult<ListReply<AreaInfo>> {
    ok(handlers.area.get_list(&request).await?)
}

async fn update_area_base(
    State(handlers): State<Handlers>,
    Extension(context): Extension<OperationContext>,
    Path(uid): Path<String>,
    Json(mut request): Json<BaseRequest>,
) -> ApiResult<AreaInfo> {
    request.uid = uid;
    ok(handlers.area.update_base(request, &context).await?)
}

async fn update_area_field(
    State(handlers): State<Handlers>,
    Extension(context): Extension<OperationContext>,
    Path(uid): Path<String>,
    Json(mut request): Json<UpdateRequest>,
) -> ApiResult<AreaInfo> {
    request.uid = uid;
    ok(handlers.area.update_by_filter(request, &context).await?)
}

async fn append_area_device(
    State(handlers): State<Handlers>,
    Extension(context): Extension<OperationContext>,
    Path(uid): Path<String>,
    Json(mut request): Json<DeviceRequest>,
) -> ApiResult<AreaInfo> {
    request.uid = uid;
    ok(handlers.area.append_device(request, &context).await?)
}

async fn subtract_area_device(
    State(handlers): State<Handlers>,
    Extension(context): Extension<OperationContext>,
    Path(uid): Path<String>,
) -> ApiResult<AreaInfo> {
    ok(handlers.area.subtract_device(&uid, &context).await?)
}

// =========================================================================
// Devices
// =========================================================================

async fn add_device(
    State(handlers): State<Handlers>,
    Extension(context): Extension<OperationContext>,
    Json(draft): Json<DeviceDraft>,
) -> Result<(StatusCode, Json<Reply<Device>>), AppError> {
    let device = handlers.device.add_one(draft, &context).await?;
    Ok((StatusCode::CREATED, Json(Reply::ok(device))))
}

async fn get_device(State(handlers): State<Handlers>, Path(uid): Path<String>) -> ApiResult<Device> {
    ok(handlers.device.get_one(&uid).await?)
}

async fn get_device_by_serial(
    State(handlers): State<Handlers>,
    Path(sn): Path<String>,
) -> ApiResult<Device> {
    ok(handlers.device.get_by_serial(&sn).await?)
}

async fn count_devices(State(handlers): State<Handlers>) -> ApiResult<u64> {
    ok(handlers.device.count().await?)
}

async fn remove_device(
    State(handlers): State<Handlers>,
    Extension(context): Extension<OperationContext>,
    Path(uid): Path<String>,
) -> ApiResult<()> {
    ok(handlers.device.remove_one(&uid, &context).await?)
}

async fn search_devices(
    State(handlers): State<Handlers>,
    Json(request): Json<FilterRequest>,
) -> ApiResult<ListReply<Device>> {
    ok(handlers.device.get_list(&request).await?)
}

async fn update_device_base(
    State(handlers): State<Handlers>,
    Extension(context): Extension<OperationContext>,
    Path(uid): Path<String>,
    Json(mut request): Json<BaseRequest>,
) -> ApiResult<Device> {
    request.uid = uid;
    ok(handlers.device.update_base(request, &context).await?)
}

async fn update_device_field(
    State(handlers): State<Handlers>,
    Extension(context): Extension<OperationContext>,
    Path(uid): Path<String>,
    Json(mut request): Json<UpdateRequest>,
) -> ApiResult<Device> {
    request.uid = uid;
    ok(handlers.device.update_by_filter(request, &context).await?)
}

async fn bind_device(
    State(handlers): State<Handlers>,
    Extension(context): Extension<OperationContext>,
    Path(uid): Path<String>,
    Json(mut request): Json<BindRequest>,
) -> ApiResult<Device> {
    request.uid = uid;
    ok(handlers.device.bind(request, &context).await?)
}

// =========================================================================
// Regions
// =========================================================================

async fn add_region(
    State(handlers): State<Handlers>,
    Extension(context): Extension<OperationContext>,
    Json(request): Json<AddRegionRequest>,
) -> Result<(StatusCode, Json<Reply<Region>>), AppError> {
    let region = handlers.region.add_one(request, &context).await?;
    Ok((StatusCode::CREATED, Json(Reply::ok(region))))
}

async fn get_region(State(handlers): State<Handlers>, Path(uid): Path<String>) -> ApiResult<Region> {
    ok(handlers.region.get_one(&uid).await?)
}

async fn remove_region(
    State(handlers): State<Handlers>,
    Extension(context): Extension<OperationContext>,
    Path(uid): Path<String>,
) -> ApiResult<()> {
    ok(handlers.region.remove_one(&uid, &context).await?)
}

async fn search_regions(
    State(handlers): State<Handlers>,
    Json(request): Json<FilterRequest>,
) -> ApiResult<ListReply<Region>> {
    ok(handlers.region.get_list(&request).await?)
}

async fn update_region_base(
    State(handlers): State<Handlers>,
    Extension(context): Extension<OperationContext>,
    Path(uid): Path<String>,
    Json(mut request): Json<BaseRequest>,
) -> ApiResult<Region> {
    request.uid = uid;
    ok(handlers.region.update_base(request, &context).await?)
}

async fn update_region_field(
    State(handlers): State<Handlers>,
    Extension(context): Extension<OperationContext>,
    Path(uid): Path<String>,
    Json(mut request): Json<UpdateRequest>,
) -> ApiResult<Region> {
    request.uid = uid;
    ok(handlers.region.update_by_filter(request, &context).await?)
}

async fn append_region_member(
    State(handlers): State<Handlers>,
    Path(uid): Path<String>,
    Json(body): Json<MemberBody>,
) -> ApiResult<Region> {
    let request = MemberRequest {
        uid,
        member: body.member,
    };
    ok(handlers.region.append_member(&request).await?)
}

async fn subtract_region_member(
    State(handlers): State<Handlers>,
    Path((uid, member)): Path<(String, String)>,
) -> ApiResult<Region> {
    ok(handlers.region.subtract_member(&MemberRequest { uid, member }).await?)
}

// =========================================================================
// Maintain tickets
// =========================================================================

async fn add_maintain(
    State(handlers): State<Handlers>,
    Extension(context): Extension<OperationContext>,
    Json(request): Json<AddMaintainRequest>,
) -> Result<(StatusCode, Json<Reply<Maintain>>), AppError> {
    let ticket = handlers.maintain.add_one(request, &context).await?;
    Ok((StatusCode::CREATED, Json(Reply::ok(ticket))))
}

async fn get_maintain(State(handlers): State<Handlers>, Path(uid): Path<String>) -> ApiResult<Maintain> {
    ok(handlers.maintain.get_one(&uid).await?)
}

async fn remove_maintain(State(handlers): State<Handlers>, Path(uid): Path<String>) -> ApiResult<()> {
    ok(handlers.maintain.remove_one(&uid).await?)
}

async fn search_maintains(
    State(handlers): State<Handlers>,
    Json(request): Json<FilterRequest>,
) -> ApiResult<ListReply<Maintain>> {
    ok(handlers.maintain.get_list(&request).await?)
}

async fn count_maintains(
    State(handlers): State<Handlers>,
    axum::extract::Query(query): axum::extract::Query<CountQuery>,
) -> ApiResult<u64> {
    ok(handlers.maintain.count(&query.scene).await?)
}
