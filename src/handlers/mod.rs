//! Request Handlers module
//!
//! One handler per aggregate. Handlers validate input, dispatch the named
//! filter and update keys and delegate to the scene cache.

mod commands;
mod area_handler;
mod device_handler;
mod group_handler;
mod maintain_handler;
mod region_handler;
mod room_handler;
mod scene_handler;


use std::sync::Arc;

pub use commands::*;
pub use area_handler::{AddAreaRequest, AreaHandler, AreaInfo};
pub use device_handler::{BindRequest, DeviceHandler};
pub use group_handler::{AddGroupRequest, GroupHandler};
pub use maintain_handler::{AddMaintainRequest, MaintainHandler};
pub use region_handler::{AddRegionRequest, RegionHandler};
pub use room_handler::{AddRoomRequest, DisplaysRequest, RoomHandler};
pub use scene_handler::SceneHandler;

use crate::cache::SceneCache;

/// Every handler, sharing one cache
#[derive(Clone)]
pub struct Handlers {
    pub scene: SceneHandler,
    pub group: GroupHandler,
    pub room: RoomHandler,
    pub area: AreaHandler,
    pub device: DeviceHandler,
    pub region: RegionHandler,
    pub maintain: MaintainHandler,
}

impl Handlers {
    pub fn new(cache: Arc<SceneCache>, default_page_size: u32) -> Self {
        Self {
            scene: SceneHandler::new(cache.clone(), default_page_size),
            group: GroupHandler::new(cache.clone(), default_page_size),
            room: RoomHandler::new(cache.clone(), default_page_size),
            area: AreaHandler::new(cache.clone(), default_page_size),
            device: DeviceHandler::new(cache.clone()),
            region: RegionHandler::new(cache.clone(), default_page_size),
            maintain: MaintainHandler::new(cache, default_page_size),
        }
    }
}

/// Requested page size, or the configured default when none was given
fn page_size(requested: u32, default: u32) -> u32 {
    if requested == 0 {
        default
    } else {
        requested
    }
}
