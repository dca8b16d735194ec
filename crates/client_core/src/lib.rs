use std::sync::Arc;

pub mod coordinator;
pub mod error;
pub mod form;
pub mod gateway;
pub mod interaction;
pub mod store;
pub mod videos;

pub use coordinator::{
    ChangeOrigin, CollectionEvent, PendingReorder, ReorderCoordinator, ReorderOutcome,
    ReorderPhase,
};
pub use error::{ClientError, NetworkError, Restored};
pub use form::ItemForm;
pub use gateway::{HttpGateway, PersistenceGateway};
pub use interaction::{
    DragKey, KeyboardSensor, MoveRequest, MoveSensor, PointerSensor, SensorInput, SensorSet,
};
pub use store::{move_by_ids, OrderedCollectionStore};
pub use videos::VideoGateway;

/// Item list and video panel wired to one server.
pub struct DashboardClient {
    pub items: Arc<ReorderCoordinator>,
    pub videos: VideoGateway,
}

impl DashboardClient {
    pub fn new(server_url: &str) -> Result<Self, NetworkError> {
        let gateway = HttpGateway::new(server_url)?;
        Ok(Self {
            items: Arc::new(ReorderCoordinator::new(Arc::new(gateway))),
            videos: VideoGateway::new(server_url)?,
        })
    }
}
