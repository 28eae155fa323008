pub mod annotations;
pub mod names;
pub mod program;
pub mod set_manager;
pub mod store_graph;
pub mod xtype;

pub use names::{Canonical, ContextId, SlotName};
pub use store_graph::{ObjectId, ObserverId, RegionId, SlotId, StoreGraph};
pub use xtype::XType;
