pub use transform_graph_common as common;

pub mod billboard;
pub mod builder;
mod cache;
pub mod camera;
pub mod clock;
mod compose;
pub mod error;
pub mod hierarchy;
pub mod node;
pub mod observer;
pub mod scene;
pub mod tree;

pub use billboard::BillboardMode;
pub use builder::NodeBuilder;
pub use cache::SyncCache;
pub use camera::CameraView;
pub use clock::{RenderClock, RenderId};
pub use error::{Result, SceneError};
pub use hierarchy::Hierarchy;
pub use node::{NodeId, Rotation, Space, TransformNode, TransformProperty};
pub use observer::{Observable, ObserverHandle};
pub use scene::Scene;
pub use tree::{TreeVisitor, walk_tree};
