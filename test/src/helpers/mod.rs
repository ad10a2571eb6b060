pub mod loopback_bus;
pub mod recording_platform;
pub mod subject_builder;
pub mod test_node;

pub use loopback_bus::LoopbackBus;
pub use recording_platform::{PlatformCall, RecordingPlatform};
pub use subject_builder::{id, SubjectBuilder};
pub use test_node::{test_config, TestNode};
