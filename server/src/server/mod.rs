mod server;
pub use server::{Collaborators, SyncServer};

mod server_config;
pub use server_config::SyncConfig;
