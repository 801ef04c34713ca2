pub mod catalog;
pub mod config;
pub mod error;
pub mod events;
pub mod geometry;
pub mod keymap;
pub mod services;
pub mod session;
pub mod timers;
pub mod processing {
    pub mod layout;
    pub mod resize;
}
pub mod render {
    pub mod gpu;
}
pub mod tasks {
    pub mod files;
    pub mod loader;
    pub mod viewer;
}

pub use catalog::{Catalog, CatalogBuild, ScanOptions};
pub use config::{Configuration, LaunchOptions, Settings};
pub use error::Error;
pub use session::{Phase, PlaybackState, Session};
