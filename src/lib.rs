pub mod bridge;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod image_set;
pub mod render;
pub mod schedule;
#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
pub mod transition;
pub mod tasks {
    pub mod control;
    pub mod files;
}

pub use bridge::ControlBridge;
pub use controller::PlaybackStatus;
pub use error::Error;
pub use render::SharedRenderer;
