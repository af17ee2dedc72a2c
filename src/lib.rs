//! Full-screen sorter for a folder of images.
//!
//! The core is the navigation and caching engine: [`files::ImageSet`] lists
//! the folder, [`loader`] decodes and preloads, [`cache::FrameCache`] bounds
//! decoded memory, [`fileops`] moves, copies and deletes in the background,
//! [`mosaic`] lays out grids and contact sheets, and
//! [`navigator::Navigator`] ties them together. [`ui`] is the winit shell
//! the binary runs.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod fileops;
pub mod files;
pub mod loader;
pub mod mosaic;
pub mod navigator;
pub mod session;
pub mod ui;

pub use config::ViewerConfig;
pub use error::{DecodeError, Result, ViewerError};
pub use fileops::TransferMode;
pub use files::{Identity, ImageSet};
pub use navigator::{Action, NavState, NavigationInfo, Navigator, ViewMode};
