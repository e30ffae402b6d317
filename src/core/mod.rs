//! The core module holds the device abstraction and everything needed to configure the library.

pub mod app_info;
pub mod device;
pub mod driver;
pub mod error;
pub mod queue;
