pub mod backend;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod inventory;
pub mod logging;

pub use dashboard::Dashboard;
pub use error::{Error, Result};
