//! Service layer for docrag: configuration, component wiring, and the HTTP
//! transport. The `docrag` binary is a thin CLI over this crate.

pub mod app;
pub mod config;
pub mod response;
pub mod server;

pub use app::App;
pub use config::Config;
