//! Webserver library for the job assignment engine
//!
//! Exposes the engine's operations as JSON over HTTP and runs the lapsed-offer
//! sweeper in the background.

pub mod error;
pub mod services;
pub mod state;
pub mod web;
pub mod webserver_impl;

// Re-export main types
pub use error::{WebServerError, WebServerResult};
pub use services::Sweeper;
pub use state::WebServerState;
pub use webserver_impl::WebServer;
