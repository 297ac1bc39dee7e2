//! Application wiring: settings in, a bound HTTP server out

pub mod app;

pub use app::Application;
