pub mod config;
mod responses;
pub mod jwt_auth;
mod telemetry;
pub mod semester;

pub use self::config::AppConfig;
pub use responses::*;
pub use telemetry::*;
