pub mod config;
pub mod detect;

pub use config::*;
pub use detect::*;
