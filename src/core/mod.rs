pub mod config;
pub mod debug;
pub mod error;
pub mod log;
pub mod model;
pub mod server;
pub mod utils;

pub use ::http;
pub use ::toml;
pub use ::tracing;
pub use config::Config;
pub use error::Error;
pub use server::Server;
pub use utils::{ctor, dtor, implement, result, result::Result};

pub use crate as waveroom_core;
