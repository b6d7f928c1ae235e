pub mod booking;
pub mod clock;
pub mod config;
pub mod dto;
pub mod error;
pub mod gateway;
pub mod item;
pub mod model;
pub mod page;
pub mod request;
pub mod storage;
pub mod telemetry;
pub mod user;
pub mod validator;

pub use error::{ErrorKind, ShareItError, ShareItResult};
pub use gateway::Gateway;
