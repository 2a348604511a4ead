pub mod config;
pub mod entity;
pub mod error;
pub mod time;
pub mod value;

pub use config::Config;
pub use entity::*;
pub use error::*;
pub use time::*;
pub use value::*;
