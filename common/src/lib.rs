pub mod messages;
pub mod native;
pub mod config;
pub mod error;
pub mod tokens;
pub mod utils;

pub use messages::*;
pub use native::*;
pub use config::*;
pub use error::*;
pub use tokens::*;
pub use utils::*;
