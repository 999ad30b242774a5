pub mod error;
mod join_type;
mod metadata;
mod stream;

pub use error::{JoinError, JoinRejection, JoinResult};
pub use join_type::JoinType;
pub use metadata::*;
pub use stream::*;
