pub mod error;
pub mod types;
pub mod value;

pub use error::{FailurePoint, Result, WriteError};
pub use types::{Payload, RecordId};
pub use value::Value;
