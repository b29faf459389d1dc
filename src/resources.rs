//! Sandbox and training resources, each a thin wrapper over
//! [`KypoClient::execute_with_retry`](crate::client::KypoClient::execute_with_retry).
//!
//! Payload types mirror what the service returns and tolerate missing fields, which decode to
//! their defaults.

mod allocation;
mod definition;
mod pool;
mod training;
mod user;

pub use allocation::*;
pub use definition::*;
pub use pool::*;
pub use training::*;
pub use user::*;
