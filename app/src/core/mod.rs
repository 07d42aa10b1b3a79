mod error;
pub mod resilience;
pub mod subscription;
pub mod time;
pub mod tree;
pub mod unit;

pub use error::WriteError;
pub use subscription::{Snapshot, Subscription};
