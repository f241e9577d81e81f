pub mod retry;

pub use retry::{retry_fixed, IsTransient, RetryConfig, RetryResult};
