//! 远程发送
//!
//! - `payload` - 各种请求体
//! - `client` - reqwest 客户端与错误归类

pub mod client;
pub mod payload;

pub use client::{generate_verification_code, DispatchClient};
pub use payload::{NotifyPayload, Payload};
