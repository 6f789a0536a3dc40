pub mod client;
pub mod error;
pub mod types;

pub use client::TokenClient;
pub use error::AuthError;
pub use types::{TokenRequest, TokenResponse};
