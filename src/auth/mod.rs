mod basic;
mod error;
pub mod password;

pub use basic::BasicCredentials;
pub use error::AuthError;
