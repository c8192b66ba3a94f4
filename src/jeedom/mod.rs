pub mod client;
pub mod types;

pub use client::JeedomClient;
pub use types::Record;
