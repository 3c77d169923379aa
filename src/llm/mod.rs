pub mod client;
pub mod gateway;
pub mod prompts;

pub use client::*;
pub use gateway::*;
pub use prompts::*;
