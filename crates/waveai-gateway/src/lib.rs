//! waveai-gateway — HTTP front end for the WaveAI assistants
//!
//! Exposes chat, key checking, persona listing and a health probe over JSON.

pub mod protocol;
pub mod server;

pub use server::{GatewayServer, GatewayState};
