//! Gateway protocol definitions
//!
//! Defines the wire envelope, op codes, typed payloads, intents and close codes.

mod close_codes;
mod envelope;
mod intents;
mod opcodes;
mod payloads;

pub use close_codes::CloseCode;
pub use envelope::Envelope;
pub use intents::GatewayIntents;
pub use opcodes::OpCode;
pub use payloads::{
    ConnectionProperties, HelloPayload, IdentifyPayload, ReadyPayload, ResumePayload,
};
