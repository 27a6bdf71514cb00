//! AWS Bedrock provider implementation
//!
//! Non-streaming calls go to `/model/{id}/invoke` with a body chosen by the
//! model family. Streaming always uses the family-independent Converse API.
//! Every request is signed with SigV4.

pub mod anthropic;
mod client;
pub mod converse;
pub mod family;
pub mod meta;
pub mod mistral;
pub mod titan;

pub use client::{runtime_endpoint, BedrockProvider, SIGNING_SERVICE};
pub use family::{ModelFamily, NativeRequest};
