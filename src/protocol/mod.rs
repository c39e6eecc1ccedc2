//! Chat wire protocol
//!
//! Message types exchanged between clients and the hub, and the
//! length-prefixed frame codec that carries them over a byte stream.

pub mod codec;
pub mod constants;
pub mod message;

pub use codec::{ClientCodec, ServerCodec};
pub use message::{Request, Response};
