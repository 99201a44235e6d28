//! Event types and frame decoding for the council session stream.
//!
//! Every frame on the stream is a JSON envelope `{"type": ..., "data": ...}`.
//! This crate turns those frames into [`StreamEvent`]s and discards the rest.

mod decode;
mod types;

pub use decode::{decode_envelope, decode_frame, decode_or_ignore, DecodeError};
pub use types::*;
