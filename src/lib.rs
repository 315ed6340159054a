//! # huffman-codec
//!
//! Static (two-pass) Huffman encode/decode. The first pass counts byte
//! frequencies and builds a tree; the second pass walks the tree to
//! produce a code table and writes the tree plus the opcode stream.
//! Decoding walks the same tree one opcode bit at a time.
//!
//! The tree is serialized exactly as built rather than canonically
//! renumbered, so the decoder rebuilds the identical structure, not just
//! an equivalent one.
//!
//! ## Example
//!
//! ```
//! use huffman_codec::{encode, decode, OpcodeMode};
//! let data = b"the quick brown fox jumps over the lazy dog";
//! let artifact = encode(data, OpcodeMode::Bits).expect("encode failed");
//! let restored = decode(&artifact, OpcodeMode::Bits).expect("decode failed");
//! assert_eq!(restored, data);
//! ```

mod codec;
pub mod huffman;
mod tools;

pub use codec::{decode, encode, opcode_body_as_text, OpcodeMode};
pub use huffman::{CodeTable, Tree};

/// Errors surfaced by tree construction, serialization, and the
/// encode/decode pipelines.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("corrupt artifact: {0}")]
    CorruptArtifact(String),
    #[error("allocation failure: {0}")]
    AllocationFailure(String),
}
