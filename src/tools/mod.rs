//! Internal building blocks shared by the Huffman pipeline: the arena node
//! record, the ascending-frequency list, and the capacity/cursor bit
//! vector. None of this is public API; `crate::huffman` and `crate::codec`
//! assemble it into the documented Huffman tree and encode/decode
//! pipelines.

pub(crate) mod freq_list;
pub(crate) mod node;
pub(crate) mod opcode_bits;
