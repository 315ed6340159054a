//! The Huffman tree itself: construction primitives, the pre-order parse
//! pass that produces a code table, binary serialize/deserialize, and the
//! one-bit-at-a-time `state_step` decoder.
//!
//! A tree moves through three states: empty (no root), unparsed (root set,
//! no code table yet), and parsed. Any structural mutation (`connect`,
//! `set_root`) resets it back to unparsed; `serialize` requires parsed.

use std::io::{Read, Write};

use crate::tools::node::{Arena, Node};
use crate::tools::opcode_bits::read_exact_or_corrupt;
use crate::Error;

/// Map from byte value to its opcode string. An entry is absent iff that
/// byte never occurred in the input the tree was built from.
pub struct CodeTable {
    codes: [Option<String>; 256],
}

impl CodeTable {
    fn empty() -> Self {
        Self {
            codes: std::array::from_fn(|_| None),
        }
    }

    pub fn get(&self, symbol: u8) -> Option<&str> {
        self.codes[symbol as usize].as_deref()
    }

    pub fn len(&self) -> usize {
        self.codes.iter().filter(|c| c.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn entries(&self) -> impl Iterator<Item = (u8, &str)> {
        self.codes
            .iter()
            .enumerate()
            .filter_map(|(s, c)| c.as_deref().map(|c| (s as u8, c)))
    }
}

pub struct Tree {
    arena: Arena,
    root: Option<usize>,
    parsed: bool,
    count: usize,
}

impl Tree {
    pub(crate) fn empty() -> Self {
        Self {
            arena: Arena::new(),
            root: None,
            parsed: false,
            count: 0,
        }
    }

    pub(crate) fn arena(&self) -> &Arena {
        &self.arena
    }

    pub(crate) fn arena_mut(&mut self) -> &mut Arena {
        &mut self.arena
    }

    pub(crate) fn set_root(&mut self, idx: usize) {
        self.root = Some(idx);
        self.parsed = false;
    }

    pub fn root_index(&self) -> Option<usize> {
        self.root
    }

    /// Attach `a` and `b` as children of `parent`, applying the canonical
    /// ordering rule: if `b` is a leaf, it becomes the right child and `a`
    /// the left; otherwise `b` goes left and `a` goes right. Purely
    /// cosmetic, but baked into the serialized pre-order form.
    pub(crate) fn connect(&mut self, parent: usize, a: usize, b: usize) -> Result<(), Error> {
        if self.arena.get(parent).is_leaf {
            return Err(Error::InvalidArgument(
                "cannot attach children to a leaf node".to_string(),
            ));
        }
        let (left, right) = if self.arena.get(b).is_leaf { (a, b) } else { (b, a) };
        self.arena.get_mut(parent).left = Some(left);
        self.arena.get_mut(parent).right = Some(right);
        self.parsed = false;
        Ok(())
    }

    /// Depth-first pre-order walk producing a code table. A lone leaf root
    /// (single distinct input byte) is a degenerate case: rather than
    /// fabricate a placeholder sibling, it is assigned the fixed code
    /// `"1"` directly; `state_step` knows to treat a leaf `current` node
    /// as a one-bit-per-symbol terminal case.
    pub fn parse(&mut self) -> Result<CodeTable, Error> {
        let root = self
            .root
            .ok_or_else(|| Error::InvalidState("tree has no root".to_string()))?;
        let mut table = CodeTable::empty();
        let count;
        if self.arena.get(root).is_leaf {
            table.codes[self.arena.get(root).symbol as usize] = Some("1".to_string());
            count = 1;
        } else {
            let mut code = String::new();
            let mut counter = 0usize;
            self.walk(root, &mut code, &mut table, &mut counter);
            count = counter;
        }
        self.count = count;
        self.parsed = true;
        Ok(table)
    }

    fn walk(&self, idx: usize, code: &mut String, table: &mut CodeTable, count: &mut usize) {
        *count += 1;
        let node = self.arena.get(idx);
        if node.is_leaf {
            table.codes[node.symbol as usize] = Some(code.clone());
            return;
        }
        if let Some(l) = node.left {
            code.push('0');
            self.walk(l, code, table, count);
            code.pop();
        }
        if let Some(r) = node.right {
            code.push('1');
            self.walk(r, code, table, count);
            code.pop();
        }
    }

    /// Write `count: u64` (little-endian) followed by the pre-order
    /// `(symbol: u8, is_leaf: u8)` sequence. Requires a parsed, non-empty
    /// tree.
    pub fn serialize<W: Write>(&self, writer: &mut W) -> Result<(), Error> {
        if !self.parsed {
            return Err(Error::InvalidState(
                "serialize requires a parsed tree".to_string(),
            ));
        }
        let root = self
            .root
            .ok_or_else(|| Error::InvalidState("tree is empty".to_string()))?;
        if self.count == 0 {
            return Err(Error::InvalidState("tree is empty".to_string()));
        }
        writer.write_all(&(self.count as u64).to_le_bytes())?;
        let mut pairs = Vec::with_capacity(self.count);
        self.collect_preorder(root, &mut pairs);
        for (symbol, is_leaf) in pairs {
            writer.write_all(&[symbol, is_leaf as u8])?;
        }
        Ok(())
    }

    fn collect_preorder(&self, idx: usize, out: &mut Vec<(u8, bool)>) {
        let node = self.arena.get(idx);
        out.push((node.symbol, node.is_leaf));
        if !node.is_leaf {
            if let Some(l) = node.left {
                self.collect_preorder(l, out);
            }
            if let Some(r) = node.right {
                self.collect_preorder(r, out);
            }
        }
    }

    /// Inverse of `serialize`. Root is at pre-order index 0; for a
    /// non-leaf at index `k`, the left child is at `k + 1` and the right
    /// child is at `left_subtree_last_index + 1`. Leaves get `frequency`
    /// initialized to 1 (frequencies are not serialized).
    pub fn deserialize<R: Read>(reader: &mut R) -> Result<Self, Error> {
        let mut hdr = [0u8; 8];
        read_exact_or_corrupt(reader, &mut hdr, "truncated tree node count")?;
        let count = u64::from_le_bytes(hdr) as usize;
        if count == 0 {
            return Err(Error::CorruptArtifact("tree has zero nodes".to_string()));
        }
        let mut pairs = Vec::with_capacity(count);
        for _ in 0..count {
            let mut buf = [0u8; 2];
            read_exact_or_corrupt(reader, &mut buf, "truncated tree node")?;
            pairs.push((buf[0], buf[1] != 0));
        }
        let mut arena = Arena::new();
        let (root, last) = Self::build_subtree(&pairs, 0, &mut arena)?;
        if last + 1 != count {
            return Err(Error::CorruptArtifact(
                "tree node count does not match its pre-order sequence".to_string(),
            ));
        }
        Ok(Self {
            arena,
            root: Some(root),
            parsed: true,
            count,
        })
    }

    fn build_subtree(
        pairs: &[(u8, bool)],
        k: usize,
        arena: &mut Arena,
    ) -> Result<(usize, usize), Error> {
        let (symbol, is_leaf) = *pairs.get(k).ok_or_else(|| {
            Error::CorruptArtifact("tree pre-order sequence ended early".to_string())
        })?;
        if is_leaf {
            let idx = arena.push(Node::new_leaf(symbol, 1));
            Ok((idx, k))
        } else {
            let idx = arena.push(Node::new_internal(0));
            let (left_idx, left_last) = Self::build_subtree(pairs, k + 1, arena)?;
            let (right_idx, right_last) = Self::build_subtree(pairs, left_last + 1, arena)?;
            arena.get_mut(idx).left = Some(left_idx);
            arena.get_mut(idx).right = Some(right_idx);
            Ok((idx, right_last))
        }
    }

    /// Descend one step from `current` given a single opcode bit (`false`
    /// = left, `true` = right). On reaching a leaf, emits its symbol and
    /// returns the root (the stream restarts there); otherwise returns the
    /// child with no emission.
    ///
    /// A lone-leaf tree (the degenerate single-symbol case) is handled by
    /// treating `current` itself being a leaf as terminal: one opcode bit
    /// is consumed per emission regardless of its value, and the root
    /// (itself) is returned as `next`.
    pub fn state_step(&self, current: Option<usize>, opcode: bool) -> Result<(usize, Option<u8>), Error> {
        let root = self
            .root
            .ok_or_else(|| Error::InvalidState("tree has no root".to_string()))?;
        let current = current
            .ok_or_else(|| Error::InvalidState("state_step requires a current node".to_string()))?;
        let node = self.arena.get(current);
        if node.is_leaf {
            return Ok((root, Some(node.symbol)));
        }
        let next = if opcode { node.right } else { node.left };
        let next = next.ok_or_else(|| {
            Error::InvalidState("node is missing the requested child".to_string())
        })?;
        let next_node = self.arena.get(next);
        if next_node.is_leaf {
            Ok((root, Some(next_node.symbol)))
        } else {
            Ok((next, None))
        }
    }
}
