//! Stable digest primitives over the handful of shapes that appear in a
//! manifest: optional strings, ordered string lists, booleans and small
//! integers.
//!
//! Every primitive distinguishes "value absent" from "value present but
//! empty", so that `[null, "a"]` and `["a", null]` never collide (see the
//! crate-level digest invariants). Each higher-level digest (manifest,
//! module, options, source) leads with a version tag fed through [`Fingerprint::u32`]
//! so that changing the schema of one digest can never accidentally collide
//! with the previous schema's output.

use sha2::{Digest, Sha256};

/// Schema version for [`crate::manifest::Manifest::digest`].
pub const MANIFEST_V: u32 = 1;
/// Schema version for [`crate::module::Module::digest`].
pub const MODULE_V: u32 = 1;
/// Schema version for [`crate::options::Options::digest`].
pub const OPTIONS_V: u32 = 1;
/// Schema version for source digests (one per [`crate::source::Source`] variant).
pub const SOURCE_V: u32 = 1;

const NULL_STRING: u8 = 0x01;
const NULL_LIST: u8 = 0x02;
const PRESENT_LIST: u8 = 0x01;

/// A running SHA-256 accumulator extended with the primitives every
/// digest-relevant field in the manifest is fed through.
#[derive(Clone)]
pub struct Fingerprint {
    hasher: Sha256,
}

impl Default for Fingerprint {
    fn default() -> Self {
        Self::new()
    }
}

impl Fingerprint {
    pub fn new() -> Self {
        Self { hasher: Sha256::new() }
    }

    /// Appends an optional string. `None` contributes a single sentinel byte
    /// distinct from any valid string encoding (including the empty string),
    /// which is itself terminated by a NUL the sentinel can't collide with.
    pub fn string(&mut self, s: Option<&str>) -> &mut Self {
        match s {
            Some(s) => {
                self.hasher.update(s.as_bytes());
                self.hasher.update([0u8]);
            }
            None => self.hasher.update([NULL_STRING]),
        }
        self
    }

    /// Appends an optional ordered list of strings, each fed through [`Self::string`].
    pub fn string_list<'a, I>(&mut self, xs: Option<I>) -> &mut Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        match xs {
            Some(xs) => {
                self.hasher.update([PRESENT_LIST]);
                for x in xs {
                    self.string(Some(x));
                }
            }
            None => self.hasher.update([NULL_LIST]),
        }
        self
    }

    pub fn bool(&mut self, b: bool) -> &mut Self {
        self.hasher.update([if b { 0x01 } else { 0x00 }]);
        self
    }

    /// Appends a 4-byte little-endian encoding of `n`.
    pub fn u32(&mut self, n: u32) -> &mut Self {
        self.hasher.update(n.to_le_bytes());
        self
    }

    /// Feeds raw bytes straight into the accumulator. Used by source kinds
    /// that digest file contents (e.g. a patch's bytes).
    pub fn bytes(&mut self, b: &[u8]) -> &mut Self {
        self.hasher.update(b);
        self
    }

    /// Consumes the accumulator and returns the final digest as lowercase hex.
    pub fn finish_hex(self) -> String {
        crate::utils::hex_lower(&self.hasher.finalize())
    }
}
