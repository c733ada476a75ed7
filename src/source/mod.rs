//! The closed set of source kinds a module can declare, as a tagged union.
//!
//! Each variant owns its own acquisition (`download`), placement
//! (`extract`) and digest contribution, matching the class hierarchy the
//! acquisition pipeline used to need a vtable for — here it's just a `match`.

pub mod archive;
pub mod file;
pub mod git;
pub mod patch;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::context::BuildContext;
use crate::digest::{Fingerprint, SOURCE_V};
use crate::error::Result;

pub use archive::Archive;
pub use file::File;
pub use git::Repository;
pub use patch::Patch;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Source {
    #[serde(rename = "archive")]
    Archive(Archive),
    #[serde(rename = "patch")]
    Patch(Patch),
    #[serde(rename = "git")]
    Git(Repository),
    #[serde(rename = "file")]
    File(File),
}

impl Source {
    /// Fetches this source into the shared download cache. Idempotent:
    /// a source already present locally is left untouched.
    pub fn download(&self, ctx: &BuildContext) -> Result<()> {
        match self {
            Source::Archive(a) => a.download(ctx),
            Source::Patch(p) => p.download(ctx),
            Source::Git(g) => g.download(ctx),
            Source::File(f) => f.download(ctx),
        }
    }

    /// Places this source's content under `dest`, which is the module's
    /// build directory (or, for patches, the tree that directory already
    /// holds).
    pub fn extract(&self, dest: &Path, ctx: &BuildContext) -> Result<()> {
        match self {
            Source::Archive(a) => a.extract(dest, ctx),
            Source::Patch(p) => p.extract(dest, ctx),
            Source::Git(g) => g.extract(dest, ctx),
            Source::File(f) => f.extract(dest, ctx),
        }
    }

    /// Feeds this source's identity into a module's digest. A patch also
    /// mixes in its own file contents, which is why it alone takes `ctx`.
    pub fn digest(&self, fp: &mut Fingerprint, ctx: &BuildContext) {
        fp.u32(SOURCE_V);
        match self {
            Source::Archive(a) => {
                fp.string(Some("archive"));
                a.digest(fp);
            }
            Source::Patch(p) => {
                fp.string(Some("patch"));
                p.digest(fp, ctx);
            }
            Source::Git(g) => {
                fp.string(Some("git"));
                g.digest(fp);
            }
            Source::File(f) => {
                fp.string(Some("file"));
                f.digest(fp);
            }
        }
    }

    pub fn dest(&self) -> Option<&str> {
        match self {
            Source::Archive(a) => a.dest.as_deref(),
            Source::Patch(p) => p.dest.as_deref(),
            Source::Git(g) => g.dest.as_deref(),
            Source::File(f) => f.dest.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn git_tag_deserializes_to_repository_variant() {
        let json = r#"{"type": "git", "url": "https://example.com/foo.git"}"#;
        let source: Source = serde_json::from_str(json).unwrap();
        assert!(matches!(source, Source::Git(_)));
    }

    #[test]
    fn archive_round_trips() {
        let json = r#"{
            "type": "archive",
            "url": "https://example.com/foo-1.0.tar.gz",
            "sha256": "deadbeef",
            "strip-components": 1
        }"#;
        let source: Source = serde_json::from_str(json).unwrap();
        assert!(matches!(source, Source::Archive(_)));
        assert_eq!(source.dest(), None);
    }
}
