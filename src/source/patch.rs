//! Local patch sources, applied with the system `patch` utility after
//! archives have been extracted.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::context::BuildContext;
use crate::digest::Fingerprint;
use crate::error::{Error, Result};

fn default_strip() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patch {
    pub path: String,
    #[serde(rename = "strip-components", default = "default_strip")]
    pub strip_components: u32,
    #[serde(default)]
    pub dest: Option<String>,
}

impl Patch {
    fn resolved_path(&self, ctx: &BuildContext) -> PathBuf {
        ctx.base_dir().join(&self.path)
    }

    pub fn download(&self, ctx: &BuildContext) -> Result<()> {
        let path = self.resolved_path(ctx);
        if !path.exists() {
            return Err(Error::not_found(format!("can't find patch file at {}", self.path)));
        }
        Ok(())
    }

    #[instrument(level = "debug", skip(ctx))]
    pub fn extract(&self, dest: &Path, ctx: &BuildContext) -> Result<()> {
        let path = self.resolved_path(ctx);
        let strip = format!("-p{}", self.strip_components);

        let status = Command::new("patch")
            .arg(&strip)
            .arg("-i")
            .arg(&path)
            .current_dir(dest)
            .status()
            .map_err(|e| Error::io(e, "patch"))?;

        if !status.success() {
            return Err(Error::SubprocessFailed { tool: "patch".to_string(), code: status.code().unwrap_or(-1) });
        }
        Ok(())
    }

    pub fn digest(&self, fp: &mut Fingerprint, ctx: &BuildContext) {
        let path = self.resolved_path(ctx);
        if let Ok(bytes) = fs::read(&path) {
            fp.bytes(&bytes);
        }
        fp.string(Some(&self.path));
        fp.u32(self.strip_components);
    }
}
