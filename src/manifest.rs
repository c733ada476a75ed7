//! The whole-recipe root object: deserialised from JSON, contributes the
//! global digest, and owns the ordered module list.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::context::BuildContext;
use crate::digest::{Fingerprint, MANIFEST_V};
use crate::error::{Error, Result};
use crate::module::Module;
use crate::options::Options;

fn default_runtime_version() -> String {
    "master".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(rename = "app-id")]
    pub app_id: String,
    #[serde(default)]
    pub version: Option<String>,
    pub runtime: String,
    #[serde(rename = "runtime-version", default = "default_runtime_version")]
    pub runtime_version: String,
    pub sdk: String,
    #[serde(rename = "build-options", default)]
    pub build_options: Option<Options>,
    #[serde(default)]
    pub modules: Vec<Module>,
}

impl Manifest {
    /// Parses a manifest from JSON bytes and checks the non-empty-identifier
    /// invariant before any build work begins.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let manifest: Manifest = serde_json::from_slice(bytes)?;
        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> Result<()> {
        if self.app_id.trim().is_empty() {
            return Err(Error::config("app-id must not be empty"));
        }
        if self.runtime.trim().is_empty() {
            return Err(Error::config("runtime must not be empty"));
        }
        if self.sdk.trim().is_empty() {
            return Err(Error::config("sdk must not be empty"));
        }
        Ok(())
    }

    pub fn global_options(&self) -> Options {
        self.build_options.clone().unwrap_or_default()
    }

    /// Downloads every module's sources, in manifest order.
    pub fn download(&self, ctx: &BuildContext) -> Result<()> {
        info!("downloading sources");
        for module in &self.modules {
            module.download_sources(ctx)?;
        }
        Ok(())
    }

    /// Contributes schema version, app id, runtime, runtime version, sdk,
    /// and global options. `version` is deliberately excluded: it doesn't
    /// affect the build.
    pub fn digest(&self, fp: &mut Fingerprint) {
        fp.u32(MANIFEST_V);
        fp.string(Some(&self.app_id));
        fp.string(Some(&self.runtime));
        fp.string(Some(&self.runtime_version));
        fp.string(Some(&self.sdk));

        match &self.build_options {
            Some(opts) => {
                fp.bool(true);
                opts.digest(fp);
            }
            None => fp.bool(false),
        }
    }
}
