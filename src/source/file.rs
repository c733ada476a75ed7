//! Plain file sources: either a local path resolved under the base
//! directory, or a remote URL fetched once and cached under the download
//! directory. Unlike archives, no digest verification is declared for
//! these — whatever bytes are fetched are used as-is.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::context::BuildContext;
use crate::digest::Fingerprint;
use crate::error::{Error, Result};
use crate::utils::uri_to_filename;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct File {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub dest: Option<String>,
}

impl File {
    fn basename(&self) -> Result<&str> {
        let s = self.path.as_deref().or(self.url.as_deref()).ok_or_else(|| {
            Error::config("file source requires either `path` or `url`")
        })?;
        Ok(s.rsplit('/').next().unwrap_or(s))
    }

    fn local_path(&self, ctx: &BuildContext) -> Option<PathBuf> {
        self.path.as_deref().map(|p| ctx.base_dir().join(p))
    }

    fn remote_cache_path(&self, ctx: &BuildContext) -> Option<PathBuf> {
        let url = self.url.as_deref()?;
        Some(ctx.download_dir().join("file").join(uri_to_filename(url)).join(self.basename().ok()?))
    }

    pub fn download(&self, ctx: &BuildContext) -> Result<()> {
        if let Some(path) = self.local_path(ctx) {
            if !path.exists() {
                return Err(Error::not_found(format!(
                    "can't find file at {}",
                    self.path.as_deref().unwrap_or_default()
                )));
            }
            return Ok(());
        }

        let url = self.url.as_deref().ok_or_else(|| Error::config("file source requires `path` or `url`"))?;
        let target = self.remote_cache_path(ctx).expect("url is present");
        if target.exists() {
            return Ok(());
        }

        let client = ctx.http_client()?;
        let response = client.get(url).send()?;
        if !response.status().is_success() {
            return Err(Error::SourceFetch {
                url: url.to_string(),
                message: format!("unexpected status {}", response.status()),
            });
        }
        let body = response.bytes()?;

        let dir = target.parent().expect("remote cache path always has a parent");
        fs::create_dir_all(dir).map_err(|e| Error::io(e, dir))?;
        fs::write(&target, &body).map_err(|e| Error::io(e, &target))?;
        Ok(())
    }

    #[instrument(level = "debug", skip(ctx))]
    pub fn extract(&self, dest: &Path, ctx: &BuildContext) -> Result<()> {
        let src = self
            .local_path(ctx)
            .or_else(|| self.remote_cache_path(ctx))
            .ok_or_else(|| Error::config("file source requires `path` or `url`"))?;

        let target_dir = match &self.dest {
            Some(sub) => dest.join(sub),
            None => dest.to_path_buf(),
        };
        fs::create_dir_all(&target_dir).map_err(|e| Error::io(e, &target_dir))?;

        let basename = self.basename()?;
        let target_file = target_dir.join(basename);
        fs::copy(&src, &target_file).map_err(|e| Error::io(e, &target_file))?;
        Ok(())
    }

    pub fn digest(&self, fp: &mut Fingerprint) {
        fp.string(self.url.as_deref());
        fp.string(self.path.as_deref());
    }
}
