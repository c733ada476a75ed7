//! Remote archive sources: fetched over HTTP, verified against a declared
//! SHA-256, and extracted with the system `tar`.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, instrument, trace, warn};
use url::Url;

use crate::context::BuildContext;
use crate::digest::Fingerprint;
use crate::error::{Error, Result};

fn default_strip() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Archive {
    pub url: String,
    #[serde(rename = "sha256")]
    pub sha256: String,
    #[serde(rename = "strip-components", default = "default_strip")]
    pub strip_components: u32,
    #[serde(default)]
    pub dest: Option<String>,
}

impl Archive {
    fn basename(&self) -> &str {
        self.url.rsplit('/').next().unwrap_or(&self.url)
    }

    fn download_location(&self, ctx: &BuildContext) -> PathBuf {
        ctx.download_dir().join(&self.sha256).join(self.basename())
    }

    #[instrument(level = "debug", skip(ctx), fields(url = %self.url))]
    pub fn download(&self, ctx: &BuildContext) -> Result<()> {
        let target = self.download_location(ctx);
        if target.exists() {
            trace!(path = %target.display(), "archive already downloaded, skipping");
            return Ok(());
        }

        let client = ctx.http_client()?;
        let mut url = self.url.clone();
        let body = loop {
            debug!(%url, "GET");
            let response = client.get(&url).send()?;

            if response.status().is_redirection() {
                let location = response
                    .headers()
                    .get(reqwest::header::LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| Error::SourceFetch {
                        url: url.clone(),
                        message: "redirect response missing Location header".to_string(),
                    })?
                    .to_string();
                let base = Url::parse(&url)
                    .map_err(|e| Error::SourceFetch { url: url.clone(), message: e.to_string() })?;
                let next = base
                    .join(&location)
                    .map_err(|e| Error::SourceFetch { url: url.clone(), message: e.to_string() })?;
                debug!(%next, "following redirect");
                url = next.into();
                continue;
            }

            if !response.status().is_success() {
                return Err(Error::SourceFetch {
                    url: url.clone(),
                    message: format!("unexpected status {}", response.status()),
                });
            }

            break response.bytes()?;
        };

        let mut hasher = Sha256::new();
        hasher.update(&body);
        let found = crate::utils::hex_lower(&hasher.finalize());

        if found != self.sha256.to_lowercase() {
            warn!(expected = %self.sha256, found = %found, "archive checksum mismatch");
            return Err(Error::DigestMismatch {
                file: self.basename().to_string(),
                expected: self.sha256.clone(),
                found,
            });
        }

        let dir = target.parent().expect("download_location always has a parent");
        fs::create_dir_all(dir).map_err(|e| Error::io(e, dir))?;
        fs::write(&target, &body).map_err(|e| Error::io(e, &target))?;

        Ok(())
    }

    #[instrument(level = "debug", skip(ctx))]
    pub fn extract(&self, dest: &Path, ctx: &BuildContext) -> Result<()> {
        let archive_path = self.download_location(ctx);
        let strip = format!("--strip-components={}", self.strip_components);

        let status = Command::new("tar")
            .arg("xf")
            .arg(&archive_path)
            .arg(&strip)
            .current_dir(dest)
            .status()
            .map_err(|e| Error::io(e, "tar"))?;

        if !status.success() {
            return Err(Error::SubprocessFailed { tool: "tar".to_string(), code: status.code().unwrap_or(-1) });
        }
        Ok(())
    }

    pub fn digest(&self, fp: &mut Fingerprint) {
        fp.string(Some(&self.url));
        fp.string(Some(&self.sha256));
        fp.u32(self.strip_components);
    }
}
