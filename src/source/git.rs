//! Remote repository sources, mirrored locally with `git2` and checked out
//! at a configured ref for each module that uses them.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::context::BuildContext;
use crate::digest::Fingerprint;
use crate::error::{Error, Result};
use crate::utils::uri_to_filename;

const MIRROR_REFSPEC: &str = "+refs/*:refs/*";

fn default_branch() -> String {
    "master".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub url: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default)]
    pub dest: Option<String>,
}

impl Repository {
    fn mirror_dir(&self, ctx: &BuildContext) -> std::path::PathBuf {
        ctx.download_dir().join("git").join(uri_to_filename(&self.url))
    }

    #[instrument(level = "debug", skip(ctx), fields(url = %self.url))]
    pub fn download(&self, ctx: &BuildContext) -> Result<()> {
        let mirror = self.mirror_dir(ctx);

        if mirror.exists() {
            debug!(path = %mirror.display(), "fetching into existing mirror");
            let repo = git2::Repository::open_bare(&mirror)?;
            let mut remote =
                repo.find_remote("origin").or_else(|_| repo.remote_anonymous(&self.url))?;
            remote.fetch(&[MIRROR_REFSPEC], None, None)?;
            return Ok(());
        }

        let parent = mirror.parent().expect("mirror dir always has a parent");
        std::fs::create_dir_all(parent).map_err(|e| Error::io(e, parent))?;

        debug!(path = %mirror.display(), "cloning mirror");
        let mut builder = git2::build::RepoBuilder::new();
        builder.bare(true);
        builder.remote_create(|repo, name, url| repo.remote_with_fetch(name, url, MIRROR_REFSPEC));
        builder.clone(&self.url, &mirror)?;

        Ok(())
    }

    #[instrument(level = "debug", skip(ctx))]
    pub fn extract(&self, dest: &Path, ctx: &BuildContext) -> Result<()> {
        let mirror = self.mirror_dir(ctx);
        let repo = git2::Repository::open_bare(&mirror)?;
        let object = repo.revparse_single(&self.branch)?;
        let tree = object.peel_to_tree()?;

        let mut checkout = git2::build::CheckoutBuilder::new();
        checkout.target_dir(dest).force();
        repo.checkout_tree(tree.as_object(), Some(&mut checkout))?;

        Ok(())
    }

    pub fn digest(&self, fp: &mut Fingerprint) {
        fp.string(Some(&self.url));
        fp.string(Some(&self.branch));
    }
}
