//! End-to-end orchestration: load the manifest, download sources, init the
//! staging tree, then walk modules through the cache one at a time.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::cache::Cache;
use crate::cli::Cli;
use crate::context::BuildContext;
use crate::error::{Error, Result};
use crate::manifest::Manifest;
use crate::sandbox;

pub fn run(cli: &Cli) -> Result<()> {
    let manifest_bytes = fs::read(&cli.manifest).map_err(|e| Error::io(e, &cli.manifest))?;
    let manifest = Manifest::from_json(&manifest_bytes)?;

    if cli.directory.exists() {
        fs::remove_dir_all(&cli.directory).map_err(|e| Error::io(e, &cli.directory))?;
    }

    let base_dir = std::env::current_dir().map_err(|e| Error::io(e, "."))?;
    let ctx = BuildContext::new(base_dir, cli.directory.clone(), current_arch());

    manifest.download(&ctx)?;

    let branch = manifest_branch(&cli.manifest);
    let cache = Cache::open(&ctx.cache_dir(), branch)?;
    if cli.disable_cache {
        cache.disable_lookups();
    }

    manifest.digest(&mut cache.checksum());

    if !cache.lookup(ctx.staging_dir())? {
        info!(app_id = %manifest.app_id, "initializing staging tree");
        sandbox::build_init(
            ctx.staging_dir(),
            &manifest.app_id,
            &manifest.sdk,
            &manifest.runtime,
            &manifest.runtime_version,
        )?;
        cache.commit(ctx.staging_dir(), &format!("Initialized {}", manifest.app_id))?;
    }

    ctx.set_options(manifest.global_options());

    info!(app_id = %manifest.app_id, "starting build");
    for module in &manifest.modules {
        module.digest(&mut cache.checksum(), &ctx);

        if !cache.lookup(ctx.staging_dir())? {
            module.build(&ctx)?;
            cache.commit(ctx.staging_dir(), &format!("Built {}", module.name))?;
        } else {
            info!(module = %module.name, "cache hit, skipping build");
        }
    }

    Ok(())
}

fn manifest_branch(manifest_path: &Path) -> String {
    manifest_path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| "manifest".to_string())
}

fn current_arch() -> String {
    std::env::consts::ARCH.to_string()
}
