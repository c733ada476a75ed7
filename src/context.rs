//! Process-wide shared state threaded through a single driver invocation.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::time::Duration;

use once_cell::sync::OnceCell;

use crate::error::Result;
use crate::options::Options;

/// Base directory (input tree, holding the manifest and local patches),
/// staging directory (the accumulating `/app` install tree), download
/// directory, target architecture, and the currently-effective options.
///
/// Constructed once per driver invocation and shared read-only across
/// modules; `set_options` is the only controlled mutation, performed by the
/// driver immediately before each module is considered.
pub struct BuildContext {
    base_dir: PathBuf,
    staging_dir: PathBuf,
    download_dir: PathBuf,
    arch: String,
    http: OnceCell<reqwest::blocking::Client>,
    options: RefCell<Options>,
}

impl BuildContext {
    pub fn new(base_dir: impl Into<PathBuf>, staging_dir: impl Into<PathBuf>, arch: impl Into<String>) -> Self {
        let base_dir = base_dir.into();
        let download_dir = base_dir.join("downloads");
        Self {
            base_dir,
            staging_dir: staging_dir.into(),
            download_dir,
            arch: arch.into(),
            http: OnceCell::new(),
            options: RefCell::new(Options::default()),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    pub fn arch(&self) -> &str {
        &self.arch
    }

    pub fn state_dir(&self) -> PathBuf {
        self.base_dir.join(".state")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.base_dir.join(".buildcache")
    }

    /// Replaces the currently-effective options. Called by the driver before
    /// installing the manifest's global options and before each module.
    pub fn set_options(&self, options: Options) {
        *self.options.borrow_mut() = options;
    }

    pub fn options(&self) -> Options {
        self.options.borrow().clone()
    }

    /// Returns the lazily-constructed HTTP client, honouring `http_proxy`.
    /// Redirects are disabled here: archive downloads follow `Location`
    /// headers by hand so each hop can be logged and resolved relative to
    /// the current URL, matching the acquisition pipeline's redirect rule.
    pub fn http_client(&self) -> Result<&reqwest::blocking::Client> {
        self.http
            .get_or_try_init(|| {
                let mut builder = reqwest::blocking::Client::builder()
                    .redirect(reqwest::redirect::Policy::none())
                    .timeout(Duration::from_secs(300));

                if let Ok(proxy) = std::env::var("http_proxy") {
                    if let Ok(proxy) = reqwest::Proxy::http(&proxy) {
                        builder = builder.proxy(proxy);
                    }
                }

                builder.build()
            })
            .map_err(Into::into)
    }
}
