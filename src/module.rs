//! One buildable unit within a manifest: an ordered source set plus the
//! configure/make/install recipe that turns it into files under `/app`.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::command::CommandArgs;
use crate::context::BuildContext;
use crate::digest::{Fingerprint, MODULE_V};
use crate::error::{Error, Result};
use crate::options::{self, Options};
use crate::sandbox;
use crate::source::Source;

const MAKEFILE_NAMES: [&str; 3] = ["Makefile", "makefile", "GNUmakefile"];
const AUTOGEN_NAMES: [&str; 3] = ["autogen", "autogen.sh", "bootstrap"];
const BUILDDIR_MARKER: &str = "buildapi-variable-require-builddir";

/// Picks the first existing autogen-style entry point in `dir`, returning
/// the `./name` invocation form.
pub fn find_autogen_command(dir: &Path) -> Option<String> {
    AUTOGEN_NAMES.iter().find(|name| dir.join(name).exists()).map(|name| format!("./{name}"))
}

/// A configure script requiring an out-of-tree `_build` directory declares
/// `buildapi-variable-require-builddir` somewhere in its content.
pub fn needs_builddir(configure_content: &str) -> bool {
    configure_content.contains(BUILDDIR_MARKER)
}

/// A makefile suppresses parallel `-j`/`-l` flags by declaring
/// `.NOTPARALLEL` as its first line, or anywhere on a line of its own.
pub fn has_notparallel(makefile_content: &str) -> bool {
    makefile_content.starts_with(".NOTPARALLEL") || makefile_content.contains("\n.NOTPARALLEL")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    pub sources: Vec<Source>,
    #[serde(rename = "config-opts", default)]
    pub config_opts: Vec<String>,
    #[serde(rename = "make-args", default)]
    pub make_args: Vec<String>,
    #[serde(rename = "make-install-args", default)]
    pub make_install_args: Vec<String>,
    #[serde(rename = "rm-configure", default)]
    pub rm_configure: bool,
    #[serde(rename = "no-autogen", default)]
    pub no_autogen: bool,
    #[serde(rename = "build-options", default)]
    pub build_options: Option<Options>,
    #[serde(default)]
    pub cleanup: Vec<String>,
}

impl Module {
    pub fn download_sources(&self, ctx: &BuildContext) -> Result<()> {
        for source in &self.sources {
            source.download(ctx)?;
        }
        Ok(())
    }

    fn extract_sources(&self, dest: &Path, ctx: &BuildContext) -> Result<()> {
        if !dest.exists() {
            fs::create_dir_all(dest).map_err(|e| Error::io(e, dest))?;
        }
        for source in &self.sources {
            let target = match source.dest() {
                Some(sub) => {
                    let dir = dest.join(sub);
                    fs::create_dir_all(&dir).map_err(|e| Error::io(e, &dir))?;
                    dir
                }
                None => dest.to_path_buf(),
            };
            source.extract(&target, ctx)?;
        }
        Ok(())
    }

    fn run(&self, staging_dir: &Path, cwd: &Path, env: &[String], args: CommandArgs) -> Result<()> {
        sandbox::build(staging_dir, Some(cwd), env, args.into_vec())
    }

    /// Runs the full configure/make/install recipe for this module in a
    /// fresh temporary directory, then removes that directory.
    #[instrument(level = "info", skip(ctx), fields(module = %self.name))]
    pub fn build(&self, ctx: &BuildContext) -> Result<()> {
        info!("building module");

        let state_dir = ctx.state_dir();
        fs::create_dir_all(&state_dir).map_err(|e| Error::io(e, &state_dir))?;
        let prefix = format!("build-{}-", self.name);
        let source_dir = tempfile::Builder::new()
            .prefix(&prefix)
            .rand_bytes(6)
            .tempdir_in(&state_dir)
            .map_err(|e| Error::io(e, &state_dir))?;
        let source_dir_path = source_dir.path().to_path_buf();

        debug!(dir = %source_dir_path.display(), "extracting sources");
        self.extract_sources(&source_dir_path, ctx)?;

        let global = ctx.options();
        let module_opts = self.build_options.as_ref();
        let arch = ctx.arch();

        let mut env = options::resolve_env(&global, module_opts, arch);
        if let Some(cflags) = options::resolve_cflags(&global, module_opts, arch) {
            env.push(format!("CFLAGS={cflags}"));
        }
        if let Some(cxxflags) = options::resolve_cxxflags(&global, module_opts, arch) {
            env.push(format!("CXXFLAGS={cxxflags}"));
        }

        let configure_file = source_dir_path.join("configure");
        if self.rm_configure && configure_file.exists() {
            fs::remove_file(&configure_file).map_err(|e| Error::io(e, &configure_file))?;
        }

        if !configure_file.exists() {
            if self.no_autogen {
                return Err(Error::not_found(format!(
                    "module {}: no configure script and autogen disabled",
                    self.name
                )));
            }

            let autogen_cmd = find_autogen_command(&source_dir_path).ok_or_else(|| {
                Error::not_found(format!(
                    "module {}: can't find autogen, autogen.sh or bootstrap",
                    self.name
                ))
            })?;

            let mut autogen_env = env.clone();
            autogen_env.push("NOCONFIGURE=1".to_string());

            self.run(
                ctx.staging_dir(),
                &source_dir_path,
                &autogen_env,
                CommandArgs::new().push(autogen_cmd),
            )?;

            if !configure_file.exists() {
                return Err(Error::not_found(format!(
                    "module {}: autogen did not produce a configure script",
                    self.name
                )));
            }
        }

        let configure_content = fs::read_to_string(&configure_file).map_err(|e| Error::io(e, &configure_file))?;
        let use_builddir = needs_builddir(&configure_content);

        let (build_dir, configure_cmd) = if use_builddir {
            let build_dir = source_dir_path.join("_build");
            fs::create_dir_all(&build_dir).map_err(|e| Error::io(e, &build_dir))?;
            (build_dir, "../configure")
        } else {
            (source_dir_path.clone(), "./configure")
        };

        self.run(
            ctx.staging_dir(),
            &build_dir,
            &env,
            CommandArgs::new()
                .push(configure_cmd)
                .push("--prefix=/app")
                .push_all(self.config_opts.clone()),
        )?;

        let makefile_content = MAKEFILE_NAMES
            .iter()
            .map(|name| build_dir.join(name))
            .find(|path| path.exists())
            .map(|path| fs::read_to_string(&path).map_err(|e| Error::io(e, &path)))
            .transpose()?
            .ok_or_else(|| Error::not_found(format!("module {}: can't find makefile", self.name)))?;

        let notparallel = has_notparallel(&makefile_content);

        let mut make_all_args = CommandArgs::new().push("make").push("all");
        if !notparallel {
            let n = num_cpus::get();
            make_all_args = make_all_args.push(format!("-j{n}")).push(format!("-l{}", 2 * n));
        } else {
            debug!("NOTPARALLEL makefile, running without -j/-l");
        }
        make_all_args = make_all_args.push_all(self.make_args.clone());

        self.run(ctx.staging_dir(), &build_dir, &env, make_all_args)?;

        let make_install_args =
            CommandArgs::new().push("make").push("install").push_all(self.make_install_args.clone());
        self.run(ctx.staging_dir(), &build_dir, &env, make_install_args)?;

        self.cleanup_staging(ctx)?;

        source_dir.close().map_err(|e| Error::io(e, &source_dir_path))?;

        Ok(())
    }

    /// Removes files matching this module's cleanup globs from the staging
    /// tree, resolved relative to it.
    fn cleanup_staging(&self, ctx: &BuildContext) -> Result<()> {
        for pattern in &self.cleanup {
            let full_pattern = ctx.staging_dir().join(pattern.trim_start_matches('/'));
            let pattern_str = full_pattern.to_string_lossy().into_owned();
            let entries = glob::glob(&pattern_str)
                .map_err(|e| Error::config(format!("invalid cleanup pattern {pattern}: {e}")))?;
            for entry in entries {
                match entry {
                    Ok(path) if path.is_dir() => {
                        fs::remove_dir_all(&path).map_err(|e| Error::io(e, &path))?;
                    }
                    Ok(path) => {
                        fs::remove_file(&path).map_err(|e| Error::io(e, &path))?;
                    }
                    Err(e) => warn!(?e, pattern = %pattern, "cleanup glob entry unreadable"),
                }
            }
        }
        Ok(())
    }

    /// Contributes schema version, name, flags, booleans, cleanup globs and
    /// every source's digest, in declared order.
    pub fn digest(&self, fp: &mut Fingerprint, ctx: &BuildContext) {
        fp.u32(MODULE_V);
        fp.string(Some(&self.name));
        fp.string_list(Some(self.config_opts.iter().map(String::as_str)));
        fp.string_list(Some(self.make_args.iter().map(String::as_str)));
        fp.string_list(Some(self.make_install_args.iter().map(String::as_str)));
        fp.bool(self.rm_configure);
        fp.bool(self.no_autogen);
        fp.string_list(Some(self.cleanup.iter().map(String::as_str)));

        if let Some(opts) = &self.build_options {
            fp.bool(true);
            opts.digest(fp);
        } else {
            fp.bool(false);
        }

        for source in &self.sources {
            source.digest(fp, ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(name: &str) -> Module {
        Module {
            name: name.to_string(),
            sources: Vec::new(),
            config_opts: Vec::new(),
            make_args: Vec::new(),
            make_install_args: Vec::new(),
            rm_configure: false,
            no_autogen: false,
            build_options: None,
            cleanup: Vec::new(),
        }
    }

    #[test]
    fn deserializes_expected_field_names() {
        let json = r#"{
            "name": "hello",
            "sources": [],
            "config-opts": ["--disable-foo"],
            "rm-configure": true,
            "cleanup": ["/share/doc/*"]
        }"#;
        let m: Module = serde_json::from_str(json).unwrap();
        assert_eq!(m.name, "hello");
        assert_eq!(m.config_opts, vec!["--disable-foo".to_string()]);
        assert!(m.rm_configure);
        assert_eq!(m.cleanup, vec!["/share/doc/*".to_string()]);
    }

    #[test]
    fn notparallel_detected_as_first_line_or_mid_file() {
        assert!(has_notparallel(".NOTPARALLEL\nall:\n\techo hi"));
        assert!(has_notparallel("all:\n.NOTPARALLEL\n\techo hi"));
        assert!(!has_notparallel("all:\n\techo hi"));
    }

    #[test]
    fn builddir_marker_detected_by_substring() {
        assert!(needs_builddir("... buildapi-variable-require-builddir ..."));
        assert!(!needs_builddir("#!/bin/sh\necho configuring"));
    }

    #[test]
    fn autogen_command_prefers_first_existing_name() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("autogen.sh"), "#!/bin/sh").unwrap();
        fs::write(dir.path().join("bootstrap"), "#!/bin/sh").unwrap();
        assert_eq!(find_autogen_command(dir.path()), Some("./autogen.sh".to_string()));
    }

    #[test]
    fn autogen_command_none_when_nothing_present() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(find_autogen_command(dir.path()), None);
    }

    #[test]
    fn digest_changes_with_config_opts() {
        let ctx = BuildContext::new("/tmp/base", "/tmp/staging", "x86_64");
        let mut a = module("m");
        a.config_opts.push("--enable-foo".to_string());
        let mut b = module("m");
        b.config_opts.push("--enable-bar".to_string());

        let mut fa = Fingerprint::new();
        a.digest(&mut fa, &ctx);
        let mut fb = Fingerprint::new();
        b.digest(&mut fb, &ctx);

        assert_ne!(fa.finish_hex(), fb.finish_hex());
    }

    #[test]
    fn digest_changes_with_module_local_build_options() {
        let ctx = BuildContext::new("/tmp/base", "/tmp/staging", "x86_64");
        let plain = module("m");
        let mut overridden = module("m");
        overridden.build_options = Some(Options { cflags: Some("-O1".to_string()), ..Default::default() });

        let mut fa = Fingerprint::new();
        plain.digest(&mut fa, &ctx);
        let mut fb = Fingerprint::new();
        overridden.digest(&mut fb, &ctx);

        assert_ne!(fa.finish_hex(), fb.finish_hex());
    }
}
