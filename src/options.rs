//! Hierarchical build-flag resolution: global options, per-module overlays,
//! per-architecture overlays nested one level under each of those.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::digest::{Fingerprint, OPTIONS_V};

/// A single level of build options. `arch` holds the same shape again, one
/// layer deep only — architecture overlays do not themselves nest further
/// architecture overlays.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Options {
    #[serde(rename = "cflags", skip_serializing_if = "Option::is_none")]
    pub cflags: Option<String>,
    #[serde(rename = "cxxflags", skip_serializing_if = "Option::is_none")]
    pub cxxflags: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arch: Option<BTreeMap<String, Options>>,
}

impl Options {
    fn arch_overlay(&self, arch: &str) -> Option<&Options> {
        self.arch.as_ref()?.get(arch)
    }

    fn env_entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.env.iter().flatten().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Resolves a single flag attribute by searching, in order, the
/// module-arch overlay, the module base, the global-arch overlay, then the
/// global base, returning the first non-null value.
pub fn resolve_flag<'a>(
    global: &'a Options,
    module: Option<&'a Options>,
    arch: &str,
    pick: impl Fn(&'a Options) -> Option<&'a str>,
) -> Option<&'a str> {
    let candidates = [
        module.and_then(|m| m.arch_overlay(arch)),
        module,
        global.arch_overlay(arch),
        Some(global),
    ];
    candidates.into_iter().flatten().find_map(pick)
}

/// Resolves the effective `CFLAGS` for a module in the current architecture.
pub fn resolve_cflags<'a>(global: &'a Options, module: Option<&'a Options>, arch: &str) -> Option<&'a str> {
    resolve_flag(global, module, arch, |o| o.cflags.as_deref())
}

/// Resolves the effective `CXXFLAGS` for a module in the current
/// architecture. Resolved independently from `CFLAGS` — the two attributes
/// never share a lookup (see Open Question #3 in the specification).
pub fn resolve_cxxflags<'a>(global: &'a Options, module: Option<&'a Options>, arch: &str) -> Option<&'a str> {
    resolve_flag(global, module, arch, |o| o.cxxflags.as_deref())
}

/// Resolves the accumulated environment for a module in the current
/// architecture, most specific scope first, earliest-defined key winning on
/// collision: module-arch, module-base, global-arch, global-base.
pub fn resolve_env(global: &Options, module: Option<&Options>, arch: &str) -> Vec<String> {
    let scopes = [
        module.and_then(|m| m.arch_overlay(arch)),
        module,
        global.arch_overlay(arch),
        Some(global),
    ];

    let mut seen = BTreeMap::new();
    for scope in scopes.into_iter().flatten() {
        for (k, v) in scope.env_entries() {
            seen.entry(k.to_string()).or_insert_with(|| v.to_string());
        }
    }
    seen.into_iter().map(|(k, v)| format!("{k}={v}")).collect()
}

impl Options {
    /// Contributes this options level (including any architecture overlays)
    /// to a running fingerprint. Called on the manifest's global options and,
    /// separately, on each module's local options.
    pub fn digest(&self, fp: &mut Fingerprint) {
        fp.u32(OPTIONS_V);
        fp.string(self.cflags.as_deref());
        fp.string(self.cxxflags.as_deref());

        let env_pairs: Option<Vec<String>> =
            self.env.as_ref().map(|m| m.iter().map(|(k, v)| format!("{k}={v}")).collect());
        fp.string_list(env_pairs.as_ref().map(|v| v.iter().map(String::as_str)));

        match &self.arch {
            Some(arch) => {
                fp.bool(true);
                for (tag, opts) in arch {
                    fp.string(Some(tag));
                    opts.digest(fp);
                }
            }
            None => {
                fp.bool(false);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(cflags: Option<&str>) -> Options {
        Options { cflags: cflags.map(str::to_owned), ..Default::default() }
    }

    #[test]
    fn prefers_module_arch_over_everything_else() {
        let mut global = opts(Some("global-base"));
        global.arch = Some(BTreeMap::from([("arm".to_string(), opts(Some("global-arm")))]));

        let mut module = opts(Some("module-base"));
        module.arch = Some(BTreeMap::from([("arm".to_string(), opts(Some("module-arm")))]));

        assert_eq!(resolve_cflags(&global, Some(&module), "arm"), Some("module-arm"));
        assert_eq!(resolve_cflags(&global, Some(&module), "x86"), Some("module-base"));
        assert_eq!(resolve_cflags(&global, None, "arm"), Some("global-arm"));
        assert_eq!(resolve_cflags(&global, None, "x86"), Some("global-base"));
    }

    #[test]
    fn returns_none_when_nothing_set() {
        let global = Options::default();
        assert_eq!(resolve_cflags(&global, None, "x86"), None);
    }

    #[test]
    fn env_earliest_scope_wins_on_collision() {
        let mut global = Options::default();
        global.env = Some(BTreeMap::from([("FOO".to_string(), "global".to_string())]));

        let mut module = Options::default();
        module.env = Some(BTreeMap::from([("FOO".to_string(), "module".to_string())]));

        let resolved = resolve_env(&global, Some(&module), "x86");
        assert_eq!(resolved, vec!["FOO=module".to_string()]);
    }
}
