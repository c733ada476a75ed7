//! Manifest round-trip serialisation and the autogen-fallback /
//! builddir-requirement / NOTPARALLEL decision logic, against synthetic
//! module directories.

use std::fs;

use pretty_assertions::assert_eq;

use bundle_builder::manifest::Manifest;
use bundle_builder::module::{find_autogen_command, has_notparallel, needs_builddir};

fn full_manifest_json() -> &'static str {
    r#"{
        "app-id": "org.test.Hello",
        "version": "1.2.3",
        "runtime": "org.test.Platform",
        "runtime-version": "21.08",
        "sdk": "org.test.Sdk",
        "build-options": {
            "cflags": "-O2",
            "env": { "FOO": "bar" },
            "arch": { "arm": { "cflags": "-O1" } }
        },
        "modules": [
            {
                "name": "hello",
                "sources": [
                    { "type": "archive", "url": "https://example.com/hello-1.0.tar.gz", "sha256": "abc", "dest": "vendor" },
                    { "type": "git", "url": "https://example.com/extra.git", "branch": "main" }
                ],
                "config-opts": ["--disable-foo"],
                "make-args": ["V=1"],
                "make-install-args": ["DESTDIR=/app"],
                "rm-configure": true,
                "no-autogen": false,
                "cleanup": ["/share/doc/*", "/share/man"]
            }
        ]
    }"#
}

#[test]
fn round_trip_preserves_every_digest_relevant_field() {
    let manifest = Manifest::from_json(full_manifest_json().as_bytes()).unwrap();
    let json = serde_json::to_string(&manifest).unwrap();
    let round_tripped = Manifest::from_json(json.as_bytes()).unwrap();

    assert_eq!(manifest.app_id, round_tripped.app_id);
    assert_eq!(manifest.version, round_tripped.version);
    assert_eq!(manifest.runtime, round_tripped.runtime);
    assert_eq!(manifest.runtime_version, round_tripped.runtime_version);
    assert_eq!(manifest.sdk, round_tripped.sdk);
    assert_eq!(manifest.modules.len(), round_tripped.modules.len());
    assert_eq!(manifest.modules[0].name, round_tripped.modules[0].name);
    assert_eq!(manifest.modules[0].config_opts, round_tripped.modules[0].config_opts);
    assert_eq!(manifest.modules[0].cleanup, round_tripped.modules[0].cleanup);
    assert_eq!(manifest.modules[0].sources.len(), round_tripped.modules[0].sources.len());
}

#[test]
fn runtime_version_round_trips_when_explicit() {
    let manifest = Manifest::from_json(full_manifest_json().as_bytes()).unwrap();
    assert_eq!(manifest.runtime_version, "21.08");
}

#[test]
fn autogen_fallback_picks_autogen_sh_when_no_configure() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("autogen.sh"), "#!/bin/sh\n./configure \"$@\"").unwrap();

    assert!(!dir.path().join("configure").exists());
    assert_eq!(find_autogen_command(dir.path()), Some("./autogen.sh".to_string()));
}

#[test]
fn builddir_requirement_detected_from_configure_contents() {
    let dir = tempfile::tempdir().unwrap();
    let configure = dir.path().join("configure");
    fs::write(&configure, "#!/bin/sh\n# buildapi-variable-require-builddir\n").unwrap();

    let content = fs::read_to_string(&configure).unwrap();
    assert!(needs_builddir(&content));
}

#[test]
fn plain_configure_does_not_require_builddir() {
    let dir = tempfile::tempdir().unwrap();
    let configure = dir.path().join("configure");
    fs::write(&configure, "#!/bin/sh\necho configuring\n").unwrap();

    let content = fs::read_to_string(&configure).unwrap();
    assert!(!needs_builddir(&content));
}

#[test]
fn notparallel_makefile_suppresses_parallel_flags() {
    let dir = tempfile::tempdir().unwrap();
    let makefile = dir.path().join("Makefile");
    fs::write(&makefile, ".NOTPARALLEL:\nall:\n\techo building\n").unwrap();

    let content = fs::read_to_string(&makefile).unwrap();
    assert!(has_notparallel(&content));
}

#[test]
fn ordinary_makefile_allows_parallel_flags() {
    let dir = tempfile::tempdir().unwrap();
    let makefile = dir.path().join("Makefile");
    fs::write(&makefile, "all:\n\techo building\n").unwrap();

    let content = fs::read_to_string(&makefile).unwrap();
    assert!(!has_notparallel(&content));
}
