#![doc = include_str!("../README.md")]
#![warn(rustdoc::all)]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![deny(unused_must_use, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

#[macro_use]
extern crate tracing;

// Only src/bin/builder.rs uses tracing-subscriber; mark it used so checking
// the lib target alone doesn't trip unused_crate_dependencies above.
use tracing_subscriber as _;

#[macro_use]
pub mod error;

pub mod cache;
pub mod cli;
pub mod command;
pub mod context;
pub mod digest;
pub mod driver;
pub mod manifest;
pub mod module;
pub mod options;
pub mod sandbox;
pub mod source;
pub mod utils;

pub use error::{Error, Result};
pub use manifest::Manifest;
