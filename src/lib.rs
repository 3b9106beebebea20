//! Root crate tying the Core-Bus stack together for the sample
//! `echo-server`/`echo-client` binaries: config loading and logging init.
//! The actual protocol implementation lives entirely in `gg-object`,
//! `gg-eventstream`, `gg-ipc-auth`, `gg-corebus`, and `gg-semver`.

pub mod config;
pub mod logging;
