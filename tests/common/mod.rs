//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod plugins;

use plugins::{ctf_plugin, utils_plugin, FsSourceClass, MuxerClass};
use tracegraph::PluginSet;

/// Registry holding the default `ctf` and `utils` namespaces
pub fn test_registry() -> PluginSet {
    let set = PluginSet::new();
    set.register(ctf_plugin(FsSourceClass::default()));
    set.register(utils_plugin(MuxerClass::default()));
    set
}

/// Install the default namespaces in the process-wide registry.
///
/// Tests calling this must be `#[serial]`.
pub fn register_global(source: FsSourceClass, muxer: MuxerClass) {
    let global = PluginSet::global();
    global.clear();
    global.register(ctf_plugin(source));
    global.register(utils_plugin(muxer));
}
