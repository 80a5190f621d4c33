//! Project synthesis: retarget a base descriptor using a manifest

mod components;
mod entries;

pub use components::{resolve_components, ComponentResolution};
pub use entries::merge_entries;

use crate::descriptor::ProjectDescriptor;
use crate::manifest::Manifest;

/// The base descriptor after resolution and merging
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedProject {
    pub descriptor: ProjectDescriptor,
    pub components: ComponentResolution,
}

/// Build the device-specific descriptor.
///
/// The base descriptor is not modified; everything the manifest does not
/// touch is carried over unchanged.
pub fn synthesize(base: &ProjectDescriptor, manifest: &Manifest) -> SynthesizedProject {
    let components = resolve_components(
        &base.component,
        &manifest.device,
        &manifest.add_components,
        &manifest.remove_components,
    );

    let mut descriptor = base.clone();
    descriptor.component = components.components.clone();
    descriptor
        .toolchain_settings
        .extend(manifest.toolchain_settings.iter().cloned());
    descriptor.configuration = merge_entries(&base.configuration, manifest.configuration.entries());
    descriptor.define = merge_entries(&base.define, manifest.slcp_defines.entries());

    SynthesizedProject {
        descriptor,
        components,
    }
}
