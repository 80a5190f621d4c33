//! Component set resolution
//!
//! Retargets a component list: strips every chip/board-specific component,
//! installs the manifest's device, then applies the add and remove lists.

use tracing::{debug, warn};

use crate::descriptor::ComponentRef;

/// Result of resolving a component list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentResolution {
    /// Final component list
    pub components: Vec<ComponentRef>,
    /// Chip/board-specific components that were stripped
    pub stripped: Vec<ComponentRef>,
    /// Duplicate entries dropped after removals were applied
    pub skipped_additions: Vec<ComponentRef>,
    /// Removal targets that were not present
    pub missing_removals: Vec<ComponentRef>,
}

/// Resolve the component list for `device`.
///
/// Ordering: survivors of the strip in original order, then the device, then
/// additions in the given order. Removals take out the first identical entry
/// of that combined list; a removal target that is absent only produces a
/// warning. Duplicates left after removal are dropped, keeping the first.
pub fn resolve_components(
    base: &[ComponentRef],
    device: &str,
    add: &[ComponentRef],
    remove: &[ComponentRef],
) -> ComponentResolution {
    let mut resolution = ComponentResolution::default();

    let (stripped, mut combined): (Vec<ComponentRef>, Vec<ComponentRef>) = base
        .iter()
        .cloned()
        .partition(|c| slcp_classifier::is_device_specific(&c.id));

    for c in &stripped {
        debug!(component = %c.id, "stripping device-specific component");
    }
    resolution.stripped = stripped;

    let device = ComponentRef::new(device);
    if !combined.contains(&device) {
        combined.push(device);
    }
    combined.extend(add.iter().cloned());

    for c in remove {
        match combined.iter().position(|existing| existing == c) {
            Some(index) => {
                combined.remove(index);
            }
            None => {
                warn!(component = %c.id, "component is not present in project, cannot remove");
                resolution.missing_removals.push(c.clone());
            }
        }
    }

    let mut components: Vec<ComponentRef> = Vec::with_capacity(combined.len());
    for c in combined {
        if components.contains(&c) {
            warn!(component = %c.id, "component is already present, not adding it twice");
            resolution.skipped_additions.push(c);
        } else {
            components.push(c);
        }
    }

    resolution.components = components;
    resolution
}
