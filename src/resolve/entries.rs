//! Replace-or-append merging of `{name, value}` entry lists

use crate::descriptor::NamedValue;

/// Merge `source` pairs into a copy of `dest`.
///
/// An existing entry with the same name keeps its position (and any extra
/// fields) and takes the new value; a new name is appended. Applying the same
/// source twice gives the same list as applying it once.
pub fn merge_entries(dest: &[NamedValue], source: &[(String, String)]) -> Vec<NamedValue> {
    let mut merged = dest.to_vec();

    for (name, value) in source {
        match merged.iter_mut().find(|entry| entry.name == *name) {
            Some(entry) => entry.value = value.clone(),
            None => merged.push(NamedValue::new(name.clone(), value.clone())),
        }
    }

    merged
}
