/// Merge `patch` into `base` in place.
///
/// Nested tables merge key-wise, recursively. Every other value (scalars,
/// arrays, and a table replacing a non-table) overwrites what was there.
/// Keys absent from `patch` are preserved.
pub fn deep_merge(base: &mut toml::Table, patch: toml::Table) {
    for (key, incoming) in patch {
        let toml::Value::Table(nested) = incoming else {
            base.insert(key, incoming);
            continue;
        };
        if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
            deep_merge(existing, nested);
            continue;
        }
        base.insert(key, toml::Value::Table(nested));
    }
}
