//! Process-wide specialist registry, built once from `data/specialists.yaml`.

use std::collections::BTreeMap;
use std::sync::LazyLock;

const SPECIALISTS: &str = include_str!("../data/specialists.yaml");

static REGISTRY: LazyLock<BTreeMap<String, String>> = LazyLock::new(|| {
    serde_yaml::from_str(SPECIALISTS).expect("embedded specialists.yaml is valid")
});

/// Display name for a specialist id. Unknown ids come back unchanged.
pub fn display_name(id: &str) -> &str {
    REGISTRY.get(id).map(String::as_str).unwrap_or(id)
}

pub fn is_known(id: &str) -> bool {
    REGISTRY.contains_key(id)
}

/// All registered `(id, display name)` pairs, sorted by id.
pub fn all() -> impl Iterator<Item = (&'static str, &'static str)> {
    REGISTRY
        .iter()
        .map(|(id, name)| (id.as_str(), name.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_ids_resolve_and_unknown_pass_through() {
        assert_eq!(display_name("meditation-guide"), "Meditation Guide");
        assert_eq!(display_name("astronaut"), "astronaut");
        assert!(!is_known("astronaut"));
    }

    #[test]
    fn every_builtin_template_specialist_is_registered() {
        let store = crate::TemplateStore::builtin();
        for day in crate::calendar::ALL_WEEKDAYS {
            for session in &store.day(day).sessions {
                assert!(is_known(&session.specialist), "{}", session.specialist);
            }
        }
    }
}
