use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, LazyLock, RwLock};

/// Predicate telling if a string value conforms to a named format.
pub type FormatPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

static GLOBAL_FORMATS: LazyLock<RwLock<FormatRegistry>> =
    LazyLock::new(|| RwLock::new(FormatRegistry::default()));

/// Register a string format in the process-wide registry.
///
/// Every [ResponseMatcher][crate::ResponseMatcher] built afterward will validate the
/// `format: <name>` keyword with the given predicate. Registering a name again replaces its
/// predicate for the matchers built after that.
pub fn add_validation_format<N, F>(name: N, predicate: F)
where
    N: Into<String>,
    F: Fn(&str) -> bool + Send + Sync + 'static,
{
    GLOBAL_FORMATS
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .register(name, predicate);
}

/// Named string formats known by the validator, in addition to the builtin ones.
#[derive(Clone, Default)]
pub struct FormatRegistry {
    formats: BTreeMap<String, FormatPredicate>,
}

impl FormatRegistry {
    /// Copy of the process-wide registry fed by [add_validation_format].
    pub fn global() -> Self {
        GLOBAL_FORMATS
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Register a format, replacing any previous predicate with the same name.
    pub fn register<N, F>(&mut self, name: N, predicate: F)
    where
        N: Into<String>,
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.formats.insert(name.into(), Arc::new(predicate));
    }

    /// Add every format of `other`, its predicates win on name conflicts.
    pub fn extend(&mut self, other: &FormatRegistry) {
        self.formats
            .extend(other.formats.iter().map(|(name, predicate)| (name.clone(), predicate.clone())));
    }

    #[cfg(test)]
    fn contains(&self, name: &str) -> bool {
        self.formats.contains_key(name)
    }

    #[cfg(test)]
    fn check(&self, name: &str, value: &str) -> Option<bool> {
        self.formats.get(name).map(|predicate| predicate(value))
    }

    fn names(&self) -> Vec<&str> {
        self.formats.keys().map(String::as_str).collect()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&str, &FormatPredicate)> {
        self.formats.iter().map(|(name, predicate)| (name.as_str(), predicate))
    }
}

impl fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatRegistry")
            .field("formats", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registering_a_name_again_replaces_its_predicate() {
        let mut registry = FormatRegistry::default();
        registry.register("xstring", |value| value == "xxx");
        assert_eq!(Some(true), registry.check("xstring", "xxx"));

        registry.register("xstring", |value| value == "yyy");
        assert_eq!(Some(false), registry.check("xstring", "xxx"));
        assert_eq!(Some(true), registry.check("xstring", "yyy"));
        assert_eq!(vec!["xstring"], registry.names());
    }

    #[test]
    fn unknown_format_has_no_verdict() {
        let registry = FormatRegistry::default();

        assert!(!registry.contains("uuid"));
        assert_eq!(None, registry.check("uuid", "not-a-uuid"));
    }

    #[test]
    fn extend_overrides_existing_names() {
        let mut registry = FormatRegistry::default();
        registry.register("even", |value| value.len() % 2 == 0);
        registry.register("short", |value| value.len() < 3);
        let mut other = FormatRegistry::default();
        other.register("even", |_| false);

        registry.extend(&other);

        assert_eq!(Some(false), registry.check("even", "ab"));
        assert_eq!(Some(true), registry.check("short", "ab"));
    }

    #[test]
    fn global_registry_snapshot_contains_added_formats() {
        add_validation_format("formats_module_test_format", |value| value.starts_with("ok"));

        let registry = FormatRegistry::global();

        assert_eq!(
            Some(true),
            registry.check("formats_module_test_format", "ok then")
        );
        assert_eq!(
            Some(false),
            registry.check("formats_module_test_format", "nope")
        );
    }
}
