use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global string interner for element and group ids.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// Monotonic counter shared by every generated id.
static COUNTER: AtomicU64 = AtomicU64::new(0);

/// Identifier of an element or a group on the canvas.
///
/// Interned: 4 bytes, `Copy`, O(1) `Eq`/`Hash`. Serialized as its string.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(Spur);

impl ElementId {
    /// Intern a string as an id, or return the existing one.
    pub fn intern(s: &str) -> Self {
        ElementId(INTERNER.get_or_intern(s))
    }

    pub fn as_str(&self) -> &str {
        INTERNER.resolve(&self.0)
    }

    /// Generate a fresh id with a kind prefix (e.g. `rect_12`, `group_3`).
    ///
    /// Skips over counter values that collide with ids interned from
    /// imported or hand-written documents.
    pub fn with_prefix(prefix: &str) -> Self {
        loop {
            let n = COUNTER.fetch_add(1, Ordering::Relaxed);
            let candidate = format!("{prefix}_{n}");
            if INTERNER.get(&candidate).is_none() {
                return Self::intern(&candidate);
            }
        }
    }
}

impl fmt::Debug for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.as_str())
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ElementId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ElementId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(ElementId::intern(&s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_roundtrip() {
        let a = ElementId::intern("hero_card");
        let b = ElementId::intern("hero_card");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "hero_card");
    }

    #[test]
    fn generated_ids_are_unique() {
        let a = ElementId::with_prefix("rect");
        let b = ElementId::with_prefix("rect");
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("rect_"));
    }

    #[test]
    fn generated_ids_skip_existing() {
        // Pre-intern the next few candidates; generation must not reuse them.
        let taken: Vec<ElementId> = (0..4)
            .map(|i| ElementId::intern(&format!("collide_{i}")))
            .collect();
        for _ in 0..4 {
            let fresh = ElementId::with_prefix("collide");
            assert!(!taken.contains(&fresh));
        }
    }
}
