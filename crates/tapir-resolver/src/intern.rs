//! Deduplicating interner with typed ids.

use ahash::AHashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::ops::Index;

/// Index of a value stored in an [`Interner`] of `T`s.
pub struct Id<T> {
    raw: u32,
    _ty: PhantomData<fn() -> T>,
}

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Id<T> {}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<T> Eq for Id<T> {}

impl<T> PartialOrd for Id<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Id<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.raw.cmp(&other.raw)
    }
}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<T> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let full = std::any::type_name::<T>();
        let short = full.rsplit("::").next().unwrap_or(full);
        write!(f, "Id::<{short}>({})", self.raw)
    }
}

/// Values stored once, addressed by [`Id`].
#[derive(Clone)]
pub struct Interner<T> {
    values: Vec<T>,
    ids: AHashMap<T, Id<T>>,
}

impl<T> Default for Interner<T> {
    fn default() -> Self {
        Self {
            values: Vec::new(),
            ids: AHashMap::new(),
        }
    }
}

impl<T: Hash + Eq + Clone> Interner<T> {
    /// Id of `value`, storing it on first sight.
    pub fn intern(&mut self, value: &T) -> Id<T> {
        if let Some(&id) = self.ids.get(value) {
            return id;
        }
        let id = Id {
            raw: self.values.len() as u32,
            _ty: PhantomData,
        };
        self.values.push(value.clone());
        self.ids.insert(value.clone(), id);
        id
    }

    /// Id of `value` if it was interned before.
    pub fn get<Q>(&self, value: &Q) -> Option<Id<T>>
    where
        T: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.ids.get(value).copied()
    }
}

impl<T> Interner<T> {
    /// Number of distinct values.
    pub fn len(&self) -> usize {
        self.values.len()
    }
}

impl<T> Index<Id<T>> for Interner<T> {
    type Output = T;

    fn index(&self, id: Id<T>) -> &T {
        &self.values[id.raw as usize]
    }
}

impl<T> fmt::Debug for Interner<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interner")
            .field("len", &self.values.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_idempotent() {
        let mut names: Interner<String> = Interner::default();
        let a = names.intern(&"OpenTAP".to_string());
        let b = names.intern(&"Demonstration".to_string());
        assert_eq!(names.intern(&"OpenTAP".to_string()), a);
        assert_ne!(a, b);
        assert_eq!(names.len(), 2);
        assert_eq!(names[b], "Demonstration");
        assert_eq!(names.get("OpenTAP"), Some(a));
        assert_eq!(names.get("Missing"), None);
    }
}
