use std::collections::HashMap;

/// Creator result: either store the value for the rest of the import run, or
/// hand it back without caching so the next request re-invokes the creator.
///
/// `Transient` exists for resources whose correct construction depends on
/// call-site-specific state rather than the id alone.
pub enum CacheOutcome<T> {
    Cached(T),
    Transient(T),
}

/// Memo table for one resource kind, keyed by document id.
///
/// Values live for exactly one import run and are never evicted. Callers
/// store `Rc`-shared values, so a hit returns an object identical to the one
/// produced on the miss.
#[derive(Debug)]
pub struct Memo<T: Clone> {
    entries: HashMap<usize, T>,
}

impl<T: Clone> Default for Memo<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T: Clone> Memo<T> {
    pub fn hit(&self, id: usize) -> Option<T> {
        self.entries.get(&id).cloned()
    }

    /// Record a creator result. `Cached` values are stored; `Transient`
    /// values pass through untouched.
    pub fn store(&mut self, id: usize, outcome: CacheOutcome<T>) -> T {
        match outcome {
            CacheOutcome::Cached(value) => {
                self.entries.insert(id, value.clone());
                value
            }
            CacheOutcome::Transient(value) => value,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;

    #[test]
    fn given_cached_outcome_when_requested_twice_then_same_object_is_returned() {
        let mut memo: Memo<Rc<Vec<u8>>> = Memo::default();

        let first = memo.store(3, CacheOutcome::Cached(Rc::new(vec![1, 2, 3])));
        let second = memo.hit(3).expect("hit");
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn given_transient_outcome_when_requested_again_then_miss_forces_recreation() {
        let mut memo: Memo<Rc<Vec<u8>>> = Memo::default();

        let value = memo.store(3, CacheOutcome::Transient(Rc::new(vec![1, 2, 3])));
        assert_eq!(*value, vec![1, 2, 3]);
        assert!(memo.hit(3).is_none());
    }
}
