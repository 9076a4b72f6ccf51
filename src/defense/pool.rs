use deps::*;

use bevy::utils::HashMap;
use std::hash::Hash;

use super::{DefenseError, HandleMisuse};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// Dispensed and owned by the caller.
    InUse,
    /// Parked in the pool waiting to be reused.
    Idle,
}

/// Result of [`EntityPool::acquire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquired<H> {
    Reused(H),
    /// The pool has nothing idle for the kind; the caller allocates a fresh handle and
    /// hands it over with [`EntityPool::register`].
    NeedsAllocation,
}

/// Reuse cache of engine handles, one LIFO stack per kind.
///
/// The pool never creates or destroys the resources behind the handles, it only tracks their
/// ownership.
#[derive(Debug)]
pub struct EntityPool<K, H> {
    idle: HashMap<K, Vec<H>>,
    entries: HashMap<H, (K, EntryState)>,
}

impl<K, H> Default for EntityPool<K, H> {
    fn default() -> Self {
        Self {
            idle: HashMap::default(),
            entries: HashMap::default(),
        }
    }
}

impl<K, H> EntityPool<K, H>
where
    K: Copy + Eq + Hash,
    H: Copy + Eq + Hash,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recently released idle handle of `kind`, now marked [`EntryState::InUse`].
    pub fn acquire(&mut self, kind: K) -> Acquired<H> {
        match self.idle.get_mut(&kind).and_then(|stack| stack.pop()) {
            Some(handle) => {
                if let Some((_, state)) = self.entries.get_mut(&handle) {
                    *state = EntryState::InUse;
                }
                Acquired::Reused(handle)
            }
            None => Acquired::NeedsAllocation,
        }
    }

    /// Track a freshly allocated handle. It starts out [`EntryState::InUse`].
    pub fn register(&mut self, kind: K, handle: H) -> Result<(), DefenseError> {
        if self.entries.contains_key(&handle) {
            return Err(DefenseError::InvalidHandle(HandleMisuse::AlreadyRegistered));
        }
        self.entries.insert(handle, (kind, EntryState::InUse));
        Ok(())
    }

    pub fn release(&mut self, kind: K, handle: H) -> Result<(), DefenseError> {
        let (entry_kind, state) = self
            .entries
            .get_mut(&handle)
            .ok_or(DefenseError::InvalidHandle(HandleMisuse::Unknown))?;
        if *entry_kind != kind {
            return Err(DefenseError::InvalidHandle(HandleMisuse::WrongKind));
        }
        if *state == EntryState::Idle {
            return Err(DefenseError::InvalidHandle(HandleMisuse::AlreadyIdle));
        }
        *state = EntryState::Idle;
        self.idle.entry(kind).or_default().push(handle);
        Ok(())
    }

    #[inline]
    pub fn state(&self, handle: H) -> Option<EntryState> {
        self.entries.get(&handle).map(|(_, state)| *state)
    }

    #[inline]
    pub fn kind_of(&self, handle: H) -> Option<K> {
        self.entries.get(&handle).map(|(kind, _)| *kind)
    }

    pub fn idle_count(&self, kind: K) -> usize {
        self.idle.get(&kind).map_or(0, Vec::len)
    }

    pub fn in_use_count(&self, kind: K) -> usize {
        self.entries
            .values()
            .filter(|(entry_kind, state)| *entry_kind == kind && *state == EntryState::InUse)
            .count()
    }

    /// Every handle the pool has ever been given.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defense::FormationKind::{self, *};

    type Pool = EntityPool<FormationKind, u32>;

    #[test]
    fn empty_pool_needs_allocation() {
        let mut pool = Pool::new();
        assert_eq!(pool.acquire(Seam), Acquired::NeedsAllocation);
        assert_eq!(pool.acquire(Cloud), Acquired::NeedsAllocation);
        assert!(pool.is_empty());
    }

    #[test]
    fn registered_then_released_handle_is_reused() {
        let mut pool = Pool::new();
        assert_eq!(pool.acquire(Seam), Acquired::NeedsAllocation);
        pool.register(Seam, 7).unwrap();
        assert_eq!(pool.state(7), Some(EntryState::InUse));

        pool.release(Seam, 7).unwrap();
        assert_eq!(pool.state(7), Some(EntryState::Idle));
        assert_eq!(pool.idle_count(Seam), 1);

        assert_eq!(pool.acquire(Seam), Acquired::Reused(7));
        assert_eq!(pool.state(7), Some(EntryState::InUse));
        assert_eq!(pool.acquire(Seam), Acquired::NeedsAllocation);
    }

    #[test]
    fn reuse_is_lifo() {
        let mut pool = Pool::new();
        for handle in 1..=3 {
            pool.register(Cloud, handle).unwrap();
        }
        pool.release(Cloud, 1).unwrap();
        pool.release(Cloud, 3).unwrap();
        pool.release(Cloud, 2).unwrap();
        assert_eq!(pool.acquire(Cloud), Acquired::Reused(2));
        assert_eq!(pool.acquire(Cloud), Acquired::Reused(3));
        assert_eq!(pool.acquire(Cloud), Acquired::Reused(1));
    }

    #[test]
    fn kinds_do_not_share_idle_handles() {
        let mut pool = Pool::new();
        pool.register(Cloud, 1).unwrap();
        pool.release(Cloud, 1).unwrap();
        assert_eq!(pool.acquire(Seam), Acquired::NeedsAllocation);
        assert_eq!(pool.kind_of(1), Some(Cloud));
        assert_eq!(pool.idle_count(Cloud), 1);
    }

    #[test]
    fn double_release_is_rejected() {
        let mut pool = Pool::new();
        pool.register(Seam, 1).unwrap();
        pool.release(Seam, 1).unwrap();
        assert_eq!(
            pool.release(Seam, 1),
            Err(DefenseError::InvalidHandle(HandleMisuse::AlreadyIdle))
        );
        // the failed release must not push a second copy
        assert_eq!(pool.idle_count(Seam), 1);
    }

    #[test]
    fn unknown_or_mismatched_release_is_rejected() {
        let mut pool = Pool::new();
        assert_eq!(
            pool.release(Seam, 42),
            Err(DefenseError::InvalidHandle(HandleMisuse::Unknown))
        );
        pool.register(Seam, 42).unwrap();
        assert_eq!(
            pool.release(Cloud, 42),
            Err(DefenseError::InvalidHandle(HandleMisuse::WrongKind))
        );
        assert_eq!(pool.in_use_count(Seam), 1);
    }

    #[test]
    fn duplicate_register_is_rejected() {
        let mut pool = Pool::new();
        pool.register(Seam, 1).unwrap();
        assert_eq!(
            pool.register(Cloud, 1),
            Err(DefenseError::InvalidHandle(HandleMisuse::AlreadyRegistered))
        );
        assert_eq!(pool.len(), 1);
    }
}
