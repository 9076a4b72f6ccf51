use deps::*;

use bevy::{prelude::*, utils::HashMap};
use rand::prelude::*;
use std::hash::Hash;

use super::{path, Acquired, DefenseError, EntityPool, FormationKind};
use crate::math::*;

/// Anything with a current world position that a formation can be centered on.
pub trait Pivot {
    fn world_position(&self) -> TVec3;
}

impl Pivot for TVec3 {
    #[inline]
    fn world_position(&self) -> TVec3 {
        *self
    }
}

impl Pivot for Transform {
    #[inline]
    fn world_position(&self) -> TVec3 {
        self.translation
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(crate = "serde")]
pub enum CounterScope {
    /// One running count for every kind, the cap limits the total.
    Shared,
    /// Each kind counts and caps on its own.
    PerKind,
}

/// Decides which kind the next spawn uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(crate = "serde")]
pub enum AlternationPolicy {
    Fixed(FormationKind),
    /// Keyed on the parity of the next total spawn number. A capped kind yields to the other.
    Parity {
        even: FormationKind,
        odd: FormationKind,
    },
}

/// Where the `n` of a seam sample comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(crate = "serde")]
pub enum SeamDivisor {
    /// The population cap, spreading a full formation over one period of the curve.
    Cap,
    /// The running count itself.
    RunningCount,
    Fixed(u32),
}

/// Monotonic spawn counts gated by a population cap.
#[derive(Debug, Clone)]
pub struct FormationCounter {
    scope: CounterScope,
    cap: u32,
    total: u32,
    per_kind: HashMap<FormationKind, u32>,
}

impl FormationCounter {
    pub fn new(scope: CounterScope, cap: u32) -> Self {
        Self {
            scope,
            cap,
            total: 0,
            per_kind: HashMap::default(),
        }
    }

    /// The count the cap is checked against for `kind`.
    pub fn count(&self, kind: FormationKind) -> u32 {
        match self.scope {
            CounterScope::Shared => self.total,
            CounterScope::PerKind => self.spawned(kind),
        }
    }

    /// Spawns of `kind` regardless of scope.
    pub fn spawned(&self, kind: FormationKind) -> u32 {
        self.per_kind.get(&kind).copied().unwrap_or(0)
    }

    #[inline]
    pub fn total(&self) -> u32 {
        self.total
    }

    #[inline]
    pub fn cap(&self) -> u32 {
        self.cap
    }

    #[inline]
    pub fn is_capped(&self, kind: FormationKind) -> bool {
        self.count(kind) >= self.cap
    }

    /// The count `kind` would reach with one more spawn.
    pub fn peek_next(&self, kind: FormationKind) -> Option<u32> {
        if self.is_capped(kind) {
            None
        } else {
            Some(self.count(kind) + 1)
        }
    }

    fn commit(&mut self, kind: FormationKind) {
        self.total += 1;
        *self.per_kind.entry(kind).or_default() += 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementHandle<H> {
    Reused(H),
    /// Nothing idle in the pool; the realizer allocates and registers a new handle.
    Allocate,
}

/// Instruction for the engine side to put a formation member in the world.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementCommand<H> {
    pub handle: PlacementHandle<H>,
    pub world_position: TVec3,
    pub kind: FormationKind,
    /// Total spawn number this placement was issued as, starting at 1.
    pub serial: u32,
    pub tag: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SpawnOutcome<H> {
    Placed(PlacementCommand<H>),
    /// The population for the kind is full. Not an error.
    Capped,
}

#[derive(Debug, Clone)]
pub struct FormationPlacer {
    pub counter: FormationCounter,
    pub policy: AlternationPolicy,
    pub seam_divisor: SeamDivisor,
    /// Seam lobe tightness.
    pub seam_shape: TReal,
    rng: StdRng,
}

impl FormationPlacer {
    pub fn new(
        counter: FormationCounter,
        policy: AlternationPolicy,
        seam_divisor: SeamDivisor,
        seam_shape: TReal,
    ) -> Self {
        Self {
            counter,
            policy,
            seam_divisor,
            seam_shape,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// The kind the alternation policy wants next.
    pub fn pick_kind(&self) -> FormationKind {
        match self.policy {
            AlternationPolicy::Fixed(kind) => kind,
            AlternationPolicy::Parity { even, odd } => {
                let (preferred, other) = if (self.counter.total() + 1) % 2 == 0 {
                    (even, odd)
                } else {
                    (odd, even)
                };
                if self.counter.is_capped(preferred) && !self.counter.is_capped(other) {
                    other
                } else {
                    preferred
                }
            }
        }
    }

    /// Whether every kind the policy can emit has hit the cap.
    pub fn is_exhausted(&self) -> bool {
        match self.policy {
            AlternationPolicy::Fixed(kind) => self.counter.is_capped(kind),
            AlternationPolicy::Parity { even, odd } => {
                self.counter.is_capped(even) && self.counter.is_capped(odd)
            }
        }
    }

    fn seam_count(&self, next: u32) -> i32 {
        let n = match self.seam_divisor {
            SeamDivisor::Cap => self.counter.cap(),
            SeamDivisor::RunningCount => next,
            SeamDivisor::Fixed(n) => n,
        };
        i32::try_from(n).unwrap_or(i32::MAX)
    }

    /// Place the next member of the `kind` formation `radius` away from `central`.
    ///
    /// The counter only advances once a placement is actually produced.
    pub fn spawn_next<H>(
        &mut self,
        pool: &mut EntityPool<FormationKind, H>,
        kind: FormationKind,
        central: &impl Pivot,
        radius: TReal,
    ) -> Result<SpawnOutcome<H>, DefenseError>
    where
        H: Copy + Eq + Hash,
    {
        let next = match self.counter.peek_next(kind) {
            Some(next) => next,
            None => return Ok(SpawnOutcome::Capped),
        };
        if !radius.is_finite() || radius <= 0. {
            return Err(DefenseError::InvalidArgument(
                "formation radius must be positive and finite",
            ));
        }
        let direction = match kind {
            FormationKind::Seam => {
                path::seam(next as TReal, self.seam_count(next), self.seam_shape)?
            }
            FormationKind::Cloud => path::cloud(&mut self.rng),
        };
        debug_assert!(is_unit(direction));

        self.counter.commit(kind);
        let serial = self.counter.total();
        let handle = match pool.acquire(kind) {
            Acquired::Reused(handle) => PlacementHandle::Reused(handle),
            Acquired::NeedsAllocation => PlacementHandle::Allocate,
        };
        Ok(SpawnOutcome::Placed(PlacementCommand {
            handle,
            world_position: central.world_position() + direction * radius,
            kind,
            serial,
            tag: format!("Drone{serial}"),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defense::FormationKind::*;

    fn placer(scope: CounterScope, cap: u32, policy: AlternationPolicy) -> FormationPlacer {
        FormationPlacer::new(
            FormationCounter::new(scope, cap),
            policy,
            SeamDivisor::Cap,
            0.4,
        )
        .with_rng_seed(1551)
    }

    fn placed<H: std::fmt::Debug>(outcome: SpawnOutcome<H>) -> PlacementCommand<H> {
        match outcome {
            SpawnOutcome::Placed(cmd) => cmd,
            SpawnOutcome::Capped => panic!("unexpected cap"),
        }
    }

    #[test]
    fn caps_after_two_spawns_at_radius() {
        for kind in FormationKind::ALL {
            let mut placer = placer(CounterScope::Shared, 2, AlternationPolicy::Fixed(kind));
            let mut pool = EntityPool::<FormationKind, u32>::new();

            for serial in 1..=2 {
                let cmd = placed(placer.spawn_next(&mut pool, kind, &TVec3::ZERO, 10.).unwrap());
                assert!((cmd.world_position.length() - 10.).abs() < 1e-4);
                assert_eq!(cmd.handle, PlacementHandle::Allocate);
                assert_eq!(cmd.serial, serial);
                assert_eq!(cmd.kind, kind);
                assert_eq!(cmd.tag, format!("Drone{serial}"));
            }
            assert_eq!(
                placer.spawn_next(&mut pool, kind, &TVec3::ZERO, 10.),
                Ok(SpawnOutcome::Capped)
            );
            assert_eq!(placer.counter.count(kind), 2);
            assert!(placer.is_exhausted());
        }
    }

    #[test]
    fn capped_spawns_never_advance_the_counter() {
        let mut placer = placer(CounterScope::PerKind, 3, AlternationPolicy::Fixed(Seam));
        let mut pool = EntityPool::<FormationKind, u32>::new();
        for _ in 0..3 {
            placed(placer.spawn_next(&mut pool, Seam, &TVec3::ZERO, 1.).unwrap());
        }
        for _ in 0..10 {
            assert_eq!(
                placer.spawn_next(&mut pool, Seam, &TVec3::ZERO, 1.),
                Ok(SpawnOutcome::Capped)
            );
        }
        assert_eq!(placer.counter.count(Seam), 3);
        assert_eq!(placer.counter.total(), 3);
    }

    #[test]
    fn placement_is_offset_by_the_pivot() {
        let mut placer = placer(CounterScope::Shared, 60, AlternationPolicy::Fixed(Seam));
        let mut pool = EntityPool::<FormationKind, u32>::new();
        let station = Transform::from_xyz(1500., 1800., -100.);
        let cmd = placed(placer.spawn_next(&mut pool, Seam, &station, 500.).unwrap());
        let expected = station.translation + path::seam(1., 60, 0.4).unwrap() * 500.;
        assert!((cmd.world_position - expected).length() < 1e-2);
    }

    #[test]
    fn released_handles_are_placed_again() {
        let mut placer = placer(CounterScope::Shared, 60, AlternationPolicy::Fixed(Cloud));
        let mut pool = EntityPool::<FormationKind, u32>::new();
        let first = placed(placer.spawn_next(&mut pool, Cloud, &TVec3::ZERO, 5.).unwrap());
        assert_eq!(first.handle, PlacementHandle::Allocate);
        pool.register(Cloud, 11).unwrap();
        pool.release(Cloud, 11).unwrap();

        let second = placed(placer.spawn_next(&mut pool, Cloud, &TVec3::ZERO, 5.).unwrap());
        assert_eq!(second.handle, PlacementHandle::Reused(11));
        assert_eq!(pool.idle_count(Cloud), 0);
    }

    #[test]
    fn invalid_radius_keeps_the_counter() {
        let mut placer = placer(CounterScope::Shared, 60, AlternationPolicy::Fixed(Seam));
        let mut pool = EntityPool::<FormationKind, u32>::new();
        for radius in [0., -1., TReal::NAN, TReal::INFINITY] {
            assert!(matches!(
                placer.spawn_next(&mut pool, Seam, &TVec3::ZERO, radius),
                Err(DefenseError::InvalidArgument(_))
            ));
        }
        assert_eq!(placer.counter.total(), 0);
    }

    #[test]
    fn zero_seam_divisor_is_invalid() {
        let mut placer = placer(CounterScope::Shared, 60, AlternationPolicy::Fixed(Seam));
        placer.seam_divisor = SeamDivisor::Fixed(0);
        let mut pool = EntityPool::<FormationKind, u32>::new();
        assert!(placer.spawn_next(&mut pool, Seam, &TVec3::ZERO, 1.).is_err());
        assert_eq!(placer.counter.total(), 0);
    }

    #[test]
    fn running_count_divisor_samples_full_period() {
        let mut placer = placer(CounterScope::Shared, 60, AlternationPolicy::Fixed(Seam));
        placer.seam_divisor = SeamDivisor::RunningCount;
        let mut pool = EntityPool::<FormationKind, u32>::new();
        let cmd = placed(placer.spawn_next(&mut pool, Seam, &TVec3::ZERO, 1.).unwrap());
        let expected = path::seam(0., 1, 0.4).unwrap();
        assert!((cmd.world_position - expected).length() < 1e-5);
    }

    #[test]
    fn parity_alternates_on_the_shared_count() {
        let mut placer = placer(
            CounterScope::Shared,
            6,
            AlternationPolicy::Parity {
                even: Cloud,
                odd: Seam,
            },
        );
        let mut pool = EntityPool::<FormationKind, u32>::new();
        let mut kinds = vec![];
        while !placer.is_exhausted() {
            let kind = placer.pick_kind();
            kinds.push(placed(placer.spawn_next(&mut pool, kind, &TVec3::ZERO, 1.).unwrap()).kind);
        }
        assert_eq!(kinds, vec![Seam, Cloud, Seam, Cloud, Seam, Cloud]);
        assert_eq!(placer.counter.spawned(Seam), 3);
        assert_eq!(placer.counter.spawned(Cloud), 3);
    }

    #[test]
    fn parity_yields_to_the_uncapped_kind() {
        let mut placer = placer(
            CounterScope::PerKind,
            2,
            AlternationPolicy::Parity {
                even: Cloud,
                odd: Seam,
            },
        );
        let mut pool = EntityPool::<FormationKind, u32>::new();
        // fill the seam formation out of turn
        for _ in 0..2 {
            placed(placer.spawn_next(&mut pool, Seam, &TVec3::ZERO, 1.).unwrap());
        }
        // next total is 3 (odd => seam) but seam is full
        assert_eq!(placer.pick_kind(), Cloud);
        for _ in 0..2 {
            let kind = placer.pick_kind();
            placed(placer.spawn_next(&mut pool, kind, &TVec3::ZERO, 1.).unwrap());
        }
        assert!(placer.is_exhausted());
        assert_eq!(placer.counter.total(), 4);
    }

    #[test]
    fn per_kind_scope_caps_independently() {
        let mut placer = placer(CounterScope::PerKind, 1, AlternationPolicy::Fixed(Seam));
        let mut pool = EntityPool::<FormationKind, u32>::new();
        placed(placer.spawn_next(&mut pool, Seam, &TVec3::ZERO, 1.).unwrap());
        assert_eq!(
            placer.spawn_next(&mut pool, Seam, &TVec3::ZERO, 1.),
            Ok(SpawnOutcome::Capped)
        );
        let cloud = placed(placer.spawn_next(&mut pool, Cloud, &TVec3::ZERO, 1.).unwrap());
        assert_eq!(cloud.serial, 2);
    }
}
