use deps::*;

use bevy::{prelude::*, render::mesh::shape, utils::HashMap};
use bevy_rapier3d::prelude::*;
use educe::Educe;

use crate::config::{DefenseConfig, FormationSettings};
use crate::math::*;
use crate::schedule::{TaskScheduler, TickResult};
use crate::ship::MissileHit;

pub mod orbit;
pub mod path;
pub mod placer;
pub mod pool;

pub use path::FormationKind;
pub use placer::*;
pub use pool::*;

pub const SPAWN_TASK: &str = "spawn-drones";

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HandleMisuse {
    /// The pool never dispensed or registered the handle.
    #[error("not from this pool")]
    Unknown,
    #[error("released under the wrong kind")]
    WrongKind,
    #[error("already idle")]
    AlreadyIdle,
    #[error("already registered")]
    AlreadyRegistered,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DefenseError {
    #[error("invalid formation argument: {0}")]
    InvalidArgument(&'static str),
    #[error("invalid handle: {0}")]
    InvalidHandle(HandleMisuse),
}

pub struct DefensePlugin {
    pub config: DefenseConfig,
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, SystemLabel)]
pub enum DefenseSystems {
    SyncPivots,
    Tasks,
    Realize,
}

impl Plugin for DefensePlugin {
    fn build(&self, app: &mut App) {
        use DefenseSystems::*;
        app.insert_resource(DefenseGrid::new(&self.config))
            .insert_resource(self.config.clone())
            .init_resource::<DefenseTasks>()
            .add_startup_system(setup_drone_visuals)
            .add_startup_system(schedule_drone_spawns)
            .add_startup_system_to_stage(StartupStage::PostStartup, orbit::spawn_orbiters)
            .add_system(sync_pivots.label(SyncPivots))
            .add_system(run_defense_tasks.label(Tasks).after(SyncPivots))
            .add_system(realize_placements.label(Realize).after(Tasks))
            .add_system(orbit::update.after(SyncPivots))
            // hits are settled after the frame's placements so a drone is never hidden and
            // re-attached by the same command flush
            .add_system_to_stage(CoreStage::PostUpdate, recycle_hit_drones);
    }
}

/// Marks an entity formations can be centered on, looked up by name.
#[derive(Debug, Clone, Component)]
pub struct DefensePivot(pub String);

#[derive(Debug, Clone, Copy, Component)]
pub struct Drone {
    pub kind: FormationKind,
    pub serial: u32,
}

impl Drone {
    /// Release `entt`, the entity carrying this component, back to the grid's pool.
    pub fn return_to_pool(&self, entt: Entity, grid: &mut DefenseGrid) -> bool {
        grid.recycle(self.kind, entt)
    }
}

/// All drone defense state of one world.
#[derive(Debug)]
pub struct DefenseGrid {
    pub placer: FormationPlacer,
    pub pool: EntityPool<FormationKind, Entity>,
    pub seam: FormationSettings,
    pub cloud: FormationSettings,
    /// Current world position of every [`DefensePivot`].
    pub pivots: HashMap<String, TVec3>,
    /// Placements waiting for [`realize_placements`].
    pub pending: Vec<PlacementCommand<Entity>>,
    /// Seconds since the previous tick.
    pub delta_secs: TReal,
    pub complete: bool,
}

impl DefenseGrid {
    pub fn new(config: &DefenseConfig) -> Self {
        Self {
            placer: FormationPlacer::new(
                FormationCounter::new(config.counter_scope, config.cap),
                config.alternation,
                config.seam_divisor,
                config.seam_shape,
            ),
            pool: EntityPool::new(),
            seam: config.seam.clone(),
            cloud: config.cloud.clone(),
            pivots: HashMap::default(),
            pending: Vec::new(),
            delta_secs: 0.,
            complete: false,
        }
    }

    pub fn settings(&self, kind: FormationKind) -> &FormationSettings {
        match kind {
            FormationKind::Seam => &self.seam,
            FormationKind::Cloud => &self.cloud,
        }
    }

    /// Queue the next formation member.
    pub fn spawn_tick(&mut self) -> TickResult {
        let kind = self.placer.pick_kind();
        let settings = self.settings(kind);
        let radius = settings.radius;
        let pivot = match self.pivots.get(&settings.pivot) {
            Some(pivot) => *pivot,
            None => {
                tracing::warn!(
                    pivot = %settings.pivot,
                    kind = kind.label(),
                    "formation pivot not in the scene"
                );
                return TickResult::Continue;
            }
        };
        match self.placer.spawn_next(&mut self.pool, kind, &pivot, radius) {
            Ok(SpawnOutcome::Placed(cmd)) => {
                tracing::debug!(
                    tag = %cmd.tag,
                    kind = kind.label(),
                    position = ?cmd.world_position,
                    "drone placed"
                );
                self.pending.push(cmd);
                TickResult::Continue
            }
            Ok(SpawnOutcome::Capped) if self.placer.is_exhausted() => {
                tracing::info!(total = self.placer.counter.total(), "drone formations complete");
                self.complete = true;
                TickResult::Done
            }
            Ok(SpawnOutcome::Capped) => TickResult::Continue,
            Err(err) => {
                tracing::warn!(kind = kind.label(), "drone spawn skipped: {err}");
                TickResult::Continue
            }
        }
    }

    /// Hand a detached drone back to the pool. `false` if the pool refused it.
    pub fn recycle(&mut self, kind: FormationKind, drone: Entity) -> bool {
        match self.pool.release(kind, drone) {
            Ok(()) => {
                tracing::debug!(?drone, kind = kind.label(), "drone returned to pool");
                true
            }
            Err(err) => {
                tracing::warn!(?drone, kind = kind.label(), "unable to recycle drone: {err}");
                false
            }
        }
    }
}

#[derive(Default, Educe)]
#[educe(Deref, DerefMut)]
pub struct DefenseTasks(TaskScheduler<DefenseGrid>);

/// Ticks the spawn task drops on the floor until `interval` seconds have passed.
pub fn spawn_drones_task(
    interval: TReal,
) -> impl FnMut(&mut DefenseGrid) -> TickResult + Send + Sync + 'static {
    let mut since_last = interval;
    move |grid| {
        since_last += grid.delta_secs;
        if since_last < interval {
            return TickResult::Continue;
        }
        since_last = 0.;
        grid.spawn_tick()
    }
}

#[derive(Debug, Clone, Default)]
pub struct DroneLook {
    pub mesh: Handle<Mesh>,
    pub material: Handle<StandardMaterial>,
    pub radius: TReal,
}

#[derive(Debug, Clone, Default)]
pub struct DroneVisuals {
    pub seam: DroneLook,
    pub cloud: DroneLook,
}

impl DroneVisuals {
    pub fn get(&self, kind: FormationKind) -> &DroneLook {
        match kind {
            FormationKind::Seam => &self.seam,
            FormationKind::Cloud => &self.cloud,
        }
    }
}

fn setup_drone_visuals(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    config: Res<DefenseConfig>,
) {
    let mut look = |settings: &FormationSettings| DroneLook {
        mesh: meshes.add(Mesh::from(shape::Icosphere {
            radius: settings.drone_scale,
            subdivisions: 2,
        })),
        material: materials.add(StandardMaterial {
            base_color: Color::rgb(settings.color[0], settings.color[1], settings.color[2]),
            emissive: Color::rgb(settings.color[0], settings.color[1], settings.color[2]) * 0.2,
            ..default()
        }),
        radius: settings.drone_scale,
    };
    let visuals = DroneVisuals {
        seam: look(&config.seam),
        cloud: look(&config.cloud),
    };
    commands.insert_resource(visuals);
}

fn schedule_drone_spawns(mut tasks: ResMut<DefenseTasks>, config: Res<DefenseConfig>) {
    tasks.schedule(SPAWN_TASK, spawn_drones_task(config.spawn_interval_secs));
    tracing::info!(
        cap = config.cap,
        scope = ?config.counter_scope,
        alternation = ?config.alternation,
        "drone spawning scheduled"
    );
}

pub fn sync_pivots(
    time: Res<Time>,
    pivots: Query<(&DefensePivot, &Transform)>,
    mut grid: ResMut<DefenseGrid>,
) {
    let grid = &mut *grid;
    grid.delta_secs = time.delta_seconds();
    grid.pivots.clear();
    for (pivot, xform) in pivots.iter() {
        grid.pivots.insert(pivot.0.clone(), xform.world_position());
    }
}

pub fn run_defense_tasks(mut tasks: ResMut<DefenseTasks>, mut grid: ResMut<DefenseGrid>) {
    tasks.tick(&mut grid);
}

pub fn realize_placements(
    mut commands: Commands,
    mut grid: ResMut<DefenseGrid>,
    visuals: Res<DroneVisuals>,
    mut drones: Query<(&mut Drone, &mut Transform, &mut Visibility)>,
) {
    let grid = &mut *grid;
    for cmd in std::mem::take(&mut grid.pending) {
        let look = visuals.get(cmd.kind);
        let drone = Drone {
            kind: cmd.kind,
            serial: cmd.serial,
        };
        match cmd.handle {
            PlacementHandle::Allocate => {
                spawn_drone(&mut commands, &mut grid.pool, look, drone, cmd);
            }
            PlacementHandle::Reused(entt) => {
                match drones.get_mut(entt) {
                    Ok((mut current, mut xform, mut visibility)) => {
                        *current = drone;
                        xform.translation = cmd.world_position;
                        visibility.is_visible = true;
                    }
                    Err(err) => {
                        // the stale handle stays InUse; never hand it out again
                        tracing::warn!(?entt, "pooled drone is gone, allocating a fresh one: {err:?}");
                        spawn_drone(&mut commands, &mut grid.pool, look, drone, cmd);
                        continue;
                    }
                }
                commands
                    .entity(entt)
                    .insert(Name::new(cmd.tag))
                    .insert(Collider::ball(look.radius));
            }
        }
    }
}

fn spawn_drone(
    commands: &mut Commands,
    pool: &mut EntityPool<FormationKind, Entity>,
    look: &DroneLook,
    drone: Drone,
    cmd: PlacementCommand<Entity>,
) -> Entity {
    let entt = commands
        .spawn_bundle(PbrBundle {
            mesh: look.mesh.clone(),
            material: look.material.clone(),
            transform: Transform::from_translation(cmd.world_position),
            ..default()
        })
        .insert(drone)
        .insert(Name::new(cmd.tag))
        .insert(Collider::ball(look.radius))
        .id();
    if let Err(err) = pool.register(cmd.kind, entt) {
        tracing::error!(?entt, "fresh drone refused by pool: {err}");
    }
    entt
}

pub fn recycle_hit_drones(
    mut commands: Commands,
    mut hits: EventReader<MissileHit>,
    mut grid: ResMut<DefenseGrid>,
    mut drones: Query<(&Drone, &mut Visibility)>,
) {
    for hit in hits.iter() {
        if let Ok((drone, mut visibility)) = drones.get_mut(hit.target) {
            if drone.return_to_pool(hit.target, &mut grid) {
                visibility.is_visible = false;
                commands.entity(hit.target).remove::<Collider>();
            }
        }
    }
}
