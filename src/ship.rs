use deps::*;

use bevy::{prelude::*, render::mesh::shape, utils::HashSet};
use bevy_rapier3d::prelude::*;

use crate::config::ShipConfig;
use crate::defense::DefensePivot;
use crate::input::{InputState, ShipAction};
use crate::math::*;

pub const HERO_PIVOT: &str = "Hero";
pub const MISSILE_RADIUS: TReal = 4.;

pub struct ShipPlugin {
    pub config: ShipConfig,
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, SystemLabel)]
pub enum ShipSystems {
    Controls,
    Steer,
    Collisions,
    Missiles,
}

impl Plugin for ShipPlugin {
    fn build(&self, app: &mut App) {
        use ShipSystems::*;
        app.insert_resource(self.config.clone())
            .add_event::<MissileHit>()
            .add_startup_system(spawn_hero)
            .add_startup_system(setup_missile_assets)
            .add_system_set(control_systems())
            .add_system(handle_collisions.label(Collisions).after(Controls))
            .add_system(advance_missiles.label(Missiles).after(Collisions))
            .add_system(reload_missile_bays);
    }
}

/// Steering, then firing from the steered pose.
fn control_systems() -> SystemSet {
    SystemSet::new()
        .label(ShipSystems::Controls)
        .with_system(apply_ship_controls.label(ShipSystems::Steer))
        .with_system(fire_missiles.after(ShipSystems::Steer))
}

#[derive(Debug, Clone, Copy, Component)]
pub struct Hero;

/// Sent when a missile strikes anything but its shooter.
#[derive(Debug, Clone, Copy)]
pub struct MissileHit {
    pub missile: Entity,
    pub target: Entity,
}

#[derive(Debug, Clone, Component)]
pub struct MissileBay {
    pub capacity: u32,
    loaded: u32,
    pub reload_secs: TReal,
    /// Time left on each reload in progress.
    reloading: Vec<TReal>,
}

impl MissileBay {
    pub fn new(capacity: u32, reload_secs: TReal) -> Self {
        Self {
            capacity,
            loaded: capacity,
            reload_secs,
            reloading: Vec::new(),
        }
    }

    #[inline]
    pub fn loaded(&self) -> u32 {
        self.loaded
    }

    /// Takes a missile out of the bay, `false` if it's empty.
    pub fn try_fire(&mut self) -> bool {
        if self.loaded == 0 {
            return false;
        }
        self.loaded -= 1;
        true
    }

    /// A fired missile is gone; start reloading its slot.
    pub fn missile_spent(&mut self) {
        if self.loaded + (self.reloading.len() as u32) < self.capacity {
            self.reloading.push(self.reload_secs);
        }
    }

    pub fn tick(&mut self, delta_secs: TReal) {
        let before = self.reloading.len();
        self.reloading.iter_mut().for_each(|left| *left -= delta_secs);
        self.reloading.retain(|left| *left > 0.);
        let done = (before - self.reloading.len()) as u32;
        if done > 0 {
            self.loaded = (self.loaded + done).min(self.capacity);
            tracing::debug!(loaded = self.loaded, "missile bay reloaded");
        }
    }
}

#[derive(Debug, Clone, Component)]
pub struct Missile {
    pub shooter: Entity,
    pub direction: TVec3,
    pub speed: TReal,
    pub range: TReal,
    pub travelled: TReal,
    /// Set once the missile has struck something. It despawns at the end of the frame.
    pub spent: bool,
}

impl Missile {
    /// Displacement for this frame and whether the missile has run out of range.
    pub fn advance(&mut self, delta_secs: TReal) -> (TVec3, bool) {
        let step = self.speed * delta_secs;
        self.travelled += step;
        (self.direction * step, self.travelled >= self.range)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MissileAssets {
    pub mesh: Handle<Mesh>,
    pub material: Handle<StandardMaterial>,
}

fn setup_missile_assets(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    commands.insert_resource(MissileAssets {
        mesh: meshes.add(Mesh::from(shape::Icosphere {
            radius: MISSILE_RADIUS,
            subdivisions: 1,
        })),
        material: materials.add(StandardMaterial {
            base_color: Color::ORANGE_RED,
            unlit: true,
            ..default()
        }),
    });
}

fn spawn_hero(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    config: Res<ShipConfig>,
) {
    let scale = config.scale;
    commands
        .spawn_bundle(PbrBundle {
            mesh: meshes.add(Mesh::from(shape::Box::new(scale, scale * 0.4, scale * 1.6))),
            material: materials.add(Color::rgb(0.6, 0.65, 0.7).into()),
            transform: Transform::from_translation(config.start_position.into()),
            ..default()
        })
        .insert(Hero)
        .insert(Name::new("Hero"))
        .insert(DefensePivot(HERO_PIVOT.into()))
        .insert(MissileBay::new(config.missile_bay, config.reload_secs))
        .insert(RigidBody::KinematicPositionBased)
        .insert(Collider::ball(scale))
        .insert(ActiveEvents::COLLISION_EVENTS)
        .insert(ActiveCollisionTypes::default() | ActiveCollisionTypes::KINEMATIC_STATIC)
        .with_children(|parent| {
            let offset: TVec3 = config.camera_offset.into();
            parent.spawn_bundle(Camera3dBundle {
                transform: Transform::from_translation(offset).looking_at(TVec3::ZERO, TVec3::Y),
                ..default()
            });
        });
    tracing::info!(position = ?config.start_position, "hero spawned");
}

/// Applies one tick of pilot input to the ship.
pub fn steer(xform: &mut Transform, input: &InputState, config: &ShipConfig) {
    use ShipAction::*;
    let rad = |deg: TReal| deg.to_radians();
    if input.is_active(Forward) {
        let forward = xform.forward();
        xform.translation += forward * config.move_rate;
    }
    // heading turns about the world up
    if input.is_active(TurnLeft) {
        xform.rotation = TQuat::from_rotation_y(rad(config.turn_rate)) * xform.rotation;
    }
    if input.is_active(TurnRight) {
        xform.rotation = TQuat::from_rotation_y(-rad(config.turn_rate)) * xform.rotation;
    }
    if input.is_active(PitchUp) {
        xform.rotation *= TQuat::from_rotation_x(rad(config.pitch_rate));
    }
    if input.is_active(PitchDown) {
        xform.rotation *= TQuat::from_rotation_x(-rad(config.pitch_rate));
    }
    if input.is_active(RollLeft) {
        xform.rotation *= TQuat::from_rotation_z(rad(config.roll_rate));
    }
    if input.is_active(RollRight) {
        xform.rotation *= TQuat::from_rotation_z(-rad(config.roll_rate));
    }
    xform.rotation = xform.rotation.normalize();
}

pub fn apply_ship_controls(
    input: Res<InputState>,
    config: Res<ShipConfig>,
    mut heroes: Query<&mut Transform, With<Hero>>,
) {
    for mut xform in heroes.iter_mut() {
        steer(&mut xform, &input, &config);
    }
}

pub fn fire_missiles(
    mut commands: Commands,
    input: Res<InputState>,
    config: Res<ShipConfig>,
    assets: Res<MissileAssets>,
    mut heroes: Query<(Entity, &Transform, &mut MissileBay), With<Hero>>,
) {
    if !input.just_pressed(ShipAction::Fire) {
        return;
    }
    for (hero, xform, mut bay) in heroes.iter_mut() {
        if !bay.try_fire() {
            tracing::info!("No missiles available to fire.");
            continue;
        }
        let direction = xform.forward();
        // clear of the hull so the shot doesn't strike its own ship
        let start = xform.translation + direction * (config.scale + MISSILE_RADIUS * 2.);
        let entt = commands
            .spawn_bundle(PbrBundle {
                mesh: assets.mesh.clone(),
                material: assets.material.clone(),
                transform: Transform::from_translation(start).with_rotation(xform.rotation),
                ..default()
            })
            .insert(Missile {
                shooter: hero,
                direction,
                speed: config.missile_speed,
                range: config.missile_range,
                travelled: 0.,
                spent: false,
            })
            .insert(Name::new("Missile"))
            .insert(RigidBody::KinematicPositionBased)
            .insert(Collider::ball(MISSILE_RADIUS))
            .insert(Ccd::enabled())
            .insert(ActiveEvents::COLLISION_EVENTS)
            .insert(ActiveCollisionTypes::default() | ActiveCollisionTypes::KINEMATIC_STATIC)
            .id();
        tracing::debug!(missile = ?entt, loaded = bay.loaded(), "missile fired");
    }
}

pub fn advance_missiles(
    mut commands: Commands,
    time: Res<Time>,
    mut missiles: Query<(Entity, &mut Missile, &mut Transform)>,
    mut bays: Query<&mut MissileBay>,
) {
    for (entt, mut missile, mut xform) in missiles.iter_mut() {
        if missile.spent {
            continue;
        }
        let (step, expired) = missile.advance(time.delta_seconds());
        xform.translation += step;
        if expired {
            missile.spent = true;
            commands.entity(entt).despawn_recursive();
            if let Ok(mut bay) = bays.get_mut(missile.shooter) {
                bay.missile_spent();
            }
            tracing::trace!(missile = ?entt, "missile out of range");
        }
    }
}

pub fn reload_missile_bays(time: Res<Time>, mut bays: Query<&mut MissileBay>) {
    for mut bay in bays.iter_mut() {
        bay.tick(time.delta_seconds());
    }
}

pub fn handle_collisions(
    mut commands: Commands,
    mut collisions: EventReader<CollisionEvent>,
    mut missiles: Query<&mut Missile>,
    mut bays: Query<&mut MissileBay>,
    heroes: Query<(), With<Hero>>,
    names: Query<&Name>,
    mut hits: EventWriter<MissileHit>,
) {
    let mut struck = HashSet::default();
    for event in collisions.iter() {
        let (a, b) = match event {
            CollisionEvent::Started(a, b, _) => (*a, *b),
            CollisionEvent::Stopped(..) => continue,
        };
        let name_of = |entt: Entity| {
            names
                .get(entt)
                .map(|name| name.as_str().to_string())
                .unwrap_or_else(|_| format!("{entt:?}"))
        };
        let mut handled = false;
        for (missile_entt, target) in [(a, b), (b, a)] {
            let mut missile = match missiles.get_mut(missile_entt) {
                Ok(missile) => missile,
                Err(_) => continue,
            };
            handled = true;
            if missile.spent || missile.shooter == target || !struck.insert(missile_entt) {
                continue;
            }
            missile.spent = true;
            commands.entity(missile_entt).despawn_recursive();
            if let Ok(mut bay) = bays.get_mut(missile.shooter) {
                bay.missile_spent();
            }
            tracing::info!(target = %name_of(target), "missile hit");
            hits.send(MissileHit {
                missile: missile_entt,
                target,
            });
            break;
        }
        if handled {
            continue;
        }
        if heroes.contains(a) || heroes.contains(b) {
            let other = if heroes.contains(a) { b } else { a };
            tracing::info!(other = %name_of(other), "ship collided");
        }
    }
}
