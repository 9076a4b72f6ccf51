use deps::*;

use bevy::{prelude::*, render::mesh::shape};
use bevy_rapier3d::prelude::*;

use crate::config::{AlienConfig, BodyConfig, SceneConfig};
use crate::defense::{DefenseGrid, DefensePivot};
use crate::math::*;
use crate::ship::{MissileHit, ShipSystems};

pub struct ScenePlugin {
    pub scene: SceneConfig,
    pub alien: AlienConfig,
}

impl Plugin for ScenePlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(self.scene.clone())
            .insert_resource(self.alien.clone())
            .insert_resource(ClearColor(Color::BLACK))
            .insert_resource(AmbientLight {
                color: Color::WHITE,
                brightness: 0.15,
            })
            .add_startup_system(zero_gravity)
            .add_startup_system(setup_environment)
            .add_startup_system(spawn_bodies)
            .add_startup_system_to_stage(StartupStage::PostStartup, spawn_alien)
            .add_system(alien_orbit)
            .add_system(destroy_hit_aliens.after(ShipSystems::Collisions));
    }
}

#[derive(Debug, Clone, Copy, Component)]
pub struct Planet;

#[derive(Debug, Clone, Copy, Component)]
pub struct Universe;

/// Circles its host in the host's XZ plane.
#[derive(Debug, Clone, Component)]
pub struct Alien {
    pub host: String,
    pub radius: TReal,
    /// In radians per second.
    pub speed: TReal,
    /// Always in `[0, 2π)`.
    pub angle: TReal,
}

impl Alien {
    /// Offset from the host after `delta_secs` more of travel.
    pub fn advance(&mut self, delta_secs: TReal) -> TVec3 {
        self.angle = smallest_positve_equivalent_angle_rad(self.angle + self.speed * delta_secs);
        circle_offset_xz(self.angle, self.radius)
    }
}

fn zero_gravity(mut rapier_config: ResMut<RapierConfiguration>) {
    rapier_config.gravity = TVec3::ZERO;
}

fn setup_environment(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    config: Res<SceneConfig>,
) {
    commands.spawn_bundle(DirectionalLightBundle {
        transform: Transform::from_translation(TVec3::Z * -10_000.0)
            .looking_at(TVec3::ZERO, TVec3::Y),
        directional_light: DirectionalLight {
            illuminance: 100_000.,
            ..default()
        },
        ..default()
    });
    // seen from the inside
    commands
        .spawn_bundle(PbrBundle {
            mesh: meshes.add(Mesh::from(shape::Icosphere {
                radius: config.universe_radius,
                subdivisions: 4,
            })),
            material: materials.add(StandardMaterial {
                base_color: Color::rgb(0.02, 0.02, 0.06),
                unlit: true,
                double_sided: true,
                cull_mode: None,
                ..default()
            }),
            ..default()
        })
        .insert(Universe)
        .insert(Name::new("Universe"));
}

fn spawn_body(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    body: &BodyConfig,
) -> Entity {
    commands
        .spawn_bundle(PbrBundle {
            mesh: meshes.add(Mesh::from(shape::Icosphere {
                radius: body.radius,
                subdivisions: 4,
            })),
            material: materials
                .add(Color::rgb(body.color[0], body.color[1], body.color[2]).into()),
            transform: Transform::from_translation(body.position.into()),
            ..default()
        })
        .insert(Name::new(body.name.clone()))
        .insert(DefensePivot(body.name.clone()))
        .insert(Collider::ball(body.radius))
        .id()
}

fn spawn_bodies(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    config: Res<SceneConfig>,
) {
    for planet in &config.planets {
        let entt = spawn_body(&mut commands, &mut meshes, &mut materials, planet);
        commands.entity(entt).insert(Planet);
    }
    spawn_body(&mut commands, &mut meshes, &mut materials, &config.station);
    tracing::info!(
        planets = config.planets.len(),
        station = %config.station.name,
        "scene ready"
    );
}

fn spawn_alien(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    config: Res<AlienConfig>,
    planets: Query<(&Name, &Transform), With<Planet>>,
) {
    let host = match planets
        .iter()
        .find(|(name, _)| name.as_str() == config.host)
    {
        Some((_, xform)) => xform.translation,
        None => {
            tracing::warn!(host = %config.host, "alien host planet missing, no alien spawned");
            return;
        }
    };
    let mut alien = Alien {
        host: config.host.clone(),
        radius: config.orbit_radius,
        speed: config.orbit_speed,
        angle: 0.,
    };
    let start = host + alien.advance(0.);
    commands
        .spawn_bundle(PbrBundle {
            mesh: meshes.add(Mesh::from(shape::Icosphere {
                radius: config.scale,
                subdivisions: 2,
            })),
            material: materials.add(StandardMaterial {
                base_color: Color::LIME_GREEN,
                emissive: Color::LIME_GREEN * 0.3,
                ..default()
            }),
            transform: Transform::from_translation(start),
            ..default()
        })
        .insert(alien)
        .insert(Name::new("Alien"))
        .insert(Collider::ball(config.scale));
    tracing::info!(host = %config.host, "alien spawned");
}

pub fn alien_orbit(
    time: Res<Time>,
    grid: Res<DefenseGrid>,
    mut aliens: Query<(&mut Alien, &mut Transform)>,
) {
    for (mut alien, mut xform) in aliens.iter_mut() {
        let host = match grid.pivots.get(&alien.host) {
            Some(host) => *host,
            None => continue,
        };
        xform.translation = host + alien.advance(time.delta_seconds());
    }
}

pub fn destroy_hit_aliens(
    mut commands: Commands,
    mut hits: EventReader<MissileHit>,
    aliens: Query<(), With<Alien>>,
) {
    for hit in hits.iter() {
        if aliens.contains(hit.target) {
            commands.entity(hit.target).despawn_recursive();
            tracing::info!("Alien destroyed!");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use real::consts::{PI, TAU};

    #[test]
    fn alien_angle_wraps() {
        let mut alien = Alien {
            host: "Planet3".into(),
            radius: 700.,
            speed: 0.5,
            angle: 0.,
        };
        let mut offset = TVec3::ZERO;
        for _ in 0..100 {
            offset = alien.advance(1.);
            assert!(alien.angle >= 0. && alien.angle < TAU);
            assert!((offset.length() - 700.).abs() < 1e-2);
            assert_eq!(offset.y, 0.);
        }
        // 50 radians of travel
        let expected = smallest_positve_equivalent_angle_rad(50.);
        assert!((alien.angle - expected).abs() < 1e-3);
        assert!((offset - circle_offset_xz(expected, 700.)).length() < 1.);

        alien.angle = PI;
        alien.speed = -1.;
        alien.advance(PI + 0.5);
        assert!((alien.angle - (TAU - 0.5)).abs() < 1e-4);
    }

    #[test]
    fn only_aliens_are_destroyed_by_hits() {
        let mut app = App::new();
        app.add_event::<MissileHit>().add_system(destroy_hit_aliens);
        let alien = app
            .world
            .spawn()
            .insert(Alien {
                host: "Planet3".into(),
                radius: 700.,
                speed: 0.5,
                angle: 0.,
            })
            .id();
        let rock = app.world.spawn().insert(Planet).id();
        {
            let mut hits = app.world.resource_mut::<Events<MissileHit>>();
            for target in [alien, rock] {
                hits.send(MissileHit {
                    missile: Entity::from_raw(1_000),
                    target,
                });
            }
        }
        app.update();
        assert!(app.world.get_entity(alien).is_none());
        assert!(app.world.get_entity(rock).is_some());
    }

    #[test]
    fn alien_follows_its_host() {
        let mut app = App::new();
        let mut grid = DefenseGrid::new(&Default::default());
        grid.pivots.insert("Planet3".into(), TVec3::new(500., -5000., 200.));
        app.insert_resource(Time::default())
            .insert_resource(grid)
            .add_system(alien_orbit);
        let alien = app
            .world
            .spawn()
            .insert(Alien {
                host: "Planet3".into(),
                radius: 700.,
                speed: 0.5,
                angle: 0.,
            })
            .insert(Transform::default())
            .id();
        app.update();
        let xform = app.world.get::<Transform>(alien).unwrap();
        assert!((xform.translation - TVec3::new(1200., -5000., 200.)).length() < 1e-2);
    }
}
