use deps::*;

use bevy::{prelude::*, render::mesh::shape};
use bevy_rapier3d::prelude::*;
use rand::prelude::*;

use super::{path, DefenseError, DefenseGrid, FormationKind};
use crate::config::{DefenseConfig, OrbiterConfig};
use crate::math::*;

/// Seam tightness used by traveling orbiters; looser than the static formations.
pub const ORBIT_SEAM_SHAPE: TReal = 2.0;

/// A lone drone that travels along a formation path around its pivot.
#[derive(Debug, Clone, Component)]
pub struct Orbiter {
    pub kind: FormationKind,
    pub pivot: String,
    pub stare_at: String,
    pub radius: TReal,
    /// 1-based, doubles as the seam divisor.
    pub index: u32,
    pub velocity: TReal,
    pub cloud_timer: u32,
    cloud_clock: u32,
}

impl Orbiter {
    pub fn new(config: &OrbiterConfig, index: u32) -> Self {
        Self {
            kind: config.kind,
            pivot: config.pivot.clone(),
            stare_at: config.stare_at.clone(),
            radius: config.radius,
            index,
            velocity: config.velocity,
            cloud_timer: config.cloud_timer,
            // jump on the first tick
            cloud_clock: config.cloud_timer,
        }
    }

    /// Offset from the pivot for this tick, `None` if the orbiter stays put.
    pub fn advance<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        elapsed_secs: TReal,
    ) -> Result<Option<TVec3>, DefenseError> {
        match self.kind {
            FormationKind::Seam => {
                let n = i32::try_from(self.index).unwrap_or_log();
                let direction = path::seam(elapsed_secs * self.velocity, n, ORBIT_SEAM_SHAPE)?;
                Ok(Some(direction * self.radius))
            }
            FormationKind::Cloud => {
                if self.cloud_clock < self.cloud_timer {
                    self.cloud_clock += 1;
                    Ok(None)
                } else {
                    self.cloud_clock = 0;
                    Ok(Some(path::cloud(rng) * self.radius))
                }
            }
        }
    }
}

pub fn spawn_orbiters(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    config: Res<DefenseConfig>,
) {
    for (ii, orbiter) in config.orbiters.iter().enumerate() {
        let index = ii as u32 + 1;
        commands
            .spawn_bundle(PbrBundle {
                mesh: meshes.add(Mesh::from(shape::Icosphere {
                    radius: orbiter.scale,
                    subdivisions: 2,
                })),
                material: materials.add(
                    Color::rgb(orbiter.color[0], orbiter.color[1], orbiter.color[2]).into(),
                ),
                ..default()
            })
            .insert(Orbiter::new(orbiter, index))
            .insert(Name::new(format!("Orbiter{index}")))
            .insert(Collider::ball(orbiter.scale));
        tracing::info!(index, kind = orbiter.kind.label(), pivot = %orbiter.pivot, "orbiter spawned");
    }
}

pub fn update(
    time: Res<Time>,
    grid: Res<DefenseGrid>,
    mut orbiters: Query<(&mut Orbiter, &mut Transform)>,
) {
    let mut rng = rand::thread_rng();
    let elapsed = time.seconds_since_startup() as TReal;
    for (mut orbiter, mut xform) in orbiters.iter_mut() {
        let pivot = match grid.pivots.get(&orbiter.pivot) {
            Some(pivot) => *pivot,
            None => continue,
        };
        match orbiter.advance(&mut rng, elapsed) {
            Ok(Some(offset)) => xform.translation = pivot + offset,
            Ok(None) => {}
            Err(err) => tracing::trace!(index = orbiter.index, "orbiter holds position: {err}"),
        }
        if let Some(target) = grid.pivots.get(&orbiter.stare_at) {
            if target.distance_squared(xform.translation) > UNIT_TOLERANCE {
                xform.look_at(*target, TVec3::Y);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orbiter(kind: FormationKind, cloud_timer: u32) -> Orbiter {
        Orbiter::new(
            &OrbiterConfig {
                kind,
                radius: 100.,
                cloud_timer,
                ..Default::default()
            },
            1,
        )
    }

    #[test]
    fn seam_orbiter_follows_the_curve() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut orbiter = orbiter(FormationKind::Seam, 240);
        for secs in [0., 10., 55.5] {
            let offset = orbiter.advance(&mut rng, secs).unwrap().unwrap();
            let expected = path::seam(secs * orbiter.velocity, 1, ORBIT_SEAM_SHAPE).unwrap();
            assert!((offset - expected * 100.).length() < 1e-3);
        }
    }

    #[test]
    fn cloud_orbiter_jumps_on_its_timer() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut orbiter = orbiter(FormationKind::Cloud, 3);
        let jumps: Vec<_> = (0..9)
            .map(|_| orbiter.advance(&mut rng, 0.).unwrap())
            .collect();
        let pattern: Vec<_> = jumps.iter().map(Option::is_some).collect();
        assert_eq!(
            pattern,
            vec![true, false, false, false, true, false, false, false, true]
        );
        for offset in jumps.into_iter().flatten() {
            assert!((offset.length() - 100.).abs() < 1e-3);
        }
    }

    #[test]
    fn orbiters_circle_their_pivot_and_face_the_target() {
        let mut app = App::new();
        let mut grid = DefenseGrid::new(&DefenseConfig::default());
        grid.pivots.insert("Planet5".into(), TVec3::new(0., 1000., 0.));
        grid.pivots.insert("Hero".into(), TVec3::ZERO);
        app.insert_resource(Time::default())
            .insert_resource(grid)
            .add_system(update);
        let entt = app
            .world
            .spawn()
            .insert(orbiter(FormationKind::Seam, 240))
            .insert(Transform::default())
            .id();
        app.update();

        let xform = *app.world.get::<Transform>(entt).unwrap();
        let pivot = TVec3::new(0., 1000., 0.);
        assert!(((xform.translation - pivot).length() - 100.).abs() < 1e-2);
        let to_hero = (TVec3::ZERO - xform.translation).normalize();
        assert!(xform.forward().dot(to_hero) > 0.999);
    }
}
