use deps::*;

use eyre::{ensure, WrapErr};
use std::path::{Path, PathBuf};

use crate::defense::{AlternationPolicy, CounterScope, FormationKind, SeamDivisor};
use crate::math::*;

pub const CONFIG_PATH_ENV: &str = "SPACEJAM_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/spacejam.ron";

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    File(PathBuf),
    /// Nothing at the path, built-in defaults in use.
    Defaults(PathBuf),
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(crate = "serde", default)]
pub struct SpacejamConfig {
    pub log: LogConfig,
    pub defense: DefenseConfig,
    pub ship: ShipConfig,
    pub alien: AlienConfig,
    pub scene: SceneConfig,
}

impl SpacejamConfig {
    /// Loads from `$SPACEJAM_CONFIG`, falling back to [`DEFAULT_CONFIG_PATH`].
    pub fn load() -> eyre::Result<(Self, ConfigSource)> {
        let path = std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> eyre::Result<(Self, ConfigSource)> {
        if !path.exists() {
            return Ok((Self::default(), ConfigSource::Defaults(path.to_path_buf())));
        }
        let raw = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("unable to read config at {}", path.display()))?;
        let config = Self::from_ron(&raw)
            .wrap_err_with(|| format!("invalid config at {}", path.display()))?;
        Ok((config, ConfigSource::File(path.to_path_buf())))
    }

    pub fn from_ron(raw: &str) -> eyre::Result<Self> {
        let config: Self = ron::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> eyre::Result<()> {
        let defense = &self.defense;
        ensure!(defense.cap > 0, "defense.cap must be at least 1");
        ensure!(
            defense.spawn_interval_secs >= 0.,
            "defense.spawn_interval_secs can't be negative"
        );
        ensure!(
            defense.seam_shape.is_finite(),
            "defense.seam_shape must be finite"
        );
        if let SeamDivisor::Fixed(n) = defense.seam_divisor {
            ensure!(n > 0, "defense.seam_divisor must be at least 1");
        }
        for (kind, formation) in [
            (FormationKind::Seam, &defense.seam),
            (FormationKind::Cloud, &defense.cloud),
        ] {
            ensure!(
                formation.radius > 0. && formation.drone_scale > 0.,
                "defense.{} radius and drone_scale must be positive",
                kind.label()
            );
        }
        for orbiter in &defense.orbiters {
            ensure!(
                orbiter.radius > 0. && orbiter.scale > 0.,
                "orbiter around {} needs a positive radius and scale",
                orbiter.pivot
            );
        }
        ensure!(
            self.ship.missile_bay > 0,
            "ship.missile_bay must be at least 1"
        );
        ensure!(
            self.ship.missile_speed > 0. && self.ship.missile_range > 0.,
            "ship.missile_speed and ship.missile_range must be positive"
        );
        ensure!(
            self.alien.orbit_radius > 0.,
            "alien.orbit_radius must be positive"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(crate = "serde", default)]
pub struct LogConfig {
    /// Directive used when `RUST_LOG` isn't set.
    pub filter: String,
    /// Directory for the daily rolling log files.
    pub directory: PathBuf,
    pub file_prefix: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info,wgpu=warn,naga=warn".into(),
            directory: "logs".into(),
            file_prefix: "spacejam.log".into(),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(crate = "serde", default)]
pub struct FormationSettings {
    /// Name of the [`DefensePivot`](crate::defense::DefensePivot) the formation surrounds.
    pub pivot: String,
    pub radius: TReal,
    /// Radius of each drone.
    pub drone_scale: TReal,
    pub color: [f32; 3],
}

impl Default for FormationSettings {
    fn default() -> Self {
        Self {
            pivot: "SpaceStation1".into(),
            radius: 500.,
            drone_scale: 5.,
            color: [0.8, 0.3, 0.9],
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(crate = "serde", default)]
pub struct DefenseConfig {
    /// Maximum drone population, see [`CounterScope`].
    pub cap: u32,
    pub counter_scope: CounterScope,
    pub alternation: AlternationPolicy,
    pub seam_divisor: SeamDivisor,
    pub seam_shape: TReal,
    /// Zero spawns one drone every tick.
    pub spawn_interval_secs: TReal,
    pub seam: FormationSettings,
    pub cloud: FormationSettings,
    pub orbiters: Vec<OrbiterConfig>,
}

impl Default for DefenseConfig {
    fn default() -> Self {
        Self {
            cap: 60,
            counter_scope: CounterScope::Shared,
            alternation: AlternationPolicy::Parity {
                even: FormationKind::Cloud,
                odd: FormationKind::Seam,
            },
            seam_divisor: SeamDivisor::Cap,
            seam_shape: 0.4,
            spawn_interval_secs: 0.,
            seam: FormationSettings::default(),
            cloud: FormationSettings {
                pivot: "Planet1".into(),
                radius: 500.,
                drone_scale: 10.,
                color: [0.3, 0.9, 0.5],
            },
            orbiters: vec![
                OrbiterConfig::default(),
                OrbiterConfig {
                    kind: FormationKind::Cloud,
                    pivot: "Planet2".into(),
                    radius: 450.,
                    ..Default::default()
                },
            ],
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(crate = "serde", default)]
pub struct OrbiterConfig {
    pub kind: FormationKind,
    pub pivot: String,
    /// Pivot the orbiter keeps facing.
    pub stare_at: String,
    pub radius: TReal,
    pub scale: TReal,
    pub color: [f32; 3],
    /// Seam curve steps per second.
    pub velocity: TReal,
    /// Ticks between cloud jumps.
    pub cloud_timer: u32,
}

impl Default for OrbiterConfig {
    fn default() -> Self {
        Self {
            kind: FormationKind::Seam,
            pivot: "Planet5".into(),
            stare_at: "Hero".into(),
            radius: 900.,
            scale: 6.,
            color: [0.9, 0.9, 0.2],
            velocity: 0.005,
            cloud_timer: 240,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(crate = "serde", default)]
pub struct ShipConfig {
    pub start_position: [f32; 3],
    /// Collision radius of the hull.
    pub scale: TReal,
    /// Distance travelled per tick while thrusting.
    pub move_rate: TReal,
    /// In degrees per tick.
    pub turn_rate: TReal,
    /// In degrees per tick.
    pub pitch_rate: TReal,
    /// In degrees per tick.
    pub roll_rate: TReal,
    pub missile_bay: u32,
    /// In seconds.
    pub reload_secs: TReal,
    pub missile_speed: TReal,
    pub missile_range: TReal,
    pub camera_offset: [f32; 3],
}

impl Default for ShipConfig {
    fn default() -> Self {
        Self {
            start_position: [1000., 1200., -58.],
            scale: 58.,
            move_rate: 5.,
            turn_rate: 1.5,
            pitch_rate: 1.5,
            roll_rate: 2.,
            missile_bay: 1,
            reload_secs: 0.25,
            missile_speed: 2000.,
            missile_range: 4000.,
            camera_offset: [0., 120., 400.],
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(crate = "serde", default)]
pub struct AlienConfig {
    /// Planet the alien circles.
    pub host: String,
    pub orbit_radius: TReal,
    /// In radians per second.
    pub orbit_speed: TReal,
    pub scale: TReal,
}

impl Default for AlienConfig {
    fn default() -> Self {
        Self {
            host: "Planet3".into(),
            orbit_radius: 700.,
            orbit_speed: 0.5,
            scale: 20.,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(crate = "serde")]
pub struct BodyConfig {
    pub name: String,
    pub position: [f32; 3],
    pub radius: TReal,
    pub color: [f32; 3],
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(crate = "serde", default)]
pub struct SceneConfig {
    pub universe_radius: TReal,
    pub planets: Vec<BodyConfig>,
    pub station: BodyConfig,
}

impl Default for SceneConfig {
    fn default() -> Self {
        let planet = |name: &str, position: [f32; 3], radius: TReal, color: [f32; 3]| BodyConfig {
            name: name.into(),
            position,
            radius,
            color,
        };
        Self {
            universe_radius: 18_008.,
            planets: vec![
                planet("Planet1", [-6000., -3000., -800.], 250., [0.2, 0.4, 0.9]),
                planet("Planet2", [0., 6000., 0.], 300., [0.7, 0.6, 0.4]),
                planet("Planet3", [500., -5000., 200.], 500., [0.9, 0.8, 0.3]),
                planet("Planet4", [300., 6000., 500.], 150., [0.3, 0.7, 0.3]),
                planet("Planet5", [700., -2000., 100.], 500., [0.8, 0.2, 0.2]),
                planet("Planet6", [0., -980., -1480.], 780., [0.5, 0.5, 0.6]),
            ],
            station: planet("SpaceStation1", [1500., 1800., -100.], 40., [0.7, 0.7, 0.75]),
        }
    }
}
