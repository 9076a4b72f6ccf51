use deps::*;

use bevy::{log::LogPlugin, prelude::*};
use bevy_egui::EguiPlugin;
use bevy_rapier3d::prelude::*;

use config::{ConfigSource, SpacejamConfig};

pub mod config;
pub mod defense;
pub mod hud;
pub mod input;
pub mod logging;
pub mod math;
pub mod scene;
pub mod schedule;
pub mod ship;

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let (config, source) = SpacejamConfig::load()?;
    let _log_guard = logging::init(&config.log)?;
    match &source {
        ConfigSource::File(path) => tracing::info!(path = %path.display(), "config loaded"),
        ConfigSource::Defaults(path) => {
            tracing::info!(path = %path.display(), "no config file, using defaults")
        }
    }

    let mut app = App::new();
    app.insert_resource(WindowDescriptor {
        title: "Space Jam".to_string(),
        ..default()
    })
    // the subscriber from `logging` is already installed
    .add_plugins_with(DefaultPlugins, |group| group.disable::<LogPlugin>())
    .add_plugin(EguiPlugin)
    .add_plugin(RapierPhysicsPlugin::<NoUserData>::default())
    .add_plugin(GamePlugin { config });
    app.run();

    tracing::info!("bye");
    Ok(())
}

pub struct GamePlugin {
    pub config: SpacejamConfig,
}

impl Plugin for GamePlugin {
    fn build(&self, app: &mut App) {
        let config = &self.config;
        app.add_plugin(input::InputPlugin)
            .add_plugin(scene::ScenePlugin {
                scene: config.scene.clone(),
                alien: config.alien.clone(),
            })
            .add_plugin(defense::DefensePlugin {
                config: config.defense.clone(),
            })
            .add_plugin(ship::ShipPlugin {
                config: config.ship.clone(),
            })
            .add_plugin(hud::HudPlugin);
    }
}
