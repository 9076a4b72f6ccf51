use deps::*;

use bevy::prelude::*;
use bevy_egui::{egui, EguiContext};

use crate::defense::{DefenseGrid, FormationKind};
use crate::ship::{Hero, MissileBay};

pub struct HudPlugin;

impl Plugin for HudPlugin {
    fn build(&self, app: &mut App) {
        app.add_system(status_window);
    }
}

fn status_window(
    mut egui_context: ResMut<EguiContext>,
    grid: Res<DefenseGrid>,
    heroes: Query<(&Transform, &MissileBay), With<Hero>>,
) {
    egui::Window::new("Status").show(egui_context.ctx_mut(), |ui| {
        if let Ok((xform, bay)) = heroes.get_single() {
            let pos = xform.translation;
            ui.label(format!("hero: ({:.0}, {:.0}, {:.0})", pos.x, pos.y, pos.z));
            ui.label(format!("missiles: {}/{}", bay.loaded(), bay.capacity));
        }
        ui.separator();
        let counter = &grid.placer.counter;
        ui.label(format!(
            "drones spawned: {} (cap {}{})",
            counter.total(),
            counter.cap(),
            if grid.complete { ", complete" } else { "" }
        ));
        for kind in FormationKind::ALL {
            ui.label(format!(
                "{}: {} in use, {} idle",
                kind.label(),
                grid.pool.in_use_count(kind),
                grid.pool.idle_count(kind),
            ));
        }
    });
}
