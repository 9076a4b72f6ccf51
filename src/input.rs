use deps::*;

use bevy::{
    input::{keyboard::KeyboardInput, ButtonState},
    prelude::*,
    utils::HashMap,
};

pub struct InputPlugin;

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, SystemLabel)]
pub struct UpdateInputState;

impl Plugin for InputPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<KeyBindings>()
            .init_resource::<InputState>()
            .add_system_to_stage(
                CoreStage::PreUpdate,
                update_input_state.label(UpdateInputState),
            );
    }
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum ShipAction {
    Forward,
    TurnLeft,
    TurnRight,
    PitchUp,
    PitchDown,
    RollLeft,
    RollRight,
    Fire,
}

#[derive(Debug, Clone)]
pub struct KeyBindings(pub HashMap<KeyCode, ShipAction>);

impl Default for KeyBindings {
    fn default() -> Self {
        use ShipAction::*;
        Self(
            [
                (KeyCode::W, Forward),
                (KeyCode::A, TurnLeft),
                (KeyCode::D, TurnRight),
                (KeyCode::R, PitchUp),
                (KeyCode::S, PitchDown),
                (KeyCode::Q, RollLeft),
                (KeyCode::E, RollRight),
                (KeyCode::F, Fire),
            ]
            .into_iter()
            .collect(),
        )
    }
}

/// What the pilot is asking for, polled by the ship systems each frame.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    held: HashMap<ShipAction, bool>,
    /// Actions that went down this frame.
    just_pressed: SVec<[ShipAction; 4]>,
}

impl InputState {
    pub fn press(&mut self, action: ShipAction) {
        let was_held = self.held.insert(action, true).unwrap_or(false);
        // key repeat doesn't count as a new press
        if !was_held {
            self.just_pressed.push(action);
        }
    }

    pub fn release(&mut self, action: ShipAction) {
        self.held.insert(action, false);
    }

    #[inline]
    pub fn is_active(&self, action: ShipAction) -> bool {
        self.held.get(&action).copied().unwrap_or(false)
    }

    #[inline]
    pub fn just_pressed(&self, action: ShipAction) -> bool {
        self.just_pressed.contains(&action)
    }

    pub fn clear_transient(&mut self) {
        self.just_pressed.clear();
    }
}

pub fn update_input_state(
    mut events: EventReader<KeyboardInput>,
    bindings: Res<KeyBindings>,
    mut state: ResMut<InputState>,
) {
    state.clear_transient();
    for event in events.iter() {
        let action = match event.key_code.and_then(|code| bindings.0.get(&code)) {
            Some(action) => *action,
            None => continue,
        };
        match event.state {
            ButtonState::Pressed => state.press(action),
            ButtonState::Released => state.release(action),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(key_code: KeyCode, state: ButtonState) -> KeyboardInput {
        KeyboardInput {
            scan_code: 0,
            key_code: Some(key_code),
            state,
        }
    }

    #[test]
    fn held_until_released() {
        let mut state = InputState::default();
        assert!(!state.is_active(ShipAction::Forward));
        state.press(ShipAction::Forward);
        assert!(state.is_active(ShipAction::Forward));
        assert!(state.just_pressed(ShipAction::Forward));
        state.clear_transient();
        assert!(state.is_active(ShipAction::Forward));
        assert!(!state.just_pressed(ShipAction::Forward));
        state.release(ShipAction::Forward);
        assert!(!state.is_active(ShipAction::Forward));
    }

    #[test]
    fn repeats_are_not_new_presses() {
        let mut state = InputState::default();
        state.press(ShipAction::Fire);
        state.clear_transient();
        state.press(ShipAction::Fire);
        assert!(!state.just_pressed(ShipAction::Fire));
    }

    #[test]
    fn keyboard_events_drive_the_state() {
        let mut app = App::new();
        app.add_event::<KeyboardInput>()
            .init_resource::<KeyBindings>()
            .init_resource::<InputState>()
            .add_system(update_input_state);

        {
            let mut events = app.world.resource_mut::<Events<KeyboardInput>>();
            events.send(key(KeyCode::W, ButtonState::Pressed));
            events.send(key(KeyCode::F, ButtonState::Pressed));
            events.send(key(KeyCode::Z, ButtonState::Pressed));
        }
        app.update();
        {
            let state = app.world.resource::<InputState>();
            assert!(state.is_active(ShipAction::Forward));
            assert!(state.just_pressed(ShipAction::Fire));
            assert!(!state.is_active(ShipAction::TurnLeft));
        }

        app.world
            .resource_mut::<Events<KeyboardInput>>()
            .send(key(KeyCode::W, ButtonState::Released));
        app.update();
        let state = app.world.resource::<InputState>();
        assert!(!state.is_active(ShipAction::Forward));
        // still held, but only fresh for one frame
        assert!(state.is_active(ShipAction::Fire));
        assert!(!state.just_pressed(ShipAction::Fire));
    }
}
