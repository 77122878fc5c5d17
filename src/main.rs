mod config;
mod error;
mod gameplay;
mod generator;
mod model;
mod renderer;
mod session;
mod solver;

use std::path::PathBuf;

use crate::config::{DEFAULT_CONFIG_PATH, SessionConfig};
use crate::gameplay::*;
use crate::model::ControlAction;

use macroquad::prelude::*;

const KEY_BINDINGS: [(KeyCode, ControlAction); 8] = [
    (KeyCode::N, ControlAction::NewPuzzle),
    (KeyCode::B, ControlAction::BuildTree),
    (KeyCode::H, ControlAction::Hint),
    (KeyCode::S, ControlAction::ShowSolution),
    (KeyCode::T, ControlAction::ShowTree),
    (KeyCode::Left, ControlAction::StepSolution(-1)),
    (KeyCode::Right, ControlAction::StepSolution(1)),
    (KeyCode::Escape, ControlAction::CloseSolution),
];

fn load_config() -> SessionConfig {
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    SessionConfig::load_or_default(&path).unwrap_or_else(|e| {
        warn!("{}; using defaults", e);
        SessionConfig::default()
    })
}

#[macroquad::main("Water Sort Explorer")]
async fn main() {
    let mut engine = GameEngine::new(load_config());
    loop {
        engine.render();
        if is_mouse_button_pressed(MouseButton::Left) {
            let (x, y) = mouse_position();
            engine.handle_click(x, y);
        }
        if is_mouse_button_pressed(MouseButton::Right) {
            engine.handle_game_action(ControlAction::Deselect);
        }
        for (key, action) in KEY_BINDINGS {
            if is_key_pressed(key) {
                engine.handle_game_action(action);
            }
        }
        next_frame().await;
    }
}
