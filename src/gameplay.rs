use clipboard_rs::{Clipboard, ClipboardContext};
use macroquad::prelude::{debug, info, warn};
use rand::rngs::StdRng;

use crate::config::SessionConfig;
use crate::generator::{generate_puzzle, rng_from_config};
use crate::model::*;
use crate::renderer::{Renderer, StatusLine};
use crate::session::{MoveOutcome, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Selection {
    None,
    Container(usize),
}

/// A winning line being replayed on screen; the live session is untouched.
struct SolutionPreview {
    states: Vec<GameState>,
    step: usize,
}

pub struct GameEngine {
    config: SessionConfig,
    rng: StdRng,
    session: Session,
    buttons: Vec<Button>,
    renderer: Renderer,
    selected: Selection,
    preview: Option<SolutionPreview>,
    status: StatusLine,
}

impl GameEngine {
    pub fn new(config: SessionConfig) -> Self {
        let mut rng = rng_from_config(&config);
        let puzzle = generate_puzzle(config.full_containers, config.empty_containers, &mut rng);
        let session = Session::new(puzzle, config.full_containers, config.max_depth);
        let buttons = vec![
            Button::new("New", ControlAction::NewPuzzle, FLUID_COLORS[3]), // GREEN
            Button::new("Build", ControlAction::BuildTree, FLUID_COLORS[1]), // BLUE
            Button::new("Hint", ControlAction::Hint, FLUID_COLORS[5]), // ORANGE
            Button::new("Solve", ControlAction::ShowSolution, FLUID_COLORS[4]), // PURPLE
            Button::new("Tree", ControlAction::ShowTree, FLUID_COLORS[16]), // TEAL
            Button::new("Copy", ControlAction::CopyState, FLUID_COLORS[7]), // MAGENTA
            Button::new("Paste", ControlAction::PasteState, FLUID_COLORS[9]), // PINK
        ];

        let mut engine = Self {
            config,
            rng,
            session,
            buttons,
            renderer: Renderer::new(),
            selected: Selection::None,
            preview: None,
            status: StatusLine::info("Press Build to explore moves"),
        };
        engine.start_session();
        engine
    }

    pub fn render(&mut self) {
        self.renderer.autoset_viewport();
        let selected_container = match self.selected {
            Selection::Container(index) => Some(index),
            Selection::None => None,
        };
        let state = match &self.preview {
            Some(preview) => &preview.states[preview.step],
            None => self.session.current_state(),
        };
        let containers = state.get_containers().iter().collect::<Vec<_>>();
        let buttons = self.buttons.iter().collect::<Vec<_>>();
        self.renderer.render_game(
            &containers,
            &buttons,
            selected_container,
            &self.status,
        );
    }

    pub fn handle_click(&mut self, x: f32, y: f32) {
        let item = self.renderer.get_hit_test_registry().hit_test(x, y).map(|hit| hit.item);
        if let Some(item) = item {
            self.handle_hit_item(item);
        }
    }

    fn handle_hit_item(&mut self, item: HitItem) {
        let action = match item {
            HitItem::Button { function } => function,
            HitItem::Container { index } => match self.selected {
                Selection::Container(from_index) if from_index == index => ControlAction::Deselect,
                Selection::Container(from_index) => ControlAction::PourInto(from_index, index),
                Selection::None => ControlAction::SelectContainer(index),
            },
        };
        self.handle_game_action(action);
    }

    pub fn handle_game_action(&mut self, action: ControlAction) {
        // Any other action closes an open replay first; Solve just toggles it off.
        if self.preview.is_some()
            && !matches!(
                action,
                ControlAction::StepSolution(_) | ControlAction::CloseSolution
            )
        {
            self.close_preview();
            if matches!(action, ControlAction::ShowSolution) {
                return;
            }
        }
        match action {
            ControlAction::SelectContainer(index) => {
                self.selected = Selection::Container(index);
            }
            ControlAction::Deselect => {
                self.selected = Selection::None;
            }
            ControlAction::PourInto(from, to) => {
                self.pour(MoveAction::new(from, to));
            }
            ControlAction::NewPuzzle => {
                let puzzle = generate_puzzle(
                    self.config.full_containers,
                    self.config.empty_containers,
                    &mut self.rng,
                );
                self.load_puzzle(puzzle, self.config.full_containers);
            }
            ControlAction::BuildTree => {
                self.build_tree();
            }
            ControlAction::Hint => {
                self.take_hint();
            }
            ControlAction::ShowSolution => {
                self.show_solution();
            }
            ControlAction::StepSolution(delta) => {
                if let Some(preview) = &mut self.preview {
                    let last = preview.states.len() - 1;
                    preview.step = preview.step.saturating_add_signed(delta).min(last);
                    self.status = StatusLine::info(format!(
                        "Solution step {}/{} (Esc to return)",
                        preview.step, last
                    ));
                }
            }
            ControlAction::CloseSolution => {
                self.close_preview();
            }
            ControlAction::ShowTree => {
                self.show_tree();
            }
            ControlAction::CopyState => {
                let repr = self.session.current_state().get_text_representation();
                self.set_clipboard(&repr);
            }
            ControlAction::PasteState => {
                let repr = self.get_clipboard();
                match GameState::new_from_repr(&repr) {
                    Ok(puzzle) => {
                        let full_containers = puzzle.filled_container_equivalent();
                        self.load_puzzle(puzzle, full_containers);
                    }
                    Err(e) => {
                        warn!("Rejected pasted puzzle: {}", e);
                        self.status = StatusLine::error(format!("Paste failed: {e}"));
                    }
                }
            }
        }
    }

    fn load_puzzle(&mut self, puzzle: GameState, full_containers: usize) {
        self.session = Session::new(puzzle, full_containers, self.config.max_depth);
        self.status = StatusLine::info("New puzzle, press Build to explore moves");
        self.start_session();
    }

    fn start_session(&mut self) {
        self.selected = Selection::None;
        self.preview = None;
        info!(
            "Puzzle: {}",
            self.session.initial_state().get_text_representation()
        );
        if self.session.is_won() {
            self.status = StatusLine::success("Already sorted, you got lucky!");
            return;
        }
        if self.config.build_on_start {
            self.build_tree();
        }
    }

    fn build_tree(&mut self) {
        self.selected = Selection::None;
        let stats = self.session.build_tree();
        info!(
            "Explored {} states up to depth {} ({} on winning lines)",
            stats.node_count, self.session.max_depth(), stats.solution_nodes
        );
        let solvable = self
            .session
            .tree()
            .is_ok_and(|tree| tree.node(tree.root()).is_solution());
        self.status = if solvable {
            StatusLine::info(format!("Explored {} states, a win is reachable", stats.node_count))
        } else {
            StatusLine::error(format!(
                "Explored {} states, no win within {} moves",
                stats.node_count,
                self.session.max_depth()
            ))
        };
    }

    fn pour(&mut self, action: MoveAction) {
        self.selected = Selection::None;
        match self.session.make_move(action) {
            Ok(outcome) => {
                debug!("Player poured {}", action);
                self.report_outcome(outcome, format!("Poured {action}"));
            }
            Err(e) => {
                warn!("Move {} rejected: {}", action, e);
                self.status = StatusLine::error(e.to_string());
                if !self.session.current_state().is_legal_move(&action) {
                    self.selected = Selection::Container(action.to_container);
                }
            }
        }
    }

    fn take_hint(&mut self) {
        self.selected = Selection::None;
        match self.session.hint() {
            Ok(hint) => {
                info!("Hint played {}", hint.action);
                self.report_outcome(hint.outcome, format!("Hint: poured {}", hint.action));
            }
            Err(e) => {
                warn!("Hint unavailable: {}", e);
                self.status = StatusLine::error(e.to_string());
            }
        }
    }

    fn report_outcome(&mut self, outcome: MoveOutcome, message: String) {
        let moves = self.session.depth();
        self.status = match outcome {
            MoveOutcome::InProgress => StatusLine::info(format!("{message} ({moves} moves)")),
            MoveOutcome::Won => {
                info!("Puzzle solved in {} moves", moves);
                StatusLine::success(format!("{message}, sorted in {moves} moves. You won!"))
            }
            MoveOutcome::OutOfMoves => {
                info!("No moves left after {} moves", moves);
                StatusLine::error(format!("{message}, no moves left. You lost."))
            }
        };
    }

    fn show_solution(&mut self) {
        match self.session.solution_path() {
            Ok(states) => {
                let moves = states.len() - 1;
                info!("Showing a {}-move solution", moves);
                self.preview = Some(SolutionPreview { states, step: 0 });
                self.status = StatusLine::info(format!(
                    "Solution step 0/{moves} (Left/Right to step, Esc to return)"
                ));
            }
            Err(e) => {
                warn!("Solution unavailable: {}", e);
                self.status = StatusLine::error(e.to_string());
            }
        }
    }

    fn close_preview(&mut self) {
        if self.preview.take().is_some() {
            self.status = StatusLine::info(format!("Back to play ({} moves)", self.session.depth()));
        }
    }

    fn show_tree(&mut self) {
        let states = match self.session.tree_states() {
            Ok(states) => states,
            Err(e) => {
                self.status = StatusLine::error(e.to_string());
                return;
            }
        };
        for (depth, state) in &states {
            debug!("[{}] {}", depth, state.get_text_representation());
        }
        if let Ok(stats) = self.session.tree_stats() {
            info!("Tree summary: {:?}", stats);
            self.status = StatusLine::info(format!(
                "{} states, deepest level {}, {} winning leaves",
                stats.node_count, stats.deepest_level, stats.won_leaves
            ));
        }
    }

    fn get_clipboard(&self) -> String {
        match ClipboardContext::new().and_then(|ctx| ctx.get_text()) {
            Ok(text) => text,
            Err(e) => {
                warn!("Clipboard read failed: {}", e);
                String::new()
            }
        }
    }

    fn set_clipboard(&mut self, content: &str) {
        match ClipboardContext::new().and_then(|ctx| ctx.set_text(content.to_string())) {
            Ok(()) => self.status = StatusLine::info(format!("Copied {content}")),
            Err(e) => {
                warn!("Clipboard write failed: {}", e);
                self.status = StatusLine::error("Could not copy to clipboard");
            }
        }
    }
}
