use macroquad::prelude::debug;

use crate::error::SessionError;
use crate::model::{GameState, MoveAction};
use crate::solver::{NodeId, SearchTree, TreeStats};

/// What a successful move (or consumed hint) left the player with.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MoveOutcome {
    InProgress,
    Won,
    /// Not won, and the tree has nothing below the new position.
    OutOfMoves,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Hint {
    pub action: MoveAction,
    pub outcome: MoveOutcome,
}

/// A live game: the starting puzzle, the search tree once built, and the
/// cursor node that mirrors the player's current state.
pub struct Session {
    initial_state: GameState,
    full_containers: usize,
    max_depth: usize,
    tree: Option<SearchTree>,
    cursor: NodeId,
    moved: bool,
}

impl Session {
    pub fn new(initial_state: GameState, full_containers: usize, max_depth: usize) -> Self {
        Self {
            initial_state,
            full_containers,
            max_depth,
            tree: None,
            cursor: SearchTree::ROOT,
            moved: false,
        }
    }

    /// Builds a fresh tree from the starting puzzle. Any previous tree is
    /// dropped and play restarts from the root.
    pub fn build_tree(&mut self) -> TreeStats {
        let tree = SearchTree::build(
            self.initial_state.clone(),
            self.max_depth,
            self.full_containers,
        );
        let stats = tree.stats();
        self.cursor = tree.root();
        self.tree = Some(tree);
        self.moved = false;
        stats
    }

    pub fn tree(&self) -> Result<&SearchTree, SessionError> {
        self.tree.as_ref().ok_or(SessionError::TreeNotBuilt)
    }

    pub fn initial_state(&self) -> &GameState {
        &self.initial_state
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// The player's state; the starting puzzle until a tree exists.
    pub fn current_state(&self) -> &GameState {
        match &self.tree {
            Some(tree) => tree.node(self.cursor).get_state(),
            None => &self.initial_state,
        }
    }

    /// Moves played so far.
    pub fn depth(&self) -> usize {
        self.tree
            .as_ref()
            .map_or(0, |tree| tree.node(self.cursor).get_depth())
    }

    pub fn is_won(&self) -> bool {
        self.current_state().is_won(self.full_containers)
    }

    /// Applies a player pour by locating the matching child of the cursor.
    pub fn make_move(&mut self, action: MoveAction) -> Result<MoveOutcome, SessionError> {
        let tree = self.tree.as_ref().ok_or(SessionError::TreeNotBuilt)?;
        let (from, to) = (action.from_container, action.to_container);

        let current = tree.node(self.cursor).get_state();
        if !current.is_legal_move(&action) {
            return Err(SessionError::InvalidMove { from, to });
        }
        let next = current.apply_move(&action);

        let target = if !self.moved && next == *tree.node(tree.root()).get_state() {
            tree.root()
        } else {
            tree.find_child(self.cursor, &next)
                .ok_or(SessionError::MoveNotInTree { from, to })?
        };

        debug!("Move {} accepted, cursor {:?} -> {:?}", action, self.cursor, target);
        self.cursor = target;
        self.moved = true;
        Ok(self.outcome())
    }

    /// Plays the first child of the cursor that leads to a win.
    pub fn hint(&mut self) -> Result<Hint, SessionError> {
        let tree = self.tree.as_ref().ok_or(SessionError::TreeNotBuilt)?;
        let child = tree
            .first_solution_child(self.cursor)
            .ok_or(SessionError::NoHintAvailable)?;
        let action = tree
            .node(child)
            .get_action()
            .ok_or(SessionError::NoHintAvailable)?;

        debug!("Hint {} taken, cursor {:?} -> {:?}", action, self.cursor, child);
        self.cursor = child;
        self.moved = true;
        Ok(Hint {
            action,
            outcome: self.outcome(),
        })
    }

    /// States from the cursor to a win along first flagged children. The
    /// cursor does not move.
    pub fn solution_path(&self) -> Result<Vec<GameState>, SessionError> {
        let tree = self.tree()?;
        let path = tree
            .solution_path(self.cursor)
            .ok_or(SessionError::NoSolutionExists)?;
        Ok(path
            .into_iter()
            .map(|id| tree.node(id).get_state().clone())
            .collect())
    }

    /// Every explored state, level by level.
    pub fn tree_states(&self) -> Result<Vec<(usize, &GameState)>, SessionError> {
        let tree = self.tree()?;
        Ok(tree
            .breadth_first()
            .into_iter()
            .map(|id| {
                let node = tree.node(id);
                (node.get_depth(), node.get_state())
            })
            .collect())
    }

    pub fn tree_stats(&self) -> Result<TreeStats, SessionError> {
        Ok(self.tree()?.stats())
    }

    fn outcome(&self) -> MoveOutcome {
        if self.is_won() {
            return MoveOutcome::Won;
        }
        match &self.tree {
            Some(tree) if tree.node(self.cursor).get_first_child().is_none() => {
                MoveOutcome::OutOfMoves
            }
            _ => MoveOutcome::InProgress,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Top-first `A=[a,a,b,b]`, `B=[b,b,a,a]` plus one empty container.
    fn two_color_session(max_depth: usize) -> Session {
        let state = GameState::new_from_repr("BBAA AABB ....").unwrap();
        Session::new(state, 2, max_depth)
    }

    #[test]
    fn test_queries_before_build() {
        let mut session = two_color_session(4);
        assert!(session.tree.is_none());
        assert_eq!(
            session.make_move(MoveAction::new(0, 2)),
            Err(SessionError::TreeNotBuilt)
        );
        assert_eq!(session.hint(), Err(SessionError::TreeNotBuilt));
        assert_eq!(session.solution_path(), Err(SessionError::TreeNotBuilt));
        assert_eq!(session.tree_stats(), Err(SessionError::TreeNotBuilt));
        assert_eq!(session.current_state(), session.initial_state());
    }

    #[test]
    fn test_play_to_win() {
        let mut session = two_color_session(4);
        session.build_tree();

        assert_eq!(session.make_move(MoveAction::new(0, 2)), Ok(MoveOutcome::InProgress));
        assert_eq!(session.make_move(MoveAction::new(1, 0)), Ok(MoveOutcome::InProgress));
        assert_eq!(session.depth(), 2);
        assert_eq!(session.make_move(MoveAction::new(1, 2)), Ok(MoveOutcome::Won));
        assert!(session.is_won());
        assert_eq!(session.depth(), 3);
    }

    #[test]
    fn test_invalid_move_keeps_cursor() {
        let mut session = two_color_session(4);
        session.build_tree();
        let before = session.cursor;

        assert_eq!(
            session.make_move(MoveAction::new(0, 1)),
            Err(SessionError::InvalidMove { from: 0, to: 1 })
        );
        assert_eq!(
            session.make_move(MoveAction::new(2, 0)),
            Err(SessionError::InvalidMove { from: 2, to: 0 })
        );
        assert_eq!(
            session.make_move(MoveAction::new(1, 1)),
            Err(SessionError::InvalidMove { from: 1, to: 1 })
        );
        assert_eq!(
            session.make_move(MoveAction::new(0, 9)),
            Err(SessionError::InvalidMove { from: 0, to: 9 })
        );
        assert_eq!(session.cursor, before);
    }

    #[test]
    fn test_validation_uses_cursor_state() {
        let mut session = two_color_session(4);
        session.build_tree();
        // Illegal at the root, legal once container 0 has been emptied of A.
        assert!(session.make_move(MoveAction::new(1, 0)).is_err());
        session.make_move(MoveAction::new(0, 2)).unwrap();
        assert!(session.make_move(MoveAction::new(1, 0)).is_ok());
    }

    #[test]
    fn test_move_beyond_depth_bound() {
        let mut session = two_color_session(1);
        session.build_tree();
        assert_eq!(
            session.make_move(MoveAction::new(0, 2)),
            Ok(MoveOutcome::OutOfMoves)
        );
        let before = session.cursor;
        assert_eq!(
            session.make_move(MoveAction::new(1, 0)),
            Err(SessionError::MoveNotInTree { from: 1, to: 0 })
        );
        assert_eq!(session.cursor, before);
    }

    #[test]
    fn test_dead_end_inside_depth_bound() {
        let state = GameState::new_from_repr("BCA. CBCA ABA. BC..").unwrap();
        let mut session = Session::new(state, 3, 4);
        session.build_tree();

        // Leaves "BCAA CBCA AB.. BC..": nothing can pour, one move in.
        assert_eq!(
            session.make_move(MoveAction::new(2, 0)),
            Ok(MoveOutcome::OutOfMoves)
        );
        assert_eq!(session.depth(), 1);
        assert!(session.current_state().legal_moves().is_empty());
        assert!(!session.is_won());
    }

    #[test]
    fn test_hint_advances_cursor() {
        let mut session = two_color_session(4);
        session.build_tree();

        let hint = session.hint().unwrap();
        assert_eq!(hint.action, MoveAction::new(0, 2));
        assert_eq!(hint.outcome, MoveOutcome::InProgress);
        assert_eq!(session.depth(), 1);

        session.hint().unwrap();
        let last = session.hint().unwrap();
        assert_eq!(last.outcome, MoveOutcome::Won);
        assert_eq!(session.hint(), Err(SessionError::NoHintAvailable));
    }

    #[test]
    fn test_no_hint_or_solution_outside_bound() {
        let mut session = two_color_session(2);
        session.build_tree();
        assert_eq!(session.hint(), Err(SessionError::NoHintAvailable));
        assert_eq!(session.solution_path(), Err(SessionError::NoSolutionExists));
        assert_eq!(session.depth(), 0);
    }

    #[test]
    fn test_solution_path_is_read_only() {
        let mut session = two_color_session(4);
        session.build_tree();
        session.make_move(MoveAction::new(0, 2)).unwrap();
        let cursor = session.cursor;

        let path = session.solution_path().unwrap();
        assert_eq!(session.cursor, cursor);
        assert_eq!(path.first(), Some(session.current_state()));
        assert!(path.last().unwrap().is_won(2));
        assert_eq!(path.len(), 3);
    }

    #[test]
    fn test_rebuild_resets_cursor() {
        let mut session = two_color_session(4);
        let first = session.build_tree();
        session.make_move(MoveAction::new(0, 2)).unwrap();

        let second = session.build_tree();
        assert_eq!(first, second);
        assert_eq!(session.depth(), 0);
        assert_eq!(session.current_state(), session.initial_state());
        assert_eq!(session.tree_states().unwrap().len(), second.node_count);
    }
}
