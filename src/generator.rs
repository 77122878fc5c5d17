use rand::prelude::*;
use rand::rngs::StdRng;

use crate::config::SessionConfig;
use crate::model::{CONTAINER_CAPACITY, FluidContainer, GameState};

/// Shuffles `full_containers` colors, four units each, over that many
/// containers and appends `empty_containers` empty ones.
pub fn generate_puzzle<R: Rng + ?Sized>(
    full_containers: usize,
    empty_containers: usize,
    rng: &mut R,
) -> GameState {
    let mut units: Vec<u8> = (0..full_containers)
        .flat_map(|color_id| std::iter::repeat_n(color_id as u8, CONTAINER_CAPACITY))
        .collect();
    units.shuffle(rng);

    let mut fluid_containers: Vec<FluidContainer> = units
        .chunks(CONTAINER_CAPACITY)
        .map(FluidContainer::from_colors)
        .collect();
    fluid_containers.extend(std::iter::repeat_n(FluidContainer::new(), empty_containers));
    GameState::new(fluid_containers)
}

/// Builds the RNG a session draws its puzzles from.
pub fn rng_from_config(config: &SessionConfig) -> StdRng {
    match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_rng(&mut rand::rng()),
    }
}
