use std::collections::BTreeMap;
use std::fmt;

use macroquad::prelude::*;

use crate::error::ParseError;

/// Every container holds exactly this many units.
pub const CONTAINER_CAPACITY: usize = 4;

pub const FLUID_COLORS: [Color; 32] = [
    Color::new(1.0  , 0.0  , 0.0  , 1.0  ), //RED
    Color::new(0.0  , 0.0  , 1.0  , 1.0  ), //BLUE
    Color::new(1.0  , 1.0  , 0.0  , 1.0  ), //YELLOW
    Color::new(0.0  , 0.5  , 0.0  , 1.0  ), //GREEN
    Color::new(0.627, 0.125, 0.941, 1.0  ), //PURPLE
    Color::new(1.0  , 0.647, 0.0  , 1.0  ), //ORANGE
    Color::new(0.0  , 1.0  , 1.0  , 1.0  ), //CYAN
    Color::new(1.0  , 0.0  , 1.0  , 1.0  ), //MAGENTA
    Color::new(0.0  , 1.0  , 0.0  , 1.0  ), //LIME
    Color::new(1.0  , 0.752, 0.796, 1.0  ), //PINK
    Color::new(0.647, 0.164, 0.164, 1.0  ), //BROWN
    Color::new(0.0  , 0.0  , 0.5  , 1.0  ), //NAVY
    Color::new(0.250, 0.878, 0.815, 1.0  ), //TURQUOISE
    Color::new(0.5  , 0.5  , 0.0  , 1.0  ), //OLIVE
    Color::new(0.5  , 0.0  , 0.0  , 1.0  ), //MAROON
    Color::new(0.941, 1.0  , 1.0  , 1.0  ), //AZURE
    Color::new(0.0  , 0.5  , 0.5  , 1.0  ), //TEAL
    Color::new(1.0  , 0.843, 0.0  , 1.0  ), //GOLD
    Color::new(0.75 , 0.75 , 0.75 , 1.0  ), //SILVER
    Color::new(1.0  , 0.498, 0.313, 1.0  ), //CORAL
    Color::new(0.933, 0.509, 0.933, 1.0  ), //VIOLET
    Color::new(0.596, 1.0  , 0.596, 1.0  ), //MINT
    Color::new(0.960, 0.960, 0.862, 1.0  ), //BEIGE
    Color::new(0.980, 0.501, 0.447, 1.0  ), //SALMON
    Color::new(0.956, 0.643, 0.376, 1.0  ), //SANDYBROWN
    Color::new(0.294, 0.0  , 0.509, 1.0  ), //INDIGO
    Color::new(0.862, 0.078, 0.235, 1.0  ), //CRIMSON
    Color::new(0.941, 0.901, 0.549, 1.0  ), //KHAKI
    Color::new(0.866, 0.627, 0.866, 1.0  ), //PLUM
    Color::new(0.823, 0.411, 0.117, 1.0  ), //CHOCOLATE
    Color::new(0.0  , 0.392, 0.0  , 1.0  ), //DARKGREEN
    Color::new(1.0  , 0.549, 0.0  , 1.0  ), //DARKORANGE
];

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum FluidPacket {
    Empty,
    Fluid { color_id: u8 },
}
impl FluidPacket {
    pub fn new(color_id: u8) -> Self {
        FluidPacket::Fluid { color_id }
    }

    /// Parses one slot label. `.` (or nothing) is an empty slot, letters are
    /// colors, anything else is rejected.
    pub fn new_from_repr(repr: &str) -> Option<Self> {
        let s = repr.trim();
        if s.is_empty() || s == "." {
            return Some(FluidPacket::Empty);
        }
        Self::letters_to_color_id(s).map(|color_id| FluidPacket::Fluid { color_id })
    }

    /// Convert a single letter (A-Z) into a 0-based id.
    pub fn letter_to_color_id(ch: char) -> Option<usize> {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        let up = ch.to_ascii_uppercase();
        Some((up as u8 - b'A') as usize)
    }

    /// Convert a letter sequence like "A", "Z", "AA" into a 0-based id.
    /// Uses Excel-style base-26 numbering: A=0, B=1, ..., Z=25, AA=26, AB=27, ...
    fn letters_to_color_id(s: &str) -> Option<u8> {
        let mut acc: usize = 0;
        let mut saw_any = false;

        for ch in s.chars() {
            let digit = Self::letter_to_color_id(ch)?;
            acc = acc
                .checked_mul(26)?
                .checked_add(digit + 1)?;
            saw_any = true;
        }

        if !saw_any {
            return None;
        }

        u8::try_from(acc.checked_sub(1)?).ok()
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, FluidPacket::Empty)
    }
    pub fn get_color_id(&self) -> Option<u8> {
        match self {
            FluidPacket::Fluid { color_id } => Some(*color_id),
            FluidPacket::Empty => None,
        }
    }
    pub fn get_letter_representation(&self) -> String {
        const LETTERS: usize = 26;

        let mut chars = Vec::new();
        let mut id = match self.get_color_id() {
            None => return ".".to_string(),
            Some(id) => id as usize + 1, // 1-based for easier calculation
        };

        while id > 0 {
            let rem = (id - 1) % LETTERS;
            chars.push((b'A' + rem as u8) as char);
            id = (id - 1) / LETTERS;
        }

        chars.iter().rev().collect()
    }
    pub fn get_color(&self) -> Option<Color> {
        self.get_color_id()
            .map(|color_id| FLUID_COLORS[color_id as usize % FLUID_COLORS.len()])
    }
}

/// A fixed-size stack of units. Slots are stored bottom-first; filled slots
/// always form a contiguous prefix, so the top is the last filled slot.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FluidContainer {
    packets: [FluidPacket; CONTAINER_CAPACITY],
}
impl Default for FluidContainer {
    fn default() -> Self {
        Self::new()
    }
}
impl FluidContainer {
    pub fn new() -> Self {
        Self {
            packets: [FluidPacket::Empty; CONTAINER_CAPACITY],
        }
    }

    /// Builds a container from colors listed bottom-first.
    pub fn from_colors(colors: &[u8]) -> Self {
        let mut container = Self::new();
        for &color_id in colors.iter().take(CONTAINER_CAPACITY) {
            container.add_fluid(FluidPacket::new(color_id));
        }
        container
    }

    pub fn new_from_repr(repr: &str, index: usize) -> Result<Self, ParseError> {
        let labels: Vec<String> = if repr.contains(',') {
            repr.split(',').map(|token| token.to_string()).collect()
        } else {
            repr.chars().map(|ch| ch.to_string()).collect()
        };
        if labels.len() != CONTAINER_CAPACITY {
            return Err(ParseError::WrongSlotCount {
                container: index,
                found: labels.len(),
            });
        }

        let mut packets = [FluidPacket::Empty; CONTAINER_CAPACITY];
        let mut seen_empty = false;
        for (slot, label) in packets.iter_mut().zip(&labels) {
            let packet = FluidPacket::new_from_repr(label).ok_or_else(|| {
                ParseError::InvalidLabel {
                    container: index,
                    label: label.clone(),
                }
            })?;
            if packet.is_empty() {
                seen_empty = true;
            } else if seen_empty {
                return Err(ParseError::FloatingFluid { container: index });
            }
            *slot = packet;
        }
        Ok(Self { packets })
    }

    fn add_fluid(&mut self, packet: FluidPacket) -> bool {
        for p in &mut self.packets {
            if p.is_empty() {
                *p = packet;
                return true;
            }
        }
        false
    }

    fn pop_fluid(&mut self) -> Option<FluidPacket> {
        for packet in self.packets.iter_mut().rev() {
            if !packet.is_empty() {
                return Some(std::mem::replace(packet, FluidPacket::Empty));
            }
        }
        None
    }

    pub fn is_full(&self) -> bool {
        self.packets.iter().all(|p| !p.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.packets.iter().all(|p| p.is_empty())
    }

    /// Full, and every unit shares one color.
    pub fn is_complete(&self) -> bool {
        self.is_full() && self.get_top_fluid_depth() == CONTAINER_CAPACITY
    }

    pub fn get_empty_space(&self) -> usize {
        self.packets.iter().filter(|p| p.is_empty()).count()
    }

    pub fn get_filled_amount(&self) -> usize {
        CONTAINER_CAPACITY - self.get_empty_space()
    }

    pub fn get_top_fluid(&self) -> Option<FluidPacket> {
        self.packets.iter().rev().find(|p| !p.is_empty()).copied()
    }

    /// Length of the run of identically colored units at the top.
    pub fn get_top_fluid_depth(&self) -> usize {
        let mut packets = self.packets.iter().rev().skip_while(|p| p.is_empty());
        let Some(top) = packets.next() else {
            return 0;
        };
        1 + packets.take_while(|p| *p == top).count()
    }

    pub fn get_packets(&self) -> &[FluidPacket] {
        &self.packets
    }

    pub fn get_pourable_amount(&self, other: &FluidContainer) -> usize {
        if self.get_top_fluid() != other.get_top_fluid() && !other.is_empty() {
            return 0;
        }
        let depth = self.get_top_fluid_depth();
        let space = other.get_empty_space();
        depth.min(space)
    }

    /// Legal iff this container has a top unit and `other` is empty, or has
    /// room and shows the same color on top.
    pub fn could_pour_into(&self, other: &FluidContainer) -> bool {
        self.get_pourable_amount(other) > 0
    }

    /// Moves the top run into `other` until the run ends or `other` is full.
    fn pour_into(&mut self, other: &mut FluidContainer) -> usize {
        let transfer_amount = self.get_pourable_amount(other);
        for _ in 0..transfer_amount {
            if let Some(packet) = self.pop_fluid() {
                other.add_fluid(packet);
            }
        }
        transfer_amount
    }

    pub fn get_text_representation(&self) -> String {
        let repr: Vec<String> = self
            .packets
            .iter()
            .map(|packet| packet.get_letter_representation())
            .collect();
        let has_multi_char = repr.iter().any(|s| s.len() > 1);
        let separator = if has_multi_char { "," } else { "" };
        repr.join(separator)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct MoveAction {
    pub from_container: usize,
    pub to_container: usize,
}
impl MoveAction {
    pub fn new(from_container: usize, to_container: usize) -> Self {
        Self {
            from_container,
            to_container,
        }
    }
}
impl fmt::Display for MoveAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from_container, self.to_container)
    }
}

/// One puzzle configuration: the containers in their player-visible order.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GameState {
    pub fluid_containers: Vec<FluidContainer>,
}

impl GameState {
    pub fn new(fluid_containers: Vec<FluidContainer>) -> Self {
        Self { fluid_containers }
    }

    pub fn get_containers(&self) -> &[FluidContainer] {
        &self.fluid_containers
    }

    pub fn container_count(&self) -> usize {
        self.fluid_containers.len()
    }

    pub fn is_legal_move(&self, action: &MoveAction) -> bool {
        let (from, to) = (action.from_container, action.to_container);
        if from == to {
            return false;
        }
        match (self.fluid_containers.get(from), self.fluid_containers.get(to)) {
            (Some(source), Some(target)) => source.could_pour_into(target),
            _ => false,
        }
    }

    /// Every legal pour, in a fixed order: ascending sources pouring into
    /// higher indices (ascending), then descending sources pouring into lower
    /// indices (descending). Tree children follow this order.
    pub fn legal_moves(&self) -> Vec<MoveAction> {
        let count = self.container_count();
        let upward = (0..count).flat_map(|from| (from + 1..count).map(move |to| (from, to)));
        let downward = (0..count)
            .rev()
            .flat_map(|from| (0..from).rev().map(move |to| (from, to)));

        upward
            .chain(downward)
            .filter(|&(from, to)| {
                self.fluid_containers[from].could_pour_into(&self.fluid_containers[to])
            })
            .map(|(from, to)| MoveAction::new(from, to))
            .collect()
    }

    /// Returns the state after `action`. The move must already have passed
    /// [`GameState::is_legal_move`] against this state.
    pub fn apply_move(&self, action: &MoveAction) -> GameState {
        let mut next = self.clone();
        let mut source = next.fluid_containers[action.from_container];
        let mut target = next.fluid_containers[action.to_container];
        source.pour_into(&mut target);
        next.fluid_containers[action.from_container] = source;
        next.fluid_containers[action.to_container] = target;
        next
    }

    pub fn complete_container_count(&self) -> usize {
        self.fluid_containers
            .iter()
            .filter(|c| c.is_complete())
            .count()
    }

    /// Won once `full_containers` containers are complete. The count is the
    /// number of filled containers when the session started, not the current
    /// number of non-empty ones.
    pub fn is_won(&self, full_containers: usize) -> bool {
        self.complete_container_count() == full_containers
    }

    /// Unit count per color, ordered by color id.
    pub fn get_available_colors_with_count(&self) -> Vec<(u8, usize)> {
        let mut counts: BTreeMap<u8, usize> = BTreeMap::new();
        for container in &self.fluid_containers {
            for packet in container.get_packets() {
                if let Some(color_id) = packet.get_color_id() {
                    *counts.entry(color_id).or_insert(0) += 1;
                }
            }
        }
        counts.into_iter().collect()
    }

    pub fn total_units(&self) -> usize {
        self.fluid_containers
            .iter()
            .map(|c| c.get_filled_amount())
            .sum()
    }

    /// Number of containers the fluid fills once sorted.
    pub fn filled_container_equivalent(&self) -> usize {
        self.total_units() / CONTAINER_CAPACITY
    }

    pub fn get_text_representation(&self) -> String {
        self.fluid_containers
            .iter()
            .map(|c| c.get_text_representation())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn new_from_repr(repr: &str) -> Result<Self, ParseError> {
        let fluid_containers = repr
            .split_whitespace()
            .enumerate()
            .map(|(index, token)| FluidContainer::new_from_repr(token, index))
            .collect::<Result<Vec<_>, _>>()?;
        if fluid_containers.is_empty() {
            return Err(ParseError::NoContainers);
        }

        let state = GameState::new(fluid_containers);
        if let Some((color_id, count)) = state
            .get_available_colors_with_count()
            .into_iter()
            .find(|&(_, count)| count != CONTAINER_CAPACITY)
        {
            return Err(ParseError::UnbalancedColor {
                label: FluidPacket::new(color_id).get_letter_representation(),
                count,
            });
        }
        Ok(state)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ControlAction {
    SelectContainer(usize),
    Deselect,
    PourInto(usize, usize),
    NewPuzzle,
    BuildTree,
    Hint,
    ShowSolution,
    StepSolution(isize),
    CloseSolution,
    ShowTree,
    CopyState,
    PasteState,
}
#[derive(Clone, Debug, PartialEq)]
pub struct Button {
    label: String,
    action: ControlAction,
    color: Color,
}
impl Button {
    pub fn new(label: &str, action: ControlAction, color: Color) -> Self {
        Self {
            label: label.to_string(),
            action,
            color,
        }
    }
    pub fn get_action(&self) -> ControlAction {
        self.action
    }
    pub fn get_label(&self) -> &str {
        &self.label
    }
    pub fn get_color(&self) -> Color {
        self.color
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HitItem {
    Button { function: ControlAction },
    Container { index: usize },
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct HitRecord {
    pub rect: Rect,
    pub item: HitItem,
}

#[derive(Default)]
pub struct HitTestRegistry {
    items: Vec<HitRecord>,
}

impl HitTestRegistry {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn push(&mut self, rect: Rect, item: HitItem) {
        self.items.push(HitRecord { rect, item });
    }

    /// Returns the topmost item under the point.
    pub fn hit_test(&self, x: f32, y: f32) -> Option<&HitRecord> {
        self.items
            .iter()
            .rev() // last drawn wins
            .find(|r| r.rect.contains(vec2(x, y)))
    }
}
