use std::{
    collections::HashMap,
    sync::Mutex,
};

use macroquad::prelude::*;
use crate::model::{Button, FluidContainer, FluidPacket, HitItem, HitTestRegistry};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Success,
    Error,
}

/// One line of feedback shown under the containers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusLine {
    pub text: String,
    pub kind: StatusKind,
}
impl StatusLine {
    pub fn info(text: impl Into<String>) -> Self {
        Self { text: text.into(), kind: StatusKind::Info }
    }
    pub fn success(text: impl Into<String>) -> Self {
        Self { text: text.into(), kind: StatusKind::Success }
    }
    pub fn error(text: impl Into<String>) -> Self {
        Self { text: text.into(), kind: StatusKind::Error }
    }
    fn color(&self) -> Color {
        match self.kind {
            StatusKind::Info => WHITE,
            StatusKind::Success => GREEN,
            StatusKind::Error => RED,
        }
    }
}

#[derive(Hash, PartialEq, Eq, Clone, Debug)]
struct TextCacheKey {
    text: String,
    w_px: u16,
    h_px: u16,
}
type TextMaxSize = (f32, f32, f32);
pub struct CachedTextSizer {
    final_size_cache: Mutex<HashMap<TextCacheKey, TextMaxSize>>,
    unscaled_size_cache: Mutex<HashMap<String, (f32, f32)>>,
}

impl CachedTextSizer {
    pub fn new() -> Self {
        Self {
            final_size_cache: Mutex::new(HashMap::new()),
            unscaled_size_cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn get_text_max_size(&self, text: &str, rect_width: f32, rect_height: f32) -> TextMaxSize {
        let w_px = rect_width.round().clamp(0.0, u16::MAX as f32) as u16;
        let h_px = rect_height.round().clamp(0.0, u16::MAX as f32) as u16;

        let key = TextCacheKey {
            text: text.to_string(),
            w_px,
            h_px,
        };

        if let Ok(cache) = self.final_size_cache.lock()
            && let Some(cached_size) = cache.get(&key)
        {
            return *cached_size;
        }

        let text_size = self.measure(text, rect_width, rect_height);
        if let Ok(mut cache) = self.final_size_cache.lock() {
            cache.insert(key, text_size);
        }
        text_size
    }

    fn measure(&self, text: &str, rect_width: f32, rect_height: f32) -> TextMaxSize {
        let reference_size = 100u16;

        let (size_x, size_y) = if let Ok(cache) = self.unscaled_size_cache.lock()
            && let Some(dimensions) = cache.get(text)
        {
            (dimensions.0, dimensions.1)
        }
        else {
            let dimensions = measure_text(text, None, reference_size, 1.0);
            if let Ok(mut cache) = self.unscaled_size_cache.lock() {
                cache.insert(text.to_string(), (dimensions.width, dimensions.height));
            }
            (dimensions.width, dimensions.height)
        };
        if size_x <= 0.0 || size_y <= 0.0 {
            return (0.0, 0.0, 0.0);
        }
        let scale = (rect_width / size_x).min(rect_height / size_y);
        let optimal_size = reference_size as f32 * scale;
        let offset_x = (rect_width - size_x * scale) / 2.0;
        // draw_text positions the baseline, so shift down by the text height.
        let offset_y = (rect_height + size_y * scale) / 2.0;
        (optimal_size, offset_x, offset_y)
    }
}

pub struct Renderer {
    cached_text_sizer: CachedTextSizer,
    hit_test: HitTestRegistry,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
}
impl Renderer {
    pub fn new() -> Self {
        Self {
            cached_text_sizer: CachedTextSizer::new(),
            hit_test: HitTestRegistry::new(),
            x: 0.0,
            y: 0.0,
            width: 800.0,
            height: 600.0,
        }
    }

    pub fn get_hit_test_registry(&self) -> &HitTestRegistry {
        &self.hit_test
    }

    pub fn set_viewport(&mut self, x: f32, y: f32, width: f32, height: f32) -> bool {
        if self.x == x && self.y == y && self.width == width && self.height == height {
            return false;
        }
        self.x = x;
        self.y = y;
        self.width = width;
        self.height = height;
        true
    }

    pub fn autoset_viewport(&mut self) -> bool {
        let (screen_w, screen_h) = (screen_width(), screen_height());
        self.set_viewport(0.0, 0.0, screen_w, screen_h)
    }

    pub fn render_game(
        &mut self,
        containers: &[&FluidContainer],
        buttons: &[&Button],
        selected_container: Option<usize>,
        status: &StatusLine,
    ) {
        // New frame: reset hit-test registry.
        self.hit_test.clear();

        clear_background(BLACK);
        let area_padding = 10.0;
        let button_area_height = self.height * 0.1;
        let status_area_height = self.height * 0.06;
        let container_area_height = self.height - button_area_height - status_area_height - 2.0 * area_padding;
        self.render_button_lineup(
            buttons,
            Rect::new(self.x, self.y, self.width, button_area_height),
        );
        self.render_container_grid(
            containers,
            selected_container,
            6,
            Rect::new(
                self.x,
                self.y + button_area_height + area_padding,
                self.width,
                container_area_height,
            ),
        );
        self.render_text(
            &status.text,
            Rect::new(
                self.x,
                self.y + button_area_height + container_area_height + 2.0 * area_padding,
                self.width,
                status_area_height,
            ),
            status.color(),
        );
    }

    pub fn render_text(
        &self,
        text: &str,
        rect: Rect,
        color: Color,
    ) {
        let (optimal_size, x, y) = self
            .cached_text_sizer
            .get_text_max_size(text, rect.w, rect.h);
        if optimal_size < 1.0 {
            return;
        }
        draw_text(text, rect.x + x, rect.y + y, optimal_size, color);
    }
    pub fn render_packet(
        &self,
        packet: &FluidPacket,
        rect: Rect,
    ) {
        match packet.get_color() {
            None => {
                draw_rectangle_lines(rect.x, rect.y, rect.w, rect.h, 2.0, DARKGRAY);
            }
            Some(color) => {
                draw_rectangle(rect.x, rect.y, rect.w, rect.h, color);
                draw_rectangle_lines(rect.x, rect.y, rect.w, rect.h, 2.0, BLACK);
                self.render_text(
                    &packet.get_letter_representation(),
                    Rect::new(rect.x + rect.w * 0.3, rect.y + rect.h * 0.2, rect.w * 0.4, rect.h * 0.6),
                    BLACK,
                );
            }
        }
    }
    pub fn render_container(
        &mut self,
        container: &FluidContainer,
        container_index: usize,
        selected: bool,
        rect: Rect,
    ) {
        self.hit_test.push(
            rect,
            HitItem::Container {
                index: container_index,
            },
        );

        let label_height = rect.h * 0.1;
        let body = Rect::new(rect.x, rect.y, rect.w, rect.h - label_height);
        let packets = container.get_packets();
        let packet_height = body.h / packets.len() as f32;
        for (i, packet) in packets.iter().enumerate() {
            let packet_y = body.y + body.h - (i as f32 + 1.0) * packet_height;
            self.render_packet(
                packet,
                Rect::new(body.x, packet_y, body.w, packet_height),
            );
        }
        draw_rectangle_lines(body.x, body.y, body.w, body.h, 3.0, GRAY);
        if selected {
            draw_rectangle_lines(body.x, body.y, body.w, body.h, 4.0, WHITE);
        }
        self.render_text(
            &container_index.to_string(),
            Rect::new(rect.x, body.y + body.h, rect.w, label_height),
            LIGHTGRAY,
        );
    }
    /// Lays bottles out row by row, at most `max_columns` per row. Every
    /// bottle gets the same cell so a short last row stays aligned.
    pub fn render_container_grid(
        &mut self,
        containers: &[&FluidContainer],
        selected: Option<usize>,
        max_columns: usize,
        rect: Rect,
    ) {
        for (index, container) in containers.iter().enumerate() {
            let cell = grid_cell(index, containers.len(), max_columns, rect);
            self.render_container(container, index, Some(index) == selected, cell);
        }
    }
    pub fn render_button(
        &mut self,
        button: &Button,
        rect: Rect,
    ) {
        self.hit_test.push(rect, HitItem::Button { function: button.get_action() });

        draw_rectangle(rect.x, rect.y, rect.w, rect.h, button.get_color());
        draw_rectangle_lines(rect.x, rect.y, rect.w, rect.h, 2.0, BLACK);
        self.render_text(
            button.get_label(),
            Rect::new(rect.x + rect.w * 0.1, rect.y + rect.h * 0.2, rect.w * 0.8, rect.h * 0.6),
            WHITE,
        );
    }
    pub fn render_button_lineup(
        &mut self,
        buttons: &[&Button],
        rect: Rect,
    ) {
        let button_count = buttons.len() as f32;
        let spacing = 10.0;
        let total_spacing = spacing * (button_count - 1.0);
        let button_width = (rect.w - total_spacing) / button_count;
        for (i, button) in buttons.iter().enumerate() {
            let button_x = rect.x + i as f32 * (button_width + spacing);
            self.render_button(
                button,
                Rect::new(button_x, rect.y, button_width, rect.h),
            );
        }
    }
}

const GRID_SPACING: f32 = 10.0;

/// Cell of bottle `index` when `count` bottles share `rect`.
fn grid_cell(index: usize, count: usize, max_columns: usize, rect: Rect) -> Rect {
    let columns = count.clamp(1, max_columns.max(1));
    let rows = count.div_ceil(columns).max(1);
    let width = (rect.w - GRID_SPACING * (columns - 1) as f32) / columns as f32;
    let height = (rect.h - GRID_SPACING * (rows - 1) as f32) / rows as f32;
    let (row, column) = (index / columns, index % columns);
    Rect::new(
        rect.x + column as f32 * (width + GRID_SPACING),
        rect.y + row as f32 * (height + GRID_SPACING),
        width,
        height,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_wraps_after_max_columns() {
        let area = Rect::new(0.0, 0.0, 650.0, 410.0);
        // 8 bottles, 6 per row: two rows of 100x200 cells.
        let first = grid_cell(0, 8, 6, area);
        assert_eq!((first.x, first.y, first.w, first.h), (0.0, 0.0, 100.0, 200.0));
        let sixth = grid_cell(5, 8, 6, area);
        assert_eq!((sixth.x, sixth.y), (550.0, 0.0));
        let seventh = grid_cell(6, 8, 6, area);
        assert_eq!((seventh.x, seventh.y), (0.0, 210.0));
        assert_eq!(seventh.w, first.w);
    }

    #[test]
    fn test_single_row_uses_full_width() {
        let area = Rect::new(5.0, 5.0, 320.0, 100.0);
        let cells: Vec<Rect> = (0..3).map(|i| grid_cell(i, 3, 6, area)).collect();
        assert!(cells.iter().all(|cell| cell.y == 5.0 && cell.h == 100.0));
        assert_eq!(cells[0].w, 100.0);
        assert_eq!(cells[2].x + cells[2].w, 325.0);
    }
}
