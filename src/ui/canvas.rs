//! Scene painter
//!
//! [`Canvas`] is a ratatui widget that paints a [`Scene`] (plus the animation overlay)
//! into a buffer, scrolled by an offset. Frames and array rows use box-drawing
//! characters; arrows are orthogonal lines whose crossings are merged into junction
//! glyphs, with a head at the last point.

use crate::animation::{AnimatedNode, TweenTarget};
use crate::diagram::{ElementKey, Point, Scene, SceneNode, Shape};
use ratatui::buffer::Buffer;
use ratatui::layout::Rect as Area;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::Widget;
use rustc_hash::{FxHashMap, FxHashSet};

const UP: u8 = 1;
const DOWN: u8 = 2;
const LEFT: u8 = 4;
const RIGHT: u8 = 8;

/// Widget painting a scene scrolled by `offset`
pub struct Canvas<'a> {
    scene: &'a Scene,
    overlay: &'a [(TweenTarget, AnimatedNode)],
    offset: Point,
    highlight: Option<(ElementKey, Color)>,
}

impl<'a> Canvas<'a> {
    pub fn new(scene: &'a Scene) -> Self {
        Canvas {
            scene,
            overlay: &[],
            offset: Point::default(),
            highlight: None,
        }
    }

    pub fn overlay(mut self, overlay: &'a [(TweenTarget, AnimatedNode)]) -> Self {
        self.overlay = overlay;
        self
    }

    pub fn offset(mut self, offset: Point) -> Self {
        self.offset = offset;
        self
    }

    pub fn highlight(mut self, key: Option<ElementKey>, color: Color) -> Self {
        self.highlight = key.map(|k| (k, color));
        self
    }
}

impl Widget for Canvas<'_> {
    fn render(self, area: Area, buf: &mut Buffer) {
        buf.set_style(area, Style::default().bg(self.scene.background));

        let mut pen = Pen {
            buf,
            area,
            offset: self.offset,
            arms: FxHashMap::default(),
        };

        let animated: FxHashSet<ElementKey> = self
            .overlay
            .iter()
            .filter(|(target, _)| !target.ghost)
            .map(|(target, _)| target.key)
            .collect();

        // Static nodes, minus those currently driven by a tween
        let mut drawn: Vec<(SceneNode, f32)> = self
            .scene
            .nodes
            .iter()
            .filter(|n| !animated.contains(&n.key))
            .map(|n| (n.clone(), 1.0))
            .collect();
        drawn.extend(self.overlay.iter().map(|(_, animated)| {
            let at = Point::new(animated.pose.rect.x, animated.pose.rect.y);
            let node = SceneNode {
                shape: animated.node.shape.moved_to(at),
                ..animated.node.clone()
            };
            (node, animated.pose.opacity)
        }));

        let style_for = |node: &SceneNode, opacity: f32| -> Option<Style> {
            if opacity < 0.15 {
                return None;
            }
            let mut style = node.style;
            if opacity < 0.6 {
                style = style.add_modifier(Modifier::DIM);
            }
            if let Some((key, color)) = self.highlight {
                if key == node.key {
                    style = style.bg(color);
                }
            }
            Some(style)
        };

        // Boxes first, then arrows, then text and heads on top
        for (node, opacity) in &drawn {
            let Some(style) = style_for(node, *opacity) else {
                continue;
            };
            match &node.shape {
                Shape::Box { rect } => pen.frame(rect.x, rect.y, rect.width, rect.height, style),
                Shape::Row {
                    rect,
                    cells,
                    cell_width,
                    pair,
                } => pen.row(*rect, *cells, *cell_width, *pair, style),
                _ => {}
            }
        }

        let mut heads = Vec::new();
        let mut arrow_style = None;
        for (node, opacity) in &drawn {
            if let Shape::Arrow { points } = &node.shape {
                let Some(style) = style_for(node, *opacity) else {
                    continue;
                };
                arrow_style.get_or_insert(style);
                if let Some(head) = pen.trace(points) {
                    heads.push((head, style));
                }
            }
        }
        if let Some(style) = arrow_style {
            pen.flush_arms(style);
        }

        for (node, opacity) in &drawn {
            if let Shape::Text { at, text, max_width } = &node.shape {
                if let Some(style) = style_for(node, *opacity) {
                    pen.text(*at, text, *max_width, style);
                }
            }
        }

        for ((point, glyph), style) in heads {
            pen.put(point.x, point.y, glyph, style);
        }
    }
}

struct Pen<'b> {
    buf: &'b mut Buffer,
    area: Area,
    offset: Point,
    arms: FxHashMap<(i32, i32), u8>,
}

impl Pen<'_> {
    fn put(&mut self, x: i32, y: i32, symbol: &str, style: Style) {
        let sx = x - self.offset.x;
        let sy = y - self.offset.y;
        if sx < 0 || sy < 0 || sx >= self.area.width as i32 || sy >= self.area.height as i32 {
            return;
        }
        let position = (self.area.x + sx as u16, self.area.y + sy as u16);
        if let Some(cell) = self.buf.cell_mut(position) {
            cell.set_symbol(symbol);
            cell.set_style(style);
        }
    }

    fn frame(&mut self, x: i32, y: i32, width: i32, height: i32, style: Style) {
        if width < 2 || height < 2 {
            return;
        }
        let (right, bottom) = (x + width - 1, y + height - 1);
        for cx in x + 1..right {
            self.put(cx, y, "─", style);
            self.put(cx, bottom, "─", style);
        }
        for cy in y + 1..bottom {
            self.put(x, cy, "│", style);
            self.put(right, cy, "│", style);
        }
        self.put(x, y, "┌", style);
        self.put(right, y, "┐", style);
        self.put(x, bottom, "└", style);
        self.put(right, bottom, "┘", style);
    }

    fn row(&mut self, rect: crate::diagram::Rect, cells: usize, cell_width: i32, pair: bool, style: Style) {
        self.frame(rect.x, rect.y, rect.width, rect.height, style);
        let divider = if pair { "┆" } else { "│" };
        for i in 1..cells as i32 {
            let x = rect.x + i * cell_width;
            self.put(x, rect.y, "┬", style);
            for cy in rect.y + 1..rect.bottom() - 1 {
                self.put(x, cy, divider, style);
            }
            self.put(x, rect.bottom() - 1, "┴", style);
        }
    }

    fn text(&mut self, at: Point, text: &str, max_width: i32, style: Style) {
        let mut buf = [0u8; 4];
        for (i, c) in text.chars().take(max_width.max(0) as usize).enumerate() {
            self.put(at.x + i as i32, at.y, c.encode_utf8(&mut buf), style);
        }
    }

    /// Record the arms of a polyline; returns its head position and glyph
    fn trace(&mut self, points: &[Point]) -> Option<(Point, &'static str)> {
        for pair in points.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let (forward, back) = if a.y == b.y {
                if b.x > a.x { (RIGHT, LEFT) } else { (LEFT, RIGHT) }
            } else if b.y > a.y {
                (DOWN, UP)
            } else {
                (UP, DOWN)
            };
            let (dx, dy) = ((b.x - a.x).signum(), (b.y - a.y).signum());
            let mut p = a;
            while p != b {
                *self.arms.entry((p.x, p.y)).or_default() |= forward;
                p = Point::new(p.x + dx, p.y + dy);
                *self.arms.entry((p.x, p.y)).or_default() |= back;
            }
        }

        let [.., before, last] = points else {
            return None;
        };
        let glyph = if last.y == before.y {
            if last.x > before.x { "▶" } else { "◀" }
        } else if last.y > before.y {
            "▼"
        } else {
            "▲"
        };
        Some((*last, glyph))
    }

    fn flush_arms(&mut self, style: Style) {
        let arms: Vec<_> = self.arms.drain().collect();
        for ((x, y), bits) in arms {
            self.put(x, y, junction(bits), style);
        }
    }
}

fn junction(bits: u8) -> &'static str {
    match bits {
        b if b == UP | DOWN | LEFT | RIGHT => "┼",
        b if b == UP | DOWN | RIGHT => "├",
        b if b == UP | DOWN | LEFT => "┤",
        b if b == LEFT | RIGHT | DOWN => "┬",
        b if b == LEFT | RIGHT | UP => "┴",
        b if b == DOWN | RIGHT => "┌",
        b if b == DOWN | LEFT => "┐",
        b if b == UP | RIGHT => "└",
        b if b == UP | LEFT => "┘",
        b if b & (UP | DOWN) != 0 && b & (LEFT | RIGHT) == 0 => "│",
        _ => "─",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagram::model::FrameId;
    use crate::diagram::Rect;

    fn render(scene: &Scene, width: u16, height: u16) -> Buffer {
        let area = Area::new(0, 0, width, height);
        let mut buf = Buffer::empty(area);
        Canvas::new(scene).render(area, &mut buf);
        buf
    }

    fn row_text(buf: &Buffer, y: u16) -> String {
        (0..buf.area.width)
            .map(|x| buf.cell((x, y)).map_or(" ", |c| c.symbol()).to_string())
            .collect()
    }

    fn scene(nodes: Vec<SceneNode>) -> Scene {
        Scene {
            width: 20,
            height: 6,
            background: Color::Reset,
            nodes,
        }
    }

    #[test]
    fn frame_with_title_and_binding() {
        let scene = scene(vec![
            SceneNode {
                key: ElementKey::Frame(FrameId(0)),
                shape: Shape::Box {
                    rect: Rect::new(0, 1, 8, 3),
                },
                style: Style::default(),
            },
            SceneNode {
                key: ElementKey::FrameTitle(FrameId(0)),
                shape: Shape::Text {
                    at: Point::new(0, 0),
                    text: "global".into(),
                    max_width: 8,
                },
                style: Style::default(),
            },
        ]);
        let buf = render(&scene, 10, 4);
        assert_eq!(row_text(&buf, 0), "global    ");
        assert_eq!(row_text(&buf, 1), "┌──────┐  ");
        assert_eq!(row_text(&buf, 2), "│      │  ");
        assert_eq!(row_text(&buf, 3), "└──────┘  ");
    }

    #[test]
    fn arrows_merge_and_get_heads() {
        let scene = scene(vec![
            SceneNode {
                key: ElementKey::Arrow(0),
                shape: Shape::Arrow {
                    points: vec![Point::new(0, 0), Point::new(4, 0), Point::new(4, 2)],
                },
                style: Style::default(),
            },
            SceneNode {
                key: ElementKey::Arrow(1),
                shape: Shape::Arrow {
                    points: vec![Point::new(2, 0), Point::new(2, 2)],
                },
                style: Style::default(),
            },
        ]);
        let buf = render(&scene, 6, 3);
        assert_eq!(row_text(&buf, 0), "──┬─┐ ");
        assert_eq!(row_text(&buf, 1), "  │ │ ");
        assert_eq!(row_text(&buf, 2), "  ▼ ▼ ");
    }

    #[test]
    fn offset_scrolls_the_scene() {
        let scene = scene(vec![SceneNode {
            key: ElementKey::ShowMore,
            shape: Shape::Text {
                at: Point::new(5, 3),
                text: "more".into(),
                max_width: 4,
            },
            style: Style::default(),
        }]);
        let area = Area::new(0, 0, 6, 2);
        let mut buf = Buffer::empty(area);
        Canvas::new(&scene)
            .offset(Point::new(4, 2))
            .render(area, &mut buf);
        assert_eq!(row_text(&buf, 1), " more ");
    }

    #[test]
    fn faded_overlay_hides_static_node() {
        let node = SceneNode {
            key: ElementKey::StashItem(0),
            shape: Shape::Text {
                at: Point::new(0, 0),
                text: "42".into(),
                max_width: 2,
            },
            style: Style::default(),
        };
        let scene = scene(vec![node.clone()]);
        let overlay = vec![(
            TweenTarget::live(ElementKey::StashItem(0)),
            AnimatedNode {
                node,
                pose: crate::animation::Pose::new(Rect::new(0, 1, 2, 1), 0.0),
            },
        )];
        let area = Area::new(0, 0, 4, 2);
        let mut buf = Buffer::empty(area);
        Canvas::new(&scene).overlay(&overlay).render(area, &mut buf);
        assert_eq!(row_text(&buf, 0), "    ");
        assert_eq!(row_text(&buf, 1), "    ");
    }
}
