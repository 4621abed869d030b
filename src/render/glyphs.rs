//! 3x5 bitmap font for axis labels and status text.
//!
//! Each glyph is five rows of three bits, most significant bit on the left.
//! Lowercase input is drawn with the uppercase shapes except `k`, which keeps
//! its own shape so "16k" reads like a unit.

use glam::Vec2;

use super::canvas::{Canvas, Ink};

pub const GLYPH_W: u32 = 3;
pub const GLYPH_H: u32 = 5;

/// Horizontal advance in glyph cells (glyph width plus one cell of spacing)
const ADVANCE: u32 = GLYPH_W + 1;

fn glyph(c: char) -> Option<[u8; 5]> {
    let rows = match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b011, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b010, 0b010, 0b010],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'k' => [0b100, 0b101, 0b110, 0b101, 0b101],
        'A' => [0b010, 0b101, 0b111, 0b101, 0b101],
        'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'C' => [0b011, 0b100, 0b100, 0b100, 0b011],
        'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'E' => [0b111, 0b100, 0b110, 0b100, 0b111],
        'F' => [0b111, 0b100, 0b110, 0b100, 0b100],
        'G' => [0b011, 0b100, 0b101, 0b101, 0b011],
        'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'J' => [0b001, 0b001, 0b001, 0b101, 0b010],
        'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'M' => [0b101, 0b111, 0b111, 0b101, 0b101],
        'N' => [0b110, 0b101, 0b101, 0b101, 0b101],
        'O' => [0b010, 0b101, 0b101, 0b101, 0b010],
        'P' => [0b110, 0b101, 0b110, 0b100, 0b100],
        'Q' => [0b010, 0b101, 0b101, 0b110, 0b011],
        'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        'S' => [0b011, 0b100, 0b010, 0b001, 0b110],
        'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'V' => [0b101, 0b101, 0b101, 0b101, 0b010],
        'W' => [0b101, 0b101, 0b111, 0b111, 0b101],
        'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'Y' => [0b101, 0b101, 0b010, 0b010, 0b010],
        'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '/' => [0b001, 0b001, 0b010, 0b100, 0b100],
        ' ' => [0; 5],
        c if c.is_ascii_lowercase() => return glyph(c.to_ascii_uppercase()),
        _ => return None,
    };
    Some(rows)
}

/// Rendered width in pixels at `cell` pixels per glyph cell
pub fn text_width(text: &str, cell: f32) -> f32 {
    let n = text.chars().count() as u32;
    if n == 0 {
        return 0.0;
    }
    (n * ADVANCE - 1) as f32 * cell
}

/// Rendered height in pixels at `cell` pixels per glyph cell
pub fn text_height(cell: f32) -> f32 {
    GLYPH_H as f32 * cell
}

/// Draw `text` with its top-left corner at `origin`. Unknown characters
/// render as blanks.
pub fn draw_text(canvas: &mut dyn Canvas, origin: Vec2, text: &str, cell: f32, ink: Ink) {
    if ink.is_invisible() || cell.is_nan() || cell <= 0.0 {
        return;
    }
    let cell_px = cell.max(1.0);
    for (i, c) in text.chars().enumerate() {
        let Some(rows) = glyph(c) else {
            continue;
        };
        let gx = origin.x + (i as u32 * ADVANCE) as f32 * cell;
        for (row, bits) in rows.iter().enumerate() {
            // Merge horizontal runs into one rect
            let mut col = 0;
            while col < GLYPH_W {
                if bits & (0b100 >> col) == 0 {
                    col += 1;
                    continue;
                }
                let start = col;
                while col < GLYPH_W && bits & (0b100 >> col) != 0 {
                    col += 1;
                }
                canvas.fill_rect(
                    gx + start as f32 * cell,
                    origin.y + row as f32 * cell,
                    (col - start) as f32 * cell_px,
                    cell_px,
                    ink,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::canvas::{DrawOp, RecordingCanvas};

    #[test]
    fn test_text_width() {
        assert_eq!(text_width("", 2.0), 0.0);
        assert_eq!(text_width("1", 2.0), 6.0);
        assert_eq!(text_width("16k", 1.0), 11.0);
    }

    #[test]
    fn test_all_label_characters_have_glyphs() {
        for c in "0123456789k. SPECTRUM OFFLINE PAUSED 1:23".chars() {
            assert!(glyph(c).is_some(), "missing glyph {:?}", c);
        }
    }

    #[test]
    fn test_runs_are_merged() {
        let mut canvas = RecordingCanvas::new(32, 32);
        // '-' is a single three-cell run
        draw_text(&mut canvas, Vec2::ZERO, "-", 2.0, Ink::green(1.0));
        assert_eq!(canvas.ops.len(), 1);
        match &canvas.ops[0] {
            DrawOp::FillRect { x, y, w, h, .. } => {
                assert_eq!((*x, *y, *w, *h), (0.0, 4.0, 6.0, 2.0));
            }
            op => panic!("unexpected op {:?}", op),
        }
    }

    #[test]
    fn test_invisible_ink_draws_nothing() {
        let mut canvas = RecordingCanvas::new(32, 32);
        draw_text(&mut canvas, Vec2::ZERO, "888", 1.0, Ink::green(0.0));
        assert!(canvas.ops.is_empty());
    }
}
