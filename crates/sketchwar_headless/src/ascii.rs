//! ASCII battlefield renderer.
//!
//! Draws a [`BattlefieldSnapshot`] as text for terminal review: one character
//! per cell, terrain as symbols, units as their kind glyph (lowercase for the
//! left side, uppercase for the right), and a base health footer.

use std::io::Write;

use sketchwar_core::effects::EffectKind;
use sketchwar_core::math::Cell;
use sketchwar_core::snapshot::{BattlefieldSnapshot, RenderError, Renderer, UnitView};
use sketchwar_core::terrain::Terrain;
use sketchwar_core::unit::Side;
use sketchwar_core::unit_kind::UnitKind;

/// ASCII visualization configuration.
#[derive(Debug, Clone)]
pub struct AsciiConfig {
    /// Use colored output (ANSI).
    pub use_color: bool,
    /// Append the glyph legend.
    pub show_legend: bool,
    /// Draw only every Nth frame handed to the renderer.
    pub every: u64,
}

impl Default for AsciiConfig {
    fn default() -> Self {
        Self {
            use_color: true,
            show_legend: false,
            every: 1,
        }
    }
}

impl AsciiConfig {
    /// Colorless, every frame, no legend. Stable output for files and tests.
    #[must_use]
    pub fn plain() -> Self {
        Self {
            use_color: false,
            show_legend: false,
            every: 1,
        }
    }
}

/// ANSI color codes.
mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";

    pub const BLUE: &str = "\x1b[34m";
    pub const RED: &str = "\x1b[31m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const GREEN: &str = "\x1b[32m";
    pub const GRAY: &str = "\x1b[90m";
}

/// Symbol for an empty cell of `terrain`.
#[must_use]
pub const fn terrain_symbol(terrain: Terrain) -> char {
    match terrain {
        Terrain::Plain => '.',
        Terrain::Forest => '%',
        Terrain::Mountain => '^',
        Terrain::Water => '~',
    }
}

/// Glyph for a unit: the kind's glyph, lowercased for the left side.
#[must_use]
pub fn unit_char(kind: UnitKind, side: Side) -> char {
    let glyph = kind.glyph();
    match side {
        Side::Left => glyph.to_ascii_lowercase(),
        Side::Right => glyph.to_ascii_uppercase(),
    }
}

const fn side_color(side: Side) -> &'static str {
    match side {
        Side::Left => colors::BLUE,
        Side::Right => colors::YELLOW,
    }
}

fn health_color(fraction: f64) -> &'static str {
    if fraction > 0.66 {
        colors::GREEN
    } else if fraction > 0.33 {
        colors::YELLOW
    } else {
        colors::RED
    }
}

/// 24-bit ANSI foreground for the terrain's fallback color; gray if the
/// color is not `#rrggbb`.
fn terrain_color(terrain: Terrain) -> String {
    let hex = terrain.fallback_color().trim_start_matches('#');
    let channel = |at: usize| {
        hex.get(at..at + 2)
            .and_then(|pair| u8::from_str_radix(pair, 16).ok())
    };
    match (hex.len(), channel(0), channel(2), channel(4)) {
        (6, Some(r), Some(g), Some(b)) => format!("\x1b[38;2;{r};{g};{b}m"),
        _ => colors::GRAY.to_string(),
    }
}

fn paint(output: &mut String, ch: char, color: &str, config: &AsciiConfig) {
    if config.use_color && !color.is_empty() {
        output.push_str(color);
        output.push(ch);
        output.push_str(colors::RESET);
    } else {
        output.push(ch);
    }
}

fn draw_unit(output: &mut String, unit: &UnitView, config: &AsciiConfig) {
    let ch = unit_char(unit.kind, unit.side);
    let fraction = unit.health_fraction();
    let color = if fraction < 1.0 {
        health_color(fraction)
    } else {
        side_color(unit.side)
    };
    paint(output, ch, color, config);
}

fn base_line(snapshot: &BattlefieldSnapshot, side: Side) -> String {
    match snapshot.base(side) {
        Some(base) => format!(
            "{side} base {:.0}/{:.0} ({:.0}%)",
            base.hp.max(0.0),
            base.max_hp,
            base.health_fraction() * 100.0
        ),
        None => format!("{side} base missing"),
    }
}

/// Render a snapshot as ASCII art.
#[must_use]
pub fn render_ascii(snapshot: &BattlefieldSnapshot, config: &AsciiConfig) -> String {
    let width = snapshot.width as usize;
    let mut output = String::new();

    let (bold, reset) = if config.use_color {
        (colors::BOLD, colors::RESET)
    } else {
        ("", "")
    };
    output.push_str(&format!(
        "{bold}== tick {} | {} ms =={reset}\n",
        snapshot.tick, snapshot.now_ms
    ));

    let border = format!("+{}+\n", "-".repeat(width));
    output.push_str(&border);

    // Units arrive in row-major order, so one cursor walks them alongside
    // the cells.
    let mut units = snapshot.units.iter().peekable();
    for y in 0..snapshot.height as i32 {
        output.push('|');
        for x in 0..snapshot.width as i32 {
            let cell = Cell::new(x, y);
            match units.next_if(|unit| unit.cell == cell) {
                Some(unit) => draw_unit(&mut output, unit, config),
                None => {
                    let terrain = snapshot.terrain_at(cell).unwrap_or_default();
                    paint(
                        &mut output,
                        terrain_symbol(terrain),
                        &terrain_color(terrain),
                        config,
                    );
                }
            }
        }
        output.push_str("|\n");
    }
    output.push_str(&border);

    output.push_str(&format!(
        "{} | {}\n",
        base_line(snapshot, Side::Left),
        base_line(snapshot, Side::Right)
    ));

    let attacks = snapshot
        .effects
        .iter()
        .filter(|effect| effect.kind == EffectKind::Attack)
        .count();
    let heals = snapshot.effects.len() - attacks;
    if attacks + heals > 0 {
        output.push_str(&format!("effects: {attacks} attack, {heals} heal\n"));
    }

    if let Some(winner) = snapshot.winner {
        output.push_str(&format!("{bold}{winner} wins{reset}\n"));
    }

    if config.show_legend {
        output.push_str(&legend());
    }

    output
}

/// Glyph and terrain key. Lowercase is the left side, uppercase the right.
#[must_use]
pub fn legend() -> String {
    let units: Vec<String> = UnitKind::ALL
        .iter()
        .map(|kind| format!("{}={}", kind.glyph(), kind.label()))
        .collect();
    let terrain: Vec<String> = [
        Terrain::Plain,
        Terrain::Forest,
        Terrain::Mountain,
        Terrain::Water,
    ]
    .iter()
    .map(|terrain| format!("{}={terrain:?}", terrain_symbol(*terrain)).to_lowercase())
    .collect();
    format!(
        "units: {} (lower=left UPPER=right)\nterrain: {}\n",
        units.join(" "),
        terrain.join(" ")
    )
}

/// Renderer that writes ASCII frames to any writer.
#[derive(Debug)]
pub struct AsciiRenderer<W: Write> {
    out: W,
    config: AsciiConfig,
    frames_seen: u64,
}

impl<W: Write> AsciiRenderer<W> {
    /// Write frames to `out`.
    pub fn new(out: W, config: AsciiConfig) -> Self {
        Self {
            out,
            config,
            frames_seen: 0,
        }
    }

    /// Frames handed to the renderer so far, drawn or skipped.
    pub const fn frames_seen(&self) -> u64 {
        self.frames_seen
    }

    /// Recover the writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Renderer for AsciiRenderer<W> {
    fn render(&mut self, snapshot: &BattlefieldSnapshot) -> Result<(), RenderError> {
        let frame = self.frames_seen;
        self.frames_seen += 1;
        if frame % self.config.every.max(1) != 0 {
            return Ok(());
        }

        let text = render_ascii(snapshot, &self.config);
        self.out
            .write_all(text.as_bytes())
            .and_then(|()| self.out.flush())
            .map_err(|e| RenderError::Surface(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sketchwar_test_utils::fixtures::open_battlefield;

    fn line(output: &str, index: usize) -> &str {
        output.lines().nth(index).unwrap()
    }

    #[test]
    fn test_unit_char() {
        assert_eq!(unit_char(UnitKind::Soldier, Side::Left), 's');
        assert_eq!(unit_char(UnitKind::Soldier, Side::Right), 'S');
        assert_eq!(unit_char(UnitKind::Base, Side::Left), '#');
    }

    #[test]
    fn test_terrain_symbols_never_collide_with_glyphs() {
        for terrain in [
            Terrain::Plain,
            Terrain::Forest,
            Terrain::Mountain,
            Terrain::Water,
        ] {
            for kind in UnitKind::ALL {
                for side in Side::BOTH {
                    assert_ne!(terrain_symbol(terrain), unit_char(kind, side));
                }
            }
        }
    }

    #[test]
    fn test_render_open_board() {
        let mut field = open_battlefield();
        field.place_unit(UnitKind::Soldier, Side::Left).unwrap();
        field.place_unit(UnitKind::Tank, Side::Right).unwrap();

        let output = render_ascii(&field.snapshot(), &AsciiConfig::plain());
        // Header and border come first, so board row 10 is line 12.
        let row = line(&output, 12);
        assert_eq!(row.len(), 32);
        assert!(row.starts_with("|#s...."));
        assert!(row.ends_with("....T#|"));
        assert_eq!(line(&output, 2), format!("|{}|", ".".repeat(30)));
        assert!(output.contains("left base 10000/10000 (100%)"));
        assert!(output.contains("right base 10000/10000 (100%)"));
        assert!(!output.contains("wins"));
        assert!(!output.contains('\x1b'));
    }

    #[test]
    fn test_terrain_colors_come_from_fallback_palette() {
        assert_eq!(terrain_color(Terrain::Water), "\x1b[38;2;65;105;225m");
        assert_eq!(terrain_color(Terrain::Plain), "\x1b[38;2;144;238;144m");

        let mut field = open_battlefield();
        assert!(field.set_terrain(Cell::new(3, 0), Terrain::Water));
        let output = render_ascii(&field.snapshot(), &AsciiConfig::default());
        assert!(output.contains("\x1b[38;2;65;105;225m~\x1b[0m"));
    }

    #[test]
    fn test_render_shows_water() {
        let mut field = open_battlefield();
        assert!(field.set_terrain(Cell::new(3, 0), Terrain::Water));
        let output = render_ascii(&field.snapshot(), &AsciiConfig::plain());
        assert!(line(&output, 2).starts_with("|...~."));
    }

    #[test]
    fn test_legend_lists_every_kind() {
        let text = legend();
        for kind in UnitKind::ALL {
            assert!(text.contains(kind.label()));
        }
        assert!(text.contains("~=water"));
    }

    #[test]
    fn test_renderer_skips_frames() {
        let field = open_battlefield();
        let snapshot = field.snapshot();
        let config = AsciiConfig {
            every: 2,
            ..AsciiConfig::plain()
        };
        let mut renderer = AsciiRenderer::new(Vec::new(), config);
        for _ in 0..3 {
            renderer.render(&snapshot).unwrap();
        }
        assert_eq!(renderer.frames_seen(), 3);
        let text = String::from_utf8(renderer.into_inner()).unwrap();
        assert_eq!(text.matches("== tick").count(), 2);
    }
}
