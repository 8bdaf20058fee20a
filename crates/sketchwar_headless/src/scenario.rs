//! Scenario loading and scripted runs.
//!
//! A scenario fixes everything that would otherwise vary between runs: the
//! board config, the seed or an explicit list of lane picks, the frame
//! length, and a timeline of placements. Running it drives a
//! [`MatchController`] on a manual clock until a base falls or the frame
//! limit is reached.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sketchwar_core::battlefield::Battlefield;
use sketchwar_core::catalog::UnitCatalog;
use sketchwar_core::clock::ManualClock;
use sketchwar_core::config::{BattlefieldConfig, TerrainSource};
use sketchwar_core::error::GameError;
use sketchwar_core::match_controller::{FrameOutcome, MatchController};
use sketchwar_core::math::Cell;
use sketchwar_core::random::{RandomSource, ScriptedRandom, SeededRandom};
use sketchwar_core::snapshot::{BattlefieldSnapshot, RenderError, Renderer, UnitView};
use sketchwar_core::unit::Side;
use sketchwar_core::unit_kind::UnitKind;
use thiserror::Error;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// Game data (board config or unit catalog) was rejected.
    #[error("Invalid game data: {0}")]
    Game(#[from] GameError),
}

/// Terrain source named on the command line: `plain`, `generated`, or a
/// preset id.
#[must_use]
pub fn parse_terrain(name: &str) -> TerrainSource {
    match name.trim() {
        "plain" => TerrainSource::Plain,
        "generated" | "random" => TerrainSource::Generated,
        id => TerrainSource::Preset(id.to_string()),
    }
}

/// Load a unit catalog from a RON file, or the built-in roster.
pub fn load_catalog(path: Option<&Path>) -> Result<UnitCatalog, ScenarioError> {
    let Some(path) = path else {
        return Ok(UnitCatalog::standard());
    };
    if !path.exists() {
        return Err(ScenarioError::FileNotFound(path.display().to_string()));
    }
    let text = std::fs::read_to_string(path)?;
    let catalog = UnitCatalog::from_ron(&text, &path.display().to_string())?;
    tracing::info!(path = %path.display(), "Unit catalog loaded");
    Ok(catalog)
}

fn default_frame_ms() -> u64 {
    100
}

fn default_max_frames() -> u32 {
    3000
}

/// A complete scripted match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Seed for lane picks and generated terrain.
    #[serde(default)]
    pub seed: u64,
    /// Clock step per frame.
    #[serde(default = "default_frame_ms")]
    pub frame_ms: u64,
    /// Frames to run before giving up on a decision.
    #[serde(default = "default_max_frames")]
    pub max_frames: u32,
    /// Board dimensions, pacing and terrain.
    #[serde(default)]
    pub board: BattlefieldConfig,
    /// Replay these lane picks instead of seeding; exhausted picks choose
    /// the first lane.
    #[serde(default)]
    pub lane_picks: Option<Vec<usize>>,
    /// Placement timeline.
    #[serde(default)]
    pub placements: Vec<TimedPlacement>,
}

/// A unit entering the board at a given time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedPlacement {
    /// Clock time at or after which the unit is placed.
    pub at_ms: u64,
    /// Owning side.
    pub side: Side,
    /// Unit kind.
    pub kind: UnitKind,
    /// Exact cell; the side's next free slot when absent.
    #[serde(default)]
    pub cell: Option<Cell>,
    /// Lane row override; a random lane when absent.
    #[serde(default)]
    pub lane_row: Option<i32>,
}

impl TimedPlacement {
    /// Place `kind` for `side` in the next free slot at `at_ms`.
    #[must_use]
    pub const fn new(at_ms: u64, side: Side, kind: UnitKind) -> Self {
        Self {
            at_ms,
            side,
            kind,
            cell: None,
            lane_row: None,
        }
    }

    /// Place in an exact cell instead.
    #[must_use]
    pub const fn at_cell(mut self, cell: Cell) -> Self {
        self.cell = Some(cell);
        self
    }
}

/// How a scenario run ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    /// Scenario name.
    pub name: String,
    /// Seed used.
    pub seed: u64,
    /// Side whose base survived, if a base fell.
    pub winner: Option<Side>,
    /// Frames run.
    pub frames: u32,
    /// Clock time of the last frame.
    pub ended_ms: u64,
    /// Timeline entries that put a unit on the board.
    pub placed: u32,
    /// Timeline entries the board refused.
    pub rejected: u32,
    /// Everything on the final board, bases included, in row-major order.
    pub survivors: Vec<UnitView>,
}

impl ScenarioOutcome {
    /// Non-base units left standing for `side`.
    #[must_use]
    pub fn survivor_count(&self, side: Side) -> usize {
        self.survivors
            .iter()
            .filter(|unit| unit.side == side && unit.kind != UnitKind::Base)
            .count()
    }
}

/// Keeps the board from the frame a base fell, since the controller resets
/// right after rendering it.
struct FinalBoard<'a> {
    inner: &'a mut dyn Renderer,
    decided: Option<BattlefieldSnapshot>,
}

impl Renderer for FinalBoard<'_> {
    fn render(&mut self, snapshot: &BattlefieldSnapshot) -> Result<(), RenderError> {
        if snapshot.winner.is_some() {
            self.decided = Some(snapshot.clone());
        }
        self.inner.render(snapshot)
    }
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        Ok(scenario)
    }

    /// Serialize as pretty RON.
    pub fn to_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }

    /// Stock skirmish on the default map with staggered mixed armies.
    #[must_use]
    pub fn skirmish() -> Self {
        use UnitKind::*;

        let left = [
            (0, Soldier),
            (1500, Tank),
            (3000, Medic),
            (4500, Cannon),
            (6000, Cavalry),
            (9000, Gundam),
        ];
        let right = [
            (0, Soldier),
            (1500, Plane),
            (3000, Wall),
            (4500, Cavalry),
            (6000, Ufo),
            (9000, Godzilla),
        ];
        let placements = left
            .into_iter()
            .map(|(at, kind)| TimedPlacement::new(at, Side::Left, kind))
            .chain(
                right
                    .into_iter()
                    .map(|(at, kind)| TimedPlacement::new(at, Side::Right, kind)),
            )
            .collect();

        Self {
            name: "skirmish".to_string(),
            description: "Two mixed armies on the stock map".to_string(),
            seed: 0,
            frame_ms: default_frame_ms(),
            max_frames: default_max_frames(),
            board: BattlefieldConfig::default(),
            lane_picks: None,
            placements,
        }
    }

    /// Empty plain board, both bases only.
    #[must_use]
    pub fn open(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            seed: 0,
            frame_ms: default_frame_ms(),
            max_frames: default_max_frames(),
            board: BattlefieldConfig {
                terrain: TerrainSource::Plain,
                ..BattlefieldConfig::default()
            },
            lane_picks: None,
            placements: Vec::new(),
        }
    }

    fn random(&self) -> Box<dyn RandomSource> {
        match &self.lane_picks {
            Some(picks) => Box::new(ScriptedRandom::new(picks.iter().copied())),
            None => Box::new(SeededRandom::from_seed(self.seed)),
        }
    }

    /// Build the scenario's starting board.
    pub fn battlefield(&self, catalog: Arc<UnitCatalog>) -> Result<Battlefield, ScenarioError> {
        Ok(Battlefield::new(self.board.clone(), catalog, self.random())?)
    }

    /// Play the scenario to a decision or the frame limit.
    ///
    /// Placements due at a frame's clock time are applied, in timeline
    /// order, before that frame's tick.
    pub fn run(
        &self,
        catalog: Arc<UnitCatalog>,
        renderer: &mut dyn Renderer,
    ) -> Result<ScenarioOutcome, ScenarioError> {
        let clock = ManualClock::default();
        let battlefield = self.battlefield(catalog)?;
        let mut controller = MatchController::new(battlefield, Box::new(clock.clone()));
        let mut recorder = FinalBoard {
            inner: renderer,
            decided: None,
        };

        let mut timeline: Vec<&TimedPlacement> = self.placements.iter().collect();
        timeline.sort_by_key(|placement| placement.at_ms);
        let mut pending = timeline.into_iter().peekable();

        let mut outcome = ScenarioOutcome {
            name: self.name.clone(),
            seed: self.seed,
            winner: None,
            frames: 0,
            ended_ms: 0,
            placed: 0,
            rejected: 0,
            survivors: Vec::new(),
        };

        tracing::info!(scenario = %self.name, seed = self.seed, "Scenario started");
        for frame in 1..=self.max_frames {
            let now = u64::from(frame).saturating_mul(self.frame_ms);
            clock.set(now);
            while let Some(entry) = pending.next_if(|entry| entry.at_ms <= now) {
                if apply_placement(&mut controller, entry) {
                    outcome.placed += 1;
                } else {
                    outcome.rejected += 1;
                }
            }

            outcome.frames = frame;
            outcome.ended_ms = now;
            if let FrameOutcome::MatchEnded { winner, .. } = controller.frame(&mut recorder) {
                outcome.winner = Some(winner);
                break;
            }
        }

        let final_board = recorder
            .decided
            .unwrap_or_else(|| controller.battlefield().snapshot());
        outcome.survivors = final_board.units;
        tracing::info!(
            scenario = %self.name,
            winner = ?outcome.winner,
            frames = outcome.frames,
            "Scenario finished"
        );
        Ok(outcome)
    }
}

fn apply_placement(controller: &mut MatchController, entry: &TimedPlacement) -> bool {
    let field = controller.battlefield_mut();
    let (kind, side) = (entry.kind, entry.side);
    let id = match entry.cell {
        Some(cell) => {
            let id = field.spawn_at(kind, side, cell);
            if id.is_none() {
                tracing::warn!(%kind, %side, ?cell, "Scripted cell unavailable");
            }
            id
        }
        None => match field.place_unit(kind, side) {
            Ok(placement) => Some(placement.id),
            Err(err) => {
                tracing::warn!(%kind, %side, %err, "Scripted placement refused");
                None
            }
        },
    };
    let Some(id) = id else {
        return false;
    };

    if let Some(row) = entry.lane_row {
        if !field.assign_lane(id, row) {
            tracing::warn!(unit = %id, row, "Lane override out of bounds, keeping random lane");
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use sketchwar_core::snapshot::NullRenderer;

    /// Left godzilla parked in range of the right base: 100 damage every
    /// 2000 ms against 10000 hp.
    fn siege() -> Scenario {
        let mut scenario = Scenario::open("siege");
        scenario.lane_picks = Some(vec![1]);
        scenario.max_frames = 2500;
        scenario.placements = vec![
            TimedPlacement::new(0, Side::Left, UnitKind::Godzilla).at_cell(Cell::new(27, 10)),
        ];
        scenario
    }

    fn catalog() -> Arc<UnitCatalog> {
        Arc::new(UnitCatalog::standard())
    }

    #[test]
    fn test_parse_from_ron_with_defaults() {
        let ron = r#"
            Scenario(
                name: "Test",
                board: (terrain: plain),
                lane_picks: Some([2, 0]),
                placements: [
                    (at_ms: 500, side: left, kind: tank),
                    (
                        at_ms: 0,
                        side: right,
                        kind: medic,
                        cell: Some((x: 20, y: 4)),
                        lane_row: Some(15),
                    ),
                ],
            )
        "#;
        let scenario = Scenario::from_ron_str(ron).unwrap();
        assert_eq!(scenario.name, "Test");
        assert_eq!(scenario.frame_ms, 100);
        assert_eq!(scenario.max_frames, 3000);
        assert_eq!(scenario.board.terrain, TerrainSource::Plain);
        assert_eq!(scenario.board.width, 30);
        assert_eq!(scenario.placements[1].cell, Some(Cell::new(20, 4)));
        assert_eq!(scenario.placements[1].lane_row, Some(15));
    }

    #[test]
    fn test_ron_round_trip_of_stock_scenario() {
        let stock = Scenario::skirmish();
        let text = stock.to_ron().unwrap();
        assert_eq!(Scenario::from_ron_str(&text).unwrap(), stock);
    }

    #[test]
    fn test_siege_is_decided() {
        let outcome = siege().run(catalog(), &mut NullRenderer).unwrap();
        assert_eq!(outcome.winner, Some(Side::Left));
        assert_eq!(outcome.frames, 2000);
        assert_eq!(outcome.ended_ms, 200_000);
        assert_eq!(outcome.placed, 1);
        assert_eq!(outcome.survivor_count(Side::Left), 1);
        assert_eq!(outcome.survivor_count(Side::Right), 0);

        // The fallen base is still on the final board, at zero.
        let right_base = outcome
            .survivors
            .iter()
            .find(|unit| unit.kind == UnitKind::Base && unit.side == Side::Right)
            .unwrap();
        assert_eq!(right_base.hp, 0.0);
        // The base answered 99 times before the last blow.
        let godzilla = outcome
            .survivors
            .iter()
            .find(|unit| unit.kind == UnitKind::Godzilla)
            .unwrap();
        assert_eq!(godzilla.hp, 4010.0);
    }

    #[test]
    fn test_frame_limit_leaves_match_undecided() {
        let mut scenario = siege();
        scenario.max_frames = 100;
        let outcome = scenario.run(catalog(), &mut NullRenderer).unwrap();
        assert_eq!(outcome.winner, None);
        assert_eq!(outcome.frames, 100);
        let right_base = outcome
            .survivors
            .iter()
            .find(|unit| unit.kind == UnitKind::Base && unit.side == Side::Right)
            .unwrap();
        assert_eq!(right_base.hp, 9500.0);
    }

    #[test]
    fn test_refused_placements_are_counted() {
        let mut scenario = siege();
        scenario.max_frames = 5;
        scenario.placements.push(
            TimedPlacement::new(0, Side::Right, UnitKind::Soldier).at_cell(Cell::new(27, 10)),
        );
        scenario
            .placements
            .push(TimedPlacement::new(200, Side::Left, UnitKind::Base));
        let outcome = scenario.run(catalog(), &mut NullRenderer).unwrap();
        assert_eq!(outcome.placed, 1);
        assert_eq!(outcome.rejected, 2);
    }

    #[test]
    fn test_lane_override() {
        let mut scenario = Scenario::open("lanes");
        scenario.max_frames = 1;
        scenario.placements = vec![TimedPlacement {
            lane_row: Some(15),
            ..TimedPlacement::new(0, Side::Left, UnitKind::Soldier)
        }];
        let outcome = scenario.run(catalog(), &mut NullRenderer).unwrap();
        assert_eq!(outcome.placed, 1);
        assert_eq!(outcome.survivor_count(Side::Left), 1);
    }

    #[test]
    fn test_parse_terrain() {
        assert_eq!(parse_terrain("plain"), TerrainSource::Plain);
        assert_eq!(parse_terrain("generated"), TerrainSource::Generated);
        assert_eq!(parse_terrain(" map1 "), TerrainSource::default());
    }

    #[test]
    fn test_builtin_catalog_without_path() {
        let catalog = load_catalog(None).unwrap();
        assert_eq!(catalog, UnitCatalog::standard());
    }

    #[test]
    fn test_bad_board_is_an_error() {
        let mut scenario = Scenario::open("narrow");
        scenario.board.width = 2;
        assert!(matches!(
            scenario.run(catalog(), &mut NullRenderer),
            Err(ScenarioError::Game(_))
        ));
    }
}
