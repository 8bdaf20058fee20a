//! Battlefield engine.
//!
//! Owns the unit grid, the terrain, and all per-unit bookkeeping, and runs
//! the simulation tick:
//!
//! 1. expire old combat effects
//! 2. for every occupied cell in row-major order, once per unit:
//!    acquire a target, attack or heal when paced, otherwise move
//! 3. purge bookkeeping of units no longer on the board
//!
//! Blocked moves, missing targets and full placement columns are ordinary
//! outcomes reported through return values. Once a base falls the engine
//! stops ticking and placing until [`Battlefield::reset`].

mod movement;
mod placement;
mod targeting;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::catalog::UnitCatalog;
use crate::config::{BattlefieldConfig, TerrainSource};
use crate::effects::{CombatEffect, EffectKind, EffectLog};
use crate::error::{GameError, Result};
use crate::math::{Cell, Fixed};
use crate::random::RandomSource;
use crate::snapshot::{BattlefieldSnapshot, EffectView, UnitView};
use crate::terrain::{preset_ids, Terrain, TerrainMap};
use crate::unit::{Side, Unit, UnitArena, UnitId};
use crate::unit_kind::{Role, UnitKind};

pub use movement::{Lane, LANE_RELEASE_COLUMNS, REROUTE_SPAN};
pub use placement::Placement;

use targeting::Target;

/// Last time a unit attacked and moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionTimers {
    /// Engine time of the last attack or heal.
    pub last_attack_ms: u64,
    /// Engine time of the last move or lane change.
    pub last_move_ms: u64,
}

impl ActionTimers {
    /// Both timers set to `now_ms`.
    #[must_use]
    pub const fn starting_at(now_ms: u64) -> Self {
        Self {
            last_attack_ms: now_ms,
            last_move_ms: now_ms,
        }
    }
}

fn interval_elapsed(last_ms: u64, interval_ms: Option<u64>, now_ms: u64) -> bool {
    interval_ms.is_some_and(|interval| now_ms.saturating_sub(last_ms) >= interval)
}

/// Something that happened during a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BattleEvent {
    /// Damage dealt.
    Attacked {
        /// Acting unit.
        attacker: UnitId,
        /// Unit hit.
        target: UnitId,
        /// Damage after the counter bonus.
        damage: Fixed,
        /// Whether the counter bonus applied.
        countered: bool,
    },
    /// Hit points restored.
    Healed {
        /// Acting healer.
        healer: UnitId,
        /// Unit healed.
        target: UnitId,
        /// Hit points actually restored.
        amount: Fixed,
    },
    /// One-cell step.
    Moved {
        /// Unit that moved.
        unit: UnitId,
        /// Previous cell.
        from: Cell,
        /// New cell.
        to: Cell,
    },
    /// A blocked unit picked a new lane row and held position.
    Rerouted {
        /// Unit that rerouted.
        unit: UnitId,
        /// New lane row.
        lane_row: i32,
    },
    /// A non-base unit died and left the board.
    Destroyed {
        /// Dead unit.
        unit: UnitId,
        /// Its kind.
        kind: UnitKind,
        /// Its side.
        side: Side,
    },
    /// A base reached zero hit points.
    BaseFell {
        /// Side that lost its base.
        side: Side,
    },
}

/// Result of one [`Battlefield::tick`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Tick counter after this tick.
    pub tick: u64,
    /// Events in resolution order.
    pub events: Vec<BattleEvent>,
    /// Set once a base has fallen.
    pub winner: Option<Side>,
    /// The engine was already over and did nothing.
    pub halted: bool,
}

impl TickReport {
    /// Units destroyed this tick.
    pub fn destroyed(&self) -> impl Iterator<Item = UnitId> + '_ {
        self.events.iter().filter_map(|event| match event {
            BattleEvent::Destroyed { unit, .. } => Some(*unit),
            _ => None,
        })
    }
}

/// The battlefield simulation.
pub struct Battlefield {
    config: BattlefieldConfig,
    catalog: Arc<UnitCatalog>,
    terrain: TerrainMap,
    units: UnitArena,
    grid: Vec<Option<UnitId>>,
    positions: HashMap<UnitId, Cell>,
    pacing: HashMap<UnitId, ActionTimers>,
    lanes: HashMap<UnitId, i32>,
    effects: EffectLog,
    random: Box<dyn RandomSource>,
    now_ms: u64,
    tick: u64,
    winner: Option<Side>,
}

impl fmt::Debug for Battlefield {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Battlefield")
            .field("config", &self.config)
            .field("units", &self.units.len())
            .field("now_ms", &self.now_ms)
            .field("tick", &self.tick)
            .field("winner", &self.winner)
            .finish_non_exhaustive()
    }
}

impl Battlefield {
    /// Build a board with terrain loaded and both bases placed.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidState`] if the configured board cannot
    /// hold two bases. A missing terrain preset is logged and replaced by an
    /// all-plain map.
    pub fn new(
        config: BattlefieldConfig,
        catalog: Arc<UnitCatalog>,
        random: Box<dyn RandomSource>,
    ) -> Result<Self> {
        config.validate()?;
        let cells = (config.width as usize) * (config.height as usize);
        let mut field = Self {
            terrain: TerrainMap::new(config.width, config.height),
            effects: EffectLog::new(config.effect_duration_ms),
            config,
            catalog,
            units: UnitArena::new(),
            grid: vec![None; cells],
            positions: HashMap::new(),
            pacing: HashMap::new(),
            lanes: HashMap::new(),
            random,
            now_ms: 0,
            tick: 0,
            winner: None,
        };
        field.load_terrain();
        field.place_bases();
        Ok(field)
    }

    /// Clear the board and start over: fresh terrain, full-health bases,
    /// no other units, no bookkeeping. The clock position is kept.
    pub fn reset(&mut self) {
        self.units.clear();
        self.grid.fill(None);
        self.positions.clear();
        self.pacing.clear();
        self.lanes.clear();
        self.effects.clear();
        self.winner = None;
        self.load_terrain();
        self.place_bases();
        tracing::info!(tick = self.tick, "Battlefield reset");
    }

    fn load_terrain(&mut self) {
        let bases = [self.base_cell(Side::Left), self.base_cell(Side::Right)];
        self.terrain = TerrainMap::new(self.config.width, self.config.height);
        match &self.config.terrain {
            TerrainSource::Plain => {}
            TerrainSource::Preset(map_id) => {
                if let Err(err) = self.terrain.load_preset(map_id) {
                    tracing::warn!(
                        %map_id,
                        %err,
                        known = ?preset_ids(),
                        "Terrain preset unavailable, using plain map"
                    );
                }
            }
            TerrainSource::Generated => self.terrain.generate(self.random.as_mut(), &bases),
        }
        self.terrain.clear_cells(&bases);
    }

    fn place_bases(&mut self) {
        for side in Side::BOTH {
            if let Err(err) = self.place_base(side) {
                tracing::warn!(%side, %err, "Base could not be placed");
            }
        }
    }

    /// Advance the simulation to `now_ms`.
    ///
    /// Does nothing once a base has fallen.
    pub fn tick(&mut self, now_ms: u64) -> TickReport {
        if let Some(winner) = self.winner {
            return TickReport {
                tick: self.tick,
                events: Vec::new(),
                winner: Some(winner),
                halted: true,
            };
        }

        self.now_ms = self.now_ms.max(now_ms);
        self.tick += 1;
        self.effects.expire(self.now_ms);

        let mut report = TickReport {
            tick: self.tick,
            ..TickReport::default()
        };

        let order: Vec<UnitId> = self.grid.iter().flatten().copied().collect();
        for id in order {
            if self.winner.is_some() {
                break;
            }
            self.act(id, &mut report);
        }

        self.cleanup();
        report.winner = self.winner;

        #[cfg(feature = "debug-validation")]
        if let Err(err) = self.validate() {
            panic!("battlefield invariant violated after tick {}: {err}", self.tick);
        }

        report
    }

    fn act(&mut self, id: UnitId, report: &mut TickReport) {
        let cell = self.positions.get(&id).copied();
        let (Some(cell), Some(actor)) = (cell, self.units.get(id).cloned()) else {
            return;
        };
        let now = self.now_ms;
        let base_interval = self.config.base_interval_ms;
        let timers = *self
            .pacing
            .entry(id)
            .or_insert_with(|| ActionTimers::starting_at(now));

        if let Some(target) = targeting::find_target(self, id, cell, &actor) {
            let interval = actor.attack_interval_ms(base_interval);
            if interval_elapsed(timers.last_attack_ms, interval, now) {
                self.resolve_action(id, cell, &actor, target, report);
                if let Some(timers) = self.pacing.get_mut(&id) {
                    timers.last_attack_ms = now;
                }
            }
            return;
        }

        let interval = actor.move_interval_ms(base_interval);
        if interval_elapsed(timers.last_move_ms, interval, now) {
            self.advance(id, cell, &actor, report);
            if let Some(timers) = self.pacing.get_mut(&id) {
                timers.last_move_ms = now;
            }
        }
    }

    fn resolve_action(
        &mut self,
        actor_id: UnitId,
        origin: Cell,
        actor: &Unit,
        target: Target,
        report: &mut TickReport,
    ) {
        match actor.role {
            Role::Healer => self.resolve_heal(actor_id, origin, actor, target, report),
            Role::Combatant | Role::Static => {
                self.resolve_attack(actor_id, origin, actor, target, report);
            }
        }
    }

    fn resolve_heal(
        &mut self,
        healer: UnitId,
        origin: Cell,
        actor: &Unit,
        target: Target,
        report: &mut TickReport,
    ) {
        let power = actor.heal_power.unwrap_or(Fixed::ZERO);
        let Some(patient) = self.units.get_mut(target.id) else {
            return;
        };
        let before = patient.hp;
        patient.hp = patient.hp.saturating_add(power).min(patient.max_hp);
        let amount = patient.hp - before;

        tracing::debug!(%healer, target = %target.id, %amount, "Heal resolved");
        self.effects.push(CombatEffect {
            kind: EffectKind::Heal,
            from: origin,
            to: target.cell,
            magnitude: amount,
            started_ms: self.now_ms,
        });
        report.events.push(BattleEvent::Healed {
            healer,
            target: target.id,
            amount,
        });
    }

    fn resolve_attack(
        &mut self,
        attacker: UnitId,
        origin: Cell,
        actor: &Unit,
        target: Target,
        report: &mut TickReport,
    ) {
        let Some(victim_kind) = self.units.get(target.id).map(|unit| unit.kind) else {
            return;
        };
        let countered = self.catalog.is_countered(actor.kind, victim_kind);
        let damage = if countered {
            actor
                .attack
                .saturating_mul(self.catalog.counter_bonus_multiplier())
        } else {
            actor.attack
        };

        let Some(victim) = self.units.get_mut(target.id) else {
            return;
        };
        victim.hp = victim.hp.saturating_sub(damage);
        let fallen = victim.hp <= Fixed::ZERO;
        let victim_side = victim.side;
        let victim_is_base = victim.is_base();
        if fallen && victim_is_base {
            victim.hp = Fixed::ZERO;
        }

        tracing::debug!(%attacker, target = %target.id, %damage, countered, "Attack resolved");
        self.effects.push(CombatEffect {
            kind: EffectKind::Attack,
            from: origin,
            to: target.cell,
            magnitude: damage,
            started_ms: self.now_ms,
        });
        report.events.push(BattleEvent::Attacked {
            attacker,
            target: target.id,
            damage,
            countered,
        });

        if !fallen {
            return;
        }
        if victim_is_base {
            let winner = victim_side.opponent();
            self.winner = Some(winner);
            tracing::info!(loser = %victim_side, %winner, tick = self.tick, "Base destroyed");
            report.events.push(BattleEvent::BaseFell { side: victim_side });
        } else {
            self.remove_unit(target.id);
            tracing::debug!(
                unit = %target.id,
                kind = %victim_kind,
                side = %victim_side,
                "Unit destroyed"
            );
            report.events.push(BattleEvent::Destroyed {
                unit: target.id,
                kind: victim_kind,
                side: victim_side,
            });
        }
    }

    fn advance(&mut self, id: UnitId, cell: Cell, actor: &Unit, report: &mut TickReport) {
        let enemy_base = self.base_cell(actor.side.opponent());
        let lane_row = self.lanes.get(&id).copied().unwrap_or(cell.y);
        let heading = movement::heading(cell, lane_row, enemy_base);

        let step = movement::choose_step(cell, heading, |next| self.can_enter(actor.kind, next));
        if let Some(next) = step {
            self.relocate(id, cell, next);
            tracing::trace!(unit = %id, ?cell, ?next, "Unit moved");
            report.events.push(BattleEvent::Moved {
                unit: id,
                from: cell,
                to: next,
            });
            return;
        }

        let height = self.config.height as i32;
        let row = movement::reroute(cell, lane_row, enemy_base, height, self.random.as_mut());
        if let Some(row) = row {
            self.lanes.insert(id, row);
            tracing::trace!(unit = %id, ?cell, lane_row = row, "Blocked, lane reassigned");
            report.events.push(BattleEvent::Rerouted {
                unit: id,
                lane_row: row,
            });
        }
    }

    /// Drop pacing and lane entries of units no longer alive.
    ///
    /// Runs at the end of every tick. Returns how many entries were removed;
    /// a second call without board changes removes nothing.
    pub fn cleanup(&mut self) -> usize {
        let units = &self.units;
        let before = self.pacing.len() + self.lanes.len() + self.positions.len();
        self.pacing.retain(|id, _| units.contains(*id));
        self.lanes.retain(|id, _| units.contains(*id));
        self.positions.retain(|id, _| units.contains(*id));
        before - (self.pacing.len() + self.lanes.len() + self.positions.len())
    }

    /// Check every board invariant.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidState`] describing the first violation:
    /// a grid slot naming a dead unit or disagreeing with the unit's recorded
    /// position, a non-base unit on a base cell, a base off its cell, a live
    /// unit missing from the grid, or bookkeeping for a dead unit.
    pub fn validate(&self) -> Result<()> {
        let broken = |message: String| Err(GameError::InvalidState(message));

        let mut on_grid = 0;
        for (cell, id, unit) in self.occupied() {
            on_grid += 1;
            if self.positions.get(&id) != Some(&cell) {
                return broken(format!("unit {id} at {cell:?} has a stale position"));
            }
            if unit.is_base() {
                if cell != self.base_cell(unit.side) {
                    return broken(format!("base {id} is off its reserved cell"));
                }
            } else {
                if self.is_base_cell(cell) {
                    return broken(format!("unit {id} occupies a base cell"));
                }
                if !self.lanes.contains_key(&id) {
                    return broken(format!("unit {id} has no lane"));
                }
                if !self.pacing.contains_key(&id) {
                    return broken(format!("unit {id} has no pacing timers"));
                }
            }
        }
        if self.grid.iter().flatten().count() != on_grid {
            return broken("grid names a unit missing from the arena".to_string());
        }
        if on_grid != self.units.len() {
            return broken(format!(
                "{} units alive but {on_grid} on the grid",
                self.units.len()
            ));
        }
        let stale = self
            .pacing
            .keys()
            .chain(self.lanes.keys())
            .chain(self.positions.keys())
            .find(|id| !self.units.contains(**id));
        if let Some(id) = stale {
            return broken(format!("bookkeeping kept for dead unit {id}"));
        }
        Ok(())
    }

    /// Read-only view for renderers.
    #[must_use]
    pub fn snapshot(&self) -> BattlefieldSnapshot {
        let to_f64 = |value: Fixed| value.to_num::<f64>();
        BattlefieldSnapshot {
            width: self.config.width,
            height: self.config.height,
            now_ms: self.now_ms,
            tick: self.tick,
            terrain: self.terrain.cells().to_vec(),
            units: self
                .occupied()
                .map(|(cell, id, unit)| UnitView {
                    id,
                    kind: unit.kind,
                    side: unit.side,
                    cell,
                    hp: to_f64(unit.hp),
                    max_hp: to_f64(unit.max_hp),
                })
                .collect(),
            effects: self
                .effects
                .active()
                .iter()
                .map(|effect| EffectView {
                    kind: effect.kind,
                    from: effect.from,
                    to: effect.to,
                    magnitude: to_f64(effect.magnitude),
                    age_ms: effect.age_ms(self.now_ms),
                    duration_ms: self.config.effect_duration_ms,
                })
                .collect(),
            winner: self.winner,
        }
    }

    // --- Grid plumbing ---

    fn index(&self, cell: Cell) -> Option<usize> {
        self.terrain
            .contains(cell)
            .then(|| (cell.y as usize) * (self.config.width as usize) + (cell.x as usize))
    }

    fn cell_at(&self, index: usize) -> Cell {
        let width = self.config.width as usize;
        Cell::new((index % width) as i32, (index / width) as i32)
    }

    fn can_enter(&self, kind: UnitKind, cell: Cell) -> bool {
        self.terrain.contains(cell)
            && self.occupant(cell).is_none()
            && !self.is_base_cell(cell)
            && self.terrain.passable(kind, cell)
    }

    fn spawn(&mut self, unit: Unit, cell: Cell) -> Option<UnitId> {
        let index = self.index(cell)?;
        let id = self.units.insert(unit);
        self.grid[index] = Some(id);
        self.positions.insert(id, cell);
        self.pacing.insert(id, ActionTimers::starting_at(self.now_ms));
        Some(id)
    }

    fn relocate(&mut self, id: UnitId, from: Cell, to: Cell) {
        let (Some(from_index), Some(to_index)) = (self.index(from), self.index(to)) else {
            return;
        };
        self.grid[from_index] = None;
        self.grid[to_index] = Some(id);
        self.positions.insert(id, to);
    }

    fn remove_unit(&mut self, id: UnitId) {
        if let Some(index) = self.positions.remove(&id).and_then(|cell| self.index(cell)) {
            self.grid[index] = None;
        }
        self.units.remove(id);
        self.pacing.remove(&id);
        self.lanes.remove(&id);
    }

    // --- Queries ---

    /// Occupied cells in row-major scan order.
    pub fn occupied(&self) -> impl Iterator<Item = (Cell, UnitId, &Unit)> + '_ {
        self.grid.iter().enumerate().filter_map(|(index, slot)| {
            let id = (*slot)?;
            let unit = self.units.get(id)?;
            Some((self.cell_at(index), id, unit))
        })
    }

    /// Configuration the board was built with.
    #[must_use]
    pub const fn config(&self) -> &BattlefieldConfig {
        &self.config
    }

    /// Shared stat and counter tables.
    #[must_use]
    pub fn catalog(&self) -> &UnitCatalog {
        &self.catalog
    }

    /// Terrain grid.
    #[must_use]
    pub const fn terrain(&self) -> &TerrainMap {
        &self.terrain
    }

    /// Change one terrain cell, for scripted setups.
    ///
    /// Refused (returning `false`) off the board, on base cells, and where
    /// the current occupant could not stand on the new terrain. A reset
    /// reloads the configured terrain.
    pub fn set_terrain(&mut self, cell: Cell, terrain: Terrain) -> bool {
        if !self.terrain.contains(cell) || self.is_base_cell(cell) {
            return false;
        }
        if self.unit_at(cell).is_some_and(|unit| !terrain.allows(unit.kind)) {
            return false;
        }
        self.terrain.set(cell, terrain)
    }

    /// Board width in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.config.width
    }

    /// Board height in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.config.height
    }

    /// Reserved cell of a side's base: the left or right edge, middle row.
    #[must_use]
    pub const fn base_cell(&self, side: Side) -> Cell {
        let row = (self.config.height / 2) as i32;
        match side {
            Side::Left => Cell::new(0, row),
            Side::Right => Cell::new(self.config.width as i32 - 1, row),
        }
    }

    /// Whether `cell` is either side's base cell.
    #[must_use]
    pub fn is_base_cell(&self, cell: Cell) -> bool {
        Side::BOTH.into_iter().any(|side| self.base_cell(side) == cell)
    }

    /// Id of the unit in `cell`.
    #[must_use]
    pub fn occupant(&self, cell: Cell) -> Option<UnitId> {
        self.index(cell).and_then(|index| self.grid[index])
    }

    /// Unit in `cell`.
    #[must_use]
    pub fn unit_at(&self, cell: Cell) -> Option<&Unit> {
        self.occupant(cell).and_then(|id| self.units.get(id))
    }

    /// Unit by id.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(id)
    }

    /// Mutable unit by id, for scripted setups.
    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(id)
    }

    /// Cell of a live unit.
    #[must_use]
    pub fn position_of(&self, id: UnitId) -> Option<Cell> {
        self.positions.get(&id).copied()
    }

    /// A side's base, if on the board.
    #[must_use]
    pub fn base(&self, side: Side) -> Option<(UnitId, &Unit)> {
        let id = self.occupant(self.base_cell(side))?;
        self.units
            .get(id)
            .filter(|unit| unit.is_base() && unit.side == side)
            .map(|unit| (id, unit))
    }

    /// Lane row a unit is converging on.
    #[must_use]
    pub fn lane_of(&self, id: UnitId) -> Option<i32> {
        self.lanes.get(&id).copied()
    }

    /// Point a live non-base unit at a different lane row.
    ///
    /// Returns `false` for unknown units, bases, and rows off the board.
    pub fn assign_lane(&mut self, id: UnitId, row: i32) -> bool {
        let valid_row = (0..self.config.height as i32).contains(&row);
        let mobile = self.units.get(id).is_some_and(|unit| !unit.is_base());
        if valid_row && mobile {
            self.lanes.insert(id, row);
        }
        valid_row && mobile
    }

    /// Pacing timers of a unit.
    #[must_use]
    pub fn pacing_of(&self, id: UnitId) -> Option<ActionTimers> {
        self.pacing.get(&id).copied()
    }

    /// Live units, bases included.
    #[must_use]
    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// In-flight combat effects.
    #[must_use]
    pub fn effects(&self) -> &[CombatEffect] {
        self.effects.active()
    }

    /// Side whose opponent's base fell, if any.
    #[must_use]
    pub const fn winner(&self) -> Option<Side> {
        self.winner
    }

    /// Whether a base has fallen.
    #[must_use]
    pub const fn is_over(&self) -> bool {
        self.winner.is_some()
    }

    /// Latest time seen by [`tick`](Self::tick) or
    /// [`observe_time`](Self::observe_time).
    #[must_use]
    pub const fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Move the engine clock forward without ticking. Units placed
    /// afterwards start their pacing timers at `now_ms`. Earlier times are
    /// ignored.
    pub fn observe_time(&mut self, now_ms: u64) {
        self.now_ms = self.now_ms.max(now_ms);
    }

    /// Ticks run since construction.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick
    }
}
