//! Match controller: one tick and one render per frame, win detection, and
//! the sketch-to-placement path.
//!
//! When a base falls the controller announces the winner and resets the
//! battlefield in the same frame, so the next frame starts a fresh round.
//! Classification results are applied to whatever board is current when
//! they arrive; a result from before a reset simply places on the new board
//! or fails placement.

use serde::{Deserialize, Serialize};

use crate::battlefield::{Battlefield, Placement, TickReport};
use crate::classification::{
    interpret_label, ClassificationError, ClassificationRequest, Classifier,
};
use crate::clock::Clock;
use crate::config::PLACEMENT_COOLDOWN_MS;
use crate::error::PlacementError;
use crate::math::{fixed_serde, Fixed};
use crate::snapshot::Renderer;
use crate::unit::Side;
use crate::unit_kind::UnitKind;

/// A base's hit points for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseHealth {
    /// Current hit points.
    #[serde(with = "fixed_serde")]
    pub hp: Fixed,
    /// Full hit points.
    #[serde(with = "fixed_serde")]
    pub max_hp: Fixed,
}

impl BaseHealth {
    /// Whether the base has fallen.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.hp <= Fixed::ZERO
    }

    /// Remaining health as a whole percentage.
    #[must_use]
    pub fn percent(&self) -> u32 {
        if self.max_hp <= Fixed::ZERO {
            return 0;
        }
        let percent = (self.hp * Fixed::from_num(100) / self.max_hp).max(Fixed::ZERO);
        percent.to_num::<u32>()
    }
}

/// What a frame did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The match goes on.
    Running(TickReport),
    /// A base fell this frame; the board has already been reset.
    MatchEnded {
        /// Side whose base survived.
        winner: Side,
        /// Round that just ended, starting at 1.
        round: u32,
        /// The tick that ended it.
        report: TickReport,
    },
}

/// Result of applying a classifier answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementOutcome {
    /// A unit was put on the board.
    Placed {
        /// Kind recognized.
        kind: UnitKind,
        /// Where it went.
        placement: Placement,
    },
    /// The label names no placeable unit; nothing was attempted.
    Unrecognized(String),
    /// The label was valid but the board refused it.
    Rejected {
        /// Kind recognized.
        kind: UnitKind,
        /// Why it was refused.
        reason: PlacementError,
    },
    /// The sketch never produced a label.
    Failed(ClassificationError),
}

/// Drives a [`Battlefield`] from a clock and hands snapshots to a renderer.
pub struct MatchController {
    battlefield: Battlefield,
    clock: Box<dyn Clock>,
    cooldown_ms: u64,
    last_submission: [Option<u64>; 2],
    round: u32,
    last_winner: Option<Side>,
}

const fn side_slot(side: Side) -> usize {
    match side {
        Side::Left => 0,
        Side::Right => 1,
    }
}

impl MatchController {
    /// Control `battlefield` with time from `clock`.
    #[must_use]
    pub fn new(battlefield: Battlefield, clock: Box<dyn Clock>) -> Self {
        Self {
            battlefield,
            clock,
            cooldown_ms: PLACEMENT_COOLDOWN_MS,
            last_submission: [None; 2],
            round: 1,
            last_winner: None,
        }
    }

    /// Override the per-side sketch cooldown.
    #[must_use]
    pub const fn with_cooldown(mut self, cooldown_ms: u64) -> Self {
        self.cooldown_ms = cooldown_ms;
        self
    }

    /// Run one frame: tick, render, then check both bases.
    pub fn frame(&mut self, renderer: &mut dyn Renderer) -> FrameOutcome {
        let now = self.clock.now_ms();
        let report = self.battlefield.tick(now);

        if let Err(err) = renderer.render(&self.battlefield.snapshot()) {
            tracing::warn!(%err, "Render failed, simulation continues");
        }

        let loser = Side::BOTH
            .into_iter()
            .find(|side| self.base_health(*side).is_some_and(|health| health.is_destroyed()));
        let Some(loser) = loser else {
            return FrameOutcome::Running(report);
        };

        let winner = loser.opponent();
        let round = self.round;
        tracing::info!(%winner, round, tick = report.tick, "Match over");
        self.last_winner = Some(winner);
        self.round += 1;
        self.reset();
        FrameOutcome::MatchEnded {
            winner,
            round,
            report,
        }
    }

    /// Accept a sketch from `side` for classification.
    ///
    /// The side's cooldown starts when a request is built; empty sketches do
    /// not consume it.
    ///
    /// # Errors
    ///
    /// [`ClassificationError::CoolingDown`] inside the cooldown window and
    /// [`ClassificationError::EmptySketch`] for an empty image.
    pub fn submit_sketch(
        &mut self,
        side: Side,
        image: Vec<u8>,
    ) -> Result<ClassificationRequest, ClassificationError> {
        let remaining_ms = self.cooldown_remaining(side);
        if remaining_ms > 0 {
            return Err(ClassificationError::CoolingDown { remaining_ms });
        }
        let request = ClassificationRequest::new(side, image)?;
        self.last_submission[side_slot(side)] = Some(self.clock.now_ms());
        Ok(request)
    }

    /// Apply a classifier answer for `side` to the current board.
    pub fn resolve_classification(
        &mut self,
        side: Side,
        answer: Result<String, ClassificationError>,
    ) -> PlacementOutcome {
        let label = match answer {
            Ok(label) => label,
            Err(err) => {
                tracing::warn!(%side, %err, "Classification failed");
                return PlacementOutcome::Failed(err);
            }
        };
        let Some(kind) = interpret_label(&label) else {
            tracing::info!(%side, %label, "Sketch not recognized");
            return PlacementOutcome::Unrecognized(label);
        };
        match self.place(kind, side) {
            Ok(placement) => PlacementOutcome::Placed { kind, placement },
            Err(reason) => {
                tracing::info!(%side, %kind, %reason, "Placement refused");
                PlacementOutcome::Rejected { kind, reason }
            }
        }
    }

    /// Submit, classify and place in one synchronous step.
    pub fn sketch(
        &mut self,
        side: Side,
        image: Vec<u8>,
        classifier: &mut dyn Classifier,
    ) -> PlacementOutcome {
        match self.submit_sketch(side, image) {
            Ok(request) => {
                let answer = classifier.classify(&request);
                self.resolve_classification(side, answer)
            }
            Err(err) => PlacementOutcome::Failed(err),
        }
    }

    /// Place a unit directly, without a sketch or cooldown.
    ///
    /// The unit's pacing starts at the controller's current time, not at the
    /// last frame.
    ///
    /// # Errors
    ///
    /// Any [`PlacementError`] from the battlefield.
    pub fn place(&mut self, kind: UnitKind, side: Side) -> Result<Placement, PlacementError> {
        self.battlefield.observe_time(self.clock.now_ms());
        self.battlefield.place_unit(kind, side)
    }

    /// Milliseconds until `side` may submit another sketch.
    #[must_use]
    pub fn cooldown_remaining(&self, side: Side) -> u64 {
        let now = self.clock.now_ms();
        self.last_submission[side_slot(side)].map_or(0, |last| {
            self.cooldown_ms.saturating_sub(now.saturating_sub(last))
        })
    }

    /// A side's base hit points.
    #[must_use]
    pub fn base_health(&self, side: Side) -> Option<BaseHealth> {
        self.battlefield.base(side).map(|(_, base)| BaseHealth {
            hp: base.hp,
            max_hp: base.max_hp,
        })
    }

    /// Start a fresh board immediately. Both sides may sketch again at once.
    pub fn reset(&mut self) {
        self.battlefield.reset();
        self.last_submission = [None; 2];
    }

    /// The battlefield being driven.
    #[must_use]
    pub const fn battlefield(&self) -> &Battlefield {
        &self.battlefield
    }

    /// Mutable access for scripted setups.
    pub fn battlefield_mut(&mut self) -> &mut Battlefield {
        &mut self.battlefield
    }

    /// Current round, starting at 1.
    #[must_use]
    pub const fn round(&self) -> u32 {
        self.round
    }

    /// Winner of the most recent finished round.
    #[must_use]
    pub const fn last_winner(&self) -> Option<Side> {
        self.last_winner
    }

    /// Current clock reading.
    #[must_use]
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::battlefield::ActionTimers;
    use crate::catalog::UnitCatalog;
    use crate::clock::ManualClock;
    use crate::config::BattlefieldConfig;
    use crate::math::Cell;
    use crate::random::ScriptedRandom;
    use crate::snapshot::{BattlefieldSnapshot, NullRenderer, RenderError};

    fn controller() -> (MatchController, ManualClock) {
        let clock = ManualClock::default();
        let battlefield = Battlefield::new(
            BattlefieldConfig::open(),
            Arc::new(UnitCatalog::standard()),
            Box::new(ScriptedRandom::default()),
        )
        .unwrap();
        (MatchController::new(battlefield, Box::new(clock.clone())), clock)
    }

    struct BrokenRenderer {
        calls: u32,
    }

    impl Renderer for BrokenRenderer {
        fn render(&mut self, _snapshot: &BattlefieldSnapshot) -> Result<(), RenderError> {
            self.calls += 1;
            Err(RenderError::Surface("no canvas".to_string()))
        }
    }

    struct FixedAnswer(&'static str);

    impl Classifier for FixedAnswer {
        fn classify(
            &mut self,
            _request: &ClassificationRequest,
        ) -> Result<String, ClassificationError> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn test_render_failure_does_not_stop_the_match() {
        let (mut controller, clock) = controller();
        let mut renderer = BrokenRenderer { calls: 0 };
        clock.advance(16);
        assert!(matches!(controller.frame(&mut renderer), FrameOutcome::Running(_)));
        assert!(matches!(controller.frame(&mut renderer), FrameOutcome::Running(_)));
        assert_eq!(renderer.calls, 2);
        assert_eq!(controller.battlefield().tick_count(), 2);
    }

    #[test]
    fn test_cooldown_blocks_rapid_submissions() {
        let (mut controller, clock) = controller();
        assert!(controller.submit_sketch(Side::Left, vec![1]).is_ok());

        clock.advance(1000);
        assert_eq!(
            controller.submit_sketch(Side::Left, vec![1]),
            Err(ClassificationError::CoolingDown { remaining_ms: 2000 })
        );
        // The other side has its own window.
        assert!(controller.submit_sketch(Side::Right, vec![1]).is_ok());

        clock.advance(2000);
        assert!(controller.submit_sketch(Side::Left, vec![1]).is_ok());
    }

    #[test]
    fn test_empty_sketch_does_not_start_cooldown() {
        let (mut controller, _clock) = controller();
        assert_eq!(
            controller.submit_sketch(Side::Left, Vec::new()),
            Err(ClassificationError::EmptySketch)
        );
        assert_eq!(controller.cooldown_remaining(Side::Left), 0);
    }

    #[test]
    fn test_recognized_label_places_unit() {
        let (mut controller, _clock) = controller();
        let outcome = controller.sketch(Side::Right, vec![7], &mut FixedAnswer(" Tank "));
        let PlacementOutcome::Placed { kind, placement } = outcome else {
            panic!("expected placement, got {outcome:?}");
        };
        assert_eq!(kind, UnitKind::Tank);
        assert_eq!(placement.cell, Cell::new(28, 10));
    }

    #[test]
    fn test_unknown_label_places_nothing() {
        let (mut controller, _clock) = controller();
        let outcome = controller.sketch(Side::Left, vec![7], &mut FixedAnswer("unknown"));
        assert_eq!(outcome, PlacementOutcome::Unrecognized("unknown".to_string()));
        assert_eq!(controller.battlefield().unit_count(), 2);
    }

    #[test]
    fn test_service_failure_is_reported_once() {
        let (mut controller, _clock) = controller();
        let outcome = controller.resolve_classification(
            Side::Left,
            Err(ClassificationError::Service("timeout".to_string())),
        );
        assert_eq!(
            outcome,
            PlacementOutcome::Failed(ClassificationError::Service("timeout".to_string()))
        );
        assert_eq!(controller.battlefield().unit_count(), 2);
    }

    #[test]
    fn test_fallen_base_ends_round_and_resets() {
        let (mut controller, clock) = controller();
        let field = controller.battlefield_mut();
        field
            .spawn_at(UnitKind::Soldier, Side::Left, Cell::new(5, 5))
            .unwrap();
        let (right_base, _) = field.base(Side::Right).unwrap();
        field.unit_mut(right_base).unwrap().hp = Fixed::ZERO;

        clock.advance(16);
        let outcome = controller.frame(&mut NullRenderer);
        let FrameOutcome::MatchEnded { winner, round, .. } = outcome else {
            panic!("expected match end, got {outcome:?}");
        };
        assert_eq!(winner, Side::Left);
        assert_eq!(round, 1);
        assert_eq!(controller.round(), 2);
        assert_eq!(controller.last_winner(), Some(Side::Left));

        // Fresh board: two full bases only.
        assert_eq!(controller.battlefield().unit_count(), 2);
        let health = controller.base_health(Side::Right).unwrap();
        assert_eq!(health.hp, health.max_hp);
        assert_eq!(health.percent(), 100);
    }

    #[test]
    fn test_new_round_clears_cooldowns() {
        let (mut controller, clock) = controller();
        assert!(controller.submit_sketch(Side::Left, vec![1]).is_ok());

        let field = controller.battlefield_mut();
        let (right_base, _) = field.base(Side::Right).unwrap();
        field.unit_mut(right_base).unwrap().hp = Fixed::ZERO;
        clock.advance(16);
        assert!(matches!(
            controller.frame(&mut NullRenderer),
            FrameOutcome::MatchEnded { .. }
        ));

        assert_eq!(controller.cooldown_remaining(Side::Left), 0);
        assert!(controller.submit_sketch(Side::Left, vec![1]).is_ok());
    }

    #[test]
    fn test_manual_reset_clears_cooldowns() {
        let (mut controller, clock) = controller();
        assert!(controller.submit_sketch(Side::Right, vec![1]).is_ok());
        clock.advance(500);
        assert_eq!(controller.cooldown_remaining(Side::Right), 2500);

        controller.reset();
        assert_eq!(controller.cooldown_remaining(Side::Right), 0);
    }

    #[test]
    fn test_placement_after_a_pause_waits_a_full_interval() {
        let (mut controller, clock) = controller();
        clock.advance(16);
        controller.frame(&mut NullRenderer);

        // Long gap with no frames, then a placement and one frame.
        clock.advance(60_000);
        let placement = controller.place(UnitKind::Soldier, Side::Left).unwrap();
        assert_eq!(
            controller.battlefield().pacing_of(placement.id),
            Some(ActionTimers::starting_at(60_016))
        );

        clock.advance(16);
        let FrameOutcome::Running(report) = controller.frame(&mut NullRenderer) else {
            panic!("match should still be running");
        };
        assert!(report.events.is_empty(), "unexpected events: {:?}", report.events);
        assert_eq!(controller.battlefield().position_of(placement.id), Some(placement.cell));
    }

    #[test]
    fn test_base_health_percent() {
        let health = BaseHealth {
            hp: Fixed::from_num(2500),
            max_hp: Fixed::from_num(10_000),
        };
        assert_eq!(health.percent(), 25);
        assert!(!health.is_destroyed());
    }
}
