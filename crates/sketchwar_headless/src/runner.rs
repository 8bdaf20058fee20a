//! Headless runner: protocol commands in, responses out.
//!
//! The runner owns a [`MatchController`] driven by a [`ManualClock`], so
//! time only moves when a `frame` command asks for it. Sketches go through
//! an [`EchoClassifier`] by default, which answers with the sketch payload
//! itself; a controller program can therefore play by "drawing" labels.

use std::io::{self, BufRead, Write};

use sketchwar_core::battlefield::{Battlefield, Placement};
use sketchwar_core::classification::{ClassificationError, ClassificationRequest, Classifier};
use sketchwar_core::clock::ManualClock;
use sketchwar_core::match_controller::{FrameOutcome, MatchController, PlacementOutcome};
use sketchwar_core::snapshot::{NullRenderer, Renderer};
use sketchwar_core::unit::Side;
use sketchwar_core::unit_kind::UnitKind;

use crate::protocol::{BaseReadout, Command, Response};

/// Default clock step per frame.
pub const DEFAULT_FRAME_MS: u64 = 100;

/// Runner configuration.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Clock step for `frame` commands that do not give one.
    pub frame_ms: u64,
    /// Emit state after every frame instead of once per command.
    pub auto_state: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            frame_ms: DEFAULT_FRAME_MS,
            auto_state: false,
        }
    }
}

/// Classifier that answers with the sketch bytes read as text.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoClassifier;

impl Classifier for EchoClassifier {
    fn classify(&mut self, request: &ClassificationRequest) -> Result<String, ClassificationError> {
        String::from_utf8(request.image.clone())
            .map_err(|e| ClassificationError::Service(format!("sketch is not text: {e}")))
    }
}

/// Totals for one protocol session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Commands parsed and handled.
    pub commands: u64,
    /// Lines that failed to parse.
    pub parse_errors: u64,
    /// Rounds that ended with a fallen base.
    pub matches_finished: u32,
    /// Whether the session ended with `quit` rather than end of input.
    pub quit: bool,
}

/// Headless runner for externally controlled matches.
pub struct HeadlessRunner {
    controller: MatchController,
    clock: ManualClock,
    renderer: Box<dyn Renderer>,
    classifier: Box<dyn Classifier>,
    config: RunnerConfig,
}

impl HeadlessRunner {
    /// Drive `battlefield` with a fresh manual clock at zero.
    #[must_use]
    pub fn new(battlefield: Battlefield, config: RunnerConfig) -> Self {
        let clock = ManualClock::default();
        let controller = MatchController::new(battlefield, Box::new(clock.clone()));
        Self {
            controller,
            clock,
            renderer: Box::new(NullRenderer),
            classifier: Box::new(EchoClassifier),
            config,
        }
    }

    /// Draw every frame with `renderer`.
    #[must_use]
    pub fn with_renderer(mut self, renderer: Box<dyn Renderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Classify sketches with `classifier`.
    #[must_use]
    pub fn with_classifier(mut self, classifier: Box<dyn Classifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// The match being driven.
    pub const fn controller(&self) -> &MatchController {
        &self.controller
    }

    /// Mutable access for scripted setups.
    pub fn controller_mut(&mut self) -> &mut MatchController {
        &mut self.controller
    }

    /// Handle to the runner's clock.
    pub const fn clock(&self) -> &ManualClock {
        &self.clock
    }

    /// Process one command.
    pub fn handle(&mut self, command: Command) -> Vec<Response> {
        match command {
            Command::Frame { count, step_ms } => {
                let step = step_ms.unwrap_or(self.config.frame_ms);
                self.run_frames(count, step)
            }
            Command::Place { side, kind } => match kind.parse::<UnitKind>() {
                Ok(kind) => vec![self.place(side, kind)],
                Err(e) => vec![Response::error(e.to_string(), Some("place"))],
            },
            Command::Sketch { side, sketch } => {
                let outcome =
                    self.controller
                        .sketch(side, sketch.into_bytes(), self.classifier.as_mut());
                vec![placement_response(side, outcome)]
            }
            Command::Query => vec![self.state()],
            Command::Reset => {
                self.controller.reset();
                vec![self.state()]
            }
            Command::Quit => vec![Response::Bye],
        }
    }

    fn run_frames(&mut self, count: u32, step_ms: u64) -> Vec<Response> {
        let mut responses = Vec::new();
        for _ in 0..count {
            self.clock.advance(step_ms);
            match self.controller.frame(self.renderer.as_mut()) {
                FrameOutcome::Running(_) => {}
                FrameOutcome::MatchEnded {
                    winner,
                    round,
                    report,
                } => responses.push(Response::MatchOver {
                    winner,
                    round,
                    tick: report.tick,
                }),
            }
            if self.config.auto_state {
                responses.push(self.state());
            }
        }
        if !self.config.auto_state {
            responses.push(self.state());
        }
        responses
    }

    fn place(&mut self, side: Side, kind: UnitKind) -> Response {
        match self.controller.place(kind, side) {
            Ok(placement) => placed(side, kind, placement),
            Err(reason) => Response::Rejected {
                side,
                reason: reason.to_string(),
                kind: Some(kind),
            },
        }
    }

    /// Current board state as a response.
    #[must_use]
    pub fn state(&self) -> Response {
        let snapshot = self.controller.battlefield().snapshot();
        let bases = Side::BOTH
            .into_iter()
            .filter_map(|side| {
                self.controller.base_health(side).map(|health| BaseReadout {
                    side,
                    hp: health.hp.to_num(),
                    max_hp: health.max_hp.to_num(),
                    percent: health.percent(),
                })
            })
            .collect();
        Response::State {
            tick: snapshot.tick,
            now_ms: self.controller.now_ms(),
            round: self.controller.round(),
            last_winner: self.controller.last_winner(),
            bases,
            units: snapshot.units,
        }
    }

    /// Serve a session: announce readiness, then answer each input line
    /// until `quit` or end of input.
    ///
    /// Blank lines are skipped and unparseable lines answered with an
    /// `error` response; neither ends the session.
    pub fn run<R: BufRead, W: Write>(
        &mut self,
        input: R,
        mut output: W,
    ) -> io::Result<SessionStats> {
        let field = self.controller.battlefield();
        let ready = Response::ready(field.width(), field.height(), self.controller.round());
        output.write_all(ready.to_json_line().as_bytes())?;
        output.flush()?;

        let mut stats = SessionStats::default();
        for line in input.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let responses = match Command::from_json(line) {
                Ok(command) => {
                    stats.commands += 1;
                    stats.quit = matches!(command, Command::Quit);
                    tracing::debug!(cmd = command.name(), "Command received");
                    self.handle(command)
                }
                Err(e) => {
                    stats.parse_errors += 1;
                    tracing::warn!(%e, "Unparseable command");
                    vec![Response::error(format!("Parse error: {e}"), None)]
                }
            };

            for response in &responses {
                if matches!(response, Response::MatchOver { .. }) {
                    stats.matches_finished += 1;
                }
                output.write_all(response.to_json_line().as_bytes())?;
            }
            output.flush()?;

            if stats.quit {
                break;
            }
        }

        tracing::info!(
            commands = stats.commands,
            parse_errors = stats.parse_errors,
            matches = stats.matches_finished,
            "Session finished"
        );
        Ok(stats)
    }
}

fn placed(side: Side, kind: UnitKind, placement: Placement) -> Response {
    Response::Placed {
        side,
        kind,
        unit: placement.id.as_u32(),
        x: placement.cell.x,
        y: placement.cell.y,
        lane_row: placement.lane_row,
    }
}

fn placement_response(side: Side, outcome: PlacementOutcome) -> Response {
    match outcome {
        PlacementOutcome::Placed { kind, placement } => placed(side, kind, placement),
        PlacementOutcome::Unrecognized(label) => Response::Rejected {
            side,
            reason: format!("Sketch not recognized: {label}"),
            kind: None,
        },
        PlacementOutcome::Rejected { kind, reason } => Response::Rejected {
            side,
            reason: reason.to_string(),
            kind: Some(kind),
        },
        PlacementOutcome::Failed(err) => Response::Rejected {
            side,
            reason: err.to_string(),
            kind: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sketchwar_core::math::Cell;
    use sketchwar_test_utils::fixtures::{fixed, open_battlefield};

    fn runner() -> HeadlessRunner {
        HeadlessRunner::new(open_battlefield(), RunnerConfig::default())
    }

    fn session(runner: &mut HeadlessRunner, input: &str) -> (Vec<Response>, SessionStats) {
        let mut output = Vec::new();
        let stats = runner.run(input.as_bytes(), &mut output).unwrap();
        let responses = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        (responses, stats)
    }

    #[test]
    fn test_session_place_frame_quit() {
        let mut runner = runner();
        let input = r#"{"cmd":"place","side":"left","kind":"soldier"}
{"cmd":"frame","count":3}
{"cmd":"quit"}
{"cmd":"query"}
"#;
        let (responses, stats) = session(&mut runner, input);

        assert_eq!(responses.len(), 4);
        assert_eq!(responses[0], Response::ready(30, 20, 1));
        assert_eq!(
            responses[1],
            Response::Placed {
                side: Side::Left,
                kind: UnitKind::Soldier,
                unit: 3,
                x: 1,
                y: 10,
                lane_row: Some(5),
            }
        );
        match &responses[2] {
            Response::State {
                tick,
                now_ms,
                units,
                bases,
                ..
            } => {
                assert_eq!(*tick, 3);
                assert_eq!(*now_ms, 300);
                assert_eq!(units.len(), 3);
                assert_eq!(bases.len(), 2);
                assert!(bases.iter().all(|base| base.percent == 100));
            }
            other => panic!("expected state, got {other:?}"),
        }
        assert_eq!(responses[3], Response::Bye);
        assert!(stats.quit);
        assert_eq!(stats.commands, 3);
    }

    #[test]
    fn test_parse_errors_do_not_end_session() {
        let mut runner = runner();
        let (responses, stats) = session(&mut runner, "not json\n\n{\"cmd\":\"query\"}\n");
        assert!(matches!(responses[1], Response::Error { cmd: None, .. }));
        assert!(matches!(responses[2], Response::State { .. }));
        assert_eq!(stats.parse_errors, 1);
        assert!(!stats.quit);
    }

    #[test]
    fn test_unknown_kind_is_an_error() {
        let mut runner = runner();
        let responses = runner.handle(Command::Place {
            side: Side::Left,
            kind: "dragon".to_string(),
        });
        assert!(matches!(
            &responses[0],
            Response::Error { cmd: Some(cmd), .. } if cmd == "place"
        ));
    }

    #[test]
    fn test_sketch_path_and_cooldown() {
        let mut runner = runner();
        let sketch = |side, text: &str| Command::Sketch {
            side,
            sketch: text.to_string(),
        };

        let responses = runner.handle(sketch(Side::Left, "Tank."));
        assert!(matches!(
            responses[0],
            Response::Placed {
                kind: UnitKind::Tank,
                ..
            }
        ));

        let responses = runner.handle(sketch(Side::Left, "soldier"));
        assert!(matches!(
            &responses[0],
            Response::Rejected { reason, kind: None, .. } if reason.contains("cooling down")
        ));

        let responses = runner.handle(sketch(Side::Right, ""));
        assert!(matches!(
            &responses[0],
            Response::Rejected { reason, .. } if reason == "Sketch is empty"
        ));

        let responses = runner.handle(sketch(Side::Right, "banana"));
        assert!(matches!(
            &responses[0],
            Response::Rejected { reason, kind: None, .. } if reason.contains("banana")
        ));

        runner.clock().advance(3000);
        let responses = runner.handle(sketch(Side::Left, "medic"));
        assert!(matches!(
            responses[0],
            Response::Placed {
                kind: UnitKind::Medic,
                ..
            }
        ));
    }

    #[test]
    fn test_fallen_base_reports_match_over_and_resets() {
        let mut runner = runner();
        let field = runner.controller_mut().battlefield_mut();
        let (base, _) = field.base(Side::Right).unwrap();
        field.unit_mut(base).unwrap().hp = fixed(50);
        field
            .spawn_at(UnitKind::Godzilla, Side::Left, Cell::new(27, 10))
            .unwrap();

        let responses = runner.handle(Command::Frame {
            count: 25,
            step_ms: None,
        });
        assert_eq!(responses.len(), 2);
        assert_eq!(
            responses[0],
            Response::MatchOver {
                winner: Side::Left,
                round: 1,
                tick: 20,
            }
        );
        match &responses[1] {
            Response::State {
                round,
                last_winner,
                units,
                ..
            } => {
                assert_eq!(*round, 2);
                assert_eq!(*last_winner, Some(Side::Left));
                assert_eq!(units.len(), 2);
            }
            other => panic!("expected state, got {other:?}"),
        }
    }

    #[test]
    fn test_auto_state_reports_every_frame() {
        let config = RunnerConfig {
            frame_ms: 250,
            auto_state: true,
        };
        let mut runner = HeadlessRunner::new(open_battlefield(), config);
        let responses = runner.handle(Command::Frame {
            count: 4,
            step_ms: None,
        });
        assert_eq!(responses.len(), 4);
        assert!(matches!(responses[3], Response::State { now_ms: 1000, .. }));
    }

    #[test]
    fn test_reset_clears_units() {
        let mut runner = runner();
        runner.handle(Command::Place {
            side: Side::Right,
            kind: "cannon".to_string(),
        });
        let responses = runner.handle(Command::Reset);
        assert!(matches!(&responses[0], Response::State { units, .. } if units.len() == 2));
    }

    #[test]
    fn test_reset_lets_both_sides_sketch_again() {
        let mut runner = runner();
        let sketch = |text: &str| Command::Sketch {
            side: Side::Left,
            sketch: text.to_string(),
        };
        runner.handle(sketch("tank"));
        runner.handle(Command::Reset);

        let responses = runner.handle(sketch("medic"));
        assert!(matches!(
            responses[0],
            Response::Placed {
                kind: UnitKind::Medic,
                ..
            }
        ));
    }
}
