//! Contract with the sketch classification service.
//!
//! A side submits a sketch image; the service answers with one label. The
//! request carries fixed instruction text listing every valid label, and
//! the answer is matched leniently against the known set. Anything else
//! means no placement is attempted.

use thiserror::Error;

use crate::unit::Side;
use crate::unit_kind::UnitKind;

/// Label the service returns when it cannot tell what was drawn.
pub const UNKNOWN_LABEL: &str = "unknown";

/// Why a sketch did not reach or came back from the classifier unusable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassificationError {
    /// Nothing was drawn.
    #[error("Sketch is empty")]
    EmptySketch,

    /// The side submitted again before its cooldown ran out.
    #[error("Placement cooling down, {remaining_ms} ms left")]
    CoolingDown {
        /// Milliseconds until the side may submit again.
        remaining_ms: u64,
    },

    /// The service failed or answered with something unusable.
    #[error("Classification service failed: {0}")]
    Service(String),
}

/// One-line description of what a sketch of `kind` looks like.
const fn sketch_hint(kind: UnitKind) -> &'static str {
    match kind {
        UnitKind::Base => "the player's headquarters",
        UnitKind::Wall => "a wall, fence or barricade",
        UnitKind::Ufo => "a flying saucer",
        UnitKind::Soldier => "a person, stick figure or simple human shape",
        UnitKind::Tank => "an armored vehicle or tank",
        UnitKind::Plane => "an airplane or fighter jet",
        UnitKind::Cannon => "an artillery piece or cannon",
        UnitKind::Godzilla => "a giant monster or dinosaur",
        UnitKind::Cavalry => "a rider on a horse",
        UnitKind::Medic => "a medic, nurse or red cross",
        UnitKind::Gundam => "a giant robot or mech",
    }
}

/// Instruction text sent with every sketch.
#[must_use]
pub fn instructions() -> String {
    let mut text = String::from(
        "You are the unit recognizer of a sketch battle game. \
         Classify the player's drawing as exactly one of these units:\n",
    );
    for kind in UnitKind::SKETCHABLE {
        text.push_str("- ");
        text.push_str(kind.label());
        text.push_str(": ");
        text.push_str(sketch_hint(kind));
        text.push('\n');
    }
    text.push_str("Reply with the unit label only, without any explanation. ");
    text.push_str("If the drawing matches none of them, reply \"");
    text.push_str(UNKNOWN_LABEL);
    text.push_str("\".");
    text
}

/// A sketch ready to send to the classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationRequest {
    /// Side that drew the sketch.
    pub side: Side,
    /// Encoded image snapshot.
    pub image: Vec<u8>,
    /// Instruction text listing the valid labels.
    pub instructions: String,
}

impl ClassificationRequest {
    /// Build a request for `side`'s sketch.
    ///
    /// # Errors
    ///
    /// [`ClassificationError::EmptySketch`] when `image` has no bytes.
    pub fn new(side: Side, image: Vec<u8>) -> Result<Self, ClassificationError> {
        if image.is_empty() {
            return Err(ClassificationError::EmptySketch);
        }
        Ok(Self {
            side,
            image,
            instructions: instructions(),
        })
    }
}

/// The service that turns a sketch into a label.
pub trait Classifier {
    /// Classify one sketch.
    ///
    /// # Errors
    ///
    /// [`ClassificationError::Service`] when the service cannot answer.
    fn classify(&mut self, request: &ClassificationRequest) -> Result<String, ClassificationError>;
}

/// Map a classifier answer to a placeable kind.
///
/// The label is trimmed, stripped of surrounding quotes and a trailing
/// period, and compared case-insensitively. Bases and the unknown label
/// yield `None`.
#[must_use]
pub fn interpret_label(label: &str) -> Option<UnitKind> {
    let cleaned = label
        .trim()
        .trim_end_matches('.')
        .trim_matches(|c| c == '"' || c == '\'')
        .trim();
    UnitKind::from_label(cleaned).filter(|kind| UnitKind::SKETCHABLE.contains(kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instructions_list_every_sketchable_label() {
        let text = instructions();
        for kind in UnitKind::SKETCHABLE {
            assert!(text.contains(&format!("- {}:", kind.label())), "missing {kind}");
        }
        assert!(!text.contains("- base:"));
        assert!(text.contains("\"unknown\""));
    }

    #[test]
    fn test_empty_sketch_is_rejected() {
        assert_eq!(
            ClassificationRequest::new(Side::Left, Vec::new()),
            Err(ClassificationError::EmptySketch)
        );
        let request = ClassificationRequest::new(Side::Right, vec![1, 2, 3]).unwrap();
        assert_eq!(request.side, Side::Right);
        assert_eq!(request.instructions, instructions());
    }

    #[test]
    fn test_interpret_label_is_lenient() {
        assert_eq!(interpret_label("tank"), Some(UnitKind::Tank));
        assert_eq!(interpret_label("  Soldier \n"), Some(UnitKind::Soldier));
        assert_eq!(interpret_label("\"plane\""), Some(UnitKind::Plane));
        assert_eq!(interpret_label("Medic."), Some(UnitKind::Medic));
    }

    #[test]
    fn test_interpret_label_rejects_unplaceable_answers() {
        assert_eq!(interpret_label("unknown"), None);
        assert_eq!(interpret_label(""), None);
        assert_eq!(interpret_label("base"), None);
        assert_eq!(interpret_label("a tank, probably"), None);
    }
}
