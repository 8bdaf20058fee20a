//! Short-lived attack and heal visuals.
//!
//! The engine appends one [`CombatEffect`] per resolved action; the log ages
//! them out after a fixed duration so renderers only see what is in flight.

use serde::{Deserialize, Serialize};

use crate::math::{fixed_serde, Cell, Fixed};

/// What a combat effect depicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    /// Damage dealt.
    Attack,
    /// Hit points restored.
    Heal,
}

/// One in-flight attack or heal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatEffect {
    /// Attack or heal.
    pub kind: EffectKind,
    /// Cell of the acting unit.
    pub from: Cell,
    /// Cell of the target.
    pub to: Cell,
    /// Damage dealt or hit points restored.
    #[serde(with = "fixed_serde")]
    pub magnitude: Fixed,
    /// Engine time the action resolved.
    pub started_ms: u64,
}

impl CombatEffect {
    /// Milliseconds since the effect started.
    #[must_use]
    pub const fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.started_ms)
    }
}

/// Effects younger than the configured duration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectLog {
    effects: Vec<CombatEffect>,
    duration_ms: u64,
}

impl EffectLog {
    /// Empty log whose effects live for `duration_ms`.
    #[must_use]
    pub const fn new(duration_ms: u64) -> Self {
        Self {
            effects: Vec::new(),
            duration_ms,
        }
    }

    /// Record an effect.
    pub fn push(&mut self, effect: CombatEffect) {
        self.effects.push(effect);
    }

    /// Drop effects whose age has reached the duration.
    pub fn expire(&mut self, now_ms: u64) {
        let duration = self.duration_ms;
        self.effects.retain(|effect| effect.age_ms(now_ms) < duration);
    }

    /// Live effects, oldest first.
    #[must_use]
    pub fn active(&self) -> &[CombatEffect] {
        &self.effects
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.effects.clear();
    }

    /// Number of live effects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.effects.len()
    }

    /// Whether no effect is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}
