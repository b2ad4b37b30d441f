use arena_core::UpgradeKind;

use super::{AfterMove, Upgrade};

/// Credits the mover's clock whenever a move gives check.
///
/// The bonus is the initial time spread over `moves` moves, plus one
/// increment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckBonus {
    moves: u32,
}

impl CheckBonus {
    pub fn new(moves: u32) -> Self {
        Self {
            moves: moves.max(1),
        }
    }
}

impl Upgrade for CheckBonus {
    fn kind(&self) -> UpgradeKind {
        UpgradeKind::CheckBonus
    }

    fn after_move(&mut self, ctx: &mut AfterMove<'_>) {
        if ctx.gives_check() {
            let tc = ctx.time_control;
            ctx.bonus_ms += tc.initial_ms() / u64::from(self.moves) + tc.increment_ms();
        }
    }

    fn box_clone(&self) -> Box<dyn Upgrade> {
        Box::new(self.clone())
    }
}
