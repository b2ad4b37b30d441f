use arena_core::UpgradeKind;
use chess_core::has_legal_move;

use super::{AfterMove, Upgrade};

/// After a quiet move, the mover may move again at once. The ability then
/// recharges over the mover's next `recharge` moves.
///
/// A move qualifies when it gives no check, does not end the game, and the
/// mover still has a legal move afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtraTurn {
    recharge: u32,
    countdown: [u32; 2],
}

impl ExtraTurn {
    pub fn new(recharge: u32) -> Self {
        let recharge = recharge.max(1);
        Self {
            recharge,
            countdown: [recharge; 2],
        }
    }

    /// Own moves left before the ability is ready.
    pub fn countdown(&self, color: chess_core::Color) -> u32 {
        self.countdown[color.idx()]
    }
}

impl Upgrade for ExtraTurn {
    fn kind(&self) -> UpgradeKind {
        UpgradeKind::ExtraTurn
    }

    fn after_move(&mut self, ctx: &mut AfterMove<'_>) {
        let left = &mut self.countdown[ctx.mover.idx()];
        if *left > 0 {
            *left -= 1;
            return;
        }
        if ctx.game_over || ctx.gives_check() {
            return;
        }
        let mut again = ctx.pos.clone();
        again.side_to_move = ctx.mover;
        again.en_passant = None;
        if !has_legal_move(&again) {
            return;
        }
        *ctx.pos = again;
        *left = self.recharge;
    }

    fn box_clone(&self) -> Box<dyn Upgrade> {
        Box::new(self.clone())
    }
}
