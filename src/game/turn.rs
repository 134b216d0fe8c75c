//! Phase and turn flow - who acts next, when a phase closes, who has won

use std::time::Instant;

use super::engine::Game;
use super::event::{Event, Notification};
use super::phase::Phase;
use crate::core::config::CombatMode;
use crate::core::error::{EngineError, Result};
use crate::core::types::PlayerId;
use crate::rules::development::{cost_of, Improvement, Payment};
use crate::rules::production::{tick_production, YieldKind};
use crate::rules::stockpile::Stockpile;

impl Game {
    pub(super) fn require_phase(&self, expected: Phase) -> Result<()> {
        if self.state.phase != expected {
            return Err(EngineError::WrongPhase(self.state.phase));
        }
        Ok(())
    }

    pub(super) fn require_turn(&self, player: PlayerId) -> Result<()> {
        if self.state.turn.current != Some(player) {
            return Err(EngineError::NotYourTurn(player));
        }
        Ok(())
    }

    /// Enter `phase`, skipping forward through any phase nobody can act in
    pub(super) fn enter_phase(&mut self, phase: Phase, now: Instant, out: &mut Vec<Notification>) {
        let mut phase = phase;
        loop {
            self.state.phase = phase;
            self.state.turn.current = None;
            self.state.turn.done.clear();
            self.state.turn.shipped.clear();
            if phase == Phase::Development {
                self.state.turn.built.clear();
            }

            tracing::info!(
                game = %self.state.id,
                %phase,
                round = self.state.round,
                "phase started"
            );

            if phase == Phase::Trade {
                self.trade_deadline = Some(now + self.config.trade_phase_timeout());
                out.push(Notification::all(Event::PhaseChanged {
                    phase,
                    round: self.state.round,
                    current: None,
                }));
                return;
            }

            let yields = (phase == Phase::Production && self.state.round > 1)
                .then(|| self.produce());

            let (skipped, current) = self.pick_turn(None);
            out.push(Notification::all(Event::PhaseChanged {
                phase,
                round: self.state.round,
                current,
            }));
            if let Some(yields) = yields {
                out.push(Notification::all(Event::ProductionApplied { yields }));
            }
            self.announce_skips(skipped, out);

            if let Some(player) = current {
                self.state.turn.current = Some(player);
                out.push(Notification::all(Event::TurnChanged { player }));
                return;
            }
            phase = self.close_phase(out);
        }
    }

    /// End `player`'s turn and hand it to the next player who can act
    pub(super) fn advance_turn(
        &mut self,
        player: PlayerId,
        now: Instant,
        out: &mut Vec<Notification>,
    ) {
        if self.state.phase != Phase::TerritorySelection {
            self.state.turn.done.insert(player);
        }
        self.state.turn.current = None;
        self.state.turn.shipped.clear();

        let (skipped, next) = self.pick_turn(Some(player));
        self.announce_skips(skipped, out);
        match next {
            Some(next) => {
                self.state.turn.current = Some(next);
                out.push(Notification::all(Event::TurnChanged { player: next }));
            }
            None => {
                let phase = self.close_phase(out);
                self.enter_phase(phase, now, out);
            }
        }
    }

    /// Close the Trade phase once every active player has ended it
    pub(super) fn finish_trade_if_done(&mut self, now: Instant, out: &mut Vec<Notification>) {
        if self.state.phase != Phase::Trade {
            return;
        }
        let done = &self.state.turn.done;
        if self.state.active_players().all(|p| done.contains(&p)) {
            let phase = self.close_phase(out);
            self.enter_phase(phase, now, out);
        }
    }

    /// Next player after `after` who has something to do, in this round's order.
    ///
    /// Players passed over are returned and, outside selection, marked done.
    fn pick_turn(&mut self, after: Option<PlayerId>) -> (Vec<PlayerId>, Option<PlayerId>) {
        let order = self.state.turn_order();
        if order.is_empty() {
            return (Vec::new(), None);
        }
        let start = after
            .and_then(|a| order.iter().position(|p| *p == a))
            .map_or(0, |i| i + 1);

        let mut skipped = Vec::new();
        for k in 0..order.len() {
            let player = order[(start + k) % order.len()];
            if self.state.turn.done.contains(&player) {
                continue;
            }
            if self.has_legal_action(player) {
                return (skipped, Some(player));
            }
            if self.state.phase != Phase::TerritorySelection {
                self.state.turn.done.insert(player);
                skipped.push(player);
            }
        }
        (skipped, None)
    }

    fn announce_skips(&self, skipped: Vec<PlayerId>, out: &mut Vec<Notification>) {
        for player in skipped {
            tracing::debug!(%player, phase = %self.state.phase, "turn skipped");
            out.push(Notification::all(Event::PhaseSkipped {
                player,
                phase: self.state.phase,
            }));
        }
    }

    /// Tear down the current phase and return the one that follows
    pub(super) fn close_phase(&mut self, out: &mut Vec<Notification>) -> Phase {
        match self.state.phase {
            Phase::Trade => {
                self.trade_deadline = None;
                self.cancel_trades(out);
            }
            Phase::Conquest => self.cancel_battles(out),
            Phase::Development => self.state.round += 1,
            _ => {}
        }
        self.state.turn.current = None;
        self.state.phase.next()
    }

    pub(super) fn cancel_trades(&mut self, out: &mut Vec<Notification>) {
        for p in self.trades.drain() {
            out.push(Notification::pair(
                p.from,
                p.to,
                Event::TradeClosed {
                    trade: p.id,
                    from: p.from,
                    to: p.to,
                    status: p.status,
                },
            ));
        }
    }

    pub(super) fn cancel_battles(&mut self, out: &mut Vec<Notification>) {
        for battle in self.battles.drain() {
            out.push(Notification::all(Event::BattleCancelled { battle: battle.id }));
        }
    }

    /// Passive production for every owned territory, credited to owners
    fn produce(&mut self) -> Vec<crate::rules::production::Yield> {
        let yields = tick_production(&mut self.state.territories);
        for y in &yields {
            if let YieldKind::Resource { resource, amount } = y.kind {
                if let Some(player) = self.state.players.get_mut(&y.owner) {
                    player.stockpile.add(resource, amount);
                }
            }
        }
        tracing::debug!(round = self.state.round, yields = yields.len(), "production applied");
        yields
    }

    /// Whether `player` has anything to do in the current phase
    pub(super) fn has_legal_action(&self, player: PlayerId) -> bool {
        let state = &self.state;
        let Ok(p) = state.player(player) else {
            return false;
        };
        if !p.active {
            return false;
        }

        match state.phase {
            Phase::TerritorySelection => state.unclaimed().next().is_some(),
            Phase::Production => {
                p.stockpile_territory.is_none() && state.territories_of(player).next().is_some()
            }
            Phase::Trade => true,
            Phase::Shipment => {
                let owned: Vec<_> = state.territories_of(player).collect();
                owned.len() > 1
                    && (p.stockpile_territory.is_some()
                        || owned.iter().any(|t| t.has_horse || t.total_boats() > 0))
            }
            Phase::Conquest => state.territories_of(player).any(|t| {
                t.adjacent.iter().any(|n| {
                    state
                        .territory(*n)
                        .is_ok_and(|other| !other.is_owned_by(player))
                })
            }),
            Phase::Development => self.can_develop(player, &p.stockpile),
            Phase::Ended { .. } => false,
        }
    }

    fn can_develop(&self, player: PlayerId, stock: &Stockpile) -> bool {
        let costs = &self.config.costs;
        let affordable = |improvement| {
            [Payment::Resources, Payment::Gold]
                .into_iter()
                .any(|payment| stock.covers(&cost_of(costs, improvement, payment)))
        };

        let buildable = self
            .state
            .territories_of(player)
            .filter(|t| !self.state.turn.built.contains(&t.id))
            .any(|t| {
                (!t.has_city && affordable(Improvement::City))
                    || (!t.has_weapon && affordable(Improvement::Weapon))
                    || (self.map.is_coastal(t.id) && affordable(Improvement::Boat))
            });
        let card = self.config.combat_mode == CombatMode::Cards
            && stock.gold >= self.config.card_cost_gold;

        buildable || card
    }

    /// End the game if someone has won. Returns true if the game is over.
    pub(super) fn check_victory(&mut self, out: &mut Vec<Notification>) -> bool {
        if self.is_over() {
            return true;
        }
        let active: Vec<PlayerId> = self.state.active_players().collect();

        let by_cities = active
            .iter()
            .copied()
            .find(|p| self.state.city_count(*p) >= self.config.victory_cities);
        if let Some(winner) = by_cities {
            self.end_game(Some(winner), out);
            return true;
        }

        if self.state.phase != Phase::TerritorySelection {
            let holders: Vec<PlayerId> = active
                .iter()
                .copied()
                .filter(|p| self.state.territories_of(*p).next().is_some())
                .collect();
            if holders.len() <= 1 {
                self.end_game(holders.first().copied(), out);
                return true;
            }
        }

        if active.len() <= 1 {
            self.end_game(active.first().copied(), out);
            return true;
        }
        false
    }

    fn end_game(&mut self, winner: Option<PlayerId>, out: &mut Vec<Notification>) {
        self.cancel_battles(out);
        self.cancel_trades(out);
        self.trade_deadline = None;

        let phase = Phase::Ended { winner };
        self.state.phase = phase;
        self.state.turn.current = None;

        tracing::info!(game = %self.state.id, ?winner, round = self.state.round, "game ended");
        out.push(Notification::all(Event::PhaseChanged {
            phase,
            round: self.state.round,
            current: None,
        }));
        out.push(Notification::all(Event::GameEnded { winner }));
    }
}
