//! Action handlers - one method per action, validate then apply

use std::time::Instant;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::engine::Game;
use super::event::{Event, Notification};
use super::phase::Phase;
use super::shipment::Shipment;
use super::state::UnitKind;
use crate::alliance::{self, AllianceSetting, Battle, BattlePlan, BattleStatus, Side};
use crate::combat::{self, cards, AttackCard, DefenseCard, Reinforcement};
use crate::core::config::CombatMode;
use crate::core::error::{EngineError, Result};
use crate::core::types::{BattleId, PlayerId, TerritoryId, TradeId, WaterBodyId};
use crate::rules::development::{cost_of, pay, Improvement, Payment};
use crate::rules::stockpile::Stockpile;
use crate::trade::{settle, TradeBundle, TradeStatus};

impl Game {
    pub(super) fn select_territory(
        &mut self,
        player: PlayerId,
        territory: TerritoryId,
        now: Instant,
        out: &mut Vec<Notification>,
    ) -> Result<()> {
        self.require_phase(Phase::TerritorySelection)?;
        self.require_turn(player)?;
        if self.state.territory(territory)?.owner.is_some() {
            return Err(EngineError::AlreadyOwned(territory));
        }

        self.state.territory_mut(territory)?.owner = Some(player);
        out.push(Notification::all(Event::TerritoryClaimed { player, territory }));
        self.advance_turn(player, now, out);
        Ok(())
    }

    pub(super) fn place_stockpile(
        &mut self,
        player: PlayerId,
        territory: TerritoryId,
        now: Instant,
        out: &mut Vec<Notification>,
    ) -> Result<()> {
        self.require_phase(Phase::Production)?;
        self.require_turn(player)?;
        if self.state.player(player)?.stockpile_territory.is_some() {
            return Err(EngineError::AlreadyUsed("stockpile placement"));
        }
        self.state.owned(player, territory)?;

        self.state.player_mut(player)?.stockpile_territory = Some(territory);
        out.push(Notification::all(Event::StockpilePlaced { player, territory }));
        self.advance_turn(player, now, out);
        Ok(())
    }

    pub(super) fn propose_trade(
        &mut self,
        player: PlayerId,
        to: PlayerId,
        offer: TradeBundle,
        request: TradeBundle,
        horse_destinations: Vec<TerritoryId>,
        out: &mut Vec<Notification>,
    ) -> Result<()> {
        self.require_phase(Phase::Trade)?;
        if !self.state.player(to)?.active {
            return Err(EngineError::PlayerInactive(to));
        }

        let (id, superseded) = self
            .trades
            .propose(player, to, offer, request, horse_destinations)?;
        if let Some(prior) = superseded {
            out.push(Notification::pair(
                player,
                to,
                Event::TradeClosed {
                    trade: prior.id,
                    from: prior.from,
                    to: prior.to,
                    status: prior.status,
                },
            ));
        }
        let proposal = self.trades.get(id)?.clone();
        out.push(Notification::pair(player, to, Event::TradeProposed { proposal }));
        Ok(())
    }

    pub(super) fn respond_trade(
        &mut self,
        player: PlayerId,
        trade: TradeId,
        accept: bool,
        horse_destinations: Vec<TerritoryId>,
        out: &mut Vec<Notification>,
    ) -> Result<()> {
        let proposal = self.trades.get(trade)?.clone();
        self.require_phase(Phase::Trade)?;
        if proposal.to != player {
            return Err(EngineError::InvalidTarget(format!(
                "{trade} is not addressed to {player}"
            )));
        }

        if accept {
            let mut from_stock = self.state.player(proposal.from)?.stockpile;
            let mut to_stock = self.state.player(player)?.stockpile;
            settle(
                &proposal,
                &horse_destinations,
                &mut from_stock,
                &mut to_stock,
                &mut self.state.territories,
            )?;
            self.state.player_mut(proposal.from)?.stockpile = from_stock;
            self.state.player_mut(player)?.stockpile = to_stock;
        }

        let closed = self.trades.take_for_response(trade, player)?;
        let status = if accept {
            TradeStatus::Accepted
        } else {
            TradeStatus::Rejected
        };
        out.push(Notification::pair(
            closed.from,
            closed.to,
            Event::TradeClosed {
                trade,
                from: closed.from,
                to: closed.to,
                status,
            },
        ));
        Ok(())
    }

    pub(super) fn cancel_trade(
        &mut self,
        player: PlayerId,
        trade: TradeId,
        out: &mut Vec<Notification>,
    ) -> Result<()> {
        let proposal = self.trades.cancel(trade, player)?;
        out.push(Notification::pair(
            proposal.from,
            proposal.to,
            Event::TradeClosed {
                trade,
                from: proposal.from,
                to: proposal.to,
                status: proposal.status,
            },
        ));
        Ok(())
    }

    pub(super) fn move_unit(
        &mut self,
        player: PlayerId,
        unit: UnitKind,
        from: TerritoryId,
        to: TerritoryId,
        water: Option<WaterBodyId>,
        out: &mut Vec<Notification>,
    ) -> Result<()> {
        self.require_phase(Phase::Shipment)?;
        self.require_turn(player)?;
        if self.state.turn.shipped.contains(&unit) {
            return Err(EngineError::AlreadyUsed(unit.name()));
        }

        let shipment = Shipment {
            unit,
            from,
            to,
            water,
        };
        shipment.validate(player, &self.state, &self.map)?;
        shipment.apply(player, &mut self.state)?;
        self.state.turn.shipped.insert(unit);

        out.push(Notification::all(Event::UnitMoved {
            player,
            unit,
            from,
            to,
        }));
        Ok(())
    }

    pub(super) fn end_phase(
        &mut self,
        player: PlayerId,
        now: Instant,
        out: &mut Vec<Notification>,
    ) -> Result<()> {
        match self.state.phase {
            Phase::Trade => {
                if !self.state.turn.done.insert(player) {
                    return Err(EngineError::AlreadyUsed("end of trade"));
                }
                self.finish_trade_if_done(now, out);
                Ok(())
            }
            Phase::Shipment | Phase::Conquest | Phase::Development => {
                self.require_turn(player)?;
                if let Some(id) = self.battles.pending_for(player).map(|b| b.id) {
                    self.battles.remove(id)?;
                    out.push(Notification::all(Event::BattleCancelled { battle: id }));
                }
                self.advance_turn(player, now, out);
                Ok(())
            }
            phase @ (Phase::TerritorySelection | Phase::Production) => {
                Err(EngineError::WrongPhase(phase))
            }
            Phase::Ended { .. } => Err(EngineError::GameOver),
        }
    }

    pub(super) fn plan_attack(
        &mut self,
        player: PlayerId,
        target: TerritoryId,
        reinforcement: Option<Reinforcement>,
        attack_cards: Vec<AttackCard>,
        now: Instant,
        out: &mut Vec<Notification>,
    ) -> Result<()> {
        self.require_phase(Phase::Conquest)?;
        self.require_turn(player)?;
        if self.battles.pending_for(player).is_some() {
            return Err(EngineError::BattlePending(player));
        }
        let cards_on = self.config.combat_mode == CombatMode::Cards;
        if !attack_cards.is_empty() {
            if !cards_on {
                return Err(EngineError::CardsDisabled);
            }
            if !self.state.player(player)?.cards.holds_attack(&attack_cards) {
                return Err(EngineError::InsufficientResources(
                    "attack cards not in hand".into(),
                ));
            }
        }

        let territories = &self.state.territories;
        let base = combat::preview_attack(player, target, territories)?;
        if let Some(r) = &reinforcement {
            r.validate(player, target, territories, &self.map)?;
        }
        let defender = self.state.territory(target)?.owner;

        let plan = BattlePlan {
            attacker: player,
            defender,
            target,
            base,
            reinforcement,
            attack_cards,
        };
        let participants: Vec<(PlayerId, AllianceSetting)> = self
            .state
            .players
            .values()
            .filter(|p| p.active)
            .map(|p| (p.id, p.alliance))
            .collect();
        let candidates = alliance::candidates(&plan, territories, &participants);

        let defender_has_cards = match defender {
            Some(d) => !self.state.player(d)?.cards.defense.is_empty(),
            None => false,
        };
        let card_timeout =
            (cards_on && defender_has_cards).then(|| self.config.defense_card_timeout());

        let (id, requests) = self.battles.open(
            plan,
            &candidates,
            now,
            self.config.alliance_vote_timeout(),
            card_timeout,
        )?;

        out.push(Notification::all(Event::BattlePlanned {
            battle: id,
            attacker: player,
            defender,
            target,
            base,
            reinforcement,
        }));
        for request in requests {
            out.push(Notification::to(request.voter, Event::VoteRequested { request }));
        }
        if let (Some(defender), Some(timeout)) = (defender, card_timeout) {
            out.push(Notification::to(
                defender,
                Event::DefenseCardsRequested {
                    battle: id,
                    target,
                    timeout_secs: timeout.as_secs(),
                },
            ));
        }
        self.announce_if_ready(id, out);
        Ok(())
    }

    pub(super) fn execute_attack(
        &mut self,
        player: PlayerId,
        id: BattleId,
        out: &mut Vec<Notification>,
    ) -> Result<()> {
        let battle = self.battles.get(id)?;
        if battle.attacker != player {
            return Err(EngineError::InvalidTarget(format!("{id} is not {player}'s battle")));
        }
        if !battle.is_ready() {
            return Err(EngineError::BattleNotReady(id));
        }

        let mut engagement = battle.engagement();
        let defender = battle.defender;
        if !self.state.player(player)?.cards.holds_attack(&engagement.attack_cards) {
            return Err(EngineError::InsufficientResources(
                "attack cards not in hand".into(),
            ));
        }
        // A card spent in another battle meanwhile is void
        if let Some(d) = defender {
            if !self.state.player(d)?.cards.holds_defense(&engagement.defense_cards) {
                engagement.defense_cards.clear();
            }
        }

        let mut result = combat::resolve(
            &engagement,
            &mut self.state.territories,
            &self.map,
            &self.config,
        )?;
        self.battles.remove(id)?;

        self.state
            .player_mut(player)?
            .cards
            .spend_attack(&engagement.attack_cards);
        if let Some(d) = defender {
            self.state
                .player_mut(d)?
                .cards
                .spend_defense(&engagement.defense_cards);
        }

        if result.attacker_won() {
            if let Some(d) = defender {
                if self.state.player(d)?.stockpile_territory == Some(engagement.target) {
                    let mut loser = self.state.player(d)?.stockpile;
                    let mut winner = self.state.player(player)?.stockpile;
                    result.seized = combat::seize_stockpile(&mut loser, &mut winner);

                    let defender = self.state.player_mut(d)?;
                    defender.stockpile = loser;
                    defender.stockpile_territory = None;
                    self.state.player_mut(player)?.stockpile = winner;
                }
            }
        }

        tracing::info!(
            battle = %id,
            attacker = %player,
            target = %engagement.target,
            outcome = ?result.outcome,
            "battle executed"
        );
        out.push(Notification::all(Event::BattleResolved { result }));
        Ok(())
    }

    pub(super) fn cancel_attack(
        &mut self,
        player: PlayerId,
        id: BattleId,
        out: &mut Vec<Notification>,
    ) -> Result<()> {
        if self.battles.get(id)?.attacker != player {
            return Err(EngineError::InvalidTarget(format!("{id} is not {player}'s battle")));
        }
        self.battles.remove(id)?;
        out.push(Notification::all(Event::BattleCancelled { battle: id }));
        Ok(())
    }

    pub(super) fn vote_alliance(
        &mut self,
        player: PlayerId,
        id: BattleId,
        side: Side,
        out: &mut Vec<Notification>,
    ) -> Result<()> {
        self.battles.get_mut(id)?.vote(player, side)?;
        out.push(Notification::all(Event::VoteCast {
            battle: id,
            voter: player,
            side,
        }));
        self.announce_if_ready(id, out);
        Ok(())
    }

    pub(super) fn select_defense_cards(
        &mut self,
        player: PlayerId,
        id: BattleId,
        chosen: Vec<DefenseCard>,
        out: &mut Vec<Notification>,
    ) -> Result<()> {
        if self.config.combat_mode != CombatMode::Cards {
            return Err(EngineError::CardsDisabled);
        }
        if !self.state.player(player)?.cards.holds_defense(&chosen) {
            return Err(EngineError::InsufficientResources(
                "defense cards not in hand".into(),
            ));
        }
        self.battles.get_mut(id)?.choose_defense_cards(player, chosen)?;
        out.push(Notification::all(Event::DefenseCardsChosen { battle: id }));
        self.announce_if_ready(id, out);
        Ok(())
    }

    fn announce_if_ready(&self, id: BattleId, out: &mut Vec<Notification>) {
        if let Ok(battle) = self.battles.get(id) {
            if battle.is_ready() {
                out.push(Notification::all(Event::BattleReady {
                    battle: id,
                    status: battle.status(),
                    allied: battle.allied_totals(),
                }));
            }
        }
    }

    pub(super) fn set_alliance(
        &mut self,
        player: PlayerId,
        setting: AllianceSetting,
        out: &mut Vec<Notification>,
    ) -> Result<()> {
        if let AllianceSetting::Player(other) = setting {
            if other == player {
                return Err(EngineError::InvalidTarget("cannot side with yourself".into()));
            }
            self.state.player(other)?;
        }
        self.state.player_mut(player)?.alliance = setting;
        out.push(Notification::to(
            player,
            Event::AllianceSettingChanged { player, setting },
        ));
        Ok(())
    }

    pub(super) fn build(
        &mut self,
        player: PlayerId,
        territory: TerritoryId,
        improvement: Improvement,
        payment: Payment,
        water: Option<WaterBodyId>,
        out: &mut Vec<Notification>,
    ) -> Result<()> {
        self.require_phase(Phase::Development)?;
        self.require_turn(player)?;
        let t = self.state.owned(player, territory)?;
        if self.state.turn.built.contains(&territory) {
            return Err(EngineError::InvalidTarget(format!(
                "{territory} was already developed this round"
            )));
        }

        let shore = match improvement {
            Improvement::City if t.has_city => {
                return Err(EngineError::AlreadyBuilt {
                    territory,
                    what: "city",
                })
            }
            Improvement::Weapon if t.has_weapon => {
                return Err(EngineError::AlreadyBuilt {
                    territory,
                    what: "weapon",
                })
            }
            Improvement::Boat => Some(self.boat_shore(territory, water)?),
            _ => None,
        };

        let cost = cost_of(&self.config.costs, improvement, payment);
        let mut stock = self.state.player(player)?.stockpile;
        pay(&mut stock, &cost)?;

        self.state.player_mut(player)?.stockpile = stock;
        let t = self.state.territory_mut(territory)?;
        match (improvement, shore) {
            (Improvement::City, _) => t.has_city = true,
            (Improvement::Weapon, _) => t.has_weapon = true,
            (Improvement::Boat, Some(body)) => t.add_boat(body),
            (Improvement::Boat, None) => {}
        }
        self.state.turn.built.insert(territory);

        tracing::debug!(%player, %territory, %improvement, "built");
        out.push(Notification::all(Event::Built {
            player,
            territory,
            improvement,
        }));
        Ok(())
    }

    /// Water body a new boat launches into
    fn boat_shore(
        &self,
        territory: TerritoryId,
        water: Option<WaterBodyId>,
    ) -> Result<WaterBodyId> {
        let shores = self.map.shores(territory).cloned().unwrap_or_default();
        match water {
            Some(body) if shores.contains(&body) => Ok(body),
            Some(body) => Err(EngineError::InvalidTarget(format!(
                "{territory} does not border {body}"
            ))),
            None => {
                let mut iter = shores.iter();
                match (iter.next(), iter.next()) {
                    (None, _) => Err(EngineError::InvalidTarget(format!(
                        "{territory} is not coastal"
                    ))),
                    (Some(body), None) => Ok(*body),
                    (Some(_), Some(_)) => Err(EngineError::InvalidTarget(format!(
                        "{territory} borders several water bodies; choose one"
                    ))),
                }
            }
        }
    }

    pub(super) fn buy_card(
        &mut self,
        player: PlayerId,
        out: &mut Vec<Notification>,
    ) -> Result<()> {
        self.require_phase(Phase::Development)?;
        if self.config.combat_mode != CombatMode::Cards {
            return Err(EngineError::CardsDisabled);
        }
        self.require_turn(player)?;

        let mut stock = self.state.player(player)?.stockpile;
        pay(&mut stock, &Stockpile::gold(self.config.card_cost_gold))?;

        let seed = self.state.seed.wrapping_add(self.state.cards_drawn);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let card = cards::draw(&mut rng);
        self.state.cards_drawn += 1;

        let p = self.state.player_mut(player)?;
        p.stockpile = stock;
        p.cards.add(card);

        out.push(Notification::all(Event::CardBought { player }));
        out.push(Notification::to(player, Event::CardDrawn { card }));
        Ok(())
    }

    pub(super) fn surrender(
        &mut self,
        player: PlayerId,
        now: Instant,
        out: &mut Vec<Notification>,
    ) -> Result<()> {
        let was_current = self.state.turn.current == Some(player);

        let p = self.state.player_mut(player)?;
        p.active = false;
        p.stockpile_territory = None;
        for t in self.state.territories.iter_mut().filter(|t| t.is_owned_by(player)) {
            t.owner = None;
        }

        for proposal in self.trades.drop_player(player) {
            out.push(Notification::pair(
                proposal.from,
                proposal.to,
                Event::TradeClosed {
                    trade: proposal.id,
                    from: proposal.from,
                    to: proposal.to,
                    status: proposal.status,
                },
            ));
        }

        if let Some(id) = self.battles.pending_for(player).map(|b| b.id) {
            self.battles.remove(id)?;
            out.push(Notification::all(Event::BattleCancelled { battle: id }));
        }
        // Open ballots go neutral and open card windows close empty
        let waiting_on: Vec<BattleId> = self
            .battles
            .battles()
            .filter(|b| b.status() == BattleStatus::Voting)
            .filter(|b| b.awaiting().any(|p| p == player) || awaits_cards(b, player))
            .map(|b| b.id)
            .collect();
        for id in waiting_on {
            let battle = self.battles.get_mut(id)?;
            if battle.awaiting().any(|p| p == player) {
                battle.vote(player, Side::Neutral)?;
            }
            if awaits_cards(battle, player) {
                battle.choose_defense_cards(player, Vec::new())?;
            }
            self.announce_if_ready(id, out);
        }

        tracing::info!(game = %self.state.id, %player, "player surrendered");
        out.push(Notification::all(Event::PlayerSurrendered { player }));

        if self.check_victory(out) {
            return Ok(());
        }
        if self.state.phase == Phase::Trade {
            self.finish_trade_if_done(now, out);
        } else if was_current {
            self.advance_turn(player, now, out);
        }
        Ok(())
    }

    pub(super) fn rename_territory(
        &mut self,
        player: PlayerId,
        territory: TerritoryId,
        name: String,
        out: &mut Vec<Notification>,
    ) -> Result<()> {
        self.state.owned(player, territory)?;
        let name = name.trim().to_string();
        self.state.territory_mut(territory)?.name = name.clone();
        out.push(Notification::all(Event::TerritoryRenamed { territory, name }));
        Ok(())
    }
}

fn awaits_cards(battle: &Battle, player: PlayerId) -> bool {
    battle.defender == Some(player) && battle.defense_cards.is_none()
}
