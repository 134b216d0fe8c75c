//! Game engine - one game's authoritative state and its action intake
//!
//! The engine is synchronous and single-writer. Time only enters through the
//! `now` argument, so a caller (the game actor, or a test) decides when
//! deadlines fire.

use std::sync::Arc;
use std::time::Instant;

use super::action::Action;
use super::event::{Event, Notification};
use super::phase::Phase;
use super::player::{Player, Seat};
use super::state::{GameState, TurnState};
use crate::alliance::Negotiator;
use crate::combat::{self, Strengths};
use crate::core::config::GameConfig;
use crate::core::error::{EngineError, Result};
use crate::core::types::{GameId, MapId, PlayerId, TerritoryId};
use crate::map::{Map, Territory};
use crate::trade::TradeDesk;

/// Everything needed to create a game
#[derive(Debug, Clone)]
pub struct GameSetup {
    pub id: GameId,
    pub map_id: MapId,
    pub map: Arc<Map>,
    /// Initial territory records in id order, usually from the generator
    pub territories: Vec<Territory>,
    pub seats: Vec<Seat>,
    pub config: GameConfig,
    pub seed: u64,
}

/// One running game
#[derive(Debug)]
pub struct Game {
    pub(super) state: GameState,
    pub(super) map: Arc<Map>,
    pub(super) config: GameConfig,
    pub(super) battles: Negotiator,
    pub(super) trades: TradeDesk,
    /// When the simultaneous Trade phase closes on its own
    pub(super) trade_deadline: Option<Instant>,
}

impl Game {
    /// Create a game in TerritorySelection. Seats become players 1..=n.
    pub fn new(setup: GameSetup, now: Instant) -> Result<(Self, Vec<Notification>)> {
        setup.config.validate()?;

        let seats = setup.seats.len();
        if seats < usize::from(setup.config.min_players)
            || seats > usize::from(setup.config.max_players)
        {
            return Err(EngineError::Config(format!(
                "{seats} seats, need {} to {}",
                setup.config.min_players, setup.config.max_players
            )));
        }
        check_territories(&setup.map, &setup.territories)?;

        let players = setup
            .seats
            .into_iter()
            .zip(1u8..)
            .map(|(seat, i)| (PlayerId(i), Player::new(PlayerId(i), seat)))
            .collect();

        let state = GameState {
            id: setup.id,
            map_id: setup.map_id,
            phase: Phase::TerritorySelection,
            round: 1,
            players,
            territories: setup.territories,
            turn: TurnState::default(),
            seed: setup.seed,
            cards_drawn: 0,
        };

        let mut game = Self::from_parts(state, setup.map, setup.config);
        tracing::info!(game = %game.state.id, players = seats, "game created");

        let mut out = Vec::new();
        game.enter_phase(Phase::TerritorySelection, now, &mut out);
        Ok((game, out))
    }

    /// Rebuild a game from saved state.
    ///
    /// Battles and trade proposals are not saved; a restored Trade phase gets
    /// a fresh timer.
    pub fn restore(
        state: GameState,
        map: Arc<Map>,
        config: GameConfig,
        now: Instant,
    ) -> Result<Self> {
        config.validate()?;
        check_territories(&map, &state.territories)?;

        let mut game = Self::from_parts(state, map, config);
        if game.state.phase == Phase::Trade {
            game.trade_deadline = Some(now + game.config.trade_phase_timeout());
        }
        tracing::info!(game = %game.state.id, phase = %game.state.phase, "game restored");
        Ok(game)
    }

    fn from_parts(state: GameState, map: Arc<Map>, config: GameConfig) -> Self {
        Self {
            state,
            map,
            config,
            battles: Negotiator::new(),
            trades: TradeDesk::new(),
            trade_deadline: None,
        }
    }

    pub fn id(&self) -> GameId {
        self.state.id
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn map(&self) -> &Map {
        &self.map
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn negotiator(&self) -> &Negotiator {
        &self.battles
    }

    pub fn trades(&self) -> &TradeDesk {
        &self.trades
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn is_over(&self) -> bool {
        self.state.phase.is_ended()
    }

    /// Strengths the attacker would face right now, without allies or cards
    pub fn preview_attack(&self, attacker: PlayerId, target: TerritoryId) -> Result<Strengths> {
        combat::preview_attack(attacker, target, &self.state.territories)
    }

    /// Apply one player action.
    ///
    /// Deadlines at or before `now` fire first and their notifications lead
    /// the returned list, so a vote or trade arriving late sees the window
    /// already closed. After that every check runs before the first change,
    /// so a rejection leaves the game as the deadlines left it. Callers that
    /// must publish expiries even when the action is rejected call
    /// [`Game::on_deadline`] first.
    pub fn apply(
        &mut self,
        player: PlayerId,
        action: Action,
        now: Instant,
    ) -> Result<Vec<Notification>> {
        if self.is_over() {
            return Err(EngineError::GameOver);
        }
        let mut out = self.on_deadline(now);
        action.validate_shape()?;
        if !self.state.player(player)?.active {
            return Err(EngineError::PlayerInactive(player));
        }

        tracing::debug!(game = %self.state.id, %player, action = action.name(), "applying action");

        match action {
            Action::SelectTerritory { territory } => {
                self.select_territory(player, territory, now, &mut out)?
            }
            Action::PlaceStockpile { territory } => {
                self.place_stockpile(player, territory, now, &mut out)?
            }
            Action::ProposeTrade {
                to,
                offer,
                request,
                horse_destinations,
            } => self.propose_trade(player, to, offer, request, horse_destinations, &mut out)?,
            Action::RespondTrade {
                trade,
                accept,
                horse_destinations,
            } => self.respond_trade(player, trade, accept, horse_destinations, &mut out)?,
            Action::CancelTrade { trade } => self.cancel_trade(player, trade, &mut out)?,
            Action::MoveUnit {
                unit,
                from,
                to,
                water,
            } => self.move_unit(player, unit, from, to, water, &mut out)?,
            Action::EndPhase => self.end_phase(player, now, &mut out)?,
            Action::PlanAttack {
                target,
                reinforcement,
                cards,
            } => self.plan_attack(player, target, reinforcement, cards, now, &mut out)?,
            Action::ExecuteAttack { battle } => self.execute_attack(player, battle, &mut out)?,
            Action::CancelAttack { battle } => self.cancel_attack(player, battle, &mut out)?,
            Action::VoteAlliance { battle, side } => {
                self.vote_alliance(player, battle, side, &mut out)?
            }
            Action::SetAlliance { setting } => self.set_alliance(player, setting, &mut out)?,
            Action::Build {
                territory,
                improvement,
                payment,
                water,
            } => self.build(player, territory, improvement, payment, water, &mut out)?,
            Action::BuyCard => self.buy_card(player, &mut out)?,
            Action::SelectDefenseCards { battle, cards } => {
                self.select_defense_cards(player, battle, cards, &mut out)?
            }
            Action::Surrender => self.surrender(player, now, &mut out)?,
            Action::RenameTerritory { territory, name } => {
                self.rename_territory(player, territory, name, &mut out)?
            }
        }
        self.check_victory(&mut out);
        Ok(out)
    }

    /// Earliest moment `on_deadline` has work to do
    pub fn next_deadline(&self) -> Option<Instant> {
        if self.is_over() {
            return None;
        }
        let trade = self.trade_deadline.filter(|_| self.state.phase == Phase::Trade);
        match (trade, self.battles.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Fire every deadline at or before `now`
    pub fn on_deadline(&mut self, now: Instant) -> Vec<Notification> {
        let mut out = Vec::new();
        if self.is_over() {
            return out;
        }

        for id in self.battles.expire(now) {
            if let Ok(battle) = self.battles.get(id) {
                tracing::info!(battle = %id, "alliance window closed");
                if battle.is_ready() {
                    out.push(Notification::all(Event::BattleReady {
                        battle: id,
                        status: battle.status(),
                        allied: battle.allied_totals(),
                    }));
                }
            }
        }

        if self.state.phase == Phase::Trade && self.trade_deadline.is_some_and(|d| d <= now) {
            tracing::info!(game = %self.state.id, "trade phase timed out");
            let next = self.close_phase(&mut out);
            self.enter_phase(next, now, &mut out);
        }

        out
    }
}

fn check_territories(map: &Map, territories: &[Territory]) -> Result<()> {
    if territories.len() != map.territory_count() {
        return Err(EngineError::InvariantViolation(format!(
            "{} territory records for a map with {} territories",
            territories.len(),
            map.territory_count()
        )));
    }
    for (id, territory) in map.territory_ids().zip(territories) {
        if territory.id != id {
            return Err(EngineError::InvariantViolation(format!(
                "territory records out of order at {id}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alliance::{BattleStatus, Side};
    use crate::combat::BattleOutcome;
    use crate::core::types::{Cell, WaterBodyId};
    use crate::game::event::Event;
    use crate::game::state::UnitKind;
    use crate::rules::development::{Improvement, Payment};
    use crate::rules::stockpile::Stockpile;
    use crate::rules::territory_strength;
    use crate::trade::TradeBundle;
    use std::time::Duration;

    const P1: PlayerId = PlayerId(1);
    const P2: PlayerId = PlayerId(2);
    const P3: PlayerId = PlayerId(3);

    fn t(id: u16) -> TerritoryId {
        TerritoryId(id)
    }

    fn setup(map: Map, seats: usize, config: GameConfig) -> GameSetup {
        let names = [("Ann", "red"), ("Bo", "blue"), ("Cy", "green")];
        GameSetup {
            id: GameId::new(),
            map_id: MapId::new(),
            territories: map.blank_territories(),
            map: Arc::new(map),
            seats: names[..seats]
                .iter()
                .map(|(name, color)| Seat::human(*name, *color))
                .collect(),
            config,
            seed: 7,
        }
    }

    /// 1 2 3
    /// 4 5 6
    fn new_game(config: GameConfig, now: Instant) -> Game {
        let map = Map::from_rows(&[vec![1, 2, 3], vec![4, 5, 6]]).unwrap();
        Game::new(setup(map, 2, config), now).unwrap().0
    }

    /// Same map, three players: P1 holds 1 and 2, P2 holds 5 and 3, P3 holds
    /// 6 and 4. Conquest with P1 to move.
    fn three_player_conquest(now: Instant) -> Game {
        let map = Map::from_rows(&[vec![1, 2, 3], vec![4, 5, 6]]).unwrap();
        let mut game = Game::new(setup(map, 3, GameConfig::default()), now).unwrap().0;
        for (player, id) in [(P1, 1), (P2, 5), (P3, 6), (P1, 2), (P2, 3), (P3, 4)] {
            game.apply(player, Action::SelectTerritory { territory: t(id) }, now)
                .unwrap();
        }
        for (player, id) in [(P1, 1), (P2, 3), (P3, 4)] {
            game.apply(player, Action::PlaceStockpile { territory: t(id) }, now)
                .unwrap();
        }
        for _ in 0..2 {
            for player in [P1, P2, P3] {
                game.apply(player, Action::EndPhase, now).unwrap();
            }
        }
        assert_eq!(game.phase(), Phase::Conquest);
        assert_eq!(game.state().current_player(), Some(P1));
        game
    }

    /// ~ 1 ~ 4
    /// 2 1 3 4
    ///
    /// P1 holds 1, 2 and 4, P2 holds 3; stockpiles on 1 and 3. Returns the
    /// west and east lakes.
    fn lake_game(now: Instant) -> (Game, WaterBodyId, WaterBodyId) {
        let map = Map::from_rows(&[vec![0, 1, 0, 4], vec![2, 1, 3, 4]]).unwrap();
        let west = map.water_body_at(&Cell::new(0, 0)).unwrap();
        let east = map.water_body_at(&Cell::new(2, 0)).unwrap();
        let mut game = Game::new(setup(map, 2, GameConfig::default()), now).unwrap().0;
        for (player, id) in [(P1, 1), (P2, 3), (P1, 2), (P2, 4)] {
            game.apply(player, Action::SelectTerritory { territory: t(id) }, now)
                .unwrap();
        }
        game.state.territory_mut(t(4)).unwrap().owner = Some(P1);
        game.apply(P1, Action::PlaceStockpile { territory: t(1) }, now)
            .unwrap();
        game.apply(P2, Action::PlaceStockpile { territory: t(3) }, now)
            .unwrap();
        assert_eq!(game.phase(), Phase::Trade);
        (game, west, east)
    }

    fn attack(target: u16) -> Action {
        Action::PlanAttack {
            target: t(target),
            reinforcement: None,
            cards: Vec::new(),
        }
    }

    /// Claims odd ids for P1 and even ids for P2, stockpiles on 1 and 2
    fn game_in_trade(config: GameConfig, now: Instant) -> Game {
        let mut game = new_game(config, now);
        for id in 1..=6 {
            let player = if id % 2 == 1 { P1 } else { P2 };
            game.apply(player, Action::SelectTerritory { territory: t(id) }, now)
                .unwrap();
        }
        game.apply(P1, Action::PlaceStockpile { territory: t(1) }, now)
            .unwrap();
        game.apply(P2, Action::PlaceStockpile { territory: t(2) }, now)
            .unwrap();
        assert_eq!(game.phase(), Phase::Trade);
        game
    }

    fn finish_phase(game: &mut Game, now: Instant) {
        let phase = game.phase();
        if phase == Phase::Trade {
            for p in [P1, P2] {
                game.apply(p, Action::EndPhase, now).unwrap();
            }
        } else {
            while game.phase() == phase {
                let current = game.state().current_player().unwrap();
                game.apply(current, Action::EndPhase, now).unwrap();
            }
        }
    }

    #[test]
    fn test_selection_takes_turns() {
        let now = Instant::now();
        let mut game = new_game(GameConfig::default(), now);
        assert_eq!(game.state().current_player(), Some(P1));

        let err = game
            .apply(P2, Action::SelectTerritory { territory: t(1) }, now)
            .unwrap_err();
        assert!(matches!(err, EngineError::NotYourTurn(_)));

        game.apply(P1, Action::SelectTerritory { territory: t(1) }, now)
            .unwrap();
        let err = game
            .apply(P2, Action::SelectTerritory { territory: t(1) }, now)
            .unwrap_err();
        assert!(matches!(err, EngineError::AlreadyOwned(_)));
        assert_eq!(game.state().current_player(), Some(P2));
    }

    #[test]
    fn test_selection_then_stockpiles_then_trade() {
        let now = Instant::now();
        let game = game_in_trade(GameConfig::default(), now);
        assert_eq!(game.state().round, 1);
        assert_eq!(game.state().player(P1).unwrap().stockpile_territory, Some(t(1)));
        assert_eq!(game.state().current_player(), None);
    }

    #[test]
    fn test_trade_timer_ends_phase() {
        let now = Instant::now();
        let mut game = game_in_trade(GameConfig::default(), now);
        let deadline = game.next_deadline().unwrap();
        assert_eq!(deadline, now + Duration::from_secs(120));

        assert!(game.on_deadline(now + Duration::from_secs(10)).is_empty());
        let events = game.on_deadline(deadline);
        assert!(events.iter().any(|n| matches!(
            n.event,
            Event::PhaseChanged {
                phase: Phase::Shipment,
                ..
            }
        )));
        assert_eq!(game.phase(), Phase::Shipment);
    }

    #[test]
    fn test_failed_acceptance_changes_nothing() {
        let now = Instant::now();
        let mut game = game_in_trade(GameConfig::default(), now);
        game.state.player_mut(P1).unwrap().stockpile = Stockpile::gold(2);

        let offer = TradeBundle {
            resources: Stockpile::gold(2),
            ..Default::default()
        };
        let request = TradeBundle {
            resources: Stockpile::new(0, 0, 0, 3),
            ..Default::default()
        };
        game.apply(
            P1,
            Action::ProposeTrade {
                to: P2,
                offer,
                request,
                horse_destinations: Vec::new(),
            },
            now,
        )
        .unwrap();
        let id = game.trades().visible_to(P2).next().unwrap().id;

        let accept = Action::RespondTrade {
            trade: id,
            accept: true,
            horse_destinations: Vec::new(),
        };
        let err = game.apply(P2, accept.clone(), now).unwrap_err();
        assert!(matches!(err, EngineError::InsufficientResources(_)));
        assert_eq!(game.state().player(P1).unwrap().stockpile, Stockpile::gold(2));
        assert!(game.state().player(P2).unwrap().stockpile.is_empty());

        game.state.player_mut(P2).unwrap().stockpile = Stockpile::new(0, 0, 0, 3);
        game.apply(P2, accept.clone(), now).unwrap();
        assert_eq!(
            game.state().player(P1).unwrap().stockpile,
            Stockpile::new(0, 0, 0, 3)
        );
        assert_eq!(game.state().player(P2).unwrap().stockpile, Stockpile::gold(2));

        let err = game.apply(P2, accept, now).unwrap_err();
        assert!(matches!(err, EngineError::StaleTrade(_)));
    }

    #[test]
    fn test_conquest_seizes_stockpile() {
        let now = Instant::now();
        let mut game = game_in_trade(GameConfig::default(), now);
        game.state.player_mut(P2).unwrap().stockpile = Stockpile::gold(5);
        finish_phase(&mut game, now);
        finish_phase(&mut game, now);
        assert_eq!(game.phase(), Phase::Conquest);
        assert_eq!(game.state().current_player(), Some(P1));

        let preview = game.preview_attack(P1, t(2)).unwrap();
        assert_eq!((preview.attack, preview.defense), (3, 1));

        let events = game
            .apply(
                P1,
                Action::PlanAttack {
                    target: t(2),
                    reinforcement: None,
                    cards: Vec::new(),
                },
                now,
            )
            .unwrap();
        let battle = game.negotiator().pending_for(P1).unwrap().id;
        assert!(events
            .iter()
            .any(|n| matches!(n.event, Event::BattleReady { .. })));

        let err = game
            .apply(
                P1,
                Action::PlanAttack {
                    target: t(4),
                    reinforcement: None,
                    cards: Vec::new(),
                },
                now,
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::BattlePending(_)));

        game.apply(P1, Action::ExecuteAttack { battle }, now).unwrap();
        assert_eq!(game.state().territory(t(2)).unwrap().owner, Some(P1));
        assert_eq!(game.state().player(P1).unwrap().stockpile, Stockpile::gold(5));
        assert!(game.state().player(P2).unwrap().stockpile.is_empty());
        assert_eq!(game.state().player(P2).unwrap().stockpile_territory, None);

        let err = game.apply(P1, Action::ExecuteAttack { battle }, now).unwrap_err();
        assert!(matches!(err, EngineError::StaleBattle(_)));
    }

    #[test]
    fn test_city_victory_ends_game() {
        let now = Instant::now();
        let config = GameConfig {
            victory_cities: 1,
            ..Default::default()
        };
        let mut game = game_in_trade(config, now);
        game.state.player_mut(P1).unwrap().stockpile = Stockpile::gold(4);
        finish_phase(&mut game, now);
        finish_phase(&mut game, now);
        finish_phase(&mut game, now);
        assert_eq!(game.phase(), Phase::Development);
        assert_eq!(game.state().current_player(), Some(P1));

        let build = |territory| Action::Build {
            territory: t(territory),
            improvement: Improvement::City,
            payment: Payment::Resources,
            water: None,
        };
        let err = game.apply(P1, build(1), now).unwrap_err();
        assert!(matches!(err, EngineError::InsufficientResources(_)));
        assert_eq!(game.state().player(P1).unwrap().stockpile, Stockpile::gold(4));

        let events = game
            .apply(
                P1,
                Action::Build {
                    territory: t(1),
                    improvement: Improvement::City,
                    payment: Payment::Gold,
                    water: None,
                },
                now,
            )
            .unwrap();
        assert!(events
            .iter()
            .any(|n| n.event == Event::GameEnded { winner: Some(P1) }));

        let err = game.apply(P2, Action::Surrender, now).unwrap_err();
        assert!(matches!(err, EngineError::GameOver));
    }

    #[test]
    fn test_surrender_leaves_last_player_winner() {
        let now = Instant::now();
        let mut game = game_in_trade(GameConfig::default(), now);
        game.apply(P2, Action::Surrender, now).unwrap();

        assert_eq!(game.phase(), Phase::Ended { winner: Some(P1) });
        assert!(game.state().territories_of(P2).next().is_none());
        assert_eq!(game.next_deadline(), None);
    }

    #[test]
    fn test_development_skips_players_who_cannot_build() {
        let now = Instant::now();
        let mut game = game_in_trade(GameConfig::default(), now);
        game.state.player_mut(P2).unwrap().stockpile = Stockpile::new(1, 0, 1, 0);
        finish_phase(&mut game, now);
        finish_phase(&mut game, now);

        // P1 ends conquest, then P2; Development opens with P1 broke
        game.apply(P1, Action::EndPhase, now).unwrap();
        let events = game.apply(P2, Action::EndPhase, now).unwrap();
        assert!(events.iter().any(|n| n.event
            == Event::PhaseSkipped {
                player: P1,
                phase: Phase::Development
            }));
        assert_eq!(game.phase(), Phase::Development);
        assert_eq!(game.state().current_player(), Some(P2));
    }

    #[test]
    fn test_vote_after_window_counts_as_neutral() {
        let now = Instant::now();
        let mut game = three_player_conquest(now);
        game.apply(P1, attack(5), now).unwrap();
        let battle = game.negotiator().pending_for(P1).unwrap().id;

        let late = now + Duration::from_secs(90);
        let vote = Action::VoteAlliance {
            battle,
            side: Side::Attacker,
        };
        let err = game.apply(P3, vote, late).unwrap_err();
        assert_eq!(err.code(), "stale_battle");
        let status = game.negotiator().get(battle).unwrap().status();
        assert_eq!(status, BattleStatus::TimedOut);

        let events = game.apply(P1, Action::ExecuteAttack { battle }, late).unwrap();
        let result = events
            .iter()
            .find_map(|n| match &n.event {
                Event::BattleResolved { result } => Some(result.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!((result.attack, result.defense), (1, 1));
        assert_eq!(result.outcome, BattleOutcome::DefenderVictory);
        assert_eq!(game.state().territory(t(5)).unwrap().owner, Some(P2));
    }

    #[test]
    fn test_overdue_expiry_leads_the_next_action() {
        let now = Instant::now();
        let mut game = three_player_conquest(now);
        game.apply(P1, attack(5), now).unwrap();
        let battle = game.negotiator().pending_for(P1).unwrap().id;

        let late = now + Duration::from_secs(61);
        let events = game.apply(P1, Action::ExecuteAttack { battle }, late).unwrap();
        assert!(matches!(
            events[0].event,
            Event::BattleReady {
                status: BattleStatus::TimedOut,
                ..
            }
        ));
        assert!(events
            .iter()
            .any(|n| matches!(n.event, Event::BattleResolved { .. })));
    }

    #[test]
    fn test_trade_after_timer_meets_shipment() {
        let now = Instant::now();
        let mut game = game_in_trade(GameConfig::default(), now);
        game.state.player_mut(P1).unwrap().stockpile = Stockpile::gold(1);

        let late = now + Duration::from_secs(121);
        let propose = Action::ProposeTrade {
            to: P2,
            offer: TradeBundle {
                resources: Stockpile::gold(1),
                ..Default::default()
            },
            request: TradeBundle::default(),
            horse_destinations: Vec::new(),
        };
        let err = game.apply(P1, propose, late).unwrap_err();
        assert!(matches!(err, EngineError::WrongPhase(Phase::Shipment)));
        assert_eq!(game.phase(), Phase::Shipment);
        assert!(game.trades().is_empty());
    }

    #[test]
    fn test_surrendering_voter_releases_the_battle() {
        let now = Instant::now();
        let mut game = three_player_conquest(now);
        game.apply(P1, attack(5), now).unwrap();
        let battle = game.negotiator().pending_for(P1).unwrap().id;

        let events = game.apply(P3, Action::Surrender, now).unwrap();
        assert!(events.iter().any(|n| matches!(
            n.event,
            Event::BattleReady {
                status: BattleStatus::Resolved,
                ..
            }
        )));
        let ballot = game.negotiator().get(battle).unwrap().ballots[&P3];
        assert_eq!(ballot.side, Some(Side::Neutral));
    }

    #[test]
    fn test_second_city_rejected_strength_unchanged() {
        let now = Instant::now();
        let mut game = game_in_trade(GameConfig::default(), now);
        game.state.player_mut(P1).unwrap().stockpile = Stockpile::gold(8);
        for _ in 0..3 {
            finish_phase(&mut game, now);
        }
        assert_eq!(game.phase(), Phase::Development);
        assert_eq!(game.state().current_player(), Some(P1));

        let city = Action::Build {
            territory: t(1),
            improvement: Improvement::City,
            payment: Payment::Gold,
            water: None,
        };
        game.apply(P1, city.clone(), now).unwrap();
        let err = game.apply(P1, city.clone(), now).unwrap_err();
        assert_eq!(err.code(), "invalid_target");

        // Round 2 Production has nothing to place and passes on its own
        finish_phase(&mut game, now);
        assert_eq!(game.phase(), Phase::Trade);
        for _ in 0..3 {
            finish_phase(&mut game, now);
        }
        assert_eq!(game.state().round, 2);
        assert_eq!(game.phase(), Phase::Development);
        assert_eq!(game.state().current_player(), Some(P1));

        let before = territory_strength(game.state().territory(t(1)).unwrap());
        assert_eq!(before, 2);
        let err = game.apply(P1, city, now).unwrap_err();
        assert_eq!(err.code(), "already_built");
        let after = territory_strength(game.state().territory(t(1)).unwrap());
        assert_eq!(after, before);
        assert_eq!(game.state().player(P1).unwrap().stockpile, Stockpile::gold(4));
    }

    #[test]
    fn test_shipment_one_move_per_unit_kind() {
        let now = Instant::now();
        let (mut game, west, east) = lake_game(now);
        game.state.territory_mut(t(1)).unwrap().add_boat(west);
        finish_phase(&mut game, now);
        assert_eq!(game.phase(), Phase::Shipment);
        assert_eq!(game.state().current_player(), Some(P1));

        let ship = |unit: UnitKind, from: u16, to: u16, water: Option<WaterBodyId>| {
            Action::MoveUnit {
                unit,
                from: t(from),
                to: t(to),
                water,
            }
        };

        // 4 is P1's but only reachable through P2's 3
        let err = game
            .apply(P1, ship(UnitKind::Stockpile, 1, 4, None), now)
            .unwrap_err();
        assert_eq!(err.code(), "not_adjacent");
        game.apply(P1, ship(UnitKind::Stockpile, 1, 2, None), now)
            .unwrap();
        let err = game
            .apply(P1, ship(UnitKind::Stockpile, 2, 1, None), now)
            .unwrap_err();
        assert_eq!(err.code(), "already_used");
        assert_eq!(game.state().player(P1).unwrap().stockpile_territory, Some(t(2)));

        // The boat floats on the west lake, which 4 does not touch
        let err = game
            .apply(P1, ship(UnitKind::Boat, 1, 4, Some(east)), now)
            .unwrap_err();
        assert_eq!(err.code(), "invalid_target");
        let err = game
            .apply(P1, ship(UnitKind::Boat, 1, 4, Some(west)), now)
            .unwrap_err();
        assert_eq!(err.code(), "invalid_target");

        game.apply(P1, ship(UnitKind::Boat, 1, 2, Some(west)), now)
            .unwrap();
        assert_eq!(game.state().territory(t(1)).unwrap().total_boats(), 0);
        assert_eq!(game.state().territory(t(2)).unwrap().boats_in(west), 1);
        let err = game
            .apply(P1, ship(UnitKind::Boat, 2, 1, Some(west)), now)
            .unwrap_err();
        assert_eq!(err.code(), "already_used");
    }

    #[test]
    fn test_boat_on_two_lakes_needs_a_choice() {
        let now = Instant::now();
        let (mut game, west, east) = lake_game(now);
        game.state.player_mut(P1).unwrap().stockpile = Stockpile::new(0, 0, 0, 9);
        for _ in 0..3 {
            finish_phase(&mut game, now);
        }
        assert_eq!(game.phase(), Phase::Development);
        assert_eq!(game.state().current_player(), Some(P1));

        let boat = |territory: u16, water: Option<WaterBodyId>| Action::Build {
            territory: t(territory),
            improvement: Improvement::Boat,
            payment: Payment::Resources,
            water,
        };

        let err = game.apply(P1, boat(1, None), now).unwrap_err();
        assert_eq!(err.code(), "invalid_target");
        let err = game.apply(P1, boat(2, Some(east)), now).unwrap_err();
        assert_eq!(err.code(), "invalid_target");

        game.apply(P1, boat(1, Some(east)), now).unwrap();
        let shore = game.state().territory(t(1)).unwrap();
        assert_eq!((shore.boats_in(east), shore.boats_in(west)), (1, 0));

        // A single shore needs no choice
        game.apply(P1, boat(4, None), now).unwrap();
        assert_eq!(game.state().territory(t(4)).unwrap().boats_in(east), 1);
        assert_eq!(
            game.state().player(P1).unwrap().stockpile,
            Stockpile::new(0, 0, 0, 3)
        );
    }
}
