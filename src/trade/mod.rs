//! Trade negotiator - bilateral exchange of resources and horses
//!
//! A proposal sits on the desk until the recipient answers, the proposer
//! withdraws it, a newer proposal between the same pair replaces it, or the
//! Trade phase ends. Acceptance is one check-then-apply step: everything is
//! validated against current state before anything moves.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::core::error::{EngineError, Result};
use crate::core::types::{PlayerId, TerritoryId, TradeId};
use crate::map::{lookup, lookup_mut, Territory};
use crate::rules::development::pay;
use crate::rules::stockpile::Stockpile;

/// One side of a trade
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TradeBundle {
    #[serde(flatten)]
    pub resources: Stockpile,
    /// Territories of the giving party whose horse changes hands
    pub horse_sources: Vec<TerritoryId>,
}

impl TradeBundle {
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty() && self.horse_sources.is_empty()
    }

    pub fn horse_count(&self) -> usize {
        self.horse_sources.len()
    }
}

/// How a proposal left the desk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeStatus {
    Pending,
    Accepted,
    Rejected,
    /// Replaced by a newer proposal between the same pair
    Superseded,
    /// Withdrawn by the proposer or dropped at the end of the phase
    Cancelled,
}

/// A pending offer from one player to another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeProposal {
    pub id: TradeId,
    pub from: PlayerId,
    pub to: PlayerId,
    pub offer: TradeBundle,
    pub request: TradeBundle,
    /// Where the proposer puts horses it receives, one per requested horse
    pub from_destinations: Vec<TerritoryId>,
    pub status: TradeStatus,
}

impl TradeProposal {
    pub fn involves(&self, player: PlayerId) -> bool {
        self.from == player || self.to == player
    }
}

fn distinct(ids: &[TerritoryId]) -> bool {
    ids.iter().collect::<BTreeSet<_>>().len() == ids.len()
}

/// Reject shapes that could never settle
fn check_shape(
    offer: &TradeBundle,
    request: &TradeBundle,
    destinations: &[TerritoryId],
) -> Result<()> {
    if offer.is_empty() && request.is_empty() {
        return Err(EngineError::Malformed("trade exchanges nothing".into()));
    }
    let named = offer
        .horse_sources
        .iter()
        .chain(&request.horse_sources)
        .chain(destinations);
    if let Some(id) = named.into_iter().find(|id| id.index().is_none()) {
        return Err(EngineError::Malformed(format!("{id} names no land")));
    }
    if !distinct(&offer.horse_sources) || !distinct(&request.horse_sources) {
        return Err(EngineError::Malformed("horse sources repeat".into()));
    }
    if destinations.len() != request.horse_count() || !distinct(destinations) {
        return Err(EngineError::Malformed(format!(
            "need {} distinct horse destinations, got {}",
            request.horse_count(),
            destinations.len()
        )));
    }
    Ok(())
}

fn check_horses_out(
    giver: PlayerId,
    sources: &[TerritoryId],
    territories: &[Territory],
) -> Result<()> {
    for id in sources {
        let t = lookup(territories, *id).ok_or(EngineError::UnknownTerritory(*id))?;
        if !t.is_owned_by(giver) {
            return Err(EngineError::NotOwner(*id));
        }
        if !t.has_horse {
            return Err(EngineError::InsufficientResources(format!("{id} has no horse")));
        }
    }
    Ok(())
}

/// Destinations must belong to the receiver and be free of horses once
/// the receiver's own outgoing horses have left
fn check_horses_in(
    receiver: PlayerId,
    destinations: &[TerritoryId],
    outgoing: &[TerritoryId],
    territories: &[Territory],
) -> Result<()> {
    for id in destinations {
        let t = lookup(territories, *id).ok_or(EngineError::UnknownTerritory(*id))?;
        if !t.is_owned_by(receiver) {
            return Err(EngineError::NotOwner(*id));
        }
        if t.has_horse && !outgoing.contains(id) {
            return Err(EngineError::AlreadyBuilt {
                territory: *id,
                what: "horse",
            });
        }
    }
    Ok(())
}

/// Apply an accepted trade atomically.
///
/// `to_destinations` places the horses the recipient gets. Nothing changes
/// unless every transfer can happen.
pub fn settle(
    proposal: &TradeProposal,
    to_destinations: &[TerritoryId],
    from_stock: &mut Stockpile,
    to_stock: &mut Stockpile,
    territories: &mut [Territory],
) -> Result<()> {
    let (offer, request) = (&proposal.offer, &proposal.request);

    if to_destinations.len() != offer.horse_count() || !distinct(to_destinations) {
        return Err(EngineError::Malformed(format!(
            "need {} distinct horse destinations, got {}",
            offer.horse_count(),
            to_destinations.len()
        )));
    }

    // Validate everything on copies first
    let mut from_after = *from_stock;
    let mut to_after = *to_stock;
    pay(&mut from_after, &offer.resources)?;
    pay(&mut to_after, &request.resources)?;
    check_horses_out(proposal.from, &offer.horse_sources, territories)?;
    check_horses_out(proposal.to, &request.horse_sources, territories)?;
    check_horses_in(proposal.to, to_destinations, &request.horse_sources, territories)?;
    check_horses_in(
        proposal.from,
        &proposal.from_destinations,
        &offer.horse_sources,
        territories,
    )?;

    from_after.merge(&request.resources);
    to_after.merge(&offer.resources);
    *from_stock = from_after;
    *to_stock = to_after;

    for id in offer.horse_sources.iter().chain(&request.horse_sources) {
        if let Some(t) = lookup_mut(territories, *id) {
            t.has_horse = false;
        }
    }
    for id in to_destinations.iter().chain(&proposal.from_destinations) {
        if let Some(t) = lookup_mut(territories, *id) {
            t.has_horse = true;
        }
    }

    tracing::info!(
        trade = %proposal.id,
        from = %proposal.from,
        to = %proposal.to,
        "trade completed"
    );
    Ok(())
}

/// All open proposals in one game
#[derive(Debug, Default)]
pub struct TradeDesk {
    proposals: BTreeMap<TradeId, TradeProposal>,
    next_id: u32,
}

impl TradeDesk {
    pub fn new() -> Self {
        Self::default()
    }

    /// Post a proposal, replacing any unanswered one for the same ordered pair.
    ///
    /// Returns the new id and the proposal it replaced.
    pub fn propose(
        &mut self,
        from: PlayerId,
        to: PlayerId,
        offer: TradeBundle,
        request: TradeBundle,
        from_destinations: Vec<TerritoryId>,
    ) -> Result<(TradeId, Option<TradeProposal>)> {
        if from == to {
            return Err(EngineError::InvalidTarget("cannot trade with yourself".into()));
        }
        check_shape(&offer, &request, &from_destinations)?;

        let prior = self
            .proposals
            .values()
            .find(|p| p.from == from && p.to == to)
            .map(|p| p.id);
        let superseded = prior.and_then(|id| self.proposals.remove(&id)).map(|mut p| {
            p.status = TradeStatus::Superseded;
            p
        });

        self.next_id += 1;
        let id = TradeId(self.next_id);
        self.proposals.insert(
            id,
            TradeProposal {
                id,
                from,
                to,
                offer,
                request,
                from_destinations,
                status: TradeStatus::Pending,
            },
        );
        Ok((id, superseded))
    }

    pub fn get(&self, id: TradeId) -> Result<&TradeProposal> {
        self.proposals.get(&id).ok_or(EngineError::StaleTrade(id))
    }

    /// Remove a proposal addressed to `responder`
    pub fn take_for_response(&mut self, id: TradeId, responder: PlayerId) -> Result<TradeProposal> {
        if self.get(id)?.to != responder {
            return Err(EngineError::InvalidTarget(format!(
                "{id} is not addressed to {responder}"
            )));
        }
        self.proposals.remove(&id).ok_or(EngineError::StaleTrade(id))
    }

    /// Withdraw a proposal; only its proposer may
    pub fn cancel(&mut self, id: TradeId, by: PlayerId) -> Result<TradeProposal> {
        if self.get(id)?.from != by {
            return Err(EngineError::InvalidTarget(format!("{id} was not proposed by {by}")));
        }
        let mut proposal = self.proposals.remove(&id).ok_or(EngineError::StaleTrade(id))?;
        proposal.status = TradeStatus::Cancelled;
        Ok(proposal)
    }

    /// Proposals a player can see
    pub fn visible_to(&self, player: PlayerId) -> impl Iterator<Item = &TradeProposal> {
        self.proposals.values().filter(move |p| p.involves(player))
    }

    /// Cancel everything, at the end of the Trade phase
    pub fn drain(&mut self) -> Vec<TradeProposal> {
        std::mem::take(&mut self.proposals)
            .into_values()
            .map(|mut p| {
                p.status = TradeStatus::Cancelled;
                p
            })
            .collect()
    }

    /// Drop proposals involving a player who left
    pub fn drop_player(&mut self, player: PlayerId) -> Vec<TradeProposal> {
        let ids: Vec<TradeId> = self.visible_to(player).map(|p| p.id).collect();
        ids.into_iter()
            .filter_map(|id| self.proposals.remove(&id))
            .map(|mut p| {
                p.status = TradeStatus::Cancelled;
                p
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.proposals.is_empty()
    }
}
