//! Squads and their formation.

use std::collections::BTreeSet;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::math::{centroid, Vec2Fixed};
use crate::pools::Pools;
use crate::snapshot::Tag;
use crate::unit_type::UnitTypeId;

/// Default members per general squad.
pub const DEFAULT_SQUAD_SIZE: usize = 8;

/// Support types never drafted into general squads.
pub const DEFAULT_BLACKLIST: &[UnitTypeId] = &[UnitTypeId::Overseer, UnitTypeId::Queen];

/// Tactical status of a squad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SquadStatus {
    /// Just formed, no orders yet.
    #[default]
    Idle,
    /// Travelling to the rally point.
    Move,
    /// Attacking a target.
    Attack,
    /// Redirected by the defend override.
    Defend,
    /// Falling back to the rally point.
    Retreat,
    /// Raiding or staging away from the main army.
    Scout,
}

/// Named sub-role. At most one squad per role exists at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SquadRole {
    /// Flying hit-and-run group.
    Harass,
    /// Home guard, exempt from the defend override.
    Reserve,
}

/// A group of combat units sharing one status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Squad {
    id: u32,
    members: Vec<Tag>,
    status: SquadStatus,
    role: Option<SquadRole>,
}

impl Squad {
    fn new(id: u32, members: Vec<Tag>, role: Option<SquadRole>) -> Self {
        Self {
            id,
            members,
            status: SquadStatus::Idle,
            role,
        }
    }

    /// Squad id, unique for the lifetime of the manager.
    #[must_use]
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// Member tags.
    #[must_use]
    pub fn members(&self) -> &[Tag] {
        &self.members
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> SquadStatus {
        self.status
    }

    /// Named role, if any.
    #[must_use]
    pub const fn role(&self) -> Option<SquadRole> {
        self.role
    }

    /// Change status, logging transitions.
    pub fn set_status(&mut self, status: SquadStatus) {
        if self.status != status {
            info!(
                target: "swarm_core::combat",
                squad = self.id,
                from = ?self.status,
                to = ?status,
                "squad status"
            );
            self.status = status;
        }
    }

    /// Mean position of the members still alive.
    #[must_use]
    pub fn centroid(&self, pools: &Pools) -> Option<Vec2Fixed> {
        centroid(
            self.members
                .iter()
                .filter_map(|t| pools.army.get(*t))
                .map(|c| c.unit.position),
        )
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Check if the squad has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Owns every squad and guarantees a unit is in at most one.
#[derive(Debug)]
pub struct SquadManager {
    squads: Vec<Squad>,
    next_id: u32,
    rng: ChaCha8Rng,
    squad_size: usize,
    blacklist: Vec<UnitTypeId>,
}

impl SquadManager {
    /// Create a manager with a seeded sampler.
    #[must_use]
    pub fn new(seed: u64, squad_size: usize) -> Self {
        Self {
            squads: Vec::new(),
            next_id: 1,
            rng: ChaCha8Rng::seed_from_u64(seed),
            squad_size: squad_size.max(1),
            blacklist: DEFAULT_BLACKLIST.to_vec(),
        }
    }

    /// Replace the support-type blacklist.
    #[must_use]
    pub fn with_blacklist(mut self, blacklist: Vec<UnitTypeId>) -> Self {
        self.blacklist = blacklist;
        self
    }

    /// Drop dead, scouting or duplicated members, then empty squads.
    pub fn resolve(&mut self, pools: &Pools) {
        let mut seen = BTreeSet::new();
        for squad in &mut self.squads {
            squad
                .members
                .retain(|t| pools.army.get(*t).is_some() && !pools.scouts.contains(*t) && seen.insert(*t));
        }
        self.squads.retain(|s| {
            if s.is_empty() {
                debug!(target: "swarm_core::combat", squad = s.id, "squad disbanded");
            }
            !s.is_empty()
        });
    }

    fn squadded(&self) -> BTreeSet<Tag> {
        self.squads.iter().flat_map(|s| s.members.iter().copied()).collect()
    }

    fn unsquadded(&self, pools: &Pools, accept: impl Fn(UnitTypeId) -> bool) -> Vec<Tag> {
        let taken = self.squadded();
        pools
            .army
            .iter()
            .filter(|c| accept(c.unit.unit_type))
            .map(|c| c.unit.tag)
            .filter(|t| !taken.contains(t) && !pools.scouts.contains(*t))
            .collect()
    }

    /// Group unsquadded, non-blacklisted units into general squads.
    ///
    /// Units are sampled without replacement. Leftovers top up an idle
    /// partial squad first, then form one final partial squad.
    pub fn form(&mut self, pools: &Pools) {
        let blacklist = self.blacklist.clone();
        let mut free = self.unsquadded(pools, |t| !blacklist.contains(&t));
        if free.is_empty() {
            return;
        }
        free.shuffle(&mut self.rng);

        let size = self.squad_size;
        if let Some(partial) = self.squads.iter_mut().find(|s| {
            s.role.is_none() && s.status == SquadStatus::Idle && s.len() < size
        }) {
            let take = (size - partial.len()).min(free.len());
            partial.members.extend(free.drain(..take));
        }

        for chunk in free.chunks(size) {
            self.create(chunk.to_vec(), None);
        }
    }

    /// Form or top up the squad for `role` from unsquadded `unit_type` units.
    ///
    /// The role squad holds at most `size` units and is only created once
    /// `size` are free. Returns the role squad's id if one exists afterwards.
    pub fn form_role(
        &mut self,
        role: SquadRole,
        unit_type: UnitTypeId,
        size: usize,
        pools: &Pools,
    ) -> Option<u32> {
        let mut free = self.unsquadded(pools, |t| t == unit_type);
        if let Some(squad) = self.squads.iter_mut().find(|s| s.role == Some(role)) {
            free.truncate(size.saturating_sub(squad.len()));
            squad.members.extend(free);
            return Some(squad.id);
        }
        if size == 0 || free.len() < size {
            return None;
        }
        free.truncate(size);
        Some(self.create(free, Some(role)))
    }

    fn create(&mut self, members: Vec<Tag>, role: Option<SquadRole>) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        info!(
            target: "swarm_core::combat",
            squad = id,
            size = members.len(),
            ?role,
            "squad formed"
        );
        self.squads.push(Squad::new(id, members, role));
        id
    }

    /// All squads in creation order.
    #[must_use]
    pub fn squads(&self) -> &[Squad] {
        &self.squads
    }

    /// Mutable access to all squads.
    pub fn squads_mut(&mut self) -> &mut [Squad] {
        &mut self.squads
    }

    /// Look up a squad.
    #[must_use]
    pub fn get(&self, id: u32) -> Option<&Squad> {
        self.squads.iter().find(|s| s.id == id)
    }

    /// The squad holding `role`.
    #[must_use]
    pub fn role_squad(&self, role: SquadRole) -> Option<&Squad> {
        self.squads.iter().find(|s| s.role == Some(role))
    }

    /// The squad `tag` belongs to.
    #[must_use]
    pub fn squad_of(&self, tag: Tag) -> Option<u32> {
        self.squads
            .iter()
            .find(|s| s.members.contains(&tag))
            .map(|s| s.id)
    }

    /// Every `(member, squad id)` pair.
    pub fn membership(&self) -> impl Iterator<Item = (Tag, u32)> + '_ {
        self.squads
            .iter()
            .flat_map(|s| s.members.iter().map(move |t| (*t, s.id)))
    }

    /// Number of squads.
    #[must_use]
    pub fn len(&self) -> usize {
        self.squads.len()
    }

    /// Check if there are no squads.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.squads.is_empty()
    }
}
