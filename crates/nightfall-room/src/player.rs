//! Per-connection player records.

use std::collections::BTreeMap;

use nightfall_protocol::{PlayerId, Role};

/// One connected participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub ready: bool,
    pub role: Role,
    pub alive: bool,
    /// Set once the player has used their dying shot in the current game.
    pub hunter_shot_used: bool,
}

impl Player {
    fn new(id: PlayerId) -> Self {
        Self {
            id,
            name: format!("Player {}", id.0),
            ready: false,
            role: Role::Citizen,
            alive: true,
            hunter_shot_used: false,
        }
    }

    pub fn is_wolf(&self) -> bool {
        self.role == Role::Wolf
    }
}

/// The players currently connected to the room, ordered by id.
///
/// Ids are allocated monotonically and never reused, even after the room
/// empties and resets.
#[derive(Debug)]
pub struct PlayerRegistry {
    players: BTreeMap<PlayerId, Player>,
    next_id: u64,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self {
            players: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Registers a new player under the next free id, with a default name
    /// and not ready.
    pub fn add(&mut self) -> &mut Player {
        let id = PlayerId(self.next_id);
        self.next_id += 1;
        self.players.entry(id).or_insert_with(|| Player::new(id))
    }

    pub fn remove(&mut self, id: PlayerId) -> Option<Player> {
        self.players.remove(&id)
    }

    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn get_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.players.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// All players in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn ids(&self) -> Vec<PlayerId> {
        self.players.keys().copied().collect()
    }

    pub fn alive(&self) -> Vec<&Player> {
        self.iter().filter(|p| p.alive).collect()
    }

    pub fn wolves_alive(&self) -> Vec<&Player> {
        self.iter().filter(|p| p.alive && p.is_wolf()).collect()
    }

    /// Ids of living players, ascending.
    pub fn alive_ids(&self) -> Vec<PlayerId> {
        self.iter().filter(|p| p.alive).map(|p| p.id).collect()
    }

    /// Ids of living non-wolves, ascending.
    pub fn non_wolves_alive_ids(&self) -> Vec<PlayerId> {
        self.iter()
            .filter(|p| p.alive && !p.is_wolf())
            .map(|p| p.id)
            .collect()
    }

    pub fn is_alive(&self, id: PlayerId) -> bool {
        self.get(id).is_some_and(|p| p.alive)
    }

    /// `true` when at least one player is present and all are ready.
    pub fn all_ready(&self) -> bool {
        !self.is_empty() && self.iter().all(|p| p.ready)
    }

    pub fn lowest_id(&self) -> Option<PlayerId> {
        self.players.keys().next().copied()
    }

    /// Display name for narration; falls back to the id for departed players.
    pub fn name_of(&self, id: PlayerId) -> String {
        self.get(id).map_or_else(|| id.to_string(), |p| p.name.clone())
    }

    /// Clears roles and revives everyone, keeping names and ready flags.
    pub fn reset_for_game(&mut self) {
        for p in self.players.values_mut() {
            p.role = Role::Citizen;
            p.alive = true;
            p.hunter_shot_used = false;
        }
    }
}

impl Default for PlayerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
