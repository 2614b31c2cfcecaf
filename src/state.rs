use std::collections::HashMap;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::arcade::ModelKind;
use crate::input::RawInput;
use crate::protocol::ServerMessage;
use crate::vehicle::VehicleSnapshot;

#[derive(Debug, Clone, Copy)]
pub struct EntityInput {
    pub tick: u64,
    pub input: RawInput,
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub id: String,
    pub model: ModelKind,
    pub last_input: Option<EntityInput>,
}

/// Connection-side view of the game: who is connected, what they drive and
/// what they last pressed. The world reconciles against it every tick.
pub struct SharedGameState {
    pub tick: u64,
    pub clients: HashMap<String, UnboundedSender<String>>,
    pub entities: HashMap<String, Entity>,
    max_entities: usize,
}

impl SharedGameState {
    pub fn new(max_entities: usize) -> Self {
        Self {
            tick: 0,
            clients: HashMap::new(),
            entities: HashMap::new(),
            max_entities,
        }
    }

    pub fn register_client(&mut self, id: &str, tx: UnboundedSender<String>) {
        self.clients.insert(id.to_string(), tx);
    }

    /// New entity with a fresh id, or `None` when the grid is full.
    pub fn add_entity(&mut self, model: ModelKind) -> Option<String> {
        if self.entities.len() >= self.max_entities {
            return None;
        }
        let id = Uuid::new_v4().to_string();
        self.entities.insert(
            id.clone(),
            Entity { id: id.clone(), model, last_input: None },
        );
        Some(id)
    }

    pub fn update_input(&mut self, id: &str, input: RawInput) {
        let tick = self.tick;
        if let Some(entity) = self.entities.get_mut(id) {
            entity.last_input = Some(EntityInput { tick, input });
        }
    }

    pub fn select_model(&mut self, id: &str, model: ModelKind) -> bool {
        match self.entities.get_mut(id) {
            Some(entity) => {
                entity.model = model;
                true
            }
            None => false,
        }
    }

    pub fn remove_entity(&mut self, id: &str) {
        self.entities.remove(id);
        self.clients.remove(id);
    }

    /// Build and send a snapshot of all vehicles to all clients, dropping
    /// clients whose channel has closed.
    pub fn broadcast_snapshot(&mut self, vehicles: &[VehicleSnapshot]) {
        let json = match (ServerMessage::Snapshot { tick: self.tick, vehicles }).to_json() {
            Ok(json) => json,
            Err(err) => {
                warn!(%err, "failed to encode snapshot");
                return;
            }
        };

        self.clients.retain(|id, tx| {
            let alive = tx.send(json.clone()).is_ok();
            if !alive {
                debug!(client = %id, "dropping closed client channel");
            }
            alive
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn entity_lifecycle() {
        let mut game = SharedGameState::new(2);
        let a = game.add_entity(ModelKind::Drift).unwrap();
        let b = game.add_entity(ModelKind::Kinematic).unwrap();
        assert_ne!(a, b);
        assert!(game.add_entity(ModelKind::Drift).is_none());

        game.tick = 9;
        game.update_input(&a, RawInput { throttle: 0.5, ..Default::default() });
        let input = game.entities[&a].last_input.unwrap();
        assert_eq!(input.tick, 9);
        assert_eq!(input.input.throttle, 0.5);

        assert!(game.select_model(&a, ModelKind::Kinematic));
        assert!(!game.select_model("nobody", ModelKind::Drift));

        game.remove_entity(&a);
        assert!(game.add_entity(ModelKind::Drift).is_some());
    }

    #[test]
    fn broadcast_reaches_live_clients_and_prunes_dead_ones() {
        let mut game = SharedGameState::new(4);
        let (tx_live, mut rx_live) = mpsc::unbounded_channel();
        let (tx_dead, rx_dead) = mpsc::unbounded_channel();
        drop(rx_dead);
        game.register_client("live", tx_live);
        game.register_client("dead", tx_dead);

        game.broadcast_snapshot(&[]);

        let msg = rx_live.try_recv().unwrap();
        assert!(msg.contains("\"type\":\"snapshot\""));
        assert!(game.clients.contains_key("live"));
        assert!(!game.clients.contains_key("dead"));
    }
}
