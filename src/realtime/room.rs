use std::collections::{HashMap, HashSet};
use std::fmt;
use uuid::Uuid;

/// Identifier of one live socket, assigned by `ChatServer`.
pub type ConnectionId = usize;

/// A broadcast room; one per conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoomId(Uuid);

impl From<Uuid> for RoomId {
    fn from(conversation_id: Uuid) -> Self {
        RoomId(conversation_id)
    }
}

impl RoomId {
    pub fn conversation_id(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Room membership. Empty rooms are dropped.
#[derive(Debug, Default)]
pub struct Rooms {
    members: HashMap<RoomId, HashSet<ConnectionId>>,
}

impl Rooms {
    /// Returns false when the connection was already a member.
    pub fn join(&mut self, room: RoomId, connection: ConnectionId) -> bool {
        self.members.entry(room).or_default().insert(connection)
    }

    pub fn leave(&mut self, room: RoomId, connection: ConnectionId) -> bool {
        let Some(members) = self.members.get_mut(&room) else {
            return false;
        };
        let removed = members.remove(&connection);
        if members.is_empty() {
            self.members.remove(&room);
        }
        removed
    }

    pub fn leave_all(&mut self, connection: ConnectionId) {
        self.members.retain(|_, members| {
            members.remove(&connection);
            !members.is_empty()
        });
    }

    pub fn members(&self, room: RoomId) -> impl Iterator<Item = ConnectionId> + '_ {
        self.members.get(&room).into_iter().flatten().copied()
    }
}
