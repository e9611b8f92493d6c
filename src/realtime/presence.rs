use std::collections::HashMap;

/// Outcome of a presence update for the affected user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceChange {
    CameOnline,
    WentOffline,
    Unchanged,
}

/// Live connection count per user. A user is online while the count is positive.
#[derive(Debug, Default)]
pub struct PresenceTable {
    connections: HashMap<String, usize>,
}

impl PresenceTable {
    pub fn connect(&mut self, user_id: &str) -> PresenceChange {
        let count = self.connections.entry(user_id.to_string()).or_insert(0);
        *count += 1;
        if *count == 1 {
            PresenceChange::CameOnline
        } else {
            PresenceChange::Unchanged
        }
    }

    pub fn disconnect(&mut self, user_id: &str) -> PresenceChange {
        match self.connections.get_mut(user_id) {
            Some(count) if *count > 1 => {
                *count -= 1;
                PresenceChange::Unchanged
            }
            Some(_) => {
                self.connections.remove(user_id);
                PresenceChange::WentOffline
            }
            None => {
                tracing::warn!(user = %user_id, "Disconnect for a user without connections");
                PresenceChange::Unchanged
            }
        }
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.connections.contains_key(user_id)
    }

    /// Sorted for stable output.
    pub fn online_users(&self) -> Vec<String> {
        let mut users: Vec<String> = self.connections.keys().cloned().collect();
        users.sort();
        users
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_tab_keeps_user_online() {
        let mut presence = PresenceTable::default();
        assert_eq!(presence.connect("client-ana"), PresenceChange::CameOnline);
        assert_eq!(presence.connect("client-ana"), PresenceChange::Unchanged);

        assert_eq!(presence.disconnect("client-ana"), PresenceChange::Unchanged);
        assert!(presence.is_online("client-ana"));
        assert_eq!(presence.disconnect("client-ana"), PresenceChange::WentOffline);
        assert!(!presence.is_online("client-ana"));
    }

    #[test]
    fn stray_disconnect_does_not_underflow() {
        let mut presence = PresenceTable::default();
        assert_eq!(presence.disconnect("ghost"), PresenceChange::Unchanged);
        assert!(presence.online_users().is_empty());
    }

    #[test]
    fn online_users_are_sorted() {
        let mut presence = PresenceTable::default();
        presence.connect("lawyer-lee");
        presence.connect("client-ana");
        presence.connect("lawyer-lee");
        assert_eq!(presence.online_users(), vec!["client-ana", "lawyer-lee"]);
    }
}
