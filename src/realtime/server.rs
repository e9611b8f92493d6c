use super::event::{DeliveryStatus, ServerEvent};
use super::presence::{PresenceChange, PresenceTable};
use super::room::{ConnectionId, RoomId, Rooms};
use crate::connectors::UserDirectory;
use crate::models::MessageView;
use actix::{Actor, Context, Handler, Message, MessageResult, Recipient};
use std::collections::HashMap;
use std::sync::Arc;

/// Serialized event pushed to one connection.
#[derive(Message, Debug, Clone)]
#[rtype(result = "()")]
pub struct Deliver(pub String);

/// Register a connection; answers with its id.
#[derive(Message)]
#[rtype(result = "ConnectionId")]
pub struct Connect {
    pub user_id: String,
    pub addr: Recipient<Deliver>,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct Disconnect {
    pub id: ConnectionId,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct JoinRoom {
    pub id: ConnectionId,
    pub room: RoomId,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct LeaveRoom {
    pub id: ConnectionId,
    pub room: RoomId,
}

/// Fan an event out to a room. Connections of `exclude_user` are skipped.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Broadcast {
    pub room: RoomId,
    pub event: ServerEvent,
    pub exclude_user: Option<String>,
}

/// A stored message: fanned out to its room, followed by its delivery status.
#[derive(Message)]
#[rtype(result = "()")]
pub struct PublishMessage {
    pub view: MessageView,
}

#[derive(Message)]
#[rtype(result = "Vec<String>")]
pub struct OnlineUsers;

struct Connection {
    user_id: String,
    addr: Recipient<Deliver>,
}

/// Owns rooms and presence. All state changes go through its mailbox.
pub struct ChatServer {
    connections: HashMap<ConnectionId, Connection>,
    rooms: Rooms,
    presence: PresenceTable,
    directory: Arc<dyn UserDirectory>,
    next_id: ConnectionId,
}

impl ChatServer {
    pub fn new(directory: Arc<dyn UserDirectory>) -> Self {
        Self {
            connections: HashMap::new(),
            rooms: Rooms::default(),
            presence: PresenceTable::default(),
            directory,
            next_id: 1,
        }
    }

    fn send_to_all(&self, event: &ServerEvent) {
        let text = event.to_text();
        for connection in self.connections.values() {
            connection.addr.do_send(Deliver(text.clone()));
        }
    }

    fn broadcast(&self, room: RoomId, event: &ServerEvent, exclude_user: Option<&str>) {
        let text = event.to_text();
        for id in self.rooms.members(room) {
            let Some(connection) = self.connections.get(&id) else {
                continue;
            };
            if exclude_user == Some(connection.user_id.as_str()) {
                continue;
            }
            connection.addr.do_send(Deliver(text.clone()));
        }
    }

    fn broadcast_online_users(&self) {
        self.send_to_all(&ServerEvent::GetOnlineUser(self.presence.online_users()));
    }

    fn publish_presence(&self, user_id: &str, change: PresenceChange) {
        let online = match change {
            PresenceChange::CameOnline => true,
            PresenceChange::WentOffline => false,
            PresenceChange::Unchanged => return,
        };

        let directory = self.directory.clone();
        let user_id = user_id.to_string();
        actix::spawn(async move {
            if let Err(err) = directory.set_online(&user_id, online).await {
                tracing::warn!(user = %user_id, online, "Failed to publish presence: {}", err);
            }
        });
    }
}

impl Actor for ChatServer {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        tracing::info!("Chat server started");
    }
}

impl Handler<Connect> for ChatServer {
    type Result = MessageResult<Connect>;

    fn handle(&mut self, msg: Connect, _ctx: &mut Self::Context) -> Self::Result {
        let id = self.next_id;
        self.next_id += 1;

        let change = self.presence.connect(&msg.user_id);
        tracing::info!(connection = id, user = %msg.user_id, "Realtime connection registered");
        self.publish_presence(&msg.user_id, change);

        self.connections.insert(
            id,
            Connection {
                user_id: msg.user_id,
                addr: msg.addr,
            },
        );
        self.broadcast_online_users();

        MessageResult(id)
    }
}

impl Handler<Disconnect> for ChatServer {
    type Result = ();

    fn handle(&mut self, msg: Disconnect, _ctx: &mut Self::Context) {
        let Some(connection) = self.connections.remove(&msg.id) else {
            return;
        };
        self.rooms.leave_all(msg.id);

        let change = self.presence.disconnect(&connection.user_id);
        tracing::info!(connection = msg.id, user = %connection.user_id, "Realtime connection closed");
        self.publish_presence(&connection.user_id, change);
        self.broadcast_online_users();
    }
}

impl Handler<JoinRoom> for ChatServer {
    type Result = ();

    fn handle(&mut self, msg: JoinRoom, _ctx: &mut Self::Context) {
        if !self.connections.contains_key(&msg.id) {
            tracing::debug!(connection = msg.id, "Join from an unregistered connection");
            return;
        }
        if self.rooms.join(msg.room, msg.id) {
            tracing::debug!(connection = msg.id, room = %msg.room, "Joined room");
        }
    }
}

impl Handler<LeaveRoom> for ChatServer {
    type Result = ();

    fn handle(&mut self, msg: LeaveRoom, _ctx: &mut Self::Context) {
        self.rooms.leave(msg.room, msg.id);
    }
}

impl Handler<Broadcast> for ChatServer {
    type Result = ();

    fn handle(&mut self, msg: Broadcast, _ctx: &mut Self::Context) {
        self.broadcast(msg.room, &msg.event, msg.exclude_user.as_deref());
    }
}

impl Handler<PublishMessage> for ChatServer {
    type Result = ();

    fn handle(&mut self, msg: PublishMessage, _ctx: &mut Self::Context) {
        let message = &msg.view.message;
        let room = RoomId::from(message.conversation_id);
        let status = if self.presence.is_online(&message.receiver) {
            DeliveryStatus::Delivered
        } else {
            DeliveryStatus::Sent
        };
        let status_event = ServerEvent::UpdateMessageStatus {
            conversation_id: message.conversation_id,
            message_id: message.id,
            status,
        };
        tracing::debug!(message_id = %message.id, ?status, "Publishing message");

        self.broadcast(room, &ServerEvent::Message(msg.view), None);
        self.broadcast(room, &status_event, None);
    }
}

impl Handler<OnlineUsers> for ChatServer {
    type Result = MessageResult<OnlineUsers>;

    fn handle(&mut self, _msg: OnlineUsers, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.presence.online_users())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::StaticUserDirectory;
    use crate::models::{Role, User};
    use serde_json::Value;
    use std::sync::Mutex;
    use std::time::Duration;
    use uuid::Uuid;

    /// Stands in for a socket and records what it was sent.
    struct Collector {
        frames: Arc<Mutex<Vec<Value>>>,
    }

    impl Actor for Collector {
        type Context = Context<Self>;
    }

    impl Handler<Deliver> for Collector {
        type Result = ();

        fn handle(&mut self, msg: Deliver, _ctx: &mut Self::Context) {
            let value = serde_json::from_str(&msg.0).unwrap();
            self.frames.lock().unwrap().push(value);
        }
    }

    fn collector() -> (Recipient<Deliver>, Arc<Mutex<Vec<Value>>>) {
        let frames = Arc::new(Mutex::new(Vec::new()));
        let addr = Collector {
            frames: frames.clone(),
        }
        .start();
        (addr.recipient(), frames)
    }

    fn events(frames: &Arc<Mutex<Vec<Value>>>, name: &str) -> Vec<Value> {
        frames
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f["event"] == name)
            .cloned()
            .collect()
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    fn directory() -> Arc<StaticUserDirectory> {
        Arc::new(StaticUserDirectory::new(vec![User {
            id: "client-ana".into(),
            name: "Ana".into(),
            role: Role::Client,
            picture: None,
            specialization: None,
            online: false,
        }]))
    }

    #[actix_web::test]
    async fn presence_counts_connections_per_user() {
        let directory = directory();
        let server = ChatServer::new(directory.clone()).start();
        let (first, frames) = collector();
        let (second, _) = collector();

        let a = server
            .send(Connect { user_id: "client-ana".into(), addr: first })
            .await
            .unwrap();
        let b = server
            .send(Connect { user_id: "client-ana".into(), addr: second })
            .await
            .unwrap();
        assert_ne!(a, b);
        assert_eq!(server.send(OnlineUsers).await.unwrap(), vec!["client-ana"]);

        server.send(Disconnect { id: a }).await.unwrap();
        assert_eq!(server.send(OnlineUsers).await.unwrap(), vec!["client-ana"]);
        settle().await;
        let ana = directory.get_user("client-ana").await.unwrap().unwrap();
        assert!(ana.online);

        server.send(Disconnect { id: b }).await.unwrap();
        assert!(server.send(OnlineUsers).await.unwrap().is_empty());
        settle().await;
        let ana = directory.get_user("client-ana").await.unwrap().unwrap();
        assert!(!ana.online);

        // the first socket saw its own connect and the second one
        assert_eq!(events(&frames, "getOnlineUser").len(), 2);
    }

    #[actix_web::test]
    async fn broadcast_reaches_room_members_only() {
        let server = ChatServer::new(directory()).start();
        let room = RoomId::from(Uuid::new_v4());
        let (ana_addr, ana) = collector();
        let (lee_addr, lee) = collector();
        let (outsider_addr, outsider) = collector();

        let ana_id = server
            .send(Connect { user_id: "client-ana".into(), addr: ana_addr })
            .await
            .unwrap();
        let lee_id = server
            .send(Connect { user_id: "lawyer-lee".into(), addr: lee_addr })
            .await
            .unwrap();
        server
            .send(Connect { user_id: "client-ben".into(), addr: outsider_addr })
            .await
            .unwrap();
        server.send(JoinRoom { id: ana_id, room }).await.unwrap();
        server.send(JoinRoom { id: lee_id, room }).await.unwrap();

        server
            .send(Broadcast {
                room,
                event: ServerEvent::Typing {
                    conversation_id: room.conversation_id(),
                    user_id: "client-ana".into(),
                    is_typing: true,
                },
                exclude_user: Some("client-ana".into()),
            })
            .await
            .unwrap();
        settle().await;

        assert!(events(&ana, "typing").is_empty());
        assert_eq!(events(&lee, "typing").len(), 1);
        assert!(events(&outsider, "typing").is_empty());

        server.send(LeaveRoom { id: lee_id, room }).await.unwrap();
        server
            .send(Broadcast {
                room,
                event: ServerEvent::Joined {
                    conversation_id: room.conversation_id(),
                },
                exclude_user: None,
            })
            .await
            .unwrap();
        settle().await;
        assert_eq!(events(&ana, "joined").len(), 1);
        assert!(events(&lee, "joined").is_empty());
    }

    fn view(conversation_id: Uuid, sender: &str, receiver: &str) -> MessageView {
        MessageView {
            message: crate::models::Message {
                id: Uuid::new_v4(),
                conversation_id,
                sender: sender.into(),
                receiver: receiver.into(),
                content: "hello".into(),
                read: false,
                client_token: None,
                created_at: chrono::Utc::now(),
            },
            sender_profile: None,
        }
    }

    #[actix_web::test]
    async fn published_message_reports_delivery_status() {
        let server = ChatServer::new(directory()).start();
        let room = RoomId::from(Uuid::new_v4());
        let (ana_addr, ana) = collector();

        let ana_id = server
            .send(Connect { user_id: "client-ana".into(), addr: ana_addr })
            .await
            .unwrap();
        server.send(JoinRoom { id: ana_id, room }).await.unwrap();

        // receiver has no connection yet
        server
            .send(PublishMessage {
                view: view(room.conversation_id(), "client-ana", "lawyer-lee"),
            })
            .await
            .unwrap();

        let (lee_addr, _lee) = collector();
        server
            .send(Connect { user_id: "lawyer-lee".into(), addr: lee_addr })
            .await
            .unwrap();
        server
            .send(PublishMessage {
                view: view(room.conversation_id(), "client-ana", "lawyer-lee"),
            })
            .await
            .unwrap();
        settle().await;

        assert_eq!(events(&ana, "message").len(), 2);
        let statuses: Vec<Value> = events(&ana, "updateMessageStatus")
            .into_iter()
            .map(|frame| frame["data"]["status"].clone())
            .collect();
        assert_eq!(statuses, vec!["sent", "delivered"]);
    }
}
