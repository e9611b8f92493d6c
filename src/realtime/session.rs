use super::event::{ClientEvent, IncomingMessage, MessageRef, ServerEvent, TypingSignal};
use super::room::{ConnectionId, RoomId};
use super::server::{
    Broadcast, ChatServer, Connect, Deliver, Disconnect, JoinRoom, LeaveRoom, PublishMessage,
};
use crate::configuration::Settings;
use crate::errors::ChatError;
use crate::models::Identity;
use crate::services::{ChatService, SendMessage};
use actix::{
    fut, Actor, ActorContext, ActorFutureExt, Addr, AsyncContext, ContextFutureSpawner, Handler,
    Running, StreamHandler, WrapFuture,
};
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use std::collections::HashSet;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// One WebSocket connection, bound to a single identity for its lifetime.
///
/// Events that touch the store run with `ctx.wait`, so a connection handles
/// its frames one at a time.
pub struct ChatSession {
    id: ConnectionId,
    identity: Identity,
    service: ChatService,
    server: Addr<ChatServer>,
    joined: HashSet<RoomId>,
    hb: Instant,
    heartbeat_interval: Duration,
    client_timeout: Duration,
}

impl ChatSession {
    pub fn new(
        identity: Identity,
        service: ChatService,
        server: Addr<ChatServer>,
        settings: &Settings,
    ) -> Self {
        Self {
            id: 0,
            identity,
            service,
            server,
            joined: HashSet::new(),
            hb: Instant::now(),
            heartbeat_interval: Duration::from_secs(settings.realtime.heartbeat_interval_secs),
            client_timeout: Duration::from_secs(settings.realtime.client_timeout_secs),
        }
    }

    fn hb(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(self.heartbeat_interval, |act, ctx| {
            if Instant::now().duration_since(act.hb) > act.client_timeout {
                tracing::warn!(user = %act.identity.user_id, "Chat client heartbeat failed, disconnecting");
                ctx.stop();
                return;
            }

            ctx.ping(b"");
        });
    }

    fn send_event(&self, ctx: &mut ws::WebsocketContext<Self>, event: &ServerEvent) {
        ctx.text(event.to_text());
    }

    fn send_error(&self, ctx: &mut ws::WebsocketContext<Self>, err: &ChatError) {
        tracing::debug!(user = %self.identity.user_id, "Realtime event refused: {}", err);
        self.send_event(ctx, &ServerEvent::error(err));
    }

    fn dispatch(&mut self, event: ClientEvent, ctx: &mut ws::WebsocketContext<Self>) {
        tracing::debug!(user = %self.identity.user_id, event = event.name(), "Realtime event");
        match event {
            ClientEvent::Join(room) => self.join(room.conversation_id, ctx),
            ClientEvent::Leave(room) => {
                let room = RoomId::from(room.conversation_id);
                if self.joined.remove(&room) {
                    self.server.do_send(LeaveRoom { id: self.id, room });
                }
            }
            ClientEvent::Message(incoming) => self.send_message(incoming, ctx),
            ClientEvent::Typing(signal) => self.typing(signal, ctx),
            ClientEvent::MarkRead(room) => self.mark_read(room.conversation_id, ctx),
            ClientEvent::MarkMessageRead(message) => self.mark_message_read(message, ctx),
        }
    }

    fn join(&mut self, conversation_id: Uuid, ctx: &mut ws::WebsocketContext<Self>) {
        let service = self.service.clone();
        let identity = self.identity.clone();

        async move { service.conversation_for(&identity, conversation_id).await }
            .into_actor(self)
            .map(move |res, act, ctx| match res {
                Ok(conversation) => {
                    let room = RoomId::from(conversation.id);
                    act.joined.insert(room);
                    act.server.do_send(JoinRoom { id: act.id, room });
                    act.send_event(ctx, &ServerEvent::Joined { conversation_id });
                }
                Err(err) => act.send_error(ctx, &err),
            })
            .wait(ctx);
    }

    fn send_message(&mut self, incoming: IncomingMessage, ctx: &mut ws::WebsocketContext<Self>) {
        if let Some(sender_id) = incoming.sender_id.as_deref() {
            if sender_id != self.identity.user_id {
                tracing::warn!(
                    user = %self.identity.user_id,
                    claimed = %sender_id,
                    "Sender does not match the session"
                );
                self.send_error(
                    ctx,
                    &ChatError::validation("senderId does not match the session"),
                );
                return;
            }
        }

        let service = self.service.clone();
        let identity = self.identity.clone();
        let request = SendMessage {
            conversation_id: incoming.conversation_id,
            content: incoming.content,
            receiver: incoming.receiver_id,
            client_token: incoming.client_token,
        };

        async move { service.send_message(&identity, request).await }
            .into_actor(self)
            .map(|res, act, ctx| match res {
                Ok(view) => act.server.do_send(PublishMessage { view }),
                Err(err) => act.send_error(ctx, &err),
            })
            .wait(ctx);
    }

    fn typing(&mut self, signal: TypingSignal, ctx: &mut ws::WebsocketContext<Self>) {
        let room = RoomId::from(signal.conversation_id);
        if !self.joined.contains(&room) {
            self.send_error(
                ctx,
                &ChatError::validation("Join the conversation before sending typing events"),
            );
            return;
        }

        self.server.do_send(Broadcast {
            room,
            event: ServerEvent::Typing {
                conversation_id: signal.conversation_id,
                user_id: self.identity.user_id.clone(),
                is_typing: signal.is_typing,
            },
            exclude_user: Some(self.identity.user_id.clone()),
        });
    }

    fn mark_read(&mut self, conversation_id: Uuid, ctx: &mut ws::WebsocketContext<Self>) {
        let service = self.service.clone();
        let identity = self.identity.clone();

        async move { service.mark_read(&identity, conversation_id).await }
            .into_actor(self)
            .map(move |res, act, ctx| match res {
                Ok(updated) => {
                    tracing::debug!(updated, %conversation_id, "Read receipt");
                    act.server.do_send(Broadcast {
                        room: RoomId::from(conversation_id),
                        event: ServerEvent::MessagesRead {
                            conversation_id,
                            reader_id: act.identity.user_id.clone(),
                        },
                        exclude_user: Some(act.identity.user_id.clone()),
                    });
                }
                Err(err) => act.send_error(ctx, &err),
            })
            .wait(ctx);
    }

    fn mark_message_read(&mut self, target: MessageRef, ctx: &mut ws::WebsocketContext<Self>) {
        let service = self.service.clone();
        let identity = self.identity.clone();
        let MessageRef {
            conversation_id,
            message_id,
        } = target;

        async move {
            service
                .mark_message_read(&identity, conversation_id, message_id)
                .await
        }
        .into_actor(self)
        .map(move |res, act, ctx| match res {
            Ok(true) => act.server.do_send(Broadcast {
                room: RoomId::from(conversation_id),
                event: ServerEvent::MessageRead {
                    conversation_id,
                    message_id,
                    reader_id: act.identity.user_id.clone(),
                },
                exclude_user: Some(act.identity.user_id.clone()),
            }),
            Ok(false) => tracing::debug!(%message_id, "Message already read"),
            Err(err) => act.send_error(ctx, &err),
        })
        .wait(ctx);
    }
}

impl Actor for ChatSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.hb(ctx);

        let addr = ctx.address();
        self.server
            .send(Connect {
                user_id: self.identity.user_id.clone(),
                addr: addr.recipient(),
            })
            .into_actor(self)
            .then(|res, act, ctx| {
                match res {
                    Ok(id) => {
                        act.id = id;
                        tracing::info!(connection = id, user = %act.identity.user_id, "Chat WebSocket connection started");
                    }
                    Err(err) => {
                        tracing::error!("Chat server unreachable: {:?}", err);
                        ctx.stop();
                    }
                }
                fut::ready(())
            })
            .wait(ctx);
    }

    fn stopping(&mut self, _ctx: &mut Self::Context) -> Running {
        self.server.do_send(Disconnect { id: self.id });
        Running::Stop
    }
}

impl Handler<Deliver> for ChatSession {
    type Result = ();

    fn handle(&mut self, msg: Deliver, ctx: &mut Self::Context) {
        ctx.text(msg.0);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for ChatSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        let msg = match msg {
            Ok(msg) => msg,
            Err(err) => {
                tracing::warn!("Chat WebSocket protocol error: {}", err);
                ctx.stop();
                return;
            }
        };

        match msg {
            ws::Message::Ping(msg) => {
                self.hb = Instant::now();
                ctx.pong(&msg);
            }
            ws::Message::Pong(_) => {
                self.hb = Instant::now();
            }
            ws::Message::Text(text) => match ClientEvent::parse(&text) {
                Ok(event) => self.dispatch(event, ctx),
                Err(err) => self.send_error(ctx, &err),
            },
            ws::Message::Binary(_) => {
                self.send_error(ctx, &ChatError::validation("Binary frames are not supported"));
            }
            ws::Message::Close(reason) => {
                tracing::info!("Chat WebSocket close received: {:?}", reason);
                ctx.close(reason);
                ctx.stop();
            }
            ws::Message::Continuation(_) | ws::Message::Nop => {}
        }
    }
}

/// Upgrade to the realtime gateway. Anonymous callers get 401 from the
/// `Identity` extractor before the handshake.
#[tracing::instrument(
    name = "Chat WebSocket connection",
    skip(req, stream, service, server, settings),
    fields(user = %identity.user_id)
)]
pub async fn chat_websocket(
    req: HttpRequest,
    stream: web::Payload,
    identity: Identity,
    service: web::Data<ChatService>,
    server: web::Data<Addr<ChatServer>>,
    settings: web::Data<Settings>,
) -> Result<HttpResponse, Error> {
    let session = ChatSession::new(
        identity,
        service.get_ref().clone(),
        server.get_ref().clone(),
        settings.get_ref(),
    );

    ws::start(session, &req, stream)
}
