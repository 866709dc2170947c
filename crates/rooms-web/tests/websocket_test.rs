//! End-to-end tests over a loopback listener with in-memory collaborators.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use futures::{SinkExt, StreamExt};
use rooms_core::room::{can_remove_user, can_update_room, validate_room_name};
use rooms_core::{
    Command, Message, MessageQuery, MessageService, NewUser, Room, RoomService, RoomsError,
    RoomsResult, User,
};
use rooms_hub::{Hub, HubConfig};
use rooms_web::{create_router, AppState};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Error as WsError, Message as WsMessage},
    MaybeTlsStream, WebSocketStream,
};
use tower::ServiceExt;
use uuid::Uuid;

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Default)]
struct Store {
    users: HashMap<String, User>,
    rooms: HashMap<String, Room>,
    messages: HashMap<String, Message>,
}

/// Both collaborator services over one in-memory store.
#[derive(Default)]
struct MemoryServices {
    store: Mutex<Store>,
}

impl MemoryServices {
    fn seeded() -> Self {
        let services = Self::default();
        {
            let mut store = services.store.lock().unwrap();
            for (id, first) in [("alice", "Alice"), ("bob", "Bob"), ("carol", "Carol")] {
                store.users.insert(
                    id.to_string(),
                    User {
                        id: id.to_string(),
                        first_name: first.to_string(),
                        last_name: "Test".to_string(),
                        email: format!("{id}@example.com"),
                        ..Default::default()
                    },
                );
            }
            store.rooms.insert(
                "r1".to_string(),
                Room {
                    id: "r1".to_string(),
                    name: "general".to_string(),
                    owner_id: "alice".to_string(),
                    user_ids: vec!["alice".to_string(), "bob".to_string()],
                    ..Default::default()
                },
            );
        }
        services
    }

    fn room(&self, id: &str) -> RoomsResult<Room> {
        self.store
            .lock()
            .unwrap()
            .rooms
            .get(id)
            .cloned()
            .ok_or_else(|| RoomsError::RoomNotFound(id.to_string()))
    }

    fn user(&self, id: &str) -> RoomsResult<User> {
        self.store
            .lock()
            .unwrap()
            .users
            .get(id)
            .cloned()
            .ok_or_else(|| RoomsError::UserNotFound(id.to_string()))
    }

    fn insert_message(&self, message: Message) -> Message {
        self.store
            .lock()
            .unwrap()
            .messages
            .insert(message.id.clone(), message.clone());
        message
    }
}

#[async_trait]
impl MessageService for MemoryServices {
    async fn verify_user_in_room(&self, room_id: &str, user_id: &str) -> RoomsResult<()> {
        if self.room(room_id)?.has_user(user_id) {
            Ok(())
        } else {
            Err(RoomsError::not_in_room(room_id, user_id))
        }
    }

    async fn create(&self, room_id: &str, user_id: &str, text: &str) -> RoomsResult<Message> {
        self.verify_user_in_room(room_id, user_id).await?;
        let text = rooms_core::message::validate_text(text)?;
        Ok(self.insert_message(Message {
            id: Uuid::new_v4().to_string(),
            room_id: room_id.to_string(),
            user_id: user_id.to_string(),
            user: self.user(user_id).ok(),
            text: text.to_string(),
            ..Default::default()
        }))
    }

    async fn create_command(
        &self,
        room_id: &str,
        user_id: &str,
        command: Command,
        target_id: &str,
    ) -> RoomsResult<Message> {
        let text = self
            .user(target_id)
            .map(|u| u.display_name())
            .unwrap_or_default();
        Ok(self.insert_message(Message {
            id: Uuid::new_v4().to_string(),
            room_id: room_id.to_string(),
            user_id: user_id.to_string(),
            user: self.user(user_id).ok(),
            text,
            command,
            target_id: target_id.to_string(),
            ..Default::default()
        }))
    }

    async fn find_by_room(
        &self,
        room_id: &str,
        user_id: &str,
        _query: MessageQuery,
    ) -> RoomsResult<Vec<Message>> {
        self.verify_user_in_room(room_id, user_id).await?;
        let store = self.store.lock().unwrap();
        Ok(store
            .messages
            .values()
            .filter(|m| m.room_id == room_id)
            .cloned()
            .collect())
    }

    async fn update(&self, id: &str, user_id: &str, text: &str) -> RoomsResult<Message> {
        let mut store = self.store.lock().unwrap();
        let message = store
            .messages
            .get_mut(id)
            .ok_or_else(|| RoomsError::MessageNotFound(id.to_string()))?;
        if message.user_id != user_id {
            return Err(RoomsError::forbidden("not the author"));
        }
        message.text = text.to_string();
        Ok(message.clone().into_event(Command::Update))
    }

    async fn delete(&self, id: &str, user_id: &str) -> RoomsResult<Message> {
        let mut store = self.store.lock().unwrap();
        match store.messages.get(id) {
            Some(m) if m.user_id != user_id => Err(RoomsError::forbidden("not the author")),
            Some(_) => Ok(store
                .messages
                .remove(id)
                .map(|m| m.into_event(Command::Delete))
                .unwrap_or_default()),
            None => Err(RoomsError::MessageNotFound(id.to_string())),
        }
    }
}

#[async_trait]
impl RoomService for MemoryServices {
    async fn create_user(&self, new_user: &NewUser) -> RoomsResult<User> {
        let user = User {
            id: Uuid::new_v4().to_string(),
            first_name: new_user.first_name.clone(),
            last_name: new_user.last_name.clone(),
            email: new_user.email.clone(),
            ..Default::default()
        };
        self.store
            .lock()
            .unwrap()
            .users
            .insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: &str) -> RoomsResult<User> {
        self.user(id)
    }

    async fn create_room(&self, name: &str, owner_id: &str) -> RoomsResult<Room> {
        let room = Room {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            owner_id: owner_id.to_string(),
            user_ids: vec![owner_id.to_string()],
            ..Default::default()
        };
        self.store
            .lock()
            .unwrap()
            .rooms
            .insert(room.id.clone(), room.clone());
        Ok(room)
    }

    async fn get_room(&self, id: &str) -> RoomsResult<Room> {
        self.room(id)
    }

    async fn list_rooms(&self) -> RoomsResult<Vec<Room>> {
        Ok(self.store.lock().unwrap().rooms.values().cloned().collect())
    }

    async fn delete_room(&self, id: &str, user_id: &str) -> RoomsResult<()> {
        if !self.room(id)?.is_owner(user_id) {
            return Err(RoomsError::forbidden("only the owner can delete a room"));
        }
        self.store.lock().unwrap().rooms.remove(id);
        Ok(())
    }

    async fn update_room(&self, id: &str, name: &str, user_id: &str) -> RoomsResult<Room> {
        validate_room_name(name)?;
        can_update_room(&self.room(id)?, user_id)?;
        let mut store = self.store.lock().unwrap();
        let room = store
            .rooms
            .get_mut(id)
            .ok_or_else(|| RoomsError::RoomNotFound(id.to_string()))?;
        room.name = name.trim().to_string();
        Ok(room.clone())
    }

    async fn add_user(&self, room_id: &str, email: &str, user_id: &str) -> RoomsResult<User> {
        self.verify_user_in_room(room_id, user_id).await?;
        let mut store = self.store.lock().unwrap();
        let user = store
            .users
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or_else(|| RoomsError::UserNotFound(email.to_string()))?;
        if let Some(room) = store.rooms.get_mut(room_id) {
            if !room.has_user(&user.id) {
                room.user_ids.push(user.id.clone());
            }
        }
        Ok(user)
    }

    async fn remove_user(
        &self,
        room_id: &str,
        remove_user_id: &str,
        user_id: &str,
    ) -> RoomsResult<()> {
        let room = self.room(room_id)?;
        can_remove_user(&room, remove_user_id, user_id)?;
        if let Some(room) = self.store.lock().unwrap().rooms.get_mut(room_id) {
            room.user_ids.retain(|id| id != remove_user_id);
        }
        Ok(())
    }
}

struct TestApp {
    addr: SocketAddr,
    state: AppState,
}

impl TestApp {
    async fn spawn() -> Self {
        let services = Arc::new(MemoryServices::seeded());
        let hub = Hub::spawn(HubConfig::default());
        let state = AppState::new(services.clone(), services, hub);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(rooms_web::serve(
            listener,
            state.clone(),
            std::future::pending(),
        ));

        Self { addr, state }
    }

    fn ws_url(&self, room: &str, user: Option<&str>) -> String {
        match user {
            Some(user) => format!("ws://{}/ws/rooms/{}?user_id={}", self.addr, room, user),
            None => format!("ws://{}/ws/rooms/{}", self.addr, room),
        }
    }

    /// Connect and wait until the hub has registered the connection.
    async fn join(&self, room: &str, user: &str) -> Ws {
        let before = self.members(room).await;
        let (ws, _) = connect_async(self.ws_url(room, Some(user))).await.unwrap();
        for _ in 0..200 {
            if self.members(room).await > before {
                return ws;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("{user} was never registered in {room}");
    }

    async fn members(&self, room: &str) -> usize {
        self.state.hub.room_members(room).await.unwrap().len()
    }

    async fn request(&self, method: &str, uri: &str, user: &str, body: Option<&str>) -> StatusCode {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("X-User-Id", user)
            .header("content-type", "application/json")
            .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
            .unwrap();
        create_router(self.state.clone())
            .oneshot(request)
            .await
            .unwrap()
            .status()
    }
}

async fn upgrade_status(url: &str) -> StatusCode {
    match connect_async(url).await {
        Err(WsError::Http(response)) => StatusCode::from_u16(response.status().as_u16()).unwrap(),
        Err(e) => panic!("unexpected error: {e}"),
        Ok(_) => StatusCode::SWITCHING_PROTOCOLS,
    }
}

async fn say(ws: &mut Ws, text: &str) {
    let frame = serde_json::json!({ "text": text }).to_string();
    ws.send(WsMessage::Text(frame.into())).await.unwrap();
}

/// Next message pushed by the server, or `None` once the socket closes.
async fn next_event(ws: &mut Ws) -> Option<Message> {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("timed out waiting for a frame")?
            .ok()?;
        match frame {
            WsMessage::Text(text) => return Some(serde_json::from_str(text.as_str()).unwrap()),
            WsMessage::Close(_) => return None,
            _ => continue,
        }
    }
}

#[tokio::test]
async fn test_upgrade_without_identity_is_unauthorized() {
    let app = TestApp::spawn().await;
    assert_eq!(
        upgrade_status(&app.ws_url("r1", None)).await,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_upgrade_by_non_member_is_forbidden() {
    let app = TestApp::spawn().await;
    assert_eq!(
        upgrade_status(&app.ws_url("r1", Some("carol"))).await,
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        upgrade_status(&app.ws_url("missing", Some("alice"))).await,
        StatusCode::FORBIDDEN
    );
    assert_eq!(app.state.hub.stats().await.unwrap().connections, 0);
}

#[tokio::test]
async fn test_chat_reaches_every_member() {
    let app = TestApp::spawn().await;
    let mut alice = app.join("r1", "alice").await;
    let mut bob = app.join("r1", "bob").await;

    say(&mut alice, "hello").await;
    say(&mut alice, "   ").await;
    say(&mut alice, "again").await;

    for ws in [&mut alice, &mut bob] {
        let first = next_event(ws).await.unwrap();
        assert_eq!(first.text, "hello");
        assert_eq!(first.room_id, "r1");
        assert_eq!(first.user_id, "alice");
        assert_eq!(first.user.unwrap().first_name, "Alice");
        assert_eq!(first.command, Command::Create);
        // The blank frame was rejected without closing anything.
        assert_eq!(next_event(ws).await.unwrap().text, "again");
    }
}

#[tokio::test]
async fn test_rest_message_is_broadcast() {
    let app = TestApp::spawn().await;
    let mut alice = app.join("r1", "alice").await;

    let status = app
        .request("POST", "/api/rooms/r1/messages", "bob", Some(r#"{"text":"from rest"}"#))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let event = next_event(&mut alice).await.unwrap();
    assert_eq!(event.text, "from rest");
    assert_eq!(event.user_id, "bob");

    let status = app
        .request("POST", "/api/rooms/r1/messages", "carol", Some(r#"{"text":"intruder"}"#))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_removed_user_is_told_then_disconnected() {
    let app = TestApp::spawn().await;
    let mut alice = app.join("r1", "alice").await;
    let mut bob = app.join("r1", "bob").await;

    let status = app.request("DELETE", "/api/rooms/r1/users/bob", "alice", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let event = next_event(&mut bob).await.unwrap();
    assert_eq!(event.command, Command::RemoveUser);
    assert_eq!(event.target_id, "bob");
    assert!(next_event(&mut bob).await.is_none());

    let event = next_event(&mut alice).await.unwrap();
    assert_eq!(event.command, Command::RemoveUser);
    assert_eq!(app.members("r1").await, 1);
}

#[tokio::test]
async fn test_owner_cannot_be_removed() {
    let app = TestApp::spawn().await;
    let _alice = app.join("r1", "alice").await;

    let status = app.request("DELETE", "/api/rooms/r1/users/alice", "bob", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(app.members("r1").await, 1);
}

#[tokio::test]
async fn test_added_user_is_announced() {
    let app = TestApp::spawn().await;
    let mut alice = app.join("r1", "alice").await;

    let status = app
        .request("POST", "/api/rooms/r1/users/carol@example.com", "bob", None)
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let event = next_event(&mut alice).await.unwrap();
    assert_eq!(event.command, Command::AddUser);
    assert_eq!(event.target_id, "carol");
    assert_eq!(event.text, "Carol Test");

    // Carol may now connect.
    let _carol = app.join("r1", "carol").await;
}

#[tokio::test]
async fn test_only_owner_renames_room() {
    let app = TestApp::spawn().await;

    let renamed = r#"{"name":"  lobby "}"#;
    assert_eq!(
        app.request("PUT", "/api/rooms/r1", "bob", Some(renamed)).await,
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        app.request("PUT", "/api/rooms/r1", "alice", Some(r#"{"name":"  "}"#))
            .await,
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        app.request("PUT", "/api/rooms/r1", "alice", Some(renamed)).await,
        StatusCode::OK
    );
    assert_eq!(app.state.rooms.get_room("r1").await.unwrap().name, "lobby");
}

#[tokio::test]
async fn test_deleting_room_disconnects_everyone() {
    let app = TestApp::spawn().await;
    let mut alice = app.join("r1", "alice").await;
    let mut bob = app.join("r1", "bob").await;

    assert_eq!(
        app.request("DELETE", "/api/rooms/r1", "bob", None).await,
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        app.request("DELETE", "/api/rooms/r1", "alice", None).await,
        StatusCode::NO_CONTENT
    );

    assert!(next_event(&mut alice).await.is_none());
    assert!(next_event(&mut bob).await.is_none());
    assert_eq!(app.state.hub.stats().await.unwrap().rooms, 0);
}

#[tokio::test]
async fn test_message_edit_and_delete_are_broadcast() {
    let app = TestApp::spawn().await;
    let mut bob = app.join("r1", "bob").await;
    let mut alice = app.join("r1", "alice").await;

    say(&mut alice, "typo").await;
    let original = next_event(&mut bob).await.unwrap();
    next_event(&mut alice).await.unwrap();

    let uri = format!("/api/messages/{}", original.id);
    assert_eq!(
        app.request("PUT", &uri, "bob", Some(r#"{"text":"hijack"}"#)).await,
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        app.request("PUT", &uri, "alice", Some(r#"{"text":"fixed"}"#)).await,
        StatusCode::OK
    );
    let edited = next_event(&mut bob).await.unwrap();
    assert_eq!(edited.command, Command::Update);
    assert_eq!(edited.target_id, original.id);
    assert_eq!(edited.text, "fixed");

    assert_eq!(app.request("DELETE", &uri, "alice", None).await, StatusCode::OK);
    let deleted = next_event(&mut bob).await.unwrap();
    assert_eq!(deleted.command, Command::Delete);
    assert_eq!(deleted.target_id, original.id);
}

#[tokio::test]
async fn test_hub_stats_and_health() {
    let app = TestApp::spawn().await;
    let _alice = app.join("r1", "alice").await;

    let response = create_router(app.state.clone())
        .oneshot(
            Request::builder()
                .uri("/api/hub/stats")
                .header("X-User-Id", "alice")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let stats: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(stats["rooms"], 1);
    assert_eq!(stats["connections"], 1);

    assert_eq!(app.request("GET", "/health", "alice", None).await, StatusCode::OK);
}

#[tokio::test]
async fn test_hub_shutdown_closes_sockets() {
    let app = TestApp::spawn().await;
    let mut alice = app.join("r1", "alice").await;

    app.state.hub.shutdown().await.unwrap();
    assert!(next_event(&mut alice).await.is_none());
}
