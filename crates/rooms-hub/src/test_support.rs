use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use rooms_core::message::validate_text;
use rooms_core::{Command, Message, MessageQuery, MessageService, RoomsError, RoomsResult};

/// In-memory message service: membership is a fixed set of (room, user)
/// pairs and nothing is stored.
#[derive(Default)]
pub(crate) struct FakeMessageService {
    members: Mutex<HashSet<(String, String)>>,
    next_id: AtomicU64,
}

impl FakeMessageService {
    pub(crate) fn with_members(pairs: &[(&str, &str)]) -> Self {
        let members = pairs
            .iter()
            .map(|(room, user)| (room.to_string(), user.to_string()))
            .collect();
        Self {
            members: Mutex::new(members),
            next_id: AtomicU64::new(0),
        }
    }

    fn next_id(&self) -> String {
        format!("m{}", self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

#[async_trait]
impl MessageService for FakeMessageService {
    async fn verify_user_in_room(&self, room_id: &str, user_id: &str) -> RoomsResult<()> {
        let members = self.members.lock().unwrap();
        if members.contains(&(room_id.to_string(), user_id.to_string())) {
            Ok(())
        } else {
            Err(RoomsError::not_in_room(room_id, user_id))
        }
    }

    async fn create(&self, room_id: &str, user_id: &str, text: &str) -> RoomsResult<Message> {
        self.verify_user_in_room(room_id, user_id).await?;
        let text = validate_text(text)?;
        Ok(Message {
            id: self.next_id(),
            room_id: room_id.to_string(),
            user_id: user_id.to_string(),
            text: text.to_string(),
            ..Default::default()
        })
    }

    async fn create_command(
        &self,
        room_id: &str,
        user_id: &str,
        command: Command,
        target_id: &str,
    ) -> RoomsResult<Message> {
        Ok(Message {
            id: self.next_id(),
            room_id: room_id.to_string(),
            user_id: user_id.to_string(),
            command,
            target_id: target_id.to_string(),
            ..Default::default()
        })
    }

    async fn find_by_room(
        &self,
        room_id: &str,
        user_id: &str,
        _query: MessageQuery,
    ) -> RoomsResult<Vec<Message>> {
        self.verify_user_in_room(room_id, user_id).await?;
        Ok(Vec::new())
    }

    async fn update(&self, id: &str, _user_id: &str, _text: &str) -> RoomsResult<Message> {
        Err(RoomsError::MessageNotFound(id.to_string()))
    }

    async fn delete(&self, id: &str, _user_id: &str) -> RoomsResult<Message> {
        Err(RoomsError::MessageNotFound(id.to_string()))
    }
}
