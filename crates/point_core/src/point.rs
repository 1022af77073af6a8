//! Point - one turn-level node in a branching conversation
//!
//! Points are treated as values: every update produces a new copy through one
//! of the `with_*` methods and the caller replaces the stored entry.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::text::char_len;

pub type PointId = String;
pub type ShardId = String;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single chat message, used for both prompts and response choices.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// Completion output for one exchange.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Response {
    pub choices: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl Response {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            choices: vec![Message::assistant(content)],
            model: None,
        }
    }

    /// Content of the first choice.
    pub fn content(&self) -> Option<&str> {
        self.choices.first().map(|choice| choice.content.as_str())
    }
}

/// One prompt/response pair. `response` stays `None` while awaiting completion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Exchange {
    pub exchange_id: String,
    pub prompt: Message,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Response>,
}

impl Exchange {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            exchange_id: Uuid::new_v4().to_string(),
            prompt: Message::user(prompt),
            response: None,
        }
    }

    pub fn with_response(mut self, response: Response) -> Self {
        self.response = Some(response);
        self
    }
}

/// A character range inside a response, plus the text that was selected.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Anchor {
    pub start_position: usize,
    pub end_position: usize,
    #[serde(default)]
    pub selected_text: String,
}

impl Anchor {
    pub fn new(start_position: usize, end_position: usize, selected_text: impl Into<String>) -> Self {
        Self {
            start_position,
            end_position,
            selected_text: selected_text.into(),
        }
    }

    /// `start <= end`, independent of any response text.
    pub fn is_ordered(&self) -> bool {
        self.start_position <= self.end_position
    }

    /// Whether the anchor addresses a range inside a response of `len` characters.
    pub fn fits(&self, len: usize) -> bool {
        self.is_ordered() && self.end_position <= len
    }
}

/// An anchored sub-region of a point's response from which sub-prompts fork.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Shard {
    pub shard_id: ShardId,
    #[serde(default)]
    pub children: Vec<PointId>,
    pub anchor: Anchor,
}

impl Shard {
    pub fn new(shard_id: impl Into<String>, anchor: Anchor) -> Self {
        Self {
            shard_id: shard_id.into(),
            children: Vec::new(),
            anchor,
        }
    }
}

/// A conversation node. A point is a root iff `parent_point_id == id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Point {
    pub id: PointId,
    pub parent_point_id: PointId,
    /// Regular continuations, in insertion order, without duplicates.
    #[serde(default)]
    pub children: Vec<PointId>,
    /// Set iff this point was forked from a shard of its parent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_shard_id: Option<ShardId>,
    #[serde(default)]
    pub shards: Vec<Shard>,
    #[serde(default)]
    pub exchanges: Vec<Exchange>,
}

impl Point {
    /// Create a root point holding a single unanswered prompt.
    pub fn root(id: impl Into<String>, prompt: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            parent_point_id: id.clone(),
            id,
            children: Vec::new(),
            parent_shard_id: None,
            shards: Vec::new(),
            exchanges: vec![Exchange::new(prompt)],
        }
    }

    /// Create a non-root point holding a single unanswered prompt.
    pub fn child(
        id: impl Into<String>,
        parent_point_id: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            parent_point_id: parent_point_id.into(),
            children: Vec::new(),
            parent_shard_id: None,
            shards: Vec::new(),
            exchanges: vec![Exchange::new(prompt)],
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_point_id == self.id
    }

    pub fn is_shard_child(&self) -> bool {
        self.parent_shard_id.is_some()
    }

    /// Prompt of the first exchange.
    pub fn prompt_content(&self) -> Option<&str> {
        self.exchanges
            .first()
            .map(|exchange| exchange.prompt.content.as_str())
    }

    /// Response text of the first exchange, if it has been completed.
    pub fn response_content(&self) -> Option<&str> {
        self.exchanges
            .first()
            .and_then(|exchange| exchange.response.as_ref())
            .and_then(Response::content)
    }

    /// Length of the response in characters, zero while unanswered.
    pub fn response_len(&self) -> usize {
        self.response_content().map(char_len).unwrap_or(0)
    }

    pub fn shard(&self, shard_id: &str) -> Option<&Shard> {
        self.shards.iter().find(|shard| shard.shard_id == shard_id)
    }

    /// The shard whose child list contains `child_id`.
    pub fn shard_for_child(&self, child_id: &str) -> Option<&Shard> {
        self.shards
            .iter()
            .find(|shard| shard.children.iter().any(|id| id == child_id))
    }

    /// Copy with `child_id` appended to `children` (no-op if already present).
    pub fn with_child(&self, child_id: &str) -> Self {
        let mut updated = self.clone();
        if !updated.children.iter().any(|id| id == child_id) {
            updated.children.push(child_id.to_string());
        }
        updated
    }

    pub fn with_parent_shard(&self, shard_id: impl Into<String>) -> Self {
        let mut updated = self.clone();
        updated.parent_shard_id = Some(shard_id.into());
        updated
    }

    /// Copy with `child_id` registered under the shard matching `anchor`.
    ///
    /// An existing shard is reused only when its anchor is identical
    /// (start, end and selected text); otherwise a new shard is appended.
    pub fn with_shard_child(&self, anchor: &Anchor, child_id: &str) -> Self {
        let mut updated = self.clone();
        match updated.shards.iter().position(|shard| &shard.anchor == anchor) {
            Some(index) => {
                let shard = &mut updated.shards[index];
                if !shard.children.iter().any(|id| id == child_id) {
                    shard.children.push(child_id.to_string());
                }
            }
            None => {
                let mut shard = Shard::new(updated.next_shard_id(), anchor.clone());
                shard.children.push(child_id.to_string());
                updated.shards.push(shard);
            }
        }
        updated
    }

    /// Copy with `response` set on the latest exchange.
    pub fn with_response(&self, response: Response) -> Self {
        let mut updated = self.clone();
        if let Some(exchange) = updated.exchanges.last_mut() {
            exchange.response = Some(response);
        }
        updated
    }

    fn next_shard_id(&self) -> ShardId {
        let mut n = self.shards.len() + 1;
        loop {
            let candidate = format!("shard-{n}");
            if self.shard(&candidate).is_none() {
                return candidate;
            }
            n += 1;
        }
    }
}
