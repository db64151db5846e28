//! Conversation turns exchanged with the language model.

use serde::{Deserialize, Serialize};

use super::document::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Human,
    Ai,
    Tool,
    System,
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// One entry of a thread's append-only history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,

    /// Which call a tool turn answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Raw documents behind a tool turn's serialized content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<Vec<Document>>,
}

impl Turn {
    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            artifact: None,
        }
    }

    pub fn human(content: impl Into<String>) -> Self {
        Self::plain(Role::Human, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Self::plain(Role::Ai, content)
    }

    pub fn ai_with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::plain(Role::Ai, content)
        }
    }

    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>, artifact: Vec<Document>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            artifact: Some(artifact),
            ..Self::plain(Role::Tool, content)
        }
    }

    pub fn is_tool(&self) -> bool {
        self.role == Role::Tool
    }

    /// Turns the answering model sees: human and system turns, plus ai
    /// turns that did not request tools.
    pub fn is_conversational(&self) -> bool {
        match self.role {
            Role::Human | Role::System => true,
            Role::Ai => self.tool_calls.is_empty(),
            Role::Tool => false,
        }
    }
}

/// A model reply: prose, tool calls, or both.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelReply {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
}

impl ModelReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn tool_call(call: ToolCall) -> Self {
        Self {
            content: String::new(),
            tool_calls: vec![call],
        }
    }

    pub fn into_turn(self) -> Turn {
        Turn::ai_with_tool_calls(self.content, self.tool_calls)
    }
}

/// The contiguous run of tool turns at the end of `turns`, oldest first.
pub fn trailing_tool_turns(turns: &[Turn]) -> &[Turn] {
    let start = turns
        .iter()
        .rposition(|t| !t.is_tool())
        .map(|i| i + 1)
        .unwrap_or(0);
    &turns[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_tool_turns_stops_at_last_non_tool() {
        let turns = vec![
            Turn::tool("old", "stale", vec![]),
            Turn::human("q"),
            Turn::ai_with_tool_calls("", vec![ToolCall::new("c1", "retrieve", serde_json::json!({}))]),
            Turn::tool("c1", "first", vec![]),
            Turn::tool("c2", "second", vec![]),
        ];

        let trailing = trailing_tool_turns(&turns);
        assert_eq!(trailing.len(), 2);
        assert_eq!(trailing[0].content, "first");
        assert_eq!(trailing[1].content, "second");
    }

    #[test]
    fn test_trailing_tool_turns_empty_when_last_is_not_tool() {
        let turns = vec![Turn::tool("c1", "x", vec![]), Turn::ai("done")];
        assert!(trailing_tool_turns(&turns).is_empty());
    }

    #[test]
    fn test_conversational_filter() {
        assert!(Turn::human("hi").is_conversational());
        assert!(Turn::system("rules").is_conversational());
        assert!(Turn::ai("answer").is_conversational());
        assert!(!Turn::ai_with_tool_calls("", vec![ToolCall::new("c", "retrieve", serde_json::Value::Null)]).is_conversational());
        assert!(!Turn::tool("c", "docs", vec![]).is_conversational());
    }
}
