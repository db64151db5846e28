//! Function calling types.
//!
//! A [`ToolDefinition`] carries a JSON schema for its arguments; the model
//! answers with [`ToolCall`]s whose arguments deserialize into a typed struct.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// OpenAI tool definition.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    /// The name of the tool.
    pub name: String,

    /// A description of what the tool does.
    pub description: String,

    /// JSON schema for the tool's parameters.
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    /// Convert to OpenAI API format.
    pub fn to_openai_format(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters
            }
        })
    }
}

/// A tool call from the model, in the wire shape the API uses both ways.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// The ID of this tool call (for matching responses).
    pub id: String,

    #[serde(rename = "type", default = "function_kind")]
    pub kind: String,

    pub function: FunctionCall,
}

/// Name and JSON-encoded arguments of a call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String,
}

fn function_kind() -> String {
    "function".to_string()
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: function_kind(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }

    /// Parse arguments into a typed struct.
    pub fn parse_args<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.function.arguments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct LookupArgs {
        query: String,
        province: Option<String>,
    }

    #[test]
    fn test_definition_wraps_function() {
        let def = ToolDefinition {
            name: "lookup".into(),
            description: "Look up employment guidance".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": { "query": { "type": "string" } },
                "required": ["query"]
            }),
        };
        let wire = def.to_openai_format();

        assert_eq!(wire["type"], "function");
        assert_eq!(wire["function"]["name"], "lookup");
        assert_eq!(wire["function"]["parameters"]["properties"]["query"]["type"], "string");
        assert_eq!(wire["function"]["parameters"]["required"], serde_json::json!(["query"]));
    }

    #[test]
    fn test_call_from_wire() {
        let call: ToolCall = serde_json::from_value(serde_json::json!({
            "id": "call_9",
            "type": "function",
            "function": {
                "name": "lookup",
                "arguments": "{\"query\": \"overtime\", \"province\": \"Ontario\"}"
            }
        }))
        .unwrap();

        let args: LookupArgs = call.parse_args().unwrap();
        assert_eq!(args.query, "overtime");
        assert_eq!(args.province.as_deref(), Some("Ontario"));
    }

    #[test]
    fn test_missing_type_defaults_to_function() {
        let call: ToolCall = serde_json::from_str(
            r#"{"id": "c", "function": {"name": "lookup", "arguments": "{}"}}"#,
        )
        .unwrap();
        assert_eq!(call.kind, "function");
        assert!(call.parse_args::<LookupArgs>().is_err());
    }
}
