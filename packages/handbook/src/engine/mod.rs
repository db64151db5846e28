//! Retrieval-augmented conversation engine.
//!
//! Each user turn walks a four-state graph:
//!
//! ```text
//! DECIDE --tool call--> RETRIEVE --> GENERATE --> END
//!    \------direct answer------------------------/
//! ```
//!
//! DECIDE shows the tool-bound model the whole thread. RETRIEVE fans the
//! query out over the province, `General` and company namespaces and
//! appends one tool turn. GENERATE answers from the latest artifact under
//! the two-section instruction in [`prompts`].

pub mod prompts;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{EngineError, Result};
use crate::partition::{partition_answer, PartitionedAnswer};
use crate::traits::{
    ai::{ChatModel, ToolSpec},
    history::ConversationStore,
    search::SearchIndex,
};
use crate::types::config::RetrievalConfig;
use crate::types::conversation::{trailing_tool_turns, ToolCall, Turn};
use crate::types::document::{serialize_documents, Document};

/// Arguments of the retrieval tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RetrieveArgs {
    /// The user's question.
    pub query: String,

    /// Province name such as "Alberta" or "British Columbia".
    pub province: String,

    /// Company whose own documents should also be searched.
    #[serde(default)]
    pub company: String,
}

/// Graph position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Decide,
    Retrieve,
    Generate,
    End,
}

/// Result of one engine run.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOutput {
    /// Final ai turn text.
    pub answer: String,

    /// Artifact the answer was generated from; empty without retrieval.
    pub documents: Vec<Document>,

    /// Turns this run appended to the thread.
    pub turns: Vec<Turn>,
}

impl EngineOutput {
    pub fn retrieved(&self) -> bool {
        self.turns.iter().any(Turn::is_tool)
    }
}

/// A question as asked by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskRequest {
    pub question: String,
    pub province: String,
    #[serde(default)]
    pub company: String,
    #[serde(default = "default_thread_id")]
    pub thread_id: String,
}

fn default_thread_id() -> String {
    "1".to_string()
}

impl AskRequest {
    pub fn new(question: impl Into<String>, province: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            province: province.into(),
            company: String::new(),
            thread_id: default_thread_id(),
        }
    }

    pub fn with_company(mut self, company: impl Into<String>) -> Self {
        self.company = company.into();
        self
    }

    pub fn with_thread(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = thread_id.into();
        self
    }

    /// The human turn handed to the engine.
    pub fn framed(&self) -> String {
        prompts::frame_question(&self.question, &self.province, Some(&self.company))
    }
}

/// Drives the conversation graph for one thread at a time.
pub struct ConversationEngine<M: ChatModel, I: SearchIndex, H: ConversationStore> {
    model: M,
    index: I,
    history: H,
    config: RetrievalConfig,
}

impl<M: ChatModel, I: SearchIndex, H: ConversationStore> ConversationEngine<M, I, H> {
    pub fn new(model: M, index: I, history: H) -> Self {
        Self {
            model,
            index,
            history,
            config: RetrievalConfig::default(),
        }
    }

    pub fn with_config(mut self, config: RetrievalConfig) -> Self {
        self.config = config;
        self
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn index(&self) -> &I {
        &self.index
    }

    pub fn history(&self) -> &H {
        &self.history
    }

    /// The retrieval tool as bound in the decide step.
    pub fn retrieve_tool() -> ToolSpec {
        ToolSpec {
            name: prompts::RETRIEVE_TOOL.to_string(),
            description: prompts::RETRIEVE_TOOL_DESCRIPTION.to_string(),
            parameters: tool_parameters::<RetrieveArgs>(),
        }
    }

    /// Ask a question and split the answer into its public and company parts.
    pub async fn ask(&self, request: &AskRequest) -> Result<PartitionedAnswer> {
        let output = self
            .run(&request.thread_id, Turn::human(request.framed()))
            .await?;
        Ok(partition_answer(&output.answer, &output.documents, &request.company))
    }

    /// Advance the graph from DECIDE to END for one user turn.
    ///
    /// New turns are appended to the thread only once END is reached.
    pub async fn run(&self, thread_id: &str, user_turn: Turn) -> Result<EngineOutput> {
        let mut thread = self.history.get(thread_id).await?;
        let prior = thread.len();
        thread.push(user_turn);

        let mut state = EngineState::Decide;
        let mut documents = Vec::new();

        while state != EngineState::End {
            debug!(thread_id, state = ?state, "Engine step");
            state = match state {
                EngineState::Decide => {
                    let reply = self
                        .model
                        .invoke_with_tools(&thread, &[Self::retrieve_tool()])
                        .await?;
                    let requested = !reply.tool_calls.is_empty();
                    thread.push(reply.into_turn());
                    if requested {
                        EngineState::Retrieve
                    } else {
                        EngineState::End
                    }
                }
                EngineState::Retrieve => {
                    let calls = thread.last().map(|t| t.tool_calls.clone()).unwrap_or_default();
                    for call in &calls {
                        thread.push(self.execute_tool(call).await?);
                    }
                    EngineState::Generate
                }
                EngineState::Generate => {
                    documents = latest_artifact(&thread)?;
                    debug!(
                        thread_id,
                        documents = documents.len(),
                        grammar = prompts::ANSWER_GRAMMAR_VERSION,
                        "Generating sectioned answer"
                    );
                    let reply = self.model.invoke(&self.generation_prompt(&thread, &documents)).await?;
                    thread.push(Turn::ai(reply.content));
                    EngineState::End
                }
                EngineState::End => EngineState::End,
            };
        }

        let turns = thread.split_off(prior);
        self.history.append(thread_id, turns.clone()).await?;

        let answer = turns.last().map(|t| t.content.clone()).unwrap_or_default();
        info!(
            thread_id,
            retrieved = turns.iter().any(Turn::is_tool),
            documents = documents.len(),
            "Conversation turn complete"
        );

        Ok(EngineOutput {
            answer,
            documents,
            turns,
        })
    }

    /// Search province, `General` and company namespaces, in that order.
    ///
    /// A blank province searches `General` once; a blank company skips the
    /// company search.
    pub async fn retrieve(&self, args: &RetrieveArgs) -> Result<Vec<Document>> {
        let general = self.config.general_namespace.as_str();
        let province = args.province.trim();
        let company = args.company.trim();

        let mut namespaces = Vec::with_capacity(3);
        if !province.is_empty() && province != general {
            namespaces.push(province);
        }
        namespaces.push(general);
        if !company.is_empty() {
            namespaces.push(company);
        }

        let mut docs = Vec::new();
        for namespace in namespaces {
            let found = self
                .index
                .similarity_search(&args.query, namespace, self.config.k)
                .await?;
            debug!(namespace, found = found.len(), "Retrieved");
            docs.extend(found);
        }
        Ok(docs)
    }

    async fn execute_tool(&self, call: &ToolCall) -> Result<Turn> {
        if call.name != prompts::RETRIEVE_TOOL {
            return Err(EngineError::UnknownTool {
                name: call.name.clone(),
            }
            .into());
        }

        let args: RetrieveArgs = serde_json::from_value(call.arguments.clone()).map_err(|e| {
            EngineError::InvalidToolArguments {
                name: call.name.clone(),
                reason: e.to_string(),
            }
        })?;

        let docs = self.retrieve(&args).await?;
        Ok(Turn::tool(call.id.clone(), serialize_documents(&docs), docs))
    }

    fn generation_prompt(&self, thread: &[Turn], documents: &[Document]) -> Vec<Turn> {
        let (company_docs, public_docs): (Vec<Document>, Vec<Document>) = documents
            .iter()
            .cloned()
            .partition(|d| d.metadata.company.is_some());

        let instruction = prompts::answer_instruction(
            &serialize_documents(&public_docs),
            &serialize_documents(&company_docs),
        );

        std::iter::once(Turn::system(instruction))
            .chain(thread.iter().filter(|t| t.is_conversational()).cloned())
            .collect()
    }
}

/// Documents of the last tool turn in the trailing tool run.
fn latest_artifact(thread: &[Turn]) -> Result<Vec<Document>> {
    trailing_tool_turns(thread)
        .last()
        .and_then(|t| t.artifact.clone())
        .ok_or_else(|| EngineError::MissingToolResult.into())
}

/// JSON schema for a tool's arguments, without the draft envelope.
///
/// Nested types are inlined in place of their `$ref`s so the schema stays
/// self-contained once `definitions` is dropped.
pub fn tool_parameters<T: JsonSchema>() -> serde_json::Value {
    let mut value = serde_json::to_value(schemars::schema_for!(T)).unwrap_or_default();
    if let Some(definitions) = value.get("definitions").cloned() {
        inline_refs(&mut value, &definitions);
    }
    if let Some(obj) = value.as_object_mut() {
        obj.remove("$schema");
        obj.remove("title");
        obj.remove("definitions");
    }
    value
}

fn inline_refs(value: &mut serde_json::Value, definitions: &serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            let target = map
                .get("$ref")
                .and_then(|r| r.as_str())
                .and_then(|r| r.strip_prefix("#/definitions/"))
                .and_then(|name| definitions.get(name))
                .cloned();
            if let Some(def) = target {
                *value = def;
                inline_refs(value, definitions);
                return;
            }
            for v in map.values_mut() {
                inline_refs(v, definitions);
            }
        }
        serde_json::Value::Array(items) => {
            for item in items {
                inline_refs(item, definitions);
            }
        }
        _ => {}
    }
}
