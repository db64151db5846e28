//! Model backends for the [`ChatModel`](crate::traits::ai::ChatModel) and
//! [`Embedder`](crate::traits::ai::Embedder) traits.

#[cfg(feature = "openai")]
mod openai;

#[cfg(feature = "openai")]
pub use openai::OpenAI;
