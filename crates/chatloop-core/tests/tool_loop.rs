//! Behavior of one conversational turn against scripted models.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};

use chatloop_core::provider::GenerationOptions;
use chatloop_core::{
    AgentBuilder, AgentError, Completion, Conversation, LlmProvider, Message, ParameterSchema,
    RequestedCall, Result, Tool, ToolArguments, ToolCall, ToolFailure, ToolRegistry, ToolResult,
    ToolSchema, TurnObserver,
};

type Script = dyn Fn(&[Message], usize) -> Result<Completion> + Send + Sync;

/// Provider whose replies come from a closure of (history, call index)
struct ScriptedProvider {
    script: Box<Script>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    fn new(script: impl Fn(&[Message], usize) -> Result<Completion> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            script: Box::new(script),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    async fn complete(
        &self,
        messages: &[Message],
        _tools: &[ToolSchema],
        _options: &GenerationOptions,
    ) -> Result<Completion> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        (self.script)(messages, index)
    }
}

/// Upper-cases `text`; fails on "boom"
struct ShoutTool;

#[async_trait]
impl Tool for ShoutTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "shout".into(),
            description: "Upper-case the text".into(),
            parameters: vec![ParameterSchema::required_string("text", "Text to shout")],
            category: None,
        }
    }

    async fn invoke(&self, args: &ToolArguments) -> std::result::Result<String, ToolFailure> {
        let text = args.get("text").and_then(Value::as_str).unwrap_or_default();
        if text == "boom" {
            return Err(ToolFailure::Execution("shout exploded".into()));
        }
        Ok(text.to_uppercase())
    }
}

fn registry() -> ToolRegistry {
    ToolRegistry::builder().register(ShoutTool).build().unwrap()
}

fn shout(id: &str, text: &str) -> RequestedCall {
    RequestedCall::new("shout", json!({ "text": text })).with_id(id)
}

/// Request `calls` first, then answer with the last tool message's text
fn call_then_echo(calls: Vec<RequestedCall>) -> impl Fn(&[Message], usize) -> Result<Completion> {
    move |history: &[Message], _: usize| match history.last() {
        Some(Message::Tool { content, .. }) => Ok(Completion::text(format!("Result: {content}"))),
        _ => Ok(Completion::with_tool_calls(calls.clone())),
    }
}

fn tool_messages(conversation: &Conversation) -> Vec<(String, String, bool)> {
    conversation
        .iter()
        .filter_map(|m| match m {
            Message::Tool {
                tool_call_id,
                content,
                is_error,
                ..
            } => Some((tool_call_id.clone(), content.clone(), *is_error)),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn plain_answer_takes_exactly_one_model_call() {
    let provider = ScriptedProvider::new(|_, _| Ok(Completion::text("Hello there")));
    let agent = AgentBuilder::new()
        .provider(provider.clone())
        .tools(registry())
        .build()
        .unwrap();

    let mut conversation = Conversation::new();
    let outcome = agent.advance(&mut conversation, "hi").await.unwrap();

    assert_eq!(provider.calls(), 1);
    assert_eq!(outcome.answer, "Hello there");
    assert_eq!(outcome.rounds, 1);
    assert!(!outcome.exhausted);
    assert_eq!(conversation.len(), 2);
    assert_eq!(conversation.messages()[0].text(), Some("hi"));
}

#[tokio::test]
async fn one_result_per_invocation_in_issue_order() {
    let provider = ScriptedProvider::new(call_then_echo(vec![
        shout("first", "a"),
        shout("second", "b"),
        shout("third", "c"),
    ]));
    let agent = AgentBuilder::new()
        .provider(provider.clone())
        .tools(registry())
        .build()
        .unwrap();

    let mut conversation = Conversation::new();
    let outcome = agent.advance(&mut conversation, "shout abc").await.unwrap();

    let results = tool_messages(&conversation);
    let ids: Vec<&str> = results.iter().map(|(id, _, _)| id.as_str()).collect();
    assert_eq!(ids, ["first", "second", "third"]);
    assert_eq!(results[1].1, "B");
    assert!(conversation.is_well_formed());
    assert_eq!(outcome.tools_called, ["shout", "shout", "shout"]);
    assert_eq!(outcome.answer, "Result: C");
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn unknown_tool_is_reported_not_raised() {
    let provider = ScriptedProvider::new(call_then_echo(vec![
        RequestedCall::new("nonexistent", json!({})).with_id("x"),
    ]));
    let agent = AgentBuilder::new()
        .provider(provider.clone())
        .tools(registry())
        .build()
        .unwrap();

    let mut conversation = Conversation::new();
    let outcome = agent.advance(&mut conversation, "use the thing").await.unwrap();

    let results = tool_messages(&conversation);
    assert_eq!(results.len(), 1);
    assert!(results[0].1.contains("Unknown tool: nonexistent"));
    assert!(results[0].2);
    assert!(outcome.tools_called.is_empty());
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn failing_tool_is_followed_by_another_model_call() {
    let provider = ScriptedProvider::new(call_then_echo(vec![shout("c1", "boom")]));
    let agent = AgentBuilder::new()
        .provider(provider.clone())
        .tools(registry())
        .build()
        .unwrap();

    let mut conversation = Conversation::new();
    let outcome = agent.advance(&mut conversation, "shout boom").await.unwrap();

    let results = tool_messages(&conversation);
    assert!(results[0].1.starts_with("Error:"));
    assert!(results[0].1.contains("shout exploded"));
    assert_eq!(provider.calls(), 2);
    assert!(outcome.answer.contains("shout exploded"));
}

#[tokio::test]
async fn endless_tool_requests_stop_at_round_bound() {
    let provider = ScriptedProvider::new(|_, i| {
        Ok(Completion::with_tool_calls(vec![shout(&format!("c{i}"), "again")]))
    });
    let agent = AgentBuilder::new()
        .provider(provider.clone())
        .tools(registry())
        .max_rounds(5)
        .exhausted_reply("Sorry, giving up.")
        .build()
        .unwrap();

    let mut conversation = Conversation::new();
    let outcome = agent.advance(&mut conversation, "loop forever").await.unwrap();

    assert_eq!(provider.calls(), 5);
    assert!(outcome.exhausted);
    assert_eq!(outcome.rounds, 5);
    assert_eq!(outcome.answer, "Sorry, giving up.");
    // user + 5 × (assistant + tool)
    assert_eq!(conversation.len(), 11);
    assert!(conversation.is_well_formed());
}

#[tokio::test]
async fn missing_arguments_are_repaired_to_empty_mapping() {
    let provider = ScriptedProvider::new(call_then_echo(vec![RequestedCall {
        id: Some("bad".into()),
        name: "shout".into(),
        arguments: None,
    }]));
    let agent = AgentBuilder::new()
        .provider(provider)
        .tools(registry())
        .build()
        .unwrap();

    let mut conversation = Conversation::new();
    agent.advance(&mut conversation, "shout").await.unwrap();

    let calls = conversation.messages()[1].tool_calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].arguments.is_empty());

    let results = tool_messages(&conversation);
    assert!(results[0].1.contains("Missing required parameter: text"));
}

#[tokio::test]
async fn model_failure_keeps_only_the_user_message() {
    let provider = ScriptedProvider::new(|_, i| {
        if i == 0 {
            Ok(Completion::with_tool_calls(vec![shout("c1", "a")]))
        } else {
            Err(AgentError::ModelUnavailable("connection reset".into()))
        }
    });
    let agent = AgentBuilder::new()
        .provider(provider)
        .tools(registry())
        .build()
        .unwrap();

    let mut conversation = Conversation::new();
    conversation.push(Message::user("earlier"));
    conversation.push(Message::assistant("earlier answer"));

    let err = agent.advance(&mut conversation, "shout a").await.unwrap_err();

    assert!(matches!(err, AgentError::ModelUnavailable(_)));
    assert_eq!(conversation.len(), 3);
    assert_eq!(conversation.last().and_then(Message::text), Some("shout a"));
}

#[tokio::test]
async fn history_only_grows_across_turns() {
    let provider = ScriptedProvider::new(call_then_echo(vec![shout("c", "x")]));
    let agent = AgentBuilder::new()
        .provider(provider)
        .tools(registry())
        .build()
        .unwrap();

    let mut conversation = Conversation::new();
    let mut snapshot: Vec<Message> = Vec::new();

    for turn in ["one", "two", "three"] {
        agent.advance(&mut conversation, turn).await.unwrap();
        assert!(conversation.len() > snapshot.len());
        assert_eq!(&conversation.messages()[..snapshot.len()], snapshot.as_slice());
        snapshot = conversation.messages().to_vec();
    }

    assert!(conversation.is_well_formed());
}

#[derive(Default)]
struct Recorder {
    events: Vec<String>,
}

impl TurnObserver for Recorder {
    fn on_tool_call(&mut self, call: &ToolCall) {
        self.events.push(format!("call:{}", call.id));
    }

    fn on_tool_result(&mut self, result: &ToolResult) {
        self.events.push(format!("result:{}:{}", result.id, result.output));
    }
}

#[tokio::test]
async fn observer_sees_calls_and_results_in_order() {
    let provider = ScriptedProvider::new(call_then_echo(vec![shout("a", "x"), shout("b", "y")]));
    let agent = AgentBuilder::new()
        .provider(provider)
        .tools(registry())
        .build()
        .unwrap();

    let mut recorder = Recorder::default();
    let mut conversation = Conversation::new();
    agent
        .advance_observed(&mut conversation, "shout", &mut recorder)
        .await
        .unwrap();

    assert_eq!(
        recorder.events,
        ["call:a", "result:a:X", "call:b", "result:b:Y"]
    );
}
