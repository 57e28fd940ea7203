//! Merges server-fetched message batches into the client's message list.
//!
//! `tool` messages never reach the view layer: [`fold_tool_messages`]
//! attaches each one to the preceding assistant message as a
//! [`ToolResult`], and [`merge_messages`] keeps such attachments alive
//! across later fetches that do not re-deliver them.

use serde_json::Value;
use shared_types::{ChatMessage, MessageRole, ToolResult};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Fold tool messages, then merge into `current`.
pub fn reconcile(current: &[ChatMessage], fetched: Vec<ChatMessage>) -> Vec<ChatMessage> {
    merge_messages(current, fold_tool_messages(fetched))
}

/// Id-keyed merge. Every id from either side appears once, fresh records
/// win except that an existing `tool_results` survives a fresh record
/// without one, and the result is ordered by `created_at` (stable on ties).
pub fn merge_messages(current: &[ChatMessage], fresh: Vec<ChatMessage>) -> Vec<ChatMessage> {
    let mut merged: Vec<ChatMessage> = Vec::with_capacity(current.len() + fresh.len());
    let mut positions: HashMap<String, usize> = HashMap::with_capacity(current.len());

    for message in current {
        match positions.get(&message.id) {
            Some(&pos) => merged[pos] = message.clone(),
            None => {
                positions.insert(message.id.clone(), merged.len());
                merged.push(message.clone());
            }
        }
    }

    for mut message in fresh {
        match positions.get(&message.id) {
            Some(&pos) => {
                if message.tool_results.is_none() {
                    message.tool_results = merged[pos].tool_results.take();
                }
                merged[pos] = message;
            }
            None => {
                positions.insert(message.id.clone(), merged.len());
                merged.push(message);
            }
        }
    }

    merged.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    merged
}

/// Removes `tool` messages from the batch and attaches their results to the
/// preceding assistant message. A tool message whose content is not valid
/// JSON is logged and skipped.
pub fn fold_tool_messages(batch: Vec<ChatMessage>) -> Vec<ChatMessage> {
    let mut output: Vec<ChatMessage> = Vec::with_capacity(batch.len());
    let mut anchor: Option<usize> = None;
    let mut group: Vec<ParsedToolMessage> = Vec::new();

    for message in batch {
        if message.role == MessageRole::Tool {
            match ParsedToolMessage::parse(&message) {
                Ok(parsed) => group.push(parsed),
                Err(e) => {
                    warn!(message_id = %message.id, error = %e, "Skipping malformed tool result");
                }
            }
            continue;
        }

        flush_group(&mut output, anchor, &mut group);
        if message.role == MessageRole::Assistant {
            anchor = Some(output.len());
        }
        output.push(message);
    }
    flush_group(&mut output, anchor, &mut group);

    output
}

fn flush_group(
    output: &mut [ChatMessage],
    anchor: Option<usize>,
    group: &mut Vec<ParsedToolMessage>,
) {
    if group.is_empty() {
        return;
    }
    let parsed = std::mem::take(group);
    match anchor.and_then(|idx| output.get_mut(idx)) {
        Some(assistant) => attach_tool_results(assistant, parsed),
        None => debug!(count = parsed.len(), "Dropping tool results with no preceding assistant message"),
    }
}

/// Matches each result to a tool call by call id, then by tool name, then by
/// position when the number of results equals the number of calls.
fn attach_tool_results(assistant: &mut ChatMessage, group: Vec<ParsedToolMessage>) {
    let calls = assistant.tool_calls.clone().unwrap_or_default();
    let positional = calls.len() == group.len();
    let mut claimed = vec![false; calls.len()];
    let mut results = assistant.tool_results.take().unwrap_or_default();

    for (position, parsed) in group.into_iter().enumerate() {
        let by_id = parsed
            .tool_call_id
            .as_deref()
            .and_then(|id| calls.iter().position(|call| call.id == id));
        let by_name = || {
            parsed.tool_name.as_deref().and_then(|name| {
                calls
                    .iter()
                    .enumerate()
                    .position(|(i, call)| !claimed[i] && call.name() == name)
            })
        };
        let by_position = || (positional && !claimed[position]).then_some(position);

        let mut result = parsed.result;
        if let Some(idx) = by_id.or_else(by_name).or_else(by_position) {
            claimed[idx] = true;
            result.tool_call_id = Some(calls[idx].id.clone());
            if result.tool_name.is_empty() {
                result.tool_name = calls[idx].name().to_string();
            }
        } else {
            result.tool_call_id = parsed.tool_call_id;
        }

        upsert_result(&mut results, result);
    }

    assistant.tool_results = Some(results);
}

fn upsert_result(results: &mut Vec<ToolResult>, result: ToolResult) {
    let existing = result.tool_call_id.as_ref().and_then(|id| {
        results
            .iter()
            .position(|r| r.tool_call_id.as_ref() == Some(id))
    });
    match existing {
        Some(idx) => results[idx] = result,
        None => results.push(result),
    }
}

struct ParsedToolMessage {
    tool_call_id: Option<String>,
    tool_name: Option<String>,
    result: ToolResult,
}

impl ParsedToolMessage {
    fn parse(message: &ChatMessage) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(&message.content)?;
        let object = value.as_object();
        let field = |keys: &[&str]| -> Option<String> {
            object.and_then(|o| {
                keys.iter()
                    .find_map(|k| o.get(*k).and_then(Value::as_str).map(String::from))
            })
        };

        let tool_call_id = message
            .tool_call_id
            .clone()
            .or_else(|| field(&["toolCallId", "tool_call_id"]));
        let tool_name = message
            .name
            .clone()
            .or_else(|| field(&["toolName", "tool_name", "name"]));
        let error = field(&["error"]);
        let success = object
            .and_then(|o| o.get("success"))
            .and_then(Value::as_bool)
            .unwrap_or(error.is_none());
        let payload = match object.and_then(|o| o.get("result")) {
            Some(result) => Some(result.clone()),
            None if error.is_some() => None,
            None => Some(value.clone()),
        };

        Ok(Self {
            tool_call_id,
            tool_name: tool_name.clone(),
            result: ToolResult {
                tool_name: tool_name.unwrap_or_default(),
                tool_call_id: None,
                success,
                result: payload,
                error,
            },
        })
    }
}
