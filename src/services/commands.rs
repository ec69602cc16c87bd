//! Command processing: applies tool results to a feature collection and
//! forwards view/display effects to a [`StateSetter`].
//!
//! Processing is a dispatch over [`DebriefCommand`]. Feature mutations never
//! touch the input collection; they return a new one that shares every
//! untouched feature with it.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt::Display;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::models::command::command_tag;
use crate::models::{
    parse_command, DebriefCommand, Feature, FeatureCollection, FeatureId, LogLevel,
    SUPPORTED_COMMANDS,
};
use crate::state::StateSetter;
use crate::DebriefError;

/// Pipeline behaviour switches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandConfig {
    /// Restore the pre-batch feature collection when a composite or batch
    /// fails part way (default: false)
    pub enable_rollback: bool,
    /// Deepest allowed composite nesting (default: 10)
    pub max_composite_depth: usize,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            enable_rollback: false,
            max_composite_depth: 10,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features_affected: Option<usize>,
    pub operation_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commands_processed: Option<usize>,
}

/// Outcome of processing one command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult {
    pub success: bool,
    /// The collection after the command, for commands that produce one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_collection: Option<FeatureCollection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub metadata: CommandMetadata,
}

impl CommandResult {
    fn ok(operation: &str, fc: Option<FeatureCollection>, affected: Option<usize>) -> Self {
        Self {
            success: true,
            feature_collection: fc,
            error: None,
            metadata: CommandMetadata {
                features_affected: affected,
                operation_type: operation.to_string(),
                commands_processed: None,
            },
        }
    }

    fn failed(operation: &str, error: impl Display) -> Self {
        Self {
            success: false,
            feature_collection: None,
            error: Some(error.to_string()),
            metadata: CommandMetadata {
                operation_type: operation.to_string(),
                ..Default::default()
            },
        }
    }
}

/// Outcome of processing a sequence of commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandBatchOutcome {
    pub success: bool,
    /// One result per command processed; stops after the first failure.
    pub results: Vec<CommandResult>,
    /// Collection after the batch (the starting one if rolled back).
    pub feature_collection: FeatureCollection,
    pub rolled_back: bool,
}

/// Append `features` to the collection. No dedup, no id checks.
pub fn add_features(fc: &FeatureCollection, features: &[Feature]) -> FeatureCollection {
    let combined = fc
        .features
        .iter()
        .cloned()
        .chain(features.iter().cloned().map(Arc::new))
        .collect();
    fc.with_features(combined)
}

/// Replace, wholesale, every existing feature whose id matches an incoming
/// one. Incoming features with no counterpart are dropped.
///
/// Returns the new collection and the number of replaced features.
pub fn update_features(fc: &FeatureCollection, updates: &[Feature]) -> (FeatureCollection, usize) {
    let mut replaced = 0;
    let features = fc
        .features
        .iter()
        .map(|existing| {
            let incoming = existing
                .id
                .as_ref()
                .and_then(|id| updates.iter().find(|u| u.id.as_ref() == Some(id)));
            match incoming {
                Some(update) => {
                    replaced += 1;
                    Arc::new(update.clone())
                }
                None => Arc::clone(existing),
            }
        })
        .collect();
    (fc.with_features(features), replaced)
}

/// Remove every feature whose stringified id is in `ids`.
///
/// Returns the new collection and the number of removed features.
pub fn delete_features(fc: &FeatureCollection, ids: &[FeatureId]) -> (FeatureCollection, usize) {
    let doomed: HashSet<String> = ids.iter().map(|id| id.to_string()).collect();
    let features: Vec<Arc<Feature>> = fc
        .features
        .iter()
        .filter(|f| !f.id_string().is_some_and(|id| doomed.contains(&id)))
        .cloned()
        .collect();
    let removed = fc.len() - features.len();
    (fc.with_features(features), removed)
}

/// Applies [`DebriefCommand`]s.
pub struct CommandProcessor {
    setter: Arc<dyn StateSetter>,
    config: CommandConfig,
}

impl CommandProcessor {
    pub fn new(setter: Arc<dyn StateSetter>, config: CommandConfig) -> Self {
        Self { setter, config }
    }

    pub fn config(&self) -> &CommandConfig {
        &self.config
    }

    pub fn supported_commands() -> &'static [&'static str] {
        SUPPORTED_COMMANDS
    }

    /// Whether `value` parses as a processable command.
    pub fn is_valid_command(value: &Value) -> bool {
        parse_command(value).is_ok()
    }

    /// Parse raw tool output and process it.
    ///
    /// Structurally invalid or unsupported commands fail here and never
    /// reach a processor.
    pub async fn process_value(&self, value: &Value, fc: &FeatureCollection) -> CommandResult {
        match parse_command(value) {
            Ok(command) => self.process_command(&command, fc).await,
            Err(e) => {
                let operation = command_tag(value).unwrap_or("unknown");
                warn!(operation, "Rejected command: {}", e);
                CommandResult::failed(operation, e)
            }
        }
    }

    pub async fn process_command(
        &self,
        command: &DebriefCommand,
        fc: &FeatureCollection,
    ) -> CommandResult {
        self.process_at_depth(command, fc, 0).await
    }

    fn process_at_depth<'a>(
        &'a self,
        command: &'a DebriefCommand,
        fc: &'a FeatureCollection,
        depth: usize,
    ) -> BoxFuture<'a, CommandResult> {
        Box::pin(async move {
            let op = command.tag();
            debug!(operation = op, depth, "Processing command");

            match command {
                DebriefCommand::AddFeatures(features) => {
                    CommandResult::ok(op, Some(add_features(fc, features)), Some(features.len()))
                }
                DebriefCommand::UpdateFeatures(features) => {
                    let (updated, replaced) = update_features(fc, features);
                    CommandResult::ok(op, Some(updated), Some(replaced))
                }
                DebriefCommand::DeleteFeatures(ids) => {
                    let (remaining, removed) = delete_features(fc, ids);
                    CommandResult::ok(op, Some(remaining), Some(removed))
                }
                DebriefCommand::SetFeatureCollection(replacement) => {
                    CommandResult::ok(op, Some(replacement.clone()), Some(replacement.len()))
                }
                DebriefCommand::SetViewport(viewport) => {
                    self.setter.set_viewport_state(*viewport).await;
                    CommandResult::ok(op, None, None)
                }
                DebriefCommand::SetSelection(selection) => {
                    self.setter.set_selection_state(selection.clone()).await;
                    CommandResult::ok(op, None, None)
                }
                DebriefCommand::SetTimeState(time) => {
                    self.setter.set_time_state(time.clone()).await;
                    CommandResult::ok(op, None, None)
                }
                DebriefCommand::ShowText(text) => {
                    self.setter.show_text(text.clone()).await;
                    CommandResult::ok(op, None, None)
                }
                DebriefCommand::ShowData(data) => {
                    self.setter.show_data(data.clone()).await;
                    CommandResult::ok(op, None, None)
                }
                DebriefCommand::ShowImage(image) => {
                    if !image.is_complete() {
                        return CommandResult::failed(
                            op,
                            DebriefError::PayloadShape("Invalid image payload structure".into()),
                        );
                    }
                    self.setter.show_image(image.clone()).await;
                    CommandResult::ok(op, None, None)
                }
                DebriefCommand::LogMessage(payload) => {
                    let message = payload.message();
                    match payload.level() {
                        LogLevel::Error => tracing::error!(target: "debrief::tool", "{}", message),
                        LogLevel::Warn => tracing::warn!(target: "debrief::tool", "{}", message),
                        LogLevel::Info => tracing::info!(target: "debrief::tool", "{}", message),
                        LogLevel::Debug => tracing::debug!(target: "debrief::tool", "{}", message),
                    }
                    self.setter
                        .log_message(message.to_string(), payload.level())
                        .await;
                    CommandResult::ok(op, None, None)
                }
                DebriefCommand::Composite(items) => {
                    self.process_composite(items, fc, depth).await
                }
            }
        })
    }

    /// Run a composite's sub-commands in order against a running collection.
    ///
    /// Each sub-command is parsed only when its turn comes, so a malformed
    /// step still lets the steps before it take effect.
    async fn process_composite(
        &self,
        items: &[Value],
        fc: &FeatureCollection,
        depth: usize,
    ) -> CommandResult {
        let op = "composite";
        if depth >= self.config.max_composite_depth {
            return CommandResult::failed(
                op,
                DebriefError::CompositeDepth(self.config.max_composite_depth),
            );
        }

        let mut current = fc.clone();
        let mut produced: Option<FeatureCollection> = None;
        let mut affected = 0;

        for (index, item) in items.iter().enumerate() {
            let (tag, result) = match parse_command(item) {
                Ok(command) => {
                    let result = self.process_at_depth(&command, &current, depth + 1).await;
                    (command.tag(), result)
                }
                Err(e) => {
                    let tag = command_tag(item).unwrap_or("unknown");
                    (tag, CommandResult::failed(tag, e))
                }
            };

            if !result.success {
                let mut failure = CommandResult::failed(
                    op,
                    format!(
                        "Composite command failed at step {} ({}): {}",
                        index + 1,
                        tag,
                        result.error.unwrap_or_default()
                    ),
                );
                // Without rollback, earlier sub-commands' effects stay visible.
                failure.feature_collection = Some(if self.config.enable_rollback {
                    fc.clone()
                } else {
                    current
                });
                failure.metadata.commands_processed = Some(index);
                return failure;
            }

            affected += result.metadata.features_affected.unwrap_or(0);
            if let Some(next) = result.feature_collection {
                current = next.clone();
                produced = Some(next);
            }
        }

        let mut success = CommandResult::ok(
            op,
            Some(produced.unwrap_or_else(|| fc.clone())),
            Some(affected),
        );
        success.metadata.commands_processed = Some(items.len());
        success
    }

    /// Process commands in order, stopping at the first failure.
    pub async fn process_commands(
        &self,
        commands: &[DebriefCommand],
        fc: &FeatureCollection,
    ) -> CommandBatchOutcome {
        let mut run = BatchRun::new(fc, commands.len());
        for command in commands {
            let result = self.process_command(command, &run.current).await;
            if !run.record(result) {
                break;
            }
        }
        run.finish(self.config.enable_rollback)
    }

    /// Parse and process raw commands (a single command or an array).
    ///
    /// Items are parsed one at a time, right before they run; a parse
    /// failure stops the batch like any other failed command.
    pub async fn process_values(&self, value: &Value, fc: &FeatureCollection) -> CommandBatchOutcome {
        let items: Vec<&Value> = match value.as_array() {
            Some(items) => items.iter().collect(),
            None => vec![value],
        };
        let mut run = BatchRun::new(fc, items.len());
        for item in items {
            let result = self.process_value(item, &run.current).await;
            if !run.record(result) {
                break;
            }
        }
        run.finish(self.config.enable_rollback)
    }
}

/// Running state of an ordered batch.
struct BatchRun<'a> {
    start: &'a FeatureCollection,
    current: FeatureCollection,
    results: Vec<CommandResult>,
}

impl<'a> BatchRun<'a> {
    fn new(start: &'a FeatureCollection, capacity: usize) -> Self {
        Self {
            start,
            current: start.clone(),
            results: Vec::with_capacity(capacity),
        }
    }

    /// Adopt the result's collection. Returns `false` once the batch must stop.
    fn record(&mut self, result: CommandResult) -> bool {
        if let Some(next) = &result.feature_collection {
            self.current = next.clone();
        }
        let success = result.success;
        self.results.push(result);
        success
    }

    fn finish(self, enable_rollback: bool) -> CommandBatchOutcome {
        let success = self.results.last().map_or(true, |r| r.success);
        let rolled_back = !success && enable_rollback;
        if let Some(failed) = self.results.last().filter(|r| !r.success) {
            warn!(
                operation = %failed.metadata.operation_type,
                rolled_back, "Command batch stopped at first failure"
            );
        }
        CommandBatchOutcome {
            success,
            results: self.results,
            feature_collection: if rolled_back {
                self.start.clone()
            } else {
                self.current
            },
            rolled_back,
        }
    }
}
