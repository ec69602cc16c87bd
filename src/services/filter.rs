//! Tool filtering: which tools in a catalogue can run against the current
//! feature selection, and how they should be invoked.

use chrono::{DateTime, Utc};
use moka::sync::Cache;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::models::{Feature, ParameterSchema, Tool, ToolCatalogue};
use crate::services::classify::{classify_parameter, ParamKind, StateKind};
use crate::DebriefError;

/// Cache configuration for the filter engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// How long a memoized result stays valid (default: 60 000 ms)
    pub cache_ttl_ms: u64,
    /// Maximum number of memoized results (default: 1 000)
    pub cache_capacity: u64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            cache_ttl_ms: 60_000,
            cache_capacity: 1_000,
        }
    }
}

/// How many times, and with what grouping, a tool has to be invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionModeKind {
    /// One invocation.
    #[default]
    Single,
    /// One invocation per matching feature.
    Multiple,
    /// One invocation with all matching features passed together.
    Batch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionMode {
    pub mode: ExecutionModeKind,
    pub description: String,
    pub parameter_details: BTreeMap<String, String>,
}

/// Diagnostic verdict for one parameter of one tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterValidation {
    pub kind: ParamKind,
    pub can_satisfy: bool,
    pub is_required: bool,
    pub matching_feature_count: usize,
    pub is_state_parameter: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_type: Option<StateKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolValidationResult {
    pub tool_name: String,
    pub is_valid: bool,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter_validation: Option<BTreeMap<String, ParameterValidation>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_mode: Option<ExecutionMode>,
    pub missing_required_params: Vec<String>,
}

impl ToolValidationResult {
    /// A tool with nothing to check.
    fn unconditional(tool: &Tool) -> Self {
        Self {
            tool_name: tool.name.clone(),
            is_valid: true,
            warnings: Vec::new(),
            parameter_validation: None,
            execution_mode: None,
            missing_required_params: Vec::new(),
        }
    }
}

/// A tool whose validation failed outright.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolFilterError {
    pub tool_name: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolFilterResult {
    /// Applicable tools, in catalogue order.
    pub tools: Vec<Tool>,
    pub errors: Vec<ToolFilterError>,
    pub warnings: Vec<String>,
    /// Validation details for every tool that was evaluated.
    pub validations: Vec<ToolValidationResult>,
}

impl ToolFilterResult {
    pub fn validation(&self, tool_name: &str) -> Option<&ToolValidationResult> {
        self.validations.iter().find(|v| v.tool_name == tool_name)
    }
}

#[derive(Debug, Clone)]
pub struct CachedResult {
    pub result: Arc<ToolFilterResult>,
    pub timestamp: DateTime<Utc>,
    pub input_hash: String,
}

/// Hash of the inputs a filter result depends on: each feature's id and
/// geometry type, plus the sorted tool names.
pub fn input_hash(features: &[Feature], tools: &[Tool]) -> String {
    let feature_part = features
        .iter()
        .map(|f| {
            format!(
                "{}:{}",
                f.id_string().unwrap_or_default(),
                f.geometry_type().unwrap_or_default()
            )
        })
        .collect::<Vec<_>>()
        .join(",");
    let mut names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
    names.sort_unstable();

    let mut hasher = DefaultHasher::new();
    feature_part.hash(&mut hasher);
    names.join(",").hash(&mut hasher);
    format!("{:x}", hasher.finish())
}

/// Evaluate one parameter against the selection.
fn evaluate_parameter(
    name: &str,
    schema: &ParameterSchema,
    is_required: bool,
    features: &[Feature],
) -> ParameterValidation {
    let kind = classify_parameter(name, schema);
    match kind {
        ParamKind::State(state) => ParameterValidation {
            kind,
            can_satisfy: true,
            is_required,
            matching_feature_count: 0,
            is_state_parameter: true,
            state_type: Some(state),
            note: Some(format!(
                "Supplied externally from the current {}",
                state.label()
            )),
        },
        ParamKind::Config => ParameterValidation {
            kind,
            can_satisfy: false,
            is_required,
            matching_feature_count: 0,
            is_state_parameter: false,
            state_type: None,
            note: Some("Configuration parameter; cannot be satisfied by selection".into()),
        },
        _ => {
            let count = kind.count_matches(features);
            ParameterValidation {
                kind,
                can_satisfy: count > 0,
                is_required,
                matching_feature_count: count,
                is_state_parameter: false,
                state_type: None,
                note: (count == 0)
                    .then(|| format!("No selected features match expected {}", kind.label())),
            }
        }
    }
}

/// Decide single/multiple/batch from the required parameters' matches.
///
/// A collection parameter gets the whole selection whether or not it is
/// required, so an optional one also forces batch mode.
fn infer_execution_mode(
    properties: &BTreeMap<String, ParameterSchema>,
    validations: &BTreeMap<String, ParameterValidation>,
) -> ExecutionMode {
    let mut batch_size = None;
    let mut multiple_size = None;
    let mut parameter_details = BTreeMap::new();

    for (name, schema) in properties {
        let Some(pv) = validations.get(name) else {
            continue;
        };
        let count = pv.matching_feature_count;
        if !pv.kind.is_feature() || count == 0 {
            continue;
        }
        if !pv.is_required && pv.kind != ParamKind::FeatureCollection {
            continue;
        }

        let detail = if pv.kind == ParamKind::FeatureCollection {
            batch_size = batch_size.max(Some(count));
            format!("{} features passed as one collection", count)
        } else if schema.is_array() && count > 1 {
            batch_size = batch_size.max(Some(count));
            format!("{} {} features passed together", count, pv.kind.label())
        } else if count > 1 {
            multiple_size = multiple_size.max(Some(count));
            format!(
                "{} matching {} features, one invocation each",
                count,
                pv.kind.label()
            )
        } else {
            format!("1 matching {} feature", pv.kind.label())
        };
        parameter_details.insert(name.clone(), detail);
    }

    let (mode, description) = match (batch_size, multiple_size) {
        (Some(n), _) => (
            ExecutionModeKind::Batch,
            format!("Single execution with all {} matching features passed together", n),
        ),
        (None, Some(n)) => (
            ExecutionModeKind::Multiple,
            format!("Executed once for each of the {} matching features", n),
        ),
        (None, None) => (
            ExecutionModeKind::Single,
            "Single execution with the matched features".to_string(),
        ),
    };

    ExecutionMode {
        mode,
        description,
        parameter_details,
    }
}

/// Validate one tool against a non-empty selection.
///
/// A required parameter missing from `properties` is a malformed schema and
/// comes back as an error rather than a failed validation.
pub fn validate_tool(
    tool: &Tool,
    features: &[Feature],
) -> Result<ToolValidationResult, DebriefError> {
    let Some(properties) = tool.properties() else {
        return Ok(ToolValidationResult::unconditional(tool));
    };

    let mut validations = BTreeMap::new();
    for name in tool.required() {
        let schema = properties.get(name).ok_or_else(|| {
            DebriefError::Validation(format!(
                "Tool '{}' requires undeclared parameter '{}'",
                tool.name, name
            ))
        })?;
        validations.insert(name.clone(), evaluate_parameter(name, schema, true, features));
    }
    // Optional parameters are evaluated for display only.
    for (name, schema) in properties {
        if !tool.is_required(name) {
            validations.insert(name.clone(), evaluate_parameter(name, schema, false, features));
        }
    }

    let missing_required_params: Vec<String> = tool
        .required()
        .iter()
        .filter(|name| validations.get(*name).is_some_and(|pv| !pv.can_satisfy))
        .cloned()
        .collect();

    let warnings = missing_required_params
        .iter()
        .map(|name| match validations.get(name).map(|pv| pv.kind) {
            Some(ParamKind::Config) => format!("Required parameter '{}' needs user input", name),
            _ => format!(
                "Required parameter '{}' cannot be satisfied by the current selection",
                name
            ),
        })
        .collect();

    let execution_mode = infer_execution_mode(properties, &validations);

    Ok(ToolValidationResult {
        tool_name: tool.name.clone(),
        is_valid: missing_required_params.is_empty(),
        warnings,
        parameter_validation: Some(validations),
        execution_mode: Some(execution_mode),
        missing_required_params,
    })
}

/// Filters a tool catalogue against a feature selection, memoizing results.
pub struct ToolFilterService {
    cache: Cache<String, Arc<CachedResult>>,
    config: FilterConfig,
}

impl ToolFilterService {
    pub fn new(config: FilterConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.cache_capacity)
            .build();
        Self { cache, config }
    }

    pub fn with_defaults() -> Self {
        Self::new(FilterConfig::default())
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    fn is_fresh(&self, entry: &CachedResult, now: DateTime<Utc>) -> bool {
        let age_ms = (now - entry.timestamp).num_milliseconds();
        age_ms >= 0 && (age_ms as u64) < self.config.cache_ttl_ms
    }

    /// Tools applicable to `features`, with diagnostics.
    ///
    /// Identical inputs within the TTL return the same `Arc` without
    /// recomputing.
    pub fn get_applicable_tools(
        &self,
        features: &[Feature],
        catalogue: &ToolCatalogue,
    ) -> Arc<ToolFilterResult> {
        let key = input_hash(features, &catalogue.tools);

        if let Some(entry) = self.cache.get(&key) {
            if self.is_fresh(&entry, Utc::now()) {
                debug!(hash = %key, "Tool filter cache hit");
                return entry.result.clone();
            }
            self.cache.invalidate(&key);
        }

        let result = Arc::new(self.compute(features, &catalogue.tools));
        info!(
            "Filtered {} tools for {} features: {} applicable, {} errors",
            catalogue.tools.len(),
            features.len(),
            result.tools.len(),
            result.errors.len()
        );

        self.cache.insert(
            key.clone(),
            Arc::new(CachedResult {
                result: result.clone(),
                timestamp: Utc::now(),
                input_hash: key,
            }),
        );
        result
    }

    fn compute(&self, features: &[Feature], tools: &[Tool]) -> ToolFilterResult {
        let mut result = ToolFilterResult::default();

        if features.is_empty() {
            // Tools with no required parameters stay visible without a selection.
            for tool in tools.iter().filter(|t| t.required().is_empty()) {
                result.tools.push(tool.clone());
                result
                    .validations
                    .push(ToolValidationResult::unconditional(tool));
            }
            if result.tools.len() < tools.len() {
                result.warnings.push(format!(
                    "No features selected: {} of {} tools need no required parameters",
                    result.tools.len(),
                    tools.len()
                ));
            }
            return result;
        }

        for tool in tools {
            match validate_tool(tool, features) {
                Ok(validation) => {
                    if validation.is_valid {
                        result.tools.push(tool.clone());
                    } else {
                        debug!(tool = %tool.name, missing = ?validation.missing_required_params, "Tool rejected");
                        result.warnings.push(format!(
                            "Tool '{}' has {} unsatisfied required parameter(s)",
                            tool.name,
                            validation.missing_required_params.len()
                        ));
                    }
                    result.validations.push(validation);
                }
                Err(e) => {
                    warn!(tool = %tool.name, "Tool validation failed: {}", e);
                    result.errors.push(ToolFilterError {
                        tool_name: tool.name.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        if result.tools.is_empty() {
            result.warnings.push(format!(
                "No applicable tools found for the {} selected feature(s)",
                features.len()
            ));
        }
        result
    }

    /// Drop every memoized result.
    pub fn clear_cache(&self) {
        self.cache.invalidate_all();
        debug!("Tool filter cache cleared");
    }

    /// Drop memoized results older than the TTL; returns how many were dropped.
    ///
    /// Expiry is only ever decided by the entry timestamp, so stale entries
    /// stay visible here until they are cleared or read.
    pub fn clear_expired_cache(&self) -> usize {
        let now = Utc::now();
        let expired: Vec<Arc<String>> = self
            .cache
            .iter()
            .filter(|(_, entry)| !self.is_fresh(entry, now))
            .map(|(key, _)| key)
            .collect();
        for key in &expired {
            self.cache.invalidate(key.as_str());
        }
        self.cache.run_pending_tasks();
        expired.len()
    }

    /// Number of live cache entries.
    pub fn cached_entries(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }
}

impl Default for ToolFilterService {
    fn default() -> Self {
        Self::with_defaults()
    }
}
