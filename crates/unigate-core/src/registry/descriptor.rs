// ── Operation descriptors ──
//
// Static registration record for one invocable operation. Handlers get the
// client and detector through `ToolContext`, never through their arguments.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use strum::{Display, EnumIter, EnumString};
use unigate_api::ResilientClient;

use crate::capability::{CapabilityDetector, Feature};
use crate::error::CoreError;

// ── Category ─────────────────────────────────────────────────────────

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Category {
    System,
    Devices,
    Clients,
    Networks,
    Firewall,
    Zones,
    Routing,
}

impl Category {
    /// Feature every operation in this category needs, regardless of
    /// what the descriptor declares.
    pub fn implied_feature(self) -> Option<Feature> {
        match self {
            Self::Zones => Some(Feature::ZoneBasedFirewall),
            Self::Routing => Some(Feature::TrafficRoutes),
            _ => None,
        }
    }
}

// ── Dependencies ─────────────────────────────────────────────────────

/// One precondition checked before a handler runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "feature", rename_all = "snake_case")]
pub enum Dependency {
    Connection,
    Feature(Feature),
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection => f.write_str("connection"),
            Self::Feature(feature) => write!(f, "feature:{feature}"),
        }
    }
}

// ── Handlers ─────────────────────────────────────────────────────────

/// Typed dependencies handed to every handler.
#[derive(Clone)]
pub struct ToolContext {
    pub client: Arc<ResilientClient>,
    pub detector: Arc<CapabilityDetector>,
}

pub type HandlerFuture = BoxFuture<'static, Result<Value, CoreError>>;

pub trait ToolHandler: Send + Sync {
    fn call(&self, ctx: ToolContext, args: Value) -> HandlerFuture;
}

impl<F, Fut> ToolHandler for F
where
    F: Fn(ToolContext, Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, CoreError>> + Send + 'static,
{
    fn call(&self, ctx: ToolContext, args: Value) -> HandlerFuture {
        Box::pin(self(ctx, args))
    }
}

// ── Descriptor ───────────────────────────────────────────────────────

/// Immutable registration record. Build with [`OperationDescriptor::new`]
/// and the `with_*` / `requires_*` methods.
#[derive(Clone)]
pub struct OperationDescriptor {
    pub name: String,
    pub description: String,
    pub category: Category,
    pub requires_connection: bool,
    pub requires_feature: Option<Feature>,
    /// JSON Schema for the arguments object.
    pub input_schema: Value,
    /// Path templates the handler calls, used for deprecation warnings.
    pub endpoints: Vec<String>,
    handler: Arc<dyn ToolHandler>,
}

impl OperationDescriptor {
    /// Defaults: requires a connection, no feature, empty object schema.
    pub fn new(name: impl Into<String>, category: Category, handler: impl ToolHandler + 'static) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            category,
            requires_connection: true,
            requires_feature: None,
            input_schema: json!({ "type": "object", "properties": {} }),
            endpoints: Vec::new(),
            handler: Arc::new(handler),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn requires_connection(mut self, required: bool) -> Self {
        self.requires_connection = required;
        self
    }

    #[must_use]
    pub fn requires_feature(mut self, feature: Feature) -> Self {
        self.requires_feature = Some(feature);
        self
    }

    #[must_use]
    pub fn with_input_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }

    #[must_use]
    pub fn with_endpoint(mut self, path: impl Into<String>) -> Self {
        self.endpoints.push(path.into());
        self
    }

    pub fn handler(&self) -> Arc<dyn ToolHandler> {
        Arc::clone(&self.handler)
    }

    /// Connection, declared feature, then category-implied feature.
    pub fn dependencies(&self) -> Vec<Dependency> {
        let mut deps = Vec::new();
        if self.requires_connection {
            deps.push(Dependency::Connection);
        }
        for feature in self.required_features() {
            deps.push(Dependency::Feature(feature));
        }
        deps
    }

    /// Declared feature plus the category-implied one, deduplicated.
    pub fn required_features(&self) -> Vec<Feature> {
        let mut features: Vec<Feature> = self.requires_feature.into_iter().collect();
        match self.category.implied_feature() {
            Some(implied) if !features.contains(&implied) => features.push(implied),
            _ => {}
        }
        features
    }
}

impl fmt::Debug for OperationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationDescriptor")
            .field("name", &self.name)
            .field("category", &self.category)
            .field("requires_connection", &self.requires_connection)
            .field("requires_feature", &self.requires_feature)
            .field("endpoints", &self.endpoints)
            .finish_non_exhaustive()
    }
}

// ── Input validation ─────────────────────────────────────────────────

/// Check `args` against the object schema: it must be an object (or null),
/// carry every `required` key, and each present property must match its
/// declared primitive `type`.
pub fn validate_input(schema: &Value, args: &Value) -> Result<(), CoreError> {
    let empty = serde_json::Map::new();
    let object = match args {
        Value::Null => &empty,
        Value::Object(map) => map,
        other => {
            return Err(CoreError::Validation {
                message: format!("arguments must be an object, got {}", type_name(other)),
            });
        }
    };

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for key in required.iter().filter_map(Value::as_str) {
            if object.get(key).is_none_or(Value::is_null) {
                return Err(CoreError::Validation {
                    message: format!("missing required argument '{key}'"),
                });
            }
        }
    }

    if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
        for (key, value) in object {
            let Some(expected) = properties
                .get(key)
                .and_then(|p| p.get("type"))
                .and_then(Value::as_str)
            else {
                continue;
            };
            if !value.is_null() && !matches_type(expected, value) {
                return Err(CoreError::Validation {
                    message: format!(
                        "argument '{key}' must be {expected}, got {}",
                        type_name(value)
                    ),
                });
            }
        }
    }
    Ok(())
}

fn matches_type(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        _ => true,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
