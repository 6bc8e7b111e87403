//! Campaign payload schema and visitor-facing value types.
//!
//! These types mirror the JSON shape served by the flag-management API:
//! `{ panic, campaigns: [{ id, variationGroups: [{ id, targeting,
//! variations }] }] }`. A payload is parsed once at the fetch boundary and
//! treated as an immutable snapshot from then on; the engine never mutates
//! it in place.
//!
//! Semantic problems (bad traffic sums, unrecognized operators) deliberately
//! survive deserialization — they are reported and skipped at evaluation
//! time so one broken group cannot take down the whole payload.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// ============================================================================
// Context Values
// ============================================================================

/// A visitor context attribute value.
///
/// The wire format is untyped JSON; this union makes the operator × type
/// compatibility matrix an exhaustive `match` instead of runtime type
/// sniffing. Targeting values reuse the same representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextValue {
    /// Boolean attribute.
    Bool(bool),
    /// Numeric attribute. JSON integers and floats both land here.
    Num(f64),
    /// String attribute.
    Str(String),
    /// List of primitive attributes. Must be homogeneous to be usable in
    /// targeting; heterogeneous lists fail closed at evaluation time.
    List(Vec<ContextValue>),
}

impl ContextValue {
    /// Coarse kind of this value, used in the compatibility matrix and in
    /// diagnostics.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Bool(_) => ValueKind::Bool,
            Self::Num(_) => ValueKind::Num,
            Self::Str(_) => ValueKind::Str,
            Self::List(_) => ValueKind::List,
        }
    }
}

impl From<bool> for ContextValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<f64> for ContextValue {
    fn from(v: f64) -> Self {
        Self::Num(v)
    }
}

impl From<i64> for ContextValue {
    #[allow(clippy::cast_precision_loss)]
    fn from(v: i64) -> Self {
        Self::Num(v as f64)
    }
}

impl From<&str> for ContextValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_owned())
    }
}

impl From<String> for ContextValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

/// Runtime kind of a [`ContextValue`], without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Boolean.
    Bool,
    /// Number.
    Num,
    /// String.
    Str,
    /// Homogeneous list of primitives.
    List,
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Bool => "boolean",
            Self::Num => "number",
            Self::Str => "string",
            Self::List => "list",
        };
        f.write_str(name)
    }
}

/// Visitor attributes, read-only to the engine.
///
/// Owned by the caller and immutable for the duration of one `resolve()`
/// call. Keys are attribute names, values arbitrary primitives or lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisitorContext(HashMap<String, ContextValue>);

impl VisitorContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style attribute insertion.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ContextValue>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Looks up an attribute by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ContextValue> {
        self.0.get(key)
    }

    /// Returns `true` if the context has no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<HashMap<String, ContextValue>> for VisitorContext {
    fn from(map: HashMap<String, ContextValue>) -> Self {
        Self(map)
    }
}

// ============================================================================
// Payload
// ============================================================================

/// The full downloaded campaign configuration.
///
/// Both fields default so a minimal `{}` body parses; the fetch collaborator
/// replaces the held snapshot wholesale, never merging partially.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BucketingPayload {
    /// Server-signaled safe mode. When set, all decisioning is disabled.
    #[serde(default)]
    pub panic: bool,

    /// Campaigns in declaration order. Decision order follows this order.
    #[serde(default)]
    pub campaigns: Vec<Campaign>,
}

/// A named experiment/feature-flag unit.
///
/// Eligible if ANY of its variation groups' targeting matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    /// Campaign id, assigned server-side.
    pub id: String,

    /// Variation groups in declaration order; the first matching group is
    /// the one allocated.
    #[serde(default)]
    pub variation_groups: Vec<VariationGroup>,
}

/// A targeting rule plus weighted variations — the unit of traffic
/// allocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariationGroup {
    /// Variation group id; part of the allocation hash input.
    pub id: String,

    /// Who this group applies to.
    #[serde(default)]
    pub targeting: TargetingGroupSet,

    /// Weighted outcomes. Allocations must sum to exactly 100.
    #[serde(default)]
    pub variations: Vec<Variation>,
}

/// Targeting groups combined by logical OR.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetingGroupSet {
    /// A visitor matches the set if they match at least one group.
    #[serde(default)]
    pub targeting_groups: Vec<TargetingGroup>,
}

/// Predicates combined by logical AND.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetingGroup {
    /// All predicates must match for the group to match.
    #[serde(default)]
    pub targetings: Vec<Targeting>,
}

/// A single predicate comparing a context attribute against a declared
/// value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Targeting {
    /// Context attribute to compare, or [`ALL_USERS_KEY`].
    pub key: String,

    /// Comparison operator.
    pub operator: OperatorField,

    /// Declared value to compare against.
    pub value: ContextValue,
}

/// Context key that matches every visitor unconditionally, ignoring the
/// predicate's operator and value.
pub const ALL_USERS_KEY: &str = "fs_all_users";

/// A recognized comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operator {
    /// Equality. Accepts boolean, number, and string.
    Equals,
    /// Negated equality. Accepts boolean, number, and string.
    NotEquals,
    /// Strict numeric less-than.
    LowerThan,
    /// Numeric less-than-or-equal.
    LowerThanOrEquals,
    /// Strict numeric greater-than.
    GreaterThan,
    /// Numeric greater-than-or-equal.
    GreaterThanOrEquals,
    /// String prefix match.
    StartsWith,
    /// String suffix match.
    EndsWith,
    /// Substring match.
    Contains,
    /// Negated substring match.
    NotContains,
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Equals => "EQUALS",
            Self::NotEquals => "NOT_EQUALS",
            Self::LowerThan => "LOWER_THAN",
            Self::LowerThanOrEquals => "LOWER_THAN_OR_EQUALS",
            Self::GreaterThan => "GREATER_THAN",
            Self::GreaterThanOrEquals => "GREATER_THAN_OR_EQUALS",
            Self::StartsWith => "STARTS_WITH",
            Self::EndsWith => "ENDS_WITH",
            Self::Contains => "CONTAINS",
            Self::NotContains => "NOT_CONTAINS",
        };
        f.write_str(name)
    }
}

/// Operator as it appears on the wire.
///
/// An operator string outside the recognized set must not fail payload
/// deserialization — it is kept verbatim so evaluation can report it and
/// fail closed for that one predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OperatorField {
    /// One of the recognized operators.
    Known(Operator),
    /// Anything else, kept for diagnostics.
    Unknown(String),
}

impl From<Operator> for OperatorField {
    fn from(op: Operator) -> Self {
        Self::Known(op)
    }
}

// ============================================================================
// Variations and Decisions
// ============================================================================

/// One concrete outcome a visitor may be assigned within a variation group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variation {
    /// Variation id, assigned server-side.
    pub id: String,

    /// Traffic percentage, 0–100. Group-wide sum must be exactly 100.
    #[serde(default)]
    pub allocation: u32,

    /// Payload delivered to the application when this variation is
    /// selected.
    #[serde(default)]
    pub modifications: Modifications,
}

/// The flag/config values carried by a variation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Modifications {
    /// Payload type as declared by the server (e.g. `"JSON"`).
    #[serde(rename = "type", default)]
    pub kind: String,

    /// Arbitrary modification document.
    #[serde(default)]
    pub value: serde_json::Value,
}

/// The engine's output unit: one assigned variation for one campaign.
///
/// Serialized camelCase for the application layer, with the campaign id as
/// `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    /// Campaign this decision belongs to.
    pub id: String,

    /// Variation group the visitor was bucketed in.
    pub variation_group_id: String,

    /// The assigned variation.
    pub variation: DecisionVariation,
}

/// The variation portion of a [`Decision`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionVariation {
    /// Variation id.
    pub id: String,

    /// Modification payload for the application.
    pub modifications: Modifications,
}

impl DecisionVariation {
    /// Copies the decision-relevant fields out of a payload variation.
    #[must_use]
    pub fn from_variation(variation: &Variation) -> Self {
        Self {
            id: variation.id.clone(),
            modifications: variation.modifications.clone(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
