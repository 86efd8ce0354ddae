use thiserror::Error;

/// Result type alias using PslError
pub type Result<T> = std::result::Result<T, PslError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that callers and tests can match on
/// without depending on message wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Pattern construction
    InvalidInput,
    InvalidAncestorDepth,
    LiteralWhereExpression,
    UnexpectedPattern,
    AlreadyAttached,

    // Assembly / registry
    UnknownHook,
    UnknownDirective,
    MalformedDocument,

    // Lookups
    NotFound,
    CycleDetected,

    // Integration/IO
    Io,
    Serialization,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::InvalidAncestorDepth => "ERR_INVALID_ANCESTOR_DEPTH",
            ExErrorKind::LiteralWhereExpression => "ERR_LITERAL_WHERE_EXPRESSION",
            ExErrorKind::UnexpectedPattern => "ERR_UNEXPECTED_PATTERN",
            ExErrorKind::AlreadyAttached => "ERR_ALREADY_ATTACHED",
            ExErrorKind::UnknownHook => "ERR_UNKNOWN_HOOK",
            ExErrorKind::UnknownDirective => "ERR_UNKNOWN_DIRECTIVE",
            ExErrorKind::MalformedDocument => "ERR_MALFORMED_DOCUMENT",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::CycleDetected => "ERR_CYCLE_DETECTED",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries a stable classification plus optional context (the operation that
/// failed and the entity it concerned) for programmatic handling.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity_id: Option<String>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity_id: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity context (hook name, state id, node id...)
    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the entity context, if any
    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the source error, if any
    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(entity_id) = &self.entity_id {
            write!(f, " (entity_id: {})", entity_id)?;
        }
        if let Some(source) = &self.source {
            write!(f, " caused by {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Error taxonomy for pattern construction, compilation and walks
///
/// A failed match is never an error; these cover misuse detected while a
/// pattern is built or compiled, and lookups of identifiers that do not
/// belong to the structure they were handed to.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PslError {
    // ===== Pattern Construction =====
    /// Ancestor relations need at least one level between the two sides
    #[error("Invalid ancestor depth {depth}: must be at least 1")]
    InvalidAncestorDepth { depth: usize },

    /// A literal was supplied where a sub-pattern was required
    #[error("Literal {literal} given where a pattern is required in {context}")]
    LiteralWhereExpression { context: String, literal: String },

    /// A child node of the wrong variant was attached
    #[error("{context} expects {expected}, found {found}")]
    UnexpectedPattern {
        context: String,
        expected: String,
        found: String,
    },

    /// The node already belongs to another parent
    #[error("Pattern node {node} is already attached to a parent")]
    NodeAlreadyAttached { node: u32 },

    /// Capture, event and hook names cannot be empty
    #[error("Empty {what} name")]
    EmptyName { what: String },

    // ===== Assembly / Registry =====
    /// Hook references a callable that is not registered
    #[error("Unknown hook: {hook}")]
    UnknownHook { hook: String },

    /// Directive name is not recognised by the assembler
    #[error("Unknown directive or decorator: {directive}")]
    UnknownDirective { directive: String },

    /// Pattern or subject document does not have a recognised shape
    #[error("Malformed document: {reason}")]
    MalformedDocument { reason: String },

    // ===== Lookups =====
    /// Pattern node id does not belong to this pattern
    #[error("Unknown pattern node: {node}")]
    UnknownPatternNode { node: u32 },

    /// State id was not registered in the register it was looked up in
    #[error("State {state} is not registered in {register}")]
    UnknownState { state: u32, register: String },

    /// Subject node id does not belong to the tree
    #[error("Unknown subject node: {node}")]
    UnknownSubjectNode { node: u32 },

    /// Subject tree revisits a node during a walk
    #[error("Cycle detected in subject tree at node {node}")]
    CyclicSubject { node: u32 },

    // ===== Generic Errors =====
    /// Serialization error (JSON encoding/decoding)
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Filesystem error
    #[error("IO error: {message}")]
    Io { message: String },

    /// Generic internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl From<serde_json::Error> for PslError {
    fn from(err: serde_json::Error) -> Self {
        PslError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for PslError {
    fn from(err: std::io::Error) -> Self {
        PslError::Io {
            message: err.to_string(),
        }
    }
}

/// Conversion from PslError to the canonical ExError
impl From<PslError> for ExError {
    fn from(err: PslError) -> Self {
        match err {
            PslError::InvalidAncestorDepth { depth } => {
                ExError::new(ExErrorKind::InvalidAncestorDepth)
                    .with_op("build_ancestor")
                    .with_message(format!("Ancestor depth {} is below 1", depth))
            }

            PslError::LiteralWhereExpression { context, literal } => {
                ExError::new(ExErrorKind::LiteralWhereExpression)
                    .with_op(context)
                    .with_message(format!("Literal {} given where a pattern is required", literal))
            }

            PslError::UnexpectedPattern {
                context,
                expected,
                found,
            } => ExError::new(ExErrorKind::UnexpectedPattern)
                .with_op(context)
                .with_message(format!("Expected {}, found {}", expected, found)),

            PslError::NodeAlreadyAttached { node } => ExError::new(ExErrorKind::AlreadyAttached)
                .with_entity_id(node.to_string())
                .with_message("Pattern node is already attached to a parent"),

            PslError::EmptyName { what } => ExError::new(ExErrorKind::InvalidInput)
                .with_message(format!("Empty {} name", what)),

            PslError::UnknownHook { hook } => ExError::new(ExErrorKind::UnknownHook)
                .with_op("compile_pattern")
                .with_entity_id(hook)
                .with_message("Hook is not registered"),

            PslError::UnknownDirective { directive } => {
                ExError::new(ExErrorKind::UnknownDirective)
                    .with_op("assemble_pattern")
                    .with_entity_id(directive)
                    .with_message("Unknown directive or decorator")
            }

            PslError::MalformedDocument { reason } => {
                ExError::new(ExErrorKind::MalformedDocument).with_message(reason)
            }

            PslError::UnknownPatternNode { node } => ExError::new(ExErrorKind::NotFound)
                .with_entity_id(node.to_string())
                .with_message("Pattern node not found"),

            PslError::UnknownState { state, register } => ExError::new(ExErrorKind::NotFound)
                .with_entity_id(state.to_string())
                .with_message(format!("State is not registered in {}", register)),

            PslError::UnknownSubjectNode { node } => ExError::new(ExErrorKind::NotFound)
                .with_entity_id(node.to_string())
                .with_message("Subject node not found"),

            PslError::CyclicSubject { node } => ExError::new(ExErrorKind::CycleDetected)
                .with_op("walk")
                .with_entity_id(node.to_string())
                .with_message("Subject tree revisits a node"),

            PslError::Serialization { message } => {
                ExError::new(ExErrorKind::Serialization).with_message(message)
            }

            PslError::Io { message } => ExError::new(ExErrorKind::Io).with_message(message),

            PslError::Internal { message } => {
                ExError::new(ExErrorKind::Internal).with_message(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_code_and_context() {
        let err = ExError::new(ExErrorKind::UnknownHook)
            .with_op("compile_pattern")
            .with_entity_id("on_foo")
            .with_message("Hook is not registered");

        let text = err.to_string();
        assert!(text.starts_with("[ERR_UNKNOWN_HOOK]"));
        assert!(text.contains("compile_pattern"));
        assert!(text.contains("on_foo"));
    }

    #[test]
    fn test_source_chain_is_exposed() {
        let inner = ExError::new(ExErrorKind::Serialization).with_message("bad json");
        let outer = ExError::new(ExErrorKind::MalformedDocument).with_source(inner);

        assert_eq!(
            outer.source_error().map(|e| e.kind()),
            Some(ExErrorKind::Serialization)
        );
        assert!(std::error::Error::source(&outer).is_some());
    }

    #[test]
    fn test_serde_error_converts() {
        let err: PslError = serde_json::from_str::<serde_json::Value>("{")
            .map_err(PslError::from)
            .unwrap_err();
        assert!(matches!(err, PslError::Serialization { .. }));
    }
}
