//! Error types for the dependency injection container.

use thiserror::Error;

/// Dependency injection errors
///
/// Represents the failure conditions that can occur while declaring types,
/// registering contracts, selecting injection members or resolving object
/// graphs.
///
/// # Examples
///
/// ```rust
/// use ferrous_inject::{Container, DiError, Type};
///
/// struct Unregistered;
///
/// let container = Container::new();
/// match container.resolve(&Type::of::<Unregistered>(), None) {
///     Err(DiError::DependencyResolutionFailure { contract, .. }) => {
///         assert!(contract.contains("Unregistered"));
///     }
///     _ => unreachable!(),
/// }
/// ```
///
/// ```rust
/// use ferrous_inject::DiError;
///
/// let selection = DiError::selection("Repository<Order>", "constructor(ctx)", "no structural counterpart");
/// let circular = DiError::Circular(vec!["A".to_string(), "B".to_string(), "A".to_string()]);
///
/// println!("Error: {}", selection);
/// println!("Error: {}", circular);
/// ```
#[derive(Debug, Clone, Error)]
pub enum DiError {
    /// Malformed injection specification, reported at registration time
    #[error("Invalid injection specification: {0}")]
    InvalidSpecification(String),

    /// No structural counterpart member exists on the requested type
    #[error("Unable to select member {member} on type {ty}: {reason}")]
    SelectionFailure {
        ty: String,
        member: String,
        reason: String,
    },

    /// Several candidate members tie for the best rank
    #[error("Ambiguous match for {member} on type {ty}: {candidates} candidates tie")]
    AmbiguousMatch {
        ty: String,
        member: String,
        candidates: usize,
    },

    /// A contract could not be resolved
    #[error("Unable to resolve {contract}: {reason}")]
    DependencyResolutionFailure { contract: String, reason: String },

    /// Downcast of a resolved value failed
    #[error("Type mismatch for: {0}")]
    TypeMismatch(String),

    /// Circular dependency detected (includes path)
    #[error("Circular dependency: {}", .0.join(" -> "))]
    Circular(Vec<String>),

    /// Maximum recursion depth exceeded
    #[error("Max depth {0} exceeded")]
    DepthExceeded(usize),

    /// Selection failure annotated with the type being resolved
    #[error("Failed to build {requested} while selecting {member}: {source}")]
    Resolution {
        requested: String,
        member: String,
        #[source]
        source: Box<DiError>,
    },
}

impl DiError {
    /// Shorthand for a [`DiError::SelectionFailure`].
    pub fn selection(
        ty: impl Into<String>,
        member: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        DiError::SelectionFailure {
            ty: ty.into(),
            member: member.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for a [`DiError::DependencyResolutionFailure`].
    pub fn unresolved(contract: impl Into<String>, reason: impl Into<String>) -> Self {
        DiError::DependencyResolutionFailure {
            contract: contract.into(),
            reason: reason.into(),
        }
    }

    /// Wraps selection failures with the requested type and member.
    ///
    /// Every other error is returned unchanged so nested resolution failures
    /// propagate as raised.
    pub fn in_context(self, requested: impl Into<String>, member: impl Into<String>) -> Self {
        match self {
            DiError::SelectionFailure { .. } | DiError::AmbiguousMatch { .. } => {
                DiError::Resolution {
                    requested: requested.into(),
                    member: member.into(),
                    source: Box::new(self),
                }
            }
            other => other,
        }
    }

    /// True for selection failures, including ones wrapped with context.
    pub fn is_selection_failure(&self) -> bool {
        match self {
            DiError::SelectionFailure { .. } => true,
            DiError::Resolution { source, .. } => source.is_selection_failure(),
            _ => false,
        }
    }

    /// True for ambiguous matches, including ones wrapped with context.
    pub fn is_ambiguous(&self) -> bool {
        match self {
            DiError::AmbiguousMatch { .. } => true,
            DiError::Resolution { source, .. } => source.is_ambiguous(),
            _ => false,
        }
    }
}

/// Result type for DI operations
///
/// A convenience type alias for `Result<T, DiError>` used throughout
/// ferrous-inject.
///
/// # Examples
///
/// ```rust
/// use ferrous_inject::{DiResult, DiError};
///
/// fn failing_operation() -> DiResult<()> {
///     Err(DiError::InvalidSpecification("generic parameter name is empty".into()))
/// }
///
/// assert!(failing_operation().is_err());
/// ```
pub type DiResult<T> = Result<T, DiError>;
