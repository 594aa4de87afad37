//! Provider - Traits abstracting resource and data source operations
//!
//! A resource handler owns the Create/Read/Update/Delete/Import lifecycle of
//! one resource type. It receives its API client at construction time and a
//! fresh [`OperationContext`] for every call.

use async_trait::async_trait;

use crate::context::{Interrupted, OperationContext};
use crate::diagnostics::Diagnostics;
use crate::resource::ResourceId;

/// Broad classification of a provider failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Transport or vendor API error
    Api,
    /// The requested entity does not exist (or has no current activation)
    NotFound,
    /// Configuration rejected before any network call
    Validation,
    /// The remote operation reached a terminal failure state
    RemoteFailure,
    /// The operation deadline elapsed
    Timeout,
    /// The operation was canceled by the caller
    Canceled,
}

/// Error type for Provider operations
#[derive(Debug)]
pub struct ProviderError {
    pub kind: ErrorKind,
    pub message: String,
    pub resource_id: Option<ResourceId>,
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref id) = self.resource_id {
            write!(f, "[{}.{}] {}", id.resource_type, id.id, self.message)?;
        } else {
            write!(f, "{}", self.message)?;
        }
        if let Some(ref cause) = self.cause {
            write!(f, ": {}", cause)?;
        }
        Ok(())
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|e| e.as_ref() as &dyn std::error::Error)
    }
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Api,
            message: message.into(),
            resource_id: None,
            cause: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(message).with_kind(ErrorKind::NotFound)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(message).with_kind(ErrorKind::Validation)
    }

    pub fn remote_failure(message: impl Into<String>) -> Self {
        Self::new(message).with_kind(ErrorKind::RemoteFailure)
    }

    /// Build the error reported when an operation is interrupted
    pub fn interrupted(operation: &str, interrupted: Interrupted) -> Self {
        match interrupted {
            Interrupted::Timeout => Self::new(format!(
                "timed out waiting for {}; the change may still complete remotely, re-run apply to resume",
                operation
            ))
            .with_kind(ErrorKind::Timeout),
            Interrupted::Canceled => {
                Self::new(format!("{} was canceled", operation)).with_kind(ErrorKind::Canceled)
            }
        }
    }

    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn for_resource(mut self, id: ResourceId) -> Self {
        self.resource_id = Some(id);
        self
    }

    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// State produced by an apply step together with any warnings raised on the way
#[derive(Debug, Clone, PartialEq)]
pub struct Applied<S> {
    pub state: S,
    pub diagnostics: Diagnostics,
}

impl<S> Applied<S> {
    pub fn new(state: S) -> Self {
        Self {
            state,
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics.extend(diagnostics);
        self
    }
}

/// Persisted state that knows its own composite ID
pub trait Identified {
    fn id(&self) -> String;
}

/// Lifecycle of a single resource type
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    /// Desired configuration (the plan)
    type Config: Send + Sync;
    /// Persisted state
    type State: Identified + Send + Sync;

    /// Resource type name (e.g., "akamai_property_activation")
    fn type_name(&self) -> &'static str;

    /// Inspect a pending change before apply and return warnings for the user
    async fn plan(
        &self,
        _ctx: &OperationContext,
        _prior: Option<&Self::State>,
        _config: &Self::Config,
    ) -> ProviderResult<Diagnostics> {
        Ok(Diagnostics::new())
    }

    async fn create(
        &self,
        ctx: &OperationContext,
        config: &Self::Config,
    ) -> ProviderResult<Applied<Self::State>>;

    /// Refresh state from the server; `None` means the resource is gone
    async fn read(
        &self,
        ctx: &OperationContext,
        state: &Self::State,
    ) -> ProviderResult<Option<Self::State>>;

    async fn update(
        &self,
        ctx: &OperationContext,
        prior: &Self::State,
        config: &Self::Config,
    ) -> ProviderResult<Applied<Self::State>>;

    async fn delete(&self, ctx: &OperationContext, state: &Self::State)
    -> ProviderResult<Diagnostics>;

    /// Rebuild state from an import ID
    async fn import(&self, ctx: &OperationContext, id: &str) -> ProviderResult<Self::State>;
}

/// Read-only lookup exposed as a data source
#[async_trait]
pub trait DataSource: Send + Sync {
    type Query: Send + Sync;
    type Output: Send + Sync;

    fn type_name(&self) -> &'static str;

    async fn read(&self, ctx: &OperationContext, query: &Self::Query)
    -> ProviderResult<Self::Output>;
}

/// A provider groups the resource and data source types it can handle
pub trait Provider: Send + Sync {
    /// Name of this provider (e.g., "property")
    fn name(&self) -> &'static str;

    fn resource_types(&self) -> Vec<&'static str>;

    fn data_source_types(&self) -> Vec<&'static str>;
}
