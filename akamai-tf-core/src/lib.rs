//! Akamai TF Core
//!
//! Provider-neutral engine shared by the Akamai resource crates: the
//! resource/data source traits, the error taxonomy, operation contexts with
//! deadlines and cancellation, the status poll loop and the keyed differ.

pub mod context;
pub mod diagnostics;
pub mod differ;
pub mod poll;
pub mod provider;
pub mod resource;
pub mod validation;

pub use context::{Interrupted, OperationContext};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use provider::{ErrorKind, ProviderError, ProviderResult};
