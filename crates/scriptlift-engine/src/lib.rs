//! Extract script fragments from HTML and XML documents, lint them, and map
//! the results back onto the document.
//!
//! - [`transform`]: strings with reversible, position-tracked replacements
//! - [`markup`]: a byte-exact tag/comment/CDATA scanner
//! - [`extract`]: fragment discovery, dedenting and placeholder documents
//! - [`remap`], [`scope`], [`verify`]: running a [`Linter`] over fragments

pub mod diagnostic;
pub mod extract;
pub mod markup;
pub mod remap;
pub mod scope;
pub mod span;
pub mod transform;
pub mod verify;

// Re-export key types for easier usage
pub use diagnostic::{Diagnostic, Fix, Severity, sort_diagnostics};
pub use extract::{
    Extraction, ExtractError, ExtractOptions, Fragment, IndentDescriptor, MimePredicate, extract,
};
pub use markup::MarkupMode;
pub use span::Span;
pub use transform::{Location, TransformError, TransformableString};
pub use verify::{Linter, Preprocessor, SourceType, VerifyError};
