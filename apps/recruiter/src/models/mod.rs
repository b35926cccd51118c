pub mod candidate;
pub mod document;

pub use candidate::{keys, Candidate};
pub use document::{DocumentKind, DocumentRef};
