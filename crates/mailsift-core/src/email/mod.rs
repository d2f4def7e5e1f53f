//! Emails awaiting analysis.
//!
//! Raw emails are fetched and stored by an upstream collaborator; this module
//! only exposes the projection the pipeline consumes.

mod model;
mod repository;

pub use model::UnanalyzedEmail;
pub use repository::EmailRepository;
