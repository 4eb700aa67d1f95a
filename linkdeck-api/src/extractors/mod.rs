//! Custom request extractors.

mod actor;

pub use actor::{RequestActor, ACTOR_HEADER, SESSION_HEADER};
