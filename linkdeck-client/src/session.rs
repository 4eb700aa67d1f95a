//! Per-session client state.
//!
//! One `SessionContext` exists per signed-in session. It owns the drag
//! shadows so they never outlive the session or leak between stores, and
//! the session id that tags this client's own changes.

use linkdeck_core::{Actor, ListId, SessionId};
use uuid::Uuid;

use crate::drag::DragOrderShadow;

#[derive(Debug, Clone)]
pub struct SessionContext {
    pub actor: Actor,
    pub drag: DragOrderShadow,
}

impl SessionContext {
    /// Start a session for `actor`, minting a session id unless the actor
    /// already carries one.
    pub fn new(actor: Actor) -> Self {
        let actor = match actor.session_id {
            Some(_) => actor,
            None => actor.in_session(Uuid::now_v7()),
        };
        Self {
            actor,
            drag: DragOrderShadow::new(),
        }
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.actor.session_id
    }

    /// Whether a change was issued by this session.
    pub fn issued(&self, session_id: Option<SessionId>) -> bool {
        session_id.is_some() && session_id == self.actor.session_id
    }

    /// Leaving a list view drops any shadow for it.
    pub fn navigate_away(&mut self, list_id: ListId) {
        self.drag.clear(list_id);
    }

    pub fn end(&mut self) {
        self.drag.clear_all();
    }
}
