//! Error taxonomy and the caller-supplied error sink.
//!
//! The engine never aborts an in-progress gesture: configuration problems
//! are reported through [`ErrorSink`] and the affected element is excluded
//! from resolved output. The worst outcome of any detected inconsistency is
//! that one gesture cancels cleanly.

use crate::node::HandleType;
use std::rc::Rc;
use thiserror::Error;

/// Recoverable problems detected while resolving or validating flow data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    /// A node's `parent_id` chain loops back on itself. The node is dropped
    /// from the resolved output.
    #[error("cyclic parent chain involving node '{0}'")]
    CyclicParentChain(String),

    /// A node names a parent that is not part of the node set. The node is
    /// resolved as if it had no parent.
    #[error("node '{node_id}' references missing parent '{parent_id}'")]
    MissingParent { node_id: String, parent_id: String },

    /// An edge endpoint names a node that does not exist. The edge is
    /// excluded from resolved output but not deleted.
    #[error("edge '{edge_id}' references missing node '{node_id}'")]
    MissingEdgeNode { edge_id: String, node_id: String },

    /// An edge endpoint names a handle the node does not own.
    #[error("edge '{edge_id}': node '{node_id}' has no {handle_type} handle with id {handle_id:?}")]
    MissingHandle {
        edge_id: String,
        node_id: String,
        handle_id: Option<String>,
        handle_type: HandleType,
    },

    /// The consumer's connection validator returned an error. Treated as
    /// "invalid" for the current candidate; the gesture continues.
    #[error("connection validator failed: {0}")]
    ValidatorFailure(String),
}

/// Destination for reported [`FlowError`]s.
///
/// Wraps an optional caller callback; every report is also logged. Clone is
/// cheap, so each engine can hold its own handle to the same sink.
#[derive(Clone, Default)]
pub struct ErrorSink {
    callback: Option<Rc<dyn Fn(&FlowError)>>,
}

impl ErrorSink {
    /// A sink that forwards every error to the given callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&FlowError) + 'static,
    {
        Self {
            callback: Some(Rc::new(callback)),
        }
    }

    /// A sink that only logs.
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn report(&self, error: FlowError) {
        tracing::warn!(%error, "flow configuration error");
        if let Some(cb) = &self.callback {
            cb(&error);
        }
    }
}

impl std::fmt::Debug for ErrorSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorSink")
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_sink_forwards_to_callback() {
        let seen: Rc<RefCell<Vec<FlowError>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = {
            let seen = seen.clone();
            ErrorSink::new(move |e| seen.borrow_mut().push(e.clone()))
        };

        sink.report(FlowError::CyclicParentChain("a".into()));

        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], FlowError::CyclicParentChain("a".into()));
    }

    #[test]
    fn test_silent_sink_does_not_panic() {
        let sink = ErrorSink::silent();
        sink.report(FlowError::MissingParent {
            node_id: "a".into(),
            parent_id: "ghost".into(),
        });
    }

    #[test]
    fn test_error_display() {
        let e = FlowError::MissingEdgeNode {
            edge_id: "e1".into(),
            node_id: "n9".into(),
        };
        assert_eq!(e.to_string(), "edge 'e1' references missing node 'n9'");

        let e = FlowError::CyclicParentChain("x".into());
        assert_eq!(e.to_string(), "cyclic parent chain involving node 'x'");
    }
}
