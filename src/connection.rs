//! Connection engine: dragging a new edge from one handle to another.
//!
//! The gesture starts on a handle, tracks the pointer in flow space, and
//! snaps to the nearest compatible handle within a zoom-compensated radius.
//! Validation is advisory while the gesture is live (`is_valid` drives
//! rendering feedback) and binding on release: a connection commits only if
//! a candidate is present and not rejected.

use crate::error::{ErrorSink, FlowError};
use crate::geometry::Point;
use crate::node::HandleType;
use crate::store::{HandleRef, PositionStore};

/// A proposed or committed connection, always normalized so `source` is the
/// end anchored on a source-kind handle.
#[derive(Clone, Debug, PartialEq)]
pub struct Connection {
    pub source: String,
    pub target: String,
    pub source_handle: Option<String>,
    pub target_handle: Option<String>,
}

/// How strictly candidate handles are matched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionMode {
    /// Only handles of the opposite kind can complete the connection.
    Strict,
    /// Any handle can complete it; normalization still puts the
    /// source-kind end first.
    Loose,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConnectionOptions {
    pub mode: ConnectionMode,
    pub allow_self_loops: bool,
    /// Snap radius around handles in screen pixels; divided by the current
    /// zoom so the grab target keeps its on-screen size.
    pub handle_radius: f32,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            mode: ConnectionMode::Strict,
            allow_self_loops: false,
            handle_radius: 10.0,
        }
    }
}

/// Consumer hook deciding whether a proposed connection is acceptable.
///
/// Errors are reported through the engine's [`ErrorSink`] and treated as
/// "invalid" for the current candidate; the gesture itself continues.
pub trait ConnectionValidator {
    fn validate(&self, connection: &Connection) -> Result<bool, String>;
}

impl<F> ConnectionValidator for F
where
    F: Fn(&Connection) -> bool,
{
    fn validate(&self, connection: &Connection) -> Result<bool, String> {
        Ok(self(connection))
    }
}

impl ConnectionValidator for Box<dyn ConnectionValidator> {
    fn validate(&self, connection: &Connection) -> Result<bool, String> {
        self.as_ref().validate(connection)
    }
}

/// Accepts every connection. The default validator.
#[derive(Clone, Copy, Debug, Default)]
pub struct AlwaysValid;

impl ConnectionValidator for AlwaysValid {
    fn validate(&self, _connection: &Connection) -> Result<bool, String> {
        Ok(true)
    }
}

/// Chains validators; a connection passes only if every member accepts it.
#[derive(Default)]
pub struct CompositeValidator {
    validators: Vec<Box<dyn ConnectionValidator>>,
}

impl CompositeValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, validator: impl ConnectionValidator + 'static) -> Self {
        self.validators.push(Box::new(validator));
        self
    }
}

impl ConnectionValidator for CompositeValidator {
    fn validate(&self, connection: &Connection) -> Result<bool, String> {
        for v in &self.validators {
            if !v.validate(connection)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Live state of the connection gesture, exposed for rendering the
/// in-progress connection line.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum ConnectionState {
    #[default]
    Idle,
    InProgress {
        from: HandleRef,
        from_position: Point,
        /// Free end of the connection line in flow space; snapped to the
        /// candidate's anchor while one is in range.
        to_pointer: Point,
        candidate: Option<HandleRef>,
        /// `None` without a candidate, otherwise the validator's verdict.
        is_valid: Option<bool>,
    },
}

/// Drives the connect-by-drag gesture.
pub struct ConnectionController<V = AlwaysValid> {
    options: ConnectionOptions,
    validator: V,
    errors: ErrorSink,
    state: ConnectionState,
}

impl ConnectionController<AlwaysValid> {
    pub fn new(options: ConnectionOptions, errors: ErrorSink) -> Self {
        Self::with_validator(options, AlwaysValid, errors)
    }
}

impl<V: ConnectionValidator> ConnectionController<V> {
    pub fn with_validator(options: ConnectionOptions, validator: V, errors: ErrorSink) -> Self {
        Self {
            options,
            validator,
            errors,
            state: ConnectionState::Idle,
        }
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn options(&self) -> &ConnectionOptions {
        &self.options
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.state, ConnectionState::Idle)
    }

    /// Begin a connection from a handle. Returns false when the handle's
    /// node is missing or not connectable.
    pub fn start<T>(&mut self, from: HandleRef, store: &PositionStore<T>) -> bool {
        let Some(resolved) = store.get(&from.node_id) else {
            return false;
        };
        if resolved.node.hidden || !resolved.node.connectable {
            return false;
        }
        let Some(hb) = resolved.find_handle(from.handle_id.as_deref(), from.kind) else {
            return false;
        };
        let from_position = resolved.handle_anchor(hb);
        self.state = ConnectionState::InProgress {
            from,
            from_position,
            to_pointer: from_position,
            candidate: None,
            is_valid: None,
        };
        true
    }

    /// Track the pointer (flow space) and refresh the candidate handle.
    pub fn update<T>(&mut self, pointer_flow: Point, zoom: f32, store: &PositionStore<T>) {
        let ConnectionState::InProgress { from, .. } = &self.state else {
            return;
        };
        let from = from.clone();

        let radius = if zoom > 0.0 {
            self.options.handle_radius / zoom
        } else {
            self.options.handle_radius
        };

        let hit = store
            .find_handle_at(pointer_flow, radius)
            .filter(|hit| self.accepts_candidate(&from, &hit.handle));

        let (candidate, to_pointer, is_valid) = match hit {
            Some(hit) => {
                let proposed = normalize(&from, &hit.handle);
                let verdict = match self.validator.validate(&proposed) {
                    Ok(ok) => ok,
                    Err(message) => {
                        self.errors.report(FlowError::ValidatorFailure(message));
                        false
                    }
                };
                (Some(hit.handle), hit.anchor, Some(verdict))
            }
            None => (None, pointer_flow, None),
        };

        if let ConnectionState::InProgress {
            to_pointer: tp,
            candidate: c,
            is_valid: v,
            ..
        } = &mut self.state
        {
            *tp = to_pointer;
            *c = candidate;
            *v = is_valid;
        }
    }

    /// Release the pointer. Returns the committed connection, or `None`
    /// when there was no acceptable candidate.
    pub fn end(&mut self) -> Option<Connection> {
        let state = std::mem::take(&mut self.state);
        let ConnectionState::InProgress {
            from,
            candidate,
            is_valid,
            ..
        } = state
        else {
            return None;
        };
        let candidate = candidate?;
        if is_valid == Some(false) {
            return None;
        }
        Some(normalize(&from, &candidate))
    }

    /// Abort the gesture without committing anything.
    pub fn cancel(&mut self) {
        self.state = ConnectionState::Idle;
    }

    fn accepts_candidate(&self, from: &HandleRef, candidate: &HandleRef) -> bool {
        if candidate.node_id == from.node_id {
            if !self.options.allow_self_loops {
                return false;
            }
            // Even a self-loop never ends on the handle it started from.
            if candidate.handle_id == from.handle_id && candidate.kind == from.kind {
                return false;
            }
        }
        match self.options.mode {
            ConnectionMode::Strict => candidate.kind == from.kind.opposite(),
            ConnectionMode::Loose => true,
        }
    }
}

/// Orient a (from, candidate) pair so the source-kind end is `source`.
fn normalize(from: &HandleRef, candidate: &HandleRef) -> Connection {
    let (src, tgt) = match from.kind {
        HandleType::Source => (from, candidate),
        HandleType::Target => (candidate, from),
    };
    Connection {
        source: src.node_id.clone(),
        target: tgt.node_id.clone(),
        source_handle: src.handle_id.clone(),
        target_handle: tgt.handle_id.clone(),
    }
}
