//! Types shared with the embedding application.
//!
//! The host delivers pointer protocol events as [`DragOffer`]s and plain
//! method calls, and receives structural changes through [`GraphHost`].

use crate::geometry::Vec2;
use crate::graph::{EdgeEnd, EdgeId, PortId};
use slint::platform::PointerEventButton;

/// Editor actions a host may record (undo stack, change notification).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    EdgeCreate,
    EdgeDelete,
}

/// An executed action together with the ports the edge joined when it ran.
///
/// The ports are captured before an `EdgeDelete` detaches anything, so the
/// record stays meaningful after the edge itself is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionRecord {
    pub action: Action,
    pub edge: EdgeId,
    pub output: Option<PortId>,
    pub input: Option<PortId>,
}

/// Callbacks from the engine into the graph container.
pub trait GraphHost {
    /// Called after the structural part of an action has been applied.
    ///
    /// [`EditorController`](crate::EditorController) delivers these once its
    /// own borrows are released, so the host may read the graph here. It
    /// must not start another structural edit from inside the callback.
    fn on_action_executed(&mut self, record: ActionRecord);

    /// Whether an offer should pan the view instead of starting a connection.
    fn is_view_drag(&self, _offer: &DragOffer) -> bool {
        false
    }

    /// Hand a view drag over to the canvas.
    fn begin_view_drag(&mut self, _offer: &DragOffer) {}

    /// Current zoom factor.
    fn current_scale(&self) -> f32 {
        1.0
    }
}

/// A host that ignores every notification.
impl GraphHost for () {
    fn on_action_executed(&mut self, _record: ActionRecord) {}
}

/// A host that records every action, in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordedActions {
    pub records: Vec<ActionRecord>,
}

impl RecordedActions {
    /// (action, edge) pairs in notification order.
    pub fn actions(&self) -> Vec<(Action, EdgeId)> {
        self.records.iter().map(|r| (r.action, r.edge)).collect()
    }

    /// Hand every recorded action on to another host, oldest first.
    pub fn forward_to<H: GraphHost + ?Sized>(self, host: &mut H) {
        for record in self.records {
            host.on_action_executed(record);
        }
    }
}

impl GraphHost for RecordedActions {
    fn on_action_executed(&mut self, record: ActionRecord) {
        self.records.push(record);
    }
}

/// Keyboard modifiers held during a pointer event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub control: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        control: false,
        alt: false,
        meta: false,
    };

    pub fn is_none(&self) -> bool {
        *self == Modifiers::NONE
    }
}

/// One existing edge end picked up by the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeGrip {
    pub edge: EdgeId,
    /// The end that moves with the pointer.
    pub end: EdgeEnd,
}

/// What the pointer went down on.
#[derive(Debug, Clone, PartialEq)]
pub enum DragTarget {
    /// Empty canvas.
    Background,
    Port(PortId),
    /// One or more bound edge ends, e.g. every edge on a port when
    /// dragging them together.
    EdgeEnds(Vec<EdgeGrip>),
}

/// A pointer-down that may become a drag.
#[derive(Debug, Clone, PartialEq)]
pub struct DragOffer {
    pub target: DragTarget,
    pub button: PointerEventButton,
    pub modifiers: Modifiers,
    pub position: Vec2,
}

impl DragOffer {
    /// Plain left-button offer.
    pub fn left(target: DragTarget, position: Vec2) -> Self {
        Self {
            target,
            button: PointerEventButton::Left,
            modifiers: Modifiers::NONE,
            position,
        }
    }

    pub fn with_button(mut self, button: PointerEventButton) -> Self {
        self.button = button;
        self
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Only an unmodified left button drives connection drags.
    pub fn is_connection_gesture(&self) -> bool {
        self.button == PointerEventButton::Left && self.modifiers.is_none()
    }
}

/// Whether the engine handled an event; an ignored event should keep
/// propagating in the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventReply {
    Ignored,
    Consumed,
}

impl EventReply {
    pub fn is_consumed(self) -> bool {
        self == EventReply::Consumed
    }
}
