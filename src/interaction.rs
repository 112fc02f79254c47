//! Drag-to-connect state machine.
//!
//! ```text
//! Idle --offer on port / edge ends--> PortDragOffered
//! PortDragOffered --enter compatible port--> Hovering(port)
//! Hovering(port) --exit port--> PortDragOffered
//! PortDragOffered | Hovering --drop / cancel--> Idle
//! ```
//!
//! Every in-flight edge is tracked as a pending edge. A pending edge is
//! either a candidate created for the drag, or an existing real edge whose
//! moving end was tentatively detached from its port. Drops resolve pending
//! edges in reverse order; rejected ones are reverted, never reported as
//! errors.

use crate::error::Result;
use crate::geometry::{distance, Vec2};
use crate::graph::{Direction, EdgeEnd, EdgeId, EdgeShape, Graph, PortId};
use crate::host::{Action, DragOffer, DragTarget, EdgeGrip, EventReply, GraphHost};
use crate::validation::ValidationResult;
use tracing::{debug, warn};

/// Observable state of a connection drag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DragState {
    #[default]
    Idle,
    PortDragOffered,
    Hovering(PortId),
}

/// Response to a drag offer.
#[derive(Debug, Clone, PartialEq)]
pub enum OfferOutcome {
    /// Not ours; let the event propagate.
    Ignored,
    /// Handed to the host as a view (pan) drag.
    ViewDrag,
    /// A connection drag is offered. It starts once the pointer has moved
    /// `threshold` units.
    Accepted { edges: Vec<EdgeId>, threshold: f32 },
}

/// What happened to one pending edge at drop or cancel time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropOutcome {
    /// Connected to the drop target. Carries the id of the resulting real
    /// edge: the promoted candidate itself, or the replacement of a
    /// reconnected edge.
    Connected(EdgeId),
    /// A candidate edge was thrown away, or a reconnected edge was lost
    /// after the host had already been told it was deleted.
    Discarded,
    /// An existing edge went back to its prior endpoints.
    Reverted,
}

/// Per-edge results of a drop, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DropReport {
    pub outcomes: Vec<(EdgeId, DropOutcome)>,
}

impl DropReport {
    /// Ids of edges that now exist because of this drop.
    pub fn connected(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.outcomes.iter().filter_map(|(_, outcome)| match outcome {
            DropOutcome::Connected(id) => Some(*id),
            _ => None,
        })
    }

    pub fn outcome(&self, edge: EdgeId) -> Option<DropOutcome> {
        self.outcomes
            .iter()
            .find(|(id, _)| *id == edge)
            .map(|(_, outcome)| *outcome)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingKind {
    Candidate,
    Existing { output: PortId, input: PortId },
}

#[derive(Debug, Clone, Copy)]
struct PendingEdge {
    edge: EdgeId,
    kind: PendingKind,
    free_end: EdgeEnd,
}

/// The drag-connection controller.
#[derive(Debug, Default)]
pub struct ConnectionDrag {
    state: DragState,
    pending: Vec<PendingEdge>,
    origin: Vec2,
    threshold: f32,
    started: bool,
}

impl ConnectionDrag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state != DragState::Idle
    }

    /// Whether the pointer has passed the drag threshold.
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// The drag payload, in offer order.
    pub fn pending_edges(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.pending.iter().map(|p| p.edge)
    }

    fn reset(&mut self) {
        self.state = DragState::Idle;
        self.pending.clear();
        self.started = false;
    }

    /// Pointer went down on something. View drags are resolved first.
    pub fn drag_offer<H>(&mut self, graph: &mut Graph, host: &mut H, offer: &DragOffer) -> OfferOutcome
    where
        H: GraphHost + ?Sized,
    {
        if offer.target == DragTarget::Background || host.is_view_drag(offer) {
            debug!("offer handed over as view drag");
            host.begin_view_drag(offer);
            return OfferOutcome::ViewDrag;
        }
        if !offer.is_connection_gesture() {
            return OfferOutcome::Ignored;
        }
        if self.is_active() {
            debug!(state = ?self.state, "offer while a drag is in flight");
            return OfferOutcome::Ignored;
        }

        let accepted = match &offer.target {
            DragTarget::Port(port) => self.offer_port(graph, *port, offer.position),
            DragTarget::EdgeEnds(grips) => self.offer_edge_ends(graph, grips),
            DragTarget::Background => false,
        };
        if !accepted {
            return OfferOutcome::Ignored;
        }

        self.state = DragState::PortDragOffered;
        self.origin = offer.position;
        self.started = false;
        self.threshold = graph.config().drag.threshold;
        debug!(edges = self.pending.len(), "connection drag offered");
        OfferOutcome::Accepted {
            edges: self.pending_edges().collect(),
            threshold: self.threshold,
        }
    }

    fn offer_port(&mut self, graph: &mut Graph, port: PortId, position: Vec2) -> bool {
        let Some(direction) = graph.port(port).map(|p| p.direction()) else {
            warn!(%port, "offer on unknown port");
            return false;
        };
        if !graph.can_connect_to_more(port, true) {
            debug!(%port, "port accepts no more connections");
            return false;
        }

        let edge = graph.create_edge();
        let bound_end = EdgeEnd::for_direction(direction);
        let free_end = bound_end.other();
        let staged = graph
            .set_endpoint(edge, bound_end, Some(port))
            .and_then(|_| graph.set_position_override(edge, free_end, Some(position)))
            .and_then(|_| graph.set_edge_flags(edge, false, false))
            .and_then(|_| graph.add_element(edge));
        if let Err(err) = staged {
            warn!(%err, "could not stage candidate edge");
            discard_edge(graph, edge);
            return false;
        }

        self.pending.push(PendingEdge {
            edge,
            kind: PendingKind::Candidate,
            free_end,
        });
        true
    }

    fn offer_edge_ends(&mut self, graph: &mut Graph, grips: &[EdgeGrip]) -> bool {
        for grip in grips {
            let Some(edge) = graph.edge(grip.edge) else {
                warn!(edge = %grip.edge, "offer on unknown edge");
                continue;
            };
            let (Some(output), Some(input)) = (edge.output(), edge.input()) else {
                continue;
            };
            if !edge.is_attached() || !edge.is_pickable() {
                continue;
            }
            let Some(start) = edge.port(grip.end).and_then(|p| graph.port_position(p)) else {
                continue;
            };

            let staged = graph
                .set_position_override(grip.edge, grip.end, Some(start))
                .and_then(|_| graph.detach_end(grip.edge, grip.end))
                .and_then(|_| graph.set_edge_flags(grip.edge, true, false));
            if let Err(err) = staged {
                warn!(%err, "could not pick up edge end");
                continue;
            }

            self.pending.push(PendingEdge {
                edge: grip.edge,
                kind: PendingKind::Existing { output, input },
                free_end: grip.end,
            });
        }
        !self.pending.is_empty()
    }

    /// Pointer moved during a drag: start it once past the threshold, and
    /// move the free end of every pending edge.
    pub fn pointer_moved(&mut self, graph: &mut Graph, position: Vec2) -> EventReply {
        if !self.is_active() {
            return EventReply::Ignored;
        }
        if !self.started && distance(self.origin, position) >= self.threshold {
            self.started = true;
            debug!("connection drag started");
            for p in self.pending.iter().filter(|p| p.kind == PendingKind::Candidate) {
                if let Err(err) = graph.set_edge_flags(p.edge, true, false) {
                    warn!(edge = %p.edge, %err, "could not reveal candidate edge");
                }
            }
        }
        for p in &self.pending {
            if let Err(err) = graph.set_position_override(p.edge, p.free_end, Some(position)) {
                warn!(%err, "pending edge vanished");
            }
        }
        EventReply::Consumed
    }

    /// Pointer entered a port. Arms it when the first pending edge could
    /// connect there.
    pub fn drop_enter(&mut self, graph: &mut Graph, target: PortId) -> EventReply {
        if !self.is_active() {
            return EventReply::Ignored;
        }
        let Some(first) = self.pending.first().map(|p| p.edge) else {
            return EventReply::Ignored;
        };
        let Some(anchored) = graph.anchored_port(first) else {
            return EventReply::Consumed;
        };

        match graph.validate_connection_excluding(anchored, target, true, Some(first)) {
            ValidationResult::Valid => {
                if let DragState::Hovering(previous) = self.state {
                    graph.update_cap_visibility(previous);
                }
                graph.arm_port(target);
                self.state = DragState::Hovering(target);
                debug!(%target, "hovering compatible port");
            }
            ValidationResult::Invalid(reason) => {
                debug!(%target, %reason, "port not compatible");
            }
        }
        EventReply::Consumed
    }

    /// Pointer left a port without dropping.
    pub fn drop_exit(&mut self, graph: &mut Graph, target: PortId) -> EventReply {
        if !self.is_active() {
            return EventReply::Ignored;
        }
        graph.update_cap_visibility(target);
        if self.state == DragState::Hovering(target) {
            self.state = DragState::PortDragOffered;
        }
        EventReply::Consumed
    }

    /// Drop on a port. `None` when no drag is in flight.
    ///
    /// # Panics
    ///
    /// If a drag is active with an empty payload, which the offer path
    /// never produces.
    pub fn drop<H>(&mut self, graph: &mut Graph, host: &mut H, target: PortId) -> Option<DropReport>
    where
        H: GraphHost + ?Sized,
    {
        if !self.is_active() {
            return None;
        }
        assert!(!self.pending.is_empty(), "drop payload was unexpectedly empty");

        if !self.started {
            debug!("drop before drag threshold, cancelling");
            return Some(DropReport {
                outcomes: self.cancel(graph),
            });
        }

        let pending = std::mem::take(&mut self.pending);
        let mut outcomes = Vec::with_capacity(pending.len());
        for p in pending.iter().rev() {
            let outcome = match connect_pending(graph, host, target, p) {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!(edge = %p.edge, %err, "reconnection failed, reverting");
                    revert(graph, p)
                }
            };
            outcomes.push((p.edge, outcome));
        }
        graph.update_cap_visibility(target);
        self.reset();
        debug!(%target, ?outcomes, "drop resolved");
        Some(DropReport { outcomes })
    }

    /// Abandon the drag: candidates are discarded, existing edges restored.
    pub fn cancel(&mut self, graph: &mut Graph) -> Vec<(EdgeId, DropOutcome)> {
        if !self.is_active() {
            return Vec::new();
        }
        let outcomes = self
            .pending
            .iter()
            .rev()
            .map(|p| (p.edge, revert(graph, p)))
            .collect();
        if let DragState::Hovering(port) = self.state {
            graph.update_cap_visibility(port);
        }
        self.reset();
        debug!("connection drag cancelled");
        outcomes
    }
}

fn connect_pending<H>(graph: &mut Graph, host: &mut H, target: PortId, p: &PendingEdge) -> Result<DropOutcome>
where
    H: GraphHost + ?Sized,
{
    let Some(anchored) = graph.anchored_port(p.edge) else {
        return Ok(revert(graph, p));
    };
    if let ValidationResult::Invalid(reason) =
        graph.validate_connection_excluding(anchored, target, true, Some(p.edge))
    {
        debug!(edge = %p.edge, %target, %reason, "drop rejected");
        return Ok(revert(graph, p));
    }

    let (output, input) = if graph.try_port(anchored)?.direction() == Direction::Output {
        (anchored, target)
    } else {
        (target, anchored)
    };

    match p.kind {
        PendingKind::Existing {
            output: old_output,
            input: old_input,
        } => {
            if old_output == output && old_input == input {
                return Ok(revert(graph, p));
            }
            let shape = graph.try_edge(p.edge)?.shape();
            let replacement = stage_replacement(graph, shape, output, input)?;
            if let Err(err) = graph.apply_action(Action::EdgeDelete, p.edge, host) {
                discard_edge(graph, replacement);
                return Err(err);
            }
            if let Err(err) = graph.delete_edge(p.edge) {
                warn!(edge = %p.edge, %err, "old edge already gone");
            }
            // The old edge is gone for the host now, so a failure here drops the link.
            if let Err(err) = graph.apply_action(Action::EdgeCreate, replacement, host) {
                warn!(edge = %replacement, %err, "replacement could not be added");
                discard_edge(graph, replacement);
                return Ok(DropOutcome::Discarded);
            }
            Ok(DropOutcome::Connected(replacement))
        }
        PendingKind::Candidate => {
            graph.remove_element(p.edge)?;
            graph.clear_position_overrides(p.edge)?;
            graph.set_endpoint(p.edge, EdgeEnd::Output, Some(output))?;
            graph.set_endpoint(p.edge, EdgeEnd::Input, Some(input))?;
            graph.apply_action(Action::EdgeCreate, p.edge, host)?;
            Ok(DropOutcome::Connected(p.edge))
        }
    }
}

/// Build a bound, detached edge for a reconnection. Nothing is left behind
/// when binding fails.
fn stage_replacement(graph: &mut Graph, shape: EdgeShape, output: PortId, input: PortId) -> Result<EdgeId> {
    let replacement = graph.create_edge();
    let staged = graph
        .set_edge_shape(replacement, shape)
        .and_then(|_| graph.set_endpoint(replacement, EdgeEnd::Output, Some(output)))
        .and_then(|_| graph.set_endpoint(replacement, EdgeEnd::Input, Some(input)));
    if let Err(err) = staged {
        discard_edge(graph, replacement);
        return Err(err);
    }
    Ok(replacement)
}

fn discard_edge(graph: &mut Graph, edge: EdgeId) {
    if let Err(err) = graph.delete_edge(edge) {
        warn!(%edge, %err, "could not discard edge");
    }
}

fn revert(graph: &mut Graph, p: &PendingEdge) -> DropOutcome {
    match p.kind {
        PendingKind::Candidate => {
            if let Err(err) = graph.delete_edge(p.edge) {
                warn!(edge = %p.edge, %err, "candidate already gone");
            }
            DropOutcome::Discarded
        }
        PendingKind::Existing { output, input } => {
            let restored = graph
                .clear_position_overrides(p.edge)
                .and_then(|_| graph.set_endpoint(p.edge, EdgeEnd::Output, Some(output)))
                .and_then(|_| graph.set_endpoint(p.edge, EdgeEnd::Input, Some(input)))
                .and_then(|_| graph.set_edge_flags(p.edge, true, true));
            if let Err(err) = restored {
                warn!(edge = %p.edge, %err, "could not restore edge");
            }
            DropOutcome::Reverted
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::PortSpec;
    use crate::host::RecordedActions;

    struct Fixture {
        graph: Graph,
        host: RecordedActions,
        drag: ConnectionDrag,
        a_out: PortId,
        b_in: PortId,
    }

    fn setup() -> Fixture {
        let mut graph = Graph::new();
        let a = graph.add_node(Vec2::new(0.0, 0.0));
        let b = graph.add_node(Vec2::new(300.0, 0.0));
        let a_out = graph.add_port(a, PortSpec::output(Vec2::new(100.0, 20.0))).unwrap();
        let b_in = graph.add_port(b, PortSpec::input(Vec2::new(0.0, 20.0))).unwrap();
        Fixture {
            graph,
            host: RecordedActions::default(),
            drag: ConnectionDrag::new(),
            a_out,
            b_in,
        }
    }

    impl Fixture {
        fn offer(&mut self, port: PortId) -> OfferOutcome {
            let position = self.graph.port_position(port).unwrap();
            self.drag.drag_offer(
                &mut self.graph,
                &mut self.host,
                &DragOffer::left(DragTarget::Port(port), position),
            )
        }
    }

    // ========================================================================
    // Offer
    // ========================================================================

    #[test]
    fn test_offer_creates_hidden_candidate() {
        let mut f = setup();
        let OfferOutcome::Accepted { edges, threshold } = f.offer(f.a_out) else {
            panic!("offer should be accepted");
        };
        assert_eq!(threshold, 10.0);
        assert_eq!(edges.len(), 1);
        let edge = f.graph.edge(edges[0]).unwrap();
        assert!(edge.is_candidate());
        assert!(edge.is_attached());
        assert!(!edge.is_visible());
        assert!(!edge.is_pickable());
        assert_eq!(f.drag.state(), DragState::PortDragOffered);
        assert!(f.host.records.is_empty());
    }

    #[test]
    fn test_second_offer_while_active_is_ignored() {
        let mut f = setup();
        f.offer(f.a_out);
        assert_eq!(f.offer(f.b_in), OfferOutcome::Ignored);
        assert_eq!(f.drag.pending_edges().count(), 1);
    }

    // ========================================================================
    // Threshold
    // ========================================================================

    #[test]
    fn test_threshold_reveals_candidate() {
        let mut f = setup();
        f.offer(f.a_out);
        let edge = f.drag.pending_edges().next().unwrap();

        f.drag.pointer_moved(&mut f.graph, Vec2::new(105.0, 20.0));
        assert!(!f.drag.is_started());
        assert!(!f.graph.edge(edge).unwrap().is_visible());

        f.drag.pointer_moved(&mut f.graph, Vec2::new(115.0, 20.0));
        assert!(f.drag.is_started());
        assert!(f.graph.edge(edge).unwrap().is_visible());
        assert_eq!(
            f.graph.edge(edge).unwrap().position_override(EdgeEnd::Input),
            Some(Vec2::new(115.0, 20.0))
        );
    }

    #[test]
    fn test_drop_before_threshold_cancels() {
        let mut f = setup();
        f.offer(f.a_out);
        let edge = f.drag.pending_edges().next().unwrap();
        let report = f.drag.drop(&mut f.graph, &mut f.host, f.b_in).unwrap();
        assert_eq!(report.outcome(edge), Some(DropOutcome::Discarded));
        assert!(f.graph.edge(edge).is_none());
        assert!(f.host.records.is_empty());
        assert_eq!(f.drag.state(), DragState::Idle);
    }

    // ========================================================================
    // Reconnect
    // ========================================================================

    #[test]
    fn test_reconnect_keeps_shape_and_signal_order() {
        let mut f = setup();
        let c = f.graph.add_node(Vec2::new(600.0, 0.0));
        let c_in = f.graph.add_port(c, PortSpec::input(Vec2::new(0.0, 20.0))).unwrap();
        let old = f.graph.connect_to(f.a_out, f.b_in).unwrap();
        f.graph.set_edge_shape(old, EdgeShape::Angular).unwrap();
        f.graph.apply_action(Action::EdgeCreate, old, &mut ()).unwrap();

        let grip = EdgeGrip { edge: old, end: EdgeEnd::Input };
        let start = f.graph.port_position(f.b_in).unwrap();
        let offer = DragOffer::left(DragTarget::EdgeEnds(vec![grip]), start);
        f.drag.drag_offer(&mut f.graph, &mut f.host, &offer);
        f.drag.pointer_moved(&mut f.graph, Vec2::new(450.0, 80.0));
        let report = f.drag.drop(&mut f.graph, &mut f.host, c_in).unwrap();

        let Some(DropOutcome::Connected(new)) = report.outcome(old) else {
            panic!("expected reconnection, got {report:?}");
        };
        assert_eq!(
            f.host.actions(),
            vec![(Action::EdgeDelete, old), (Action::EdgeCreate, new)]
        );
        assert!(f.graph.edge(old).is_none());
        let e = f.graph.edge(new).unwrap();
        assert_eq!(e.shape(), EdgeShape::Angular);
        assert_eq!((e.output(), e.input()), (Some(f.a_out), Some(c_in)));
        assert_eq!(f.graph.edge_count(), 1);
    }

    #[test]
    fn test_failed_replacement_leaves_nothing_behind() {
        let mut f = setup();
        let old = f.graph.connect_to(f.a_out, f.b_in).unwrap();
        let err = stage_replacement(&mut f.graph, EdgeShape::Rounded, f.a_out, PortId(999)).unwrap_err();
        assert_eq!(err, crate::error::GraphError::PortNotFound(PortId(999)));

        assert_eq!(f.graph.edge_count(), 1);
        let connections: Vec<EdgeId> = f.graph.port(f.a_out).unwrap().connections().collect();
        assert_eq!(connections, vec![old]);
        assert_eq!(f.graph.edge(old).unwrap().input(), Some(f.b_in));
    }

    // ========================================================================
    // Idle
    // ========================================================================

    #[test]
    fn test_events_ignored_when_idle() {
        let mut f = setup();
        assert_eq!(f.drag.pointer_moved(&mut f.graph, Vec2::ZERO), EventReply::Ignored);
        assert_eq!(f.drag.drop_enter(&mut f.graph, f.b_in), EventReply::Ignored);
        assert_eq!(f.drag.drop_exit(&mut f.graph, f.b_in), EventReply::Ignored);
        assert!(f.drag.drop(&mut f.graph, &mut f.host, f.b_in).is_none());
        assert!(f.drag.cancel(&mut f.graph).is_empty());
    }
}
