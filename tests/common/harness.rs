//! Test harness: a small three-node graph plus helpers that simulate the
//! pointer protocol the way a Slint UI would drive it.

#![allow(dead_code)]

use super::{init_tracing, RecordingHost};
use slint_node_wiring::{
    Capacity, DragOffer, DragTarget, DropReport, EdgeEnd, EdgeGrip, EdgeId, EditorController,
    EngineConfig, Graph, NodeId, OfferOutcome, PortId, PortSpec, Vec2,
};

/// Layout (node positions, 120x60 nodes):
///
/// ```text
///  A (0,0)            B (300,0)            C (600,0)
///  in  a_in  (0,30)   in  b_in  (300,30)   in  c_in  (600,30)  Multi
///  out a_out (120,30) out b_out (420,30)   out c_out (720,30)  Single
/// ```
pub struct TestHarness {
    pub ctrl: EditorController<RecordingHost>,
    pub host: RecordingHost,
    pub a: NodeId,
    pub b: NodeId,
    pub c: NodeId,
    pub a_in: PortId,
    pub a_out: PortId,
    pub b_in: PortId,
    pub b_out: PortId,
    pub c_in: PortId,
    pub c_out: PortId,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        init_tracing();
        let mut graph = Graph::with_config(config);
        let size = Vec2::new(120.0, 60.0);
        let a = graph.add_node_with_size(Vec2::new(0.0, 0.0), size);
        let b = graph.add_node_with_size(Vec2::new(300.0, 0.0), size);
        let c = graph.add_node_with_size(Vec2::new(600.0, 0.0), size);

        let input = PortSpec::input(Vec2::new(0.0, 30.0));
        let output = PortSpec::output(Vec2::new(120.0, 30.0));
        let a_in = graph.add_port(a, input).unwrap();
        let a_out = graph.add_port(a, output).unwrap();
        let b_in = graph.add_port(b, input).unwrap();
        let b_out = graph.add_port(b, output).unwrap();
        let c_in = graph
            .add_port(c, input.with_capacity(Capacity::Multi))
            .unwrap();
        let c_out = graph
            .add_port(c, output.with_capacity(Capacity::Single))
            .unwrap();

        let host = RecordingHost::new();
        let ctrl = EditorController::with_graph(host.clone(), graph);
        *host.graph.borrow_mut() = Some(ctrl.graph());
        Self {
            ctrl,
            host,
            a,
            b,
            c,
            a_in,
            a_out,
            b_in,
            b_out,
            c_in,
            c_out,
        }
    }

    pub fn port_position(&self, port: PortId) -> Vec2 {
        self.ctrl.graph().borrow().port_position(port).unwrap()
    }

    /// Connect through the controller and forget the notifications.
    pub fn connect(&self, a: PortId, b: PortId) -> EdgeId {
        let edge = self.ctrl.connect(a, b).unwrap().unwrap();
        self.host.clear();
        edge
    }

    pub fn offer_port(&self, port: PortId) -> OfferOutcome {
        let position = self.port_position(port);
        self.ctrl
            .handle_drag_offer(&DragOffer::left(DragTarget::Port(port), position))
    }

    pub fn offer_edge_end(&self, edge: EdgeId, end: EdgeEnd) -> OfferOutcome {
        let port = self.ctrl.graph().borrow().edge(edge).unwrap().port(end).unwrap();
        let position = self.port_position(port);
        self.ctrl.handle_drag_offer(&DragOffer::left(
            DragTarget::EdgeEnds(vec![EdgeGrip { edge, end }]),
            position,
        ))
    }

    /// Move the pointer onto `target`, entering it like a UI would.
    pub fn hover(&self, target: PortId) {
        let position = self.port_position(target);
        self.ctrl.handle_pointer_moved(position.x, position.y);
        self.ctrl.handle_drop_enter(target);
    }

    /// Full gesture: offer on `from`, drag onto `to`, drop.
    pub fn drag_port_to(&self, from: PortId, to: PortId) -> Option<DropReport> {
        self.offer_port(from);
        self.hover(to);
        self.ctrl.handle_drop(to)
    }

    pub fn edge_ports(&self, edge: EdgeId) -> (Option<PortId>, Option<PortId>) {
        let graph = self.ctrl.graph();
        let graph = graph.borrow();
        let edge = graph.edge(edge).unwrap();
        (edge.output(), edge.input())
    }

    pub fn has_connection(&self, port: PortId, edge: EdgeId) -> bool {
        self.ctrl.graph().borrow().port(port).unwrap().has_connection(edge)
    }

    pub fn cap_visible(&self, port: PortId) -> bool {
        self.ctrl.graph().borrow().port(port).unwrap().cap_visible()
    }

    pub fn edge_count(&self) -> usize {
        self.ctrl.graph().borrow().edge_count()
    }
}
