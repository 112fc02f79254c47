//! Shared-handle facade for wiring the engine into a Slint UI.
//!
//! [`EditorController`] owns the graph, the drag state machine, the host and
//! the path sync behind `Rc<RefCell<..>>`, so clones can be moved into any
//! number of Slint callbacks.
//!
//! # Example
//!
//! ```ignore
//! use slint_node_wiring::{DragOffer, DragTarget, EditorController, EngineConfig, PortId, Vec2};
//!
//! slint::include_modules!();
//!
//! fn main() {
//!     let window = MainWindow::new().unwrap();
//!     let ctrl = EditorController::new(MyHost::default(), EngineConfig::default());
//!
//!     let model = Rc::new(VecModel::<EdgePath>::default());
//!     ctrl.bind_paths_model(model.clone(), |id, path, width| EdgePath { id, path_commands: path, width });
//!     window.set_edge_paths(ModelRc::from(model));
//!
//!     window.on_port_pressed({
//!         let ctrl = ctrl.clone();
//!         move |port, x, y| {
//!             ctrl.handle_drag_offer(&DragOffer::left(DragTarget::Port(PortId(port)), Vec2::new(x, y)));
//!         }
//!     });
//!     window.on_pointer_moved(ctrl.pointer_moved_callback());
//!     window.on_pointer_released(ctrl.pointer_released_callback());
//!     window.on_node_moved(ctrl.node_moved_callback());
//!
//!     window.run().unwrap();
//! }
//! ```

use crate::config::EngineConfig;
use crate::error::Result;
use crate::geometry::{Rect, Vec2};
use crate::graph::{EdgeId, Graph, NodeId, PortId};
use crate::host::{Action, ActionRecord, DragOffer, GraphHost, RecordedActions};
use crate::interaction::{ConnectionDrag, DragState, DropOutcome, DropReport, OfferOutcome};
use crate::links::EdgePathSync;
use crate::validation::ValidationResult;
use slint::{SharedString, VecModel};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, warn};

/// Controller that routes pointer events through the connection engine and
/// keeps rendered edge paths current.
///
/// Clone this controller to share it across callbacks.
pub struct EditorController<H> {
    graph: Rc<RefCell<Graph>>,
    drag: Rc<RefCell<ConnectionDrag>>,
    host: Rc<RefCell<H>>,
    paths: Rc<RefCell<EdgePathSync>>,
}

impl<H> Clone for EditorController<H> {
    fn clone(&self) -> Self {
        Self {
            graph: self.graph.clone(),
            drag: self.drag.clone(),
            host: self.host.clone(),
            paths: self.paths.clone(),
        }
    }
}

impl<H: GraphHost + 'static> EditorController<H> {
    pub fn new(host: H, config: EngineConfig) -> Self {
        Self::with_graph(host, Graph::with_config(config))
    }

    /// Wrap an already populated graph.
    pub fn with_graph(host: H, graph: Graph) -> Self {
        Self {
            graph: Rc::new(RefCell::new(graph)),
            drag: Rc::new(RefCell::new(ConnectionDrag::new())),
            host: Rc::new(RefCell::new(host)),
            paths: Rc::new(RefCell::new(EdgePathSync::new())),
        }
    }

    /// Get access to the graph.
    pub fn graph(&self) -> Rc<RefCell<Graph>> {
        self.graph.clone()
    }

    pub fn host(&self) -> Rc<RefCell<H>> {
        self.host.clone()
    }

    pub fn drag_state(&self) -> DragState {
        self.drag.borrow().state()
    }

    pub fn scale(&self) -> f32 {
        self.host.borrow().current_scale()
    }

    pub fn bind_paths_model<P, F>(&self, model: Rc<VecModel<P>>, constructor: F)
    where
        P: Clone + 'static,
        F: Fn(i32, SharedString, f32) -> P + 'static,
    {
        self.paths.borrow_mut().bind_model(model, constructor);
        self.refresh();
    }

    /// Re-route dirty edges and resync the path model.
    ///
    /// A zoom change alone does not mark edges dirty; see
    /// [`Graph::update_edge_layout`].
    pub fn refresh(&self) {
        let scale = self.scale();
        let mut graph = self.graph.borrow_mut();
        graph.update_layouts(scale);
        self.paths.borrow_mut().update(&graph, scale);
    }

    // === Drag protocol ===

    pub fn handle_drag_offer(&self, offer: &DragOffer) -> OfferOutcome {
        let outcome = {
            let mut graph = self.graph.borrow_mut();
            let mut host = self.host.borrow_mut();
            let outcome = self.drag.borrow_mut().drag_offer(&mut graph, &mut *host, offer);
            outcome
        };
        if matches!(outcome, OfferOutcome::Accepted { .. }) {
            self.refresh();
        }
        outcome
    }

    /// Returns whether the event was consumed.
    pub fn handle_pointer_moved(&self, x: f32, y: f32) -> bool {
        let consumed = {
            let mut graph = self.graph.borrow_mut();
            let reply = self.drag.borrow_mut().pointer_moved(&mut graph, Vec2::new(x, y));
            reply.is_consumed()
        };
        if consumed {
            self.refresh();
        }
        consumed
    }

    pub fn handle_drop_enter(&self, port: PortId) -> bool {
        let mut graph = self.graph.borrow_mut();
        let reply = self.drag.borrow_mut().drop_enter(&mut graph, port);
        reply.is_consumed()
    }

    pub fn handle_drop_exit(&self, port: PortId) -> bool {
        let mut graph = self.graph.borrow_mut();
        let reply = self.drag.borrow_mut().drop_exit(&mut graph, port);
        reply.is_consumed()
    }

    pub fn handle_drop(&self, port: PortId) -> Option<DropReport> {
        let mut executed = RecordedActions::default();
        let report = {
            let mut graph = self.graph.borrow_mut();
            let report = self.drag.borrow_mut().drop(&mut graph, &mut executed, port);
            report
        };
        if report.is_some() {
            self.refresh();
        }
        self.notify(executed);
        report
    }

    /// Pointer released at a graph position: drop on the port under it, or
    /// cancel when there is none.
    pub fn handle_release(&self, x: f32, y: f32) -> Option<DropReport> {
        if !self.drag.borrow().is_active() {
            return None;
        }
        let target = {
            let graph = self.graph.borrow();
            let radius = graph.config().drag.port_hit_radius;
            let port = graph.find_port_at(Vec2::new(x, y), radius);
            port
        };
        match target {
            Some(port) => self.handle_drop(port),
            None => Some(DropReport {
                outcomes: self.cancel_drag(),
            }),
        }
    }

    pub fn cancel_drag(&self) -> Vec<(EdgeId, DropOutcome)> {
        let outcomes = {
            let mut graph = self.graph.borrow_mut();
            let outcomes = self.drag.borrow_mut().cancel(&mut graph);
            outcomes
        };
        if !outcomes.is_empty() {
            self.refresh();
        }
        outcomes
    }

    // === Structural edits ===

    /// Connect two ports if the rules allow it. `Ok(None)` when refused.
    pub fn connect(&self, a: PortId, b: PortId) -> Result<Option<EdgeId>> {
        let mut executed = RecordedActions::default();
        let edge = {
            let mut graph = self.graph.borrow_mut();
            if let ValidationResult::Invalid(reason) = graph.validate_connection(a, b, true) {
                debug!(%a, %b, %reason, "connection refused");
                return Ok(None);
            }
            let edge = graph.connect_to(a, b)?;
            graph.apply_action(Action::EdgeCreate, edge, &mut executed)?;
            edge
        };
        self.refresh();
        self.notify(executed);
        Ok(Some(edge))
    }

    /// Delete a real edge, notifying the host.
    pub fn delete_edge(&self, edge: EdgeId) -> Result<()> {
        let mut executed = RecordedActions::default();
        {
            let mut graph = self.graph.borrow_mut();
            graph.apply_action(Action::EdgeDelete, edge, &mut executed)?;
            graph.delete_edge(edge)?;
        }
        self.refresh();
        self.notify(executed);
        Ok(())
    }

    /// Remove a node; every edge it carried is reported to the host as deleted.
    pub fn remove_node(&self, node: NodeId) -> Result<()> {
        let mut executed = RecordedActions::default();
        {
            let mut graph = self.graph.borrow_mut();
            let snapshots: Vec<ActionRecord> = {
                let g: &Graph = &graph;
                g.node(node)
                    .into_iter()
                    .flat_map(|n| n.ports())
                    .filter_map(|port| g.port(*port))
                    .flat_map(|port| port.connections())
                    .filter_map(|edge| g.action_record(Action::EdgeDelete, edge).ok())
                    .collect()
            };
            let removed = graph.remove_node(node)?;
            executed.records = removed
                .iter()
                .filter_map(|edge| snapshots.iter().find(|r| r.edge == *edge).copied())
                .collect();
        }
        self.refresh();
        self.notify(executed);
        Ok(())
    }

    /// Deliver buffered notifications once the graph is free to be read.
    fn notify(&self, executed: RecordedActions) {
        if executed.records.is_empty() {
            return;
        }
        executed.forward_to(&mut *self.host.borrow_mut());
    }

    pub fn move_node(&self, node: NodeId, x: f32, y: f32) -> Result<()> {
        self.graph.borrow_mut().set_node_position(node, Vec2::new(x, y))?;
        self.refresh();
        Ok(())
    }

    // === Queries ===

    /// Edge under the pointer, or -1.
    pub fn find_edge_at(&self, x: f32, y: f32) -> i32 {
        self.graph
            .borrow()
            .find_edge_at(Vec2::new(x, y))
            .map_or(-1, |edge| edge.0)
    }

    /// Port under the pointer, or 0.
    pub fn find_port_at(&self, x: f32, y: f32) -> i32 {
        let graph = self.graph.borrow();
        let radius = graph.config().drag.port_hit_radius;
        graph
            .find_port_at(Vec2::new(x, y), radius)
            .map_or(0, |port| port.0)
    }

    pub fn edges_in_selection_box(&self, x: f32, y: f32, width: f32, height: f32) -> Vec<i32> {
        self.graph
            .borrow()
            .edges_in_selection_box(Rect::new(x, y, width, height))
            .into_iter()
            .map(|edge| edge.0)
            .collect()
    }

    /// Path commands of one edge, routing it first if needed.
    pub fn edge_path(&self, edge: EdgeId) -> SharedString {
        let scale = self.scale();
        let mut graph = self.graph.borrow_mut();
        if let Err(err) = graph.update_edge_layout(edge, scale) {
            warn!(%err, "no path for edge");
            return SharedString::default();
        }
        graph
            .edge(edge)
            .map(|e| e.geometry().path_commands().into())
            .unwrap_or_default()
    }

    // === Callback factories ===

    /// Returns a callback for `edge-path(id) -> string`.
    pub fn edge_path_callback(&self) -> impl Fn(i32) -> SharedString {
        let ctrl = self.clone();
        move |edge| ctrl.edge_path(EdgeId(edge))
    }

    /// Returns a callback for `node-moved(id, x, y)`.
    pub fn node_moved_callback(&self) -> impl Fn(i32, f32, f32) {
        let ctrl = self.clone();
        move |node, x, y| {
            if let Err(err) = ctrl.move_node(NodeId(node), x, y) {
                warn!(%err, "node move ignored");
            }
        }
    }

    /// Returns a callback for `pointer-moved(x, y) -> bool`.
    pub fn pointer_moved_callback(&self) -> impl Fn(f32, f32) -> bool {
        let ctrl = self.clone();
        move |x, y| ctrl.handle_pointer_moved(x, y)
    }

    /// Returns a callback for `pointer-released(x, y)`.
    pub fn pointer_released_callback(&self) -> impl Fn(f32, f32) {
        let ctrl = self.clone();
        move |x, y| {
            ctrl.handle_release(x, y);
        }
    }
}
