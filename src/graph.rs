//! Nodes, ports and edges, and the arena that owns them.
//!
//! [`Graph`] is the canonical store. Nodes own their ports; edges refer to
//! ports by [`PortId`] only, since a `Multi` port may be shared by many
//! edges. Binding an edge end to a port also inserts the edge into that
//! port's connection set, so a port always knows which edges touch it,
//! including transient candidate edges created during a drag.

use crate::config::EngineConfig;
use crate::error::{GraphError, Result};
use crate::geometry::{Rect, Vec2};
use crate::host::{Action, ActionRecord, GraphHost};
use crate::routing::{Anchor, EdgeGeometry, Endpoints};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use tracing::{debug, trace, warn};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub i32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Identity of a node.
    NodeId
);
id_type!(
    /// Identity of a port.
    PortId
);
id_type!(
    /// Identity of an edge.
    EdgeId
);

/// Which way data flows through a port. An edge always joins one of each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Input,
    Output,
}

impl Direction {
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Input => Direction::Output,
            Direction::Output => Direction::Input,
        }
    }
}

/// Axis along which an edge leaves a port. Only a routing hint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Orientation {
    #[default]
    Horizontal,
    Vertical,
}

/// How many real edges a port may carry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Capacity {
    #[default]
    Single,
    Multi,
}

/// One of the two ends of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeEnd {
    Output,
    Input,
}

impl EdgeEnd {
    pub fn other(self) -> EdgeEnd {
        match self {
            EdgeEnd::Output => EdgeEnd::Input,
            EdgeEnd::Input => EdgeEnd::Output,
        }
    }

    /// The end a port of the given direction binds to.
    pub fn for_direction(direction: Direction) -> EdgeEnd {
        match direction {
            Direction::Output => EdgeEnd::Output,
            Direction::Input => EdgeEnd::Input,
        }
    }
}

/// Visual variant of an edge; selects how control points become a polyline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum EdgeShape {
    /// Corners expanded into quadratic arcs.
    #[default]
    Rounded,
    /// Control points drawn as-is.
    Angular,
}

#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    position: Vec2,
    size: Option<Vec2>,
    ports: Vec<PortId>,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Visual extent, if the host has reported one.
    pub fn size(&self) -> Option<Vec2> {
        self.size
    }

    pub fn rect(&self) -> Option<Rect> {
        self.size
            .map(|size| Rect::new(self.position.x, self.position.y, size.x, size.y))
    }

    pub fn ports(&self) -> &[PortId] {
        &self.ports
    }
}

/// Static description of a port to create.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortSpec {
    pub direction: Direction,
    pub orientation: Orientation,
    pub capacity: Capacity,
    /// Position relative to the owning node.
    pub offset: Vec2,
}

impl PortSpec {
    pub fn input(offset: Vec2) -> Self {
        Self {
            direction: Direction::Input,
            orientation: Orientation::Horizontal,
            capacity: Capacity::Single,
            offset,
        }
    }

    pub fn output(offset: Vec2) -> Self {
        Self {
            direction: Direction::Output,
            orientation: Orientation::Horizontal,
            capacity: Capacity::Multi,
            offset,
        }
    }

    pub fn with_capacity(mut self, capacity: Capacity) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }
}

#[derive(Debug, Clone)]
pub struct Port {
    id: PortId,
    node: NodeId,
    direction: Direction,
    orientation: Orientation,
    capacity: Capacity,
    offset: Vec2,
    name: Option<String>,
    connections: BTreeSet<EdgeId>,
    cap_visible: bool,
}

impl Port {
    pub fn id(&self) -> PortId {
        self.id
    }

    /// Owning node (a lookup key, not ownership).
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn capacity(&self) -> Capacity {
        self.capacity
    }

    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Every edge bound to this port, candidates included.
    pub fn connections(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.connections.iter().copied()
    }

    pub fn has_connection(&self, edge: EdgeId) -> bool {
        self.connections.contains(&edge)
    }

    /// Whether the connector cap is lit (connected, or armed as a drop target).
    pub fn cap_visible(&self) -> bool {
        self.cap_visible
    }
}

#[derive(Debug, Clone)]
pub struct Edge {
    id: EdgeId,
    output: Option<PortId>,
    input: Option<PortId>,
    output_override: Option<Vec2>,
    input_override: Option<Vec2>,
    visible: bool,
    pickable: bool,
    attached: bool,
    shape: EdgeShape,
    pub(crate) geometry: EdgeGeometry,
}

impl Edge {
    fn new(id: EdgeId) -> Self {
        Self {
            id,
            output: None,
            input: None,
            output_override: None,
            input_override: None,
            visible: true,
            pickable: true,
            attached: false,
            shape: EdgeShape::default(),
            geometry: EdgeGeometry::default(),
        }
    }

    pub fn id(&self) -> EdgeId {
        self.id
    }

    pub fn output(&self) -> Option<PortId> {
        self.output
    }

    pub fn input(&self) -> Option<PortId> {
        self.input
    }

    pub fn port(&self, end: EdgeEnd) -> Option<PortId> {
        match end {
            EdgeEnd::Output => self.output,
            EdgeEnd::Input => self.input,
        }
    }

    /// Pointer-driven position of an end, if it is being dragged.
    pub fn position_override(&self, end: EdgeEnd) -> Option<Vec2> {
        match end {
            EdgeEnd::Output => self.output_override,
            EdgeEnd::Input => self.input_override,
        }
    }

    pub fn is_input_position_overridden(&self) -> bool {
        self.input_override.is_some()
    }

    /// Exactly one end bound: a transient edge following the pointer.
    pub fn is_candidate(&self) -> bool {
        self.output.is_some() != self.input.is_some()
    }

    /// Both ends bound.
    pub fn is_real(&self) -> bool {
        self.output.is_some() && self.input.is_some()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Whether hit-testing may report this edge.
    pub fn is_pickable(&self) -> bool {
        self.pickable
    }

    /// Whether the edge is currently part of the graph's element set.
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn shape(&self) -> EdgeShape {
        self.shape
    }

    pub fn geometry(&self) -> &EdgeGeometry {
        &self.geometry
    }

    fn set_port(&mut self, end: EdgeEnd, port: Option<PortId>) {
        match end {
            EdgeEnd::Output => self.output = port,
            EdgeEnd::Input => self.input = port,
        }
    }

    fn set_override(&mut self, end: EdgeEnd, position: Option<Vec2>) {
        match end {
            EdgeEnd::Output => self.output_override = position,
            EdgeEnd::Input => self.input_override = position,
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |p: Option<PortId>| p.map_or_else(|| "-".to_string(), |p| p.to_string());
        write!(f, "Output({}) -> Input({})", show(self.output), show(self.input))
    }
}

/// Owner of all nodes, ports and edges.
#[derive(Debug, Default)]
pub struct Graph {
    nodes: HashMap<NodeId, Node>,
    ports: HashMap<PortId, Port>,
    edges: BTreeMap<EdgeId, Edge>,
    next_id: i32,
    config: EngineConfig,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Replace the configuration and invalidate every edge's geometry.
    pub fn set_config(&mut self, config: EngineConfig) {
        self.config = config;
        for edge in self.edges.values_mut() {
            edge.geometry.mark_dirty();
        }
    }

    fn allocate_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    // === Lookup ===

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn port(&self, id: PortId) -> Option<&Port> {
        self.ports.get(&id)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    pub fn try_port(&self, id: PortId) -> Result<&Port> {
        self.ports.get(&id).ok_or(GraphError::PortNotFound(id))
    }

    pub fn try_edge(&self, id: EdgeId) -> Result<&Edge> {
        self.edges.get(&id).ok_or(GraphError::EdgeNotFound(id))
    }

    fn edge_mut(&mut self, id: EdgeId) -> Result<&mut Edge> {
        self.edges.get_mut(&id).ok_or(GraphError::EdgeNotFound(id))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn ports(&self) -> impl Iterator<Item = &Port> {
        self.ports.values()
    }

    /// All edges in ascending id order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Global position of a port's connector.
    pub fn port_position(&self, id: PortId) -> Option<Vec2> {
        let port = self.ports.get(&id)?;
        let node = self.nodes.get(&port.node)?;
        Some(node.position + port.offset)
    }

    // === Nodes and ports ===

    pub fn add_node(&mut self, position: Vec2) -> NodeId {
        let id = NodeId(self.allocate_id());
        self.nodes.insert(
            id,
            Node {
                id,
                position,
                size: None,
                ports: Vec::new(),
            },
        );
        id
    }

    pub fn add_node_with_size(&mut self, position: Vec2, size: Vec2) -> NodeId {
        let id = self.add_node(position);
        if let Some(node) = self.nodes.get_mut(&id) {
            node.size = Some(size);
        }
        id
    }

    pub fn set_node_size(&mut self, id: NodeId, size: Option<Vec2>) -> Result<()> {
        let node = self.nodes.get_mut(&id).ok_or(GraphError::NodeNotFound(id))?;
        node.size = size;
        self.invalidate_node_edges(id);
        Ok(())
    }

    /// Move a node. This is the position-change notification: every edge
    /// touching one of its ports gets its control points invalidated.
    pub fn set_node_position(&mut self, id: NodeId, position: Vec2) -> Result<()> {
        let node = self.nodes.get_mut(&id).ok_or(GraphError::NodeNotFound(id))?;
        if node.position == position {
            return Ok(());
        }
        node.position = position;
        self.invalidate_node_edges(id);
        Ok(())
    }

    fn invalidate_node_edges(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        let touching: Vec<EdgeId> = node
            .ports
            .iter()
            .filter_map(|p| self.ports.get(p))
            .flat_map(|p| p.connections.iter().copied())
            .collect();
        for edge in touching {
            if let Some(edge) = self.edges.get_mut(&edge) {
                edge.geometry.mark_dirty();
            }
        }
    }

    pub fn add_port(&mut self, node: NodeId, spec: PortSpec) -> Result<PortId> {
        if !self.nodes.contains_key(&node) {
            return Err(GraphError::NodeNotFound(node));
        }
        let id = PortId(self.allocate_id());
        self.ports.insert(
            id,
            Port {
                id,
                node,
                direction: spec.direction,
                orientation: spec.orientation,
                capacity: spec.capacity,
                offset: spec.offset,
                name: None,
                connections: BTreeSet::new(),
                cap_visible: false,
            },
        );
        if let Some(n) = self.nodes.get_mut(&node) {
            n.ports.push(id);
        }
        Ok(id)
    }

    pub fn set_port_name(&mut self, id: PortId, name: impl Into<String>) -> Result<()> {
        let port = self.ports.get_mut(&id).ok_or(GraphError::PortNotFound(id))?;
        port.name = Some(name.into());
        Ok(())
    }

    pub fn set_port_offset(&mut self, id: PortId, offset: Vec2) -> Result<()> {
        let port = self.ports.get_mut(&id).ok_or(GraphError::PortNotFound(id))?;
        port.offset = offset;
        let touching: Vec<EdgeId> = port.connections.iter().copied().collect();
        for edge in touching {
            if let Some(edge) = self.edges.get_mut(&edge) {
                edge.geometry.mark_dirty();
            }
        }
        Ok(())
    }

    /// Remove a node, its ports and every edge touching them.
    ///
    /// Returns the deleted edges so the host can record them.
    pub fn remove_node(&mut self, id: NodeId) -> Result<Vec<EdgeId>> {
        let node = self.nodes.remove(&id).ok_or(GraphError::NodeNotFound(id))?;
        let mut removed = Vec::new();
        for port_id in &node.ports {
            let edges: Vec<EdgeId> = self
                .ports
                .get(port_id)
                .map(|p| p.connections.iter().copied().collect())
                .unwrap_or_default();
            for edge in edges {
                if self.delete_edge(edge).is_ok() {
                    removed.push(edge);
                }
            }
        }
        for port_id in &node.ports {
            self.ports.remove(port_id);
        }
        debug!(node = %id, edges = removed.len(), "removed node");
        Ok(removed)
    }

    // === Edges ===

    /// Allocate a fresh, unbound, detached edge.
    pub fn create_edge(&mut self) -> EdgeId {
        let id = EdgeId(self.allocate_id());
        self.edges.insert(id, Edge::new(id));
        id
    }

    pub fn set_edge_shape(&mut self, id: EdgeId, shape: EdgeShape) -> Result<()> {
        let edge = self.edge_mut(id)?;
        if edge.shape != shape {
            edge.shape = shape;
            edge.geometry.mark_render_dirty();
        }
        Ok(())
    }

    pub(crate) fn set_edge_flags(&mut self, id: EdgeId, visible: bool, pickable: bool) -> Result<()> {
        let edge = self.edge_mut(id)?;
        edge.visible = visible;
        edge.pickable = pickable;
        Ok(())
    }

    /// Bind (or unbind with `None`) one end of an edge.
    ///
    /// The edge leaves the previous port's connection set and joins the new
    /// one; both ports refresh their cap visibility.
    pub fn set_endpoint(&mut self, id: EdgeId, end: EdgeEnd, port: Option<PortId>) -> Result<()> {
        if let Some(p) = port {
            self.try_port(p)?;
        }
        let edge = self.edge_mut(id)?;
        let previous = edge.port(end);
        edge.set_port(end, port);
        edge.geometry.mark_dirty();

        if let Some(prev) = previous.filter(|prev| Some(*prev) != port) {
            if let Some(p) = self.ports.get_mut(&prev) {
                p.connections.remove(&id);
            }
            self.update_cap_visibility(prev);
        }
        if let Some(next) = port {
            if let Some(p) = self.ports.get_mut(&next) {
                p.connections.insert(id);
            }
            self.update_cap_visibility(next);
        }
        // Completing an edge lights the end that was bound while it was a candidate.
        let edge = self.try_edge(id)?;
        let other = edge.port(end.other()).filter(|_| port.is_some() && edge.is_real());
        if let Some(other) = other {
            self.update_cap_visibility(other);
        }
        Ok(())
    }

    /// Bind the end matching the port's direction.
    pub fn set_port_by_direction(&mut self, id: EdgeId, port: PortId) -> Result<()> {
        let direction = self.try_port(port)?.direction;
        self.set_endpoint(id, EdgeEnd::for_direction(direction), Some(port))
    }

    /// Drop an edge from the connection set of the port at `end`, keeping the
    /// edge's own reference. Used while an existing edge end is dragged around.
    pub(crate) fn detach_end(&mut self, id: EdgeId, end: EdgeEnd) -> Result<()> {
        let port = self.try_edge(id)?.port(end);
        if let Some(port) = port {
            if let Some(p) = self.ports.get_mut(&port) {
                p.connections.remove(&id);
            }
            self.update_cap_visibility(port);
        }
        Ok(())
    }

    pub fn set_position_override(&mut self, id: EdgeId, end: EdgeEnd, position: Option<Vec2>) -> Result<()> {
        let edge = self.edge_mut(id)?;
        if edge.position_override(end) != position {
            edge.set_override(end, position);
            edge.geometry.mark_dirty();
        }
        Ok(())
    }

    pub(crate) fn clear_position_overrides(&mut self, id: EdgeId) -> Result<()> {
        self.set_position_override(id, EdgeEnd::Output, None)?;
        self.set_position_override(id, EdgeEnd::Input, None)
    }

    /// The end that stays put while the edge is dragged: the one whose
    /// position is *not* overridden.
    pub fn anchored_port(&self, id: EdgeId) -> Option<PortId> {
        let edge = self.edges.get(&id)?;
        if edge.is_input_position_overridden() {
            edge.output
        } else {
            edge.input
        }
    }

    /// Add an edge to the graph's element set.
    pub fn add_element(&mut self, id: EdgeId) -> Result<()> {
        let edge = self.edge_mut(id)?;
        if !edge.attached {
            edge.attached = true;
            edge.geometry.mark_dirty();
        }
        Ok(())
    }

    /// Take an edge out of the element set without destroying it.
    pub fn remove_element(&mut self, id: EdgeId) -> Result<()> {
        self.edge_mut(id)?.attached = false;
        Ok(())
    }

    /// Destroy an edge: unbind both ends, then drop it from the arena.
    pub fn delete_edge(&mut self, id: EdgeId) -> Result<Edge> {
        self.set_endpoint(id, EdgeEnd::Output, None)?;
        self.set_endpoint(id, EdgeEnd::Input, None)?;
        let edge = self.edges.remove(&id).ok_or(GraphError::EdgeNotFound(id))?;
        trace!(edge = %id, "deleted edge");
        Ok(edge)
    }

    /// Perform the structural part of an action, then notify the host.
    ///
    /// `EdgeDelete` takes the edge out of both ports' connection sets and out
    /// of the element set; the record survives so the same edge can be bound
    /// again. `EdgeCreate` (re)binds the edge into its ports' sets and adds it
    /// to the element set as a visible, pickable edge.
    pub fn apply_action<H>(&mut self, action: Action, id: EdgeId, host: &mut H) -> Result<()>
    where
        H: GraphHost + ?Sized,
    {
        let record = self.action_record(action, id)?;
        match action {
            Action::EdgeDelete => {
                self.detach_end(id, EdgeEnd::Output)?;
                self.detach_end(id, EdgeEnd::Input)?;
                self.remove_element(id)?;
            }
            Action::EdgeCreate => {
                let edge = self.try_edge(id)?;
                let (output, input) = (edge.output, edge.input);
                self.set_endpoint(id, EdgeEnd::Output, output)?;
                self.set_endpoint(id, EdgeEnd::Input, input)?;
                self.set_edge_flags(id, true, true)?;
                self.add_element(id)?;
            }
        }
        debug!(?action, edge = %id, "action executed");
        host.on_action_executed(record);
        Ok(())
    }

    /// Snapshot of an edge's ports for host notification.
    pub fn action_record(&self, action: Action, id: EdgeId) -> Result<ActionRecord> {
        let edge = self.try_edge(id)?;
        Ok(ActionRecord {
            action,
            edge: id,
            output: edge.output,
            input: edge.input,
        })
    }

    /// Connect two ports with a new edge, output end first.
    ///
    /// The edge is bound but not yet added to the graph; the caller decides
    /// whether to run [`Action::EdgeCreate`] on it. Callers are expected to
    /// consult [`Graph::can_connect_to`] beforehand.
    pub fn connect_to(&mut self, a: PortId, b: PortId) -> Result<EdgeId> {
        let a_dir = self.try_port(a)?.direction;
        let b_dir = self.try_port(b)?.direction;
        if a_dir == b_dir {
            return Err(GraphError::SameDirection {
                a,
                b,
                direction: a_dir,
            });
        }
        let (output, input) = if a_dir == Direction::Output { (a, b) } else { (b, a) };
        let edge = self.create_edge();
        self.set_endpoint(edge, EdgeEnd::Output, Some(output))?;
        self.set_endpoint(edge, EdgeEnd::Input, Some(input))?;
        Ok(edge)
    }

    /// Refresh a port's cap: lit when it carries a real edge.
    pub fn update_cap_visibility(&mut self, id: PortId) {
        let connected = self.connected(id, true);
        if let Some(port) = self.ports.get_mut(&id) {
            port.cap_visible = connected;
        }
    }

    pub(crate) fn arm_port(&mut self, id: PortId) {
        if let Some(port) = self.ports.get_mut(&id) {
            port.cap_visible = true;
        }
    }

    // === Geometry ===

    /// Resolve the routing anchors of an edge.
    ///
    /// An overridden end uses the pointer position; otherwise the bound
    /// port's position. An unbound end borrows the orientation of the bound
    /// one. Node extents are reported only when both ports and both node
    /// sizes are known.
    pub fn endpoints(&self, id: EdgeId) -> Option<Endpoints> {
        let edge = self.edges.get(&id)?;
        let output = edge.output.and_then(|p| self.ports.get(&p));
        let input = edge.input.and_then(|p| self.ports.get(&p));

        let fallback = output
            .or(input)
            .map(|p| p.orientation)
            .unwrap_or_default();

        let from = edge
            .output_override
            .or_else(|| edge.output.and_then(|p| self.port_position(p)))?;
        let to = edge
            .input_override
            .or_else(|| edge.input.and_then(|p| self.port_position(p)))?;

        let extent = |port: Option<&Port>| {
            port.and_then(|p| self.nodes.get(&p.node)).and_then(Node::rect)
        };

        Some(Endpoints {
            from: Anchor::new(from, output.map_or(fallback, |p| p.orientation)),
            to: Anchor::new(to, input.map_or(fallback, |p| p.orientation)),
            from_extent: extent(output),
            to_extent: extent(input),
        })
    }

    /// Recompute an attached edge's layout and polyline. No-op for detached edges.
    ///
    /// `scale` only feeds the stroke margin when control points are dirty, so
    /// a zoom change alone keeps the old margins. After zooming, call
    /// [`Graph::set_config`] (or move the nodes) so edges are marked dirty.
    pub fn update_edge_layout(&mut self, id: EdgeId, scale: f32) -> Result<()> {
        let edge = self.try_edge(id)?;
        if !edge.attached {
            return Ok(());
        }
        let Some(endpoints) = self.endpoints(id) else {
            warn!(edge = %id, "edge has no resolvable endpoints");
            return Ok(());
        };
        let config = self.config;
        let edge = self.edge_mut(id)?;
        let (draw_from_cap, draw_to_cap) = (edge.output.is_none(), edge.input.is_none());
        let shape = edge.shape;
        edge.geometry
            .update_layout(&endpoints, &config, scale, draw_from_cap, draw_to_cap);
        edge.geometry.update_render_points(&endpoints, shape, &config.routing);
        Ok(())
    }

    /// [`Graph::update_edge_layout`] for every attached edge. The same zoom
    /// caveat applies: clean edges are not re-laid out for a new `scale`.
    pub fn update_layouts(&mut self, scale: f32) {
        let ids: Vec<EdgeId> = self
            .edges
            .values()
            .filter(|e| e.attached)
            .map(|e| e.id)
            .collect();
        for id in ids {
            if let Err(err) = self.update_edge_layout(id, scale) {
                warn!(edge = %id, %err, "layout update failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::RecordedActions;

    /// Two nodes: A (output 3, input 4) at the origin, B (input 6) to the right.
    fn setup_graph() -> (Graph, PortId, PortId, PortId) {
        let mut graph = Graph::new();
        let a = graph.add_node_with_size(Vec2::new(0.0, 0.0), Vec2::new(100.0, 50.0));
        let b = graph.add_node_with_size(Vec2::new(300.0, 0.0), Vec2::new(100.0, 50.0));
        let a_out = graph.add_port(a, PortSpec::output(Vec2::new(100.0, 25.0))).unwrap();
        let a_in = graph.add_port(a, PortSpec::input(Vec2::new(0.0, 25.0))).unwrap();
        let b_in = graph.add_port(b, PortSpec::input(Vec2::new(0.0, 25.0))).unwrap();
        (graph, a_out, a_in, b_in)
    }

    // ========================================================================
    // Nodes and ports
    // ========================================================================

    #[test]
    fn test_port_position_is_node_relative() {
        let (graph, a_out, _, b_in) = setup_graph();
        assert_eq!(graph.port_position(a_out), Some(Vec2::new(100.0, 25.0)));
        assert_eq!(graph.port_position(b_in), Some(Vec2::new(300.0, 25.0)));
    }

    #[test]
    fn test_add_port_to_missing_node() {
        let mut graph = Graph::new();
        let err = graph.add_port(NodeId(42), PortSpec::input(Vec2::ZERO)).unwrap_err();
        assert_eq!(err, GraphError::NodeNotFound(NodeId(42)));
    }

    #[test]
    fn test_node_rect_requires_size() {
        let mut graph = Graph::new();
        let n = graph.add_node(Vec2::new(5.0, 5.0));
        assert!(graph.node(n).unwrap().rect().is_none());
        graph.set_node_size(n, Some(Vec2::new(10.0, 20.0))).unwrap();
        assert_eq!(graph.node(n).unwrap().rect(), Some(Rect::new(5.0, 5.0, 10.0, 20.0)));
    }

    // ========================================================================
    // Binding
    // ========================================================================

    #[test]
    fn test_connect_to_orders_output_first() {
        let (mut graph, a_out, _, b_in) = setup_graph();
        let edge = graph.connect_to(b_in, a_out).unwrap();
        let e = graph.edge(edge).unwrap();
        assert_eq!(e.output(), Some(a_out));
        assert_eq!(e.input(), Some(b_in));
        assert!(e.is_real());
        assert!(!e.is_attached());
        assert!(graph.port(a_out).unwrap().has_connection(edge));
        assert!(graph.port(b_in).unwrap().has_connection(edge));
    }

    #[test]
    fn test_connect_to_same_direction_fails() {
        let (mut graph, _, a_in, b_in) = setup_graph();
        let err = graph.connect_to(a_in, b_in).unwrap_err();
        assert!(matches!(err, GraphError::SameDirection { direction: Direction::Input, .. }));
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_connect_to_missing_port_fails() {
        let (mut graph, a_out, _, _) = setup_graph();
        let err = graph.connect_to(a_out, PortId(999)).unwrap_err();
        assert_eq!(err, GraphError::PortNotFound(PortId(999)));
    }

    #[test]
    fn test_rebinding_moves_connection() {
        let (mut graph, a_out, a_in, b_in) = setup_graph();
        let edge = graph.connect_to(a_out, b_in).unwrap();
        graph.set_endpoint(edge, EdgeEnd::Input, Some(a_in)).unwrap();
        assert!(!graph.port(b_in).unwrap().has_connection(edge));
        assert!(graph.port(a_in).unwrap().has_connection(edge));
    }

    #[test]
    fn test_candidate_edge() {
        let (mut graph, a_out, _, _) = setup_graph();
        let edge = graph.create_edge();
        graph.set_port_by_direction(edge, a_out).unwrap();
        let e = graph.edge(edge).unwrap();
        assert!(e.is_candidate());
        assert!(!e.is_real());
        assert_eq!(e.output(), Some(a_out));
    }

    #[test]
    fn test_cap_visibility_follows_real_connections() {
        let (mut graph, a_out, _, b_in) = setup_graph();
        assert!(!graph.port(a_out).unwrap().cap_visible());
        let edge = graph.connect_to(a_out, b_in).unwrap();
        assert!(graph.port(a_out).unwrap().cap_visible());
        assert!(graph.port(b_in).unwrap().cap_visible());
        graph.delete_edge(edge).unwrap();
        assert!(!graph.port(a_out).unwrap().cap_visible());
        assert!(!graph.port(b_in).unwrap().cap_visible());
    }

    #[test]
    fn test_completing_candidate_lights_both_caps() {
        let (mut graph, a_out, _, b_in) = setup_graph();
        let edge = graph.create_edge();
        graph.set_endpoint(edge, EdgeEnd::Input, Some(b_in)).unwrap();
        assert!(!graph.port(b_in).unwrap().cap_visible());
        graph.set_endpoint(edge, EdgeEnd::Output, Some(a_out)).unwrap();
        assert!(graph.port(a_out).unwrap().cap_visible());
        assert!(graph.port(b_in).unwrap().cap_visible());

        graph.set_endpoint(edge, EdgeEnd::Output, None).unwrap();
        assert!(!graph.port(a_out).unwrap().cap_visible());
        assert!(!graph.port(b_in).unwrap().cap_visible());
    }

    #[test]
    fn test_anchored_port_follows_override() {
        let (mut graph, a_out, _, _) = setup_graph();
        let edge = graph.create_edge();
        graph.set_port_by_direction(edge, a_out).unwrap();
        graph
            .set_position_override(edge, EdgeEnd::Input, Some(Vec2::new(50.0, 50.0)))
            .unwrap();
        assert_eq!(graph.anchored_port(edge), Some(a_out));
    }

    // ========================================================================
    // Actions
    // ========================================================================

    #[test]
    fn test_edge_delete_action_detaches_but_keeps_record() {
        let (mut graph, a_out, _, b_in) = setup_graph();
        let mut host = RecordedActions::default();
        let edge = graph.connect_to(a_out, b_in).unwrap();
        graph.apply_action(Action::EdgeCreate, edge, &mut host).unwrap();
        assert!(graph.edge(edge).unwrap().is_attached());

        graph.apply_action(Action::EdgeDelete, edge, &mut host).unwrap();
        assert!(!graph.port(a_out).unwrap().has_connection(edge));
        assert!(!graph.port(b_in).unwrap().has_connection(edge));
        assert!(!graph.edge(edge).unwrap().is_attached());
        assert_eq!(
            host.actions(),
            vec![(Action::EdgeCreate, edge), (Action::EdgeDelete, edge)]
        );
        let deleted = host.records[1];
        assert_eq!((deleted.output, deleted.input), (Some(a_out), Some(b_in)));
    }

    #[test]
    fn test_remove_node_deletes_touching_edges() {
        let (mut graph, a_out, _, b_in) = setup_graph();
        let edge = graph.connect_to(a_out, b_in).unwrap();
        let b = graph.port(b_in).unwrap().node();
        let removed = graph.remove_node(b).unwrap();
        assert_eq!(removed, vec![edge]);
        assert!(graph.edge(edge).is_none());
        assert!(graph.port(b_in).is_none());
        assert!(!graph.port(a_out).unwrap().has_connection(edge));
    }

    // ========================================================================
    // Geometry invalidation
    // ========================================================================

    #[test]
    fn test_moving_node_invalidates_edges() {
        let (mut graph, a_out, _, b_in) = setup_graph();
        let edge = graph.connect_to(a_out, b_in).unwrap();
        graph.add_element(edge).unwrap();
        graph.update_edge_layout(edge, 1.0).unwrap();
        assert!(!graph.edge(edge).unwrap().geometry().is_control_points_dirty());

        let b = graph.port(b_in).unwrap().node();
        graph.set_node_position(b, Vec2::new(320.0, 10.0)).unwrap();
        assert!(graph.edge(edge).unwrap().geometry().is_control_points_dirty());
    }

    #[test]
    fn test_shape_change_reroutes_edge() {
        let (mut graph, a_out, _, b_in) = setup_graph();
        let edge = graph.connect_to(a_out, b_in).unwrap();
        graph.add_element(edge).unwrap();
        graph.update_edge_layout(edge, 1.0).unwrap();
        let geometry = graph.edge(edge).unwrap().geometry();
        assert_eq!(geometry.render_points().len(), 402);
        assert_eq!(geometry.render_revision(), 1);

        graph.set_edge_shape(edge, EdgeShape::Angular).unwrap();
        assert!(graph.edge(edge).unwrap().geometry().is_render_points_dirty());
        graph.update_edge_layout(edge, 1.0).unwrap();
        let e = graph.edge(edge).unwrap();
        assert_eq!(e.shape(), EdgeShape::Angular);
        assert_eq!(e.geometry().render_points().len(), 4);
        assert_eq!(e.geometry().render_revision(), 2);

        // Same shape again is not a change.
        graph.set_edge_shape(edge, EdgeShape::Angular).unwrap();
        assert!(!graph.edge(edge).unwrap().geometry().is_render_points_dirty());

        graph.set_edge_shape(edge, EdgeShape::Rounded).unwrap();
        graph.update_edge_layout(edge, 1.0).unwrap();
        assert_eq!(graph.edge(edge).unwrap().geometry().render_points().len(), 402);
    }

    #[test]
    fn test_update_layout_skips_detached_edge() {
        let (mut graph, a_out, _, b_in) = setup_graph();
        let edge = graph.connect_to(a_out, b_in).unwrap();
        graph.update_edge_layout(edge, 1.0).unwrap();
        let geometry = graph.edge(edge).unwrap().geometry();
        assert!(geometry.control_points().is_empty());
        assert!(geometry.is_control_points_dirty());
    }

    #[test]
    fn test_endpoints_use_override_and_borrow_orientation() {
        let mut graph = Graph::new();
        let n = graph.add_node(Vec2::ZERO);
        let out = graph
            .add_port(n, PortSpec::output(Vec2::new(10.0, 0.0)).with_orientation(Orientation::Vertical))
            .unwrap();
        let edge = graph.create_edge();
        graph.set_port_by_direction(edge, out).unwrap();
        graph
            .set_position_override(edge, EdgeEnd::Input, Some(Vec2::new(40.0, 80.0)))
            .unwrap();

        let endpoints = graph.endpoints(edge).unwrap();
        assert_eq!(endpoints.from.position, Vec2::new(10.0, 0.0));
        assert_eq!(endpoints.to.position, Vec2::new(40.0, 80.0));
        assert_eq!(endpoints.to.orientation, Orientation::Vertical);
        assert!(endpoints.to_extent.is_none());
    }
}
