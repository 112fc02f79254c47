//! # Slint Node Wiring
//!
//! Port/edge connection engine for Slint node editors: the rules deciding
//! which ports may connect, the drag-to-connect interaction, and routing and
//! hit-testing of the edges in between.
//!
//! ## Features
//!
//! - **Connection rules** - direction, same-node, capacity and duplicate checks
//! - **Drag state machine** - offer, hover, drop and cancel, with edge-end reconnection
//! - **Edge routing** - stubbed control points, reverse routes, rounded corners
//! - **Incremental geometry** - dirty flags so unchanged edges are never re-routed
//! - **Hit testing** - point-on-edge, marquee overlap and port lookup
//! - **Slint glue** - a cloneable controller and a `VecModel` path sync
//!
//! ## Quick Start
//!
//! ```ignore
//! use slint_node_wiring::{Action, Graph, PortSpec, Vec2};
//!
//! let mut graph = Graph::new();
//! let a = graph.add_node(Vec2::new(0.0, 0.0));
//! let b = graph.add_node(Vec2::new(250.0, 40.0));
//! let out = graph.add_port(a, PortSpec::output(Vec2::new(120.0, 30.0)))?;
//! let inp = graph.add_port(b, PortSpec::input(Vec2::new(0.0, 30.0)))?;
//!
//! if graph.can_connect_to(out, inp, true) {
//!     let edge = graph.connect_to(out, inp)?;
//!     graph.apply_action(Action::EdgeCreate, edge, &mut ())?;
//! }
//! graph.update_layouts(1.0);
//! ```
//!
//! ## Modules
//!
//! - [`geometry`] - vector math
//! - [`graph`] - nodes, ports, edges and the owning [`Graph`]
//! - [`validation`] - connection rules
//! - [`routing`] - control points and render polylines
//! - [`hit_test`] - point and rectangle queries
//! - [`interaction`] - the drag-connection state machine
//! - [`controller`] / [`links`] - Slint integration

pub mod config;
pub mod controller;
pub mod error;
pub mod geometry;
pub mod graph;
pub mod host;
pub mod interaction;
pub mod links;
pub mod routing;
pub mod validation;

pub use config::{DragConfig, EdgeAppearance, EngineConfig, RoutingConfig};
pub use controller::EditorController;
pub use error::{ConfigError, GraphError, Result};
pub use geometry::{Rect, Vec2};
pub use graph::{
    Capacity, Direction, Edge, EdgeEnd, EdgeId, EdgeShape, Graph, Node, NodeId, Orientation, Port,
    PortId, PortSpec,
};
pub use hit_test::{contains_point, find_port_at, overlaps};
pub use host::{
    Action, ActionRecord, DragOffer, DragTarget, EdgeGrip, EventReply, GraphHost, Modifiers,
    RecordedActions,
};
pub use interaction::{ConnectionDrag, DragState, DropOutcome, DropReport, OfferOutcome};
pub use links::{EdgePathData, EdgePathSync};
pub use routing::{Anchor, EdgeCaps, EdgeGeometry, Endpoints, Routable};
pub use validation::{ValidationError, ValidationResult};
