//! Synchronisation of routed edges into a Slint model.
//!
//! [`EdgePathSync`] turns each visible, attached edge into one row of path
//! commands plus a stroke width. Path strings are rebuilt only when an
//! edge's polyline changed since the previous update.
//!
//! # Example
//!
//! ```ignore
//! use slint_node_wiring::{EdgePathSync, Graph};
//!
//! let mut sync = EdgePathSync::new();
//! let model = Rc::new(VecModel::<EdgePath>::default());
//! sync.bind_model(model.clone(), |id, path, width| EdgePath { id, path_commands: path, width });
//! window.set_edge_paths(ModelRc::from(model));
//!
//! graph.update_layouts(zoom);
//! sync.update(&graph, zoom);
//! ```

use crate::geometry::Vec2;
use crate::graph::{EdgeId, Graph};
use slint::{Model, ModelRc, SharedString, VecModel};
use std::collections::HashMap;
use std::rc::Rc;
use tracing::trace;

trait ModelSyncer {
    fn sync(&self, paths: &[EdgePathData]);
}

struct ConcreteModelSyncer<P, F> {
    model: Rc<VecModel<P>>,
    constructor: F,
}

impl<P, F> ModelSyncer for ConcreteModelSyncer<P, F>
where
    P: Clone + 'static,
    F: Fn(i32, SharedString, f32) -> P,
{
    fn sync(&self, paths: &[EdgePathData]) {
        for (i, path) in paths.iter().enumerate() {
            let item = (self.constructor)(path.id.0, path.path_commands.clone(), path.stroke_width);
            if i < self.model.row_count() {
                self.model.set_row_data(i, item);
            } else {
                self.model.push(item);
            }
        }
        while self.model.row_count() > paths.len() {
            self.model.remove(self.model.row_count() - 1);
        }
    }
}

/// One rendered edge.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgePathData {
    pub id: EdgeId,
    pub path_commands: SharedString,
    pub stroke_width: f32,
}

#[derive(Debug, Clone)]
struct CachedPath {
    revision: u64,
    origin: Vec2,
    commands: SharedString,
}

/// Keeps a list of edge paths, and optionally a bound Slint model, in step
/// with the graph.
#[derive(Default)]
pub struct EdgePathSync {
    paths: Vec<EdgePathData>,
    cache: HashMap<EdgeId, CachedPath>,
    syncer: Option<Box<dyn ModelSyncer>>,
}

impl EdgePathSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push every future [`EdgePathSync::update`] into `model`, building rows
    /// with `constructor(id, path_commands, stroke_width)`.
    pub fn bind_model<P, F>(&mut self, model: Rc<VecModel<P>>, constructor: F)
    where
        P: Clone + 'static,
        F: Fn(i32, SharedString, f32) -> P + 'static,
    {
        self.syncer = Some(Box::new(ConcreteModelSyncer { model, constructor }));
    }

    pub fn paths(&self) -> &[EdgePathData] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Rebuild the path list from the graph's cached geometry.
    ///
    /// Routing is not triggered here; run [`Graph::update_layouts`] first.
    /// Returns how many path strings had to be regenerated.
    pub fn update(&mut self, graph: &Graph, scale: f32) -> usize {
        let stroke_width = graph.config().edge.effective_stroke_width(scale);
        let mut rebuilt = 0;
        self.paths.clear();

        for edge in graph.edges().filter(|e| e.is_attached() && e.is_visible()) {
            let geometry = edge.geometry();
            let revision = geometry.render_revision();
            let origin = geometry.layout().origin();

            let fresh = self
                .cache
                .get(&edge.id())
                .is_some_and(|c| c.revision == revision && c.origin == origin);
            if !fresh {
                self.cache.insert(
                    edge.id(),
                    CachedPath {
                        revision,
                        origin,
                        commands: geometry.path_commands().into(),
                    },
                );
                rebuilt += 1;
            }
            if let Some(cached) = self.cache.get(&edge.id()) {
                self.paths.push(EdgePathData {
                    id: edge.id(),
                    path_commands: cached.commands.clone(),
                    stroke_width,
                });
            }
        }

        let live: Vec<EdgeId> = self.paths.iter().map(|p| p.id).collect();
        self.cache.retain(|id, _| live.contains(id));

        if let Some(syncer) = &self.syncer {
            syncer.sync(&self.paths);
        }
        trace!(paths = self.paths.len(), rebuilt, "synced edge paths");
        rebuilt
    }

    /// Build a standalone model from the current paths.
    pub fn create_paths_model<P, F>(&self, constructor: F) -> ModelRc<P>
    where
        P: Clone + 'static,
        F: Fn(i32, SharedString, f32) -> P,
    {
        let items: Vec<P> = self
            .paths
            .iter()
            .map(|p| constructor(p.id.0, p.path_commands.clone(), p.stroke_width))
            .collect();
        ModelRc::from(Rc::new(VecModel::from(items)))
    }
}
