//! Common test utilities for integration tests.

#![allow(dead_code)]

pub mod harness;

use slint_node_wiring::{Action, ActionRecord, DragOffer, DragTarget, EdgeId, Graph, GraphHost};
use std::cell::RefCell;
use std::rc::Rc;

/// Records every host notification.
///
/// Fields are shared `Rc`s, so a clone kept by the test observes what the
/// engine reports to the clone it owns.
#[derive(Clone)]
pub struct RecordingHost {
    /// Full records in notification order
    pub records: Rc<RefCell<Vec<ActionRecord>>>,
    /// Graph read back from inside each notification, when set
    pub graph: Rc<RefCell<Option<Rc<RefCell<Graph>>>>>,
    /// Whether the notified edge was in the graph at notification time
    pub present: Rc<RefCell<Vec<(EdgeId, bool)>>>,
    /// Offers handed over as view drags
    pub view_drags: Rc<RefCell<Vec<DragTarget>>>,
    /// When true every offer counts as a view drag
    pub force_view_drag: Rc<RefCell<bool>>,
    pub scale: Rc<RefCell<f32>>,
}

impl Default for RecordingHost {
    fn default() -> Self {
        Self {
            records: Rc::default(),
            graph: Rc::default(),
            present: Rc::default(),
            view_drags: Rc::default(),
            force_view_drag: Rc::default(),
            scale: Rc::new(RefCell::new(1.0)),
        }
    }
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&self) {
        self.records.borrow_mut().clear();
        self.present.borrow_mut().clear();
        self.view_drags.borrow_mut().clear();
    }

    /// (action, edge) in notification order
    pub fn actions(&self) -> Vec<(Action, EdgeId)> {
        self.records.borrow().iter().map(|r| (r.action, r.edge)).collect()
    }

    pub fn records(&self) -> Vec<ActionRecord> {
        self.records.borrow().clone()
    }

    pub fn present(&self) -> Vec<(EdgeId, bool)> {
        self.present.borrow().clone()
    }

    pub fn count(&self, action: Action) -> usize {
        self.records.borrow().iter().filter(|r| r.action == action).count()
    }
}

impl GraphHost for RecordingHost {
    fn on_action_executed(&mut self, record: ActionRecord) {
        if let Some(graph) = self.graph.borrow().as_ref() {
            let present = graph.borrow().edge(record.edge).is_some();
            self.present.borrow_mut().push((record.edge, present));
        }
        self.records.borrow_mut().push(record);
    }

    fn is_view_drag(&self, _offer: &DragOffer) -> bool {
        *self.force_view_drag.borrow()
    }

    fn begin_view_drag(&mut self, offer: &DragOffer) {
        self.view_drags.borrow_mut().push(offer.target.clone());
    }

    fn current_scale(&self) -> f32 {
        *self.scale.borrow()
    }
}

/// Install a test-writer subscriber once; `RUST_LOG` selects the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
