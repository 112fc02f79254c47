//! Edge routing: control points between two anchors, then a polyline with
//! rounded corners.
//!
//! Each edge caches its geometry in an [`EdgeGeometry`]. Control points live
//! in graph (parent) space; render points live in the edge's local space,
//! whose origin is the top-left of the edge's layout rectangle. Two dirty
//! flags keep the work incremental:
//!
//! - `control_points_dirty` is raised by anything that moves an endpoint and
//!   cleared by [`EdgeGeometry::update_layout`].
//! - `render_points_dirty` is raised only when a control point or the layout
//!   rectangle actually changes value.

use crate::config::{EngineConfig, RoutingConfig};
use crate::geometry::{angle_between, approximately, clamp_lenient, distance, quadratic_bezier, Rect, Vec2};
use crate::graph::{EdgeShape, Orientation};
use std::fmt::Write as _;
use tracing::trace;

/// A routing endpoint: where the edge attaches and which way it leaves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub position: Vec2,
    pub orientation: Orientation,
}

impl Anchor {
    pub fn new(position: Vec2, orientation: Orientation) -> Self {
        Self { position, orientation }
    }

    pub fn horizontal(x: f32, y: f32) -> Self {
        Self::new(Vec2::new(x, y), Orientation::Horizontal)
    }

    pub fn vertical(x: f32, y: f32) -> Self {
        Self::new(Vec2::new(x, y), Orientation::Vertical)
    }

    /// Push the anchor along its orientation axis.
    fn pushed(&self, amount: f32) -> Vec2 {
        match self.orientation {
            Orientation::Horizontal => Vec2::new(self.position.x + amount, self.position.y),
            Orientation::Vertical => Vec2::new(self.position.x, self.position.y + amount),
        }
    }
}

/// Anything the router can draw an edge between.
pub trait Routable {
    /// Output side.
    fn from_anchor(&self) -> Anchor;
    /// Input side.
    fn to_anchor(&self) -> Anchor;
    /// Extents of the nodes owning the from/to ports, when known.
    fn extents(&self) -> Option<(Rect, Rect)> {
        None
    }
}

/// Anchors of an edge resolved against the graph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Endpoints {
    pub from: Anchor,
    pub to: Anchor,
    pub from_extent: Option<Rect>,
    pub to_extent: Option<Rect>,
}

impl Routable for Endpoints {
    fn from_anchor(&self) -> Anchor {
        self.from
    }

    fn to_anchor(&self) -> Anchor {
        self.to
    }

    fn extents(&self) -> Option<(Rect, Rect)> {
        self.from_extent.zip(self.to_extent)
    }
}

impl Routable for (Anchor, Anchor) {
    fn from_anchor(&self) -> Anchor {
        self.0
    }

    fn to_anchor(&self) -> Anchor {
        self.1
    }
}

/// Stub length: shrinks linearly to zero as the anchors approach each other.
pub fn stub_offset(from: Vec2, to: Vec2, config: &RoutingConfig) -> f32 {
    let ratio = if config.full_offset_distance > 0.0 {
        (distance(from, to) / config.full_offset_distance).clamp(0.0, 1.0)
    } else {
        1.0
    };
    (config.length_from_port + config.turn_diameter) * ratio
}

/// Whether the route has to double back: the stubbed-out `from` lies past
/// the stubbed-out `to` along x.
pub fn is_reverse(from: Anchor, to: Anchor, offset: f32) -> bool {
    let from_x = match from.orientation {
        Orientation::Horizontal => from.position.x + offset,
        Orientation::Vertical => from.position.x,
    };
    let to_x = match to.orientation {
        Orientation::Horizontal => to.position.x - offset,
        Orientation::Vertical => to.position.x,
    };
    from_x > to_x
}

/// Y of the two extra points of a reverse route.
pub fn reverse_middle_y(from: Anchor, to: Anchor, extents: Option<(Rect, Rect)>, config: &RoutingConfig) -> f32 {
    let Some((from_rect, to_rect)) = extents else {
        return (from.position.y + to.position.y) / 2.0;
    };
    let (higher, lower) = if to.position.y < from.position.y {
        (to_rect, from_rect)
    } else {
        (from_rect, to_rect)
    };
    let middle = (higher.y + higher.height + lower.y) / 2.0;
    clamp_lenient(
        middle,
        higher.y + config.reverse_top_margin,
        lower.y + config.reverse_bottom_margin,
    )
}

/// Sample a rounded corner at `corner` between `p1` and `p2`.
///
/// Sharper turns get a smaller radius; short adjoining segments cap it
/// further so arcs never overshoot.
pub fn rounded_corner_points(p1: Vec2, corner: Vec2, p2: Vec2, turn_diameter: f32) -> Vec<Vec2> {
    let direction1 = (p1 - corner).normalized();
    let direction2 = (p2 - corner).normalized();
    let angle = angle_between(direction1, direction2);
    let adjusted_diameter = turn_diameter * (angle.to_radians() / 2.0).sin();

    let distance1 = (distance(p1, corner) / 10.0).powi(2) * 1.9;
    let distance2 = (distance(p2, corner) / 10.0).powi(2) * 1.9;

    let start = corner + direction1 * adjusted_diameter.min(distance1);
    let end = corner + direction2 * adjusted_diameter.min(distance2);

    let count = (adjusted_diameter * 10.0).round().max(0.0) as usize;
    let last = count.saturating_sub(1).max(1) as f32;
    (0..count)
        .map(|i| quadratic_bezier(start, corner, end, i as f32 / last))
        .collect()
}

/// Cap decorations drawn at unbound ends.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EdgeCaps {
    pub from: Option<Rect>,
    pub to: Option<Rect>,
}

/// Cached routing state of one edge.
#[derive(Debug, Clone)]
pub struct EdgeGeometry {
    control_points: Vec<Vec2>,
    render_points: Vec<Vec2>,
    last_local_control_points: Vec<Vec2>,
    last_shape: Option<EdgeShape>,
    control_points_dirty: bool,
    render_points_dirty: bool,
    layout: Rect,
    caps: EdgeCaps,
    needs_repaint: bool,
    render_revision: u64,
}

impl Default for EdgeGeometry {
    fn default() -> Self {
        Self {
            control_points: Vec::new(),
            render_points: Vec::new(),
            last_local_control_points: Vec::new(),
            last_shape: None,
            control_points_dirty: true,
            render_points_dirty: true,
            layout: Rect::default(),
            caps: EdgeCaps::default(),
            needs_repaint: false,
            render_revision: 0,
        }
    }
}

impl EdgeGeometry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Control points in graph space.
    pub fn control_points(&self) -> &[Vec2] {
        &self.control_points
    }

    /// Render points in local space (relative to [`EdgeGeometry::layout`]'s origin).
    pub fn render_points(&self) -> &[Vec2] {
        &self.render_points
    }

    /// Render points in graph space.
    pub fn render_points_global(&self) -> impl Iterator<Item = Vec2> + '_ {
        let origin = self.layout.origin();
        self.render_points.iter().map(move |p| *p + origin)
    }

    pub fn layout(&self) -> Rect {
        self.layout
    }

    pub fn caps(&self) -> EdgeCaps {
        self.caps
    }

    pub fn is_control_points_dirty(&self) -> bool {
        self.control_points_dirty
    }

    pub fn is_render_points_dirty(&self) -> bool {
        self.render_points_dirty
    }

    pub fn needs_repaint(&self) -> bool {
        self.needs_repaint
    }

    /// Bumped every time the render points are rebuilt.
    pub fn render_revision(&self) -> u64 {
        self.render_revision
    }

    /// First control point.
    pub fn from(&self) -> Option<Vec2> {
        self.control_points.first().copied()
    }

    /// Last control point.
    pub fn to(&self) -> Option<Vec2> {
        self.control_points.last().copied()
    }

    pub fn mark_dirty(&mut self) {
        self.control_points_dirty = true;
    }

    pub fn mark_render_dirty(&mut self) {
        self.render_points_dirty = true;
    }

    /// Recompute control points and layout if an endpoint moved; always
    /// refresh the caps and request a repaint.
    pub fn update_layout<R: Routable + ?Sized>(
        &mut self,
        route: &R,
        config: &EngineConfig,
        scale: f32,
        draw_from_cap: bool,
        draw_to_cap: bool,
    ) {
        if self.control_points_dirty {
            self.compute_control_points(route, &config.routing);
            self.compute_layout(config.edge.edge_width, scale);
            self.control_points_dirty = false;
        }
        self.update_caps(config.edge.cap_radius, draw_from_cap, draw_to_cap);
        self.needs_repaint = true;
    }

    fn update_caps(&mut self, radius: f32, draw_from_cap: bool, draw_to_cap: bool) {
        let cap = |center: Option<Vec2>, draw: bool| {
            center
                .filter(|_| draw)
                .map(|c| Rect::new(c.x - radius, c.y - radius, radius * 2.0, radius * 2.0))
        };
        self.caps = EdgeCaps {
            from: cap(self.from(), draw_from_cap),
            to: cap(self.to(), draw_to_cap),
        };
    }

    fn assign_control_point(&mut self, index: usize, point: Vec2) {
        let current = &mut self.control_points[index];
        if !approximately(current.x, point.x) || !approximately(current.y, point.y) {
            *current = point;
            self.render_points_dirty = true;
        }
    }

    /// Place 4 control points, or 6 when the route doubles back. Skipped
    /// while the control points are clean.
    pub fn compute_control_points<R: Routable + ?Sized>(&mut self, route: &R, config: &RoutingConfig) {
        if !self.control_points_dirty {
            return;
        }
        let from = route.from_anchor();
        let to = route.to_anchor();
        let offset = stub_offset(from.position, to.position, config);
        let reverse = is_reverse(from, to, offset);
        let count = if reverse { 6 } else { 4 };

        if self.control_points.len() != count {
            self.control_points = vec![Vec2::ZERO; count];
            self.render_points_dirty = true;
        }

        let from_stub = from.pushed(offset);
        let to_stub = to.pushed(-offset);
        self.assign_control_point(0, from.position);
        self.assign_control_point(1, from_stub);
        if reverse {
            let middle_y = reverse_middle_y(from, to, route.extents(), config);
            self.assign_control_point(2, Vec2::new(from_stub.x, middle_y));
            self.assign_control_point(3, Vec2::new(to_stub.x, middle_y));
        }
        self.assign_control_point(count - 2, to_stub);
        self.assign_control_point(count - 1, to.position);

        trace!(offset, reverse, points = count, "computed control points");
    }

    /// Bounding box of the control points plus a stroke margin. Changing it
    /// invalidates the render points, which are stored relative to it.
    pub fn compute_layout(&mut self, edge_width: f32, scale: f32) {
        let Some((first, rest)) = self.control_points.split_first() else {
            return;
        };
        let mut rect = Rect::new(first.x, first.y, 0.0, 0.0);
        for p in rest {
            rect.include(*p);
        }
        let scale = if scale > 0.0 { scale } else { 1.0 };
        let rect = rect.inflate(edge_width / scale);

        if rect != self.layout {
            self.layout = rect;
            self.render_points_dirty = true;
        }
    }

    /// Rebuild the polyline in local space when something changed.
    pub fn update_render_points<R: Routable + ?Sized>(&mut self, route: &R, shape: EdgeShape, config: &RoutingConfig) {
        self.compute_control_points(route, config);

        if !self.render_points_dirty && !self.control_points.is_empty() {
            return;
        }
        self.render_points_dirty = false;

        let origin = self.layout.origin();
        let local: Vec<Vec2> = self.control_points.iter().map(|p| *p - origin).collect();
        if local == self.last_local_control_points
            && self.last_shape == Some(shape)
            && !self.render_points.is_empty()
        {
            return;
        }

        self.render_points = match shape {
            EdgeShape::Angular => local.clone(),
            EdgeShape::Rounded => expand_corners(&local, config.turn_diameter),
        };
        self.last_local_control_points = local;
        self.last_shape = Some(shape);
        self.render_revision += 1;
        self.needs_repaint = false;

        trace!(points = self.render_points.len(), revision = self.render_revision, "rebuilt render points");
    }

    /// SVG-style path commands in graph space, for a Slint `Path`.
    pub fn path_commands(&self) -> String {
        let mut out = String::new();
        for (i, p) in self.render_points_global().enumerate() {
            let command = if i == 0 { "M" } else { " L" };
            let _ = write!(out, "{} {} {}", command, p.x, p.y);
        }
        out
    }
}

fn expand_corners(points: &[Vec2], turn_diameter: f32) -> Vec<Vec2> {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return Vec::new();
    };
    let mut out = vec![*first];
    for triple in points.windows(3) {
        out.extend(rounded_corner_points(triple[0], triple[1], triple[2], turn_diameter));
    }
    if points.len() > 1 {
        out.push(*last);
    }
    out
}
