//! Interactive zone authoring.
//!
//! Pointer input arrives in display space. Everything written to the
//! registry is converted to natural space and validated there first;
//! display-space geometry only ever lives in the editor's own state and is
//! exposed read-only through [`ZoneEditor::preview`].
//!
//! ```text
//! Idle -> DrawingRectangle -> Complete -> Idle
//!      -> DrawingPolygon   -> Complete -> Idle
//!                          -> (cancel) -> Idle
//!      -> Editing(zone)    -> Idle
//! ```

use crate::config::EditorConfig;
use crate::error::{EditorError, GeometryError, ZoneError};
use crate::geometry::{
    nearest_edge_index, nearest_point_index, validate_polygon, validate_rectangle,
    CoordinateTransform, DisplayPoint, DisplaySpace, NaturalPoint, Shape,
};
use crate::zone::{validate_zone_name, Zone, ZoneId, ZoneRegistry, ZoneShape, ZoneSpec};

mod history;

pub use history::EditHistory;

/// Metadata for a zone that is about to be drawn.
#[derive(Clone, Debug, PartialEq)]
pub struct ZoneDraft {
    pub name: String,
    pub ingredient_category: String,
    pub requires_scooper: bool,
}

impl ZoneDraft {
    pub fn new(name: &str, ingredient_category: &str) -> Self {
        Self {
            name: name.to_string(),
            ingredient_category: ingredient_category.to_string(),
            requires_scooper: true,
        }
    }

    pub fn with_scooper_required(mut self, required: bool) -> Self {
        self.requires_scooper = required;
        self
    }

    fn into_spec(self, shape: ZoneShape) -> ZoneSpec {
        ZoneSpec::new(&self.name, shape, &self.ingredient_category)
            .with_scooper_required(self.requires_scooper)
    }
}

/// Externally visible editor state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditorMode {
    Idle,
    DrawingRectangle,
    DrawingPolygon,
    Editing(ZoneId),
    Complete(ZoneId),
}

/// What an accepted action did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditOutcome {
    /// Nothing to do in the current state.
    Ignored,
    CornerPlaced,
    PreviewUpdated,
    PointAdded { index: usize },
    PointSelected { index: usize },
    PointDragged { index: usize },
    PointMoved { index: usize },
    PointInserted { index: usize },
    PointDeleted { index: usize },
    Deselected,
    ZoneSelected(ZoneId),
    ZoneCreated(ZoneId),
    ZoneDeleted(ZoneId),
    Cancelled,
    Undone,
    Redone,
}

#[derive(Clone, Copy, Debug)]
struct Drag {
    index: usize,
    origin: DisplayPoint,
    pointer_start: DisplayPoint,
}

#[derive(Clone, Debug)]
enum EditorState {
    Idle,
    DrawingRectangle {
        draft: ZoneDraft,
        first: Option<DisplayPoint>,
        preview: Option<DisplayPoint>,
    },
    DrawingPolygon {
        draft: ZoneDraft,
        points: Vec<DisplayPoint>,
        preview: Option<DisplayPoint>,
    },
    Editing {
        zone_id: ZoneId,
        points: Vec<DisplayPoint>,
        selected: Option<usize>,
        drag: Option<Drag>,
    },
    Complete(ZoneId),
}

impl EditorState {
    fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::DrawingRectangle { .. } => "drawing a rectangle",
            Self::DrawingPolygon { .. } => "drawing a polygon",
            Self::Editing { .. } => "editing a zone",
            Self::Complete(_) => "complete",
        }
    }

    fn is_drawing(&self) -> bool {
        matches!(
            self,
            Self::DrawingRectangle { .. } | Self::DrawingPolygon { .. }
        )
    }
}

/// Reversible registry mutation.
#[derive(Clone, Debug)]
enum EditCommand {
    CreateZone(Zone),
    DeleteZone(Zone),
    Reshape {
        zone_id: ZoneId,
        before: Vec<NaturalPoint>,
        after: Vec<NaturalPoint>,
    },
}

impl EditCommand {
    fn revert(&self, registry: &mut ZoneRegistry) -> Result<(), ZoneError> {
        match self {
            Self::CreateZone(zone) => registry.delete(zone.id).map(|_| ()),
            Self::DeleteZone(zone) => registry.restore(zone.clone()),
            Self::Reshape {
                zone_id, before, ..
            } => registry
                .update_shape(*zone_id, Shape::Polygon(before.clone()))
                .map(|_| ()),
        }
    }

    fn reapply(&self, registry: &mut ZoneRegistry) -> Result<(), ZoneError> {
        match self {
            Self::CreateZone(zone) => registry.restore(zone.clone()),
            Self::DeleteZone(zone) => registry.delete(zone.id).map(|_| ()),
            Self::Reshape { zone_id, after, .. } => registry
                .update_shape(*zone_id, Shape::Polygon(after.clone()))
                .map(|_| ()),
        }
    }
}

/// Point list of an in-progress polygon before and after one click.
#[derive(Clone, Debug)]
struct DraftEdit {
    before: Vec<DisplayPoint>,
    after: Vec<DisplayPoint>,
}

pub struct ZoneEditor {
    transform: CoordinateTransform,
    config: EditorConfig,
    state: EditorState,
    history: EditHistory<EditCommand>,
    draft_history: EditHistory<DraftEdit>,
}

impl ZoneEditor {
    pub fn new(transform: CoordinateTransform, config: EditorConfig) -> Self {
        Self {
            transform,
            history: EditHistory::new(config.history_capacity),
            draft_history: EditHistory::new(config.history_capacity),
            config,
            state: EditorState::Idle,
        }
    }

    pub fn transform(&self) -> &CoordinateTransform {
        &self.transform
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn mode(&self) -> EditorMode {
        match &self.state {
            EditorState::Idle => EditorMode::Idle,
            EditorState::DrawingRectangle { .. } => EditorMode::DrawingRectangle,
            EditorState::DrawingPolygon { .. } => EditorMode::DrawingPolygon,
            EditorState::Editing { zone_id, .. } => EditorMode::Editing(*zone_id),
            EditorState::Complete(id) => EditorMode::Complete(*id),
        }
    }

    pub fn can_undo(&self) -> bool {
        match self.state {
            EditorState::DrawingPolygon { .. } => self.draft_history.can_undo(),
            EditorState::DrawingRectangle { .. } => false,
            _ => self.history.can_undo(),
        }
    }

    pub fn can_redo(&self) -> bool {
        match self.state {
            EditorState::DrawingPolygon { .. } => self.draft_history.can_redo(),
            EditorState::DrawingRectangle { .. } => false,
            _ => self.history.can_redo(),
        }
    }

    /// Index of the selected vertex while editing.
    pub fn selected_point(&self) -> Option<usize> {
        match &self.state {
            EditorState::Editing { selected, .. } => *selected,
            _ => None,
        }
    }

    /// In-progress display-space geometry for rendering. Never persisted.
    pub fn preview(&self) -> Option<Shape<DisplaySpace>> {
        match &self.state {
            EditorState::DrawingRectangle {
                first: Some(first),
                preview: Some(preview),
                ..
            } => Some(Shape::Rectangle {
                p1: *first,
                p2: *preview,
            }),
            EditorState::DrawingPolygon {
                points, preview, ..
            } if !points.is_empty() => {
                let mut outline = points.clone();
                outline.extend(*preview);
                Some(Shape::Polygon(outline))
            }
            EditorState::Editing { points, .. } => Some(Shape::Polygon(points.clone())),
            _ => None,
        }
    }

    fn invalid(&self, action: &'static str) -> EditorError {
        EditorError::InvalidState {
            action,
            state: self.state.name(),
        }
    }

    fn place(&self, point: DisplayPoint) -> DisplayPoint {
        match self.config.grid_snap_px {
            Some(grid) => point.snapped(grid),
            None => point,
        }
    }

    // -------------------- Drawing --------------------

    fn check_can_begin(&self, draft: &ZoneDraft, action: &'static str) -> Result<(), EditorError> {
        if self.state.is_drawing() {
            return Err(self.invalid(action));
        }
        validate_zone_name(&draft.name)?;
        Ok(())
    }

    pub fn begin_rectangle(&mut self, draft: ZoneDraft) -> Result<(), EditorError> {
        self.check_can_begin(&draft, "draw a rectangle")?;
        self.state = EditorState::DrawingRectangle {
            draft,
            first: None,
            preview: None,
        };
        Ok(())
    }

    pub fn begin_polygon(&mut self, draft: ZoneDraft) -> Result<(), EditorError> {
        self.check_can_begin(&draft, "draw a polygon")?;
        self.draft_history.clear();
        self.state = EditorState::DrawingPolygon {
            draft,
            points: Vec::new(),
            preview: None,
        };
        Ok(())
    }

    /// Points of the polygon being drawn, in display space.
    pub fn draft_points(&self) -> &[DisplayPoint] {
        match &self.state {
            EditorState::DrawingPolygon { points, .. } => points,
            _ => &[],
        }
    }

    /// Validate the in-progress polygon in natural space and write it to the
    /// registry.
    pub fn complete_polygon(
        &mut self,
        registry: &mut ZoneRegistry,
    ) -> Result<EditOutcome, EditorError> {
        let (draft, points) = match &self.state {
            EditorState::DrawingPolygon { draft, points, .. } => (draft.clone(), points.clone()),
            _ => return Err(self.invalid("complete a polygon")),
        };
        if points.len() < 3 {
            return Err(GeometryError::TooFewPoints {
                count: points.len(),
            }
            .into());
        }
        let natural = self.transform.points_to_natural(&points);
        validate_polygon(&natural, self.config.min_point_separation)?;
        let id = self.create_zone(draft, Shape::Polygon(natural), registry)?;
        Ok(EditOutcome::ZoneCreated(id))
    }

    /// Discard the in-progress drawing without touching the registry.
    pub fn cancel_polygon_drawing(&mut self) -> Result<EditOutcome, EditorError> {
        if !self.state.is_drawing() {
            return Err(self.invalid("cancel drawing"));
        }
        self.draft_history.clear();
        self.state = EditorState::Idle;
        log::debug!("zone drawing cancelled");
        Ok(EditOutcome::Cancelled)
    }

    fn commit_rectangle(
        &mut self,
        first: DisplayPoint,
        second: DisplayPoint,
        registry: &mut ZoneRegistry,
    ) -> Result<EditOutcome, EditorError> {
        let draft = match &self.state {
            EditorState::DrawingRectangle { draft, .. } => draft.clone(),
            _ => return Err(self.invalid("complete a rectangle")),
        };
        let p1 = self.transform.to_natural(first);
        let p2 = self.transform.to_natural(second);
        validate_rectangle(p1, p2)?;
        let id = self.create_zone(draft, Shape::Rectangle { p1, p2 }, registry)?;
        Ok(EditOutcome::ZoneCreated(id))
    }

    fn create_zone(
        &mut self,
        draft: ZoneDraft,
        shape: ZoneShape,
        registry: &mut ZoneRegistry,
    ) -> Result<ZoneId, EditorError> {
        let id = registry.create(draft.into_spec(shape))?;
        if let Some(zone) = registry.get(id) {
            self.history.push(EditCommand::CreateZone(zone.clone()));
        }
        self.draft_history.clear();
        self.state = EditorState::Complete(id);
        Ok(id)
    }

    /// Return a completed or editing editor to idle.
    pub fn finish(&mut self) -> Result<(), EditorError> {
        if self.state.is_drawing() {
            return Err(self.invalid("finish"));
        }
        self.state = EditorState::Idle;
        Ok(())
    }

    // -------------------- Pointer input --------------------

    pub fn pointer_down(
        &mut self,
        pointer: DisplayPoint,
        registry: &mut ZoneRegistry,
    ) -> Result<EditOutcome, EditorError> {
        let placed = self.place(pointer);
        let close_radius = self.config.close_radius;
        let select_radius = self.config.select_radius;
        let edge_radius = self.config.edge_radius;

        match &mut self.state {
            EditorState::DrawingRectangle { first, preview, .. } => match *first {
                None => {
                    *first = Some(placed);
                    *preview = Some(placed);
                    Ok(EditOutcome::CornerPlaced)
                }
                Some(corner) => self.commit_rectangle(corner, placed, registry),
            },
            EditorState::DrawingPolygon { points, preview, .. } => {
                let closes = points.len() >= 3 && points[0].distance_to(pointer) <= close_radius;
                if closes {
                    return self.complete_polygon(registry);
                }
                let before = points.clone();
                points.push(placed);
                *preview = None;
                let index = points.len() - 1;
                let after = points.clone();
                self.draft_history.push(DraftEdit { before, after });
                Ok(EditOutcome::PointAdded { index })
            }
            EditorState::Editing {
                zone_id,
                points,
                selected,
                drag,
            } => {
                if let Some(index) = nearest_point_index(pointer, points, select_radius) {
                    *selected = Some(index);
                    *drag = Some(Drag {
                        index,
                        origin: points[index],
                        pointer_start: pointer,
                    });
                    return Ok(EditOutcome::PointSelected { index });
                }
                if let Some(edge) = nearest_edge_index(pointer, points, edge_radius) {
                    let index = edge + 1;
                    let zone_id = *zone_id;
                    let mut candidate = points.clone();
                    candidate.insert(index, placed);
                    self.commit_reshape(zone_id, candidate, Some(index), registry)?;
                    return Ok(EditOutcome::PointInserted { index });
                }
                *selected = None;
                *drag = None;
                Ok(EditOutcome::Deselected)
            }
            EditorState::Idle | EditorState::Complete(_) => Ok(EditOutcome::Ignored),
        }
    }

    pub fn pointer_move(&mut self, pointer: DisplayPoint) -> EditOutcome {
        let placed = self.place(pointer);
        match &mut self.state {
            EditorState::DrawingRectangle {
                first: Some(_),
                preview,
                ..
            } => {
                *preview = Some(placed);
                EditOutcome::PreviewUpdated
            }
            EditorState::DrawingPolygon { preview, .. } => {
                *preview = Some(placed);
                EditOutcome::PreviewUpdated
            }
            EditorState::Editing {
                points,
                drag: Some(drag),
                ..
            } => {
                // Drags follow the pointer delta exactly; no snapping.
                points[drag.index] = drag.origin.translated(
                    pointer.x - drag.pointer_start.x,
                    pointer.y - drag.pointer_start.y,
                );
                EditOutcome::PointDragged { index: drag.index }
            }
            _ => EditOutcome::Ignored,
        }
    }

    pub fn pointer_up(
        &mut self,
        pointer: DisplayPoint,
        registry: &mut ZoneRegistry,
    ) -> Result<EditOutcome, EditorError> {
        let placed = self.place(pointer);
        match &mut self.state {
            EditorState::DrawingRectangle {
                first: Some(first), ..
            } => {
                // Releasing where the first corner went down is just the end
                // of that click; a drag-release commits the rectangle.
                let first = *first;
                let p1 = self.transform.to_natural(first);
                let p2 = self.transform.to_natural(placed);
                if validate_rectangle(p1, p2).is_err() {
                    return Ok(EditOutcome::Ignored);
                }
                self.commit_rectangle(first, placed, registry)
            }
            EditorState::Editing {
                zone_id,
                points,
                selected,
                drag,
            } => {
                let Some(active) = drag.take() else {
                    return Ok(EditOutcome::Ignored);
                };
                let target = active.origin.translated(
                    pointer.x - active.pointer_start.x,
                    pointer.y - active.pointer_start.y,
                );
                if target == active.origin {
                    points[active.index] = active.origin;
                    return Ok(EditOutcome::PointSelected {
                        index: active.index,
                    });
                }
                let zone_id = *zone_id;
                let keep_selected = *selected;
                let mut candidate = points.clone();
                candidate[active.index] = target;
                match self.commit_reshape(zone_id, candidate, keep_selected, registry) {
                    Ok(()) => Ok(EditOutcome::PointMoved {
                        index: active.index,
                    }),
                    Err(err) => {
                        if let EditorState::Editing { points, .. } = &mut self.state {
                            points[active.index] = active.origin;
                        }
                        log::debug!("drag of point {} rejected: {}", active.index, err);
                        Err(err)
                    }
                }
            }
            _ => Ok(EditOutcome::Ignored),
        }
    }

    // -------------------- Editing --------------------

    /// Enter point editing for a saved polygon zone.
    pub fn select_zone(
        &mut self,
        zone_id: ZoneId,
        registry: &ZoneRegistry,
    ) -> Result<EditOutcome, EditorError> {
        if self.state.is_drawing() {
            return Err(self.invalid("select a zone"));
        }
        let zone = registry.get(zone_id).ok_or(ZoneError::UnknownZone(zone_id))?;
        let Shape::Polygon(vertices) = &zone.shape else {
            return Err(EditorError::NotEditable(zone_id));
        };
        self.state = EditorState::Editing {
            zone_id,
            points: self.transform.points_to_display(vertices),
            selected: None,
            drag: None,
        };
        Ok(EditOutcome::ZoneSelected(zone_id))
    }

    pub fn delete_selected_point(
        &mut self,
        registry: &mut ZoneRegistry,
    ) -> Result<EditOutcome, EditorError> {
        let (zone_id, mut candidate, index) = match &self.state {
            EditorState::Editing {
                zone_id,
                points,
                selected,
                ..
            } => match selected {
                Some(index) => (*zone_id, points.clone(), *index),
                None => return Err(EditorError::NothingSelected),
            },
            _ => return Err(self.invalid("delete a point")),
        };
        if candidate.len() <= 3 {
            return Err(EditorError::MinimumPoints);
        }
        candidate.remove(index);
        self.commit_reshape(zone_id, candidate, None, registry)?;
        Ok(EditOutcome::PointDeleted { index })
    }

    /// Delete a saved zone through the editor so the deletion can be undone.
    pub fn delete_zone(
        &mut self,
        zone_id: ZoneId,
        registry: &mut ZoneRegistry,
    ) -> Result<EditOutcome, EditorError> {
        if self.state.is_drawing() {
            return Err(self.invalid("delete a zone"));
        }
        let zone = registry.delete(zone_id)?;
        self.history.push(EditCommand::DeleteZone(zone));
        self.resync(registry);
        Ok(EditOutcome::ZoneDeleted(zone_id))
    }

    /// Validate `candidate` in natural space and write it through. On
    /// success the editor shows `candidate`; on failure nothing changes.
    fn commit_reshape(
        &mut self,
        zone_id: ZoneId,
        candidate: Vec<DisplayPoint>,
        selected: Option<usize>,
        registry: &mut ZoneRegistry,
    ) -> Result<(), EditorError> {
        let natural = self.transform.points_to_natural(&candidate);
        validate_polygon(&natural, self.config.min_point_separation)?;
        let previous = registry.update_shape(zone_id, Shape::Polygon(natural.clone()))?;
        self.history.push(EditCommand::Reshape {
            zone_id,
            before: previous.shape.vertices(),
            after: natural,
        });
        self.state = EditorState::Editing {
            zone_id,
            points: candidate,
            selected,
            drag: None,
        };
        Ok(())
    }

    /// Re-read editor state from the registry after an undo or redo.
    fn resync(&mut self, registry: &ZoneRegistry) {
        let next = match &self.state {
            EditorState::Editing { zone_id, .. } => match registry.get(*zone_id).map(|z| &z.shape) {
                Some(Shape::Polygon(vertices)) => EditorState::Editing {
                    zone_id: *zone_id,
                    points: self.transform.points_to_display(vertices),
                    selected: None,
                    drag: None,
                },
                _ => EditorState::Idle,
            },
            EditorState::Complete(id) if registry.get(*id).is_none() => EditorState::Idle,
            _ => return,
        };
        self.state = next;
    }

    // -------------------- History --------------------

    pub fn undo(&mut self, registry: &mut ZoneRegistry) -> Result<EditOutcome, EditorError> {
        match &mut self.state {
            EditorState::DrawingPolygon { points, preview, .. } => {
                let edit = self
                    .draft_history
                    .pop_undo()
                    .ok_or(EditorError::NothingToUndo)?;
                *points = edit.before.clone();
                *preview = None;
                self.draft_history.push_redo(edit);
                return Ok(EditOutcome::Undone);
            }
            EditorState::DrawingRectangle { .. } => return Err(EditorError::NothingToUndo),
            _ => {}
        }

        let command = self.history.pop_undo().ok_or(EditorError::NothingToUndo)?;
        if let Err(err) = command.revert(registry) {
            self.history.restore_undo(command);
            return Err(err.into());
        }
        log::debug!("undo: {:?}", command);
        self.history.push_redo(command);
        self.resync(registry);
        Ok(EditOutcome::Undone)
    }

    pub fn redo(&mut self, registry: &mut ZoneRegistry) -> Result<EditOutcome, EditorError> {
        match &mut self.state {
            EditorState::DrawingPolygon { points, preview, .. } => {
                let edit = self
                    .draft_history
                    .pop_redo()
                    .ok_or(EditorError::NothingToRedo)?;
                *points = edit.after.clone();
                *preview = None;
                self.draft_history.push_reapplied(edit);
                return Ok(EditOutcome::Redone);
            }
            EditorState::DrawingRectangle { .. } => return Err(EditorError::NothingToRedo),
            _ => {}
        }

        let command = self.history.pop_redo().ok_or(EditorError::NothingToRedo)?;
        if let Err(err) = command.reapply(registry) {
            self.history.restore_redo(command);
            return Err(err.into());
        }
        log::debug!("redo: {:?}", command);
        self.history.push_reapplied(command);
        self.resync(registry);
        Ok(EditOutcome::Redone)
    }

    // -------------------- Display surface --------------------

    /// The display surface changed size. In-progress display geometry is
    /// rescaled so it keeps covering the same natural region.
    pub fn resize_display(&mut self, width: f64, height: f64) -> Result<(), EditorError> {
        let old = self.transform;
        self.transform.resize_display(width, height)?;
        let new = self.transform;
        let rescale = |p: DisplayPoint| new.to_display(old.to_natural(p));
        match &mut self.state {
            EditorState::DrawingRectangle { first, preview, .. } => {
                *first = first.map(rescale);
                *preview = preview.map(rescale);
            }
            EditorState::DrawingPolygon { points, preview, .. } => {
                points.iter_mut().for_each(|p| *p = rescale(*p));
                *preview = preview.map(rescale);
            }
            EditorState::Editing { points, drag, .. } => {
                points.iter_mut().for_each(|p| *p = rescale(*p));
                *drag = None;
            }
            EditorState::Idle | EditorState::Complete(_) => {}
        }
        Ok(())
    }
}
