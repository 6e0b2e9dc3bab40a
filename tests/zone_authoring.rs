use hygiene_kernel::{
    CoordinateTransform, DisplayPoint, EditOutcome, EditorError, EditorMode, EngineConfig,
    GeometryError, HygieneSession, NaturalPoint, Shape, ZoneDraft, ZoneEditor, ZoneId,
    ZoneRegistry,
};

fn dp(x: f64, y: f64) -> DisplayPoint {
    DisplayPoint::new(x, y)
}

fn np(x: f64, y: f64) -> NaturalPoint {
    NaturalPoint::new(x, y)
}

/// Natural 640x480 shown on a 1280x720 surface: scale (2.0, 1.5).
fn editor(session: &HygieneSession) -> ZoneEditor {
    session.editor(CoordinateTransform::new(640.0, 480.0, 1280.0, 720.0).unwrap())
}

/// Draws display square (200,150)-(600,450), natural (100,100)-(300,300).
fn draw_square(editor: &mut ZoneEditor, registry: &mut ZoneRegistry) -> ZoneId {
    editor
        .begin_polygon(ZoneDraft::new("Sauce container", "sauce"))
        .unwrap();
    for (x, y) in [(200.0, 150.0), (600.0, 150.0), (600.0, 450.0), (200.0, 450.0)] {
        editor.pointer_move(dp(x, y));
        editor.pointer_down(dp(x, y), registry).unwrap();
        editor.pointer_up(dp(x, y), registry).unwrap();
    }
    let outcome = editor.complete_polygon(registry).unwrap();
    let EditOutcome::ZoneCreated(id) = outcome else {
        panic!("expected a new zone, got {:?}", outcome);
    };
    editor.finish().unwrap();
    id
}

fn vertices(registry: &ZoneRegistry, id: ZoneId) -> Vec<NaturalPoint> {
    registry.get(id).unwrap().shape.vertices()
}

#[test]
fn drawn_polygon_is_stored_in_natural_space() {
    let mut session = HygieneSession::new(EngineConfig::default());
    let mut editor = editor(&session);
    let id = draw_square(&mut editor, session.registry_mut());

    assert_eq!(
        vertices(session.registry(), id),
        vec![np(100.0, 100.0), np(300.0, 100.0), np(300.0, 300.0), np(100.0, 300.0)]
    );
    let zone = session.registry().get(id).unwrap();
    assert!(zone.requires_scooper);
    assert_eq!(zone.ingredient_category, "sauce");
    assert!(zone.contains(np(200.0, 200.0)));
    assert!(!zone.contains(np(400.0, 200.0)));
}

#[test]
fn near_duplicate_points_are_rejected_with_a_reason() {
    let mut session = HygieneSession::new(EngineConfig::default());
    let mut editor = editor(&session);
    let registry = session.registry_mut();
    editor.begin_polygon(ZoneDraft::new("Tiny", "sauce")).unwrap();
    // natural (0,0), (10,0), (0.1,0.1)
    for (x, y) in [(0.0, 0.0), (20.0, 0.0), (0.2, 0.15)] {
        editor.pointer_down(dp(x, y), registry).unwrap();
    }
    let err = editor.complete_polygon(registry).unwrap_err();
    assert!(matches!(
        err,
        EditorError::Validation(GeometryError::PointsTooClose { .. })
    ));
    assert!(err.to_string().contains("too close"));
    assert_eq!(editor.mode(), EditorMode::DrawingPolygon);
    assert!(registry.is_empty());
}

#[test]
fn inserting_on_an_edge_writes_through_and_undoes() {
    let mut session = HygieneSession::new(EngineConfig::default());
    let mut editor = editor(&session);
    let registry = session.registry_mut();
    let id = draw_square(&mut editor, registry);

    editor.select_zone(id, registry).unwrap();
    // top edge midpoint in display space is (400, 150)
    let outcome = editor.pointer_down(dp(400.0, 152.0), registry).unwrap();
    assert_eq!(outcome, EditOutcome::PointInserted { index: 1 });
    editor.pointer_up(dp(400.0, 152.0), registry).unwrap();

    let inserted = vertices(registry, id);
    assert_eq!(inserted.len(), 5);
    assert!((inserted[1].x - 200.0).abs() < 1e-9);
    assert!((inserted[1].y - 152.0 / 1.5).abs() < 1e-9);

    editor.undo(registry).unwrap();
    assert_eq!(vertices(registry, id).len(), 4);
    assert_eq!(editor.mode(), EditorMode::Editing(id));

    editor.redo(registry).unwrap();
    assert_eq!(vertices(registry, id).len(), 5);
}

#[test]
fn dragging_moves_by_pointer_delta_and_invalid_drags_revert() {
    let mut session = HygieneSession::new(EngineConfig::default());
    let mut editor = editor(&session);
    let registry = session.registry_mut();
    let id = draw_square(&mut editor, registry);
    editor.select_zone(id, registry).unwrap();

    // grab the corner at display (600, 450) slightly off-centre
    assert_eq!(
        editor.pointer_down(dp(603.0, 452.0), registry),
        Ok(EditOutcome::PointSelected { index: 2 })
    );
    editor.pointer_move(dp(643.0, 482.0));
    assert_eq!(
        editor.pointer_up(dp(643.0, 482.0), registry),
        Ok(EditOutcome::PointMoved { index: 2 })
    );
    // +40, +30 display == +20, +20 natural
    assert_eq!(vertices(registry, id)[2], np(320.0, 320.0));

    // natural (50, 150) puts edge 1-2 across the closing edge 3-0
    editor.pointer_down(dp(640.0, 480.0), registry).unwrap();
    editor.pointer_move(dp(300.0, 300.0));
    let err = editor.pointer_up(dp(100.0, 225.0), registry).unwrap_err();
    assert!(matches!(
        err,
        EditorError::Validation(GeometryError::SelfIntersecting { .. })
    ));
    assert_eq!(vertices(registry, id)[2], np(320.0, 320.0));
    match editor.preview() {
        Some(Shape::Polygon(points)) => assert_eq!(points[2], dp(640.0, 480.0)),
        other => panic!("unexpected preview {:?}", other),
    }

    // undo the successful drag
    editor.undo(registry).unwrap();
    assert_eq!(vertices(registry, id)[2], np(300.0, 300.0));
}

#[test]
fn deleting_points_respects_minimum_and_undo() {
    let mut session = HygieneSession::new(EngineConfig::default());
    let mut editor = editor(&session);
    let registry = session.registry_mut();
    let id = draw_square(&mut editor, registry);
    editor.select_zone(id, registry).unwrap();

    editor.pointer_down(dp(200.0, 450.0), registry).unwrap();
    editor.pointer_up(dp(200.0, 450.0), registry).unwrap();
    assert_eq!(
        editor.delete_selected_point(registry),
        Ok(EditOutcome::PointDeleted { index: 3 })
    );
    assert_eq!(vertices(registry, id).len(), 3);

    editor.pointer_down(dp(200.0, 150.0), registry).unwrap();
    editor.pointer_up(dp(200.0, 150.0), registry).unwrap();
    assert_eq!(
        editor.delete_selected_point(registry),
        Err(EditorError::MinimumPoints)
    );
    assert_eq!(vertices(registry, id).len(), 3);

    editor.undo(registry).unwrap();
    assert_eq!(vertices(registry, id).len(), 4);
}

#[test]
fn zone_creation_and_deletion_are_undoable() {
    let mut session = HygieneSession::new(EngineConfig::default());
    let mut editor = editor(&session);
    let registry = session.registry_mut();
    let id = draw_square(&mut editor, registry);

    editor.delete_zone(id, registry).unwrap();
    assert!(registry.get(id).is_none());
    editor.undo(registry).unwrap();
    assert!(registry.get(id).is_some());

    // undo the creation itself
    editor.undo(registry).unwrap();
    assert!(registry.is_empty());
    assert_eq!(editor.undo(registry), Err(EditorError::NothingToUndo));

    editor.redo(registry).unwrap();
    assert_eq!(registry.get(id).map(|z| z.name.as_str()), Some("Sauce container"));
}

#[test]
fn history_is_bounded() {
    let mut config = EngineConfig::default();
    config.editor.history_capacity = 2;
    let mut session = HygieneSession::new(config);
    let mut editor = editor(&session);
    let registry = session.registry_mut();
    let id = draw_square(&mut editor, registry);
    editor.select_zone(id, registry).unwrap();

    // three inserts on three different edges; only two can be undone
    for (x, y) in [(400.0, 150.0), (600.0, 300.0), (400.0, 450.0)] {
        editor.pointer_down(dp(x, y), registry).unwrap();
        editor.pointer_up(dp(x, y), registry).unwrap();
    }
    assert_eq!(vertices(registry, id).len(), 7);
    editor.undo(registry).unwrap();
    editor.undo(registry).unwrap();
    assert_eq!(editor.undo(registry), Err(EditorError::NothingToUndo));
    assert_eq!(vertices(registry, id).len(), 5);
}

#[test]
fn payload_round_trip_through_registry() {
    let mut session = HygieneSession::new(EngineConfig::default());
    let mut editor = editor(&session);
    let id = draw_square(&mut editor, session.registry_mut());

    let payloads = session.registry().to_payloads();
    let json = serde_json::to_value(&payloads).unwrap();
    assert_eq!(json[0]["type"], "polygon");
    assert_eq!(json[0]["requiresScooper"], true);
    assert_eq!(json[0]["coordinates"][0][0], 100.0);

    let mut restored = ZoneRegistry::new();
    assert_eq!(restored.load(payloads), 1);
    assert_eq!(vertices(&restored, id), vertices(session.registry(), id));
}
