use glam::Vec2;
use viscera_core::cloth::{build_cloth, PinPolicy};
use viscera_core::composite::Composite;
use viscera_core::config::ClothConfig;
use viscera_core::constraints::ConstraintKind;
use viscera_core::engine::EngineEvent;
use viscera_core::solver::{Solver, SolverParams};
use viscera_core::{Engine, EngineConfig};

#[test]
fn test_tear_threshold_at_one_and_a_half_rest_length() {
    let mut s = Solver::new(SolverParams { gravity: Vec2::ZERO, ..Default::default() });
    let origin = Vec2::new(100.0, 100.0);
    let mut cloth = build_cloth(&mut s, origin, 10.0, 10.0, 1, 1, &PinPolicy::None, &ClothConfig::default()).unwrap();
    assert_eq!(cloth.tear_factor, 1.5);

    let horizontal: Vec<_> = cloth
        .constraints
        .iter()
        .copied()
        .filter(|id| {
            let c = &s.constraints[id.index()];
            let a = s.particles.position[c.a.index()];
            let b = s.particles.position[c.b.index()];
            c.kind == ConstraintKind::Structural && (a.y - b.y).abs() < 1e-6
        })
        .collect();
    assert_eq!(horizontal.len(), 2);

    let stretch_to = |s: &mut Solver, cloth: &viscera_core::cloth::Cloth, width: f32| {
        for row in 0..2 {
            let id = cloth.node(1, row).unwrap();
            s.set_position(id, origin + Vec2::new(width, row as f32 * 10.0));
        }
    };

    stretch_to(&mut s, &cloth, 14.0);
    assert!(cloth.tear(&mut s).is_empty(), "1.4x rest length must hold");
    assert!(horizontal.iter().all(|id| !s.is_broken(*id)));

    stretch_to(&mut s, &cloth, 16.0);
    let torn = cloth.tear(&mut s);
    assert_eq!(torn.len(), 2, "both horizontal links tear at 1.6x");
    assert!(horizontal.iter().all(|id| s.is_broken(*id)));
    assert_eq!(cloth.torn, 2);
    for mid in &torn {
        assert!((mid.x - (origin.x + 8.0)).abs() < 1e-4, "tear midpoint {mid}");
    }

    // Back at rest the torn links stay gone
    stretch_to(&mut s, &cloth, 10.0);
    s.step(1.0 / 60.0);
    assert!(cloth.tear(&mut s).is_empty());
    assert!(horizontal.iter().all(|id| s.is_broken(*id)));
    assert_eq!(cloth.intact_constraints(&s), cloth.constraints.len() - 2);
}

#[test]
fn test_pinned_top_row_holds_under_gravity() {
    let mut engine = Engine::new(EngineConfig::default()).unwrap();
    let id = engine
        .create_cloth(Vec2::new(300.0, 100.0), 200.0, 150.0, 10, 8, PinPolicy::TopRow)
        .unwrap();
    let cloth = engine.cloth(id).unwrap();
    let top: Vec<_> = (0..cloth.cols).map(|c| cloth.node(c, 0).unwrap()).collect();
    let bottom = cloth.node(5, cloth.rows - 1).unwrap();
    let start: Vec<Vec2> = top.iter().map(|p| engine.position(*p).unwrap()).collect();
    let bottom_start = engine.position(bottom).unwrap();

    for _ in 0..120 {
        engine.update(1.0 / 60.0);
    }
    for (p, s) in top.iter().zip(&start) {
        assert_eq!(engine.position(*p).unwrap(), *s);
    }
    let bottom_now = engine.position(bottom).unwrap();
    assert!(bottom_now.is_finite());
    assert!(bottom_now.y >= bottom_start.y - 1.0, "cloth should hang, not rise");
}

#[test]
fn test_engine_tear_spawns_debris_and_events() {
    let config = EngineConfig { gravity: Vec2::ZERO, ..Default::default() };
    let mut engine = Engine::new(config).unwrap();
    let id = engine
        .create_cloth(Vec2::new(300.0, 100.0), 100.0, 100.0, 4, 4, PinPolicy::TopRow)
        .unwrap();
    let corner = {
        let c = engine.cloth(id).unwrap();
        c.node(c.cols - 1, c.rows - 1).unwrap()
    };
    engine.set_position(corner, Vec2::new(700.0, 600.0));
    engine.update(1.0 / 60.0);

    let stats = engine.stats();
    assert!(stats.torn_constraints > 0, "a 400 px yank must tear something");
    assert!(stats.debris > 0, "tearing sheds debris");
    let torn_events = engine
        .drain_events()
        .into_iter()
        .filter(|e| matches!(e, EngineEvent::ConstraintTorn { .. }))
        .count();
    assert_eq!(torn_events, stats.torn_constraints);
}

#[test]
fn test_tear_debris_can_be_disabled() {
    let mut config = EngineConfig { gravity: Vec2::ZERO, ..Default::default() };
    config.cloth.tear_debris = false;
    let mut engine = Engine::new(config).unwrap();
    let id = engine
        .create_cloth(Vec2::new(300.0, 100.0), 100.0, 100.0, 4, 4, PinPolicy::TopRow)
        .unwrap();
    let corner = {
        let c = engine.cloth(id).unwrap();
        c.node(c.cols - 1, c.rows - 1).unwrap()
    };
    engine.set_position(corner, Vec2::new(700.0, 600.0));
    engine.update(1.0 / 60.0);
    assert!(engine.stats().torn_constraints > 0);
    assert_eq!(engine.stats().debris, 0);
}

#[test]
fn test_tear_at_through_engine_counts() {
    let mut engine = Engine::new(EngineConfig::default()).unwrap();
    let id = engine
        .create_cloth(Vec2::new(300.0, 100.0), 100.0, 100.0, 4, 4, PinPolicy::TopCorners)
        .unwrap();
    let cut = engine.tear_cloth_at(id, 2, 2);
    assert_eq!(cut, 12);
    assert_eq!(engine.stats().torn_constraints, 12);
    assert_eq!(engine.stats().debris, 12, "a cut sheds debris like a stretch tear");
    let torn_events = engine
        .drain_events()
        .into_iter()
        .filter(|e| matches!(e, EngineEvent::ConstraintTorn { .. }))
        .count();
    assert_eq!(torn_events, 12, "one event per cut link");
}
