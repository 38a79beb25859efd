use glam::Vec2;
use viscera_core::cloth::PinPolicy;
use viscera_core::fracture::FracturePattern;
use viscera_core::materials::{DestructibleMaterial, FluidKind, SoftMaterial};
use viscera_core::{Engine, EngineConfig, Stats};

/// One of everything.
fn scene(config: EngineConfig) -> Engine {
    let mut e = Engine::new(config).unwrap();
    e.create_soft_body(Vec2::new(300.0, 300.0), SoftMaterial::FLESH).unwrap();
    e.create_slime(Vec2::new(380.0, 300.0), 25.0).unwrap();
    e.create_cloth(Vec2::new(600.0, 50.0), 200.0, 150.0, 10, 8, PinPolicy::TopRow).unwrap();
    e.create_destructible(Vec2::new(900.0, 400.0), 80.0, 60.0, 4, 3, 120.0, DestructibleMaterial::Glass)
        .unwrap();
    e.create_rope(Vec2::new(150.0, 50.0), 10, 120.0, 1.0).unwrap();
    e.create_ragdoll(Vec2::new(1000.0, 100.0), 1.0).unwrap();
    e.create_fluid_source(Vec2::new(320.0, 150.0), FluidKind::Blood).unwrap();
    e.splatter(Vec2::new(340.0, 200.0), FluidKind::Ectoplasm, 60, 100.0);
    e
}

#[test]
fn test_stats_count_every_subsystem() {
    let e = scene(EngineConfig::default());
    let stats = e.stats();
    assert_eq!(stats.soft_bodies, 2);
    assert_eq!(stats.cloths, 1);
    assert_eq!(stats.destructibles, 1);
    assert_eq!(stats.bodies, 2);
    assert_eq!(stats.fluid_sources, 1);
    assert_eq!(stats.fluid_particles, 60);
    assert_eq!(stats.substeps, 4);
    assert_eq!(stats.relaxation_passes, 8);

    let expected_particles = (SoftMaterial::FLESH.segments + 1)
        + (SoftMaterial::SLIME.segments + 1)
        + 11 * 9
        + 5 * 4
        + 11
        + 16;
    assert_eq!(stats.active_particles, expected_particles);
    assert_eq!(stats.active_constraints, e.solver().constraints.len());
}

#[test]
fn test_update_keeps_everything_finite_and_bounded() {
    let mut e = scene(EngineConfig::default());
    let bounds = e.bounds();
    for frame in 0..180 {
        e.update(1.0 / 60.0);
        if frame % 60 == 59 {
            e.apply_explosion(Vec2::new(640.0, 400.0), 2.0e5, 300.0);
        }
    }
    for v in e.particle_vertices() {
        let p = Vec2::from(v.position);
        assert!(p.is_finite() && bounds.contains(p), "core particle at {p}");
    }
    for v in e.fluid_vertices() {
        let p = Vec2::from(v.position);
        assert!(p.is_finite() && bounds.contains(p), "fluid particle at {p}");
    }
    assert!(e.stats().last_update_ms >= 0.0);
    assert_eq!(e.frame(), 180);
}

#[test]
fn test_identical_seeds_replay_identically() {
    let mut a = scene(EngineConfig::default());
    let mut b = scene(EngineConfig::default());
    for _ in 0..90 {
        a.update(1.0 / 60.0);
        b.update(1.0 / 60.0);
    }
    assert_eq!(a.particle_vertices(), b.particle_vertices());
    assert_eq!(a.fluid_vertices(), b.fluid_vertices());
    assert_eq!(a.fragment_instances(), b.fragment_instances());
    assert_eq!(
        a.fracture_surface(Vec2::ZERO, 30.0, FracturePattern::Radial { pieces: 6 }),
        b.fracture_surface(Vec2::ZERO, 30.0, FracturePattern::Radial { pieces: 6 })
    );
}

#[test]
fn test_different_seeds_diverge() {
    let mut a = scene(EngineConfig::default());
    let mut b = scene(EngineConfig { seed: 99, ..Default::default() });
    for _ in 0..30 {
        a.update(1.0 / 60.0);
        b.update(1.0 / 60.0);
    }
    assert_ne!(a.fluid_vertices(), b.fluid_vertices());
}

#[test]
fn test_clear_is_idempotent() {
    let mut e = scene(EngineConfig::default());
    for _ in 0..10 {
        e.update(1.0 / 60.0);
    }
    e.clear();
    let once = e.stats();
    e.clear();
    assert_eq!(e.stats(), once);
    assert_eq!(
        once,
        Stats { substeps: 4, relaxation_passes: 8, ..Default::default() }
    );
    assert!(e.particle_vertices().is_empty());
    assert!(e.line_segments().is_empty());
    assert!(e.soft_outlines().is_empty());
    assert!(e.drain_events().is_empty());
    assert_eq!(e.time(), 0.0);
}

#[test]
fn test_cleared_engine_replays_like_a_fresh_one() {
    let mut used = scene(EngineConfig::default());
    for _ in 0..20 {
        used.update(1.0 / 60.0);
    }
    used.clear();
    used.create_soft_body(Vec2::new(300.0, 300.0), SoftMaterial::FLESH).unwrap();
    used.splatter(Vec2::new(340.0, 200.0), FluidKind::Water, 30, 100.0);

    let mut fresh = Engine::new(EngineConfig::default()).unwrap();
    fresh.create_soft_body(Vec2::new(300.0, 300.0), SoftMaterial::FLESH).unwrap();
    fresh.splatter(Vec2::new(340.0, 200.0), FluidKind::Water, 30, 100.0);
    for _ in 0..20 {
        used.update(1.0 / 60.0);
        fresh.update(1.0 / 60.0);
    }
    assert_eq!(used.fluid_vertices(), fresh.fluid_vertices());
    assert_eq!(used.particle_vertices(), fresh.particle_vertices());
}

#[test]
fn test_broadphase_matches_literal_cross_collision() {
    let build = |broadphase: bool| {
        let config = EngineConfig {
            gravity: Vec2::ZERO,
            cross_collision_broadphase: broadphase,
            ..Default::default()
        };
        let mut e = Engine::new(config).unwrap();
        e.create_soft_circle(Vec2::new(400.0, 300.0), 30.0, 16, 0.3, 1.5).unwrap();
        // A sparse ring of droplets just touching the rim
        for k in 0..8 {
            let angle = std::f32::consts::TAU * (k as f32 + 0.5) / 8.0;
            let p = Vec2::new(400.0, 300.0) + Vec2::new(angle.cos(), angle.sin()) * 34.0;
            e.add_fluid_particle(p, Vec2::ZERO, FluidKind::Water);
        }
        e
    };
    let mut literal = build(false);
    let mut hashed = build(true);
    for _ in 0..5 {
        literal.update(1.0 / 60.0);
        hashed.update(1.0 / 60.0);
    }
    for (a, b) in literal.fluid_vertices().iter().zip(hashed.fluid_vertices()) {
        let d = Vec2::from(a.position).distance(Vec2::from(b.position));
        assert!(d < 1e-3, "broad-phase changed the result by {d}");
    }
    for (a, b) in literal.particle_vertices().iter().zip(hashed.particle_vertices()) {
        let d = Vec2::from(a.position).distance(Vec2::from(b.position));
        assert!(d < 1e-3, "broad-phase changed the result by {d}");
    }
}

#[test]
fn test_fluid_is_pushed_out_of_soft_rim() {
    let config = EngineConfig { gravity: Vec2::ZERO, ..Default::default() };
    let mut e = Engine::new(config).unwrap();
    let id = e.create_soft_circle(Vec2::new(400.0, 300.0), 30.0, 16, 0.3, 1.5).unwrap();
    let rim0 = e.soft_body(id).unwrap().rim[0];
    let rim_pos = e.position(rim0).unwrap();
    let h = e.add_fluid_particle(rim_pos + Vec2::new(2.0, 0.0), Vec2::ZERO, FluidKind::Water);

    e.update(1.0 / 60.0);
    let fluid = e.fluid().position(h).unwrap();
    let rim = e.position(rim0).unwrap();
    assert!(
        fluid.distance(rim) > 2.0,
        "droplet should be pushed off the rim, still {} away",
        fluid.distance(rim)
    );
}

#[test]
fn test_quality_controller_sheds_work_when_enabled() {
    let mut e = scene(EngineConfig::default());
    e.quality_mut().enabled = true;
    for _ in 0..20 {
        e.record_frame_time(100.0);
    }
    let stats = e.stats();
    assert!(stats.relaxation_passes < 8 || stats.substeps < 4);
    assert!(e.quality().smoothed_ms() > e.quality().budget_ms);
    e.update(1.0 / 60.0);
    assert!(e.stats().last_update_ms >= 0.0);
}

#[test]
fn test_snapshots_reflect_scene() {
    let e = scene(EngineConfig::default());
    let stats = e.stats();
    assert_eq!(e.particle_vertices().len(), stats.active_particles);
    assert_eq!(e.line_segments().len(), stats.active_constraints);
    assert_eq!(e.fluid_vertices().len(), stats.fluid_particles);
    let outlines = e.soft_outlines();
    assert_eq!(outlines.len(), 2);
    assert_eq!(outlines[0].points.len(), SoftMaterial::FLESH.segments);
    assert_eq!(outlines[1].color, SoftMaterial::SLIME.color);
    let pinned = e.particle_vertices().iter().filter(|v| v.pinned == 1).count();
    // cloth top row and the rope anchor
    assert_eq!(pinned, 11 + 1);
    let vertices = e.particle_vertices();
    let bytes: &[u8] = bytemuck::cast_slice(&vertices);
    assert_eq!(bytes.len(), stats.active_particles * 16);
}

#[test]
fn test_ignores_bad_dt() {
    let mut e = scene(EngineConfig::default());
    let before = e.particle_vertices();
    e.update(0.0);
    e.update(-1.0);
    e.update(f32::NAN);
    assert_eq!(e.particle_vertices(), before);
    assert_eq!(e.frame(), 0);
}

#[test]
fn test_explosion_kick_follows_current_substeps() {
    let config = EngineConfig { gravity: Vec2::ZERO, ..Default::default() };
    let mut e = Engine::new(config).unwrap();
    e.quality_mut().enabled = true;
    for _ in 0..40 {
        e.record_frame_time(100.0);
    }
    assert_eq!(e.stats().substeps, 1, "slow frames should shed substeps down to one");

    let drop = e.add_fluid_particle(Vec2::new(400.0, 300.0), Vec2::ZERO, FluidKind::Water);
    e.apply_explosion(Vec2::new(380.0, 300.0), 6000.0, 100.0);
    // 6000 / (60 * 1) at 80% strength, 20 px into a 100 px blast
    let v = e.fluid().velocity(drop).unwrap();
    assert!((v.x - 80.0).abs() < 1e-2, "kick {v} should use one substep");
    assert!(v.y.abs() < 1e-4);
}

#[test]
fn test_undrained_events_stay_capped() {
    let config = EngineConfig { max_events: 16, gravity: Vec2::ZERO, ..Default::default() };
    let mut e = Engine::new(config).unwrap();
    let id = e
        .create_cloth(Vec2::new(300.0, 100.0), 200.0, 200.0, 8, 8, PinPolicy::TopRow)
        .unwrap();
    let mut cut = 0;
    for row in 1..8 {
        for col in 0..8 {
            cut += e.tear_cloth_at(id, col, row);
        }
        e.update(1.0 / 60.0);
    }
    assert!(cut > 16, "the cloth should tear far more links than the cap");
    let events = e.drain_events();
    assert_eq!(events.len(), 16);
    assert!(e.drain_events().is_empty());
}
