//! The orchestrating engine.
//!
//! Owns every subsystem and runs them in a fixed order per substep:
//!
//! 1. core integrate, relax and bounds
//! 2. soft-body pressure / shape keeping
//! 3. SPH fluid
//! 4. cloth wind, tearing and self-collision
//! 5. destructible strain damage
//! 6. debris
//! 7. cross-subsystem collisions (fluid against soft bodies, soft against soft)
//! 8. bounds again for anything pushed out, then the core spatial hash rebuild
//!
//! Fluid/soft coupling is O(fluid particles × rim particles) when run as a
//! literal double loop, which makes it the most expensive stage. With
//! `cross_collision_broadphase` on, rim particles are bucketed in a spatial
//! hash first and only the 3×3 cell neighbourhood of each fluid particle is
//! visited.

use std::collections::VecDeque;

use glam::Vec2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, trace, warn};

use crate::bodies::{self, Body};
use crate::bounds::Bounds;
use crate::cloth::{self, Cloth, PinPolicy};
use crate::composite::Composite;
use crate::config::EngineConfig;
use crate::debris::DebrisField;
use crate::destructible::{self, DamageReport, Destructible};
use crate::error::{BuildError, ConfigError};
use crate::fluids::{self, FluidHandle, FluidSolver, FluidSource, FluidSourceId};
use crate::fracture::{self, FracturePattern, Fragment};
use crate::grid::SpatialHashGrid;
use crate::materials::{DestructibleMaterial, FluidKind, SoftMaterial};
use crate::particle::{ParticleId, ParticleSet};
use crate::quality::QualityController;
use crate::snapshot::{self, FluidVertex, FragmentInstance, LineSegment, ParticleVertex, SoftOutline};
use crate::softbody::{self, SoftBody};
use crate::solver::{Solver, SolverParams};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SoftBodyId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ClothId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DestructibleId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BodyId(pub u32);

/// Something the host may want to play a sound or effect for.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EngineEvent {
    /// A cloth constraint tore at `position`.
    ConstraintTorn { position: Vec2 },
    /// A destructible lost a node or link at `position`.
    PieceBroken { position: Vec2 },
    /// A destructible fell under its destroy threshold and was removed.
    Destroyed { id: DestructibleId },
}

/// Aggregate counts for a HUD or diagnostics overlay.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Stats {
    pub active_particles: usize,
    pub active_constraints: usize,
    pub fluid_particles: usize,
    pub soft_bodies: usize,
    pub cloths: usize,
    pub destructibles: usize,
    pub bodies: usize,
    pub fluid_sources: usize,
    pub debris: usize,
    /// Occupied cells of the core spatial hash.
    pub occupied_cells: usize,
    pub torn_constraints: usize,
    pub destroyed: usize,
    pub substeps: u32,
    pub relaxation_passes: u32,
    pub last_update_ms: f32,
}

/// Bounded FIFO of [`EngineEvent`]s. Once full, each new event drops the
/// oldest one, so a host that never drains it holds at most `cap` events.
struct EventQueue {
    events: VecDeque<EngineEvent>,
    cap: usize,
    warned: bool,
}

impl EventQueue {
    fn new(cap: usize) -> Self {
        Self { events: VecDeque::new(), cap: cap.max(1), warned: false }
    }

    fn push(&mut self, event: EngineEvent) {
        if self.events.len() >= self.cap {
            if !self.warned {
                warn!(cap = self.cap, "event queue full, dropping oldest events");
                self.warned = true;
            }
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    fn drain(&mut self) -> Vec<EngineEvent> {
        self.events.drain(..).collect()
    }

    fn clear(&mut self) {
        self.events.clear();
        self.warned = false;
    }
}

/// Colour of the scraps a tearing cloth sheds.
const CLOTH_DEBRIS_COLOR: [u8; 4] = [0x8a, 0x1c, 0x1c, 0xff];

pub struct Engine {
    config: EngineConfig,
    solver: Solver,
    fluid: FluidSolver,
    debris: DebrisField,
    soft_bodies: Vec<SoftBody>,
    cloths: Vec<Cloth>,
    /// Destroyed structures leave `None` behind so ids stay stable.
    destructibles: Vec<Option<Destructible>>,
    bodies: Vec<Body>,
    sources: Vec<FluidSource>,
    quality: QualityController,
    rng: ChaCha8Rng,
    events: EventQueue,
    /// Broad-phase for fluid/soft coupling, rebuilt each substep.
    rim_grid: SpatialHashGrid,
    time: f32,
    frame: u64,
    torn_total: usize,
    destroyed_total: usize,
    last_update_ms: f32,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let solver = Solver::new(SolverParams::from_config(&config));
        let fluid = FluidSolver::new(config.fluid.clone());
        let debris = DebrisField::new(config.debris.clone());
        let quality = QualityController::new(config.substeps, config.relaxation_passes);
        let rim_grid = SpatialHashGrid::new(config.particle_radius + config.fluid.particle_radius);
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        let events = EventQueue::new(config.max_events);
        debug!(
            substeps = config.substeps,
            passes = config.relaxation_passes,
            seed = config.seed,
            "engine created"
        );
        Ok(Self {
            config,
            solver,
            fluid,
            debris,
            soft_bodies: Vec::new(),
            cloths: Vec::new(),
            destructibles: Vec::new(),
            bodies: Vec::new(),
            sources: Vec::new(),
            quality,
            rng,
            events,
            rim_grid,
            time: 0.0,
            frame: 0,
            torn_total: 0,
            destroyed_total: 0,
            last_update_ms: 0.0,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn solver(&self) -> &Solver {
        &self.solver
    }

    pub fn fluid(&self) -> &FluidSolver {
        &self.fluid
    }

    pub fn debris(&self) -> &DebrisField {
        &self.debris
    }

    pub fn quality(&self) -> &QualityController {
        &self.quality
    }

    pub fn quality_mut(&mut self) -> &mut QualityController {
        &mut self.quality
    }

    /// Simulation time in seconds since creation or the last `clear`.
    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    // ------------------------------------------------------------------
    // Frame loop
    // ------------------------------------------------------------------

    /// Advance the simulation by `dt` seconds. Non-positive or non-finite
    /// `dt` is ignored.
    pub fn update(&mut self, dt: f32) {
        if !(dt > 0.0 && dt.is_finite()) {
            return;
        }
        #[cfg(not(target_arch = "wasm32"))]
        let start = std::time::Instant::now();

        for source in &mut self.sources {
            let count = source.due(dt);
            if count > 0 {
                source.emit(&mut self.fluid, &mut self.rng, count);
            }
        }

        let substeps = self.quality.substeps().max(1);
        let passes = self.quality.passes().max(1);
        let sub_dt = dt / substeps as f32;
        for _ in 0..substeps {
            self.substep(sub_dt, passes);
        }
        self.frame += 1;

        #[cfg(not(target_arch = "wasm32"))]
        self.record_frame_time(start.elapsed().as_secs_f32() * 1000.0);

        trace!(
            frame = self.frame,
            particles = self.solver.active_particle_count(),
            fluid = self.fluid.len(),
            debris = self.debris.len(),
            substeps,
            passes,
            "update"
        );
    }

    /// Feed a measured frame time into the stats and the quality controller.
    /// Native builds call this from `update`. Wasm hosts time the frame
    /// themselves and report it here.
    pub fn record_frame_time(&mut self, ms: f32) {
        self.last_update_ms = ms;
        self.quality.record(ms);
    }

    fn substep(&mut self, dt: f32, passes: u32) {
        let gravity = self.config.gravity;
        let bounds = self.config.bounds;

        self.solver.integrate(dt);
        self.solver.relax(passes);
        self.solver.collide_bounds();

        for body in &self.soft_bodies {
            body.maintain(&mut self.solver.particles, self.config.pressure_scale);
        }

        self.fluid.step(dt, gravity, &bounds);
        self.time += dt;

        self.step_cloths();
        self.step_destructibles(dt);
        self.debris.step(dt, gravity, &bounds);

        self.resolve_fluid_soft();
        self.resolve_soft_soft();

        self.solver.collide_bounds();
        self.solver.rebuild_grid();
    }

    fn step_cloths(&mut self) {
        for cloth in &mut self.cloths {
            cloth.apply_wind(&mut self.solver.particles, self.time, &mut self.rng);
            let torn = cloth.tear(&mut self.solver);
            self.torn_total += torn.len();
            for position in torn {
                self.events.push(EngineEvent::ConstraintTorn { position });
                if cloth.tear_debris {
                    self.debris
                        .spawn(&mut self.rng, position, position, Vec2::ZERO, CLOTH_DEBRIS_COLOR);
                }
            }
            cloth.resolve_self_collision(&mut self.solver.particles);
        }
    }

    fn step_destructibles(&mut self, dt: f32) {
        let mut spawns = Vec::new();
        for slot in 0..self.destructibles.len() {
            let Some(d) = self.destructibles[slot].as_mut() else {
                continue;
            };
            let origin = destructible_center(d, &self.solver.particles);
            let color = d.material.color();
            spawns.clear();
            let report = d.apply_strain(&mut self.solver, dt, &mut spawns);
            self.settle_damage(slot, &report, &spawns, origin, color);
        }
    }

    /// Turn broken pieces into debris and events, and drop the structure if
    /// it was destroyed.
    fn settle_damage(
        &mut self,
        slot: usize,
        report: &DamageReport,
        spawns: &[Vec2],
        origin: Vec2,
        color: [u8; 4],
    ) {
        for &position in spawns {
            self.events.push(EngineEvent::PieceBroken { position });
            self.debris.spawn(&mut self.rng, position, origin, Vec2::ZERO, color);
        }
        if report.destroyed {
            let id = DestructibleId(slot as u32);
            info!(id = id.0, pieces = spawns.len(), "destructible destroyed");
            self.events.push(EngineEvent::Destroyed { id });
            self.destructibles[slot] = None;
            self.destroyed_total += 1;
        }
    }

    // ------------------------------------------------------------------
    // Cross-subsystem collisions
    // ------------------------------------------------------------------

    /// Push fluid particles off soft-body rims.
    ///
    /// The broad-phase hashes rim positions once, before the pass. Rim
    /// particles pushed during the pass keep their build-time cells, so a
    /// rim point nudged across a cell edge can miss a later fluid particle
    /// the double loop would still reach. That drift is bounded by one
    /// push per pass and is corrected on the next substep.
    fn resolve_fluid_soft(&mut self) {
        if self.soft_bodies.is_empty() || self.fluid.is_empty() {
            return;
        }
        let min_dist = self.config.fluid.particle_radius + self.config.particle_radius;
        let fluid_weight = 1.0 / self.config.fluid.coupling_mass;
        let bounds = self.config.bounds;
        let particles = &mut self.solver.particles;
        let fluid_pos = &mut self.fluid.particles.position;

        if !self.config.cross_collision_broadphase {
            for pos in fluid_pos.iter_mut() {
                for body in &self.soft_bodies {
                    for &id in &body.rim {
                        push_apart(pos, particles, id, fluid_weight, min_dist, &bounds);
                    }
                }
            }
            return;
        }

        // Rim ids flattened in body/rim order, so sorted candidates visit
        // them in the same order as the double loop above.
        let rim: Vec<ParticleId> = self.soft_bodies.iter().flat_map(|b| b.rim.iter().copied()).collect();
        let rim_pos: Vec<Vec2> = rim.iter().map(|id| particles.position[id.index()]).collect();
        self.rim_grid
            .rebuild_where(&rim_pos, min_dist, |k| particles.active[rim[k].index()]);

        let mut candidates = Vec::new();
        for pos in fluid_pos.iter_mut() {
            candidates.clear();
            self.rim_grid.for_each_candidate(*pos, min_dist, |k| candidates.push(k));
            candidates.sort_unstable();
            for &k in &candidates {
                push_apart(pos, particles, rim[k as usize], fluid_weight, min_dist, &bounds);
            }
        }
    }

    /// Rim particles of two overlapping soft bodies keep `2 * particle_radius` apart.
    fn resolve_soft_soft(&mut self) {
        let n = self.soft_bodies.len();
        if n < 2 {
            return;
        }
        let min_dist = self.config.particle_radius * 2.0;
        let particles = &mut self.solver.particles;
        let boxes: Vec<Option<(Vec2, Vec2)>> = self.soft_bodies.iter().map(|b| b.aabb(particles)).collect();

        for a in 0..n {
            for b in a + 1..n {
                let (Some((a_min, a_max)), Some((b_min, b_max))) = (boxes[a], boxes[b]) else {
                    continue;
                };
                if a_max.x + min_dist < b_min.x
                    || b_max.x + min_dist < a_min.x
                    || a_max.y + min_dist < b_min.y
                    || b_max.y + min_dist < a_min.y
                {
                    continue;
                }
                for &pa in &self.soft_bodies[a].rim {
                    for &pb in &self.soft_bodies[b].rim {
                        separate(particles, pa, pb, min_dist);
                    }
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Factories
    // ------------------------------------------------------------------

    fn object_count(&self) -> usize {
        self.soft_bodies.len()
            + self.cloths.len()
            + self.destructibles.iter().filter(|d| d.is_some()).count()
            + self.bodies.len()
            + self.sources.len()
    }

    fn reserve_object(&self, what: &'static str) -> Result<(), BuildError> {
        let limit = self.config.max_objects;
        if self.object_count() >= limit {
            warn!(what, limit, "object capacity reached, refusing to build");
            return Err(BuildError::CapacityExceeded { limit });
        }
        Ok(())
    }

    fn add_soft_body(&mut self, body: SoftBody) -> SoftBodyId {
        let id = SoftBodyId(self.soft_bodies.len() as u32);
        debug!(
            id = id.0,
            material = body.material.name,
            particles = body.particle_ids().len(),
            constraints = body.constraint_ids().len(),
            rest_area = body.rest_area,
            "soft body created"
        );
        self.soft_bodies.push(body);
        id
    }

    /// Circle soft body built from a material preset.
    pub fn create_soft_body(&mut self, center: Vec2, material: SoftMaterial) -> Result<SoftBodyId, BuildError> {
        self.reserve_object("soft body")?;
        let body = softbody::build_circle(
            &mut self.solver,
            center,
            material.radius,
            material.segments,
            material.particle_mass,
            material.pressure,
            material.spoke_stiffness,
            material,
        )?;
        Ok(self.add_soft_body(body))
    }

    /// Pressurised ring with flesh colouring and spoke stiffness.
    pub fn create_soft_circle(
        &mut self,
        center: Vec2,
        radius: f32,
        segments: usize,
        mass: f32,
        pressure: f32,
    ) -> Result<SoftBodyId, BuildError> {
        self.reserve_object("soft body")?;
        let material = SoftMaterial::FLESH;
        let body = softbody::build_circle(
            &mut self.solver,
            center,
            radius,
            segments,
            mass,
            pressure,
            material.spoke_stiffness,
            material,
        )?;
        Ok(self.add_soft_body(body))
    }

    pub fn create_slime(&mut self, center: Vec2, radius: f32) -> Result<SoftBodyId, BuildError> {
        self.reserve_object("soft body")?;
        let material = SoftMaterial::SLIME;
        let body = softbody::build_circle(
            &mut self.solver,
            center,
            radius,
            material.segments,
            material.particle_mass,
            material.pressure,
            material.spoke_stiffness,
            material,
        )?;
        Ok(self.add_soft_body(body))
    }

    pub fn create_soft_rectangle(
        &mut self,
        center: Vec2,
        width: f32,
        height: f32,
        segments_per_side: usize,
        mass: f32,
        stiffness: f32,
    ) -> Result<SoftBodyId, BuildError> {
        self.reserve_object("soft body")?;
        let body = softbody::build_rectangle(
            &mut self.solver,
            center,
            width,
            height,
            segments_per_side,
            mass,
            stiffness,
        )?;
        Ok(self.add_soft_body(body))
    }

    pub fn create_cloth(
        &mut self,
        origin: Vec2,
        width: f32,
        height: f32,
        segments_x: usize,
        segments_y: usize,
        pin: PinPolicy,
    ) -> Result<ClothId, BuildError> {
        self.reserve_object("cloth")?;
        let cloth = cloth::build_cloth(
            &mut self.solver,
            origin,
            width,
            height,
            segments_x,
            segments_y,
            &pin,
            &self.config.cloth,
        )?;
        let id = ClothId(self.cloths.len() as u32);
        debug!(
            id = id.0,
            cols = cloth.cols,
            rows = cloth.rows,
            constraints = cloth.constraints.len(),
            ?pin,
            "cloth created"
        );
        self.cloths.push(cloth);
        Ok(id)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn create_destructible(
        &mut self,
        origin: Vec2,
        width: f32,
        height: f32,
        segments_x: usize,
        segments_y: usize,
        health: f32,
        material: DestructibleMaterial,
    ) -> Result<DestructibleId, BuildError> {
        self.reserve_object("destructible")?;
        let d = destructible::build_destructible(
            &mut self.solver,
            origin,
            width,
            height,
            segments_x,
            segments_y,
            health,
            material,
            &self.config.destructible,
        )?;
        let id = DestructibleId(self.destructibles.len() as u32);
        debug!(
            id = id.0,
            ?material,
            health,
            particles = d.particle_ids().len(),
            constraints = d.constraint_ids().len(),
            "destructible created"
        );
        self.destructibles.push(Some(d));
        Ok(id)
    }

    /// Concrete breakable grid.
    pub fn create_breakable_grid(
        &mut self,
        origin: Vec2,
        width: f32,
        height: f32,
        segments_x: usize,
        segments_y: usize,
        health: f32,
    ) -> Result<DestructibleId, BuildError> {
        self.create_destructible(
            origin,
            width,
            height,
            segments_x,
            segments_y,
            health,
            DestructibleMaterial::Concrete,
        )
    }

    fn add_body(&mut self, body: Body) -> BodyId {
        let id = BodyId(self.bodies.len() as u32);
        debug!(
            id = id.0,
            kind = ?body.kind,
            particles = body.particles.len(),
            constraints = body.constraints.len(),
            "body created"
        );
        self.bodies.push(body);
        id
    }

    pub fn create_rope(&mut self, origin: Vec2, segments: usize, length: f32, mass: f32) -> Result<BodyId, BuildError> {
        self.reserve_object("rope")?;
        let body = bodies::build_rope(&mut self.solver, origin, segments, length, mass)?;
        Ok(self.add_body(body))
    }

    pub fn create_rectangle(
        &mut self,
        origin: Vec2,
        width: f32,
        height: f32,
        mass: f32,
        pinned: bool,
    ) -> Result<BodyId, BuildError> {
        self.reserve_object("rectangle")?;
        let body = bodies::build_rectangle(&mut self.solver, origin, width, height, mass, pinned)?;
        Ok(self.add_body(body))
    }

    pub fn create_ragdoll(&mut self, origin: Vec2, scale: f32) -> Result<BodyId, BuildError> {
        self.reserve_object("ragdoll")?;
        let body = bodies::build_ragdoll(&mut self.solver, origin, scale)?;
        Ok(self.add_body(body))
    }

    pub fn create_fluid_source(&mut self, position: Vec2, kind: FluidKind) -> Result<FluidSourceId, BuildError> {
        self.reserve_object("fluid source")?;
        let id = FluidSourceId(self.sources.len() as u32);
        let source = FluidSource::new(position, kind);
        debug!(id = id.0, ?kind, rate = source.emission_rate, "fluid source created");
        self.sources.push(source);
        Ok(id)
    }

    /// One-shot burst of `count` particles from a source.
    pub fn emit(&mut self, id: FluidSourceId, count: usize) {
        let Some(i) = checked(self.sources.len(), id.0, "fluid source") else {
            return;
        };
        self.sources[i].emit(&mut self.fluid, &mut self.rng, count);
    }

    /// Source-less burst of `count` particles at `position`.
    pub fn splatter(&mut self, position: Vec2, kind: FluidKind, count: usize, speed: f32) {
        fluids::source::spray(&mut self.fluid, &mut self.rng, position, kind, count, speed, 5.0);
    }

    pub fn add_fluid_particle(&mut self, position: Vec2, velocity: Vec2, kind: FluidKind) -> FluidHandle {
        self.fluid.add_particle(position, velocity, kind)
    }

    // ------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------

    pub fn soft_body(&self, id: SoftBodyId) -> Option<&SoftBody> {
        checked(self.soft_bodies.len(), id.0, "soft body").map(|i| &self.soft_bodies[i])
    }

    pub fn soft_bodies(&self) -> &[SoftBody] {
        &self.soft_bodies
    }

    pub fn cloth(&self, id: ClothId) -> Option<&Cloth> {
        checked(self.cloths.len(), id.0, "cloth").map(|i| &self.cloths[i])
    }

    /// Tune wind, tearing or self-collision on one cloth.
    pub fn cloth_mut(&mut self, id: ClothId) -> Option<&mut Cloth> {
        checked(self.cloths.len(), id.0, "cloth").map(move |i| &mut self.cloths[i])
    }

    /// `None` once the structure has been destroyed.
    pub fn destructible(&self, id: DestructibleId) -> Option<&Destructible> {
        checked(self.destructibles.len(), id.0, "destructible").and_then(|i| self.destructibles[i].as_ref())
    }

    pub fn body(&self, id: BodyId) -> Option<&Body> {
        checked(self.bodies.len(), id.0, "body").map(|i| &self.bodies[i])
    }

    pub fn fluid_source(&self, id: FluidSourceId) -> Option<&FluidSource> {
        checked(self.sources.len(), id.0, "fluid source").map(|i| &self.sources[i])
    }

    /// Move a source or change its rate or kind.
    pub fn fluid_source_mut(&mut self, id: FluidSourceId) -> Option<&mut FluidSource> {
        checked(self.sources.len(), id.0, "fluid source").map(move |i| &mut self.sources[i])
    }

    // ------------------------------------------------------------------
    // Interaction
    // ------------------------------------------------------------------

    /// Damage a destructible around `point`. Returns `None` for a structure
    /// that no longer exists.
    pub fn apply_damage(
        &mut self,
        id: DestructibleId,
        point: Vec2,
        amount: f32,
        radius: f32,
    ) -> Option<DamageReport> {
        let slot = checked(self.destructibles.len(), id.0, "destructible")?;
        let d = self.destructibles[slot].as_mut()?;
        let color = d.material.color();
        let mut spawns = Vec::new();
        let report = d.apply_damage(&mut self.solver, point, amount, radius, &mut spawns);
        self.settle_damage(slot, &report, &spawns, point, color);
        Some(report)
    }

    /// Cut every cloth constraint touching node (col, row). Each cut link
    /// raises a `ConstraintTorn` event and sheds debris like a stretch tear.
    pub fn tear_cloth_at(&mut self, id: ClothId, col: usize, row: usize) -> usize {
        let Some(i) = checked(self.cloths.len(), id.0, "cloth") else {
            return 0;
        };
        let cloth = &mut self.cloths[i];
        let torn = cloth.tear_at(&mut self.solver, col, row);
        self.torn_total += torn.len();
        for &position in &torn {
            self.events.push(EngineEvent::ConstraintTorn { position });
            if cloth.tear_debris {
                self.debris
                    .spawn(&mut self.rng, position, position, Vec2::ZERO, CLOTH_DEBRIS_COLOR);
            }
        }
        torn.len()
    }

    /// Radial blast. Core particles get a force scaled by `1 - d / radius`.
    /// Fluid and debris get the velocity change a unit mass would pick up
    /// from that force over one substep at 60 Hz, using the substep count
    /// the quality controller currently runs.
    pub fn apply_explosion(&mut self, center: Vec2, force: f32, radius: f32) {
        self.solver.apply_explosion(center, force, radius);
        let kick = force / (60.0 * self.quality.substeps().max(1) as f32);
        self.fluid.apply_impulse(center, kick, radius);
        self.debris.apply_impulse(center, kick, radius);
    }

    pub fn apply_force(&mut self, id: ParticleId, force: Vec2) {
        if self.check_particle(id) {
            self.solver.apply_force(id, force);
        }
    }

    pub fn set_position(&mut self, id: ParticleId, position: Vec2) {
        if self.check_particle(id) {
            self.solver.set_position(id, position);
        }
    }

    pub fn set_pinned(&mut self, id: ParticleId, pinned: bool) {
        if self.check_particle(id) {
            self.solver.set_pinned(id, pinned);
        }
    }

    pub fn position(&self, id: ParticleId) -> Option<Vec2> {
        if self.check_particle(id) {
            self.solver.position(id)
        } else {
            None
        }
    }

    /// Live core particles within `radius` of `position`.
    pub fn nearby(&self, position: Vec2, radius: f32) -> Vec<ParticleId> {
        self.solver.nearby(position, radius)
    }

    /// Decorative breakage pattern. Does not touch the simulation.
    pub fn fracture_surface(&mut self, center: Vec2, size: f32, pattern: FracturePattern) -> Vec<Fragment> {
        fracture::fracture_surface(center, size, pattern, &mut self.rng)
    }

    fn check_particle(&self, id: ParticleId) -> bool {
        checked(self.solver.particles.len(), id.0, "particle").is_some()
    }

    // ------------------------------------------------------------------
    // Observability
    // ------------------------------------------------------------------

    pub fn stats(&self) -> Stats {
        Stats {
            active_particles: self.solver.active_particle_count(),
            active_constraints: self.solver.active_constraint_count(),
            fluid_particles: self.fluid.len(),
            soft_bodies: self.soft_bodies.len(),
            cloths: self.cloths.len(),
            destructibles: self.destructibles.iter().filter(|d| d.is_some()).count(),
            bodies: self.bodies.len(),
            fluid_sources: self.sources.len(),
            debris: self.debris.len(),
            occupied_cells: self.solver.grid().occupied_cells(),
            torn_constraints: self.torn_total,
            destroyed: self.destroyed_total,
            substeps: self.quality.substeps(),
            relaxation_passes: self.quality.passes(),
            last_update_ms: self.last_update_ms,
        }
    }

    /// Events since the last drain, oldest first.
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        self.events.drain()
    }

    pub fn particle_vertices(&self) -> Vec<ParticleVertex> {
        snapshot::particle_vertices(&self.solver)
    }

    pub fn line_segments(&self) -> Vec<LineSegment> {
        snapshot::line_segments(&self.solver)
    }

    pub fn soft_outlines(&self) -> Vec<SoftOutline> {
        self.soft_bodies
            .iter()
            .map(|b| SoftOutline {
                points: b.outline(&self.solver.particles),
                color: b.material.color,
                glow: b.material.glow,
            })
            .collect()
    }

    pub fn fluid_vertices(&self) -> Vec<FluidVertex> {
        snapshot::fluid_vertices(&self.fluid)
    }

    pub fn fragment_instances(&self) -> Vec<FragmentInstance> {
        snapshot::fragment_instances(&self.debris)
    }

    /// Reset every subsystem to empty. The rng is reseeded so a cleared
    /// engine replays like a fresh one.
    pub fn clear(&mut self) {
        self.solver.clear();
        self.fluid.clear();
        self.debris.clear();
        self.soft_bodies.clear();
        self.cloths.clear();
        self.destructibles.clear();
        self.bodies.clear();
        self.sources.clear();
        self.events.clear();
        self.quality.reset();
        self.rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        self.time = 0.0;
        self.frame = 0;
        self.torn_total = 0;
        self.destroyed_total = 0;
        self.last_update_ms = 0.0;
        info!("engine cleared");
    }

    pub fn bounds(&self) -> Bounds {
        self.config.bounds
    }
}

/// Index for a handle, or `None` if it was never issued. Debug builds trap.
fn checked(len: usize, index: u32, what: &'static str) -> Option<usize> {
    let i = index as usize;
    debug_assert!(i < len, "{} handle {} out of range (len {})", what, index, len);
    if i < len {
        Some(i)
    } else {
        warn!(what, index, "ignoring invalid handle");
        None
    }
}

fn destructible_center(d: &Destructible, particles: &ParticleSet) -> Vec2 {
    d.aabb(particles).map_or(d.origin, |(lo, hi)| (lo + hi) * 0.5)
}

/// Push a fluid particle and a rim particle apart to `min_dist`, split by
/// inverse mass. Positions only. The fluid side stays inside `bounds`.
#[inline]
fn push_apart(
    fluid_pos: &mut Vec2,
    particles: &mut ParticleSet,
    id: ParticleId,
    fluid_weight: f32,
    min_dist: f32,
    bounds: &Bounds,
) {
    let i = id.index();
    if !particles.active[i] {
        return;
    }
    let delta = *fluid_pos - particles.position[i];
    let dist_sq = delta.length_squared();
    if dist_sq >= min_dist * min_dist || dist_sq < 1e-12 {
        return;
    }
    let soft_weight = if particles.pinned[i] { 0.0 } else { particles.inv_mass[i] };
    let wsum = fluid_weight + soft_weight;
    if wsum < 1e-10 {
        return;
    }
    let dist = dist_sq.sqrt();
    let push = delta / dist * (min_dist - dist);
    *fluid_pos = (*fluid_pos + push * (fluid_weight / wsum)).clamp(bounds.min, bounds.max);
    particles.position[i] -= push * (soft_weight / wsum);
}

#[inline]
fn separate(particles: &mut ParticleSet, a: ParticleId, b: ParticleId, min_dist: f32) {
    let (ia, ib) = (a.index(), b.index());
    if !particles.active[ia] || !particles.active[ib] {
        return;
    }
    let delta = particles.position[ia] - particles.position[ib];
    let dist_sq = delta.length_squared();
    if dist_sq >= min_dist * min_dist || dist_sq < 1e-12 {
        return;
    }
    let wa = particles.inv_mass[ia];
    let wb = particles.inv_mass[ib];
    let wsum = wa + wb;
    if wsum < 1e-10 {
        return;
    }
    let dist = dist_sq.sqrt();
    let push = delta / dist * (min_dist - dist);
    particles.position[ia] += push * (wa / wsum);
    particles.position[ib] -= push * (wb / wsum);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> Engine {
        Engine::new(EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = EngineConfig { relaxation_passes: 0, ..Default::default() };
        assert_eq!(Engine::new(config).err(), Some(ConfigError::ZeroRelaxationPasses));
    }

    #[test]
    fn test_object_cap_refuses_build() {
        let mut e = Engine::new(EngineConfig { max_objects: 2, ..Default::default() }).unwrap();
        e.create_rope(Vec2::new(100.0, 50.0), 4, 40.0, 1.0).unwrap();
        e.create_fluid_source(Vec2::new(200.0, 50.0), FluidKind::Water).unwrap();
        let err = e.create_soft_body(Vec2::new(300.0, 300.0), SoftMaterial::FLESH).unwrap_err();
        assert_eq!(err, BuildError::CapacityExceeded { limit: 2 });
        assert_eq!(e.stats().soft_bodies, 0);
    }

    #[test]
    fn test_fluid_pushes_rim_particle_by_inverse_mass() {
        let mut particles = ParticleSet::new();
        let id = particles.push(Vec2::ZERO, 1.0, false);
        let mut fluid = Vec2::new(3.0, 0.0);
        // fluid weight 1, soft weight 1: each moves half of the 6 px overlap
        let open = Bounds::new(Vec2::splat(-100.0), Vec2::splat(100.0));
        push_apart(&mut fluid, &mut particles, id, 1.0, 9.0, &open);
        assert!((fluid.x - 6.0).abs() < 1e-5);
        assert!((particles.position[0].x + 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_pinned_rim_particle_is_not_pushed() {
        let mut particles = ParticleSet::new();
        let id = particles.push(Vec2::ZERO, 1.0, true);
        let mut fluid = Vec2::new(3.0, 0.0);
        let open = Bounds::new(Vec2::splat(-100.0), Vec2::splat(100.0));
        push_apart(&mut fluid, &mut particles, id, 4.0, 9.0, &open);
        assert_eq!(particles.position[0], Vec2::ZERO);
        assert!((fluid.x - 9.0).abs() < 1e-5);
    }

    #[test]
    fn test_events_drain_once() {
        let mut e = engine();
        let id = e
            .create_breakable_grid(Vec2::new(200.0, 200.0), 20.0, 20.0, 2, 2, 100.0)
            .unwrap();
        e.apply_damage(id, Vec2::new(210.0, 210.0), 1.0e4, 100.0);
        let events = e.drain_events();
        assert!(events.contains(&EngineEvent::Destroyed { id }));
        assert!(e.drain_events().is_empty());
    }

    #[test]
    fn test_event_queue_drops_oldest_at_cap() {
        let mut q = EventQueue::new(3);
        for i in 0..5 {
            q.push(EngineEvent::PieceBroken { position: Vec2::splat(i as f32) });
        }
        assert_eq!(q.events.len(), 3);
        assert_eq!(q.drain()[0], EngineEvent::PieceBroken { position: Vec2::splat(2.0) });
        assert!(q.events.is_empty());
    }
}
