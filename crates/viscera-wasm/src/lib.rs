use glam::Vec2;
use viscera_core::bounds::Bounds;
use viscera_core::cloth::PinPolicy;
use viscera_core::fluids::source::FluidSourceId;
use viscera_core::materials::{DestructibleMaterial, FluidKind, SoftMaterial};
use viscera_core::snapshot::{pack_rgba, FluidVertex, FragmentInstance, LineSegment, ParticleVertex};
use viscera_core::{ClothId, DestructibleId, Engine, EngineConfig, EngineEvent};
use wasm_bindgen::prelude::*;

fn js_err(e: impl std::fmt::Display) -> JsError {
    JsError::new(&e.to_string())
}

fn destructible_material(v: u32) -> DestructibleMaterial {
    match v {
        1 => DestructibleMaterial::Wood,
        2 => DestructibleMaterial::Glass,
        3 => DestructibleMaterial::Metal,
        4 => DestructibleMaterial::Flesh,
        _ => DestructibleMaterial::Concrete,
    }
}

fn fluid_kind(v: u32) -> FluidKind {
    FluidKind::from_u32(v).unwrap_or(FluidKind::Blood)
}

fn byte_len<T: bytemuck::Pod>(v: &[T]) -> usize {
    bytemuck::cast_slice::<T, u8>(v).len()
}

/// Engine handle for a JS host. Render buffers are refreshed after every
/// `update` and read through raw pointers into wasm memory.
#[wasm_bindgen]
pub struct PhysicsWorld {
    engine: Engine,
    particles: Vec<ParticleVertex>,
    lines: Vec<LineSegment>,
    fluid: Vec<FluidVertex>,
    fragments: Vec<FragmentInstance>,
    /// Flattened outlines as x, y pairs. `outline_offsets[i]..outline_offsets[i + 1]`
    /// indexes points of body i.
    outlines: Vec<f32>,
    outline_offsets: Vec<u32>,
    events: Vec<f32>,
}

#[wasm_bindgen]
impl PhysicsWorld {
    #[wasm_bindgen(constructor)]
    pub fn new(width: f32, height: f32, seed: u32) -> Result<PhysicsWorld, JsError> {
        let config = EngineConfig {
            bounds: Bounds::new(Vec2::ZERO, Vec2::new(width, height)),
            seed: seed as u64,
            ..Default::default()
        };
        let engine = Engine::new(config).map_err(js_err)?;
        web_sys::console::log_1(&format!("WASM PhysicsWorld created: {}x{} seed {}", width, height, seed).into());

        let mut world = PhysicsWorld {
            engine,
            particles: Vec::new(),
            lines: Vec::new(),
            fluid: Vec::new(),
            fragments: Vec::new(),
            outlines: Vec::new(),
            outline_offsets: vec![0],
            events: Vec::new(),
        };
        world.write_render_output();
        Ok(world)
    }

    /// Steps the engine and returns the elapsed wall time in ms.
    #[wasm_bindgen]
    pub fn update(&mut self, dt: f32) -> f32 {
        let start = js_sys::Date::now();
        self.engine.update(dt);
        let elapsed = (js_sys::Date::now() - start) as f32;
        self.engine.record_frame_time(elapsed);
        self.write_render_output();
        elapsed
    }

    // Factories return the new handle.

    #[wasm_bindgen]
    pub fn create_soft_body(&mut self, x: f32, y: f32, material: &str) -> Result<u32, JsError> {
        let id = self
            .engine
            .create_soft_body(Vec2::new(x, y), SoftMaterial::by_name(material))
            .map_err(js_err)?;
        Ok(id.0)
    }

    #[wasm_bindgen]
    pub fn create_soft_circle(
        &mut self,
        x: f32,
        y: f32,
        radius: f32,
        segments: usize,
        mass: f32,
        pressure: f32,
    ) -> Result<u32, JsError> {
        let id = self
            .engine
            .create_soft_circle(Vec2::new(x, y), radius, segments, mass, pressure)
            .map_err(js_err)?;
        Ok(id.0)
    }

    #[wasm_bindgen]
    pub fn create_slime(&mut self, x: f32, y: f32, radius: f32) -> Result<u32, JsError> {
        Ok(self.engine.create_slime(Vec2::new(x, y), radius).map_err(js_err)?.0)
    }

    /// `pin_every` of 0 leaves the cloth free, 1 pins the whole top row.
    #[wasm_bindgen]
    pub fn create_cloth(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        segments_x: usize,
        segments_y: usize,
        pin_every: usize,
    ) -> Result<u32, JsError> {
        let pin = match pin_every {
            0 => PinPolicy::None,
            1 => PinPolicy::TopRow,
            n => PinPolicy::TopEvery(n),
        };
        let id = self
            .engine
            .create_cloth(Vec2::new(x, y), width, height, segments_x, segments_y, pin)
            .map_err(js_err)?;
        Ok(id.0)
    }

    /// Non-positive `health` takes the material default.
    #[allow(clippy::too_many_arguments)]
    #[wasm_bindgen]
    pub fn create_destructible(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        segments_x: usize,
        segments_y: usize,
        health: f32,
        material: u32,
    ) -> Result<u32, JsError> {
        let material = destructible_material(material);
        let health = if health > 0.0 { health } else { material.default_health() };
        let id = self
            .engine
            .create_destructible(Vec2::new(x, y), width, height, segments_x, segments_y, health, material)
            .map_err(js_err)?;
        Ok(id.0)
    }

    #[wasm_bindgen]
    pub fn create_rope(&mut self, x: f32, y: f32, segments: usize, length: f32) -> Result<u32, JsError> {
        Ok(self.engine.create_rope(Vec2::new(x, y), segments, length, 1.0).map_err(js_err)?.0)
    }

    #[wasm_bindgen]
    pub fn create_ragdoll(&mut self, x: f32, y: f32, scale: f32) -> Result<u32, JsError> {
        Ok(self.engine.create_ragdoll(Vec2::new(x, y), scale).map_err(js_err)?.0)
    }

    #[wasm_bindgen]
    pub fn create_fluid_source(&mut self, x: f32, y: f32, kind: u32) -> Result<u32, JsError> {
        let id = self
            .engine
            .create_fluid_source(Vec2::new(x, y), fluid_kind(kind))
            .map_err(js_err)?;
        Ok(id.0)
    }

    #[wasm_bindgen]
    pub fn set_source_active(&mut self, id: u32, active: bool) {
        if let Some(source) = self.engine.fluid_source_mut(FluidSourceId(id)) {
            source.active = active;
        }
    }

    #[wasm_bindgen]
    pub fn splatter(&mut self, x: f32, y: f32, kind: u32, count: usize, speed: f32) {
        self.engine.splatter(Vec2::new(x, y), fluid_kind(kind), count, speed);
    }

    // Interaction

    /// Returns false once the structure is gone.
    #[wasm_bindgen]
    pub fn apply_damage(&mut self, id: u32, x: f32, y: f32, amount: f32, radius: f32) -> bool {
        self.engine
            .apply_damage(DestructibleId(id), Vec2::new(x, y), amount, radius)
            .is_some()
    }

    #[wasm_bindgen]
    pub fn tear_cloth_at(&mut self, id: u32, col: usize, row: usize) -> usize {
        self.engine.tear_cloth_at(ClothId(id), col, row)
    }

    #[wasm_bindgen]
    pub fn explosion(&mut self, x: f32, y: f32, force: f32, radius: f32) {
        self.engine.apply_explosion(Vec2::new(x, y), force, radius);
    }

    /// Drag the nearest live particle within `radius` to (x, y).
    #[wasm_bindgen]
    pub fn drag(&mut self, x: f32, y: f32, radius: f32) -> bool {
        let target = Vec2::new(x, y);
        let nearest = self
            .engine
            .nearby(target, radius)
            .into_iter()
            .filter_map(|id| self.engine.position(id).map(|p| (id, p.distance_squared(target))))
            .min_by(|a, b| a.1.total_cmp(&b.1));
        match nearest {
            Some((id, _)) => {
                self.engine.set_position(id, target);
                true
            }
            None => false,
        }
    }

    #[wasm_bindgen]
    pub fn clear(&mut self) {
        self.engine.clear();
        self.write_render_output();
    }

    // Stats

    #[wasm_bindgen]
    pub fn particle_count(&self) -> usize {
        self.engine.stats().active_particles
    }

    #[wasm_bindgen]
    pub fn constraint_count(&self) -> usize {
        self.engine.stats().active_constraints
    }

    #[wasm_bindgen]
    pub fn fluid_count(&self) -> usize {
        self.engine.stats().fluid_particles
    }

    #[wasm_bindgen]
    pub fn debris_count(&self) -> usize {
        self.engine.stats().debris
    }

    #[wasm_bindgen]
    pub fn torn_count(&self) -> usize {
        self.engine.stats().torn_constraints
    }

    #[wasm_bindgen]
    pub fn destroyed_count(&self) -> usize {
        self.engine.stats().destroyed
    }

    #[wasm_bindgen]
    pub fn substeps(&self) -> u32 {
        self.engine.stats().substeps
    }

    #[wasm_bindgen]
    pub fn relaxation_passes(&self) -> u32 {
        self.engine.stats().relaxation_passes
    }

    #[wasm_bindgen]
    pub fn last_update_ms(&self) -> f32 {
        self.engine.stats().last_update_ms
    }

    /// Frame time as the quality controller sees it, smoothed.
    #[wasm_bindgen]
    pub fn smoothed_update_ms(&self) -> f32 {
        self.engine.quality().smoothed_ms()
    }

    #[wasm_bindgen]
    pub fn set_adaptive_quality(&mut self, enabled: bool, budget_ms: f32) {
        let quality = self.engine.quality_mut();
        quality.enabled = enabled;
        if budget_ms > 0.0 {
            quality.budget_ms = budget_ms;
        }
    }

    // Fluid palette, indexed by the `kind` field of a fluid vertex.

    #[wasm_bindgen]
    pub fn fluid_color(kind: u32) -> u32 {
        pack_rgba(fluid_kind(kind).material().color)
    }

    #[wasm_bindgen]
    pub fn fluid_glow(kind: u32) -> bool {
        fluid_kind(kind).material().glow
    }

    // Render buffers

    #[wasm_bindgen]
    pub fn particles_ptr(&self) -> *const f32 {
        self.particles.as_ptr() as *const f32
    }

    #[wasm_bindgen]
    pub fn particles_byte_length(&self) -> usize {
        byte_len(&self.particles)
    }

    #[wasm_bindgen]
    pub fn lines_ptr(&self) -> *const f32 {
        self.lines.as_ptr() as *const f32
    }

    #[wasm_bindgen]
    pub fn lines_byte_length(&self) -> usize {
        byte_len(&self.lines)
    }

    #[wasm_bindgen]
    pub fn fluid_ptr(&self) -> *const f32 {
        self.fluid.as_ptr() as *const f32
    }

    #[wasm_bindgen]
    pub fn fluid_byte_length(&self) -> usize {
        byte_len(&self.fluid)
    }

    #[wasm_bindgen]
    pub fn fragments_ptr(&self) -> *const f32 {
        self.fragments.as_ptr() as *const f32
    }

    #[wasm_bindgen]
    pub fn fragments_byte_length(&self) -> usize {
        byte_len(&self.fragments)
    }

    #[wasm_bindgen]
    pub fn outline_points(&self) -> Vec<f32> {
        self.outlines.clone()
    }

    #[wasm_bindgen]
    pub fn outline_offsets(&self) -> Vec<u32> {
        self.outline_offsets.clone()
    }

    /// Events since the last call as [kind, x, y] triples: 0 torn, 1 broken,
    /// 2 destroyed (x holds the id).
    #[wasm_bindgen]
    pub fn take_events(&mut self) -> Vec<f32> {
        std::mem::take(&mut self.events)
    }

    fn write_render_output(&mut self) {
        self.particles = self.engine.particle_vertices();
        self.lines = self.engine.line_segments();
        self.fluid = self.engine.fluid_vertices();
        self.fragments = self.engine.fragment_instances();

        self.outlines.clear();
        self.outline_offsets.clear();
        self.outline_offsets.push(0);
        for outline in self.engine.soft_outlines() {
            for p in &outline.points {
                self.outlines.extend_from_slice(&[p.x, p.y]);
            }
            self.outline_offsets.push((self.outlines.len() / 2) as u32);
        }

        for event in self.engine.drain_events() {
            let triple = match event {
                EngineEvent::ConstraintTorn { position } => [0.0, position.x, position.y],
                EngineEvent::PieceBroken { position } => [1.0, position.x, position.y],
                EngineEvent::Destroyed { id } => [2.0, id.0 as f32, 0.0],
            };
            self.events.extend_from_slice(&triple);
        }
    }
}
