use glam::Vec2;

/// Axis-aligned simulation box. Everything that moves is kept inside it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl Bounds {
    pub const fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// Clamp a Verlet particle and reflect its implicit velocity.
    ///
    /// The velocity component normal to the wall it hit is reversed and scaled
    /// by `bounce`. The tangential component is untouched. Returns true if the
    /// particle touched a wall.
    pub fn collide_verlet(&self, pos: &mut Vec2, prev: &mut Vec2, bounce: f32) -> bool {
        let mut hit = false;
        if pos.x < self.min.x {
            let vx = pos.x - prev.x;
            pos.x = self.min.x;
            prev.x = pos.x + vx * bounce;
            hit = true;
        } else if pos.x > self.max.x {
            let vx = pos.x - prev.x;
            pos.x = self.max.x;
            prev.x = pos.x + vx * bounce;
            hit = true;
        }
        if pos.y < self.min.y {
            let vy = pos.y - prev.y;
            pos.y = self.min.y;
            prev.y = pos.y + vy * bounce;
            hit = true;
        } else if pos.y > self.max.y {
            let vy = pos.y - prev.y;
            pos.y = self.max.y;
            prev.y = pos.y + vy * bounce;
            hit = true;
        }
        hit
    }

    /// Clamp a particle with explicit velocity, reflecting the normal component.
    pub fn collide_velocity(&self, pos: &mut Vec2, vel: &mut Vec2, bounce: f32) -> bool {
        let mut hit = false;
        if pos.x < self.min.x {
            pos.x = self.min.x;
            vel.x = -vel.x * bounce;
            hit = true;
        } else if pos.x > self.max.x {
            pos.x = self.max.x;
            vel.x = -vel.x * bounce;
            hit = true;
        }
        if pos.y < self.min.y {
            pos.y = self.min.y;
            vel.y = -vel.y * bounce;
            hit = true;
        } else if pos.y > self.max.y {
            pos.y = self.max.y;
            vel.y = -vel.y * bounce;
            hit = true;
        }
        hit
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::new(Vec2::new(10.0, 10.0), Vec2::new(1270.0, 710.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verlet_floor_reflects_velocity() {
        let bounds = Bounds::new(Vec2::ZERO, Vec2::new(100.0, 100.0));
        // Moving down at 10 px/step, 5 px past the floor
        let mut pos = Vec2::new(50.0, 105.0);
        let mut prev = Vec2::new(48.0, 95.0);
        assert!(bounds.collide_verlet(&mut pos, &mut prev, 0.5));

        assert_eq!(pos.y, 100.0);
        let vel = pos - prev;
        assert!((vel.y + 5.0).abs() < 1e-5, "normal velocity should flip and halve, got {}", vel.y);
        assert!((vel.x - 2.0).abs() < 1e-5, "tangential velocity kept, got {}", vel.x);
    }

    #[test]
    fn test_velocity_wall_reflects() {
        let bounds = Bounds::new(Vec2::ZERO, Vec2::new(100.0, 100.0));
        let mut pos = Vec2::new(-3.0, 50.0);
        let mut vel = Vec2::new(-20.0, 4.0);
        assert!(bounds.collide_velocity(&mut pos, &mut vel, 0.5));
        assert_eq!(pos.x, 0.0);
        assert_eq!(vel, Vec2::new(10.0, 4.0));
    }

    #[test]
    fn test_inside_is_untouched() {
        let bounds = Bounds::new(Vec2::ZERO, Vec2::new(100.0, 100.0));
        let mut pos = Vec2::new(10.0, 10.0);
        let mut prev = Vec2::new(9.0, 9.0);
        assert!(!bounds.collide_verlet(&mut pos, &mut prev, 0.8));
        assert_eq!(pos, Vec2::new(10.0, 10.0));
        assert_eq!(prev, Vec2::new(9.0, 9.0));
    }
}
