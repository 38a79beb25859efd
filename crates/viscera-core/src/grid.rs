use glam::Vec2;

const EMPTY: u32 = u32::MAX;

/// Uniform 2D spatial hash for neighbour queries.
///
/// Built with a counting sort: count entries per bucket -> prefix sum ->
/// scatter. The table grows with the entity count so buckets stay short.
/// Entries are indices into the slice passed to [`SpatialHashGrid::rebuild`].
pub struct SpatialHashGrid {
    cell_size: f32,
    inv_cell_size: f32,
    table_size: usize,
    /// cell_count[hash] = number of entries in the bucket
    cell_count: Vec<u32>,
    /// cell_start[hash] = offset of the bucket in sorted_indices
    cell_start: Vec<u32>,
    sorted_indices: Vec<u32>,
    /// Bucket per entry, EMPTY for excluded entries
    entry_hashes: Vec<u32>,
    /// Positions at build time, for exact distance filtering
    positions: Vec<Vec2>,
    occupied: usize,
}

impl SpatialHashGrid {
    pub fn new(cell_size: f32) -> Self {
        let cell_size = cell_size.max(1e-3);
        Self {
            cell_size,
            inv_cell_size: 1.0 / cell_size,
            table_size: 0,
            cell_count: Vec::new(),
            cell_start: Vec::new(),
            sorted_indices: Vec::new(),
            entry_hashes: Vec::new(),
            positions: Vec::new(),
            occupied: 0,
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Number of entries indexed by the last build.
    pub fn len(&self) -> usize {
        self.sorted_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted_indices.is_empty()
    }

    /// Non-empty buckets after the last build. Distinct cells that hash to the
    /// same bucket count once, so this is a lower bound on occupied cells.
    pub fn occupied_cells(&self) -> usize {
        self.occupied
    }

    /// Index every position.
    pub fn rebuild(&mut self, positions: &[Vec2], cell_size: f32) {
        self.rebuild_where(positions, cell_size, |_| true);
    }

    /// Index the positions for which `include` returns true. Indices still
    /// refer to the full slice.
    pub fn rebuild_where<F: Fn(usize) -> bool>(
        &mut self,
        positions: &[Vec2],
        cell_size: f32,
        include: F,
    ) {
        let cell_size = cell_size.max(1e-3);
        self.cell_size = cell_size;
        self.inv_cell_size = 1.0 / cell_size;

        let count = positions.len();
        let table_size = (count * 2).next_power_of_two().max(64);
        if table_size != self.table_size {
            self.table_size = table_size;
            self.cell_count.resize(table_size, 0);
            self.cell_start.resize(table_size, 0);
        }
        self.positions.clear();
        self.positions.extend_from_slice(positions);

        // 1. Clear counts
        self.cell_count.iter_mut().for_each(|v| *v = 0);

        // 2. Hash every included entry and count per bucket
        self.entry_hashes.clear();
        let mut included = 0usize;
        for (i, p) in positions.iter().enumerate() {
            if !include(i) || !p.is_finite() {
                self.entry_hashes.push(EMPTY);
                continue;
            }
            let (cx, cy) = self.cell_coords(*p);
            let h = self.hash_cell(cx, cy);
            self.entry_hashes.push(h as u32);
            self.cell_count[h] += 1;
            included += 1;
        }

        // 3. Prefix sum -> bucket starts
        let mut running = 0u32;
        self.occupied = 0;
        for k in 0..self.table_size {
            self.cell_start[k] = running;
            running += self.cell_count[k];
            if self.cell_count[k] > 0 {
                self.occupied += 1;
            }
        }

        // 4. Reuse counts as scatter offsets
        self.cell_count.iter_mut().for_each(|v| *v = 0);

        // 5. Scatter
        self.sorted_indices.clear();
        self.sorted_indices.resize(included, 0);
        for (i, &h) in self.entry_hashes.iter().enumerate() {
            if h == EMPTY {
                continue;
            }
            let h = h as usize;
            let idx = self.cell_start[h] + self.cell_count[h];
            self.sorted_indices[idx as usize] = i as u32;
            self.cell_count[h] += 1;
        }
    }

    /// Call `callback` with every indexed entry in the buckets covering the
    /// square around `pos`. Each bucket is visited once, but entries may lie
    /// outside `radius`; the caller does the distance check.
    ///
    /// A square spanning at least as many cells as the table has buckets
    /// visits every bucket instead, so any radius (including infinity) is
    /// bounded by the table size.
    pub fn for_each_candidate<F: FnMut(u32)>(&self, pos: Vec2, radius: f32, mut callback: F) {
        if self.table_size == 0 || !pos.is_finite() {
            return;
        }
        // f32 -> u64 saturates, and NaN maps to 0
        let reach = (radius.max(0.0) * self.inv_cell_size).ceil() as u64;
        let side = reach.saturating_mul(2).saturating_add(1);
        if side.saturating_mul(side) >= self.table_size as u64 {
            for &idx in &self.sorted_indices {
                callback(idx);
            }
            return;
        }

        // side² < table_size, so reach fits comfortably in i32
        let reach = reach as i32;
        let (cx, cy) = self.cell_coords(pos);
        let mut buckets: Vec<usize> = Vec::with_capacity((side * side) as usize);
        for dy in -reach..=reach {
            for dx in -reach..=reach {
                buckets.push(self.hash_cell(cx.wrapping_add(dx), cy.wrapping_add(dy)));
            }
        }
        buckets.sort_unstable();
        buckets.dedup();

        for h in buckets {
            let start = self.cell_start[h] as usize;
            let end = start + self.cell_count[h] as usize;
            for &idx in &self.sorted_indices[start..end] {
                callback(idx);
            }
        }
    }

    /// Entries within `radius` of `pos` (inclusive), using build-time positions.
    pub fn query(&self, pos: Vec2, radius: f32) -> Vec<u32> {
        let mut out = Vec::new();
        self.query_into(pos, radius, &mut out);
        out
    }

    /// Like [`query`](Self::query) but appends to a reusable buffer.
    pub fn query_into(&self, pos: Vec2, radius: f32, out: &mut Vec<u32>) {
        let r2 = radius * radius;
        self.for_each_candidate(pos, radius, |idx| {
            if self.positions[idx as usize].distance_squared(pos) <= r2 {
                out.push(idx);
            }
        });
    }

    #[inline]
    fn hash_cell(&self, cx: i32, cy: i32) -> usize {
        let h = (cx as u32).wrapping_mul(73856093) ^ (cy as u32).wrapping_mul(19349663);
        (h as usize) & (self.table_size - 1)
    }

    #[inline]
    fn cell_coords(&self, pos: Vec2) -> (i32, i32) {
        (
            (pos.x * self.inv_cell_size).floor() as i32,
            (pos.y * self.inv_cell_size).floor() as i32,
        )
    }
}
