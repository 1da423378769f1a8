//! # Simplex Noise
//!
//! Deterministic 2D and 3D simplex noise.
//!
//! - 2D drives the height field and the cloud layer.
//! - 3D drives resource veins.
//!
//! ## Determinism Guarantee
//!
//! Given the same [`WorldSeed`], a [`SimplexNoise`] produces exactly the same
//! values on every platform. The permutation table is shuffled by a ChaCha
//! stream, never by a platform RNG.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// World seed for deterministic generation.
///
/// All procedural generation derives from this seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WorldSeed(u64);

impl WorldSeed {
    /// Creates a new world seed.
    #[inline]
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self(seed)
    }

    /// Returns the raw seed value.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Derives a sub-seed for a specific purpose (e.g. tree placement).
    ///
    /// Streams derived with different purposes are uncorrelated.
    #[inline]
    #[must_use]
    pub const fn derive(self, purpose: u64) -> Self {
        let mut hash = self.0 ^ purpose.wrapping_mul(0x9E37_79B9_7F4A_7C15);
        hash = hash.wrapping_mul(0x517c_c1b7_2722_0a95);
        hash ^= hash >> 32;
        hash = hash.wrapping_mul(0xff51_afd7_ed55_8ccd);
        hash ^= hash >> 29;
        Self(hash)
    }

    /// Derives a sub-seed bound to a chunk column `(cx, cz)`.
    #[inline]
    #[must_use]
    pub const fn derive_chunk(self, cx: i32, cz: i32) -> Self {
        let packed = ((cx as u32 as u64) << 32) | (cz as u32 as u64);
        self.derive(packed)
    }
}

impl Default for WorldSeed {
    fn default() -> Self {
        Self(0)
    }
}

/// 12 edge-midpoint gradients of a cube. The 2D sampler uses the first two
/// components.
const GRADIENTS: [[i8; 3]; 12] = [
    [1, 1, 0], [-1, 1, 0], [1, -1, 0], [-1, -1, 0],
    [1, 0, 1], [-1, 0, 1], [1, 0, -1], [-1, 0, -1],
    [0, 1, 1], [0, -1, 1], [0, 1, -1], [0, -1, -1],
];

/// Pre-computed permutation table for noise.
///
/// This is computed once from the seed and reused.
struct PermutationTable {
    /// 256 entries, doubled to avoid index wrapping.
    perm: [u8; 512],
}

impl PermutationTable {
    fn new(seed: WorldSeed) -> Self {
        let mut perm = [0u8; 512];
        for (i, slot) in perm.iter_mut().take(256).enumerate() {
            *slot = i as u8;
        }

        // Fisher-Yates with a seeded stream
        let mut rng = ChaCha8Rng::seed_from_u64(seed.value());
        for i in (1..256).rev() {
            let j = rng.gen_range(0..=i);
            perm.swap(i, j);
        }

        for i in 0..256 {
            perm[256 + i] = perm[i];
        }

        Self { perm }
    }

    #[inline]
    fn get(&self, index: usize) -> usize {
        usize::from(self.perm[index & 511])
    }

    #[inline]
    fn gradient(&self, hash: usize) -> [f64; 3] {
        let g = GRADIENTS[hash % 12];
        [f64::from(g[0]), f64::from(g[1]), f64::from(g[2])]
    }
}

/// Simplex noise generator.
///
/// Produces smooth, continuous values in `[-1, 1]`.
///
/// # Example
///
/// ```rust
/// use strata_procedural::noise::{SimplexNoise, WorldSeed};
///
/// let noise = SimplexNoise::new(WorldSeed::new(42));
/// let h = noise.sample(100.5, 200.3);
/// let v = noise.sample3(1.0, 2.0, 3.0);
/// assert!((-1.0..=1.0).contains(&h));
/// assert!((-1.0..=1.0).contains(&v));
/// ```
pub struct SimplexNoise {
    perm_table: PermutationTable,
}

impl SimplexNoise {
    /// Skewing factor for 2D simplex grid.
    const F2: f64 = 0.366_025_403_784_438_6; // (sqrt(3) - 1) / 2
    /// Unskewing factor for 2D simplex grid.
    const G2: f64 = 0.211_324_865_405_187_1; // (3 - sqrt(3)) / 6
    /// Skewing factor for 3D simplex grid.
    const F3: f64 = 1.0 / 3.0;
    /// Unskewing factor for 3D simplex grid.
    const G3: f64 = 1.0 / 6.0;

    /// Creates a new simplex noise generator from a seed.
    #[must_use]
    pub fn new(seed: WorldSeed) -> Self {
        Self {
            perm_table: PermutationTable::new(seed),
        }
    }

    /// Samples 2D simplex noise.
    ///
    /// # Returns
    ///
    /// A value in the range [-1, 1].
    #[must_use]
    pub fn sample(&self, x: f64, y: f64) -> f64 {
        let skew = (x + y) * Self::F2;
        let i = fast_floor(x + skew);
        let j = fast_floor(y + skew);

        let unskew = f64::from(i + j) * Self::G2;
        let x0 = x - (f64::from(i) - unskew);
        let y0 = y - (f64::from(j) - unskew);

        // Upper or lower triangle
        let (i1, j1) = if x0 > y0 { (1, 0) } else { (0, 1) };

        let x1 = x0 - f64::from(i1) + Self::G2;
        let y1 = y0 - f64::from(j1) + Self::G2;
        let x2 = x0 - 1.0 + 2.0 * Self::G2;
        let y2 = y0 - 1.0 + 2.0 * Self::G2;

        let ii = (i & 255) as usize;
        let jj = (j & 255) as usize;
        let p = &self.perm_table;

        let gi0 = p.get(ii + p.get(jj));
        let gi1 = p.get(ii + i1 as usize + p.get(jj + j1 as usize));
        let gi2 = p.get(ii + 1 + p.get(jj + 1));

        let n0 = self.corner2(x0, y0, gi0);
        let n1 = self.corner2(x1, y1, gi1);
        let n2 = self.corner2(x2, y2, gi2);

        (70.0 * (n0 + n1 + n2)).clamp(-1.0, 1.0)
    }

    /// Samples 3D simplex noise.
    ///
    /// # Returns
    ///
    /// A value in the range [-1, 1].
    #[must_use]
    pub fn sample3(&self, x: f64, y: f64, z: f64) -> f64 {
        let skew = (x + y + z) * Self::F3;
        let i = fast_floor(x + skew);
        let j = fast_floor(y + skew);
        let k = fast_floor(z + skew);

        let unskew = f64::from(i + j + k) * Self::G3;
        let x0 = x - (f64::from(i) - unskew);
        let y0 = y - (f64::from(j) - unskew);
        let z0 = z - (f64::from(k) - unskew);

        // Which of the six tetrahedra we are in
        let (o1, o2): ([usize; 3], [usize; 3]) = if x0 >= y0 {
            if y0 >= z0 {
                ([1, 0, 0], [1, 1, 0])
            } else if x0 >= z0 {
                ([1, 0, 0], [1, 0, 1])
            } else {
                ([0, 0, 1], [1, 0, 1])
            }
        } else if y0 < z0 {
            ([0, 0, 1], [0, 1, 1])
        } else if x0 < z0 {
            ([0, 1, 0], [0, 1, 1])
        } else {
            ([0, 1, 0], [1, 1, 0])
        };

        let corner = |offset: [usize; 3], n: f64| {
            [
                x0 - offset[0] as f64 + n * Self::G3,
                y0 - offset[1] as f64 + n * Self::G3,
                z0 - offset[2] as f64 + n * Self::G3,
            ]
        };
        let d0 = [x0, y0, z0];
        let d1 = corner(o1, 1.0);
        let d2 = corner(o2, 2.0);
        let d3 = corner([1, 1, 1], 3.0);

        let ii = (i & 255) as usize;
        let jj = (j & 255) as usize;
        let kk = (k & 255) as usize;
        let p = &self.perm_table;
        let hash = |o: [usize; 3]| p.get(ii + o[0] + p.get(jj + o[1] + p.get(kk + o[2])));

        let n = self.corner3(d0, hash([0, 0, 0]))
            + self.corner3(d1, hash(o1))
            + self.corner3(d2, hash(o2))
            + self.corner3(d3, hash([1, 1, 1]));

        (32.0 * n).clamp(-1.0, 1.0)
    }

    /// Samples 2D noise remapped to `[0, 1]`.
    #[inline]
    #[must_use]
    pub fn sample_unit(&self, x: f64, y: f64) -> f64 {
        (self.sample(x, y) + 1.0) * 0.5
    }

    #[inline]
    fn corner2(&self, x: f64, y: f64, hash: usize) -> f64 {
        let t = 0.5 - x * x - y * y;
        if t < 0.0 {
            0.0
        } else {
            let g = self.perm_table.gradient(hash);
            let t2 = t * t;
            t2 * t2 * (x * g[0] + y * g[1])
        }
    }

    #[inline]
    fn corner3(&self, d: [f64; 3], hash: usize) -> f64 {
        let t = 0.6 - d[0] * d[0] - d[1] * d[1] - d[2] * d[2];
        if t < 0.0 {
            0.0
        } else {
            let g = self.perm_table.gradient(hash);
            let t2 = t * t;
            t2 * t2 * (d[0] * g[0] + d[1] * g[1] + d[2] * g[2])
        }
    }
}

#[inline]
fn fast_floor(x: f64) -> i32 {
    let xi = x as i32;
    if x < f64::from(xi) {
        xi - 1
    } else {
        xi
    }
}
