//! # Terrain Generator
//!
//! Deterministic pipeline from `(chunk coordinate, seed, parameters)` to a
//! fully populated chunk. Stages run in order:
//!
//! 1. resource veins (3D noise, unconditional)
//! 2. height-field terrain (fills only empty cells, clears above surface)
//! 3. trees (seeded per chunk, leaves only into empty cells)
//! 4. clouds (top layer, unconditional)
//! 5. edit replay (always wins)
//!
//! Occlusion and instance slots are computed last, so the chunk comes out
//! ready to draw and query.

use std::time::Instant;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use strata_shared::{ConfigError, ConfigResult, ResourceParams, WorldConfig};

use crate::block::{Block, BlockId};
use crate::chunk::{Chunk, ChunkCoord};
use crate::edit_overlay::EditOverlay;
use crate::grid::{LocalPos, VoxelGrid};
use crate::noise::{SimplexNoise, WorldSeed};

/// Sub-seed purposes.
mod purpose {
    pub const TERRAIN: u64 = 1;
    pub const CLOUDS: u64 = 2;
    pub const TREES: u64 = 3;
    pub const RESOURCE_BASE: u64 = 0x100;
}

struct ResourceField {
    block: BlockId,
    params: ResourceParams,
    noise: SimplexNoise,
}

/// Chunk generator bound to one configuration.
pub struct TerrainGenerator {
    config: WorldConfig,
    width: u16,
    height: u16,
    seed: WorldSeed,
    terrain_noise: SimplexNoise,
    cloud_noise: SimplexNoise,
    resources: Vec<ResourceField>,
}

impl TerrainGenerator {
    /// Builds a generator, validating the configuration.
    ///
    /// # Errors
    ///
    /// Any [`WorldConfig::validate`] error, or
    /// [`ConfigError::UnknownResource`] if a resource names an unregistered
    /// or empty block.
    pub fn new(config: &WorldConfig) -> ConfigResult<Self> {
        config.validate()?;

        let width = u16::try_from(config.chunk_width).map_err(|_| ConfigError::InvalidDimension {
            field: "chunk_width",
            value: config.chunk_width,
        })?;
        let height =
            u16::try_from(config.chunk_height).map_err(|_| ConfigError::InvalidDimension {
                field: "chunk_height",
                value: config.chunk_height,
            })?;

        let seed = WorldSeed::new(config.seed);
        let resources = config
            .resources
            .iter()
            .enumerate()
            .map(|(i, params)| {
                let block = BlockId(params.id);
                if !Block::is_placeable(block) {
                    return Err(ConfigError::UnknownResource(params.id));
                }
                Ok(ResourceField {
                    block,
                    params: params.clone(),
                    noise: SimplexNoise::new(seed.derive(purpose::RESOURCE_BASE + i as u64)),
                })
            })
            .collect::<ConfigResult<Vec<_>>>()?;

        Ok(Self {
            config: config.clone(),
            width,
            height,
            seed,
            terrain_noise: SimplexNoise::new(seed.derive(purpose::TERRAIN)),
            cloud_noise: SimplexNoise::new(seed.derive(purpose::CLOUDS)),
            resources,
        })
    }

    /// Configuration this generator was built from.
    #[must_use]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Chunk width in blocks.
    #[inline]
    #[must_use]
    pub const fn width(&self) -> u16 {
        self.width
    }

    /// Chunk height in blocks.
    #[inline]
    #[must_use]
    pub const fn height(&self) -> u16 {
        self.height
    }

    /// Generates the chunk at `coord`, replays `edits` and computes
    /// visibility. The returned chunk is marked loaded.
    #[must_use]
    pub fn generate(&self, coord: ChunkCoord, edits: &EditOverlay) -> Chunk {
        let start = Instant::now();
        let mut chunk = Chunk::new(coord, self.width, self.height);
        let (origin_x, origin_z) = chunk.origin();

        {
            let grid = chunk.grid_mut();
            self.generate_resources(grid, origin_x, origin_z);
            self.generate_terrain(grid, origin_x, origin_z);
            self.generate_trees(grid, coord);
            self.generate_clouds(grid, origin_x, origin_z);

            // Player edits always win
            for (pos, block) in edits.chunk_edits(origin_x, origin_z) {
                grid.set_block_id(pos, block);
            }
        }

        chunk.rebuild_instances();
        chunk.loaded = true;

        tracing::debug!(
            cx = coord.x,
            cz = coord.z,
            visible = chunk.visible_count(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "chunk generated"
        );
        chunk
    }

    fn generate_resources(&self, grid: &mut VoxelGrid, origin_x: i32, origin_z: i32) {
        for field in &self.resources {
            let scale = field.params.scale;
            for pos in grid.positions().collect::<Vec<_>>() {
                let value = field.noise.sample3(
                    f64::from(origin_x + i32::from(pos.x)) / scale.x,
                    f64::from(pos.y) / scale.y,
                    f64::from(origin_z + i32::from(pos.z)) / scale.z,
                );
                if value > field.params.scarcity {
                    grid.set_block_id(pos, field.block);
                }
            }
        }
    }

    fn surface_height(&self, world_x: i32, world_z: i32) -> u16 {
        let terrain = &self.config.terrain;
        let value = self.terrain_noise.sample(
            f64::from(world_x) / terrain.scale,
            f64::from(world_z) / terrain.scale,
        );
        let height = (terrain.offset + terrain.magnitude * value).floor();
        height.clamp(0.0, f64::from(self.height - 1)) as u16
    }

    fn generate_terrain(&self, grid: &mut VoxelGrid, origin_x: i32, origin_z: i32) {
        let water = self.config.terrain.water_offset;
        for z in 0..self.width {
            for x in 0..self.width {
                let surface =
                    self.surface_height(origin_x + i32::from(x), origin_z + i32::from(z));
                for y in 0..self.height {
                    let pos = LocalPos::new(x, y, z);
                    if y > surface {
                        grid.set_block_id(pos, BlockId::EMPTY);
                        continue;
                    }
                    if !grid.cell(pos).is_empty() {
                        continue;
                    }
                    let block = if u32::from(y) < water {
                        BlockId::SAND
                    } else if y == surface {
                        BlockId::GRASS
                    } else {
                        BlockId::DIRT
                    };
                    grid.set_block_id(pos, block);
                }
            }
        }
    }

    fn generate_trees(&self, grid: &mut VoxelGrid, coord: ChunkCoord) {
        let trees = &self.config.trees;
        let inset = u16::try_from(trees.canopy.max_radius).unwrap_or(u16::MAX);
        if u32::from(inset) * 2 >= u32::from(self.width) {
            return;
        }

        let seed = self.seed.derive(purpose::TREES).derive_chunk(coord.x, coord.z);
        let mut rng = ChaCha8Rng::seed_from_u64(seed.value());

        for z in inset..self.width - inset {
            for x in inset..self.width - inset {
                if rng.gen::<f64>() >= trees.frequency {
                    continue;
                }
                let Some(ground) = (0..self.height)
                    .rev()
                    .find(|&y| grid.cell(LocalPos::new(x, y, z)).block == BlockId::GRASS)
                else {
                    continue;
                };

                let trunk = rng.gen_range(trees.trunk.min_height..=trees.trunk.max_height);
                let top = i32::from(ground) + trunk as i32;
                for y in i32::from(ground) + 1..=top {
                    if let Some(pos) = grid.local(i32::from(x), y, i32::from(z)) {
                        grid.set_block_id(pos, BlockId::TREE);
                    }
                }

                let radius = rng.gen_range(trees.canopy.min_radius..=trees.canopy.max_radius) as i32;
                for dy in -radius..=radius {
                    for dz in -radius..=radius {
                        for dx in -radius..=radius {
                            if dx * dx + dy * dy + dz * dz > radius * radius {
                                continue;
                            }
                            let roll = rng.gen::<f64>();
                            let Some(pos) =
                                grid.local(i32::from(x) + dx, top + dy, i32::from(z) + dz)
                            else {
                                continue;
                            };
                            if roll < trees.canopy.density && grid.cell(pos).is_empty() {
                                grid.set_block_id(pos, BlockId::LEAVES);
                            }
                        }
                    }
                }
            }
        }
    }

    fn generate_clouds(&self, grid: &mut VoxelGrid, origin_x: i32, origin_z: i32) {
        let clouds = &self.config.clouds;
        let top = self.height - 1;
        for z in 0..self.width {
            for x in 0..self.width {
                let value = self.cloud_noise.sample_unit(
                    f64::from(origin_x + i32::from(x)) / clouds.scale,
                    f64::from(origin_z + i32::from(z)) / clouds.scale,
                );
                if value < clouds.density {
                    grid.set_block_id(LocalPos::new(x, top, z), BlockId::CLOUD);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit_overlay::EditKey;

    fn flat_config() -> WorldConfig {
        let mut config = WorldConfig {
            chunk_width: 16,
            chunk_height: 24,
            resources: Vec::new(),
            ..WorldConfig::default()
        };
        config.terrain.magnitude = 0.0;
        config.terrain.offset = 8.0;
        config.terrain.water_offset = 0;
        config.trees.frequency = 0.0;
        config.clouds.density = 0.0;
        config
    }

    #[test]
    fn test_flat_column_layers() {
        let gen = TerrainGenerator::new(&flat_config()).unwrap();
        let chunk = gen.generate(ChunkCoord::new(0, 0), &EditOverlay::new());

        assert!(chunk.loaded);
        assert_eq!(chunk.block(LocalPos::new(3, 8, 3)), BlockId::GRASS);
        assert_eq!(chunk.block(LocalPos::new(3, 7, 3)), BlockId::DIRT);
        assert_eq!(chunk.block(LocalPos::new(3, 0, 3)), BlockId::DIRT);
        assert!(chunk.block(LocalPos::new(3, 9, 3)).is_empty());
        assert!(chunk.instances_consistent());
    }

    #[test]
    fn test_sand_below_water() {
        let mut config = flat_config();
        config.terrain.water_offset = 10;
        let gen = TerrainGenerator::new(&config).unwrap();
        let chunk = gen.generate(ChunkCoord::new(0, 0), &EditOverlay::new());

        assert_eq!(chunk.block(LocalPos::new(0, 8, 0)), BlockId::SAND);
        assert_eq!(chunk.block(LocalPos::new(0, 2, 0)), BlockId::SAND);
    }

    #[test]
    fn test_height_is_clamped() {
        let mut config = flat_config();
        config.terrain.offset = 1000.0;
        let gen = TerrainGenerator::new(&config).unwrap();
        let chunk = gen.generate(ChunkCoord::new(0, 0), &EditOverlay::new());
        assert_eq!(chunk.block(LocalPos::new(5, 23, 5)), BlockId::GRASS);

        config.terrain.offset = -50.0;
        let gen = TerrainGenerator::new(&config).unwrap();
        let chunk = gen.generate(ChunkCoord::new(0, 0), &EditOverlay::new());
        assert_eq!(chunk.block(LocalPos::new(5, 0, 5)), BlockId::GRASS);
        assert!(chunk.block(LocalPos::new(5, 1, 5)).is_empty());
    }

    #[test]
    fn test_full_cloud_cover() {
        let mut config = flat_config();
        config.clouds.density = 1.0;
        let gen = TerrainGenerator::new(&config).unwrap();
        let chunk = gen.generate(ChunkCoord::new(2, -1), &EditOverlay::new());
        for z in 0..16 {
            for x in 0..16 {
                assert_eq!(chunk.block(LocalPos::new(x, 23, z)), BlockId::CLOUD);
            }
        }
    }

    #[test]
    fn test_resource_preempts_terrain() {
        let mut config = flat_config();
        config.resources.push(ResourceParams {
            id: BlockId::COAL_ORE.raw(),
            scarcity: 0.0,
            scale: strata_shared::NoiseScale3::uniform(10.0),
        });
        let gen = TerrainGenerator::new(&config).unwrap();
        let chunk = gen.generate(ChunkCoord::new(0, 0), &EditOverlay::new());

        let ids = chunk.grid().block_ids();
        assert!(ids.contains(&BlockId::COAL_ORE));
        // Nothing survives above the surface
        for z in 0..16 {
            for x in 0..16 {
                assert!(chunk.block(LocalPos::new(x, 12, z)).is_empty());
            }
        }
    }

    #[test]
    fn test_trees_stay_inside_inset() {
        let mut config = flat_config();
        config.trees.frequency = 1.0;
        config.trees.canopy.density = 1.0;
        let gen = TerrainGenerator::new(&config).unwrap();
        let chunk = gen.generate(ChunkCoord::new(0, 0), &EditOverlay::new());

        let inset = 4;
        let mut trunks = 0;
        for pos in chunk.grid().positions() {
            if chunk.block(pos) == BlockId::TREE {
                trunks += 1;
                assert!(pos.x >= inset && pos.x < 16 - inset);
                assert!(pos.z >= inset && pos.z < 16 - inset);
                assert!(pos.y > 8);
            }
        }
        assert!(trunks > 0, "every interior column should plant a tree");
    }

    #[test]
    fn test_edits_win() {
        let gen = TerrainGenerator::new(&flat_config()).unwrap();
        let mut edits = EditOverlay::new();
        edits.set(EditKey::new(16, 0, LocalPos::new(1, 8, 1)), BlockId::EMPTY);
        edits.set(EditKey::new(16, 0, LocalPos::new(1, 15, 1)), BlockId::STONE);
        // Different chunk, must not apply
        edits.set(EditKey::new(0, 0, LocalPos::new(2, 8, 2)), BlockId::EMPTY);

        let chunk = gen.generate(ChunkCoord::new(1, 0), &edits);
        assert!(chunk.block(LocalPos::new(1, 8, 1)).is_empty());
        assert_eq!(chunk.block(LocalPos::new(1, 15, 1)), BlockId::STONE);
        assert_eq!(chunk.block(LocalPos::new(2, 8, 2)), BlockId::GRASS);
        assert!(chunk.instances_consistent());
    }

    #[test]
    fn test_rejects_unknown_resource() {
        let mut config = flat_config();
        config.resources.push(ResourceParams {
            id: 0,
            scarcity: 0.5,
            scale: strata_shared::NoiseScale3::uniform(10.0),
        });
        assert!(matches!(
            TerrainGenerator::new(&config),
            Err(ConfigError::UnknownResource(0))
        ));
    }
}
