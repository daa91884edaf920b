use serde::{Deserialize, Serialize};

/// Closed set of block kinds the world can hold.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    Air,
    Stone,
    Dirt,
    Grass,
    Water,
    Wood,
    Leaves,
    Snow,
    Ice,
    Bedrock,
    Sand,
    RedSand,
    Gravel,
}

/// How a block interacts with light passing through it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Opacity {
    Clear,
    /// Passes light but removes the given number of levels.
    Translucent(u8),
    Opaque,
}

impl BlockType {
    pub const ALL: [BlockType; 13] = [
        BlockType::Air,
        BlockType::Stone,
        BlockType::Dirt,
        BlockType::Grass,
        BlockType::Water,
        BlockType::Wood,
        BlockType::Leaves,
        BlockType::Snow,
        BlockType::Ice,
        BlockType::Bedrock,
        BlockType::Sand,
        BlockType::RedSand,
        BlockType::Gravel,
    ];

    #[inline]
    pub fn opacity(self) -> Opacity {
        match self {
            BlockType::Air => Opacity::Clear,
            BlockType::Leaves | BlockType::Ice => Opacity::Translucent(1),
            BlockType::Water => Opacity::Translucent(2),
            _ => Opacity::Opaque,
        }
    }

    #[inline]
    pub fn is_opaque(self) -> bool {
        matches!(self.opacity(), Opacity::Opaque)
    }

    /// Extra levels lost when light enters this block (0 for opaque, which blocks outright).
    #[inline]
    pub fn light_attenuation(self) -> u8 {
        match self.opacity() {
            Opacity::Translucent(a) => a,
            Opacity::Clear | Opacity::Opaque => 0,
        }
    }

    /// Solid for carving and collision purposes; water and air are not.
    #[inline]
    pub fn is_solid(self) -> bool {
        !matches!(self, BlockType::Air | BlockType::Water)
    }

    #[inline]
    pub fn is_fluid(self) -> bool {
        matches!(self, BlockType::Water)
    }

    pub fn debug_name(self) -> &'static str {
        match self {
            BlockType::Air => "air",
            BlockType::Stone => "stone",
            BlockType::Dirt => "dirt",
            BlockType::Grass => "grass",
            BlockType::Water => "water",
            BlockType::Wood => "wood",
            BlockType::Leaves => "leaves",
            BlockType::Snow => "snow",
            BlockType::Ice => "ice",
            BlockType::Bedrock => "bedrock",
            BlockType::Sand => "sand",
            BlockType::RedSand => "red_sand",
            BlockType::Gravel => "gravel",
        }
    }
}

/// A placed block. `id` comes from a per-chunk counter and is only used for tracking.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BlockEntity {
    pub id: u64,
    pub kind: BlockType,
}

impl BlockEntity {
    #[inline]
    pub const fn new(id: u64, kind: BlockType) -> Self {
        Self { id, kind }
    }

    #[inline]
    pub fn is_air(&self) -> bool {
        self.kind == BlockType::Air
    }
}
