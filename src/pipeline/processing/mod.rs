// Processing stages: raw payload -> canonical record -> rollups

pub mod aggregate;
pub mod normalize;
