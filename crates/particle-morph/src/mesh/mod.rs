pub mod asset;
pub mod obj;
pub mod sampler;

pub use asset::{Material, MeshAsset, MeshSource, Texture, TriangleMesh};
pub use obj::ObjSource;
pub use sampler::{sample_asset, sample_raw, sample_source, RawSamples};
