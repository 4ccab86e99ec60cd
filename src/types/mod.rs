pub mod mesh;

pub use mesh::IndexedMesh;
