//! Network solving via the mesh-current method.

mod matrix;
mod mesh;

pub use matrix::MeshMatrix;
pub use mesh::{measured_current, solve, MeshSolution};
