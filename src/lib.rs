//! Orca shader tooling: the GLSL transpiler core and the renderer glue built on it.

pub use orca_render as render;
pub use orca_shader as shader;
