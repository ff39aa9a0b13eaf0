//! Renderer-side glue for the shader transpiler: the [`Renderer`] interface, a command-queue
//! renderer and a [`ShaderLibrary`] that loads shader files from disk.

#![forbid(unsafe_code)]

mod error;
mod mesh;
mod renderer;
mod shader_library;

pub use crate::error::RenderError;
pub use crate::mesh::{Mesh, Transform, IDENTITY};
pub use crate::renderer::{
    FrameState, FrameStats, QueueRenderer, RenderBackend, RenderCommand, Renderer, WindowHandle,
};
pub use crate::shader_library::{ShaderLibrary, ShaderProgram};
