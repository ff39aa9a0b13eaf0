//! Renderer abstraction.
//!
//! There is no GPU API behind [`QueueRenderer`]: it enforces the frame lifecycle, records draw
//! calls and reports what a frame would have submitted. Real graphics backends implement
//! [`Renderer`] on top of the same contract.

use std::fmt;

use orca_shader::ShaderTarget;
use tracing::{debug, warn};

use crate::error::RenderError;
use crate::mesh::{Mesh, Transform};
use crate::shader_library::ShaderProgram;

/// Opaque native window handle supplied by the platform layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub u64);

impl WindowHandle {
    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderBackend {
    OpenGl,
    Direct3D11,
    Vulkan,
    Metal,
}

impl RenderBackend {
    /// Dialect programs must be transpiled to before this backend can draw them.
    pub fn shader_target(self) -> ShaderTarget {
        match self {
            RenderBackend::OpenGl => ShaderTarget::Glsl,
            RenderBackend::Direct3D11 => ShaderTarget::Hlsl,
            RenderBackend::Vulkan => ShaderTarget::Vulkan,
            RenderBackend::Metal => ShaderTarget::Metal,
        }
    }
}

impl fmt::Display for RenderBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RenderBackend::OpenGl => "OpenGL",
            RenderBackend::Direct3D11 => "Direct3D 11",
            RenderBackend::Vulkan => "Vulkan",
            RenderBackend::Metal => "Metal",
        })
    }
}

pub trait Renderer {
    fn initialize(&mut self, window: WindowHandle) -> Result<(), RenderError>;
    fn shutdown(&mut self) -> Result<(), RenderError>;
    fn begin_frame(&mut self) -> Result<(), RenderError>;
    /// Submits every draw queued since the last call.
    fn render(&mut self) -> Result<(), RenderError>;
    fn end_frame(&mut self) -> Result<(), RenderError>;
    fn draw_mesh(
        &mut self,
        mesh: &Mesh,
        program: &ShaderProgram,
        transform: &Transform,
    ) -> Result<(), RenderError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    Uninitialized,
    Idle,
    InFrame,
}

impl fmt::Display for FrameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FrameState::Uninitialized => "uninitialized",
            FrameState::Idle => "idle",
            FrameState::InFrame => "in a frame",
        })
    }
}

#[derive(Debug, Clone)]
pub struct RenderCommand {
    pub mesh: Mesh,
    pub program: ShaderProgram,
    pub transform: Transform,
}

/// Totals submitted by [`Renderer::render`] over one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub commands: usize,
    pub vertices: usize,
    pub indices: usize,
}

impl FrameStats {
    fn record(&mut self, cmd: &RenderCommand) {
        self.commands += 1;
        self.vertices += cmd.mesh.vertices.len();
        self.indices += cmd.mesh.indices.len();
    }
}

#[derive(Debug)]
pub struct QueueRenderer {
    backend: RenderBackend,
    state: FrameState,
    window: Option<WindowHandle>,
    queue: Vec<RenderCommand>,
    current: FrameStats,
    last_frame: Option<FrameStats>,
    frames: u64,
}

impl QueueRenderer {
    pub fn new(backend: RenderBackend) -> Self {
        Self {
            backend,
            state: FrameState::Uninitialized,
            window: None,
            queue: Vec::new(),
            current: FrameStats::default(),
            last_frame: None,
            frames: 0,
        }
    }

    pub fn backend(&self) -> RenderBackend {
        self.backend
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    pub fn window(&self) -> Option<WindowHandle> {
        self.window
    }

    /// Draws queued but not yet rendered.
    pub fn pending(&self) -> &[RenderCommand] {
        &self.queue
    }

    /// Stats of the most recently ended frame.
    pub fn last_frame_stats(&self) -> Option<FrameStats> {
        self.last_frame
    }

    pub fn frames_completed(&self) -> u64 {
        self.frames
    }

    fn expect_state(
        &self,
        expected: FrameState,
        operation: &'static str,
    ) -> Result<(), RenderError> {
        if self.state != expected {
            return Err(RenderError::InvalidState {
                operation,
                state: self.state,
            });
        }
        Ok(())
    }
}

impl Renderer for QueueRenderer {
    fn initialize(&mut self, window: WindowHandle) -> Result<(), RenderError> {
        self.expect_state(FrameState::Uninitialized, "initialize")?;
        if window.is_null() {
            return Err(RenderError::NullWindow);
        }
        self.window = Some(window);
        self.state = FrameState::Idle;
        debug!(backend = %self.backend, "renderer initialized");
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), RenderError> {
        if self.state == FrameState::Uninitialized {
            return Ok(());
        }
        if !self.queue.is_empty() {
            warn!(dropped = self.queue.len(), "renderer shut down with queued draws");
        }
        self.queue.clear();
        self.current = FrameStats::default();
        self.window = None;
        self.state = FrameState::Uninitialized;
        debug!(backend = %self.backend, "renderer shut down");
        Ok(())
    }

    fn begin_frame(&mut self) -> Result<(), RenderError> {
        self.expect_state(FrameState::Idle, "begin a frame")?;
        self.current = FrameStats::default();
        self.state = FrameState::InFrame;
        Ok(())
    }

    fn render(&mut self) -> Result<(), RenderError> {
        self.expect_state(FrameState::InFrame, "render")?;
        for cmd in self.queue.drain(..) {
            self.current.record(&cmd);
        }
        Ok(())
    }

    fn end_frame(&mut self) -> Result<(), RenderError> {
        self.expect_state(FrameState::InFrame, "end a frame")?;
        if !self.queue.is_empty() {
            warn!(dropped = self.queue.len(), "frame ended with unrendered draws");
            self.queue.clear();
        }
        self.last_frame = Some(self.current);
        self.frames += 1;
        self.state = FrameState::Idle;
        Ok(())
    }

    fn draw_mesh(
        &mut self,
        mesh: &Mesh,
        program: &ShaderProgram,
        transform: &Transform,
    ) -> Result<(), RenderError> {
        self.expect_state(FrameState::InFrame, "draw")?;
        let expected = self.backend.shader_target();
        if program.target != expected {
            return Err(RenderError::TargetMismatch {
                backend: self.backend,
                expected,
                found: program.target,
            });
        }
        if let Some(index) = mesh.first_invalid_index() {
            return Err(RenderError::IndexOutOfRange {
                index,
                vertices: mesh.vertices.len(),
            });
        }
        self.queue.push(RenderCommand {
            mesh: mesh.clone(),
            program: program.clone(),
            transform: *transform,
        });
        Ok(())
    }
}
