use std::fs;

use orca_render::{
    FrameStats, Mesh, QueueRenderer, RenderBackend, RenderError, Renderer, ShaderLibrary,
    WindowHandle, IDENTITY,
};
use orca_shader::{ShaderStage, ShaderTarget, ShaderTranspiler, ToolchainConfig};

const VERT: &str = "layout(location = 0) in vec3 aPos;
void main(){ gl_Position = vec4(aPos, 1.0); }";
const FRAG: &str = "uniform vec3 tint;
void main(){ gl_FragColor = vec4(tint, 1.0); }";

#[test]
fn loaded_program_draws_through_a_full_frame() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("quad.vert"), VERT).unwrap();
    fs::write(dir.path().join("quad.frag"), FRAG).unwrap();

    let library = ShaderLibrary::new(
        ShaderTranspiler::new(ToolchainConfig::default().with_sdk_root(dir.path())),
        dir.path(),
    );
    let program = library
        .load_program("quad.vert", "quad.frag", ShaderTarget::Glsl)
        .unwrap();

    let mut renderer = QueueRenderer::new(RenderBackend::OpenGl);
    renderer.initialize(WindowHandle(0x1000)).unwrap();

    let quad = Mesh::quad();
    for _ in 0..3 {
        renderer.begin_frame().unwrap();
        renderer.draw_mesh(&quad, &program, &IDENTITY).unwrap();
        renderer.render().unwrap();
        renderer.end_frame().unwrap();
    }

    assert_eq!(renderer.frames_completed(), 3);
    assert_eq!(
        renderer.last_frame_stats(),
        Some(FrameStats {
            commands: 1,
            vertices: 4,
            indices: 6,
        })
    );
    renderer.shutdown().unwrap();
}

#[test]
fn program_for_another_backend_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("quad.vert"), VERT).unwrap();

    let library = ShaderLibrary::new(ShaderTranspiler::default(), dir.path());
    let program = library
        .load_stage("quad.vert", ShaderTarget::Glsl, ShaderStage::Vertex)
        .unwrap();

    let mut renderer = QueueRenderer::new(RenderBackend::Metal);
    renderer.initialize(WindowHandle(1)).unwrap();
    renderer.begin_frame().unwrap();
    let err = renderer
        .draw_mesh(&Mesh::quad(), &program, &IDENTITY)
        .unwrap_err();
    assert!(matches!(err, RenderError::TargetMismatch { .. }), "{err}");
    assert_eq!(
        err.to_string(),
        "Metal renderer cannot draw a glsl program (expected metal)"
    );
}
