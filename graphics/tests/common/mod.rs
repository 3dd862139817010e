//! Common utilities for renderer integration tests.
//!
//! All tests run against the dummy backend, so no GPU or display is needed.

#![allow(dead_code)]

use lantern_graphics::shader::SPIRV_MAGIC;
use lantern_graphics::{
    DummyBackend, DummyCall, DummyObject, Renderer, RendererConfig, ShaderCode, ShaderSet,
    ShaderStage, vk,
};

/// Window size used by most tests.
pub const WINDOW: vk::Extent2D = vk::Extent2D {
    width: 1280,
    height: 720,
};

/// Route log output through the test harness.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn extent(width: u32, height: u32) -> vk::Extent2D {
    vk::Extent2D { width, height }
}

fn spirv(stage: ShaderStage, body: &[u32]) -> ShaderCode {
    let words: Vec<u32> = [SPIRV_MAGIC, 0x0001_0000, 0, 1, 0]
        .iter()
        .chain(body)
        .copied()
        .collect();
    let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
    ShaderCode::from_spirv_bytes(stage, &bytes).unwrap()
}

/// Minimal SPIR-V headers. The dummy backend never looks inside.
pub fn shaders() -> ShaderSet {
    ShaderSet {
        vertex: spirv(ShaderStage::Vertex, &[1]),
        fragment: spirv(ShaderStage::Fragment, &[2]),
    }
}

pub fn config() -> RendererConfig {
    RendererConfig::default().with_validation(false)
}

/// Renderer at [`WINDOW`] size on `backend`.
pub fn renderer(backend: DummyBackend) -> Renderer<DummyBackend> {
    init_logging();
    Renderer::with_backend(backend, WINDOW, &config(), &shaders()).unwrap()
}

/// Calls recorded after the first `len` entries.
pub fn calls_since(calls: &[DummyCall], len: usize) -> Vec<DummyCall> {
    calls[len..].to_vec()
}

/// Only the calls that make up the frame protocol.
pub fn frame_calls(calls: &[DummyCall]) -> Vec<DummyCall> {
    calls
        .iter()
        .filter(|c| {
            matches!(
                c,
                DummyCall::WaitForFence
                    | DummyCall::Acquire
                    | DummyCall::ResetFence
                    | DummyCall::RecordFrame(_)
                    | DummyCall::Submit(_)
                    | DummyCall::Present { .. }
                    | DummyCall::WaitIdle
            )
        })
        .cloned()
        .collect()
}

/// Short names for frame-protocol calls, for readable assertions.
pub fn frame_call_names(calls: &[DummyCall]) -> Vec<&'static str> {
    frame_calls(calls)
        .iter()
        .map(|c| match c {
            DummyCall::WaitForFence => "wait",
            DummyCall::Acquire => "acquire",
            DummyCall::ResetFence => "reset",
            DummyCall::RecordFrame(_) => "record",
            DummyCall::Submit(_) => "submit",
            DummyCall::Present { .. } => "present",
            DummyCall::WaitIdle => "idle",
            _ => unreachable!(),
        })
        .collect()
}

pub fn count(calls: &[DummyCall], call: DummyCall) -> usize {
    calls.iter().filter(|c| **c == call).count()
}

pub fn created(calls: &[DummyCall], object: DummyObject) -> usize {
    count(calls, DummyCall::Create(object))
}

pub fn destroyed(calls: &[DummyCall], object: DummyObject) -> usize {
    count(calls, DummyCall::Destroy(object))
}
