//! Frame executor integration tests.
//!
//! # Test Categories
//!
//! - **Recovery Routes**: out-of-date and suboptimal from acquire and present
//! - **Chain Recreation**: ordering, extent, image-count invariants
//! - **Back-pressure**: the in-flight fence blocking on a busy GPU
//! - **Errors**: failures that are not recoverable

mod common;

use std::thread;
use std::time::Duration;

use rstest::rstest;

use common::{WINDOW, calls_since, count, created, destroyed, extent, frame_call_names, renderer};
use lantern_graphics::{
    AcquireOutcome, DrawOutcome, DummyBackend, DummyCall, DummyObject, DummySurface, FrameState,
    GraphicsError, PresentOutcome, RecreateCause, RecreateStage, vk,
};

// ============================================================================
// Recovery Routes
// ============================================================================

#[rstest]
#[case::acquire_out_of_date(AcquireOutcome::OutOfDate, RecreateCause::OutOfDate)]
#[case::acquire_suboptimal(AcquireOutcome::Suboptimal(1), RecreateCause::Suboptimal)]
fn test_acquire_side_recovery(#[case] acquired: AcquireOutcome, #[case] cause: RecreateCause) {
    let backend = DummyBackend::new();
    let gpu = backend.gpu();
    let mut renderer = renderer(backend);
    let before = gpu.calls().len();

    renderer.backend().script_acquire(acquired);
    let outcome = renderer.draw().unwrap();

    assert_eq!(
        outcome,
        DrawOutcome::Recreated {
            stage: RecreateStage::Acquire,
            cause,
        }
    );

    // Nothing was recorded, submitted or presented, and the fence was left alone.
    let calls = calls_since(&gpu.calls(), before);
    assert_eq!(frame_call_names(&calls), ["wait", "acquire", "idle"]);

    assert_eq!(renderer.chain().generation(), 1);
    assert_eq!(renderer.executor().recreations(), 1);
    assert_eq!(renderer.executor().frames_presented(), 0);
    assert_eq!(renderer.executor().state(), FrameState::Idle);

    // The next tick draws normally.
    assert!(matches!(
        renderer.draw().unwrap(),
        DrawOutcome::Presented { .. }
    ));
}

#[rstest]
#[case::present_out_of_date(PresentOutcome::OutOfDate, RecreateCause::OutOfDate)]
#[case::present_suboptimal(PresentOutcome::Suboptimal, RecreateCause::Suboptimal)]
fn test_present_side_recovery(#[case] presented: PresentOutcome, #[case] cause: RecreateCause) {
    let backend = DummyBackend::new();
    let gpu = backend.gpu();
    let mut renderer = renderer(backend);
    let before = gpu.calls().len();

    renderer.backend().script_present(presented);
    let outcome = renderer.draw().unwrap();

    assert_eq!(
        outcome,
        DrawOutcome::Recreated {
            stage: RecreateStage::Present,
            cause,
        }
    );

    // The work was already submitted; the chain is rebuilt exactly once.
    let calls = calls_since(&gpu.calls(), before);
    assert_eq!(
        frame_call_names(&calls),
        ["wait", "acquire", "reset", "record", "submit", "present", "idle"]
    );
    assert_eq!(created(&calls, DummyObject::Swapchain), 1);
    assert_eq!(destroyed(&calls, DummyObject::Swapchain), 1);

    assert_eq!(renderer.chain().generation(), 1);
    assert_eq!(renderer.executor().frames_presented(), 0);
    assert_eq!(renderer.executor().state(), FrameState::Idle);

    assert!(matches!(
        renderer.draw().unwrap(),
        DrawOutcome::Presented { .. }
    ));
    assert_eq!(renderer.executor().frames_presented(), 1);
}

#[test]
fn test_suboptimal_acquire_replaces_image_available_semaphore() {
    let backend = DummyBackend::new();
    let gpu = backend.gpu();
    let mut renderer = renderer(backend);
    let stale = renderer.executor().sync().image_available();
    let render_finished = renderer.executor().sync().render_finished();

    renderer
        .backend()
        .script_acquire(AcquireOutcome::Suboptimal(0));
    renderer.draw().unwrap();

    let fresh = renderer.executor().sync().image_available();
    assert_ne!(fresh, stale);
    assert_eq!(renderer.executor().sync().render_finished(), render_finished);
    assert_eq!(gpu.live_objects_of(DummyObject::Semaphore), 2);
}

#[test]
fn test_out_of_date_acquire_keeps_semaphores() {
    let mut renderer = renderer(DummyBackend::new());
    let image_available = renderer.executor().sync().image_available();

    renderer.backend().script_acquire(AcquireOutcome::OutOfDate);
    renderer.draw().unwrap();

    assert_eq!(renderer.executor().sync().image_available(), image_available);
}

#[test]
fn test_repeated_failures_recreate_each_time() {
    let mut renderer = renderer(DummyBackend::new());

    renderer.backend().script_acquire(AcquireOutcome::OutOfDate);
    renderer.backend().script_acquire(AcquireOutcome::OutOfDate);
    renderer.backend().script_present(PresentOutcome::Suboptimal);

    for _ in 0..3 {
        assert!(matches!(
            renderer.draw().unwrap(),
            DrawOutcome::Recreated { .. }
        ));
    }

    assert_eq!(renderer.chain().generation(), 3);
    assert_eq!(renderer.executor().recreations(), 3);
}

// ============================================================================
// Chain Recreation
// ============================================================================

#[test]
fn test_recreation_order_and_pipeline_reuse() {
    let backend = DummyBackend::new();
    let gpu = backend.gpu();
    let mut renderer = renderer(backend);
    let render_pass = renderer.pipeline().render_pass();
    let pipeline = renderer.pipeline().pipeline();
    let before = gpu.calls().len();

    renderer.backend().script_acquire(AcquireOutcome::OutOfDate);
    renderer.draw().unwrap();

    use DummyObject::*;
    let lifecycle: Vec<DummyCall> = calls_since(&gpu.calls(), before)
        .into_iter()
        .filter(|c| {
            matches!(
                c,
                DummyCall::WaitIdle
                    | DummyCall::Create(_)
                    | DummyCall::Destroy(_)
                    | DummyCall::QuerySurfaceCapabilities
            )
        })
        .collect();

    let mut expected = vec![DummyCall::WaitIdle];
    expected.extend([Framebuffer, Framebuffer, Framebuffer].map(DummyCall::Destroy));
    expected.extend([ImageView, ImageView, ImageView].map(DummyCall::Destroy));
    expected.push(DummyCall::Destroy(Swapchain));
    expected.push(DummyCall::QuerySurfaceCapabilities);
    expected.push(DummyCall::Create(Swapchain));
    expected.extend([ImageView, ImageView, ImageView].map(DummyCall::Create));
    expected.extend([Framebuffer, Framebuffer, Framebuffer].map(DummyCall::Create));
    assert_eq!(lifecycle, expected);

    // Pipeline objects survive recreation.
    assert_eq!(renderer.pipeline().render_pass(), render_pass);
    assert_eq!(renderer.pipeline().pipeline(), pipeline);
}

#[test]
fn test_resize_is_picked_up_by_recreation() {
    let mut renderer = renderer(DummyBackend::new());
    assert_eq!(renderer.chain().extent(), WINDOW);

    renderer
        .backend()
        .set_surface(DummySurface::default().with_current_extent(640, 480));
    renderer.resize(extent(640, 480));

    // Recreation is reactive: nothing changes until the chain reports stale.
    assert!(matches!(
        renderer.draw().unwrap(),
        DrawOutcome::Presented { .. }
    ));
    assert_eq!(renderer.chain().extent(), WINDOW);

    renderer.backend().script_present(PresentOutcome::OutOfDate);
    renderer.draw().unwrap();

    let chain = renderer.chain();
    assert_eq!(chain.extent(), extent(640, 480));
    assert_eq!(chain.image_count(), 3);
    assert_eq!(chain.image_views().len(), chain.image_count());
    assert_eq!(chain.framebuffers().len(), chain.image_count());
}

#[rstest]
#[case::within_bounds(extent(800, 600), extent(800, 600))]
#[case::above_max(extent(5000, 5000), extent(4096, 4096))]
#[case::at_min(extent(1, 1), extent(1, 1))]
fn test_recreated_extent_is_clamped(#[case] window: vk::Extent2D, #[case] expected: vk::Extent2D) {
    let mut renderer = renderer(DummyBackend::new());

    renderer.resize(window);
    renderer.backend().script_acquire(AcquireOutcome::OutOfDate);
    renderer.draw().unwrap();

    assert_eq!(renderer.chain().extent(), expected);
}

#[test]
fn test_image_count_follows_new_capabilities() {
    let mut renderer = renderer(DummyBackend::new());

    let mut surface = DummySurface::default();
    surface.capabilities.min_image_count = 3;
    surface.capabilities.max_image_count = 3;
    renderer.backend().set_surface(surface);
    renderer.backend().script_acquire(AcquireOutcome::OutOfDate);
    renderer.draw().unwrap();

    assert_eq!(renderer.chain().image_count(), 3);

    let mut surface = DummySurface::default();
    surface.capabilities.min_image_count = 1;
    surface.capabilities.max_image_count = 0;
    renderer.backend().set_surface(surface);
    renderer.backend().script_acquire(AcquireOutcome::OutOfDate);
    renderer.draw().unwrap();

    assert_eq!(renderer.chain().image_count(), 2);
    assert_eq!(renderer.chain().framebuffers().len(), 2);
}

#[test]
fn test_surface_format_change_is_an_error() {
    let backend = DummyBackend::new();
    let gpu = backend.gpu();
    let mut renderer = renderer(backend);

    renderer.backend().set_surface(DummySurface {
        formats: vec![vk::SurfaceFormatKHR {
            format: vk::Format::R8G8B8A8_UNORM,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        }],
        ..DummySurface::default()
    });
    renderer.backend().script_acquire(AcquireOutcome::OutOfDate);

    match renderer.draw() {
        Err(GraphicsError::SurfaceFormatChanged { expected, found }) => {
            assert_eq!(expected, vk::Format::B8G8R8A8_SRGB);
            assert_eq!(found, vk::Format::R8G8B8A8_UNORM);
        }
        other => panic!("expected SurfaceFormatChanged, got {other:?}"),
    }
    assert_eq!(renderer.executor().state(), FrameState::Idle);

    drop(renderer);
    assert_eq!(gpu.live_objects(), 0);
    assert_eq!(gpu.invalid_destroys(), 0);
}

// ============================================================================
// Back-pressure
// ============================================================================

#[test]
fn test_fence_blocks_until_gpu_completes() {
    let backend = DummyBackend::new().with_auto_complete(false);
    let gpu = backend.gpu();
    let mut renderer = renderer(backend);

    assert_eq!(
        renderer.draw().unwrap(),
        DrawOutcome::Presented { image_index: 0 }
    );
    assert_eq!(gpu.pending_submissions(), 1);

    let completer = {
        let gpu = gpu.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            gpu.complete_submissions()
        })
    };

    let second = renderer.draw().unwrap();
    assert_eq!(completer.join().unwrap(), 1);
    assert_eq!(second, DrawOutcome::Presented { image_index: 1 });

    // The second frame only acquired after the first one finished on the GPU.
    let calls = gpu.calls();
    let completed = calls
        .iter()
        .position(|c| *c == DummyCall::GpuComplete)
        .unwrap();
    let second_acquire = calls
        .iter()
        .enumerate()
        .filter(|(_, c)| **c == DummyCall::Acquire)
        .nth(1)
        .map(|(i, _)| i)
        .unwrap();
    assert!(completed < second_acquire);
}

#[test]
fn test_acquire_failure_leaves_fence_signaled() {
    // With auto-completion off, an unsignaled fence with nothing in flight
    // is reported as a lost device, so a premature reset would surface here.
    let backend = DummyBackend::new().with_auto_complete(false);
    let gpu = backend.gpu();
    let mut renderer = renderer(backend);

    renderer.backend().script_acquire(AcquireOutcome::OutOfDate);
    renderer.draw().unwrap();
    assert_eq!(count(&gpu.calls(), DummyCall::ResetFence), 0);

    assert!(matches!(
        renderer.draw().unwrap(),
        DrawOutcome::Presented { .. }
    ));
}

// ============================================================================
// Errors
// ============================================================================

#[rstest]
#[case::device_lost(vk::Result::ERROR_DEVICE_LOST)]
#[case::surface_lost(vk::Result::ERROR_SURFACE_LOST_KHR)]
fn test_acquire_errors_propagate(#[case] error: vk::Result) {
    let mut renderer = renderer(DummyBackend::new());

    renderer.backend().script_acquire_error(error);

    match renderer.draw() {
        Err(GraphicsError::Vulkan { operation, result }) => {
            assert_eq!(operation, "acquire next image");
            assert_eq!(result, error);
        }
        other => panic!("expected a Vulkan error, got {other:?}"),
    }
    assert_eq!(renderer.executor().state(), FrameState::Idle);
    assert_eq!(renderer.chain().generation(), 0);
}

#[test]
fn test_present_errors_propagate() {
    let mut renderer = renderer(DummyBackend::new());

    renderer
        .backend()
        .script_present_error(vk::Result::ERROR_DEVICE_LOST);

    assert!(matches!(
        renderer.draw(),
        Err(GraphicsError::Vulkan {
            operation: "queue present",
            result: vk::Result::ERROR_DEVICE_LOST,
        })
    ));
}

#[test]
fn test_failed_rebuild_is_retried_before_acquiring() {
    let backend = DummyBackend::new();
    let gpu = backend.gpu();
    let mut renderer = renderer(backend);

    renderer.backend().fail_next(DummyObject::Swapchain);
    renderer.backend().script_acquire(AcquireOutcome::OutOfDate);

    assert!(matches!(
        renderer.draw(),
        Err(GraphicsError::Vulkan {
            operation: "create swapchain",
            ..
        })
    ));
    assert!(renderer.chain().is_empty());
    assert_eq!(renderer.chain().swapchain(), vk::SwapchainKHR::null());
    assert_eq!(gpu.live_objects_of(DummyObject::Swapchain), 0);

    let before = gpu.calls().len();
    assert_eq!(
        renderer.draw().unwrap(),
        DrawOutcome::Presented { image_index: 0 }
    );

    // The chain is back before anything touches the swapchain handle.
    let calls = calls_since(&gpu.calls(), before);
    assert_eq!(
        frame_call_names(&calls),
        ["idle", "wait", "acquire", "reset", "record", "submit", "present"]
    );
    assert_eq!(created(&calls, DummyObject::Swapchain), 1);
    assert!(!renderer.chain().is_empty());
    assert_eq!(
        renderer.chain().framebuffers().len(),
        renderer.chain().image_count()
    );

    drop(renderer);
    assert_eq!(gpu.live_objects(), 0);
    assert_eq!(gpu.invalid_destroys(), 0);
}

#[test]
fn test_failed_rebuild_after_suboptimal_acquire_still_replaces_semaphore() {
    let backend = DummyBackend::new();
    let gpu = backend.gpu();
    let mut renderer = renderer(backend);
    let stale = renderer.executor().sync().image_available();

    renderer.backend().fail_next(DummyObject::Framebuffer);
    renderer
        .backend()
        .script_acquire(AcquireOutcome::Suboptimal(0));

    assert!(renderer.draw().is_err());
    assert_ne!(renderer.executor().sync().image_available(), stale);
    assert_eq!(gpu.live_objects_of(DummyObject::Semaphore), 2);

    assert!(matches!(
        renderer.draw().unwrap(),
        DrawOutcome::Presented { .. }
    ));
}

#[test]
fn test_failed_submit_leaves_frame_slot_usable() {
    // Without auto-completion, waiting on a fence that nothing will signal
    // is reported as a lost device instead of hanging.
    let backend = DummyBackend::new().with_auto_complete(false);
    let gpu = backend.gpu();
    let mut renderer = renderer(backend);
    let fence = renderer.executor().sync().in_flight();
    let image_available = renderer.executor().sync().image_available();

    renderer
        .backend()
        .script_submit_error(vk::Result::ERROR_OUT_OF_HOST_MEMORY);

    assert!(matches!(
        renderer.draw(),
        Err(GraphicsError::Vulkan {
            operation: "queue submit",
            result: vk::Result::ERROR_OUT_OF_HOST_MEMORY,
        })
    ));
    assert_eq!(renderer.executor().state(), FrameState::Idle);
    assert_eq!(gpu.pending_submissions(), 0);
    assert_ne!(renderer.executor().sync().in_flight(), fence);
    assert_ne!(renderer.executor().sync().image_available(), image_available);
    assert_eq!(gpu.live_objects_of(DummyObject::Fence), 1);
    assert_eq!(gpu.live_objects_of(DummyObject::Semaphore), 2);

    assert!(matches!(
        renderer.draw().unwrap(),
        DrawOutcome::Presented { .. }
    ));
    assert_eq!(gpu.pending_submissions(), 1);

    drop(renderer);
    assert_eq!(gpu.live_objects(), 0);
    assert_eq!(gpu.invalid_destroys(), 0);
}
