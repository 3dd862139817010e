//! Vulkan command pool, command buffer recording and queue submission.

use ash::vk;

use crate::error::GraphicsError;
use crate::frame::{FrameRecording, FrameSubmission};

/// Create a command pool whose buffers can be reset individually.
pub fn create_command_pool(
    device: &ash::Device,
    queue_family_index: u32,
) -> Result<vk::CommandPool, GraphicsError> {
    let pool_info = vk::CommandPoolCreateInfo::default()
        .queue_family_index(queue_family_index)
        .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

    unsafe { device.create_command_pool(&pool_info, None) }
        .map_err(GraphicsError::vulkan("create command pool"))
}

pub fn allocate_command_buffer(
    device: &ash::Device,
    pool: vk::CommandPool,
) -> Result<vk::CommandBuffer, GraphicsError> {
    let alloc_info = vk::CommandBufferAllocateInfo::default()
        .command_pool(pool)
        .level(vk::CommandBufferLevel::PRIMARY)
        .command_buffer_count(1);

    let buffers = unsafe { device.allocate_command_buffers(&alloc_info) }
        .map_err(GraphicsError::vulkan("allocate command buffer"))?;

    buffers.first().copied().ok_or_else(|| {
        GraphicsError::InitializationFailed("driver returned no command buffer".into())
    })
}

/// Reset the command buffer and record one render pass drawing the triangle.
pub fn record_frame(device: &ash::Device, recording: &FrameRecording) -> Result<(), GraphicsError> {
    let cmd = recording.command_buffer;

    unsafe { device.reset_command_buffer(cmd, vk::CommandBufferResetFlags::empty()) }
        .map_err(GraphicsError::vulkan("reset command buffer"))?;

    let begin_info = vk::CommandBufferBeginInfo::default();
    unsafe { device.begin_command_buffer(cmd, &begin_info) }
        .map_err(GraphicsError::vulkan("begin command buffer"))?;

    let clear_values = [vk::ClearValue {
        color: vk::ClearColorValue {
            float32: recording.clear_color,
        },
    }];
    let render_area = vk::Rect2D {
        offset: vk::Offset2D { x: 0, y: 0 },
        extent: recording.extent,
    };
    let render_pass_begin = vk::RenderPassBeginInfo::default()
        .render_pass(recording.render_pass)
        .framebuffer(recording.framebuffer)
        .render_area(render_area)
        .clear_values(&clear_values);

    let viewport = vk::Viewport {
        x: 0.0,
        y: 0.0,
        width: recording.extent.width as f32,
        height: recording.extent.height as f32,
        min_depth: 0.0,
        max_depth: 1.0,
    };

    unsafe {
        device.cmd_begin_render_pass(cmd, &render_pass_begin, vk::SubpassContents::INLINE);
        device.cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, recording.pipeline);
        device.cmd_set_viewport(cmd, 0, &[viewport]);
        device.cmd_set_scissor(cmd, 0, &[render_area]);
        device.cmd_draw(cmd, recording.vertex_count, recording.instance_count, 0, 0);
        device.cmd_end_render_pass(cmd);
    }

    unsafe { device.end_command_buffer(cmd) }.map_err(GraphicsError::vulkan("end command buffer"))
}

pub fn submit(
    device: &ash::Device,
    queue: vk::Queue,
    submission: &FrameSubmission,
) -> Result<(), GraphicsError> {
    let wait_semaphores = [submission.wait_semaphore];
    let wait_stages = [submission.wait_stage];
    let command_buffers = [submission.command_buffer];
    let signal_semaphores = [submission.signal_semaphore];

    let submit_info = vk::SubmitInfo::default()
        .wait_semaphores(&wait_semaphores)
        .wait_dst_stage_mask(&wait_stages)
        .command_buffers(&command_buffers)
        .signal_semaphores(&signal_semaphores);

    unsafe { device.queue_submit(queue, &[submit_info], submission.fence) }
        .map_err(GraphicsError::vulkan("queue submit"))
}
