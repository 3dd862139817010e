//! Vulkan render pass, shader module and pipeline creation.

use ash::vk;

use crate::error::GraphicsError;
use crate::pipeline::{BlendDescriptor, GraphicsPipelineDescriptor, RenderPassDescriptor};

pub fn create_shader_module(
    device: &ash::Device,
    code: &[u32],
) -> Result<vk::ShaderModule, GraphicsError> {
    let create_info = vk::ShaderModuleCreateInfo::default().code(code);

    unsafe { device.create_shader_module(&create_info, None) }
        .map_err(GraphicsError::vulkan("create shader module"))
}

/// Single-subpass render pass writing one color attachment.
pub fn create_render_pass(
    device: &ash::Device,
    descriptor: &RenderPassDescriptor,
) -> Result<vk::RenderPass, GraphicsError> {
    let color = &descriptor.color;
    let attachments = [vk::AttachmentDescription::default()
        .format(color.format)
        .samples(vk::SampleCountFlags::TYPE_1)
        .load_op(color.load_op)
        .store_op(color.store_op)
        .stencil_load_op(color.stencil_load_op)
        .stencil_store_op(color.stencil_store_op)
        .initial_layout(color.initial_layout)
        .final_layout(color.final_layout)];

    let color_refs = [vk::AttachmentReference {
        attachment: 0,
        layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
    }];

    let subpasses = [vk::SubpassDescription::default()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(&color_refs)];

    let dependency = &descriptor.dependency;
    let dependencies = [vk::SubpassDependency::default()
        .src_subpass(vk::SUBPASS_EXTERNAL)
        .dst_subpass(0)
        .src_stage_mask(dependency.src_stage)
        .src_access_mask(dependency.src_access)
        .dst_stage_mask(dependency.dst_stage)
        .dst_access_mask(dependency.dst_access)];

    let create_info = vk::RenderPassCreateInfo::default()
        .attachments(&attachments)
        .subpasses(&subpasses)
        .dependencies(&dependencies);

    unsafe { device.create_render_pass(&create_info, None) }
        .map_err(GraphicsError::vulkan("create render pass"))
}

/// Layout with no descriptor sets and no push constants.
pub fn create_pipeline_layout(device: &ash::Device) -> Result<vk::PipelineLayout, GraphicsError> {
    let create_info = vk::PipelineLayoutCreateInfo::default();

    unsafe { device.create_pipeline_layout(&create_info, None) }
        .map_err(GraphicsError::vulkan("create pipeline layout"))
}

fn convert_blend_state(blend: &BlendDescriptor) -> vk::PipelineColorBlendAttachmentState {
    vk::PipelineColorBlendAttachmentState::default()
        .blend_enable(true)
        .src_color_blend_factor(blend.src_color)
        .dst_color_blend_factor(blend.dst_color)
        .color_blend_op(blend.color_op)
        .src_alpha_blend_factor(blend.src_alpha)
        .dst_alpha_blend_factor(blend.dst_alpha)
        .alpha_blend_op(blend.alpha_op)
        .color_write_mask(blend.write_mask)
}

pub fn create_graphics_pipeline(
    device: &ash::Device,
    descriptor: &GraphicsPipelineDescriptor,
) -> Result<vk::Pipeline, GraphicsError> {
    let shader_stages: Vec<vk::PipelineShaderStageCreateInfo> = descriptor
        .stages
        .iter()
        .map(|stage| {
            vk::PipelineShaderStageCreateInfo::default()
                .stage(stage.stage)
                .module(stage.module)
                .name(&stage.entry_point)
        })
        .collect();

    // Geometry is generated in the vertex shader.
    let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default();

    let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::default()
        .topology(descriptor.topology)
        .primitive_restart_enable(false);

    // Dynamic viewport and scissor
    let viewport_state = vk::PipelineViewportStateCreateInfo::default()
        .viewport_count(1)
        .scissor_count(1);

    let rasterization_state = vk::PipelineRasterizationStateCreateInfo::default()
        .depth_clamp_enable(false)
        .rasterizer_discard_enable(false)
        .polygon_mode(descriptor.polygon_mode)
        .line_width(descriptor.line_width)
        .cull_mode(descriptor.cull_mode)
        .front_face(descriptor.front_face)
        .depth_bias_enable(false);

    let multisample_state = vk::PipelineMultisampleStateCreateInfo::default()
        .sample_shading_enable(false)
        .rasterization_samples(descriptor.samples);

    let color_blend_attachments = [convert_blend_state(&descriptor.blend)];
    let color_blend_state = vk::PipelineColorBlendStateCreateInfo::default()
        .logic_op_enable(false)
        .attachments(&color_blend_attachments);

    let dynamic_state =
        vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&descriptor.dynamic_states);

    let pipeline_info = vk::GraphicsPipelineCreateInfo::default()
        .stages(&shader_stages)
        .vertex_input_state(&vertex_input_state)
        .input_assembly_state(&input_assembly_state)
        .viewport_state(&viewport_state)
        .rasterization_state(&rasterization_state)
        .multisample_state(&multisample_state)
        .color_blend_state(&color_blend_state)
        .dynamic_state(&dynamic_state)
        .layout(descriptor.layout)
        .render_pass(descriptor.render_pass)
        .subpass(0);

    let pipelines = unsafe {
        device.create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info], None)
    }
    .map_err(|(_, e)| GraphicsError::vulkan("create graphics pipeline")(e))?;

    pipelines
        .first()
        .copied()
        .ok_or_else(|| GraphicsError::InitializationFailed("driver returned no pipeline".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blend_state_conversion() {
        let state = convert_blend_state(&BlendDescriptor::ALPHA);

        assert_eq!(state.blend_enable, vk::TRUE);
        assert_eq!(state.src_color_blend_factor, vk::BlendFactor::SRC_ALPHA);
        assert_eq!(
            state.dst_color_blend_factor,
            vk::BlendFactor::ONE_MINUS_SRC_ALPHA
        );
        assert_eq!(state.src_alpha_blend_factor, vk::BlendFactor::ONE);
        assert_eq!(state.dst_alpha_blend_factor, vk::BlendFactor::ZERO);
        assert_eq!(state.color_write_mask, vk::ColorComponentFlags::RGBA);
    }
}
