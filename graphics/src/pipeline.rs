//! Render pass and graphics pipeline construction.
//!
//! The renderer draws one hard-coded triangle, so the whole object graph is
//! fixed: one color attachment, one subpass, an empty pipeline layout and a
//! pipeline with no vertex input. The fixed state is captured in descriptor
//! structs which backends translate into API objects.
//!
//! [`PipelineState`] is built once and survives chain recreation; only the
//! attachment format ties it to the chain, and that is assumed stable.

use std::ffi::CString;

use ash::vk;
use scopeguard::ScopeGuard;

use crate::backend::GpuBackend;
use crate::error::GraphicsError;
use crate::shader::ShaderSet;

/// One color attachment with its load/store behavior and layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorAttachmentDescriptor {
    pub format: vk::Format,
    pub load_op: vk::AttachmentLoadOp,
    pub store_op: vk::AttachmentStoreOp,
    pub stencil_load_op: vk::AttachmentLoadOp,
    pub stencil_store_op: vk::AttachmentStoreOp,
    pub initial_layout: vk::ImageLayout,
    pub final_layout: vk::ImageLayout,
}

/// Dependency from outside the render pass into subpass 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubpassDependencyDescriptor {
    pub src_stage: vk::PipelineStageFlags,
    pub src_access: vk::AccessFlags,
    pub dst_stage: vk::PipelineStageFlags,
    pub dst_access: vk::AccessFlags,
}

/// Render pass with a single subpass writing a single color attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderPassDescriptor {
    pub color: ColorAttachmentDescriptor,
    pub dependency: SubpassDependencyDescriptor,
}

impl RenderPassDescriptor {
    /// Clear, store and hand the image to the presentation engine.
    ///
    /// Color writes wait for the color-attachment-output stage so the
    /// subpass cannot write before the previous presentation released the
    /// image.
    pub fn presentable(format: vk::Format) -> Self {
        Self {
            color: ColorAttachmentDescriptor {
                format,
                load_op: vk::AttachmentLoadOp::CLEAR,
                store_op: vk::AttachmentStoreOp::STORE,
                stencil_load_op: vk::AttachmentLoadOp::DONT_CARE,
                stencil_store_op: vk::AttachmentStoreOp::DONT_CARE,
                initial_layout: vk::ImageLayout::UNDEFINED,
                final_layout: vk::ImageLayout::PRESENT_SRC_KHR,
            },
            dependency: SubpassDependencyDescriptor {
                src_stage: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
                src_access: vk::AccessFlags::empty(),
                dst_stage: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
                dst_access: vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
            },
        }
    }
}

/// Color blending for the single attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlendDescriptor {
    pub src_color: vk::BlendFactor,
    pub dst_color: vk::BlendFactor,
    pub color_op: vk::BlendOp,
    pub src_alpha: vk::BlendFactor,
    pub dst_alpha: vk::BlendFactor,
    pub alpha_op: vk::BlendOp,
    pub write_mask: vk::ColorComponentFlags,
}

impl BlendDescriptor {
    /// Standard "over" blending.
    pub const ALPHA: Self = Self {
        src_color: vk::BlendFactor::SRC_ALPHA,
        dst_color: vk::BlendFactor::ONE_MINUS_SRC_ALPHA,
        color_op: vk::BlendOp::ADD,
        src_alpha: vk::BlendFactor::ONE,
        dst_alpha: vk::BlendFactor::ZERO,
        alpha_op: vk::BlendOp::ADD,
        write_mask: vk::ColorComponentFlags::RGBA,
    };
}

/// One programmable stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderStageDescriptor {
    pub stage: vk::ShaderStageFlags,
    pub module: vk::ShaderModule,
    pub entry_point: CString,
}

/// Complete description of the triangle pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphicsPipelineDescriptor {
    pub render_pass: vk::RenderPass,
    pub layout: vk::PipelineLayout,
    pub stages: Vec<ShaderStageDescriptor>,
    pub topology: vk::PrimitiveTopology,
    pub dynamic_states: Vec<vk::DynamicState>,
    pub polygon_mode: vk::PolygonMode,
    pub cull_mode: vk::CullModeFlags,
    pub front_face: vk::FrontFace,
    pub line_width: f32,
    pub samples: vk::SampleCountFlags,
    pub blend: BlendDescriptor,
}

impl GraphicsPipelineDescriptor {
    /// Fixed state for the hard-coded triangle.
    ///
    /// No vertex input (positions live in the vertex shader), triangle list,
    /// viewport and scissor set per frame, back-face culling with clockwise
    /// front faces, one sample, alpha blending.
    pub fn fixed_triangle(
        render_pass: vk::RenderPass,
        layout: vk::PipelineLayout,
        stages: Vec<ShaderStageDescriptor>,
    ) -> Self {
        Self {
            render_pass,
            layout,
            stages,
            topology: vk::PrimitiveTopology::TRIANGLE_LIST,
            dynamic_states: vec![vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR],
            polygon_mode: vk::PolygonMode::FILL,
            cull_mode: vk::CullModeFlags::BACK,
            front_face: vk::FrontFace::CLOCKWISE,
            line_width: 1.0,
            samples: vk::SampleCountFlags::TYPE_1,
            blend: BlendDescriptor::ALPHA,
        }
    }
}

/// Render pass, pipeline layout, pipeline and the two shader modules.
#[derive(Debug)]
pub struct PipelineState {
    format: vk::Format,
    render_pass: vk::RenderPass,
    layout: vk::PipelineLayout,
    pipeline: vk::Pipeline,
    vertex_module: vk::ShaderModule,
    fragment_module: vk::ShaderModule,
}

impl PipelineState {
    /// Build the object graph for `format` from the given shaders.
    pub fn new<B: GpuBackend + ?Sized>(
        backend: &B,
        format: vk::Format,
        shaders: &ShaderSet,
    ) -> Result<Self, GraphicsError> {
        let mut state = scopeguard::guard(
            Self {
                format,
                render_pass: vk::RenderPass::null(),
                layout: vk::PipelineLayout::null(),
                pipeline: vk::Pipeline::null(),
                vertex_module: vk::ShaderModule::null(),
                fragment_module: vk::ShaderModule::null(),
            },
            |mut state| state.destroy(backend),
        );

        state.vertex_module = backend.create_shader_module(shaders.vertex.words())?;
        state.fragment_module = backend.create_shader_module(shaders.fragment.words())?;
        state.render_pass = backend.create_render_pass(&RenderPassDescriptor::presentable(format))?;
        state.layout = backend.create_pipeline_layout()?;

        let stages = vec![
            ShaderStageDescriptor {
                stage: vk::ShaderStageFlags::VERTEX,
                module: state.vertex_module,
                entry_point: shaders.vertex.entry_point().to_owned(),
            },
            ShaderStageDescriptor {
                stage: vk::ShaderStageFlags::FRAGMENT,
                module: state.fragment_module,
                entry_point: shaders.fragment.entry_point().to_owned(),
            },
        ];
        let descriptor =
            GraphicsPipelineDescriptor::fixed_triangle(state.render_pass, state.layout, stages);
        state.pipeline = backend.create_graphics_pipeline(&descriptor)?;

        log::info!("Built triangle pipeline for {:?}", format);

        Ok(ScopeGuard::into_inner(state))
    }

    /// Destroy pipeline, layout, render pass and shader modules.
    ///
    /// Null handles are skipped, so a partially built state can be released.
    pub fn destroy<B: GpuBackend + ?Sized>(&mut self, backend: &B) {
        if self.pipeline != vk::Pipeline::null() {
            backend.destroy_pipeline(std::mem::take(&mut self.pipeline));
        }
        if self.layout != vk::PipelineLayout::null() {
            backend.destroy_pipeline_layout(std::mem::take(&mut self.layout));
        }
        if self.render_pass != vk::RenderPass::null() {
            backend.destroy_render_pass(std::mem::take(&mut self.render_pass));
        }
        if self.vertex_module != vk::ShaderModule::null() {
            backend.destroy_shader_module(std::mem::take(&mut self.vertex_module));
        }
        if self.fragment_module != vk::ShaderModule::null() {
            backend.destroy_shader_module(std::mem::take(&mut self.fragment_module));
        }
    }

    /// Attachment format the render pass was built for.
    pub fn format(&self) -> vk::Format {
        self.format
    }

    pub fn render_pass(&self) -> vk::RenderPass {
        self.render_pass
    }

    pub fn layout(&self) -> vk::PipelineLayout {
        self.layout
    }

    pub fn pipeline(&self) -> vk::Pipeline {
        self.pipeline
    }

    pub fn shader_modules(&self) -> [vk::ShaderModule; 2] {
        [self.vertex_module, self.fragment_module]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presentable_render_pass() {
        let desc = RenderPassDescriptor::presentable(vk::Format::B8G8R8A8_SRGB);

        assert_eq!(desc.color.format, vk::Format::B8G8R8A8_SRGB);
        assert_eq!(desc.color.load_op, vk::AttachmentLoadOp::CLEAR);
        assert_eq!(desc.color.store_op, vk::AttachmentStoreOp::STORE);
        assert_eq!(desc.color.stencil_load_op, vk::AttachmentLoadOp::DONT_CARE);
        assert_eq!(desc.color.final_layout, vk::ImageLayout::PRESENT_SRC_KHR);
        assert_eq!(
            desc.dependency.dst_stage,
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
        );
        assert_eq!(
            desc.dependency.dst_access,
            vk::AccessFlags::COLOR_ATTACHMENT_WRITE
        );
    }

    #[test]
    fn test_fixed_triangle_state() {
        let desc = GraphicsPipelineDescriptor::fixed_triangle(
            vk::RenderPass::null(),
            vk::PipelineLayout::null(),
            Vec::new(),
        );

        assert_eq!(desc.topology, vk::PrimitiveTopology::TRIANGLE_LIST);
        assert_eq!(
            desc.dynamic_states,
            vec![vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR]
        );
        assert_eq!(desc.polygon_mode, vk::PolygonMode::FILL);
        assert_eq!(desc.cull_mode, vk::CullModeFlags::BACK);
        assert_eq!(desc.front_face, vk::FrontFace::CLOCKWISE);
        assert_eq!(desc.samples, vk::SampleCountFlags::TYPE_1);
        assert_eq!(desc.line_width, 1.0);
    }

    #[test]
    fn test_alpha_blend_factors() {
        let blend = BlendDescriptor::ALPHA;

        assert_eq!(blend.src_color, vk::BlendFactor::SRC_ALPHA);
        assert_eq!(blend.dst_color, vk::BlendFactor::ONE_MINUS_SRC_ALPHA);
        assert_eq!(blend.src_alpha, vk::BlendFactor::ONE);
        assert_eq!(blend.dst_alpha, vk::BlendFactor::ZERO);
        assert_eq!(blend.write_mask, vk::ColorComponentFlags::RGBA);
    }
}
