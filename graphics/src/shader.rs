//! Shader acquisition.
//!
//! The pipeline needs exactly two shaders, a vertex and a fragment stage.
//! They are read through the virtual file system and turned into SPIR-V
//! words, either directly from a `.spv` binary or by compiling a `.wgsl`
//! source with naga.

use std::ffi::{CStr, CString};
use std::io::Cursor;

use lantern_vfs::{Vfs, path};

use crate::error::GraphicsError;

/// Entry point used by precompiled SPIR-V binaries.
pub const DEFAULT_ENTRY_POINT: &CStr = c"main";

/// SPIR-V magic number (first word of every module).
pub const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Programmable pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

/// SPIR-V code for one stage plus the entry point to call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderCode {
    stage: ShaderStage,
    words: Vec<u32>,
    entry_point: CString,
}

impl ShaderCode {
    /// Interpret `bytes` as a SPIR-V binary.
    ///
    /// The length must be a multiple of four and the module must start with
    /// the SPIR-V magic number (either endianness).
    pub fn from_spirv_bytes(stage: ShaderStage, bytes: &[u8]) -> Result<Self, GraphicsError> {
        let words = ash::util::read_spv(&mut Cursor::new(bytes))
            .map_err(|e| GraphicsError::InvalidShader(format!("{stage:?} shader: {e}")))?;

        Ok(Self {
            stage,
            words,
            entry_point: DEFAULT_ENTRY_POINT.to_owned(),
        })
    }

    /// Compile WGSL source to SPIR-V.
    ///
    /// The module must contain exactly one entry point for `stage`; its name
    /// becomes the entry point.
    #[cfg(feature = "wgsl-shaders")]
    pub fn from_wgsl(stage: ShaderStage, source: &str) -> Result<Self, GraphicsError> {
        let module = naga::front::wgsl::parse_str(source).map_err(|e| {
            GraphicsError::ShaderCompilationFailed(format!("WGSL parse error: {e}"))
        })?;

        let mut validator = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        );
        let info = validator.validate(&module).map_err(|e| {
            GraphicsError::ShaderCompilationFailed(format!("Validation error: {e}"))
        })?;

        let naga_stage = match stage {
            ShaderStage::Vertex => naga::ShaderStage::Vertex,
            ShaderStage::Fragment => naga::ShaderStage::Fragment,
        };

        let mut candidates = module.entry_points.iter().filter(|ep| ep.stage == naga_stage);
        let entry_point = match (candidates.next(), candidates.next()) {
            (Some(ep), None) => ep.name.clone(),
            (None, _) => {
                return Err(GraphicsError::ShaderCompilationFailed(format!(
                    "no {stage:?} entry point found"
                )));
            }
            (Some(_), Some(_)) => {
                return Err(GraphicsError::ShaderCompilationFailed(format!(
                    "more than one {stage:?} entry point"
                )));
            }
        };

        let options = naga::back::spv::Options {
            lang_version: (1, 0),
            flags: naga::back::spv::WriterFlags::empty(),
            capabilities: None,
            bounds_check_policies: naga::proc::BoundsCheckPolicies::default(),
            binding_map: Default::default(),
            debug_info: None,
            zero_initialize_workgroup_memory:
                naga::back::spv::ZeroInitializeWorkgroupMemoryMode::None,
        };

        let pipeline_options = naga::back::spv::PipelineOptions {
            shader_stage: naga_stage,
            entry_point: entry_point.clone(),
        };

        let words = naga::back::spv::write_vec(&module, &info, &options, Some(&pipeline_options))
            .map_err(|e| {
                GraphicsError::ShaderCompilationFailed(format!("SPIR-V generation error: {e}"))
            })?;

        let entry_point = CString::new(entry_point).map_err(|e| {
            GraphicsError::ShaderCompilationFailed(format!("Invalid entry point name: {e}"))
        })?;

        log::debug!(
            "Compiled {:?} shader {:?} to {} SPIR-V words",
            stage,
            entry_point,
            words.len()
        );

        Ok(Self {
            stage,
            words,
            entry_point,
        })
    }

    /// Load a shader through the virtual file system.
    ///
    /// `.spv` files are used as-is, `.wgsl` files are compiled.
    pub fn load(vfs: &Vfs, file_path: &str, stage: ShaderStage) -> Result<Self, GraphicsError> {
        if !vfs.exists(file_path)? {
            return Err(GraphicsError::ShaderNotFound {
                stage,
                path: file_path.to_string(),
                mounted: vfs.sources().into_iter().map(String::from).collect(),
            });
        }

        let bytes = vfs.read(file_path)?;
        log::info!("Loaded {stage:?} shader {file_path} ({} bytes)", bytes.len());

        match path::extension(file_path).as_deref() {
            Some("spv") => Self::from_spirv_bytes(stage, &bytes),
            #[cfg(feature = "wgsl-shaders")]
            Some("wgsl") => {
                let source = std::str::from_utf8(&bytes).map_err(|e| {
                    GraphicsError::ShaderCompilationFailed(format!("Invalid UTF-8: {e}"))
                })?;
                Self::from_wgsl(stage, source)
            }
            _ => Err(GraphicsError::InvalidShader(format!(
                "unsupported shader file {file_path}"
            ))),
        }
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    /// SPIR-V words.
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    pub fn entry_point(&self) -> &CStr {
        &self.entry_point
    }
}

/// Vertex and fragment shader for the triangle pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSet {
    pub vertex: ShaderCode,
    pub fragment: ShaderCode,
}

impl ShaderSet {
    /// Load both stages. Reads exactly two files.
    pub fn load(vfs: &Vfs, vertex_path: &str, fragment_path: &str) -> Result<Self, GraphicsError> {
        Ok(Self {
            vertex: ShaderCode::load(vfs, vertex_path, ShaderStage::Vertex)?,
            fragment: ShaderCode::load(vfs, fragment_path, ShaderStage::Fragment)?,
        })
    }
}
