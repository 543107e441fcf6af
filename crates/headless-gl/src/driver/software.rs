//! In-memory reference driver.
//!
//! `SoftwareDriver` implements the [`NativeDriver`] surface without a GPU. It
//! keeps real storage for buffers and RGBA8 color images, so clears and
//! readbacks round-trip, scans shader sources for their attribute and uniform
//! declarations so programs report active variables, and records every draw
//! call instead of rasterizing. Tests and benchmarks drive the validation
//! layer through it.

use std::collections::{HashMap, HashSet};

use tracing::{debug, trace, warn};

use super::{NativeDriver, ObjectKind};
use crate::constants as gl;
use crate::value::{ActiveInfo, ParameterValue, ShaderPrecisionFormat, UniformData};

/// Implementation limits reported through `get_parameter`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoftwareLimits {
    pub max_texture_size: i32,
    pub max_cube_map_texture_size: i32,
    pub max_3d_texture_size: i32,
    pub max_array_texture_layers: i32,
    pub max_renderbuffer_size: i32,
    pub max_combined_texture_image_units: i32,
    pub max_texture_image_units: i32,
    pub max_vertex_texture_image_units: i32,
    pub max_vertex_attribs: i32,
    pub max_draw_buffers: i32,
    pub max_color_attachments: i32,
    pub max_vertex_uniform_vectors: i32,
    pub max_fragment_uniform_vectors: i32,
    pub max_varying_vectors: i32,
    pub max_samples: i32,
    pub max_viewport_dims: [i32; 2],
}

impl Default for SoftwareLimits {
    fn default() -> Self {
        Self {
            max_texture_size: 4096,
            max_cube_map_texture_size: 4096,
            max_3d_texture_size: 256,
            max_array_texture_layers: 256,
            max_renderbuffer_size: 4096,
            max_combined_texture_image_units: 16,
            max_texture_image_units: 16,
            max_vertex_texture_image_units: 16,
            max_vertex_attribs: 16,
            max_draw_buffers: 4,
            max_color_attachments: 4,
            max_vertex_uniform_vectors: 256,
            max_fragment_uniform_vectors: 256,
            max_varying_vectors: 15,
            max_samples: 4,
            max_viewport_dims: [4096, 4096],
        }
    }
}

/// Extensions the driver advertises unless told otherwise.
pub const DEFAULT_EXTENSIONS: &str = "GL_OES_element_index_uint GL_OES_standard_derivatives \
GL_OES_texture_float GL_OES_texture_float_linear GL_EXT_draw_buffers GL_EXT_blend_minmax \
GL_EXT_texture_filter_anisotropic GL_OES_vertex_array_object GL_EXT_shader_texture_lod \
GL_EXT_color_buffer_float";

/// A draw call that reached the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawCall {
    pub mode: u32,
    /// First vertex for array draws.
    pub first: i32,
    pub count: i32,
    /// Index type and byte offset for indexed draws.
    pub indices: Option<(u32, usize)>,
    pub instances: i32,
    pub program: u32,
    pub framebuffer: u32,
}

#[derive(Debug, Clone, Default)]
struct Image {
    width: i32,
    height: i32,
    depth: i32,
    pixels: Vec<u8>,
}

impl Image {
    fn new(width: i32, height: i32, depth: i32) -> Self {
        let len = [width, height, depth]
            .iter()
            .map(|v| usize::try_from(*v).unwrap_or(0))
            .product::<usize>()
            * 4;
        Self {
            width,
            height,
            depth,
            pixels: vec![0; len],
        }
    }

    fn offset(&self, x: i32, y: i32, z: i32) -> Option<usize> {
        if x < 0 || y < 0 || z < 0 || x >= self.width || y >= self.height || z >= self.depth {
            return None;
        }
        Some((((z * self.height + y) * self.width + x) as usize) * 4)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NativeAttachment {
    Texture { handle: u32, face: u32, level: i32 },
    Renderbuffer(u32),
}

#[derive(Debug, Clone)]
struct Declaration {
    ty: u32,
    name: String,
    size: i32,
}

#[derive(Debug, Clone, Default)]
struct NativeShader {
    shader_type: u32,
    source: String,
    compiled: bool,
    info_log: String,
    attributes: Vec<Declaration>,
    uniforms: Vec<Declaration>,
}

#[derive(Debug, Clone, Default)]
struct NativeProgram {
    shaders: Vec<u32>,
    bound_locations: HashMap<String, u32>,
    linked: bool,
    validated: bool,
    info_log: String,
    /// Active attributes with their locations.
    attributes: Vec<(ActiveInfo, i32)>,
    /// Active uniforms with their first location.
    uniforms: Vec<(ActiveInfo, i32)>,
    values: HashMap<i32, UniformData>,
}

#[derive(Debug, Clone)]
enum NativeObject {
    Buffer { data: Vec<u8>, usage: u32 },
    Texture {
        images: HashMap<(u32, i32), Image>,
        params: HashMap<u32, f32>,
    },
    Framebuffer {
        attachments: HashMap<u32, NativeAttachment>,
        draw_buffers: Vec<u32>,
    },
    Renderbuffer {
        image: Image,
        format: u32,
        samples: i32,
    },
    Program(Box<NativeProgram>),
    Shader(Box<NativeShader>),
    VertexArray { element_buffer: u32 },
}

impl NativeObject {
    fn kind(&self) -> ObjectKind {
        match self {
            NativeObject::Buffer { .. } => ObjectKind::Buffer,
            NativeObject::Texture { .. } => ObjectKind::Texture,
            NativeObject::Framebuffer { .. } => ObjectKind::Framebuffer,
            NativeObject::Renderbuffer { .. } => ObjectKind::Renderbuffer,
            NativeObject::Program(_) => ObjectKind::Program,
            NativeObject::Shader(_) => ObjectKind::Shader,
            NativeObject::VertexArray { .. } => ObjectKind::VertexArray,
        }
    }
}

/// Software implementation of [`NativeDriver`].
#[derive(Debug)]
pub struct SoftwareDriver {
    limits: SoftwareLimits,
    extensions: String,
    requested: HashSet<String>,
    destroyed: bool,
    error: u32,
    next_handle: u32,
    objects: HashMap<u32, NativeObject>,

    active_unit: usize,
    units: Vec<HashMap<u32, u32>>,
    array_buffer: u32,
    element_buffer: u32,
    vertex_array: u32,
    draw_framebuffer: u32,
    read_framebuffer: u32,
    renderbuffer: u32,
    program: u32,

    enabled: HashSet<u32>,
    state: HashMap<u32, ParameterValue>,
    clear_color: [f32; 4],
    color_mask: [bool; 4],
    scissor_box: [i32; 4],
    pack_alignment: usize,
    unpack_alignment: usize,

    draws: Vec<DrawCall>,
    fail_next_allocation: bool,
    refuse_objects: bool,
}

impl Default for SoftwareDriver {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! live {
    ($self:ident) => {
        if $self.destroyed {
            return;
        }
    };
    ($self:ident, $default:expr) => {
        if $self.destroyed {
            return $default;
        }
    };
}

impl SoftwareDriver {
    pub fn new() -> Self {
        Self::with_limits(SoftwareLimits::default())
    }

    pub fn with_limits(limits: SoftwareLimits) -> Self {
        let units = vec![HashMap::new(); limits.max_combined_texture_image_units.max(1) as usize];
        let mut driver = Self {
            limits,
            extensions: DEFAULT_EXTENSIONS.to_string(),
            requested: HashSet::new(),
            destroyed: false,
            error: gl::NO_ERROR,
            next_handle: 1,
            objects: HashMap::new(),
            active_unit: 0,
            units,
            array_buffer: 0,
            element_buffer: 0,
            vertex_array: 0,
            draw_framebuffer: 0,
            read_framebuffer: 0,
            renderbuffer: 0,
            program: 0,
            enabled: HashSet::from([gl::DITHER]),
            state: HashMap::new(),
            clear_color: [0.0; 4],
            color_mask: [true; 4],
            scissor_box: [0; 4],
            pack_alignment: 4,
            unpack_alignment: 4,
            draws: Vec::new(),
            fail_next_allocation: false,
            refuse_objects: false,
        };
        driver.reset_state();
        driver
    }

    /// Replace the advertised `GL_*` extension string.
    pub fn with_extensions(mut self, extensions: impl Into<String>) -> Self {
        self.extensions = extensions.into();
        self
    }

    /// Make the next storage allocation fail with `OUT_OF_MEMORY`.
    pub fn fail_next_allocation(&mut self) {
        self.fail_next_allocation = true;
    }

    /// Make object creation return `0` while set.
    pub fn refuse_objects(&mut self, refuse: bool) {
        self.refuse_objects = refuse;
    }

    /// Draw calls received so far.
    pub fn draw_calls(&self) -> &[DrawCall] {
        &self.draws
    }

    pub fn clear_draw_calls(&mut self) {
        self.draws.clear();
    }

    /// Number of live native objects of `kind`.
    pub fn live_objects(&self, kind: ObjectKind) -> usize {
        self.objects.values().filter(|o| o.kind() == kind).count()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Extensions requested through `request_extension`.
    pub fn requested_extensions(&self) -> impl Iterator<Item = &str> {
        self.requested.iter().map(String::as_str)
    }

    fn reset_state(&mut self) {
        use ParameterValue::*;
        let l = &self.limits;
        let entries = [
            (gl::MAX_TEXTURE_SIZE, Int(l.max_texture_size)),
            (gl::MAX_CUBE_MAP_TEXTURE_SIZE, Int(l.max_cube_map_texture_size)),
            (gl::MAX_3D_TEXTURE_SIZE, Int(l.max_3d_texture_size)),
            (gl::MAX_ARRAY_TEXTURE_LAYERS, Int(l.max_array_texture_layers)),
            (gl::MAX_RENDERBUFFER_SIZE, Int(l.max_renderbuffer_size)),
            (
                gl::MAX_COMBINED_TEXTURE_IMAGE_UNITS,
                Int(l.max_combined_texture_image_units),
            ),
            (gl::MAX_TEXTURE_IMAGE_UNITS, Int(l.max_texture_image_units)),
            (
                gl::MAX_VERTEX_TEXTURE_IMAGE_UNITS,
                Int(l.max_vertex_texture_image_units),
            ),
            (gl::MAX_VERTEX_ATTRIBS, Int(l.max_vertex_attribs)),
            (gl::MAX_DRAW_BUFFERS, Int(l.max_draw_buffers)),
            (gl::MAX_COLOR_ATTACHMENTS, Int(l.max_color_attachments)),
            (gl::MAX_VERTEX_UNIFORM_VECTORS, Int(l.max_vertex_uniform_vectors)),
            (
                gl::MAX_FRAGMENT_UNIFORM_VECTORS,
                Int(l.max_fragment_uniform_vectors),
            ),
            (gl::MAX_VARYING_VECTORS, Int(l.max_varying_vectors)),
            (gl::MAX_SAMPLES, Int(l.max_samples)),
            (gl::MAX_VIEWPORT_DIMS, Int32Array(l.max_viewport_dims.to_vec())),
            (gl::MAX_TEXTURE_MAX_ANISOTROPY_EXT, Float(16.0)),
            (gl::SUBPIXEL_BITS, Int(4)),
            (gl::RED_BITS, Int(8)),
            (gl::GREEN_BITS, Int(8)),
            (gl::BLUE_BITS, Int(8)),
            (gl::ALPHA_BITS, Int(8)),
            (gl::DEPTH_BITS, Int(24)),
            (gl::STENCIL_BITS, Int(8)),
            (gl::SAMPLE_BUFFERS, Int(0)),
            (gl::SAMPLES, Int(0)),
            (gl::VIEWPORT, Int32Array(vec![0; 4])),
            (gl::DEPTH_CLEAR_VALUE, Float(1.0)),
            (gl::STENCIL_CLEAR_VALUE, Int(0)),
            (gl::DEPTH_FUNC, Int(gl::LESS as i32)),
            (gl::DEPTH_RANGE, Float32Array(vec![0.0, 1.0])),
            (gl::DEPTH_WRITEMASK, Bool(true)),
            (gl::CULL_FACE_MODE, Int(gl::BACK as i32)),
            (gl::FRONT_FACE, Int(gl::CCW as i32)),
            (gl::LINE_WIDTH, Float(1.0)),
            (gl::POLYGON_OFFSET_FACTOR, Float(0.0)),
            (gl::POLYGON_OFFSET_UNITS, Float(0.0)),
            (gl::SAMPLE_COVERAGE_VALUE, Float(1.0)),
            (gl::SAMPLE_COVERAGE_INVERT, Bool(false)),
            (gl::BLEND_COLOR, Float32Array(vec![0.0; 4])),
            (gl::BLEND_EQUATION_RGB, Int(gl::FUNC_ADD as i32)),
            (gl::BLEND_EQUATION_ALPHA, Int(gl::FUNC_ADD as i32)),
            (gl::BLEND_SRC_RGB, Int(gl::ONE as i32)),
            (gl::BLEND_DST_RGB, Int(gl::ZERO as i32)),
            (gl::BLEND_SRC_ALPHA, Int(gl::ONE as i32)),
            (gl::BLEND_DST_ALPHA, Int(gl::ZERO as i32)),
            (gl::GENERATE_MIPMAP_HINT, Int(gl::DONT_CARE as i32)),
            (gl::FRAGMENT_SHADER_DERIVATIVE_HINT_OES, Int(gl::DONT_CARE as i32)),
            (gl::PACK_ALIGNMENT, Int(4)),
            (gl::UNPACK_ALIGNMENT, Int(4)),
        ];
        self.state = entries.into_iter().collect();
        for (func, reference, mask, write, fail, zfail, zpass) in [
            (
                gl::STENCIL_FUNC,
                gl::STENCIL_REF,
                gl::STENCIL_VALUE_MASK,
                gl::STENCIL_WRITEMASK,
                gl::STENCIL_FAIL,
                gl::STENCIL_PASS_DEPTH_FAIL,
                gl::STENCIL_PASS_DEPTH_PASS,
            ),
            (
                gl::STENCIL_BACK_FUNC,
                gl::STENCIL_BACK_REF,
                gl::STENCIL_BACK_VALUE_MASK,
                gl::STENCIL_BACK_WRITEMASK,
                gl::STENCIL_BACK_FAIL,
                gl::STENCIL_BACK_PASS_DEPTH_FAIL,
                gl::STENCIL_BACK_PASS_DEPTH_PASS,
            ),
        ] {
            self.state.insert(func, Int(gl::ALWAYS as i32));
            self.state.insert(reference, Int(0));
            self.state.insert(mask, UInt(u32::MAX));
            self.state.insert(write, UInt(u32::MAX));
            self.state.insert(fail, Int(gl::KEEP as i32));
            self.state.insert(zfail, Int(gl::KEEP as i32));
            self.state.insert(zpass, Int(gl::KEEP as i32));
        }
    }

    fn record(&mut self, code: u32) {
        if self.error == gl::NO_ERROR {
            self.error = code;
        }
    }

    fn set(&mut self, pname: u32, value: ParameterValue) {
        self.state.insert(pname, value);
    }

    fn allocate(&mut self, object: NativeObject) -> u32 {
        if self.refuse_objects {
            warn!(kind = object.kind().name(), "Refusing object creation");
            return 0;
        }
        let handle = self.next_handle;
        self.next_handle += 1;
        self.objects.insert(handle, object);
        handle
    }

    /// Consume a pending injected allocation failure.
    fn allocation_fails(&mut self) -> bool {
        if self.fail_next_allocation {
            self.fail_next_allocation = false;
            self.record(gl::OUT_OF_MEMORY);
            return true;
        }
        false
    }

    fn bound_buffer(&self, target: u32) -> u32 {
        match target {
            gl::ARRAY_BUFFER => self.array_buffer,
            gl::ELEMENT_ARRAY_BUFFER => self.element_buffer,
            _ => 0,
        }
    }

    fn buffer_mut(&mut self, target: u32) -> Option<(&mut Vec<u8>, &mut u32)> {
        let handle = self.bound_buffer(target);
        match self.objects.get_mut(&handle) {
            Some(NativeObject::Buffer { data, usage }) => Some((data, usage)),
            _ => None,
        }
    }

    fn bound_texture(&self, target: u32) -> u32 {
        let target = if (gl::TEXTURE_CUBE_MAP_POSITIVE_X..=gl::TEXTURE_CUBE_MAP_NEGATIVE_Z)
            .contains(&target)
        {
            gl::TEXTURE_CUBE_MAP
        } else {
            target
        };
        self.units
            .get(self.active_unit)
            .and_then(|unit| unit.get(&target).copied())
            .unwrap_or(0)
    }

    fn texture_mut(
        &mut self,
        target: u32,
    ) -> Option<(&mut HashMap<(u32, i32), Image>, &mut HashMap<u32, f32>)> {
        let handle = self.bound_texture(target);
        match self.objects.get_mut(&handle) {
            Some(NativeObject::Texture { images, params }) => Some((images, params)),
            _ => None,
        }
    }

    fn framebuffer_for(&self, target: u32) -> u32 {
        match target {
            gl::READ_FRAMEBUFFER => self.read_framebuffer,
            _ => self.draw_framebuffer,
        }
    }

    fn attachments_mut(&mut self, target: u32) -> Option<&mut HashMap<u32, NativeAttachment>> {
        let handle = self.framebuffer_for(target);
        match self.objects.get_mut(&handle) {
            Some(NativeObject::Framebuffer { attachments, .. }) => Some(attachments),
            _ => None,
        }
    }

    fn color_attachments(&self, framebuffer: u32) -> Vec<NativeAttachment> {
        match self.objects.get(&framebuffer) {
            Some(NativeObject::Framebuffer { attachments, .. }) => {
                let mut points: Vec<_> = attachments
                    .iter()
                    .filter(|(point, _)| {
                        (gl::COLOR_ATTACHMENT0..gl::COLOR_ATTACHMENT0 + 16).contains(*point)
                    })
                    .collect();
                points.sort_by_key(|(point, _)| **point);
                points.into_iter().map(|(_, a)| *a).collect()
            }
            _ => Vec::new(),
        }
    }

    fn image_mut(&mut self, attachment: NativeAttachment) -> Option<&mut Image> {
        match attachment {
            NativeAttachment::Texture {
                handle,
                face,
                level,
            } => match self.objects.get_mut(&handle) {
                Some(NativeObject::Texture { images, .. }) => images.get_mut(&(face, level)),
                _ => None,
            },
            NativeAttachment::Renderbuffer(handle) => match self.objects.get_mut(&handle) {
                Some(NativeObject::Renderbuffer { image, .. }) => Some(image),
                _ => None,
            },
        }
    }

    fn image(&self, attachment: NativeAttachment) -> Option<&Image> {
        match attachment {
            NativeAttachment::Texture {
                handle,
                face,
                level,
            } => match self.objects.get(&handle) {
                Some(NativeObject::Texture { images, .. }) => images.get(&(face, level)),
                _ => None,
            },
            NativeAttachment::Renderbuffer(handle) => match self.objects.get(&handle) {
                Some(NativeObject::Renderbuffer { image, .. }) => Some(image),
                _ => None,
            },
        }
    }

    fn program_mut(&mut self, handle: u32) -> Option<&mut NativeProgram> {
        match self.objects.get_mut(&handle) {
            Some(NativeObject::Program(program)) => Some(program),
            _ => None,
        }
    }

    fn program(&self, handle: u32) -> Option<&NativeProgram> {
        match self.objects.get(&handle) {
            Some(NativeObject::Program(program)) => Some(program),
            _ => None,
        }
    }

    fn shader(&self, handle: u32) -> Option<&NativeShader> {
        match self.objects.get(&handle) {
            Some(NativeObject::Shader(shader)) => Some(shader),
            _ => None,
        }
    }

    /// Write `pixels` into an image at a sub-rectangle, converting to RGBA8.
    #[allow(clippy::too_many_arguments)]
    fn store_pixels(
        image: &mut Image,
        offset: (i32, i32, i32),
        size: (i32, i32, i32),
        format: u32,
        ty: u32,
        pixels: &[u8],
        alignment: usize,
    ) {
        let components = match format {
            gl::RGBA | gl::RGBA_INTEGER => 4,
            gl::RGB | gl::RGB_INTEGER => 3,
            gl::LUMINANCE_ALPHA | gl::RG | gl::RG_INTEGER => 2,
            gl::ALPHA | gl::LUMINANCE | gl::RED | gl::RED_INTEGER => 1,
            _ => return,
        };
        if ty != gl::UNSIGNED_BYTE {
            return;
        }
        let (width, height, depth) = size;
        let stride = crate::pixels::row_stride(width.max(0) as usize, components, alignment);
        for z in 0..depth {
            for y in 0..height {
                for x in 0..width {
                    let src = ((z * height + y) as usize) * stride + x as usize * components;
                    let Some(texel) = pixels.get(src..src + components) else {
                        return;
                    };
                    let rgba = match (format, components) {
                        (gl::ALPHA, _) => [0, 0, 0, texel[0]],
                        (gl::LUMINANCE, _) => [texel[0], texel[0], texel[0], 255],
                        (gl::LUMINANCE_ALPHA, _) => [texel[0], texel[0], texel[0], texel[1]],
                        (_, 1) => [texel[0], 0, 0, 255],
                        (_, 2) => [texel[0], texel[1], 0, 255],
                        (_, 3) => [texel[0], texel[1], texel[2], 255],
                        _ => [texel[0], texel[1], texel[2], texel[3]],
                    };
                    if let Some(dst) = image.offset(offset.0 + x, offset.1 + y, offset.2 + z) {
                        image.pixels[dst..dst + 4].copy_from_slice(&rgba);
                    }
                }
            }
        }
    }

    fn check_size(&mut self, width: i32, height: i32, max: i32) -> bool {
        if width < 0 || height < 0 || width > max || height > max {
            self.record(gl::INVALID_VALUE);
            return false;
        }
        true
    }

    fn record_draw(&mut self, mode: u32, first: i32, count: i32, indices: Option<(u32, usize)>, instances: i32) {
        trace!(mode, count, instances, "Native draw");
        self.draws.push(DrawCall {
            mode,
            first,
            count,
            indices,
            instances,
            program: self.program,
            framebuffer: self.draw_framebuffer,
        });
    }

    fn write_uniform(&mut self, location: i32, data: Vec<UniformData>) {
        if location < 0 {
            return;
        }
        let current = self.program;
        let Some(program) = self.program_mut(current) else {
            self.record(gl::INVALID_OPERATION);
            return;
        };
        for (i, value) in data.into_iter().enumerate() {
            program.values.insert(location + i as i32, value);
        }
    }
}

// ==================== Shader scanning ====================

fn glsl_type(name: &str) -> Option<u32> {
    Some(match name {
        "float" => gl::FLOAT,
        "vec2" => gl::FLOAT_VEC2,
        "vec3" => gl::FLOAT_VEC3,
        "vec4" => gl::FLOAT_VEC4,
        "int" => gl::INT,
        "ivec2" => gl::INT_VEC2,
        "ivec3" => gl::INT_VEC3,
        "ivec4" => gl::INT_VEC4,
        "uint" => gl::UNSIGNED_INT,
        "uvec2" => gl::UNSIGNED_INT_VEC2,
        "uvec3" => gl::UNSIGNED_INT_VEC3,
        "uvec4" => gl::UNSIGNED_INT_VEC4,
        "bool" => gl::BOOL,
        "bvec2" => gl::BOOL_VEC2,
        "bvec3" => gl::BOOL_VEC3,
        "bvec4" => gl::BOOL_VEC4,
        "mat2" | "mat2x2" => gl::FLOAT_MAT2,
        "mat3" | "mat3x3" => gl::FLOAT_MAT3,
        "mat4" | "mat4x4" => gl::FLOAT_MAT4,
        "mat2x3" => gl::FLOAT_MAT2X3,
        "mat2x4" => gl::FLOAT_MAT2X4,
        "mat3x2" => gl::FLOAT_MAT3X2,
        "mat3x4" => gl::FLOAT_MAT3X4,
        "mat4x2" => gl::FLOAT_MAT4X2,
        "mat4x3" => gl::FLOAT_MAT4X3,
        "sampler2D" => gl::SAMPLER_2D,
        "samplerCube" => gl::SAMPLER_CUBE,
        "sampler3D" => gl::SAMPLER_3D,
        "sampler2DArray" => gl::SAMPLER_2D_ARRAY,
        "sampler2DShadow" => gl::SAMPLER_2D_SHADOW,
        "isampler2D" => gl::INT_SAMPLER_2D,
        "usampler2D" => gl::UNSIGNED_INT_SAMPLER_2D,
        _ => return None,
    })
}

/// Components stored per location for a uniform type.
fn type_components(ty: u32) -> usize {
    match ty {
        gl::FLOAT_MAT2 => 4,
        gl::FLOAT_MAT3 => 9,
        gl::FLOAT_MAT4 => 16,
        gl::FLOAT_MAT2X3 | gl::FLOAT_MAT3X2 => 6,
        gl::FLOAT_MAT2X4 | gl::FLOAT_MAT4X2 => 8,
        gl::FLOAT_MAT3X4 | gl::FLOAT_MAT4X3 => 12,
        gl::FLOAT_VEC4 | gl::INT_VEC4 | gl::BOOL_VEC4 | gl::UNSIGNED_INT_VEC4 => 4,
        gl::FLOAT_VEC3 | gl::INT_VEC3 | gl::BOOL_VEC3 | gl::UNSIGNED_INT_VEC3 => 3,
        gl::FLOAT_VEC2 | gl::INT_VEC2 | gl::BOOL_VEC2 | gl::UNSIGNED_INT_VEC2 => 2,
        _ => 1,
    }
}

fn zero_value(ty: u32) -> UniformData {
    let n = type_components(ty);
    match ty {
        gl::FLOAT
        | gl::FLOAT_VEC2
        | gl::FLOAT_VEC3
        | gl::FLOAT_VEC4
        | gl::FLOAT_MAT2
        | gl::FLOAT_MAT3
        | gl::FLOAT_MAT4
        | gl::FLOAT_MAT2X3
        | gl::FLOAT_MAT2X4
        | gl::FLOAT_MAT3X2
        | gl::FLOAT_MAT3X4
        | gl::FLOAT_MAT4X2
        | gl::FLOAT_MAT4X3 => UniformData::Float(vec![0.0; n]),
        gl::UNSIGNED_INT | gl::UNSIGNED_INT_VEC2 | gl::UNSIGNED_INT_VEC3 | gl::UNSIGNED_INT_VEC4 => {
            UniformData::UInt(vec![0; n])
        }
        _ => UniformData::Int(vec![0; n]),
    }
}

/// Attribute and uniform declarations of a shader source.
fn scan_declarations(source: &str, shader_type: u32) -> (Vec<Declaration>, Vec<Declaration>) {
    let code: String = source
        .lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .map(|line| line.split("//").next().unwrap_or(""))
        .collect::<Vec<_>>()
        .join("\n");
    let mut attributes = Vec::new();
    let mut uniforms = Vec::new();

    for statement in code.split([';', '{', '}']) {
        let mut tokens = statement
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty())
            .peekable();
        let Some(qualifier) = tokens.next() else {
            continue;
        };
        let target = match qualifier {
            "attribute" => &mut attributes,
            "in" if shader_type == gl::VERTEX_SHADER => &mut attributes,
            "uniform" => &mut uniforms,
            _ => continue,
        };
        let mut tokens = tokens.skip_while(|t| matches!(*t, "lowp" | "mediump" | "highp"));
        let Some(ty) = tokens.next().and_then(glsl_type) else {
            continue;
        };
        for name in tokens {
            let (name, size) = match name.split_once('[') {
                Some((base, rest)) => (
                    base,
                    rest.trim_end_matches(']').parse::<i32>().unwrap_or(1),
                ),
                None => (name, 1),
            };
            target.push(Declaration {
                ty,
                name: name.to_string(),
                size,
            });
        }
    }
    (attributes, uniforms)
}

impl NativeDriver for SoftwareDriver {
    // ==================== Lifecycle ====================

    fn get_error(&mut self) -> u32 {
        live!(self, gl::NO_ERROR);
        std::mem::replace(&mut self.error, gl::NO_ERROR)
    }

    fn supported_extensions(&mut self) -> String {
        live!(self, String::new());
        self.extensions.clone()
    }

    fn request_extension(&mut self, name: &str) {
        live!(self);
        self.requested.insert(name.to_string());
    }

    fn destroy(&mut self) {
        live!(self);
        debug!(objects = self.objects.len(), "Destroying software context");
        self.objects.clear();
        self.draws.clear();
        self.destroyed = true;
    }

    // ==================== Objects ====================

    fn create_object(&mut self, kind: ObjectKind) -> u32 {
        live!(self, 0);
        let object = match kind {
            ObjectKind::Buffer => NativeObject::Buffer {
                data: Vec::new(),
                usage: gl::STATIC_DRAW,
            },
            ObjectKind::Texture => NativeObject::Texture {
                images: HashMap::new(),
                params: HashMap::new(),
            },
            ObjectKind::Framebuffer => NativeObject::Framebuffer {
                attachments: HashMap::new(),
                draw_buffers: vec![gl::COLOR_ATTACHMENT0],
            },
            ObjectKind::Renderbuffer => NativeObject::Renderbuffer {
                image: Image::default(),
                format: gl::RGBA4,
                samples: 0,
            },
            ObjectKind::Program => NativeObject::Program(Box::default()),
            ObjectKind::Shader => {
                self.record(gl::INVALID_ENUM);
                return 0;
            }
            ObjectKind::VertexArray => NativeObject::VertexArray { element_buffer: 0 },
        };
        self.allocate(object)
    }

    fn create_shader(&mut self, shader_type: u32) -> u32 {
        live!(self, 0);
        if shader_type != gl::VERTEX_SHADER && shader_type != gl::FRAGMENT_SHADER {
            self.record(gl::INVALID_ENUM);
            return 0;
        }
        self.allocate(NativeObject::Shader(Box::new(NativeShader {
            shader_type,
            ..Default::default()
        })))
    }

    fn delete_object(&mut self, kind: ObjectKind, handle: u32) {
        live!(self);
        if !self.is_object(kind, handle) {
            return;
        }
        self.objects.remove(&handle);
        for slot in [
            &mut self.array_buffer,
            &mut self.element_buffer,
            &mut self.vertex_array,
            &mut self.draw_framebuffer,
            &mut self.read_framebuffer,
            &mut self.renderbuffer,
            &mut self.program,
        ] {
            if *slot == handle {
                *slot = 0;
            }
        }
        for unit in &mut self.units {
            unit.retain(|_, bound| *bound != handle);
        }
    }

    fn is_object(&mut self, kind: ObjectKind, handle: u32) -> bool {
        live!(self, false);
        self.objects.get(&handle).is_some_and(|o| o.kind() == kind)
    }

    // ==================== Bindings ====================

    fn active_texture(&mut self, texture: u32) {
        live!(self);
        let unit = texture.wrapping_sub(gl::TEXTURE0) as usize;
        if unit >= self.units.len() {
            self.record(gl::INVALID_ENUM);
            return;
        }
        self.active_unit = unit;
    }

    fn bind_buffer(&mut self, target: u32, buffer: u32) {
        live!(self);
        if buffer != 0 && !self.is_object(ObjectKind::Buffer, buffer) {
            self.record(gl::INVALID_OPERATION);
            return;
        }
        match target {
            gl::ARRAY_BUFFER => self.array_buffer = buffer,
            gl::ELEMENT_ARRAY_BUFFER => {
                self.element_buffer = buffer;
                let vao = self.vertex_array;
                if let Some(NativeObject::VertexArray { element_buffer }) = self.objects.get_mut(&vao) {
                    *element_buffer = buffer;
                }
            }
            _ => self.record(gl::INVALID_ENUM),
        }
    }

    fn bind_texture(&mut self, target: u32, texture: u32) {
        live!(self);
        if !matches!(
            target,
            gl::TEXTURE_2D | gl::TEXTURE_CUBE_MAP | gl::TEXTURE_3D | gl::TEXTURE_2D_ARRAY
        ) {
            self.record(gl::INVALID_ENUM);
            return;
        }
        if texture != 0 && !self.is_object(ObjectKind::Texture, texture) {
            self.record(gl::INVALID_OPERATION);
            return;
        }
        if let Some(unit) = self.units.get_mut(self.active_unit) {
            if texture == 0 {
                unit.remove(&target);
            } else {
                unit.insert(target, texture);
            }
        }
    }

    fn bind_framebuffer(&mut self, target: u32, framebuffer: u32) {
        live!(self);
        if framebuffer != 0 && !self.is_object(ObjectKind::Framebuffer, framebuffer) {
            self.record(gl::INVALID_OPERATION);
            return;
        }
        match target {
            gl::FRAMEBUFFER => {
                self.draw_framebuffer = framebuffer;
                self.read_framebuffer = framebuffer;
            }
            gl::DRAW_FRAMEBUFFER => self.draw_framebuffer = framebuffer,
            gl::READ_FRAMEBUFFER => self.read_framebuffer = framebuffer,
            _ => self.record(gl::INVALID_ENUM),
        }
    }

    fn bind_renderbuffer(&mut self, target: u32, renderbuffer: u32) {
        live!(self);
        if target != gl::RENDERBUFFER {
            self.record(gl::INVALID_ENUM);
            return;
        }
        if renderbuffer != 0 && !self.is_object(ObjectKind::Renderbuffer, renderbuffer) {
            self.record(gl::INVALID_OPERATION);
            return;
        }
        self.renderbuffer = renderbuffer;
    }

    fn bind_vertex_array(&mut self, array: u32) {
        live!(self);
        if array == 0 {
            self.vertex_array = 0;
            self.element_buffer = 0;
            return;
        }
        match self.objects.get(&array) {
            Some(NativeObject::VertexArray { element_buffer }) => {
                self.element_buffer = *element_buffer;
                self.vertex_array = array;
            }
            _ => self.record(gl::INVALID_OPERATION),
        }
    }

    fn use_program(&mut self, program: u32) {
        live!(self);
        if program != 0 && !self.program(program).is_some_and(|p| p.linked) {
            self.record(gl::INVALID_OPERATION);
            return;
        }
        self.program = program;
    }

    // ==================== Buffers ====================

    fn buffer_data(&mut self, target: u32, size: usize, data: Option<&[u8]>, usage: u32) {
        live!(self);
        if self.allocation_fails() {
            return;
        }
        let Some((storage, stored_usage)) = self.buffer_mut(target) else {
            self.record(gl::INVALID_OPERATION);
            return;
        };
        *storage = match data {
            Some(bytes) => bytes.to_vec(),
            None => vec![0; size],
        };
        *stored_usage = usage;
    }

    fn buffer_sub_data(&mut self, target: u32, offset: usize, data: &[u8]) {
        live!(self);
        let Some((storage, _)) = self.buffer_mut(target) else {
            self.record(gl::INVALID_OPERATION);
            return;
        };
        match storage.get_mut(offset..offset + data.len()) {
            Some(range) => range.copy_from_slice(data),
            None => self.record(gl::INVALID_VALUE),
        }
    }

    fn get_buffer_parameter(&mut self, target: u32, pname: u32) -> i32 {
        live!(self, 0);
        let Some((storage, usage)) = self.buffer_mut(target) else {
            self.record(gl::INVALID_OPERATION);
            return 0;
        };
        match pname {
            gl::BUFFER_SIZE => storage.len() as i32,
            gl::BUFFER_USAGE => *usage as i32,
            _ => {
                self.record(gl::INVALID_ENUM);
                0
            }
        }
    }

    // ==================== Fixed-function state ====================

    fn enable(&mut self, cap: u32) {
        live!(self);
        self.enabled.insert(cap);
    }

    fn disable(&mut self, cap: u32) {
        live!(self);
        self.enabled.remove(&cap);
    }

    fn is_enabled(&mut self, cap: u32) -> bool {
        live!(self, false);
        self.enabled.contains(&cap)
    }

    fn blend_color(&mut self, red: f32, green: f32, blue: f32, alpha: f32) {
        live!(self);
        let clamp = |v: f32| v.clamp(0.0, 1.0);
        self.set(
            gl::BLEND_COLOR,
            ParameterValue::Float32Array(vec![clamp(red), clamp(green), clamp(blue), clamp(alpha)]),
        );
    }

    fn blend_equation_separate(&mut self, mode_rgb: u32, mode_alpha: u32) {
        live!(self);
        self.set(gl::BLEND_EQUATION_RGB, ParameterValue::Int(mode_rgb as i32));
        self.set(gl::BLEND_EQUATION_ALPHA, ParameterValue::Int(mode_alpha as i32));
    }

    fn blend_func_separate(&mut self, src_rgb: u32, dst_rgb: u32, src_alpha: u32, dst_alpha: u32) {
        live!(self);
        self.set(gl::BLEND_SRC_RGB, ParameterValue::Int(src_rgb as i32));
        self.set(gl::BLEND_DST_RGB, ParameterValue::Int(dst_rgb as i32));
        self.set(gl::BLEND_SRC_ALPHA, ParameterValue::Int(src_alpha as i32));
        self.set(gl::BLEND_DST_ALPHA, ParameterValue::Int(dst_alpha as i32));
    }

    fn clear(&mut self, mask: u32) {
        live!(self);
        if mask & gl::COLOR_BUFFER_BIT == 0 {
            return;
        }
        let color = self.clear_color.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
        let write = self.color_mask;
        let scissor = self
            .enabled
            .contains(&gl::SCISSOR_TEST)
            .then_some(self.scissor_box);
        for attachment in self.color_attachments(self.draw_framebuffer) {
            let Some(image) = self.image_mut(attachment) else {
                continue;
            };
            let (x0, y0, x1, y1) = match scissor {
                Some([x, y, w, h]) => (x.max(0), y.max(0), (x + w).min(image.width), (y + h).min(image.height)),
                None => (0, 0, image.width, image.height),
            };
            for z in 0..image.depth {
                for y in y0..y1 {
                    for x in x0..x1 {
                        if let Some(at) = image.offset(x, y, z) {
                            for c in 0..4 {
                                if write[c] {
                                    image.pixels[at + c] = color[c];
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    fn clear_color(&mut self, red: f32, green: f32, blue: f32, alpha: f32) {
        live!(self);
        self.clear_color = [red, green, blue, alpha];
        self.set(
            gl::COLOR_CLEAR_VALUE,
            ParameterValue::Float32Array(vec![red, green, blue, alpha]),
        );
    }

    fn clear_depth(&mut self, depth: f32) {
        live!(self);
        self.set(gl::DEPTH_CLEAR_VALUE, ParameterValue::Float(depth.clamp(0.0, 1.0)));
    }

    fn clear_stencil(&mut self, stencil: i32) {
        live!(self);
        self.set(gl::STENCIL_CLEAR_VALUE, ParameterValue::Int(stencil));
    }

    fn color_mask(&mut self, red: bool, green: bool, blue: bool, alpha: bool) {
        live!(self);
        self.color_mask = [red, green, blue, alpha];
    }

    fn cull_face(&mut self, mode: u32) {
        live!(self);
        self.set(gl::CULL_FACE_MODE, ParameterValue::Int(mode as i32));
    }

    fn front_face(&mut self, mode: u32) {
        live!(self);
        self.set(gl::FRONT_FACE, ParameterValue::Int(mode as i32));
    }

    fn depth_func(&mut self, func: u32) {
        live!(self);
        self.set(gl::DEPTH_FUNC, ParameterValue::Int(func as i32));
    }

    fn depth_mask(&mut self, flag: bool) {
        live!(self);
        self.set(gl::DEPTH_WRITEMASK, ParameterValue::Bool(flag));
    }

    fn depth_range(&mut self, z_near: f32, z_far: f32) {
        live!(self);
        self.set(
            gl::DEPTH_RANGE,
            ParameterValue::Float32Array(vec![z_near.clamp(0.0, 1.0), z_far.clamp(0.0, 1.0)]),
        );
    }

    fn hint(&mut self, target: u32, mode: u32) {
        live!(self);
        self.set(target, ParameterValue::Int(mode as i32));
    }

    fn line_width(&mut self, width: f32) {
        live!(self);
        self.set(gl::LINE_WIDTH, ParameterValue::Float(width));
    }

    fn polygon_offset(&mut self, factor: f32, units: f32) {
        live!(self);
        self.set(gl::POLYGON_OFFSET_FACTOR, ParameterValue::Float(factor));
        self.set(gl::POLYGON_OFFSET_UNITS, ParameterValue::Float(units));
    }

    fn sample_coverage(&mut self, value: f32, invert: bool) {
        live!(self);
        self.set(gl::SAMPLE_COVERAGE_VALUE, ParameterValue::Float(value.clamp(0.0, 1.0)));
        self.set(gl::SAMPLE_COVERAGE_INVERT, ParameterValue::Bool(invert));
    }

    fn scissor(&mut self, x: i32, y: i32, width: i32, height: i32) {
        live!(self);
        self.scissor_box = [x, y, width, height];
    }

    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        live!(self);
        self.set(gl::VIEWPORT, ParameterValue::Int32Array(vec![x, y, width, height]));
    }

    fn stencil_func_separate(&mut self, face: u32, func: u32, reference: i32, mask: u32) {
        live!(self);
        let mut apply = |f, r, m| {
            self.state.insert(f, ParameterValue::Int(func as i32));
            self.state.insert(r, ParameterValue::Int(reference));
            self.state.insert(m, ParameterValue::UInt(mask));
        };
        if face != gl::BACK {
            apply(gl::STENCIL_FUNC, gl::STENCIL_REF, gl::STENCIL_VALUE_MASK);
        }
        if face != gl::FRONT {
            apply(
                gl::STENCIL_BACK_FUNC,
                gl::STENCIL_BACK_REF,
                gl::STENCIL_BACK_VALUE_MASK,
            );
        }
    }

    fn stencil_mask_separate(&mut self, face: u32, mask: u32) {
        live!(self);
        if face != gl::BACK {
            self.set(gl::STENCIL_WRITEMASK, ParameterValue::UInt(mask));
        }
        if face != gl::FRONT {
            self.set(gl::STENCIL_BACK_WRITEMASK, ParameterValue::UInt(mask));
        }
    }

    fn stencil_op_separate(&mut self, face: u32, fail: u32, zfail: u32, zpass: u32) {
        live!(self);
        let mut apply = |f, zf, zp| {
            self.state.insert(f, ParameterValue::Int(fail as i32));
            self.state.insert(zf, ParameterValue::Int(zfail as i32));
            self.state.insert(zp, ParameterValue::Int(zpass as i32));
        };
        if face != gl::BACK {
            apply(
                gl::STENCIL_FAIL,
                gl::STENCIL_PASS_DEPTH_FAIL,
                gl::STENCIL_PASS_DEPTH_PASS,
            );
        }
        if face != gl::FRONT {
            apply(
                gl::STENCIL_BACK_FAIL,
                gl::STENCIL_BACK_PASS_DEPTH_FAIL,
                gl::STENCIL_BACK_PASS_DEPTH_PASS,
            );
        }
    }

    fn pixel_storei(&mut self, pname: u32, param: i32) {
        live!(self);
        match pname {
            gl::PACK_ALIGNMENT => self.pack_alignment = param.max(1) as usize,
            gl::UNPACK_ALIGNMENT => self.unpack_alignment = param.max(1) as usize,
            _ => {}
        }
        self.set(pname, ParameterValue::Int(param));
    }

    fn finish(&mut self) {}

    fn flush(&mut self) {}

    fn get_parameter(&mut self, pname: u32) -> ParameterValue {
        live!(self, ParameterValue::Null);
        match pname {
            gl::SCISSOR_BOX => ParameterValue::Int32Array(self.scissor_box.to_vec()),
            gl::COLOR_WRITEMASK => ParameterValue::BoolArray(self.color_mask.to_vec()),
            gl::COLOR_CLEAR_VALUE => ParameterValue::Float32Array(self.clear_color.to_vec()),
            gl::BLEND
            | gl::CULL_FACE
            | gl::DEPTH_TEST
            | gl::DITHER
            | gl::POLYGON_OFFSET_FILL
            | gl::SAMPLE_ALPHA_TO_COVERAGE
            | gl::SAMPLE_COVERAGE
            | gl::SCISSOR_TEST
            | gl::STENCIL_TEST
            | gl::RASTERIZER_DISCARD => ParameterValue::Bool(self.enabled.contains(&pname)),
            _ => match self.state.get(&pname) {
                Some(value) => value.clone(),
                None => {
                    self.record(gl::INVALID_ENUM);
                    ParameterValue::Null
                }
            },
        }
    }

    // ==================== Shaders and programs ====================

    fn shader_source(&mut self, shader: u32, source: &str) {
        live!(self);
        match self.objects.get_mut(&shader) {
            Some(NativeObject::Shader(native)) => native.source = source.to_string(),
            _ => self.record(gl::INVALID_VALUE),
        }
    }

    fn compile_shader(&mut self, shader: u32) {
        live!(self);
        let Some(NativeObject::Shader(native)) = self.objects.get_mut(&shader) else {
            self.record(gl::INVALID_VALUE);
            return;
        };
        if native.source.contains("main") {
            let (attributes, uniforms) = scan_declarations(&native.source, native.shader_type);
            native.attributes = attributes;
            native.uniforms = uniforms;
            native.compiled = true;
            native.info_log.clear();
        } else {
            native.compiled = false;
            native.info_log = "ERROR: 0:1: 'main' : function not defined".to_string();
        }
    }

    fn get_shader_parameter(&mut self, shader: u32, pname: u32) -> i32 {
        live!(self, 0);
        let Some(native) = self.shader(shader) else {
            self.record(gl::INVALID_VALUE);
            return 0;
        };
        match pname {
            gl::COMPILE_STATUS => native.compiled as i32,
            gl::SHADER_TYPE => native.shader_type as i32,
            gl::DELETE_STATUS => 0,
            gl::SHADER_SOURCE_LENGTH => native.source.len() as i32,
            gl::INFO_LOG_LENGTH => native.info_log.len() as i32,
            _ => {
                self.record(gl::INVALID_ENUM);
                0
            }
        }
    }

    fn get_shader_info_log(&mut self, shader: u32) -> String {
        live!(self, String::new());
        self.shader(shader)
            .map(|s| s.info_log.clone())
            .unwrap_or_default()
    }

    fn get_shader_precision_format(
        &mut self,
        shader_type: u32,
        precision_type: u32,
    ) -> Option<ShaderPrecisionFormat> {
        live!(self, None);
        if shader_type != gl::VERTEX_SHADER && shader_type != gl::FRAGMENT_SHADER {
            self.record(gl::INVALID_ENUM);
            return None;
        }
        match precision_type {
            gl::LOW_FLOAT | gl::MEDIUM_FLOAT | gl::HIGH_FLOAT => Some(ShaderPrecisionFormat {
                range_min: 127,
                range_max: 127,
                precision: 23,
            }),
            gl::LOW_INT | gl::MEDIUM_INT | gl::HIGH_INT => Some(ShaderPrecisionFormat {
                range_min: 31,
                range_max: 30,
                precision: 0,
            }),
            _ => {
                self.record(gl::INVALID_ENUM);
                None
            }
        }
    }

    fn attach_shader(&mut self, program: u32, shader: u32) {
        live!(self);
        if self.shader(shader).is_none() {
            self.record(gl::INVALID_VALUE);
            return;
        }
        let code = match self.program_mut(program) {
            Some(native) if native.shaders.contains(&shader) => gl::INVALID_OPERATION,
            Some(native) => {
                native.shaders.push(shader);
                return;
            }
            None => gl::INVALID_VALUE,
        };
        self.record(code);
    }

    fn detach_shader(&mut self, program: u32, shader: u32) {
        live!(self);
        let code = match self.program_mut(program) {
            Some(native) if native.shaders.contains(&shader) => {
                native.shaders.retain(|s| *s != shader);
                return;
            }
            Some(_) => gl::INVALID_OPERATION,
            None => gl::INVALID_VALUE,
        };
        self.record(code);
    }

    fn bind_attrib_location(&mut self, program: u32, index: u32, name: &str) {
        live!(self);
        if index >= self.limits.max_vertex_attribs as u32 {
            self.record(gl::INVALID_VALUE);
            return;
        }
        match self.program_mut(program) {
            Some(native) => {
                native.bound_locations.insert(name.to_string(), index);
            }
            None => self.record(gl::INVALID_VALUE),
        }
    }

    fn link_program(&mut self, program: u32) {
        live!(self);
        let Some(native) = self.program(program) else {
            self.record(gl::INVALID_VALUE);
            return;
        };
        let shaders: Vec<&NativeShader> = native
            .shaders
            .iter()
            .filter_map(|s| self.shader(*s))
            .collect();
        let vertex = shaders.iter().find(|s| s.shader_type == gl::VERTEX_SHADER);
        let fragment = shaders.iter().find(|s| s.shader_type == gl::FRAGMENT_SHADER);

        let outcome = match (vertex, fragment) {
            (Some(v), Some(f)) if v.compiled && f.compiled => {
                let mut uniforms: Vec<Declaration> = Vec::new();
                for declaration in v.uniforms.iter().chain(&f.uniforms) {
                    if !uniforms.iter().any(|u| u.name == declaration.name) {
                        uniforms.push(declaration.clone());
                    }
                }
                Ok((v.attributes.clone(), uniforms))
            }
            (Some(_), Some(_)) => Err("Attached shaders must be compiled before linking".to_string()),
            _ => Err("Missing vertex or fragment shader".to_string()),
        };
        let max_attribs = self.limits.max_vertex_attribs;

        let Some(native) = self.program_mut(program) else {
            return;
        };
        native.values.clear();
        match outcome {
            Ok((attributes, uniforms)) => {
                let mut used: HashSet<i32> = native
                    .bound_locations
                    .iter()
                    .filter(|(name, _)| attributes.iter().any(|a| &a.name == *name))
                    .map(|(_, index)| *index as i32)
                    .collect();
                let mut next_free = 0;
                native.attributes = attributes
                    .into_iter()
                    .map(|a| {
                        let location = match native.bound_locations.get(&a.name) {
                            Some(index) => *index as i32,
                            None => {
                                while used.contains(&next_free) && next_free < max_attribs {
                                    next_free += 1;
                                }
                                used.insert(next_free);
                                next_free
                            }
                        };
                        (ActiveInfo::new(a.size, a.ty, a.name), location)
                    })
                    .collect();
                let mut location = 0;
                native.uniforms = uniforms
                    .into_iter()
                    .map(|u| {
                        let name = if u.size > 1 {
                            format!("{}[0]", u.name)
                        } else {
                            u.name
                        };
                        let first = location;
                        location += u.size;
                        (ActiveInfo::new(u.size, u.ty, name), first)
                    })
                    .collect();
                native.linked = true;
                native.info_log.clear();
            }
            Err(log) => {
                native.linked = false;
                native.attributes.clear();
                native.uniforms.clear();
                native.info_log = log;
            }
        }
    }

    fn validate_program(&mut self, program: u32) {
        live!(self);
        match self.program_mut(program) {
            Some(native) => native.validated = native.linked,
            None => self.record(gl::INVALID_VALUE),
        }
    }

    fn get_program_parameter(&mut self, program: u32, pname: u32) -> i32 {
        live!(self, 0);
        let Some(native) = self.program(program) else {
            self.record(gl::INVALID_VALUE);
            return 0;
        };
        match pname {
            gl::LINK_STATUS => native.linked as i32,
            gl::VALIDATE_STATUS => native.validated as i32,
            gl::DELETE_STATUS => 0,
            gl::ATTACHED_SHADERS => native.shaders.len() as i32,
            gl::ACTIVE_ATTRIBUTES => native.attributes.len() as i32,
            gl::ACTIVE_UNIFORMS => native.uniforms.len() as i32,
            gl::INFO_LOG_LENGTH => native.info_log.len() as i32,
            _ => {
                self.record(gl::INVALID_ENUM);
                0
            }
        }
    }

    fn get_program_info_log(&mut self, program: u32) -> String {
        live!(self, String::new());
        self.program(program)
            .map(|p| p.info_log.clone())
            .unwrap_or_default()
    }

    fn get_active_attrib(&mut self, program: u32, index: u32) -> Option<ActiveInfo> {
        live!(self, None);
        let info = self
            .program(program)
            .and_then(|p| p.attributes.get(index as usize))
            .map(|(info, _)| info.clone());
        if info.is_none() {
            self.record(gl::INVALID_VALUE);
        }
        info
    }

    fn get_active_uniform(&mut self, program: u32, index: u32) -> Option<ActiveInfo> {
        live!(self, None);
        let info = self
            .program(program)
            .and_then(|p| p.uniforms.get(index as usize))
            .map(|(info, _)| info.clone());
        if info.is_none() {
            self.record(gl::INVALID_VALUE);
        }
        info
    }

    fn get_attrib_location(&mut self, program: u32, name: &str) -> i32 {
        live!(self, -1);
        self.program(program)
            .and_then(|p| p.attributes.iter().find(|(info, _)| info.name == name))
            .map_or(-1, |(_, location)| *location)
    }

    fn get_uniform_location(&mut self, program: u32, name: &str) -> i32 {
        live!(self, -1);
        let Some(native) = self.program(program) else {
            return -1;
        };
        let (base, index) = match crate::uniforms::split_index(name) {
            Some((base, index)) => (base, index as i32),
            None => (name, 0),
        };
        native
            .uniforms
            .iter()
            .find(|(info, _)| {
                info.name == base || info.name.strip_suffix("[0]") == Some(base) || info.name == name
            })
            .filter(|(info, _)| index < info.size)
            .map_or(-1, |(_, first)| first + index)
    }

    fn get_uniform(&mut self, program: u32, location: i32) -> UniformData {
        live!(self, UniformData::default());
        let Some(native) = self.program(program) else {
            self.record(gl::INVALID_VALUE);
            return UniformData::default();
        };
        if let Some(value) = native.values.get(&location) {
            return value.clone();
        }
        native
            .uniforms
            .iter()
            .find(|(info, first)| location >= *first && location < first + info.size)
            .map(|(info, _)| zero_value(info.ty))
            .unwrap_or_default()
    }

    fn uniform_f(&mut self, location: i32, components: usize, values: &[f32]) {
        live!(self);
        let data = values
            .chunks_exact(components.max(1))
            .map(|c| UniformData::Float(c.to_vec()))
            .collect();
        self.write_uniform(location, data);
    }

    fn uniform_i(&mut self, location: i32, components: usize, values: &[i32]) {
        live!(self);
        let data = values
            .chunks_exact(components.max(1))
            .map(|c| UniformData::Int(c.to_vec()))
            .collect();
        self.write_uniform(location, data);
    }

    fn uniform_ui(&mut self, location: i32, components: usize, values: &[u32]) {
        live!(self);
        let data = values
            .chunks_exact(components.max(1))
            .map(|c| UniformData::UInt(c.to_vec()))
            .collect();
        self.write_uniform(location, data);
    }

    fn uniform_matrix(&mut self, location: i32, columns: usize, rows: usize, values: &[f32]) {
        live!(self);
        let data = values
            .chunks_exact((columns * rows).max(1))
            .map(|c| UniformData::Float(c.to_vec()))
            .collect();
        self.write_uniform(location, data);
    }

    // ==================== Vertex attributes ====================

    fn enable_vertex_attrib_array(&mut self, index: u32) {
        live!(self);
        if index >= self.limits.max_vertex_attribs as u32 {
            self.record(gl::INVALID_VALUE);
        }
    }

    fn disable_vertex_attrib_array(&mut self, index: u32) {
        live!(self);
        if index >= self.limits.max_vertex_attribs as u32 {
            self.record(gl::INVALID_VALUE);
        }
    }

    fn vertex_attrib_pointer(
        &mut self,
        index: u32,
        _size: i32,
        _ty: u32,
        _normalized: bool,
        _stride: i32,
        _offset: usize,
    ) {
        live!(self);
        if index >= self.limits.max_vertex_attribs as u32 {
            self.record(gl::INVALID_VALUE);
        } else if self.array_buffer == 0 {
            self.record(gl::INVALID_OPERATION);
        }
    }

    fn vertex_attrib_i_pointer(&mut self, index: u32, size: i32, ty: u32, stride: i32, offset: usize) {
        self.vertex_attrib_pointer(index, size, ty, false, stride, offset);
    }

    fn vertex_attrib_divisor(&mut self, index: u32, _divisor: u32) {
        live!(self);
        if index >= self.limits.max_vertex_attribs as u32 {
            self.record(gl::INVALID_VALUE);
        }
    }

    fn vertex_attrib_4f(&mut self, index: u32, value: [f32; 4]) {
        live!(self);
        if index >= self.limits.max_vertex_attribs as u32 {
            self.record(gl::INVALID_VALUE);
            return;
        }
        self.state.insert(
            gl::CURRENT_VERTEX_ATTRIB + 0x10000 * (index + 1),
            ParameterValue::Float32Array(value.to_vec()),
        );
    }

    // ==================== Textures ====================

    fn tex_image_2d(
        &mut self,
        target: u32,
        level: i32,
        _internal_format: u32,
        width: i32,
        height: i32,
        _border: i32,
        format: u32,
        ty: u32,
        pixels: Option<&[u8]>,
    ) {
        live!(self);
        let max = self.limits.max_texture_size;
        if !self.check_size(width, height, max) || self.allocation_fails() {
            return;
        }
        let alignment = self.unpack_alignment;
        let face = if target == gl::TEXTURE_CUBE_MAP { gl::TEXTURE_CUBE_MAP_POSITIVE_X } else { target };
        let Some((images, _)) = self.texture_mut(target) else {
            self.record(gl::INVALID_OPERATION);
            return;
        };
        let mut image = Image::new(width, height, 1);
        if let Some(pixels) = pixels {
            Self::store_pixels(&mut image, (0, 0, 0), (width, height, 1), format, ty, pixels, alignment);
        }
        images.insert((face, level), image);
    }

    fn tex_sub_image_2d(
        &mut self,
        target: u32,
        level: i32,
        xoffset: i32,
        yoffset: i32,
        width: i32,
        height: i32,
        format: u32,
        ty: u32,
        pixels: &[u8],
    ) {
        live!(self);
        let alignment = self.unpack_alignment;
        let Some((images, _)) = self.texture_mut(target) else {
            self.record(gl::INVALID_OPERATION);
            return;
        };
        let Some(image) = images.get_mut(&(target, level)) else {
            self.record(gl::INVALID_OPERATION);
            return;
        };
        if xoffset < 0 || yoffset < 0 || xoffset + width > image.width || yoffset + height > image.height {
            self.record(gl::INVALID_VALUE);
            return;
        }
        Self::store_pixels(image, (xoffset, yoffset, 0), (width, height, 1), format, ty, pixels, alignment);
    }

    fn tex_image_3d(
        &mut self,
        target: u32,
        level: i32,
        _internal_format: u32,
        width: i32,
        height: i32,
        depth: i32,
        _border: i32,
        format: u32,
        ty: u32,
        pixels: Option<&[u8]>,
    ) {
        live!(self);
        let max = self.limits.max_3d_texture_size;
        if !self.check_size(width, height, max) || !self.check_size(depth, 0, max) || self.allocation_fails() {
            return;
        }
        let alignment = self.unpack_alignment;
        let Some((images, _)) = self.texture_mut(target) else {
            self.record(gl::INVALID_OPERATION);
            return;
        };
        let mut image = Image::new(width, height, depth);
        if let Some(pixels) = pixels {
            Self::store_pixels(&mut image, (0, 0, 0), (width, height, depth), format, ty, pixels, alignment);
        }
        images.insert((target, level), image);
    }

    fn tex_sub_image_3d(
        &mut self,
        target: u32,
        level: i32,
        xoffset: i32,
        yoffset: i32,
        zoffset: i32,
        width: i32,
        height: i32,
        depth: i32,
        format: u32,
        ty: u32,
        pixels: &[u8],
    ) {
        live!(self);
        let alignment = self.unpack_alignment;
        let Some((images, _)) = self.texture_mut(target) else {
            self.record(gl::INVALID_OPERATION);
            return;
        };
        let Some(image) = images.get_mut(&(target, level)) else {
            self.record(gl::INVALID_OPERATION);
            return;
        };
        Self::store_pixels(
            image,
            (xoffset, yoffset, zoffset),
            (width, height, depth),
            format,
            ty,
            pixels,
            alignment,
        );
    }

    fn tex_storage_2d(&mut self, target: u32, levels: i32, _internal_format: u32, width: i32, height: i32) {
        live!(self);
        let max = self.limits.max_texture_size;
        if levels < 1 || !self.check_size(width, height, max) || self.allocation_fails() {
            return;
        }
        let Some((images, _)) = self.texture_mut(target) else {
            self.record(gl::INVALID_OPERATION);
            return;
        };
        for level in 0..levels {
            let image = Image::new((width >> level).max(1), (height >> level).max(1), 1);
            images.insert((target, level), image);
        }
    }

    fn tex_storage_3d(
        &mut self,
        target: u32,
        levels: i32,
        _internal_format: u32,
        width: i32,
        height: i32,
        depth: i32,
    ) {
        live!(self);
        let max = self.limits.max_3d_texture_size;
        if levels < 1 || !self.check_size(width, height, max) || self.allocation_fails() {
            return;
        }
        let Some((images, _)) = self.texture_mut(target) else {
            self.record(gl::INVALID_OPERATION);
            return;
        };
        for level in 0..levels {
            let layers = if target == gl::TEXTURE_2D_ARRAY { depth } else { (depth >> level).max(1) };
            let image = Image::new((width >> level).max(1), (height >> level).max(1), layers);
            images.insert((target, level), image);
        }
    }

    fn copy_tex_image_2d(
        &mut self,
        target: u32,
        level: i32,
        internal_format: u32,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        border: i32,
    ) {
        live!(self);
        let mut pixels = vec![0u8; (width.max(0) * height.max(0) * 4) as usize];
        let previous = std::mem::replace(&mut self.pack_alignment, 1);
        self.read_pixels(x, y, width, height, gl::RGBA, gl::UNSIGNED_BYTE, &mut pixels);
        self.pack_alignment = previous;
        let unpack = std::mem::replace(&mut self.unpack_alignment, 1);
        self.tex_image_2d(
            target,
            level,
            internal_format,
            width,
            height,
            border,
            gl::RGBA,
            gl::UNSIGNED_BYTE,
            Some(&pixels),
        );
        self.unpack_alignment = unpack;
    }

    fn copy_tex_sub_image_2d(
        &mut self,
        target: u32,
        level: i32,
        xoffset: i32,
        yoffset: i32,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    ) {
        live!(self);
        let mut pixels = vec![0u8; (width.max(0) * height.max(0) * 4) as usize];
        let previous = std::mem::replace(&mut self.pack_alignment, 1);
        self.read_pixels(x, y, width, height, gl::RGBA, gl::UNSIGNED_BYTE, &mut pixels);
        self.pack_alignment = previous;
        let unpack = std::mem::replace(&mut self.unpack_alignment, 1);
        self.tex_sub_image_2d(
            target,
            level,
            xoffset,
            yoffset,
            width,
            height,
            gl::RGBA,
            gl::UNSIGNED_BYTE,
            &pixels,
        );
        self.unpack_alignment = unpack;
    }

    fn generate_mipmap(&mut self, target: u32) {
        live!(self);
        let face = if target == gl::TEXTURE_CUBE_MAP { gl::TEXTURE_CUBE_MAP_POSITIVE_X } else { target };
        let Some((images, _)) = self.texture_mut(target) else {
            self.record(gl::INVALID_OPERATION);
            return;
        };
        let Some(base) = images.get(&(face, 0)).cloned() else {
            self.record(gl::INVALID_OPERATION);
            return;
        };
        let (mut width, mut height, mut level) = (base.width, base.height, 0);
        while width > 1 || height > 1 {
            width = (width / 2).max(1);
            height = (height / 2).max(1);
            level += 1;
            images.insert((face, level), Image::new(width, height, base.depth));
        }
    }

    fn tex_parameterf(&mut self, target: u32, pname: u32, param: f32) {
        live!(self);
        match self.texture_mut(target) {
            Some((_, params)) => {
                params.insert(pname, param);
            }
            None => self.record(gl::INVALID_OPERATION),
        }
    }

    fn tex_parameteri(&mut self, target: u32, pname: u32, param: i32) {
        self.tex_parameterf(target, pname, param as f32);
    }

    fn get_tex_parameter(&mut self, target: u32, pname: u32) -> f32 {
        live!(self, 0.0);
        let Some((_, params)) = self.texture_mut(target) else {
            self.record(gl::INVALID_OPERATION);
            return 0.0;
        };
        if let Some(value) = params.get(&pname) {
            return *value;
        }
        match pname {
            gl::TEXTURE_MIN_FILTER => gl::NEAREST_MIPMAP_LINEAR as f32,
            gl::TEXTURE_MAG_FILTER => gl::LINEAR as f32,
            gl::TEXTURE_WRAP_S | gl::TEXTURE_WRAP_T | gl::TEXTURE_WRAP_R => gl::REPEAT as f32,
            gl::TEXTURE_MAX_ANISOTROPY_EXT => 1.0,
            gl::TEXTURE_MAX_LEVEL => 1000.0,
            gl::TEXTURE_MAX_LOD => 1000.0,
            gl::TEXTURE_MIN_LOD => -1000.0,
            gl::TEXTURE_COMPARE_FUNC => gl::LEQUAL as f32,
            gl::TEXTURE_COMPARE_MODE | gl::TEXTURE_BASE_LEVEL => 0.0,
            _ => {
                self.record(gl::INVALID_ENUM);
                0.0
            }
        }
    }

    // ==================== Framebuffers ====================

    fn framebuffer_texture_2d(
        &mut self,
        target: u32,
        attachment: u32,
        textarget: u32,
        texture: u32,
        level: i32,
    ) {
        live!(self);
        let Some(attachments) = self.attachments_mut(target) else {
            self.record(gl::INVALID_OPERATION);
            return;
        };
        if texture == 0 {
            attachments.remove(&attachment);
        } else {
            attachments.insert(
                attachment,
                NativeAttachment::Texture {
                    handle: texture,
                    face: textarget,
                    level,
                },
            );
        }
    }

    fn framebuffer_renderbuffer(
        &mut self,
        target: u32,
        attachment: u32,
        _renderbuffer_target: u32,
        renderbuffer: u32,
    ) {
        live!(self);
        let Some(attachments) = self.attachments_mut(target) else {
            self.record(gl::INVALID_OPERATION);
            return;
        };
        if renderbuffer == 0 {
            attachments.remove(&attachment);
        } else {
            attachments.insert(attachment, NativeAttachment::Renderbuffer(renderbuffer));
        }
    }

    fn renderbuffer_storage(&mut self, target: u32, internal_format: u32, width: i32, height: i32) {
        self.renderbuffer_storage_multisample(target, 0, internal_format, width, height);
    }

    fn renderbuffer_storage_multisample(
        &mut self,
        target: u32,
        samples: i32,
        internal_format: u32,
        width: i32,
        height: i32,
    ) {
        live!(self);
        if target != gl::RENDERBUFFER {
            self.record(gl::INVALID_ENUM);
            return;
        }
        let max = self.limits.max_renderbuffer_size;
        if !self.check_size(width, height, max) || self.allocation_fails() {
            return;
        }
        let handle = self.renderbuffer;
        match self.objects.get_mut(&handle) {
            Some(NativeObject::Renderbuffer {
                image,
                format,
                samples: stored,
            }) => {
                *image = Image::new(width, height, 1);
                *format = internal_format;
                *stored = samples;
            }
            _ => self.record(gl::INVALID_OPERATION),
        }
    }

    fn get_renderbuffer_parameter(&mut self, target: u32, pname: u32) -> i32 {
        live!(self, 0);
        if target != gl::RENDERBUFFER {
            self.record(gl::INVALID_ENUM);
            return 0;
        }
        let handle = self.renderbuffer;
        let Some(NativeObject::Renderbuffer {
            image,
            format,
            samples,
        }) = self.objects.get(&handle)
        else {
            self.record(gl::INVALID_OPERATION);
            return 0;
        };
        let color = !crate::formats::is_renderable_depth_stencil_format(*format);
        match pname {
            gl::RENDERBUFFER_WIDTH => image.width,
            gl::RENDERBUFFER_HEIGHT => image.height,
            gl::RENDERBUFFER_INTERNAL_FORMAT => *format as i32,
            gl::RENDERBUFFER_SAMPLES => *samples,
            gl::RENDERBUFFER_RED_SIZE
            | gl::RENDERBUFFER_GREEN_SIZE
            | gl::RENDERBUFFER_BLUE_SIZE
            | gl::RENDERBUFFER_ALPHA_SIZE => {
                if color {
                    8
                } else {
                    0
                }
            }
            gl::RENDERBUFFER_DEPTH_SIZE => {
                if crate::formats::is_depth_format(*format) || crate::formats::is_depth_stencil_format(*format) {
                    24
                } else {
                    0
                }
            }
            gl::RENDERBUFFER_STENCIL_SIZE => {
                if *format == gl::STENCIL_INDEX8 || crate::formats::is_depth_stencil_format(*format) {
                    8
                } else {
                    0
                }
            }
            _ => {
                self.record(gl::INVALID_ENUM);
                0
            }
        }
    }

    fn check_framebuffer_status(&mut self, target: u32) -> u32 {
        live!(self, 0);
        let handle = self.framebuffer_for(target);
        match self.objects.get(&handle) {
            Some(NativeObject::Framebuffer { attachments, .. }) if attachments.is_empty() => {
                gl::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT
            }
            _ => gl::FRAMEBUFFER_COMPLETE,
        }
    }

    fn draw_buffers(&mut self, buffers: &[u32]) {
        live!(self);
        let handle = self.draw_framebuffer;
        if let Some(NativeObject::Framebuffer { draw_buffers, .. }) = self.objects.get_mut(&handle) {
            *draw_buffers = buffers.to_vec();
        }
    }

    fn read_pixels(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        format: u32,
        ty: u32,
        pixels: &mut [u8],
    ) {
        live!(self);
        let attachment = self.color_attachments(self.read_framebuffer).first().copied();
        let Some(image) = attachment.and_then(|a| self.image(a)) else {
            return;
        };
        let bytes_per_pixel = match (format, ty) {
            (gl::RGBA, gl::UNSIGNED_BYTE) => 4,
            (gl::RGBA, gl::FLOAT) => 16,
            _ => {
                self.record(gl::INVALID_OPERATION);
                return;
            }
        };
        let stride = crate::pixels::row_stride(width.max(0) as usize, bytes_per_pixel, self.pack_alignment);
        for row in 0..height {
            for col in 0..width {
                let Some(src) = image.offset(x + col, y + row, 0) else {
                    continue;
                };
                let texel = &image.pixels[src..src + 4];
                let dst = row as usize * stride + col as usize * bytes_per_pixel;
                let Some(out) = pixels.get_mut(dst..dst + bytes_per_pixel) else {
                    continue;
                };
                if ty == gl::FLOAT {
                    for (c, chunk) in out.chunks_exact_mut(4).enumerate() {
                        chunk.copy_from_slice(&(f32::from(texel[c]) / 255.0).to_ne_bytes());
                    }
                } else {
                    out.copy_from_slice(texel);
                }
            }
        }
    }

    // ==================== Drawing ====================

    fn draw_arrays(&mut self, mode: u32, first: i32, count: i32) {
        live!(self);
        self.record_draw(mode, first, count, None, 1);
    }

    fn draw_elements(&mut self, mode: u32, count: i32, ty: u32, offset: usize) {
        live!(self);
        self.record_draw(mode, 0, count, Some((ty, offset)), 1);
    }

    fn draw_arrays_instanced(&mut self, mode: u32, first: i32, count: i32, instances: i32) {
        live!(self);
        self.record_draw(mode, first, count, None, instances);
    }

    fn draw_elements_instanced(
        &mut self,
        mode: u32,
        count: i32,
        ty: u32,
        offset: usize,
        instances: i32,
    ) {
        live!(self);
        self.record_draw(mode, 0, count, Some((ty, offset)), instances);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn color_target(driver: &mut SoftwareDriver, width: i32, height: i32) -> u32 {
        let fb = driver.create_object(ObjectKind::Framebuffer);
        let rb = driver.create_object(ObjectKind::Renderbuffer);
        driver.bind_framebuffer(gl::FRAMEBUFFER, fb);
        driver.bind_renderbuffer(gl::RENDERBUFFER, rb);
        driver.renderbuffer_storage(gl::RENDERBUFFER, gl::RGBA4, width, height);
        driver.framebuffer_renderbuffer(gl::FRAMEBUFFER, gl::COLOR_ATTACHMENT0, gl::RENDERBUFFER, rb);
        fb
    }

    #[test]
    fn test_clear_and_read_back() {
        let mut driver = SoftwareDriver::new();
        color_target(&mut driver, 2, 2);
        driver.clear_color(0.0, 1.0, 0.0, 1.0);
        driver.clear(gl::COLOR_BUFFER_BIT);
        let mut out = vec![0u8; 16];
        driver.read_pixels(0, 0, 2, 2, gl::RGBA, gl::UNSIGNED_BYTE, &mut out);
        assert!(out.chunks(4).all(|p| p == [0, 255, 0, 255]));
        assert_eq!(driver.get_error(), gl::NO_ERROR);
    }

    #[test]
    fn test_scissored_clear() {
        let mut driver = SoftwareDriver::new();
        color_target(&mut driver, 2, 1);
        driver.enable(gl::SCISSOR_TEST);
        driver.scissor(1, 0, 1, 1);
        driver.clear_color(1.0, 1.0, 1.0, 1.0);
        driver.clear(gl::COLOR_BUFFER_BIT);
        let mut out = vec![0u8; 8];
        driver.read_pixels(0, 0, 2, 1, gl::RGBA, gl::UNSIGNED_BYTE, &mut out);
        assert_eq!(out, vec![0, 0, 0, 0, 255, 255, 255, 255]);
    }

    #[test]
    fn test_fault_injection() {
        let mut driver = SoftwareDriver::new();
        driver.refuse_objects(true);
        assert_eq!(driver.create_object(ObjectKind::Buffer), 0);
        driver.refuse_objects(false);
        let buffer = driver.create_object(ObjectKind::Buffer);
        driver.bind_buffer(gl::ARRAY_BUFFER, buffer);
        driver.fail_next_allocation();
        driver.buffer_data(gl::ARRAY_BUFFER, 16, None, gl::STATIC_DRAW);
        assert_eq!(driver.get_error(), gl::OUT_OF_MEMORY);
        assert_eq!(driver.get_buffer_parameter(gl::ARRAY_BUFFER, gl::BUFFER_SIZE), 0);
    }

    #[test]
    fn test_program_reflection() {
        let mut driver = SoftwareDriver::new();
        let vs = driver.create_shader(gl::VERTEX_SHADER);
        driver.shader_source(
            vs,
            "attribute vec2 position;\nuniform mat4 transform;\nvoid main() { gl_Position = vec4(position, 0.0, 1.0); }",
        );
        driver.compile_shader(vs);
        let fs = driver.create_shader(gl::FRAGMENT_SHADER);
        driver.shader_source(
            fs,
            "precision mediump float;\nuniform vec4 colors[3];\nvoid main() { gl_FragColor = colors[0]; }",
        );
        driver.compile_shader(fs);
        let program = driver.create_object(ObjectKind::Program);
        driver.attach_shader(program, vs);
        driver.attach_shader(program, fs);
        driver.link_program(program);

        assert_eq!(driver.get_program_parameter(program, gl::LINK_STATUS), 1);
        assert_eq!(driver.get_attrib_location(program, "position"), 0);
        assert_eq!(
            driver.get_active_uniform(program, 1),
            Some(ActiveInfo::new(3, gl::FLOAT_VEC4, "colors[0]"))
        );
        assert_eq!(driver.get_uniform_location(program, "transform"), 0);
        assert_eq!(driver.get_uniform_location(program, "colors[2]"), 3);
        assert_eq!(driver.get_uniform_location(program, "colors[3]"), -1);
    }

    #[test]
    fn test_calls_after_destroy_are_ignored() {
        let mut driver = SoftwareDriver::new();
        driver.destroy();
        assert!(driver.is_destroyed());
        assert_eq!(driver.create_object(ObjectKind::Texture), 0);
        driver.draw_arrays(gl::TRIANGLES, 0, 3);
        assert!(driver.draw_calls().is_empty());
    }
}
