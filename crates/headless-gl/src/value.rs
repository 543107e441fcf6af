//! Values returned by getters.

use crate::objects::{
    WebGLBuffer, WebGLFramebuffer, WebGLProgram, WebGLRenderbuffer, WebGLTexture,
    WebGLVertexArrayObject,
};

/// Result of `getParameter` and the other polymorphic getters.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ParameterValue {
    #[default]
    Null,
    Bool(bool),
    Int(i32),
    UInt(u32),
    Float(f32),
    String(String),
    BoolArray(Vec<bool>),
    Int32Array(Vec<i32>),
    Uint32Array(Vec<u32>),
    Float32Array(Vec<f32>),
    Buffer(WebGLBuffer),
    Texture(WebGLTexture),
    Framebuffer(WebGLFramebuffer),
    Renderbuffer(WebGLRenderbuffer),
    Program(WebGLProgram),
    VertexArray(WebGLVertexArrayObject),
}

impl ParameterValue {
    /// Integer view of a scalar value.
    pub fn as_i32(&self) -> Option<i32> {
        match *self {
            ParameterValue::Int(v) => Some(v),
            ParameterValue::UInt(v) => i32::try_from(v).ok(),
            ParameterValue::Float(v) => Some(v as i32),
            ParameterValue::Bool(v) => Some(v as i32),
            ParameterValue::Int32Array(ref v) => v.first().copied(),
            _ => None,
        }
    }

    /// Float view of a scalar value.
    pub fn as_f32(&self) -> Option<f32> {
        match *self {
            ParameterValue::Float(v) => Some(v),
            ParameterValue::Int(v) => Some(v as f32),
            ParameterValue::UInt(v) => Some(v as f32),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            ParameterValue::Bool(v) => Some(v),
            ParameterValue::Int(v) => Some(v != 0),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParameterValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ParameterValue::Null)
    }
}

macro_rules! impl_from_handle {
    ($($ty:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<Option<$ty>> for ParameterValue {
                fn from(value: Option<$ty>) -> Self {
                    value.map_or(ParameterValue::Null, ParameterValue::$variant)
                }
            }
        )*
    };
}

impl_from_handle!(
    WebGLBuffer => Buffer,
    WebGLTexture => Texture,
    WebGLFramebuffer => Framebuffer,
    WebGLRenderbuffer => Renderbuffer,
    WebGLProgram => Program,
    WebGLVertexArrayObject => VertexArray,
);

/// Active attribute or uniform description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveInfo {
    pub size: i32,
    pub ty: u32,
    pub name: String,
}

impl ActiveInfo {
    pub fn new(size: i32, ty: u32, name: impl Into<String>) -> Self {
        Self {
            size,
            ty,
            name: name.into(),
        }
    }
}

/// Range and precision of a shader numeric type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderPrecisionFormat {
    pub range_min: i32,
    pub range_max: i32,
    pub precision: i32,
}

/// Raw uniform contents as stored by the driver.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformData {
    Float(Vec<f32>),
    Int(Vec<i32>),
    UInt(Vec<u32>),
}

impl Default for UniformData {
    fn default() -> Self {
        UniformData::Float(Vec::new())
    }
}
