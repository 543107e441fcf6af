//! # headless-gl
//!
//! WebGL 1 and WebGL 2 rendering contexts without a window.
//!
//! ## Features
//!
//! - **WebGLRenderingContext**: WebGL 1.0 context with its extensions
//! - **WebGL2RenderingContext**: WebGL 2.0 context
//! - **Validation**: every entry point is checked before it reaches the driver
//! - **Object lifetime**: deferred deletion of bound and attached objects
//! - **Framebuffers**: completeness tracking with cached status
//!
//! ## Architecture
//!
//! The contexts validate arguments, track GL state and record the numeric
//! error codes of the WebGL model. Rendering itself is delegated to a
//! [`NativeDriver`], a flat function set over raw `u32` handles.
//! [`SoftwareDriver`] is an in-memory driver for tests and benchmarks.

pub mod attributes;
pub mod constants;
pub mod context;
pub mod draw;
pub mod driver;
pub mod error;
pub mod extensions;
pub mod formats;
pub mod framebuffer;
pub mod objects;
pub mod pixels;
pub mod shader_source;
pub mod state;
pub mod uniforms;
pub mod value;
pub mod webgl1;
pub mod webgl2;

pub use attributes::ContextAttributes;
pub use context::{ContextBase, DriverLimits, ImageData, WebGLContext, WebGLVersion};
pub use driver::{NativeDriver, ObjectKind, SoftwareDriver, SoftwareLimits};
pub use error::{ContextError, GlError, GlResult};
pub use extensions::{Extension, ExtensionId};
pub use objects::{
    WebGLBuffer, WebGLFramebuffer, WebGLProgram, WebGLRenderbuffer, WebGLShader, WebGLTexture,
    WebGLVertexArrayObject,
};
pub use uniforms::WebGLUniformLocation;
pub use value::{ActiveInfo, ParameterValue, ShaderPrecisionFormat};
pub use webgl1::WebGLRenderingContext;
pub use webgl2::WebGL2RenderingContext;

/// A context of either version, as picked by the attributes.
#[derive(Debug)]
pub enum RenderingContext<D: NativeDriver> {
    WebGL1(WebGLRenderingContext<D>),
    WebGL2(WebGL2RenderingContext<D>),
}

impl<D: NativeDriver> RenderingContext<D> {
    pub fn version(&self) -> WebGLVersion {
        match self {
            RenderingContext::WebGL1(_) => WebGLVersion::WebGL1,
            RenderingContext::WebGL2(_) => WebGLVersion::WebGL2,
        }
    }

    pub fn as_webgl1(&mut self) -> Option<&mut WebGLRenderingContext<D>> {
        match self {
            RenderingContext::WebGL1(ctx) => Some(ctx),
            RenderingContext::WebGL2(_) => None,
        }
    }

    pub fn as_webgl2(&mut self) -> Option<&mut WebGL2RenderingContext<D>> {
        match self {
            RenderingContext::WebGL1(_) => None,
            RenderingContext::WebGL2(ctx) => Some(ctx),
        }
    }
}

/// Create a `width` x `height` context over `driver`.
///
/// `createWebGL2Context` in the attributes selects the version.
pub fn create_context<D: NativeDriver>(
    width: i32,
    height: i32,
    attributes: ContextAttributes,
    driver: D,
) -> Result<RenderingContext<D>, ContextError> {
    if attributes.create_webgl2_context {
        WebGL2RenderingContext::new(driver, width, height, attributes).map(RenderingContext::WebGL2)
    } else {
        WebGLRenderingContext::new(driver, width, height, attributes).map(RenderingContext::WebGL1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_context_picks_version() {
        let ctx = create_context(2, 2, ContextAttributes::default(), SoftwareDriver::new())
            .expect("webgl1");
        assert_eq!(ctx.version(), WebGLVersion::WebGL1);

        let mut ctx = create_context(2, 2, ContextAttributes::webgl2(), SoftwareDriver::new())
            .expect("webgl2");
        assert_eq!(ctx.version(), WebGLVersion::WebGL2);
        assert!(ctx.as_webgl1().is_none());
        assert!(ctx.as_webgl2().is_some());
    }

    #[test]
    fn test_create_context_rejects_empty_surface() {
        let result = create_context(0, 2, ContextAttributes::default(), SoftwareDriver::new());
        assert!(matches!(result, Err(ContextError::InvalidDimensions { .. })));
    }
}
