//! Context creation attributes.

use serde::{Deserialize, Serialize};

/// Options recognized at context creation.
///
/// Absent fields take the WebGL defaults. Use [`ContextAttributes::normalized`]
/// to obtain the attributes the context actually honors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContextAttributes {
    pub alpha: bool,
    pub depth: bool,
    pub stencil: bool,
    pub antialias: bool,
    pub premultiplied_alpha: bool,
    pub preserve_drawing_buffer: bool,
    pub prefer_low_power_to_high_performance: bool,
    pub fail_if_major_performance_caveat: bool,
    #[serde(rename = "createWebGL2Context")]
    pub create_webgl2_context: bool,
}

impl Default for ContextAttributes {
    fn default() -> Self {
        Self {
            alpha: true,
            depth: true,
            stencil: false,
            antialias: true,
            premultiplied_alpha: true,
            preserve_drawing_buffer: false,
            prefer_low_power_to_high_performance: false,
            fail_if_major_performance_caveat: false,
            create_webgl2_context: false,
        }
    }
}

impl ContextAttributes {
    /// Attributes for a WebGL 2 context.
    pub fn webgl2() -> Self {
        Self {
            create_webgl2_context: true,
            ..Default::default()
        }
    }

    /// Parse an options record. Unknown keys are ignored.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Apply the rules the native backend imposes.
    ///
    /// The default framebuffer is never multisampled, and premultiplied alpha
    /// only applies when there is an alpha channel.
    pub fn normalized(mut self) -> Self {
        self.antialias = false;
        if !self.alpha {
            self.premultiplied_alpha = false;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let attrs = ContextAttributes::default().normalized();
        assert!(attrs.alpha);
        assert!(attrs.depth);
        assert!(!attrs.stencil);
        assert!(!attrs.antialias);
        assert!(attrs.premultiplied_alpha);
        assert!(!attrs.preserve_drawing_buffer);
        assert!(!attrs.create_webgl2_context);
    }

    #[test]
    fn test_premultiplied_alpha_requires_alpha() {
        let attrs = ContextAttributes {
            alpha: false,
            ..Default::default()
        }
        .normalized();
        assert!(!attrs.premultiplied_alpha);
    }

    #[test]
    fn test_from_json_partial() {
        let attrs =
            ContextAttributes::from_json(r#"{"stencil": true, "createWebGL2Context": true, "foo": 1}"#)
                .unwrap();
        assert!(attrs.stencil);
        assert!(attrs.create_webgl2_context);
        assert!(attrs.depth);
    }

    #[test]
    fn test_from_json_rejects_wrong_types() {
        assert!(ContextAttributes::from_json(r#"{"alpha": "yes"}"#).is_err());
    }
}
