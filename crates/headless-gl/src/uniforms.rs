//! Uniform locations and the checks shared by the `uniform*` setters.

use crate::constants as gl;
use crate::error::{GlError, GlResult};
use crate::objects::WebGLProgram;
use crate::value::{ActiveInfo, ParameterValue, UniformData};

/// A resolved uniform location.
///
/// A location is tied to the link generation of its program; once the program
/// is relinked the location is stale and every use fails with
/// `INVALID_OPERATION`.
#[derive(Debug, Clone, PartialEq)]
pub struct WebGLUniformLocation {
    pub(crate) location: i32,
    pub(crate) program: WebGLProgram,
    pub(crate) link_count: u32,
    pub(crate) info: ActiveInfo,
    /// Native locations of every array element, for `name[0]` lookups.
    pub(crate) array: Option<Vec<i32>>,
}

impl WebGLUniformLocation {
    /// Native location.
    pub fn location(&self) -> i32 {
        self.location
    }

    pub fn program(&self) -> WebGLProgram {
        self.program
    }

    /// Description of the uniform this location belongs to.
    pub fn active_info(&self) -> &ActiveInfo {
        &self.info
    }

    pub fn is_array(&self) -> bool {
        self.array.is_some()
    }
}

/// Component family of a uniform setter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformKind {
    Float,
    Int,
    UInt,
}

/// Components a uniform type consumes per element. Matrices report `0`.
pub fn uniform_type_size(ty: u32) -> usize {
    match ty {
        gl::BOOL_VEC4 | gl::INT_VEC4 | gl::FLOAT_VEC4 | gl::UNSIGNED_INT_VEC4 => 4,
        gl::BOOL_VEC3 | gl::INT_VEC3 | gl::FLOAT_VEC3 | gl::UNSIGNED_INT_VEC3 => 3,
        gl::BOOL_VEC2 | gl::INT_VEC2 | gl::FLOAT_VEC2 | gl::UNSIGNED_INT_VEC2 => 2,
        gl::BOOL | gl::INT | gl::UNSIGNED_INT | gl::FLOAT => 1,
        ty if is_sampler(ty) => 1,
        _ => 0,
    }
}

pub fn is_sampler(ty: u32) -> bool {
    matches!(
        ty,
        gl::SAMPLER_2D
            | gl::SAMPLER_CUBE
            | gl::SAMPLER_3D
            | gl::SAMPLER_2D_SHADOW
            | gl::SAMPLER_2D_ARRAY
            | gl::SAMPLER_2D_ARRAY_SHADOW
            | gl::SAMPLER_CUBE_SHADOW
            | gl::INT_SAMPLER_2D
            | gl::INT_SAMPLER_3D
            | gl::INT_SAMPLER_CUBE
            | gl::INT_SAMPLER_2D_ARRAY
            | gl::UNSIGNED_INT_SAMPLER_2D
            | gl::UNSIGNED_INT_SAMPLER_3D
            | gl::UNSIGNED_INT_SAMPLER_CUBE
            | gl::UNSIGNED_INT_SAMPLER_2D_ARRAY
    )
}

/// Checks for a scalar setter (`uniform{N}{f,i,ui}`) on an active location.
///
/// Samplers only take a single integer naming a valid texture unit.
pub(crate) fn check_scalar(
    location: &WebGLUniformLocation,
    components: usize,
    kind: UniformKind,
    first: f64,
    texture_units: usize,
) -> GlResult<()> {
    let ty = location.info.ty;
    if is_sampler(ty) {
        if components != 1 {
            return Err(GlError::InvalidValue);
        }
        if kind != UniformKind::Int {
            return Err(GlError::InvalidOperation);
        }
        if first < 0.0 || first >= texture_units as f64 {
            return Err(GlError::InvalidValue);
        }
    }
    if uniform_type_size(ty) > components {
        return Err(GlError::InvalidOperation);
    }
    Ok(())
}

/// Checks for a vector setter (`uniform{N}{f,i,ui}v`) on an active location.
pub(crate) fn check_vector(
    location: &WebGLUniformLocation,
    len: usize,
    components: usize,
) -> GlResult<()> {
    if uniform_type_size(location.info.ty) > components {
        return Err(GlError::InvalidOperation);
    }
    if len >= components && len % components == 0 {
        if location.array.is_some() || len == components {
            return Ok(());
        }
        return Err(GlError::InvalidOperation);
    }
    Err(GlError::InvalidValue)
}

/// Shape checks for `uniformMatrix*fv` that run before the location is
/// looked at.
pub(crate) fn check_matrix_shape(transpose: bool, len: usize, elements: usize) -> GlResult<()> {
    if transpose || len == 0 || len % elements != 0 {
        return Err(GlError::InvalidValue);
    }
    Ok(())
}

/// Matrix length check on an active location.
pub(crate) fn check_matrix_length(
    location: &WebGLUniformLocation,
    len: usize,
    elements: usize,
) -> GlResult<()> {
    if len == elements || location.array.is_some() {
        Ok(())
    } else {
        Err(GlError::InvalidValue)
    }
}

/// Native writes for a vector setter: one per array element location, or a
/// single write of the first `components` values.
pub(crate) fn element_writes<'a, T>(
    location: &WebGLUniformLocation,
    components: usize,
    values: &'a [T],
) -> Vec<(i32, &'a [T])> {
    match &location.array {
        Some(locations) => locations
            .iter()
            .copied()
            .zip(values.chunks_exact(components))
            .collect(),
        None => vec![(location.location, &values[..components.min(values.len())])],
    }
}

/// Split `name[N]` into `("name", N)`.
pub(crate) fn split_index(name: &str) -> Option<(&str, usize)> {
    let open = name.rfind('[')?;
    let digits = name[open + 1..].strip_suffix(']')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((&name[..open], digits.parse().ok()?))
}

/// Name under which an element lookup is listed among the active uniforms.
pub(crate) fn search_name(name: &str) -> String {
    match split_index(name) {
        Some((base, _)) => format!("{base}[0]"),
        None => name.to_string(),
    }
}

/// Shape raw driver contents by the uniform's declared type.
pub(crate) fn uniform_value(ty: u32, data: UniformData) -> ParameterValue {
    let floats = |data: UniformData| match data {
        UniformData::Float(v) => v,
        UniformData::Int(v) => v.into_iter().map(|x| x as f32).collect(),
        UniformData::UInt(v) => v.into_iter().map(|x| x as f32).collect(),
    };
    let ints = |data: UniformData| match data {
        UniformData::Float(v) => v.into_iter().map(|x| x as i32).collect(),
        UniformData::Int(v) => v,
        UniformData::UInt(v) => v.into_iter().map(|x| x as i32).collect(),
    };
    let uints = |data: UniformData| match data {
        UniformData::Float(v) => v.into_iter().map(|x| x as u32).collect(),
        UniformData::Int(v) => v.into_iter().map(|x| x as u32).collect(),
        UniformData::UInt(v) => v,
    };
    let take = |v: Vec<f32>, n: usize| v.into_iter().take(n).collect::<Vec<_>>();

    match ty {
        gl::FLOAT => floats(data)
            .first()
            .copied()
            .map_or(ParameterValue::Null, ParameterValue::Float),
        gl::FLOAT_VEC2 | gl::FLOAT_VEC3 | gl::FLOAT_VEC4 => {
            ParameterValue::Float32Array(take(floats(data), uniform_type_size(ty)))
        }
        gl::INT => ints(data)
            .first()
            .copied()
            .map_or(ParameterValue::Null, ParameterValue::Int),
        gl::INT_VEC2 | gl::INT_VEC3 | gl::INT_VEC4 => {
            let mut v: Vec<i32> = ints(data);
            v.truncate(uniform_type_size(ty));
            ParameterValue::Int32Array(v)
        }
        gl::UNSIGNED_INT => uints(data)
            .first()
            .copied()
            .map_or(ParameterValue::Null, ParameterValue::UInt),
        gl::UNSIGNED_INT_VEC2 | gl::UNSIGNED_INT_VEC3 | gl::UNSIGNED_INT_VEC4 => {
            let mut v: Vec<u32> = uints(data);
            v.truncate(uniform_type_size(ty));
            ParameterValue::Uint32Array(v)
        }
        gl::BOOL => ints(data)
            .first()
            .map_or(ParameterValue::Null, |v| ParameterValue::Bool(*v != 0)),
        gl::BOOL_VEC2 | gl::BOOL_VEC3 | gl::BOOL_VEC4 => {
            let v: Vec<i32> = ints(data);
            ParameterValue::BoolArray(
                v.into_iter()
                    .take(uniform_type_size(ty))
                    .map(|x| x != 0)
                    .collect(),
            )
        }
        gl::FLOAT_MAT2 => ParameterValue::Float32Array(take(floats(data), 4)),
        gl::FLOAT_MAT3 => ParameterValue::Float32Array(take(floats(data), 9)),
        gl::FLOAT_MAT4 => ParameterValue::Float32Array(take(floats(data), 16)),
        gl::FLOAT_MAT2X3 | gl::FLOAT_MAT3X2 => ParameterValue::Float32Array(take(floats(data), 6)),
        gl::FLOAT_MAT2X4 | gl::FLOAT_MAT4X2 => ParameterValue::Float32Array(take(floats(data), 8)),
        gl::FLOAT_MAT3X4 | gl::FLOAT_MAT4X3 => {
            ParameterValue::Float32Array(take(floats(data), 12))
        }
        ty if is_sampler(ty) => ints(data)
            .first()
            .copied()
            .map_or(ParameterValue::Null, ParameterValue::Int),
        _ => ParameterValue::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::{next_context_id, ObjectData, ObjectRegistry, ProgramData};

    fn location(ty: u32, array: Option<Vec<i32>>) -> WebGLUniformLocation {
        let mut reg = ObjectRegistry::new(next_context_id());
        let key = reg.insert(1, ObjectData::Program(ProgramData::default()));
        WebGLUniformLocation {
            location: 3,
            program: reg.wrap(key),
            link_count: 1,
            info: ActiveInfo::new(1, ty, "u"),
            array,
        }
    }

    #[test]
    fn test_type_sizes() {
        assert_eq!(uniform_type_size(gl::FLOAT_VEC3), 3);
        assert_eq!(uniform_type_size(gl::BOOL), 1);
        assert_eq!(uniform_type_size(gl::SAMPLER_CUBE), 1);
        assert_eq!(uniform_type_size(gl::FLOAT_MAT4), 0);
    }

    #[test]
    fn test_sampler_setter_rules() {
        let loc = location(gl::SAMPLER_2D, None);
        assert_eq!(check_scalar(&loc, 1, UniformKind::Int, 0.0, 8), Ok(()));
        assert_eq!(
            check_scalar(&loc, 1, UniformKind::Float, 0.0, 8),
            Err(GlError::InvalidOperation)
        );
        assert_eq!(
            check_scalar(&loc, 1, UniformKind::Int, 8.0, 8),
            Err(GlError::InvalidValue)
        );
        assert_eq!(
            check_scalar(&loc, 2, UniformKind::Int, 0.0, 8),
            Err(GlError::InvalidValue)
        );
    }

    #[test]
    fn test_scalar_too_few_components() {
        let loc = location(gl::FLOAT_VEC4, None);
        assert_eq!(
            check_scalar(&loc, 2, UniformKind::Float, 0.0, 8),
            Err(GlError::InvalidOperation)
        );
        assert_eq!(check_scalar(&loc, 4, UniformKind::Float, 0.0, 8), Ok(()));
    }

    #[test]
    fn test_vector_lengths() {
        let single = location(gl::FLOAT_VEC2, None);
        assert_eq!(check_vector(&single, 2, 2), Ok(()));
        assert_eq!(check_vector(&single, 4, 2), Err(GlError::InvalidOperation));
        assert_eq!(check_vector(&single, 3, 2), Err(GlError::InvalidValue));

        let array = location(gl::FLOAT_VEC2, Some(vec![3, 4]));
        assert_eq!(check_vector(&array, 4, 2), Ok(()));
    }

    #[test]
    fn test_matrix_checks() {
        assert_eq!(check_matrix_shape(true, 4, 4), Err(GlError::InvalidValue));
        assert_eq!(check_matrix_shape(false, 0, 4), Err(GlError::InvalidValue));
        assert_eq!(check_matrix_shape(false, 8, 4), Ok(()));
        let loc = location(gl::FLOAT_MAT2, None);
        assert_eq!(check_matrix_length(&loc, 8, 4), Err(GlError::InvalidValue));
    }

    #[test]
    fn test_element_writes_per_array_location() {
        let loc = location(gl::FLOAT_VEC2, Some(vec![10, 11]));
        let values = [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0];
        let writes = element_writes(&loc, 2, &values);
        assert_eq!(writes, vec![(10, &values[0..2]), (11, &values[2..4])]);
    }

    #[test]
    fn test_index_suffix() {
        assert_eq!(split_index("lights[3]"), Some(("lights", 3)));
        assert_eq!(split_index("lights"), None);
        assert_eq!(split_index("lights[]"), None);
        assert_eq!(search_name("a.b[2]"), "a.b[0]");
    }

    #[test]
    fn test_uniform_value_shapes() {
        assert_eq!(
            uniform_value(gl::FLOAT_VEC2, UniformData::Float(vec![1.0, 2.0, 0.0, 0.0])),
            ParameterValue::Float32Array(vec![1.0, 2.0])
        );
        assert_eq!(
            uniform_value(gl::BOOL, UniformData::Int(vec![1])),
            ParameterValue::Bool(true)
        );
        assert_eq!(
            uniform_value(gl::SAMPLER_2D, UniformData::Int(vec![2])),
            ParameterValue::Int(2)
        );
    }
}
