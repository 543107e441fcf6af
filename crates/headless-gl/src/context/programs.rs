//! Shaders, programs and uniforms.

use tracing::debug;

use super::ContextBase;
use crate::constants as gl;
use crate::driver::NativeDriver;
use crate::error::GlError;
use crate::objects::{ObjectKey, WebGLProgram, WebGLShader};
use crate::shader_source::{self, MAX_IDENTIFIER_LENGTH};
use crate::uniforms::{self, UniformKind, WebGLUniformLocation};
use crate::value::{ActiveInfo, ParameterValue, ShaderPrecisionFormat};

impl<D: NativeDriver> ContextBase<D> {
    // ==================== Shaders ====================

    pub(crate) fn shader_source(&mut self, shader: WebGLShader, source: &str) {
        if !shader_source::is_valid_string(source) {
            self.set_error(GlError::InvalidValue);
            return;
        }
        let Some(key) = self.checked(shader) else {
            return;
        };
        let handle = self.registry.handle(Some(key));
        self.driver.shader_source(handle, source);
        if let Some(data) = self.registry.shader_mut(key) {
            data.source = source.to_string();
        }
    }

    /// `compileShader`. With `screen_source` set the source is first checked
    /// for identifiers the driver must never see; a rejected source fails the
    /// compile without reaching the driver.
    pub(crate) fn compile_shader(&mut self, shader: WebGLShader, screen_source: bool) {
        let Some(key) = self.checked(shader) else {
            return;
        };
        if screen_source {
            let source = self
                .registry
                .shader(key)
                .map(|s| s.source.clone())
                .unwrap_or_default();
            if let Err(log) = shader_source::check_source(&source) {
                if let Some(data) = self.registry.shader_mut(key) {
                    data.compile_status = false;
                    data.compile_info = log;
                }
                return;
            }
        }

        let handle = self.registry.handle(Some(key));
        self.save_error();
        self.driver.compile_shader(handle);
        let error = self.driver.get_error();
        let status = self.driver.get_shader_parameter(handle, gl::COMPILE_STATUS) != 0;
        let info = self.driver.get_shader_info_log(handle);
        self.driver.get_error();
        self.restore_error(error);

        debug!(shader = handle, status, "Compiled shader");
        if let Some(data) = self.registry.shader_mut(key) {
            data.compile_status = status;
            data.compile_info = info;
        }
    }

    pub(crate) fn get_shader_parameter(&mut self, shader: WebGLShader, pname: u32) -> ParameterValue {
        let Some(key) = self.checked(shader) else {
            return ParameterValue::Null;
        };
        let pending = self.registry.is_pending_delete(key);
        let Some(data) = self.registry.shader(key) else {
            return ParameterValue::Null;
        };
        match pname {
            gl::DELETE_STATUS => ParameterValue::Bool(pending),
            gl::COMPILE_STATUS => ParameterValue::Bool(data.compile_status),
            gl::SHADER_TYPE => ParameterValue::Int(data.shader_type as i32),
            _ => {
                self.set_error(GlError::InvalidEnum);
                ParameterValue::Null
            }
        }
    }

    pub(crate) fn get_shader_info_log(&mut self, shader: WebGLShader) -> Option<String> {
        let key = self.checked(shader)?;
        self.registry.shader(key).map(|s| s.compile_info.clone())
    }

    pub(crate) fn get_shader_source(&mut self, shader: WebGLShader) -> Option<String> {
        let key = self.checked(shader)?;
        self.registry.shader(key).map(|s| s.source.clone())
    }

    pub(crate) fn get_shader_precision_format(
        &mut self,
        shader_type: u32,
        precision_type: u32,
    ) -> Option<ShaderPrecisionFormat> {
        let shader_ok = matches!(shader_type, gl::VERTEX_SHADER | gl::FRAGMENT_SHADER);
        let precision_ok = matches!(
            precision_type,
            gl::LOW_FLOAT | gl::MEDIUM_FLOAT | gl::HIGH_FLOAT | gl::LOW_INT | gl::MEDIUM_INT | gl::HIGH_INT
        );
        if !shader_ok || !precision_ok {
            self.set_error(GlError::InvalidEnum);
            return None;
        }
        self.driver
            .get_shader_precision_format(shader_type, precision_type)
    }

    // ==================== Program objects ====================

    /// Attaching links program to shader, so a deleted shader lives on until
    /// it is detached or the program goes away.
    pub(crate) fn attach_shader(&mut self, program: WebGLProgram, shader: WebGLShader) {
        let (Some(program), Some(shader)) = (self.registry.owns(program), self.registry.owns(shader))
        else {
            self.set_error(GlError::InvalidOperation);
            return;
        };
        if self.registry.is_linked(program, shader) {
            self.set_error(GlError::InvalidOperation);
            return;
        }
        let (program_handle, shader_handle) = (
            self.registry.handle(Some(program)),
            self.registry.handle(Some(shader)),
        );
        if self.speculative(|d| d.attach_shader(program_handle, shader_handle)) == gl::NO_ERROR {
            self.registry.link(program, shader);
        }
    }

    pub(crate) fn detach_shader(&mut self, program: WebGLProgram, shader: WebGLShader) {
        let Some(program) = self.checked(program) else {
            return;
        };
        let Some(shader) = self.checked(shader) else {
            return;
        };
        if !self.registry.is_linked(program, shader) {
            self.set_error(GlError::InvalidOperation);
            return;
        }
        let (program_handle, shader_handle) = (
            self.registry.handle(Some(program)),
            self.registry.handle(Some(shader)),
        );
        self.driver.detach_shader(program_handle, shader_handle);
        let mut released = Vec::new();
        self.registry.unlink(program, shader, &mut released);
        self.delete_released(released);
    }

    pub(crate) fn get_attached_shaders(&mut self, program: WebGLProgram) -> Option<Vec<WebGLShader>> {
        let key = self.checked(program)?;
        let references = self.registry.get(key)?.references.clone();
        Some(
            references
                .into_iter()
                .filter(|k| self.registry.shader(*k).is_some())
                .map(|k| self.registry.wrap(k))
                .collect(),
        )
    }

    pub(crate) fn bind_attrib_location(&mut self, program: WebGLProgram, index: u32, name: &str) {
        if !shader_source::is_valid_string(name) || name.len() > MAX_IDENTIFIER_LENGTH {
            self.set_error(GlError::InvalidValue);
            return;
        }
        if shader_source::is_reserved_attrib_name(name) {
            self.set_error(GlError::InvalidOperation);
            return;
        }
        if let Some(key) = self.checked(program) {
            let handle = self.registry.handle(Some(key));
            self.driver.bind_attrib_location(handle, index, name);
        }
    }

    /// `linkProgram`. Every link starts a new generation, which invalidates
    /// previously returned uniform locations.
    pub(crate) fn link_program(&mut self, program: WebGLProgram) {
        let Some(key) = self.checked(program) else {
            return;
        };
        if let Some(data) = self.registry.program_mut(key) {
            data.link_count += 1;
            data.attributes.clear();
        }
        let handle = self.registry.handle(Some(key));

        self.save_error();
        self.driver.link_program(handle);
        let error = self.driver.get_error();
        if error == gl::NO_ERROR {
            let status = self.record_link(key, handle);
            if let Some(data) = self.registry.program_mut(key) {
                data.link_status = status;
            }
            debug!(program = handle, status, "Linked program");
        }
        self.driver.get_error();
        self.restore_error(error);
    }

    /// Capture the active attributes and uniforms of a fresh link.
    ///
    /// Attribute locations are pinned by binding them and linking again, so
    /// the driver cannot move them on a later relink.
    fn record_link(&mut self, key: ObjectKey, handle: u32) -> bool {
        if self.driver.get_program_parameter(handle, gl::LINK_STATUS) == 0 {
            let log = self.driver.get_program_info_log(handle);
            self.set_link_log(key, log);
            return false;
        }

        let count = self
            .driver
            .get_program_parameter(handle, gl::ACTIVE_ATTRIBUTES)
            .max(0) as u32;
        let mut names = Vec::with_capacity(count as usize);
        let mut locations = Vec::with_capacity(count as usize);
        for index in 0..count {
            let name = self
                .driver
                .get_active_attrib(handle, index)
                .map(|info| info.name)
                .unwrap_or_default();
            locations.push(self.driver.get_attrib_location(handle, &name));
            names.push(name);
        }
        if let Some(data) = self.registry.program_mut(key) {
            data.attributes = locations.clone();
        }
        if let Some(name) = names.iter().find(|n| n.len() > MAX_IDENTIFIER_LENGTH) {
            self.set_link_log(key, format!("attribute {name} is too long"));
            return false;
        }

        for (name, location) in names.iter().zip(&locations) {
            if let Ok(location) = u32::try_from(*location) {
                self.driver.bind_attrib_location(handle, location, name);
            }
        }
        self.driver.link_program(handle);

        let count = self
            .driver
            .get_program_parameter(handle, gl::ACTIVE_UNIFORMS)
            .max(0) as u32;
        let uniforms: Vec<ActiveInfo> = (0..count)
            .filter_map(|index| self.driver.get_active_uniform(handle, index))
            .collect();
        let too_long = uniforms
            .iter()
            .find(|u| u.name.len() > MAX_IDENTIFIER_LENGTH)
            .map(|u| format!("uniform {} is too long", u.name));
        if let Some(data) = self.registry.program_mut(key) {
            data.uniforms = uniforms;
        }
        if let Some(log) = too_long {
            self.set_link_log(key, log);
            return false;
        }

        let log = self.driver.get_program_info_log(handle);
        self.set_link_log(key, log);
        true
    }

    fn set_link_log(&mut self, key: ObjectKey, log: String) {
        if let Some(data) = self.registry.program_mut(key) {
            data.link_info_log = log;
        }
    }

    pub(crate) fn validate_program(&mut self, program: WebGLProgram) {
        let Some(key) = self.checked(program) else {
            return;
        };
        let handle = self.registry.handle(Some(key));
        self.save_error();
        self.driver.validate_program(handle);
        let error = self.driver.get_error();
        if error == gl::NO_ERROR {
            let log = self.driver.get_program_info_log(handle);
            let status = self.driver.get_program_parameter(handle, gl::VALIDATE_STATUS) != 0;
            if let Some(data) = self.registry.program_mut(key) {
                data.link_info_log = log;
                data.validate_status = status;
            }
        }
        self.driver.get_error();
        self.restore_error(error);
    }

    pub(crate) fn get_program_parameter(&mut self, program: WebGLProgram, pname: u32) -> ParameterValue {
        let Some(key) = self.checked(program) else {
            return ParameterValue::Null;
        };
        let handle = self.registry.handle(Some(key));
        match pname {
            gl::DELETE_STATUS => ParameterValue::Bool(self.registry.is_pending_delete(key)),
            gl::LINK_STATUS => ParameterValue::Bool(
                self.registry.program(key).is_some_and(|p| p.link_status),
            ),
            gl::VALIDATE_STATUS => {
                ParameterValue::Bool(self.driver.get_program_parameter(handle, pname) != 0)
            }
            gl::ATTACHED_SHADERS | gl::ACTIVE_ATTRIBUTES | gl::ACTIVE_UNIFORMS => {
                ParameterValue::Int(self.driver.get_program_parameter(handle, pname))
            }
            _ => {
                self.set_error(GlError::InvalidEnum);
                ParameterValue::Null
            }
        }
    }

    pub(crate) fn get_program_info_log(&mut self, program: WebGLProgram) -> Option<String> {
        let key = self.checked(program)?;
        self.registry.program(key).map(|p| p.link_info_log.clone())
    }

    // ==================== Introspection ====================

    pub(crate) fn get_active_attrib(&mut self, program: WebGLProgram, index: u32) -> Option<ActiveInfo> {
        let key = self.checked(program)?;
        let handle = self.registry.handle(Some(key));
        self.driver.get_active_attrib(handle, index)
    }

    pub(crate) fn get_active_uniform(&mut self, program: WebGLProgram, index: u32) -> Option<ActiveInfo> {
        let key = self.checked(program)?;
        let handle = self.registry.handle(Some(key));
        self.driver.get_active_uniform(handle, index)
    }

    pub(crate) fn get_attrib_location(&mut self, program: WebGLProgram, name: &str) -> i32 {
        if !shader_source::is_valid_string(name) || name.len() > MAX_IDENTIFIER_LENGTH {
            self.set_error(GlError::InvalidValue);
            return -1;
        }
        let Some(key) = self.checked(program) else {
            return -1;
        };
        let handle = self.registry.handle(Some(key));
        self.driver.get_attrib_location(handle, name)
    }

    /// `getUniformLocation`.
    ///
    /// `name[N]` resolves one element and must stay inside the declared
    /// size. The bare array name and `name[0]` also record the location of
    /// every element, so array setters can write past the first one.
    pub(crate) fn get_uniform_location(
        &mut self,
        program: WebGLProgram,
        name: &str,
    ) -> Option<WebGLUniformLocation> {
        if !shader_source::is_valid_string(name) {
            self.set_error(GlError::InvalidValue);
            return None;
        }
        let key = self.checked(program)?;
        let handle = self.registry.handle(Some(key));
        let location = self.driver.get_uniform_location(handle, name);
        if location < 0 {
            return None;
        }

        let (base, element) = match uniforms::split_index(name) {
            Some((base, index)) => (base, Some(index)),
            None => (name, None),
        };
        let data = self.registry.program(key)?;
        let link_count = data.link_count;
        let info = data
            .uniforms
            .iter()
            .find(|u| u.name == name || u.name.strip_suffix("[0]") == Some(base))
            .cloned()?;
        let is_array = info.name.ends_with("[0]");
        if element.is_some_and(|index| index >= info.size.max(0) as usize) {
            return None;
        }

        let array = (is_array && element.unwrap_or(0) == 0).then(|| {
            self.save_error();
            let mut locations = Vec::new();
            for index in 0..info.size {
                let element = self
                    .driver
                    .get_uniform_location(handle, &format!("{base}[{index}]"));
                if self.driver.get_error() != gl::NO_ERROR || element < 0 {
                    break;
                }
                locations.push(element);
            }
            self.restore_error(gl::NO_ERROR);
            locations
        });

        Some(WebGLUniformLocation {
            location,
            program,
            link_count,
            info,
            array,
        })
    }

    pub(crate) fn get_uniform(
        &mut self,
        program: WebGLProgram,
        location: &WebGLUniformLocation,
    ) -> ParameterValue {
        let Some(key) = self.checked(program) else {
            return ParameterValue::Null;
        };
        let current = self.registry.program(key).map(|p| p.link_count);
        if location.program != program || current != Some(location.link_count) {
            self.set_error(GlError::InvalidOperation);
            return ParameterValue::Null;
        }
        let handle = self.registry.handle(Some(key));
        let data = self.driver.get_uniform(handle, location.location);
        uniforms::uniform_value(location.info.ty, data)
    }

    // ==================== Uniform setters ====================

    /// A location must come from the current link of a program owned by
    /// this context.
    fn check_location(&mut self, location: &WebGLUniformLocation) -> bool {
        let current = self
            .registry
            .owns(location.program)
            .and_then(|key| self.registry.program(key))
            .map(|p| p.link_count);
        if current != Some(location.link_count) {
            self.set_error(GlError::InvalidOperation);
            return false;
        }
        true
    }

    /// Setters additionally need the location's program to be in use.
    fn check_location_active(&mut self, location: &WebGLUniformLocation) -> bool {
        if !self.check_location(location) {
            return false;
        }
        if self.registry.owns(location.program) != self.active_program {
            self.set_error(GlError::InvalidOperation);
            return false;
        }
        true
    }

    fn accepts_scalar(
        &mut self,
        location: &WebGLUniformLocation,
        components: usize,
        kind: UniformKind,
        first: f64,
    ) -> bool {
        if !self.check_location_active(location) {
            return false;
        }
        let units = self.limits.texture_units;
        let result = uniforms::check_scalar(location, components, kind, first, units);
        self.report(result).is_some()
    }

    fn accepts_vector(&mut self, location: &WebGLUniformLocation, len: usize, components: usize) -> bool {
        if !self.check_location_active(location) {
            return false;
        }
        let result = uniforms::check_vector(location, len, components);
        self.report(result).is_some()
    }

    /// `uniform{1,2,3,4}f`: one component per value.
    pub(crate) fn uniform_f(&mut self, location: Option<&WebGLUniformLocation>, values: &[f32]) {
        let Some(location) = location else {
            return;
        };
        let first = values.first().map_or(0.0, |v| f64::from(*v));
        if self.accepts_scalar(location, values.len(), UniformKind::Float, first) {
            self.driver.uniform_f(location.location, values.len(), values);
        }
    }

    pub(crate) fn uniform_i(&mut self, location: Option<&WebGLUniformLocation>, values: &[i32]) {
        let Some(location) = location else {
            return;
        };
        let first = values.first().map_or(0.0, |v| f64::from(*v));
        if self.accepts_scalar(location, values.len(), UniformKind::Int, first) {
            self.driver.uniform_i(location.location, values.len(), values);
        }
    }

    pub(crate) fn uniform_ui(&mut self, location: Option<&WebGLUniformLocation>, values: &[u32]) {
        let Some(location) = location else {
            return;
        };
        let first = values.first().map_or(0.0, |v| f64::from(*v));
        if self.accepts_scalar(location, values.len(), UniformKind::UInt, first) {
            self.driver.uniform_ui(location.location, values.len(), values);
        }
    }

    /// `uniform{1,2,3,4}fv`.
    pub(crate) fn uniform_fv(
        &mut self,
        location: Option<&WebGLUniformLocation>,
        components: usize,
        values: &[f32],
    ) {
        let Some(location) = location else {
            return;
        };
        if !self.accepts_vector(location, values.len(), components) {
            return;
        }
        if uniforms::is_sampler(location.info.ty) {
            self.set_error(GlError::InvalidOperation);
            return;
        }
        for (native, chunk) in uniforms::element_writes(location, components, values) {
            self.driver.uniform_f(native, components, chunk);
        }
    }

    /// `uniform{1,2,3,4}iv`. Sampler values must name a texture unit.
    pub(crate) fn uniform_iv(
        &mut self,
        location: Option<&WebGLUniformLocation>,
        components: usize,
        values: &[i32],
    ) {
        let Some(location) = location else {
            return;
        };
        if !self.accepts_vector(location, values.len(), components) {
            return;
        }
        let units = self.limits.texture_units;
        if uniforms::is_sampler(location.info.ty)
            && values.iter().any(|v| usize::try_from(*v).map_or(true, |v| v >= units))
        {
            self.set_error(GlError::InvalidValue);
            return;
        }
        for (native, chunk) in uniforms::element_writes(location, components, values) {
            self.driver.uniform_i(native, components, chunk);
        }
    }

    pub(crate) fn uniform_uiv(
        &mut self,
        location: Option<&WebGLUniformLocation>,
        components: usize,
        values: &[u32],
    ) {
        let Some(location) = location else {
            return;
        };
        if !self.accepts_vector(location, values.len(), components) {
            return;
        }
        for (native, chunk) in uniforms::element_writes(location, components, values) {
            self.driver.uniform_ui(native, components, chunk);
        }
    }

    /// `uniformMatrix{C}x{R}fv`. The value shape is checked before the
    /// location, so a bad array fails even for a null location.
    pub(crate) fn uniform_matrix(
        &mut self,
        location: Option<&WebGLUniformLocation>,
        transpose: bool,
        columns: usize,
        rows: usize,
        values: &[f32],
    ) {
        let elements = columns * rows;
        let shape = uniforms::check_matrix_shape(transpose, values.len(), elements);
        if self.report(shape).is_none() {
            return;
        }
        let Some(location) = location else {
            return;
        };
        if !self.check_location_active(location) {
            return;
        }
        let length = uniforms::check_matrix_length(location, values.len(), elements);
        if self.report(length).is_none() {
            return;
        }
        self.driver
            .uniform_matrix(location.location, columns, rows, values);
    }
}
