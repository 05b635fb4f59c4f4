use crate::driver::UniformDriver;
use glow::HasContext;
use uniblock_reflect::reflect::UniformLocation;

/// A [`UniformDriver`] setting uniforms of the program currently in use on a `glow` context.
pub struct GlowDriver<'a> {
    ctx: &'a glow::Context,
}

impl<'a> GlowDriver<'a> {
    /// The program owning the locations must be bound with `use_program`.
    pub fn new(ctx: &'a glow::Context) -> Self {
        GlowDriver { ctx }
    }
}

fn native(location: UniformLocation) -> glow::NativeUniformLocation {
    glow::NativeUniformLocation(location.0)
}

impl UniformDriver for GlowDriver<'_> {
    fn uniform_f32(&mut self, location: UniformLocation, components: u32, values: &[f32]) {
        let location = native(location);
        let location = Some(&location);
        unsafe {
            match components {
                2 => self.ctx.uniform_2_f32_slice(location, values),
                3 => self.ctx.uniform_3_f32_slice(location, values),
                4 => self.ctx.uniform_4_f32_slice(location, values),
                _ => self.ctx.uniform_1_f32_slice(location, values),
            }
        }
    }

    fn uniform_i32(&mut self, location: UniformLocation, components: u32, values: &[i32]) {
        let location = native(location);
        let location = Some(&location);
        unsafe {
            match components {
                2 => self.ctx.uniform_2_i32_slice(location, values),
                3 => self.ctx.uniform_3_i32_slice(location, values),
                4 => self.ctx.uniform_4_i32_slice(location, values),
                _ => self.ctx.uniform_1_i32_slice(location, values),
            }
        }
    }

    fn uniform_u32(&mut self, location: UniformLocation, components: u32, values: &[u32]) {
        let location = native(location);
        let location = Some(&location);
        unsafe {
            match components {
                2 => self.ctx.uniform_2_u32_slice(location, values),
                3 => self.ctx.uniform_3_u32_slice(location, values),
                4 => self.ctx.uniform_4_u32_slice(location, values),
                _ => self.ctx.uniform_1_u32_slice(location, values),
            }
        }
    }

    fn uniform_matrix(
        &mut self,
        location: UniformLocation,
        columns: u32,
        rows: u32,
        _row_major: bool,
        values: &[f32],
    ) {
        let location = native(location);
        let location = Some(&location);
        // Values arrive in column order, so the driver never transposes.
        unsafe {
            match (columns, rows) {
                (2, 2) => self.ctx.uniform_matrix_2_f32_slice(location, false, values),
                (3, 3) => self.ctx.uniform_matrix_3_f32_slice(location, false, values),
                (4, 4) => self.ctx.uniform_matrix_4_f32_slice(location, false, values),
                (2, 3) => self.ctx.uniform_matrix_2x3_f32_slice(location, false, values),
                (2, 4) => self.ctx.uniform_matrix_2x4_f32_slice(location, false, values),
                (3, 2) => self.ctx.uniform_matrix_3x2_f32_slice(location, false, values),
                (3, 4) => self.ctx.uniform_matrix_3x4_f32_slice(location, false, values),
                (4, 2) => self.ctx.uniform_matrix_4x2_f32_slice(location, false, values),
                (4, 3) => self.ctx.uniform_matrix_4x3_f32_slice(location, false, values),
                _ => log::warn!("no matrix setter for {columns}x{rows}"),
            }
        }
    }
}
