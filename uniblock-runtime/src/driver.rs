use uniblock_reflect::reflect::UniformLocation;

/// The entry points a graphics backend provides to set uniforms outside blocks.
///
/// Every call carries all elements being set, flattened into components.
pub trait UniformDriver {
    /// Set a float scalar or vector with `components` components per element.
    fn uniform_f32(&mut self, location: UniformLocation, components: u32, values: &[f32]);

    /// Set an integer scalar or vector. Booleans and samplers also use this entry point.
    fn uniform_i32(&mut self, location: UniformLocation, components: u32, values: &[i32]);

    fn uniform_u32(&mut self, location: UniformLocation, components: u32, values: &[u32]);

    /// Set a float matrix given in column order. `row_major` reports the declared
    /// layout of the uniform and does not change the order of `values`.
    fn uniform_matrix(
        &mut self,
        location: UniformLocation,
        columns: u32,
        rows: u32,
        row_major: bool,
        values: &[f32],
    );
}
