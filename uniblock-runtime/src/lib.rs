//! Setters for plain uniforms and host-side buffers for uniform blocks.
//!
//! [`bind`](bind::bind) turns a [`ProgramUniforms`](uniblock_reflect::reflect::model::ProgramUniforms)
//! model into accessors. Plain uniforms are set through a [`UniformDriver`](driver::UniformDriver),
//! block members are written into a [`BlockBuffer`](buffer::BlockBuffer) whose dirty range is
//! uploaded by the caller.

/// Accessor creation for a whole program.
pub mod bind;

/// Writers for the members of a uniform block.
pub mod block;

/// Block buffer storage with dirty tracking.
pub mod buffer;

/// The backend interface for plain uniforms.
pub mod driver;

/// Error types for binding and setting values.
pub mod error;

/// Setters for uniforms outside blocks.
pub mod program;

/// Uniform values.
pub mod value;

#[cfg(feature = "gl")]
/// A driver for `glow` contexts.
pub mod gl;
