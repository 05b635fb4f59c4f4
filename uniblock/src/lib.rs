#![forbid(missing_docs)]
//! Uniform introspection and memory layout for GLSL programs.
//!
//! uniblock reads the active uniforms of a linked program, rebuilds the structs and
//! uniform blocks they were declared with, and recovers the byte layout of every block.
//! The resulting model can be turned into typed setters, or into Rust declarations
//! that mirror the block layout.
//!
//! ## Usage
//! The basic workflow collects reflection records from a program through a
//! [`ReflectProgram`](crate::reflect::ReflectProgram) implementation, builds a
//! [`ProgramUniforms`](crate::reflect::ProgramUniforms) model from them, and binds the
//! model with [`bind`](crate::runtime::bind). Plain uniforms are then set through a
//! [`UniformDriver`](crate::runtime::UniformDriver), while block members are written into
//! host-side buffers whose dirty ranges the caller uploads.
//!
//! Parsing the GLSL source is optional. When available, its declarations name the structs
//! of the model and correct struct arrays the driver under-reports.
//!
//! ## Backends
//! | **API**       | **Status** | **`uniblock` feature** |
//! |---------------|------------|------------------------|
//! | OpenGL (glow) | ✔         | `gl`                   |
//!
//! Other backends implement [`ReflectProgram`](crate::reflect::ReflectProgram) and
//! [`UniformDriver`](crate::runtime::UniformDriver) themselves.

#[cfg(feature = "preprocess")]
/// Preprocessing of GLSL source files.
///
/// Comments are stripped, object-like macros expanded and conditional regions resolved,
/// so the declaration parser sees a single translation unit.
pub mod preprocess {
    pub use uniblock_preprocess::*;
}

#[cfg(feature = "reflect")]
/// GLSL declaration parsing, program reflection and block layout.
pub mod reflect {
    pub use uniblock_reflect::error::*;

    /// Parsing of GLSL uniform declarations.
    pub mod front {
        pub use uniblock_reflect::front::*;
    }

    /// Generation of Rust declarations from a uniform model.
    pub mod back {
        pub use uniblock_reflect::back::*;
    }

    pub use uniblock_reflect::reflect::collect::{
        collect, dump_uniforms, ActiveUniform, BlockParam, ReflectProgram, UniformParam,
    };
    pub use uniblock_reflect::reflect::layout::{
        finalize, layout_table, BlockLayout, LayoutEntry, LayoutKind,
    };
    pub use uniblock_reflect::reflect::model::{
        build, build_with_declarations, Member, ProgramUniforms, StructId, StructReference,
        StructType, Type,
    };
    pub use uniblock_reflect::reflect::{
        BlockRecord, PathSegment, UniformDefinition, UniformLocation, UniformPath,
        UniformRecord, UniformStorage,
    };

    #[cfg(feature = "gl")]
    pub use uniblock_reflect::reflect::gl::GlowProgram;
}

/// Setters for plain uniforms and buffers for uniform blocks.
#[cfg(feature = "runtime")]
pub mod runtime {
    pub use uniblock_runtime::bind::{bind, BoundUniforms};
    pub use uniblock_runtime::block::{BlockField, BoundBlock};
    pub use uniblock_runtime::buffer::{BlockBuffer, BlockUpdater};
    pub use uniblock_runtime::driver::UniformDriver;
    pub use uniblock_runtime::error::{BindingIncompleteError, ValueError};
    pub use uniblock_runtime::program::ProgramUniform;
    pub use uniblock_runtime::value::{UniformData, UniformValue};

    #[cfg(feature = "gl")]
    pub use uniblock_runtime::gl::GlowDriver;
}

pub use uniblock_common::{BindingStage, ScalarKind, UniformType};
