//! GLSL source preprocessing for uniblock.
//!
//! The declaration parser works on a single translation unit without any preprocessor
//! state. This crate produces that unit: comments are stripped, line continuations joined,
//! object-like macros substituted and conditional regions resolved. Line numbers are
//! preserved, so diagnostics reported against the output point at the original source.
//!
//! `#include` is not supported and is dropped with a warning.
mod directive;
mod error;
mod expand;
mod source;

pub use error::*;
pub use expand::{Macro, MacroTable};

use crate::directive::{parse_directive, Directive};
use crate::source::SourceOutput;
use std::path::Path;

/// Options for [`ShaderSource::parse_with_options`].
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Macros defined before the first line of the source, as `(name, value)` pairs.
    pub defines: Vec<(String, String)>,
}

/// A preprocessed GLSL translation unit.
#[derive(Debug, Clone)]
pub struct ShaderSource {
    /// The preprocessed source text. Line `n` of this text corresponds to line `n` of the input.
    pub source: String,
    /// The argument of the `#version` directive, if present.
    pub version: Option<String>,
    /// The arguments of every `#extension` directive in active regions.
    pub extensions: Vec<String>,
    /// The arguments of every `#pragma` directive in active regions.
    pub pragmas: Vec<String>,
    /// The macro table after the last line was processed.
    pub macros: MacroTable,
}

impl ShaderSource {
    /// Load and preprocess a shader from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<ShaderSource, PreprocessError> {
        let source = source::read_file(path)?;
        ShaderSource::parse(&source)
    }

    /// Preprocess shader source text.
    pub fn parse(source: &str) -> Result<ShaderSource, PreprocessError> {
        ShaderSource::parse_with_options(source, &ParseOptions::default())
    }

    /// Preprocess shader source text with predefined macros.
    pub fn parse_with_options(
        source: &str,
        options: &ParseOptions,
    ) -> Result<ShaderSource, PreprocessError> {
        let mut macros = MacroTable::default();
        for (name, value) in &options.defines {
            macros.define(
                name.as_str(),
                Macro {
                    params: None,
                    body: value.clone(),
                },
            );
        }

        let stripped = source::strip_comments(source)?;
        let joined = source::join_continuations(&stripped);
        preprocess(&joined, macros)
    }
}

struct Conditional {
    /// The line the conditional was opened on.
    line: usize,
    /// Whether the enclosing region is active.
    parent_active: bool,
    /// Whether any branch has been taken so far.
    taken: bool,
    /// Whether the current branch is active.
    active: bool,
    seen_else: bool,
}

fn is_active(stack: &[Conditional]) -> bool {
    stack.last().map_or(true, |c| c.active)
}

fn evaluate(macros: &MacroTable, condition: &str, line: usize) -> bool {
    match macros.evaluate(condition) {
        Some(value) => value,
        None => {
            log::warn!("could not evaluate `#if {condition}` at line {line}, treating it as false");
            false
        }
    }
}

fn preprocess(source: &str, mut macros: MacroTable) -> Result<ShaderSource, PreprocessError> {
    let mut output = String::with_capacity(source.len());
    let mut stack: Vec<Conditional> = Vec::new();
    let mut version = None;
    let mut extensions = Vec::new();
    let mut pragmas = Vec::new();

    for (index, text) in source.lines().enumerate() {
        let line = index + 1;
        let active = is_active(&stack);

        let Some(directive) = parse_directive(text) else {
            if active {
                output.push_line(&macros.expand(text));
            } else {
                output.push_line("");
            }
            continue;
        };

        // Directives never reach the output.
        output.push_line("");

        let directive = match directive {
            Ok(directive) => directive,
            Err(_) if !active => continue,
            Err(text) => {
                return Err(PreprocessError::MalformedDirective {
                    text: text.trim().to_string(),
                    line,
                })
            }
        };

        if !active && !directive.is_conditional() {
            continue;
        }

        match directive {
            Directive::Ifdef(name) => {
                let value = macros.is_defined(name);
                stack.push(open(line, active, value));
            }
            Directive::Ifndef(name) => {
                let value = !macros.is_defined(name);
                stack.push(open(line, active, value));
            }
            Directive::If(condition) => {
                let value = active && evaluate(&macros, condition, line);
                stack.push(open(line, active, value));
            }
            Directive::Elif(condition) => {
                let Some(top) = stack.last_mut() else {
                    return Err(unexpected("elif", line));
                };
                if top.seen_else {
                    return Err(unexpected("elif", line));
                }
                if top.taken || !top.parent_active {
                    top.active = false;
                } else {
                    top.active = evaluate(&macros, condition, line);
                    top.taken = top.active;
                }
            }
            Directive::Else => {
                let Some(top) = stack.last_mut() else {
                    return Err(unexpected("else", line));
                };
                if top.seen_else {
                    return Err(unexpected("else", line));
                }
                top.seen_else = true;
                top.active = top.parent_active && !top.taken;
                top.taken = true;
            }
            Directive::Endif => {
                if stack.pop().is_none() {
                    return Err(unexpected("endif", line));
                }
            }
            Directive::Version(argument) => {
                if version.is_some() {
                    log::warn!("duplicate #version at line {line} ignored");
                } else {
                    version = Some(argument.to_string());
                }
            }
            Directive::Extension(argument) => extensions.push(argument.to_string()),
            Directive::Pragma(argument) => pragmas.push(argument.to_string()),
            Directive::Define { name, params, body } => {
                if let Some(existing) = macros.get(name) {
                    if existing.body != body {
                        log::warn!("macro `{name}` redefined at line {line}");
                    }
                }
                macros.define(
                    name,
                    Macro {
                        params: params.map(|p| p.into_iter().map(String::from).collect()),
                        body: body.to_string(),
                    },
                );
            }
            Directive::Undef(name) => macros.undefine(name),
            Directive::Error(message) => {
                return Err(PreprocessError::ErrorDirective {
                    message: message.to_string(),
                    line,
                })
            }
            Directive::Include(path) => {
                log::warn!("#include {path} at line {line} is not supported and was skipped");
            }
            Directive::Unknown(name) => {
                log::warn!("unknown directive #{name} at line {line} skipped");
            }
            Directive::Line | Directive::Null => {}
        }
    }

    if let Some(open) = stack.first() {
        return Err(PreprocessError::UnterminatedConditional(open.line));
    }

    Ok(ShaderSource {
        source: output,
        version,
        extensions,
        pragmas,
        macros,
    })
}

fn open(line: usize, parent_active: bool, value: bool) -> Conditional {
    let active = parent_active && value;
    Conditional {
        line,
        parent_active,
        taken: active,
        active,
        seen_else: false,
    }
}

fn unexpected(directive: &str, line: usize) -> PreprocessError {
    PreprocessError::UnexpectedDirective {
        directive: directive.to_string(),
        line,
    }
}
