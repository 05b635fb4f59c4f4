use rustc_hash::FxHashSet;

const KEYWORDS: &[&str] = &[
    "as", "async", "await", "box", "break", "const", "continue", "dyn", "else", "enum", "extern",
    "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub",
    "ref", "return", "static", "struct", "trait", "true", "try", "type", "unsafe", "use", "where",
    "while", "yield", "abstract", "become", "do", "final", "macro", "override", "priv", "typeof",
    "unsized", "virtual",
];

/// Keywords that cannot be written as raw identifiers.
const RESERVED: &[&str] = &["crate", "self", "Self", "super"];

/// Drop a `u` prefix used to mark uniforms, as in `uLights`.
pub fn strip_uniform_prefix(name: &str) -> &str {
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some('u'), Some(c)) if c.is_ascii_uppercase() => &name[1..],
        _ => name,
    }
}

/// `lights` to `light`, `entries` to `entry`. Leaves `glass` alone.
pub fn singular_name(name: &str) -> String {
    if let Some(stem) = name.strip_suffix("ies").filter(|s| !s.is_empty()) {
        return format!("{stem}y");
    }
    match name.strip_suffix('s') {
        Some(stem) if !stem.is_empty() && !stem.ends_with('s') => stem.to_string(),
        _ => name.to_string(),
    }
}

/// `point_light` and `pointLight` to `PointLight`.
pub fn pascal_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for part in name.split('_').filter(|p| !p.is_empty()) {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// `shadowMap` to `shadow_map`, `MVPMatrix` to `mvp_matrix`.
pub fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).map_or(false, |n| n.is_ascii_lowercase());
            if prev.is_ascii_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_ascii_uppercase() && next_lower)
            {
                out.push('_');
            }
        }
        out.push(c.to_ascii_lowercase());
    }
    out
}

/// A snake case field identifier, escaped when it collides with a keyword.
pub fn field_ident(name: &str) -> String {
    let name = snake_case(name);
    if RESERVED.contains(&name.as_str()) {
        format!("{name}_")
    } else if KEYWORDS.contains(&name.as_str()) {
        format!("r#{name}")
    } else {
        name
    }
}

/// The constant prefix for a field, `shadow_map` to `SHADOW_MAP`.
pub fn const_ident(field: &str) -> String {
    field.trim_start_matches("r#").to_ascii_uppercase()
}

/// The struct name for a block, `uLights` to `LightsUniform`.
pub fn block_struct_name(block: &str) -> String {
    let name = pascal_case(strip_uniform_prefix(block));
    if name.ends_with("Uniform") {
        name
    } else {
        format!("{name}Uniform")
    }
}

/// Hands out type names, suffixing a number on collision.
#[derive(Default)]
pub struct Namer {
    used: FxHashSet<String>,
}

impl Namer {
    pub fn claim(&mut self, wanted: String) -> String {
        if self.used.insert(wanted.clone()) {
            return wanted;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{wanted}{n}");
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}
