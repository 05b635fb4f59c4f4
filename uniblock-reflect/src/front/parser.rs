use crate::error::{DiagnosticKind, ParseDiagnostic, ParseError};
use crate::front::shader::{
    ArrayLength, BlockInstance, FunctionDecl, InterfaceBlock, LayoutQualifier, ParsedShader,
    Precision, PrecisionStatement, Qualifiers, StorageQualifier, StructDecl, TypeName,
    VariableDecl,
};
use crate::front::token::{Token, TokenKind};
use uniblock_common::UniformType;

const AUXILIARY_QUALIFIERS: [&str; 13] = [
    "flat",
    "smooth",
    "noperspective",
    "centroid",
    "invariant",
    "precise",
    "sample",
    "patch",
    "coherent",
    "volatile",
    "restrict",
    "readonly",
    "writeonly",
];

/// Why the current declaration was abandoned.
enum Abort<'a> {
    Eof,
    Unexpected(Token<'a>),
    UnknownType(Token<'a>, &'a str),
    Unsupported(Token<'a>, &'static str),
}

type PResult<'a, T> = Result<T, Abort<'a>>;

/// One `name[len] = init` entry of a declaration.
struct Declarator<'t, 'a> {
    token: Token<'a>,
    name: &'a str,
    array: Option<Option<ArrayLength>>,
    initializer: &'t [Token<'a>],
}

pub(crate) struct Parser<'t, 'a> {
    tokens: &'t [Token<'a>],
    pos: usize,
    shader: ParsedShader,
}

impl<'t, 'a> Parser<'t, 'a> {
    pub fn new(tokens: &'t [Token<'a>]) -> Self {
        Parser {
            tokens,
            pos: 0,
            shader: ParsedShader::default(),
        }
    }

    pub fn parse(mut self) -> Result<ParsedShader, ParseError> {
        while let Some(start) = self.peek() {
            let start_pos = self.pos;
            match self.external_declaration() {
                Ok(()) => {}
                Err(Abort::Eof) => {
                    return Err(ParseError::UnexpectedEof {
                        row: start.row,
                        col: start.col,
                    })
                }
                Err(abort) => {
                    self.report_abort(abort);
                    self.pos = start_pos;
                    if self.skip_declaration().is_err() {
                        return Err(ParseError::UnexpectedEof {
                            row: start.row,
                            col: start.col,
                        });
                    }
                }
            }
        }
        Ok(self.shader)
    }

    fn peek(&self) -> Option<Token<'a>> {
        self.tokens.get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<Token<'a>> {
        self.tokens.get(self.pos + ahead).copied()
    }

    fn next(&mut self) -> PResult<'a, Token<'a>> {
        let token = self.peek().ok_or(Abort::Eof)?;
        self.pos += 1;
        Ok(token)
    }

    fn peek_punct(&self, punct: &str) -> bool {
        self.peek().map_or(false, |t| t.is_punct(punct))
    }

    fn eat_punct(&mut self, punct: &str) -> bool {
        if self.peek_punct(punct) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, punct: &str) -> PResult<'a, Token<'a>> {
        let token = self.next()?;
        if token.is_punct(punct) {
            Ok(token)
        } else {
            Err(Abort::Unexpected(token))
        }
    }

    fn expect_ident(&mut self) -> PResult<'a, (Token<'a>, &'a str)> {
        let token = self.next()?;
        match token.ident() {
            Some(ident) => Ok((token, ident)),
            None => Err(Abort::Unexpected(token)),
        }
    }

    fn diagnostic(&mut self, token: Token<'a>, kind: DiagnosticKind) {
        let diagnostic = ParseDiagnostic {
            row: token.row,
            col: token.col,
            kind,
        };
        log::warn!("{diagnostic}");
        self.shader.diagnostics.push(diagnostic);
    }

    fn report_abort(&mut self, abort: Abort<'a>) {
        match abort {
            Abort::Eof => {}
            Abort::Unexpected(token) => self.diagnostic(
                token,
                DiagnosticKind::UnsupportedConstruct(format!("unexpected token {:?}", token.kind)),
            ),
            Abort::UnknownType(token, name) => {
                self.diagnostic(token, DiagnosticKind::UnknownType(name.to_string()))
            }
            Abort::Unsupported(token, what) => {
                self.diagnostic(token, DiagnosticKind::UnsupportedConstruct(what.to_string()))
            }
        }
    }

    /// Skip to the end of the current declaration: the next `;` at nesting depth zero,
    /// or the end of a braced body opened at depth zero.
    fn skip_declaration(&mut self) -> PResult<'a, ()> {
        let mut depth = 0usize;
        loop {
            let token = self.next()?;
            match token.kind {
                TokenKind::Punct("(" | "[" | "{") => depth += 1,
                TokenKind::Punct(")" | "]") => depth = depth.saturating_sub(1),
                TokenKind::Punct("}") => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        self.eat_punct(";");
                        return Ok(());
                    }
                }
                TokenKind::Punct(";") if depth == 0 => return Ok(()),
                _ => {}
            }
        }
    }

    /// Skip a balanced group whose opening token was already consumed.
    fn skip_balanced(&mut self, open: &str, close: &str) -> PResult<'a, &'t [Token<'a>]> {
        let start = self.pos;
        let mut depth = 1usize;
        loop {
            let token = self.next()?;
            if token.is_punct(open) {
                depth += 1;
            } else if token.is_punct(close) {
                depth -= 1;
                if depth == 0 {
                    let tokens = self.tokens;
                    return Ok(&tokens[start..self.pos - 1]);
                }
            }
        }
    }

    fn external_declaration(&mut self) -> PResult<'a, ()> {
        let start = self.next()?;
        if start.is_punct(";") {
            return Ok(());
        }
        self.pos -= 1;

        if start.is_ident("precision") {
            return self.precision_statement();
        }

        let qualifiers = self.qualifiers()?;

        // Default qualifiers such as `layout(std140) uniform;`.
        if !qualifiers.is_empty() && self.eat_punct(";") {
            return Ok(());
        }

        // Qualifier redeclarations such as `invariant gl_Position;`.
        if qualifiers.storage.is_none()
            && !qualifiers.other.is_empty()
            && self.peek_at(1).map_or(false, |t| t.is_punct(";") || t.is_punct(","))
            && self.peek().and_then(|t| t.ident()).map_or(false, |i| self.type_of(i).is_none())
        {
            return self.skip_declaration();
        }

        if let (Some(storage), Some(name), Some(brace)) =
            (qualifiers.storage, self.peek(), self.peek_at(1))
        {
            let is_block_storage = matches!(
                storage,
                StorageQualifier::Uniform
                    | StorageQualifier::In
                    | StorageQualifier::Out
                    | StorageQualifier::Buffer
            );
            if is_block_storage && brace.is_punct("{") && !name.is_ident("struct") {
                return self.interface_block(qualifiers);
            }
        }

        let (type_token, ty) = self.type_specifier()?;
        let type_array = self.array_specifier()?;

        // A bare struct declaration.
        if self.eat_punct(";") {
            if matches!(ty, TypeName::Struct(_) | TypeName::Anonymous(_)) {
                return Ok(());
            }
            return Err(Abort::Unexpected(type_token));
        }

        if self.peek_at(1).map_or(false, |t| t.is_punct("(")) {
            return self.function(ty, type_array);
        }

        let declarators = self.declarators(true)?;
        self.expect_punct(";")?;

        for declarator in declarators {
            let array = self.resolve_array(&declarator, type_array)?;
            if qualifiers.storage == Some(StorageQualifier::Const) {
                self.record_constant(&ty, &declarator);
                continue;
            }

            let decl = VariableDecl {
                name: declarator.name.to_string(),
                ty: ty.clone(),
                array,
                qualifiers: qualifiers.clone(),
                row: declarator.token.row,
            };
            match qualifiers.storage {
                Some(StorageQualifier::Uniform) => self.shader.uniforms.push(decl),
                Some(StorageQualifier::In) if ty.is_plain_builtin() => {
                    self.shader.inputs.push(decl)
                }
                Some(StorageQualifier::Out) if ty.is_plain_builtin() => {
                    self.shader.outputs.push(decl)
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn precision_statement(&mut self) -> PResult<'a, ()> {
        self.next()?;
        let (token, keyword) = self.expect_ident()?;
        let precision = Precision::from_keyword(keyword).ok_or(Abort::Unexpected(token))?;
        let (_, ty) = self.expect_ident()?;
        self.expect_punct(";")?;
        self.shader.precisions.push(PrecisionStatement {
            precision,
            ty: ty.to_string(),
        });
        Ok(())
    }

    fn qualifiers(&mut self) -> PResult<'a, Qualifiers> {
        let mut qualifiers = Qualifiers::default();
        while let Some(token) = self.peek() {
            let Some(ident) = token.ident() else {
                break;
            };

            if ident == "layout" {
                self.pos += 1;
                self.layout_qualifiers(&mut qualifiers)?;
            } else if let Some(storage) = StorageQualifier::from_keyword(ident) {
                self.pos += 1;
                qualifiers.storage = Some(storage);
            } else if let Some(precision) = Precision::from_keyword(ident) {
                self.pos += 1;
                qualifiers.precision = Some(precision);
            } else if AUXILIARY_QUALIFIERS.contains(&ident) {
                self.pos += 1;
                qualifiers.other.push(ident.to_string());
            } else {
                break;
            }
        }
        Ok(qualifiers)
    }

    fn layout_qualifiers(&mut self, qualifiers: &mut Qualifiers) -> PResult<'a, ()> {
        self.expect_punct("(")?;
        loop {
            let (_, name) = self.expect_ident()?;
            let value = if self.eat_punct("=") {
                let start = self.pos;
                while !(self.peek_punct(",") || self.peek_punct(")")) {
                    self.next()?;
                }
                self.eval_const(&self.tokens[start..self.pos])
            } else {
                None
            };
            qualifiers.layout.push(LayoutQualifier {
                name: name.to_string(),
                value,
            });

            let token = self.next()?;
            if token.is_punct(")") {
                return Ok(());
            }
            if !token.is_punct(",") {
                return Err(Abort::Unexpected(token));
            }
        }
    }

    fn type_of(&self, name: &str) -> Option<TypeName> {
        if name == "void" {
            return Some(TypeName::Void);
        }
        if let Some(ty) = UniformType::from_glsl_name(name) {
            return Some(TypeName::Builtin(ty));
        }
        self.shader
            .struct_decl(name)
            .map(|_| TypeName::Struct(name.to_string()))
    }

    fn type_specifier(&mut self) -> PResult<'a, (Token<'a>, TypeName)> {
        let (token, name) = self.expect_ident()?;
        if name == "struct" {
            let ty = self.struct_specifier(token)?;
            return Ok((token, ty));
        }
        match self.type_of(name) {
            Some(ty) => Ok((token, ty)),
            None => Err(Abort::UnknownType(token, name)),
        }
    }

    fn struct_specifier(&mut self, token: Token<'a>) -> PResult<'a, TypeName> {
        let name = match self.peek().and_then(|t| t.ident()) {
            Some(name) => {
                self.pos += 1;
                Some(name)
            }
            None => None,
        };
        self.expect_punct("{")?;
        let members = self.member_list()?;
        let decl = StructDecl {
            name: name.map(str::to_string),
            members,
        };

        let Some(name) = name else {
            return Ok(TypeName::Anonymous(Box::new(decl)));
        };

        if self.shader.struct_decl(name).is_some() {
            self.diagnostic(token, DiagnosticKind::StructRedeclared(name.to_string()));
        } else {
            self.shader.structs.push(decl);
        }
        Ok(TypeName::Struct(name.to_string()))
    }

    /// Parse members up to and including the closing brace.
    fn member_list(&mut self) -> PResult<'a, Vec<VariableDecl>> {
        let mut members = Vec::new();
        while !self.eat_punct("}") {
            let start = self.pos;
            match self.member(&mut members) {
                Ok(()) => {}
                Err(Abort::Eof) => return Err(Abort::Eof),
                Err(abort) => {
                    self.report_abort(abort);
                    self.pos = start;
                    self.skip_member()?;
                }
            }
        }
        Ok(members)
    }

    fn skip_member(&mut self) -> PResult<'a, ()> {
        let mut depth = 0usize;
        loop {
            let token = self.peek().ok_or(Abort::Eof)?;
            match token.kind {
                TokenKind::Punct("(" | "[" | "{") => depth += 1,
                TokenKind::Punct(")" | "]") => depth = depth.saturating_sub(1),
                TokenKind::Punct("}") if depth == 0 => return Ok(()),
                TokenKind::Punct("}") => depth -= 1,
                TokenKind::Punct(";") if depth == 0 => {
                    self.pos += 1;
                    return Ok(());
                }
                _ => {}
            }
            self.pos += 1;
        }
    }

    fn member(&mut self, members: &mut Vec<VariableDecl>) -> PResult<'a, ()> {
        let qualifiers = self.qualifiers()?;
        let (_, ty) = self.type_specifier()?;
        let type_array = self.array_specifier()?;
        let declarators = self.declarators(false)?;
        self.expect_punct(";")?;

        for declarator in declarators {
            let array = self.resolve_array(&declarator, type_array)?;
            members.push(VariableDecl {
                name: declarator.name.to_string(),
                ty: ty.clone(),
                array,
                qualifiers: qualifiers.clone(),
                row: declarator.token.row,
            });
        }
        Ok(())
    }

    fn interface_block(&mut self, qualifiers: Qualifiers) -> PResult<'a, ()> {
        let (_, name) = self.expect_ident()?;
        self.expect_punct("{")?;
        let members = self.member_list()?;

        let instance = match self.peek().and_then(|t| t.ident()) {
            Some(instance) => {
                self.pos += 1;
                let array = match self.array_specifier()? {
                    Some(Some(length)) => Some(length),
                    Some(None) => Some(ArrayLength::Unresolved),
                    None => None,
                };
                Some(BlockInstance {
                    name: instance.to_string(),
                    array,
                })
            }
            None => None,
        };
        self.expect_punct(";")?;

        self.shader.blocks.push(InterfaceBlock {
            name: name.to_string(),
            qualifiers,
            members,
            instance,
        });
        Ok(())
    }

    /// Parse an optional `[len]`. Returns `Some(None)` for empty brackets.
    fn array_specifier(&mut self) -> PResult<'a, Option<Option<ArrayLength>>> {
        let Some(open) = self.peek().filter(|t| t.is_punct("[")) else {
            return Ok(None);
        };
        self.pos += 1;
        let contents = self.skip_balanced("[", "]")?;
        if self.peek_punct("[") {
            return Err(Abort::Unsupported(open, "arrays of arrays"));
        }
        if contents.is_empty() {
            return Ok(Some(None));
        }
        let length = self
            .eval_const(contents)
            .and_then(|len| u32::try_from(len).ok())
            .map_or(ArrayLength::Unresolved, ArrayLength::Explicit);
        Ok(Some(Some(length)))
    }

    fn declarators(&mut self, allow_initializer: bool) -> PResult<'a, Vec<Declarator<'t, 'a>>> {
        let mut declarators = Vec::new();
        loop {
            let (token, name) = self.expect_ident()?;
            let array = self.array_specifier()?;
            let initializer = if allow_initializer && self.eat_punct("=") {
                self.initializer()?
            } else {
                &[]
            };
            declarators.push(Declarator {
                token,
                name,
                array,
                initializer,
            });
            if !self.eat_punct(",") {
                return Ok(declarators);
            }
        }
    }

    /// Consume an initializer up to the next `,` or `;` at depth zero.
    fn initializer(&mut self) -> PResult<'a, &'t [Token<'a>]> {
        let start = self.pos;
        let mut depth = 0usize;
        loop {
            let token = self.peek().ok_or(Abort::Eof)?;
            match token.kind {
                TokenKind::Punct("(" | "[" | "{") => depth += 1,
                TokenKind::Punct(")" | "]" | "}") => depth = depth.saturating_sub(1),
                TokenKind::Punct("," | ";") if depth == 0 => {
                    let tokens = self.tokens;
                    return Ok(&tokens[start..self.pos]);
                }
                _ => {}
            }
            self.pos += 1;
        }
    }

    fn resolve_array(
        &mut self,
        declarator: &Declarator<'t, 'a>,
        type_array: Option<Option<ArrayLength>>,
    ) -> PResult<'a, Option<ArrayLength>> {
        let array = match (type_array, declarator.array) {
            (Some(_), Some(_)) => {
                return Err(Abort::Unsupported(declarator.token, "arrays of arrays"))
            }
            (Some(array), None) | (None, Some(array)) => array,
            (None, None) => return Ok(None),
        };

        if let Some(length) = array {
            if length == ArrayLength::Unresolved {
                self.diagnostic(
                    declarator.token,
                    DiagnosticKind::UnresolvedArrayLength(declarator.name.to_string()),
                );
            }
            return Ok(Some(length));
        }

        match aggregate_len(declarator.initializer) {
            Some(len) => Ok(Some(ArrayLength::Inferred(len))),
            None => {
                self.diagnostic(
                    declarator.token,
                    DiagnosticKind::UnresolvedArrayLength(declarator.name.to_string()),
                );
                Ok(Some(ArrayLength::Unresolved))
            }
        }
    }

    fn record_constant(&mut self, ty: &TypeName, declarator: &Declarator<'t, 'a>) {
        if !matches!(
            ty,
            TypeName::Builtin(UniformType::Int | UniformType::UnsignedInt)
        ) || declarator.array.is_some()
        {
            return;
        }
        if let Some(value) = self.eval_const(declarator.initializer) {
            self.shader
                .constants
                .insert(declarator.name.to_string(), value);
        }
    }

    fn function(
        &mut self,
        return_type: TypeName,
        return_array: Option<Option<ArrayLength>>,
    ) -> PResult<'a, ()> {
        let (_, name) = self.expect_ident()?;
        self.expect_punct("(")?;

        let mut parameters = Vec::new();
        let is_void_list = self.peek().map_or(false, |t| t.is_ident("void"))
            && self.peek_at(1).map_or(false, |t| t.is_punct(")"));
        if is_void_list {
            self.pos += 1;
        }

        if !self.eat_punct(")") {
            loop {
                let qualifiers = self.qualifiers()?;
                let (token, ty) = self.type_specifier()?;
                let type_array = self.array_specifier()?;
                let (token, param_name) = match self.peek().and_then(|t| t.ident()) {
                    Some(ident) => {
                        let token = self.next()?;
                        (token, ident)
                    }
                    None => (token, ""),
                };
                let declarator = Declarator {
                    token,
                    name: param_name,
                    array: self.array_specifier()?,
                    initializer: &[],
                };
                let array = self.resolve_array(&declarator, type_array)?;
                parameters.push(VariableDecl {
                    name: param_name.to_string(),
                    ty,
                    array,
                    qualifiers,
                    row: token.row,
                });

                let token = self.next()?;
                if token.is_punct(")") {
                    break;
                }
                if !token.is_punct(",") {
                    return Err(Abort::Unexpected(token));
                }
            }
        }

        let defined = if self.eat_punct(";") {
            false
        } else {
            self.expect_punct("{")?;
            self.skip_balanced("{", "}")?;
            true
        };

        let return_array = return_array.map(|len| len.unwrap_or(ArrayLength::Unresolved));
        let decl = FunctionDecl {
            name: name.to_string(),
            return_type,
            return_array,
            parameters,
            defined,
        };

        let existing = self.shader.functions.iter_mut().find(|f| {
            f.name == decl.name
                && f.parameters.len() == decl.parameters.len()
                && f.parameters
                    .iter()
                    .zip(&decl.parameters)
                    .all(|(a, b)| a.ty == b.ty && a.array == b.array)
        });
        match existing {
            Some(existing) => existing.defined |= decl.defined,
            None => self.shader.functions.push(decl),
        }
        Ok(())
    }

    /// Evaluate an integral constant expression made of literals, known constants,
    /// parentheses and arithmetic operators.
    fn eval_const(&self, tokens: &[Token<'a>]) -> Option<i64> {
        let mut eval = ConstEval {
            tokens,
            pos: 0,
            constants: &self.shader.constants,
        };
        let value = eval.additive()?;
        (eval.pos == tokens.len()).then_some(value)
    }
}

/// The element count of an aggregate initializer, `{a, b}` or `T[](a, b)`.
fn aggregate_len(initializer: &[Token]) -> Option<u32> {
    let contents = match initializer.first()?.kind {
        TokenKind::Punct("{") => {
            if !initializer.last()?.is_punct("}") {
                return None;
            }
            &initializer[1..initializer.len() - 1]
        }
        TokenKind::Ident(_) => {
            let open = initializer.iter().position(|t| t.is_punct("("))?;
            if !initializer.last()?.is_punct(")") {
                return None;
            }
            &initializer[open + 1..initializer.len() - 1]
        }
        _ => return None,
    };

    if contents.is_empty() {
        return Some(0);
    }

    let mut depth = 0usize;
    let mut count = 1;
    for token in contents {
        match token.kind {
            TokenKind::Punct("(" | "[" | "{") => depth += 1,
            TokenKind::Punct(")" | "]" | "}") => depth = depth.saturating_sub(1),
            TokenKind::Punct(",") if depth == 0 => count += 1,
            _ => {}
        }
    }
    Some(count)
}

struct ConstEval<'e, 'a> {
    tokens: &'e [Token<'a>],
    pos: usize,
    constants: &'e rustc_hash::FxHashMap<String, i64>,
}

impl<'a> ConstEval<'_, 'a> {
    fn op(&self) -> Option<&'a str> {
        match self.tokens.get(self.pos)?.kind {
            TokenKind::Punct(op) => Some(op),
            _ => None,
        }
    }

    fn additive(&mut self) -> Option<i64> {
        let mut lhs = self.multiplicative()?;
        while let Some(op) = self.op().filter(|op| *op == "+" || *op == "-") {
            let add = op == "+";
            self.pos += 1;
            let rhs = self.multiplicative()?;
            lhs = if add {
                lhs.checked_add(rhs)?
            } else {
                lhs.checked_sub(rhs)?
            };
        }
        Some(lhs)
    }

    fn multiplicative(&mut self) -> Option<i64> {
        let mut lhs = self.unary()?;
        while let Some(op) = self
            .op()
            .filter(|op| *op == "*" || *op == "/" || *op == "%")
        {
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = match op {
                "*" => lhs.checked_mul(rhs)?,
                "/" => lhs.checked_div(rhs)?,
                _ => lhs.checked_rem(rhs)?,
            };
        }
        Some(lhs)
    }

    fn unary(&mut self) -> Option<i64> {
        let token = *self.tokens.get(self.pos)?;
        self.pos += 1;
        match token.kind {
            TokenKind::Int(value) => Some(value),
            TokenKind::Ident(name) => self.constants.get(name).copied(),
            TokenKind::Punct("-") => self.unary()?.checked_neg(),
            TokenKind::Punct("+") => self.unary(),
            TokenKind::Punct("(") => {
                let value = self.additive()?;
                if self.op() != Some(")") {
                    return None;
                }
                self.pos += 1;
                Some(value)
            }
            _ => None,
        }
    }
}
