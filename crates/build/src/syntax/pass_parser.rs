//! Recursive-descent parser for pass files
//!
//! Builds a [`PassFile`] from preprocessed pass text. Declaration text that is
//! later spliced into shaders (resources, vertex attribute structs, functions)
//! is sliced straight out of the source by token spans, so it keeps its original
//! formatting.

use super::ast::*;
use super::{Cursor, Lexer, ParseError, Span, TokenKind};
use crate::types::{BlendFactor, DataType, PassInputType, PrimitiveTopology, ResourceBindFrequency, ResourceScope, ShaderStage};

/// Parses one preprocessed pass file
///
/// # Arguments
/// * `src` - Pass file text with includes already expanded
///
/// # Returns
/// * `Ok(PassFile)` - Declarations in source order
/// * `Err(ParseError)` - The first lexical or grammar error
pub fn parse_pass(src: &str) -> Result<PassFile, ParseError> {
    let tokens = Lexer::new(src).tokenize()?;
    let mut parser = PassParser { src, cursor: Cursor::new(&tokens) };

    let mut items = Vec::new();
    while !parser.cursor.is_at_end() {
        items.push(parser.item()?);
    }
    Ok(PassFile { items })
}

struct PassParser<'s, 't> {
    src: &'s str,
    cursor: Cursor<'t>,
}

impl PassParser<'_, '_> {
    fn item(&mut self) -> Result<Item, ParseError> {
        let (keyword, span) = self.cursor.expect_ident("a pass declaration")?;
        let item = match keyword.as_str() {
            "PassInput" => {
                self.cursor.expect_symbol(':')?;
                let (name, name_span) = self.cursor.expect_ident("a pass input type")?;
                let input = PassInputType::from_keyword(&name)
                    .ok_or_else(|| ParseError::at(name_span, format!("unknown pass input type '{name}', expected UI, Static, Dynamic or Particles")))?;
                Item::PassInput(input, span)
            }
            "PassVertAttr" => {
                self.cursor.expect_symbol(':')?;
                let (name, _) = self.cursor.expect_ident("a vertex attribute name")?;
                Item::PassVertAttr(name, span)
            }
            "PassVertAttrSlots" => {
                self.cursor.expect_symbol(':')?;
                let mut slots = vec![self.vert_attr_slot()?];
                while self.cursor.eat_symbol(',') {
                    slots.push(self.vert_attr_slot()?);
                }
                Item::PassVertAttrSlots(slots, span)
            }
            "State" => Item::State(self.state_block()?),
            "RootSig" => Item::RootSig(self.root_sig(span)?),
            "Shader" => Item::Shader(self.shader(span)?),
            "ShaderDefs" => Item::ShaderDefs(self.shader_defs()?),
            other => {
                return Err(ParseError::at(
                    span,
                    format!("unexpected '{other}', expected PassInput, PassVertAttr, PassVertAttrSlots, State, RootSig, Shader or ShaderDefs"),
                ));
            }
        };
        self.cursor.eat_symbol(';');
        Ok(item)
    }

    fn vert_attr_slot(&mut self) -> Result<VertAttrSlot, ParseError> {
        let span = self.cursor.expect_symbol('(')?;
        let (field, _) = self.cursor.expect_ident("a vertex attribute field name")?;
        self.cursor.expect_symbol(',')?;
        let (slot, _) = self.cursor.expect_int("an input slot")?;
        self.cursor.expect_symbol(')')?;
        Ok(VertAttrSlot { field, slot, span })
    }

    fn state_block(&mut self) -> Result<Vec<StateDecl>, ParseError> {
        self.cursor.expect_symbol('{')?;
        let mut decls = Vec::new();
        while !self.cursor.eat_symbol('}') {
            decls.push(self.state_decl()?);
            self.cursor.eat_symbol(';');
        }
        Ok(decls)
    }

    fn state_decl(&mut self) -> Result<StateDecl, ParseError> {
        let (key, span) = self.cursor.expect_ident("a state declaration or '}'")?;
        self.cursor.expect_symbol(':')?;
        match key.as_str() {
            "ColorTarget" => Ok(StateDecl::ColorTarget(self.cursor.expect_ident("a color target name")?.0)),
            "DepthTarget" => Ok(StateDecl::DepthTarget(self.cursor.expect_ident("a depth target name")?.0)),
            "Viewport" => {
                let x = self.number()?;
                self.cursor.expect_symbol(',')?;
                let y = self.number()?;
                self.cursor.expect_symbol(',')?;
                let width = self.number()?;
                self.cursor.expect_symbol(',')?;
                let height = self.number()?;
                Ok(StateDecl::Viewport([x, y, width, height], span))
            }
            "BlendEnabled" => Ok(StateDecl::BlendEnabled(self.boolean()?)),
            "SrcBlend" => Ok(StateDecl::SrcBlend(self.blend_factor()?)),
            "DestBlend" => Ok(StateDecl::DestBlend(self.blend_factor()?)),
            "Topology" => {
                let (name, name_span) = self.cursor.expect_ident("a topology")?;
                PrimitiveTopology::from_keyword(&name)
                    .map(StateDecl::Topology)
                    .ok_or_else(|| ParseError::at(name_span, format!("unknown topology '{name}', expected Triangle or Point")))
            }
            "DepthWriteMask" => Ok(StateDecl::DepthWriteMask(self.boolean()?)),
            other => Err(ParseError::at(span, format!("unknown state '{other}'"))),
        }
    }

    fn number(&mut self) -> Result<Number, ParseError> {
        let negative = self.cursor.eat_symbol('-');
        let sign = if negative { -1 } else { 1 };
        match self.cursor.peek().map(|t| &t.kind) {
            Some(TokenKind::Int(value)) => {
                let value = *value * sign;
                self.cursor.next();
                Ok(Number::Int(value))
            }
            Some(TokenKind::Float(value)) => {
                let value = *value * sign as f32;
                self.cursor.next();
                Ok(Number::Float(value))
            }
            _ => Err(self.cursor.error(format!("expected a number, found {}", self.cursor.describe_next()))),
        }
    }

    fn boolean(&mut self) -> Result<bool, ParseError> {
        let (name, span) = self.cursor.expect_ident("true or false")?;
        match name.as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(ParseError::at(span, format!("expected true or false, found '{name}'"))),
        }
    }

    fn blend_factor(&mut self) -> Result<BlendFactor, ParseError> {
        let (name, span) = self.cursor.expect_ident("a blend factor")?;
        BlendFactor::from_keyword(&name).ok_or_else(|| ParseError::at(span, format!("unknown blend factor '{name}', expected SrcAlpha, InvSrcAlpha, One or Zero")))
    }

    fn root_sig(&mut self, span: Span) -> Result<RootSigDecl, ParseError> {
        let token = self.cursor.expect_raw_block("a root signature")?;
        let TokenKind::RawBlock(text) = &token.kind else {
            return Err(ParseError::at(token.span, "expected a root signature"));
        };

        let (base, line, column) = token.raw_origin();
        let tokens = Lexer::with_origin(text, base, line, column).tokenize()?;
        let params = RootSigParser { cursor: Cursor::new(&tokens) }.params()?;

        Ok(RootSigDecl {
            raw_view: text.chars().filter(|c| *c != '\n' && *c != '\r').collect(),
            params,
            span,
        })
    }

    fn shader(&mut self, span: Span) -> Result<ShaderDecl, ParseError> {
        let (tag, tag_span) = self.cursor.expect_ident("a shader stage")?;
        let stage = ShaderStage::from_keyword(&tag).ok_or_else(|| ParseError::at(tag_span, format!("unknown shader stage '{tag}', expected VS, GS or PS")))?;

        let mut externals = Vec::new();
        if self.cursor.eat_symbol(':') {
            self.cursor.expect_keyword("External")?;
            self.cursor.expect_symbol('(')?;
            if !self.cursor.eat_symbol(')') {
                loop {
                    externals.push(self.cursor.expect_ident("an external name")?.0);
                    if !self.cursor.eat_symbol(',') {
                        break;
                    }
                }
                self.cursor.expect_symbol(')')?;
            }
        }

        let token = self.cursor.expect_raw_block("a shader body")?;
        let TokenKind::RawBlock(source) = &token.kind else {
            return Err(ParseError::at(token.span, "expected a shader body"));
        };

        Ok(ShaderDecl { stage, externals, source: source.clone(), span })
    }

    fn shader_defs(&mut self) -> Result<Vec<ShaderDef>, ParseError> {
        self.cursor.expect_symbol('{')?;
        let mut defs = Vec::new();
        while !self.cursor.eat_symbol('}') {
            defs.push(self.shader_def()?);
            self.cursor.eat_symbol(';');
        }
        Ok(defs)
    }

    fn shader_def(&mut self) -> Result<ShaderDef, ParseError> {
        if self.cursor.peek_symbol('[') {
            return self.resource().map(ShaderDef::Resource);
        }

        match self.cursor.peek_ident() {
            Some("struct") => self.vert_attr().map(ShaderDef::VertAttr),
            Some(keyword) if is_resource_keyword(keyword) => {
                Err(self.cursor.error(format!("resource declaration '{keyword}' must be preceded by a [Scope, BindFrequency] attribute")))
            }
            Some(_) => self.function().map(ShaderDef::Function),
            None => Err(self.cursor.error(format!("expected a shader definition or '}}', found {}", self.cursor.describe_next()))),
        }
    }

    fn resource(&mut self) -> Result<ResourceDecl, ParseError> {
        self.cursor.expect_symbol('[')?;
        let (scope_name, scope_span) = self.cursor.expect_ident("a resource scope")?;
        let scope = match scope_name.as_str() {
            "Local" => ResourceScope::Local,
            "Global" => ResourceScope::Global,
            _ => return Err(ParseError::at(scope_span, format!("unknown resource scope '{scope_name}', expected Local or Global"))),
        };
        self.cursor.expect_symbol(',')?;
        let (freq_name, freq_span) = self.cursor.expect_ident("a bind frequency")?;
        let bind_frequency = match freq_name.as_str() {
            "PerObject" => ResourceBindFrequency::PerObject,
            "PerPass" => ResourceBindFrequency::PerPass,
            _ => return Err(ParseError::at(freq_span, format!("unknown bind frequency '{freq_name}', expected PerObject or PerPass"))),
        };
        self.cursor.expect_symbol(']')?;

        let span = self.cursor.span();
        let (keyword, keyword_span) = self.cursor.expect_ident("a resource declaration")?;
        let (name, _) = self.cursor.expect_ident("a resource name")?;
        self.cursor.expect_symbol(':')?;
        let register = self.register()?;

        let body = if keyword == "cbuffer" {
            ResourceBody::ConstBuff(self.fields()?)
        } else if keyword.starts_with("Texture") {
            ResourceBody::Texture
        } else if keyword.starts_with("Sampler") {
            ResourceBody::Sampler
        } else {
            return Err(ParseError::at(keyword_span, format!("expected cbuffer, Texture or Sampler declaration, found '{keyword}'")));
        };

        Ok(ResourceDecl {
            scope,
            bind_frequency,
            name,
            register,
            body,
            raw_view: self.slice_from(span),
            span,
        })
    }

    fn register(&mut self) -> Result<Register, ParseError> {
        self.cursor.expect_keyword("register")?;
        self.cursor.expect_symbol('(')?;
        let (text, span) = self.cursor.expect_ident("a register")?;
        let register = parse_register(&text).ok_or_else(|| ParseError::at(span, format!("invalid register '{text}'")))?;
        if self.cursor.eat_symbol(',') {
            self.cursor.expect_ident("a register space")?;
        }
        self.cursor.expect_symbol(')')?;
        Ok(register)
    }

    fn fields(&mut self) -> Result<Vec<FieldDecl>, ParseError> {
        self.cursor.expect_symbol('{')?;
        let mut fields = Vec::new();
        while !self.cursor.eat_symbol('}') {
            let (type_name, span) = self.cursor.expect_ident("a field type or '}'")?;
            let data_type = DataType::from_keyword(&type_name).ok_or_else(|| ParseError::at(span, format!("unknown field type '{type_name}'")))?;
            let (name, _) = self.cursor.expect_ident("a field name")?;
            let semantic = if self.cursor.eat_symbol(':') {
                Some(self.cursor.expect_ident("a semantic")?.0)
            } else {
                None
            };
            self.cursor.expect_symbol(';')?;
            fields.push(FieldDecl { data_type, name, semantic, span });
        }
        Ok(fields)
    }

    fn vert_attr(&mut self) -> Result<VertAttrDecl, ParseError> {
        let span = self.cursor.expect_keyword("struct")?;
        let (name, _) = self.cursor.expect_ident("a struct name")?;
        let fields = self.fields()?;
        Ok(VertAttrDecl {
            name,
            fields,
            raw_view: self.slice_from(span),
            span,
        })
    }

    fn function(&mut self) -> Result<FunctionDecl, ParseError> {
        let span = self.cursor.span();
        self.cursor.expect_ident("a return type")?;
        let (name, _) = self.cursor.expect_ident("a function name")?;

        self.cursor.expect_symbol('(')?;
        self.skip_balanced('(', ')')?;
        while !self.cursor.peek_symbol('{') {
            if self.cursor.next().is_none() {
                return Err(self.cursor.error(format!("expected body of function '{name}'")));
            }
        }
        self.cursor.expect_symbol('{')?;
        self.skip_balanced('{', '}')?;

        Ok(FunctionDecl {
            name,
            raw_view: self.slice_from(span),
            span,
        })
    }

    /// Skips tokens up to and including the closer matching an already consumed opener
    fn skip_balanced(&mut self, open: char, close: char) -> Result<(), ParseError> {
        let start = self.cursor.prev_span();
        let mut depth = 1usize;
        while depth > 0 {
            match self.cursor.next().map(|t| &t.kind) {
                Some(TokenKind::Symbol(c)) if *c == open => depth += 1,
                Some(TokenKind::Symbol(c)) if *c == close => depth -= 1,
                Some(_) => {}
                None => return Err(ParseError::at(start, format!("unclosed '{open}'"))),
            }
        }
        Ok(())
    }

    /// Source text from the start of `span` to the end of the last consumed token
    fn slice_from(&self, span: Span) -> String {
        let end = self.cursor.prev_span().end;
        self.src.get(span.start..end).unwrap_or_default().to_string()
    }
}

fn is_resource_keyword(keyword: &str) -> bool {
    keyword == "cbuffer" || keyword.starts_with("Texture") || keyword.starts_with("Sampler")
}

/// Splits `b0` / `t12` into register class and id
fn parse_register(text: &str) -> Option<Register> {
    let mut chars = text.chars();
    let class = chars.next()?.to_ascii_lowercase();
    if !class.is_ascii_alphabetic() {
        return None;
    }
    let id = chars.as_str().parse().ok()?;
    Some(Register { class, id })
}

/// Parser for the parameter list inside a root signature block
struct RootSigParser<'t> {
    cursor: Cursor<'t>,
}

impl RootSigParser<'_> {
    fn params(mut self) -> Result<Vec<RootParam>, ParseError> {
        let mut params = Vec::new();
        while !self.cursor.is_at_end() {
            if let Some(param) = self.param()? {
                params.push(param);
            }
            if !self.cursor.eat_symbol(',') && !self.cursor.is_at_end() {
                return Err(self.cursor.error(format!("expected ',' between root parameters, found {}", self.cursor.describe_next())));
            }
        }
        Ok(params)
    }

    fn param(&mut self) -> Result<Option<RootParam>, ParseError> {
        let (name, span) = self.cursor.expect_ident("a root parameter")?;
        match name.as_str() {
            "RootFlags" => {
                self.cursor.expect_symbol('(')?;
                self.skip_to_close()?;
                Ok(None)
            }
            "CBV" => {
                self.cursor.expect_symbol('(')?;
                let range = self.register_range('b')?;
                if range.num != 1 {
                    return Err(ParseError::at(span, "inline CBV must have numDescriptors = 1"));
                }
                Ok(Some(RootParam::ConstBuffView(range, span)))
            }
            "DescriptorTable" => {
                self.cursor.expect_symbol('(')?;
                let mut entities = Vec::new();
                loop {
                    let (entry, entry_span) = self.cursor.expect_ident("a descriptor table entry")?;
                    match entry.as_str() {
                        "visibility" => {
                            self.cursor.expect_symbol('=')?;
                            self.cursor.expect_ident("a shader visibility")?;
                        }
                        "SRV" => {
                            self.cursor.expect_symbol('(')?;
                            entities.push(DescTableEntity::TextView(self.register_range('t')?));
                        }
                        "CBV" => {
                            self.cursor.expect_symbol('(')?;
                            entities.push(DescTableEntity::ConstBuffView(self.register_range('b')?));
                        }
                        "Sampler" => {
                            self.cursor.expect_symbol('(')?;
                            entities.push(DescTableEntity::SamplerView(self.register_range('s')?));
                        }
                        "UAV" => return Err(ParseError::at(entry_span, "UAV descriptor table entries are not supported")),
                        other => return Err(ParseError::at(entry_span, format!("unknown descriptor table entry '{other}'"))),
                    }
                    if !self.cursor.eat_symbol(',') {
                        break;
                    }
                }
                self.cursor.expect_symbol(')')?;
                if entities.is_empty() {
                    return Err(ParseError::at(span, "descriptor table must contain at least one entry"));
                }
                Ok(Some(RootParam::DescTable(entities, span)))
            }
            "StaticSampler" | "RootConstants" | "UAV" | "SRV" => Err(ParseError::at(span, format!("root parameter '{name}' is not supported"))),
            other => Err(ParseError::at(span, format!("unknown root parameter '{other}'"))),
        }
    }

    /// Parses `bN [, option = value]* )` after the opening parenthesis
    fn register_range(&mut self, class: char) -> Result<RegisterRange, ParseError> {
        let (text, span) = self.cursor.expect_ident("a register")?;
        let register = parse_register(&text).filter(|r| r.class == class).ok_or_else(|| ParseError::at(span, format!("expected a '{class}' register, found '{text}'")))?;

        let mut num = 1;
        while self.cursor.eat_symbol(',') {
            let (option, option_span) = self.cursor.expect_ident("a register option")?;
            self.cursor.expect_symbol('=')?;
            match option.as_str() {
                "numDescriptors" => {
                    let (value, value_span) = self.cursor.expect_int("a descriptor count")?;
                    num = u32::try_from(value)
                        .ok()
                        .filter(|n| *n > 0)
                        .ok_or_else(|| ParseError::at(value_span, format!("invalid descriptor count {value}")))?;
                }
                "space" | "offset" => {
                    self.cursor.next();
                }
                "visibility" | "flags" => {
                    self.cursor.expect_ident("an option value")?;
                    while self.cursor.eat_symbol('|') {
                        self.cursor.expect_ident("an option value")?;
                    }
                }
                other => return Err(ParseError::at(option_span, format!("unknown register option '{other}'"))),
            }
        }
        self.cursor.expect_symbol(')')?;

        Ok(RegisterRange { register_id: register.id, num })
    }

    fn skip_to_close(&mut self) -> Result<(), ParseError> {
        let start = self.cursor.prev_span();
        let mut depth = 1usize;
        while depth > 0 {
            match self.cursor.next().map(|t| &t.kind) {
                Some(TokenKind::Symbol('(')) => depth += 1,
                Some(TokenKind::Symbol(')')) => depth -= 1,
                Some(_) => {}
                None => return Err(ParseError::at(start, "unclosed '('")),
            }
        }
        Ok(())
    }
}
