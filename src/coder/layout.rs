//! Type Layout Builder - Schema to Byte Layout
//!
//! Converts IDL type expressions into [`Layout`] trees and drives
//! encoding/decoding of [`Value`]s through them.
//!
//! Named types are built exactly once, when the registry is constructed, and
//! stored by name. A reference to a named type is never inlined: it stays a
//! [`Layout::Ref`] node that is looked up in the registry when data actually
//! reaches it. Self-referential and mutually-referential types therefore
//! build in one pass, and recursion at encode/decode time is bounded by the
//! depth of the data (capped at `max_depth`), not by the schema's shape.
//!
//! Generic definitions keep [`Layout::Generic`] placeholders in their body.
//! When a reference with arguments is entered, the arguments are substituted
//! against the caller's bindings and become the bindings for the body; no
//! per-instantiation layout is cached.
//!
//! Wire format:
//!
//! | Layout | Encoding |
//! |---|---|
//! | integers, floats | little-endian, fixed width |
//! | bool | 1 byte, 0 or 1 |
//! | publicKey, `[T; N]` | raw concatenation, no prefix |
//! | string, bytes, `Vec<T>`, map | u32 LE count + elements |
//! | `Option<T>` | 1-byte tag + payload if present |
//! | `COption<T>` | 4-byte LE tag + payload if present |
//! | enum | 1-byte variant index + variant payload |
//! | struct, tuple | fields in declared order |

use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::coder::codec::{
    Codec, CodecError, CodecResult, DecodeContext, EncodeContext,
};
use crate::coder::value::Value;
use crate::crypto::{Pubkey, PUBKEY_BYTES};
use crate::idl::{
    Idl, IdlArrayLen, IdlDefinedFields, IdlField, IdlGenericArg, IdlGenericParam, IdlType,
    IdlTypeDefTy, SchemaError,
};

// ============================================================================
// Layout tree
// ============================================================================

/// Length of a fixed-size array layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArrayLen {
    Fixed(usize),
    /// Const generic parameter of the enclosing definition
    Generic(String),
}

/// Argument of a deferred generic reference
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutArg {
    Type(Layout),
    Const(ArrayLen),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldLayout {
    pub name: String,
    pub layout: Layout,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariantLayout {
    pub name: String,
    /// `None` for field-less variants, otherwise a struct or tuple layout
    pub payload: Option<Layout>,
}

/// Byte-level encoding plan mirroring a type expression
#[derive(Debug, Clone, PartialEq)]
pub enum Layout {
    Bool,
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    U128,
    I128,
    F32,
    F64,
    PublicKey,
    Bytes,
    String,
    Vec(Box<Layout>),
    Array(Box<Layout>, ArrayLen),
    Option(Box<Layout>),
    COption(Box<Layout>),
    Map(Box<Layout>, Box<Layout>),
    Struct(Vec<FieldLayout>),
    Tuple(Vec<Layout>),
    Enum(Vec<VariantLayout>),
    /// Deferred reference to a named type, resolved through the registry
    Ref { name: String, args: Vec<LayoutArg> },
    /// Type parameter of the enclosing definition
    Generic(String),
}

impl Layout {
    /// Reference to a non-generic named type
    pub fn named(name: &str) -> Self {
        Layout::Ref {
            name: name.to_string(),
            args: Vec::new(),
        }
    }
}

/// Cached layout of one named type
#[derive(Debug, Clone, PartialEq)]
pub struct NamedLayout {
    pub name: String,
    /// Generic parameter names in declaration order
    pub params: Vec<String>,
    pub body: Layout,
}

/// Minimum encoded size of a layout and whether every value has that size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeInfo {
    pub min: usize,
    pub fixed: bool,
}

impl SizeInfo {
    fn fixed(n: usize) -> Self {
        Self { min: n, fixed: true }
    }

    fn variable(min: usize) -> Self {
        Self { min, fixed: false }
    }

    /// Size of `self` followed by `next`
    fn then(self, next: SizeInfo, context: &str) -> Result<Self, SchemaError> {
        Ok(Self {
            min: self
                .min
                .checked_add(next.min)
                .ok_or_else(|| SchemaError::SizeOverflow(context.to_string()))?,
            fixed: self.fixed && next.fixed,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Binding {
    Type(Layout),
    Len(usize),
}

type Scope = [(String, Binding)];

fn lookup<'s>(scope: &'s Scope, name: &str) -> Option<&'s Binding> {
    scope.iter().rev().find(|(n, _)| n == name).map(|(_, b)| b)
}

fn mismatch(expected: impl Into<String>, found: &Value) -> CodecError {
    CodecError::TypeMismatch {
        expected: expected.into(),
        found: found.kind().to_string(),
    }
}

fn unbound(name: &str) -> CodecError {
    CodecError::InvalidData(format!("unbound generic parameter '{}'", name))
}

// ============================================================================
// Registry
// ============================================================================

/// Memoized layouts of every named type in one schema
///
/// Built once per coder and read-only afterwards, so it can be shared by
/// concurrent encode/decode calls. Two coders never share a registry.
#[derive(Debug, Clone)]
pub struct LayoutRegistry {
    types: HashMap<String, NamedLayout>,
    max_depth: usize,
}

impl LayoutRegistry {
    /// Build layouts for every named type declared by the IDL
    ///
    /// Fails if any reference is undeclared or a named type has no finite
    /// encoding.
    pub fn build(idl: &Idl, max_depth: usize) -> Result<Self, SchemaError> {
        let declared = idl.declared_type_names();
        let builder = TypeBuilder {
            declared: &declared,
        };

        let mut types = HashMap::new();
        for def in &idl.types {
            let params = def.generics.iter().map(|p| p.name().to_string()).collect();
            let body = builder.def_layout(&def.ty, &format!("type {}", def.name))?;
            types.insert(
                def.name.clone(),
                NamedLayout {
                    name: def.name.clone(),
                    params,
                    body,
                },
            );
        }
        for acc in &idl.accounts {
            if let Some(ty) = &acc.ty {
                let body = builder.def_layout(ty, &format!("account {}", acc.name))?;
                types.insert(
                    acc.name.clone(),
                    NamedLayout {
                        name: acc.name.clone(),
                        params: Vec::new(),
                        body,
                    },
                );
            }
        }
        if let Some(state) = &idl.state {
            let def = &state.strct;
            let params = def.generics.iter().map(IdlGenericParam::name).map(String::from).collect();
            let body = builder.def_layout(&def.ty, &format!("state {}", def.name))?;
            types.insert(
                def.name.clone(),
                NamedLayout {
                    name: def.name.clone(),
                    params,
                    body,
                },
            );
        }

        let registry = Self { types, max_depth };
        for named in registry.types.values() {
            let mut visiting = vec![named.name.clone()];
            registry.size_in(&named.body, &[], &mut visiting, 0)?;
        }

        debug!(
            types = registry.types.len(),
            max_depth, "built layout registry"
        );
        Ok(registry)
    }

    /// Number of cached named layouts
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Maximum nesting through named references
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Cached layout of a named type
    pub fn named(&self, name: &str) -> Option<&NamedLayout> {
        self.types.get(name)
    }

    /// Layout of an arbitrary type expression in this schema
    pub fn layout_of(&self, ty: &IdlType) -> Result<Layout, SchemaError> {
        let declared: HashSet<&str> = self.types.keys().map(String::as_str).collect();
        TypeBuilder {
            declared: &declared,
        }
        .type_layout(ty, "type expression")
    }

    /// Struct layout of an ordered field list (instruction args, event fields)
    pub fn fields_layout(&self, fields: &[IdlField], context: &str) -> Result<Layout, SchemaError> {
        let declared: HashSet<&str> = self.types.keys().map(String::as_str).collect();
        TypeBuilder {
            declared: &declared,
        }
        .named_fields(fields, context)
    }

    // ------------------------------------------------------------------------
    // Public encode/decode entry points
    // ------------------------------------------------------------------------

    /// Exact number of bytes `value` encodes to
    pub fn encoded_len(&self, layout: &Layout, value: &Value) -> CodecResult<usize> {
        self.len_in(layout, value, &[], 0)
    }

    /// Encode a value into a buffer sized to its exact length
    pub fn encode(&self, layout: &Layout, value: &Value) -> CodecResult<Vec<u8>> {
        self.encode_with_prefix(&[], layout, value)
    }

    /// Encode `prefix ++ value` into a buffer sized to its exact length
    pub fn encode_with_prefix(
        &self,
        prefix: &[u8],
        layout: &Layout,
        value: &Value,
    ) -> CodecResult<Vec<u8>> {
        let len = prefix.len() + self.encoded_len(layout, value)?;
        let mut buf = vec![0u8; len];
        let mut ctx = EncodeContext::new(&mut buf);
        ctx.write_bytes(prefix)?;
        self.encode_in(layout, value, &[], 0, &mut ctx)?;
        if ctx.position() != len {
            return Err(CodecError::InvalidData(format!(
                "encoded {} bytes into a {} byte buffer",
                ctx.position(),
                len
            )));
        }
        Ok(buf)
    }

    /// Decode a value from the start of `data`; trailing bytes are ignored
    pub fn decode(&self, layout: &Layout, data: &[u8]) -> CodecResult<Value> {
        let mut ctx = DecodeContext::new(data);
        self.decode_from(layout, &mut ctx)
    }

    /// Decode a value at the context's cursor
    pub fn decode_from(&self, layout: &Layout, ctx: &mut DecodeContext) -> CodecResult<Value> {
        self.decode_in(layout, &[], 0, ctx)
    }

    /// Minimum encoded size of a layout
    pub fn size_info(&self, layout: &Layout) -> Result<SizeInfo, SchemaError> {
        self.size_in(layout, &[], &mut Vec::new(), 0)
    }

    // ------------------------------------------------------------------------
    // Reference resolution
    // ------------------------------------------------------------------------

    fn enter(
        &self,
        name: &str,
        args: &[LayoutArg],
        scope: &Scope,
        depth: usize,
    ) -> CodecResult<(&Layout, Vec<(String, Binding)>)> {
        if depth >= self.max_depth {
            return Err(CodecError::DepthExceeded(self.max_depth));
        }
        let named = self
            .types
            .get(name)
            .ok_or_else(|| CodecError::InvalidData(format!("unresolved type '{}'", name)))?;
        let mut bindings = Vec::with_capacity(args.len());
        for (param, arg) in named.params.iter().zip(args) {
            let binding = match arg {
                LayoutArg::Type(layout) => Binding::Type(substitute(layout, scope, true)?),
                LayoutArg::Const(len) => Binding::Len(resolve_len(len, scope)?),
            };
            bindings.push((param.clone(), binding));
        }
        Ok((&named.body, bindings))
    }

    fn bound_type<'s>(&self, name: &str, scope: &'s Scope) -> CodecResult<&'s Layout> {
        match lookup(scope, name) {
            Some(Binding::Type(layout)) => Ok(layout),
            _ => Err(unbound(name)),
        }
    }

    // ------------------------------------------------------------------------
    // Sizing
    // ------------------------------------------------------------------------

    fn len_in(&self, layout: &Layout, value: &Value, scope: &Scope, depth: usize) -> CodecResult<usize> {
        Ok(match layout {
            Layout::Bool | Layout::U8 | Layout::I8 => 1,
            Layout::U16 | Layout::I16 => 2,
            Layout::U32 | Layout::I32 | Layout::F32 => 4,
            Layout::U64 | Layout::I64 | Layout::F64 => 8,
            Layout::U128 | Layout::I128 => 16,
            Layout::PublicKey => PUBKEY_BYTES,
            Layout::Bytes => match value {
                Value::Bytes(b) => 4 + b.len(),
                other => return Err(mismatch("bytes", other)),
            },
            Layout::String => match value {
                Value::String(s) => 4 + s.len(),
                other => return Err(mismatch("string", other)),
            },
            Layout::Vec(inner) => {
                let items = list_items(value, "vec")?;
                let mut total = 4;
                for item in items {
                    total += self.len_in(inner, item, scope, depth)?;
                }
                total
            }
            Layout::Array(inner, len) => {
                let n = resolve_len(len, scope)?;
                let items = array_items(value, n)?;
                match items {
                    ArrayItems::Bytes(b) => b.len(),
                    ArrayItems::Values(items) => {
                        let mut total = 0;
                        for item in items {
                            total += self.len_in(inner, item, scope, depth)?;
                        }
                        total
                    }
                }
            }
            Layout::Option(inner) => match option_inner(value)? {
                None => 1,
                Some(v) => 1 + self.len_in(inner, v, scope, depth)?,
            },
            Layout::COption(inner) => match option_inner(value)? {
                None => 4,
                Some(v) => 4 + self.len_in(inner, v, scope, depth)?,
            },
            Layout::Map(key, val) => match value {
                Value::Map(entries) => {
                    let mut total = 4;
                    for (k, v) in entries {
                        total += self.len_in(key, k, scope, depth)?;
                        total += self.len_in(val, v, scope, depth)?;
                    }
                    total
                }
                other => return Err(mismatch("map", other)),
            },
            Layout::Struct(fields) => {
                let mut total = 0;
                for field in fields {
                    let v = struct_field(value, &field.name)?;
                    total += self.len_in(&field.layout, v, scope, depth)?;
                }
                total
            }
            Layout::Tuple(layouts) => {
                let items = tuple_items(value, layouts.len())?;
                let mut total = 0;
                for (l, v) in layouts.iter().zip(items) {
                    total += self.len_in(l, v, scope, depth)?;
                }
                total
            }
            Layout::Enum(variants) => {
                let (_, variant, data) = find_variant(variants, value)?;
                match &variant.payload {
                    None => 1,
                    Some(payload) => 1 + self.len_in(payload, data, scope, depth)?,
                }
            }
            Layout::Ref { name, args } => {
                let (body, bindings) = self.enter(name, args, scope, depth)?;
                self.len_in(body, value, &bindings, depth + 1)?
            }
            Layout::Generic(name) => {
                let bound = self.bound_type(name, scope)?;
                self.len_in(bound, value, &[], depth)?
            }
        })
    }

    /// Minimum encoded size of `layout`
    ///
    /// `visiting` holds the named types being expanded. Bindings in `scope`
    /// were created while only the first `outer` of them were open, so a
    /// bound type is sized against that prefix: `Wrapper<Wrapper<u8>>`
    /// enters `Wrapper` twice without being a cycle.
    fn size_in(
        &self,
        layout: &Layout,
        scope: &Scope,
        visiting: &mut Vec<String>,
        outer: usize,
    ) -> Result<SizeInfo, SchemaError> {
        Ok(match layout {
            Layout::Bool | Layout::U8 | Layout::I8 => SizeInfo::fixed(1),
            Layout::U16 | Layout::I16 => SizeInfo::fixed(2),
            Layout::U32 | Layout::I32 | Layout::F32 => SizeInfo::fixed(4),
            Layout::U64 | Layout::I64 | Layout::F64 => SizeInfo::fixed(8),
            Layout::U128 | Layout::I128 => SizeInfo::fixed(16),
            Layout::PublicKey => SizeInfo::fixed(PUBKEY_BYTES),
            Layout::Bytes | Layout::String | Layout::Vec(_) | Layout::Map(_, _) => {
                SizeInfo::variable(4)
            }
            Layout::Option(_) => SizeInfo::variable(1),
            Layout::COption(_) => SizeInfo::variable(4),
            Layout::Array(inner, len) => {
                let n = match len {
                    ArrayLen::Fixed(n) => *n,
                    ArrayLen::Generic(name) => match lookup(scope, name) {
                        Some(Binding::Len(n)) => *n,
                        _ => return Ok(SizeInfo::variable(0)),
                    },
                };
                if n == 0 {
                    return Ok(SizeInfo::fixed(0));
                }
                let elem = self.size_in(inner, scope, visiting, outer)?;
                SizeInfo {
                    min: elem
                        .min
                        .checked_mul(n)
                        .ok_or_else(|| SchemaError::SizeOverflow(format!("array of {}", n)))?,
                    fixed: elem.fixed,
                }
            }
            Layout::Struct(fields) => {
                let mut total = SizeInfo::fixed(0);
                for field in fields {
                    let s = self.size_in(&field.layout, scope, visiting, outer)?;
                    total = total.then(s, &field.name)?;
                }
                total
            }
            Layout::Tuple(layouts) => {
                let mut total = SizeInfo::fixed(0);
                for l in layouts {
                    let s = self.size_in(l, scope, visiting, outer)?;
                    total = total.then(s, "tuple")?;
                }
                total
            }
            Layout::Enum(variants) => {
                let mut sizes = Vec::with_capacity(variants.len());
                let mut first_err = None;
                for variant in variants {
                    match &variant.payload {
                        None => sizes.push(SizeInfo::fixed(0)),
                        Some(payload) => match self.size_in(payload, scope, visiting, outer) {
                            Ok(s) => sizes.push(s),
                            Err(e) => {
                                first_err.get_or_insert(e);
                            }
                        },
                    }
                }
                if sizes.is_empty() {
                    if let Some(e) = first_err {
                        return Err(e);
                    }
                    return Ok(SizeInfo::fixed(1));
                }
                let min = sizes.iter().map(|s| s.min).min().unwrap_or(0);
                let fixed = first_err.is_none()
                    && sizes.iter().all(|s| s.fixed && s.min == min);
                SizeInfo { min: 1 + min, fixed }
            }
            Layout::Ref { name, args } => {
                if visiting.iter().any(|n| n == name) {
                    return Err(SchemaError::InfiniteType(name.clone()));
                }
                let named = self.types.get(name).ok_or_else(|| SchemaError::UndeclaredType {
                    name: name.clone(),
                    referenced_from: "layout".to_string(),
                })?;
                let mut bindings = Vec::with_capacity(args.len());
                for (param, arg) in named.params.iter().zip(args) {
                    match arg {
                        LayoutArg::Type(l) => {
                            if let Ok(l) = substitute(l, scope, false) {
                                bindings.push((param.clone(), Binding::Type(l)));
                            }
                        }
                        LayoutArg::Const(len) => {
                            if let Ok(n) = resolve_len(len, scope) {
                                bindings.push((param.clone(), Binding::Len(n)));
                            }
                        }
                    }
                }
                let caller = visiting.len();
                visiting.push(name.clone());
                let result = self.size_in(&named.body, &bindings, visiting, caller);
                visiting.pop();
                result?
            }
            Layout::Generic(name) => match lookup(scope, name) {
                Some(Binding::Type(l)) => {
                    let inner = visiting.split_off(outer.min(visiting.len()));
                    let depth = visiting.len();
                    let result = self.size_in(l, &[], visiting, depth);
                    visiting.extend(inner);
                    result?
                }
                _ => SizeInfo::variable(0),
            },
        })
    }

    // ------------------------------------------------------------------------
    // Encoding
    // ------------------------------------------------------------------------

    fn encode_in(
        &self,
        layout: &Layout,
        value: &Value,
        scope: &Scope,
        depth: usize,
        ctx: &mut EncodeContext,
    ) -> CodecResult<()> {
        match layout {
            Layout::Bool => match value {
                Value::Bool(b) => {
                    b.encode(ctx)?;
                }
                other => return Err(mismatch("bool", other)),
            },
            Layout::U8 => {
                (expect_unsigned(value, u8::MAX as u128, "u8")? as u8).encode(ctx)?;
            }
            Layout::U16 => {
                (expect_unsigned(value, u16::MAX as u128, "u16")? as u16).encode(ctx)?;
            }
            Layout::U32 => {
                (expect_unsigned(value, u32::MAX as u128, "u32")? as u32).encode(ctx)?;
            }
            Layout::U64 => {
                (expect_unsigned(value, u64::MAX as u128, "u64")? as u64).encode(ctx)?;
            }
            Layout::U128 => {
                expect_unsigned(value, u128::MAX, "u128")?.encode(ctx)?;
            }
            Layout::I8 => {
                (expect_signed(value, i8::MIN as i128, i8::MAX as i128, "i8")? as i8).encode(ctx)?;
            }
            Layout::I16 => {
                (expect_signed(value, i16::MIN as i128, i16::MAX as i128, "i16")? as i16)
                    .encode(ctx)?;
            }
            Layout::I32 => {
                (expect_signed(value, i32::MIN as i128, i32::MAX as i128, "i32")? as i32)
                    .encode(ctx)?;
            }
            Layout::I64 => {
                (expect_signed(value, i64::MIN as i128, i64::MAX as i128, "i64")? as i64)
                    .encode(ctx)?;
            }
            Layout::I128 => {
                expect_signed(value, i128::MIN, i128::MAX, "i128")?.encode(ctx)?;
            }
            Layout::F32 => {
                (expect_float(value, "f32")? as f32).encode(ctx)?;
            }
            Layout::F64 => {
                expect_float(value, "f64")?.encode(ctx)?;
            }
            Layout::PublicKey => {
                expect_pubkey(value)?.encode(ctx)?;
            }
            Layout::Bytes => match value {
                Value::Bytes(b) => {
                    ctx.write_len(b.len())?;
                    ctx.write_bytes(b)?;
                }
                other => return Err(mismatch("bytes", other)),
            },
            Layout::String => match value {
                Value::String(s) => {
                    ctx.write_len(s.len())?;
                    ctx.write_bytes(s.as_bytes())?;
                }
                other => return Err(mismatch("string", other)),
            },
            Layout::Vec(inner) => {
                let items = list_items(value, "vec")?;
                ctx.write_len(items.len())?;
                for item in items {
                    self.encode_in(inner, item, scope, depth, ctx)?;
                }
            }
            Layout::Array(inner, len) => {
                let n = resolve_len(len, scope)?;
                match array_items(value, n)? {
                    ArrayItems::Bytes(b) => {
                        ctx.write_bytes(b)?;
                    }
                    ArrayItems::Values(items) => {
                        for item in items {
                            self.encode_in(inner, item, scope, depth, ctx)?;
                        }
                    }
                }
            }
            Layout::Option(inner) => match option_inner(value)? {
                None => {
                    ctx.write_byte(0)?;
                }
                Some(v) => {
                    ctx.write_byte(1)?;
                    self.encode_in(inner, v, scope, depth, ctx)?;
                }
            },
            Layout::COption(inner) => match option_inner(value)? {
                None => {
                    0u32.encode(ctx)?;
                }
                Some(v) => {
                    1u32.encode(ctx)?;
                    self.encode_in(inner, v, scope, depth, ctx)?;
                }
            },
            Layout::Map(key, val) => match value {
                Value::Map(entries) => {
                    ctx.write_len(entries.len())?;
                    for (k, v) in entries {
                        self.encode_in(key, k, scope, depth, ctx)?;
                        self.encode_in(val, v, scope, depth, ctx)?;
                    }
                }
                other => return Err(mismatch("map", other)),
            },
            Layout::Struct(fields) => {
                for field in fields {
                    let v = struct_field(value, &field.name)?;
                    self.encode_in(&field.layout, v, scope, depth, ctx)?;
                }
            }
            Layout::Tuple(layouts) => {
                let items = tuple_items(value, layouts.len())?;
                for (l, v) in layouts.iter().zip(items) {
                    self.encode_in(l, v, scope, depth, ctx)?;
                }
            }
            Layout::Enum(variants) => {
                let (index, variant, data) = find_variant(variants, value)?;
                ctx.write_byte(index)?;
                if let Some(payload) = &variant.payload {
                    self.encode_in(payload, data, scope, depth, ctx)?;
                }
            }
            Layout::Ref { name, args } => {
                let (body, bindings) = self.enter(name, args, scope, depth)?;
                self.encode_in(body, value, &bindings, depth + 1, ctx)?;
            }
            Layout::Generic(name) => {
                let bound = self.bound_type(name, scope)?;
                self.encode_in(bound, value, &[], depth, ctx)?;
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Decoding
    // ------------------------------------------------------------------------

    fn decode_in(
        &self,
        layout: &Layout,
        scope: &Scope,
        depth: usize,
        ctx: &mut DecodeContext,
    ) -> CodecResult<Value> {
        Ok(match layout {
            Layout::Bool => Value::Bool(bool::decode(ctx)?),
            Layout::U8 => Value::UInt(u8::decode(ctx)? as u128),
            Layout::U16 => Value::UInt(u16::decode(ctx)? as u128),
            Layout::U32 => Value::UInt(u32::decode(ctx)? as u128),
            Layout::U64 => Value::UInt(u64::decode(ctx)? as u128),
            Layout::U128 => Value::UInt(u128::decode(ctx)?),
            Layout::I8 => Value::Int(i8::decode(ctx)? as i128),
            Layout::I16 => Value::Int(i16::decode(ctx)? as i128),
            Layout::I32 => Value::Int(i32::decode(ctx)? as i128),
            Layout::I64 => Value::Int(i64::decode(ctx)? as i128),
            Layout::I128 => Value::Int(i128::decode(ctx)?),
            Layout::F32 => Value::Float(f32::decode(ctx)? as f64),
            Layout::F64 => Value::Float(f64::decode(ctx)?),
            Layout::PublicKey => Value::PublicKey(Pubkey::decode(ctx)?),
            Layout::Bytes => Value::Bytes(Vec::<u8>::decode(ctx)?),
            Layout::String => Value::String(String::decode(ctx)?),
            Layout::Vec(inner) => {
                let min = self.min_element_size(inner, scope);
                let len = ctx.read_len(min)?;
                let mut items = Vec::with_capacity(len.min(ctx.remaining()));
                for _ in 0..len {
                    items.push(self.decode_in(inner, scope, depth, ctx)?);
                }
                Value::List(items)
            }
            Layout::Array(inner, len) => {
                let n = resolve_len(len, scope)?;
                let mut items = Vec::with_capacity(n.min(ctx.remaining()));
                for _ in 0..n {
                    items.push(self.decode_in(inner, scope, depth, ctx)?);
                }
                Value::List(items)
            }
            Layout::Option(inner) => match ctx.read_byte()? {
                0 => Value::Option(None),
                1 => Value::some(self.decode_in(inner, scope, depth, ctx)?),
                tag => {
                    return Err(CodecError::InvalidData(format!(
                        "invalid option tag: {}",
                        tag
                    )))
                }
            },
            Layout::COption(inner) => match u32::decode(ctx)? {
                0 => Value::Option(None),
                1 => Value::some(self.decode_in(inner, scope, depth, ctx)?),
                tag => {
                    return Err(CodecError::InvalidData(format!(
                        "invalid coption tag: {}",
                        tag
                    )))
                }
            },
            Layout::Map(key, val) => {
                let min = self
                    .min_element_size(key, scope)
                    .saturating_add(self.min_element_size(val, scope));
                let len = ctx.read_len(min)?;
                let mut entries = Vec::with_capacity(len.min(ctx.remaining()));
                for _ in 0..len {
                    let k = self.decode_in(key, scope, depth, ctx)?;
                    let v = self.decode_in(val, scope, depth, ctx)?;
                    entries.push((k, v));
                }
                Value::Map(entries)
            }
            Layout::Struct(fields) => {
                let mut out = Vec::with_capacity(fields.len());
                for field in fields {
                    out.push((
                        field.name.clone(),
                        self.decode_in(&field.layout, scope, depth, ctx)?,
                    ));
                }
                Value::Struct(out)
            }
            Layout::Tuple(layouts) => {
                let mut out = Vec::with_capacity(layouts.len());
                for l in layouts {
                    out.push(self.decode_in(l, scope, depth, ctx)?);
                }
                Value::Tuple(out)
            }
            Layout::Enum(variants) => {
                let index = ctx.read_byte()?;
                let variant = variants.get(index as usize).ok_or_else(|| {
                    CodecError::InvalidData(format!("invalid enum variant index: {}", index))
                })?;
                let data = match &variant.payload {
                    None => Value::Unit,
                    Some(payload) => self.decode_in(payload, scope, depth, ctx)?,
                };
                Value::variant(&variant.name, data)
            }
            Layout::Ref { name, args } => {
                let (body, bindings) = self.enter(name, args, scope, depth)?;
                self.decode_in(body, &bindings, depth + 1, ctx)?
            }
            Layout::Generic(name) => {
                let bound = self.bound_type(name, scope)?;
                self.decode_in(bound, &[], depth, ctx)?
            }
        })
    }

    /// Lower bound on one element's size, used to sanity-check length prefixes
    ///
    /// Never below one byte: a prefix may not promise more elements than
    /// there are input bytes left, even for zero-sized elements.
    fn min_element_size(&self, layout: &Layout, scope: &Scope) -> usize {
        self.size_in(layout, scope, &mut Vec::new(), 0)
            .map(|s| s.min)
            .unwrap_or(0)
            .max(1)
    }
}

// ============================================================================
// Type expression -> layout
// ============================================================================

struct TypeBuilder<'a> {
    declared: &'a HashSet<&'a str>,
}

impl TypeBuilder<'_> {
    fn def_layout(&self, ty: &IdlTypeDefTy, context: &str) -> Result<Layout, SchemaError> {
        match ty {
            IdlTypeDefTy::Struct { fields } => match fields {
                None => Ok(Layout::Struct(Vec::new())),
                Some(fields) => self.defined_fields(fields, context),
            },
            IdlTypeDefTy::Enum { variants } => {
                if variants.len() > u8::MAX as usize + 1 {
                    return Err(SchemaError::TooManyVariants(context.to_string()));
                }
                let mut out = Vec::with_capacity(variants.len());
                for variant in variants {
                    let payload = match &variant.fields {
                        None => None,
                        Some(fields) => Some(self.defined_fields(fields, context)?),
                    };
                    out.push(VariantLayout {
                        name: variant.name.clone(),
                        payload,
                    });
                }
                Ok(Layout::Enum(out))
            }
            IdlTypeDefTy::Alias { alias } => self.type_layout(alias, context),
        }
    }

    fn defined_fields(
        &self,
        fields: &IdlDefinedFields,
        context: &str,
    ) -> Result<Layout, SchemaError> {
        match fields {
            IdlDefinedFields::Named(fields) => self.named_fields(fields, context),
            IdlDefinedFields::Tuple(types) => Ok(Layout::Tuple(
                types
                    .iter()
                    .map(|t| self.type_layout(t, context))
                    .collect::<Result<_, _>>()?,
            )),
        }
    }

    fn named_fields(&self, fields: &[IdlField], context: &str) -> Result<Layout, SchemaError> {
        let mut out = Vec::with_capacity(fields.len());
        for field in fields {
            out.push(FieldLayout {
                name: field.name.clone(),
                layout: self.type_layout(&field.ty, context)?,
            });
        }
        Ok(Layout::Struct(out))
    }

    fn type_layout(&self, ty: &IdlType, context: &str) -> Result<Layout, SchemaError> {
        Ok(match ty {
            IdlType::Bool => Layout::Bool,
            IdlType::U8 => Layout::U8,
            IdlType::I8 => Layout::I8,
            IdlType::U16 => Layout::U16,
            IdlType::I16 => Layout::I16,
            IdlType::U32 => Layout::U32,
            IdlType::I32 => Layout::I32,
            IdlType::F32 => Layout::F32,
            IdlType::U64 => Layout::U64,
            IdlType::I64 => Layout::I64,
            IdlType::F64 => Layout::F64,
            IdlType::U128 => Layout::U128,
            IdlType::I128 => Layout::I128,
            IdlType::Bytes => Layout::Bytes,
            IdlType::String => Layout::String,
            IdlType::PublicKey => Layout::PublicKey,
            IdlType::Vec(inner) => Layout::Vec(Box::new(self.type_layout(inner, context)?)),
            IdlType::Option(inner) => Layout::Option(Box::new(self.type_layout(inner, context)?)),
            IdlType::COption(inner) => {
                Layout::COption(Box::new(self.type_layout(inner, context)?))
            }
            IdlType::Array(inner, len) => Layout::Array(
                Box::new(self.type_layout(inner, context)?),
                match len {
                    IdlArrayLen::Value(n) => ArrayLen::Fixed(*n),
                    IdlArrayLen::Generic { generic } => ArrayLen::Generic(generic.clone()),
                },
            ),
            IdlType::HashMap(key, val) => Layout::Map(
                Box::new(self.type_layout(key, context)?),
                Box::new(self.type_layout(val, context)?),
            ),
            IdlType::Defined { name, generics } => {
                if !self.declared.contains(name.as_str()) {
                    return Err(SchemaError::UndeclaredType {
                        name: name.clone(),
                        referenced_from: context.to_string(),
                    });
                }
                let mut args = Vec::with_capacity(generics.len());
                for arg in generics {
                    args.push(match arg {
                        IdlGenericArg::Type { ty } => {
                            LayoutArg::Type(self.type_layout(ty, context)?)
                        }
                        IdlGenericArg::Const { value } => match value.parse::<usize>() {
                            Ok(n) => LayoutArg::Const(ArrayLen::Fixed(n)),
                            Err(_) => LayoutArg::Const(ArrayLen::Generic(value.clone())),
                        },
                    });
                }
                Layout::Ref {
                    name: name.clone(),
                    args,
                }
            }
            IdlType::Generic(name) => Layout::Generic(name.clone()),
        })
    }
}

// ============================================================================
// Generic substitution
// ============================================================================

fn resolve_len(len: &ArrayLen, scope: &Scope) -> CodecResult<usize> {
    match len {
        ArrayLen::Fixed(n) => Ok(*n),
        ArrayLen::Generic(name) => match lookup(scope, name) {
            Some(Binding::Len(n)) => Ok(*n),
            _ => Err(unbound(name)),
        },
    }
}

/// Replace generic placeholders with their bindings
///
/// Named references are not expanded, only their arguments are rewritten,
/// so substitution terminates for recursive types. With `strict` unset,
/// unbound placeholders are left in place.
fn substitute(layout: &Layout, scope: &Scope, strict: bool) -> CodecResult<Layout> {
    if scope.is_empty() && !strict {
        return Ok(layout.clone());
    }
    let sub = |l: &Box<Layout>| substitute(l, scope, strict).map(Box::new);
    Ok(match layout {
        Layout::Generic(name) => match lookup(scope, name) {
            Some(Binding::Type(bound)) => bound.clone(),
            _ if strict => return Err(unbound(name)),
            _ => layout.clone(),
        },
        Layout::Vec(inner) => Layout::Vec(sub(inner)?),
        Layout::Option(inner) => Layout::Option(sub(inner)?),
        Layout::COption(inner) => Layout::COption(sub(inner)?),
        Layout::Map(k, v) => Layout::Map(sub(k)?, sub(v)?),
        Layout::Array(inner, len) => {
            let len = match resolve_len(len, scope) {
                Ok(n) => ArrayLen::Fixed(n),
                Err(e) if strict => return Err(e),
                Err(_) => len.clone(),
            };
            Layout::Array(sub(inner)?, len)
        }
        Layout::Struct(fields) => Layout::Struct(
            fields
                .iter()
                .map(|f| {
                    Ok(FieldLayout {
                        name: f.name.clone(),
                        layout: substitute(&f.layout, scope, strict)?,
                    })
                })
                .collect::<CodecResult<_>>()?,
        ),
        Layout::Tuple(layouts) => Layout::Tuple(
            layouts
                .iter()
                .map(|l| substitute(l, scope, strict))
                .collect::<CodecResult<_>>()?,
        ),
        Layout::Enum(variants) => Layout::Enum(
            variants
                .iter()
                .map(|v| {
                    Ok(VariantLayout {
                        name: v.name.clone(),
                        payload: v
                            .payload
                            .as_ref()
                            .map(|p| substitute(p, scope, strict))
                            .transpose()?,
                    })
                })
                .collect::<CodecResult<_>>()?,
        ),
        Layout::Ref { name, args } => Layout::Ref {
            name: name.clone(),
            args: args
                .iter()
                .map(|arg| {
                    Ok(match arg {
                        LayoutArg::Type(l) => LayoutArg::Type(substitute(l, scope, strict)?),
                        LayoutArg::Const(len) => match resolve_len(len, scope) {
                            Ok(n) => LayoutArg::Const(ArrayLen::Fixed(n)),
                            Err(e) if strict => return Err(e),
                            Err(_) => LayoutArg::Const(len.clone()),
                        },
                    })
                })
                .collect::<CodecResult<_>>()?,
        },
        primitive => primitive.clone(),
    })
}

// ============================================================================
// Value accessors
// ============================================================================

fn expect_unsigned(value: &Value, max: u128, expected: &str) -> CodecResult<u128> {
    let v = match value {
        Value::UInt(u) => Some(*u),
        Value::Int(i) => u128::try_from(*i).ok(),
        other => return Err(mismatch(expected, other)),
    };
    v.filter(|v| *v <= max).ok_or_else(|| {
        CodecError::InvalidData(format!("{:?} out of range for {}", value, expected))
    })
}

fn expect_signed(value: &Value, min: i128, max: i128, expected: &str) -> CodecResult<i128> {
    let v = match value {
        Value::Int(i) => Some(*i),
        Value::UInt(u) => i128::try_from(*u).ok(),
        other => return Err(mismatch(expected, other)),
    };
    v.filter(|v| *v >= min && *v <= max).ok_or_else(|| {
        CodecError::InvalidData(format!("{:?} out of range for {}", value, expected))
    })
}

fn expect_float(value: &Value, expected: &str) -> CodecResult<f64> {
    match value {
        Value::Float(f) => Ok(*f),
        Value::Int(i) => Ok(*i as f64),
        Value::UInt(u) => Ok(*u as f64),
        other => Err(mismatch(expected, other)),
    }
}

fn expect_pubkey(value: &Value) -> CodecResult<Pubkey> {
    match value {
        Value::PublicKey(k) => Ok(*k),
        Value::String(s) => {
            Pubkey::from_base58(s).map_err(|e| CodecError::InvalidData(e.to_string()))
        }
        Value::Bytes(b) => {
            Pubkey::try_from_slice(b).map_err(|e| CodecError::InvalidData(e.to_string()))
        }
        other => Err(mismatch("publicKey", other)),
    }
}

fn list_items<'v>(value: &'v Value, expected: &str) -> CodecResult<&'v [Value]> {
    match value {
        Value::List(items) | Value::Tuple(items) => Ok(items),
        other => Err(mismatch(expected, other)),
    }
}

enum ArrayItems<'v> {
    Bytes(&'v [u8]),
    Values(&'v [Value]),
}

/// Fixed arrays take a list of elements, or raw bytes for `[u8; N]`
fn array_items(value: &Value, n: usize) -> CodecResult<ArrayItems<'_>> {
    let (items, len) = match value {
        Value::Bytes(b) => (ArrayItems::Bytes(b), b.len()),
        Value::List(items) | Value::Tuple(items) => (ArrayItems::Values(items), items.len()),
        other => return Err(mismatch(format!("array of {}", n), other)),
    };
    if len != n {
        return Err(CodecError::InvalidData(format!(
            "array length mismatch: expected {}, got {}",
            n, len
        )));
    }
    Ok(items)
}

fn option_inner(value: &Value) -> CodecResult<Option<&Value>> {
    match value {
        Value::Option(inner) => Ok(inner.as_deref()),
        other => Err(mismatch("option", other)),
    }
}

fn struct_field<'v>(value: &'v Value, name: &str) -> CodecResult<&'v Value> {
    match value {
        Value::Struct(_) => value
            .get(name)
            .ok_or_else(|| CodecError::InvalidData(format!("missing field '{}'", name))),
        other => Err(mismatch("struct", other)),
    }
}

fn tuple_items(value: &Value, n: usize) -> CodecResult<&[Value]> {
    let items = list_items(value, "tuple")?;
    if items.len() != n {
        return Err(CodecError::InvalidData(format!(
            "tuple arity mismatch: expected {}, got {}",
            n,
            items.len()
        )));
    }
    Ok(items)
}

fn find_variant<'l, 'v>(
    variants: &'l [VariantLayout],
    value: &'v Value,
) -> CodecResult<(u8, &'l VariantLayout, &'v Value)> {
    let (name, data) = match value {
        Value::Enum { variant, data } => (variant, data.as_ref()),
        other => return Err(mismatch("enum", other)),
    };
    let index = variants
        .iter()
        .position(|v| &v.name == name)
        .ok_or_else(|| CodecError::InvalidData(format!("unknown enum variant '{}'", name)))?;
    if variants[index].payload.is_none() && *data != Value::Unit {
        return Err(mismatch("unit", data));
    }
    // Bounded by the 256-variant check at build time
    Ok((index as u8, &variants[index], data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::idl::{IdlEnumVariant, IdlTypeDef};

    fn point_idl() -> Idl {
        Idl::new("test").with_type(IdlTypeDef::new(
            "Point",
            IdlTypeDefTy::named_struct(vec![
                IdlField::new("x", IdlType::I32),
                IdlField::new("y", IdlType::I32),
            ]),
        ))
    }

    fn list_node_idl() -> Idl {
        Idl::new("test").with_type(IdlTypeDef::new(
            "Node",
            IdlTypeDefTy::named_struct(vec![
                IdlField::new("value", IdlType::U8),
                IdlField::new("next", IdlType::Option(Box::new(IdlType::defined("Node")))),
            ]),
        ))
    }

    fn node(values: &[u8]) -> Value {
        let mut next = Value::none();
        for v in values.iter().rev() {
            next = Value::some(Value::record([
                ("value", Value::from(*v)),
                ("next", next),
            ]));
        }
        match next {
            Value::Option(Some(inner)) => *inner,
            _ => panic!("empty list"),
        }
    }

    #[test]
    fn test_struct_roundtrip() {
        let registry = LayoutRegistry::build(&point_idl(), 64).unwrap();
        let layout = Layout::named("Point");
        let value = Value::record([("x", Value::Int(-1)), ("y", Value::Int(7))]);

        let bytes = registry.encode(&layout, &value).unwrap();
        assert_eq!(bytes, vec![0xFF, 0xFF, 0xFF, 0xFF, 7, 0, 0, 0]);
        assert_eq!(registry.decode(&layout, &bytes).unwrap(), value);
    }

    #[test]
    fn test_wire_format_of_containers() {
        let registry = LayoutRegistry::build(&point_idl(), 64).unwrap();

        let s = registry.encode(&Layout::String, &"ab".into()).unwrap();
        assert_eq!(s, vec![2, 0, 0, 0, b'a', b'b']);

        let v = registry
            .encode(
                &Layout::Vec(Box::new(Layout::U16)),
                &Value::List(vec![Value::from(1u16), Value::from(2u16)]),
            )
            .unwrap();
        assert_eq!(v, vec![2, 0, 0, 0, 1, 0, 2, 0]);

        let none = registry
            .encode(&Layout::Option(Box::new(Layout::U8)), &Value::none())
            .unwrap();
        assert_eq!(none, vec![0]);
        let some = registry
            .encode(&Layout::Option(Box::new(Layout::U8)), &Value::some(9u8.into()))
            .unwrap();
        assert_eq!(some, vec![1, 9]);

        let cnone = registry
            .encode(&Layout::COption(Box::new(Layout::U8)), &Value::none())
            .unwrap();
        assert_eq!(cnone, vec![0, 0, 0, 0]);

        let arr = registry
            .encode(
                &Layout::Array(Box::new(Layout::U8), ArrayLen::Fixed(3)),
                &Value::Bytes(vec![1, 2, 3]),
            )
            .unwrap();
        assert_eq!(arr, vec![1, 2, 3]);
    }

    #[test]
    fn test_enum_variants() {
        let idl = Idl::new("test").with_type(IdlTypeDef::new(
            "Shape",
            IdlTypeDefTy::Enum {
                variants: vec![
                    IdlEnumVariant {
                        name: "Empty".to_string(),
                        fields: None,
                    },
                    IdlEnumVariant {
                        name: "Circle".to_string(),
                        fields: Some(IdlDefinedFields::Named(vec![IdlField::new(
                            "radius",
                            IdlType::U16,
                        )])),
                    },
                    IdlEnumVariant {
                        name: "Pair".to_string(),
                        fields: Some(IdlDefinedFields::Tuple(vec![IdlType::U8, IdlType::Bool])),
                    },
                ],
            },
        ));
        let registry = LayoutRegistry::build(&idl, 64).unwrap();
        let layout = Layout::named("Shape");

        let empty = Value::unit_variant("Empty");
        assert_eq!(registry.encode(&layout, &empty).unwrap(), vec![0]);

        let circle = Value::variant("Circle", Value::record([("radius", Value::from(5u16))]));
        let bytes = registry.encode(&layout, &circle).unwrap();
        assert_eq!(bytes, vec![1, 5, 0]);
        assert_eq!(registry.decode(&layout, &bytes).unwrap(), circle);

        let pair = Value::variant("Pair", Value::Tuple(vec![3u8.into(), true.into()]));
        let bytes = registry.encode(&layout, &pair).unwrap();
        assert_eq!(bytes, vec![2, 3, 1]);
        assert_eq!(registry.decode(&layout, &bytes).unwrap(), pair);

        assert!(matches!(
            registry.decode(&layout, &[9]),
            Err(CodecError::InvalidData(_))
        ));
    }

    #[test]
    fn test_self_referential_type_builds_and_roundtrips() {
        let registry = LayoutRegistry::build(&list_node_idl(), 64).unwrap();
        let layout = Layout::named("Node");
        let value = node(&[1, 2, 3]);

        let bytes = registry.encode(&layout, &value).unwrap();
        assert_eq!(bytes, vec![1, 1, 2, 1, 3, 0]);
        assert_eq!(registry.decode(&layout, &bytes).unwrap(), value);
    }

    #[test]
    fn test_recursion_bounded_by_max_depth() {
        let registry = LayoutRegistry::build(&list_node_idl(), 4).unwrap();
        let layout = Layout::named("Node");
        let deep = node(&[1, 2, 3, 4, 5, 6]);
        assert_eq!(
            registry.encode(&layout, &deep),
            Err(CodecError::DepthExceeded(4))
        );
    }

    #[test]
    fn test_mutual_recursion_builds() {
        let idl = Idl::new("test")
            .with_type(IdlTypeDef::new(
                "Tree",
                IdlTypeDefTy::named_struct(vec![IdlField::new(
                    "children",
                    IdlType::Vec(Box::new(IdlType::defined("Branch"))),
                )]),
            ))
            .with_type(IdlTypeDef::new(
                "Branch",
                IdlTypeDefTy::named_struct(vec![
                    IdlField::new("weight", IdlType::U8),
                    IdlField::new("tree", IdlType::defined("Tree")),
                ]),
            ));
        let registry = LayoutRegistry::build(&idl, 64).unwrap();
        let leaf = Value::record([("children", Value::List(vec![]))]);
        let tree = Value::record([(
            "children",
            Value::List(vec![Value::record([("weight", 4u8.into()), ("tree", leaf)])]),
        )]);
        let bytes = registry.encode(&Layout::named("Tree"), &tree).unwrap();
        assert_eq!(bytes, vec![1, 0, 0, 0, 4, 0, 0, 0, 0]);
        assert_eq!(registry.decode(&Layout::named("Tree"), &bytes).unwrap(), tree);
    }

    #[test]
    fn test_infinite_type_rejected() {
        let idl = Idl::new("test")
            .with_type(IdlTypeDef::new(
                "A",
                IdlTypeDefTy::named_struct(vec![IdlField::new("b", IdlType::defined("B"))]),
            ))
            .with_type(IdlTypeDef::new(
                "B",
                IdlTypeDefTy::named_struct(vec![IdlField::new("a", IdlType::defined("A"))]),
            ));
        assert!(matches!(
            LayoutRegistry::build(&idl, 64),
            Err(SchemaError::InfiniteType(_))
        ));
    }

    #[test]
    fn test_undeclared_reference_fails_at_build() {
        let idl = Idl::new("test").with_type(IdlTypeDef::new(
            "A",
            IdlTypeDefTy::named_struct(vec![IdlField::new("b", IdlType::defined("Nope"))]),
        ));
        assert!(matches!(
            LayoutRegistry::build(&idl, 64),
            Err(SchemaError::UndeclaredType { .. })
        ));
    }

    #[test]
    fn test_generic_substitution() {
        let mut wrapper = IdlTypeDef::new(
            "Wrapper",
            IdlTypeDefTy::named_struct(vec![
                IdlField::new("value", IdlType::Generic("T".to_string())),
                IdlField::new(
                    "extra",
                    IdlType::Array(
                        Box::new(IdlType::Generic("T".to_string())),
                        IdlArrayLen::Generic {
                            generic: "N".to_string(),
                        },
                    ),
                ),
            ]),
        );
        wrapper.generics = vec![
            IdlGenericParam::Type {
                name: "T".to_string(),
            },
            IdlGenericParam::Const {
                name: "N".to_string(),
                ty: "usize".to_string(),
            },
        ];
        let registry = LayoutRegistry::build(&Idl::new("test").with_type(wrapper), 64).unwrap();

        let layout = registry
            .layout_of(&IdlType::Defined {
                name: "Wrapper".to_string(),
                generics: vec![
                    IdlGenericArg::Type { ty: IdlType::U16 },
                    IdlGenericArg::Const {
                        value: "2".to_string(),
                    },
                ],
            })
            .unwrap();
        let value = Value::record([
            ("value", Value::from(1u16)),
            ("extra", Value::List(vec![2u16.into(), 3u16.into()])),
        ]);
        let bytes = registry.encode(&layout, &value).unwrap();
        assert_eq!(bytes, vec![1, 0, 2, 0, 3, 0]);
        assert_eq!(registry.decode(&layout, &bytes).unwrap(), value);
        assert_eq!(registry.size_info(&layout).unwrap(), SizeInfo::fixed(6));
    }

    #[test]
    fn test_map_roundtrip() {
        let registry = LayoutRegistry::build(&Idl::new("test"), 64).unwrap();
        let layout = registry
            .layout_of(&IdlType::HashMap(
                Box::new(IdlType::String),
                Box::new(IdlType::U8),
            ))
            .unwrap();
        let value = Value::Map(vec![("a".into(), 1u8.into()), ("b".into(), 2u8.into())]);
        let bytes = registry.encode(&layout, &value).unwrap();
        assert_eq!(bytes, vec![2, 0, 0, 0, 1, 0, 0, 0, b'a', 1, 1, 0, 0, 0, b'b', 2]);
        assert_eq!(registry.decode(&layout, &bytes).unwrap(), value);
    }

    #[test]
    fn test_size_info() {
        let registry = LayoutRegistry::build(&list_node_idl(), 64).unwrap();
        assert_eq!(
            registry.size_info(&Layout::named("Node")).unwrap(),
            SizeInfo::variable(2)
        );
        assert_eq!(
            registry
                .size_info(&Layout::Array(Box::new(Layout::U64), ArrayLen::Fixed(4)))
                .unwrap(),
            SizeInfo::fixed(32)
        );
    }

    #[test]
    fn test_integer_range_checks() {
        let registry = LayoutRegistry::build(&Idl::new("test"), 64).unwrap();
        assert!(matches!(
            registry.encode(&Layout::U8, &Value::UInt(256)),
            Err(CodecError::InvalidData(_))
        ));
        assert!(matches!(
            registry.encode(&Layout::U32, &Value::Int(-1)),
            Err(CodecError::InvalidData(_))
        ));
        assert_eq!(
            registry.encode(&Layout::I16, &Value::UInt(5)).unwrap(),
            vec![5, 0]
        );
        assert!(matches!(
            registry.encode(&Layout::U8, &Value::Bool(true)),
            Err(CodecError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_missing_struct_field() {
        let registry = LayoutRegistry::build(&point_idl(), 64).unwrap();
        let value = Value::record([("x", Value::Int(1))]);
        assert!(matches!(
            registry.encode(&Layout::named("Point"), &value),
            Err(CodecError::InvalidData(_))
        ));
    }

    fn wrapper_def() -> IdlTypeDef {
        let mut wrapper = IdlTypeDef::new(
            "Wrapper",
            IdlTypeDefTy::named_struct(vec![IdlField::new(
                "v",
                IdlType::Generic("T".to_string()),
            )]),
        );
        wrapper.generics = vec![IdlGenericParam::Type {
            name: "T".to_string(),
        }];
        wrapper
    }

    fn wrapped(inner: IdlType) -> IdlType {
        IdlType::Defined {
            name: "Wrapper".to_string(),
            generics: vec![IdlGenericArg::Type { ty: inner }],
        }
    }

    #[test]
    fn test_nested_generic_instantiation() {
        let idl = Idl::new("test").with_type(wrapper_def()).with_type(IdlTypeDef::new(
            "Outer",
            IdlTypeDefTy::named_struct(vec![IdlField::new("a", wrapped(wrapped(IdlType::U8)))]),
        ));
        let registry = LayoutRegistry::build(&idl, 64).unwrap();

        let outer = Layout::named("Outer");
        let value = Value::record([(
            "a",
            Value::record([("v", Value::record([("v", Value::from(7u8))]))]),
        )]);
        let bytes = registry.encode(&outer, &value).unwrap();
        assert_eq!(bytes, vec![7]);
        assert_eq!(registry.decode(&outer, &bytes).unwrap(), value);
        assert_eq!(registry.size_info(&outer).unwrap(), SizeInfo::fixed(1));
    }

    #[test]
    fn test_cycle_through_generic_argument_rejected() {
        let idl = Idl::new("test").with_type(wrapper_def()).with_type(IdlTypeDef::new(
            "Loop",
            IdlTypeDefTy::named_struct(vec![IdlField::new("w", wrapped(IdlType::defined("Loop")))]),
        ));
        assert_eq!(
            LayoutRegistry::build(&idl, 64).unwrap_err(),
            SchemaError::InfiniteType("Loop".to_string())
        );
    }

    #[test]
    fn test_zero_sized_elements_bounded_by_input() {
        let idl = Idl::new("test")
            .with_type(IdlTypeDef::new("Empty", IdlTypeDefTy::named_struct(vec![])))
            .with_type(IdlTypeDef::new(
                "Holder",
                IdlTypeDefTy::named_struct(vec![IdlField::new(
                    "items",
                    IdlType::Vec(Box::new(IdlType::defined("Empty"))),
                )]),
            ));
        let registry = LayoutRegistry::build(&idl, 64).unwrap();
        let holder = Layout::named("Holder");

        // 16M elements promised by a 4-byte buffer
        assert!(matches!(
            registry.decode(&holder, &[0, 0, 0, 1]),
            Err(CodecError::BufferUnderflow { .. })
        ));
        assert!(matches!(
            registry.decode(&holder, &[2, 0, 0, 0]),
            Err(CodecError::BufferUnderflow { .. })
        ));

        let one = Value::record([("items", Value::List(vec![Value::Struct(Vec::new())]))]);
        assert_eq!(registry.decode(&holder, &[1, 0, 0, 0, 0]).unwrap(), one);
    }

    #[test]
    fn test_array_size_overflow() {
        let registry = LayoutRegistry::build(&point_idl(), 64).unwrap();
        let huge = Layout::Array(Box::new(Layout::U64), ArrayLen::Fixed(usize::MAX));
        assert!(matches!(
            registry.size_info(&huge),
            Err(SchemaError::SizeOverflow(_))
        ));

        let idl = point_idl().with_type(IdlTypeDef::new(
            "Huge",
            IdlTypeDefTy::named_struct(vec![IdlField::new(
                "cells",
                IdlType::Array(Box::new(IdlType::U64), IdlArrayLen::Value(usize::MAX / 4)),
            )]),
        ));
        assert!(matches!(
            LayoutRegistry::build(&idl, 64),
            Err(SchemaError::SizeOverflow(_))
        ));
    }
}
