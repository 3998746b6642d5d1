#![forbid(unsafe_code)]

use std::fmt;

use crate::{span, IdRef, Span};

/// Size of a linear-memory address (strings, maps, objects and unsized arrays).
pub const ADDR_SIZE: u32 = 4;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TypeKind {
    #[default]
    None,
    Bool,
    Byte,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Double,
    String,
    Struct,
    Map,
    Object,
    Tuple,
    Void,
}

impl TypeKind {
    pub fn name(self) -> &'static str {
        match self {
            TypeKind::None => "none",
            TypeKind::Bool => "bool",
            TypeKind::Byte => "byte",
            TypeKind::Int8 => "int8",
            TypeKind::Int16 => "int16",
            TypeKind::Int32 => "int32",
            TypeKind::Int64 => "int64",
            TypeKind::Uint8 => "uint8",
            TypeKind::Uint16 => "uint16",
            TypeKind::Uint32 => "uint32",
            TypeKind::Uint64 => "uint64",
            TypeKind::Double => "double",
            TypeKind::String => "string",
            TypeKind::Struct => "struct",
            TypeKind::Map => "map",
            TypeKind::Object => "object",
            TypeKind::Tuple => "tuple",
            TypeKind::Void => "void",
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            TypeKind::Byte
                | TypeKind::Int8
                | TypeKind::Int16
                | TypeKind::Int32
                | TypeKind::Int64
                | TypeKind::Uint8
                | TypeKind::Uint16
                | TypeKind::Uint32
                | TypeKind::Uint64
        )
    }

    pub fn is_numeric(self) -> bool {
        self.is_integer() || self == TypeKind::Double
    }

    /// Types whose values may be `null`.
    pub fn is_nullable(self) -> bool {
        matches!(self, TypeKind::String | TypeKind::Map | TypeKind::Object)
    }

    pub fn is_composite(self) -> bool {
        matches!(self, TypeKind::Struct | TypeKind::Map | TypeKind::Tuple)
    }

    /// Byte size of a scalar of this kind. Composite kinds are sized by `Meta`.
    pub fn size(self) -> u32 {
        match self {
            TypeKind::None | TypeKind::Void | TypeKind::Tuple | TypeKind::Struct => 0,
            TypeKind::Bool | TypeKind::Byte | TypeKind::Int8 | TypeKind::Uint8 => 1,
            TypeKind::Int16 | TypeKind::Uint16 => 2,
            TypeKind::Int32 | TypeKind::Uint32 => 4,
            TypeKind::Int64 | TypeKind::Uint64 | TypeKind::Double => 8,
            TypeKind::String | TypeKind::Map | TypeKind::Object => ADDR_SIZE,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NominalKind {
    Struct,
    Contract,
    Interface,
}

/// Lookup key of the declaration that names a struct or object type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Nominal {
    pub id: IdRef,
    pub name: String,
    pub kind: NominalKind,
}

/// Static type of a declaration or expression.
///
/// `elems` holds the element types of a tuple, the fields of a struct, or
/// exactly `[key, value]` for a map. Element metas are copies taken when the
/// composite is built, so later changes to the source declarations are not
/// seen here. `dims` has one entry per array dimension; `None` marks a
/// dimension whose length is not fixed.
#[derive(Clone, Debug, PartialEq)]
pub struct Meta {
    pub ty: TypeKind,
    pub untyped: bool,
    pub elems: Vec<Meta>,
    pub dims: Vec<Option<u32>>,
    pub nominal: Option<Nominal>,
    pub span: Span,
}

impl Default for Meta {
    fn default() -> Self {
        Meta::new(TypeKind::None)
    }
}

/// Rounds `offset` up to `align`, saturating at `u32::MAX`.
pub fn align_to(offset: u32, align: u32) -> u32 {
    checked_align_to(offset, align).unwrap_or(u32::MAX)
}

pub fn checked_align_to(offset: u32, align: u32) -> Option<u32> {
    if align <= 1 {
        Some(offset)
    } else {
        offset.div_ceil(align).checked_mul(align)
    }
}

impl Meta {
    pub fn new(ty: TypeKind) -> Self {
        Self {
            ty,
            untyped: false,
            elems: Vec::new(),
            dims: Vec::new(),
            nominal: None,
            span: span(0, 0),
        }
    }

    /// A literal type still waiting for its context to pin it down.
    pub fn untyped(ty: TypeKind) -> Self {
        Self {
            untyped: true,
            ..Meta::new(ty)
        }
    }

    pub fn void() -> Self {
        Meta::new(TypeKind::Void)
    }

    pub fn map(key: Meta, value: Meta) -> Self {
        let mut meta = Meta::default();
        meta.set_map(key, value);
        meta
    }

    pub fn tuple(elems: Vec<Meta>) -> Self {
        let mut meta = Meta::default();
        meta.set_tuple(elems);
        meta
    }

    pub fn object(nominal: Option<Nominal>) -> Self {
        let mut meta = Meta::default();
        meta.set_object(nominal);
        meta
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn with_dims(mut self, dims: Vec<Option<u32>>) -> Self {
        self.dims = dims;
        self
    }

    /// Reset to `ty`, dropping any composite payload. Array dimensions and the
    /// source position are kept.
    pub fn set(&mut self, ty: TypeKind) {
        self.ty = ty;
        self.untyped = false;
        self.elems.clear();
        self.nominal = None;
    }

    pub fn set_map(&mut self, key: Meta, value: Meta) {
        self.set(TypeKind::Map);
        self.elems = vec![key, value];
    }

    pub fn set_struct(&mut self, nominal: Nominal, fields: Vec<Meta>) {
        self.set(TypeKind::Struct);
        self.elems = fields;
        self.nominal = Some(nominal);
    }

    pub fn set_tuple(&mut self, elems: Vec<Meta>) {
        self.set(TypeKind::Tuple);
        self.elems = elems;
    }

    pub fn set_object(&mut self, nominal: Option<Nominal>) {
        self.set(TypeKind::Object);
        self.nominal = nominal;
    }

    pub fn is_array(&self) -> bool {
        !self.dims.is_empty()
    }

    pub fn arr_dim(&self) -> usize {
        self.dims.len()
    }

    /// Every dimension has a known length.
    pub fn is_fixed(&self) -> bool {
        self.is_array() && self.dims.iter().all(Option::is_some)
    }

    pub fn is_tuple(&self) -> bool {
        self.ty == TypeKind::Tuple && !self.is_array()
    }

    pub fn is_struct(&self) -> bool {
        self.ty == TypeKind::Struct
    }

    pub fn is_map(&self) -> bool {
        self.ty == TypeKind::Map
    }

    pub fn is_object(&self) -> bool {
        self.ty == TypeKind::Object
    }

    pub fn is_string(&self) -> bool {
        self.ty == TypeKind::String && !self.is_array()
    }

    pub fn is_integer(&self) -> bool {
        self.ty.is_integer() && !self.is_array()
    }

    pub fn is_nullable(&self) -> bool {
        self.ty.is_nullable()
    }

    pub fn is_void(&self) -> bool {
        matches!(self.ty, TypeKind::Void | TypeKind::None)
    }

    /// Element type of an array, one dimension stripped.
    pub fn strip(&self) -> Meta {
        let mut elem = self.clone();
        if !elem.dims.is_empty() {
            elem.dims.remove(0);
        }
        elem
    }

    /// Byte offsets of the elements of a struct or tuple.
    pub fn offsets(&self) -> Vec<u32> {
        self.layout().map(|(offsets, _)| offsets).unwrap_or_default()
    }

    /// Element offsets and the end of the last element, or `None` once the
    /// layout no longer fits in a `u32`.
    fn layout(&self) -> Option<(Vec<u32>, u32)> {
        let mut offsets = Vec::with_capacity(self.elems.len());
        let mut end = 0u32;
        for elem in &self.elems {
            let at = checked_align_to(end, elem.align())?;
            offsets.push(at);
            end = at.checked_add(elem.checked_size()?)?;
        }
        Some((offsets, end))
    }

    pub fn align(&self) -> u32 {
        if self.is_array() && !self.is_fixed() {
            return ADDR_SIZE;
        }
        match self.ty {
            TypeKind::Struct | TypeKind::Tuple => {
                self.elems.first().map(Meta::align).unwrap_or(1)
            }
            ty => ty.size().max(1),
        }
    }

    /// Byte size, saturating at `u32::MAX`. The checker rejects any
    /// declaration for which `checked_size` is `None`.
    pub fn size(&self) -> u32 {
        self.checked_size().unwrap_or(u32::MAX)
    }

    pub fn checked_size(&self) -> Option<u32> {
        let elem = self.elem_size()?;
        if !self.is_array() {
            return Some(elem);
        }
        if !self.is_fixed() {
            return Some(ADDR_SIZE);
        }
        self.dims
            .iter()
            .flatten()
            .try_fold(elem, |acc, n| acc.checked_mul(*n))
    }

    fn elem_size(&self) -> Option<u32> {
        match self.ty {
            TypeKind::Struct | TypeKind::Tuple => {
                let (_, end) = self.layout()?;
                let align = self.elems.first().map(Meta::align).unwrap_or(1);
                checked_align_to(end, align)
            }
            ty => Some(ty.size()),
        }
    }

    /// Type of the local slot holding a value of this type. Anything that
    /// does not fit a scalar slot is held by address.
    pub fn slot_type(&self) -> TypeKind {
        if self.is_array() {
            return TypeKind::Uint32;
        }
        match self.ty {
            TypeKind::String
            | TypeKind::Struct
            | TypeKind::Map
            | TypeKind::Object
            | TypeKind::Tuple => TypeKind::Uint32,
            ty => ty,
        }
    }
}

impl fmt::Display for Meta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.ty, &self.nominal) {
            (TypeKind::Struct, Some(n)) => write!(f, "struct {}", n.name)?,
            (TypeKind::Map, _) if self.elems.len() == 2 => {
                write!(f, "map({}, {})", self.elems[0], self.elems[1])?
            }
            (TypeKind::Object, Some(n)) => write!(f, "{}", n.name)?,
            (ty, _) if self.untyped && ty.is_numeric() => write!(f, "number")?,
            (ty, _) => write!(f, "{}", ty.name())?,
        }
        for _ in &self.dims {
            write!(f, "[]")?;
        }
        Ok(())
    }
}
