//! Type registry: a globally addressable vector of `TypeInfo` records plus a
//! by-name index, modeled as an explicit context field rather than process
//! globals (§3 Type Registry, §9 "Global registries → explicit context").

use crate::interner::StringHandle;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeIndex(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FunctionIndex(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Access {
    Public,
    Protected,
    Private,
}

#[derive(Debug, Clone)]
pub enum TypeKind {
    Primitive { size_in_bits: u32, is_float: bool, is_signed: bool },
    Enum { underlying: TypeIndex, enumerators: Vec<(StringHandle, i64)> },
    Struct(StructRecord),
    Union(StructRecord),
    FunctionPointer { params: Vec<TypeIndex>, ret: TypeIndex },
}

#[derive(Debug, Clone)]
pub struct MemberInfo {
    pub name: StringHandle,
    pub ty: TypeIndex,
    pub byte_offset: u32,
    pub size_in_bits: u32,
    pub access: Access,
    pub bitfield_width: Option<u16>,
    pub bitfield_bit_offset: u32,
    pub is_reference: bool,
}

#[derive(Debug, Clone)]
pub struct MethodInfo {
    pub name: StringHandle,
    pub mangled_name: StringHandle,
    pub access: Access,
    pub is_virtual: bool,
    pub is_override: bool,
    pub is_final: bool,
    pub vtable_index: Option<u32>,
    pub is_constructor: bool,
    pub is_destructor: bool,
    pub is_static: bool,
}

#[derive(Debug, Clone)]
pub struct BaseClassInfo {
    pub ty: TypeIndex,
    pub access: Access,
    pub is_virtual: bool,
    pub subobject_offset: u32,
}

/// Struct/class/union layout and member-function table (§3).
#[derive(Debug, Clone, Default)]
pub struct StructRecord {
    pub name: StringHandle,
    pub members: Vec<MemberInfo>,
    pub methods: Vec<MethodInfo>,
    pub bases: Vec<BaseClassInfo>,
    pub size_in_bytes: u32,
    pub align_in_bytes: u32,
    pub has_vtable: bool,
    pub is_abstract: bool,
    pub enclosing_class: Option<TypeIndex>,
    pub friends: Vec<StringHandle>,
}

impl StructRecord {
    pub fn find_member(&self, name: StringHandle) -> Option<&MemberInfo> {
        self.members.iter().find(|m| m.name == name)
    }

    pub fn find_method(&self, name: StringHandle) -> Option<&MethodInfo> {
        self.methods.iter().find(|m| m.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct TypeInfo {
    pub name: StringHandle,
    pub kind: TypeKind,
}

/// `gTypeInfo[TypeIndex]` plus `gTypesByName`, threaded explicitly through a
/// `CompilerContext` rather than kept as process-wide statics (§9).
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: Vec<TypeInfo>,
    by_name: HashMap<StringHandle, TypeIndex>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: StringHandle, kind: TypeKind) -> TypeIndex {
        let index = TypeIndex(self.types.len() as u32);
        self.types.push(TypeInfo { name, kind });
        self.by_name.insert(name, index);
        index
    }

    pub fn get(&self, index: TypeIndex) -> Option<&TypeInfo> {
        self.types.get(index.0 as usize)
    }

    pub fn get_mut(&mut self, index: TypeIndex) -> Option<&mut TypeInfo> {
        self.types.get_mut(index.0 as usize)
    }

    pub fn by_name(&self, name: StringHandle) -> Option<TypeIndex> {
        self.by_name.get(&name).copied()
    }

    pub fn struct_record(&self, index: TypeIndex) -> Option<&StructRecord> {
        match self.get(index).map(|t| &t.kind) {
            Some(TypeKind::Struct(r)) | Some(TypeKind::Union(r)) => Some(r),
            _ => None,
        }
    }

    pub fn struct_record_mut(&mut self, index: TypeIndex) -> Option<&mut StructRecord> {
        match self.get_mut(index).map(|t| &mut t.kind) {
            Some(TypeKind::Struct(r)) | Some(TypeKind::Union(r)) => Some(r),
            _ => None,
        }
    }

    pub fn is_valid(&self, index: TypeIndex) -> bool {
        (index.0 as usize) < self.types.len()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Walks `base`'s inheritance chain looking for `derived`, returning the
    /// cumulative subobject offset if found. Used by member-access lowering
    /// to account for base subobject offsets on inherited members.
    pub fn base_offset(&self, derived: TypeIndex, base: TypeIndex) -> Option<u32> {
        if derived == base {
            return Some(0);
        }
        let record = self.struct_record(derived)?;
        for b in &record.bases {
            if let Some(rest) = self.base_offset(b.ty, base) {
                return Some(b.subobject_offset + rest);
            }
        }
        None
    }

    /// Whether `candidate` is `base` or publicly/protectedly derives from it
    /// (ignores private inheritance, matching §4.7's protected-via-derived rule).
    pub fn derives_from(&self, candidate: TypeIndex, base: TypeIndex) -> bool {
        if candidate == base {
            return true;
        }
        let Some(record) = self.struct_record(candidate) else { return false };
        record.bases.iter().any(|b| b.access != Access::Private && self.derives_from(b.ty, base))
    }
}
