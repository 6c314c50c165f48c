//! `CompilerContext` — the explicit, owned replacement for the teacher
//! design's process-wide `gTypeInfo`/`gTypesByName`/`gTemplateRegistry`
//! globals (§9). One instance is threaded by `&mut` through the whole
//! lowering pass for a translation unit; nothing here is a static.

use crate::abi::TargetAbi;
use cx_ast::{DeclTable, TemplateRegistry};
use cx_ir::{StringInterner, TypeRegistry};

#[derive(Debug, Clone, Copy, Default)]
pub struct CompileFlags {
    pub access_control_disabled: bool, // test hook, mirrors isAccessControlDisabled()
    pub verbose: bool,
}

pub struct CompilerContext {
    pub types: TypeRegistry,
    pub interner: StringInterner,
    pub templates: TemplateRegistry,
    pub decls: DeclTable,
    pub abi: TargetAbi,
    pub flags: CompileFlags,
}

impl CompilerContext {
    pub fn new(abi: TargetAbi) -> Self {
        Self {
            types: TypeRegistry::new(),
            interner: StringInterner::new(),
            templates: TemplateRegistry::new(),
            decls: DeclTable::new(),
            abi,
            flags: CompileFlags::default(),
        }
    }

    pub fn with_flags(abi: TargetAbi, flags: CompileFlags) -> Self {
        Self { flags, ..Self::new(abi) }
    }
}
