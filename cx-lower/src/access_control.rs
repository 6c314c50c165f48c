//! Access control & constraints (§4.7).
//!
//! Public is always allowed. Friends are consulted against the member-owner
//! struct. Private is allowed from the same class (template `$hash` suffix
//! stripped before comparison) and lexically nested classes. Protected
//! additionally allows classes reached via public/protected inheritance.

use cx_ir::{Access, StringHandle, StringInterner, TypeIndex, TypeRegistry};

/// Strips a template instantiation's `$<hash>` suffix so a private-access
/// check on `Box$a1b2::helper` compares against the pattern name `Box`.
pub fn strip_instantiation_hash(name: &str) -> &str {
    match name.find('$') {
        Some(idx) => &name[..idx],
        None => name,
    }
}

fn is_lexically_nested(types: &TypeRegistry, inner: TypeIndex, outer: TypeIndex) -> bool {
    let mut current = inner;
    loop {
        let Some(record) = types.struct_record(current) else { return false };
        match record.enclosing_class {
            Some(enclosing) if enclosing == outer => return true,
            Some(enclosing) => current = enclosing,
            None => return false,
        }
    }
}

fn is_friend(
    types: &TypeRegistry,
    interner: &StringInterner,
    owner: TypeIndex,
    accessing_struct: Option<TypeIndex>,
    accessing_function: Option<&str>,
) -> bool {
    let Some(record) = types.struct_record(owner) else { return false };
    if record.friends.is_empty() {
        return false;
    }
    let accessor_names: Vec<String> = [
        accessing_struct
            .and_then(|t| types.get(t))
            .and_then(|t| interner.resolve(t.name))
            .map(|s| s.to_string()),
        accessing_function.map(|s| s.to_string()),
    ]
    .into_iter()
    .flatten()
    .collect();
    record.friends.iter().any(|&friend: &StringHandle| {
        let Some(friend_name) = interner.resolve(friend) else { return false };
        accessor_names
            .iter()
            .any(|n| strip_instantiation_hash(n) == strip_instantiation_hash(&friend_name))
    })
}

/// Returns `Ok(())` when `accessing_struct` (plus, for friend functions,
/// `accessing_function`'s qualified name) may reach a member with
/// `member_access` declared on `owner`.
pub fn check_access(
    types: &TypeRegistry,
    interner: &StringInterner,
    owner: TypeIndex,
    member_access: Access,
    accessing_struct: Option<TypeIndex>,
    accessing_function: Option<&str>,
) -> bool {
    if member_access == Access::Public {
        return true;
    }

    if is_friend(types, interner, owner, accessing_struct, accessing_function) {
        return true;
    }

    let Some(accessor) = accessing_struct else { return false };

    let same_class = same_class_ignoring_instantiation(types, interner, accessor, owner);
    if same_class {
        return true;
    }

    if is_lexically_nested(types, accessor, owner) || is_lexically_nested(types, owner, accessor) {
        return true;
    }

    if member_access == Access::Protected {
        return types.derives_from(accessor, owner);
    }

    false
}

fn same_class_ignoring_instantiation(
    types: &TypeRegistry,
    interner: &StringInterner,
    a: TypeIndex,
    b: TypeIndex,
) -> bool {
    if a == b {
        return true;
    }
    let (Some(a_info), Some(b_info)) = (types.get(a), types.get(b)) else { return false };
    let (Some(a_resolved), Some(b_resolved)) =
        (interner.resolve(a_info.name), interner.resolve(b_info.name))
    else {
        return false;
    };
    strip_instantiation_hash(&a_resolved) == strip_instantiation_hash(&b_resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cx_ir::{BaseClassInfo, StructRecord, TypeKind};

    fn make_registry() -> (TypeRegistry, StringInterner, TypeIndex, TypeIndex) {
        let mut types = TypeRegistry::new();
        let interner = StringInterner::new();
        let base_name = interner.intern("Base");
        let derived_name = interner.intern("Derived");
        let base_idx = types.register(base_name, TypeKind::Struct(StructRecord {
            name: base_name,
            ..Default::default()
        }));
        let derived_idx = types.register(derived_name, TypeKind::Struct(StructRecord {
            name: derived_name,
            bases: vec![BaseClassInfo {
                ty: base_idx,
                access: Access::Public,
                is_virtual: false,
                subobject_offset: 0,
            }],
            ..Default::default()
        }));
        (types, interner, base_idx, derived_idx)
    }

    #[test]
    fn public_always_allowed() {
        let (types, interner, base, _) = make_registry();
        assert!(check_access(&types, &interner, base, Access::Public, None, None));
    }

    #[test]
    fn private_denied_outside_class() {
        let (types, interner, base, derived) = make_registry();
        assert!(!check_access(&types, &interner, base, Access::Private, Some(derived), None));
    }

    #[test]
    fn protected_allowed_via_public_inheritance() {
        let (types, interner, base, derived) = make_registry();
        assert!(check_access(&types, &interner, base, Access::Protected, Some(derived), None));
    }

    #[test]
    fn instantiation_hash_stripped_for_same_class_check() {
        assert_eq!(strip_instantiation_hash("Box$a1b2"), "Box");
        assert_eq!(strip_instantiation_hash("Box"), "Box");
    }
}
