#![forbid(unsafe_code)]

use ascl_ast::{Meta, SysFnKind, TypeKind};

pub const SYSLIB_MODULE: &str = "system";

/// Signature of a function provided by the runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SysFn {
    pub kind: SysFnKind,
    pub name: &'static str,
    pub qname: &'static str,
    pub params: &'static [TypeKind],
    pub result: TypeKind,
}

impl SysFn {
    pub fn param_metas(&self) -> Vec<Meta> {
        self.params.iter().map(|ty| Meta::new(*ty)).collect()
    }

    pub fn result_meta(&self) -> Meta {
        Meta::new(self.result)
    }
}

const SYS_FNS: &[SysFn] = &[
    SysFn {
        kind: SysFnKind::Abs32,
        name: "abs32",
        qname: "system.abs32",
        params: &[TypeKind::Int32],
        result: TypeKind::Int32,
    },
    SysFn {
        kind: SysFnKind::Abs64,
        name: "abs64",
        qname: "system.abs64",
        params: &[TypeKind::Int64],
        result: TypeKind::Int64,
    },
    SysFn {
        kind: SysFnKind::Pow32,
        name: "pow32",
        qname: "system.pow32",
        params: &[TypeKind::Int32, TypeKind::Int32],
        result: TypeKind::Int32,
    },
    SysFn {
        kind: SysFnKind::Pow64,
        name: "pow64",
        qname: "system.pow64",
        params: &[TypeKind::Int64, TypeKind::Int32],
        result: TypeKind::Int64,
    },
    SysFn {
        kind: SysFnKind::Sign32,
        name: "sign32",
        qname: "system.sign32",
        params: &[TypeKind::Int32],
        result: TypeKind::Int8,
    },
    SysFn {
        kind: SysFnKind::Sign64,
        name: "sign64",
        qname: "system.sign64",
        params: &[TypeKind::Int64],
        result: TypeKind::Int8,
    },
    SysFn {
        kind: SysFnKind::Lower,
        name: "lower",
        qname: "system.lower",
        params: &[TypeKind::String],
        result: TypeKind::String,
    },
    SysFn {
        kind: SysFnKind::Upper,
        name: "upper",
        qname: "system.upper",
        params: &[TypeKind::String],
        result: TypeKind::String,
    },
];

pub fn sys_fns() -> &'static [SysFn] {
    SYS_FNS
}

pub fn lookup(name: &str) -> Option<&'static SysFn> {
    SYS_FNS.iter().find(|f| f.name == name)
}

pub fn sys_fn(kind: SysFnKind) -> Option<&'static SysFn> {
    SYS_FNS.iter().find(|f| f.kind == kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_has_an_entry() {
        let kinds = [
            SysFnKind::Abs32,
            SysFnKind::Abs64,
            SysFnKind::Pow32,
            SysFnKind::Pow64,
            SysFnKind::Sign32,
            SysFnKind::Sign64,
            SysFnKind::Lower,
            SysFnKind::Upper,
        ];
        for kind in kinds {
            let f = sys_fn(kind).expect("registered");
            assert_eq!(f.kind, kind);
            assert_eq!(f.qname, format!("{SYSLIB_MODULE}.{}", f.name));
        }
    }

    #[test]
    fn lookup_by_source_name() {
        let pow = lookup("pow64").expect("pow64");
        assert_eq!(pow.params, &[TypeKind::Int64, TypeKind::Int32]);
        assert_eq!(pow.result, TypeKind::Int64);
        assert!(lookup("abs128").is_none());
    }
}
