//! Shader types and constant values
//!
//! Types come fully resolved from semantic analysis. Expressions that name
//! memory have `Reference` types; the lowering turns those into IR
//! `Pointer`s and inserts loads where the expression is flagged as loaded.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressSpace {
    Function,
    Private,
    Workgroup,
    Uniform,
    Storage,
    Handle,
}

impl fmt::Display for AddressSpace {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            AddressSpace::Function => "function",
            AddressSpace::Private => "private",
            AddressSpace::Workgroup => "workgroup",
            AddressSpace::Uniform => "uniform",
            AddressSpace::Storage => "storage",
            AddressSpace::Handle => "handle",
        };
        write!(f, "{name}")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    Read,
    Write,
    ReadWrite,
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Access::Read => "read",
            Access::Write => "write",
            Access::ReadWrite => "read_write",
        };
        write!(f, "{name}")
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StructMember {
    pub name: String,
    pub ty: Type,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Type {
    Void,
    Bool,
    I32,
    U32,
    F32,
    F16,
    AbstractInt,
    AbstractFloat,
    Vector {
        element: Box<Type>,
        width: u32,
    },
    Matrix {
        element: Box<Type>,
        columns: u32,
        rows: u32,
    },
    Array {
        element: Box<Type>,
        /// `None` for runtime-sized arrays
        count: Option<u32>,
    },
    Struct {
        name: String,
        members: Vec<StructMember>,
    },
    Pointer {
        space: AddressSpace,
        store: Box<Type>,
        access: Access,
    },
    /// Memory view produced by naming a variable or accessing into one
    Reference {
        space: AddressSpace,
        store: Box<Type>,
        access: Access,
    },
}

impl Type {
    pub fn vec(element: Type, width: u32) -> Self {
        Type::Vector {
            element: Box::new(element),
            width,
        }
    }

    pub fn ptr(space: AddressSpace, store: Type, access: Access) -> Self {
        Type::Pointer {
            space,
            store: Box::new(store),
            access,
        }
    }

    pub fn reference(space: AddressSpace, store: Type, access: Access) -> Self {
        Type::Reference {
            space,
            store: Box::new(store),
            access,
        }
    }

    /// Strip one level of reference, leaving every other type untouched
    pub fn unwrap_ref(&self) -> &Type {
        match self {
            Type::Reference { store, .. } => store,
            other => other,
        }
    }

    /// Pointer or reference parts: address space, store type and access mode
    pub fn memory_view(&self) -> Option<(AddressSpace, &Type, Access)> {
        match self {
            Type::Pointer {
                space,
                store,
                access,
            }
            | Type::Reference {
                space,
                store,
                access,
            } => Some((*space, store, *access)),
            _ => None,
        }
    }

    /// The IR pointer type for a value of reference type
    pub fn reference_to_pointer(&self) -> Option<Type> {
        match self {
            Type::Reference {
                space,
                store,
                access,
            } => Some(Type::ptr(*space, (**store).clone(), *access)),
            _ => None,
        }
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, Type::Pointer { .. })
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, Type::Reference { .. })
    }

    pub fn is_vector(&self) -> bool {
        matches!(self, Type::Vector { .. })
    }

    pub fn is_signed_integer_scalar(&self) -> bool {
        matches!(self, Type::I32 | Type::AbstractInt)
    }

    /// Element type of a vector or array
    pub fn element(&self) -> Option<&Type> {
        match self {
            Type::Vector { element, .. } | Type::Array { element, .. } => Some(element),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Bool => write!(f, "bool"),
            Type::I32 => write!(f, "i32"),
            Type::U32 => write!(f, "u32"),
            Type::F32 => write!(f, "f32"),
            Type::F16 => write!(f, "f16"),
            Type::AbstractInt => write!(f, "abstract-int"),
            Type::AbstractFloat => write!(f, "abstract-float"),
            Type::Vector { element, width } => write!(f, "vec{width}<{element}>"),
            Type::Matrix {
                element,
                columns,
                rows,
            } => write!(f, "mat{columns}x{rows}<{element}>"),
            Type::Array {
                element,
                count: Some(n),
            } => write!(f, "array<{element}, {n}>"),
            Type::Array {
                element,
                count: None,
            } => write!(f, "array<{element}>"),
            Type::Struct { name, .. } => write!(f, "{name}"),
            Type::Pointer {
                space,
                store,
                access,
            } => write!(f, "ptr<{space}, {store}, {access}>"),
            Type::Reference {
                space,
                store,
                access,
            } => write!(f, "ref<{space}, {store}, {access}>"),
        }
    }
}

/// A value known at shader-creation time
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstValue {
    Bool(bool),
    I32(i32),
    U32(u32),
    F32(f32),
    F16(f32),
    AbstractInt(i64),
    AbstractFloat(f64),
    /// Every element equal
    Splat {
        ty: Type,
        element: Box<ConstValue>,
    },
    Composite {
        ty: Type,
        elements: Vec<ConstValue>,
    },
}

impl ConstValue {
    pub fn ty(&self) -> Type {
        match self {
            ConstValue::Bool(_) => Type::Bool,
            ConstValue::I32(_) => Type::I32,
            ConstValue::U32(_) => Type::U32,
            ConstValue::F32(_) => Type::F32,
            ConstValue::F16(_) => Type::F16,
            ConstValue::AbstractInt(_) => Type::AbstractInt,
            ConstValue::AbstractFloat(_) => Type::AbstractFloat,
            ConstValue::Splat { ty, .. } | ConstValue::Composite { ty, .. } => ty.clone(),
        }
    }
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConstValue::Bool(b) => write!(f, "{b}"),
            ConstValue::I32(n) => write!(f, "{n}i"),
            ConstValue::U32(n) => write!(f, "{n}u"),
            ConstValue::F32(x) => write!(f, "{x:?}f"),
            ConstValue::F16(x) => write!(f, "{x:?}h"),
            ConstValue::AbstractInt(n) => write!(f, "{n}"),
            ConstValue::AbstractFloat(x) => write!(f, "{x:?}"),
            ConstValue::Splat { ty, element } => write!(f, "{ty}({element})"),
            ConstValue::Composite { ty, elements } => {
                let parts = elements
                    .iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{ty}({parts})")
            }
        }
    }
}
