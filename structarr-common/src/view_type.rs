use bitflags::bitflags;
use bytemuck::Pod;
use serde::{Deserialize, Serialize};
use std::fmt;

/// ViewType is the numeric kind of one struct member.
/// Each kind has a fixed byte width and is backed by
/// one typed view over the raw buffer of a struct array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ViewType {
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Float32,
}

impl ViewType {
    /// All recognized view types.
    pub const ALL: [ViewType; 7] = [
        ViewType::Int8,
        ViewType::Uint8,
        ViewType::Int16,
        ViewType::Uint16,
        ViewType::Int32,
        ViewType::Uint32,
        ViewType::Float32,
    ];

    /// Returns byte width of this view type.
    #[inline]
    pub const fn size_of(self) -> usize {
        match self {
            ViewType::Int8 | ViewType::Uint8 => 1,
            ViewType::Int16 | ViewType::Uint16 => 2,
            ViewType::Int32 | ViewType::Uint32 | ViewType::Float32 => 4,
        }
    }

    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            ViewType::Int8 => "Int8",
            ViewType::Uint8 => "Uint8",
            ViewType::Int16 => "Int16",
            ViewType::Uint16 => "Uint16",
            ViewType::Int32 => "Int32",
            ViewType::Uint32 => "Uint32",
            ViewType::Float32 => "Float32",
        }
    }

    /// Parse view type from its name, e.g. "Float32".
    #[inline]
    pub fn from_name(name: &str) -> Option<Self> {
        ViewType::ALL.into_iter().find(|vt| vt.name() == name)
    }

    /// Returns the flag of this view type in a view set.
    #[inline]
    pub const fn view_flag(self) -> ViewSet {
        match self {
            ViewType::Int8 => ViewSet::INT8,
            ViewType::Uint8 => ViewSet::UINT8,
            ViewType::Int16 => ViewSet::INT16,
            ViewType::Uint16 => ViewSet::UINT16,
            ViewType::Int32 => ViewSet::INT32,
            ViewType::Uint32 => ViewSet::UINT32,
            ViewType::Float32 => ViewSet::FLOAT32,
        }
    }
}

impl fmt::Display for ViewType {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

bitflags! {
    /// ViewSet marks which typed views a struct array keeps
    /// over its buffer. One flag per distinct member type.
    pub struct ViewSet: u8 {
        const INT8 = 0x01;
        const UINT8 = 0x02;
        const INT16 = 0x04;
        const UINT16 = 0x08;
        const INT32 = 0x10;
        const UINT32 = 0x20;
        const FLOAT32 = 0x40;
    }
}

impl ViewSet {
    /// Collect view set of given view types.
    #[inline]
    pub const fn of(tys: &[ViewType]) -> ViewSet {
        let mut bits = 0u8;
        let mut i = 0;
        while i < tys.len() {
            bits |= tys[i].view_flag().bits();
            i += 1;
        }
        // all bits come from defined flags.
        ViewSet::from_bits_truncate(bits)
    }

    /// Returns whether the view of given type is included.
    #[inline]
    pub fn has(&self, ty: ViewType) -> bool {
        self.contains(ty.view_flag())
    }
}

/// ViewScalar binds a native numeric type to its view type.
/// Only the primitive types listed in [`ViewType`] implement it.
pub trait ViewScalar: Pod + Default + PartialEq + fmt::Debug + Send + Sync {
    const VIEW_TYPE: ViewType;
}

macro_rules! impl_view_scalar {
    ($ty:ty, $vt:ident) => {
        impl ViewScalar for $ty {
            const VIEW_TYPE: ViewType = ViewType::$vt;
        }

        const _: () = assert!(
            std::mem::size_of::<$ty>() == ViewType::$vt.size_of(),
            "width of view type must match native type"
        );
    };
}

impl_view_scalar!(i8, Int8);
impl_view_scalar!(u8, Uint8);
impl_view_scalar!(i16, Int16);
impl_view_scalar!(u16, Uint16);
impl_view_scalar!(i32, Int32);
impl_view_scalar!(u32, Uint32);
impl_view_scalar!(f32, Float32);
