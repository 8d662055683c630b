//! Layout planning of struct arrays.
//!
//! Members are packed in declaration order. Each member starts at an
//! offset aligned to the larger of the layout alignment and its own
//! type width. The element size is rounded up to the larger of the
//! layout alignment and the widest member type, so consecutive elements
//! keep every member aligned.
//!
//! Planning is available at runtime ([`create_layout`]) and in const
//! context ([`plan_offset_of`], [`plan_size`]). Both walk members with
//! the same placement step and always agree.
use crate::view_type::{ViewSet, ViewType};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Input description of one member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberSpec<'a> {
    pub name: &'a str,
    pub ty: ViewType,
    /// Repeat count of the value. Zero is treated as one.
    pub components: usize,
}

impl<'a> MemberSpec<'a> {
    #[inline]
    pub const fn new(name: &'a str, ty: ViewType) -> Self {
        MemberSpec {
            name,
            ty,
            components: 1,
        }
    }

    #[inline]
    pub const fn with_components(mut self, components: usize) -> Self {
        self.components = components;
        self
    }
}

/// Member with computed offset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StructArrayMember {
    pub name: String,
    pub ty: ViewType,
    pub components: usize,
    pub offset: usize,
}

impl StructArrayMember {
    /// Returns number of bytes covered by this member.
    #[inline]
    pub fn extent(&self) -> usize {
        self.ty.size_of() * self.components
    }
}

/// Memory layout of one struct array element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StructArrayLayout {
    pub members: SmallVec<[StructArrayMember; 8]>,
    /// Bytes per element.
    pub size: usize,
    pub alignment: usize,
}

impl StructArrayLayout {
    /// Find member by name.
    #[inline]
    pub fn member(&self, name: &str) -> Option<&StructArrayMember> {
        self.members.iter().find(|m| m.name == name)
    }

    /// Returns distinct member types in order of first appearance.
    #[inline]
    pub fn view_types(&self) -> SmallVec<[ViewType; 8]> {
        let mut res: SmallVec<[ViewType; 8]> = SmallVec::new();
        for m in &self.members {
            if !res.contains(&m.ty) {
                res.push(m.ty);
            }
        }
        res
    }

    /// Returns the set of typed views required by this layout.
    #[inline]
    pub fn view_set(&self) -> ViewSet {
        self.members
            .iter()
            .fold(ViewSet::empty(), |vs, m| vs | m.ty.view_flag())
    }
}

/// Round offset up to multiple of size.
#[inline]
pub const fn align(offset: usize, size: usize) -> usize {
    offset.div_ceil(size) * size
}

#[inline]
const fn effective_alignment(alignment: usize) -> usize {
    if alignment == 0 {
        1
    } else {
        alignment
    }
}

#[inline]
const fn effective_components(components: usize) -> usize {
    if components == 0 {
        1
    } else {
        components
    }
}

#[inline]
const fn max(a: usize, b: usize) -> usize {
    if a > b {
        a
    } else {
        b
    }
}

/// Place one member at given offset.
/// Returns offset of the member and end of its extent.
#[inline]
const fn place(offset: usize, ty: ViewType, components: usize, alignment: usize) -> (usize, usize) {
    let type_size = ty.size_of();
    let member_offset = align(offset, max(alignment, type_size));
    (
        member_offset,
        member_offset + type_size * effective_components(components),
    )
}

/// Given a list of members, create a full layout, in particular
/// calculating the correct byte offset of each member.
///
/// An alignment of zero is treated as one.
pub fn create_layout(members: &[MemberSpec<'_>], alignment: usize) -> StructArrayLayout {
    let alignment = effective_alignment(alignment);
    let mut offset = 0;
    let mut max_size = 0;
    let members = members
        .iter()
        .map(|m| {
            let (member_offset, end) = place(offset, m.ty, m.components, alignment);
            offset = end;
            max_size = max_size.max(m.ty.size_of());
            StructArrayMember {
                name: m.name.to_string(),
                ty: m.ty,
                components: effective_components(m.components),
                offset: member_offset,
            }
        })
        .collect();
    let size = align(offset, max(max_size, alignment));
    StructArrayLayout {
        members,
        size,
        alignment,
    }
}

/// Compute element size in const context.
pub const fn plan_size(members: &[MemberSpec<'_>], alignment: usize) -> usize {
    let alignment = effective_alignment(alignment);
    let mut offset = 0;
    let mut max_size = 0;
    let mut i = 0;
    while i < members.len() {
        let m = &members[i];
        offset = place(offset, m.ty, m.components, alignment).1;
        max_size = max(max_size, m.ty.size_of());
        i += 1;
    }
    align(offset, max(max_size, alignment))
}

/// Compute offset of named member in const context.
///
/// Panics if no member has the given name, which fails the
/// compilation when evaluated in a constant.
pub const fn plan_offset_of(members: &[MemberSpec<'_>], alignment: usize, name: &str) -> usize {
    let alignment = effective_alignment(alignment);
    let mut offset = 0;
    let mut i = 0;
    while i < members.len() {
        let m = &members[i];
        let (member_offset, end) = place(offset, m.ty, m.components, alignment);
        if str_eq(m.name, name) {
            return member_offset;
        }
        offset = end;
        i += 1;
    }
    panic!("member not found in layout")
}

/// Collect distinct member types in const context.
#[inline]
pub const fn plan_view_set(members: &[MemberSpec<'_>]) -> ViewSet {
    let mut bits = 0u8;
    let mut i = 0;
    while i < members.len() {
        bits |= members[i].ty.view_flag().bits();
        i += 1;
    }
    ViewSet::from_bits_truncate(bits)
}

/// Check in const context that members can be addressed through
/// typed views.
///
/// Every member offset and the element size must be multiples of the
/// member width, otherwise the N-byte view would index elements at a
/// wrong stride. This fails for alignments that are not powers of two,
/// e.g. 6 with a 4-byte member. Members must have at least one
/// component, and `views` must cover all member types.
///
/// Panics on violation, which fails the compilation when evaluated
/// in a constant.
pub const fn assert_shape(members: &[MemberSpec<'_>], alignment: usize, views: ViewSet) {
    let size = plan_size(members, alignment);
    let alignment = effective_alignment(alignment);
    let mut offset = 0;
    let mut i = 0;
    while i < members.len() {
        let m = &members[i];
        let width = m.ty.size_of();
        if m.components == 0 {
            panic!("struct array member must have at least one component");
        }
        let (member_offset, end) = place(offset, m.ty, m.components, alignment);
        if member_offset % width != 0 || size % width != 0 {
            panic!("struct array alignment leaves member unaligned to its width");
        }
        offset = end;
        i += 1;
    }
    let required = plan_view_set(members).bits();
    if views.bits() & required != required {
        panic!("struct array views do not cover all member types");
    }
}

const fn str_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    let mut i = 0;
    while i < a.len() {
        if a[i] != b[i] {
            return false;
        }
        i += 1;
    }
    true
}
