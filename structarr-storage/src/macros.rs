/// Define a concrete struct array type for one element shape.
///
/// ```
/// use structarr_storage::struct_array;
///
/// struct_array! {
///     /// Line vertex: position pair and packed extrusion data.
///     pub struct LineVertexArray(align = 4) {
///         a_pos: i16[2],
///         a_data: u8[4],
///         a_linesofar: f32,
///     }
///     element LineVertex, LineVertexMut;
/// }
///
/// let mut arr = LineVertexArray::new().unwrap();
/// arr.emplace_back([1, 2], [3, 4, 5, 6], 0.5).unwrap();
/// assert_eq!(12, arr.bytes_per_element());
/// assert_eq!([1, 2], arr.get(0).unwrap().a_pos());
/// ```
///
/// Each member is a native numeric type, optionally followed by a
/// component count. The generated type wraps a
/// [`StructArray`](crate::StructArray), dereferences to it, and adds
/// `emplace_back`/`emplace` taking one argument per member in order.
/// The optional `element` clause names a read accessor and a write
/// accessor returned by `get` and `get_mut`.
///
/// The alignment must keep every member at a multiple of its width in
/// every element, so alignments that are not powers of two are
/// rejected when a wider member is present:
///
/// ```compile_fail
/// use structarr_storage::struct_array;
///
/// struct_array! {
///     // 6-byte stride, the second i32 would straddle two view slots.
///     pub struct OddAlignArray(align = 6) {
///         a: i32,
///     }
/// }
/// ```
///
/// A member must have at least one component:
///
/// ```compile_fail
/// use structarr_storage::struct_array;
///
/// struct_array! {
///     pub struct NoComponentArray(align = 4) {
///         a: i16[0],
///     }
/// }
/// ```
#[macro_export]
macro_rules! struct_array {
    (@array [$(#[$attr:meta])*] $vis:vis $arr:ident $align:literal {
        $($m:ident : $ty:ident $([$n:literal])?),* $(,)?
    }) => {
        $(#[$attr])*
        $vis struct $arr($crate::StructArray<$arr>);

        impl $crate::StructArrayShape for $arr {
            const MEMBERS: &'static [$crate::layout::MemberSpec<'static>] = &[$(
                $crate::layout::MemberSpec::new(
                    stringify!($m),
                    <$ty as $crate::ViewScalar>::VIEW_TYPE,
                )$(.with_components($n))?
            ),*];
            const ALIGNMENT: usize = $align;
            const VIEWS: $crate::ViewSet = $crate::layout::plan_view_set(Self::MEMBERS);
        }

        const _: () = <$arr as $crate::StructArrayShape>::LAYOUT_CHECK;

        #[allow(clippy::new_without_default, clippy::too_many_arguments)]
        impl $arr {
            #[inline]
            pub fn new() -> $crate::Result<Self> {
                $crate::StructArray::new().map($arr)
            }

            /// Reconstruct array from serialized form without copy.
            #[inline]
            pub fn deserialize(input: $crate::SerializedStructArray) -> $crate::Result<Self> {
                $crate::StructArray::deserialize(input).map($arr)
            }

            /// Consume the array and transfer its buffer.
            #[inline]
            pub fn into_serialized(self) -> $crate::Result<$crate::SerializedStructArray> {
                self.0.into_serialized()
            }

            #[inline]
            pub fn into_inner(self) -> $crate::StructArray<$arr> {
                self.0
            }

            /// Append one element and returns its index.
            #[inline]
            pub fn emplace_back(
                &mut self,
                $($m: $crate::struct_array!(@param $ty $([$n])?)),*
            ) -> $crate::Result<usize> {
                let i = self.0.len();
                self.0.resize(i + 1)?;
                self.emplace(i, $($m),*)
            }

            /// Overwrite element at given index and returns the index.
            #[inline]
            pub fn emplace(
                &mut self,
                i: usize,
                $($m: $crate::struct_array!(@param $ty $([$n])?)),*
            ) -> $crate::Result<usize> {
                let elem = self.0.element(i)?;
                $(
                    $crate::struct_array!(@write self.0, elem, $arr, $m, $ty $([$n])?);
                )*
                Ok(i)
            }
        }

        impl ::std::ops::Deref for $arr {
            type Target = $crate::StructArray<$arr>;

            #[inline]
            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl ::std::ops::DerefMut for $arr {
            #[inline]
            fn deref_mut(&mut self) -> &mut Self::Target {
                &mut self.0
            }
        }
    };
    (@element $vis:vis $arr:ident $elem:ident $elem_mut:ident {
        $($m:ident : $ty:ident $([$n:literal])?),* $(,)?
    }) => {
        /// Read accessor of one element.
        #[derive(Clone, Copy)]
        $vis struct $elem<'a> {
            array: &'a $crate::StructArray<$arr>,
            view: $crate::ElementView,
        }

        /// Write accessor of one element.
        $vis struct $elem_mut<'a> {
            array: &'a mut $crate::StructArray<$arr>,
            view: $crate::ElementView,
        }

        impl $arr {
            /// Returns element at given index.
            #[inline]
            pub fn get(&self, i: usize) -> Option<$elem<'_>> {
                let view = self.0.element(i).ok()?;
                Some($elem {
                    array: &self.0,
                    view,
                })
            }

            /// Returns mutable element at given index.
            #[inline]
            pub fn get_mut(&mut self, i: usize) -> Option<$elem_mut<'_>> {
                let view = self.0.element(i).ok()?;
                Some($elem_mut {
                    array: &mut self.0,
                    view,
                })
            }
        }

        impl<'a> $elem<'a> {
            #[inline]
            pub fn index(&self) -> usize {
                self.view.index()
            }

            $(
                #[inline]
                pub fn $m(&self) -> $crate::struct_array!(@param $ty $([$n])?) {
                    $crate::struct_array!(@read self.array, self.view, $arr, $m, $ty $([$n])?)
                }
            )*
        }

        impl<'a> $elem_mut<'a> {
            #[inline]
            pub fn index(&self) -> usize {
                self.view.index()
            }

            $(
                #[inline]
                pub fn $m(&mut self) -> $crate::struct_array!(@param_mut $ty $([$n])?) {
                    $crate::struct_array!(@read_mut self.array, self.view, $arr, $m, $ty $([$n])?)
                }
            )*
        }
    };
    (@param $ty:ident) => { $ty };
    (@param $ty:ident [$n:literal]) => { [$ty; $n] };
    (@param_mut $ty:ident) => { &mut $ty };
    (@param_mut $ty:ident [$n:literal]) => { &mut [$ty] };
    (@offset $arr:ident, $m:ident) => {
        $crate::layout::plan_offset_of(
            <$arr as $crate::StructArrayShape>::MEMBERS,
            <$arr as $crate::StructArrayShape>::ALIGNMENT,
            stringify!($m),
        )
    };
    (@write $array:expr, $view:ident, $arr:ident, $m:ident, $ty:ident) => {{
        const OFFSET: usize = $crate::struct_array!(@offset $arr, $m);
        let slot = $view.slot::<$ty>(OFFSET);
        $array.view_mut::<$ty>()[slot] = $m;
    }};
    (@write $array:expr, $view:ident, $arr:ident, $m:ident, $ty:ident [$n:literal]) => {{
        const OFFSET: usize = $crate::struct_array!(@offset $arr, $m);
        let slot = $view.slot::<$ty>(OFFSET);
        $array.view_mut::<$ty>()[slot..slot + $n].copy_from_slice(&$m);
    }};
    (@read $array:expr, $view:expr, $arr:ident, $m:ident, $ty:ident) => {{
        const OFFSET: usize = $crate::struct_array!(@offset $arr, $m);
        $array.view::<$ty>()[$view.slot::<$ty>(OFFSET)]
    }};
    (@read $array:expr, $view:expr, $arr:ident, $m:ident, $ty:ident [$n:literal]) => {{
        const OFFSET: usize = $crate::struct_array!(@offset $arr, $m);
        let slot = $view.slot::<$ty>(OFFSET);
        let mut res = [<$ty>::default(); $n];
        res.copy_from_slice(&$array.view::<$ty>()[slot..slot + $n]);
        res
    }};
    (@read_mut $array:expr, $view:expr, $arr:ident, $m:ident, $ty:ident) => {{
        const OFFSET: usize = $crate::struct_array!(@offset $arr, $m);
        let slot = $view.slot::<$ty>(OFFSET);
        &mut $array.view_mut::<$ty>()[slot]
    }};
    (@read_mut $array:expr, $view:expr, $arr:ident, $m:ident, $ty:ident [$n:literal]) => {{
        const OFFSET: usize = $crate::struct_array!(@offset $arr, $m);
        let slot = $view.slot::<$ty>(OFFSET);
        &mut $array.view_mut::<$ty>()[slot..slot + $n]
    }};
    (
        $(#[$attr:meta])*
        $vis:vis struct $arr:ident (align = $align:literal) $members:tt
        $(element $elem:ident, $elem_mut:ident;)?
    ) => {
        $crate::struct_array!(@array [$(#[$attr])*] $vis $arr $align $members);
        $(
            $crate::struct_array!(@element $vis $arr $elem $elem_mut $members);
        )?
    };
}
