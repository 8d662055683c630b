use crate::element::ElementView;
use crate::error::{Error, Result};
use crate::transfer::SerializedStructArray;
use crate::{DEFAULT_CAPACITY, RESIZE_MULTIPLIER};
use std::fmt;
use std::marker::PhantomData;
use std::mem;
use structarr_common::layout::{
    assert_shape, create_layout, plan_size, plan_view_set, MemberSpec, StructArrayLayout,
};
use structarr_common::{RawBuffer, ViewScalar, ViewSet};

/// StructArrayShape describes the element of one concrete struct array.
///
/// Shapes are usually emitted by [`struct_array!`](crate::struct_array),
/// one type per layout. The view set has no default: a shape must
/// always declare which typed views its members are accessed through.
///
/// A shape whose members cannot be addressed through typed views fails
/// [`LAYOUT_CHECK`](Self::LAYOUT_CHECK), which is evaluated at compile
/// time when the array is created.
pub trait StructArrayShape {
    /// Members in declaration order.
    const MEMBERS: &'static [MemberSpec<'static>];

    const ALIGNMENT: usize;

    /// Typed views required by the members.
    const VIEWS: ViewSet;

    const BYTES_PER_ELEMENT: usize = plan_size(Self::MEMBERS, Self::ALIGNMENT);

    /// Panics in const evaluation if the shape is invalid.
    /// Must not be overridden.
    const LAYOUT_CHECK: () = assert_shape(Self::MEMBERS, Self::ALIGNMENT, Self::VIEWS);

    /// Returns full layout with member offsets.
    #[inline]
    fn layout() -> StructArrayLayout {
        create_layout(Self::MEMBERS, Self::ALIGNMENT)
    }
}

/// StructArray packs elements of a fixed shape into one contiguous
/// buffer, making it behave like an array of typed structs.
///
/// Length and capacity are counted in elements. The buffer always
/// holds exactly `capacity * S::BYTES_PER_ELEMENT` bytes. Members are
/// read and written through typed views over the buffer, each view
/// covering the whole capacity.
///
/// The buffer can be handed off whole via [`serialize`](Self::serialize)
/// with transfer, or [`into_serialized`](Self::into_serialized). After a
/// transfer the array rejects every mutation with [`Error::Transferred`].
pub struct StructArray<S> {
    capacity: usize,
    length: usize,
    buffer: RawBuffer,
    views: ViewSet,
    transferred: bool,
    _marker: PhantomData<fn() -> S>,
}

impl<S: StructArrayShape> StructArray<S> {
    /// Create an empty array with default capacity.
    #[inline]
    pub fn new() -> Result<Self> {
        #[allow(clippy::let_unit_value)]
        let () = S::LAYOUT_CHECK;
        let mut arr = StructArray {
            capacity: 0,
            length: 0,
            buffer: RawBuffer::empty(),
            views: ViewSet::empty(),
            transferred: false,
            _marker: PhantomData,
        };
        arr.grow(0)?;
        Ok(arr)
    }

    /// Reconstruct an array from serialized form.
    /// The buffer is taken over without copy.
    pub fn deserialize(input: SerializedStructArray) -> Result<Self> {
        #[allow(clippy::let_unit_value)]
        let () = S::LAYOUT_CHECK;
        let SerializedStructArray { length, buffer } = input;
        let capacity = match S::BYTES_PER_ELEMENT {
            0 if buffer.is_empty() => length,
            0 => return Err(Error::InvalidFormat),
            size if buffer.len() % size == 0 => buffer.len() / size,
            _ => return Err(Error::InvalidFormat),
        };
        if length > capacity {
            return Err(Error::InvalidFormat);
        }
        let mut arr = StructArray {
            capacity,
            length,
            buffer,
            views: ViewSet::empty(),
            transferred: false,
            _marker: PhantomData,
        };
        arr.refresh_views();
        Ok(arr)
    }

    /// Returns number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.length
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Returns number of allocated element slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn bytes_per_element(&self) -> usize {
        S::BYTES_PER_ELEMENT
    }

    /// Returns whether the buffer has been transferred.
    #[inline]
    pub fn is_transferred(&self) -> bool {
        self.transferred
    }

    /// Returns typed views currently available.
    #[inline]
    pub fn views(&self) -> ViewSet {
        self.views
    }

    /// Returns the underlying buffer.
    #[inline]
    pub fn buffer(&self) -> &RawBuffer {
        &self.buffer
    }

    /// Returns bytes of all elements.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        if self.transferred {
            return &[];
        }
        &self.buffer.as_slice()[..self.length * S::BYTES_PER_ELEMENT]
    }

    /// Returns typed view of the whole buffer.
    ///
    /// # Panics
    ///
    /// Panics if the shape has no member of type T, or the buffer
    /// has been transferred.
    #[inline]
    pub fn view<T: ViewScalar>(&self) -> &[T] {
        assert!(
            self.views.has(T::VIEW_TYPE),
            "struct array has no {} view",
            T::VIEW_TYPE
        );
        self.buffer.cast_slice()
    }

    /// Returns mutable typed view of the whole buffer.
    ///
    /// # Panics
    ///
    /// Same as [`view`](Self::view).
    #[inline]
    pub fn view_mut<T: ViewScalar>(&mut self) -> &mut [T] {
        assert!(
            self.views.has(T::VIEW_TYPE),
            "struct array has no {} view",
            T::VIEW_TYPE
        );
        self.buffer.cast_slice_mut()
    }

    /// Returns view of element at given index.
    #[inline]
    pub fn element(&self, idx: usize) -> Result<ElementView> {
        self.ensure_active()?;
        if idx >= self.length {
            return Err(Error::IndexOutOfBound(idx));
        }
        Ok(ElementView::new(idx, S::BYTES_PER_ELEMENT))
    }

    /// Resize the array.
    /// If `n` is greater than the current length then additional
    /// elements with unspecified values are added.
    /// If `n` is less than the current length then the array will
    /// be reduced to the first `n` elements.
    #[inline]
    pub fn resize(&mut self, n: usize) -> Result<()> {
        self.reserve(n)?;
        self.length = n;
        Ok(())
    }

    /// Indicate a planned increase in size, so that any necessary
    /// allocation may be done once, ahead of time.
    #[inline]
    pub fn reserve(&mut self, n: usize) -> Result<()> {
        self.ensure_active()?;
        if n <= self.capacity {
            return Ok(());
        }
        self.grow(n)
    }

    /// Resets the length of the array to 0 without de-allocating capacity.
    #[inline]
    pub fn clear(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.length = 0;
        Ok(())
    }

    /// Serialize the array to its length and buffer.
    ///
    /// Unused capacity is always discarded first. If `transfer` is set,
    /// the buffer is moved out without copy and this array can no longer
    /// be used. Otherwise the returned buffer is a copy.
    pub fn serialize(&mut self, transfer: bool) -> Result<SerializedStructArray> {
        self.ensure_active()?;
        self.trim()?;
        let buffer = if transfer {
            self.transferred = true;
            self.views = ViewSet::empty();
            log::debug!(
                "struct array transfers buffer of {} elements, {} bytes",
                self.length,
                self.buffer.len()
            );
            mem::take(&mut self.buffer)
        } else {
            self.buffer.try_clone()?
        };
        Ok(SerializedStructArray {
            length: self.length,
            buffer,
        })
    }

    /// Consume the array and transfer its buffer.
    #[inline]
    pub fn into_serialized(mut self) -> Result<SerializedStructArray> {
        self.serialize(true)
    }

    /// Resize the buffer to discard unused capacity.
    pub(crate) fn trim(&mut self) -> Result<()> {
        self.ensure_active()?;
        if self.length != self.capacity {
            let len_u8 = self.length * S::BYTES_PER_ELEMENT;
            self.buffer = self.buffer.copy_prefix(len_u8, len_u8)?;
            log::debug!(
                "struct array trims capacity from {} to {} elements",
                self.capacity,
                self.length
            );
            self.capacity = self.length;
            self.refresh_views();
        }
        Ok(())
    }

    /// Allocate a larger buffer and copy elements into it.
    /// Nothing changes if allocation fails.
    fn grow(&mut self, n: usize) -> Result<()> {
        let capacity = n
            .max(self.capacity.saturating_mul(RESIZE_MULTIPLIER))
            .max(DEFAULT_CAPACITY);
        let len_u8 = capacity
            .checked_mul(S::BYTES_PER_ELEMENT)
            .ok_or_else(|| Error::InvalidArgument(format!("capacity {capacity} overflows")))?;
        let buffer = self
            .buffer
            .copy_prefix(len_u8, self.length * S::BYTES_PER_ELEMENT)?;
        log::debug!(
            "struct array grows capacity from {} to {} elements, {} bytes",
            self.capacity,
            capacity,
            len_u8
        );
        self.buffer = buffer;
        self.capacity = capacity;
        self.refresh_views();
        Ok(())
    }

    /// Create typed views for the current buffer.
    #[inline]
    fn refresh_views(&mut self) {
        debug_assert_eq!(self.buffer.len(), self.capacity * S::BYTES_PER_ELEMENT);
        debug_assert!(S::VIEWS.contains(plan_view_set(S::MEMBERS)));
        // byte view is always present.
        self.views = S::VIEWS | ViewSet::UINT8;
    }

    #[inline]
    fn ensure_active(&self) -> Result<()> {
        if self.transferred {
            return Err(Error::Transferred);
        }
        Ok(())
    }
}

impl<S> fmt::Debug for StructArray<S> {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructArray")
            .field("length", &self.length)
            .field("capacity", &self.capacity)
            .field("views", &self.views)
            .field("transferred", &self.transferred)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use structarr_common::ViewType;

    /// Two-byte pair, 4 bytes per element.
    struct Pos;

    impl StructArrayShape for Pos {
        const MEMBERS: &'static [MemberSpec<'static>] =
            &[MemberSpec::new("a_pos", ViewType::Int16).with_components(2)];
        const ALIGNMENT: usize = 4;
        const VIEWS: ViewSet = plan_view_set(Self::MEMBERS);
    }

    /// Byte and float, 8 bytes per element.
    struct Mixed;

    impl StructArrayShape for Mixed {
        const MEMBERS: &'static [MemberSpec<'static>] = &[
            MemberSpec::new("a", ViewType::Int8),
            MemberSpec::new("b", ViewType::Float32),
        ];
        const ALIGNMENT: usize = 4;
        const VIEWS: ViewSet = plan_view_set(Self::MEMBERS);
    }

    struct Empty;

    impl StructArrayShape for Empty {
        const MEMBERS: &'static [MemberSpec<'static>] = &[];
        const ALIGNMENT: usize = 1;
        const VIEWS: ViewSet = ViewSet::empty();
    }

    fn fill(arr: &mut StructArray<Pos>, n: usize) {
        let start = arr.len();
        arr.resize(start + n).unwrap();
        let view = arr.view_mut::<i16>();
        for i in start..start + n {
            view[i * 2] = i as i16;
            view[i * 2 + 1] = -(i as i16);
        }
    }

    #[test]
    fn test_struct_array_new() {
        let arr = StructArray::<Pos>::new().unwrap();
        assert_eq!(0, arr.len());
        assert!(arr.is_empty());
        assert_eq!(DEFAULT_CAPACITY, arr.capacity());
        assert_eq!(4, arr.bytes_per_element());
        assert_eq!(128 * 4, arr.buffer().len());
        assert_eq!(ViewSet::INT16 | ViewSet::UINT8, arr.views());
        assert!(!arr.is_transferred());
        assert_eq!(Pos::layout().size, Pos::BYTES_PER_ELEMENT);
    }

    #[test]
    fn test_struct_array_views_cover_members() {
        let arr = StructArray::<Mixed>::new().unwrap();
        assert!(arr.views().contains(plan_view_set(Mixed::MEMBERS)));
        assert_eq!(ViewSet::INT8 | ViewSet::FLOAT32 | ViewSet::UINT8, arr.views());
        let arr = StructArray::<Empty>::new().unwrap();
        // byte view even without members.
        assert_eq!(ViewSet::UINT8, arr.views());
    }

    #[test]
    fn test_struct_array_resize() {
        let mut arr = StructArray::<Mixed>::new().unwrap();
        for n in [0, 1, 127, 128, 129, 700, 3, 5000, 0] {
            arr.resize(n).unwrap();
            assert_eq!(n, arr.len());
            assert!(arr.capacity() >= n);
            assert_eq!(arr.capacity() * 8, arr.buffer().len());
        }
    }

    #[test]
    fn test_struct_array_growth_law() {
        let mut arr = StructArray::<Pos>::new().unwrap();
        arr.resize(0).unwrap();
        arr.reserve(5).unwrap();
        assert_eq!(128, arr.capacity());
        arr.reserve(200).unwrap();
        assert_eq!(640, arr.capacity());
        // requested size beats multiplier.
        arr.reserve(10_000).unwrap();
        assert_eq!(10_000, arr.capacity());
        arr.reserve(10_001).unwrap();
        assert_eq!(50_000, arr.capacity());
    }

    #[test]
    fn test_struct_array_reserve_within_capacity() {
        let mut arr = StructArray::<Pos>::new().unwrap();
        fill(&mut arr, 100);
        let ptr = arr.buffer().as_ptr();
        let bytes = arr.as_bytes().to_vec();
        arr.reserve(0).unwrap();
        arr.reserve(128).unwrap();
        assert_eq!(ptr, arr.buffer().as_ptr());
        assert_eq!(&bytes[..], arr.as_bytes());
    }

    #[test]
    fn test_struct_array_growth_preserves_bytes() {
        let mut rng = rand::thread_rng();
        let mut arr = StructArray::<Mixed>::new().unwrap();
        arr.resize(128).unwrap();
        rng.fill(&mut arr.view_mut::<u8>()[..128 * 8]);
        let bytes = arr.as_bytes().to_vec();
        let ptr = arr.buffer().as_ptr();
        arr.reserve(129).unwrap();
        assert_ne!(ptr, arr.buffer().as_ptr());
        assert_eq!(640, arr.capacity());
        assert_eq!(&bytes[..], arr.as_bytes());
    }

    #[test]
    fn test_struct_array_clear_reuse() {
        let mut arr = StructArray::<Pos>::new().unwrap();
        fill(&mut arr, 300);
        let cap = arr.capacity();
        let ptr = arr.buffer().as_ptr();
        arr.clear().unwrap();
        assert_eq!(0, arr.len());
        assert_eq!(cap, arr.capacity());
        for _ in 0..cap {
            fill(&mut arr, 1);
        }
        assert_eq!(cap, arr.len());
        assert_eq!(ptr, arr.buffer().as_ptr());
    }

    #[test]
    fn test_struct_array_serialize_copy() {
        let mut arr = StructArray::<Pos>::new().unwrap();
        fill(&mut arr, 10);
        let ser = arr.serialize(false).unwrap();
        assert_eq!(10, ser.length);
        assert_eq!(40, ser.buffer.len());
        assert_ne!(arr.buffer().as_ptr(), ser.buffer.as_ptr());
        // source is trimmed but still usable.
        assert!(!arr.is_transferred());
        assert_eq!(10, arr.capacity());
        fill(&mut arr, 1);
        assert_eq!(11, arr.len());
        assert_eq!(128, arr.capacity());

        let de = StructArray::<Pos>::deserialize(ser).unwrap();
        assert_eq!(10, de.len());
        assert_eq!(10, de.capacity());
        assert_eq!(&arr.as_bytes()[..40], de.as_bytes());
    }

    #[test]
    fn test_struct_array_serialize_transfer() {
        let mut arr = StructArray::<Pos>::new().unwrap();
        fill(&mut arr, 20);
        let bytes = arr.as_bytes().to_vec();
        let ser = arr.serialize(true).unwrap();
        assert!(arr.is_transferred());
        assert!(arr.views().is_empty());
        assert!(arr.as_bytes().is_empty());
        assert_eq!(Err(Error::Transferred), arr.resize(1));
        assert_eq!(Err(Error::Transferred), arr.reserve(1000));
        assert_eq!(Err(Error::Transferred), arr.clear());
        assert!(arr.serialize(false).is_err());
        assert!(arr.element(0).is_err());

        let ptr = ser.buffer.as_ptr();
        let de = StructArray::<Pos>::deserialize(ser).unwrap();
        assert_eq!(ptr, de.buffer().as_ptr());
        assert_eq!(&bytes[..], de.as_bytes());
    }

    #[test]
    fn test_struct_array_deserialize_spare_capacity() {
        let buffer = RawBuffer::zeroed(8 * 4).unwrap();
        let de = StructArray::<Pos>::deserialize(SerializedStructArray { length: 3, buffer })
            .unwrap();
        assert_eq!(3, de.len());
        assert_eq!(8, de.capacity());
    }

    #[test]
    fn test_struct_array_deserialize_invalid() {
        let buffer = RawBuffer::zeroed(6).unwrap();
        let res = StructArray::<Pos>::deserialize(SerializedStructArray { length: 1, buffer });
        assert_eq!(Some(Error::InvalidFormat), res.err());
        let buffer = RawBuffer::zeroed(8).unwrap();
        let res = StructArray::<Pos>::deserialize(SerializedStructArray { length: 3, buffer });
        assert_eq!(Some(Error::InvalidFormat), res.err());
    }

    #[test]
    fn test_struct_array_element() {
        let mut arr = StructArray::<Mixed>::new().unwrap();
        arr.resize(3).unwrap();
        let elem = arr.element(2).unwrap();
        assert_eq!(16, elem.pos1());
        assert_eq!(Some(Error::IndexOutOfBound(3)), arr.element(3).err());
        let slot = elem.slot::<f32>(4);
        arr.view_mut::<f32>()[slot] = 1.5;
        assert_eq!(1.5f32.to_ne_bytes(), arr.as_bytes()[20..24]);
    }

    #[test]
    #[should_panic]
    fn test_struct_array_missing_view() {
        let arr = StructArray::<Pos>::new().unwrap();
        let _ = arr.view::<f32>();
    }

    #[test]
    fn test_struct_array_zero_sized() {
        let mut arr = StructArray::<Empty>::new().unwrap();
        assert_eq!(0, Empty::BYTES_PER_ELEMENT);
        arr.resize(10).unwrap();
        assert!(arr.as_bytes().is_empty());
        let ser = arr.serialize(true).unwrap();
        assert_eq!(10, ser.length);
        let de = StructArray::<Empty>::deserialize(ser).unwrap();
        assert_eq!(10, de.len());
        assert_eq!(10, de.capacity());
    }

    #[test]
    fn test_struct_array_capacity_overflow() {
        let mut arr = StructArray::<Mixed>::new().unwrap();
        fill_mixed(&mut arr);
        let ptr = arr.buffer().as_ptr();
        assert!(matches!(
            arr.reserve(usize::MAX / 4),
            Err(Error::InvalidArgument(_))
        ));
        // failed growth leaves array untouched.
        assert_eq!(128, arr.capacity());
        assert_eq!(ptr, arr.buffer().as_ptr());
        assert_eq!(1, arr.len());
    }

    fn fill_mixed(arr: &mut StructArray<Mixed>) {
        arr.resize(1).unwrap();
        arr.view_mut::<i8>()[0] = -1;
        arr.view_mut::<f32>()[1] = 2.0;
    }

    #[test]
    fn test_struct_array_random_appends() {
        let mut rng = rand::thread_rng();
        let mut arr = StructArray::<Pos>::new().unwrap();
        let mut expected = vec![];
        for _ in 0..2000 {
            let (x, y): (i16, i16) = (rng.gen(), rng.gen());
            let i = arr.len();
            arr.resize(i + 1).unwrap();
            let elem = arr.element(i).unwrap();
            let slot = elem.slot::<i16>(0);
            arr.view_mut::<i16>()[slot..slot + 2].copy_from_slice(&[x, y]);
            expected.push(x);
            expected.push(y);
        }
        assert_eq!(3200, arr.capacity());
        assert_eq!(&expected[..], &arr.view::<i16>()[..4000]);
    }
}
