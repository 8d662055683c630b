use structarr_common::ViewScalar;

/// ElementView locates one element inside the typed views of a
/// struct array.
///
/// Positions are precomputed once per element at every view width,
/// so a member of width N at byte offset `off` lives at index
/// `posN + off / N` of the N-byte view. This is exact because the
/// element size and member offsets are multiples of the member width,
/// which every shape is checked for at compile time.
///
/// The view holds no reference to the array. It stays valid as long
/// as the element index is within the array length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementView {
    index: usize,
    pos1: usize,
    pos2: usize,
    pos4: usize,
    pos8: usize,
}

impl ElementView {
    #[inline]
    pub const fn new(index: usize, size: usize) -> Self {
        let pos1 = index * size;
        ElementView {
            index,
            pos1,
            pos2: pos1 / 2,
            pos4: pos1 / 4,
            pos8: pos1 / 8,
        }
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns byte position of the element.
    #[inline]
    pub fn pos1(&self) -> usize {
        self.pos1
    }

    #[inline]
    pub fn pos2(&self) -> usize {
        self.pos2
    }

    #[inline]
    pub fn pos4(&self) -> usize {
        self.pos4
    }

    /// Only meaningful if element size is multiple of 8.
    #[inline]
    pub fn pos8(&self) -> usize {
        self.pos8
    }

    /// Returns index in the view of T of the member at given byte offset.
    #[inline]
    pub fn slot<T: ViewScalar>(&self, offset: usize) -> usize {
        match T::VIEW_TYPE.size_of() {
            1 => self.pos1 + offset,
            2 => self.pos2 + offset / 2,
            4 => self.pos4 + offset / 4,
            n => unreachable!("no view type has width {}", n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_view_positions() {
        let ev = ElementView::new(3, 12);
        assert_eq!(3, ev.index());
        assert_eq!(36, ev.pos1());
        assert_eq!(18, ev.pos2());
        assert_eq!(9, ev.pos4());
        assert_eq!(4, ev.pos8());
        let ev = ElementView::new(0, 8);
        assert_eq!((0, 0, 0, 0), (ev.pos1(), ev.pos2(), ev.pos4(), ev.pos8()));
    }

    #[test]
    fn test_element_view_slot() {
        // 12-byte element: u8 at 0, i16 pair at 2, f32 at 8.
        let ev = ElementView::new(5, 12);
        assert_eq!(61, ev.slot::<u8>(1));
        assert_eq!(31, ev.slot::<i16>(2));
        assert_eq!(17, ev.slot::<f32>(8));
        assert_eq!(ev.pos1() + 8, ev.slot::<f32>(8) * 4);
    }

    #[test]
    fn test_element_view_slot_all_widths() {
        fn byte_pos<T: ViewScalar>(ev: &ElementView, offset: usize) -> usize {
            ev.slot::<T>(offset) * T::VIEW_TYPE.size_of()
        }
        for index in 0..10 {
            let ev = ElementView::new(index, 16);
            assert_eq!(index * 16 + 3, byte_pos::<i8>(&ev, 3));
            assert_eq!(index * 16 + 3, byte_pos::<u8>(&ev, 3));
            assert_eq!(index * 16 + 6, byte_pos::<i16>(&ev, 6));
            assert_eq!(index * 16 + 6, byte_pos::<u16>(&ev, 6));
            assert_eq!(index * 16 + 12, byte_pos::<i32>(&ev, 12));
            assert_eq!(index * 16 + 12, byte_pos::<u32>(&ev, 12));
            assert_eq!(index * 16 + 12, byte_pos::<f32>(&ev, 12));
        }
    }
}
