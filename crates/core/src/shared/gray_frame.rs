use ndarray::ArrayView2;

/// Single-channel luma image produced by preprocessing and consumed by
/// the feature detectors.
#[derive(Clone, Debug, PartialEq)]
pub struct GrayFrame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    index: usize,
}

impl GrayFrame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize),
            "data length must equal width * height"
        );
        Self {
            data,
            width,
            height,
            index,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn as_ndarray(&self) -> ArrayView2<'_, u8> {
        ArrayView2::from_shape((self.height as usize, self.width as usize), &self.data)
            .expect("GrayFrame data length must match dimensions")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let frame = GrayFrame::new(vec![7u8; 6], 3, 2, 4);
        assert_eq!(frame.width(), 3);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.index(), 4);
        assert_eq!(frame.data().len(), 6);
    }

    #[test]
    fn test_as_ndarray_is_row_major() {
        let frame = GrayFrame::new(vec![0, 1, 2, 3, 4, 5], 3, 2, 0);
        let arr = frame.as_ndarray();
        assert_eq!(arr.shape(), &[2, 3]);
        assert_eq!(arr[[1, 0]], 3);
        assert_eq!(arr[[0, 2]], 2);
    }
}
