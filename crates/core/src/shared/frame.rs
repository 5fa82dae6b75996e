use ndarray::{ArrayView3, ArrayViewMut3};

/// A captured frame: interleaved pixel bytes in row-major order.
///
/// Sources deliver RGB (3 channels). Single-channel and RGBA frames are
/// accepted so still images can pass through unchanged; conversion to luma
/// happens in the preprocessing stage.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
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

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    pub fn as_ndarray_mut(&mut self) -> ArrayViewMut3<'_, u8> {
        ArrayViewMut3::from_shape(self.shape(), &mut self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Mirrors the frame left-to-right in place, so a webcam image reads
    /// like a mirror to the person in front of it.
    pub fn flip_horizontal(&mut self) {
        let row_len = self.width as usize * self.channels as usize;
        if row_len == 0 {
            return;
        }
        let channels = self.channels as usize;
        let width = self.width as usize;
        for row in self.data.chunks_exact_mut(row_len) {
            for col in 0..width / 2 {
                let left = col * channels;
                let right = (width - 1 - col) * channels;
                for c in 0..channels {
                    row.swap(left + c, right + c);
                }
            }
        }
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}
