//! Conversions between [`Frame`]/[`GrayFrame`] buffers and OpenCV `Mat`s.
//!
//! OpenCV stores color pixels as BGR; frames in this crate are RGB.

use opencv::core::{self, Mat, Scalar};
use opencv::prelude::*;

use crate::shared::frame::Frame;
use crate::shared::gray_frame::GrayFrame;

/// Copies an 8-bit BGR (or single-channel) `Mat` into an RGB [`Frame`].
pub(crate) fn frame_from_mat(mat: &Mat, index: usize) -> Result<Frame, Box<dyn std::error::Error>> {
    let (rows, cols) = (mat.rows(), mat.cols());
    if rows <= 0 || cols <= 0 {
        return Err("Empty image from capture device".into());
    }
    let owned;
    let mat = if mat.is_continuous() {
        mat
    } else {
        owned = mat.try_clone()?;
        &owned
    };

    let bytes = mat.data_bytes()?;
    let (width, height) = (cols as u32, rows as u32);
    match mat.typ() {
        core::CV_8UC3 => {
            let mut rgb = Vec::with_capacity(bytes.len());
            for px in bytes.chunks_exact(3) {
                rgb.extend_from_slice(&[px[2], px[1], px[0]]);
            }
            Ok(Frame::new(rgb, width, height, 3, index))
        }
        core::CV_8UC1 => Ok(Frame::new(bytes.to_vec(), width, height, 1, index)),
        other => Err(format!("Unsupported capture pixel type: {other}").into()),
    }
}

/// Builds a BGR `Mat` from an RGB [`Frame`] (one-channel frames are
/// expanded to gray BGR).
pub(crate) fn bgr_mat_from_frame(frame: &Frame) -> Result<Mat, Box<dyn std::error::Error>> {
    let mut mat = Mat::new_rows_cols_with_default(
        frame.height() as i32,
        frame.width() as i32,
        core::CV_8UC3,
        Scalar::all(0.0),
    )?;
    let dst = mat.data_bytes_mut()?;
    let channels = frame.channels() as usize;
    for (out, px) in dst.chunks_exact_mut(3).zip(frame.data().chunks_exact(channels)) {
        if channels >= 3 {
            out.copy_from_slice(&[px[2], px[1], px[0]]);
        } else {
            out.fill(px[0]);
        }
    }
    Ok(mat)
}

pub(crate) fn mat_from_gray(gray: &GrayFrame) -> Result<Mat, Box<dyn std::error::Error>> {
    let mut mat = Mat::new_rows_cols_with_default(
        gray.height() as i32,
        gray.width() as i32,
        core::CV_8UC1,
        Scalar::all(0.0),
    )?;
    mat.data_bytes_mut()?.copy_from_slice(gray.data());
    Ok(mat)
}
