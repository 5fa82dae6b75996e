use std::path::{Path, PathBuf};

use ffmpeg_next::format::context::Input;
use ffmpeg_next::software::scaling::{Context as Scaler, Flags};
use ffmpeg_next::util::frame::video::Video as VideoFrame;

use crate::capture::domain::frame_source::FrameSource;
use crate::shared::frame::Frame;
use crate::shared::source_metadata::{SourceKind, SourceMetadata};

type FrameResult = Result<Frame, Box<dyn std::error::Error>>;

/// Decodes a recorded video via ffmpeg-next into RGB24 [`Frame`]s.
pub struct FfmpegFileSource {
    path: PathBuf,
    input_ctx: Option<Input>,
    video_stream_index: usize,
}

// Safety: FfmpegFileSource is moved into the capture thread and only used
// there. The raw pointers inside ffmpeg types are never shared.
unsafe impl Send for FfmpegFileSource {}

impl FfmpegFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            input_ctx: None,
            video_stream_index: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FrameSource for FfmpegFileSource {
    fn open(&mut self) -> Result<SourceMetadata, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        let ictx = ffmpeg_next::format::input(&self.path)
            .map_err(|e| format!("Failed to open video {}: {e}", self.path.display()))?;

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("No video stream found")?;

        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;

        let rate = stream.rate();
        let fps = if rate.denominator() != 0 {
            rate.numerator() as f64 / rate.denominator() as f64
        } else {
            0.0
        };
        let frames = stream.frames();

        let metadata = SourceMetadata {
            width: decoder.width(),
            height: decoder.height(),
            fps,
            total_frames: (frames > 0).then_some(frames as usize),
            kind: SourceKind::VideoFile,
            description: self.path.display().to_string(),
        };

        self.video_stream_index = stream.index();
        self.input_ctx = Some(ictx);
        Ok(metadata)
    }

    fn frames(&mut self) -> Box<dyn Iterator<Item = FrameResult> + '_> {
        let index = self.video_stream_index;
        let Some(ictx) = self.input_ctx.as_mut() else {
            return Box::new(std::iter::once(Err("FfmpegFileSource: not opened".into())));
        };
        match FfmpegFrameIter::new(ictx, index) {
            Ok(iter) => Box::new(iter),
            Err(e) => Box::new(std::iter::once(Err(e))),
        }
    }

    fn close(&mut self) {
        self.input_ctx = None;
    }
}

/// Decodes one frame per `next()` call instead of buffering the file.
struct FfmpegFrameIter<'a> {
    ictx: &'a mut Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: Scaler,
    width: u32,
    height: u32,
    video_stream_index: usize,
    frame_index: usize,
    flushing: bool,
    done: bool,
}

impl<'a> FfmpegFrameIter<'a> {
    fn new(ictx: &'a mut Input, video_stream_index: usize) -> Result<Self, Box<dyn std::error::Error>> {
        let stream = ictx
            .stream(video_stream_index)
            .ok_or("Video stream disappeared")?;
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;

        let (width, height) = (decoder.width(), decoder.height());
        let scaler = Scaler::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            Flags::BILINEAR,
        )?;

        Ok(Self {
            ictx,
            decoder,
            scaler,
            width,
            height,
            video_stream_index,
            frame_index: 0,
            flushing: false,
            done: false,
        })
    }

    fn try_receive(&mut self) -> Option<FrameResult> {
        let mut decoded = VideoFrame::empty();
        self.decoder.receive_frame(&mut decoded).ok()?;

        let mut rgb = VideoFrame::empty();
        if let Err(e) = self.scaler.run(&decoded, &mut rgb) {
            return Some(Err(Box::new(e)));
        }
        let pixels = packed_rgb(&rgb, self.width, self.height);
        let frame = Frame::new(pixels, self.width, self.height, 3, self.frame_index);
        self.frame_index += 1;
        Some(Ok(frame))
    }
}

impl Iterator for FfmpegFrameIter<'_> {
    type Item = FrameResult;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if let Some(result) = self.try_receive() {
            return Some(result);
        }
        if self.flushing {
            self.done = true;
            return None;
        }

        loop {
            let Some((stream, packet)) = self.ictx.packets().next() else {
                let _ = self.decoder.send_eof();
                self.flushing = true;
                let result = self.try_receive();
                self.done = result.is_none();
                return result;
            };

            if stream.index() != self.video_stream_index {
                continue;
            }
            if let Err(e) = self.decoder.send_packet(&packet) {
                log::debug!("Skipping undecodable packet: {e}");
                continue;
            }
            if let Some(result) = self.try_receive() {
                return Some(result);
            }
        }
    }
}

/// Strips per-row stride padding from an RGB24 ffmpeg frame.
fn packed_rgb(rgb: &VideoFrame, width: u32, height: u32) -> Vec<u8> {
    let stride = rgb.stride(0);
    let data = rgb.data(0);
    let row_bytes = width as usize * 3;

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        pixels.extend_from_slice(&data[start..start + row_bytes]);
    }
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_video(path: &Path, num_frames: usize, width: u32, height: u32) {
        use ffmpeg_next::{codec, encoder, format, Dictionary, Packet, Rational};

        ffmpeg_next::init().unwrap();
        let fps = 25;
        let mut octx = format::output(path).unwrap();
        let global_header = octx.format().flags().contains(format::Flags::GLOBAL_HEADER);

        let mpeg4 = encoder::find(codec::Id::MPEG4).unwrap();
        let mut ost = octx.add_stream(Some(mpeg4)).unwrap();
        let mut enc = codec::context::Context::new_with_codec(mpeg4)
            .encoder()
            .video()
            .unwrap();
        enc.set_width(width);
        enc.set_height(height);
        enc.set_format(format::Pixel::YUV420P);
        enc.set_time_base(Rational(1, fps));
        enc.set_frame_rate(Some(Rational(fps, 1)));
        if global_header {
            enc.set_flags(codec::Flags::GLOBAL_HEADER);
        }
        let mut enc = enc.open_with(Dictionary::new()).unwrap();
        ost.set_parameters(&enc);
        octx.write_header().unwrap();
        let ost_time_base = octx.stream(0).unwrap().time_base();

        let mut to_yuv = Scaler::get(
            format::Pixel::RGB24,
            width,
            height,
            format::Pixel::YUV420P,
            width,
            height,
            Flags::BILINEAR,
        )
        .unwrap();

        let mut pkt = Packet::empty();
        for i in 0..num_frames {
            let mut rgb = VideoFrame::new(format::Pixel::RGB24, width, height);
            let value = ((i * 40) % 256) as u8;
            rgb.data_mut(0).fill(value);
            let mut yuv = VideoFrame::empty();
            to_yuv.run(&rgb, &mut yuv).unwrap();
            yuv.set_pts(Some(i as i64));
            enc.send_frame(&yuv).unwrap();
            while enc.receive_packet(&mut pkt).is_ok() {
                pkt.set_stream(0);
                pkt.rescale_ts(Rational(1, fps), ost_time_base);
                pkt.write_interleaved(&mut octx).unwrap();
            }
        }
        enc.send_eof().unwrap();
        while enc.receive_packet(&mut pkt).is_ok() {
            pkt.set_stream(0);
            pkt.rescale_ts(Rational(1, fps), ost_time_base);
            pkt.write_interleaved(&mut octx).unwrap();
        }
        octx.write_trailer().unwrap();
    }

    #[test]
    fn test_open_returns_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        create_test_video(&path, 5, 160, 120);

        let mut source = FfmpegFileSource::new(&path);
        let meta = source.open().unwrap();
        assert_eq!((meta.width, meta.height), (160, 120));
        assert!(meta.fps > 0.0);
        assert_eq!(meta.kind, SourceKind::VideoFile);
        assert!(!meta.is_live());
    }

    #[test]
    fn test_open_nonexistent_is_error() {
        let mut source = FfmpegFileSource::new("/nonexistent/clip.mp4");
        assert!(source.open().is_err());
    }

    #[test]
    fn test_frames_are_finite_and_sequential() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        create_test_video(&path, 5, 160, 120);

        let mut source = FfmpegFileSource::new(&path);
        source.open().unwrap();
        let frames: Vec<Frame> = source.frames().map(|f| f.unwrap()).collect();
        assert_eq!(frames.len(), 5);
        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(frame.index(), i);
            assert_eq!(frame.channels(), 3);
            assert_eq!(frame.data().len(), 160 * 120 * 3);
        }
    }

    #[test]
    fn test_frames_without_open_is_error() {
        let mut source = FfmpegFileSource::new("unused.mp4");
        assert!(source.frames().next().unwrap().is_err());
    }

    #[test]
    fn test_close_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        create_test_video(&path, 1, 64, 48);

        let mut source = FfmpegFileSource::new(&path);
        source.open().unwrap();
        source.close();
        source.close();
    }
}
