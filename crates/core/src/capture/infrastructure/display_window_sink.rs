use opencv::core::{Mat, Point, Scalar};
use opencv::highgui;
use opencv::imgproc;

use crate::capture::domain::frame_sink::{FrameSink, SinkControl};
use crate::shared::source_metadata::SourceMetadata;
use crate::tracking::domain::frame_observation::FrameObservation;

use super::mat_convert;

const FRAME_WINDOW: &str = "eyetrack";
const OPTIMIZED_WINDOW: &str = "eyetrack optimized";
const KEY_SPACE: i32 = 32;

/// Live preview: the annotated frame with a HUD in one window and the
/// optimized grayscale frame in another. Pressing space stops the run.
pub struct DisplayWindowSink {
    show_optimized: bool,
    opened: bool,
}

impl DisplayWindowSink {
    pub fn new(show_optimized: bool) -> Self {
        Self {
            show_optimized,
            opened: false,
        }
    }
}

impl Default for DisplayWindowSink {
    fn default() -> Self {
        Self::new(true)
    }
}

/// HUD lines drawn in the top-left corner of the preview.
pub fn hud_lines(observation: &FrameObservation) -> [String; 4] {
    let p = &observation.enhancement;
    [
        format!("ID Rate: {:.0}%", observation.accuracy_percent),
        format!("alpha: {:.2}", p.alpha),
        format!("beta: {:.1}", p.beta),
        format!("gamma: {:.2}", p.gamma),
    ]
}

fn draw_hud(mat: &mut Mat, lines: &[String]) -> opencv::Result<()> {
    let color = Scalar::new(0.0, 255.0, 0.0, 0.0);
    for (i, text) in lines.iter().enumerate() {
        imgproc::put_text(
            mat,
            text,
            Point::new(10, 24 + 22 * i as i32),
            imgproc::FONT_HERSHEY_SIMPLEX,
            0.6,
            color,
            2,
            imgproc::LINE_8,
            false,
        )?;
    }
    Ok(())
}

impl FrameSink for DisplayWindowSink {
    fn open(&mut self, metadata: &SourceMetadata) -> Result<(), Box<dyn std::error::Error>> {
        highgui::named_window(FRAME_WINDOW, highgui::WINDOW_AUTOSIZE)?;
        if self.show_optimized {
            highgui::named_window(OPTIMIZED_WINDOW, highgui::WINDOW_AUTOSIZE)?;
        }
        self.opened = true;
        log::info!("Previewing {} (press space to stop)", metadata.description);
        Ok(())
    }

    fn write(
        &mut self,
        observation: &FrameObservation,
    ) -> Result<SinkControl, Box<dyn std::error::Error>> {
        let mut bgr = mat_convert::bgr_mat_from_frame(&observation.frame)?;
        draw_hud(&mut bgr, &hud_lines(observation))?;
        highgui::imshow(FRAME_WINDOW, &bgr)?;

        if self.show_optimized {
            let gray = mat_convert::mat_from_gray(&observation.gray)?;
            highgui::imshow(OPTIMIZED_WINDOW, &gray)?;
        }

        if highgui::wait_key(1)? == KEY_SPACE {
            log::info!("Stopped from preview window");
            return Ok(SinkControl::Stop);
        }
        Ok(SinkControl::Continue)
    }

    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if std::mem::take(&mut self.opened) {
            highgui::destroy_all_windows()?;
        }
        Ok(())
    }
}
