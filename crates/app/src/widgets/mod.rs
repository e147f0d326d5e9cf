mod bar_chart;
mod score_slider;
mod status;
mod waveform;

pub use bar_chart::{ChartColumn, SegmentRef, score_color, segmented_bar_chart};
pub use score_slider::ScoreSlider;
pub use status::status_banner;
pub use waveform::WaveformView;
