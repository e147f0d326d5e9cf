use std::time::Instant;

use eframe::egui::{Color32, Frame, Stroke, Ui};
use scorer_core::{StatusKind, StatusLine};

/// Transient status banner shown at the bottom of a page.
pub fn status_banner(ui: &mut Ui, status: &mut StatusLine) {
    let Some((text, kind)) = status.current(Instant::now()) else {
        return;
    };
    let text = text.to_string();

    let (fill, stroke, color) = match kind {
        StatusKind::Success => (
            Color32::from_rgba_unmultiplied(52, 211, 153, 26),
            Color32::from_rgb(52, 211, 153),
            Color32::from_rgb(52, 211, 153),
        ),
        StatusKind::Error => (
            Color32::from_rgba_unmultiplied(248, 113, 113, 26),
            Color32::from_rgb(248, 113, 113),
            Color32::from_rgb(248, 113, 113),
        ),
        StatusKind::Info => (
            ui.visuals().extreme_bg_color,
            ui.visuals().widgets.inactive.bg_stroke.color,
            ui.visuals().text_color(),
        ),
    };

    Frame::group(ui.style())
        .fill(fill)
        .stroke(Stroke::new(1.0, stroke))
        .show(ui, |ui| {
            ui.colored_label(color, text);
        });
}
