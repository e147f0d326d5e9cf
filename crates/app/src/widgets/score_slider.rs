use eframe::egui::{
    self, Color32, CursorIcon, Key, Sense, Stroke, TextEdit, Ui, Vec2,
};
use scorer_core::{DragOrigin, ScoreInput, ScoreRange};

/// Pixel-to-step mapping for the drag gesture.
#[derive(Debug, Clone, Copy)]
enum DragAxis {
    /// Upward movement increases the value.
    Vertical { px_per_step: f32 },
    /// Rightward movement increases the value.
    Horizontal { px_per_step: f32 },
}

#[derive(Debug)]
struct DragSession {
    origin: DragOrigin,
    accumulated: f32,
}

/// Integer score control adjustable by wheel, drag, arrow buttons or typed
/// entry via double-click. Every interaction resolves through the snapped
/// setter in [`ScoreInput`], so the committed value is always an in-range
/// integer.
pub struct ScoreSlider {
    input: ScoreInput,
    axis: DragAxis,
    show_arrows: bool,
    drag: Option<DragSession>,
    focus_edit: bool,
}

impl ScoreSlider {
    /// 0–10 style control: vertical drag at 10 px per step, no arrows.
    pub fn vertical(range: ScoreRange) -> Self {
        Self {
            input: ScoreInput::unset(range),
            axis: DragAxis::Vertical { px_per_step: 10.0 },
            show_arrows: false,
            drag: None,
            focus_edit: false,
        }
    }

    /// 0–100-by-10 style control: horizontal drag at 12 px per step, with
    /// left/right arrow buttons.
    pub fn horizontal_with_arrows(range: ScoreRange, initial: i32) -> Self {
        Self {
            input: ScoreInput::with_value(range, initial),
            axis: DragAxis::Horizontal { px_per_step: 12.0 },
            show_arrows: true,
            drag: None,
            focus_edit: false,
        }
    }

    pub fn value(&self) -> Option<i32> {
        self.input.value()
    }

    pub fn set_value(&mut self, value: i32) {
        self.input.set(value);
    }

    pub fn clear(&mut self) {
        self.input.clear();
        self.drag = None;
    }

    pub fn is_set(&self) -> bool {
        self.input.is_set()
    }

    fn drag_steps(&self) -> i32 {
        let Some(drag) = &self.drag else { return 0 };
        match self.axis {
            DragAxis::Vertical { px_per_step } => (drag.accumulated / px_per_step).floor() as i32,
            DragAxis::Horizontal { px_per_step } => (drag.accumulated / px_per_step).trunc() as i32,
        }
    }

    /// Render the control. Returns true if the value changed this frame.
    pub fn ui(&mut self, ui: &mut Ui, label: &str, flash: bool) -> bool {
        let before = self.input.value();

        ui.vertical(|ui| {
            if !label.is_empty() {
                ui.label(label);
            }
            ui.horizontal(|ui| {
                if self.show_arrows && ui.button("←").clicked() {
                    self.input.step(-1);
                }
                self.value_box(ui, flash);
                if self.show_arrows && ui.button("→").clicked() {
                    self.input.step(1);
                }
            });
        });

        before != self.input.value()
    }

    fn value_box(&mut self, ui: &mut Ui, flash: bool) {
        let range = self.input.range();
        let size = Vec2::new(96.0, 34.0);

        if self.input.is_editing() {
            let mut commit = false;
            let mut cancel = false;
            if let Some(text) = self.input.edit_text_mut() {
                let response = ui.add_sized(size, TextEdit::singleline(text));
                if self.focus_edit {
                    response.request_focus();
                    self.focus_edit = false;
                }
                if ui.input(|i| i.key_pressed(Key::Escape)) {
                    cancel = true;
                } else if response.lost_focus() {
                    // Enter also drops focus, so both commit paths land here.
                    commit = true;
                }
            }
            if cancel {
                self.input.cancel_edit();
            } else if commit {
                self.input.commit_edit();
            }
            return;
        }

        let (rect, response) = ui.allocate_exact_size(size, Sense::click_and_drag());
        let painter = ui.painter();

        let stroke = if flash {
            Stroke::new(2.0, Color32::from_rgb(248, 113, 113))
        } else {
            Stroke::new(1.0, ui.visuals().widgets.inactive.bg_stroke.color)
        };
        let fill = if flash {
            Color32::from_rgba_unmultiplied(248, 113, 113, 24)
        } else {
            ui.visuals().extreme_bg_color
        };
        painter.rect(rect, 8.0, fill, stroke, egui::StrokeKind::Inside);

        let text = match self.input.value() {
            Some(value) => format!("{value} / {}", range.max),
            None => format!("– / {}", range.max),
        };
        painter.text(
            rect.center(),
            egui::Align2::CENTER_CENTER,
            text,
            egui::TextStyle::Button.resolve(ui.style()),
            ui.visuals().strong_text_color(),
        );

        // Wheel: one step per tick, direction only, consumed so the page
        // underneath does not scroll while the pointer is over the control.
        if response.hovered() {
            let scroll_y = ui.input_mut(|input| {
                let y = input.raw_scroll_delta.y;
                if y != 0.0 {
                    input.raw_scroll_delta = Vec2::ZERO;
                    input.smooth_scroll_delta = Vec2::ZERO;
                }
                y
            });
            if scroll_y > 0.0 {
                self.input.step(1);
            } else if scroll_y < 0.0 {
                self.input.step(-1);
            }
        }

        if response.double_clicked() {
            self.drag = None;
            self.input.begin_edit();
            self.focus_edit = true;
            return;
        }

        if response.drag_started() {
            self.drag = Some(DragSession {
                origin: self.input.begin_drag(),
                accumulated: 0.0,
            });
        }
        if response.dragged() {
            if let Some(drag) = &mut self.drag {
                let delta = response.drag_delta();
                match self.axis {
                    DragAxis::Vertical { .. } => drag.accumulated -= delta.y,
                    DragAxis::Horizontal { .. } => drag.accumulated += delta.x,
                }
            }
            if let Some(drag) = &self.drag {
                let origin = drag.origin;
                let steps = self.drag_steps();
                self.input.drag_to(origin, steps);
            }
        }
        if response.drag_stopped() {
            self.drag = None;
        }

        // The cursor override lives exactly as long as the drag session.
        if self.drag.is_some() {
            ui.ctx().set_cursor_icon(match self.axis {
                DragAxis::Vertical { .. } => CursorIcon::ResizeVertical,
                DragAxis::Horizontal { .. } => CursorIcon::ResizeHorizontal,
            });
        } else if response.hovered() {
            ui.ctx().set_cursor_icon(CursorIcon::PointingHand);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scorer_core::{SCORE_0_TO_10, SCORE_0_TO_100_BY_10};

    #[test]
    fn test_vertical_slider_starts_unset() {
        let slider = ScoreSlider::vertical(SCORE_0_TO_10);
        assert_eq!(slider.value(), None);
        assert!(!slider.is_set());
    }

    #[test]
    fn test_horizontal_slider_starts_at_anchor() {
        let slider = ScoreSlider::horizontal_with_arrows(SCORE_0_TO_100_BY_10, 50);
        assert_eq!(slider.value(), Some(50));
    }

    #[test]
    fn test_drag_steps_vertical_floors_upward_motion() {
        let mut slider = ScoreSlider::vertical(SCORE_0_TO_10);
        slider.set_value(5);
        slider.drag = Some(DragSession {
            origin: slider.input.begin_drag(),
            accumulated: 27.0, // 27px up at 10px/step = 2 whole steps
        });
        assert_eq!(slider.drag_steps(), 2);
    }

    #[test]
    fn test_drag_steps_horizontal_truncates_toward_zero() {
        let mut slider = ScoreSlider::horizontal_with_arrows(SCORE_0_TO_100_BY_10, 50);
        slider.drag = Some(DragSession {
            origin: slider.input.begin_drag(),
            accumulated: -11.0, // less than one 12px quantum leftward
        });
        assert_eq!(slider.drag_steps(), 0);
        slider.drag.as_mut().map(|d| d.accumulated = -25.0);
        assert_eq!(slider.drag_steps(), -2);
    }
}
