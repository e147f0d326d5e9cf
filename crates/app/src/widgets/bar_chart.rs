use eframe::egui::{
    self, Align2, Color32, FontId, Pos2, Rect, Sense, Stroke, Ui, Vec2,
};
use scorer_core::chart;

const COLUMN_GAP: f32 = 12.0;
const COUNT_LABEL_HEIGHT: f32 = 18.0;
const AXIS_LABEL_HEIGHT: f32 = 22.0;

/// Heat map from worst (red) to best (green) score.
pub fn score_color(score: u8) -> Color32 {
    const COLORS: [Color32; 10] = [
        Color32::from_rgb(0xef, 0x44, 0x44),
        Color32::from_rgb(0xf9, 0x73, 0x16),
        Color32::from_rgb(0xfb, 0x92, 0x3c),
        Color32::from_rgb(0xfb, 0xbf, 0x24),
        Color32::from_rgb(0xfa, 0xcc, 0x15),
        Color32::from_rgb(0xbe, 0xf2, 0x64),
        Color32::from_rgb(0x86, 0xef, 0xac),
        Color32::from_rgb(0x4a, 0xde, 0x80),
        Color32::from_rgb(0x22, 0xc5, 0x5e),
        Color32::from_rgb(0x16, 0xa3, 0x4a),
    ];
    COLORS
        .get(score.saturating_sub(1) as usize)
        .copied()
        .unwrap_or(COLORS[4])
}

/// One category column: a bar whose height encodes the total count, stacked
/// from lowest score at the bottom to highest at the top.
pub struct ChartColumn {
    pub label: String,
    pub total: u64,
    /// (score, count), lowest score first.
    pub buckets: Vec<(u8, u64)>,
}

/// A clicked segment, mapped by the page into a results-page filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentRef {
    pub column: usize,
    pub score: u8,
    pub count: u64,
}

/// Paint the segmented distribution chart. Hover raises one segment at a time
/// and shows a tooltip beside it; a click returns the segment for navigation.
pub fn segmented_bar_chart(
    ui: &mut Ui,
    columns: &[ChartColumn],
    hovered: &mut Option<(usize, u8)>,
) -> Option<SegmentRef> {
    if columns.is_empty() {
        return None;
    }

    let chart_height = chart::MAX_BAR_HEIGHT + COUNT_LABEL_HEIGHT + AXIS_LABEL_HEIGHT;
    let width = ui.available_width();
    let (chart_rect, _) = ui.allocate_exact_size(Vec2::new(width, chart_height), Sense::hover());
    let painter = ui.painter_at(chart_rect.expand(60.0));

    let column_width =
        ((width - COLUMN_GAP * (columns.len() as f32 - 1.0)) / columns.len() as f32).max(30.0);
    let max_total = columns.iter().map(|c| c.total).max().unwrap_or(1);
    let baseline = chart_rect.bottom() - AXIS_LABEL_HEIGHT;

    let pointer = ui.ctx().pointer_interact_pos();
    let clicked = ui.input(|i| i.pointer.primary_clicked());

    let mut clicked_segment = None;
    let mut next_hovered = None;
    let mut tooltip: Option<(Rect, usize, u8, u64)> = None;

    for (col_idx, column) in columns.iter().enumerate() {
        let left = chart_rect.left() + col_idx as f32 * (column_width + COLUMN_GAP);
        let bar_height = chart::bar_height(column.total, max_total);
        let bar_rect = Rect::from_min_max(
            Pos2::new(left, baseline - bar_height),
            Pos2::new(left + column_width, baseline),
        );

        // Outline; empty categories show only this.
        painter.rect(
            bar_rect,
            4.0,
            if column.total == 0 {
                ui.visuals().faint_bg_color
            } else {
                Color32::TRANSPARENT
            },
            Stroke::new(1.0, ui.visuals().widgets.inactive.bg_stroke.color),
            egui::StrokeKind::Inside,
        );

        if column.total > 0 {
            painter.text(
                Pos2::new(bar_rect.center().x, bar_rect.top() - COUNT_LABEL_HEIGHT / 2.0),
                Align2::CENTER_CENTER,
                column.total.to_string(),
                FontId::proportional(12.0),
                ui.visuals().weak_text_color(),
            );

            let segments = chart::layout_segments(&column.buckets, column.total, bar_height);
            let mut y = baseline;
            for segment in &segments {
                let seg_rect = Rect::from_min_max(
                    Pos2::new(bar_rect.left(), y - segment.height),
                    Pos2::new(bar_rect.right(), y),
                );
                y -= segment.height;

                let is_hovered = pointer.is_some_and(|p| seg_rect.contains(p));
                if is_hovered {
                    next_hovered = Some((col_idx, segment.score));
                    if clicked {
                        clicked_segment = Some(SegmentRef {
                            column: col_idx,
                            score: segment.score,
                            count: segment.count,
                        });
                    }
                }

                let draw_rect = if is_hovered {
                    seg_rect.translate(Vec2::new(0.0, -2.0))
                } else {
                    seg_rect
                };
                if is_hovered {
                    painter.rect_filled(
                        draw_rect.translate(Vec2::new(0.0, 4.0)),
                        2.0,
                        Color32::from_black_alpha(70),
                    );
                    tooltip = Some((draw_rect, col_idx, segment.score, segment.count));
                }
                painter.rect_filled(draw_rect, 2.0, score_color(segment.score));
                painter.line_segment(
                    [draw_rect.left_top(), draw_rect.right_top()],
                    Stroke::new(1.0, Color32::from_black_alpha(40)),
                );
            }
        }

        painter.text(
            Pos2::new(bar_rect.center().x, baseline + AXIS_LABEL_HEIGHT / 2.0),
            Align2::CENTER_CENTER,
            &column.label,
            FontId::proportional(13.0),
            ui.visuals().weak_text_color(),
        );
    }

    *hovered = next_hovered;

    // Tooltip beside the raised segment, flipped near the right edge so it
    // stays on screen.
    if let Some((seg_rect, col_idx, score, count)) = tooltip {
        let label = &columns[col_idx].label;
        let lines = format!(
            "{label} • Score {score}\n{count} test{}\nClick to view results →",
            if count == 1 { "" } else { "s" }
        );
        let galley = painter.layout_no_wrap(
            lines,
            FontId::proportional(12.0),
            ui.visuals().strong_text_color(),
        );
        let padding = Vec2::new(10.0, 8.0);
        let size = galley.size() + padding * 2.0;
        let on_left = chart::tooltip_on_left(col_idx, columns.len());
        let origin = if on_left {
            Pos2::new(seg_rect.left() - size.x - 8.0, seg_rect.center().y - size.y / 2.0)
        } else {
            Pos2::new(seg_rect.right() + 8.0, seg_rect.center().y - size.y / 2.0)
        };
        let tooltip_rect = Rect::from_min_size(origin, size);
        painter.rect(
            tooltip_rect,
            6.0,
            ui.visuals().extreme_bg_color,
            Stroke::new(1.0, ui.visuals().widgets.inactive.bg_stroke.color),
            egui::StrokeKind::Inside,
        );
        painter.galley(tooltip_rect.min + padding, galley, ui.visuals().text_color());
        ui.ctx().set_cursor_icon(egui::CursorIcon::PointingHand);
    }

    clicked_segment
}
