use eframe::egui::{self, Color32, Pos2, Rect, Sense, Stroke, Ui, Vec2};
use scorer_api::{ApiClient, ApiError};
use scorer_audio::{DecodedAudio, Player, Waveform, decode_bytes};
use scorer_core::RequestTracker;

use crate::fetch::{self, Inflight};

const STRIP_HEIGHT: f32 = 72.0;
const MIN_BAR_AMP: f32 = 0.04;

fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "0:00".to_string();
    }
    let mins = (seconds / 60.0).floor() as u64;
    let secs = (seconds % 60.0).floor() as u64;
    format!("{mins}:{secs:02}")
}

/// Waveform strip with playback. The audio URL is fetched once per source
/// change and decoded into a playable buffer plus a fixed-resolution bar
/// reduction; decode failures silently fall back to a flat strip.
///
/// Resource discipline: each source change releases the previous buffer and
/// orphans any pending decode before starting the next one, so buffers
/// created always equals buffers released plus the one currently loaded.
pub struct WaveformView {
    autoplay_on_source_change: bool,
    source: Option<String>,
    tracker: RequestTracker,
    inflight: Option<Inflight<DecodedAudio>>,
    waveform: Option<Waveform>,
    loaded: Option<DecodedAudio>,
    player: Option<Player>,
    device_failed: bool,
    autoplay_pending: bool,
    duration_secs: f64,
    buffers_created: usize,
    buffers_released: usize,
}

impl WaveformView {
    pub fn new(autoplay_on_source_change: bool) -> Self {
        Self {
            autoplay_on_source_change,
            source: None,
            tracker: RequestTracker::new(),
            inflight: None,
            waveform: None,
            loaded: None,
            player: None,
            device_failed: false,
            autoplay_pending: false,
            duration_secs: 0.0,
            buffers_created: 0,
            buffers_released: 0,
        }
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Point the view at a new audio URL (or nothing). A no-op when the URL
    /// is unchanged; otherwise the previous buffer, pending decode and
    /// playback are all released before the new fetch starts.
    pub fn set_source(&mut self, url: Option<String>, api: &ApiClient, ctx: &egui::Context) {
        if url == self.source {
            return;
        }
        let api = api.clone();
        // The job only runs when a source is set, so the empty fallback is
        // never fetched.
        let job_url = url.clone().unwrap_or_default();
        self.begin_load(url, ctx, move || {
            let bytes = api.fetch_audio(&job_url)?;
            decode_bytes(bytes).map_err(|err| ApiError::Service(err.to_string()))
        });
    }

    /// Source-change core, with the loader injected so the lifecycle is
    /// testable without a backend or an output device.
    fn begin_load<F>(&mut self, url: Option<String>, ctx: &egui::Context, job: F)
    where
        F: FnOnce() -> Result<DecodedAudio, ApiError> + Send + 'static,
    {
        self.release_current();
        self.tracker.invalidate();
        self.inflight = None;
        self.source = url;
        self.autoplay_pending = self.autoplay_on_source_change;

        if self.source.is_some() {
            self.inflight = Some(fetch::spawn(self.tracker.begin(), ctx, job));
        }
    }

    #[cfg(test)]
    fn set_source_with_loader<F>(&mut self, url: Option<String>, ctx: &egui::Context, job: F)
    where
        F: FnOnce() -> Result<DecodedAudio, ApiError> + Send + 'static,
    {
        if url == self.source {
            return;
        }
        self.begin_load(url, ctx, job);
    }

    fn release_current(&mut self) {
        if self.loaded.take().is_some() {
            self.buffers_released += 1;
        }
        if let Some(player) = &mut self.player {
            player.clear();
        }
        self.waveform = None;
        self.duration_secs = 0.0;
        self.autoplay_pending = false;
    }

    /// Explicit teardown for page leave; the same release path covers drop.
    pub fn teardown(&mut self) {
        self.tracker.invalidate();
        self.inflight = None;
        self.release_current();
        self.source = None;
    }

    fn ensure_player(&mut self) {
        if self.player.is_some() || self.device_failed {
            return;
        }
        match Player::start() {
            Ok(player) => self.player = Some(player),
            Err(err) => {
                tracing::warn!("audio output unavailable: {err}");
                self.device_failed = true;
            }
        }
    }

    /// Drain the decode result and playback status. Call once per frame.
    pub fn poll(&mut self, ctx: &egui::Context) {
        if let Some((ticket, result)) = fetch::take_completed(&mut self.inflight) {
            if self.tracker.is_current(ticket) {
                match result {
                    Ok(audio) => {
                        self.waveform = Some(Waveform::from_audio(&audio));
                        self.duration_secs = audio.duration_secs();
                        self.buffers_created += 1;
                        self.ensure_player();
                        if let Some(player) = &mut self.player {
                            if let Err(err) = player.load(&audio) {
                                tracing::warn!("failed to load clip: {err}");
                            }
                        }
                        self.loaded = Some(audio);
                        // Auto-play fires once, the first time the duration
                        // becomes known after a source change.
                        if self.autoplay_pending {
                            self.autoplay_pending = false;
                            if let Some(player) = &mut self.player {
                                player.play_from_start();
                            }
                        }
                    }
                    Err(err) => {
                        tracing::debug!("audio fetch/decode failed, using placeholder: {err}");
                        self.waveform = Some(Waveform::placeholder());
                        self.duration_secs = 0.0;
                        self.autoplay_pending = false;
                    }
                }
            }
            // A stale buffer is dropped here without ever being retained.
        }

        if let Some(player) = &mut self.player {
            player.poll();
            if player.is_playing() {
                ctx.request_repaint();
            }
        }
    }

    fn progress(&self) -> f32 {
        self.player.as_ref().map(|p| p.progress()).unwrap_or(0.0)
    }

    fn is_playing(&self) -> bool {
        self.player.as_ref().is_some_and(|p| p.is_playing())
    }

    pub fn ui(&mut self, ui: &mut Ui) {
        if self.source.is_none() {
            ui.group(|ui| {
                ui.weak("No audio");
            });
            return;
        }

        ui.group(|ui| {
            ui.horizontal(|ui| {
                let label = if self.is_playing() { "Replay" } else { "▶ Play" };
                if ui.button(label).clicked() {
                    self.ensure_player();
                    if let Some(player) = &mut self.player {
                        player.play_from_start();
                    }
                }
                let position = self
                    .player
                    .as_ref()
                    .map(|p| p.position_secs())
                    .unwrap_or(0.0);
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.weak(format!(
                        "{} / {}",
                        format_time(position),
                        format_time(self.duration_secs)
                    ));
                });
            });

            let width = ui.available_width();
            let (rect, response) =
                ui.allocate_exact_size(Vec2::new(width, STRIP_HEIGHT), Sense::click());
            self.paint_strip(ui, rect);

            if response.clicked() {
                if let Some(pos) = response.interact_pointer_pos() {
                    let fraction = ((pos.x - rect.left()) / rect.width()).clamp(0.0, 1.0);
                    if let Some(player) = &mut self.player {
                        player.seek_fraction(fraction);
                    }
                }
            }
            if response.hovered() {
                ui.ctx().set_cursor_icon(egui::CursorIcon::PointingHand);
            }
        });
    }

    fn paint_strip(&self, ui: &Ui, rect: Rect) {
        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, 6.0, Color32::from_rgba_unmultiplied(255, 255, 255, 10));

        let placeholder = Waveform::placeholder();
        let bars = self
            .waveform
            .as_ref()
            .unwrap_or(&placeholder)
            .bars();

        let height = rect.height();
        let bar_width = rect.width() / bars.len() as f32;
        let progress = self.progress();
        let played_width = rect.width() * progress;

        let muted = Color32::from_rgba_unmultiplied(148, 163, 184, 115);
        let bright = Color32::from_rgba_unmultiplied(255, 255, 255, 250);
        let glow = Color32::from_rgba_unmultiplied(255, 255, 255, 40);

        let bar_rect = |i: usize, amp: f32| {
            let amp = amp.max(MIN_BAR_AMP);
            let x = rect.left() + i as f32 * bar_width + bar_width * 0.15;
            let w = (bar_width * 0.7).max(1.0);
            let h = amp.min(1.0) * (height - 10.0);
            let y = rect.top() + (height - h) / 2.0;
            Rect::from_min_size(Pos2::new(x, y), Vec2::new(w, h))
        };

        // Full waveform in the muted tone.
        for (i, &amp) in bars.iter().enumerate() {
            painter.rect_filled(bar_rect(i, amp), 1.0, muted);
        }

        // Played portion: clipped to the progress fraction, brighter, with a
        // soft glow behind each bar.
        let played_rect = Rect::from_min_max(
            rect.min,
            Pos2::new(rect.left() + played_width, rect.bottom()),
        );
        let clipped = ui.painter_at(played_rect.intersect(rect));
        for (i, &amp) in bars.iter().enumerate() {
            let r = bar_rect(i, amp);
            clipped.rect_filled(r.expand(2.0), 3.0, glow);
            clipped.rect_filled(r, 1.0, bright);
        }

        // 1px playhead.
        let playhead_x = rect.left() + played_width.clamp(0.0, rect.width());
        painter.line_segment(
            [
                Pos2::new(playhead_x, rect.top()),
                Pos2::new(playhead_x, rect.bottom()),
            ],
            Stroke::new(1.0, Color32::from_rgba_unmultiplied(255, 255, 255, 230)),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    fn drain(view: &mut WaveformView, ctx: &egui::Context) {
        for _ in 0..200 {
            view.poll(ctx);
            if view.inflight.is_none() {
                return;
            }
            thread::sleep(Duration::from_millis(5));
        }
        panic!("decode never completed");
    }

    fn tone() -> DecodedAudio {
        DecodedAudio::new(vec![0.5; 4800], 48000, 1)
    }

    #[test]
    fn test_source_change_decodes_and_reduces() {
        let ctx = egui::Context::default();
        let mut view = WaveformView::new(false);

        view.set_source_with_loader(Some("/api/audio/a".to_string()), &ctx, || Ok(tone()));
        drain(&mut view, &ctx);

        assert!(view.waveform.is_some());
        assert!(view.duration_secs > 0.0);
        assert_eq!(view.buffers_created, 1);
    }

    #[test]
    fn test_decode_failure_degrades_to_placeholder() {
        let ctx = egui::Context::default();
        let mut view = WaveformView::new(false);

        view.set_source_with_loader(Some("/api/audio/bad".to_string()), &ctx, || {
            Err(ApiError::Service("undecodable".to_string()))
        });
        drain(&mut view, &ctx);

        assert_eq!(view.waveform, Some(Waveform::placeholder()));
        assert_eq!(view.duration_secs, 0.0);
        assert_eq!(view.buffers_created, 0);
    }

    #[test]
    fn test_buffers_balance_across_source_changes() {
        let ctx = egui::Context::default();
        let mut view = WaveformView::new(false);

        for i in 0..5 {
            view.set_source_with_loader(Some(format!("/api/audio/{i}")), &ctx, || Ok(tone()));
            drain(&mut view, &ctx);
        }
        view.teardown();

        assert_eq!(view.buffers_created, 5);
        assert_eq!(view.buffers_released, 5);
        assert!(view.inflight.is_none());
        assert!(view.loaded.is_none());
    }

    #[test]
    fn test_stale_decode_is_discarded() {
        let ctx = egui::Context::default();
        let mut view = WaveformView::new(false);

        // First load is slow; the source changes before it completes.
        view.set_source_with_loader(Some("/api/audio/slow".to_string()), &ctx, || {
            thread::sleep(Duration::from_millis(50));
            Ok(DecodedAudio::new(vec![0.9; 48000], 48000, 1))
        });
        view.set_source_with_loader(Some("/api/audio/fast".to_string()), &ctx, || Ok(tone()));

        drain(&mut view, &ctx);
        thread::sleep(Duration::from_millis(80));
        view.poll(&ctx);

        // Only the second source's buffer was ever applied.
        assert_eq!(view.buffers_created, 1);
        assert_eq!(view.duration_secs, tone().duration_secs());
    }

    #[test]
    fn test_same_source_is_a_no_op() {
        let ctx = egui::Context::default();
        let mut view = WaveformView::new(false);

        view.set_source_with_loader(Some("/api/audio/a".to_string()), &ctx, || Ok(tone()));
        drain(&mut view, &ctx);
        view.set_source_with_loader(Some("/api/audio/a".to_string()), &ctx, || {
            panic!("unchanged source must not reload")
        });

        assert!(view.inflight.is_none());
        assert_eq!(view.buffers_created, 1);
        assert_eq!(view.buffers_released, 0);
    }

    #[test]
    fn test_autoplay_intent_clears_after_first_load() {
        let ctx = egui::Context::default();
        let mut view = WaveformView::new(true);

        view.set_source_with_loader(Some("/api/audio/a".to_string()), &ctx, || Ok(tone()));
        assert!(view.autoplay_pending);
        drain(&mut view, &ctx);
        // No output device in tests; the intent is still consumed exactly once.
        assert!(!view.autoplay_pending);
    }
}
