use std::time::{Duration, Instant};

const SUCCESS_FADE: Duration = Duration::from_secs(2);
const FLASH_DURATION: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Success,
    Error,
}

/// Transient status banner. Success notices fade out on their own; info and
/// error text stays until replaced or cleared. Nothing here is fatal to a
/// page, errors just become visible text.
#[derive(Debug, Default)]
pub struct StatusLine {
    message: Option<(String, StatusKind, Option<Instant>)>,
}

impl StatusLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.message = Some((text.into(), StatusKind::Info, None));
    }

    pub fn success(&mut self, text: impl Into<String>, now: Instant) {
        self.message = Some((text.into(), StatusKind::Success, Some(now + SUCCESS_FADE)));
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.message = Some((text.into(), StatusKind::Error, None));
    }

    pub fn clear(&mut self) {
        self.message = None;
    }

    /// Current banner text, dropping an expired success notice.
    pub fn current(&mut self, now: Instant) -> Option<(&str, StatusKind)> {
        if let Some((_, _, Some(expires))) = &self.message {
            if now >= *expires {
                self.message = None;
            }
        }
        self.message
            .as_ref()
            .map(|(text, kind, _)| (text.as_str(), *kind))
    }
}

/// Short error highlight on a field that blocked an action. Purely local;
/// a flash never reaches the network.
#[derive(Debug, Default, Clone, Copy)]
pub struct FieldFlash {
    until: Option<Instant>,
}

impl FieldFlash {
    pub fn trigger(&mut self, now: Instant) {
        self.until = Some(now + FLASH_DURATION);
    }

    pub fn is_active(&self, now: Instant) -> bool {
        self.until.is_some_and(|until| now < until)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_fades_after_two_seconds() {
        let start = Instant::now();
        let mut status = StatusLine::new();
        status.success("Score saved!", start);

        assert!(status.current(start + Duration::from_millis(500)).is_some());
        assert!(status.current(start + Duration::from_secs(2)).is_none());
    }

    #[test]
    fn test_error_persists_until_replaced() {
        let start = Instant::now();
        let mut status = StatusLine::new();
        status.error("Prompt not found");

        let (text, kind) = status
            .current(start + Duration::from_secs(60))
            .expect("error still visible");
        assert_eq!(text, "Prompt not found");
        assert_eq!(kind, StatusKind::Error);

        status.info("Loading next prompt...");
        let (text, kind) = status.current(start).expect("info visible");
        assert_eq!(text, "Loading next prompt...");
        assert_eq!(kind, StatusKind::Info);
    }

    #[test]
    fn test_flash_expires() {
        let start = Instant::now();
        let mut flash = FieldFlash::default();
        assert!(!flash.is_active(start));

        flash.trigger(start);
        assert!(flash.is_active(start + Duration::from_secs(1)));
        assert!(!flash.is_active(start + Duration::from_secs(2)));
    }
}
