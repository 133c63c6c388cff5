//! Small character-grid display: the sink and the fixed screens.

/// Text rows available on the device (128x64 OLED with a 6x8 font and
/// spacing between rows).
pub const SCREEN_ROWS: usize = 5;
/// Characters per row on the same device.
pub const SCREEN_COLUMNS: usize = 21;

/// Synchronous, fire-and-forget display driver.
pub trait TextDisplay {
    fn clear(&mut self);

    fn draw_text(&mut self, row: usize, text: &str);

    /// Push the drawn frame to the device.
    fn flush(&mut self);
}

impl<D: TextDisplay + ?Sized> TextDisplay for &mut D {
    fn clear(&mut self) {
        (**self).clear()
    }

    fn draw_text(&mut self, row: usize, text: &str) {
        (**self).draw_text(row, text)
    }

    fn flush(&mut self) {
        (**self).flush()
    }
}

impl<D: TextDisplay + ?Sized> TextDisplay for Box<D> {
    fn clear(&mut self) {
        (**self).clear()
    }

    fn draw_text(&mut self, row: usize, text: &str) {
        (**self).draw_text(row, text)
    }

    fn flush(&mut self) {
        (**self).flush()
    }
}

/// Display that draws nothing, for headless runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDisplay;

impl TextDisplay for NullDisplay {
    fn clear(&mut self) {}

    fn draw_text(&mut self, _row: usize, _text: &str) {}

    fn flush(&mut self) {}
}

/// One full frame of at most [`SCREEN_ROWS`] lines of at most
/// [`SCREEN_COLUMNS`] characters.
///
/// Lines past either bound are cut when pushed, so a `Screen` always fits
/// the device.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Screen {
    lines: Vec<String>,
}

impl Screen {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line; ignored once the screen already has [`SCREEN_ROWS`].
    pub fn line(mut self, text: impl AsRef<str>) -> Self {
        if self.lines.len() < SCREEN_ROWS {
            self.lines.push(text.as_ref().chars().take(SCREEN_COLUMNS).collect());
        }
        self
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Splash shown while the classifier loads.
    pub fn boot() -> Self {
        Self::new().line("MNIST CNN").line("Probs mode %").line("Starting...")
    }

    /// Shown once the classifier is ready for records.
    pub fn ready() -> Self {
        Self::new().line("READY").line("Send CSV line:").line("label,p1,...,p784")
    }

    /// Terminal screen after a failed initialization.
    pub fn init_failed(code: i32) -> Self {
        Self::new().line("ERROR!").line("Init failed").line(format!("code {code}"))
    }

    /// Clear the device, draw every line and flush.
    pub fn render<D: TextDisplay + ?Sized>(&self, display: &mut D) {
        display.clear();
        for (row, text) in self.lines.iter().enumerate() {
            display.draw_text(row, text);
        }
        display.flush();
    }
}
