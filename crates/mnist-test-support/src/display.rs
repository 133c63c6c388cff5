use mnist_session::TextDisplay;

/// Display that keeps every flushed frame.
#[derive(Debug, Default)]
pub struct RecordingDisplay {
    pending: Vec<(usize, String)>,
    frames: Vec<Vec<String>>,
}

impl RecordingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> &[Vec<String>] {
        &self.frames
    }

    pub fn last_frame(&self) -> Option<&[String]> {
        self.frames.last().map(Vec::as_slice)
    }
}

impl TextDisplay for RecordingDisplay {
    fn clear(&mut self) {
        self.pending.clear();
    }

    fn draw_text(&mut self, row: usize, text: &str) {
        self.pending.push((row, text.to_string()));
    }

    fn flush(&mut self) {
        let mut rows = self.pending.clone();
        rows.sort_by_key(|(row, _)| *row);
        self.frames.push(rows.into_iter().map(|(_, text)| text).collect());
    }
}
