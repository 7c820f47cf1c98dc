//! Indentation-aware line buffer.

const INDENT: &str = "  ";

pub(crate) struct Emitter {
    lines: Vec<String>,
    depth: usize,
}

impl Emitter {
    pub fn new() -> Self {
        Self {
            lines: Vec::new(),
            depth: 0,
        }
    }

    /// Append one line at the current depth.
    pub fn line(&mut self, text: impl AsRef<str>) {
        self.lines
            .push(format!("{}{}", INDENT.repeat(self.depth), text.as_ref()));
    }

    /// Append an empty line unless the previous line is blank or opens a
    /// block.
    pub fn blank(&mut self) {
        if self
            .lines
            .last()
            .is_some_and(|l| !l.is_empty() && !l.ends_with('{'))
        {
            self.lines.push(String::new());
        }
    }

    /// Append a line and indent everything after it.
    pub fn open(&mut self, text: impl AsRef<str>) {
        self.line(text);
        self.depth += 1;
    }

    /// Close a block opened with [`Emitter::open`]. A trailing blank line
    /// inside the block is dropped.
    pub fn close(&mut self, text: impl AsRef<str>) {
        if self.lines.last().is_some_and(String::is_empty) {
            self.lines.pop();
        }
        self.depth = self.depth.saturating_sub(1);
        self.line(text);
    }

    pub fn finish(self) -> String {
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }
}
