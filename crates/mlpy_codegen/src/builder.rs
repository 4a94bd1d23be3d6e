//! Cursor-tracking output buffer, grounded on `oxc_codegen`'s `Codegen`
//! buffer: a plain `String` the generator appends to, paired with a
//! running `(line, column)` cursor so every write can be attributed a
//! precise emitted position for the source map without a second pass
//! over the output.

use mlpy_sourcemap::Position;

pub struct CodeBuilder {
    buf: String,
    line: u32,
    column: u32,
    indent: u32,
}

impl CodeBuilder {
    pub fn new() -> Self {
        Self { buf: String::new(), line: 1, column: 0, indent: 0 }
    }

    pub fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    pub fn indent(&mut self) {
        self.indent += 1;
    }

    pub fn dedent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    pub fn print_indent(&mut self) {
        for _ in 0..self.indent {
            self.print_str("    ");
        }
    }

    pub fn print_str(&mut self, s: &str) {
        for ch in s.chars() {
            if ch == '\n' {
                self.line += 1;
                self.column = 0;
            } else {
                self.column += 1;
            }
        }
        self.buf.push_str(s);
    }

    pub fn newline(&mut self) {
        self.print_str("\n");
    }

    pub fn finish(self) -> String {
        self.buf
    }
}

impl Default for CodeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn tracks_line_and_column_across_newlines() {
        let mut builder = CodeBuilder::new();
        builder.print_str("abc");
        assert_eq!(builder.position(), Position::new(1, 3));
        builder.newline();
        assert_eq!(builder.position(), Position::new(2, 0));
        builder.print_str("xy");
        assert_eq!(builder.position(), Position::new(2, 2));
    }

    #[test]
    fn indentation_emits_four_spaces_per_level() {
        let mut builder = CodeBuilder::new();
        builder.indent();
        builder.indent();
        builder.print_indent();
        builder.print_str("pass");
        assert_eq!(builder.finish(), "        pass");
    }
}
