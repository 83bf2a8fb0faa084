//! Line-oriented assembly text emission.
//!
//! The emitter accumulates output lines and renders them once at the end:
//! labels sit at column 0 on their own line, instructions indent by a
//! fixed margin, and optional comments align to a fixed column. Rendering
//! twice over the same lines is byte-identical, which the determinism
//! tests rely on.

use std::fmt::Write;

const INSTR_INDENT: usize = 8;
const COMMENT_COLUMN: usize = 40;

#[derive(Debug)]
enum Line {
    Label(String),
    Instr { text: String, comment: Option<String> },
    Blank,
}

/// Accumulates FRISC assembly lines.
#[derive(Debug, Default)]
pub struct Emitter {
    lines: Vec<Line>,
}

impl Emitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits a label at column 0.
    pub fn label(&mut self, label: impl Into<String>) {
        self.lines.push(Line::Label(label.into()));
    }

    /// Emits an indented instruction.
    pub fn instr(&mut self, text: impl Into<String>) {
        self.lines.push(Line::Instr { text: text.into(), comment: None });
    }

    /// Emits an instruction with an aligned trailing comment.
    pub fn instr_comment(&mut self, text: impl Into<String>, comment: impl Into<String>) {
        self.lines.push(Line::Instr {
            text: text.into(),
            comment: Some(comment.into()),
        });
    }

    /// Emits an empty separator line.
    pub fn blank(&mut self) {
        self.lines.push(Line::Blank);
    }

    /// Renders the accumulated lines as the final assembly text.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            match line {
                Line::Label(label) => writeln!(out, "{}", label).unwrap(),
                Line::Instr { text, comment: None } => {
                    writeln!(out, "{:indent$}{}", "", text, indent = INSTR_INDENT).unwrap();
                }
                Line::Instr { text, comment: Some(comment) } => {
                    let code = format!("{:indent$}{}", "", text, indent = INSTR_INDENT);
                    if code.len() >= COMMENT_COLUMN {
                        writeln!(out, "{} ; {}", code, comment).unwrap();
                    } else {
                        writeln!(out, "{:width$}; {}", code, comment, width = COMMENT_COLUMN)
                            .unwrap();
                    }
                }
                Line::Blank => out.push('\n'),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_sit_at_column_zero() {
        let mut e = Emitter::new();
        e.label("F_MAIN");
        e.instr("RET");
        assert_eq!(e.render(), "F_MAIN\n        RET\n");
    }

    #[test]
    fn comments_align_to_a_fixed_column() {
        let mut e = Emitter::new();
        e.instr_comment("MOVE %D 0, R0", "result");
        let out = e.render();
        let semicolon = out.find(';').unwrap();
        assert_eq!(semicolon, 40);
        assert!(out.contains("; result"));
    }

    #[test]
    fn render_is_deterministic() {
        let mut e = Emitter::new();
        e.label("L_IF_0");
        e.instr("CMP R0, %D 0");
        e.blank();
        assert_eq!(e.render(), e.render());
    }
}
