use crate::PreprocessError;
use std::fs::File;
use std::io::Read;
use std::path::Path;

pub(crate) trait SourceOutput {
    fn push_line(&mut self, str: &str);
}

impl SourceOutput for String {
    fn push_line(&mut self, str: &str) {
        self.push_str(str);
        self.push('\n');
    }
}

pub(crate) fn read_file(path: impl AsRef<Path>) -> Result<String, PreprocessError> {
    let path = path.as_ref();
    let mut source = String::new();
    File::open(path)
        .and_then(|mut f| f.read_to_string(&mut source))
        .map_err(|e| PreprocessError::IOError(path.to_path_buf(), e))?;
    Ok(source)
}

/// Replace comments with whitespace. Newlines inside block comments are kept so
/// line numbers stay stable.
pub(crate) fn strip_comments(source: &str) -> Result<String, PreprocessError> {
    let mut output = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut line = 1;

    while let Some(c) = chars.next() {
        match (c, chars.peek()) {
            ('/', Some('/')) => {
                while let Some(&next) = chars.peek() {
                    if next == '\n' {
                        break;
                    }
                    chars.next();
                }
                output.push(' ');
            }
            ('/', Some('*')) => {
                let start = line;
                chars.next();
                let mut closed = false;
                while let Some(next) = chars.next() {
                    if next == '\n' {
                        line += 1;
                        output.push('\n');
                    } else if next == '*' && chars.peek() == Some(&'/') {
                        chars.next();
                        closed = true;
                        break;
                    }
                }
                if !closed {
                    return Err(PreprocessError::UnterminatedComment(start));
                }
                output.push(' ');
            }
            ('\n', _) => {
                line += 1;
                output.push('\n');
            }
            _ => output.push(c),
        }
    }

    Ok(output)
}

/// Join lines ending in a backslash with the following line.
///
/// Every joined line is followed by enough blank lines to keep the total line count.
pub(crate) fn join_continuations(source: &str) -> String {
    let mut output = String::with_capacity(source.len());
    let mut pending = String::new();
    let mut swallowed = 0;

    for line in source.lines() {
        if let Some(stripped) = line.strip_suffix('\\') {
            pending.push_str(stripped);
            swallowed += 1;
            continue;
        }

        pending.push_str(line);
        output.push_line(&pending);
        pending.clear();
        for _ in 0..swallowed {
            output.push_line("");
        }
        swallowed = 0;
    }

    if !pending.is_empty() || swallowed > 0 {
        output.push_line(&pending);
        for _ in 1..swallowed {
            output.push_line("");
        }
    }

    output
}
