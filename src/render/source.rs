use super::shaders::ShaderError;
use std::fs;
use std::path::Path;

const MARKER: &str = "#shader";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Vertex,
    Fragment,
}

/// Vertex and fragment sources split out of a single tagged shader file.
///
/// ```text
/// #shader vertex
/// ...
/// #shader fragment
/// ...
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderSource {
    pub vertex: String,
    pub fragment: String,
}

impl ShaderSource {
    pub fn new(vertex: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self {
            vertex: vertex.into(),
            fragment: fragment.into(),
        }
    }

    /// Splits `text` on `#shader` marker lines. Lines before the first marker
    /// are dropped and every kept line gets a `\n` terminator.
    pub fn parse(text: &str) -> Self {
        let mut source = Self::default();
        let mut section = Section::None;

        for line in text.lines() {
            if line.contains(MARKER) {
                if line.contains("vertex") {
                    section = Section::Vertex;
                }
                if line.contains("fragment") {
                    section = Section::Fragment;
                }
                continue;
            }

            let buffer = match section {
                Section::None => continue,
                Section::Vertex => &mut source.vertex,
                Section::Fragment => &mut source.fragment,
            };
            buffer.push_str(line);
            buffer.push('\n');
        }

        source
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ShaderError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ShaderError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let source = Self::parse(&text);
        log::debug!(
            "Parsed {}: vertex {} bytes, fragment {} bytes",
            path.display(),
            source.vertex.len(),
            source.fragment.len()
        );
        Ok(source)
    }
}
