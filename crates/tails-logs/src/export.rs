use crate::buffer::LogBuffer;

/// Tabs are expanded to this many spaces in exported text
pub const TAB_WIDTH: usize = 4;

/// Serialize the whole buffer as text: one line per entry, each terminated
/// by a newline, tabs expanded to spaces.
pub fn copy_all(buffer: &LogBuffer) -> String {
    let tab = " ".repeat(TAB_WIDTH);
    let mut out = String::with_capacity(buffer.iter().map(|l| l.text.len() + 1).sum());

    for line in buffer.iter() {
        out.push_str(&line.text.replace('\t', &tab));
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_all() {
        let mut buffer = LogBuffer::new(10);
        buffer.push("first\tline".to_string());
        buffer.push("second".to_string());

        assert_eq!(copy_all(&buffer), "first    line\nsecond\n");
    }

    #[test]
    fn test_copy_all_empty() {
        assert_eq!(copy_all(&LogBuffer::new(4)), "");
    }

    #[test]
    fn test_copy_all_only_retained_lines() {
        let mut buffer = LogBuffer::new(2);
        for text in ["a", "b", "c"] {
            buffer.push(text.to_string());
        }
        assert_eq!(copy_all(&buffer), "b\nc\n");
    }
}
