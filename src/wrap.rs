use unicode_width::UnicodeWidthStr;

/// Greedy word wrap at `width` display columns. A width of zero disables
/// wrapping. Wide characters take two columns.
///
/// Words are never split: a word longer than `width` sits alone on its line.
pub fn word_wrap(text: &str, width: usize) -> String {
    if width == 0 {
        return text.to_string();
    }

    let mut words = text.split_whitespace();
    let first = match words.next() {
        Some(w) => w,
        None => return String::new(),
    };

    let mut buffer = String::with_capacity(text.len());
    buffer.push_str(first);
    let mut space_left = width as isize - first.width() as isize;

    for word in words {
        let len = word.width() as isize;
        if len + 1 > space_left {
            buffer.push('\n');
            buffer.push_str(word);
            space_left = width as isize - len;
        } else {
            buffer.push(' ');
            buffer.push_str(word);
            space_left -= len + 1;
        }
    }

    buffer
}

/// Number of newline-delimited segments. An empty text still counts as one.
pub fn count_lines(text: &str) -> usize {
    text.split('\n').count()
}
