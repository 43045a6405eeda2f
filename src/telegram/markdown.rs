/// Escapes text for Telegram MarkdownV2.
/// Characters to escape: \ _ * [ ] ( ) ~ ` > # + - = | { } . !
pub fn escape_markdown_v2(text: &str) -> String {
    let mut escaped_text = String::with_capacity(text.len());
    for char_to_escape in text.chars() {
        match char_to_escape {
            '\\' | '_' | '*' | '[' | ']' | '(' | ')' | '~' | '`' | '>' | '#' | '+' | '-'
            | '=' | '|' | '{' | '}' | '.' | '!' => {
                escaped_text.push('\\');
                escaped_text.push(char_to_escape);
            }
            _ => {
                escaped_text.push(char_to_escape);
            }
        }
    }
    escaped_text
}
