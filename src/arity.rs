//! Top-level argument counting for parameter and type lists.

/// Count the top-level comma-separated items in an argument list.
///
/// Commas nested inside `()`, `<>` or `[]` do not split — template argument
/// lists and function-type parameters stay one item. Empty or
/// whitespace-only input counts as zero arguments. Pure function.
pub fn count_args(list: &str) -> usize {
    let mut depth: i32 = 0;
    let mut count = 0;
    let mut tail = String::new();
    for ch in list.chars() {
        match ch {
            '(' | '<' | '[' => depth += 1,
            ')' | '>' | ']' => depth -= 1,
            ',' if depth == 0 => {
                count += 1;
                tail.clear();
                continue;
            }
            _ => {}
        }
        tail.push(ch);
    }
    if !tail.trim().is_empty() {
        count += 1;
    }
    count
}
