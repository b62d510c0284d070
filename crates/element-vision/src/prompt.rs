/// System instruction for locating a single element.
pub fn get_locate_instructions() -> &'static str {
    "You locate UI elements in mobile and desktop app screenshots.

Reply with ONLY a JSON object, no markdown and no extra text:
{\"found\": true|false, \"x\": <number>, \"y\": <number>, \"confidence\": <number>, \"description\": \"<string>\"}

Rules:
- x and y are the horizontal and vertical position of the CENTER of the element, as a percentage (0-100) of the image width and height.
- confidence is between 0 and 1 and reflects how sure you are that this is the requested element.
- description briefly says what the element looks like and where it is, so it can be found again later.
- If the element is not visible, reply {\"found\": false, \"x\": 0, \"y\": 0, \"confidence\": 0, \"description\": \"<why>\"}."
}

/// System instruction for describing the current screen.
pub fn get_describe_instructions() -> &'static str {
    "You describe app screenshots for an automation agent. In a few sentences, say which app and \
     screen is shown, what state it is in (dialogs, keyboard, loading), and list the main \
     interactive controls with their approximate positions."
}

/// User prompt for locating `description`, with an optional remembered appearance.
pub fn build_locate_prompt(description: &str, hint: Option<&str>) -> String {
    match hint.map(str::trim).filter(|h| !h.is_empty()) {
        Some(hint) => format!(
            "Find this element: {description}\nLast time it was seen it looked like: {hint}"
        ),
        None => format!("Find this element: {description}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_prompt_includes_hint() {
        let prompt = build_locate_prompt("post button", Some("blue pill, bottom right"));
        assert!(prompt.contains("post button"));
        assert!(prompt.contains("blue pill, bottom right"));
    }

    #[test]
    fn test_blank_hint_is_ignored() {
        assert_eq!(
            build_locate_prompt("search field", Some("  ")),
            "Find this element: search field"
        );
    }
}
