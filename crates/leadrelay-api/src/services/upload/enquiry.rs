use leadrelay_core::constants::ATTACHED_FILES_HEADER;

/// Append the attachment list to an enquiry. Without links the text is returned unchanged.
pub fn merge<I, S>(original: &str, links: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let lines: Vec<String> = links
        .into_iter()
        .map(|link| format!("- {}", link.as_ref()))
        .collect();

    if lines.is_empty() {
        return original.to_string();
    }

    format!("{}\n{}\n{}", original, ATTACHED_FILES_HEADER, lines.join("\n"))
}
