/// Lowercases and trims `input`, collapses every run of characters outside
/// `[a-z0-9]` into a single `-`, then trims leading and trailing dashes.
///
/// Returns an empty string when the input has no ASCII alphanumerics; callers
/// must reject that before persisting.
pub fn slugify(input: &str) -> String {
    let lowered = input.trim().to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut pending_dash = false;

    for c in lowered.chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c);
        } else {
            pending_dash = true;
        }
    }

    out
}
