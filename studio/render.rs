/// Template renderer for the studio page.
///
/// The studio serves a single HTML template (`studio/assets/studio.html`) with
/// placeholder tokens like `{{TOKEN}}`, loaded at compile time. Handlers fill
/// the tokens they know about through a closure; anything left over is blanked
/// so raw `{{TOKEN}}` strings never reach the browser.

const TEMPLATE: &str = include_str!("assets/studio.html");

/// Renders the studio page.
///
/// `training_running` is injected as the `TRAINING_RUNNING` JS variable; it
/// decides whether the page opens the SSE stream straight away.
pub fn render_page<F>(training_running: bool, fill: F) -> String
where
    F: FnOnce(String) -> String,
{
    let html = TEMPLATE.replace("{{TRAINING_RUNNING}}", if training_running { "true" } else { "false" });
    blank_remaining(fill(html))
}

/// Replaces any `{{TOKEN}}` that wasn't already substituted with an empty
/// string.
fn blank_remaining(mut html: String) -> String {
    while let Some(start) = html.find("{{") {
        if let Some(end) = html[start..].find("}}") {
            let abs_end = start + end + 2;
            html.replace_range(start..abs_end, "");
        } else {
            break;
        }
    }
    html
}

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leftover_tokens_are_blanked() {
        assert_eq!(blank_remaining("a{{X}}b{{Y}}c".to_string()), "abc");
        assert_eq!(blank_remaining("open {{ only".to_string()), "open {{ only");
    }

    #[test]
    fn page_has_running_flag_and_no_tokens() {
        let html = render_page(true, |t| t.replace("{{FLASH}}", "hello"));
        assert!(html.contains("const TRAINING_RUNNING = true;"));
        assert!(html.contains("hello"));
        assert!(!html.contains("{{"));
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(html_escape("<a href=\"x\">&</a>"), "&lt;a href=&quot;x&quot;&gt;&amp;&lt;/a&gt;");
    }
}
