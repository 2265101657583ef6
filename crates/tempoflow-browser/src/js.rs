//! DOM script generation
//!
//! Typed query candidates are compiled into small JavaScript probes executed
//! over CDP. All user-controlled strings go through JSON escaping before they
//! are embedded.

use tempoflow_core::{ClickTechnique, QueryCandidate, QueryStrategy};

/// Elements considered clickable by the text strategy.
const CLICKABLE_SELECTOR: &str =
    "button, a, [role=\"button\"], [role=\"link\"], input[type=\"submit\"], input[type=\"button\"]";

fn js_string(value: &str) -> String {
    serde_json::to_string(value).expect("serialization failed")
}

fn scope_expr(scope: Option<&str>) -> String {
    match scope {
        Some(scope) => format!("document.querySelector({})", js_string(scope)),
        None => "document".to_string(),
    }
}

fn css_for(candidate: &QueryCandidate) -> Option<String> {
    match candidate.strategy {
        QueryStrategy::ByTestAttribute => {
            Some(format!("[data-testid=\"{}\"]", candidate.value))
        }
        QueryStrategy::ByStructuralPath => Some(candidate.value.clone()),
        QueryStrategy::ByRole => Some(format!("[role=\"{}\"]", candidate.value)),
        QueryStrategy::ByText => None,
    }
}

/// Expression resolving a candidate to a single element (or null).
#[must_use]
pub fn resolver(candidate: &QueryCandidate) -> String {
    let root = scope_expr(candidate.scope.as_deref());
    match css_for(candidate) {
        Some(css) => format!(
            "(() => {{ const root = {root}; if (!root) return null; \
             return root.querySelector({css}); }})()",
            root = root,
            css = js_string(&css),
        ),
        None => format!(
            "(() => {{ const root = {root}; if (!root) return null; \
             const needle = {needle}.toLowerCase(); \
             for (const el of root.querySelectorAll({clickable})) {{ \
               const t = (el.innerText || el.textContent || el.value || el.getAttribute('aria-label') || '').trim().toLowerCase(); \
               if (t.includes(needle)) return el; \
             }} \
             return null; }})()",
            root = root,
            needle = js_string(&candidate.value),
            clickable = js_string(CLICKABLE_SELECTOR),
        ),
    }
}

/// Expression resolving a candidate to an array of matching elements.
#[must_use]
pub fn collector(candidate: &QueryCandidate) -> String {
    let root = scope_expr(candidate.scope.as_deref());
    match css_for(candidate) {
        Some(css) => format!(
            "(() => {{ const root = {root}; if (!root) return []; \
             return Array.from(root.querySelectorAll({css})); }})()",
            root = root,
            css = js_string(&css),
        ),
        None => format!(
            "(() => {{ const root = {root}; if (!root) return []; \
             const needle = {needle}.toLowerCase(); \
             const hits = []; \
             for (const el of root.querySelectorAll({clickable})) {{ \
               const t = (el.innerText || el.textContent || el.value || el.getAttribute('aria-label') || '').trim().toLowerCase(); \
               if (t.includes(needle)) hits.push(el); \
             }} \
             return hits; }})()",
            root = root,
            needle = js_string(&candidate.value),
            clickable = js_string(CLICKABLE_SELECTOR),
        ),
    }
}

/// Script reporting `{visible, enabled, text}` for a candidate, or null.
#[must_use]
pub fn probe(candidate: &QueryCandidate) -> String {
    format!(
        "(() => {{ const el = {resolver}; \
         if (!el) return null; \
         const rect = el.getBoundingClientRect(); \
         const style = window.getComputedStyle(el); \
         return {{ \
           visible: rect.width > 0 && rect.height > 0 && style.display !== 'none' && style.visibility !== 'hidden', \
           enabled: !el.disabled && style.pointerEvents !== 'none', \
           text: (el.innerText || el.textContent || '').trim().slice(0, 200) \
         }}; }})()",
        resolver = resolver(candidate),
    )
}

/// Script counting the candidate's matches.
#[must_use]
pub fn count(candidate: &QueryCandidate) -> String {
    format!("(() => {{ return {collector}.length; }})()", collector = collector(candidate))
}

/// Script delivering a scripted click technique. Native techniques are driven
/// through the input pipeline instead and do not use this.
#[must_use]
pub fn click(candidate: &QueryCandidate, technique: ClickTechnique) -> String {
    let action = match technique {
        ClickTechnique::Programmatic => "el.click();",
        ClickTechnique::Forced => "el.scrollIntoView({block: 'center'}); el.click();",
        ClickTechnique::SyntheticEvents => {
            "const opts = { bubbles: true, cancelable: true, button: 0 }; \
             el.dispatchEvent(new MouseEvent('mousedown', opts)); \
             el.dispatchEvent(new MouseEvent('mouseup', opts)); \
             el.dispatchEvent(new MouseEvent('click', opts));"
        }
        // Single/Double go through the native input path.
        ClickTechnique::Single | ClickTechnique::Double => "el.click();",
    };
    format!(
        "(() => {{ const el = {resolver}; \
         if (!el) throw new Error('click target gone'); \
         {action} \
         return true; }})()",
        resolver = resolver(candidate),
        action = action,
    )
}

/// Script clearing and filling a form field with proper events.
#[must_use]
pub fn fill(candidate: &QueryCandidate, value: &str) -> String {
    format!(
        "(() => {{ const el = {resolver}; \
         if (!el) throw new Error('fill target gone'); \
         el.focus(); \
         el.value = ''; \
         el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
         el.value = {value}; \
         el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
         el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
         el.blur(); \
         return true; }})()",
        resolver = resolver(candidate),
        value = js_string(value),
    )
}

/// Script reading the visible text of a subtree (or the whole body).
#[must_use]
pub fn inner_text(scope: Option<&str>) -> String {
    let root = match scope {
        Some(scope) => format!("document.querySelector({})", js_string(scope)),
        None => "document.body".to_string(),
    };
    format!(
        "(() => {{ const root = {root}; if (!root) return ''; \
         const t = root.innerText || ''; \
         return t.length > 8000 ? t.substring(0, 8000) : t; }})()",
        root = root,
    )
}

/// Script scrolling the candidate's element into view.
#[must_use]
pub fn scroll_into_view(candidate: &QueryCandidate) -> String {
    format!(
        "(() => {{ const el = {resolver}; \
         if (!el) throw new Error('scroll target gone'); \
         el.scrollIntoView({{behavior: 'smooth', block: 'center'}}); \
         return true; }})()",
        resolver = resolver(candidate),
    )
}

/// Script hiding every matching element at the presentation layer.
#[must_use]
pub fn hide(candidate: &QueryCandidate) -> String {
    format!(
        "(() => {{ const els = {collector}; \
         els.forEach(el => {{ el.style.display = 'none'; }}); \
         return els.length; }})()",
        collector = collector(candidate),
    )
}

/// Attribute used to hand an element from script to the native input path.
pub const TAG_ATTRIBUTE: &str = "data-tf-target";

/// Script tagging the candidate's element for native clicking.
#[must_use]
pub fn tag(candidate: &QueryCandidate) -> String {
    format!(
        "(() => {{ const el = {resolver}; \
         if (!el) throw new Error('click target gone'); \
         el.setAttribute('{attr}', '1'); \
         return true; }})()",
        resolver = resolver(candidate),
        attr = TAG_ATTRIBUTE,
    )
}

/// Script removing every native-click tag.
#[must_use]
pub fn untag() -> String {
    format!(
        "(() => {{ document.querySelectorAll('[{attr}]').forEach(el => el.removeAttribute('{attr}')); return true; }})()",
        attr = TAG_ATTRIBUTE,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_test_attribute_resolver_builds_css() {
        let script = resolver(&QueryCandidate::by_test_attribute("confirm-btn"));
        assert!(script.contains("[data-testid=\\\"confirm-btn\\\"]"));
        assert!(script.contains("document"));
    }

    #[test]
    fn test_text_resolver_escapes_needle() {
        let script = resolver(&QueryCandidate::by_text("Add \"Tempo\""));
        assert!(script.contains("\\\"Tempo\\\""));
        assert!(script.contains("toLowerCase"));
    }

    #[test]
    fn test_scoped_resolver_queries_inside_scope() {
        let script = resolver(
            &QueryCandidate::by_text("GM").within("[data-network-id=\"42429\"]"),
        );
        assert!(script.contains("42429"));
        assert!(script.starts_with("(() => {"));
    }

    #[test]
    fn test_probe_reports_visibility_fields() {
        let script = probe(&QueryCandidate::by_role("button"));
        assert!(script.contains("visible:"));
        assert!(script.contains("enabled:"));
        assert!(script.contains("getBoundingClientRect"));
    }

    #[test]
    fn test_synthetic_click_dispatches_mouse_events() {
        let script = click(
            &QueryCandidate::by_text("GM"),
            ClickTechnique::SyntheticEvents,
        );
        assert!(script.contains("mousedown"));
        assert!(script.contains("mouseup"));
        assert!(script.contains("new MouseEvent('click'"));
    }

    #[test]
    fn test_fill_emits_input_and_change_events() {
        let script = fill(
            &QueryCandidate::by_test_attribute("unlock-password"),
            "secret",
        );
        assert!(script.contains("'input'"));
        assert!(script.contains("'change'"));
        assert!(script.contains("\"secret\""));
    }
}
