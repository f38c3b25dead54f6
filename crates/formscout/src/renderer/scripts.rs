// Copyright 2026 Formscout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Page scripts evaluated inside rendered documents.
//!
//! Each script is a `function (doc) { ... }` applied either to the top-level
//! `document` or to the `contentDocument` of one `<iframe>`. Scripts never
//! return `null`/`undefined`; the frame wrapper reports inaccessible frames as
//! `{ok: false}` instead of throwing.

use serde::Deserialize;

/// The fixed set of scripts the detector and prober run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageScript {
    /// `document.readyState`.
    ReadyState,
    /// Number of `form` elements with at least one `input` descendant.
    CountEffectiveForms,
    /// Resolved `href` of every anchor, in document order.
    CollectLinks,
    /// `src`/`srcdoc` attributes of every `iframe`, in document order.
    ListFrames,
}

impl PageScript {
    /// Short name used in logs and errors.
    pub fn name(self) -> &'static str {
        match self {
            PageScript::ReadyState => "ready_state",
            PageScript::CountEffectiveForms => "count_effective_forms",
            PageScript::CollectLinks => "collect_links",
            PageScript::ListFrames => "list_frames",
        }
    }

    fn body(self) -> &'static str {
        match self {
            PageScript::ReadyState => "function (doc) { return doc.readyState; }",
            PageScript::CountEffectiveForms => {
                "function (doc) {
                    var count = 0;
                    doc.querySelectorAll('form').forEach(function (form) {
                        if (form.querySelector('input')) { count += 1; }
                    });
                    return count;
                }"
            }
            PageScript::CollectLinks => {
                "function (doc) {
                    return Array.from(doc.querySelectorAll('a[href]')).map(function (a) {
                        return String(a.href || '');
                    });
                }"
            }
            PageScript::ListFrames => {
                "function (doc) {
                    return Array.from(doc.querySelectorAll('iframe')).map(function (f) {
                        return { src: f.getAttribute('src') || '', srcdoc: f.getAttribute('srcdoc') || '' };
                    });
                }"
            }
        }
    }

    /// Expression evaluating the script against the top-level document.
    pub fn on_page(self) -> String {
        format!("({})(document)", self.body())
    }

    /// Expression evaluating the script against the document of the
    /// `index`-th `iframe`, wrapped as `{ok, value}`.
    pub fn in_frame(self, index: usize) -> String {
        format!(
            "(function () {{
                try {{
                    var frame = document.querySelectorAll('iframe')[{index}];
                    var doc = frame ? frame.contentDocument : null;
                    if (!doc) {{ return {{ ok: false }}; }}
                    return {{ ok: true, value: ({body})(doc) }};
                }} catch (e) {{
                    return {{ ok: false }};
                }}
            }})()",
            body = self.body()
        )
    }
}

#[derive(Debug, Deserialize)]
struct FrameOutcome {
    ok: bool,
    #[serde(default)]
    value: serde_json::Value,
}

/// Unwrap the `{ok, value}` envelope of [`PageScript::in_frame`].
///
/// Returns `None` when the frame's document could not be reached.
pub fn unwrap_frame_result(raw: serde_json::Value) -> Option<serde_json::Value> {
    let outcome: FrameOutcome = serde_json::from_value(raw).ok()?;
    outcome.ok.then_some(outcome.value)
}

/// `src`/`srcdoc` attributes of one iframe; empty strings mean absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FrameInfo {
    #[serde(default)]
    pub src: String,
    #[serde(default)]
    pub srcdoc: String,
}
