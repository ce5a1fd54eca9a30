// ── Status classification ──
//
// The scheduled device only reports free text. Everything the engine
// believes about it comes through `classify`, so keyword tweaks stay in
// one place.

/// Structured reading of a free-text status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusVerdict {
    pub running: bool,
    pub ethernet_active: bool,
}

const RUNNING_KEYWORDS: &[&str] = &[
    "running",
    "online",
    "logged in",
    "authenticated",
    "web interface",
    "dsm",
];

/// Classify a raw status message. Case-insensitive and pure.
///
/// Absence of every keyword yields `running = false`.
pub fn classify(raw: &str) -> StatusVerdict {
    let text = raw.to_lowercase();

    let running = RUNNING_KEYWORDS.iter().any(|k| text.contains(k))
        || (text.contains("status") && text.contains("ok"));

    let ethernet_active =
        text.contains("ethernet:") && text.contains("active") && !text.contains("inactive");

    StatusVerdict {
        running,
        ethernet_active,
    }
}
