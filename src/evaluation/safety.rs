use regex::Regex;

const PII_PATTERNS: &[&str] = &[
    // SSN-like
    r"\b\d{3}-\d{2}-\d{4}\b",
    // card-number-like
    r"\b\d{4}[\s-]?\d{4}[\s-]?\d{4}[\s-]?\d{4}\b",
    r"(?i)\b[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}\b",
    // phone
    r"\(\d{3}\)\s*\d{3}-\d{4}",
];

const JAILBREAK_PHRASES: &[&str] = &[
    "ignore previous instructions",
    "act as if",
    "pretend you are",
    "roleplay as",
    "forget everything",
    "disregard the above",
];

/// Binary PII and prompt-injection detectors.
pub struct SafetyScanner {
    pii: Vec<Regex>,
}

impl SafetyScanner {
    pub fn new() -> Result<Self, regex::Error> {
        let pii = PII_PATTERNS
            .iter()
            .map(|pattern| Regex::new(pattern))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { pii })
    }

    /// Checked against the response text.
    pub fn contains_pii(&self, text: &str) -> bool {
        self.pii.iter().any(|pattern| pattern.is_match(text))
    }

    /// Checked against the query text.
    pub fn is_jailbreak_attempt(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        JAILBREAK_PHRASES.iter().any(|phrase| lowered.contains(phrase))
    }
}
