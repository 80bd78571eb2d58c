/// Languages the pipeline can steer generation toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Chinese,
    Japanese,
    Korean,
    English,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::Chinese => "zh",
            Language::Japanese => "ja",
            Language::Korean => "ko",
            Language::English => "en",
        }
    }

    /// English name as embedded in generation instructions.
    pub fn name(&self) -> &'static str {
        match self {
            Language::Chinese => "Chinese",
            Language::Japanese => "Japanese",
            Language::Korean => "Korean",
            Language::English => "English",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "zh" => Some(Language::Chinese),
            "ja" => Some(Language::Japanese),
            "ko" => Some(Language::Korean),
            "en" => Some(Language::English),
            _ => None,
        }
    }
}

/// Detects the dominant language of `text` by bucketing every character
/// into one of four Unicode ranges and comparing each bucket's share of
/// all scanned characters. Characters outside the buckets (punctuation,
/// digits, whitespace, emoji) classify as nothing but still count toward
/// the total.
///
/// The thresholds are asymmetric on purpose: CJK text routinely embeds
/// Latin brand names and abbreviations, so Latin needs a larger share
/// (>30%) to win than the CJK buckets do (>20%). Evaluation order is
/// zh, ja, ko, en; the first bucket over its threshold wins, and the
/// result defaults to English when nothing qualifies.
pub fn detect_language(text: &str) -> Language {
    let mut chinese = 0usize;
    let mut japanese = 0usize;
    let mut korean = 0usize;
    let mut total = 0usize;

    for ch in text.chars() {
        let code = ch as u32;
        total += 1;
        // CJK Unified Ideographs, including Extension A
        if (0x4E00..=0x9FFF).contains(&code) || (0x3400..=0x4DBF).contains(&code) {
            chinese += 1;
        }
        // Hiragana and Katakana
        else if (0x3040..=0x309F).contains(&code) || (0x30A0..=0x30FF).contains(&code) {
            japanese += 1;
        }
        // Hangul syllables
        else if (0xAC00..=0xD7AF).contains(&code) {
            korean += 1;
        }
    }

    if total == 0 {
        return Language::English;
    }

    let total = total as f64;
    if chinese as f64 / total > 0.2 {
        Language::Chinese
    } else if japanese as f64 / total > 0.2 {
        Language::Japanese
    } else if korean as f64 / total > 0.2 {
        Language::Korean
    } else {
        // Latin needs >30% to win on its own, but the inconclusive
        // default is English as well, so the outcome is the same.
        Language::English
    }
}
