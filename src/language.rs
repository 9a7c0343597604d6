use crate::error::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    AmericanEnglish,
    BritishEnglish,
    Spanish,
    French,
    Hindi,
    Italian,
    BrazilianPortuguese,
    Japanese,
    MandarinChinese,
}

impl Language {
    pub const ALL: [Language; 9] = [
        Language::AmericanEnglish,
        Language::BritishEnglish,
        Language::Spanish,
        Language::French,
        Language::Hindi,
        Language::Italian,
        Language::BrazilianPortuguese,
        Language::Japanese,
        Language::MandarinChinese,
    ];

    /// Accepts the single-letter codes (`a`, `b`, `e`, ...) and the BCP-47 style
    /// aliases (`en-us`, `en-gb`, `es`, ...), case-insensitively.
    pub fn parse(code: &str) -> Result<Self, PipelineError> {
        let lowered = code.trim().to_lowercase();
        let short = match lowered.as_str() {
            "en-us" => "a",
            "en-gb" => "b",
            "es" => "e",
            "fr-fr" => "f",
            "hi" => "h",
            "it" => "i",
            "pt-br" => "p",
            "ja" => "j",
            "zh" => "z",
            other => other,
        };
        Self::ALL
            .into_iter()
            .find(|lang| short.len() == 1 && short.starts_with(lang.code()))
            .ok_or_else(|| PipelineError::unsupported_language(code))
    }

    pub fn code(self) -> char {
        match self {
            Self::AmericanEnglish => 'a',
            Self::BritishEnglish => 'b',
            Self::Spanish => 'e',
            Self::French => 'f',
            Self::Hindi => 'h',
            Self::Italian => 'i',
            Self::BrazilianPortuguese => 'p',
            Self::Japanese => 'j',
            Self::MandarinChinese => 'z',
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::AmericanEnglish => "American English",
            Self::BritishEnglish => "British English",
            Self::Spanish => "es",
            Self::French => "fr-fr",
            Self::Hindi => "hi",
            Self::Italian => "it",
            Self::BrazilianPortuguese => "pt-br",
            Self::Japanese => "Japanese",
            Self::MandarinChinese => "Mandarin Chinese",
        }
    }

    /// Word-token languages go through the token chunker; the rest are split by
    /// sentence and character budget before G2P.
    pub fn uses_word_tokens(self) -> bool {
        matches!(self, Self::AmericanEnglish | Self::BritishEnglish)
    }
}
