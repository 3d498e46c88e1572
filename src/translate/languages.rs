//! Languages accepted by the translation and speech stages.

use crate::error::{AlimeError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language {
    /// ISO 639-1 code used by clients and the speech scripts
    pub code: &'static str,
    pub name: &'static str,
    /// FLORES-200 code expected by NLLB models
    pub nllb: &'static str,
    /// Whether a synthesized voice exists for this language
    pub speech: bool,
}

static LANGUAGES: &[Language] = &[
    Language { code: "en", name: "English", nllb: "eng_Latn", speech: true },
    Language { code: "vi", name: "Vietnamese", nllb: "vie_Latn", speech: true },
    Language { code: "fr", name: "French", nllb: "fra_Latn", speech: true },
    Language { code: "de", name: "German", nllb: "deu_Latn", speech: true },
    Language { code: "ja", name: "Japanese", nllb: "jpn_Jpan", speech: true },
    Language { code: "ru", name: "Russian", nllb: "rus_Cyrl", speech: true },
    Language { code: "zh", name: "Chinese", nllb: "zho_Hans", speech: true },
    Language { code: "es", name: "Spanish", nllb: "spa_Latn", speech: true },
    Language { code: "ko", name: "Korean", nllb: "kor_Hang", speech: false },
    Language { code: "it", name: "Italian", nllb: "ita_Latn", speech: false },
    Language { code: "pt", name: "Portuguese", nllb: "por_Latn", speech: false },
    Language { code: "th", name: "Thai", nllb: "tha_Thai", speech: false },
    Language { code: "id", name: "Indonesian", nllb: "ind_Latn", speech: false },
    Language { code: "hi", name: "Hindi", nllb: "hin_Deva", speech: false },
    Language { code: "ar", name: "Arabic", nllb: "arb_Arab", speech: false },
];

/// Look up a language by ISO code or NLLB code, case-insensitively.
pub fn lookup(code: &str) -> Result<&'static Language> {
    let code = code.trim();
    LANGUAGES
        .iter()
        .find(|l| l.code.eq_ignore_ascii_case(code) || l.nllb.eq_ignore_ascii_case(code))
        .ok_or_else(|| AlimeError::UnsupportedLanguage(code.to_string()))
}

/// Look up a language that the speech stage can voice.
pub fn speech_language(code: &str) -> Result<&'static Language> {
    let language = lookup(code)?;
    if language.speech {
        Ok(language)
    } else {
        Err(AlimeError::UnsupportedLanguage(format!(
            "{} has no synthesized voice",
            language.name
        )))
    }
}

pub fn supported() -> &'static [Language] {
    LANGUAGES
}
