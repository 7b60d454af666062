// Language catalog: detection codes, speech recognition tags and voices

use regex::Regex;
use std::sync::OnceLock;

pub const DEFAULT_STT_TAG: &str = "es-ES";
pub const DEFAULT_TRANSLATION_CODE: &str = "es";
pub const DEFAULT_VOICE: &str = "es-ES-ElviraNeural";

/// Detection code -> recognition tag used when re-transcribing.
const STT_TAGS: &[(&str, &str)] = &[
    ("es", "es-ES"),
    ("en", "en-US"),
    ("fr", "fr-FR"),
    ("de", "de-DE"),
    ("it", "it-IT"),
    ("pt", "pt-BR"),
    ("ja", "ja-JP"),
];

const VOICES: &[(&str, &[&str])] = &[
    ("es", &["es-ES-ElviraNeural", "es-ES-AlvaroNeural", "es-MX-DaliaNeural"]),
    ("en", &["en-US-AriaNeural", "en-US-GuyNeural", "en-GB-SoniaNeural"]),
    ("fr", &["fr-FR-DeniseNeural", "fr-FR-HenriNeural"]),
    ("de", &["de-DE-KatjaNeural", "de-DE-ConradNeural"]),
    ("it", &["it-IT-ElsaNeural", "it-IT-DiegoNeural"]),
    ("pt", &["pt-BR-FranciscaNeural", "pt-BR-AntonioNeural"]),
    ("ja", &["ja-JP-NanamiNeural", "ja-JP-KeitaNeural"]),
];

pub fn stt_tag_for(detected: &str) -> Option<&'static str> {
    let code = detected.trim().to_ascii_lowercase();
    STT_TAGS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, tag)| *tag)
}

pub fn selectable_stt_tags() -> impl Iterator<Item = &'static str> {
    STT_TAGS.iter().map(|(_, tag)| *tag)
}

pub fn target_languages() -> impl Iterator<Item = &'static str> {
    VOICES.iter().map(|(code, _)| *code)
}

pub fn voices_for(language: &str) -> &'static [&'static str] {
    let code = language.trim().to_ascii_lowercase();
    VOICES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, voices)| *voices)
        .unwrap_or(&[DEFAULT_VOICE])
}

pub fn default_voice_for(language: &str) -> &'static str {
    voices_for(language).first().copied().unwrap_or(DEFAULT_VOICE)
}

/// "es-ES" -> "es"
pub fn translation_code_from_tag(tag: &str) -> String {
    tag.split('-').next().unwrap_or_default().to_ascii_lowercase()
}

/// "en-US-AriaNeural" -> "en-US"
pub fn voice_locale(voice_id: &str) -> String {
    voice_id.split('-').take(2).collect::<Vec<_>>().join("-")
}

pub fn is_valid_stt_tag(tag: &str) -> bool {
    static TAG_RE: OnceLock<Regex> = OnceLock::new();
    let re = TAG_RE.get_or_init(|| Regex::new(r"^[a-z]{2,3}-[A-Z]{2}$").expect("valid tag regex"));
    re.is_match(tag)
}

pub fn is_valid_voice_id(voice_id: &str) -> bool {
    static VOICE_RE: OnceLock<Regex> = OnceLock::new();
    let re = VOICE_RE.get_or_init(|| {
        Regex::new(r"^[a-z]{2,3}-[A-Z]{2}-[A-Za-z0-9]+$").expect("valid voice regex")
    });
    re.is_match(voice_id)
}

pub fn is_valid_language_code(code: &str) -> bool {
    static CODE_RE: OnceLock<Regex> = OnceLock::new();
    let re = CODE_RE.get_or_init(|| {
        Regex::new(r"^[a-z]{2,3}(-[A-Za-z]{2,4})?$").expect("valid language code regex")
    });
    re.is_match(code)
}
