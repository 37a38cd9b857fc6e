//! Static label tables mapping classifier output indices to
//! human-readable names.

use serde::Serialize;

/// Language classifier output classes, indexed by class id.
pub const LANGUAGES: [&str; 5] = ["tamil", "english", "hindi", "malayalam", "telugu"];

/// Map a language class index to its name. Out-of-range indices (a
/// mismatched artifact, not a client error) report `"unknown"` rather
/// than failing the request.
pub fn language_name(class: usize) -> &'static str {
    LANGUAGES.get(class).copied().unwrap_or("unknown")
}

/// Voice authenticity verdict. Class 0 is human, class 1 is AI-generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VoiceClass {
    #[serde(rename = "HUMAN")]
    Human,
    #[serde(rename = "AI_GENERATED")]
    AiGenerated,
}

impl VoiceClass {
    pub fn from_class(class: usize) -> Self {
        if class == 1 {
            VoiceClass::AiGenerated
        } else {
            VoiceClass::Human
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VoiceClass::Human => "HUMAN",
            VoiceClass::AiGenerated => "AI_GENERATED",
        }
    }
}

impl std::fmt::Display for VoiceClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_mapping() {
        assert_eq!(language_name(0), "tamil");
        assert_eq!(language_name(1), "english");
        assert_eq!(language_name(4), "telugu");
        assert_eq!(language_name(5), "unknown");
    }

    #[test]
    fn test_voice_class_mapping() {
        assert_eq!(VoiceClass::from_class(0), VoiceClass::Human);
        assert_eq!(VoiceClass::from_class(1), VoiceClass::AiGenerated);
        assert_eq!(VoiceClass::from_class(1).as_str(), "AI_GENERATED");
    }

    #[test]
    fn test_voice_class_serializes_to_wire_names() {
        assert_eq!(
            serde_json::to_string(&VoiceClass::AiGenerated).unwrap(),
            "\"AI_GENERATED\""
        );
        assert_eq!(serde_json::to_string(&VoiceClass::Human).unwrap(), "\"HUMAN\"");
    }
}
