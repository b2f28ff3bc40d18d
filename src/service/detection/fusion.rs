use std::collections::HashSet;

use crate::shared::config;

/// Static danger vocabulary the alert decision is evaluated against.
/// Keywords are held lowercase; label matching is exact.
#[derive(Clone, Debug)]
pub struct DangerLexicon {
    sounds: HashSet<String>,
    keywords: Vec<String>,
}

impl DangerLexicon {
    pub fn new(sounds: Vec<String>, keywords: Vec<String>) -> Self {
        Self {
            sounds: sounds.into_iter().collect(),
            keywords: keywords.into_iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    pub fn from_config() -> Self {
        let cfg = config::danger_config();
        Self::new(cfg.sounds.clone(), cfg.keywords.clone())
    }

    /// The alert-fusion rule: true when any detected label is a danger sound,
    /// or the lowercased transcript contains a danger keyword as a substring.
    /// An empty label set or empty transcript yields false for that branch.
    pub fn evaluate(&self, labels: &[&str], transcript: &str) -> bool {
        let label_hit = labels.iter().any(|label| self.sounds.contains(*label));

        let keyword_hit = if transcript.is_empty() {
            false
        } else {
            let lowered = transcript.to_lowercase();
            self.keywords.iter().any(|k| lowered.contains(k.as_str()))
        };

        label_hit || keyword_hit
    }
}

impl Default for DangerLexicon {
    fn default() -> Self {
        Self::from_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lexicon() -> DangerLexicon {
        DangerLexicon::new(
            vec![
                "Scream".to_string(),
                "Gunshot".to_string(),
                "Explosion".to_string(),
                "Shout".to_string(),
                "Crying".to_string(),
                "Fireworks".to_string(),
            ],
            vec![
                "help".to_string(),
                "save me".to_string(),
                "leave me".to_string(),
                "don't touch".to_string(),
                "stay away".to_string(),
            ],
        )
    }

    #[test]
    fn danger_label_alone_triggers_alert() {
        assert!(lexicon().evaluate(&["Gunshot"], ""));
    }

    #[test]
    fn keyword_in_transcript_triggers_alert() {
        assert!(lexicon().evaluate(&["Speech"], "please help me now"));
    }

    #[test]
    fn benign_transcript_does_not_trigger() {
        assert!(!lexicon().evaluate(&["Speech"], "nice weather today"));
    }

    #[test]
    fn empty_inputs_do_not_trigger() {
        assert!(!lexicon().evaluate(&[], ""));
    }

    #[test]
    fn keyword_matching_is_case_insensitive() {
        assert!(lexicon().evaluate(&[], "HELP"));
    }

    #[test]
    fn capitalized_keyword_configuration_still_matches() {
        let lex = DangerLexicon::new(vec![], vec!["Stay away".to_string()]);
        assert!(lex.evaluate(&[], "you stay away from me"));
    }

    #[test]
    fn label_match_is_exact() {
        // Substring labels must not match the sound set.
        assert!(!lexicon().evaluate(&["Gunshot, gunfire"], ""));
    }

    #[test]
    fn keyword_matches_as_substring() {
        assert!(lexicon().evaluate(&[], "somebody helped him"));
    }
}
