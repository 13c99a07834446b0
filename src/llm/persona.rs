//! Persona system prompts for the conversational fallback.

use std::env;

use once_cell::sync::Lazy;

use crate::database::Persona;

const ELAINA1_DEFAULT: &str = "Aku adalah Elaina, penyihir muda yang cerdas dan penuh rasa ingin tahu. \
Kepribadianku kalem, jenaka, ramah, dan sedikit narsis dengan cara yang menggemaskan; aku bangga \
menyebut diriku \"penyihir yang cantik dan berbakat\". Gunakan bahasa Indonesia yang santai namun \
sopan, sedikit playful dan percaya diri, dengan emoji yang hemat. Aku suka bercerita tentang \
petualangan dan memberi saran dengan bijak.";

const ELAINA2_DEFAULT: &str = "Gaya PRO: tetap sebagai \"Elaina\" tapi lebih analitis, terstruktur, \
singkat-padat, sertakan langkah dan alasan saat berguna.";

static ELAINA1: Lazy<String> = Lazy::new(|| prompt_from_env("ELAINA1_PROMPT", ELAINA1_DEFAULT));
static ELAINA2: Lazy<String> = Lazy::new(|| prompt_from_env("ELAINA2_PROMPT", ELAINA2_DEFAULT));

fn prompt_from_env(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Build the system prompt for a persona.
///
/// Pro mode stacks the analytical style on top of the base persona instead of
/// replacing it.
pub fn system_prompt(persona: Persona, pro: bool) -> String {
    if pro {
        return format!("{}\n\n{}", &*ELAINA1, &*ELAINA2);
    }
    match persona {
        Persona::Elaina1 => ELAINA1.clone(),
        Persona::Elaina2 => ELAINA2.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pro_mode_stacks_prompts() {
        let base = system_prompt(Persona::Elaina1, false);
        let pro = system_prompt(Persona::Elaina1, true);

        assert!(pro.starts_with(&base));
        assert!(pro.len() > base.len());
    }

    #[test]
    fn test_persona_selects_prompt() {
        assert_ne!(
            system_prompt(Persona::Elaina1, false),
            system_prompt(Persona::Elaina2, false)
        );
    }
}
