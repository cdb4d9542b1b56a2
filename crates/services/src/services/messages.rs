//! User-facing WhatsApp texts and command parsing
//!
//! Every reply the owner can receive is defined here, in Dutch, so the tone
//! stays consistent and tests can match on exact strings.

/// Reserved word that publishes the pending draft
pub const CONFIRM_TOKEN: &str = "POST";

/// Reserved words that discard the pending draft
pub const CANCEL_TOKENS: &[&str] = &["VERWIJDER", "CANCEL"];

/// Caption used when the captioning service fails
pub const CAPTION_FALLBACK: &str = "Er kon geen beschrijving worden gegenereerd.";

pub const NO_DRAFT: &str = "Geen concept gevonden. Stuur eerst media.";
pub const PUBLISHED: &str = "Gepubliceerd op social media.";
pub const PUBLISH_FAILED: &str =
    "Publicatie mislukt. Het concept is bewaard, antwoord *POST* om het opnieuw te proberen.";
pub const DRAFT_REMOVED: &str = "Concept verwijderd.";
pub const DRAFT_REPLACED: &str =
    "Er is intussen een nieuw concept klaargezet. Bekijk de nieuwste preview en antwoord opnieuw.";
pub const PROCESSING_FAILED: &str = "Er is iets fout gegaan bij het verwerken van de media.";
pub const STORE_UNAVAILABLE: &str = "Er is iets fout gegaan. Probeer het later opnieuw.";

/// What an inbound text means for the owner's draft
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Confirm,
    Cancel,
    /// Whitespace-only message; never touches the caption
    Empty,
    /// Any other text replaces the caption verbatim
    Edit(String),
}

impl Command {
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Command::Empty;
        }
        if trimmed.eq_ignore_ascii_case(CONFIRM_TOKEN) {
            return Command::Confirm;
        }
        if CANCEL_TOKENS
            .iter()
            .any(|token| trimmed.eq_ignore_ascii_case(token))
        {
            return Command::Cancel;
        }
        Command::Edit(trimmed.to_string())
    }
}

/// Immediate acknowledgement sent while media is processed in the background
pub fn media_received(is_video: bool) -> String {
    let kind = if is_video { "Video" } else { "Foto" };
    format!("{} ontvangen, een moment geduld...", kind)
}

fn instructions() -> String {
    format!(
        "Antwoord *{}* om te publiceren.\n\
         Antwoord *{}* om te annuleren.\n\
         Antwoord met een andere omschrijving om deze te vervangen.",
        CONFIRM_TOKEN, CANCEL_TOKENS[0]
    )
}

/// Text that follows the preview media
pub fn preview(caption: &str, caption_failed: bool) -> String {
    let mut body = String::new();
    if caption_failed {
        body.push_str(
            "Het genereren van de beschrijving is mislukt. \
             Typ zelf een beschrijving om deze te gebruiken.\n\n",
        );
    }
    body.push_str(caption);
    body.push_str("\n\n------------------\n");
    body.push_str(&instructions());
    body
}

pub fn caption_updated(caption: &str) -> String {
    format!(
        "*Beschrijving aangepast!*\n\n\
         Hier is de nieuwe versie:\n\
         ------------------\n\
         {}\n\
         ------------------\n\
         Antwoord *{}* om te publiceren.",
        caption, CONFIRM_TOKEN
    )
}

/// Reply for an empty message while a draft is pending
pub fn empty_command() -> String {
    format!("Er staat een concept klaar.\n{}", instructions())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reserved_tokens_case_insensitive() {
        assert_eq!(Command::parse("POST"), Command::Confirm);
        assert_eq!(Command::parse("  post \n"), Command::Confirm);
        assert_eq!(Command::parse("Verwijder"), Command::Cancel);
        assert_eq!(Command::parse("cancel"), Command::Cancel);
    }

    #[test]
    fn test_parse_other_text_is_edit() {
        assert_eq!(
            Command::parse("Nieuwe partij binnen!"),
            Command::Edit("Nieuwe partij binnen!".to_string())
        );
        // Tokens only count as the whole message
        assert_eq!(
            Command::parse("post dit maar"),
            Command::Edit("post dit maar".to_string())
        );
    }

    #[test]
    fn test_parse_blank_is_empty() {
        assert_eq!(Command::parse(""), Command::Empty);
        assert_eq!(Command::parse("   "), Command::Empty);
    }

    #[test]
    fn test_preview_mentions_failure_only_when_fallback() {
        let ok = preview("Mooie caption", false);
        assert!(ok.starts_with("Mooie caption"));
        assert!(ok.contains("*POST*"));
        assert!(!ok.contains("mislukt"));

        let failed = preview(CAPTION_FALLBACK, true);
        assert!(failed.contains("mislukt"));
        assert!(failed.contains(CAPTION_FALLBACK));
    }

    #[test]
    fn test_media_received_wording() {
        assert_eq!(media_received(true), "Video ontvangen, een moment geduld...");
        assert_eq!(media_received(false), "Foto ontvangen, een moment geduld...");
    }
}
