use {
    async_trait::async_trait,
    herald_common::ChatId,
    std::collections::HashMap,
};

/// Resolves a chat's language and substitutes localized strings into text.
#[async_trait]
pub trait Localizer: Send + Sync {
    async fn resolve_language(&self, chat: ChatId) -> String;

    /// Replace `{{key}}` placeholders with the string for `lang`.
    fn substitute(&self, text: &str, lang: &str) -> String;
}

/// Localizer over static bundles: language → key → text.
///
/// Keys missing from the requested language fall back to the default
/// language; keys missing there too are left in place.
#[derive(Debug, Clone)]
pub struct BundleLocalizer {
    default_language: String,
    chat_languages: HashMap<ChatId, String>,
    bundles: HashMap<String, HashMap<String, String>>,
}

impl BundleLocalizer {
    pub fn new(default_language: impl Into<String>) -> Self {
        Self {
            default_language: default_language.into(),
            chat_languages: HashMap::new(),
            bundles: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_chat_language(mut self, chat: ChatId, lang: impl Into<String>) -> Self {
        self.chat_languages.insert(chat, lang.into());
        self
    }

    #[must_use]
    pub fn with_bundle(mut self, lang: impl Into<String>, entries: HashMap<String, String>) -> Self {
        self.bundles.entry(lang.into()).or_default().extend(entries);
        self
    }

    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    fn lookup(&self, key: &str, lang: &str) -> Option<&str> {
        self.bundles
            .get(lang)
            .and_then(|b| b.get(key))
            .or_else(|| {
                self.bundles
                    .get(&self.default_language)
                    .and_then(|b| b.get(key))
            })
            .map(String::as_str)
    }
}

#[async_trait]
impl Localizer for BundleLocalizer {
    async fn resolve_language(&self, chat: ChatId) -> String {
        self.chat_languages
            .get(&chat)
            .cloned()
            .unwrap_or_else(|| self.default_language.clone())
    }

    fn substitute(&self, text: &str, lang: &str) -> String {
        substitute_with(text, |key| self.lookup(key, lang).map(str::to_string))
    }
}

fn substitute_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    if !input.contains("{{") {
        return input.to_string();
    }

    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("{{") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let key = after[..end].trim();
                match lookup(key) {
                    Some(value) if !key.is_empty() => result.push_str(&value),
                    _ => result.push_str(&rest[start..start + 2 + end + 2]),
                }
                rest = &after[end + 2..];
            },
            None => {
                // Unclosed, keep literally.
                result.push_str(&rest[start..]);
                rest = "";
            },
        }
    }
    result.push_str(rest);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn localizer() -> BundleLocalizer {
        BundleLocalizer::new("en")
            .with_bundle("en", bundle(&[("greeting", "Hello"), ("bye", "Bye")]))
            .with_bundle("de", bundle(&[("greeting", "Hallo")]))
            .with_chat_language(ChatId(7), "de")
    }

    #[tokio::test]
    async fn resolves_chat_language_with_default() {
        let l10n = localizer();
        assert_eq!(l10n.resolve_language(ChatId(7)).await, "de");
        assert_eq!(l10n.resolve_language(ChatId(8)).await, "en");
    }

    #[test]
    fn substitutes_with_fallback_to_default_language() {
        let l10n = localizer();
        assert_eq!(l10n.substitute("{{greeting}}, {{bye}}!", "de"), "Hallo, Bye!");
        assert_eq!(l10n.substitute("{{ greeting }}", "en"), "Hello");
    }

    #[test]
    fn leaves_unknown_and_malformed_placeholders() {
        let l10n = localizer();
        assert_eq!(l10n.substitute("{{missing}} ok", "en"), "{{missing}} ok");
        assert_eq!(l10n.substitute("a {{greeting", "en"), "a {{greeting");
        assert_eq!(l10n.substitute("{{}}", "en"), "{{}}");
        assert_eq!(l10n.substitute("no placeholders", "en"), "no placeholders");
    }
}
