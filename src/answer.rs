//! Static question-answering engine.
//!
//! Queries are normalized (case-folded, whitespace collapsed, surrounding
//! punctuation stripped) and looked up in a fixed table. Misses fall back
//! to a substring match on known country names, then to a goodbye check,
//! and finally to a fixed "unknown query" reply.
//!
//! The engine owns no I/O and never fails. It is built once at startup and
//! shared read-only between every session via `Arc<AnswerEngine>`.

use std::collections::HashMap;

/// Normalized prefix of a reply that ends the conversation.
pub const GOODBYE_TOKEN: &str = "bye";

const GREETING: &str = "Hi! I'm Synyi Voron — your European capitals chat-bot.";
const GOODBYE: &str = "Bye!";

/// Reply for anything the table cannot answer.
pub const UNKNOWN_QUERY: &str =
    "I only know the capitals of EU countries! Try asking 'capital of France' or 'capital of Poland'.";

const QA_TABLE: &[(&str, &str)] = &[
    ("hello", GREETING),
    ("hi", GREETING),
    ("what is your name", "I'm Synyi Voron, a socket-based bot who knows EU capitals."),
    ("capital of france", "The capital of France is Paris — the City of Light, known for art, fashion, and the Eiffel Tower."),
    ("capital of germany", "The capital of Germany is Berlin — a creative, modern city that’s been rebuilt into a hub of culture and tech."),
    ("capital of italy", "The capital of Italy is Rome — once the heart of the Roman Empire and home to the Colosseum and Vatican City."),
    ("capital of spain", "The capital of Spain is Madrid — famous for its royal palace, tapas, and vibrant nightlife."),
    ("capital of poland", "The capital of Poland is Warsaw — a resilient city rebuilt after WWII with a charming old town."),
    ("capital of sweden", "The capital of Sweden is Stockholm — spread across 14 islands, known for design and innovation."),
    ("capital of netherlands", "The capital of the Netherlands is Amsterdam — full of canals, bikes, and cozy cafes."),
    ("capital of belgium", "The capital of Belgium is Brussels — home to the EU headquarters and famous for waffles and chocolate."),
    ("capital of austria", "The capital of Austria is Vienna — Mozart’s city, known for classical music and elegant coffee houses."),
    ("capital of greece", "The capital of Greece is Athens — the cradle of democracy with iconic ancient ruins like the Parthenon."),
    ("capital of portugal", "The capital of Portugal is Lisbon — a sunny, hilly city known for pastel buildings and tram rides."),
    ("capital of czech republic", "The capital of the Czech Republic is Prague — full of gothic architecture and the famous Charles Bridge."),
    ("capital of hungary", "The capital of Hungary is Budapest — split by the Danube and known for its thermal baths."),
    ("capital of denmark", "The capital of Denmark is Copenhagen — stylish, sustainable, and home to the Little Mermaid statue."),
    ("capital of finland", "The capital of Finland is Helsinki — a seaside city with Nordic design and cozy saunas."),
    ("capital of ireland", "The capital of Ireland is Dublin — famous for its literary history and lively pub culture."),
    ("capital of croatia", "The capital of Croatia is Zagreb — a mix of Austro-Hungarian architecture and Mediterranean charm."),
    ("capital of romania", "The capital of Romania is Bucharest — known as 'Little Paris' for its wide boulevards and Belle Époque buildings."),
    ("capital of bulgaria", "The capital of Bulgaria is Sofia — one of Europe’s oldest cities, surrounded by mountains."),
    ("capital of estonia", "The capital of Estonia is Tallinn — a digital-first city with a beautifully preserved medieval old town."),
    ("capital of latvia", "The capital of Latvia is Riga — an Art Nouveau gem on the Baltic Sea with a lively old town."),
    ("capital of lithuania", "The capital of Lithuania is Vilnius — known for its baroque architecture and diverse cultural heritage."),
    ("capital of slovakia", "The capital of Slovakia is Bratislava — sitting on the Danube with views of nearby Austria and Hungary."),
    ("capital of slovenia", "The capital of Slovenia is Ljubljana — a green, charming city with riverside cafes and bridges."),
    ("capital of luxembourg", "The capital of Luxembourg is Luxembourg City — one of Europe’s wealthiest capitals, built on dramatic cliffs."),
    ("capital of cyprus", "The capital of Cyprus is Nicosia — the world’s last divided capital, with Greek and Turkish sectors."),
    ("capital of malta", "The capital of Malta is Valletta — a tiny fortified city filled with golden stone buildings and sea views."),
    ("bye", GOODBYE),
];

/// Countries recognized by the substring fallback, checked in order.
const FALLBACK_COUNTRIES: &[&str] = &[
    "france",
    "germany",
    "italy",
    "spain",
    "poland",
    "sweden",
    "netherlands",
    "belgium",
    "austria",
    "greece",
    "portugal",
    "czech republic",
    "hungary",
    "denmark",
    "finland",
    "ireland",
    "croatia",
    "romania",
    "bulgaria",
    "estonia",
];

const GOODBYE_QUERIES: &[&str] = &["bye", "goodbye", "quit", "exit"];

/// Immutable lookup table plus fallback rules.
#[derive(Debug)]
pub struct AnswerEngine {
    table: HashMap<&'static str, &'static str>,
}

impl AnswerEngine {
    pub fn new() -> Self {
        Self {
            table: QA_TABLE.iter().copied().collect(),
        }
    }

    /// Answer a single message. Total: every input gets a reply.
    pub fn answer(&self, message: &str) -> &'static str {
        let key = normalize(message);

        if let Some(&reply) = self.table.get(key.as_str()) {
            return reply;
        }

        if key.contains("capital") {
            for country in FALLBACK_COUNTRIES {
                if key.contains(country) {
                    let exact = format!("capital of {country}");
                    if let Some(&reply) = self.table.get(exact.as_str()) {
                        return reply;
                    }
                }
            }
        }

        if GOODBYE_QUERIES.contains(&key.as_str()) {
            return GOODBYE;
        }

        UNKNOWN_QUERY
    }

    /// Number of exact-match entries.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Default for AnswerEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Lowercase, collapse whitespace runs to one space, and strip non-word
/// characters (anything but alphanumerics and `_`) from both ends.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let collapsed = lowered.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_matches(|c: char| !(c.is_alphanumeric() || c == '_'))
        .to_string()
}

/// Whether a reply tells the client the conversation is over.
///
/// The check runs on the outgoing reply text, not on the query.
pub fn is_goodbye(response: &str) -> bool {
    response.trim().to_lowercase().starts_with(GOODBYE_TOKEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("Capital  OF   France!!"), "capital of france");
        assert_eq!(normalize("  hi ! "), "hi");
        assert_eq!(normalize("¿¿what is\tyour\nname??"), "what is your name");
        assert_eq!(normalize("!!!"), "");
        assert_eq!(normalize("snake_case_"), "snake_case_");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for q in ["Capital  OF   France!!", "...bye...", "  Hello\t World  "] {
            let once = normalize(q);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn test_exact_match() {
        let engine = AnswerEngine::new();
        assert!(engine.answer("capital of france").contains("Paris"));
        assert!(engine.answer("capital of malta").contains("Valletta"));
        assert_eq!(engine.answer("hello"), engine.answer("hi"));
        assert_eq!(engine.len(), QA_TABLE.len());
    }

    #[test]
    fn test_variants_share_an_answer() {
        let engine = AnswerEngine::new();
        let expected = engine.answer("capital of france");
        for q in [
            "Capital  OF   France!!",
            "CAPITAL OF FRANCE",
            "  capital of france?  ",
            "...capital\tof\nfrance...",
        ] {
            assert_eq!(engine.answer(q), expected, "query {q:?}");
        }
    }

    #[test]
    fn test_substring_fallback() {
        let engine = AnswerEngine::new();
        assert!(engine
            .answer("what is the capital city of Germany?")
            .contains("Berlin"));
        assert!(engine
            .answer("tell me the capital of the czech republic")
            .contains("Prague"));
        // Latvia is only reachable by exact match.
        assert_eq!(engine.answer("latvia capital"), UNKNOWN_QUERY);
        // Country without "capital" is not enough.
        assert_eq!(engine.answer("france"), UNKNOWN_QUERY);
    }

    #[test]
    fn test_goodbye_queries() {
        let engine = AnswerEngine::new();
        for q in ["bye", "Goodbye!", "QUIT", "exit."] {
            let reply = engine.answer(q);
            assert!(reply.starts_with("Bye"), "query {q:?}");
            assert!(is_goodbye(reply));
        }
    }

    #[test]
    fn test_unknown_query() {
        let engine = AnswerEngine::new();
        assert_eq!(engine.answer("capital of mars"), UNKNOWN_QUERY);
        assert_eq!(engine.answer(""), UNKNOWN_QUERY);
        assert!(!is_goodbye(UNKNOWN_QUERY));
    }

    #[test]
    fn test_is_goodbye_checks_reply_prefix() {
        assert!(is_goodbye("Bye!"));
        assert!(is_goodbye("  BYE for now"));
        assert!(!is_goodbye("Goodbye"));
        assert!(!is_goodbye(GREETING));
    }
}
