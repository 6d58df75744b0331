//! Book grounding: title (and author) to canonical book facts.
//!
//! Lookup order is catalog search, then the offline table, then a minimal
//! record synthesized from the raw input. Grounding never fails.

use std::sync::Arc;

use tracing::{debug, info, warn};
use trailer_ai_client::{CatalogCandidate, CatalogSearch};
use trailer_models::{BookFacts, Character, Locale, PlotBeat};

/// Candidates whose title is less similar than this are ignored.
const MIN_TITLE_SIMILARITY: f64 = 0.3;

const WEIGHT_TITLE: f64 = 0.5;
const WEIGHT_AUTHOR: f64 = 0.25;
const WEIGHT_DESCRIPTION: f64 = 0.15;
const WEIGHT_LANGUAGE: f64 = 0.10;

const MINIMAL_CONFIDENCE: f64 = 0.5;
const MAX_CATALOG_CONFIDENCE: f64 = 0.95;

/// Lower-cased title with all whitespace removed.
fn squash(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Title similarity in [0, 1]. Containment in either direction counts as a match.
pub fn title_similarity(query: &str, candidate: &str) -> f64 {
    let (q, c) = (squash(query), squash(candidate));
    if q.is_empty() || c.is_empty() {
        return 0.0;
    }
    if q == c || c.contains(&q) || q.contains(&c) {
        return 1.0;
    }
    strsim::normalized_levenshtein(&q, &c)
}

fn author_matches(author: Option<&str>, candidate: &CatalogCandidate) -> bool {
    let Some(author) = author.map(squash).filter(|a| !a.is_empty()) else {
        return false;
    };
    candidate.authors.iter().map(|a| squash(a)).any(|a| {
        !a.is_empty() && (a.contains(&author) || author.contains(&a))
    })
}

/// Weighted relevance of a candidate.
pub fn score_candidate(
    candidate: &CatalogCandidate,
    title: &str,
    author: Option<&str>,
    locale: Locale,
) -> f64 {
    let language_match = candidate
        .language
        .as_deref()
        .is_some_and(|l| l.eq_ignore_ascii_case(locale.as_str()));

    WEIGHT_TITLE * title_similarity(title, &candidate.title)
        + WEIGHT_AUTHOR * f64::from(u8::from(author_matches(author, candidate)))
        + WEIGHT_DESCRIPTION * f64::from(u8::from(candidate.has_description()))
        + WEIGHT_LANGUAGE * f64::from(u8::from(language_match))
}

/// Index and score of the best candidate. Ties keep the earlier candidate.
pub fn rank_candidates(
    candidates: &[CatalogCandidate],
    title: &str,
    author: Option<&str>,
    locale: Locale,
) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (index, candidate) in candidates.iter().enumerate() {
        if title_similarity(title, &candidate.title) < MIN_TITLE_SIMILARITY {
            continue;
        }
        let score = score_candidate(candidate, title, author, locale);
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((index, score));
        }
    }
    best
}

/// Resolves titles into book facts.
#[derive(Clone, Default)]
pub struct BookGrounder {
    catalog: Option<Arc<dyn CatalogSearch>>,
}

impl BookGrounder {
    pub fn new(catalog: Arc<dyn CatalogSearch>) -> Self {
        Self {
            catalog: Some(catalog),
        }
    }

    /// Grounder that only consults the offline table.
    pub fn offline_only() -> Self {
        Self { catalog: None }
    }

    /// Always returns usable facts.
    pub async fn ground(&self, title: &str, author: Option<&str>, locale: Locale) -> BookFacts {
        if let Some(facts) = self.from_catalog(title, author, locale).await {
            return facts;
        }

        if let Some(facts) = offline_lookup(title) {
            info!(title = %title, source = %facts.source, "Grounded from offline table");
            return facts;
        }

        info!(title = %title, "No grounding source matched, using minimal facts");
        minimal_facts(title, author)
    }

    async fn from_catalog(&self, title: &str, author: Option<&str>, locale: Locale) -> Option<BookFacts> {
        let catalog = self.catalog.as_ref()?;

        let candidates = match catalog.search(title, author).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(title = %title, error = %e, "Catalog search failed, falling back");
                return None;
            }
        };

        let Some((index, score)) = rank_candidates(&candidates, title, author, locale) else {
            debug!(title = %title, count = candidates.len(), "No relevant catalog candidate");
            return None;
        };

        let candidate = &candidates[index];
        info!(
            title = %title,
            matched = %candidate.title,
            score,
            "Grounded from catalog"
        );
        Some(facts_from_candidate(candidate, score, author))
    }
}

fn first_sentence(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    let end = text
        .char_indices()
        .find(|(_, c)| matches!(c, '.' | '!' | '?'))
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(text.len());
    let sentence = &text[..end];
    if sentence.chars().count() <= max_chars {
        sentence.to_string()
    } else {
        let cut: String = sentence.chars().take(max_chars.saturating_sub(1)).collect();
        format!("{}…", cut.trim_end())
    }
}

fn generic_characters(title: &str) -> Vec<Character> {
    vec![Character::new(
        format!("The hero of {}", title),
        "protagonist",
        "young traveller with a satchel and an open, friendly face",
        "curious and brave",
    )]
}

fn generic_beats(title: &str) -> Vec<PlotBeat> {
    vec![
        PlotBeat::new(format!("The first page of {} opens onto a new world", title), "curious"),
        PlotBeat::new("The hero sets out on an adventure and meets new friends", "hopeful"),
        PlotBeat::new("The hero discovers what truly matters and looks ahead", "joyful"),
    ]
}

fn facts_from_candidate(candidate: &CatalogCandidate, score: f64, author: Option<&str>) -> BookFacts {
    let title = candidate.title.trim().to_string();
    let logline = candidate
        .description
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .map(|d| first_sentence(d, 280))
        .unwrap_or_else(|| format!("An illustrated journey through {}.", title));

    let categories = candidate
        .categories
        .iter()
        .map(|c| c.to_lowercase())
        .collect::<Vec<_>>();
    let for_children = categories
        .iter()
        .any(|c| c.contains("juvenile") || c.contains("children"));

    BookFacts {
        canonical_title: title.clone(),
        author: candidate
            .authors
            .first()
            .cloned()
            .or_else(|| author.map(str::to_string)),
        logline,
        characters: generic_characters(&title),
        plot_beats: generic_beats(&title),
        setting: format!("the world of {}", title),
        themes: if candidate.categories.is_empty() {
            vec!["adventure".to_string()]
        } else {
            candidate.categories.clone()
        },
        target_audience: if for_children {
            "children".to_string()
        } else {
            "general readers".to_string()
        },
        confidence: (0.6 + 0.4 * score).min(MAX_CATALOG_CONFIDENCE),
        source: format!("catalog:{}", candidate.id),
    }
}

/// Facts synthesized from the raw input when nothing else matched.
pub fn minimal_facts(title: &str, author: Option<&str>) -> BookFacts {
    let title = title.trim().to_string();
    BookFacts {
        canonical_title: title.clone(),
        author: author
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string),
        logline: format!("An illustrated journey through {}.", title),
        characters: generic_characters(&title),
        plot_beats: generic_beats(&title),
        setting: format!("the world of {}", title),
        themes: vec!["adventure".to_string(), "discovery".to_string()],
        target_audience: "general readers".to_string(),
        confidence: MINIMAL_CONFIDENCE,
        source: "minimal".to_string(),
    }
}

struct OfflineCharacter {
    name: &'static str,
    role: &'static str,
    appearance: &'static str,
    personality: &'static str,
}

struct OfflineBook {
    id: &'static str,
    aliases: &'static [&'static str],
    title: &'static str,
    author: &'static str,
    logline: &'static str,
    characters: &'static [OfflineCharacter],
    beats: [(&'static str, &'static str); 3],
    setting: &'static str,
    themes: &'static [&'static str],
    audience: &'static str,
    confidence: f64,
}

impl OfflineBook {
    fn matches(&self, query: &str) -> bool {
        self.aliases.iter().map(|a| squash(a)).any(|alias| {
            alias == query
                || (query.chars().count() >= 2 && (alias.contains(query) || query.contains(&alias)))
        })
    }

    fn to_facts(&self) -> BookFacts {
        BookFacts {
            canonical_title: self.title.to_string(),
            author: Some(self.author.to_string()),
            logline: self.logline.to_string(),
            characters: self
                .characters
                .iter()
                .map(|c| Character::new(c.name, c.role, c.appearance, c.personality))
                .collect(),
            plot_beats: self
                .beats
                .iter()
                .map(|(event, tone)| PlotBeat::new(*event, *tone))
                .collect(),
            setting: self.setting.to_string(),
            themes: self.themes.iter().map(|t| t.to_string()).collect(),
            target_audience: self.audience.to_string(),
            confidence: self.confidence,
            source: format!("offline:{}", self.id),
        }
    }
}

static OFFLINE_BOOKS: &[OfflineBook] = &[
    OfflineBook {
        id: "little-prince",
        aliases: &["어린 왕자", "the little prince", "little prince", "le petit prince"],
        title: "어린 왕자",
        author: "앙투안 드 생텍쥐페리",
        logline: "A little prince travels from his tiny asteroid across the planets and learns from a fox what it means to love.",
        characters: &[
            OfflineCharacter {
                name: "The Little Prince",
                role: "protagonist",
                appearance: "small boy with tousled hair, a long scarf and a tiny cape",
                personality: "curious and honest",
            },
            OfflineCharacter {
                name: "The Pilot",
                role: "companion",
                appearance: "aviator in a flight jacket beside a small propeller plane",
                personality: "patient and kind",
            },
            OfflineCharacter {
                name: "The Fox",
                role: "mentor",
                appearance: "small fox with large pointed ears",
                personality: "wise and patient",
            },
        ],
        beats: [
            ("The pilot meets a little prince in the desert", "curious"),
            ("The prince tells of his flower and his journey across tiny planets", "wonder"),
            ("A fox shows the prince that what is essential is invisible to the eye", "hopeful"),
        ],
        setting: "a desert under the stars and a scattering of tiny planets",
        themes: &["friendship", "love", "childhood", "imagination"],
        audience: "children and families",
        confidence: 0.95,
    },
    OfflineBook {
        id: "alice",
        aliases: &[
            "이상한 나라의 앨리스",
            "앨리스",
            "alice in wonderland",
            "alice's adventures in wonderland",
        ],
        title: "이상한 나라의 앨리스",
        author: "루이스 캐럴",
        logline: "Alice follows a rabbit down a hole into Wonderland, a place of talking animals, riddles and a royal croquet game.",
        characters: &[
            OfflineCharacter {
                name: "Alice",
                role: "protagonist",
                appearance: "girl in a pinafore dress with a hair ribbon",
                personality: "curious and bold",
            },
            OfflineCharacter {
                name: "The Rabbit",
                role: "guide",
                appearance: "hurrying rabbit in a waistcoat holding a pocket watch",
                personality: "fussy and always late",
            },
            OfflineCharacter {
                name: "The Cheshire Cat",
                role: "trickster",
                appearance: "grinning striped cat that fades in and out",
                personality: "mischievous and riddling",
            },
        ],
        beats: [
            ("Alice follows a hurrying rabbit down a rabbit hole", "curious"),
            ("Alice grows and shrinks and joins a tea party with the Hatter", "playful"),
            ("Alice plays croquet with the Queen of Hearts and wakes beside her sister", "hopeful"),
        ],
        setting: "Wonderland, a land of riddles beyond the rabbit hole",
        themes: &["curiosity", "imagination", "adventure", "growing up"],
        audience: "children",
        confidence: 0.9,
    },
    OfflineBook {
        id: "wizard-of-oz",
        aliases: &["오즈의 마법사", "the wizard of oz", "wizard of oz", "the wonderful wizard of oz"],
        title: "오즈의 마법사",
        author: "L. 프랭크 바움",
        logline: "A tornado carries Dorothy and her dog Toto to the land of Oz, where she travels with new friends to meet the Wizard.",
        characters: &[
            OfflineCharacter {
                name: "Dorothy",
                role: "protagonist",
                appearance: "girl in a checked pinafore dress with braided hair and a small dog in her arms",
                personality: "kind and determined",
            },
            OfflineCharacter {
                name: "The Scarecrow",
                role: "companion",
                appearance: "straw-stuffed scarecrow in a patched coat",
                personality: "cheerful and clever",
            },
            OfflineCharacter {
                name: "The Lion",
                role: "companion",
                appearance: "big maned lion with a shy smile",
                personality: "timid but loyal",
            },
        ],
        beats: [
            ("A tornado lifts Dorothy's house and sets it down in Oz", "curious"),
            ("Dorothy walks the brick road with the Scarecrow, the Tin Woodman and the Lion", "playful"),
            ("Dorothy learns she always had the power to go home", "hopeful"),
        ],
        setting: "the land of Oz and its glittering city",
        themes: &["friendship", "home", "courage", "adventure"],
        audience: "children",
        confidence: 0.9,
    },
    OfflineBook {
        id: "peter-pan",
        aliases: &["피터 팬", "peter pan", "peter and wendy"],
        title: "피터 팬",
        author: "J. M. 배리",
        logline: "Peter Pan, the boy who never grows up, flies Wendy and her brothers to Neverland for adventures with fairies, mermaids and pirates.",
        characters: &[
            OfflineCharacter {
                name: "Peter Pan",
                role: "protagonist",
                appearance: "boy in a tunic of leaves with a feathered cap",
                personality: "playful and brave",
            },
            OfflineCharacter {
                name: "Wendy",
                role: "companion",
                appearance: "girl in a nightgown with a hair ribbon",
                personality: "caring and imaginative",
            },
            OfflineCharacter {
                name: "Tinker Bell",
                role: "companion",
                appearance: "tiny fairy trailing sparkling dust",
                personality: "fiery and loyal",
            },
        ],
        beats: [
            ("Peter flies into the nursery to find his shadow", "curious"),
            ("Wendy and her brothers fly over London to Neverland", "joyful"),
            ("Peter outwits Captain Hook and the children sail home", "hopeful"),
        ],
        setting: "Edwardian London and the island of Neverland",
        themes: &["childhood", "adventure", "imagination"],
        audience: "children",
        confidence: 0.9,
    },
];

/// Exact or substring match against the offline table.
pub fn offline_lookup(title: &str) -> Option<BookFacts> {
    let query = squash(title);
    if query.is_empty() {
        return None;
    }
    OFFLINE_BOOKS
        .iter()
        .find(|book| book.matches(&query))
        .map(OfflineBook::to_facts)
}
