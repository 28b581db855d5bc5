use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::{clamp, Error, Result};

const NEGATION_SCALAR: f64 = -0.74;
const BOOSTER_INCREMENT: f64 = 0.293;
const CAPS_INCREMENT: f64 = 0.733;
const EXCLAMATION_INCREMENT: f64 = 0.292;
const MAX_EXCLAMATIONS: usize = 4;
const NORMALIZATION_ALPHA: f64 = 15.0;

/// Valences on the usual -4..4 scale.
const DEFAULT_LEXICON: &[(&str, f64)] = &[
    ("amazing", 2.8),
    ("awesome", 3.1),
    ("awful", -2.0),
    ("bad", -2.5),
    ("beautiful", 2.9),
    ("best", 3.2),
    ("better", 1.9),
    ("bogus", -1.9),
    ("broke", -1.8),
    ("broken", -2.1),
    ("cheap", -0.3),
    ("cheated", -2.3),
    ("comfortable", 2.2),
    ("complaint", -1.2),
    ("crap", -1.6),
    ("damage", -2.2),
    ("damaged", -1.9),
    ("decent", 1.3),
    ("defective", -1.9),
    ("delighted", 2.9),
    ("disappointed", -1.9),
    ("disappointing", -2.2),
    ("disappointment", -2.3),
    ("dissatisfied", -1.6),
    ("durable", 1.4),
    ("easy", 1.9),
    ("effective", 2.1),
    ("excellent", 2.7),
    ("fail", -2.5),
    ("failed", -2.3),
    ("fake", -2.1),
    ("fantastic", 2.6),
    ("fast", 0.7),
    ("faulty", -1.8),
    ("fine", 0.8),
    ("flawless", 2.3),
    ("fraud", -2.8),
    ("garbage", -2.1),
    ("glad", 2.0),
    ("good", 1.9),
    ("great", 3.1),
    ("happy", 2.7),
    ("hate", -2.7),
    ("helpful", 1.8),
    ("horrible", -2.5),
    ("issue", -0.8),
    ("issues", -0.9),
    ("junk", -1.7),
    ("like", 1.5),
    ("liked", 1.8),
    ("love", 3.2),
    ("loved", 2.9),
    ("nice", 1.8),
    ("ok", 1.2),
    ("okay", 0.9),
    ("perfect", 2.7),
    ("pleased", 1.9),
    ("poor", -2.1),
    ("poorly", -1.6),
    ("problem", -1.7),
    ("problems", -1.7),
    ("quality", 0.6),
    ("recommend", 1.5),
    ("recommended", 1.7),
    ("refund", -0.5),
    ("reliable", 1.9),
    ("sad", -2.1),
    ("satisfied", 1.8),
    ("scam", -2.5),
    ("slow", -0.9),
    ("smooth", 1.2),
    ("sturdy", 1.3),
    ("superb", 3.1),
    ("terrible", -2.1),
    ("thanks", 1.9),
    ("unhappy", -1.8),
    ("useless", -1.8),
    ("value", 1.2),
    ("waste", -1.8),
    ("wasted", -2.2),
    ("weak", -1.4),
    ("wonderful", 2.7),
    ("working", 0.6),
    ("works", 1.1),
    ("worse", -2.1),
    ("worst", -3.1),
    ("worth", 0.9),
    ("worthless", -1.9),
    ("wow", 2.8),
];

const BOOSTERS_UP: &[&str] = &[
    "absolutely",
    "completely",
    "extremely",
    "highly",
    "incredibly",
    "really",
    "so",
    "super",
    "totally",
    "very",
];

const BOOSTERS_DOWN: &[&str] = &[
    "barely",
    "hardly",
    "kinda",
    "marginally",
    "slightly",
    "somewhat",
];

const NEGATORS: &[&str] = &[
    "aint", "aren't", "can't", "cannot", "couldn't", "didn't", "doesn't", "don't", "isn't",
    "never", "no", "nor", "not", "nothing", "wasn't", "without", "won't", "wouldn't",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    pub risk_keywords: Vec<String>,
    /// Optional `word<TAB>valence` file replacing the embedded lexicon.
    pub lexicon_path: Option<PathBuf>,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            risk_keywords: [
                "fake",
                "broken",
                "waste",
                "duplicate",
                "bad",
                "poor",
                "damage",
                "defective",
                "fraud",
                "worst",
                "return",
                "refund",
            ]
            .iter()
            .map(|word| word.to_string())
            .collect(),
            lexicon_path: None,
        }
    }
}

/// Word → valence table for the sentiment scorer.
#[derive(Debug, Clone)]
pub struct Lexicon {
    valences: HashMap<String, f64>,
}

impl Default for Lexicon {
    fn default() -> Self {
        Self {
            valences: DEFAULT_LEXICON
                .iter()
                .map(|(word, valence)| (word.to_string(), *valence))
                .collect(),
        }
    }
}

impl Lexicon {
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .map_err(|err| Error::Lexicon(format!("{}: {}", path.display(), err)))?;
        Self::from_reader(file)
    }

    /// Reads tab-separated lines whose first two columns are a token and its
    /// valence. Extra columns are ignored.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut valences = HashMap::new();
        for (index, line) in BufReader::new(reader).lines().enumerate() {
            let line = line.map_err(|err| Error::Lexicon(err.to_string()))?;
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            let mut columns = line.split('\t');
            let (Some(word), Some(valence)) = (columns.next(), columns.next()) else {
                return Err(Error::Lexicon(format!("line {}: expected two columns", index + 1)));
            };
            let valence: f64 = valence.trim().parse().map_err(|_| {
                Error::Lexicon(format!("line {}: invalid valence `{}`", index + 1, valence))
            })?;
            valences.insert(word.trim().to_lowercase(), valence);
        }
        if valences.is_empty() {
            return Err(Error::Lexicon("lexicon has no entries".to_string()));
        }
        Ok(Self { valences })
    }

    pub fn valence(&self, word: &str) -> Option<f64> {
        self.valences.get(word).copied()
    }

    pub fn len(&self) -> usize {
        self.valences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.valences.is_empty()
    }
}

/// Lexicon-based compound polarity in [-1, 1].
#[derive(Debug, Clone, Default)]
pub struct SentimentScorer {
    lexicon: Lexicon,
}

impl SentimentScorer {
    pub fn new(lexicon: Lexicon) -> Self {
        Self { lexicon }
    }

    pub fn compound(&self, text: &str) -> f64 {
        let tokens: Vec<&str> = word_regex()
            .find_iter(text)
            .map(|token| token.as_str())
            .collect();
        if tokens.is_empty() {
            return 0.0;
        }
        let lowered: Vec<String> = tokens.iter().map(|token| token.to_lowercase()).collect();

        let shouting = tokens.iter().filter(|token| is_shouted(token)).count();
        let mixed_case = shouting > 0 && shouting < tokens.len();

        let mut valences = vec![0.0; tokens.len()];
        for (index, word) in lowered.iter().enumerate() {
            if booster(word).is_some() {
                continue;
            }
            let Some(mut valence) = self.lexicon.valence(word) else {
                continue;
            };

            if mixed_case && is_shouted(tokens[index]) {
                valence += CAPS_INCREMENT * valence.signum();
            }
            for distance in 1..=3 {
                if index < distance {
                    break;
                }
                if let Some(boost) = booster(&lowered[index - distance]) {
                    let decay = 1.0 - 0.05 * (distance - 1) as f64;
                    valence += boost * decay * valence.signum();
                }
            }
            let negated = (1..=3)
                .filter(|distance| index >= *distance)
                .any(|distance| is_negator(&lowered[index - distance]));
            if negated {
                valence *= NEGATION_SCALAR;
            }

            valences[index] = valence;
        }

        if let Some(pivot) = lowered.iter().position(|word| word == "but") {
            for (index, valence) in valences.iter_mut().enumerate() {
                if index < pivot {
                    *valence *= 0.5;
                } else if index > pivot {
                    *valence *= 1.5;
                }
            }
        }

        let mut sum: f64 = valences.iter().sum();
        if sum != 0.0 {
            let exclamations = text.matches('!').count().min(MAX_EXCLAMATIONS);
            sum += EXCLAMATION_INCREMENT * exclamations as f64 * sum.signum();
        }

        clamp(sum / (sum * sum + NORMALIZATION_ALPHA).sqrt(), -1.0, 1.0)
    }
}

/// Whole-word keyword matcher. A keyword may span several words; any run of
/// whitespace matches the gap between them.
#[derive(Debug, Clone)]
pub struct RiskDetector {
    pattern: Option<Regex>,
}

impl RiskDetector {
    pub fn new(keywords: &[String]) -> Result<Self> {
        let alternatives: Vec<String> = keywords
            .iter()
            .map(|keyword| {
                keyword
                    .split_whitespace()
                    .map(regex::escape)
                    .collect::<Vec<_>>()
                    .join(r"\s+")
            })
            .filter(|alternative| !alternative.is_empty())
            .collect();
        if alternatives.is_empty() {
            return Ok(Self { pattern: None });
        }

        // `\b` would never match next to a keyword that starts or ends in
        // punctuation, so the edges are spelled out as non-word or text end.
        let source = format!(r"(?i)(?:^|\W)(?:{})(?:\W|$)", alternatives.join("|"));
        let pattern = Regex::new(&source)
            .map_err(|err| Error::Config(format!("invalid risk keywords: {}", err)))?;
        Ok(Self {
            pattern: Some(pattern),
        })
    }

    pub fn is_risky(&self, text: &str) -> bool {
        self.pattern
            .as_ref()
            .is_some_and(|pattern| pattern.is_match(text))
    }
}

/// Per-record text outputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TextSignals {
    pub sentiment_score: f64,
    pub risk_flag: u8,
}

impl TextSignals {
    pub const NEUTRAL: TextSignals = TextSignals {
        sentiment_score: 0.0,
        risk_flag: 0,
    };
}

#[derive(Debug, Clone)]
pub struct TextSignalExtractor {
    sentiment: SentimentScorer,
    risk: RiskDetector,
}

impl TextSignalExtractor {
    pub fn new(sentiment: SentimentScorer, risk: RiskDetector) -> Self {
        Self { sentiment, risk }
    }

    /// Builds the extractor, loading the configured lexicon. A lexicon that
    /// cannot be loaded fails the whole run.
    pub fn from_config(config: &TextConfig) -> Result<Self> {
        let lexicon = match config.lexicon_path.as_deref() {
            Some(path) => Lexicon::from_path(path)?,
            None => Lexicon::default(),
        };
        tracing::debug!(entries = lexicon.len(), "loaded sentiment lexicon");
        Ok(Self::new(
            SentimentScorer::new(lexicon),
            RiskDetector::new(&config.risk_keywords)?,
        ))
    }

    pub fn extract(&self, review: Option<&str>) -> TextSignals {
        let Some(text) = review.filter(|text| !text.trim().is_empty()) else {
            return TextSignals::NEUTRAL;
        };
        TextSignals {
            sentiment_score: self.sentiment.compound(text),
            risk_flag: u8::from(self.risk.is_risky(text)),
        }
    }
}

static WORD_RE: OnceLock<Regex> = OnceLock::new();

/// Words, keeping inner apostrophes so contractions like "isn't" stay whole.
fn word_regex() -> &'static Regex {
    WORD_RE.get_or_init(|| Regex::new(r"\w+(?:'\w+)*").expect("word regex"))
}

fn booster(word: &str) -> Option<f64> {
    if BOOSTERS_UP.contains(&word) {
        Some(BOOSTER_INCREMENT)
    } else if BOOSTERS_DOWN.contains(&word) {
        Some(-BOOSTER_INCREMENT)
    } else {
        None
    }
}

fn is_negator(word: &str) -> bool {
    NEGATORS.contains(&word) || word.ends_with("n't")
}

fn is_shouted(token: &str) -> bool {
    token.chars().any(char::is_alphabetic)
        && token
            .chars()
            .filter(|ch| ch.is_alphabetic())
            .all(char::is_uppercase)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> RiskDetector {
        RiskDetector::new(&TextConfig::default().risk_keywords).unwrap()
    }

    #[test]
    fn risk_matches_whole_words_only() {
        let risk = detector();
        assert!(!risk.is_risky("this product is badly packaged"));
        assert!(!risk.is_risky("comes with a nice badge"));
        assert!(risk.is_risky("this is bad quality"));
        assert!(risk.is_risky("Arrived BROKEN, asked for a Refund."));
        assert!(risk.is_risky("bad,poor"));
    }

    #[test]
    fn risk_supports_multi_word_keywords() {
        let risk = RiskDetector::new(&["not working".to_string()]).unwrap();
        assert!(risk.is_risky("charger is not working after a week"));
        assert!(risk.is_risky("charger is NOT\n  working"));
        assert!(!risk.is_risky("working fine, not bad"));
    }

    #[test]
    fn risk_keywords_are_literal_text() {
        let risk = RiskDetector::new(&["c++".to_string(), "(fake)".to_string()]).unwrap();
        assert!(risk.is_risky("looks like a (fake) logo"));
        assert!(risk.is_risky("the c++ book"));
        assert!(!risk.is_risky("fake leather"));
        assert!(!risk.is_risky("ccc"));

        let empty = RiskDetector::new(&[String::new(), "  ".to_string()]).unwrap();
        assert!(!empty.is_risky("broken and bad"));
    }

    #[test]
    fn exclamations_stop_counting_after_four() {
        let scorer = SentimentScorer::default();
        let four = scorer.compound("good product!!!!");
        let five = scorer.compound("good product!!!!!");
        let one = scorer.compound("good product!");
        assert_eq!(four, five);
        assert!(four > one);
    }

    #[test]
    fn contractions_negate() {
        let scorer = SentimentScorer::default();
        assert!(scorer.compound("it isn't good") < 0.0);
        assert!(scorer.compound("Don't love it") < 0.0);
    }

    #[test]
    fn missing_text_is_neutral() {
        let extractor = TextSignalExtractor::from_config(&TextConfig::default()).unwrap();
        assert_eq!(extractor.extract(None), TextSignals::NEUTRAL);
        assert_eq!(extractor.extract(Some("   ")), TextSignals::NEUTRAL);
    }

    #[test]
    fn compound_polarity_follows_lexicon() {
        let scorer = SentimentScorer::default();
        let positive = scorer.compound("Great cable, works perfect. Love it!");
        let negative = scorer.compound("Worst purchase, broken and useless");
        let neutral = scorer.compound("The cable is two meters long");
        assert!(positive > 0.5);
        assert!(negative < -0.5);
        assert_eq!(neutral, 0.0);
        assert!((-1.0..=1.0).contains(&positive));
    }

    #[test]
    fn negation_and_boosters_shift_polarity() {
        let scorer = SentimentScorer::default();
        let plain = scorer.compound("good product");
        let boosted = scorer.compound("very good product");
        let negated = scorer.compound("not good product");
        assert!(boosted > plain);
        assert!(negated < 0.0);
    }

    #[test]
    fn but_clause_dominates() {
        let scorer = SentimentScorer::default();
        let score = scorer.compound("looks good but stopped working, terrible");
        assert!(score < 0.0);
    }

    #[test]
    fn lexicon_file_parses_and_rejects_garbage() {
        let lexicon = Lexicon::from_reader("sturdy\t1.5\t0.5\t[1, 2]\n# comment\n".as_bytes())
            .unwrap();
        assert_eq!(lexicon.valence("sturdy"), Some(1.5));
        assert!(matches!(
            Lexicon::from_reader("".as_bytes()),
            Err(Error::Lexicon(_))
        ));
        assert!(Lexicon::from_reader("word\tnope\n".as_bytes()).is_err());
    }

    #[test]
    fn missing_lexicon_file_is_fatal() {
        let config = TextConfig {
            lexicon_path: Some(PathBuf::from("/nonexistent/lexicon.tsv")),
            ..TextConfig::default()
        };
        assert!(matches!(
            TextSignalExtractor::from_config(&config),
            Err(Error::Lexicon(_))
        ));
    }
}
