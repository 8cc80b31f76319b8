//! Fixed regex families shared by the heuristic strategies and detectors.
//!
//! All patterns are case-insensitive unless noted.

use std::sync::LazyLock;

use regex::Regex;

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap()
}

// --- claim wording -------------------------------------------------------

pub static NORMATIVE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\b(should|shouldn't|must|mustn't|ought to|needs? to|has to|have to|deserves?|it is (wrong|right|unfair|unacceptable|immoral))\b")
});

pub static FUTURE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\b(will|won't|shall|going to|(is|are) expected to|forecasts?|forecasted|predicts?|predicted|projected to|in the coming \w+|next (year|decade|century|month)|in the future)\b")
});

pub static PAST: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\b(was|were|had|did|happened|occurred|last (year|decade|month|century)|ago|previously|historically)\b")
});

pub static PRESENT: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\b(is|are|has|have|currently|now|today|nowadays|these days|at present)\b")
});

/// Optional preposition plus a four-digit year, e.g. "by 2050"
pub static YEAR: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\b(?:(?:by|in|since|until|before|after|from) )?(1[89]\d{2}|20\d{2})\b")
});

pub static CAUSAL: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\b(causes?|caused|causing|leads? to|led to|results? in|resulted in|because of|due to|drives?|triggers?|produces?|(increases?|reduces?|raises?|lowers?) the risk|prevents?)\b")
});

pub static CORRELATIONAL_CLAIM: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\b(linked (to|with)|associated with|correlat\w*|tied to|connected to)\b")
});

pub static COMPARATIVE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\b(than|compared (to|with)|versus|vs\.?|relative to|outperforms?|the (most|least|best|worst|highest|lowest))\b")
});

pub static UNIVERSAL: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\b(all|every|everyone|everybody|always|never|none|no one|nobody|entire|whole)\b")
});

pub static MAJORITY: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\b(most|majority|the bulk of|nearly all|almost all)\b")
});

pub static MINORITY: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)\b(few|minority|a handful|rarely)\b"));

pub static EXISTENTIAL: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\b(some|there (is|are|exists?)|at least one)\b")
});

pub static VAGUE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\b(many|lots of|a lot|numerous|several|significant(ly)?|countless|tons of|substantial(ly)?|much)\b")
});

pub static PRECISE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\b\d+(\.\d+)?\s?(%|percent\b|per cent\b|million\b|billion\b|thousand\b|times\b)")
});

pub static DEFINITE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\b(will|proves?|proven|definitely|certainly|always|never|guaranteed|undeniabl[ey]|without (a )?doubt|clearly)\b")
});

pub static PROBABLE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)\b(likely|probably|expected to|tends? to)\b"));

pub static HEDGED: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\b(may|might|could|possibly|perhaps|suggests?|potentially)\b")
});

/// Certainty markers strong enough to count as rhetorical overstatement
pub const STRONG_MARKERS: &[&str] = &[
    "will",
    "prove",
    "proves",
    "proven",
    "definitely",
    "always",
    "never",
    "guaranteed",
    "certainly",
    "undeniably",
];

/// First verb-like token; splits subject from predicate
pub static VERB: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\b(is|are|was|were|will|would|has|have|had|can|could|may|might|must|should|does|do|did|causes?|caused|leads?|led|increases?|increased|decreases?|decreased|reduces?|reduced|rises?|rose|falls?|fell|grows?|grew|kills?|killed|makes?|made|shows?|showed|proves?|contains?|helps?|prevents?)\b")
});

// --- geography -----------------------------------------------------------

pub static GLOBAL: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\b(global(ly)?|world(wide)?|planet|earth|international(ly)?|humanity|every country)\b")
});

pub static REGIONAL: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\b(region(al)?|europe(an)?|asia(n)?|africa(n)?|latin america|middle east|continent(al)?|scandinavia)\b")
});

/// Country abbreviations are matched case-sensitively to avoid "us"
pub static NATIONAL: LazyLock<Regex> = LazyLock::new(|| {
    re(r"\b(?i:national(ly)?|nationwide|federal|united states|america|britain|canada|india|china|australia|germany|france|japan|brazil|mexico)\b|\b(US|USA|UK)\b")
});

pub static LOCAL: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\b(local(ly)?|city|town|county|neighbou?rhood|municipal|village|district)\b")
});

// --- source classification -----------------------------------------------

pub static MODEL_LANGUAGE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\b(forecasts?|forecasting|projections?|projected|models?|modell?ed|modell?ing|scenarios?|simulations?|simulated)\b")
});

/// Matched against URL and provider name
pub static PEER_REVIEW: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)(doi\.org|pubmed|ncbi\.nlm\.nih\.gov|nature\.com|science\.org|sciencedirect\.com|springer(link)?\.com|wiley\.com|thelancet\.com|nejm\.org|jamanetwork\.com|bmj\.com|plos(one)?\.org|cell\.com|academic\.oup\.com|tandfonline\.com|frontiersin\.org|\bjournal of\b|peer[- ]reviewed)")
});

pub static META_ANALYSIS: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\b(meta-analys[ei]s|meta analys[ei]s|systematic review|pooled analysis|cochrane)\b")
});

pub static OPINION: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)(/opinions?/|/op-ed|/editorials?/|/blogs?/|\bopinion\b|\bop-ed\b|\beditorial\b|\bcommentary\b|\bblog\b|substack\.com|medium\.com|\bcolumnist\b)")
});

pub static NEWS: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\b(news|times|post|reuters|associated press|ap|bbc|cnn|npr|guardian|tribune|herald|gazette|daily|chronicle|telegraph|bloomberg|axios|politico|wire|press)\b")
});

/// Domains always treated as institutional (suffix match)
pub const INSTITUTIONAL_DOMAINS: &[&str] = &[
    "who.int",
    "un.org",
    "worldbank.org",
    "imf.org",
    "oecd.org",
    "europa.eu",
    "ipcc.ch",
    "nih.gov",
    "cdc.gov",
    "nasa.gov",
    "noaa.gov",
    "gov.uk",
    "nhs.uk",
    "ecdc.europa.eu",
    "unicef.org",
    "wmo.int",
];

// --- evidence text -------------------------------------------------------

/// Language projecting forward in time
pub static FORWARD_LOOKING: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\b(forecasts?|projections?|projected|outlook|expected to|will|by 20\d{2}|scenarios?|models?)\b")
});

pub static CONDITIONAL_SCOPE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\b(depending on|depends on|in some|in certain|varies (by|across|between)|under certain|only (in|for|when)|in specific|not all|context[- ]dependent)\b")
});

pub static CORRELATIONAL_EVIDENCE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\b(correlat\w*|associated with|association between|linked (to|with)|(may|might|could) cause|observational)\b")
});

pub static NARROW_SAMPLE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\b((a|one|single|small|pilot) (study|trial|survey|sample|cohort)|sample (size|of)|one (region|country|city|state|site|hospital|school)|participants|case study)\b")
});

pub static METHOD_CAVEAT: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\b(methodolog\w*|not directly comparable|different definitions|measured differently|definitions (vary|differ)|comparison is (difficult|limited)|caveats?|apples to oranges|inconsistent (measurement|reporting))\b")
});

/// Whether any of the literal markers is a strong certainty marker
pub fn has_strong_marker(markers: &[String]) -> bool {
    markers
        .iter()
        .any(|m| STRONG_MARKERS.contains(&m.to_lowercase().as_str()))
}

/// Lowercased literal matches of a pattern, deduplicated in order
pub fn literal_matches(pattern: &Regex, text: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for m in pattern.find_iter(text) {
        let word = m.as_str().to_lowercase();
        if !found.contains(&word) {
            found.push(word);
        }
    }
    found
}
