// 🏷️ Keyword Classifier - Rules as Data
// Ordered (category, keywords) table + first-match substring classification

use anyhow::{Context as AnyhowContext, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::category::Category;
use crate::error::KeywordTableError;

// ============================================================================
// KEYWORD TABLE
// ============================================================================

/// One row of the keyword table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryKeywords {
    pub category: Category,
    pub keywords: Vec<String>,
}

/// Ordered mapping from category to keywords.
///
/// Entry order is the tie-break: the first entry with a matching keyword wins.
/// Keywords are stored lower-cased and trimmed.
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordTable {
    entries: Vec<CategoryKeywords>,
}

impl KeywordTable {
    /// Build a table from entries, keeping their order.
    pub fn from_entries(entries: Vec<CategoryKeywords>) -> Result<Self, KeywordTableError> {
        let mut table = KeywordTable { entries: Vec::with_capacity(entries.len()) };

        for entry in entries {
            if entry.category == Category::Other {
                return Err(KeywordTableError::OtherHasKeywords);
            }
            if table.position(entry.category).is_some() {
                return Err(KeywordTableError::DuplicateCategory(entry.category.label().to_string()));
            }
            table.entries.push(CategoryKeywords {
                category: entry.category,
                keywords: clean_keywords(entry.keywords),
            });
        }

        Ok(table)
    }

    /// Parse a JSON array of `{"category": "...", "keywords": [...]}`
    pub fn from_json_str(json: &str) -> Result<Self, KeywordTableError> {
        let entries: Vec<CategoryKeywords> = serde_json::from_str(json)?;
        Self::from_entries(entries)
    }

    /// Load a keyword table from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read keyword file: {:?}", path.as_ref()))?;

        let table = Self::from_json_str(&content)
            .with_context(|| format!("Invalid keyword file: {:?}", path.as_ref()))?;

        Ok(table)
    }

    /// Append keywords to a category. A category not yet in the table is added
    /// at the end of the priority order.
    pub fn extend(&mut self, category: Category, keywords: Vec<String>) -> Result<(), KeywordTableError> {
        if category == Category::Other {
            return Err(KeywordTableError::OtherHasKeywords);
        }

        let keywords = clean_keywords(keywords);
        match self.position(category) {
            Some(idx) => {
                let existing = &mut self.entries[idx].keywords;
                for keyword in keywords {
                    if !existing.contains(&keyword) {
                        existing.push(keyword);
                    }
                }
            }
            None => self.entries.push(CategoryKeywords { category, keywords }),
        }

        Ok(())
    }

    /// Entries in priority order
    pub fn entries(&self) -> &[CategoryKeywords] {
        &self.entries
    }

    /// Categories in priority order (without the `Other` fallback)
    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.entries.iter().map(|e| e.category)
    }

    /// Every label as this table ranks it: table entries first, then the
    /// labels it leaves out, with `Other` last.
    pub fn priority_order(&self) -> Vec<Category> {
        let mut order: Vec<Category> = self.categories().collect();
        order.extend(Category::all().iter().copied().filter(|c| self.position(*c).is_none()));
        order
    }

    pub fn keywords_for(&self, category: Category) -> &[String] {
        self.position(category)
            .map(|idx| self.entries[idx].keywords.as_slice())
            .unwrap_or(&[])
    }

    pub fn keyword_count(&self) -> usize {
        self.entries.iter().map(|e| e.keywords.len()).sum()
    }

    fn position(&self, category: Category) -> Option<usize> {
        self.entries.iter().position(|e| e.category == category)
    }

    /// The built-in dictionary.
    pub fn default_table() -> Self {
        // Built-in rows are unique and never contain Other, so no validation pass
        let entries = DEFAULT_KEYWORDS
            .iter()
            .map(|(category, keywords)| CategoryKeywords {
                category: *category,
                keywords: clean_keywords(keywords.iter().map(|k| k.to_string()).collect()),
            })
            .collect();

        KeywordTable { entries }
    }
}

impl Default for KeywordTable {
    fn default() -> Self {
        Self::default_table()
    }
}

fn clean_keywords(keywords: Vec<String>) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::with_capacity(keywords.len());
    for keyword in keywords {
        let keyword = keyword.trim().to_lowercase();
        if !keyword.is_empty() && !cleaned.contains(&keyword) {
            cleaned.push(keyword);
        }
    }
    cleaned
}

// ============================================================================
// CLASSIFICATION RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub category: Category,
    /// Keyword that decided the category (None = fell back to Other)
    pub matched_keyword: Option<String>,
}

// ============================================================================
// CLASSIFIER
// ============================================================================

#[derive(Debug, Clone)]
pub struct Classifier {
    table: KeywordTable,
}

impl Classifier {
    pub fn new(table: KeywordTable) -> Self {
        Classifier { table }
    }

    pub fn table(&self) -> &KeywordTable {
        &self.table
    }

    /// Return exactly one category for a description.
    pub fn classify(&self, description: &str) -> Category {
        self.explain(description).category
    }

    /// Classify and report which keyword decided it.
    pub fn explain(&self, description: &str) -> Classification {
        let description_lower = description.to_lowercase();

        // First category (priority order) with any substring hit
        for entry in &self.table.entries {
            if let Some(keyword) = entry
                .keywords
                .iter()
                .find(|k| description_lower.contains(k.as_str()))
            {
                return Classification {
                    category: entry.category,
                    matched_keyword: Some(keyword.clone()),
                };
            }
        }

        Classification { category: Category::Other, matched_keyword: None }
    }

    pub fn classify_batch<S: AsRef<str>>(&self, descriptions: &[S]) -> Vec<Category> {
        descriptions.iter().map(|d| self.classify(d.as_ref())).collect()
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(KeywordTable::default_table())
    }
}

// ============================================================================
// DEFAULT DICTIONARY (priority order = row order)
// ============================================================================

const DEFAULT_KEYWORDS: &[(Category, &[&str])] = &[
    (
        Category::FoodAndDining,
        &[
            "restaurant", "cafe", "coffee", "starbucks", "dunkin", "mcdonald",
            "burger", "pizza", "chipotle", "subway", "taco", "doordash",
            "ubereats", "grubhub", "postmates", "seamless", "delivery",
            "diner", "bistro", "grill", "bar", "pub", "kitchen", "food",
            "dining", "eatery", "panera", "chick-fil-a", "chick fil a", "wendys", "kfc",
            "panda express", "taco bell", "coffee hut", "dairy queen",
            "in n out", "domino", "yogurtland", "coldstone", "ice cream",
            "wingstop", "cajun", "burrito", "snack", "salt and straw",
            "koja kitchen", "purple kow", "yogurt park", "mochiholic",
            "bricks cafe", "sweet spot", "matcha cafe", "ice monster",
            "angry chickz", "campus burgers", "too good to go",
        ],
    ),
    (
        Category::Groceries,
        &[
            "grocery", "supermarket", "whole foods", "trader joe", "trader jo",
            "safeway", "kroger", "walmart", "target", "costco", "sam's club", "aldi",
            "publix", "wegmans", "heb", "market", "fresh", "food lion",
            "giant eagle", "stop & shop", "harris teeter", "sprouts",
            "dollar tree", "dollartre",
        ],
    ),
    (
        Category::Transportation,
        &[
            "uber", "lyft", "taxi", "cab", "transit", "subway", "metro",
            "bus", "train", "parking", "gas", "fuel", "shell", "exxon",
            "chevron", "bp", "mobil", "citgo", "speedway", "wawa",
            "car wash", "auto", "vehicle", "dmv", "registration", "toll",
            "sokwik",
        ],
    ),
    (
        Category::Entertainment,
        &[
            "movie", "cinema", "theater", "theatre", "netflix", "hulu",
            "spotify", "apple music", "disney", "hbo",
            "youtube", "twitch", "game", "gaming", "steam", "playstation",
            "xbox", "nintendo", "concert", "ticket", "ticketmaster",
            "stubhub", "sports event", "gym", "fitness", "club", "membership",
        ],
    ),
    (
        Category::Gambling,
        &[
            "prizepicks", "underdog", "draftkings", "fanduel", "betmgm",
            "caesars", "pointsbet", "bet365", "unibet", "bovada",
            "mybookie", "bet online", "sports bet", "casino", "poker",
            "slots", "lottery", "scratch", "gambling",
        ],
    ),
    (
        Category::Subscriptions,
        &[
            "whop", "patreon", "onlyfans", "substack", "chatgpt", "openai",
            "adobe", "office 365", "icloud", "dropbox", "google one",
            "youtube premium", "spotify premium", "apple one", "microsoft 365",
            "creative cloud", "zoom", "slack", "notion", "canva",
            "grammarly", "medium", "scribd", "prime video", "walter ai",
            "agent eo premium", "worldfinancialgroup", "amazon prime",
            "apple.com bill", "apple com bill", "apple bill",
        ],
    ),
    (
        Category::Transfers,
        &[
            "apple cash", "apple pay balance", "venmo", "zelle", "paypal",
            "cash app", "google pay", "facebook pay", "transfer to",
            "transfer from", "pmnt sent", "pmnt received", "p2p transfer",
            "peer to peer", "balance add", "balance transfer", "pc transfer",
            "ppd", "cashout", "direct pay", "direct deposit",
        ],
    ),
    (
        Category::Shopping,
        &[
            "amazon", "ebay", "etsy", "shop", "store", "mall", "retail",
            "best buy", "apple store", "nike", "adidas", "macy", "nordstrom",
            "gap", "zara", "h&m", "forever 21", "old navy", "tj maxx",
            "marshalls", "ross", "kohls", "jcpenney", "sephora", "ulta",
            "home depot", "lowes", "ikea", "furniture", "clothing", "apparel",
            "cscsw", "temu", "shein", "wish", "aliexpress", "wayfair",
            "fashionnova", "tiktok shop", "shop miss a",
        ],
    ),
    (
        Category::BillsAndUtilities,
        &[
            "electric", "electricity", "power", "gas company", "water",
            "internet", "cable", "phone", "mobile", "verizon", "at&t",
            "t-mobile", "sprint", "comcast", "xfinity", "spectrum",
            "utility", "bill payment", "insurance", "rent", "mortgage",
            "loan", "credit card payment", "bank fee",
        ],
    ),
    (
        Category::Health,
        &[
            "pharmacy", "cvs", "walgreens", "rite aid", "medical", "hospital",
            "doctor", "clinic", "health", "dental", "dentist", "vision",
            "optometry", "prescription", "medicine", "wellness", "therapy",
            "counseling", "urgent care", "emergency", "lab", "test",
        ],
    ),
    (
        Category::Income,
        &[
            "salary", "payroll", "deposit", "direct deposit", "payment received",
            "refund", "reimbursement", "bonus", "dividend",
            "interest", "cashback", "reward", "credit via trust",
        ],
    ),
];

// ============================================================================
// TESTS
// ============================================================================
