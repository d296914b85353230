use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::domain::catalog::{
    CatalogItem, ItemId, BEEF_BURGER_ID, CHICKEN_BURGER_ID, FRIES_ID, SODA_ID,
};
use crate::domain::order::{OrderKind, MAX_QUANTITY, MIN_QUANTITY};

const QUANTITY: &str =
    r"(\d{1,2}|uma|um|duas|dois|tres|quatro|cinco|seis|sete|oito|nove|dez)";

const FIXED_IDS: [&str; 4] = [BEEF_BURGER_ID, CHICKEN_BURGER_ID, FRIES_ID, SODA_ID];

const BURGER_VARIANTS: &[(&str, &str)] = &[
    ("bovino", BEEF_BURGER_ID),
    ("boi", BEEF_BURGER_ID),
    ("carne", BEEF_BURGER_ID),
    ("frango", CHICKEN_BURGER_ID),
];

enum Target {
    Item(&'static str),
    Variant(&'static [(&'static str, &'static str)]),
}

impl Target {
    fn resolve(&self, captures: &Captures<'_>) -> Option<&'static str> {
        match self {
            Self::Item(id) => Some(*id),
            Self::Variant(variants) => {
                let token = captures.get(2)?.as_str();
                variants.iter().find(|(variant, _)| *variant == token).map(|(_, id)| *id)
            }
        }
    }
}

struct FixedPattern {
    regex: Regex,
    target: Target,
}

static FIXED_PATTERNS: LazyLock<Vec<FixedPattern>> = LazyLock::new(|| {
    [
        (
            r"(?:x-?)?(?:hamburgueres|hamburguers|hamburguer|hamburgers|hamburger|burgers|burger|lanches|lanche)\s+(?:de\s+)?(bovino|boi|carne|frango)",
            Target::Variant(BURGER_VARIANTS),
        ),
        (r"(?:porcoes\s+de\s+|porcao\s+de\s+)?batatas?(?:\s+fritas?)?", Target::Item(FRIES_ID)),
        (r"(?:latas?\s+de\s+)?(?:refrigerantes|refrigerante|refris|refri)", Target::Item(SODA_ID)),
    ]
    .into_iter()
    .filter_map(|(body, target)| {
        Regex::new(&format!(r"\b{QUANTITY}(?:\s*x)?\s+{body}\b"))
            .ok()
            .map(|regex| FixedPattern { regex, target })
    })
    .collect()
});

static DELIVERY: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"(?is)\b(?:delivery|entregar|entrega)\b[\s,:\-]*(?:(?:na|no|em|para|pra)\s+)?(.*)$",
    )
    .ok()
});

static DINE_IN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\b(?:no\s+local|comer\s+aqui|mesa)\b").ok());

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedItem {
    pub id: ItemId,
    pub quantity: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extraction {
    pub items: Vec<ExtractedItem>,
    pub order_kind: Option<OrderKind>,
    pub address: Option<String>,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Best-effort parse of a free-text order against the current catalog.
///
/// Items come back in message order. Repeated mentions stay separate
/// entries, and anything unavailable, unpriced or outside the quantity range
/// is dropped.
pub fn extract(text: &str, catalog: &[CatalogItem]) -> Extraction {
    let (item_text, address) = split_delivery(text);
    let folded = fold(item_text);

    let mut found: Vec<(usize, ExtractedItem)> = Vec::new();
    for pattern in FIXED_PATTERNS.iter() {
        for captures in pattern.regex.captures_iter(&folded) {
            let Some(id) = pattern.target.resolve(&captures) else {
                continue;
            };
            push_match(&mut found, &captures, id, catalog);
        }
    }

    for item in catalog.iter().filter(|item| !FIXED_IDS.contains(&item.id.as_str())) {
        let Some(regex) = name_pattern(&item.name) else {
            continue;
        };
        for captures in regex.captures_iter(&folded) {
            push_match(&mut found, &captures, item.id.as_str(), catalog);
        }
    }

    found.sort_by_key(|(position, _)| *position);

    let order_kind = if address.is_some() {
        Some(OrderKind::Delivery)
    } else if DINE_IN.as_ref().is_some_and(|regex| regex.is_match(&folded)) {
        Some(OrderKind::DineIn)
    } else {
        None
    };

    Extraction {
        items: found.into_iter().map(|(_, item)| item).collect(),
        order_kind,
        address: address.flatten(),
    }
}

/// Splits off the delivery clause. The outer option says whether a delivery
/// keyword was present, the inner one carries the captured address.
fn split_delivery(text: &str) -> (&str, Option<Option<String>>) {
    let Some(captures) = DELIVERY.as_ref().and_then(|regex| regex.captures(text)) else {
        return (text, None);
    };
    let Some(whole) = captures.get(0) else {
        return (text, None);
    };

    let address = captures
        .get(1)
        .map(|tail| tail.as_str().trim().trim_end_matches(['.', '!', ',', ';']).trim().to_owned())
        .filter(|tail| !tail.is_empty());

    (&text[..whole.start()], Some(address))
}

fn push_match(
    found: &mut Vec<(usize, ExtractedItem)>,
    captures: &Captures<'_>,
    id: &str,
    catalog: &[CatalogItem],
) {
    let Some(quantity_match) = captures.get(1) else {
        return;
    };
    let Some(quantity) = parse_quantity(quantity_match.as_str()) else {
        return;
    };
    if !(MIN_QUANTITY..=MAX_QUANTITY).contains(&quantity) {
        return;
    }

    let orderable = catalog.iter().any(|item| item.id.as_str() == id && item.is_orderable());
    if orderable {
        found.push((quantity_match.start(), ExtractedItem { id: ItemId::new(id), quantity }));
    }
}

fn name_pattern(name: &str) -> Option<Regex> {
    let folded = fold(name);
    let tokens: Vec<String> = folded.split_whitespace().map(regex::escape).collect();
    if tokens.is_empty() {
        return None;
    }

    let boundary = if folded.ends_with(char::is_alphanumeric) { r"\b" } else { "" };
    Regex::new(&format!(r"\b{QUANTITY}(?:\s*x)?\s+{}{boundary}", tokens.join(r"\s+"))).ok()
}

/// Reads a quantity written as digits or as a Portuguese number word.
pub fn parse_quantity(token: &str) -> Option<u32> {
    let token = fold(token.trim());
    if let Ok(value) = token.parse::<u32>() {
        return Some(value);
    }

    let value = match token.as_str() {
        "um" | "uma" => 1,
        "dois" | "duas" => 2,
        "tres" => 3,
        "quatro" => 4,
        "cinco" => 5,
        "seis" => 6,
        "sete" => 7,
        "oito" => 8,
        "nove" => 9,
        "dez" => 10,
        _ => return None,
    };
    Some(value)
}

/// Lowercases and strips Portuguese diacritics.
pub fn fold(text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}
