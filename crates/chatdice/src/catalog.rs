// ABOUTME: Orders and groups the available rule systems for a system picker.
// ABOUTME: Japanese titles sort by a folded katakana reading; translated systems follow by language.

use std::cmp::Ordering;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::system::DEFAULT_SYSTEM;

/// Language groups, in display order.
const LANGUAGE_ORDER: [&str; 5] = ["English", "正體中文", "简体中文", "한국어", "Other"];

/// What an engine reports about one of its rule systems.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSystemInfo {
    pub id: String,
    pub name: String,
    pub sort_key: String,
}

/// A rule system placed in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub id: String,
    pub name: String,
    /// `None` for Japanese titles.
    pub lang: Option<&'static str>,
    /// The language name, or the folded katakana reading.
    pub sort_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameSystemGroup {
    /// Language name, or the first character of the reading.
    pub index: String,
    pub infos: Vec<CatalogEntry>,
}

static ORDINAL_EDITION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"第(.+?)版").expect("valid regex"));

static PUNCTUATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[・!?！？\s　:：=＝/／（）()]+").expect("valid regex")
});

static LONG_VOWELS: LazyLock<[(Regex, &'static str); 5]> = LazyLock::new(|| {
    let fold = |row: &str, vowel: &'static str| {
        (
            Regex::new(&format!("([{}])ー+", row)).expect("valid regex"),
            vowel,
        )
    };
    [
        fold("アカサタナハマヤラワガザダバパァャヮ", "ア"),
        fold("イキシチニヒミリギジヂビピィ", "イ"),
        fold("ウクスツヌフムユルグズヅブプヴゥュ", "ウ"),
        fold("エケセテネヘメレゲゼデベペェ", "エ"),
        fold("オコソトノホモヨロゴゾドボポォョ", "オ"),
    ]
});

static LONG_N: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"ン+ー+").expect("valid regex"));

static REPEATED_N: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"ン+").expect("valid regex"));

/// The language group of a system id, from its `:Suffix`.
pub fn language(id: &str) -> Option<&'static str> {
    let (prefix, suffix) = id.rsplit_once(':')?;
    if prefix.is_empty() || suffix.is_empty() {
        return None;
    }
    Some(match suffix {
        "English" => "English",
        "ChineseTraditional" => "正體中文",
        "SimplifiedChinese" => "简体中文",
        "Korean" => "한국어",
        _ => "Other",
    })
}

/// Fold a hiragana reading into the katakana key the catalog sorts by.
///
/// Only these generic folding rules apply. There is no per-system table of
/// name or reading overrides, so a few Japanese titles sort by their raw
/// reading and can land in a different place than a hand-tuned list.
pub fn normalize_sort_key(key: &str) -> String {
    let katakana: String = key
        .chars()
        .map(|c| match c {
            '\u{3041}'..='\u{3096}' => char::from_u32(c as u32 + 0x60).unwrap_or(c),
            _ => c,
        })
        .collect();

    let mut key = ORDINAL_EDITION
        .replace_all(&katakana, "ダイ${1}バン")
        .into_owned();
    key = PUNCTUATION.replace_all(&key, "").into_owned();
    for (row, vowel) in LONG_VOWELS.iter() {
        key = row
            .replace_all(&key, format!("${{1}}{}", vowel).as_str())
            .into_owned();
    }
    key = LONG_N.replace_all(&key, "ン").into_owned();
    REPEATED_N.replace_all(&key, "ン").into_owned()
}

/// Order the rule systems for display. The generic system is left out.
pub fn build_catalog(infos: &[GameSystemInfo]) -> Vec<CatalogEntry> {
    let mut infos: Vec<&GameSystemInfo> =
        infos.iter().filter(|info| info.id != DEFAULT_SYSTEM).collect();
    // Systems within a language keep the order of their raw keys.
    infos.sort_by(|a, b| a.sort_key.cmp(&b.sort_key));

    let mut entries: Vec<CatalogEntry> = infos
        .into_iter()
        .map(|info| {
            let lang = language(&info.id);
            CatalogEntry {
                id: info.id.clone(),
                name: info.name.clone(),
                lang,
                sort_key: match lang {
                    Some(lang) => lang.to_string(),
                    None => normalize_sort_key(&info.sort_key),
                },
            }
        })
        .collect();
    entries.sort_by(compare_entries);
    entries
}

fn compare_entries(a: &CatalogEntry, b: &CatalogEntry) -> Ordering {
    let rank = |lang: &str| LANGUAGE_ORDER.iter().position(|&l| l == lang);
    match (a.lang, b.lang) {
        (Some(a), Some(b)) => rank(a).cmp(&rank(b)),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => a.sort_key.cmp(&b.sort_key),
    }
}

/// Split an ordered catalog into picker groups.
pub fn group_catalog(entries: Vec<CatalogEntry>) -> Vec<GameSystemGroup> {
    let mut groups: Vec<GameSystemGroup> = Vec::new();
    for entry in entries {
        let index = match entry.lang {
            Some(lang) => lang.to_string(),
            None => entry.sort_key.chars().next().map(String::from).unwrap_or_default(),
        };
        match groups.last_mut() {
            Some(group) if group.index == index => group.infos.push(entry),
            _ => groups.push(GameSystemGroup {
                index,
                infos: vec![entry],
            }),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(id: &str, sort_key: &str) -> GameSystemInfo {
        GameSystemInfo {
            id: id.to_string(),
            name: id.to_string(),
            sort_key: sort_key.to_string(),
        }
    }

    #[test]
    fn test_language() {
        assert_eq!(language("Cthulhu"), None);
        assert_eq!(language("Cthulhu:Korean"), Some("한국어"));
        assert_eq!(language("Foo:ChineseTraditional"), Some("正體中文"));
        assert_eq!(language("Foo:Spanish"), Some("Other"));
        assert_eq!(language(":English"), None);
    }

    #[test]
    fn test_sort_key_without_folding_rules_is_kept() {
        assert_eq!(normalize_sort_key("GURPS"), "GURPS");
        assert_eq!(normalize_sort_key("艦これRPG"), "艦コレRPG");
    }

    #[test]
    fn test_normalize_sort_key() {
        assert_eq!(normalize_sort_key("くとうるふしんわTRPG"), "クトウルフシンワTRPG");
        assert_eq!(normalize_sort_key("そーどわーるど2.5"), "ソオドワアルド2.5");
        assert_eq!(normalize_sort_key("しのびがみ 第2版"), "シノビガミダイ2バン");
        assert_eq!(normalize_sort_key("らんーーん"), "ラン");
        assert_eq!(normalize_sort_key("・あ！い（う）"), "アイウ");
    }

    #[test]
    fn test_catalog_order() {
        let infos = vec![
            info("Foo:English", "FOO"),
            info("DungeonsAndDragons5", "たんしよんすあんとときらこんす5"),
            info(DEFAULT_SYSTEM, "*たいすほつと"),
            info("Bar:Korean", "BAR"),
            info("Cthulhu", "くとうるふしんわTRPG"),
            info("Baz:English", "BAZ"),
        ];
        let ids: Vec<String> = build_catalog(&infos).into_iter().map(|e| e.id).collect();
        assert_eq!(
            ids,
            vec![
                "Cthulhu",
                "DungeonsAndDragons5",
                "Baz:English",
                "Foo:English",
                "Bar:Korean"
            ]
        );
    }

    #[test]
    fn test_groups() {
        let infos = vec![
            info("Cthulhu", "くとうるふしんわTRPG"),
            info("Cthulhu7th", "くとうるふしんわTRPG7版"),
            info("DungeonsAndDragons5", "たんしよんすあんとときらこんす5"),
            info("Foo:English", "FOO"),
        ];
        let groups = group_catalog(build_catalog(&infos));
        let summary: Vec<(&str, usize)> = groups
            .iter()
            .map(|g| (g.index.as_str(), g.infos.len()))
            .collect();
        assert_eq!(summary, vec![("ク", 2), ("タ", 1), ("English", 1)]);
    }
}
