//! Prefix search over group labels and descriptions.

use crate::tree::{Group, Node};

/// Chain of groups from the search root down to a matching group, both ends
/// included.
pub type Lineage<'a> = Vec<&'a Group>;

/// Whether every search word is a prefix of at least one of `words`.
///
/// Word order does not matter and one word may satisfy several search words.
pub fn matches_phrase<S: AsRef<str>, W: AsRef<str>>(search_words: &[S], words: &[W]) -> bool {
    search_words.iter().all(|search_word| {
        words
            .iter()
            .any(|word| word.as_ref().starts_with(search_word.as_ref()))
    })
}

fn lowercase_words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(String::from)
        .collect()
}

impl Group {
    /// Find every group in this subtree whose label, or failing that whose
    /// description, matches `phrase`.
    ///
    /// Matches inside subgroups come first, in child order, followed by this
    /// group itself. Deleted groups are reported like any other; callers
    /// decide whether to show them.
    pub fn search(&self, phrase: &str) -> Vec<Lineage<'_>> {
        let search_words = lowercase_words(phrase);
        let mut ancestors = Vec::new();
        let mut found = Vec::new();
        self.collect_matches(&search_words, &mut ancestors, &mut found);
        found
    }

    /// Whether this group's label, or its description, matches the words.
    pub fn matches(&self, search_words: &[String]) -> bool {
        if matches_phrase(search_words, &lowercase_words(self.label())) {
            return true;
        }
        self.description()
            .map(|description| matches_phrase(search_words, &lowercase_words(description)))
            .unwrap_or(false)
    }

    fn collect_matches<'a>(
        &'a self,
        search_words: &[String],
        ancestors: &mut Vec<&'a Group>,
        found: &mut Vec<Lineage<'a>>,
    ) {
        ancestors.push(self);
        for node in self.entries() {
            if let Node::Group(group) = node {
                group.collect_matches(search_words, ancestors, found);
            }
        }
        if self.matches(search_words) {
            found.push(ancestors.clone());
        }
        ancestors.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample() -> Group {
        Group::from_portable_json(
            br#"{
                "label": "First Second",
                "description": "Third Fourth",
                "entries": [
                    {
                        "label": "Fifth Sixth",
                        "description": "Seventh Eighth",
                        "entries": [
                            {"label": "en2", "content": "en2_c", "secret": true},
                            {"label": "en1", "content": "en1_c", "secret": true},
                            {"label": "en1", "content": "en1_c", "secret": false}
                        ]
                    },
                    {
                        "label": "Thirteenth Fourteenth",
                        "description": "Fifteenth Sixteenth",
                        "entries": [
                            {
                                "label": "Ninth Tenth",
                                "description": "Eleventh Twelfth",
                                "entries": []
                            }
                        ]
                    },
                    {"label": "Element Twice", "entries": []},
                    {"label": "en3", "content": "en3_c", "secret": false},
                    {"label": "en2", "content": "en2_c", "secret": false}
                ]
            }"#,
        )
        .unwrap()
    }

    fn labels<'a>(lineage: &[&'a Group]) -> Vec<&'a str> {
        lineage.iter().map(|group| group.label()).collect()
    }

    #[test]
    fn test_matches_phrase() {
        assert!(matches_phrase(&["fif", "six"], &["fifth", "sixth"]));
        assert!(matches_phrase(&["six", "fif"], &["fifth", "sixth"]));
        assert!(!matches_phrase(&["elz"], &["element", "twice"]));
        assert!(matches_phrase::<&str, &str>(&[], &["anything"]));
    }

    #[test]
    fn test_search_label_prefix() {
        let root = sample();
        let found = root.search("fif six");

        assert_eq!(found.len(), 2);
        assert_eq!(labels(&found[0]), vec!["First Second", "Fifth Sixth"]);
        // Matched through its description.
        assert_eq!(labels(&found[1]), vec!["First Second", "Thirteenth Fourteenth"]);
    }

    #[test]
    fn test_search_word_order_is_irrelevant() {
        let root = sample();
        let forward: Vec<Vec<&str>> = root.search("fif six").iter().map(|l| labels(l)).collect();
        let backward: Vec<Vec<&str>> = root.search("six fif").iter().map(|l| labels(l)).collect();
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_search_reports_self_last() {
        let root = sample();
        let found = root.search("thir four");

        assert_eq!(found.len(), 2);
        assert_eq!(labels(&found[0]), vec!["First Second", "Thirteenth Fourteenth"]);
        assert_eq!(labels(&found[1]), vec!["First Second"]);
        assert!(std::ptr::eq(found[1][0], &root));
    }

    #[test]
    fn test_search_nested_lineage() {
        let root = sample();
        let found = root.search("el tw");

        assert_eq!(found.len(), 2);
        assert_eq!(
            labels(&found[0]),
            vec!["First Second", "Thirteenth Fourteenth", "Ninth Tenth"]
        );
        assert_eq!(labels(&found[1]), vec!["First Second", "Element Twice"]);
    }

    #[test]
    fn test_search_requires_prefix() {
        let root = sample();
        assert!(root.search("el w").is_empty());
        assert!(root.search("for").is_empty());
        assert!(root.search("elz").is_empty());
    }

    #[test]
    fn test_search_single_letter() {
        let root = sample();
        let found = root.search("n");

        assert_eq!(found.len(), 1);
        assert_eq!(
            labels(&found[0]),
            vec!["First Second", "Thirteenth Fourteenth", "Ninth Tenth"]
        );
    }

    #[test]
    fn test_search_is_case_insensitive_and_ignores_entries() {
        let root = sample();
        assert_eq!(root.search("ELEMENT").len(), 1);
        assert!(root.search("en3").is_empty());
    }

    #[test]
    fn test_search_includes_deleted() {
        let mut root = sample();
        root.entries_mut()[2].set_deleted(Some(crate::timestamp::now()));

        let found = root.search("element");

        assert_eq!(found.len(), 1);
        assert!(found[0].last().unwrap().is_deleted());
    }

    proptest! {
        #[test]
        fn prop_group_finds_itself_by_label_prefixes(
            words in proptest::collection::vec("[A-Za-z]{1,8}", 1..4),
            cut in 1usize..8,
        ) {
            let label = words.join(" ");
            let group = Group::new(label, None).unwrap();
            let phrase: Vec<String> = words
                .iter()
                .rev()
                .map(|word| word.chars().take(cut).collect())
                .collect();

            let found = group.search(&phrase.join(" "));

            prop_assert_eq!(found.len(), 1);
            prop_assert!(std::ptr::eq(found[0][0], &group));
        }
    }
}
