/// Distinct non-empty values sorted by their uppercase form, ready for
/// [`prefix_search`].
pub fn sorted_distinct<'a, I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut out: Vec<String> = values
        .into_iter()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect();
    out.sort_by_cached_key(|v| (v.to_uppercase(), v.clone()));
    out.dedup();
    out
}

/// Entries of `sorted` that start with `query`, ignoring case.
///
/// `sorted` must be ordered by uppercase form (see [`sorted_distinct`]).
/// The lower bound is found by binary search; the scan then runs while the
/// prefix keeps matching, so the result is a contiguous sub-slice in the
/// original order. No match gives an empty slice.
pub fn prefix_search<'a, S: AsRef<str>>(sorted: &'a [S], query: &str) -> &'a [S] {
    let needle = query.trim().to_uppercase();
    let start = sorted.partition_point(|s| s.as_ref().to_uppercase() < needle);
    let len = sorted[start..]
        .iter()
        .take_while(|s| s.as_ref().to_uppercase().starts_with(&needle))
        .count();
    &sorted[start..start + len]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_case_insensitive_prefix_range() {
        let plates = ["ABC1234", "ABC1235", "XYZ0001"];
        assert_eq!(prefix_search(&plates, "abc"), &["ABC1234", "ABC1235"]);
        assert_eq!(prefix_search(&plates, "XYZ"), &["XYZ0001"]);
        assert_eq!(prefix_search(&plates, "ABC1235"), &["ABC1235"]);
    }

    #[test]
    fn no_match_is_empty() {
        let plates = ["ABC1234", "ABC1235", "XYZ0001"];
        assert!(prefix_search(&plates, "b").is_empty());
        assert!(prefix_search(&plates, "ZZZ").is_empty());
        let none: [&str; 0] = [];
        assert!(prefix_search(&none, "a").is_empty());
    }

    #[test]
    fn sorted_distinct_orders_by_uppercase() {
        let list = sorted_distinct(["xyz0001", "ABC1235", "", "abc1234", "ABC1235"]);
        assert_eq!(list, vec!["abc1234", "ABC1235", "xyz0001"]);
        assert_eq!(prefix_search(&list, "AbC"), &["abc1234", "ABC1235"]);
    }
}
