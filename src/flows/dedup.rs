//! Flow name deduplication (spec.md §4.4, "Dedup"): after naming, suffix
//! duplicates with `_2`, `_3`, ... in the order flows are presented, so
//! names stay globally unique (spec.md §3 `Flow` invariant).

use std::collections::HashMap;

pub fn dedup_names(names: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, u32> = HashMap::new();
    names
        .into_iter()
        .map(|name| {
            let count = seen.entry(name.clone()).or_insert(0);
            *count += 1;
            if *count == 1 {
                name
            } else {
                format!("{name}_{count}")
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffixes_duplicates_in_order() {
        let names = vec!["patient".to_string(), "device".to_string(), "patient".to_string(), "patient".to_string()];
        assert_eq!(
            dedup_names(names),
            vec!["patient".to_string(), "device".to_string(), "patient_2".to_string(), "patient_3".to_string()]
        );
    }

    #[test]
    fn unique_names_pass_through() {
        let names = vec!["a".to_string(), "b".to_string()];
        assert_eq!(dedup_names(names.clone()), names);
    }
}
