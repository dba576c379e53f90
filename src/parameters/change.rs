// Mutation-Change Detection
//
// Decides whether applying a mutation actually produced a different request.
// A mutation whose precondition key is missing returns its input untouched;
// probing such a pair would only repeat the baseline, so the prober drops it
// before any request is signed.
//
// Example:
//   Before: {"Action": "Publish", "Message": "hi"}
//   After:  {"Action": "Publish"}
//   Result: changed (key sets differ)

use crate::models::ParamMap;

/// True if the two parameter maps describe different requests.
///
/// Key order never matters; a differing key set or any differing value
/// for a shared key does.
pub fn params_changed(before: &ParamMap, after: &ParamMap) -> bool {
    if before.len() != after.len() {
        return true;
    }
    before.iter().any(|(key, value)| after.get(key) != Some(value))
}

/// Keys whose presence or value differs between the two maps.
///
/// Used for trace output so a reviewer can see what a mutation touched.
pub fn changed_keys(before: &ParamMap, after: &ParamMap) -> Vec<String> {
    let mut keys: Vec<String> = before
        .keys()
        .chain(after.keys())
        .filter(|k| before.get(*k) != after.get(*k))
        .cloned()
        .collect();
    keys.sort();
    keys.dedup();
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> ParamMap {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn identical_maps_are_unchanged() {
        let a = map(&[("Action", "Publish"), ("Message", "hi")]);
        let b = map(&[("Message", "hi"), ("Action", "Publish")]);
        assert!(!params_changed(&a, &b));
        assert!(changed_keys(&a, &b).is_empty());
    }

    #[test]
    fn removed_key_is_a_change() {
        let a = map(&[("Action", "Publish"), ("Message", "hi")]);
        let b = map(&[("Action", "Publish")]);
        assert!(params_changed(&a, &b));
        assert_eq!(changed_keys(&a, &b), vec!["Message".to_string()]);
    }

    #[test]
    fn renamed_key_with_same_count_is_a_change() {
        let a = map(&[("TagKeys.member.1", "k")]);
        let b = map(&[("TagKeys.member.0", "k")]);
        assert!(params_changed(&a, &b));
        assert_eq!(
            changed_keys(&a, &b),
            vec!["TagKeys.member.0".to_string(), "TagKeys.member.1".to_string()]
        );
    }

    #[test]
    fn changed_value_is_a_change() {
        let a = map(&[("Subject", "short")]);
        let b = map(&[("Subject", "longer")]);
        assert!(params_changed(&a, &b));
    }
}
