use crate::option::OptionDescriptor;

/// Anything that carries a render priority.
pub trait Prioritized {
    fn priority(&self) -> i64;
}

impl Prioritized for OptionDescriptor {
    fn priority(&self) -> i64 {
        self.priority
    }
}

/// Order items by ascending priority.
pub fn sort_by_priority<T: Prioritized>(items: Vec<T>) -> Vec<T> {
    sort_by(items, |item: &T| item.priority())
}

/// Recursive partition sort keyed by `priority`.
///
/// Pairs are compared directly and only swapped when strictly out of order.
/// Longer lists pivot on their first element; lower priorities go left,
/// ties and higher go right. Output order for equal priorities is part of
/// the contract and must not change.
pub fn sort_by<T, F>(items: Vec<T>, priority: F) -> Vec<T>
where
    F: Fn(&T) -> i64,
{
    partition_sort(items, &priority)
}

fn partition_sort<T, F>(mut items: Vec<T>, priority: &F) -> Vec<T>
where
    F: Fn(&T) -> i64,
{
    match items.len() {
        0 | 1 => items,
        2 => {
            if priority(&items[0]) > priority(&items[1]) {
                items.swap(0, 1);
            }
            items
        }
        _ => {
            let pivot = items.remove(0);
            let pivot_priority = priority(&pivot);
            let (left, right): (Vec<T>, Vec<T>) =
                items.into_iter().partition(|item| priority(item) < pivot_priority);

            let mut out = partition_sort(left, priority);
            out.push(pivot);
            out.extend(partition_sort(right, priority));
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn keyed(items: &[(&'static str, i64)]) -> Vec<(&'static str, i64)> {
        items.to_vec()
    }

    fn keys(items: &[(&'static str, i64)]) -> Vec<&'static str> {
        items.iter().map(|(k, _)| *k).collect()
    }

    #[test]
    fn short_inputs_are_returned_unchanged() {
        let empty: Vec<(&str, i64)> = Vec::new();
        assert!(sort_by(empty, |t| t.1).is_empty());
        assert_eq!(sort_by(keyed(&[("a", 9)]), |t| t.1), keyed(&[("a", 9)]));
    }

    #[test]
    fn pair_swaps_only_when_strictly_greater() {
        assert_eq!(keys(&sort_by(keyed(&[("a", 2), ("b", 1)]), |t| t.1)), ["b", "a"]);
        assert_eq!(keys(&sort_by(keyed(&[("a", 1), ("b", 2)]), |t| t.1)), ["a", "b"]);
        assert_eq!(keys(&sort_by(keyed(&[("a", 5), ("b", 5)]), |t| t.1)), ["a", "b"]);
    }

    #[test]
    fn general_branch_routes_ties_right_of_pivot() {
        let out = sort_by(keyed(&[("p", 5), ("x", 5), ("y", 1), ("z", 5)]), |t| t.1);
        assert_eq!(keys(&out), ["y", "p", "x", "z"]);
    }

    #[test]
    fn descriptors_sort_by_their_priority() {
        let opts = vec![
            OptionDescriptor::new("c").with_priority(30).unwrap(),
            OptionDescriptor::new("a").with_priority(10).unwrap(),
            OptionDescriptor::new("b").with_priority(20).unwrap(),
        ];
        let sorted: Vec<String> = sort_by_priority(opts).into_iter().map(|o| o.key).collect();
        assert_eq!(sorted, ["a", "b", "c"]);
    }
}
