//! Batch normalization: dedup by id, then a total deterministic order.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::models::Task;

/// Keep only the first occurrence of each task id.
pub fn dedup_by_id(tasks: Vec<Task>) -> Vec<Task> {
    let mut seen = HashSet::with_capacity(tasks.len());
    tasks
        .into_iter()
        .filter(|task| seen.insert(task.id.clone()))
        .collect()
}

/// Display order: pending before completed; pending by ascending due date,
/// completed by descending due date; ties broken by id.
pub fn compare_tasks(a: &Task, b: &Task) -> Ordering {
    a.is_completed
        .cmp(&b.is_completed)
        .then_with(|| {
            if a.is_completed {
                b.due_date.cmp(&a.due_date)
            } else {
                a.due_date.cmp(&b.due_date)
            }
        })
        .then_with(|| a.id.cmp(&b.id))
}

/// Dedup then sort a pushed batch.
pub fn normalize_batch(tasks: Vec<Task>) -> Vec<Task> {
    let mut tasks = dedup_by_id(tasks);
    tasks.sort_by(compare_tasks);
    tasks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_task;
    use pretty_assertions::assert_eq;

    fn ids(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|task| task.id.as_str()).collect()
    }

    #[test]
    fn pending_first_then_completed_newest_first() {
        let batch = vec![
            sample_task("1", false, "2025-03-02"),
            sample_task("2", false, "2025-03-01"),
            sample_task("3", true, "2025-02-20"),
            sample_task("4", true, "2025-02-25"),
        ];
        assert_eq!(ids(&normalize_batch(batch)), vec!["2", "1", "4", "3"]);
    }

    #[test]
    fn first_duplicate_wins() {
        let mut first = sample_task("a", false, "2025-03-02");
        first.title = "first".to_string();
        let mut second = sample_task("a", false, "2025-03-01");
        second.title = "second".to_string();

        let normalized = normalize_batch(vec![
            first,
            second,
            sample_task("b", false, "2025-03-05"),
        ]);
        assert_eq!(ids(&normalized), vec!["a", "b"]);
        assert_eq!(normalized[0].title, "first");
    }

    #[test]
    fn order_is_independent_of_input_permutation() {
        let tasks = vec![
            sample_task("c", false, "2025-03-01"),
            sample_task("a", false, "2025-03-01"),
            sample_task("b", true, "2025-03-01"),
            sample_task("d", true, "2025-03-01"),
            sample_task("e", false, "2025-01-01"),
        ];
        let mut reversed = tasks.clone();
        reversed.reverse();
        let mut rotated = tasks.clone();
        rotated.rotate_left(2);

        let expected = normalize_batch(tasks);
        assert_eq!(normalize_batch(reversed), expected);
        assert_eq!(normalize_batch(rotated), expected);
        assert_eq!(ids(&expected), vec!["e", "a", "c", "b", "d"]);
    }

    #[test]
    fn normalized_batch_satisfies_ordering_invariant() {
        let batch = vec![
            sample_task("p1", false, "2025-05-01"),
            sample_task("c1", true, "2025-01-01"),
            sample_task("p2", false, "2025-04-01"),
            sample_task("c2", true, "2025-06-01"),
            sample_task("p1", true, "2025-07-01"),
        ];
        let normalized = normalize_batch(batch);

        let first_completed = normalized
            .iter()
            .position(|task| task.is_completed)
            .unwrap_or(normalized.len());
        assert!(normalized[first_completed..].iter().all(|task| task.is_completed));
        let (pending, completed) = normalized.split_at(first_completed);
        assert!(pending.windows(2).all(|w| w[0].due_date <= w[1].due_date));
        assert!(completed.windows(2).all(|w| w[0].due_date >= w[1].due_date));
    }
}
