use super::contribution::Contribution;

/// Order contributions for merging: priority ascending, ties broken by
/// registration sequence. Nothing is deduplicated and an empty input is a
/// valid result.
pub fn aggregate(mut contributions: Vec<Contribution>) -> Vec<Contribution> {
    // stable, so duplicate (priority, sequence) pairs keep input order
    contributions.sort_by_key(|contribution| (contribution.priority(), contribution.sequence()));
    contributions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value::ContentValue;

    fn contribution(sequence: usize, priority: i32) -> Contribution {
        Contribution::from_value(
            sequence,
            ContentValue::markup(format!("<p>{sequence}</p>")).with_priority(priority),
        )
    }

    fn order(contributions: &[Contribution]) -> Vec<usize> {
        contributions.iter().map(Contribution::sequence).collect()
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(aggregate(Vec::new()).is_empty());
    }

    #[test]
    fn sorts_by_priority_ascending() {
        let ordered = aggregate(vec![
            contribution(0, 5),
            contribution(1, -2),
            contribution(2, 1),
        ]);
        assert_eq!(order(&ordered), vec![1, 2, 0]);
    }

    #[test]
    fn equal_priorities_keep_registration_order() {
        let priorities = [3, 1, 3, 0, 1, 3, 0, 2, 1];
        let input: Vec<_> = priorities
            .iter()
            .enumerate()
            .map(|(sequence, priority)| contribution(sequence, *priority))
            .collect();

        let ordered = aggregate(input);

        for pair in ordered.windows(2) {
            assert!(pair[0].priority() <= pair[1].priority());
            if pair[0].priority() == pair[1].priority() {
                assert!(pair[0].sequence() < pair[1].sequence());
            }
        }
        assert_eq!(order(&ordered), vec![3, 6, 1, 4, 8, 7, 0, 2, 5]);
    }

    #[test]
    fn ties_follow_sequence_not_input_order() {
        let ordered = aggregate(vec![
            contribution(4, 1),
            contribution(1, 0),
            contribution(2, 1),
            contribution(0, 0),
        ]);
        assert_eq!(order(&ordered), vec![0, 1, 2, 4]);
    }

    #[test]
    fn duplicates_are_all_emitted() {
        let ordered = aggregate(vec![contribution(0, 0), contribution(0, 0)]);
        assert_eq!(ordered.len(), 2);
    }
}
