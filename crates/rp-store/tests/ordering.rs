use std::collections::HashMap;

use proptest::prelude::*;
use rp_store::ScoreIndex;

fn model_ranks(model: &HashMap<String, f64>) -> Vec<(String, f64)> {
    let mut sorted: Vec<(String, f64)> = model.iter().map(|(m, &s)| (m.clone(), s)).collect();
    sorted.sort_by(|(m1, s1), (m2, s2)| s1.total_cmp(s2).then_with(|| m1.cmp(m2)));
    sorted
}

proptest! {
    // After every mutation, the returned rank and every queryable rank must
    // match a plain sort of (score, member) ascending over the model.
    #[test]
    fn ranks_always_match_a_sorted_model(
        ops in prop::collection::vec(("[a-e]", -1000.0f64..1000.0), 1..64)
    ) {
        let mut index = ScoreIndex::new();
        let mut model: HashMap<String, f64> = HashMap::new();

        for (member, score) in &ops {
            let rank = index.add_or_update(member, *score);
            model.insert(member.clone(), *score);
            let sorted = model_ranks(&model);
            let expected = sorted
                .iter()
                .position(|(m, _)| m == member)
                .expect("member was just inserted");
            prop_assert_eq!(rank, expected);
        }

        let sorted = model_ranks(&model);
        prop_assert_eq!(index.len(), sorted.len());
        for (expected, (member, score)) in sorted.iter().enumerate() {
            prop_assert_eq!(index.rank(member), Some(expected));
            prop_assert_eq!(index.score(member), Some(*score));
        }
        let ranked: Vec<String> = index
            .range(0, -1)
            .into_iter()
            .map(|(m, _)| m)
            .collect();
        let expected_order: Vec<String> = sorted.into_iter().map(|(m, _)| m).collect();
        prop_assert_eq!(ranked, expected_order);
    }

    // Re-adding every member with its current score must not move anything.
    #[test]
    fn readding_unchanged_scores_is_idempotent(
        ops in prop::collection::vec(("[a-e]", -50.0f64..50.0), 1..32)
    ) {
        let mut index = ScoreIndex::new();
        for (member, score) in &ops {
            index.add_or_update(member, *score);
        }
        let before: Vec<(String, f64)> = index.range(0, -1);
        for (member, score) in &before {
            index.add_or_update(member, *score);
        }
        prop_assert_eq!(index.range(0, -1), before);
    }
}
