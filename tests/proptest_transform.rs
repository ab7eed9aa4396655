use proptest::prelude::*;

use fanline::prelude::*;

fn run_transform(items: Vec<i32>, workers: usize) -> Vec<i64> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("tokio runtime");

    rt.block_on(async move {
        let transformer = Transformer::new(workers).expect("valid worker count");
        transformer
            .transform(items, stage(|x: i32| i64::from(x) * 3 - 1))
            .await
    })
}

proptest! {
    #[test]
    fn transform_agrees_with_sequential_map(
        items in proptest::collection::vec(any::<i32>(), 0..512),
        workers in 1usize..8
    ) {
        let expected: Vec<i64> = items.iter().map(|&x| i64::from(x) * 3 - 1).collect();
        let out = run_transform(items, workers);
        prop_assert_eq!(out, expected);
    }

    #[test]
    fn identity_is_a_no_op(
        items in proptest::collection::vec(any::<u16>(), 0..256),
        workers in 1usize..8
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("tokio runtime");

        let out = rt.block_on(async {
            let transformer = Transformer::new(workers).expect("valid worker count");
            transformer.transform(items.clone(), identity()).await
        });
        prop_assert_eq!(out, items);
    }
}
