#![allow(missing_docs)]
#![cfg(not(feature = "loom"))]

use mrgraph::{MapReduce, Reduced, TaskError, TaskNode, WorkerPool};
use proptest::prelude::*;
use std::{
    collections::BTreeMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

type WordCount = MapReduce<Vec<i32>, String, i32, i32>;

fn fixed_pairs(_: &Vec<i32>) -> Vec<(String, i32)> {
    vec![("a".into(), 1), ("b".into(), 2), ("a".into(), 3)]
}

fn sum(_: &String, values: &[i32]) -> i32 {
    values.iter().sum()
}

fn expected(fan_out: i32) -> Reduced<String, i32> {
    BTreeMap::from([("a".to_owned(), 4 * fan_out), ("b".to_owned(), 2 * fan_out)])
}

#[test]
fn sums_values_per_key() {
    let node = TaskNode::new(WordCount::new(fixed_pairs, sum));
    let pool = WorkerPool::with_workers(2).unwrap();

    let value = node.execute(&pool).unwrap();

    assert_eq!(*value.get::<Reduced<String, i32>>().unwrap(), expected(1));
}

#[test]
fn reads_input_from_first_dependency() {
    let source = TaskNode::from_fn(|_| Ok(vec![1, 2, 3, 4, 5, 6]));
    let node = TaskNode::new(MapReduce::<Vec<i32>, i32, i32, Vec<i32>>::new(
        |input| input.iter().map(|&n| (n % 3, n)).collect(),
        |_, values| values.to_vec(),
    ));
    node.depends_on(&source);
    let pool = WorkerPool::with_workers(1).unwrap();

    let reduced = node.result_as::<Reduced<i32, Vec<i32>>>();
    assert!(matches!(reduced, Err(TaskError::NotComputed)));

    node.execute(&pool).unwrap();
    let reduced = node.result_as::<Reduced<i32, Vec<i32>>>().unwrap();
    assert_eq!(
        reduced,
        BTreeMap::from([(0, vec![3, 6]), (1, vec![1, 4]), (2, vec![2, 5])])
    );
}

#[test]
fn wrong_input_type_is_a_mismatch() {
    let source = TaskNode::from_fn(|_| Ok("text"));
    let node = TaskNode::new(WordCount::new(fixed_pairs, sum));
    node.depends_on(&source);
    let pool = WorkerPool::with_workers(1).unwrap();

    assert!(matches!(
        node.execute(&pool),
        Err(TaskError::TypeMismatch { .. })
    ));
}

#[test]
fn values_keep_submission_order() {
    // Each map invocation emits its own sequence number; the shuffle must list
    // them in the order the invocations were submitted.
    let next = Arc::new(AtomicUsize::new(0));
    let node = {
        let next = Arc::clone(&next);
        TaskNode::new(
            MapReduce::<(), &str, usize, Vec<usize>>::new(
                move |_| vec![("seq", next.fetch_add(1, Ordering::SeqCst))],
                |_, values| values.to_vec(),
            )
            .fan_out(6),
        )
    };
    let pool = WorkerPool::with_workers(1).unwrap();
    let handle = pool.handle();

    // Run the stage on the only worker: it then executes its own map jobs in
    // FIFO order, so submission order and sequence numbers agree.
    let value = pool
        .enqueue(move || node.execute(&handle))
        .unwrap()
        .wait()
        .unwrap();

    assert_eq!(
        value.get::<Reduced<&str, Vec<usize>>>().unwrap()[&"seq"],
        (0..6).collect::<Vec<_>>()
    );
}

#[test]
fn zero_fan_out_yields_empty_result() {
    let node = TaskNode::new(WordCount::new(fixed_pairs, sum).fan_out(0));
    let pool = WorkerPool::with_workers(1).unwrap();

    let reduced = node.execute(&pool).unwrap();

    assert!(reduced.get::<Reduced<String, i32>>().unwrap().is_empty());
}

#[test]
fn reduce_runs_once_per_key() {
    let keys = Arc::new(Mutex::new(Vec::new()));
    let node = {
        let keys = Arc::clone(&keys);
        TaskNode::new(
            WordCount::new(fixed_pairs, move |key, values| {
                keys.lock().unwrap().push(key.clone());
                values.iter().sum()
            })
            .fan_out(4),
        )
    };
    let pool = WorkerPool::with_workers(3).unwrap();

    node.execute(&pool).unwrap();

    let mut keys = keys.lock().unwrap().clone();
    keys.sort();
    assert_eq!(keys, ["a", "b"]);
}

#[test]
fn panicking_map_fails_the_stage() {
    let node = TaskNode::new(MapReduce::<Vec<i32>, String, i32, i32>::new(
        |_| panic!("map blew up"),
        sum,
    ));
    let pool = WorkerPool::with_workers(2).unwrap();

    assert!(matches!(
        node.execute(&pool),
        Err(TaskError::Panicked(msg)) if msg.contains("map blew up")
    ));
    // The pool keeps serving work afterwards.
    assert_eq!(pool.enqueue(|| Ok(1)).unwrap().wait().unwrap(), 1);
}

#[test]
fn stopped_pool_fails_the_stage() {
    let node = TaskNode::new(WordCount::new(fixed_pairs, sum).fan_out(4));
    let mut pool = WorkerPool::with_workers(1).unwrap();
    let handle = pool.handle();
    pool.shutdown();

    assert!(matches!(
        node.execute(&handle),
        Err(TaskError::StoppedPool)
    ));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn result_scales_with_fan_out_and_ignores_pool_size(fan_out in 1..6_i32, workers in 1..5_usize) {
        let node = TaskNode::new(WordCount::new(fixed_pairs, sum).fan_out(fan_out as usize));
        let pool = WorkerPool::with_workers(workers).unwrap();

        let value = node.execute(&pool).unwrap();

        prop_assert_eq!(value.get::<Reduced<String, i32>>().unwrap(), &expected(fan_out));
    }
}
