use crate::{
    error::TaskError,
    pool::JobHandle,
    task::{ExecContext, Task},
    types::Value,
};
use derive_more::Debug;
use std::{collections::BTreeMap, sync::Arc};

/// Value produced by a [`MapReduce`] task: the reduced output per key,
/// ordered by key.
pub type Reduced<K, O> = BTreeMap<K, O>;

type MapFn<I, K, V> = dyn Fn(&I) -> Vec<(K, V)> + Send + Sync;
type ReduceFn<K, V, O> = dyn Fn(&K, &[V]) -> O + Send + Sync;

/// Three-phase aggregation task.
///
/// - Map: the value of the first dependency (or `I::default()` without
///   dependencies) is handed to `fan_out` parallel invocations of the map
///   function. Every invocation sees the whole input.
/// - Shuffle: the emitted pairs are grouped by key. Values keep the order in
///   which map jobs were submitted, not the order they finished in.
/// - Reduce: one pool job per distinct key folds its values.
///
/// Both parallel phases collect their jobs with
/// [`JobHandle::wait_helping`], so the stage completes even on a pool whose
/// only worker is the one running it. The node's value is a
/// [`Reduced<K, O>`].
#[must_use]
#[derive(Debug)]
pub struct MapReduce<I, K, V, O> {
    #[debug(skip)]
    map: Arc<MapFn<I, K, V>>,
    #[debug(skip)]
    reduce: Arc<ReduceFn<K, V, O>>,
    fan_out: usize,
}

impl<I, K, V, O> MapReduce<I, K, V, O>
where
    I: Default + Send + Sync + 'static,
    K: Ord + Send + Sync + 'static,
    V: Send + Sync + 'static,
    O: Send + Sync + 'static,
{
    /// A stage with a single map invocation.
    pub fn new(
        map: impl Fn(&I) -> Vec<(K, V)> + Send + Sync + 'static,
        reduce: impl Fn(&K, &[V]) -> O + Send + Sync + 'static,
    ) -> Self {
        Self {
            map: Arc::new(map),
            reduce: Arc::new(reduce),
            fan_out: 1,
        }
    }

    /// Sets the number of parallel map invocations. With `0` nothing is
    /// mapped and the result is empty.
    pub fn fan_out(mut self, fan_out: usize) -> Self {
        self.fan_out = fan_out;
        self
    }

    fn map_phase(
        &self,
        ctx: &ExecContext<'_>,
        input: &Arc<I>,
    ) -> Result<Vec<(K, V)>, TaskError> {
        let pool = ctx.pool();
        let jobs = (0..self.fan_out)
            .map(|_| {
                let map = Arc::clone(&self.map);
                let input = Arc::clone(input);
                pool.enqueue(move || Ok(map(input.as_ref())))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let mut pairs = Vec::new();
        for job in jobs {
            pairs.extend(job.wait_helping(pool)?);
        }
        Ok(pairs)
    }

    fn reduce_phase(
        &self,
        ctx: &ExecContext<'_>,
        groups: BTreeMap<K, Vec<V>>,
    ) -> Result<Reduced<K, O>, TaskError> {
        let pool = ctx.pool();
        let jobs: Vec<JobHandle<(K, O)>> = groups
            .into_iter()
            .map(|(key, values)| {
                let reduce = Arc::clone(&self.reduce);
                pool.enqueue(move || {
                    let output = reduce(&key, values.as_slice());
                    Ok((key, output))
                })
            })
            .collect::<Result<_, _>>()?;
        let mut reduced = BTreeMap::new();
        for job in jobs {
            let (key, output) = job.wait_helping(pool)?;
            reduced.insert(key, output);
        }
        Ok(reduced)
    }
}

fn shuffle<K: Ord, V>(pairs: Vec<(K, V)>) -> BTreeMap<K, Vec<V>> {
    let mut groups = BTreeMap::<K, Vec<V>>::new();
    for (key, value) in pairs {
        groups.entry(key).or_default().push(value);
    }
    groups
}

impl<I, K, V, O> Task for MapReduce<I, K, V, O>
where
    I: Default + Send + Sync + 'static,
    K: Ord + Send + Sync + 'static,
    V: Send + Sync + 'static,
    O: Send + Sync + 'static,
{
    fn run(&self, ctx: &ExecContext<'_>) -> Result<Value, TaskError> {
        let input = match ctx.input(0)? {
            Some(value) => value.downcast::<I>()?,
            None => Arc::new(I::default()),
        };
        let pairs = self.map_phase(ctx, &input)?;
        tracing::debug!(fan_out = self.fan_out, pairs = pairs.len(), "map phase done");
        let groups = shuffle(pairs);
        tracing::debug!(keys = groups.len(), "shuffle phase done");
        let reduced = self.reduce_phase(ctx, groups)?;
        Ok(Value::new(reduced))
    }
}
