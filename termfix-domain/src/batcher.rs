use crate::error::BatchError;
use std::collections::{BTreeSet, HashMap, HashSet};
use termfix_types::{Batch, ConceptId, Task};
use tracing::{debug, info};

/// `{project_branch}/{task_prefix}-{index:03}`
pub fn task_branch(project_branch: &str, task_prefix: &str, index: usize) -> String {
    format!("{}/{}-{:03}", project_branch, task_prefix, index)
}

/// Greedy, dependency-aware partitioning of candidates into tasks.
#[derive(Debug, Clone)]
pub struct TaskBatcher {
    max_size: usize,
    project_branch: String,
    task_prefix: String,
}

impl TaskBatcher {
    pub fn new(max_size: usize, project_branch: impl Into<String>) -> Result<Self, BatchError> {
        if max_size == 0 {
            return Err(BatchError::InvalidMaxSize);
        }
        Ok(Self {
            max_size,
            project_branch: project_branch.into(),
            task_prefix: "task".to_string(),
        })
    }

    pub fn with_task_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.task_prefix = prefix.into();
        self
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Fill tasks in candidate order. A candidate joins the task of its already placed
    /// dependencies regardless of size; unplaced dependencies are placed right before it.
    pub fn batch(
        &self,
        candidates: &[ConceptId],
        dependencies: &[(ConceptId, ConceptId)],
    ) -> Result<Batch, BatchError> {
        let mut fill = Fill::new(candidates, dependencies, self.max_size);
        for &c in candidates {
            fill.place(c, None);
        }
        let batch = self.finish(fill.tasks(), None, dependencies);
        info!(
            candidates = candidates.len(),
            tasks = batch.len(),
            max_size = self.max_size,
            "batched candidates"
        );
        Ok(batch)
    }

    /// Co-locate candidates sharing a key. Keys keep first-appearance order; a key's group is
    /// appended to the open task when it fits, else it starts a new one. Groups connected by a
    /// dependency are merged; oversized groups are chunked unless they carry a dependency.
    pub fn batch_by_key(
        &self,
        candidates: &[(ConceptId, String)],
        dependencies: &[(ConceptId, ConceptId)],
    ) -> Result<Batch, BatchError> {
        let ids: Vec<ConceptId> = candidates.iter().map(|(id, _)| *id).collect();
        let fill = Fill::new(&ids, dependencies, self.max_size);

        // Keys in first-appearance order; union keys joined by a dependency.
        let mut key_order: Vec<&str> = Vec::new();
        let mut key_of: HashMap<ConceptId, usize> = HashMap::new();
        for (id, key) in candidates {
            if key_of.contains_key(id) {
                continue;
            }
            let k = match key_order.iter().position(|x| *x == key.as_str()) {
                Some(k) => k,
                None => {
                    key_order.push(key.as_str());
                    key_order.len() - 1
                }
            };
            key_of.insert(*id, k);
        }
        let mut root: Vec<usize> = (0..key_order.len()).collect();
        fn find(root: &mut [usize], k: usize) -> usize {
            let mut k = k;
            while root[k] != k {
                root[k] = root[root[k]];
                k = root[k];
            }
            k
        }
        for (a, b) in fill.pairs() {
            let ra = find(&mut root, key_of[&a]);
            let rb = find(&mut root, key_of[&b]);
            if ra != rb {
                let (lo, hi) = (ra.min(rb), ra.max(rb));
                root[hi] = lo;
            }
        }

        let mut groups: Vec<Vec<ConceptId>> = vec![Vec::new(); key_order.len()];
        let mut seen = HashSet::new();
        for (id, _) in candidates {
            if seen.insert(*id) {
                let r = find(&mut root, key_of[id]);
                groups[r].push(*id);
            }
        }

        let mut tasks: Vec<(Vec<ConceptId>, String)> = Vec::new();
        for (k, members) in groups.into_iter().enumerate() {
            if members.is_empty() {
                continue;
            }
            let key = key_order[k].to_string();
            let mut sub = Fill::new(&members, dependencies, usize::MAX);
            for &c in &members {
                sub.place(c, None);
            }
            let has_deps = sub.has_pairs();
            let ordered: Vec<ConceptId> = sub.tasks().into_iter().flatten().collect();

            if ordered.len() > self.max_size && !has_deps {
                for chunk in ordered.chunks(self.max_size) {
                    tasks.push((chunk.to_vec(), key.clone()));
                }
                continue;
            }
            match tasks.last_mut() {
                Some((open, _)) if open.len() + ordered.len() <= self.max_size => {
                    open.extend(ordered);
                }
                _ => tasks.push((ordered, key)),
            }
        }

        let (members, keys): (Vec<_>, Vec<_>) = tasks.into_iter().unzip();
        Ok(self.finish(members, Some(keys), dependencies))
    }

    fn finish(
        &self,
        members: Vec<Vec<ConceptId>>,
        keys: Option<Vec<String>>,
        dependencies: &[(ConceptId, ConceptId)],
    ) -> Batch {
        let mut keys = keys.map(Vec::into_iter);
        let tasks = members
            .into_iter()
            .enumerate()
            .map(|(index, concepts)| {
                let set: HashSet<ConceptId> = concepts.iter().copied().collect();
                let mut constraints: Vec<(ConceptId, ConceptId)> = dependencies
                    .iter()
                    .copied()
                    .filter(|(a, b)| a != b && set.contains(a) && set.contains(b))
                    .collect();
                constraints.sort();
                constraints.dedup();
                Task {
                    id: Task::deterministic_id(&concepts),
                    index,
                    branch: task_branch(&self.project_branch, &self.task_prefix, index),
                    max_size: self.max_size,
                    group_key: keys.as_mut().and_then(Iterator::next),
                    constraints,
                    concepts,
                }
            })
            .collect();
        Batch { tasks }
    }
}

/// Check every postcondition of a batch against its inputs.
pub fn verify_batch(
    batch: &Batch,
    candidates: &[ConceptId],
    dependencies: &[(ConceptId, ConceptId)],
) -> Result<(), BatchError> {
    let wanted: BTreeSet<ConceptId> = candidates.iter().copied().collect();
    let mut seen: HashMap<ConceptId, (usize, usize)> = HashMap::new();
    for (t, task) in batch.tasks.iter().enumerate() {
        if task.is_empty() {
            return Err(BatchError::EmptyTask(task.index));
        }
        for (pos, &c) in task.concepts.iter().enumerate() {
            if !wanted.contains(&c) {
                return Err(BatchError::Unexpected(c));
            }
            if seen.insert(c, (t, pos)).is_some() {
                return Err(BatchError::Duplicated(c));
            }
        }
    }
    if let Some(missing) = wanted.iter().find(|c| !seen.contains_key(c)) {
        return Err(BatchError::Missing(*missing));
    }
    for &(a, b) in dependencies {
        if a == b {
            continue;
        }
        if let (Some(pa), Some(pb)) = (seen.get(&a), seen.get(&b)) {
            if pa.0 != pb.0 || pa.1 >= pb.1 {
                return Err(BatchError::Dependency {
                    before: a,
                    after: b,
                });
            }
        }
    }
    Ok(())
}

/// Mutable placement state for one greedy fill.
struct Fill {
    max_size: usize,
    /// Dependencies of each candidate, in input order.
    deps: HashMap<ConceptId, Vec<ConceptId>>,
    tasks: Vec<Option<Vec<ConceptId>>>,
    placed: HashMap<ConceptId, usize>,
    visiting: HashSet<ConceptId>,
}

impl Fill {
    fn new(
        candidates: &[ConceptId],
        dependencies: &[(ConceptId, ConceptId)],
        max_size: usize,
    ) -> Self {
        let known: HashSet<ConceptId> = candidates.iter().copied().collect();
        let mut deps: HashMap<ConceptId, Vec<ConceptId>> = HashMap::new();
        for &(a, b) in dependencies {
            if a == b || !known.contains(&a) || !known.contains(&b) {
                continue;
            }
            let list = deps.entry(b).or_default();
            if !list.contains(&a) {
                list.push(a);
            }
        }
        Self {
            max_size,
            deps,
            tasks: Vec::new(),
            placed: HashMap::new(),
            visiting: HashSet::new(),
        }
    }

    fn pairs(&self) -> Vec<(ConceptId, ConceptId)> {
        let mut out: Vec<(ConceptId, ConceptId)> = self
            .deps
            .iter()
            .flat_map(|(b, list)| list.iter().map(move |a| (*a, *b)))
            .collect();
        out.sort();
        out
    }

    fn has_pairs(&self) -> bool {
        !self.deps.is_empty()
    }

    /// Place `c` (and, first, its dependencies). Returns the slot it landed in.
    fn place(&mut self, c: ConceptId, hint: Option<usize>) -> usize {
        if let Some(&slot) = self.placed.get(&c) {
            return slot;
        }
        if !self.visiting.insert(c) {
            // Dependency cycle; break it here.
            return hint.unwrap_or_else(|| self.open_slot());
        }

        let mut target = hint;
        let deps = self.deps.get(&c).cloned().unwrap_or_default();
        for d in deps {
            let slot = self.place(d, target);
            target = Some(match target {
                Some(t) if t != slot => self.fold(t, slot),
                _ => slot,
            });
        }
        let slot = match target {
            Some(t) => self.live(t),
            None => self.open_slot(),
        };

        if let Some(task) = self.tasks[slot].as_mut() {
            task.push(c);
        }
        self.placed.insert(c, slot);
        self.visiting.remove(&c);
        slot
    }

    /// Follow a slot that may have been folded away.
    fn live(&self, slot: usize) -> usize {
        match self.tasks.get(slot) {
            Some(Some(_)) => slot,
            _ => self.open_slot_index().unwrap_or(slot),
        }
    }

    fn open_slot_index(&self) -> Option<usize> {
        self.tasks.iter().rposition(Option::is_some)
    }

    /// Last live task if it has room, else a fresh one.
    fn open_slot(&mut self) -> usize {
        if let Some(i) = self.open_slot_index() {
            if self.tasks[i].as_ref().is_some_and(|t| t.len() < self.max_size) {
                return i;
            }
        }
        self.tasks.push(Some(Vec::new()));
        self.tasks.len() - 1
    }

    /// Merge the later of two tasks into the earlier one. Returns the surviving slot.
    fn fold(&mut self, a: usize, b: usize) -> usize {
        let (lo, hi) = (a.min(b), a.max(b));
        let moved = self.tasks[hi].take().unwrap_or_default();
        debug!(into = lo, from = hi, moved = moved.len(), "folding tasks to co-locate dependencies");
        for c in &moved {
            self.placed.insert(*c, lo);
        }
        if let Some(task) = self.tasks[lo].as_mut() {
            task.extend(moved);
        }
        lo
    }

    fn tasks(self) -> Vec<Vec<ConceptId>> {
        self.tasks
            .into_iter()
            .flatten()
            .filter(|t| !t.is_empty())
            .collect()
    }
}
