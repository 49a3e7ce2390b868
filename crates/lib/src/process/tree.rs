//! Descendant walks over the process table.
//!
//! Only leaves are interesting when diagnosing a build: intermediate shells and
//! wrappers are noise, the processes without children are doing the work.

use std::collections::{HashMap, HashSet};

use super::{Pid, ProcessError, ProcessIndex};

/// Children of every listed process, keyed by parent, in listing order.
pub fn children_by_parent(index: &dyn ProcessIndex) -> Result<HashMap<Pid, Vec<Pid>>, ProcessError> {
  let mut children: HashMap<Pid, Vec<Pid>> = HashMap::new();
  for pid in index.list_pids()? {
    match index.parent(pid) {
      Some(ppid) if ppid != pid => children.entry(ppid).or_default().push(pid),
      _ => {}
    }
  }
  Ok(children)
}

/// Leaf descendants of `root`, depth first, children in listing order.
///
/// `root` itself is never reported. The walk keeps a visited set so a
/// malformed parent relation (cycles, duplicates) cannot loop.
pub fn leaf_descendants(index: &dyn ProcessIndex, root: Pid) -> Result<Vec<Pid>, ProcessError> {
  let children = children_by_parent(index)?;

  let mut leaves = Vec::new();
  let mut visited = HashSet::from([root]);
  let mut stack: Vec<Pid> = children
    .get(&root)
    .map(|kids| kids.iter().rev().copied().collect())
    .unwrap_or_default();

  while let Some(pid) = stack.pop() {
    if !visited.insert(pid) {
      continue;
    }
    match children.get(&pid) {
      Some(kids) if !kids.is_empty() => stack.extend(kids.iter().rev()),
      _ => leaves.push(pid),
    }
  }

  Ok(leaves)
}

/// Human label for a process: its command line, or the bare pid when the
/// command line is empty or unreadable.
pub fn process_label(index: &dyn ProcessIndex, pid: Pid) -> String {
  match index.cmdline(pid) {
    Some(cmdline) if !cmdline.is_empty() => cmdline,
    _ => pid.to_string(),
  }
}
