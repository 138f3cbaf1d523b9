use std::collections::{HashMap, VecDeque};

/// Groups candidates into connected components.
///
/// `temp_ids[i]` is the temporary id of candidate `i`, if it has one. Only
/// links whose both endpoints are candidate temp ids contribute; links to
/// existing nodes are ignored. Clusters come out ordered by their lowest
/// candidate index, members in ascending index order, and every candidate
/// lands in exactly one cluster.
pub fn cluster_candidates<'a>(
    temp_ids: &[Option<&'a str>],
    links: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> Vec<Vec<usize>> {
    let mut index_of: HashMap<&str, usize> = HashMap::new();
    for (idx, temp_id) in temp_ids.iter().enumerate() {
        if let Some(id) = temp_id {
            index_of.entry(*id).or_insert(idx);
        }
    }

    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); temp_ids.len()];
    for (source, target) in links {
        let (Some(&a), Some(&b)) = (index_of.get(source), index_of.get(target)) else {
            continue;
        };
        if a != b {
            adjacency[a].push(b);
            adjacency[b].push(a);
        }
    }

    let mut visited = vec![false; temp_ids.len()];
    let mut clusters = Vec::new();
    for start in 0..temp_ids.len() {
        if visited[start] {
            continue;
        }
        visited[start] = true;
        let mut members = vec![start];
        let mut queue = VecDeque::from([start]);
        while let Some(current) = queue.pop_front() {
            for &next in &adjacency[current] {
                if !visited[next] {
                    visited[next] = true;
                    members.push(next);
                    queue.push_back(next);
                }
            }
        }
        members.sort_unstable();
        clusters.push(members);
    }
    clusters
}
